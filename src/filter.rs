//! Filtered queries over insights
//!
//! Every filterable dimension is a [`FilterField`] variant with a fixed
//! column, so a filter can only ever name a real column. A filter is a list of
//! case-insensitive substring predicates joined with AND.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};

/// A filterable insight field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    EndYear,
    StartYear,
    Country,
    Topic,
    Region,
    Sector,
    Source,
}

impl FilterField {
    /// Query parameter name
    pub fn param(self) -> &'static str {
        match self {
            FilterField::EndYear => "end_year",
            FilterField::StartYear => "start_year",
            FilterField::Country => "country",
            FilterField::Topic => "topic",
            FilterField::Region => "region",
            FilterField::Sector => "sector",
            FilterField::Source => "source",
        }
    }

    /// SQL expression yielding the column as text
    fn column_sql(self) -> &'static str {
        match self {
            FilterField::EndYear => "CAST(end_year AS TEXT)",
            FilterField::StartYear => "CAST(start_year AS TEXT)",
            FilterField::Country => "country",
            FilterField::Topic => "topic",
            FilterField::Region => "region",
            FilterField::Sector => "sector",
            FilterField::Source => "source",
        }
    }
}

impl std::fmt::Display for FilterField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.param())
    }
}

/// One "contains, ignoring case" condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: FilterField,
    pub needle: String,
}

/// A conjunction of substring predicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsightFilter {
    predicates: Vec<Predicate>,
}

impl InsightFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate; an empty value adds nothing
    pub fn with(mut self, field: FilterField, value: impl Into<String>) -> Self {
        let needle = value.into();
        if !needle.is_empty() {
            self.predicates.push(Predicate { field, needle });
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Append ` WHERE ...` to a query; nothing when the filter is empty.
    ///
    /// Matching folds ASCII letters only, as SQLite's `lower()` does:
    /// `energy` matches `ENERGY`, but `énergie` does not match `ÉNERGIE`.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        for (i, predicate) in self.predicates.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            qb.push("instr(lower(")
                .push(predicate.field.column_sql())
                .push("), lower(")
                .push_bind(predicate.needle.clone())
                .push(")) > 0");
        }
    }
}

/// Filter criteria as they arrive from a request or the CLI.
///
/// `city` is accepted for compatibility with existing clients but there is
/// no city column; a non-empty value is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterParams {
    pub end_year: Option<String>,
    pub start_year: Option<String>,
    pub country: Option<String>,
    pub topic: Option<String>,
    pub region: Option<String>,
    pub sector: Option<String>,
    pub source: Option<String>,
    pub city: Option<String>,
}

impl FilterParams {
    /// Build the filter, skipping absent and empty criteria
    pub fn into_filter(self) -> Result<InsightFilter> {
        if self.city.as_deref().is_some_and(|c| !c.is_empty()) {
            return Err(Error::UnsupportedFilter("city".to_string()));
        }

        let criteria = [
            (FilterField::EndYear, self.end_year),
            (FilterField::StartYear, self.start_year),
            (FilterField::Country, self.country),
            (FilterField::Topic, self.topic),
            (FilterField::Region, self.region),
            (FilterField::Sector, self.sector),
            (FilterField::Source, self.source),
        ];

        Ok(criteria
            .into_iter()
            .fold(InsightFilter::new(), |filter, (field, value)| match value {
                Some(value) => filter.with(field, value),
                None => filter,
            }))
    }
}

/// In-memory evaluation of a filter, used to cross-check the SQL
#[cfg(test)]
impl InsightFilter {
    pub(crate) fn matches(&self, insight: &crate::models::Insight) -> bool {
        self.predicates.iter().all(|p| {
            let value = match p.field {
                FilterField::EndYear => insight.end_year.map(|y| y.to_string()),
                FilterField::StartYear => insight.start_year.map(|y| y.to_string()),
                FilterField::Country => Some(insight.country.clone()),
                FilterField::Topic => Some(insight.topic.clone()),
                FilterField::Region => Some(insight.region.clone()),
                FilterField::Sector => Some(insight.sector.clone()),
                FilterField::Source => Some(insight.source.clone()),
            };
            value.is_some_and(|v| {
                v.to_ascii_lowercase()
                    .contains(&p.needle.to_ascii_lowercase())
            })
        })
    }
}
