//! The Insight entity
//!
//! `Insight` is a stored row as read back from SQLite; `NewInsight` is the
//! write model produced by ingestion and by API bodies.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Column length limits, mirrored by API validation
pub const SHORT_TEXT_MAX: usize = 255;
pub const PESTLE_MAX: usize = 100;
pub const URL_MAX: usize = 1000;

/// A persisted insight row
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Insight {
    pub id: i64,
    pub end_year: Option<i64>,
    pub intensity: i64,
    pub sector: String,
    pub topic: String,
    pub insight: String,
    pub url: String,
    pub region: String,
    pub start_year: Option<i64>,
    pub impact: String,
    /// RFC 3339, UTC
    pub published: Option<String>,
    pub country: String,
    pub relevance: i64,
    pub pestle: Option<String>,
    pub source: String,
    pub title: String,
    pub likelihood: i64,
}

/// Field values for inserting or replacing an insight
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewInsight {
    pub end_year: Option<i64>,
    pub start_year: Option<i64>,
    pub intensity: i64,
    pub sector: String,
    pub topic: String,
    pub insight: String,
    pub url: String,
    pub region: String,
    pub impact: String,
    pub published: Option<DateTime<Utc>>,
    pub country: String,
    pub relevance: i64,
    pub pestle: Option<String>,
    pub source: String,
    pub title: String,
    pub likelihood: i64,
}

/// Canonical text form of a stored timestamp
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl NewInsight {
    /// `published` as stored in the database
    pub fn published_text(&self) -> Option<String> {
        self.published.as_ref().map(format_timestamp)
    }
}

impl Insight {
    /// Parse the stored `published` text back into a timestamp
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Convert back into a write model, e.g. as the base of a partial update
    pub fn to_new(&self) -> NewInsight {
        NewInsight {
            end_year: self.end_year,
            start_year: self.start_year,
            intensity: self.intensity,
            sector: self.sector.clone(),
            topic: self.topic.clone(),
            insight: self.insight.clone(),
            url: self.url.clone(),
            region: self.region.clone(),
            impact: self.impact.clone(),
            published: self.published_at(),
            country: self.country.clone(),
            relevance: self.relevance,
            pestle: self.pestle.clone(),
            source: self.source.clone(),
            title: self.title.clone(),
            likelihood: self.likelihood,
        }
    }
}

impl std::fmt::Display for Insight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}
