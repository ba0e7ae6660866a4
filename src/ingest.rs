//! Record normalization for the ingestion pipeline
//!
//! Turns one loosely-typed JSON record into a [`NewInsight`]. The rules per
//! field group:
//! - `end_year`, `start_year`: empty or absent becomes null, anything else
//!   must be an integer (fractional numbers are truncated)
//! - `intensity`, `likelihood`, `relevance`: the key must exist, empty
//!   becomes 0, anything else must be an integer as above
//! - `published`, `added`: best-effort date parse, null on failure
//! - `sector`, `region`, `impact`, `country`, `pestle`: empty string when the
//!   key is absent
//! - `topic`, `insight`, `url`, `source`, `title`: the key must exist
//!
//! `added` is parsed but has no column; it is carried on
//! [`NormalizedRecord`] and dropped when the row is written.

use crate::error::{Error, Result};
use crate::models::NewInsight;
use crate::normalize::{coerce_int_truncating, coerce_text, parse_datetime_lenient};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// Keys an input record may carry
pub const INPUT_FIELDS: [&str; 17] = [
    "end_year",
    "start_year",
    "intensity",
    "sector",
    "topic",
    "insight",
    "url",
    "region",
    "impact",
    "added",
    "published",
    "country",
    "relevance",
    "pestle",
    "source",
    "title",
    "likelihood",
];

/// Outcome of parsing one date field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    /// Absent, null or empty
    Missing,
    Parsed(DateTime<Utc>),
    /// Present but not a recognizable date; stored as null
    Unparsable,
}

impl DateField {
    pub fn value(self) -> Option<DateTime<Utc>> {
        match self {
            DateField::Parsed(dt) => Some(dt),
            DateField::Missing | DateField::Unparsable => None,
        }
    }
}

/// A record after normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub insight: NewInsight,
    pub published: DateField,
    /// Parsed for validation only; not persisted
    pub added: DateField,
}

/// Read an ingestion input file: a JSON array of records
pub fn read_records(path: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)?;
    parse_records(&content)
}

/// Parse ingestion input text. Elements are not checked here; a non-object
/// element fails when its turn comes in the pipeline.
pub fn parse_records(content: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(content)? {
        Value::Array(records) => Ok(records),
        other => Err(Error::InvalidInput(format!(
            "expected a JSON array of records, found {}",
            json_kind(&other)
        ))),
    }
}

/// Normalize the record at `index` of the input
pub fn normalize_record(index: usize, value: &Value) -> Result<NormalizedRecord> {
    let Some(record) = value.as_object() else {
        return Err(Error::InvalidInput(format!(
            "Record {}: expected an object, found {}",
            index,
            json_kind(value)
        )));
    };

    for key in record.keys() {
        if !INPUT_FIELDS.contains(&key.as_str()) {
            debug!(record = index, key = %key, "Ignoring unknown field");
        }
    }

    let fields = RecordFields { index, record };

    let published = fields.date("published");
    let added = fields.date("added");

    let insight = NewInsight {
        end_year: fields.nullable_int("end_year")?,
        start_year: fields.nullable_int("start_year")?,
        intensity: fields.int_or_zero("intensity")?,
        likelihood: fields.int_or_zero("likelihood")?,
        relevance: fields.int_or_zero("relevance")?,
        sector: fields.text_or_empty("sector")?,
        region: fields.text_or_empty("region")?,
        impact: fields.text_or_empty("impact")?,
        country: fields.text_or_empty("country")?,
        pestle: fields.pestle()?,
        topic: fields.required_text("topic")?,
        insight: fields.required_text("insight")?,
        url: fields.required_text("url")?,
        source: fields.required_text("source")?,
        title: fields.required_text("title")?,
        published: published.value(),
    };

    Ok(NormalizedRecord {
        insight,
        published,
        added,
    })
}

/// Field accessors for one record, attaching the record index to errors
struct RecordFields<'a> {
    index: usize,
    record: &'a Map<String, Value>,
}

impl RecordFields<'_> {
    fn require(&self, field: &'static str) -> Result<&Value> {
        self.record.get(field).ok_or(Error::MissingField {
            record: self.index,
            field,
        })
    }

    fn parse_int(&self, field: &'static str, value: &Value) -> Result<Option<i64>> {
        coerce_int_truncating(value).map_err(|value| Error::ValueParse {
            record: self.index,
            field,
            value,
        })
    }

    fn nullable_int(&self, field: &'static str) -> Result<Option<i64>> {
        match self.record.get(field) {
            Some(value) => self.parse_int(field, value),
            None => Ok(None),
        }
    }

    fn int_or_zero(&self, field: &'static str) -> Result<i64> {
        let value = self.require(field)?;
        Ok(self.parse_int(field, value)?.unwrap_or(0))
    }

    fn text(&self, field: &'static str, value: &Value) -> Result<Option<String>> {
        coerce_text(value).map_err(|found| {
            Error::InvalidInput(format!(
                "Record {}: field '{}' must be a scalar, found {}",
                self.index, field, found
            ))
        })
    }

    fn text_or_empty(&self, field: &'static str) -> Result<String> {
        match self.record.get(field) {
            Some(value) => Ok(self.text(field, value)?.unwrap_or_default()),
            None => Ok(String::new()),
        }
    }

    /// `pestle` is the one nullable text column: an explicit null stays null
    fn pestle(&self) -> Result<Option<String>> {
        match self.record.get("pestle") {
            Some(value) => self.text("pestle", value),
            None => Ok(Some(String::new())),
        }
    }

    fn required_text(&self, field: &'static str) -> Result<String> {
        let value = self.require(field)?;
        self.text(field, value)?.ok_or(Error::MissingField {
            record: self.index,
            field,
        })
    }

    fn date(&self, field: &'static str) -> DateField {
        let raw = match self.record.get(field) {
            None | Some(Value::Null) => return DateField::Missing,
            Some(Value::String(s)) if s.trim().is_empty() => return DateField::Missing,
            Some(Value::String(s)) => s.as_str(),
            Some(other) => {
                debug!(record = self.index, field, value = %other, "Non-string date, storing null");
                return DateField::Unparsable;
            }
        };

        match parse_datetime_lenient(raw) {
            Some(dt) => DateField::Parsed(dt),
            None => {
                debug!(record = self.index, field, value = raw, "Unparsable date, storing null");
                DateField::Unparsable
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::json;

    fn sample_record() -> Value {
        json!({
            "end_year": "",
            "intensity": 6,
            "sector": "Energy",
            "topic": "gas",
            "insight": "Annual Energy Outlook",
            "url": "http://www.eia.gov/outlooks/aeo/",
            "region": "Northern America",
            "start_year": "",
            "impact": "",
            "added": "January, 20 2017 03:51:25",
            "published": "January, 09 2017 00:00:00",
            "country": "United States of America",
            "relevance": 2,
            "pestle": "Industries",
            "source": "EIA",
            "title": "U.S. natural gas consumption is expected to increase during much of the projection period.",
            "likelihood": 3
        })
    }

    fn with(field: &str, value: Value) -> Value {
        let mut record = sample_record();
        record[field] = value;
        record
    }

    fn without(field: &str) -> Value {
        let mut record = sample_record();
        record.as_object_mut().unwrap().remove(field);
        record
    }

    #[test]
    fn test_normalize_sample_record() {
        let normalized = normalize_record(0, &sample_record()).unwrap();
        let insight = normalized.insight;

        assert_eq!(insight.end_year, None);
        assert_eq!(insight.start_year, None);
        assert_eq!(insight.intensity, 6);
        assert_eq!(insight.relevance, 2);
        assert_eq!(insight.likelihood, 3);
        assert_eq!(insight.sector, "Energy");
        assert_eq!(insight.impact, "");
        assert_eq!(insight.pestle.as_deref(), Some("Industries"));
        assert_eq!(insight.topic, "gas");
        assert_eq!(
            insight.published,
            Some(Utc.with_ymd_and_hms(2017, 1, 9, 0, 0, 0).unwrap())
        );
        assert_eq!(
            normalized.added,
            DateField::Parsed(Utc.with_ymd_and_hms(2017, 1, 20, 3, 51, 25).unwrap())
        );
    }

    #[rstest]
    #[case(json!(""), None)]
    #[case(json!(null), None)]
    #[case(json!("2030"), Some(2030))]
    #[case(json!(2030), Some(2030))]
    #[case(json!(0), Some(0))]
    fn test_nullable_years(#[case] raw: Value, #[case] expected: Option<i64>) {
        let record = with("start_year", raw.clone());
        assert_eq!(
            normalize_record(0, &record).unwrap().insight.start_year,
            expected
        );

        let record = with("end_year", raw);
        assert_eq!(normalize_record(0, &record).unwrap().insight.end_year, expected);
    }

    #[test]
    fn test_absent_years_are_null() {
        let record = without("end_year");
        assert_eq!(normalize_record(0, &record).unwrap().insight.end_year, None);
    }

    #[test]
    fn test_non_numeric_year_fails_with_context() {
        let err = normalize_record(7, &with("end_year", json!("soon"))).unwrap_err();
        match err {
            Error::ValueParse {
                record,
                field,
                value,
            } => {
                assert_eq!(record, 7);
                assert_eq!(field, "end_year");
                assert_eq!(value, "\"soon\"");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[rstest]
    #[case("intensity")]
    #[case("likelihood")]
    #[case("relevance")]
    fn test_zero_default_ints(#[case] field: &str) {
        let record = with(field, json!(""));
        let insight = normalize_record(0, &record).unwrap().insight;
        let value = match field {
            "intensity" => insight.intensity,
            "likelihood" => insight.likelihood,
            _ => insight.relevance,
        };
        assert_eq!(value, 0);

        let err = normalize_record(2, &without(field)).unwrap_err();
        assert!(matches!(err, Error::MissingField { record: 2, .. }));

        let err = normalize_record(2, &with(field, json!("high"))).unwrap_err();
        assert!(matches!(err, Error::ValueParse { record: 2, .. }));
    }

    #[test]
    fn test_fractional_numbers_truncate() {
        let record = with("intensity", json!(6.5));
        assert_eq!(normalize_record(0, &record).unwrap().insight.intensity, 6);

        let record = with("end_year", json!(2030.9));
        assert_eq!(
            normalize_record(0, &record).unwrap().insight.end_year,
            Some(2030)
        );

        let err = normalize_record(1, &with("likelihood", json!("3.5"))).unwrap_err();
        assert!(matches!(
            err,
            Error::ValueParse {
                record: 1,
                field: "likelihood",
                ..
            }
        ));
    }

    #[rstest]
    #[case("topic")]
    #[case("insight")]
    #[case("url")]
    #[case("source")]
    #[case("title")]
    fn test_required_fields(#[case] field: &'static str) {
        let err = normalize_record(4, &without(field)).unwrap_err();
        match err {
            Error::MissingField { record, field: f } => {
                assert_eq!(record, 4);
                assert_eq!(f, field);
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = normalize_record(4, &with(field, Value::Null)).unwrap_err();
        assert!(matches!(err, Error::MissingField { .. }));
    }

    #[test]
    fn test_defaulted_text_fields() {
        let mut record = sample_record();
        let obj = record.as_object_mut().unwrap();
        for field in ["sector", "region", "impact", "country", "pestle"] {
            obj.remove(field);
        }
        let insight = normalize_record(0, &record).unwrap().insight;
        assert_eq!(insight.sector, "");
        assert_eq!(insight.region, "");
        assert_eq!(insight.impact, "");
        assert_eq!(insight.country, "");
        assert_eq!(insight.pestle.as_deref(), Some(""));

        let insight = normalize_record(0, &with("pestle", Value::Null))
            .unwrap()
            .insight;
        assert_eq!(insight.pestle, None);

        let insight = normalize_record(0, &with("country", Value::Null))
            .unwrap()
            .insight;
        assert_eq!(insight.country, "");
    }

    #[test]
    fn test_unparsable_dates_become_null() {
        let normalized = normalize_record(0, &with("published", json!("not-a-date"))).unwrap();
        assert_eq!(normalized.published, DateField::Unparsable);
        assert_eq!(normalized.insight.published, None);

        let normalized = normalize_record(0, &with("added", json!(""))).unwrap();
        assert_eq!(normalized.added, DateField::Missing);

        let normalized = normalize_record(0, &without("published")).unwrap();
        assert_eq!(normalized.published, DateField::Missing);

        let normalized = normalize_record(0, &with("published", json!(20170109))).unwrap();
        assert_eq!(normalized.published, DateField::Unparsable);
    }

    #[test]
    fn test_non_object_record() {
        let err = normalize_record(5, &json!(["not", "a", "record"])).unwrap_err();
        assert!(err.to_string().contains("Record 5"));
    }

    #[test]
    fn test_parse_records_requires_array() {
        assert_eq!(parse_records("[{}, 1]").unwrap().len(), 2);
        assert!(matches!(
            parse_records("{\"topic\": \"gas\"}"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(parse_records("[{"), Err(Error::Json(_))));
    }

    #[test]
    fn test_input_fields_cover_sample() {
        let record = sample_record();
        for key in record.as_object().unwrap().keys() {
            assert!(INPUT_FIELDS.contains(&key.as_str()), "{key}");
        }
    }
}
