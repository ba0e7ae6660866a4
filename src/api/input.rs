//! Request body validation for create and update
//!
//! Bodies are read field by field out of a JSON object so that every problem
//! can be reported at once, keyed by field name. Integers accept numbers or
//! numeric strings; text is trimmed; `published` must be ISO 8601.

use crate::error::{Error, Result, ValidationErrors};
use crate::models::{NewInsight, PESTLE_MAX, SHORT_TEXT_MAX, URL_MAX};
use crate::normalize::{coerce_int, coerce_text, parse_datetime_iso};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use url::Url;

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_BLANK: &str = "This field may not be blank.";
const NOT_INTEGER: &str = "A valid integer is required.";
const NOT_STRING: &str = "Not a valid string.";
const BAD_URL: &str = "Enter a valid URL.";
const BAD_DATETIME: &str = "Datetime has wrong format. Use one of these formats instead: \
                            YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z].";

/// How absent fields are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Create or PUT: required fields must be present
    Full,
    /// PATCH: only supplied fields are checked and applied
    Partial,
}

#[derive(Clone, Copy)]
struct TextRule {
    required: bool,
    max_chars: Option<usize>,
}

const REQUIRED_SHORT: TextRule = TextRule {
    required: true,
    max_chars: Some(SHORT_TEXT_MAX),
};
const REQUIRED_LONG: TextRule = TextRule {
    required: true,
    max_chars: None,
};
const OPTIONAL_SHORT: TextRule = TextRule {
    required: false,
    max_chars: Some(SHORT_TEXT_MAX),
};
const OPTIONAL_LONG: TextRule = TextRule {
    required: false,
    max_chars: None,
};

/// Apply a request body on top of `base`, returning the row to write.
///
/// For a create, `base` is `NewInsight::default()`; for updates it is the
/// stored row. Fields absent from the body keep their `base` value.
pub fn apply_body(base: NewInsight, body: &Value, mode: WriteMode) -> Result<NewInsight> {
    let mut errors = ValidationErrors::new();

    let Some(object) = body.as_object() else {
        errors.add(
            "non_field_errors",
            format!(
                "Invalid data. Expected a dictionary, but got {}.",
                type_name(body)
            ),
        );
        return Err(Error::Validation(errors));
    };

    let mut reader = BodyReader {
        body: object,
        mode,
        errors,
    };
    let mut out = base;

    reader.nullable_int("end_year", &mut out.end_year);
    reader.nullable_int("start_year", &mut out.start_year);
    reader.int_or_zero("intensity", &mut out.intensity);
    reader.int_or_zero("relevance", &mut out.relevance);
    reader.int_or_zero("likelihood", &mut out.likelihood);

    reader.text("topic", REQUIRED_SHORT, &mut out.topic);
    reader.text("insight", REQUIRED_LONG, &mut out.insight);
    reader.text("source", REQUIRED_SHORT, &mut out.source);
    reader.text("title", REQUIRED_LONG, &mut out.title);
    reader.url(&mut out.url);

    reader.text("sector", OPTIONAL_SHORT, &mut out.sector);
    reader.text("region", OPTIONAL_SHORT, &mut out.region);
    reader.text("country", OPTIONAL_SHORT, &mut out.country);
    reader.text("impact", OPTIONAL_LONG, &mut out.impact);
    reader.pestle(&mut out.pestle);

    reader.published(&mut out.published);

    reader.errors.into_result()?;
    Ok(out)
}

struct BodyReader<'a> {
    body: &'a Map<String, Value>,
    mode: WriteMode,
    errors: ValidationErrors,
}

impl BodyReader<'_> {
    fn int(&mut self, name: &str) -> Option<Option<i64>> {
        let value = self.body.get(name)?;
        match coerce_int(value) {
            Ok(n) => Some(n),
            Err(_) => {
                self.errors.add(name, NOT_INTEGER);
                None
            }
        }
    }

    fn nullable_int(&mut self, name: &str, slot: &mut Option<i64>) {
        if let Some(n) = self.int(name) {
            *slot = n;
        }
    }

    fn int_or_zero(&mut self, name: &str, slot: &mut i64) {
        if let Some(n) = self.int(name) {
            *slot = n.unwrap_or(0);
        }
    }

    /// Checked, trimmed text; `None` when absent or invalid (already reported)
    fn checked_text(&mut self, name: &str, rule: TextRule, value: &Value) -> Option<String> {
        let text = match coerce_text(value) {
            Ok(Some(text)) => text,
            Ok(None) => {
                self.errors.add(name, NOT_NULL);
                return None;
            }
            Err(_) => {
                self.errors.add(name, NOT_STRING);
                return None;
            }
        };

        let text = text.trim().to_string();
        if rule.required && text.is_empty() {
            self.errors.add(name, NOT_BLANK);
            return None;
        }
        if let Some(max) = rule.max_chars {
            if text.chars().count() > max {
                self.errors.add(
                    name,
                    format!("Ensure this field has no more than {max} characters."),
                );
                return None;
            }
        }
        Some(text)
    }

    fn present(&mut self, name: &str, required: bool) -> Option<&'_ Value> {
        match self.body.get(name) {
            Some(value) => Some(value),
            None => {
                if required && self.mode == WriteMode::Full {
                    self.errors.add(name, REQUIRED);
                }
                None
            }
        }
    }

    fn text(&mut self, name: &str, rule: TextRule, slot: &mut String) {
        let Some(value) = self.present(name, rule.required).cloned() else {
            return;
        };
        if let Some(text) = self.checked_text(name, rule, &value) {
            *slot = text;
        }
    }

    fn url(&mut self, slot: &mut String) {
        let rule = TextRule {
            required: true,
            max_chars: Some(URL_MAX),
        };
        let Some(value) = self.present("url", true).cloned() else {
            return;
        };
        let Some(text) = self.checked_text("url", rule, &value) else {
            return;
        };
        if is_valid_url(&text) {
            *slot = text;
        } else {
            self.errors.add("url", BAD_URL);
        }
    }

    fn pestle(&mut self, slot: &mut Option<String>) {
        let rule = TextRule {
            required: false,
            max_chars: Some(PESTLE_MAX),
        };
        match self.body.get("pestle").cloned() {
            None => {}
            Some(Value::Null) => *slot = None,
            Some(value) => {
                if let Some(text) = self.checked_text("pestle", rule, &value) {
                    *slot = Some(text);
                }
            }
        }
    }

    fn published(&mut self, slot: &mut Option<DateTime<Utc>>) {
        match self.body.get("published") {
            None => {}
            Some(Value::Null) => *slot = None,
            Some(Value::String(s)) if s.trim().is_empty() => *slot = None,
            Some(Value::String(s)) => match parse_datetime_iso(s) {
                Some(dt) => *slot = Some(dt),
                None => self.errors.add("published", BAD_DATETIME),
            },
            Some(_) => self.errors.add("published", BAD_DATETIME),
        }
    }
}

fn is_valid_url(text: &str) -> bool {
    match Url::parse(text) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https" | "ftp" | "ftps") && url.host().is_some()
        }
        Err(_) => false,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
