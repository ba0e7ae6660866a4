//! SQLite schema definition

/// SQL schema for the insights database.
///
/// No uniqueness constraint: loading the same file twice stores every record
/// twice.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS insights (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    end_year INTEGER,
    intensity INTEGER NOT NULL DEFAULT 0,
    sector TEXT NOT NULL DEFAULT '',
    topic TEXT NOT NULL,
    insight TEXT NOT NULL,
    url TEXT NOT NULL,
    region TEXT NOT NULL DEFAULT '',
    start_year INTEGER,
    impact TEXT NOT NULL DEFAULT '',
    published TEXT,
    country TEXT NOT NULL DEFAULT '',
    relevance INTEGER NOT NULL DEFAULT 0,
    pestle TEXT,
    source TEXT NOT NULL,
    title TEXT NOT NULL,
    likelihood INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_insights_topic ON insights(topic);
CREATE INDEX IF NOT EXISTS idx_insights_country ON insights(country);
CREATE INDEX IF NOT EXISTS idx_insights_end_year ON insights(end_year);
"#;
