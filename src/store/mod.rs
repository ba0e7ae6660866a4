//! Insight storage using SQLite
//!
//! One table, `insights`, holding the rows described by [`Insight`]. Every
//! write is its own statement; nothing here opens a transaction.

mod schema;

pub use schema::*;

use crate::config::Config;
use crate::error::Result;
use crate::filter::InsightFilter;
use crate::models::{Insight, NewInsight};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use std::path::Path;
use tracing::{debug, info};

const INSERT_SQL: &str = r#"
INSERT INTO insights (
    end_year, intensity, sector, topic, insight, url, region, start_year,
    impact, published, country, relevance, pestle, source, title, likelihood
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
RETURNING *
"#;

const UPDATE_SQL: &str = r#"
UPDATE insights SET
    end_year = ?,
    intensity = ?,
    sector = ?,
    topic = ?,
    insight = ?,
    url = ?,
    region = ?,
    start_year = ?,
    impact = ?,
    published = ?,
    country = ?,
    relevance = ?,
    pestle = ?,
    source = ?,
    title = ?,
    likelihood = ?
WHERE id = ?
RETURNING *
"#;

/// Insight database handle
#[derive(Clone)]
pub struct InsightStore {
    pool: SqlitePool,
}

impl InsightStore {
    /// Connect to the database named in the config
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::open(&config.paths.db_file, config.database.max_connections).await
    }

    /// Connect to the database and create the schema if it is missing
    pub async fn new(config: &Config) -> Result<Self> {
        let store = Self::connect(config).await?;
        if !store.is_initialized().await? {
            store.init_schema().await?;
        }
        Ok(store)
    }

    async fn open(db_path: &Path, max_connections: u32) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if database is initialized
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type='table' AND name='insights'")
                .fetch_optional(&self.pool)
                .await?;
        Ok(result.is_some())
    }

    /// Insert a row and return it with its assigned id
    pub async fn insert_insight(&self, new: &NewInsight) -> Result<Insight> {
        let row = sqlx::query_as::<_, Insight>(INSERT_SQL)
            .bind(new.end_year)
            .bind(new.intensity)
            .bind(&new.sector)
            .bind(&new.topic)
            .bind(&new.insight)
            .bind(&new.url)
            .bind(&new.region)
            .bind(new.start_year)
            .bind(&new.impact)
            .bind(new.published_text())
            .bind(&new.country)
            .bind(new.relevance)
            .bind(&new.pestle)
            .bind(&new.source)
            .bind(&new.title)
            .bind(new.likelihood)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    /// Get insight by ID
    pub async fn get_insight(&self, id: i64) -> Result<Option<Insight>> {
        let row = sqlx::query_as::<_, Insight>("SELECT * FROM insights WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// List insights matching a filter, in insertion order
    pub async fn list_insights(&self, filter: &InsightFilter) -> Result<Vec<Insight>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM insights");
        filter.push_where(&mut qb);
        qb.push(" ORDER BY id");

        debug!(sql = qb.sql(), "Listing insights");

        let rows = qb
            .build_query_as::<Insight>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Replace every column of a row. Returns `None` if the id does not exist.
    pub async fn update_insight(&self, id: i64, new: &NewInsight) -> Result<Option<Insight>> {
        let row = sqlx::query_as::<_, Insight>(UPDATE_SQL)
            .bind(new.end_year)
            .bind(new.intensity)
            .bind(&new.sector)
            .bind(&new.topic)
            .bind(&new.insight)
            .bind(&new.url)
            .bind(&new.region)
            .bind(new.start_year)
            .bind(&new.impact)
            .bind(new.published_text())
            .bind(&new.country)
            .bind(new.relevance)
            .bind(&new.pestle)
            .bind(&new.source)
            .bind(&new.title)
            .bind(new.likelihood)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Delete a row. Returns whether anything was deleted.
    pub async fn delete_insight(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM insights WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count all rows
    pub async fn count_insights(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM insights")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // ===== Statistics =====

    /// Row count plus the number of distinct values per filter dimension
    pub async fn get_stats(&self) -> Result<InsightStats> {
        let stats = sqlx::query_as::<_, InsightStats>(
            r#"
            SELECT
                COUNT(*) AS insight_count,
                COUNT(DISTINCT NULLIF(topic, '')) AS topic_count,
                COUNT(DISTINCT NULLIF(country, '')) AS country_count,
                COUNT(DISTINCT NULLIF(region, '')) AS region_count,
                COUNT(DISTINCT NULLIF(sector, '')) AS sector_count,
                COUNT(DISTINCT NULLIF(source, '')) AS source_count,
                COUNT(*) - COUNT(published) AS unpublished_count
            FROM insights
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }
}

/// Global statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct InsightStats {
    pub insight_count: i64,
    pub topic_count: i64,
    pub country_count: i64,
    pub region_count: i64,
    pub sector_count: i64,
    pub source_count: i64,
    /// Rows with a null `published`
    pub unpublished_count: i64,
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::filter::{FilterField, FilterParams};
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_insight_crud() {
        let (store, _tmp) = setup_test_store().await;

        let mut new = new_insight("gas", "United States of America", "Northern America");
        new.end_year = Some(2040);
        new.published = Some(Utc.with_ymd_and_hms(2017, 1, 9, 0, 0, 0).unwrap());
        new.pestle = None;

        let created = store.insert_insight(&new).await.unwrap();
        assert!(created.id > 0);
        assert_eq!(created.end_year, Some(2040));
        assert_eq!(created.published.as_deref(), Some("2017-01-09T00:00:00Z"));
        assert_eq!(created.pestle, None);
        assert_eq!(created.to_new(), new);

        let loaded = store.get_insight(created.id).await.unwrap().unwrap();
        assert_eq!(loaded, created);

        new.topic = "oil".to_string();
        let updated = store
            .update_insight(created.id, &new)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.topic, "oil");

        assert!(store.delete_insight(created.id).await.unwrap());
        assert!(!store.delete_insight(created.id).await.unwrap());
        assert!(store.get_insight(created.id).await.unwrap().is_none());
        assert!(store.update_insight(created.id, &new).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (store, _tmp) = setup_test_store().await;

        store
            .insert_insight(&new_insight("energy", "India", "Southern Asia"))
            .await
            .unwrap();
        store
            .insert_insight(&new_insight("Energy", "Brazil", "South America"))
            .await
            .unwrap();
        let mut dated = new_insight("oil", "India", "Southern Asia");
        dated.end_year = Some(2030);
        store.insert_insight(&dated).await.unwrap();

        let all = store.list_insights(&InsightFilter::new()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].id < w[1].id));

        let brazil = store
            .list_insights(&InsightFilter::new().with(FilterField::Country, "razil"))
            .await
            .unwrap();
        assert_eq!(brazil.len(), 1);
        assert_eq!(brazil[0].country, "Brazil");

        let filter = FilterParams {
            topic: Some("energy".to_string()),
            region: Some("Asia".to_string()),
            ..Default::default()
        }
        .into_filter()
        .unwrap();
        let both = store.list_insights(&filter).await.unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].country, "India");
        assert_eq!(both[0].topic, "energy");

        let by_year = store
            .list_insights(&InsightFilter::new().with(FilterField::EndYear, "203"))
            .await
            .unwrap();
        assert_eq!(by_year.len(), 1);
        assert_eq!(by_year[0].topic, "oil");
    }

    #[tokio::test]
    async fn test_sql_and_memory_filters_agree() {
        let (store, _tmp) = setup_test_store().await;
        for (topic, country, region) in [
            ("gas", "Brazil", "South America"),
            ("Gas", "brazil", "Central America"),
            ("oil", "Mexico", "Central America"),
            ("_%", "Niger", "Africa"),
        ] {
            store
                .insert_insight(&new_insight(topic, country, region))
                .await
                .unwrap();
        }

        let all = store.list_insights(&InsightFilter::new()).await.unwrap();
        let filters = [
            InsightFilter::new().with(FilterField::Topic, "GA"),
            InsightFilter::new()
                .with(FilterField::Country, "BRA")
                .with(FilterField::Region, "central"),
            InsightFilter::new().with(FilterField::Topic, "%"),
            InsightFilter::new().with(FilterField::EndYear, "2"),
        ];

        for filter in filters {
            let from_sql: Vec<i64> = store
                .list_insights(&filter)
                .await
                .unwrap()
                .iter()
                .map(|i| i.id)
                .collect();
            let in_memory: Vec<i64> = all
                .iter()
                .filter(|i| filter.matches(i))
                .map(|i| i.id)
                .collect();
            assert_eq!(from_sql, in_memory, "{filter:?}");
        }
    }

    #[tokio::test]
    async fn test_filter_folds_ascii_case_only() {
        let (store, _tmp) = setup_test_store().await;
        let row = store
            .insert_insight(&new_insight("ÉNERGIE", "France", "Western Europe"))
            .await
            .unwrap();

        let ascii = InsightFilter::new().with(FilterField::Topic, "nergie");
        assert_eq!(store.list_insights(&ascii).await.unwrap(), vec![row.clone()]);

        let exact = InsightFilter::new().with(FilterField::Topic, "ÉNERGIE");
        assert_eq!(store.list_insights(&exact).await.unwrap(), vec![row]);

        let folded = InsightFilter::new().with(FilterField::Topic, "énergie");
        assert!(store.list_insights(&folded).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats() {
        let (store, _tmp) = setup_test_store().await;
        assert_eq!(store.get_stats().await.unwrap(), InsightStats::default());

        store
            .insert_insight(&new_insight("gas", "India", "Southern Asia"))
            .await
            .unwrap();
        store
            .insert_insight(&new_insight("gas", "", "Southern Asia"))
            .await
            .unwrap();

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.insight_count, 2);
        assert_eq!(stats.topic_count, 1);
        assert_eq!(stats.country_count, 1);
        assert_eq!(stats.unpublished_count, 2);
        assert_eq!(store.count_insights().await.unwrap(), 2);
    }
}
