//! List, show and delete commands

use crate::error::{Error, Result};
use crate::filter::FilterParams;
use crate::models::Insight;
use crate::store::InsightStore;
use tracing::info;

/// List insights matching the given criteria
pub async fn cmd_list(store: &InsightStore, params: FilterParams) -> Result<Vec<Insight>> {
    let filter = params.into_filter()?;
    let fields: Vec<String> = filter
        .predicates()
        .iter()
        .map(|p| p.field.to_string())
        .collect();
    info!(?fields, "Listing insights");
    store.list_insights(&filter).await
}

/// Fetch one insight
pub async fn cmd_show(store: &InsightStore, id: i64) -> Result<Insight> {
    store
        .get_insight(id)
        .await?
        .ok_or(Error::InsightNotFound(id))
}

/// Delete one insight
pub async fn cmd_delete(store: &InsightStore, id: i64) -> Result<()> {
    if store.delete_insight(id).await? {
        info!(id, "Deleted insight");
        Ok(())
    } else {
        Err(Error::InsightNotFound(id))
    }
}

/// Print a compact table of insights
pub fn print_insights(insights: &[Insight]) {
    if insights.is_empty() {
        println!("No insights match.");
        return;
    }

    for insight in insights {
        let years = match (insight.start_year, insight.end_year) {
            (Some(start), Some(end)) => format!("{start}-{end}"),
            (None, Some(end)) => format!("-{end}"),
            (Some(start), None) => format!("{start}-"),
            (None, None) => String::new(),
        };
        println!(
            "#{:<6} {:<20} {:<24} {:<10} {}",
            insight.id,
            truncate(&insight.topic, 20),
            truncate(&insight.country, 24),
            years,
            truncate(&insight.title, 60)
        );
    }
    println!("\n{} insight(s)", insights.len());
}

/// Print every field of one insight
pub fn print_insight(insight: &Insight) {
    println!("\n#{} {}\n", insight.id, insight.title);
    println!("Topic:      {}", insight.topic);
    println!("Sector:     {}", insight.sector);
    println!("Region:     {}", insight.region);
    println!("Country:    {}", insight.country);
    println!("PESTLE:     {}", insight.pestle.as_deref().unwrap_or("-"));
    println!("Source:     {}", insight.source);
    println!("URL:        {}", insight.url);
    println!(
        "Years:      {} - {}",
        opt(insight.start_year),
        opt(insight.end_year)
    );
    println!(
        "Scores:     intensity {}, likelihood {}, relevance {}",
        insight.intensity, insight.likelihood, insight.relevance
    );
    println!(
        "Published:  {}",
        insight.published.as_deref().unwrap_or("-")
    );
    println!("\n{}", insight.insight);
    if !insight.impact.is_empty() {
        println!("\nImpact: {}", insight.impact);
    }
}

fn opt(value: Option<i64>) -> String {
    value.map_or_else(|| "?".to_string(), |v| v.to_string())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}
