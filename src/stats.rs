// src/stats.rs
//! Aggregations behind the statistics view. Pure functions over a loaded
//! record set; the HTTP layer shapes the output.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::model::NewsRecord;

/// Records per source over the trailing seven days (inclusive of the window
/// start), busiest source first; ties break alphabetically.
pub fn source_counts_last_week(
    records: &[NewsRecord],
    now: DateTime<Utc>,
) -> Vec<(String, usize)> {
    let cutoff = now - Duration::days(7);

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for rec in records {
        if rec.date >= cutoff {
            *counts.entry(rec.source.as_str()).or_insert(0) += 1;
        }
    }

    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(source, n)| (source.to_string(), n))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

/// Records per calendar day (UTC), oldest day first.
pub fn daily_counts(records: &[NewsRecord]) -> Vec<(NaiveDate, usize)> {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for rec in records {
        *counts.entry(rec.date.date_naive()).or_insert(0) += 1;
    }
    counts.into_iter().collect()
}

/* ----------------------------
Tests
---------------------------- */
