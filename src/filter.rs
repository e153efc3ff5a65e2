// src/filter.rs
//! Filter engine: pure functions over a loaded record set. Keyword/weight
//! matching, free-text search, source/domain/kind filters, inclusive date
//! range, and one stable sort. No I/O, no failure paths; the HTTP layer
//! validates input before it gets here.

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{NewsRecord, SortKey, SortOrder};

/// One keyword criterion: retain a record when `keyword` occurs at least
/// `min_count` times in the markup-stripped, lowercased body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub min_count: u32,
}

impl KeywordRule {
    pub fn new(keyword: impl Into<String>, min_count: u32) -> Self {
        Self {
            keyword: keyword.into(),
            min_count,
        }
    }
}

/// Everything one list request can ask for. Filters compose as intersections;
/// empty/`None` members disable their stage.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub keywords: Vec<KeywordRule>,
    pub search: Option<String>,
    pub sources: Vec<String>,
    pub domain: Option<String>,
    pub kind: Option<String>,
    /// Inclusive on both ends; both bounds required to activate.
    pub date_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
}

/// Decode HTML entities, drop tags, collapse whitespace. What remains is the
/// text the keyword counters run against.
pub fn strip_markup(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Registrable domain of a URL: subdomains stripped, public suffix kept.
/// `https://news.example.co.uk/a` and `https://www.news.example.co.uk/b`
/// both yield `example.co.uk`. `None` for unparseable URLs, bare IPs, or
/// hosts without a known public suffix.
pub fn extract_domain(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    psl::domain_str(host).map(|d| d.to_string())
}

/// Non-overlapping, case-insensitive occurrence count of `keyword` in `text`.
/// `text` is expected to be lowercased already.
fn count_occurrences(text: &str, keyword: &str) -> u32 {
    let needle = keyword.to_lowercase();
    if needle.is_empty() {
        return 0;
    }
    text.matches(needle.as_str()).count() as u32
}

/// Keyword/weight match. OR across rules: a record survives when at least one
/// rule meets its threshold; every keyword that met its threshold lands in
/// `matched_keywords`. Rules with an empty keyword are ignored; with no
/// usable rules every record passes with empty `matched_keywords`.
pub fn filter_by_keywords(records: Vec<NewsRecord>, rules: &[KeywordRule]) -> Vec<NewsRecord> {
    let rules: Vec<&KeywordRule> = rules
        .iter()
        .filter(|r| !r.keyword.trim().is_empty())
        .collect();

    let mut out = Vec::with_capacity(records.len());
    for mut rec in records {
        if rules.is_empty() {
            rec.matched_keywords = Vec::new();
            out.push(rec);
            continue;
        }

        let plain = strip_markup(&rec.content).to_lowercase();
        let mut matched = Vec::new();
        for rule in &rules {
            if count_occurrences(&plain, &rule.keyword) >= rule.min_count {
                matched.push(rule.keyword.clone());
            }
        }
        if !matched.is_empty() {
            rec.matched_keywords = matched;
            out.push(rec);
        }
    }
    out
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Free-text search over titles and bodies, localized and source-language.
fn matches_search(rec: &NewsRecord, term_lower: &str) -> bool {
    contains_ci(&rec.title, term_lower)
        || rec
            .title_localized
            .as_deref()
            .is_some_and(|t| contains_ci(t, term_lower))
        || contains_ci(&rec.content, term_lower)
        || rec
            .content_localized
            .as_deref()
            .is_some_and(|t| contains_ci(t, term_lower))
}

/// Stable sort by the requested key. `Title` compares the localized title,
/// falling back to the source title when none is stored.
pub fn sort_records(records: &mut [NewsRecord], key: SortKey, order: SortOrder) {
    use std::cmp::Ordering;

    records.sort_by(|a, b| {
        let ord = match key {
            SortKey::Date => a.date.cmp(&b.date),
            SortKey::Title => {
                let ta = a.title_localized.as_deref().unwrap_or(&a.title);
                let tb = b.title_localized.as_deref().unwrap_or(&b.title);
                ta.cmp(tb)
            }
            SortKey::Source => a.source.cmp(&b.source),
            SortKey::Score => a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal),
        };
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

/// Full pipeline: keyword filter, text search, source allow-list, domain,
/// kind, date range, then the sort. The transient `domain` field is
/// recomputed for every record that enters the pipeline.
pub fn apply(records: Vec<NewsRecord>, criteria: &FilterCriteria) -> Vec<NewsRecord> {
    // Keyword stage first; it is the only stage that annotates records.
    let mut records = filter_by_keywords(records, &criteria.keywords);

    for rec in records.iter_mut() {
        rec.domain = extract_domain(&rec.url);
    }

    if let Some(term) = criteria.search.as_deref() {
        let term = term.trim().to_lowercase();
        if !term.is_empty() {
            records.retain(|r| matches_search(r, &term));
        }
    }

    if !criteria.sources.is_empty() {
        records.retain(|r| criteria.sources.iter().any(|s| s == &r.source));
    }

    if let Some(domain) = criteria.domain.as_deref() {
        records.retain(|r| r.domain.as_deref() == Some(domain));
    }

    if let Some(kind) = criteria.kind.as_deref() {
        records.retain(|r| r.kind == kind);
    }

    if let Some((from, to)) = criteria.date_range {
        records.retain(|r| from <= r.date && r.date <= to);
    }

    sort_records(&mut records, criteria.sort_key, criteria.sort_order);
    records
}

/* ----------------------------
Tests
---------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rec(id: i64, title: &str, content: &str) -> NewsRecord {
        NewsRecord {
            id,
            title: title.to_string(),
            title_localized: None,
            date: Utc.with_ymd_and_hms(2026, 8, 20, 12, 0, 0).unwrap(),
            content: content.to_string(),
            content_localized: None,
            url: "https://news.example.com/a".to_string(),
            author: String::new(),
            views: 0,
            source: "wire".to_string(),
            summary: None,
            summary_localized: None,
            score: 0.0,
            kind: "news".to_string(),
            domain: None,
            matched_keywords: Vec::new(),
        }
    }

    #[test]
    fn strip_markup_decodes_and_drops_tags() {
        let s = strip_markup("<p>Gold &amp; silver <b>rally</b></p>");
        assert_eq!(s, "Gold & silver rally");
    }

    #[test]
    fn strip_markup_collapses_whitespace() {
        assert_eq!(strip_markup("a\n\n  b\t c"), "a b c");
    }

    #[test]
    fn keyword_threshold_two_vs_three() {
        // "gold" occurs exactly twice.
        let records = vec![rec(1, "t", "Gold price rises as gold demand grows.")];

        let kept = filter_by_keywords(records.clone(), &[KeywordRule::new("gold", 2)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].matched_keywords, vec!["gold".to_string()]);

        let kept = filter_by_keywords(records, &[KeywordRule::new("gold", 3)]);
        assert!(kept.is_empty());
    }

    #[test]
    fn keyword_counting_ignores_markup() {
        // Tag-split occurrences still count: <b>gold</b> ... gold -> 2.
        let records = vec![rec(1, "t", "<b>gold</b> price of gold")];
        let kept = filter_by_keywords(records, &[KeywordRule::new("gold", 2)]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn keyword_rules_are_or_combined() {
        let records = vec![
            rec(1, "a", "silver coins"),
            rec(2, "b", "gold bars"),
            rec(3, "c", "copper wire"),
        ];
        let rules = [KeywordRule::new("gold", 1), KeywordRule::new("silver", 1)];
        let kept = filter_by_keywords(records, &rules);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].matched_keywords, vec!["silver".to_string()]);
        assert_eq!(kept[1].matched_keywords, vec!["gold".to_string()]);
    }

    #[test]
    fn empty_rule_list_keeps_everything() {
        let records = vec![rec(1, "a", "x"), rec(2, "b", "y")];
        let kept = filter_by_keywords(records, &[]);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|r| r.matched_keywords.is_empty()));
    }

    #[test]
    fn blank_keywords_are_ignored() {
        let records = vec![rec(1, "a", "no match here")];
        // Only blank rules -> same as no rules at all.
        let kept = filter_by_keywords(records, &[KeywordRule::new("  ", 1)]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn matched_keywords_recomputed_each_pass() {
        let mut r = rec(1, "a", "gold gold");
        r.matched_keywords = vec!["stale".to_string()];
        let kept = filter_by_keywords(vec![r], &[KeywordRule::new("gold", 1)]);
        assert_eq!(kept[0].matched_keywords, vec!["gold".to_string()]);
    }

    #[test]
    fn extract_domain_strips_subdomains() {
        assert_eq!(
            extract_domain("https://news.example.co.uk/a"),
            Some("example.co.uk".to_string())
        );
        assert_eq!(
            extract_domain("https://www.news.example.co.uk/b"),
            Some("example.co.uk".to_string())
        );
    }

    #[test]
    fn extract_domain_rejects_junk() {
        assert_eq!(extract_domain("not a url"), None);
        assert_eq!(extract_domain("https://192.168.0.1/x"), None);
    }

    #[test]
    fn search_matches_localized_title() {
        let mut r = rec(1, "Gold steady", "body");
        r.title_localized = Some("Zlato beze zmeny".to_string());
        let criteria = FilterCriteria {
            search: Some("zlato".to_string()),
            ..Default::default()
        };
        let kept = apply(vec![r], &criteria);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn source_allow_list_filters_exactly() {
        let mut a = rec(1, "a", "x");
        a.source = "reuters".to_string();
        let mut b = rec(2, "b", "y");
        b.source = "ap".to_string();
        let criteria = FilterCriteria {
            sources: vec!["reuters".to_string()],
            ..Default::default()
        };
        let kept = apply(vec![a, b], &criteria);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, 1);
    }

    #[test]
    fn date_range_is_inclusive_on_both_ends() {
        let mut a = rec(1, "a", "x");
        a.date = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
        let mut b = rec(2, "b", "y");
        b.date = Utc.with_ymd_and_hms(2026, 8, 10, 0, 0, 0).unwrap();
        let mut c = rec(3, "c", "z");
        c.date = Utc.with_ymd_and_hms(2026, 8, 11, 0, 0, 0).unwrap();

        let criteria = FilterCriteria {
            date_range: Some((
                Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2026, 8, 10, 0, 0, 0).unwrap(),
            )),
            ..Default::default()
        };
        let kept = apply(vec![a, b, c], &criteria);
        let ids: Vec<i64> = kept.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]); // default sort: date desc
    }

    #[test]
    fn domain_is_recomputed_during_apply() {
        let mut r = rec(1, "a", "x");
        r.url = "https://markets.example.org/story".to_string();
        let kept = apply(vec![r], &FilterCriteria::default());
        assert_eq!(kept[0].domain.as_deref(), Some("example.org"));
    }

    #[test]
    fn sort_by_score_desc_and_title_asc() {
        let mut a = rec(1, "beta", "x");
        a.score = 0.2;
        let mut b = rec(2, "alpha", "y");
        b.score = 0.9;

        let mut recs = vec![a.clone(), b.clone()];
        sort_records(&mut recs, SortKey::Score, SortOrder::Desc);
        assert_eq!(recs[0].id, 2);

        let mut recs = vec![a, b];
        sort_records(&mut recs, SortKey::Title, SortOrder::Asc);
        assert_eq!(recs[0].id, 2); // "alpha" < "beta"
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let a = rec(1, "same", "x");
        let b = rec(2, "same", "y");
        let mut recs = vec![a, b];
        sort_records(&mut recs, SortKey::Date, SortOrder::Asc);
        let ids: Vec<i64> = recs.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
