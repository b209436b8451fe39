//! Keyword search over document page text.
//!
//! The database does the phrase matching (trigger-maintained tsvector, GIN
//! index); everything that can be computed without a connection lives here
//! as plain functions so it stays unit-testable.

mod service;

pub use service::{DocumentSelector, SearchQuery, SearchService};

use crate::models::{PageText, SearchHit};

/// Extract the entity code from a `code|label` form value.
/// Only the first pipe segment is meaningful; the rest is display text.
pub fn parse_entity_param(raw: &str) -> Option<String> {
    let code = raw.split('|').next().unwrap_or("").trim();
    if code.is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}

/// Split a pipe-delimited keyword list, dropping blank entries.
/// Keywords are kept verbatim; matching and counting handle case.
pub fn parse_keyword_list(raw: &str) -> Vec<String> {
    raw.split('|')
        .filter(|kw| !kw.trim().is_empty())
        .map(|kw| kw.to_string())
        .collect()
}

/// Case-insensitive non-overlapping count of `keyword` in `text`.
pub fn count_occurrences(text: &str, keyword: &str) -> i64 {
    let needle = keyword.to_lowercase();
    if needle.is_empty() {
        return 0;
    }
    text.to_lowercase().matches(&needle).count() as i64
}

/// Expand matched pages into the hits × keywords cross product.
///
/// Every matched page yields one hit per keyword in the original list,
/// counting that keyword's occurrences in the page regardless of which
/// keyword the page matched on. Order: pages in the order they were
/// collected, keywords in list order. No dedup, no ranking.
pub fn expand_hits(matched: &[PageText], keywords: &[String]) -> Vec<SearchHit> {
    let mut hits = Vec::with_capacity(matched.len() * keywords.len());
    for page in matched {
        for kw in keywords {
            if kw.trim().is_empty() {
                continue;
            }
            hits.push(SearchHit {
                url: page.url.clone(),
                page_number: page.page_number,
                keyword: kw.clone(),
                occurrence_count: count_occurrences(&page.page_text, kw),
                page_text: page.page_text.clone(),
            });
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, page_number: i32, text: &str) -> PageText {
        PageText {
            id: 0,
            url: url.to_string(),
            page_number,
            page_text: text.to_string(),
        }
    }

    #[test]
    fn test_parse_entity_param() {
        assert_eq!(
            parse_entity_param("OEB | Ontario Energy Board"),
            Some("OEB".to_string())
        );
        assert_eq!(parse_entity_param("OEB"), Some("OEB".to_string()));
        assert_eq!(parse_entity_param(""), None);
        assert_eq!(parse_entity_param("  | label"), None);
    }

    #[test]
    fn test_parse_keyword_list_skips_blanks() {
        assert_eq!(
            parse_keyword_list("complaint|rate"),
            vec!["complaint", "rate"]
        );
        assert_eq!(parse_keyword_list("complaint||  |rate"), vec!["complaint", "rate"]);
        assert!(parse_keyword_list("").is_empty());
        assert!(parse_keyword_list("  |   ").is_empty());
    }

    #[test]
    fn test_count_occurrences_case_insensitive() {
        assert_eq!(count_occurrences("Rate rate RATE", "rate"), 3);
        assert_eq!(count_occurrences("Rate rate RATE", "Rate"), 3);
        assert_eq!(count_occurrences("no match here", "rate"), 0);
        assert_eq!(count_occurrences("", "rate"), 0);
        assert_eq!(count_occurrences("anything", ""), 0);
    }

    #[test]
    fn test_count_occurrences_is_substring_count() {
        // Literal substring semantics, not token match.
        assert_eq!(count_occurrences("rates rated rate", "rate"), 3);
    }

    #[test]
    fn test_expand_hits_cross_product() {
        let keywords = vec!["complaint".to_string(), "rate".to_string()];
        // One page matched the phrase query for "complaint"; no page
        // matched "rate". Both keywords are still counted on that page.
        let matched = vec![page("http://a/doc.pdf", 3, "a complaint about the rate")];

        let hits = expand_hits(&matched, &keywords);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].keyword, "complaint");
        assert_eq!(hits[0].occurrence_count, 1);
        assert_eq!(hits[1].keyword, "rate");
        assert_eq!(hits[1].occurrence_count, 1);
        assert!(hits.iter().all(|h| h.url == "http://a/doc.pdf"));
    }

    #[test]
    fn test_expand_hits_keeps_encounter_order() {
        let keywords = vec!["gas".to_string(), "hydro".to_string()];
        let matched = vec![
            page("http://a", 1, "gas gas"),
            page("http://b", 2, "hydro"),
        ];

        let hits = expand_hits(&matched, &keywords);
        let seen: Vec<(&str, &str)> = hits
            .iter()
            .map(|h| (h.url.as_str(), h.keyword.as_str()))
            .collect();
        assert_eq!(
            seen,
            vec![
                ("http://a", "gas"),
                ("http://a", "hydro"),
                ("http://b", "gas"),
                ("http://b", "hydro"),
            ]
        );
        assert_eq!(hits[0].occurrence_count, 2);
        assert_eq!(hits[1].occurrence_count, 0);
    }

    #[test]
    fn test_expand_hits_empty_inputs() {
        assert!(expand_hits(&[], &["rate".to_string()]).is_empty());
        assert!(expand_hits(&[page("u", 1, "t")], &[]).is_empty());
    }
}
