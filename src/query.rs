//! Compiles [`SearchCriteria`] into the PubMed term-query language.
//!
//! The term grammar groups each populated field filter in parentheses and
//! joins groups with ` AND `:
//!
//! ```text
//! ("heart attack") AND ("Smith J"[Author] OR "Jones K"[Author])
//!   AND ("2020/01/01"[Date - Publication] : "2021/01/01"[Date - Publication])
//! ```
//!
//! Sort order is never part of the term; it travels as the separate `sort`
//! E-utilities parameter.

use chrono::{Duration, NaiveDate};

use crate::error::Error;
use crate::models::SearchCriteria;

/// Compile criteria into a term string. `today` anchors relative date
/// ranges so compilation is deterministic; production passes
/// `Utc::now().date_naive()`.
pub fn build_term(criteria: &SearchCriteria, today: NaiveDate) -> Result<String, Error> {
    let query = criteria.query.trim();
    let has_field_filters = !criteria.authors.is_empty()
        || !criteria.journals.is_empty()
        || !criteria.mesh_terms.is_empty()
        || !criteria.article_types.is_empty();

    if query.is_empty() && !has_field_filters {
        return Err(Error::InvalidCriteria(
            "search requires a query or at least one field filter".to_string(),
        ));
    }

    let mut parts = Vec::new();
    if !query.is_empty() {
        parts.push(format!("({})", query));
    }

    push_group(&mut parts, &criteria.authors, "Author");
    push_group(&mut parts, &criteria.journals, "Journal");
    push_group(&mut parts, &criteria.mesh_terms, "MeSH Terms");
    push_group(&mut parts, &criteria.article_types, "Publication Type");

    if let Some(clause) = date_clause(criteria, today) {
        parts.push(clause);
    }

    if let Some(language) = criteria.language.as_deref().filter(|l| !l.is_empty()) {
        parts.push(format!("\"{}\"[Language]", language));
    }
    if criteria.has_abstract == Some(true) {
        parts.push("hasabstract[text word]".to_string());
    }
    if criteria.has_full_text == Some(true) {
        parts.push("free full text[sb]".to_string());
    }
    if criteria.humans_only == Some(true) {
        parts.push("humans[MeSH Terms]".to_string());
    }

    Ok(parts.join(" AND "))
}

fn push_group(parts: &mut Vec<String>, values: &[String], tag: &str) {
    let clauses: Vec<String> = values
        .iter()
        .filter(|v| !v.trim().is_empty())
        .map(|v| format!("\"{}\"[{}]", v.trim(), tag))
        .collect();
    match clauses.len() {
        0 => {}
        _ => parts.push(format!("({})", clauses.join(" OR "))),
    }
}

fn date_clause(criteria: &SearchCriteria, today: NaiveDate) -> Option<String> {
    let (from, to) = resolve_dates(criteria, today);
    match (from, to) {
        (Some(from), Some(to)) => Some(format!(
            "(\"{}\"[Date - Publication] : \"{}\"[Date - Publication])",
            from, to
        )),
        (Some(from), None) => Some(format!(
            "\"{}\"[Date - Publication] : \"3000\"[Date - Publication]",
            from
        )),
        (None, Some(to)) => Some(format!(
            "\"1800\"[Date - Publication] : \"{}\"[Date - Publication]",
            to
        )),
        (None, None) => None,
    }
}

/// Explicit from/to win over a named range; a named range resolves to a
/// window ending at `today`.
fn resolve_dates(
    criteria: &SearchCriteria,
    today: NaiveDate,
) -> (Option<String>, Option<String>) {
    if criteria.date_from.is_some() || criteria.date_to.is_some() {
        return (criteria.date_from.clone(), criteria.date_to.clone());
    }
    match criteria.date_range.and_then(|r| r.days()) {
        Some(days) => {
            let from = today - Duration::days(days);
            (
                Some(from.format("%Y/%m/%d").to_string()),
                Some(today.format("%Y/%m/%d").to_string()),
            )
        }
        None => (None, None),
    }
}
