//! PMID validation and extraction helpers.

use std::sync::OnceLock;

use regex::Regex;

/// PMIDs are 7 to 9 digits.
pub fn validate_pmid(pmid: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^\d{7,9}$").unwrap());
    re.is_match(pmid)
}

/// Pull candidate PMIDs (8-9 digit runs) out of free text.
pub fn extract_pmids(text: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\b\d{8,9}\b").unwrap());
    re.find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|p| validate_pmid(p))
        .collect()
}
