//! Search criteria and result envelope.

use serde::{Deserialize, Serialize};

use super::article::Article;

/// Result ordering accepted by ESearch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Relevance,
    PubDate,
    Author,
    Journal,
    Title,
}

impl SortOrder {
    /// Value passed as the `sort` query parameter. Relevance is ESearch's
    /// default and sends no parameter.
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            SortOrder::Relevance => None,
            SortOrder::PubDate => Some("pub_date"),
            SortOrder::Author => Some("author"),
            SortOrder::Journal => Some("journal"),
            SortOrder::Title => Some("title"),
        }
    }
}

/// Predefined relative date windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateRange {
    #[serde(rename = "1y")]
    LastYear,
    #[serde(rename = "5y")]
    LastFiveYears,
    #[serde(rename = "10y")]
    LastTenYears,
    #[serde(rename = "all")]
    All,
}

impl DateRange {
    /// Window length in days, or None for `All`.
    pub fn days(&self) -> Option<i64> {
        match self {
            DateRange::LastYear => Some(365),
            DateRange::LastFiveYears => Some(1825),
            DateRange::LastTenYears => Some(3650),
            DateRange::All => None,
        }
    }
}

/// Everything a caller can constrain a search by. Compiled into a PubMed
/// term string by [`crate::query::build_term`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub query: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub article_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub journals: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mesh_terms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_abstract: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_full_text: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humans_only: Option<bool>,
}

fn default_max_results() -> usize {
    20
}

impl SearchCriteria {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: default_max_results(),
            ..Default::default()
        }
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn date_from(mut self, date: impl Into<String>) -> Self {
        self.date_from = Some(date.into());
        self
    }

    pub fn date_to(mut self, date: impl Into<String>) -> Self {
        self.date_to = Some(date.into());
        self
    }

    pub fn date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn journal(mut self, journal: impl Into<String>) -> Self {
        self.journals.push(journal.into());
        self
    }

    pub fn mesh_term(mut self, term: impl Into<String>) -> Self {
        self.mesh_terms.push(term.into());
        self
    }

    pub fn article_type(mut self, kind: impl Into<String>) -> Self {
        self.article_types.push(kind.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn has_abstract(mut self, yes: bool) -> Self {
        self.has_abstract = Some(yes);
        self
    }

    pub fn has_full_text(mut self, yes: bool) -> Self {
        self.has_full_text = Some(yes);
        self
    }

    pub fn humans_only(mut self, yes: bool) -> Self {
        self.humans_only = Some(yes);
        self
    }
}

/// Search response: the normalized articles plus search metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: String,
    pub total_results: usize,
    pub returned_results: usize,
    pub articles: Vec<Article>,
    /// Wall-clock seconds spent servicing the search
    pub search_time: f64,
}

/// Supported citation output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationFormat {
    Bibtex,
    Apa,
    Mla,
    Chicago,
    Vancouver,
    Endnote,
    Ris,
}

impl std::str::FromStr for CitationFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bibtex" => Ok(CitationFormat::Bibtex),
            "apa" => Ok(CitationFormat::Apa),
            "mla" => Ok(CitationFormat::Mla),
            "chicago" => Ok(CitationFormat::Chicago),
            "vancouver" => Ok(CitationFormat::Vancouver),
            "endnote" => Ok(CitationFormat::Endnote),
            "ris" => Ok(CitationFormat::Ris),
            other => Err(format!("unknown citation format: {}", other)),
        }
    }
}

impl std::fmt::Display for CitationFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CitationFormat::Bibtex => "bibtex",
            CitationFormat::Apa => "apa",
            CitationFormat::Mla => "mla",
            CitationFormat::Chicago => "chicago",
            CitationFormat::Vancouver => "vancouver",
            CitationFormat::Endnote => "endnote",
            CitationFormat::Ris => "ris",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criteria_builder() {
        let criteria = SearchCriteria::new("diabetes")
            .max_results(50)
            .sort_order(SortOrder::PubDate)
            .author("Smith J")
            .journal("Lancet")
            .has_abstract(true);

        assert_eq!(criteria.query, "diabetes");
        assert_eq!(criteria.max_results, 50);
        assert_eq!(criteria.sort_order, SortOrder::PubDate);
        assert_eq!(criteria.authors, vec!["Smith J"]);
        assert_eq!(criteria.has_abstract, Some(true));
    }

    #[test]
    fn test_sort_order_param() {
        assert_eq!(SortOrder::Relevance.as_param(), None);
        assert_eq!(SortOrder::PubDate.as_param(), Some("pub_date"));
    }

    #[test]
    fn test_date_range_days() {
        assert_eq!(DateRange::LastYear.days(), Some(365));
        assert_eq!(DateRange::LastFiveYears.days(), Some(1825));
        assert_eq!(DateRange::LastTenYears.days(), Some(3650));
        assert_eq!(DateRange::All.days(), None);
    }

    #[test]
    fn test_citation_format_parse() {
        assert_eq!(
            "RIS".parse::<CitationFormat>().unwrap(),
            CitationFormat::Ris
        );
        assert!("wordperfect".parse::<CitationFormat>().is_err());
    }

    #[test]
    fn test_criteria_deserializes_with_defaults() {
        let criteria: SearchCriteria =
            serde_json::from_str(r#"{"query": "cancer"}"#).unwrap();
        assert_eq!(criteria.max_results, 20);
        assert_eq!(criteria.sort_order, SortOrder::Relevance);
        assert!(criteria.authors.is_empty());
    }

    #[test]
    fn test_date_range_serde_names() {
        let range: DateRange = serde_json::from_str(r#""5y""#).unwrap();
        assert_eq!(range, DateRange::LastFiveYears);
    }
}
