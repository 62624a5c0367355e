//! Article record and its component parts, as normalized from EFetch XML.

use serde::{Deserialize, Serialize};

/// A single article author
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub initials: Option<String>,
    pub affiliation: Option<String>,
}

impl Author {
    /// Display form used in summaries: "Last Initials" when both exist,
    /// otherwise whatever part is present.
    pub fn full_name(&self) -> String {
        match (&self.last_name, &self.initials) {
            (Some(last), Some(initials)) => format!("{} {}", last, initials),
            (Some(last), None) => last.clone(),
            (None, _) => self.first_name.clone().unwrap_or_default(),
        }
    }
}

/// Journal metadata attached to an article
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    pub title: Option<String>,
    pub iso_abbreviation: Option<String>,
    pub issn: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
}

impl Journal {
    /// Abbreviated name if available, else the full title.
    pub fn short_name(&self) -> Option<&str> {
        self.iso_abbreviation
            .as_deref()
            .or(self.title.as_deref())
    }
}

/// A MeSH descriptor with its major-topic flag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshTerm {
    pub descriptor: String,
    pub major_topic: bool,
}

/// Publication date, kept as separate parts since PubMed records are
/// frequently year-only or year-month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PubDate {
    pub year: Option<String>,
    pub month: Option<String>,
    pub day: Option<String>,
}

impl PubDate {
    /// Render as "YYYY/MM/DD", dropping trailing parts that are absent.
    pub fn display(&self) -> String {
        let mut parts = Vec::new();
        if let Some(y) = &self.year {
            parts.push(y.as_str());
            if let Some(m) = &self.month {
                parts.push(m.as_str());
                if let Some(d) = &self.day {
                    parts.push(d.as_str());
                }
            }
        }
        parts.join("/")
    }

    pub fn is_empty(&self) -> bool {
        self.year.is_none()
    }
}

/// Normalized PubMed article
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub pmid: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    pub authors: Vec<Author>,
    pub journal: Journal,
    pub pub_date: PubDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pmc_id: Option<String>,
    pub article_types: Vec<String>,
    pub mesh_terms: Vec<MeshTerm>,
    pub keywords: Vec<String>,
    pub languages: Vec<String>,
}

impl Article {
    pub fn builder(pmid: impl Into<String>) -> ArticleBuilder {
        ArticleBuilder {
            article: Article {
                pmid: pmid.into(),
                ..Default::default()
            },
        }
    }

    /// Canonical PubMed URL for this article
    pub fn url(&self) -> String {
        format!("https://pubmed.ncbi.nlm.nih.gov/{}/", self.pmid)
    }
}

/// Builder used by the XML normalizer
#[derive(Debug)]
pub struct ArticleBuilder {
    article: Article,
}

impl ArticleBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.article.title = title.into();
        self
    }

    pub fn abstract_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.article.abstract_text = Some(text);
        }
        self
    }

    pub fn author(mut self, author: Author) -> Self {
        self.article.authors.push(author);
        self
    }

    pub fn journal(mut self, journal: Journal) -> Self {
        self.article.journal = journal;
        self
    }

    pub fn pub_date(mut self, pub_date: PubDate) -> Self {
        self.article.pub_date = pub_date;
        self
    }

    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.article.doi = Some(doi.into());
        self
    }

    pub fn pmc_id(mut self, pmc_id: impl Into<String>) -> Self {
        self.article.pmc_id = Some(pmc_id.into());
        self
    }

    pub fn article_type(mut self, kind: impl Into<String>) -> Self {
        self.article.article_types.push(kind.into());
        self
    }

    pub fn mesh_term(mut self, term: MeshTerm) -> Self {
        self.article.mesh_terms.push(term);
        self
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.article.keywords.push(keyword.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.article.languages.push(language.into());
        self
    }

    pub fn build(self) -> Article {
        self.article
    }
}
