//! Normalization of E-utilities responses.
//!
//! EFetch returns PubMed's article XML; ESearch and ELink are requested
//! with `retmode=json`. The XML mapping mirrors the element structure with
//! serde renames (`$text` for element text, `@Name` for attributes).

use quick_xml::de::from_str;
use serde::Deserialize;
use tracing::warn;

use crate::error::Error;
use crate::models::{Article, Author, Journal, MeshTerm, PubDate};

// ---------------------------------------------------------------------------
// ESearch (JSON)

#[derive(Debug, Deserialize)]
struct ESearchEnvelope {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    count: String,
    #[serde(default)]
    idlist: Vec<String>,
}

/// Parsed ESearch response: total match count plus the returned id page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchIds {
    pub total: usize,
    pub pmids: Vec<String>,
}

pub fn parse_esearch(json: &str) -> Result<SearchIds, Error> {
    let envelope: ESearchEnvelope = serde_json::from_str(json)?;
    let total = envelope.esearchresult.count.parse().unwrap_or(0);
    Ok(SearchIds {
        total,
        pmids: envelope.esearchresult.idlist,
    })
}

// ---------------------------------------------------------------------------
// ELink (JSON)

#[derive(Debug, Deserialize)]
struct ELinkEnvelope {
    #[serde(default)]
    linksets: Vec<LinkSet>,
}

#[derive(Debug, Deserialize)]
struct LinkSet {
    #[serde(default)]
    linksetdbs: Vec<LinkSetDb>,
}

#[derive(Debug, Deserialize)]
struct LinkSetDb {
    #[serde(default)]
    linkname: String,
    #[serde(default)]
    links: Vec<serde_json::Value>,
}

/// Extract related PMIDs from an ELink response, excluding `exclude`
/// (the article the query started from).
pub fn parse_elink(json: &str, exclude: &str) -> Result<Vec<String>, Error> {
    let envelope: ELinkEnvelope = serde_json::from_str(json)?;
    let mut pmids = Vec::new();
    for linkset in envelope.linksets {
        for db in linkset.linksetdbs {
            if db.linkname != "pubmed_pubmed" {
                continue;
            }
            for link in db.links {
                let pmid = match link {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Number(n) => n.to_string(),
                    _ => continue,
                };
                if pmid != exclude {
                    pmids.push(pmid);
                }
            }
        }
    }
    Ok(pmids)
}

// ---------------------------------------------------------------------------
// EFetch (XML)

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct PubmedArticleSet {
    #[serde(rename = "PubmedArticle", default)]
    articles: Vec<PubmedArticleXml>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct PubmedArticleXml {
    MedlineCitation: Option<MedlineCitation>,
    PubmedData: Option<PubmedData>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct MedlineCitation {
    PMID: Option<Pmid>,
    Article: Option<ArticleXml>,
    MeshHeadingList: Option<MeshHeadingList>,
    #[serde(rename = "KeywordList", default)]
    keyword_lists: Vec<KeywordList>,
}

#[derive(Debug, Deserialize)]
struct Pmid {
    #[serde(rename = "$text")]
    id: String,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct ArticleXml {
    Journal: Option<JournalXml>,
    ArticleTitle: Option<TextNode>,
    Pagination: Option<Pagination>,
    #[serde(rename = "ELocationID", default)]
    elocation_ids: Vec<ELocationId>,
    Abstract: Option<AbstractXml>,
    AuthorList: Option<AuthorList>,
    #[serde(rename = "Language", default)]
    languages: Vec<TextNode>,
    PublicationTypeList: Option<PublicationTypeList>,
}

#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text")]
    text: String,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JournalXml {
    ISSN: Option<TextNode>,
    JournalIssue: Option<JournalIssue>,
    Title: Option<TextNode>,
    ISOAbbreviation: Option<TextNode>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JournalIssue {
    Volume: Option<TextNode>,
    Issue: Option<TextNode>,
    PubDate: Option<PubDateXml>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct PubDateXml {
    Year: Option<TextNode>,
    Month: Option<TextNode>,
    Day: Option<TextNode>,
    MedlineDate: Option<TextNode>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct Pagination {
    MedlinePgn: Option<TextNode>,
}

#[derive(Debug, Deserialize)]
struct ELocationId {
    #[serde(rename = "@EIdType")]
    eid_type: Option<String>,
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct AbstractXml {
    #[serde(rename = "AbstractText", default)]
    sections: Vec<AbstractText>,
}

#[derive(Debug, Deserialize)]
struct AbstractText {
    #[serde(rename = "@Label")]
    label: Option<String>,
    #[serde(rename = "$text")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct AuthorList {
    #[serde(rename = "Author", default)]
    authors: Vec<AuthorXml>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct AuthorXml {
    LastName: Option<TextNode>,
    ForeName: Option<TextNode>,
    Initials: Option<TextNode>,
    CollectiveName: Option<TextNode>,
    #[serde(rename = "AffiliationInfo", default)]
    affiliations: Vec<AffiliationInfo>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct AffiliationInfo {
    Affiliation: Option<TextNode>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct PublicationTypeList {
    #[serde(rename = "PublicationType", default)]
    types: Vec<TextNode>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct MeshHeadingList {
    #[serde(rename = "MeshHeading", default)]
    headings: Vec<MeshHeading>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct MeshHeading {
    DescriptorName: Option<DescriptorName>,
}

#[derive(Debug, Deserialize)]
struct DescriptorName {
    #[serde(rename = "@MajorTopicYN")]
    major_topic: Option<String>,
    #[serde(rename = "$text")]
    name: String,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct KeywordList {
    #[serde(rename = "Keyword", default)]
    keywords: Vec<KeywordXml>,
}

#[derive(Debug, Deserialize)]
struct KeywordXml {
    #[serde(rename = "$text")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct PubmedData {
    ArticleIdList: Option<ArticleIdList>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct ArticleIdList {
    #[serde(rename = "ArticleId", default)]
    ids: Vec<ArticleId>,
}

#[derive(Debug, Deserialize)]
struct ArticleId {
    #[serde(rename = "@IdType")]
    id_type: String,
    #[serde(rename = "$text")]
    value: Option<String>,
}

/// Parse an EFetch article set into normalized [`Article`] records.
/// Records without a PMID are skipped rather than failing the batch.
pub fn parse_efetch(xml: &str) -> Result<Vec<Article>, Error> {
    let set: PubmedArticleSet = from_str(xml)?;

    let mut articles = Vec::new();
    for record in set.articles {
        let citation = match record.MedlineCitation {
            Some(c) => c,
            None => {
                warn!("skipping record without MedlineCitation");
                continue;
            }
        };
        let pmid = match citation.PMID {
            Some(p) => p.id,
            None => {
                warn!("skipping record without PMID");
                continue;
            }
        };

        let mut builder = Article::builder(pmid);
        let mut elocation_doi = None;

        if let Some(article) = citation.Article {
            elocation_doi = article
                .elocation_ids
                .iter()
                .find(|e| e.eid_type.as_deref() == Some("doi"))
                .and_then(|e| e.value.clone());
            if let Some(title) = article.ArticleTitle {
                builder = builder.title(title.text.trim().trim_end_matches('.'));
            }
            if let Some(abstract_xml) = article.Abstract {
                builder = builder.abstract_text(join_abstract(&abstract_xml.sections));
            }
            if let Some(author_list) = article.AuthorList {
                for author in author_list.authors {
                    builder = builder.author(normalize_author(author));
                }
            }
            let pages = article
                .Pagination
                .and_then(|p| p.MedlinePgn)
                .map(|n| n.text);
            if let Some(journal) = article.Journal {
                let pub_date = journal
                    .JournalIssue
                    .as_ref()
                    .and_then(|ji| ji.PubDate.as_ref())
                    .map(normalize_pub_date)
                    .unwrap_or_default();
                builder = builder.pub_date(pub_date).journal(Journal {
                    title: journal.Title.map(|t| t.text),
                    iso_abbreviation: journal.ISOAbbreviation.map(|t| t.text),
                    issn: journal.ISSN.map(|t| t.text),
                    volume: journal
                        .JournalIssue
                        .as_ref()
                        .and_then(|ji| ji.Volume.as_ref())
                        .map(|t| t.text.clone()),
                    issue: journal
                        .JournalIssue
                        .as_ref()
                        .and_then(|ji| ji.Issue.as_ref())
                        .map(|t| t.text.clone()),
                    pages,
                });
            }
            for language in article.languages {
                builder = builder.language(language.text);
            }
            if let Some(type_list) = article.PublicationTypeList {
                for kind in type_list.types {
                    builder = builder.article_type(kind.text);
                }
            }
        }

        if let Some(mesh_list) = citation.MeshHeadingList {
            for heading in mesh_list.headings {
                if let Some(descriptor) = heading.DescriptorName {
                    builder = builder.mesh_term(MeshTerm {
                        descriptor: descriptor.name,
                        major_topic: descriptor.major_topic.as_deref() == Some("Y"),
                    });
                }
            }
        }
        for list in citation.keyword_lists {
            for keyword in list.keywords {
                if let Some(text) = keyword.text {
                    builder = builder.keyword(text);
                }
            }
        }

        let mut doi = None;
        if let Some(id_list) = record.PubmedData.and_then(|d| d.ArticleIdList) {
            for id in id_list.ids {
                match (id.id_type.as_str(), id.value) {
                    ("doi", Some(value)) => doi = Some(value),
                    ("pmc", Some(value)) => builder = builder.pmc_id(value),
                    _ => {}
                }
            }
        }
        if let Some(doi) = doi.or(elocation_doi) {
            builder = builder.doi(doi);
        }

        articles.push(builder.build());
    }
    Ok(articles)
}

/// Structured abstracts keep their section labels as "Label: text".
fn join_abstract(sections: &[AbstractText]) -> String {
    sections
        .iter()
        .filter_map(|s| {
            let text = s.text.as_deref()?.trim();
            if text.is_empty() {
                return None;
            }
            Some(match &s.label {
                Some(label) => format!("{}: {}", label, text),
                None => text.to_string(),
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_author(author: AuthorXml) -> Author {
    // Collective names (working groups) carry no given/family split
    if let Some(collective) = author.CollectiveName {
        return Author {
            last_name: Some(collective.text),
            ..Default::default()
        };
    }
    Author {
        last_name: author.LastName.map(|n| n.text),
        first_name: author.ForeName.map(|n| n.text),
        initials: author.Initials.map(|n| n.text),
        affiliation: author
            .affiliations
            .into_iter()
            .find_map(|a| a.Affiliation.map(|t| t.text)),
    }
}

fn normalize_pub_date(date: &PubDateXml) -> PubDate {
    let year = date
        .Year
        .as_ref()
        .map(|y| y.text.clone())
        .or_else(|| {
            // MedlineDate is freeform, e.g. "2021 Mar-Apr"; take the year
            date.MedlineDate
                .as_ref()
                .map(|m| m.text.chars().take(4).collect())
        });
    PubDate {
        year,
        month: date.Month.as_ref().map(|m| m.text.clone()),
        day: date.Day.as_ref().map(|d| d.text.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_XML: &str = r#"<?xml version="1.0" ?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation>
      <PMID Version="1">12345678</PMID>
      <Article>
        <Journal>
          <ISSN IssnType="Print">0000-0000</ISSN>
          <JournalIssue>
            <Volume>12</Volume>
            <Issue>3</Issue>
            <PubDate><Year>2021</Year><Month>Mar</Month><Day>15</Day></PubDate>
          </JournalIssue>
          <Title>Journal of Medicine</Title>
          <ISOAbbreviation>J Med</ISOAbbreviation>
        </Journal>
        <ArticleTitle>Example Study.</ArticleTitle>
        <Pagination><MedlinePgn>45-52</MedlinePgn></Pagination>
        <Abstract>
          <AbstractText Label="BACKGROUND">Context here.</AbstractText>
          <AbstractText Label="RESULTS">Findings here.</AbstractText>
        </Abstract>
        <AuthorList>
          <Author>
            <LastName>Doe</LastName>
            <ForeName>Jane</ForeName>
            <Initials>J</Initials>
            <AffiliationInfo><Affiliation>Dept of Medicine</Affiliation></AffiliationInfo>
          </Author>
          <Author><CollectiveName>Study Group</CollectiveName></Author>
        </AuthorList>
        <Language>eng</Language>
        <PublicationTypeList>
          <PublicationType UI="D016428">Journal Article</PublicationType>
        </PublicationTypeList>
      </Article>
      <MeshHeadingList>
        <MeshHeading>
          <DescriptorName UI="D003920" MajorTopicYN="Y">Diabetes Mellitus</DescriptorName>
        </MeshHeading>
        <MeshHeading>
          <DescriptorName UI="D006801" MajorTopicYN="N">Humans</DescriptorName>
        </MeshHeading>
      </MeshHeadingList>
      <KeywordList Owner="NOTNLM">
        <Keyword MajorTopicYN="N">insulin</Keyword>
      </KeywordList>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">12345678</ArticleId>
        <ArticleId IdType="doi">10.1000/example</ArticleId>
        <ArticleId IdType="pmc">PMC1234567</ArticleId>
      </ArticleIdList>
    </PubmedData>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn test_parse_efetch_full_record() {
        let articles = parse_efetch(SAMPLE_XML).unwrap();
        assert_eq!(articles.len(), 1);
        let article = &articles[0];

        assert_eq!(article.pmid, "12345678");
        assert_eq!(article.title, "Example Study");
        assert_eq!(
            article.abstract_text.as_deref(),
            Some("BACKGROUND: Context here. RESULTS: Findings here.")
        );
        assert_eq!(article.authors.len(), 2);
        assert_eq!(article.authors[0].last_name.as_deref(), Some("Doe"));
        assert_eq!(
            article.authors[0].affiliation.as_deref(),
            Some("Dept of Medicine")
        );
        assert_eq!(article.authors[1].last_name.as_deref(), Some("Study Group"));
        assert_eq!(article.journal.title.as_deref(), Some("Journal of Medicine"));
        assert_eq!(article.journal.iso_abbreviation.as_deref(), Some("J Med"));
        assert_eq!(article.journal.volume.as_deref(), Some("12"));
        assert_eq!(article.journal.pages.as_deref(), Some("45-52"));
        assert_eq!(article.pub_date.year.as_deref(), Some("2021"));
        assert_eq!(article.pub_date.display(), "2021/Mar/15");
        assert_eq!(article.doi.as_deref(), Some("10.1000/example"));
        assert_eq!(article.pmc_id.as_deref(), Some("PMC1234567"));
        assert_eq!(article.article_types, vec!["Journal Article"]);
        assert_eq!(article.mesh_terms.len(), 2);
        assert!(article.mesh_terms[0].major_topic);
        assert!(!article.mesh_terms[1].major_topic);
        assert_eq!(article.keywords, vec!["insulin"]);
        assert_eq!(article.languages, vec!["eng"]);
    }

    #[test]
    fn test_parse_efetch_empty_set() {
        let articles = parse_efetch("<PubmedArticleSet></PubmedArticleSet>").unwrap();
        assert!(articles.is_empty());
    }

    #[test]
    fn test_parse_efetch_rejects_garbage() {
        assert!(matches!(
            parse_efetch("this is not xml"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_parse_esearch() {
        let json = r#"{"esearchresult": {"count": "245", "idlist": ["111", "222"]}}"#;
        let ids = parse_esearch(json).unwrap();
        assert_eq!(ids.total, 245);
        assert_eq!(ids.pmids, vec!["111", "222"]);
    }

    #[test]
    fn test_parse_elink_excludes_source() {
        let json = r#"{"linksets": [{"linksetdbs": [
            {"linkname": "pubmed_pubmed", "links": ["111", "222", "999"]},
            {"linkname": "pubmed_pubmed_citedin", "links": ["333"]}
        ]}]}"#;
        let pmids = parse_elink(json, "999").unwrap();
        assert_eq!(pmids, vec!["111", "222"]);
    }

    #[test]
    fn test_elocation_doi_fallback() {
        let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation>
            <PMID>7654321</PMID>
            <Article>
              <ArticleTitle>T</ArticleTitle>
              <ELocationID EIdType="pii" ValidYN="Y">S0000</ELocationID>
              <ELocationID EIdType="doi" ValidYN="Y">10.1000/eloc</ELocationID>
            </Article>
        </MedlineCitation></PubmedArticle></PubmedArticleSet>"#;
        let articles = parse_efetch(xml).unwrap();
        assert_eq!(articles[0].doi.as_deref(), Some("10.1000/eloc"));
    }

    #[test]
    fn test_medline_date_fallback() {
        let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation>
            <PMID>7654321</PMID>
            <Article>
              <Journal><JournalIssue>
                <PubDate><MedlineDate>1998 Dec-1999 Jan</MedlineDate></PubDate>
              </JournalIssue><Title>J</Title></Journal>
              <ArticleTitle>T</ArticleTitle>
            </Article>
        </MedlineCitation></PubmedArticle></PubmedArticleSet>"#;
        let articles = parse_efetch(xml).unwrap();
        assert_eq!(articles[0].pub_date.year.as_deref(), Some("1998"));
    }
}
