//! Citation formatting for the supported academic styles.
//!
//! Each style has its own formatting function; [`format`] dispatches on
//! [`CitationFormat`]. Missing optional fields are omitted together with
//! their surrounding punctuation rather than rendered as placeholders.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{Article, Author, CitationFormat};

/// Format a single article in the given style.
pub fn format(article: &Article, style: CitationFormat) -> String {
    match style {
        CitationFormat::Apa => format_apa(article),
        CitationFormat::Mla => format_mla(article),
        CitationFormat::Chicago => format_chicago(article),
        CitationFormat::Vancouver => format_vancouver(article),
        CitationFormat::Bibtex => format_bibtex(article),
        CitationFormat::Endnote => format_endnote(article),
        CitationFormat::Ris => format_ris(article),
    }
}

/// Format a batch. Human-readable styles are separated by a blank line;
/// RIS and EndNote records follow each other on consecutive lines.
pub fn format_many(articles: &[Article], style: CitationFormat) -> String {
    let separator = match style {
        CitationFormat::Ris | CitationFormat::Endnote => "\n",
        _ => "\n\n",
    };
    articles
        .iter()
        .map(|a| format(a, style))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Strip markup and collapse runs of whitespace.
fn clean_text(text: &str) -> String {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();
    let tags = TAGS.get_or_init(|| Regex::new(r"<[^>]+>").unwrap());
    let spaces = SPACES.get_or_init(|| Regex::new(r"\s+").unwrap());
    let text = tags.replace_all(text, "");
    spaces.replace_all(&text, " ").trim().to_string()
}

fn cleaned_title(article: &Article) -> Option<String> {
    if article.title.is_empty() {
        return None;
    }
    let title = clean_text(&article.title);
    Some(title.trim_end_matches('.').to_string())
}

/// "Last, I." with the initials guaranteed a trailing period.
fn author_apa(author: &Author) -> Option<String> {
    match (&author.last_name, &author.initials, &author.first_name) {
        (Some(last), Some(initials), _) => {
            let initials = if initials.ends_with('.') {
                initials.clone()
            } else {
                format!("{}.", initials)
            };
            Some(format!("{}, {}", last, initials))
        }
        (Some(last), None, Some(first)) => {
            let initial = first.chars().next()?;
            Some(format!("{}, {}.", last, initial))
        }
        (Some(last), None, None) => Some(last.clone()),
        (None, _, Some(first)) => Some(first.clone()),
        (None, _, None) => None,
    }
}

/// "Last, First", falling back to whichever part exists.
fn author_last_first(author: &Author) -> Option<String> {
    match (&author.last_name, &author.first_name) {
        (Some(last), Some(first)) => Some(format!("{}, {}", last, first)),
        (Some(last), None) => Some(last.clone()),
        (None, Some(first)) => Some(first.clone()),
        (None, None) => None,
    }
}

/// "First Last", falling back to whichever part exists.
fn author_first_last(author: &Author) -> Option<String> {
    match (&author.first_name, &author.last_name) {
        (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
        (None, Some(last)) => Some(last.clone()),
        (Some(first), None) => Some(first.clone()),
        (None, None) => None,
    }
}

fn authors_apa(authors: &[Author]) -> Option<String> {
    let formatted: Vec<String> = authors.iter().filter_map(author_apa).collect();
    if formatted.is_empty() {
        return None;
    }
    // APA 7th: up to 20 authors listed in full; beyond that the first 19
    // followed by an ellipsis and the final author.
    if formatted.len() > 20 {
        let head = formatted[..19].join(", ");
        let last = formatted.last().unwrap();
        Some(format!("{}, ... & {}", head, last))
    } else if formatted.len() > 1 {
        let (last, head) = formatted.split_last().unwrap();
        Some(format!("{}, & {}", head.join(", "), last))
    } else {
        Some(formatted[0].clone())
    }
}

fn format_apa(article: &Article) -> String {
    let mut parts = Vec::new();

    if let Some(authors) = authors_apa(&article.authors) {
        parts.push(authors);
    }
    if let Some(year) = &article.pub_date.year {
        parts.push(format!("({}).", year));
    }
    if let Some(title) = cleaned_title(article) {
        parts.push(format!("{}.", title));
    }
    if let Some(journal) = &article.journal.title {
        let mut journal_part = journal.clone();
        if let Some(volume) = &article.journal.volume {
            journal_part.push_str(&format!(", {}", volume));
            if let Some(issue) = &article.journal.issue {
                journal_part.push_str(&format!("({})", issue));
            }
        }
        if let Some(pages) = &article.journal.pages {
            journal_part.push_str(&format!(", {}", pages));
        }
        parts.push(format!("{}.", journal_part));
    }
    if let Some(doi) = &article.doi {
        parts.push(format!("https://doi.org/{}", doi));
    }

    parts.join(" ")
}

fn format_mla(article: &Article) -> String {
    let mut parts = Vec::new();

    if let Some(first) = article.authors.first().and_then(author_last_first) {
        let mut name = first;
        if article.authors.len() > 1 {
            name.push_str(", et al");
        }
        parts.push(format!("{}.", name));
    }
    if let Some(title) = cleaned_title(article) {
        parts.push(format!("\"{}.\"", title));
    }
    if let Some(journal) = &article.journal.title {
        let mut journal_part = journal.clone();
        if let Some(volume) = &article.journal.volume {
            journal_part.push_str(&format!(", vol. {}", volume));
            if let Some(issue) = &article.journal.issue {
                journal_part.push_str(&format!(", no. {}", issue));
            }
        }
        if let Some(year) = &article.pub_date.year {
            journal_part.push_str(&format!(", {}", year));
        }
        parts.push(format!("{}.", journal_part));
    }
    if !article.pmid.is_empty() {
        parts.push(format!("Web. {}", article.url()));
    } else if let Some(doi) = &article.doi {
        parts.push(format!("DOI: {}.", doi));
    }

    parts.join(" ")
}

fn format_chicago(article: &Article) -> String {
    let mut parts = Vec::new();

    if let Some(first) = article.authors.first().and_then(author_last_first) {
        let mut name = first;
        if article.authors.len() > 1 {
            name.push_str(", et al");
        }
        parts.push(format!("{}.", name));
    }
    if let Some(title) = cleaned_title(article) {
        parts.push(format!("\"{}.\"", title));
    }
    if let Some(journal) = &article.journal.title {
        let mut journal_part = journal.clone();
        if let Some(volume) = &article.journal.volume {
            journal_part.push_str(&format!(" {}", volume));
            if let Some(issue) = &article.journal.issue {
                journal_part.push_str(&format!(", no. {}", issue));
            }
        }
        if let Some(year) = &article.pub_date.year {
            journal_part.push_str(&format!(" ({})", year));
        }
        parts.push(format!("{}.", journal_part));
    }
    if let Some(doi) = &article.doi {
        parts.push(format!("https://doi.org/{}.", doi));
    } else if !article.pmid.is_empty() {
        parts.push(article.url());
    }

    parts.join(" ")
}

fn format_vancouver(article: &Article) -> String {
    let mut parts = Vec::new();

    if !article.authors.is_empty() {
        let mut names: Vec<String> = article
            .authors
            .iter()
            .take(6)
            .filter_map(|a| {
                let last = a.last_name.as_ref()?;
                match (&a.initials, &a.first_name) {
                    (Some(initials), _) => {
                        Some(format!("{} {}", last, initials.replace('.', "")))
                    }
                    (None, Some(first)) => {
                        first.chars().next().map(|i| format!("{} {}", last, i))
                    }
                    (None, None) => Some(last.clone()),
                }
            })
            .collect();
        if article.authors.len() > 6 {
            names.push("et al".to_string());
        }
        if !names.is_empty() {
            parts.push(format!("{}.", names.join(", ")));
        }
    }
    if let Some(title) = cleaned_title(article) {
        parts.push(format!("{}.", title));
    }
    if let Some(journal) = article.journal.short_name() {
        let mut journal_part = journal.to_string();
        if let Some(year) = &article.pub_date.year {
            journal_part.push_str(&format!(" {}", year));
        }
        if let Some(volume) = &article.journal.volume {
            journal_part.push_str(&format!(";{}", volume));
            if let Some(issue) = &article.journal.issue {
                journal_part.push_str(&format!("({})", issue));
            }
            if let Some(pages) = &article.journal.pages {
                journal_part.push_str(&format!(":{}", pages));
            }
        }
        parts.push(format!("{}.", journal_part));
    }
    if !article.pmid.is_empty() {
        parts.push(format!("PMID: {}", article.pmid));
    }

    parts.join(" ")
}

/// Escape characters significant to TeX in free-text field values.
fn escape_bibtex(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('{', "\\{")
        .replace('}', "\\}")
        .replace('&', "\\&")
        .replace('%', "\\%")
        .replace('$', "\\$")
        .replace('#', "\\#")
        .replace('_', "\\_")
        .replace('^', "\\^{}")
        .replace('~', "\\~{}")
}

/// Key is first author's lowercased last name, year, and the initial of
/// the first significant title word, e.g. `doe2021e`.
fn bibtex_key(article: &Article) -> String {
    let mut key = String::new();
    if let Some(last) = article.authors.first().and_then(|a| a.last_name.as_ref()) {
        key.push_str(&last.to_lowercase());
    }
    if let Some(year) = &article.pub_date.year {
        key.push_str(year);
    }
    const STOP_WORDS: [&str; 6] = ["the", "and", "for", "with", "a", "an"];
    if let Some(word) = article
        .title
        .split_whitespace()
        .find(|w| !STOP_WORDS.contains(&w.to_lowercase().as_str()))
    {
        if let Some(initial) = word.chars().next() {
            key.extend(initial.to_lowercase());
        }
    }
    if key.is_empty() {
        key = format!("article_{}", article.pmid);
    }
    key
}

fn format_bibtex(article: &Article) -> String {
    let mut lines = vec![format!("@article{{{},", bibtex_key(article))];

    if let Some(title) = cleaned_title(article) {
        lines.push(format!("  title = {{{}}},", escape_bibtex(&title)));
    }
    let authors: Vec<String> = article
        .authors
        .iter()
        .filter_map(author_apa)
        .map(|a| escape_bibtex(&a))
        .collect();
    if !authors.is_empty() {
        lines.push(format!("  author = {{{}}},", authors.join(" and ")));
    }
    if let Some(journal) = &article.journal.title {
        lines.push(format!("  journal = {{{}}},", escape_bibtex(journal)));
    }
    if let Some(volume) = &article.journal.volume {
        lines.push(format!("  volume = {{{}}},", volume));
    }
    if let Some(issue) = &article.journal.issue {
        lines.push(format!("  number = {{{}}},", issue));
    }
    if let Some(pages) = &article.journal.pages {
        lines.push(format!("  pages = {{{}}},", pages));
    }
    if let Some(year) = &article.pub_date.year {
        lines.push(format!("  year = {{{}}},", year));
    }
    if let Some(doi) = &article.doi {
        lines.push(format!("  doi = {{{}}},", doi));
    }
    if !article.pmid.is_empty() {
        lines.push(format!("  pmid = {{{}}},", article.pmid));
    }
    lines.push("}".to_string());
    lines.join("\n")
}

fn format_endnote(article: &Article) -> String {
    let mut lines = vec!["%0 Journal Article".to_string()];

    if let Some(title) = &cleaned_title(article) {
        lines.push(format!("%T {}", title));
    }
    for author in &article.authors {
        if let Some(name) = author_first_last(author) {
            lines.push(format!("%A {}", name));
        }
    }
    if let Some(journal) = &article.journal.title {
        lines.push(format!("%J {}", journal));
    }
    if let Some(volume) = &article.journal.volume {
        lines.push(format!("%V {}", volume));
    }
    if let Some(issue) = &article.journal.issue {
        lines.push(format!("%N {}", issue));
    }
    if let Some(pages) = &article.journal.pages {
        lines.push(format!("%P {}", pages));
    }
    if !article.pub_date.is_empty() {
        lines.push(format!("%D {}", article.pub_date.display()));
    }
    if let Some(text) = &article.abstract_text {
        lines.push(format!("%X {}", clean_text(text)));
    }
    if let Some(doi) = &article.doi {
        lines.push(format!("%R {}", doi));
    }
    if !article.pmid.is_empty() {
        lines.push(format!("%M {}", article.pmid));
    }
    lines.join("\n")
}

fn format_ris(article: &Article) -> String {
    let mut lines = vec!["TY  - JOUR".to_string()];

    if let Some(title) = &cleaned_title(article) {
        lines.push(format!("TI  - {}", title));
    }
    for author in &article.authors {
        if let Some(name) = author_first_last(author) {
            lines.push(format!("AU  - {}", name));
        }
    }
    if let Some(journal) = &article.journal.title {
        lines.push(format!("JO  - {}", journal));
    }
    if let Some(volume) = &article.journal.volume {
        lines.push(format!("VL  - {}", volume));
    }
    if let Some(issue) = &article.journal.issue {
        lines.push(format!("IS  - {}", issue));
    }
    if let Some(pages) = &article.journal.pages {
        match pages.split_once('-') {
            Some((start, end)) => {
                lines.push(format!("SP  - {}", start.trim()));
                lines.push(format!("EP  - {}", end.trim()));
            }
            None => lines.push(format!("SP  - {}", pages.trim())),
        }
    }
    if let Some(year) = &article.pub_date.year {
        lines.push(format!("PY  - {}", year));
    }
    if !article.pub_date.is_empty() {
        lines.push(format!("DA  - {}", article.pub_date.display()));
    }
    if let Some(text) = &article.abstract_text {
        lines.push(format!("AB  - {}", clean_text(text)));
    }
    if let Some(doi) = &article.doi {
        lines.push(format!("DO  - {}", doi));
    }
    if !article.pmid.is_empty() {
        lines.push(format!("AN  - {}", article.pmid));
    }
    lines.push("ER  - ".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Author, Journal, PubDate};

    fn sample_article() -> Article {
        Article::builder("12345678")
            .title("Example Study")
            .author(Author {
                last_name: Some("Doe".to_string()),
                initials: Some("J".to_string()),
                ..Default::default()
            })
            .journal(Journal {
                title: Some("J Med".to_string()),
                ..Default::default()
            })
            .pub_date(PubDate {
                year: Some("2021".to_string()),
                ..Default::default()
            })
            .build()
    }

    fn author(last: &str, first: &str, initials: &str) -> Author {
        Author {
            last_name: Some(last.to_string()),
            first_name: Some(first.to_string()),
            initials: Some(initials.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_apa_single_author() {
        assert_eq!(
            format(&sample_article(), CitationFormat::Apa),
            "Doe, J. (2021). Example Study. J Med."
        );
    }

    #[test]
    fn test_apa_two_authors_ampersand() {
        let mut article = sample_article();
        article.authors.push(author("Smith", "Anne", "A"));
        let citation = format(&article, CitationFormat::Apa);
        assert!(citation.starts_with("Doe, J., & Smith, A. (2021)."));
    }

    #[test]
    fn test_apa_many_authors_ellipsis() {
        let mut article = sample_article();
        article.authors = (1..=25)
            .map(|i| Author {
                last_name: Some(format!("Name{}", i)),
                initials: Some("Q".to_string()),
                ..Default::default()
            })
            .collect();
        let citation = format(&article, CitationFormat::Apa);
        assert!(citation.contains("Name19, Q., ... & Name25, Q."));
        assert!(!citation.contains("Name20"));
    }

    #[test]
    fn test_apa_volume_issue_doi() {
        let mut article = sample_article();
        article.journal.volume = Some("12".to_string());
        article.journal.issue = Some("3".to_string());
        article.journal.pages = Some("45-52".to_string());
        article.doi = Some("10.1000/xyz".to_string());
        assert_eq!(
            format(&article, CitationFormat::Apa),
            "Doe, J. (2021). Example Study. J Med, 12(3), 45-52. https://doi.org/10.1000/xyz"
        );
    }

    #[test]
    fn test_mla() {
        let mut article = sample_article();
        article.authors[0].first_name = Some("Jane".to_string());
        article.journal.volume = Some("12".to_string());
        article.journal.issue = Some("3".to_string());
        assert_eq!(
            format(&article, CitationFormat::Mla),
            "Doe, Jane. \"Example Study.\" J Med, vol. 12, no. 3, 2021. \
             Web. https://pubmed.ncbi.nlm.nih.gov/12345678/"
        );
    }

    #[test]
    fn test_mla_et_al() {
        let mut article = sample_article();
        article.authors[0].first_name = Some("Jane".to_string());
        article.authors.push(author("Smith", "Anne", "A"));
        let citation = format(&article, CitationFormat::Mla);
        assert!(citation.starts_with("Doe, Jane, et al."));
    }

    #[test]
    fn test_chicago() {
        let mut article = sample_article();
        article.authors[0].first_name = Some("Jane".to_string());
        article.journal.volume = Some("12".to_string());
        article.journal.issue = Some("3".to_string());
        article.doi = Some("10.1000/xyz".to_string());
        assert_eq!(
            format(&article, CitationFormat::Chicago),
            "Doe, Jane. \"Example Study.\" J Med 12, no. 3 (2021). https://doi.org/10.1000/xyz."
        );
    }

    #[test]
    fn test_vancouver() {
        let mut article = sample_article();
        article.authors.push(author("Smith", "Anne", "AB"));
        article.journal.volume = Some("12".to_string());
        article.journal.issue = Some("3".to_string());
        article.journal.pages = Some("45-52".to_string());
        assert_eq!(
            format(&article, CitationFormat::Vancouver),
            "Doe J, Smith AB. Example Study. J Med 2021;12(3):45-52. PMID: 12345678"
        );
    }

    #[test]
    fn test_vancouver_seven_authors_et_al() {
        let mut article = sample_article();
        article.authors = (1..=7)
            .map(|i| Author {
                last_name: Some(format!("Name{}", i)),
                initials: Some("Q".to_string()),
                ..Default::default()
            })
            .collect();
        let citation = format(&article, CitationFormat::Vancouver);
        assert!(citation.contains("Name6 Q, et al."));
        assert!(!citation.contains("Name7"));
    }

    #[test]
    fn test_bibtex() {
        let citation = format(&sample_article(), CitationFormat::Bibtex);
        assert!(citation.starts_with("@article{doe2021e,"));
        assert!(citation.contains("author = {Doe, J.}"));
        assert!(citation.contains("title = {Example Study}"));
        assert!(citation.contains("journal = {J Med}"));
        assert!(citation.contains("year = {2021}"));
        assert!(citation.contains("pmid = {12345678}"));
        assert!(citation.ends_with("\n}"));
    }

    #[test]
    fn test_bibtex_escaping() {
        let mut article = sample_article();
        article.title = "Genes & Proteins: the 90% case".to_string();
        let citation = format(&article, CitationFormat::Bibtex);
        assert!(citation.contains("title = {Genes \\& Proteins: the 90\\% case}"));
    }

    #[test]
    fn test_endnote_tags_only_when_present() {
        let citation = format(&sample_article(), CitationFormat::Endnote);
        assert_eq!(
            citation,
            "%0 Journal Article\n%T Example Study\n%A Doe\n%J J Med\n%D 2021\n%M 12345678"
        );
        assert!(!citation.contains("%X"));
        assert!(!citation.contains("%V"));
    }

    #[test]
    fn test_ris_page_range_split() {
        let mut article = sample_article();
        article.journal.pages = Some("45-52".to_string());
        article.journal.volume = Some("12".to_string());
        let citation = format(&article, CitationFormat::Ris);
        assert!(citation.starts_with("TY  - JOUR\n"));
        assert!(citation.contains("SP  - 45\nEP  - 52"));
        assert!(citation.ends_with("ER  - "));
    }

    #[test]
    fn test_ris_no_abstract_tag_when_missing() {
        let citation = format(&sample_article(), CitationFormat::Ris);
        assert!(!citation.contains("AB  -"));
    }

    #[test]
    fn test_format_many_separators() {
        let articles = vec![sample_article(), sample_article()];
        let ris = format_many(&articles, CitationFormat::Ris);
        assert!(ris.contains("ER  - \nTY  - JOUR"));

        let apa = format_many(&articles, CitationFormat::Apa);
        assert!(apa.contains("J Med.\n\nDoe, J."));
    }

    #[test]
    fn test_missing_fields_skip_punctuation() {
        let article = Article::builder("9999999").title("Untitled Work").build();
        let apa = format(&article, CitationFormat::Apa);
        assert_eq!(apa, "Untitled Work.");
    }
}
