//! PubMed E-utilities client.
//!
//! Every request follows the same path: validate and compile the query,
//! consult the cache, and only on a miss take a rate-limiter token and go
//! through the [`Transport`]. Responses are normalized before they are
//! cached, so cache hits and fresh fetches return identical shapes.

mod parse;
mod transport;

pub use transport::{HttpTransport, Transport};

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info};

use crate::citation;
use crate::error::Error;
use crate::models::{Article, CitationFormat, SearchCriteria, SearchResult, SortOrder};
use crate::query;
use crate::utils::{validate_pmid, CacheManager, CacheStats, KeyBuilder, RateLimiter};

const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Tunables for [`PubMedClient`]; defaults match NCBI's keyless allowance.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Requests per second against E-utilities
    pub rate_limit: f64,
    pub cache_size: usize,
    pub cache_ttl: Duration,
    pub api_key: Option<String>,
    pub email: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            rate_limit: 3.0,
            cache_size: 512,
            cache_ttl: Duration::from_secs(300),
            api_key: None,
            email: None,
        }
    }
}

/// High-level PubMed client
#[derive(Debug)]
pub struct PubMedClient {
    transport: Arc<dyn Transport>,
    limiter: RateLimiter,
    search_cache: CacheManager<SearchResult>,
    article_cache: CacheManager<Vec<Article>>,
    api_key: Option<String>,
    email: Option<String>,
}

impl PubMedClient {
    /// Build a client over an explicit transport. Fails fast on a
    /// misconfigured rate limit.
    pub fn new(transport: Arc<dyn Transport>, options: ClientOptions) -> Result<Self, Error> {
        let limiter = RateLimiter::new(options.rate_limit)?;
        Ok(Self {
            transport,
            limiter,
            search_cache: CacheManager::new(options.cache_size, options.cache_ttl),
            article_cache: CacheManager::new(options.cache_size, options.cache_ttl),
            api_key: options.api_key,
            email: options.email,
        })
    }

    /// Production constructor: HTTP transport with the given options.
    pub fn with_options(options: ClientOptions) -> Result<Self, Error> {
        let transport = Arc::new(HttpTransport::new()?);
        Self::new(transport, options)
    }

    fn base_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("db".to_string(), "pubmed".to_string()),
            ("tool".to_string(), env!("CARGO_PKG_NAME").to_string()),
        ];
        if let Some(email) = &self.email {
            params.push(("email".to_string(), email.clone()));
        }
        if let Some(api_key) = &self.api_key {
            params.push(("api_key".to_string(), api_key.clone()));
        }
        params
    }

    /// Rate-limited GET against one E-utilities endpoint.
    async fn request(
        &self,
        endpoint: &str,
        params: Vec<(String, String)>,
    ) -> Result<String, Error> {
        self.limiter.acquire().await;
        let url = format!("{}/{}", EUTILS_BASE, endpoint);
        self.transport.fetch(&url, &params).await
    }

    /// Search PubMed and return normalized article records.
    pub async fn search_articles(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<SearchResult, Error> {
        let started = Instant::now();
        let term = query::build_term(criteria, Utc::now().date_naive())?;
        let max_results = criteria.max_results.clamp(1, 200);

        let key = KeyBuilder::new("search")
            .field("term", &term)
            .field("max", max_results)
            .opt_field("sort", criteria.sort_order.as_param())
            .finish();
        if let Some(cached) = self.search_cache.get(&key) {
            return Ok(cached);
        }

        let mut params = self.base_params();
        params.push(("term".to_string(), term.clone()));
        params.push(("retmax".to_string(), max_results.to_string()));
        params.push(("retmode".to_string(), "json".to_string()));
        if let Some(sort) = criteria.sort_order.as_param() {
            params.push(("sort".to_string(), sort.to_string()));
        }

        let body = self.request("esearch.fcgi", params).await?;
        let ids = parse::parse_esearch(&body)?;
        debug!(total = ids.total, returned = ids.pmids.len(), "search ids");

        let articles = if ids.pmids.is_empty() {
            Vec::new()
        } else {
            self.fetch_details(&ids.pmids).await?
        };

        let result = SearchResult {
            query: term,
            total_results: ids.total,
            returned_results: articles.len(),
            articles,
            search_time: started.elapsed().as_secs_f64(),
        };
        self.search_cache.insert(key, result.clone());
        info!(
            total = result.total_results,
            returned = result.returned_results,
            "search complete"
        );
        Ok(result)
    }

    /// Fetch full records for a list of PMIDs.
    pub async fn fetch_articles(&self, pmids: &[String]) -> Result<Vec<Article>, Error> {
        if pmids.is_empty() {
            return Err(Error::InvalidCriteria("no PMIDs supplied".to_string()));
        }
        if let Some(bad) = pmids.iter().find(|p| !validate_pmid(p)) {
            return Err(Error::InvalidCriteria(format!("invalid PMID: {}", bad)));
        }

        let key = KeyBuilder::new("fetch")
            .list_field("pmids", pmids)
            .finish();
        if let Some(cached) = self.article_cache.get(&key) {
            return Ok(cached);
        }

        let articles = self.fetch_details(pmids).await?;
        self.article_cache.insert(key, articles.clone());
        Ok(articles)
    }

    /// EFetch without cache-key handling; shared by search and fetch paths.
    async fn fetch_details(&self, pmids: &[String]) -> Result<Vec<Article>, Error> {
        let mut params = self.base_params();
        params.push(("id".to_string(), pmids.join(",")));
        params.push(("retmode".to_string(), "xml".to_string()));
        let body = self.request("efetch.fcgi", params).await?;
        parse::parse_efetch(&body)
    }

    /// Search for a specific author's publications, newest first.
    pub async fn search_by_author(
        &self,
        author_name: &str,
        max_results: usize,
    ) -> Result<SearchResult, Error> {
        let author_name = author_name.trim();
        if author_name.is_empty() {
            return Err(Error::InvalidCriteria(
                "author name must not be empty".to_string(),
            ));
        }
        let criteria = SearchCriteria::new("")
            .author(author_name)
            .max_results(max_results)
            .sort_order(SortOrder::PubDate);
        self.search_articles(&criteria).await
    }

    /// ELink neighbors of a PMID, resolved to full records.
    pub async fn related_articles(
        &self,
        pmid: &str,
        max_results: usize,
    ) -> Result<Vec<Article>, Error> {
        if !validate_pmid(pmid) {
            return Err(Error::InvalidCriteria(format!("invalid PMID: {}", pmid)));
        }
        let max_results = max_results.clamp(1, 50);

        let key = KeyBuilder::new("related")
            .field("pmid", pmid)
            .field("max", max_results)
            .finish();
        if let Some(cached) = self.article_cache.get(&key) {
            return Ok(cached);
        }

        let mut params = self.base_params();
        params.push(("dbfrom".to_string(), "pubmed".to_string()));
        params.push(("id".to_string(), pmid.to_string()));
        params.push(("linkname".to_string(), "pubmed_pubmed".to_string()));
        params.push(("retmode".to_string(), "json".to_string()));
        let body = self.request("elink.fcgi", params).await?;

        let mut related = parse::parse_elink(&body, pmid)?;
        related.truncate(max_results);

        let articles = if related.is_empty() {
            Vec::new()
        } else {
            self.fetch_details(&related).await?
        };
        self.article_cache.insert(key, articles.clone());
        Ok(articles)
    }

    /// Fetch the given articles and render them in one citation style.
    pub async fn export_citations(
        &self,
        pmids: &[String],
        style: CitationFormat,
    ) -> Result<String, Error> {
        let articles = self.fetch_articles(pmids).await?;
        Ok(citation::format_many(&articles, style))
    }

    /// Combined cache counters for both the search and article caches.
    pub fn cache_stats(&self) -> (CacheStats, CacheStats) {
        (self.search_cache.stats(), self.article_cache.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ESEARCH_BODY: &str =
        r#"{"esearchresult": {"count": "1", "idlist": ["12345678"]}}"#;
    const EFETCH_BODY: &str = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation>
        <PMID>12345678</PMID>
        <Article>
          <Journal><JournalIssue><PubDate><Year>2021</Year></PubDate></JournalIssue>
            <Title>J Med</Title></Journal>
          <ArticleTitle>Example Study</ArticleTitle>
        </Article>
      </MedlineCitation></PubmedArticle></PubmedArticleSet>"#;

    /// Replays canned bodies per endpoint and counts calls.
    #[derive(Debug, Default)]
    struct ScriptedTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn fetch(
            &self,
            endpoint: &str,
            _params: &[(String, String)],
        ) -> Result<String, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if endpoint.contains("esearch") {
                Ok(ESEARCH_BODY.to_string())
            } else if endpoint.contains("efetch") {
                Ok(EFETCH_BODY.to_string())
            } else if endpoint.contains("elink") {
                Ok(r#"{"linksets": [{"linksetdbs": [
                    {"linkname": "pubmed_pubmed", "links": ["12345678", "87654321"]}
                ]}]}"#
                    .to_string())
            } else {
                Err(Error::fetch(format!("unexpected endpoint {}", endpoint)))
            }
        }
    }

    fn client(transport: Arc<dyn Transport>) -> PubMedClient {
        PubMedClient::new(
            transport,
            ClientOptions {
                rate_limit: 1000.0,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_search_normalizes_and_counts() {
        let client = client(Arc::new(ScriptedTransport::default()));
        let result = client
            .search_articles(&SearchCriteria::new("example"))
            .await
            .unwrap();

        assert_eq!(result.total_results, 1);
        assert_eq!(result.returned_results, 1);
        assert_eq!(result.articles[0].pmid, "12345678");
        assert_eq!(result.articles[0].title, "Example Study");
    }

    #[tokio::test]
    async fn test_search_second_call_hits_cache() {
        let transport = Arc::new(ScriptedTransport::default());
        let client = client(transport.clone());
        let criteria = SearchCriteria::new("example");

        client.search_articles(&criteria).await.unwrap();
        let after_first = transport.calls.load(Ordering::SeqCst);
        client.search_articles(&criteria).await.unwrap();

        assert_eq!(transport.calls.load(Ordering::SeqCst), after_first);
    }

    #[tokio::test]
    async fn test_invalid_criteria_before_any_fetch() {
        let transport = Arc::new(ScriptedTransport::default());
        let client = client(transport.clone());

        let err = client
            .search_articles(&SearchCriteria::new("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCriteria(_)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_articles_validates_pmids() {
        let transport = Arc::new(ScriptedTransport::default());
        let client = client(transport.clone());

        let err = client
            .fetch_articles(&["not-a-pmid".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCriteria(_)));

        let err = client.fetch_articles(&[]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidCriteria(_)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_related_excludes_source_pmid() {
        let client = client(Arc::new(ScriptedTransport::default()));
        let related = client.related_articles("12345678", 10).await.unwrap();
        // elink returned the source itself plus one neighbor
        assert_eq!(related.len(), 1);
    }

    #[tokio::test]
    async fn test_export_citations_apa() {
        let client = client(Arc::new(ScriptedTransport::default()));
        let citation = client
            .export_citations(&["12345678".to_string()], CitationFormat::Apa)
            .await
            .unwrap();
        assert_eq!(citation, "(2021). Example Study. J Med.");
    }

    #[tokio::test]
    async fn test_search_by_author_rejects_blank() {
        let client = client(Arc::new(ScriptedTransport::default()));
        assert!(matches!(
            client.search_by_author("  ", 10).await.unwrap_err(),
            Error::InvalidCriteria(_)
        ));
    }
}
