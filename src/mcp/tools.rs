//! Tool registry and handlers for the MCP surface.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::citation;
use crate::client::PubMedClient;
use crate::models::{CitationFormat, SearchCriteria};
use crate::utils::{extract_pmids, validate_pmid};

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "search_pubmed")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments
    async fn execute(&self, args: Value) -> Result<Value, String>;
}

/// Registry for all MCP tools
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Register every tool against a shared client.
    pub fn new(client: Arc<PubMedClient>) -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };

        registry.register(Tool {
            name: "search_pubmed".to_string(),
            description: "Search PubMed for articles with advanced filtering options"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query using PubMed syntax"
                    },
                    "max_results": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 200,
                        "default": 20,
                        "description": "Maximum number of results to return"
                    },
                    "sort_order": {
                        "type": "string",
                        "enum": ["relevance", "pub_date", "author", "journal", "title"],
                        "default": "relevance",
                        "description": "Sort order for results"
                    },
                    "date_from": {
                        "type": "string",
                        "description": "Start date (YYYY/MM/DD, YYYY/MM, or YYYY)"
                    },
                    "date_to": {
                        "type": "string",
                        "description": "End date (YYYY/MM/DD, YYYY/MM, or YYYY)"
                    },
                    "date_range": {
                        "type": "string",
                        "enum": ["1y", "5y", "10y", "all"],
                        "description": "Predefined date range"
                    },
                    "article_types": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Filter by article types"
                    },
                    "authors": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Filter by author names"
                    },
                    "journals": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Filter by journal names"
                    },
                    "mesh_terms": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Filter by MeSH terms"
                    },
                    "language": {
                        "type": "string",
                        "description": "Language filter (e.g., 'eng', 'fre', 'ger')"
                    },
                    "has_abstract": {
                        "type": "boolean",
                        "description": "Only include articles with abstracts"
                    },
                    "has_full_text": {
                        "type": "boolean",
                        "description": "Only include articles with full text available"
                    },
                    "humans_only": {
                        "type": "boolean",
                        "description": "Only include human studies"
                    }
                },
                "required": ["query"]
            }),
            handler: Arc::new(SearchArticlesHandler {
                client: client.clone(),
            }),
        });

        registry.register(Tool {
            name: "advanced_search".to_string(),
            description: "Search PubMed with multiple field-tagged terms combined by boolean operators"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "search_terms": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "term": {
                                    "type": "string",
                                    "description": "Search term"
                                },
                                "field": {
                                    "type": "string",
                                    "enum": ["title", "abstract", "author", "journal", "mesh", "all"],
                                    "default": "all",
                                    "description": "Field to search the term in"
                                },
                                "operator": {
                                    "type": "string",
                                    "enum": ["AND", "OR", "NOT"],
                                    "default": "AND",
                                    "description": "Boolean operator joining this term to the previous one"
                                }
                            },
                            "required": ["term"]
                        },
                        "description": "Terms to combine into one query"
                    },
                    "filters": {
                        "type": "object",
                        "properties": {
                            "publication_types": {
                                "type": "array",
                                "items": {"type": "string"},
                                "description": "Restrict to these publication types"
                            },
                            "languages": {
                                "type": "array",
                                "items": {"type": "string"},
                                "description": "Restrict to these languages"
                            },
                            "species": {
                                "type": "array",
                                "items": {"type": "string"},
                                "description": "Restrict by species (e.g., 'humans')"
                            }
                        },
                        "description": "Additional filters applied to the whole query"
                    },
                    "max_results": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 200,
                        "default": 50,
                        "description": "Maximum number of results"
                    }
                },
                "required": ["search_terms"]
            }),
            handler: Arc::new(AdvancedSearchHandler {
                client: client.clone(),
            }),
        });

        registry.register(Tool {
            name: "get_article_details".to_string(),
            description: "Get detailed information for specific articles by PMID".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "pmids": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "List of PubMed IDs"
                    },
                    "include_abstracts": {
                        "type": "boolean",
                        "default": true,
                        "description": "Include abstracts in response"
                    }
                },
                "required": ["pmids"]
            }),
            handler: Arc::new(GetArticleDetailsHandler {
                client: client.clone(),
            }),
        });

        registry.register(Tool {
            name: "search_by_author".to_string(),
            description: "Search for articles by a specific author".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "author_name": {
                        "type": "string",
                        "description": "Author name to search for"
                    },
                    "max_results": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 100,
                        "default": 20,
                        "description": "Maximum number of results"
                    }
                },
                "required": ["author_name"]
            }),
            handler: Arc::new(SearchByAuthorHandler {
                client: client.clone(),
            }),
        });

        registry.register(Tool {
            name: "find_related_articles".to_string(),
            description: "Find articles related to a specific PMID".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "pmid": {
                        "type": "string",
                        "description": "PMID of the reference article"
                    },
                    "max_results": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 50,
                        "default": 10,
                        "description": "Maximum number of related articles"
                    }
                },
                "required": ["pmid"]
            }),
            handler: Arc::new(FindRelatedHandler {
                client: client.clone(),
            }),
        });

        registry.register(Tool {
            name: "export_citations".to_string(),
            description: "Export article citations in various formats".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "pmids": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "List of PubMed IDs to export"
                    },
                    "format": {
                        "type": "string",
                        "enum": ["bibtex", "endnote", "ris", "apa", "mla", "chicago", "vancouver"],
                        "default": "bibtex",
                        "description": "Citation format"
                    },
                    "include_abstracts": {
                        "type": "boolean",
                        "default": false,
                        "description": "Include abstracts in citations"
                    }
                },
                "required": ["pmids"]
            }),
            handler: Arc::new(ExportCitationsHandler {
                client: client.clone(),
            }),
        });

        registry.register(Tool {
            name: "search_by_journal".to_string(),
            description: "Search articles from a specific journal".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "journal_name": {
                        "type": "string",
                        "description": "Journal name or abbreviation"
                    },
                    "max_results": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 100,
                        "default": 20,
                        "description": "Maximum number of results"
                    },
                    "date_from": {"type": "string", "description": "Start date (YYYY/MM/DD)"},
                    "date_to": {"type": "string", "description": "End date (YYYY/MM/DD)"}
                },
                "required": ["journal_name"]
            }),
            handler: Arc::new(SearchByJournalHandler {
                client: client.clone(),
            }),
        });

        registry.register(Tool {
            name: "search_mesh_terms".to_string(),
            description: "Search articles indexed under a MeSH (Medical Subject Headings) term"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "term": {
                        "type": "string",
                        "description": "MeSH term to search for"
                    },
                    "max_results": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 100,
                        "default": 20,
                        "description": "Maximum number of results"
                    }
                },
                "required": ["term"]
            }),
            handler: Arc::new(SearchMeshHandler { client }),
        });

        registry
    }

    fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// All registered tools
    pub fn all(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values()
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| format!("Unknown tool: {}", name))?;
        tool.handler.execute(args).await
    }
}

fn optional_usize(args: &Value, key: &str, default: usize) -> usize {
    args.get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .unwrap_or(default)
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("Missing '{}' parameter", key))
}

/// Collect PMIDs from the `pmids` argument. Entries that are not bare
/// PMIDs (e.g. "PMID: 12345678") have candidate IDs pulled out of the
/// text instead of being passed through verbatim.
fn pmid_list(args: &Value) -> Result<Vec<String>, String> {
    let entries = args
        .get("pmids")
        .and_then(|v| v.as_array())
        .ok_or("Missing 'pmids' parameter")?;

    let mut pmids: Vec<String> = Vec::new();
    for entry in entries {
        let Some(text) = entry.as_str() else {
            continue;
        };
        let trimmed = text.trim();
        let found = if validate_pmid(trimmed) {
            vec![trimmed.to_string()]
        } else {
            extract_pmids(trimmed)
        };
        for pmid in found {
            if !pmids.contains(&pmid) {
                pmids.push(pmid);
            }
        }
    }
    if pmids.is_empty() {
        return Err("'pmids' must contain at least one PMID".to_string());
    }
    Ok(pmids)
}

/// Handler for the general search tool
#[derive(Debug)]
pub struct SearchArticlesHandler {
    pub client: Arc<PubMedClient>,
}

#[async_trait::async_trait]
impl ToolHandler for SearchArticlesHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let criteria: SearchCriteria =
            serde_json::from_value(args).map_err(|e| format!("Invalid arguments: {}", e))?;
        let result = self
            .client
            .search_articles(&criteria)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_value(result).map_err(|e| e.to_string())
    }
}

/// Handler for multi-term boolean search
#[derive(Debug)]
pub struct AdvancedSearchHandler {
    pub client: Arc<PubMedClient>,
}

impl AdvancedSearchHandler {
    fn compose_query(args: &Value) -> Result<String, String> {
        let terms = args
            .get("search_terms")
            .and_then(|v| v.as_array())
            .ok_or("Missing 'search_terms' parameter")?;
        if terms.is_empty() {
            return Err("'search_terms' must contain at least one term".to_string());
        }

        let mut query = String::new();
        for (i, entry) in terms.iter().enumerate() {
            let term = entry
                .get("term")
                .and_then(|v| v.as_str())
                .ok_or("Each search term needs a 'term' string")?;
            let field = entry.get("field").and_then(|v| v.as_str()).unwrap_or("all");
            let tagged = match field {
                "title" => format!("\"{}\"[Title]", term),
                "abstract" => format!("\"{}\"[Abstract]", term),
                "author" => format!("\"{}\"[Author]", term),
                "journal" => format!("\"{}\"[Journal]", term),
                "mesh" => format!("\"{}\"[MeSH Terms]", term),
                _ => term.to_string(),
            };
            if i > 0 {
                let operator = entry
                    .get("operator")
                    .and_then(|v| v.as_str())
                    .unwrap_or("AND");
                query.push_str(&format!(" {} ", operator));
            }
            query.push_str(&format!("({})", tagged));
        }

        if let Some(filters) = args.get("filters") {
            let values = |key: &str| -> Vec<&str> {
                filters
                    .get(key)
                    .and_then(|v| v.as_array())
                    .map(|a| a.iter().filter_map(|v| v.as_str()).collect())
                    .unwrap_or_default()
            };

            let publication_types = values("publication_types");
            if !publication_types.is_empty() {
                let group = publication_types
                    .iter()
                    .map(|pt| format!("\"{}\"[Publication Type]", pt))
                    .collect::<Vec<_>>()
                    .join(" OR ");
                query.push_str(&format!(" AND ({})", group));
            }

            let languages = values("languages");
            if !languages.is_empty() {
                let group = languages
                    .iter()
                    .map(|lang| format!("\"{}\"[Language]", lang))
                    .collect::<Vec<_>>()
                    .join(" OR ");
                query.push_str(&format!(" AND ({})", group));
            }

            if values("species")
                .iter()
                .any(|s| s.eq_ignore_ascii_case("humans"))
            {
                query.push_str(" AND humans[MeSH Terms]");
            }
        }

        Ok(query)
    }
}

#[async_trait::async_trait]
impl ToolHandler for AdvancedSearchHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let query = Self::compose_query(&args)?;
        let criteria =
            SearchCriteria::new(query).max_results(optional_usize(&args, "max_results", 50));
        let result = self
            .client
            .search_articles(&criteria)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_value(result).map_err(|e| e.to_string())
    }
}

/// Handler for PMID detail lookup
#[derive(Debug)]
pub struct GetArticleDetailsHandler {
    pub client: Arc<PubMedClient>,
}

#[async_trait::async_trait]
impl ToolHandler for GetArticleDetailsHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let pmids = pmid_list(&args)?;
        let include_abstracts = args
            .get("include_abstracts")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        let mut articles = self
            .client
            .fetch_articles(&pmids)
            .await
            .map_err(|e| e.to_string())?;
        if !include_abstracts {
            for article in &mut articles {
                article.abstract_text = None;
            }
        }
        serde_json::to_value(articles).map_err(|e| e.to_string())
    }
}

/// Handler for author search
#[derive(Debug)]
pub struct SearchByAuthorHandler {
    pub client: Arc<PubMedClient>,
}

#[async_trait::async_trait]
impl ToolHandler for SearchByAuthorHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let author_name = required_str(&args, "author_name")?;
        let max_results = optional_usize(&args, "max_results", 20);
        let result = self
            .client
            .search_by_author(author_name, max_results)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_value(result).map_err(|e| e.to_string())
    }
}

/// Handler for related-article lookup
#[derive(Debug)]
pub struct FindRelatedHandler {
    pub client: Arc<PubMedClient>,
}

#[async_trait::async_trait]
impl ToolHandler for FindRelatedHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let pmid = required_str(&args, "pmid")?;
        let max_results = optional_usize(&args, "max_results", 10);
        let articles = self
            .client
            .related_articles(pmid, max_results)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_value(articles).map_err(|e| e.to_string())
    }
}

/// Handler for citation export
#[derive(Debug)]
pub struct ExportCitationsHandler {
    pub client: Arc<PubMedClient>,
}

#[async_trait::async_trait]
impl ToolHandler for ExportCitationsHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let pmids = pmid_list(&args)?;
        let style: CitationFormat = args
            .get("format")
            .and_then(|v| v.as_str())
            .unwrap_or("bibtex")
            .parse()?;
        let include_abstracts = args
            .get("include_abstracts")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let mut articles = self
            .client
            .fetch_articles(&pmids)
            .await
            .map_err(|e| e.to_string())?;
        if !include_abstracts {
            for article in &mut articles {
                article.abstract_text = None;
            }
        }
        Ok(json!({
            "format": style.to_string(),
            "count": articles.len(),
            "citations": citation::format_many(&articles, style),
        }))
    }
}

/// Handler for journal-scoped search
#[derive(Debug)]
pub struct SearchByJournalHandler {
    pub client: Arc<PubMedClient>,
}

#[async_trait::async_trait]
impl ToolHandler for SearchByJournalHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let journal_name = required_str(&args, "journal_name")?;
        let mut criteria = SearchCriteria::new("")
            .journal(journal_name)
            .max_results(optional_usize(&args, "max_results", 20));
        if let Some(date_from) = args.get("date_from").and_then(|v| v.as_str()) {
            criteria = criteria.date_from(date_from);
        }
        if let Some(date_to) = args.get("date_to").and_then(|v| v.as_str()) {
            criteria = criteria.date_to(date_to);
        }
        let result = self
            .client
            .search_articles(&criteria)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_value(result).map_err(|e| e.to_string())
    }
}

/// Handler for MeSH-term search
#[derive(Debug)]
pub struct SearchMeshHandler {
    pub client: Arc<PubMedClient>,
}

#[async_trait::async_trait]
impl ToolHandler for SearchMeshHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let term = required_str(&args, "term")?;
        let criteria = SearchCriteria::new("")
            .mesh_term(term)
            .max_results(optional_usize(&args, "max_results", 20));
        let result = self
            .client
            .search_articles(&criteria)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_value(result).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientOptions, Transport};
    use crate::error::Error;

    #[derive(Debug)]
    struct EmptyTransport;

    #[async_trait::async_trait]
    impl Transport for EmptyTransport {
        async fn fetch(
            &self,
            endpoint: &str,
            _params: &[(String, String)],
        ) -> Result<String, Error> {
            if endpoint.contains("esearch") {
                Ok(r#"{"esearchresult": {"count": "0", "idlist": []}}"#.to_string())
            } else {
                Ok("<PubmedArticleSet></PubmedArticleSet>".to_string())
            }
        }
    }

    fn registry() -> ToolRegistry {
        let client = PubMedClient::new(
            Arc::new(EmptyTransport),
            ClientOptions {
                rate_limit: 1000.0,
                ..Default::default()
            },
        )
        .unwrap();
        ToolRegistry::new(Arc::new(client))
    }

    #[test]
    fn test_all_tools_registered() {
        let registry = registry();
        for name in [
            "search_pubmed",
            "advanced_search",
            "get_article_details",
            "search_by_author",
            "find_related_articles",
            "export_citations",
            "search_by_journal",
            "search_mesh_terms",
        ] {
            assert!(registry.get(name).is_some(), "missing tool {}", name);
        }
        assert_eq!(registry.all().count(), 8);
    }

    #[tokio::test]
    async fn test_unknown_tool_rejected() {
        let err = registry()
            .execute("summon_articles", json!({}))
            .await
            .unwrap_err();
        assert!(err.contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_search_tool_empty_result() {
        let result = registry()
            .execute("search_pubmed", json!({"query": "nothing matches"}))
            .await
            .unwrap();
        assert_eq!(result["total_results"], 0);
        assert_eq!(result["returned_results"], 0);
    }

    #[tokio::test]
    async fn test_search_tool_requires_query() {
        let err = registry()
            .execute("search_pubmed", json!({}))
            .await
            .unwrap_err();
        assert!(err.contains("Invalid arguments"));
    }

    #[tokio::test]
    async fn test_export_rejects_unknown_format() {
        let err = registry()
            .execute(
                "export_citations",
                json!({"pmids": ["12345678"], "format": "wordperfect"}),
            )
            .await
            .unwrap_err();
        assert!(err.contains("unknown citation format"));
    }

    #[tokio::test]
    async fn test_details_requires_pmids() {
        let err = registry()
            .execute("get_article_details", json!({"pmids": []}))
            .await
            .unwrap_err();
        assert!(err.contains("at least one PMID"));
    }

    #[test]
    fn test_pmid_list_extracts_from_free_text() {
        let pmids = pmid_list(&json!({
            "pmids": ["12345678", "PMID: 23456789", "see 12345678 and 34567890"]
        }))
        .unwrap();
        assert_eq!(pmids, vec!["12345678", "23456789", "34567890"]);
    }

    #[tokio::test]
    async fn test_details_accept_annotated_pmids() {
        let result = registry()
            .execute("get_article_details", json!({"pmids": ["PMID: 12345678"]}))
            .await
            .unwrap();
        assert!(result.as_array().is_some());
    }

    #[test]
    fn test_advanced_query_composition() {
        let query = AdvancedSearchHandler::compose_query(&json!({
            "search_terms": [
                {"term": "cancer", "field": "title"},
                {"term": "smith", "field": "author", "operator": "AND"},
                {"term": "mouse models", "operator": "NOT"}
            ],
            "filters": {
                "publication_types": ["Review", "Clinical Trial"],
                "languages": ["eng"],
                "species": ["Humans"]
            }
        }))
        .unwrap();
        assert_eq!(
            query,
            "(\"cancer\"[Title]) AND (\"smith\"[Author]) NOT (mouse models) \
             AND (\"Review\"[Publication Type] OR \"Clinical Trial\"[Publication Type]) \
             AND (\"eng\"[Language]) AND humans[MeSH Terms]"
        );
    }

    #[tokio::test]
    async fn test_advanced_search_requires_terms() {
        let err = registry()
            .execute("advanced_search", json!({"search_terms": []}))
            .await
            .unwrap_err();
        assert!(err.contains("at least one term"));

        let err = registry()
            .execute("advanced_search", json!({}))
            .await
            .unwrap_err();
        assert!(err.contains("search_terms"));
    }

    #[tokio::test]
    async fn test_advanced_search_empty_result() {
        let result = registry()
            .execute(
                "advanced_search",
                json!({"search_terms": [{"term": "nothing", "field": "mesh"}]}),
            )
            .await
            .unwrap();
        assert_eq!(result["total_results"], 0);
    }
}
