//! Data models: articles as normalized from EFetch XML, and the search
//! criteria/result types used across the client and MCP tools.

pub mod article;
pub mod search;

pub use article::{Article, ArticleBuilder, Author, Journal, MeshTerm, PubDate};
pub use search::{CitationFormat, DateRange, SearchCriteria, SearchResult, SortOrder};
