//! # PubMed MCP
//!
//! A Model Context Protocol (MCP) server for searching PubMed through the
//! NCBI E-utilities and exporting citations in academic formats.
//!
//! ## Architecture
//!
//! - [`models`]: Core data structures (Article, SearchCriteria, etc.)
//! - [`query`]: Compilation of search criteria into PubMed term syntax
//! - [`client`]: Rate-limited, cached E-utilities client
//! - [`citation`]: Citation formatting (BibTeX, APA, MLA, Chicago,
//!   Vancouver, EndNote, RIS)
//! - [`mcp`]: MCP protocol implementation and server
//! - [`utils`]: Rate limiter, response cache, PMID helpers
//! - [`config`]: Configuration management

pub mod citation;
pub mod client;
pub mod config;
pub mod error;
pub mod mcp;
pub mod models;
pub mod query;
pub mod utils;

// Re-export commonly used types
pub use client::{ClientOptions, PubMedClient};
pub use error::Error;
pub use models::{Article, CitationFormat, SearchCriteria, SearchResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
