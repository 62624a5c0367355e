use anyhow::Result;
use clap::{Parser, Subcommand};
use pubmed_mcp::config::{load_config, Config};
use pubmed_mcp::mcp::server::McpServer;
use pubmed_mcp::models::{CitationFormat, SearchCriteria, SortOrder};
use pubmed_mcp::PubMedClient;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// PubMed MCP - Search PubMed and export citations over the Model Context Protocol
#[derive(Parser, Debug)]
#[command(name = "pubmed-mcp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search PubMed and export citations in academic formats", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv for more)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server (default). Speaks stdio unless --http is given.
    Serve {
        /// Serve over HTTP/SSE on this address instead of stdio
        #[arg(long)]
        http: Option<String>,
    },

    /// Search PubMed and print results as JSON
    Search {
        /// Search query using PubMed syntax
        query: String,

        /// Maximum number of results
        #[arg(long, short = 'n', default_value_t = 20)]
        max_results: usize,

        /// Sort newest first instead of by relevance
        #[arg(long)]
        newest: bool,
    },

    /// Fetch full article records by PMID
    Fetch {
        /// PMIDs to fetch
        #[arg(required = true)]
        pmids: Vec<String>,
    },

    /// Export citations for the given PMIDs
    Cite {
        /// PMIDs to cite
        #[arg(required = true)]
        pmids: Vec<String>,

        /// Citation format (bibtex, apa, mla, chicago, vancouver, endnote, ris)
        #[arg(long, short, default_value = "bibtex")]
        format: String,
    },

    /// Find articles related to a PMID
    Related {
        /// PMID of the reference article
        pmid: String,

        /// Maximum number of related articles
        #[arg(long, short = 'n', default_value_t = 10)]
        max_results: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    // Logs go to stderr; stdout belongs to the MCP protocol in stdio mode
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("pubmed_mcp={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    let client = Arc::new(PubMedClient::with_options(config.client_options())?);

    match cli.command.unwrap_or(Commands::Serve { http: None }) {
        Commands::Serve { http } => {
            let server = McpServer::new(client);
            match http {
                Some(addr) => {
                    let (bound, handle) = server.run_http(&addr).await?;
                    tracing::info!("listening on {}", bound);
                    handle.await?;
                }
                None => server.run().await?,
            }
        }
        Commands::Search {
            query,
            max_results,
            newest,
        } => {
            let mut criteria = SearchCriteria::new(query).max_results(max_results);
            if newest {
                criteria = criteria.sort_order(SortOrder::PubDate);
            }
            let result = client.search_articles(&criteria).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Fetch { pmids } => {
            let articles = client.fetch_articles(&pmids).await?;
            println!("{}", serde_json::to_string_pretty(&articles)?);
        }
        Commands::Cite { pmids, format } => {
            let style: CitationFormat = format
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            let citations = client.export_citations(&pmids, style).await?;
            println!("{}", citations);
        }
        Commands::Related { pmid, max_results } => {
            let articles = client.related_articles(&pmid, max_results).await?;
            println!("{}", serde_json::to_string_pretty(&articles)?);
        }
    }

    Ok(())
}
