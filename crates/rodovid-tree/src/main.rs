//! CLI entry point for the Rodovid family graph.
//!
//! Pure commands (`resolve-date`, `validate`) run offline; `tree` and
//! `stats` connect to Neo4j. Results go to stdout as JSON, diagnostics to
//! stderr.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use rodovid_core::{RodovidConfig, UserId};
use rodovid_graph::{GraphClient, GraphConfig};
use rodovid_tree::FamilyTree;
use rodovid_validate::{FamilyValidator, ValidationRequest};

#[derive(Parser)]
#[command(name = "rodovid")]
#[command(about = "Encrypted family-tree graph: date resolution, validation and tree inspection")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: rodovid).
    #[arg(short, long, default_value = "rodovid", global = true)]
    config: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a free-text date to a year with a confidence tier.
    ResolveDate {
        /// Date text, e.g. "15.03.1890" or "~1850".
        text: String,
    },
    /// Run a validation preview (reads a JSON request from stdin).
    Validate,
    /// Print the tree visible to a user.
    Tree {
        #[arg(long)]
        user: String,
        /// Include ghost nodes.
        #[arg(long)]
        include_deleted: bool,
    },
    /// Print counts over the tree visible to a user.
    Stats {
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config = RodovidConfig::load(&cli.config)?;

    match cli.command {
        Command::ResolveDate { ref text } => {
            let resolved = rodovid_validate::resolve(text.as_str());
            println!("{}", serde_json::to_string(&resolved)?);
        }
        Command::Validate => {
            let input = std::io::read_to_string(std::io::stdin())?;
            let request: ValidationRequest = serde_json::from_str(&input)?;
            let report = FamilyValidator::new(config.validation.clone()).run(&request);
            println!("{}", serde_json::to_string(&report)?);
        }
        Command::Tree { ref user, include_deleted } => {
            let tree = connect(config).await?;
            let snapshot = tree.get_tree(&UserId::new(user.as_str()), include_deleted).await?;
            println!("{}", serde_json::to_string(&snapshot)?);
        }
        Command::Stats { ref user } => {
            let tree = connect(config).await?;
            let stats = tree.tree_stats(&UserId::new(user.as_str())).await?;
            println!("{}", serde_json::to_string(&stats)?);
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if json {
        fmt().json().with_env_filter(filter).with_writer(std::io::stderr).init();
    } else {
        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    }
}

async fn connect(config: RodovidConfig) -> anyhow::Result<FamilyTree<GraphClient>> {
    let graph = GraphClient::connect(&GraphConfig::from(&config.neo4j)).await?;
    Ok(FamilyTree::new(graph).with_config(config))
}
