use std::{fs, path::PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use navflow::{Config, Engine, EngineBuilder, TreeModel};
use tokio::runtime::Handle;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine configuration (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate tree files and print their structure
    Schema {
        /// Tree JSON files; subtrees are linked through their parent reference
        #[arg(required = true)]
        trees: Vec<PathBuf>,
    },
    /// Compute the best path between two nodes
    Path {
        /// Tree JSON files; subtrees are linked through their parent reference
        #[arg(required = true)]
        trees: Vec<PathBuf>,
        /// Tree to navigate in
        #[arg(short, long)]
        tree: String,
        /// Target node id
        #[arg(long)]
        to: String,
        /// Starting node id, the tree root when omitted
        #[arg(long)]
        from: Option<String>,
    },
}

fn load(
    engine: &Engine,
    files: &[PathBuf],
) -> anyhow::Result<Vec<String>> {
    let mut ids = Vec::with_capacity(files.len());
    for file in files {
        let text = fs::read_to_string(file).with_context(|| format!("failed to read {:?}", file))?;
        let model = TreeModel::from_json(&text)?;
        engine.deploy_tree(&model).with_context(|| format!("invalid tree in {:?}", file))?;
        info!("loaded tree {} from {:?}", model.id, file);
        ids.push(model.id);
    }
    Ok(ids)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::create(path)?,
        None => Config::default(),
    };
    let engine = EngineBuilder::new().config(config).handle(Handle::current()).build()?;

    match &cli.command {
        Commands::Schema {
            trees,
        } => {
            for id in load(&engine, trees)? {
                println!("{}\n", engine.tree(&id)?.schema());
            }
        }
        Commands::Path {
            trees,
            tree,
            to,
            from,
        } => {
            load(&engine, trees)?;
            let path = engine.find_path(tree, to, from.as_deref())?;
            info!("found path of {} transitions", path.len());
            println!("{}", serde_json::to_string_pretty(&path)?);
        }
    }

    Ok(())
}
