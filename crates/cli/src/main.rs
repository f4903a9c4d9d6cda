mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "folio")]
#[command(version, about = "Build-time tooling for a portfolio/blog site", long_about = None)]
struct Cli {
    /// Path to site.toml
    #[arg(short, long, global = true, default_value = "site.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate missing OG preview images and link them in the post listing
    Og,

    /// Snapshot client-rendered routes into static HTML files
    Prerender,

    /// Serve a built site locally, falling back to index.html for unknown paths
    Serve {
        /// Directory containing the built site
        dir: PathBuf,

        /// Port to serve on
        #[arg(short, long, default_value = "4173")]
        port: u16,
    },

    /// Check site.toml, the post listing, the OG template and linked images
    Validate,

    /// Scaffold site.toml, a sample listing and an OG template
    Init {
        /// Project directory to initialize
        path: PathBuf,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log::LevelFilter::Info);
    builder.parse_env(env_logger::Env::default());
    builder.init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Og => commands::og::run(cli.config).await,
        Command::Prerender => commands::prerender::run(cli.config).await,
        Command::Serve { dir, port } => commands::serve::run(dir, port).await,
        Command::Validate => commands::validate::run(cli.config),
        Command::Init { path } => commands::init::run(path),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "folio", &mut io::stdout());
            Ok(())
        }
    }
}
