//! folio - personal site backend
//!
//! Serves the single-page site, counts page views, stores contact form
//! submissions and builds static blog pages.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio::{posts, site, storage, Config};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Personal site backend: SPA hosting, page-view analytics and contact form")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<String>,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration file
    Check {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Show recorded page views, contact submissions and errors
    Stats {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Render markdown blog posts to static HTML
    BuildPosts {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Override the markdown source directory
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Override the HTML output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("folio={level},tower_http={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            let mut config = Config::load(config.as_deref())?;
            init_tracing(&config.logging.level);

            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                config.server.listen = addr;
                config.validate()?;
            }

            let pool = storage::init_pool(&config.database.path).await?;
            site::run_server(config, pool).await
        }

        Commands::Check { config } => {
            let path = config.clone();
            let config = Config::load(config.as_deref())?;
            init_tracing(&config.logging.level);

            tracing::info!(
                config = %path.as_deref().unwrap_or("<defaults>"),
                listen = %config.server.listen,
                database = %config.database.path,
                commit = %site::short_commit(&config.build.commit),
                blocked_patterns = config.contact.blocked_patterns.len(),
                "Configuration is valid"
            );
            Ok(())
        }

        Commands::Stats { config } => {
            let config = Config::load(config.as_deref())?;
            init_tracing(&config.logging.level);

            let pool = storage::init_pool(&config.database.path).await?;
            let page_views = storage::count_page_views(&pool).await?;
            let contacts = storage::contact::count_submissions(&pool).await?;
            let errors = storage::error_log::count_errors(&pool).await?;

            println!("Database: {}", config.database.path);
            println!("  page views:          {}", page_views);
            println!("  contact submissions: {}", contacts);
            println!("  logged errors:       {}", errors);
            Ok(())
        }

        Commands::BuildPosts {
            config,
            source,
            output,
        } => {
            let config = Config::load(config.as_deref())?;
            init_tracing(&config.logging.level);

            let source = source.unwrap_or_else(|| PathBuf::from(&config.posts.source_dir));
            let output = output.unwrap_or_else(|| PathBuf::from(&config.posts.output_dir));

            let report = posts::build_posts(&source, &output)?;
            tracing::info!(
                written = report.written.len(),
                failed = report.failed,
                "Post build finished"
            );

            if report.failed > 0 {
                anyhow::bail!("{} post(s) failed to build", report.failed);
            }
            Ok(())
        }
    }
}
