//! Portal CLI
//!
//! Renders portal views headlessly against a live API:
//! - Render a location and print the page
//! - List routes
//! - Generate a config file

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use portal::{
    generate_default_config, Config, HeadlessPage, History, JsonRenderer, LoggingConfig,
    MemoryHistory, Portal, ReqwestTransport, Route, StaticSession,
};

#[derive(Parser)]
#[command(name = "portal")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Healthcare data portal client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: searched in the usual locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend URL, overrides the config file
    #[arg(long, global = true)]
    pub base_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a location and print the resulting page
    Render {
        /// Location, e.g. "patients?organizationId=7" or "/portal/studies"
        location: String,
    },

    /// List registered routes
    Routes,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }

    init_logging(&config.logging);

    match cli.command {
        Commands::Render { location } => render(&config, &location).await?,

        Commands::Routes => {
            for route in Route::ALL {
                println!(
                    "{:<14} {:<14} {}{}",
                    route.label(),
                    route.icon_class(),
                    config.portal.route_prefix,
                    route.key()
                );
            }
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Config written to {}", path.display());
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("portal={}", config.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn render(config: &Config, location: &str) -> anyhow::Result<()> {
    let prefix = &config.portal.route_prefix;
    let url = if location.starts_with(prefix.as_str()) {
        location.to_string()
    } else {
        format!("{}{}", prefix, location.trim_start_matches('/'))
    };

    let page = Arc::new(HeadlessPage::new());
    let history = Arc::new(MemoryHistory::new(&url));
    let transport = ReqwestTransport::new().context("building HTTP client")?;

    let mut portal = Portal::new(
        config,
        Arc::new(transport),
        Arc::new(StaticSession::from_config(&config.session)),
        Arc::new(JsonRenderer::new()),
        page.clone(),
        history.clone(),
    );
    portal.start().await?;

    for alert in page.alerts() {
        eprintln!("alert: {}", alert);
    }
    if let Some(banner) = page.error_banner() {
        eprintln!("error: {}", banner);
    }
    if let Some(validation) = page.validation() {
        eprintln!("validation: {}", validation);
    }

    match page.body() {
        Some(body) => {
            println!("{}", body);
            println!("<!-- location: {} -->", history.current());
            if let Some(route_key) = page.modal() {
                println!("<!-- modal: {} -->", route_key);
            }
        }
        None => anyhow::bail!("nothing rendered for {}", url),
    }

    Ok(())
}
