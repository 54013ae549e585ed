//! testai CLI.
//!
//! Launches a local Chrome, opens a page and resolves one element through the
//! native locator and classifier fallback, printing the outcome.
//!
//! Usage:
//!   $ TESTAI_API_KEY=... TESTAI_CHROME_BIN=/path/to/chrome \
//!     cargo run --bin testai -- find --url https://example.com --name login_button --css "#login"

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::info;
use serde_json::json;
use testai_rs::config::{TestAiConfig, TestAiConfigOverrides, Verbosity};
use testai_rs::driver::{CandidateElement, Locator};
use testai_rs::resolver::{ElementResolver, ResolvedElement};
use testai_rs::runtime::{ChromiumoxideRuntime, LaunchOptions};
use testai_rs::session::Session;

#[derive(Parser)]
#[command(name = "testai", author, version, about = "Element lookup with classifier fallback")]
struct Cli {
    /// Increase log verbosity (pass multiple times for DEBUG).
    #[arg(long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a single element on a page.
    Find(FindArgs),
}

#[derive(Args)]
struct FindArgs {
    /// Page to open.
    #[arg(long)]
    url: String,

    /// Logical element name known to the classifier.
    #[arg(long)]
    name: Option<String>,

    #[arg(long, conflicts_with_all = ["xpath", "id"])]
    css: Option<String>,

    #[arg(long, conflicts_with = "id")]
    xpath: Option<String>,

    #[arg(long)]
    id: Option<String>,

    /// Classification server; defaults to TESTAI_FLUFFY_DRAGON_URL or the production service.
    #[arg(long)]
    server_url: Option<String>,

    /// Chrome binary; defaults to TESTAI_CHROME_BIN.
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Show the launched browser window.
    #[arg(long)]
    show_browser: bool,
}

impl FindArgs {
    fn locator(&self) -> Option<Locator> {
        if let Some(css) = &self.css {
            Some(Locator::CssSelector(css.clone()))
        } else if let Some(xpath) = &self.xpath {
            Some(Locator::XPath(xpath.clone()))
        } else {
            self.id.clone().map(Locator::Id)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_env_logger();

    let cli = Cli::parse();
    let verbosity = verbosity_from_count(cli.verbose);

    match cli.command {
        Command::Find(args) => run_find(args, verbosity).await?,
    }

    Ok(())
}

async fn run_find(args: FindArgs, verbosity: Verbosity) -> Result<()> {
    let locator = args.locator();
    if locator.is_none() && args.name.is_none() {
        bail!("pass --name, a locator (--css, --xpath, --id), or both");
    }

    let mut overrides = TestAiConfigOverrides {
        verbose: Some(verbosity),
        ..TestAiConfigOverrides::default()
    };
    if let Some(url) = &args.server_url {
        overrides = overrides.server_url(url.clone());
    }
    let config = TestAiConfig::from_env()
        .context("failed to read configuration from the environment")?
        .with_overrides(overrides);

    let options = LaunchOptions {
        chrome_executable: args
            .chrome
            .clone()
            .or_else(|| env::var("TESTAI_CHROME_BIN").ok().map(PathBuf::from)),
        headless: !args.show_browser,
        ..LaunchOptions::default()
    };

    let runtime = ChromiumoxideRuntime::new();
    runtime
        .launch(&options)
        .await
        .context("failed to launch Chrome")?;
    let driver = runtime
        .new_page(&args.url)
        .await
        .with_context(|| format!("failed to open {}", args.url))?;

    let session = Session::start(&config, &driver)
        .await
        .context("failed to start session")?;
    info!(
        "Session {} against {} (multiplier {})",
        session.run_id(),
        session.server_url(),
        session.multiplier().value()
    );

    let resolver = ElementResolver::new(driver, session);
    let outcome = match &locator {
        Some(locator) => resolver.find_element(locator, args.name.as_deref()).await,
        None => {
            let name = args.name.as_deref().unwrap_or_default();
            resolver.find_by_element_name(name).await
        }
    };

    let report = match outcome {
        Ok(resolved) => {
            let (kind, rect, tag) = match &resolved.element {
                ResolvedElement::Live(element) => (
                    "live",
                    element.rect().await.ok(),
                    element.tag_role().await.unwrap_or_default(),
                ),
                ResolvedElement::Classified(element) => (
                    "classified",
                    Some(element.rect()),
                    element.tag_role().to_string(),
                ),
            };
            json!({
                "resolved": true,
                "kind": kind,
                "key": resolved.key,
                "tag": tag,
                "rect": rect,
            })
        }
        Err(err) => json!({
            "resolved": false,
            "category": err.category(),
            "message": err.to_string(),
        }),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    info!("Metrics: {:?}", resolver.metrics());

    runtime.shutdown().await.context("failed to shut down Chrome")?;
    Ok(())
}

fn verbosity_from_count(count: u8) -> Verbosity {
    match count {
        0 => Verbosity::Medium,
        _ => Verbosity::Detailed,
    }
}

fn init_env_logger() {
    if env::var("RUST_LOG").is_err() {
        unsafe {
            env::set_var("RUST_LOG", "info");
        }
    }

    let _ = env_logger::Builder::from_env(env_logger::Env::default())
        .format_timestamp_secs()
        .try_init();
}
