use jobsift::cli::{Cli, Commands, ConfigAction, ParseTarget};
use jobsift::config::{Config, LoggingConfig, SettingsFile};
use jobsift::dom::{DomSurface, HtmlPage};
use jobsift::error::{Result, SiftError};
use jobsift::filtering::ItemClassifier;
use jobsift::orchestrator::{FilterOrchestrator, InboundMessage, StatusReport};
use jobsift::parsers::{parse_proposals_bound, parse_spend};
use jobsift::schedule::SystemClock;
use serde::Serialize;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    let config = load_config(cli.config.clone())?;

    // Initialize logging
    init_logging(&config.logging, cli.verbose);

    // Handle commands
    match cli.command {
        Commands::Check {
            page,
            url,
            settings,
            json,
        } => {
            cmd_check(config, &page, url, settings, json)?;
        }
        Commands::Send {
            page,
            message,
            url,
            settings,
        } => {
            cmd_send(config, &page, url, settings, &message)?;
        }
        Commands::Parse { target } => {
            cmd_parse(target);
        }
        Commands::Config { action } => {
            cmd_config(cli.config, config, action)?;
        }
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig, verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    if !logging.enabled && !verbose {
        return;
    }

    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_env("JOBSIFT_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(format!("jobsift={}", level)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Per-item line of the `check` report
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemReport {
    index: usize,
    spend_amount: f64,
    proposals_count: u32,
    hidden: bool,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    status: StatusReport,
    items: Vec<ItemReport>,
}

fn cmd_check(
    mut config: Config,
    page_path: &Path,
    url: String,
    settings: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let settings_file = settings_file(settings)?;
    let stored = new_runtime()?.block_on(settings_file.load());
    config.apply_stored_settings(&stored);

    let page = HtmlPage::load(page_path, url)?;
    let classifier = ItemClassifier::new(&config);
    let list_selector = config.selectors.job_tile_list.clone();

    let mut orchestrator = FilterOrchestrator::new(config, page, SystemClock::new());
    orchestrator.initialize();

    let Some(list) = orchestrator.dom().query(&list_selector) else {
        return Err(anyhow::anyhow!("No job list matching {} in {:?}", list_selector, page_path).into());
    };

    let items: Vec<ItemReport> = orchestrator
        .dom()
        .children(list)
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let classified = classifier.classify(orchestrator.dom(), item)?;
            Some(ItemReport {
                index,
                spend_amount: classified.spend_amount,
                proposals_count: classified.proposals_count,
                hidden: orchestrator.is_hidden(&item),
            })
        })
        .collect();

    let report = CheckReport {
        status: orchestrator.status(),
        items,
    };

    if json {
        println!("{}", to_json(&report)?);
        return Ok(());
    }

    println!("Jobsift Check");
    println!("=============");
    println!(
        "\nThresholds: spend >= ${}, proposals {}..={}",
        report.status.thresholds.minimum_spent,
        report.status.thresholds.proposals_min,
        report.status.thresholds.proposals_max
    );
    println!(
        "Items: {} hidden, {} visible ({:.2}ms)",
        report.status.last_hidden_count,
        report.status.last_visible_count,
        report.status.last_processing_ms
    );

    if !report.items.is_empty() {
        println!();
        for item in &report.items {
            println!(
                "  #{:<3} ${:<10} {:>3} proposals  {}",
                item.index,
                item.spend_amount,
                item.proposals_count,
                if item.hidden { "hidden" } else { "visible" }
            );
        }
    }

    Ok(())
}

fn cmd_send(
    config: Config,
    page_path: &Path,
    url: String,
    settings: Option<PathBuf>,
    message: &str,
) -> Result<()> {
    let message: InboundMessage = serde_json::from_str(message).map_err(|e| SiftError::Json {
        source: e,
        context: "Failed to parse inbound message".to_string(),
    })?;
    let settings_file = settings_file(settings)?;
    let page = HtmlPage::load(page_path, url)?;

    let response = new_runtime()?.block_on(async {
        let (event_loop, handle) = jobsift::runtime::start(config, &settings_file, page).await?;

        let client = async move {
            let response = handle.send_message(message).await;
            if let Err(e) = handle.shutdown().await {
                tracing::debug!("Event loop already stopped: {}", e);
            }
            response
        };

        let (_, response) = tokio::join!(event_loop.run(), client);
        response
    })?;

    println!("{}", to_json(&response)?);
    Ok(())
}

fn cmd_parse(target: ParseTarget) {
    match target {
        ParseTarget::Spend { text } => println!("{}", parse_spend(&text)),
        ParseTarget::Proposals { text } => println!("{}", parse_proposals_bound(&text)),
    }
}

fn cmd_config(config_path: Option<PathBuf>, config: Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml = toml::to_string_pretty(&config)?;
            println!("{}", toml);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            Config::load(&path)?;
            println!("✓ Configuration is valid: {}", path.display());
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            // Create parent directory
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SiftError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        let mut config = Config::default();
        config.apply_env_overrides();
        return Ok(config);
    }

    Config::load(&path)
}

fn settings_file(path: Option<PathBuf>) -> Result<SettingsFile> {
    match path {
        Some(path) => Ok(SettingsFile::new(path)),
        None => SettingsFile::default_location(),
    }
}

fn new_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| SiftError::Io {
            source: e,
            context: "Failed to create tokio runtime".to_string(),
        })
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| SiftError::Json {
        source: e,
        context: "Failed to serialize output".to_string(),
    })
}
