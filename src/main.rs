use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use telescope::channel::EventChannel;
use telescope::cli::{Cli, Commands, ConfigAction, SettingsAction};
use telescope::config::Config;
use telescope::error::{Result, TelescopeError};
use telescope::filters::GroupSelector;
use telescope::intel::{CapabilityTag, PilotIntelRecord, ThreatLevel};
use telescope::session::{name_count, ReplayEngine};
use telescope::settings::{JsonSettingsStore, SettingsManager};
use telescope::store::{sorted_view, SortDirection, SortKey, SortState};
use telescope::window::{
    spawn_window, OverlayManager, WindowHandle, WindowManager, WindowOptions, WindowSnapshot,
};

const PRIMARY_LABEL: &str = "main";
const SETTLE_TIMEOUT: Duration = Duration::from_secs(60);
const CONVERGE_TIMEOUT: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    let path = match cli.config.clone() {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config_found = path.exists();
    let config = Config::load_or_default(&path);

    // Initialize logging
    let level = match (&config, cli.verbose) {
        (_, true) => "debug".to_string(),
        (Ok(config), false) => config.logging.level.to_lowercase(),
        (Err(_), false) => "info".to_string(),
    };
    init_logging(&level);

    if !config_found {
        tracing::debug!(
            "Config file not found, using defaults. Run 'telescope config init' to create one."
        );
    }

    // Handle commands
    match cli.command {
        Commands::Lookup {
            fixture,
            names_file,
            names,
            overlay,
            threat,
            tag,
            corp,
            alliance,
            json,
        } => {
            let request = LookupRequest {
                fixture,
                names_file,
                names,
                overlay,
                threat,
                tags: tag,
                corp,
                alliance,
                json,
            };
            cmd_lookup(&config?, request)?;
        }
        Commands::Config { action } => {
            cmd_config(&path, config, action)?;
        }
        Commands::Settings { action } => {
            cmd_settings(&config?, action)?;
        }
    }

    Ok(())
}

fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("telescope={}", level)));

    fmt().with_env_filter(filter).with_target(false).init();
}

struct LookupRequest {
    fixture: PathBuf,
    names_file: Option<PathBuf>,
    names: Vec<String>,
    overlay: bool,
    threat: Option<String>,
    tags: Vec<String>,
    corp: Option<String>,
    alliance: Option<String>,
    json: bool,
}

impl LookupRequest {
    /// Names from the file and the command line, one per line
    fn names_text(&self) -> Result<String> {
        let mut lines = Vec::new();
        if let Some(path) = &self.names_file {
            let content = std::fs::read_to_string(path).map_err(|e| TelescopeError::Io {
                source: e,
                context: format!("Failed to read names file: {}", path.display()),
            })?;
            lines.push(content);
        }
        lines.extend(self.names.iter().cloned());
        Ok(lines.join("\n"))
    }

    fn tags(&self) -> Result<Vec<CapabilityTag>> {
        self.tags
            .iter()
            .map(|t| {
                CapabilityTag::parse(t).ok_or_else(|| {
                    TelescopeError::Other(anyhow::anyhow!(
                        "Unknown tag '{}', expected one of cyno, recon, blops, capital, super, solo",
                        t
                    ))
                })
            })
            .collect()
    }

    fn threat(&self) -> Result<Option<ThreatLevel>> {
        match &self.threat {
            None => Ok(None),
            Some(value) => match ThreatLevel::parse(value) {
                ThreatLevel::Unknown => Err(TelescopeError::Other(anyhow::anyhow!(
                    "Unknown threat level '{}'",
                    value
                ))),
                level => Ok(Some(level)),
            },
        }
    }
}

fn cmd_lookup(config: &Config, request: LookupRequest) -> Result<()> {
    let names_text = request.names_text()?;
    if name_count(&names_text) == 0 {
        println!("No pilot names given");
        return Ok(());
    }
    let threat = request.threat()?;
    let tags = request.tags()?;

    let engine = ReplayEngine::from_file(&request.fixture)?.with_delay(config.event_delay()?);
    let settings = SettingsManager::load(Arc::new(JsonSettingsStore::new(
        config.settings_path()?,
    )));
    let sort = settings.get().sort_state();
    let auto_scan = settings.get().auto_scan_on_shortcut;

    let rt = tokio::runtime::Runtime::new().map_err(|e| TelescopeError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })?;

    rt.block_on(async {
        let channel = EventChannel::new(config.channel.capacity);
        let manager = Arc::new(OverlayManager::new(
            channel.clone(),
            config.overlay.window_options(),
            config.overlay.geometry(),
        ));
        let primary = spawn_window(
            WindowOptions::primary(PRIMARY_LABEL).with_auto_scan(auto_scan),
            &channel,
            Some(Arc::new(engine)),
            Some(manager.clone()),
        );

        if request.overlay {
            primary.toggle_overlay().await?;
        }

        let Some(session) = primary.start_lookup(names_text).await? else {
            println!("Nothing to look up");
            return Ok(());
        };
        tracing::debug!("Waiting for session {}", session);
        primary.wait_settled(SETTLE_TIMEOUT).await?;

        if let Some(level) = threat {
            primary.toggle_threat(level).await?;
        }
        for tag in tags {
            primary.toggle_tag(tag).await?;
        }
        if let Some(ticker) = &request.corp {
            primary
                .toggle_corporation(GroupSelector::Ticker(ticker.clone()))
                .await?;
        }
        if let Some(ticker) = &request.alliance {
            primary
                .toggle_alliance(GroupSelector::Ticker(ticker.clone()))
                .await?;
        }

        let snapshot = primary.snapshot().await?;
        if request.json {
            print_json(&snapshot, sort)?;
        } else {
            print_table(&snapshot, sort);
        }

        if let Some(overlay) = manager.overlay().await {
            report_overlay(&overlay, &snapshot).await?;
        }

        primary.shutdown().await?;
        manager.close_overlay().await?;
        Ok::<_, TelescopeError>(())
    })
}

fn print_json(snapshot: &WindowSnapshot, sort: SortState) -> Result<()> {
    let rows: Vec<&PilotIntelRecord> = sorted_view(&snapshot.visible, sort);
    let json = serde_json::to_string_pretty(&rows).map_err(|e| TelescopeError::Json {
        source: e,
        context: "Failed to serialize results".to_string(),
    })?;
    println!("{}", json);
    Ok(())
}

fn print_table(snapshot: &WindowSnapshot, sort: SortState) {
    if let Some(error) = &snapshot.error {
        println!("Lookup failed: {}", error);
    }

    println!(
        "{} of {} pilots shown (sorted by {} {})",
        snapshot.visible.len(),
        snapshot.records.len(),
        sort.key,
        match sort.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    );
    println!(
        "{:<9} {:<28} {:<7} {:<7} {:>6} {:>6}  TAGS",
        "THREAT", "PILOT", "CORP", "ALLY", "KILLS", "LOSSES"
    );

    for record in sorted_view(&snapshot.visible, sort) {
        let (kills, losses) = record
            .valid_stats()
            .map(|s| (s.ships_destroyed.to_string(), s.ships_lost.to_string()))
            .unwrap_or_else(|| ("-".to_string(), "-".to_string()));
        let tags: Vec<&str> = record.flags.tags().into_iter().map(|t| t.as_str()).collect();

        println!(
            "{:<9} {:<28} {:<7} {:<7} {:>6} {:>6}  {}",
            record.threat_level,
            record.name(),
            record.corporation_ticker().unwrap_or("-"),
            record.alliance_ticker().unwrap_or("-"),
            kills,
            losses,
            tags.join(",")
        );
        if let Some(error) = &record.error {
            println!("          ! {}", error);
        }
    }

    let counts = &snapshot.counts;
    let tiers: Vec<String> = ThreatLevel::KNOWN
        .into_iter()
        .map(|t| format!("{} {}", t, counts.threat(t)))
        .collect();
    println!("\n{}", tiers.join("  "));
}

async fn report_overlay(overlay: &WindowHandle, primary: &WindowSnapshot) -> Result<()> {
    let expected: BTreeSet<i64> = primary.ids().into_iter().collect();
    let filters = primary.filters.clone();

    let converged = overlay
        .wait_until(CONVERGE_TIMEOUT, |s| {
            s.ids().into_iter().collect::<BTreeSet<_>>() == expected && s.filters == filters
        })
        .await;

    match converged {
        Ok(snapshot) => println!(
            "Overlay {} in sync: {} pilots, {} shown",
            overlay.label(),
            snapshot.records.len(),
            snapshot.visible.len()
        ),
        Err(e) => println!("Overlay {} did not converge: {}", overlay.label(), e),
    }
    Ok(())
}

fn cmd_config(path: &Path, config: Result<Config>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let json = serde_json::to_string_pretty(&config?).map_err(|e| TelescopeError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = file.unwrap_or_else(|| path.to_path_buf());
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            Config::default().save(path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn cmd_settings(config: &Config, action: SettingsAction) -> Result<()> {
    let store = Arc::new(JsonSettingsStore::new(config.settings_path()?));
    let mut settings = SettingsManager::load(store);

    match action {
        SettingsAction::Show => {}
        SettingsAction::Reset => {
            settings.reset()?;
            println!("✓ Settings restored to defaults");
        }
        SettingsAction::Sort { key, direction } => {
            let key = SortKey::parse(&key).ok_or_else(|| {
                TelescopeError::Settings(format!("Unknown sort column '{}'", key))
            })?;
            let state = match direction.as_deref().and_then(SortDirection::parse) {
                Some(direction) => {
                    settings.update(|s| {
                        s.sort_column = key;
                        s.sort_direction = direction;
                    })?;
                    SortState::new(key, direction)
                }
                None => settings.handle_sort(key)?,
            };
            println!("✓ Sorting by {} {:?}", state.key, state.direction);
        }
    }

    let json = serde_json::to_string_pretty(settings.get()).map_err(|e| TelescopeError::Json {
        source: e,
        context: "Failed to serialize settings".to_string(),
    })?;
    println!("{}", json);
    Ok(())
}
