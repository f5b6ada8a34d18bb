use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use bt_profile_switcher::audio::{BluetoothEndpoint, DeviceKind, StreamCategory};
use bt_profile_switcher::config::{Config, ConfigLoader};
use bt_profile_switcher::logging::{self, LoggingConfig};
use bt_profile_switcher::service::{SignalHandler, SwitcherService};
use bt_profile_switcher::switcher::{ClientFilter, SwitchOrchestrator};
use bt_profile_switcher::system::{AudioControl, PactlAudioControl, PactlEventSource};

#[derive(Parser)]
#[command(name = "bt-profile-switcher")]
#[command(about = "Switches Bluetooth headsets to HSP/HFP for calls and back to A2DP afterwards")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the switcher (default)
    Daemon,
    /// Validate configuration file
    CheckConfig,
    /// Show the default Bluetooth device, its profile and volume
    ShowDefault,
    /// List playback and capture streams and whether they may trigger a switch
    ListStreams,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let loader = match cli.config {
        Some(path) => ConfigLoader::new_production(path),
        None => ConfigLoader::new_with_default_path()?,
    };
    let config = loader.load_config()?;

    let (_guard, log_dir) =
        logging::initialize_logging(LoggingConfig::from_general(&config.general, cli.verbose))?;
    if let Some(dir) = &log_dir {
        info!("Logging to {}", dir.display());
        if let Err(e) = logging::cleanup_old_logs(dir, config.general.log_retention_days) {
            warn!("Log cleanup failed: {:#}", e);
        }
    }
    info!(
        "Configuration loaded from {}",
        loader.get_config_path().display()
    );

    match cli.command {
        Some(Commands::Daemon) | None => run_daemon(&config).await,
        Some(Commands::CheckConfig) => check_config(&config),
        Some(Commands::ShowDefault) => show_default(&config),
        Some(Commands::ListStreams) => list_streams(&config),
    }
}

async fn run_daemon(config: &Config) -> Result<()> {
    let mut service =
        SwitcherService::new(PactlAudioControl::new(), PactlEventSource::new(), config)?;

    let (signal_tx, signal_rx) = mpsc::unbounded_channel();
    let signal_handler = SignalHandler::new(signal_tx);
    tokio::spawn(async move {
        if let Err(e) = signal_handler.listen_for_signals().await {
            error!("Signal handler error: {}", e);
        }
    });

    service.run(signal_rx).await
}

fn check_config(config: &Config) -> Result<()> {
    let filter = ClientFilter::new(config)?;
    let switching = &config.switching;

    println!("Configuration validation:");
    println!("  ✓ Configuration file parsed successfully");
    println!("  ✓ Allow-list: {} active rules", filter.rule_count());
    for rule in &config.clients {
        println!(
            "      {} {:?}{}",
            rule.name,
            rule.match_type,
            if rule.enabled { "" } else { " (disabled)" }
        );
    }
    println!(
        "  ✓ Profiles: {} <-> {}",
        switching.high_fidelity_profile, switching.telephony_profile
    );
    println!("  ✓ Mute other streams: {}", switching.mute_other_streams);
    println!("  ✓ Volume memory: {:?}", switching.volume_memory);
    println!(
        "  ✓ Startup: retry every {}ms for up to {}s",
        switching.retry_interval_ms, switching.startup_timeout_secs
    );

    Ok(())
}

fn show_default(config: &Config) -> Result<()> {
    let control = PactlAudioControl::new();
    let orchestrator = SwitchOrchestrator::new(&config.switching);

    let Some(sink) = control.get_default_sink()? else {
        println!("No default sink");
        return Ok(());
    };
    println!("Default sink: {}", sink);

    let Some(endpoint) = BluetoothEndpoint::from_sink_name(&sink) else {
        println!("  Not a Bluetooth device");
        return Ok(());
    };
    println!("  Card:   {}", endpoint.card);

    match orchestrator.current_profile(&control) {
        Some(profile) => println!("  Profile: {}", profile),
        None => println!("  Profile: unknown"),
    }
    let sources = control.list_devices(DeviceKind::Source)?;
    match endpoint.find_device(DeviceKind::Source, &sources, "") {
        Some(source) => println!("  Source: {}", source),
        None => println!("  Source: none in this profile"),
    }
    match control.get_sink_volume(&endpoint.sink)? {
        Some(volume) => println!("  Volume: {} ({} steps)", volume, volume.steps()),
        None => println!("  Volume: unknown"),
    }

    Ok(())
}

fn list_streams(config: &Config) -> Result<()> {
    let control = PactlAudioControl::new();
    let filter = ClientFilter::new(config)?;

    for category in StreamCategory::ALL {
        let streams = control.list_streams(category)?;
        println!("{} streams:", category);
        if streams.is_empty() {
            println!("  none");
        }
        for stream in streams {
            let approved = filter.approve(stream.application.as_deref());
            println!(
                "  {}{}",
                stream,
                if approved { "  [triggers switch]" } else { "" }
            );
        }
    }

    Ok(())
}
