use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use barline::config::BarConfig;
use barline::render::PaletteChoice;
use barline::{Bar, Notifier, OutputFormat, Palette, Policy, StdoutDisplay};

const NOTIFY_DRAIN: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "barline")]
#[command(about = "Status line for i3bar, swaybar and terminals")]
#[command(version)]
struct Args {
    /// Path to a TOML config file (defaults to $XDG_CONFIG_HOME/barline/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output encoding, overriding the config file
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Color palette, overriding the config file
    #[arg(short, long, value_enum)]
    palette: Option<PaletteChoice>,

    /// Print the resolved configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    let mut config = BarConfig::load(args.config.as_deref())?;
    if let Some(format) = args.format {
        config.format = format;
    }
    if let Some(palette) = args.palette {
        config.palette = palette;
    }

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let rt = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    rt.block_on(run(config))
}

/// Logs go to stderr; stdout belongs to the bar protocol.
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("barline=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(config: BarConfig) -> Result<()> {
    let palette = Palette::from_choice(config.palette);
    let monitors = config.monitors(&palette)?;

    let mut policy = Policy::new();
    let notifier_task = match &config.notify.command {
        Some(command) => {
            let (notifier, task) = Notifier::spawn(command.clone());
            policy = policy.with_notifier(notifier);
            Some(task)
        }
        None => None,
    };

    let bar = monitors
        .into_iter()
        .fold(Bar::builder(), |builder, monitor| builder.boxed(monitor))
        .separator(config.separator.clone())
        .error_sink(policy)
        .grace_period(config.grace_period)
        .build();

    info!(format = ?config.format, monitors = bar.len(), "starting");
    let handle = bar.start(StdoutDisplay::stdout(config.format));
    let report = handle.run_until(shutdown_signal()).await;

    for monitor in report.aborted() {
        warn!(monitor = %monitor.id, "monitor was aborted");
    }
    if let Some(task) = notifier_task {
        // The bar held the last sender; let queued notifications go out.
        if tokio::time::timeout(NOTIFY_DRAIN, task).await.is_err() {
            warn!("notifier did not finish");
        }
    }
    if let Some(error) = report.display_error {
        anyhow::bail!("display failed: {}", error);
    }
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl-C"),
        _ = terminate => info!("received SIGTERM"),
    }
}
