use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use turnstile::config::parse_time_of_day;
use turnstile::{CancellationToken, ClockMode, ForbiddenWindow, Simulation, SimulationConfig};

/// Run concurrent clients against a bounded ticket pool.
///
/// Flags override TURNSTILE_* environment variables, which override defaults.
#[derive(Parser, Debug)]
#[command(name = "turnstile-sim", version, about)]
struct Args {
    /// Number of tickets in the pool
    #[arg(long)]
    capacity: Option<usize>,

    /// Number of concurrent clients
    #[arg(long)]
    clients: Option<usize>,

    /// Confirmation step duration while a permit is held
    #[arg(long, value_name = "MS")]
    processing_ms: Option<u64>,

    /// Start of the forbidden booking window (inclusive)
    #[arg(long, value_name = "HH:MM")]
    forbidden_start: Option<String>,

    /// End of the forbidden booking window (exclusive)
    #[arg(long, value_name = "HH:MM")]
    forbidden_end: Option<String>,

    /// Time source for the gate: random, system, or fixed=HH:MM
    #[arg(long, value_name = "MODE")]
    clock: Option<ClockMode>,

    /// Print the full report as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

/// Initialize tracing with TURNSTILE_LOG and LOG_FORMAT support.
fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match std::env::var("TURNSTILE_LOG").as_deref() {
            Ok("trace") => "trace",
            Ok("debug") => "debug",
            Ok("warn") | Ok("warning") => "warn",
            Ok("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("turnstile={level},turnstile_sim={level}"))
    };

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

fn build_config(args: &Args) -> anyhow::Result<SimulationConfig> {
    let mut config = SimulationConfig::from_env();

    if let Some(capacity) = args.capacity {
        config.capacity = capacity;
    }
    if let Some(clients) = args.clients {
        config.clients = clients;
    }
    if let Some(ms) = args.processing_ms {
        config.processing_delay = std::time::Duration::from_millis(ms);
    }
    if let Some(clock) = args.clock {
        config.clock = clock;
    }

    let start = args
        .forbidden_start
        .as_deref()
        .map(parse_time_of_day)
        .transpose()
        .context("--forbidden-start")?;
    let end = args
        .forbidden_end
        .as_deref()
        .map(parse_time_of_day)
        .transpose()
        .context("--forbidden-end")?;
    if start.is_some() || end.is_some() {
        config.window = ForbiddenWindow::new(
            start.unwrap_or(config.window.start()),
            end.unwrap_or(config.window.end()),
        );
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = build_config(&args)?;

    info!(
        "turnstile {} - {} tickets, {} clients, forbidden {}, clock {}",
        env!("CARGO_PKG_VERSION"),
        config.capacity,
        config.clients,
        config.window,
        config.clock
    );

    let simulation = Simulation::new(config)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted - cancelling outstanding clients");
                cancel.cancel();
            }
        });
    }

    let report = simulation.run(cancel).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let s = report.summary;
        println!("--- Simulation Completed ---");
        for (serial, client) in simulation.service().ledger().bookings() {
            println!("  ticket {serial} -> {client}");
        }
        println!(
            "Succeeded: {}  Sold out: {}  Forbidden time: {}  Cancelled: {}",
            s.succeeded, s.sold_out, s.rejected_time, s.cancelled
        );
        println!(
            "Total tickets successfully booked: {} out of {}.",
            s.booked_count, s.capacity
        );
    }

    anyhow::ensure!(
        report.summary.is_consistent(),
        "pool state disagrees with client outcomes: {:?}",
        report.summary
    );
    Ok(())
}
