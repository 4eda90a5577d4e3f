//! dailyreport: unattended daily check-in for the university portal.
//!
//! Logs in every day inside a configurable window (plus a random offset),
//! checks whether today's health report is already on file, and submits it if
//! not. Transient failures retry after a short delay; a rejected login stops
//! the process.

use clap::Parser;
use miette::{Result, miette};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dailyreport_portal::{Credentials, PortalClient};
use dailyreport_scheduler::{AttemptFn, Runner, Schedule, SystemClock};

#[derive(Parser)]
#[command(name = "dailyreport")]
#[command(about = "Unattended daily health-report check-in", long_about = None)]
struct Cli {
    /// Portal account name
    #[arg(short, long, env = "DAILYREPORT_USERNAME")]
    username: String,

    /// Portal account password
    #[arg(short, long, env = "DAILYREPORT_PASSWORD")]
    password: String,

    /// Hour of the daily submission window (24h clock)
    #[arg(long, default_value = "7", value_parser = clap::value_parser!(u32).range(0..24))]
    hour: u32,

    /// Minute of the daily submission window
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(u32).range(0..60))]
    minute: u32,

    /// Upper bound in minutes for the random offset added to the window
    #[arg(short = 'i', long, default_value = "180")]
    jitter: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "dailyreport=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let schedule =
        Schedule::new(cli.hour, cli.minute, cli.jitter).map_err(|e| miette!("{}", e))?;
    info!(
        hour = cli.hour,
        minute = cli.minute,
        jitter_minutes = cli.jitter,
        "configured daily window"
    );

    let portal = PortalClient::new(Credentials {
        username: cli.username,
        password: cli.password,
    });
    let attempt: AttemptFn = Box::new(move || {
        let portal = portal.clone();
        Box::pin(async move { portal.attempt().await.map_err(Into::into) })
    });

    // Runs until the portal rejects the credentials; everything else retries.
    let fatal = Runner::new(schedule, SystemClock, attempt).run().await;
    Err(miette!("{}", fatal))
}
