//! court-claim: entry point.

use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use court_claim::{
    resolve_config_path, AcquisitionSession, AttemptOutcome, Config, RunContext, RunOutcome,
    Scheduler, SessionRunner, SystemClock,
};
use court_claim_runner::{init_logging, ChromiumDriver};

#[derive(Parser)]
#[command(
    name = "court-claim",
    about = "Claim a reservation slot the moment it opens",
    version
)]
struct Cli {
    /// Path to the JSON config file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Directory for the per-run log file.
    #[arg(long, global = true, default_value = "log")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Retry across the configured window until a slot is claimed (default).
    Run,

    /// Make a single attempt right now, ignoring the window.
    Once,

    /// Validate the config file and print the search plan.
    Validate,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   court-claim completions bash > ~/.local/share/bash-completion/completions/court-claim
    ///   court-claim completions zsh > ~/.zfunc/_court-claim
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let ctx = start(&cli.log_dir, &cli.log_level, cli.config.as_deref())?;
            let driver = ChromiumDriver::new(&ctx.config.browser)?;
            let mut runner = SessionRunner::new(driver);
            let mut scheduler = Scheduler::new(&ctx, SystemClock);
            match scheduler.run(&mut runner).await {
                RunOutcome::Success(reservation) => {
                    tracing::info!(
                        "Reserved court {} at {}, {}",
                        reservation.court_id,
                        reservation.address,
                        reservation.when
                    );
                }
                RunOutcome::Exhausted { attempts } => {
                    tracing::error!("No reservation after {attempts} attempts");
                    std::process::exit(1);
                }
            }
        }

        Commands::Once => {
            let ctx = start(&cli.log_dir, &cli.log_level, cli.config.as_deref())?;
            let driver = ChromiumDriver::new(&ctx.config.browser)?;
            match AcquisitionSession::attempt(&ctx, &driver).await? {
                AttemptOutcome::Success(reservation) => {
                    tracing::info!(
                        "Reserved court {} at {}, {}",
                        reservation.court_id,
                        reservation.address,
                        reservation.when
                    );
                }
                other => {
                    tracing::error!("Attempt ended without a reservation: {}", other.detail());
                    std::process::exit(1);
                }
            }
        }

        Commands::Validate => {
            let path = resolve_config_path(cli.config.as_deref());
            let ctx = match Config::load(&path)
                .and_then(|config| RunContext::new(config, Local::now().naive_local()))
            {
                Ok(ctx) => ctx,
                Err(e) => {
                    eprintln!("Invalid config {}: {e}", path.display());
                    std::process::exit(1);
                }
            };
            let config = &ctx.config;
            let spacing = config.spacing();
            println!("Valid config: {}", path.display());
            println!("  Account: {}", config.account.email);
            println!("  Date: {}", ctx.target_date.format("%A %d/%m/%Y"));
            println!(
                "  Window today: {} -> {}",
                ctx.window.start.format("%H:%M:%S"),
                ctx.window.stop.format("%H:%M:%S")
            );
            println!(
                "  Tick spacing: {:.1}s to {:.1}s",
                spacing.lower_bound().as_secs_f64(),
                spacing.upper_bound().as_secs_f64()
            );
            println!("  Locations: {}", config.locations.join(", "));
            println!("  Hours: {}", config.hours.join(", "));
            println!("  Price types: {}", config.price_type.join(", "));
            println!("  Court types: {}", config.court_type.join(", "));
            println!("  Players: {}", config.players.len());
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "court-claim", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Open the run log, then load the config and anchor the window on today.
fn start(
    log_dir: &std::path::Path,
    log_level: &str,
    config: Option<&str>,
) -> anyhow::Result<RunContext> {
    let started_utc = Utc::now();
    let started_local = started_utc.with_timezone(&Local).naive_local();

    let log_file = init_logging(log_dir, log_level, started_utc)?;
    println!("Log file: {}", log_file.display());

    let path = resolve_config_path(config);
    tracing::info!("Config: {}", path.display());
    let config = Config::load(&path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    let ctx = RunContext::new(config, started_local)?;
    tracing::info!(
        "Targeting {} for {}",
        ctx.target_date.format("%A %d/%m/%Y"),
        ctx.config.locations.join(", ")
    );
    Ok(ctx)
}
