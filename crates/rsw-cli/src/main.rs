use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

use commands::{Outcome, Session};
use rsw_reconcile::{Direction, IdentityStrategy};

#[derive(Parser)]
#[command(name = "rsw")]
#[command(
    about = "Swap tier-1 route advertisements between a primary and a DR router",
    long_about = None
)]
struct Cli {
    /// Layered config paths in merge order, applied over built-in defaults
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    /// State directory holding the credential, parameter and baseline stores
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Refuse to run when the config carries keys nothing reads
    #[arg(long, global = true, default_value_t = false)]
    strict_config: bool,

    /// Print the full result as JSON
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store manager host and credentials. Password comes from the configured env var or stdin.
    SetUser {
        #[arg(long)]
        username: String,

        /// Manager host, optionally with port (nsx.example.com:443)
        #[arg(long)]
        host: String,
    },

    /// Store which two routers form the pair
    SetParams {
        #[arg(long)]
        primary: String,

        #[arg(long)]
        dr: String,

        /// How identifiers are matched against the router listing
        #[arg(long, value_enum)]
        strategy: StrategyArg,
    },

    /// List tier-1 routers known to the manager
    List,

    /// Resolve the configured pair to router paths
    Confirm,

    /// Resolve and read both routers' live advertisement sets
    Verify,

    /// Verify, then store the live states as the baseline
    CaptureBaseline,

    /// Is the pair in its pre-failover posture?
    CheckFailover,

    /// Is the pair in its post-failover posture?
    CheckFailback,

    /// Swap advertisements so DR takes over
    Failover,

    /// Swap advertisements back to the primary
    Failback,

    /// Swap in whichever single direction the live state allows
    Execute,

    /// Audit log utilities
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },

    /// Print the merged config hash and canonical JSON
    ConfigHash,
}

#[derive(Subcommand)]
enum AuditCmd {
    /// Check the audit log hash chain
    Verify {
        /// Log to check; defaults to the configured audit path
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    UniqueId,
    DisplayName,
}

impl From<StrategyArg> for IdentityStrategy {
    fn from(s: StrategyArg) -> Self {
        match s {
            StrategyArg::UniqueId => IdentityStrategy::UniqueId,
            StrategyArg::DisplayName => IdentityStrategy::DisplayName,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<Outcome> {
    let session = Session::load(
        &cli.config_paths,
        cli.state_dir,
        cli.strict_config,
        cli.json,
    )?;

    match cli.cmd {
        Commands::SetUser { username, host } => commands::setup::set_user(&session, &username, &host),
        Commands::SetParams {
            primary,
            dr,
            strategy,
        } => commands::setup::set_params(&session, &primary, &dr, strategy.into()),
        Commands::List => commands::pair::list(&session).await,
        Commands::Confirm => commands::pair::confirm(&session).await,
        Commands::Verify => commands::pair::verify(&session).await,
        Commands::CaptureBaseline => commands::pair::capture(&session).await,
        Commands::CheckFailover => commands::pair::check_readiness(&session, Direction::ToDr).await,
        Commands::CheckFailback => {
            commands::pair::check_readiness(&session, Direction::ToPrimary).await
        }
        Commands::Failover => commands::swap::switch(&session, Direction::ToDr).await,
        Commands::Failback => commands::swap::switch(&session, Direction::ToPrimary).await,
        Commands::Execute => commands::swap::execute(&session).await,
        Commands::Audit {
            cmd: AuditCmd::Verify { path },
        } => commands::audit::verify(&session, path),
        Commands::ConfigHash => {
            println!("config_hash={}", session.config.config_hash);
            println!("{}", session.config.canonical_json);
            Ok(Outcome::Done)
        }
    }
}

/// Logs go to stderr; stdout carries only command output.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
