use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};
use vpc::commands::{self, CommandContext, OutputFormat};
use vpc::commands::db::force::parse_forced_version;
use vpc::config::{self, ConfigInput, DatabaseArgs, MigrationArgs};
use vpc::constants::CONFIG_FILENAME;
use vpc::engine::ShutdownSignal;
use vpc::progress::MigrationReporter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(long, default_value = CONFIG_FILENAME, global = true)]
    config_file: String,

    /// Enable verbose output (info level)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress all non-essential output (error level only)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Enable debug output (debug level)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Control plane database administration
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

/// Connection and lock flags shared by every command that touches the database
#[derive(clap::Args, Clone, Debug)]
struct ConnectArgs {
    #[command(flatten)]
    database_args: DatabaseArgs,

    #[command(flatten)]
    migration_args: MigrationArgs,
}

impl From<ConnectArgs> for ConfigInput {
    fn from(args: ConnectArgs) -> Self {
        ConfigInput {
            database: Some(args.database_args.into()),
            migration: Some(args.migration_args.into()),
        }
    }
}

#[derive(Subcommand)]
enum DbCommands {
    /// Roll back every migration, then apply all of them (destroys data)
    Migrate(ConnectArgs),

    /// Apply all pending migrations
    Up(ConnectArgs),

    /// Roll back every applied migration (destroys data)
    Down(ConnectArgs),

    /// Migrate up or down to a specific version
    Goto {
        version: u64,

        #[command(flatten)]
        connect: ConnectArgs,
    },

    /// Show the recorded version and pending migrations
    Status {
        /// Output format
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,

        #[command(flatten)]
        connect: ConnectArgs,
    },

    /// Set the recorded version without running scripts (clears a dirty record)
    Force {
        /// Migration version, or "none"
        version: String,

        #[command(flatten)]
        connect: ConnectArgs,
    },

    /// List the migrations embedded in this binary
    List {
        /// Output format
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    initialize_logging(&cli);

    let shutdown = ShutdownSignal::new();
    shutdown.wait_for_signal();

    run_main(cli, shutdown).await
}

fn initialize_logging(cli: &Cli) {
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        "warn" // default level
    };

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(level)
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

async fn run_main(cli: Cli, shutdown: ShutdownSignal) -> Result<()> {
    let Commands::Db { command } = cli.command;

    let reporter = if cli.quiet {
        MigrationReporter::silent()
    } else {
        MigrationReporter::new(cli.verbose || cli.debug)
    };
    let ctx = CommandContext { shutdown, reporter };

    let connect = match &command {
        DbCommands::List { format } => return commands::cmd_db_list(*format),
        DbCommands::Migrate(connect) | DbCommands::Up(connect) | DbCommands::Down(connect) => {
            connect.clone()
        }
        DbCommands::Goto { connect, .. }
        | DbCommands::Status { connect, .. }
        | DbCommands::Force { connect, .. } => connect.clone(),
    };

    let file_config = config::load_config(&cli.config_file)?;
    let config = config::ConfigBuilder::new()
        .with_file(file_config)
        .with_cli_args(connect.into())
        .resolve()?;

    match command {
        DbCommands::Migrate(_) => {
            info!("Resyncing database schema");
            commands::cmd_db_migrate(&config, &ctx).await
        }
        DbCommands::Up(_) => {
            info!("Applying pending migrations");
            commands::cmd_db_up(&config, &ctx).await
        }
        DbCommands::Down(_) => {
            info!("Rolling back all migrations");
            commands::cmd_db_down(&config, &ctx).await
        }
        DbCommands::Goto { version, .. } => {
            info!("Migrating to version {}", version);
            commands::cmd_db_goto(&config, &ctx, version).await
        }
        DbCommands::Status { format, .. } => commands::cmd_db_status(&config, &ctx, format).await,
        DbCommands::Force { version, .. } => {
            let version = parse_forced_version(&version).map_err(anyhow::Error::msg)?;
            info!("Forcing version record");
            commands::cmd_db_force(&config, &ctx, version).await
        }
        DbCommands::List { .. } => unreachable!("handled before loading configuration"),
    }
}
