use clap::{Parser, Subcommand};
use hydrate_core::Config;

mod app;
mod commands;

#[derive(Parser)]
#[command(name = "hydrate", version, about = "Hydrate water intake tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log and list drinks
    Drink {
        #[command(subcommand)]
        action: commands::drink::DrinkAction,
    },
    /// Daily goal
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Reminder settings and pending reminders
    Reminder {
        #[command(subcommand)]
        action: commands::reminder::ReminderAction,
    },
    /// Intake statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Quick-add amounts
    QuickAdd {
        #[command(subcommand)]
        action: commands::quick_add::QuickAddAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Stored data
    Data {
        #[command(subcommand)]
        action: commands::data::DataAction,
    },
    /// Deliver due reminders and fire the daily replan
    Daemon(commands::daemon::DaemonArgs),
}

fn init_tracing(config: &Config) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log.filter.as_str().into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&Config::load_or_default());

    let result = match cli.command {
        Commands::Drink { action } => commands::drink::run(action).await,
        Commands::Goal { action } => commands::goal::run(action).await,
        Commands::Reminder { action } => commands::reminder::run(action).await,
        Commands::Stats { action } => commands::stats::run(action).await,
        Commands::QuickAdd { action } => commands::quick_add::run(action).await,
        Commands::Config { action } => commands::config::run(action),
        Commands::Data { action } => commands::data::run(action).await,
        Commands::Daemon(args) => commands::daemon::run(args).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
