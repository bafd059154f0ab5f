use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod keys;
mod render;

#[derive(Parser)]
#[command(name = "pausitive", version, about = "Pausitive guided breathing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List breathing techniques
    Techniques {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List session modes
    Modes {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a breathing session
    Run(commands::run::RunArgs),
    /// Completed session history
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// Summary statistics over the history
    Stats,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PAUSITIVE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Techniques { json } => commands::catalog::techniques(json),
        Commands::Modes { json } => commands::catalog::modes(json),
        Commands::Run(args) => commands::run::run(args),
        Commands::History { action } => commands::history::run(action),
        Commands::Stats => commands::stats::run(),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from([
            "pausitive",
            "run",
            "--technique",
            "technique-7-11",
            "--mode",
            "custom",
            "--sets",
            "3",
            "--simulate",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.technique.as_deref(), Some("technique-7-11"));
                assert_eq!(args.sets, Some(3));
                assert!(args.simulate);
            }
            _ => panic!("expected run"),
        }
    }
}
