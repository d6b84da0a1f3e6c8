use cappedlite::cli::{self as prog_cli, Command, parse_output_mode};
use cappedlite::config::AppConfig;
use cappedlite::utils::logger;
use cappedlite::Database;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cappedlite", version, about = "Tail capped collections", long_about = None)]
struct Cli {
    #[arg(
        long,
        help = "Config file (TOML); falls back to $CAPPEDLITE_CONFIG, then ./cappedlite.toml"
    )]
    config: Option<PathBuf>,
    #[arg(long, help = "Tail timeout in seconds; 0 tails forever. Overrides the config file")]
    timeout: Option<f64>,
    #[arg(long, help = "Output format: human|plain|json")]
    format: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Produce records into a capped collection in the background and tail them")]
    Demo {
        #[arg(default_value = "events", help = "Capped collection to create and tail")]
        collection: String,
        #[arg(long, default_value_t = 10, help = "Number of records to produce")]
        count: usize,
        #[arg(long, default_value_t = 200, help = "Delay between produced records, milliseconds")]
        interval_ms: u64,
        #[arg(long, help = "Filter JSON (e.g., {\"seq\": {\"$gte\": 3}})")]
        filter: Option<String>,
    },
    #[command(about = "Write log lines into the capped log collection and tail them back")]
    Logs {
        #[arg(long, default_value = "app", help = "Service name (log target) of the emitted lines")]
        service: String,
        #[arg(long, default_value_t = 5, help = "Number of log lines")]
        count: usize,
    },
    #[command(about = "Print the slug of TEXT")]
    Slug { text: String },
    #[command(about = "Show the effective configuration and any collections")]
    Info,
}

fn main() {
    let cli = Cli::parse();
    let mut cfg = match AppConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };
    if cli.timeout.is_some() {
        cfg.tail_timeout_secs = cli.timeout;
    }
    if let Err(e) = cfg.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }
    if let Some(dir) = cfg.log_dir.as_deref()
        && let Err(e) =
            logger::configure_logging(Some(dir), cfg.log_level.as_deref(), cfg.log_retention)
    {
        eprintln!("warning: logging disabled: {e}");
    }

    let cmd = match cli.command {
        Commands::Demo { collection, count, interval_ms, filter } => {
            Command::Demo { collection, count, interval_ms, filter_json: filter }
        }
        Commands::Logs { service, count } => Command::Logs { service, count },
        Commands::Slug { text } => Command::Slug { text },
        Commands::Info => Command::Info,
    };
    let db = Database::with_config(cfg);
    let mode = parse_output_mode(cli.format.as_deref());
    let r = prog_cli::run_with_format(&db, cmd, mode, &mut std::io::stdout().lock());
    if let Err(e) = r {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
