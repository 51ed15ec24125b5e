//! Binary entrypoint for the rubybot CLI.
//!
//! Commands:
//! - `start` - run the farming engine until Ctrl-C
//! - `init` - create a starter `config.toml`
//! - `status` - fetch and print a one-shot player/route summary
//!
//! See the library crate docs for module-level details: `rubybot::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use rubybot::config::Config;
use rubybot::engine::{show_status, Engine};

#[derive(Parser)]
#[command(name = "rubybot")]
#[command(about = "An autonomous farming client for the Ruby King browser RPG")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the farming engine
    Start,
    /// Initialize a new configuration file
    Init,
    /// Show player and route status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config early to configure logging (except for Init which writes it)
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Start => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            info!("Starting rubybot v{}", env!("CARGO_PKG_VERSION"));
            let mut engine = Engine::new(config).await?;
            engine.run().await?;
        }
        Commands::Init => {
            info!("Initializing new configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
            println!(
                "Created {}. Set api.token before running `rubybot start`.",
                cli.config
            );
        }
        Commands::Status => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            show_status(&config).await?;
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // Base level from CLI verbosity overrides config
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let open_append = |path: &String| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
            .map(|f| std::sync::Arc::new(std::sync::Mutex::new(f)))
    };
    let file_sink = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(open_append);
    let dump_sink = config
        .as_ref()
        .and_then(|c| c.logging.api_dump_file.as_ref())
        .and_then(open_append);

    // Check if stdout is a terminal (TTY) - if so, mirror file logging to
    // the console as well.
    let is_tty = atty::is(atty::Stream::Stdout);

    builder.format(move |fmt, record| {
        let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let line = format!("{} [{}] {}", ts, record.level(), record.args());

        // Raw API responses go to the dump file only, never to the console.
        if record.target() == "api" {
            if let Some(ref sink) = dump_sink {
                if let Ok(mut guard) = sink.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
            }
            return Ok(());
        }

        if let Some(ref sink) = file_sink {
            if let Ok(mut guard) = sink.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        } else {
            writeln!(fmt, "{}", line)
        }
    });
    let _ = builder.try_init();
}
