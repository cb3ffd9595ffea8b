//! dhara daemon
//!
//! Monitors UDP current readings against threshold filters and broadcasts
//! state changes.
//!
//! # Usage
//!
//! ```bash
//! # With default config (dhara.toml, /etc/dhara.toml, or built-in defaults)
//! dhara
//!
//! # With custom config file
//! dhara --config dhara.toml
//!
//! # With command line overrides
//! dhara --port 5005 --send-port 5006 --filter "Ia > 5" --filter "Ih < 12"
//! ```

use clap::Parser;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use dhara::error::{Error, Result};
use dhara::utils::install_shutdown_handler;
use dhara::{Config, Monitor, console};

/// Config locations tried when `--config` is not given.
const CONFIG_SEARCH_PATHS: &[&str] = &["dhara.toml", "/etc/dhara.toml"];

/// Current threshold monitor
#[derive(Debug, Parser)]
#[command(name = "dhara", version, about)]
struct Args {
    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// UDP port readings arrive on
    #[arg(short, long)]
    port: Option<u16>,

    /// UDP port status notifications are sent to
    #[arg(long)]
    send_port: Option<u16>,

    /// Disable outbound status notifications
    #[arg(long)]
    no_notify: bool,

    /// Filter to install at startup (repeatable), e.g. "Ia > 5"
    #[arg(short, long = "filter", value_name = "RULE")]
    filters: Vec<String>,

    /// Do not read console commands from stdin
    #[arg(long)]
    no_console: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    if let Some(path) = &args.config {
        return Config::load(path);
    }

    for path in CONFIG_SEARCH_PATHS {
        if Path::new(path).exists() {
            return Config::load(path);
        }
    }

    Ok(Config::default())
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(port) = args.port {
        config.network.receive_port = port;
    }
    if let Some(port) = args.send_port {
        config.notify.send_port = port;
    }
    if args.no_notify {
        config.notify.enabled = false;
    }
    config.filters.extend(args.filters.iter().cloned());
}

fn main() {
    let args = Args::parse();

    let mut config = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    apply_overrides(&mut config, &args);

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("Dhara v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&config, !args.no_console) {
        log::error!("{}", e);
        std::process::exit(1);
    }

    log::info!("Dhara stopped");
}

fn run(config: &Config, with_console: bool) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    install_shutdown_handler(Arc::clone(&running))?;

    let mut monitor = Monitor::start(config)?;

    if with_console {
        let engine = Arc::clone(monitor.engine());
        let running = Arc::clone(&running);
        // Blocked on stdin until a line arrives; not joined on shutdown.
        thread::Builder::new()
            .name("dhara-console".into())
            .spawn(move || {
                let stdin = BufReader::new(io::stdin());
                let mut stdout = io::stdout();
                if let Err(e) = console::run(&engine, stdin, &mut stdout, &running) {
                    log::warn!("Console stopped: {}", e);
                }
            })
            .map_err(Error::Io)?;
    }

    let stats_interval = Duration::from_secs(config.logging.stats_interval_secs);
    let mut last_stats = Instant::now();

    while running.load(Ordering::SeqCst) {
        if !monitor.is_running() {
            log::error!("Ingest thread exited unexpectedly");
            break;
        }

        thread::sleep(Duration::from_millis(100));

        if !stats_interval.is_zero() && last_stats.elapsed() >= stats_interval {
            log::info!("Stats: {}", monitor.engine().stats());
            last_stats = Instant::now();
        }
    }

    log::info!("Shutting down...");
    monitor.shutdown();
    log::info!("Final stats: {}", monitor.engine().stats());
    Ok(())
}
