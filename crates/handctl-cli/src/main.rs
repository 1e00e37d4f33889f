//! `handctl-cli` – hand controller command line interface.
//!
//! This binary drives the gesture pipeline without a headset.  It:
//!
//! 1. Initialises logging (`RUST_LOG`, `HANDCTL_LOG_FORMAT=json`, optional
//!    OTLP export when `OTEL_EXPORTER_OTLP_ENDPOINT` is set).
//! 2. Loads `~/.handctl/config.toml`, writing the defaults on first run.
//! 3. Drops the user into an **interactive REPL** to replay recordings, run
//!    the scripted demo, hold external buttons and inspect controller state.
//! 4. Intercepts **Ctrl-C** so the REPL releases every held button and ends
//!    the session before exiting.

mod config;
mod repl;
mod replay;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

fn main() {
    // Held until exit so pending spans are flushed.
    let _telemetry = handctl_runtime::init_tracing("handctl-cli");

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – releasing buttons and exiting …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => first_run(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    let mut shell = match repl::Shell::new(cfg) {
        Ok(shell) => shell,
        Err(e) => {
            println!("{}: {}", "Startup error".red(), e);
            std::process::exit(1);
        }
    };

    println!();
    println!(
        "  Type {} for a list of commands.\n",
        "/help".bold().cyan()
    );

    repl::run(&mut shell, shutdown);
}

// ─────────────────────────────────────────────────────────────────────────────
// First run
// ─────────────────────────────────────────────────────────────────────────────

fn first_run() -> config::Config {
    println!();
    println!("  No configuration found.  Writing defaults.");

    let mut cfg = config::Config::default();
    match config::save(&cfg) {
        Ok(()) => println!(
            "  {} Config saved to {}",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    config::apply_env_overrides(&mut cfg);
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   __                 __     __  __"#.bold().cyan());
    println!("{}", r#"  / /  ___ ____  ____/ /____/ /_/ /"#.bold().cyan());
    println!("{}", r#" / _ \/ _ `/ _ \/ __/ __/ __/ __/ / "#.bold().cyan());
    println!("{}", r#"/_//_/\_,_/_//_/\__/\__/\__/\__/_/  "#.bold().cyan());
    println!();
    println!("  {} {}",
        "handctl".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Hand tracking as a VR controller");
    println!();
}
