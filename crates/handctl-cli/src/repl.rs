//! REPL – Read-Eval-Print Loop for the handctl shell.
//!
//! Supported slash-commands:
//!   /help                 – show this list
//!   /settings             – print the tracking settings as `name=value`
//!   /set <name=value>     – change one setting and save the config
//!   /schema               – print the JSON schema of the settings
//!   /enable | /disable    – start or end a tracking session
//!   /demo [path]          – run the scripted gesture demo, optionally saving it
//!   /replay <path>        – replay a JSON-lines recording
//!   /press <hand> <id>    – hold an external button
//!   /release [<hand> <id>] – release one button, or all of them
//!   /panel on|off         – toggle the button panel
//!   /state                – show the latest published controller state
//!   /quit | /exit         – exit the CLI

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use handctl_runtime::sim::scripted_session;
use handctl_runtime::{ExternalButton, HandTracking, StateReader, TrackingSettings};
use handctl_types::{Hand, HandControllerState};

use crate::config::{self, Config};
use crate::replay::{self, ReplaySummary};

/// A parsed slash-command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Settings,
    Set(String),
    Schema,
    Enable,
    Disable,
    Demo(Option<PathBuf>),
    Replay(PathBuf),
    Press(Hand, u8),
    Release(Hand, u8),
    ReleaseAll,
    Panel(bool),
    State,
    Quit,
}

/// Parse one input line.  The error is the message shown to the user.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty command".to_string());
    };
    let args: Vec<&str> = words.collect();

    let command = match (head, args.as_slice()) {
        ("/help", []) => Command::Help,
        ("/settings", []) => Command::Settings,
        ("/set", []) => return Err("usage: /set <name=value>".to_string()),
        ("/set", rest) => Command::Set(rest.join(" ")),
        ("/schema", []) => Command::Schema,
        ("/enable", []) => Command::Enable,
        ("/disable", []) => Command::Disable,
        ("/demo", []) => Command::Demo(None),
        ("/demo", [path]) => Command::Demo(Some(PathBuf::from(path))),
        ("/replay", [path]) => Command::Replay(PathBuf::from(path)),
        ("/replay", _) => return Err("usage: /replay <path>".to_string()),
        ("/press", [hand, id]) => Command::Press(parse_hand(hand)?, parse_id(id)?),
        ("/press", _) => return Err("usage: /press <left|right> <id>".to_string()),
        ("/release", []) => Command::ReleaseAll,
        ("/release", [hand, id]) => Command::Release(parse_hand(hand)?, parse_id(id)?),
        ("/release", _) => return Err("usage: /release [<left|right> <id>]".to_string()),
        ("/panel", ["on"]) => Command::Panel(true),
        ("/panel", ["off"]) => Command::Panel(false),
        ("/panel", _) => return Err("usage: /panel on|off".to_string()),
        ("/state", []) => Command::State,
        ("/quit" | "/exit", []) => Command::Quit,
        (other, _) => return Err(format!("Unknown command: '{}'", other)),
    };
    Ok(command)
}

fn parse_hand(raw: &str) -> Result<Hand, String> {
    raw.parse::<Hand>().map_err(|_| format!("'{}' is not a hand (left / right)", raw))
}

fn parse_id(raw: &str) -> Result<u8, String> {
    raw.parse::<u8>().map_err(|_| format!("'{}' is not a button id", raw))
}

// ─────────────────────────────────────────────────────────────────────────────
// Loop
// ─────────────────────────────────────────────────────────────────────────────

/// State shared by the command handlers.
pub struct Shell {
    cfg: Config,
    tracking: HandTracking,
    reader: StateReader,
}

impl Shell {
    pub fn new(cfg: Config) -> Result<Self, String> {
        let tracking = HandTracking::new(cfg.tracking.clone())
            .map_err(|e| format!("Failed to start hand tracking: {}", e))?;
        let reader = tracking.reader();
        Ok(Self { cfg, tracking, reader })
    }
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(shell: &mut Shell, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "handctl>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_command(line) {
            Ok(Command::Quit) => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Ok(command) => execute(shell, command),
            Err(e) => println!(
                "{} Type {} for available commands.",
                e.red(),
                "/help".bold()
            ),
        }
    }

    shell.tracking.release_all();
    shell.tracking.disable();
}

fn execute(shell: &mut Shell, command: Command) {
    match command {
        Command::Help => cmd_help(),
        Command::Settings => print!("{}", shell.tracking.settings()),
        Command::Set(line) => cmd_set(shell, &line),
        Command::Schema => cmd_schema(),
        Command::Enable => {
            shell.tracking.enable();
            println!("{}", "✓ Hand tracking enabled.".green());
        }
        Command::Disable => {
            shell.tracking.disable();
            println!("{}", "✓ Hand tracking disabled.".green());
        }
        Command::Demo(path) => cmd_demo(shell, path.as_deref()),
        Command::Replay(path) => cmd_replay(shell, &path),
        Command::Press(hand, id) => match shell.tracking.press_button(hand, id) {
            Ok(button) => println!("  {} {} held on {}", "✓".green(), button.to_string().bold(), hand),
            Err(e) => println!("{}: {}", "Error".red(), e),
        },
        Command::Release(hand, id) => match shell.tracking.release_button(hand, id) {
            Ok(button) => println!("  {} {} released on {}", "✓".green(), button.to_string().bold(), hand),
            Err(e) => println!("{}: {}", "Error".red(), e),
        },
        Command::ReleaseAll => {
            shell.tracking.release_all();
            println!("  {} All external buttons released.", "✓".green());
        }
        Command::Panel(enabled) => {
            shell.tracking.set_button_panel_enabled(enabled);
            println!("  Button panel {}", if enabled { "on".green() } else { "off".yellow() });
        }
        Command::State => cmd_state(shell),
        Command::Quit => {}
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "handctl Commands".bold().underline());
    println!("  {}              – print tracking settings", "/settings".bold().cyan());
    println!("  {}      – change one setting and save it", "/set name=value".bold().cyan());
    println!("  {}                – JSON schema of the settings", "/schema".bold().cyan());
    println!("  {}     – start or end a tracking session", "/enable  /disable".bold().cyan());
    println!("  {}           – run the scripted gesture demo", "/demo [path]".bold().cyan());
    println!("  {}        – replay a JSON-lines recording", "/replay <path>".bold().cyan());
    println!("  {}   – hold an external button", "/press <hand> <id>".bold().cyan());
    println!("  {} – release one or all buttons", "/release [<hand> <id>]".bold().cyan());
    println!("  {}         – toggle the button panel", "/panel on|off".bold().cyan());
    println!("  {}                 – latest controller state", "/state".bold().cyan());
    println!("  {}           – exit the CLI", "/quit  /exit".bold().cyan());
    println!();
    println!("  External button ids:");
    for button in ExternalButton::ALL {
        println!("    {} {}", button.id().to_string().yellow(), button);
    }
    println!();
}

fn cmd_set(shell: &mut Shell, line: &str) {
    let mut settings = shell.tracking.settings().clone();
    let messages = settings.apply_overrides(line);
    if !messages.is_empty() {
        for message in messages {
            println!("  {} {}", "✗".red(), message);
        }
        return;
    }

    if let Err(e) = shell.tracking.apply_settings(settings.clone()) {
        println!("{}: {}", "Rejected".red(), e);
        return;
    }
    shell.cfg.tracking = settings;

    match config::save(&shell.cfg) {
        Ok(()) => println!(
            "{} {}",
            "✓ Settings saved to".green(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
}

fn cmd_schema() {
    let schema = schemars::schema_for!(TrackingSettings);
    match serde_json::to_string_pretty(&schema) {
        Ok(json) => println!("{}", json),
        Err(e) => println!("{}: {}", "Error rendering schema".red(), e),
    }
}

fn cmd_demo(shell: &mut Shell, save_to: Option<&Path>) {
    let frames = scripted_session(shell.cfg.frame_interval_ms);

    if let Some(path) = save_to {
        match replay::save(path, &frames) {
            Ok(()) => println!("  {} Demo recording written to {}", "✓".green(), path.display().to_string().bold()),
            Err(e) => {
                println!("{}: {}", "Error".red(), e);
                return;
            }
        }
    }

    let summary = replay::run(&mut shell.tracking, &frames);
    print_summary(&summary);
}

fn cmd_replay(shell: &mut Shell, path: &Path) {
    match replay::load(path) {
        Ok(frames) if frames.is_empty() => println!("{}", "Recording is empty.".yellow()),
        Ok(frames) => {
            let summary = replay::run(&mut shell.tracking, &frames);
            print_summary(&summary);
        }
        Err(e) => println!("{}: {}", "Replay error".red(), e),
    }
}

fn cmd_state(shell: &mut Shell) {
    let snapshot = shell.reader.snapshot();
    println!("{}", "Controller State".bold().underline());
    println!(
        "  Session : {}   frame {}   panel {}",
        if shell.tracking.is_enabled() { "enabled".green() } else { "disabled".yellow() },
        snapshot.frame_index.to_string().bold(),
        if shell.tracking.button_panel_enabled() { "on" } else { "off" },
    );
    for hand in Hand::ALL {
        println!("  {}", format_state(hand, snapshot.hand(hand)));
        let held: Vec<String> = shell
            .tracking
            .external_buttons()
            .held(hand)
            .map(|b| b.to_string())
            .collect();
        if !held.is_empty() {
            println!("          held: {}", held.join(", ").yellow());
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// One-line rendering of a hand's controller state.
pub fn format_state(hand: Hand, state: &HandControllerState) -> String {
    if !state.tracked {
        return format!("{:<5}  untracked  buttons {:#013x}", hand.as_str(), state.buttons);
    }
    let modes = [
        (state.modes.input, "input"),
        (state.modes.input_2d, "2d"),
        (state.modes.button_panel, "panel"),
    ]
    .iter()
    .filter(|(on, _)| *on)
    .map(|(_, name)| *name)
    .collect::<Vec<_>>()
    .join("+");
    format!(
        "{:<5}  tracked    modes [{}]  trigger {:.2}  grip {:.2}  2d ({:.2}, {:.2})  buttons {:#013x}",
        hand.as_str(),
        modes,
        state.trigger,
        state.grip,
        state.input_2d_position.x,
        state.input_2d_position.y,
        state.buttons,
    )
}

fn print_summary(summary: &ReplaySummary) {
    println!("{}", "Replay Summary".bold().underline());
    println!("  Frames : {}", summary.frames.to_string().bold());
    for hand in Hand::ALL {
        let h = summary.hand(hand);
        println!(
            "  {:<5}  tracked {:>4}  input {:>4}  2d {:>4}  panel {:>4}  peak trigger {:.2}  peak grip {:.2}",
            hand.as_str(),
            h.tracked,
            h.input,
            h.input_2d,
            h.button_panel,
            h.peak_trigger,
            h.peak_grip,
        );
    }
    if let Some(last) = &summary.last {
        for hand in Hand::ALL {
            println!("  last {}", format_state(hand, last.hand(hand)));
        }
    }
}
