// ============================================================================
// File: src/main.rs
// Entry point, CLI handling and the interactive chat loop
// ============================================================================

mod config;
mod conversation;
mod display;
mod error;
mod llm_client;
mod markdown;
mod models;
mod orchestrator;
mod router;
mod search_client;

use anyhow::Result;
use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::conversation::Credential;
use crate::error::ShopError;
use crate::markdown::MarkdownExporter;
use crate::orchestrator::{TurnOrchestrator, TurnPhase};

/// Command-line arguments for the shopping assistant
#[derive(Parser, Debug)]
#[command(name = "shopbot")]
#[command(about = "Chat with an LLM that searches Google Shopping for you", long_about = None)]
struct Args {
    /// Path to an optional JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the conversation as markdown to this path on exit
    #[arg(short, long)]
    export_on_exit: Option<PathBuf>,

    /// Enable verbose output (shows routing decisions and requests)
    #[arg(short, long)]
    verbose: bool,
}

enum Command<'a> {
    Key(Option<&'a str>),
    Clear,
    History,
    Export(Option<&'a str>),
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse_command(line: &str) -> Option<Command<'_>> {
    let rest = line.strip_prefix('/')?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
        None => (rest, None),
    };

    Some(match name {
        "key" => Command::Key(arg),
        "clear" => Command::Clear,
        "history" => Command::History,
        "export" => Command::Export(arg),
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Unknown(other),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    init_tracing(args.verbose);

    // Load and validate configuration (defaults when no file is given)
    let config = load_config(args.config.as_deref())?;
    config.validate()?;

    // Create the orchestrator; it owns the session for the whole run
    let mut orchestrator = TurnOrchestrator::new(&config)?;

    print_header(&config);
    display::print_history(orchestrator.session().turns(), config.grid_columns);

    // Read one utterance or command per line until /quit or EOF
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_command(line) {
            Some(Command::Quit) => break,
            Some(command) => run_command(command, &mut orchestrator, &config),
            None => run_turn(line, &mut orchestrator, &config).await,
        }
    }

    // Save the transcript if requested
    if let Some(path) = &args.export_on_exit {
        export(&orchestrator, path);
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "shopbot=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let config_content = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;
    let config: Config = serde_json::from_str(&config_content)
        .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;
    Ok(config)
}

async fn run_turn(utterance: &str, orchestrator: &mut TurnOrchestrator, config: &Config) {
    let spinner = create_spinner();

    let result = orchestrator
        .handle_turn_with(utterance, |phase| match phase {
            TurnPhase::Searching { keywords } => {
                spinner.set_message(format!("Searching Google for: {}...", keywords));
            }
            TurnPhase::Appended => spinner.set_message("Done"),
            TurnPhase::Routing | TurnPhase::DirectChat => {}
        })
        .await;

    spinner.finish_and_clear();

    // Failures never reach the log, so they are only shown here
    match result {
        Ok(_) => {
            if let Some(turn) = orchestrator.session().last() {
                display::print_turn(turn, config.grid_columns);
            }
        }
        Err(ShopError::MissingCredential) => {
            println!(
                "\n{} Please enter your SerpApi key with {} first!",
                "⚠".yellow().bold(),
                "/key".bright_cyan()
            );
        }
        Err(e) => {
            println!("\n{} {}", "✗ Error:".red().bold(), e);
        }
    }
}

fn run_command(command: Command<'_>, orchestrator: &mut TurnOrchestrator, config: &Config) {
    match command {
        Command::Key(Some(key)) => set_key(orchestrator, key.to_string()),
        Command::Key(None) => {
            match dialoguer::Password::new()
                .with_prompt("SerpApi key")
                .allow_empty_password(true)
                .interact()
            {
                Ok(key) => set_key(orchestrator, key),
                Err(e) => println!("{} Could not read key: {}", "✗".red().bold(), e),
            }
        }
        Command::Clear => {
            orchestrator.clear();
            println!("{} Chat history cleared", "✓".green().bold());
            display::print_history(orchestrator.session().turns(), config.grid_columns);
        }
        Command::History => {
            display::print_history(orchestrator.session().turns(), config.grid_columns);
        }
        Command::Export(Some(path)) => export(orchestrator, Path::new(path)),
        Command::Export(None) => {
            println!("{} Usage: /export <path>", "ℹ".blue().bold());
        }
        Command::Help => print_help(),
        Command::Unknown(name) => {
            println!("{} Unknown command: /{} (try /help)", "⚠".yellow().bold(), name);
        }
        Command::Quit => {}
    }
}

fn set_key(orchestrator: &mut TurnOrchestrator, key: String) {
    let credential = Credential::new(key.trim());
    if credential.is_set() {
        println!("{} SerpApi key set", "✓".green().bold());
    } else {
        println!("{} SerpApi key cleared", "ℹ".blue().bold());
    }
    orchestrator.set_api_key(credential);
}

fn export(orchestrator: &TurnOrchestrator, path: &Path) {
    match MarkdownExporter::new(orchestrator.session().turns()).export(path) {
        Ok(()) => println!(
            "{} Conversation exported to: {}",
            "✓".green().bold(),
            path.display().to_string().bright_cyan()
        ),
        Err(e) => println!("{} Export failed: {}", "✗".red().bold(), e),
    }
}

fn create_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_prompt() {
    use std::io::Write;

    print!("\n{} ", "›".bright_green().bold());
    let _ = std::io::stdout().flush();
}

fn print_header(config: &Config) {
    println!("{}", "\n═══════════════════════════════════════".bright_blue());
    println!("{}", "         AI SHOPPING ASSISTANT".bright_white().bold());
    println!("{}", "═══════════════════════════════════════".bright_blue());
    println!(
        "Powered by {} & {}",
        config.model.bright_yellow(),
        "Google Shopping".bright_yellow()
    );
    println!(
        "\n{} Set your SerpApi key with {}, then ask for 'best headphones under $50' or 'red running shoes'.",
        "💡".yellow(),
        "/key".bright_cyan()
    );
    println!("   Type {} for all commands.", "/help".bright_cyan());
}

fn print_help() {
    println!("\n{}", "Commands".green().bold());
    println!("  {}   set the SerpApi key (hidden prompt when no value is given)", "/key [value]".bright_cyan());
    println!("  {}         clear the chat history", "/clear".bright_cyan());
    println!("  {}       show the whole conversation", "/history".bright_cyan());
    println!("  {}  save the conversation as markdown", "/export <path>".bright_cyan());
    println!("  {}          leave", "/quit".bright_cyan());
}
