mod chat;
mod config;
mod error;
mod history;
mod i18n;
mod llm;
mod sanitize;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::chat::SessionLoop;
use crate::config::{Config, DEFAULT_BASE_URL, KeyStatus};
use crate::error::ChatError;
use crate::i18n::{Language, MessageKey, t};
use crate::llm::client::ChatClient;
use crate::llm::openai::OpenAiBackend;

/// Chat with OpenAI-compatible APIs from the terminal.
///
/// Pass a question to ask it once, or run without one for an interactive
/// session that keeps the conversation context.
#[derive(Parser)]
#[command(name = "ai-chat", version, args_conflicts_with_subcommands = true)]
struct Cli {
    /// Question to ask once; omit it to start interactive mode
    question: Option<String>,

    /// Provider name from the config file (default: first one with a key)
    #[arg(short, long)]
    provider: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Print version information
    Version,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write an example config file
    Init,
    /// Show the current configuration (API keys are hidden)
    Show,
    /// Set a value, e.g. `providers.openai.model gpt-4o`
    Set { key: String, value: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("❌ {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let loaded = Config::load();
    init_logging(
        loaded
            .as_ref()
            .map(|cfg| cfg.logging.level.as_str())
            .unwrap_or("warn"),
    );

    match cli.command {
        Some(Command::Config { action }) => {
            config_command(action, loaded)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Version) => {
            println!(
                "{} version {}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            );
            Ok(ExitCode::SUCCESS)
        }
        None => run_chat(loaded, cli.question.as_deref(), cli.provider.as_deref()),
    }
}

fn run_chat(
    loaded: Result<Config>,
    question: Option<&str>,
    provider: Option<&str>,
) -> Result<ExitCode> {
    let config = match loaded {
        Ok(config) => config,
        Err(err) => {
            let lang = Language::detect(None);
            let err = ChatError::config_caused("failed to load configuration", err);
            report_config_error(&lang, &err, None);
            return Ok(ExitCode::FAILURE);
        }
    };
    let lang = Language::detect(config.preference.language.as_deref());

    let (name, provider) = match config.select_provider(provider) {
        Ok(selected) => selected,
        Err(err) => {
            report_config_error(&lang, &err, Some(&config));
            return Ok(ExitCode::FAILURE);
        }
    };

    println!("{}{name}", t(&lang, MessageKey::UsingProvider));
    if !provider.base_url.is_empty() && provider.base_url != DEFAULT_BASE_URL {
        println!("{}{}", t(&lang, MessageKey::UsingBaseUrl), provider.base_url);
    }
    if !provider.model.is_empty() {
        println!("{}{}", t(&lang, MessageKey::UsingModel), provider.model);
    }

    let client = ChatClient::new(OpenAiBackend::new(config.logging.requests)?);
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut session = SessionLoop::new(client, provider, lang, stdin.lock(), stdout.lock());

    match question {
        Some(question) => Ok(if session.run_single(question)? {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }),
        None => match session.run_interactive() {
            Ok(()) => Ok(ExitCode::SUCCESS),
            // Already reported to the user by the session.
            Err(err) if err.downcast_ref::<ChatError>().is_some_and(ChatError::is_fatal) => {
                Ok(ExitCode::FAILURE)
            }
            Err(err) => Err(err),
        },
    }
}

fn report_config_error(lang: &Language, err: &ChatError, config: Option<&Config>) {
    println!("{}{}", t(lang, MessageKey::ConfigFailed), err.chain());
    if let Some(config) = config {
        let providers = config.provider_keys();
        if !providers.is_empty() {
            println!("{}", t(lang, MessageKey::AvailableProviders));
            for (name, has_key) in providers {
                let status = if has_key {
                    t(lang, MessageKey::KeyPresent)
                } else {
                    t(lang, MessageKey::KeyAbsent)
                };
                println!("  • {name} ({status})");
            }
        }
    }
    println!("{}", t(lang, MessageKey::ConfigHint));
}

fn config_command(action: ConfigAction, loaded: Result<Config>) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = Config::target_path()?;
            config::write_example(&path)?;
            println!("✓ Created config file: {}", path.display());
            println!("Edit it to add API keys, or export them as <PROVIDER>_API_KEY,");
            println!("e.g. {} for the 'openai' provider.", config::env_key_name("openai"));
        }
        ConfigAction::Show => {
            let cfg = loaded?;
            println!("Configured providers:");
            if cfg.providers.is_empty() {
                println!("  (none)");
            }
            for (name, provider) in &cfg.providers {
                let key = match cfg.key_status(name) {
                    KeyStatus::Set => "set".to_string(),
                    KeyStatus::Env => format!("from {}", config::env_key_name(name)),
                    KeyStatus::Missing => "missing".to_string(),
                };
                let or_default = |s: &str| {
                    if s.is_empty() {
                        "(default)".to_string()
                    } else {
                        s.to_string()
                    }
                };
                println!("  {name}:");
                println!("    base URL:   {}", or_default(&provider.base_url));
                println!("    model:      {}", or_default(&provider.model));
                println!("    max tokens: {}", provider.max_tokens);
                println!("    API key:    {key}");
            }
            println!("Advanced:");
            println!("  save history:   {}", cfg.advanced.save_history);
            println!("  history length: {}", cfg.advanced.history_length);
            println!("Logging:");
            println!("  level:    {}", cfg.logging.level);
            println!("  requests: {}", cfg.logging.requests);
        }
        ConfigAction::Set { key, value } => {
            let path = Config::target_path()?;
            config::set_value(&path, &key, &value)?;
            println!("✓ Set {key} = {value}");
        }
    }
    Ok(())
}
