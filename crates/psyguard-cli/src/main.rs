//! psyguard CLI - parse model responses and run guardrails from the shell.
//!
//! Exit codes:
//! - 0: success (for `validate`, the response passed every guardrail)
//! - 1: `validate` produced an invalid report, or an `evaluate` case failed
//! - 2: usage, input or configuration error

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use psyguard_core::evaluation::{self, LoadedCases};
use psyguard_core::{
    classify, ChatRequest, Guardrail, GuardrailConfig, GuardrailRegistry, Message, RiskLevel,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Parse LLM risk classifications and run psyguard guardrails
#[derive(Parser, Debug)]
#[command(name = "psyguard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Print compact JSON instead of pretty JSON
    #[arg(long, global = true)]
    compact: bool,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a raw model response into a structured risk verdict
    Parse {
        /// Response file, or `-` for stdin
        input: PathBuf,

        /// Threshold used for the `triggered` flag
        #[arg(short, long, value_enum, default_value_t = Threshold::Possible)]
        threshold: Threshold,
    },

    /// Validate a raw model response against one or more guardrails
    Validate {
        #[command(flatten)]
        selection: Selection,

        /// Response file, or `-` for stdin
        input: PathBuf,
    },

    /// Apply guardrails to a conversation and print the guarded request
    Apply {
        #[command(flatten)]
        selection: Selection,

        /// Conversation JSON: a request object or a bare message array (`-` for stdin)
        input: PathBuf,
    },

    /// Score guardrails against recorded cases (JSON Lines)
    Evaluate {
        #[command(flatten)]
        selection: Selection,

        /// Cases file, or `-` for stdin
        cases: PathBuf,
    },

    /// List available guardrails
    List,
}

#[derive(clap::Args, Debug)]
struct Selection {
    /// Guardrail names, applied in the given order
    #[arg(short, long, value_delimiter = ',', required = true)]
    guardrails: Vec<String>,

    /// Guardrail config file (YAML, or JSON by extension)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Threshold {
    Possible,
    Active,
    PlanImminent,
}

impl From<Threshold> for RiskLevel {
    fn from(threshold: Threshold) -> Self {
        match threshold {
            Threshold::Possible => RiskLevel::Possible,
            Threshold::Active => RiskLevel::Active,
            Threshold::PlanImminent => RiskLevel::PlanImminent,
        }
    }
}

/// Conversation input accepted by `apply`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ConversationInput {
    Request(ChatRequest),
    Messages(Vec<Message>),
}

impl From<ConversationInput> for ChatRequest {
    fn from(input: ConversationInput) -> Self {
        match input {
            ConversationInput::Request(request) => request,
            ConversationInput::Messages(messages) => ChatRequest::new(messages),
        }
    }
}

#[derive(Serialize)]
struct GuardrailListing<'a> {
    name: &'a str,
    description: &'a str,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("psyguard_core=debug,psyguard_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        Ok(buffer)
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    }
}

fn load_config(path: Option<&Path>) -> Result<GuardrailConfig> {
    match path {
        Some(path) => GuardrailConfig::from_file(path)
            .with_context(|| format!("invalid config {}", path.display())),
        None => Ok(GuardrailConfig::default()),
    }
}

fn build_guardrail(selection: &Selection) -> Result<Box<dyn Guardrail>> {
    let config = load_config(selection.config.as_deref())?;
    let registry = GuardrailRegistry::with_defaults();

    if let [name] = selection.guardrails.as_slice() {
        return registry.create(name, &config).context("failed to create guardrail");
    }
    let composite = registry
        .compose(selection.guardrails.as_slice(), &config)
        .context("failed to compose guardrails")?;
    tracing::debug!(sequence = ?composite.sequence(), "guardrails composed");
    Ok(Box::new(composite))
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", json);
    Ok(())
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Parse { input, threshold } => {
            let raw = read_input(&input)?;
            let classification = classify(&raw, threshold.into()).context("response rejected")?;
            print_json(&classification, cli.compact)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate { selection, input } => {
            let guardrail = build_guardrail(&selection)?;
            let raw = read_input(&input)?;
            let report = guardrail.validate(&raw);
            print_json(&report, cli.compact)?;
            Ok(if report.is_valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Command::Apply { selection, input } => {
            let guardrail = build_guardrail(&selection)?;
            let raw = read_input(&input)?;
            let conversation: ConversationInput =
                serde_json::from_str(&raw).context("input is not a conversation")?;
            let guarded = guardrail.apply(&conversation.into());
            print_json(&guarded, cli.compact)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Evaluate { selection, cases } => {
            let guardrail = build_guardrail(&selection)?;
            let LoadedCases { cases, skipped } = evaluation::parse_cases(&read_input(&cases)?);
            if !skipped.is_empty() {
                tracing::warn!(skipped = skipped.len(), "some test cases could not be decoded");
            }
            let summary = evaluation::evaluate(guardrail.as_ref(), &cases);
            print_json(&summary, cli.compact)?;
            Ok(if summary.all_passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Command::List => {
            let registry = GuardrailRegistry::with_defaults();
            let listing: Vec<_> = registry
                .describe()
                .into_iter()
                .map(|(name, description)| GuardrailListing { name, description })
                .collect();
            print_json(&listing, cli.compact)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
