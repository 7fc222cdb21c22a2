//! HiveMind CLI
//!
//! Command-line interface for deploying, auditing and coordinating smart
//! contracts on the ledger.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use hive_agents::AiProvider;
use hive_copilot::{ai_provider, inspect_key, Copilot, CopilotConfig, DEFAULT_CONFIG_FILE};
use hive_ledger::{JsonRpcConnector, LedgerConnector, ParamValue};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "hivemind")]
#[command(version)]
#[command(
    about = "HiveMind - smart contract deployment, audit and agent coordination",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile, upload and deploy a contract
    Deploy {
        /// Solidity source file
        file: PathBuf,

        /// Constructor parameter as name=type:value (repeatable, in order)
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// Gas limit for contract creation
        #[arg(long, default_value_t = hive_ledger::DEFAULT_GAS_LIMIT)]
        gas: u64,

        /// Initial contract balance in tinybars
        #[arg(long, default_value_t = 0)]
        initial_balance: u64,

        /// Contract to deploy when the file declares several
        #[arg(long)]
        contract_name: Option<String>,
    },

    /// Audit a contract for security issues
    Audit {
        /// Solidity source file
        file: PathBuf,

        /// Ask a discovered auditing agent for a second opinion
        #[arg(long, requires = "contract")]
        collaborate: bool,

        /// Address of the deployed contract under audit
        #[arg(long)]
        contract: Option<String>,
    },

    /// Generate contract code or tests with the code model
    Generate {
        #[command(subcommand)]
        target: GenerateCommands,
    },

    /// Topic messaging
    Topic {
        #[command(subcommand)]
        topic: TopicCommands,
    },

    /// Contract registry actions: get_contracts, register_contract, get_contract_details
    Registry {
        /// Action name
        action: String,

        /// Registry contract id (defaults to the configured registry)
        #[arg(long)]
        registry: Option<String>,

        /// Contract id the action applies to
        #[arg(long)]
        contract: Option<String>,

        /// Registration metadata as a JSON object
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Operator key utilities
    Keys {
        #[command(subcommand)]
        keys: KeysCommands,
    },

    /// Configuration utilities
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum GenerateCommands {
    /// Generate source code from a description
    Code {
        /// What the code should do
        description: String,

        /// Target language
        #[arg(long, default_value = "solidity")]
        language: String,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate tests for a source file
    Tests {
        /// Source file under test
        file: PathBuf,

        /// Language of the source
        #[arg(long, default_value = "solidity")]
        language: String,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum TopicCommands {
    /// Create a topic gated by the operator key
    Create {
        /// Topic memo
        #[arg(default_value = "hivemind")]
        memo: String,
    },
    /// Send a signed message
    Send {
        /// Topic id
        topic: String,
        /// Recipient agent id
        #[arg(long)]
        to: String,
        /// Message type
        #[arg(long = "type", default_value = "message")]
        message_type: String,
        /// JSON content
        content: String,
    },
    /// Read messages in topic order
    Read {
        /// Topic id
        topic: String,
        /// Only messages after this sequence number
        #[arg(long, default_value_t = 0)]
        after: u64,
    },
}

#[derive(Subcommand)]
enum KeysCommands {
    /// Show the scheme and public key of the configured operator key
    Inspect,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration with secrets redacted
    Show,
    /// Write a configuration file with default values
    Init {
        /// Output path
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        output: PathBuf,
    },
}

fn init_logging(verbose: bool, config: &CopilotConfig) {
    let env_filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };

    // Logs go to stderr so stdout carries only JSON results
    let registry = tracing_subscriber::registry().with(env_filter);
    if config.logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<CopilotConfig> {
    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    let path = match path {
        Some(path) => Some(path),
        None if default_path.exists() => Some(default_path),
        None => None,
    };
    CopilotConfig::load(path).context("loading configuration")
}

/// Parse `name=type:value`
fn parse_param(raw: &str) -> anyhow::Result<(String, ParamValue)> {
    let Some((name, typed)) = raw.split_once('=') else {
        bail!("parameter '{}' must look like name=type:value", raw);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("parameter '{}' has no name", raw);
    }
    Ok((name.to_string(), ParamValue::parse_typed(name, typed)?))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_source(file: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))
}

fn write_generated(content: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!("wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

async fn connect(config: CopilotConfig) -> anyhow::Result<Copilot> {
    let connector: Arc<dyn LedgerConnector> = Arc::new(JsonRpcConnector);
    Copilot::connect(config, connector)
        .await
        .context("connecting to the ledger")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(cli.verbose, &config);

    match cli.command {
        Commands::Deploy {
            file,
            params,
            gas,
            initial_balance,
            contract_name,
        } => {
            let source = read_source(&file)?;
            let copilot = connect(config).await?;

            let mut settings = copilot.deploy_settings();
            settings.gas = gas;
            settings.initial_balance = initial_balance;
            settings.compile.contract_name = contract_name;
            for raw in &params {
                let (name, value) = parse_param(raw)?;
                settings.constructor_params.push(name, value);
            }

            let outcome = copilot.deploy(&source, settings).await?;
            print_json(&outcome)?;
        }

        Commands::Audit {
            file,
            collaborate,
            contract,
        } => {
            let source = read_source(&file)?;
            let copilot = connect(config).await?;
            let collaborate_on = if collaborate { contract.as_deref() } else { None };
            let mut report = copilot.audit(&source, collaborate_on).await?;
            if report.contract_address.is_none() {
                report.contract_address = contract;
            }
            print_json(&report)?;
        }

        Commands::Generate { target } => {
            let ai = ai_provider(&config)?;
            let model = config.ai.codex_model.as_str();
            let (generated, output) = match target {
                GenerateCommands::Code {
                    description,
                    language,
                    output,
                } => (ai.generate_code(model, &description, &language).await?, output),
                GenerateCommands::Tests {
                    file,
                    language,
                    output,
                } => {
                    let source = read_source(&file)?;
                    (ai.generate_tests(model, &source, &language).await?, output)
                }
            };
            tracing::debug!(
                model = %generated.model,
                tokens = generated.tokens_used,
                "generation done"
            );
            write_generated(&generated.content, output.as_deref())?;
        }

        Commands::Topic { topic } => {
            let copilot = connect(config).await?;
            match topic {
                TopicCommands::Create { memo } => {
                    let topic = copilot.create_topic(&memo).await?;
                    print_json(&topic)?;
                }
                TopicCommands::Send {
                    topic,
                    to,
                    message_type,
                    content,
                } => {
                    let content: Value =
                        serde_json::from_str(&content).context("content must be JSON")?;
                    let (ack, message) = copilot
                        .send_message(&topic, &to, &message_type, content)
                        .await?;
                    print_json(&serde_json::json!({
                        "transactionId": ack.transaction_id,
                        "sequenceNumber": ack.sequence_number,
                        "message": message,
                    }))?;
                }
                TopicCommands::Read { topic, after } => {
                    let messages: Vec<Value> = copilot
                        .read_messages(&topic, after)
                        .await?
                        .into_iter()
                        .map(|received| {
                            serde_json::json!({
                                "sequenceNumber": received.sequence_number,
                                "consensusTimestamp": received.consensus_timestamp,
                                "message": received.message,
                            })
                        })
                        .collect();
                    print_json(&messages)?;
                }
            }
        }

        Commands::Registry {
            action,
            registry,
            contract,
            metadata,
        } => {
            let metadata: Option<Value> = metadata
                .as_deref()
                .map(serde_json::from_str::<Value>)
                .transpose()
                .context("metadata must be JSON")?;
            let copilot = connect(config).await?;
            let result = copilot
                .registry(registry.as_deref(), &action, contract.as_deref(), metadata.as_ref())
                .await?;
            print_json(&result)?;
        }

        Commands::Keys { keys } => match keys {
            KeysCommands::Inspect => {
                let inspection = inspect_key(&config, Arc::new(JsonRpcConnector))?;
                print_json(&inspection)?;
            }
        },

        Commands::Config { action } => match action {
            ConfigCommands::Show => {
                print!("{}", config.to_redacted_toml()?);
            }
            ConfigCommands::Init { output } => {
                if output.exists() {
                    bail!("{} already exists", output.display());
                }
                CopilotConfig::default().save(&output)?;
                tracing::info!("wrote {}", output.display());
            }
        },
    }

    Ok(())
}
