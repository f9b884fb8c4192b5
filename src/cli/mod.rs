//! Command-line surface: a thin shell over the dispatch layer.
//!
//! Every subcommand follows the same shape: resolve configuration, build the
//! LCD transport, call into the library, print JSON. Signing commands need
//! `INJECTIVE_PRIVATE_KEY`; the external-signing pair (`prepare`,
//! `broadcast-signed`) and the read-only commands run without it.

pub mod doctor;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use crate::chain::lcd::LcdClient;
use crate::chain::{ChainRpc, ChainSession};
use crate::config::AgentConfig;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::identity::KeyedIdentity;
use crate::market::MarketResolver;
use crate::msg::OperationKind;

#[derive(Parser, Debug)]
#[command(name = "injagent", version, about = "Injective transaction pipeline")]
struct Cli {
    /// Target network: mainnet or testnet. Falls back to INJAGENT_NETWORK,
    /// then testnet.
    #[arg(long, global = true)]
    network: Option<String>,

    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the configured key's address and subaccount id.
    Address {
        /// Subaccount index to derive.
        #[arg(long, default_value_t = 0)]
        index: u32,
    },

    /// Run one operation through the simulate-sign-broadcast pipeline.
    Execute {
        /// Operation kind, e.g. transfer or derivative-limit-order.
        kind: String,
        /// Operation arguments as a JSON object.
        arguments: String,
    },

    /// Build an unsigned transaction envelope for external signing.
    Prepare {
        kind: String,
        arguments: String,
        /// Account address whose key is held elsewhere.
        #[arg(long)]
        address: String,
    },

    /// Broadcast a transaction signed outside this process.
    BroadcastSigned {
        /// Hex-encoded signed transaction bytes.
        tx_hex: String,
        #[arg(long)]
        address: String,
    },

    /// Resolve a human ticker to its on-chain market id.
    ResolveMarket { ticker: String },

    /// Show bank balances with human-decimal amounts where known.
    Balances {
        /// Address to query; defaults to the configured key's address.
        #[arg(long)]
        address: Option<String>,
    },

    /// Probe connectivity and print the resolved configuration.
    Doctor {
        /// Exit non-zero when any check fails.
        #[arg(long)]
        strict: bool,
    },
}

/// Binary entry point: env loading, tracing, config resolution, dispatch.
pub async fn run() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    crate::bootstrap::load_injagent_env();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = AgentConfig::resolve(cli.network.as_deref())?;

    match cli.command {
        Command::Address { index } => {
            let identity = signing_identity(&config)?;
            print_json(&json!({
                "address": identity.address(),
                "ethereum_address": identity.ethereum_address(),
                "subaccount_index": index,
                "subaccount_id": identity.subaccount_id(index),
            }))
        }
        Command::Execute { kind, arguments } => {
            let identity = signing_identity(&config)?;
            let kind: OperationKind = kind.parse()?;
            let arguments = parse_arguments(&arguments)?;
            let dispatcher = dispatcher(&config)?;

            let report = dispatcher.execute(kind, arguments, &identity).await;
            print_json(&report)?;
            if !report.success {
                anyhow::bail!("operation did not reach the mempool");
            }
            Ok(())
        }
        Command::Prepare {
            kind,
            arguments,
            address,
        } => {
            let kind: OperationKind = kind.parse()?;
            let arguments = parse_arguments(&arguments)?;
            let dispatcher = dispatcher(&config)?;

            let prepared = dispatcher.prepare(kind, arguments, &address).await?;
            print_json(&prepared)
        }
        Command::BroadcastSigned { tx_hex, address } => {
            let tx_bytes = hex::decode(tx_hex.trim().trim_start_matches("0x"))
                .map_err(|e| anyhow::anyhow!("tx_hex is not valid hex: {e}"))?;
            let dispatcher = dispatcher(&config)?;

            let receipt = dispatcher.broadcast_signed(&address, &tx_bytes).await?;
            print_json(&receipt)
        }
        Command::ResolveMarket { ticker } => {
            let resolver = MarketResolver::new(rpc(&config)?);
            let market = resolver.resolve(&ticker).await?;
            print_json(&market)
        }
        Command::Balances { address } => {
            let address = match address {
                Some(address) => address,
                None => signing_identity(&config)?.address().to_string(),
            };
            let session =
                ChainSession::initialize(rpc(&config)?, config.network_config.clone(), &address)
                    .await?;
            print_json(&session.balances().await?)
        }
        Command::Doctor { strict } => doctor::run(&config, strict).await,
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("injagent=info"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn signing_identity(config: &AgentConfig) -> Result<KeyedIdentity, Error> {
    let key = config.require_private_key()?;
    Ok(KeyedIdentity::from_hex(key)?)
}

fn rpc(config: &AgentConfig) -> anyhow::Result<Arc<dyn ChainRpc>> {
    Ok(Arc::new(LcdClient::new(&config.network_config)?))
}

fn dispatcher(config: &AgentConfig) -> anyhow::Result<Dispatcher> {
    Ok(Dispatcher::new(rpc(config)?, config.network_config.clone()))
}

fn parse_arguments(raw: &str) -> anyhow::Result<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| anyhow::anyhow!("arguments must be a JSON object: {e}"))?;
    if !value.is_object() {
        anyhow::bail!("arguments must be a JSON object, got {value}");
    }
    Ok(value)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
