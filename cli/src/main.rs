// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ledgerline CLI
//!
//! Entry point for the `ledgerline` binary. Parses CLI arguments,
//! initializes logging, and drives the client library against a set of
//! masternodes.
//!
//! - `keygen` : print a fresh keypair
//! - `ping`   : ask a masternode whether it is online
//! - `balance`: read a verifying key's currency balance
//! - `contract`: read a contract's source, methods, and variables
//! - `send`   : sign, submit, and (by default) confirm one transaction
//! - `batch`  : submit a file of transactions with per-sender nonces
//! - `version`: print build version information

mod cli;
mod logging;

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::future::join_all;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use ledgerline_client::batch::TransactionBatcher;
use ledgerline_client::config::SUPPORTED_NETWORK_VERSIONS;
use ledgerline_client::crypto::{Keypair, Signer};
use ledgerline_client::network::{
    MasternodeClient, NetworkInfo, NetworkType, StateReader, Transport,
};
use ledgerline_client::transaction::{TransactionRecord, TxInfo, TxState};

use cli::{BalanceArgs, BatchArgs, Commands, ContractArgs, LedgerlineCli, NetworkArgs, SendArgs};
use logging::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = LedgerlineCli::parse();
    logging::init_logging(
        logging::DEFAULT_DIRECTIVE,
        LogFormat::from_str_lossy(&cli.log_format),
    );

    match cli.command {
        Commands::Keygen => keygen(),
        Commands::Ping(args) => ping(args).await,
        Commands::Balance(args) => balance(args).await,
        Commands::Contract(args) => contract(args).await,
        Commands::Send(args) => send(args).await,
        Commands::Batch(args) => batch(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn keygen() -> Result<()> {
    let keypair = Keypair::generate();
    print_json(&json!({
        "vk": keypair.public_key().to_hex(),
        "sk": keypair.secret_hex(),
    }))
}

async fn ping(args: NetworkArgs) -> Result<()> {
    let client = connect(&args)?;
    let online = client.ping().await;
    tracing::info!(online, "ping finished");
    print_json(&json!({ "online": online }))
}

async fn balance(args: BalanceArgs) -> Result<()> {
    let client = connect(&args.network)?;
    let balance = client.get_currency_balance(&args.vk).await?;
    print_json(&json!({
        "vk": args.vk,
        "balance": balance,
        "symbol": client.network().currency_symbol,
    }))
}

async fn contract(args: ContractArgs) -> Result<()> {
    let client = connect(&args.network)?;
    let Some(info) = client.get_contract_info(&args.name).await? else {
        bail!("contract {} does not exist", args.name);
    };
    let methods = client.get_contract_methods(&args.name).await?;
    let variables = client.get_contract_variables(&args.name).await?;
    print_json(&json!({
        "name": info.name,
        "code": info.code,
        "methods": methods,
        "variables": variables,
    }))
}

/// Signs and submits one transaction, then waits for it to settle unless
/// `--no-wait` was given.
async fn send(args: SendArgs) -> Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(connect(&args.network)?);
    let keypair = Keypair::from_hex(&args.sk).context("invalid signing key")?;
    let kwargs: Map<String, Value> =
        serde_json::from_str(&args.kwargs).context("--kwargs must be a JSON object")?;

    let mut info = TxInfo::new(
        keypair.public_key().to_hex(),
        &args.contract,
        &args.method,
        args.stamp_limit,
    )
    .kwargs(kwargs);
    if let Some(uid) = args.uid {
        info = info.uid(uid);
    }

    let mut record = TransactionRecord::new(transport, info).context("invalid transaction")?;
    record.sign(Arc::new(keypair))?;

    let state = record.submit().await?;
    tracing::info!(state = %state, tx_hash = ?record.tx_hash(), "submitted");
    if state == TxState::Pending && !args.no_wait {
        record.check_for_result().await?;
    }

    print_json(&serde_json::to_value(record.snapshot())?)?;
    if let Some(reason) = record.state().failure() {
        bail!("transaction failed: {reason}");
    }
    Ok(())
}

/// Runs the batcher until every transaction in the file went out or a run
/// makes no progress.
async fn batch(args: BatchArgs) -> Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(connect(&args.network)?);

    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let infos: Vec<TxInfo> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of transactions", args.file.display()))?;

    let mut signers: HashMap<String, Arc<dyn Signer>> = HashMap::new();
    for sk in &args.keys {
        let keypair = Keypair::from_hex(sk).context("invalid signing key")?;
        signers.insert(keypair.public_key().to_hex(), Arc::new(keypair));
    }

    let batcher = TransactionBatcher::new(transport);
    let queued = batcher.enqueue_many(infos)?;
    tracing::info!(queued, senders = signers.len(), "batch loaded");

    let mut records = Vec::new();
    loop {
        let report = batcher.run_all(&signers).await?;
        for sender in &report.senders {
            if let Some(error) = &sender.error {
                tracing::warn!(sender = %sender.sender, %error, "sender batch incomplete");
            }
        }
        let remaining = report.remaining;
        let created = report.records().count();
        records.extend(report.into_records());
        if remaining == 0 {
            break;
        }
        if created == 0 {
            bail!("{remaining} transactions could not be submitted");
        }
    }

    if args.wait {
        join_all(
            records
                .iter_mut()
                .filter(|r| r.state() == TxState::Pending)
                .map(|r| r.check_for_result()),
        )
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;
    }

    let snapshots = records
        .iter()
        .map(|r| serde_json::to_value(r.snapshot()))
        .collect::<Result<Vec<_>, _>>()?;
    print_json(&Value::Array(snapshots))
}

fn connect(args: &NetworkArgs) -> Result<MasternodeClient> {
    let network_type: NetworkType = args.network_type.parse()?;
    if !SUPPORTED_NETWORK_VERSIONS.contains(&args.api_version) {
        tracing::warn!(
            requested = args.api_version,
            "unsupported API version, falling back to the default"
        );
    }
    let network = NetworkInfo::new(&args.hosts)
        .context("invalid --hosts")?
        .with_type(network_type)
        .with_version(args.api_version);
    tracing::debug!(hosts = ?network.hosts(), "network configured");
    Ok(MasternodeClient::new(network))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("ledgerline {}", env!("CARGO_PKG_VERSION"));
    println!("api        {:?}", SUPPORTED_NETWORK_VERSIONS);
}
