//! # CLI Interface
//!
//! Defines the command-line argument structure for `ledgerline` using
//! `clap` derive. Subcommands: `keygen`, `ping`, `balance`, `contract`,
//! `send`, `batch`, and `version`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Ledgerline transaction client.
///
/// Builds, signs, and submits transactions to a ledger's masternodes and
/// waits for them to settle. Command output is JSON on stdout; logs go to
/// stderr.
#[derive(Parser, Debug)]
#[command(
    name = "ledgerline",
    about = "Ledgerline transaction client",
    version,
    propagate_version = true
)]
pub struct LedgerlineCli {
    /// Log output format: `pretty` or `json`.
    #[arg(long, global = true, env = "LEDGERLINE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a fresh Ed25519 keypair.
    Keygen,
    /// Check whether a masternode answers.
    Ping(NetworkArgs),
    /// Print the currency balance of a verifying key.
    Balance(BalanceArgs),
    /// Print a contract's source, methods, and variables.
    Contract(ContractArgs),
    /// Sign and submit a single transaction.
    Send(SendArgs),
    /// Submit every transaction in a JSON file through the batcher.
    Batch(BatchArgs),
    /// Print version information and exit.
    Version,
}

/// Which network to talk to.
#[derive(Args, Debug, Clone)]
pub struct NetworkArgs {
    /// Masternode URLs, comma separated. Each needs an http:// or https://
    /// scheme.
    #[arg(long, env = "LEDGERLINE_HOSTS", value_delimiter = ',', required = true)]
    pub hosts: Vec<String>,

    /// Network type: mainnet, testnet, or custom.
    #[arg(long, env = "LEDGERLINE_NETWORK", default_value = "custom")]
    pub network_type: String,

    /// Masternode API version (1 or 2).
    #[arg(long, default_value_t = 1)]
    pub api_version: u8,
}

/// Arguments for the `balance` subcommand.
#[derive(Args, Debug)]
pub struct BalanceArgs {
    #[command(flatten)]
    pub network: NetworkArgs,

    /// Hex-encoded verifying key to look up.
    pub vk: String,
}

/// Arguments for the `contract` subcommand.
#[derive(Args, Debug)]
pub struct ContractArgs {
    #[command(flatten)]
    pub network: NetworkArgs,

    /// Contract name.
    pub name: String,
}

/// Arguments for the `send` subcommand.
#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub network: NetworkArgs,

    /// Hex-encoded Ed25519 signing key of the sender.
    ///
    /// **Prefer the environment variable** over the flag so the key does
    /// not end up in shell history.
    #[arg(long, env = "LEDGERLINE_SK", hide_env_values = true)]
    pub sk: String,

    /// Contract to call.
    #[arg(long)]
    pub contract: String,

    /// Method on the contract.
    #[arg(long)]
    pub method: String,

    /// Keyword arguments as a JSON object.
    #[arg(long, default_value = "{}")]
    pub kwargs: String,

    /// Maximum stamps the transaction may consume.
    #[arg(long)]
    pub stamp_limit: u64,

    /// Optional tracking id echoed in events and output.
    #[arg(long)]
    pub uid: Option<String>,

    /// Return once the transaction is accepted instead of waiting for it
    /// to settle.
    #[arg(long)]
    pub no_wait: bool,
}

/// Arguments for the `batch` subcommand.
#[derive(Args, Debug)]
pub struct BatchArgs {
    #[command(flatten)]
    pub network: NetworkArgs,

    /// Hex-encoded signing keys, one per sender in the file, comma
    /// separated.
    #[arg(long = "sk", env = "LEDGERLINE_SK", value_delimiter = ',', hide_env_values = true)]
    pub keys: Vec<String>,

    /// JSON file holding an array of transactions (`senderVk`,
    /// `contractName`, `methodName`, `kwargs`, `stampLimit`, optional `uid`).
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    /// Poll every accepted transaction until it settles.
    #[arg(long)]
    pub wait: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        LedgerlineCli::command().debug_assert();
    }

    #[test]
    fn hosts_split_on_commas() {
        let cli = LedgerlineCli::try_parse_from([
            "ledgerline",
            "ping",
            "--hosts",
            "http://a.example,https://b.example",
        ])
        .unwrap();
        match cli.command {
            Commands::Ping(args) => assert_eq!(args.hosts.len(), 2),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn balance_takes_the_key_positionally() {
        let cli = LedgerlineCli::try_parse_from([
            "ledgerline",
            "balance",
            "--hosts",
            "http://a.example",
            "ab12",
        ])
        .unwrap();
        match cli.command {
            Commands::Balance(args) => assert_eq!(args.vk, "ab12"),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
