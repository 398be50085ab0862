//! Network description: which hosts to talk to and how.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{
    DEFAULT_CURRENCY_SYMBOL, DEFAULT_NETWORK_NAME, DEFAULT_NETWORK_VERSION,
    SUPPORTED_NETWORK_VERSIONS,
};

use super::transport::TransportError;

/// Kind of ledger network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Mainnet,
    Testnet,
    #[default]
    Custom,
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Testnet => write!(f, "testnet"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for NetworkType {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "custom" => Ok(Self::Custom),
            other => Err(TransportError::InvalidHost(format!(
                "unknown network type '{other}'"
            ))),
        }
    }
}

/// A validated network description.
///
/// Construction checks every host once; after that the hosts are known to
/// be lower-cased `http://` or `https://` URLs without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub network_type: NetworkType,
    hosts: Vec<String>,
    pub currency_symbol: String,
    pub version: u8,
}

impl NetworkInfo {
    /// Validates `hosts` and builds a network with default name, type,
    /// currency and API version.
    pub fn new<I, S>(hosts: I) -> Result<Self, TransportError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts = hosts
            .into_iter()
            .map(|h| validate_host(h.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        if hosts.is_empty() {
            return Err(TransportError::InvalidHost("at least one host is required".into()));
        }

        Ok(Self {
            name: DEFAULT_NETWORK_NAME.to_string(),
            network_type: NetworkType::default(),
            hosts,
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
            version: DEFAULT_NETWORK_VERSION,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_type(mut self, network_type: NetworkType) -> Self {
        self.network_type = network_type;
        self
    }

    pub fn with_currency_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.currency_symbol = symbol.into();
        self
    }

    /// Sets the API version. Unsupported versions fall back to the default.
    pub fn with_version(mut self, version: u8) -> Self {
        self.version = if SUPPORTED_NETWORK_VERSIONS.contains(&version) {
            version
        } else {
            DEFAULT_NETWORK_VERSION
        };
        self
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Picks one host uniformly at random.
    pub fn random_host(&self) -> &str {
        // `new` guarantees at least one host.
        self.hosts
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or_default()
    }
}

fn validate_host(host: &str) -> Result<String, TransportError> {
    let host = host.trim().to_lowercase();
    if !(host.starts_with("http://") || host.starts_with("https://")) {
        return Err(TransportError::InvalidHost(format!(
            "'{host}' must include http:// or https://"
        )));
    }
    Ok(host.trim_end_matches('/').to_string())
}
