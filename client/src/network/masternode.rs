//! # Masternode HTTP Client
//!
//! The production [`Transport`]: plain JSON over HTTP against the
//! masternode REST API.
//!
//! | Operation            | Request                       |
//! |----------------------|-------------------------------|
//! | `get_nonce`          | `GET  {host}/nonce/{sender}`  |
//! | `send_transaction`   | `POST {host}/`                |
//! | `check_transaction`  | `GET  {host}/tx?hash={hash}`  |
//! | `ping`               | `GET  {host}/ping`            |
//!
//! State reads ([`StateReader`]) go to the same hosts:
//!
//! | Operation                | Request                                      |
//! |--------------------------|----------------------------------------------|
//! | `get_contract_info`      | `GET {host}/contracts/{contract}`            |
//! | `get_variable`           | `GET {host}/contracts/{contract}/{var}/?key=` |
//! | `get_contract_methods`   | `GET {host}/contracts/{contract}/methods`    |
//! | `get_contract_variables` | `GET {host}/contracts/{contract}/variables`  |
//!
//! Every call picks a random host from the [`NetworkInfo`], except a
//! submission pinned to the node that issued the nonce.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::info::NetworkInfo;
use super::reader::{
    contract_info_from, ContractInfo, ContractMethod, ContractVariables, StateReader,
};
use super::transport::{NonceResponse, Transport, TransportError, TxResponse, WireTransaction};

/// HTTP transport bound to one ledger network.
#[derive(Debug, Clone)]
pub struct MasternodeClient {
    network: NetworkInfo,
    client: Client,
}

impl MasternodeClient {
    pub fn new(network: NetworkInfo) -> Self {
        Self::with_client(network, Client::new())
    }

    /// Uses a caller-configured `reqwest` client (timeouts, proxies, ...).
    pub fn with_client(network: NetworkInfo, client: Client) -> Self {
        Self { network, client }
    }

    pub fn network(&self) -> &NetworkInfo {
        &self.network
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, TransportError> {
        debug!(%url, "GET");
        let response = self.client.get(url).send().await.map_err(http_error)?;
        decode(response).await
    }

    /// GET for state reads: a 404 means the thing does not exist.
    async fn read_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<Value>, TransportError> {
        let url = format!("{}{path}", self.network.random_host());
        debug!(%url, "GET state");
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(http_error)?;
        match decode::<Value>(response).await {
            Ok(body) => Ok(Some(body)),
            Err(TransportError::Status { code: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Transport for MasternodeClient {
    async fn get_nonce(&self, sender: &str) -> Result<NonceResponse, TransportError> {
        let host = self.network.random_host().to_string();
        let url = format!("{host}/nonce/{sender}");
        let mut response: NonceResponse = self.get_json(&url).await?;
        response.masternode = Some(host);
        Ok(response)
    }

    async fn send_transaction(
        &self,
        tx: &WireTransaction,
        host: Option<&str>,
    ) -> Result<TxResponse, TransportError> {
        let host = host.unwrap_or_else(|| self.network.random_host());
        let url = format!("{}/", host.trim_end_matches('/'));
        debug!(%url, "POST transaction");
        let response = self
            .client
            .post(&url)
            .json(tx)
            .send()
            .await
            .map_err(http_error)?;
        decode(response).await
    }

    async fn check_transaction(&self, hash: &str) -> Result<TxResponse, TransportError> {
        let url = format!("{}/tx?hash={hash}", self.network.random_host());
        self.get_json(&url).await
    }

    async fn ping(&self) -> bool {
        let url = format!("{}/ping", self.network.random_host());
        match self.get_json::<Value>(&url).await {
            Ok(body) => body.get("status").is_some_and(is_truthy),
            Err(e) => {
                warn!(%url, error = %e, "ping failed");
                false
            }
        }
    }
}

#[async_trait]
impl StateReader for MasternodeClient {
    async fn get_variable(
        &self,
        contract: &str,
        variable: &str,
        key: Option<&str>,
    ) -> Result<Option<Value>, TransportError> {
        let path = format!("/contracts/{contract}/{variable}/");
        let query: Vec<(&str, &str)> = key.map(|k| ("key", k)).into_iter().collect();
        let body = self.read_json(&path, &query).await?;
        Ok(body
            .and_then(|mut b| b.get_mut("value").map(Value::take))
            .filter(|v| !v.is_null()))
    }

    async fn get_contract_info(
        &self,
        contract: &str,
    ) -> Result<Option<ContractInfo>, TransportError> {
        let body = self.read_json(&format!("/contracts/{contract}"), &[]).await?;
        Ok(body.and_then(contract_info_from))
    }

    async fn get_contract_methods(
        &self,
        contract: &str,
    ) -> Result<Vec<ContractMethod>, TransportError> {
        let body = self
            .read_json(&format!("/contracts/{contract}/methods"), &[])
            .await?;
        match body.and_then(|mut b| b.get_mut("methods").map(Value::take)) {
            Some(methods) => {
                serde_json::from_value(methods).map_err(|e| TransportError::Decode(e.to_string()))
            }
            None => Ok(Vec::new()),
        }
    }

    async fn get_contract_variables(
        &self,
        contract: &str,
    ) -> Result<ContractVariables, TransportError> {
        let body = self
            .read_json(&format!("/contracts/{contract}/variables"), &[])
            .await?;
        match body {
            Some(b) if b.get("variables").is_some() => {
                serde_json::from_value(b).map_err(|e| TransportError::Decode(e.to_string()))
            }
            _ => Ok(ContractVariables::default()),
        }
    }
}

fn http_error(e: reqwest::Error) -> TransportError {
    TransportError::Http(e.to_string())
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let status = response.status();
    let body = response.text().await.map_err(http_error)?;
    decode_body(status, &body)
}

/// Decodes a response body.
///
/// A bare JSON string is the service's way of reporting an error and
/// becomes `{"error": <string>}`. A non-success status still yields `T`
/// when the body carries an `error` field: the masternode reports
/// application errors that way, sometimes with a 4xx code.
fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, TransportError> {
    let value = match serde_json::from_str::<Value>(body) {
        Ok(Value::String(message)) => Some(json!({ "error": message })),
        Ok(value) => Some(value),
        Err(e) if status.is_success() => return Err(TransportError::Decode(e.to_string())),
        Err(_) => None,
    };

    match value {
        Some(value) if status.is_success() || value.get("error").is_some() => {
            serde_json::from_value(value).map_err(|e| TransportError::Decode(e.to_string()))
        }
        _ => Err(TransportError::Status {
            code: status.as_u16(),
            reason: status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string()),
        }),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
