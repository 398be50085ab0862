//! Read-only queries against ledger state: contract metadata, contract
//! variables, and currency balances.
//!
//! A contract or key that does not exist is `None` (or empty), not an
//! error. `Err` is reserved for the service being unreachable or answering
//! with something that is not JSON.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::transport::TransportError;
use crate::config::{BALANCES_VARIABLE, CURRENCY_CONTRACT};

/// A deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// One exported method of a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractMethod {
    pub name: String,
    /// Argument descriptors as the service reports them.
    #[serde(default)]
    pub arguments: Vec<Value>,
}

/// State declared by a contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractVariables {
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub hashes: Vec<String>,
}

#[async_trait]
pub trait StateReader: Send + Sync {
    /// Current value of `contract.variable`, or `contract.variable[key]`
    /// for hash variables.
    async fn get_variable(
        &self,
        contract: &str,
        variable: &str,
        key: Option<&str>,
    ) -> Result<Option<Value>, TransportError>;

    async fn get_contract_info(&self, contract: &str)
        -> Result<Option<ContractInfo>, TransportError>;

    async fn get_contract_methods(
        &self,
        contract: &str,
    ) -> Result<Vec<ContractMethod>, TransportError>;

    async fn get_contract_variables(
        &self,
        contract: &str,
    ) -> Result<ContractVariables, TransportError>;

    async fn contract_exists(&self, contract: &str) -> Result<bool, TransportError> {
        Ok(self.get_contract_info(contract).await?.is_some())
    }

    /// Currency balance of `vk` as a decimal string, `"0"` when unknown.
    async fn get_currency_balance(&self, vk: &str) -> Result<String, TransportError> {
        let value = self
            .get_variable(CURRENCY_CONTRACT, BALANCES_VARIABLE, Some(vk))
            .await?;
        Ok(balance_text(value.as_ref()))
    }
}

/// Renders a stored balance (`{"__fixed__": "1.5"}`, a number, or a
/// numeric string) as decimal text.
pub fn balance_text(value: Option<&Value>) -> String {
    let text = match value {
        Some(Value::Object(map)) => map.get("__fixed__").and_then(Value::as_str),
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Number(n)) => return n.to_string(),
        _ => None,
    };
    match text.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => "0".to_string(),
    }
}

/// Contract info from a `/contracts/{name}` body: present only when it
/// names the contract.
pub(super) fn contract_info_from(body: Value) -> Option<ContractInfo> {
    serde_json::from_value::<ContractInfo>(body)
        .ok()
        .filter(|info| !info.name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn balance_accepts_every_stored_shape() {
        assert_eq!(balance_text(Some(&json!({"__fixed__": "12.5"}))), "12.5");
        assert_eq!(balance_text(Some(&json!(300))), "300");
        assert_eq!(balance_text(Some(&json!("123456789"))), "123456789");
        assert_eq!(balance_text(Some(&json!(""))), "0");
        assert_eq!(balance_text(Some(&Value::Null)), "0");
        assert_eq!(balance_text(None), "0");
    }

    #[test]
    fn contract_info_requires_a_name() {
        let info = contract_info_from(json!({"name": "currency", "code": "def f(): pass"}));
        assert_eq!(info.unwrap().name, "currency");
        assert!(contract_info_from(json!({"error": "nope does not exist"})).is_none());
        assert!(contract_info_from(json!({"name": ""})).is_none());
    }

    #[test]
    fn method_arguments_default_to_empty() {
        let method: ContractMethod = serde_json::from_value(json!({"name": "seed"})).unwrap();
        assert!(method.arguments.is_empty());
    }
}
