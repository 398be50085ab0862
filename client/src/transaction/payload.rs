//! Transaction intent and its signable payload.
//!
//! [`TxInfo`] is what a caller (or a batch file) describes; [`Payload`] is
//! the exact object that gets canonicalized and signed. Validation happens
//! once, in [`TxInfo::validate`], and every constructor that accepts a
//! `TxInfo` goes through it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::TransactionError;
use crate::codec::{canonicalize_serializable, CanonicalForm, CodecError};

/// A caller's description of one transaction.
///
/// Field names follow the service's JSON conventions so batch files can be
/// deserialized directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxInfo {
    /// Caller-chosen tracking id. Never sent to the network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub sender_vk: String,
    pub contract_name: String,
    pub method_name: String,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
    pub stamp_limit: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor: Option<String>,
}

impl TxInfo {
    pub fn new(
        sender_vk: impl Into<String>,
        contract_name: impl Into<String>,
        method_name: impl Into<String>,
        stamp_limit: u64,
    ) -> Self {
        Self {
            uid: None,
            sender_vk: sender_vk.into(),
            contract_name: contract_name.into(),
            method_name: method_name.into(),
            kwargs: Map::new(),
            stamp_limit,
            nonce: None,
            processor: None,
        }
    }

    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }

    pub fn kwargs(mut self, kwargs: Map<String, Value>) -> Self {
        self.kwargs = kwargs;
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn processor(mut self, processor: impl Into<String>) -> Self {
        self.processor = Some(processor.into());
        self
    }

    /// Checks the shape of the intent:
    ///
    /// - `sender_vk` is a non-empty hex string;
    /// - `contract_name` and `method_name` are non-empty;
    /// - `processor`, when given, is non-empty.
    ///
    /// Integer fields are enforced by their types.
    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.sender_vk.is_empty() || !self.sender_vk.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TransactionError::Validation(
                "sender public key required (hex string)".into(),
            ));
        }
        if self.contract_name.trim().is_empty() {
            return Err(TransactionError::Validation("contract name required".into()));
        }
        if self.method_name.trim().is_empty() {
            return Err(TransactionError::Validation("method name required".into()));
        }
        if matches!(self.processor.as_deref(), Some(p) if p.trim().is_empty()) {
            return Err(TransactionError::Validation(
                "processor must be a non-empty string".into(),
            ));
        }
        Ok(())
    }
}

/// The signable content of a transaction.
///
/// Absent `nonce`/`processor` are omitted from the rendering, not written
/// as `null`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Payload<'a> {
    pub contract: &'a str,
    pub function: &'a str,
    pub kwargs: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor: Option<&'a str>,
    pub sender: &'a str,
    pub stamps_supplied: u64,
}

impl<'a> Payload<'a> {
    /// Payload for `info`, including its current nonce assignment.
    pub fn new(info: &'a TxInfo) -> Self {
        Self {
            contract: &info.contract_name,
            function: &info.method_name,
            kwargs: &info.kwargs,
            nonce: info.nonce,
            processor: info.processor.as_deref(),
            sender: &info.sender_vk,
            stamps_supplied: info.stamp_limit,
        }
    }

    pub fn canonicalize(&self) -> Result<CanonicalForm, CodecError> {
        canonicalize_serializable(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VK: &str = "270add00fc708791c97aeb5255107c770434bd2ab71c2e103fbee75e202aa15e";

    fn transfer() -> TxInfo {
        TxInfo::new(VK, "currency", "transfer", 50_000)
            .kwarg("to", json!(VK))
            .kwarg("amount", json!(100))
    }

    #[test]
    fn valid_info_passes() {
        assert!(transfer().validate().is_ok());
    }

    #[test]
    fn sender_must_be_hex() {
        let mut info = transfer();
        info.sender_vk = "not-a-key".into();
        assert!(matches!(info.validate(), Err(TransactionError::Validation(_))));

        info.sender_vk = String::new();
        assert!(matches!(info.validate(), Err(TransactionError::Validation(_))));
    }

    #[test]
    fn contract_and_method_are_required() {
        let mut info = transfer();
        info.contract_name = " ".into();
        assert!(info.validate().is_err());

        let mut info = transfer();
        info.method_name = String::new();
        assert!(info.validate().is_err());
    }

    #[test]
    fn empty_processor_is_rejected() {
        assert!(transfer().processor("").validate().is_err());
        assert!(transfer().processor("p1").validate().is_ok());
    }

    #[test]
    fn payload_without_nonce_omits_the_fields() {
        let info = transfer();
        let form = Payload::new(&info).canonicalize().unwrap();
        let obj = form.ordered();
        assert!(!obj.contains_key("nonce"));
        assert!(!obj.contains_key("processor"));
        assert_eq!(obj["stamps_supplied"], json!(50_000));
    }

    #[test]
    fn payload_renders_sorted_fields() {
        let info = TxInfo::new("ab", "currency", "transfer", 10)
            .kwarg("amount", json!(1))
            .nonce(5)
            .processor("p1");
        let form = Payload::new(&info).canonicalize().unwrap();
        assert_eq!(
            form.as_str(),
            r#"{"contract":"currency","function":"transfer","kwargs":{"amount":1},"nonce":5,"processor":"p1","sender":"ab","stamps_supplied":10}"#
        );
    }

    #[test]
    fn kwargs_insertion_order_is_irrelevant() {
        let a = TxInfo::new("ab", "c", "m", 1)
            .kwarg("x", json!(1))
            .kwarg("y", json!({ "b": 2, "a": 1 }));
        let b = TxInfo::new("ab", "c", "m", 1)
            .kwarg("y", json!({ "a": 1, "b": 2 }))
            .kwarg("x", json!(1));
        let fa = Payload::new(&a).canonicalize().unwrap();
        let fb = Payload::new(&b).canonicalize().unwrap();
        assert_eq!(fa.bytes(), fb.bytes());
    }

    #[test]
    fn batch_file_entry_deserializes() {
        let info: TxInfo = serde_json::from_value(json!({
            "senderVk": VK,
            "contractName": "currency",
            "methodName": "transfer",
            "kwargs": { "to": VK, "amount": 5 },
            "stampLimit": 100,
            "uid": "tx-1"
        }))
        .unwrap();
        assert_eq!(info.uid.as_deref(), Some("tx-1"));
        assert_eq!(info.stamp_limit, 100);
        assert!(info.nonce.is_none());
    }
}
