//! Human-readable classification of service responses.
//!
//! Pure functions: no I/O, no clock. The record caches whatever these
//! return.

use serde_json::Value;

use super::types::{ResultInfo, ResultKind};
use crate::network::TxResponse;

/// Summary for a transaction the service accepted and is processing.
pub fn pending(hash: &str) -> ResultInfo {
    ResultInfo {
        title: "Transaction Pending".into(),
        subtitle: "Your transaction was submitted and is being processed".into(),
        message: format!("Tx Hash: {hash}"),
        kind: ResultKind::Success,
        error_info: None,
        return_result: None,
        stamps_used: None,
        status_code: None,
    }
}

/// Classifies a settlement result (or an error-only response).
///
/// A non-empty `errors` list marks the result as failed. When it is failed
/// and the return value mentions an `AssertionError`, that value is added
/// to the reported errors.
pub fn classify(result: &TxResponse) -> ResultInfo {
    let stamps = result.stamps_used.unwrap_or(0);
    let status_code = result.status;
    let errors = result.error_list();
    let errored = !errors.is_empty();

    let mut message = String::new();
    let mut error_info = None;
    if errored {
        message = format!("This transaction returned {} errors.", errors.len());
        let mut reported = errors.to_vec();
        if let Some(assertion) = assertion_text(result.result.as_ref()) {
            reported.push(assertion.to_string());
        }
        error_info = Some(reported);
    }

    let subtitle = match (errored, status_code) {
        (false, _) => format!("Your transaction used {stamps} stamps"),
        (true, Some(code)) if code != 0 => {
            format!("Your transaction returned status code {code} and used {stamps} stamps")
        }
        (true, _) => format!("Your transaction returned an error and used {stamps} stamps"),
    };

    ResultInfo {
        title: format!("Transaction {}", if errored { "Failed" } else { "Successful" }),
        subtitle,
        message,
        kind: if errored {
            ResultKind::Error
        } else {
            ResultKind::Success
        },
        error_info,
        return_result: Some(
            result
                .result
                .clone()
                .filter(|v| !v.is_null())
                .unwrap_or_else(|| Value::String(String::new())),
        ),
        stamps_used: Some(stamps),
        status_code,
    }
}

fn assertion_text(result: Option<&Value>) -> Option<&str> {
    result
        .and_then(Value::as_str)
        .filter(|text| text.contains("AssertionError"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: Value) -> TxResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn pending_summary() {
        let info = pending("h1");
        assert_eq!(info.title, "Transaction Pending");
        assert_eq!(info.message, "Tx Hash: h1");
        assert_eq!(info.kind, ResultKind::Success);
    }

    #[test]
    fn successful_settlement() {
        let info = classify(&response(json!({ "status": 0, "stamps_used": 230 })));
        assert_eq!(info.title, "Transaction Successful");
        assert_eq!(info.subtitle, "Your transaction used 230 stamps");
        assert_eq!(info.stamps_used, Some(230));
        assert_eq!(info.status_code, Some(0));
        assert_eq!(info.return_result, Some(json!("")));
        assert!(info.error_info.is_none());
        assert!(info.message.is_empty());
    }

    #[test]
    fn failed_settlement_with_status_code() {
        let info = classify(&response(json!({
            "status": 1,
            "stamps_used": 12,
            "errors": ["This transaction returned a non-zero status code"],
            "result": "AssertionError('Not enough coins to send.')"
        })));
        assert_eq!(info.title, "Transaction Failed");
        assert_eq!(
            info.subtitle,
            "Your transaction returned status code 1 and used 12 stamps"
        );
        assert_eq!(info.message, "This transaction returned 1 errors.");
        assert_eq!(info.kind, ResultKind::Error);
        let errors = info.error_info.unwrap();
        assert_eq!(errors.len(), 2);
        assert!(errors[1].contains("AssertionError"));
    }

    #[test]
    fn error_without_status_reads_as_generic_error() {
        let info = classify(&response(json!({ "errors": ["Unable to get nonce"] })));
        assert_eq!(
            info.subtitle,
            "Your transaction returned an error and used 0 stamps"
        );
        assert_eq!(info.stamps_used, Some(0));
        assert_eq!(info.status_code, None);
    }

    #[test]
    fn assertion_is_ignored_when_not_errored() {
        let info = classify(&response(json!({
            "status": 0,
            "result": "AssertionError('ignored')"
        })));
        assert_eq!(info.title, "Transaction Successful");
        assert!(info.error_info.is_none());
    }

    #[test]
    fn classification_is_pure() {
        let res = response(json!({ "status": 2, "errors": ["x"] }));
        assert_eq!(classify(&res), classify(&res));
    }
}
