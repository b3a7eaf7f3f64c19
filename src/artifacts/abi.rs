//! Contract ABI, kept as the raw JSON entries found in artifacts or returned by the node.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use starknet::core::types::ContractClass;

use crate::error::{HarnessError, Result};

/// ABI of a contract class.
///
/// Sierra ABIs nest functions under `interface` items; legacy ABIs list them at the top
/// level. Lookups handle both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractAbi(Vec<Value>);

impl ContractAbi {
    pub fn new(entries: Vec<Value>) -> Self {
        Self(entries)
    }

    /// Reads the ABI of an artifact. Flattened classes store it as a JSON string.
    pub fn from_artifact(class: &Value) -> Self {
        match class.get("abi") {
            Some(Value::Array(entries)) => Self(entries.clone()),
            Some(Value::String(raw)) => serde_json::from_str(raw).unwrap_or_default(),
            _ => Self::default(),
        }
    }

    /// Extracts the ABI from a class returned by `starknet_getClassAt`.
    pub fn from_contract_class(class: ContractClass) -> Result<Self> {
        match class {
            ContractClass::Sierra(sierra) => serde_json::from_str(&sierra.abi)
                .map_err(|e| HarnessError::rejected("getClassAt", format!("invalid ABI: {e}"))),
            ContractClass::Legacy(legacy) => {
                let entries = match legacy.abi {
                    Some(abi) => serde_json::to_value(abi)
                        .map_err(|e| HarnessError::rejected("getClassAt", e))?,
                    None => Value::Array(Vec::new()),
                };
                Ok(serde_json::from_value(entries).unwrap_or_default())
            }
        }
    }

    pub fn entries(&self) -> &[Value] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions().any(|function| entry_name(function) == Some(name))
    }

    /// Matches either the full event path or its last `::` segment.
    pub fn has_event(&self, name: &str) -> bool {
        self.0
            .iter()
            .filter(|entry| entry_type(entry) == Some("event"))
            .filter_map(entry_name)
            .any(|event| event == name || event.rsplit("::").next() == Some(name))
    }

    /// Function entries, including the ones declared inside interfaces.
    pub fn functions(&self) -> impl Iterator<Item = &Value> {
        self.0.iter().flat_map(|entry| match entry_type(entry) {
            Some("function" | "l1_handler" | "constructor") => vec![entry],
            Some("interface") => entry
                .get("items")
                .and_then(Value::as_array)
                .map(|items| items.iter().collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        })
    }
}

fn entry_type(entry: &Value) -> Option<&str> {
    entry.get("type").and_then(Value::as_str)
}

fn entry_name(entry: &Value) -> Option<&str> {
    entry.get("name").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sierra_abi() -> ContractAbi {
        ContractAbi::new(vec![
            json!({
                "type": "interface",
                "name": "openzeppelin::token::erc20::interface::IERC20",
                "items": [
                    { "type": "function", "name": "transfer", "inputs": [], "outputs": [] },
                    { "type": "function", "name": "balance_of", "inputs": [], "outputs": [] }
                ]
            }),
            json!({ "type": "constructor", "name": "constructor", "inputs": [] }),
            json!({
                "type": "event",
                "name": "openzeppelin::token::erc20::erc20::ERC20Component::Transfer",
                "kind": "struct",
                "members": []
            }),
        ])
    }

    #[test]
    fn test_functions_inside_interfaces() {
        let abi = sierra_abi();
        assert!(abi.has_function("transfer"));
        assert!(abi.has_function("balance_of"));
        assert!(abi.has_function("constructor"));
        assert!(!abi.has_function("approve"));
    }

    #[test]
    fn test_event_short_name() {
        let abi = sierra_abi();
        assert!(abi.has_event("Transfer"));
        assert!(abi.has_event("openzeppelin::token::erc20::erc20::ERC20Component::Transfer"));
        assert!(!abi.has_event("Approval"));
    }

    #[test]
    fn test_from_artifact_string_abi() {
        let class = json!({
            "abi": "[{\"type\":\"function\",\"name\":\"get_balance\",\"inputs\":[],\"outputs\":[]}]"
        });
        let abi = ContractAbi::from_artifact(&class);
        assert!(abi.has_function("get_balance"));
    }

    #[test]
    fn test_from_artifact_without_abi() {
        let abi = ContractAbi::from_artifact(&json!({ "program": {} }));
        assert!(abi.is_empty());
    }
}
