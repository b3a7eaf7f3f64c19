//! Class identity extraction.
//!
//! Computing a class hash walks the whole Sierra program (and the CASM bytecode for the
//! compiled class hash), which is why results are memoized by file fingerprint.

use serde::{Deserialize, Serialize};
use starknet::core::types::contract::legacy::LegacyContractClass;
use starknet::core::types::contract::{CompiledClass, SierraClass};
use starknet::core::types::Felt;

use super::{ClassKind, ContractArtifact};
use crate::error::{HarnessError, Result};

/// On-chain identity of a class.
///
/// `compiled_class_hash` is only present for Sierra classes shipped with their CASM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassIdentity {
    pub class_hash: Felt,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiled_class_hash: Option<Felt>,
}

impl ClassIdentity {
    pub fn new(class_hash: Felt, compiled_class_hash: Option<Felt>) -> Self {
        Self {
            class_hash,
            compiled_class_hash,
        }
    }
}

/// Derives a [`ClassIdentity`] from artifact contents.
///
/// Implementations must be deterministic: the same artifact always yields the same identity.
pub trait ClassIdentityExtractor: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn extract(&self, artifact: &ContractArtifact) -> Result<ClassIdentity>;
}

/// Extractor backed by the starknet-rs class hash implementations.
#[derive(Debug, Clone, Copy, Default)]
pub struct StarknetClassHasher;

impl ClassIdentityExtractor for StarknetClassHasher {
    fn name(&self) -> &str {
        "starknet"
    }

    fn extract(&self, artifact: &ContractArtifact) -> Result<ClassIdentity> {
        match artifact.kind() {
            ClassKind::Sierra => {
                let class: SierraClass = artifact.parse_class()?;
                let class_hash = class
                    .class_hash()
                    .map_err(|e| HarnessError::ClassHash(e.to_string()))?;

                let compiled_class_hash = match artifact.parse_compiled_class::<CompiledClass>()? {
                    Some(compiled) => Some(
                        compiled
                            .class_hash()
                            .map_err(|e| HarnessError::ClassHash(e.to_string()))?,
                    ),
                    None => None,
                };

                Ok(ClassIdentity::new(class_hash, compiled_class_hash))
            }
            ClassKind::Legacy => {
                let class: LegacyContractClass = artifact.parse_class()?;
                let class_hash = class
                    .class_hash()
                    .map_err(|e| HarnessError::ClassHash(e.to_string()))?;
                Ok(ClassIdentity::new(class_hash, None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_sierra() -> serde_json::Value {
        json!({
            "sierra_program": ["0x1", "0x2", "0x3"],
            "sierra_program_debug_info": {
                "type_names": [],
                "libfunc_names": [],
                "user_func_names": []
            },
            "contract_class_version": "0.1.0",
            "entry_points_by_type": {
                "EXTERNAL": [],
                "L1_HANDLER": [],
                "CONSTRUCTOR": []
            },
            "abi": []
        })
    }

    #[test]
    fn test_identity_json_layout() {
        let identity = ClassIdentity::new(Felt::from(0xa_u64), Some(Felt::from(0xb_u64)));
        let value = serde_json::to_value(identity).unwrap();
        assert_eq!(value, json!({ "classHash": "0xa", "compiledClassHash": "0xb" }));

        let legacy = ClassIdentity::new(Felt::from(0xa_u64), None);
        let value = serde_json::to_value(legacy).unwrap();
        assert_eq!(value, json!({ "classHash": "0xa" }));
        let parsed: ClassIdentity = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, legacy);
    }

    #[test]
    fn test_sierra_hash_is_deterministic() {
        let artifact = ContractArtifact::from_parts("Minimal.contract_class.json", minimal_sierra(), None);

        let first = StarknetClassHasher.extract(&artifact).unwrap();
        let second = StarknetClassHasher.extract(&artifact).unwrap();

        assert_eq!(first, second);
        assert_ne!(first.class_hash, Felt::ZERO);
        assert_eq!(first.compiled_class_hash, None);
    }

    #[test]
    fn test_program_change_changes_hash() {
        let mut changed = minimal_sierra();
        changed["sierra_program"] = json!(["0x1", "0x2", "0x4"]);

        let a = ContractArtifact::from_parts("A.contract_class.json", minimal_sierra(), None);
        let b = ContractArtifact::from_parts("B.contract_class.json", changed, None);

        assert_ne!(
            StarknetClassHasher.extract(&a).unwrap().class_hash,
            StarknetClassHasher.extract(&b).unwrap().class_hash
        );
    }

    #[test]
    fn test_invalid_sierra_is_a_parse_error() {
        let artifact = ContractArtifact::from_parts(
            "Broken.contract_class.json",
            json!({ "sierra_program": "not-a-list" }),
            None,
        );
        let err = StarknetClassHasher.extract(&artifact).unwrap_err();
        assert!(matches!(err, HarnessError::ArtifactParse { .. }));
    }
}
