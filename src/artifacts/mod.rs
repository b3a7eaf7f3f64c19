//! Compiled contract artifacts: lookup, loading and class identity.

pub mod abi;
pub mod identity;
pub mod resolver;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::Fingerprint;
use crate::error::{HarnessError, Result};

pub use abi::ContractAbi;
pub use identity::{ClassIdentity, ClassIdentityExtractor, StarknetClassHasher};
pub use resolver::{
    compiled_class_path, find_bundle, resolve_contract_file, COMPILED_CLASS_SUFFIX,
    CONTRACT_CLASS_SUFFIX,
};

/// Class format of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// Cairo 1 class, declared together with its CASM.
    Sierra,
    /// Cairo 0 class.
    Legacy,
}

/// A class artifact read from disk, with its optional CASM companion.
///
/// Artifacts are read fresh for every declaration attempt and never cached themselves. The
/// fingerprint is taken from the same bytes the class was parsed from.
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    path: PathBuf,
    fingerprint: Fingerprint,
    class: Value,
    compiled_class: Option<Value>,
    abi: Arc<ContractAbi>,
}

impl ContractArtifact {
    /// Reads the class at `path` and the CASM next to it, if any.
    pub async fn load(path: &Path) -> Result<Self> {
        let (bytes, fingerprint) = read_bytes(path).await?;
        let class = parse_json(path, &bytes)?;

        let casm_path = compiled_class_path(path);
        let compiled_class = if tokio::fs::try_exists(&casm_path).await.unwrap_or(false) {
            let (bytes, _) = read_bytes(&casm_path).await?;
            Some(parse_json(&casm_path, &bytes)?)
        } else {
            None
        };

        Ok(Self::with_fingerprint(path, fingerprint, class, compiled_class))
    }

    /// Builds an artifact from in-memory JSON, fingerprinting its serialized form.
    pub fn from_parts(path: impl Into<PathBuf>, class: Value, compiled_class: Option<Value>) -> Self {
        let fingerprint = Fingerprint::of_bytes(class.to_string().as_bytes());
        Self::with_fingerprint(path, fingerprint, class, compiled_class)
    }

    fn with_fingerprint(
        path: impl Into<PathBuf>,
        fingerprint: Fingerprint,
        class: Value,
        compiled_class: Option<Value>,
    ) -> Self {
        let abi = Arc::new(ContractAbi::from_artifact(&class));
        Self {
            path: path.into(),
            fingerprint,
            class,
            compiled_class,
            abi,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn class(&self) -> &Value {
        &self.class
    }

    pub fn compiled_class(&self) -> Option<&Value> {
        self.compiled_class.as_ref()
    }

    pub fn abi(&self) -> Arc<ContractAbi> {
        self.abi.clone()
    }

    pub fn kind(&self) -> ClassKind {
        if self.class.get("sierra_program").is_some() {
            ClassKind::Sierra
        } else {
            ClassKind::Legacy
        }
    }

    /// Deserializes the class into one of the typed starknet-rs representations.
    pub fn parse_class<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.class.clone()).map_err(|source| HarnessError::ArtifactParse {
            path: self.path.clone(),
            source,
        })
    }

    pub fn parse_compiled_class<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.compiled_class
            .as_ref()
            .map(|casm| {
                serde_json::from_value(casm.clone()).map_err(|source| HarnessError::ArtifactParse {
                    path: compiled_class_path(&self.path),
                    source,
                })
            })
            .transpose()
    }
}

async fn read_bytes(path: &Path) -> Result<(Vec<u8>, Fingerprint)> {
    Fingerprint::read_file(path)
        .await
        .map_err(|source| HarnessError::ArtifactRead {
            path: path.to_path_buf(),
            source,
        })
}

fn parse_json(path: &Path, bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes).map_err(|source| HarnessError::ArtifactParse {
        path: path.to_path_buf(),
        source,
    })
}
