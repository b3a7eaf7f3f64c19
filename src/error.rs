use std::path::PathBuf;

use starknet::core::types::Felt;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("No file matching \"*{target}\" found in {}", folder.display())]
    ArtifactNotFound { target: String, folder: PathBuf },
    #[error("No artifact bundle starting with '{prefix}' found in {}", folder.display())]
    ArtifactBundleNotFound { prefix: String, folder: PathBuf },
    #[error("Failed to read artifact {}: {source}", path.display())]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid artifact {}: {source}", path.display())]
    ArtifactParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to compute class hash: {0}")]
    ClassHash(String),
    #[error("Class hash cache error at {}: {reason}", path.display())]
    CacheIo { path: PathBuf, reason: String },
    #[error("{operation} rejected by ledger: {reason}")]
    LedgerRejected {
        operation: &'static str,
        reason: String,
    },
    #[error("Transaction {transaction_hash:#x} reverted: {reason}")]
    TransactionReverted { transaction_hash: Felt, reason: String },
    #[error("Transaction {transaction_hash:#x} not accepted after {attempts} attempt(s): {reason}")]
    FinalityTimeout {
        transaction_hash: Felt,
        attempts: u32,
        reason: String,
    },
    #[error("Class {0:#x} is not declared and its artifact has no compiled class")]
    MissingCompiledClass(Felt),
    #[error("Class {0:#x} uses a format that can no longer be declared")]
    UnsupportedClass(Felt),
    #[error("Contract {address:#x} has no function '{function}'")]
    UnknownFunction { function: String, address: Felt },
    #[error("Unexpected {function} result from {address:#x}: {result:?}")]
    UnexpectedResult {
        function: &'static str,
        address: Felt,
        result: Vec<Felt>,
    },
    #[error("Devnet RPC error: {0}")]
    Devnet(String),
    #[error("{0} requires a devnet")]
    NotDevnet(&'static str),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl HarnessError {
    pub(crate) fn rejected(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::LedgerRejected {
            operation,
            reason: err.to_string(),
        }
    }

    pub(crate) fn cache_io(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::CacheIo {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}
