//! Caches that let a long test suite avoid recomputing class hashes and refetching ABIs.

pub mod abi;
pub mod class_hashes;
pub mod fingerprint;

pub use abi::AbiCache;
pub use class_hashes::ClassHashCache;
pub use fingerprint::Fingerprint;
