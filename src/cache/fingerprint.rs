//! Fast content fingerprint of artifact files.
//!
//! This is a change-detection key, not a security primitive. XXH3-128 is used because it
//! runs at memory bandwidth and its accidental collision rate is negligible for a build
//! directory worth of files.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::io::AsyncReadExt;
use xxhash_rust::xxh3::{xxh3_128, Xxh3};

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// 128-bit XXH3 digest of a file's bytes, rendered as 32 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u128);

impl Fingerprint {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(xxh3_128(bytes))
    }

    /// Reads a whole file and fingerprints the bytes as they arrive.
    ///
    /// The returned fingerprint always describes the returned bytes, even if the file is
    /// rewritten while it is being read or afterwards.
    pub async fn read_file(path: &Path) -> std::io::Result<(Vec<u8>, Self)> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut hasher = Xxh3::new();
        let mut bytes = Vec::new();
        let mut buf = vec![0u8; READ_CHUNK_SIZE];

        loop {
            let read = file.read(&mut buf).await?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
            bytes.extend_from_slice(&buf[..read]);
        }

        Ok((bytes, Self(hasher.digest128())))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid fingerprint '{0}'")]
pub struct InvalidFingerprint(String);

impl FromStr for Fingerprint {
    type Err = InvalidFingerprint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 32 {
            return Err(InvalidFingerprint(s.to_string()));
        }
        u128::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| InvalidFingerprint(s.to_string()))
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
