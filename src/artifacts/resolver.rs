//! Locates compiled contract artifacts on disk.
//!
//! Build tools name artifacts `<Name>.contract_class.json`, optionally prefixed with the
//! package name (`argent_<Name>.contract_class.json`). Versioned artifact bundles keep one
//! subfolder per release (`account-0.4.0/ArgentAccount.contract_class.json`).

use std::path::{Path, PathBuf};

use crate::error::{HarnessError, Result};

/// Suffix of the Sierra (or legacy) class artifact.
pub const CONTRACT_CLASS_SUFFIX: &str = ".contract_class.json";

/// Suffix of the CASM artifact paired with a Sierra class.
pub const COMPILED_CLASS_SUFFIX: &str = ".compiled_contract_class.json";

/// Resolves the class artifact of `contract_name` inside `folder`.
///
/// The exact `folder/<name>.contract_class.json` path wins. Otherwise the folder's direct
/// entries are scanned in name order and the first file ending in
/// `<name>.contract_class.json` is returned. Several prefixed candidates are not an error:
/// the first one wins. Both lookups follow symlinks.
pub async fn resolve_contract_file(contract_name: &str, folder: &Path) -> Result<PathBuf> {
    let target = format!("{contract_name}{CONTRACT_CLASS_SUFFIX}");

    // Bundle names look like "/account-0.4.0/ArgentAccount"; a leading slash would make
    // `join` discard the folder.
    let direct_path = folder.join(target.trim_start_matches('/'));
    if is_file(&direct_path).await {
        tracing::debug!(
            target: "starknet_harness::artifacts",
            "Resolved {} to {}",
            contract_name,
            direct_path.display()
        );
        return Ok(direct_path);
    }

    let not_found = || HarnessError::ArtifactNotFound {
        target: target.clone(),
        folder: folder.to_path_buf(),
    };

    let mut entries = tokio::fs::read_dir(folder).await.map_err(|_| not_found())?;
    let mut candidates = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if entry.file_name().to_string_lossy().ends_with(&target) && is_file(&path).await {
            candidates.push(path);
        }
    }
    candidates.sort();

    let path = candidates.into_iter().next().ok_or_else(not_found)?;
    tracing::debug!(
        target: "starknet_harness::artifacts",
        "Resolved {} to prefixed artifact {}",
        contract_name,
        path.display()
    );
    Ok(path)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}

/// Path of the CASM companion of a class artifact. The file may not exist.
pub fn compiled_class_path(contract_class_path: &Path) -> PathBuf {
    let file_name = contract_class_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    match file_name.strip_suffix(CONTRACT_CLASS_SUFFIX) {
        Some(stem) => contract_class_path.with_file_name(format!("{stem}{COMPILED_CLASS_SUFFIX}")),
        None => contract_class_path.with_extension("casm.json"),
    }
}

/// Finds the first subfolder of `folder` (in name order) whose name starts with `prefix`.
pub async fn find_bundle(folder: &Path, prefix: &str) -> Result<String> {
    let not_found = || HarnessError::ArtifactBundleNotFound {
        prefix: prefix.to_string(),
        folder: folder.to_path_buf(),
    };

    let mut entries = tokio::fs::read_dir(folder).await.map_err(|_| not_found())?;
    let mut bundles = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(prefix) {
            continue;
        }
        let is_dir = tokio::fs::metadata(entry.path())
            .await
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false);
        if is_dir {
            bundles.push(name);
        }
    }
    bundles.sort();

    bundles.into_iter().next().ok_or_else(not_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "{}").unwrap();
    }

    #[tokio::test]
    async fn test_direct_match() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Foo.contract_class.json"));

        let path = resolve_contract_file("Foo", dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("Foo.contract_class.json"));
    }

    #[tokio::test]
    async fn test_prefixed_fallback() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("prefix_Foo.contract_class.json"));
        touch(&dir.path().join("prefix_Bar.contract_class.json"));

        let path = resolve_contract_file("Foo", dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("prefix_Foo.contract_class.json"));
    }

    #[tokio::test]
    async fn test_direct_match_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Foo.contract_class.json"));
        touch(&dir.path().join("other_Foo.contract_class.json"));

        let path = resolve_contract_file("Foo", dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("Foo.contract_class.json"));
    }

    #[tokio::test]
    async fn test_first_prefixed_match_wins() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b_Foo.contract_class.json"));
        touch(&dir.path().join("a_Foo.contract_class.json"));

        let path = resolve_contract_file("Foo", dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("a_Foo.contract_class.json"));
    }

    #[tokio::test]
    async fn test_casm_file_is_not_a_candidate() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Foo.compiled_contract_class.json"));

        let err = resolve_contract_file("Foo", dir.path()).await.unwrap_err();
        assert!(matches!(err, HarnessError::ArtifactNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_contract_file("Foo", &dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, HarnessError::ArtifactNotFound { .. }));
    }

    #[tokio::test]
    async fn test_bundle_subfolder() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("account-0.4.0/ArgentAccount.contract_class.json"));

        let bundle = find_bundle(dir.path(), "account-0.4").await.unwrap();
        assert_eq!(bundle, "account-0.4.0");

        let name = format!("/{bundle}/ArgentAccount");
        let path = resolve_contract_file(&name, dir.path()).await.unwrap();
        assert_eq!(
            path,
            dir.path().join("account-0.4.0/ArgentAccount.contract_class.json")
        );
    }

    #[tokio::test]
    async fn test_bundle_not_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("multisig-0.2.0")).unwrap();

        let err = find_bundle(dir.path(), "account-").await.unwrap_err();
        assert!(matches!(err, HarnessError::ArtifactBundleNotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_artifacts_resolve() {
        use std::os::unix::fs::symlink;

        let build = tempfile::tempdir().unwrap();
        touch(&build.path().join("Foo.contract_class.json"));
        touch(&build.path().join("account-0.4.0/ArgentAccount.contract_class.json"));

        let dir = tempfile::tempdir().unwrap();
        symlink(
            build.path().join("Foo.contract_class.json"),
            dir.path().join("prefix_Foo.contract_class.json"),
        )
        .unwrap();
        symlink(build.path().join("account-0.4.0"), dir.path().join("account-0.4.0")).unwrap();

        // A prefixed link is found by the scan, like a direct link would be.
        let path = resolve_contract_file("Foo", dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("prefix_Foo.contract_class.json"));

        let bundle = find_bundle(dir.path(), "account-").await.unwrap();
        assert_eq!(bundle, "account-0.4.0");
    }

    #[test]
    fn test_compiled_class_path() {
        let path = Path::new("/tmp/out/argent_Foo.contract_class.json");
        assert_eq!(
            compiled_class_path(path),
            Path::new("/tmp/out/argent_Foo.compiled_contract_class.json")
        );
    }
}
