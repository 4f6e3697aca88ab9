//! Reading the release version from the package manifest.

use std::path::Path;

use crate::error::ReleaseError;

/// Return `package.version` from the TOML manifest at `path`.
pub fn read_version(path: &Path) -> Result<String, ReleaseError> {
    let fail = |reason: String| ReleaseError::Manifest {
        path: path.to_path_buf(),
        reason,
    };

    let contents = std::fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
    let doc: toml::Table = toml::from_str(&contents).map_err(|e| fail(e.message().to_string()))?;

    let package = doc
        .get("package")
        .and_then(toml::Value::as_table)
        .ok_or_else(|| fail("missing [package] table".to_string()))?;

    match package.get("version") {
        Some(toml::Value::String(v)) => Ok(v.clone()),
        Some(_) => Err(fail("package.version is not a string".to_string())),
        None => Err(fail("missing package.version".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(contents: &str) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Cargo.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    fn reason(err: ReleaseError) -> String {
        match err {
            ReleaseError::Manifest { reason, .. } => reason,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_reads_package_version() {
        let (_dir, path) = write_manifest(
            "[package]\nname = \"nix-installer\"\nversion = \"1.4.0\"\n\n[dependencies]\nserde = \"1\"\n",
        );
        assert_eq!(read_version(&path).unwrap(), "1.4.0");
    }

    #[test]
    fn test_version_is_returned_verbatim() {
        let (_dir, path) = write_manifest("[package]\nname = \"x\"\nversion = \" 2.0.0-rc1 \"\n");
        assert_eq!(read_version(&path).unwrap(), " 2.0.0-rc1 ");
    }

    #[test]
    fn test_missing_file_is_manifest_error() {
        let dir = TempDir::new().unwrap();
        let err = read_version(&dir.path().join("Cargo.toml")).unwrap_err();
        assert!(matches!(err, ReleaseError::Manifest { .. }));
    }

    #[test]
    fn test_missing_package_table() {
        let (_dir, path) = write_manifest("[workspace]\nmembers = []\n");
        assert_eq!(reason(read_version(&path).unwrap_err()), "missing [package] table");
    }

    #[test]
    fn test_missing_version_field() {
        let (_dir, path) = write_manifest("[package]\nname = \"x\"\n");
        assert_eq!(reason(read_version(&path).unwrap_err()), "missing package.version");
    }

    #[test]
    fn test_workspace_inherited_version_is_rejected() {
        let (_dir, path) = write_manifest("[package]\nname = \"x\"\nversion.workspace = true\n");
        assert_eq!(
            reason(read_version(&path).unwrap_err()),
            "package.version is not a string"
        );
    }

    #[test]
    fn test_malformed_toml() {
        let (_dir, path) = write_manifest("[package\nversion = 1");
        assert!(matches!(
            read_version(&path).unwrap_err(),
            ReleaseError::Manifest { .. }
        ));
    }
}
