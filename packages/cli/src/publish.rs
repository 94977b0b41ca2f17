use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use common::FilesConfig;
use tracing::info;

const HEADER: &str = "# model-files configuration.\n\
# Environment variables MODELFILES__<SECTION>__<KEY> override these values.\n\n";

#[derive(Debug, PartialEq, Eq)]
pub enum Publish {
    Written,
    AlreadyExists,
}

/// Write the default configuration to `path` as TOML.
pub fn publish_config(path: &Path, force: bool) -> Result<Publish> {
    if path.exists() && !force {
        return Ok(Publish::AlreadyExists);
    }

    let body = FilesConfig::default()
        .to_toml()
        .context("Failed to render default config")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, format!("{HEADER}{body}"))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), "Published config");
    Ok(Publish::Written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config/modelfiles.toml");

        assert_eq!(publish_config(&path, false).unwrap(), Publish::Written);

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# model-files configuration."));
        let parsed: FilesConfig = toml::from_str(&written).unwrap();
        assert_eq!(parsed, FilesConfig::default());
    }

    #[test]
    fn keeps_existing_file_unless_forced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modelfiles.toml");
        fs::write(&path, "storage_disk = \"s3\"\n").unwrap();

        assert_eq!(publish_config(&path, false).unwrap(), Publish::AlreadyExists);
        assert_eq!(fs::read_to_string(&path).unwrap(), "storage_disk = \"s3\"\n");

        assert_eq!(publish_config(&path, true).unwrap(), Publish::Written);
        assert!(fs::read_to_string(&path).unwrap().contains("storage_disk = \"public\""));
    }
}
