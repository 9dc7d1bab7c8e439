//! File-backed management store
//!
//! The whole [`StoreSnapshot`] lives in one JSON or YAML file, chosen by
//! extension. Saving writes a sibling temporary file and renames it over the
//! original, so a crash never leaves a half-written store.

use anyhow::{Context, Result};
use sitecfg_core::StoreSnapshot;
use std::io::Write;
use std::path::{Path, PathBuf};

/// On-disk encoding of a store file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFormat {
    Json,
    Yaml,
}

impl StoreFormat {
    /// `.yaml` and `.yml` are YAML; everything else is JSON
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Json,
        }
    }
}

/// A store snapshot file
#[derive(Debug, Clone)]
pub struct StoreFile {
    path: PathBuf,
    format: StoreFormat,
}

impl StoreFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = StoreFormat::from_path(&path);
        Self { path, format }
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> StoreFormat {
        self.format
    }

    /// Read and decode the snapshot
    ///
    /// # Errors
    /// Fails if the file cannot be read or does not decode.
    pub fn load(&self) -> Result<StoreSnapshot> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading store {}", self.path.display()))?;
        let snapshot = match self.format {
            StoreFormat::Json => serde_json::from_str(&text)
                .with_context(|| format!("decoding JSON store {}", self.path.display()))?,
            StoreFormat::Yaml => serde_yaml::from_str(&text)
                .with_context(|| format!("decoding YAML store {}", self.path.display()))?,
        };
        Ok(snapshot)
    }

    /// Encode and replace the snapshot
    ///
    /// # Errors
    /// Fails if encoding, writing or the final rename fails; the previous
    /// file is then left in place.
    pub fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        let text = match self.format {
            StoreFormat::Json => serde_json::to_string_pretty(snapshot)?,
            StoreFormat::Yaml => serde_yaml::to_string(snapshot)?,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temporary file in {}", dir.display()))?;
        tmp.write_all(text.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path)
            .with_context(|| format!("replacing store {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), "store saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitecfg_model::{Partition, Site, SiteConfig};

    fn snapshot() -> StoreSnapshot {
        StoreSnapshot::new()
            .with_webspace(Partition::new("eastuswebspace").with_geo("BLU", "East US"))
            .with_site(Site::new("clitsts1", "eastuswebspace"), SiteConfig::default())
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(StoreFormat::from_path(Path::new("s.yaml")), StoreFormat::Yaml);
        assert_eq!(StoreFormat::from_path(Path::new("s.YML")), StoreFormat::Yaml);
        assert_eq!(StoreFormat::from_path(Path::new("s.json")), StoreFormat::Json);
        assert_eq!(StoreFormat::from_path(Path::new("store")), StoreFormat::Json);
    }

    #[test]
    fn json_and_yaml_reload_identically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["store.json", "store.yaml"] {
            let file = StoreFile::new(dir.path().join(name));
            file.save(&snapshot()).unwrap();
            assert_eq!(file.load().unwrap(), snapshot());
        }
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = StoreFile::new("/nonexistent/store.json").load().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/store.json"));
    }
}
