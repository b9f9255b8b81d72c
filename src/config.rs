//! Tape definition documents
//!
//! A tape definition is a JSON file (by convention `tape.json` in the folder
//! holding the dumps) describing the cartridge type, logical blocks to force
//! skip, and each dump file taken from the cartridge.

use crate::cartridge::CartridgeType;
use crate::error::{Result, TapeError};
use crate::utils;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up when a folder is given instead of a definition file.
pub const DEFAULT_DEFINITION_NAME: &str = "tape.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TapeConfig {
    #[serde(rename = "type")]
    pub cartridge: CartridgeType,
    #[serde(default)]
    pub name: Option<String>,
    /// Logical blocks and ranges to drop from ordered output, e.g. `"10-12, 40"`
    #[serde(default)]
    pub skip: Option<String>,
    pub files: Vec<DumpFileConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DumpFileConfig {
    /// File name relative to the definition's folder
    pub file: String,
    /// Logical block the dump started at, if known
    #[serde(default)]
    pub start: Option<u32>,
    /// Logical blocks the dump pass failed to read and left out of the file
    #[serde(default)]
    pub bad: Option<String>,
}

impl DumpFileConfig {
    pub fn bad_blocks(&self) -> Result<Vec<u32>> {
        match &self.bad {
            Some(text) => utils::parse_block_list(text),
            None => Ok(Vec::new()),
        }
    }
}

impl TapeConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: TapeConfig = serde_json::from_str(text)
            .map_err(|e| TapeError::configuration(format!("Malformed tape definition: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a definition file, returning it with the folder its paths are relative to.
    pub fn load(path: &Path) -> Result<(Self, PathBuf)> {
        let definition_path = resolve_definition_path(path);
        debug!("Loading tape definition: {:?}", definition_path);

        let text = std::fs::read_to_string(&definition_path).map_err(|e| {
            TapeError::configuration(format!(
                "Cannot read tape definition {}: {}",
                definition_path.display(),
                e
            ))
        })?;
        let config = Self::from_json(&text)?;

        let folder = definition_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok((config, folder))
    }

    pub fn skip_ranges(&self) -> Result<Vec<std::ops::RangeInclusive<u32>>> {
        match &self.skip {
            Some(text) => utils::parse_block_ranges(text),
            None => Ok(Vec::new()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.files.is_empty() {
            return Err(TapeError::configuration(
                "Tape definition lists no dump files",
            ));
        }

        let mut names = std::collections::HashSet::new();
        for file in &self.files {
            if file.file.trim().is_empty() {
                return Err(TapeError::configuration("Dump file entry has an empty name"));
            }
            if !names.insert(file.file.as_str()) {
                return Err(TapeError::configuration(format!(
                    "Dump file '{}' is listed twice",
                    file.file
                )));
            }
            file.bad_blocks()?;
        }
        self.skip_ranges()?;
        Ok(())
    }
}

/// A folder resolves to its `tape.json`; anything else is taken as the definition file.
pub fn resolve_definition_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(DEFAULT_DEFINITION_NAME)
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_definition() {
        let config = TapeConfig::from_json(
            r#"{
                "type": "adr50",
                "name": "Backup set 3",
                "skip": "10-12, 40",
                "files": [
                    { "file": "pass1.bin", "start": 100, "bad": "5, 90-92" },
                    { "file": "pass2.bin" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.cartridge, CartridgeType::Adr50);
        assert_eq!(config.name.as_deref(), Some("Backup set 3"));
        assert_eq!(config.skip_ranges().unwrap(), vec![10..=12, 40..=40]);
        assert_eq!(config.files.len(), 2);
        assert_eq!(config.files[0].start, Some(100));
        assert_eq!(config.files[0].bad_blocks().unwrap(), vec![5, 90, 91, 92]);
        assert!(config.files[1].bad_blocks().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_malformed_definitions() {
        assert!(TapeConfig::from_json(r#"{ "type": "adr30", "files": [] }"#).is_err());
        assert!(TapeConfig::from_json(r#"{ "type": "lto4", "files": [{ "file": "a" }] }"#).is_err());
        assert!(TapeConfig::from_json(r#"{ "type": "adr30", "files": [{ "file": "a", "bogus": 1 }] }"#).is_err());
        assert!(TapeConfig::from_json(r#"{ "type": "adr30", "skip": "9-2", "files": [{ "file": "a" }] }"#).is_err());
        assert!(TapeConfig::from_json(
            r#"{ "type": "adr30", "files": [{ "file": "a" }, { "file": "a" }] }"#
        )
        .is_err());
    }

    #[test]
    fn test_unimplemented_type_still_parses() {
        let config = TapeConfig::from_json(r#"{ "type": "adr120", "files": [{ "file": "a" }] }"#).unwrap();
        assert_eq!(config.cartridge, CartridgeType::Adr120);
    }
}
