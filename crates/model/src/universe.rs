//! The fixed set of candidate flags a run searches over.

use crate::error::{SearchError, SearchResult};
use crate::flagset::FlagSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Ordered flag universe, as written by the flag discovery step.
///
/// The on-disk form is `{"executable": "...", "version": "...", "opts": [...]}`;
/// only `opts` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagUniverse {
    /// Compiler the flags were discovered from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,

    /// Compiler version banner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(rename = "opts")]
    flags: Vec<String>,
}

impl FlagUniverse {
    pub fn new(flags: Vec<String>) -> SearchResult<Self> {
        if flags.is_empty() {
            return Err(SearchError::invalid("flag universe is empty"));
        }
        Ok(Self {
            executable: None,
            version: None,
            flags,
        })
    }

    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = Some(executable.into());
        self
    }

    pub fn from_json(json: &str) -> SearchResult<Self> {
        let universe: FlagUniverse = serde_json::from_str(json)
            .map_err(|e| SearchError::invalid(format!("malformed flag file: {e}")))?;
        if universe.flags.is_empty() {
            return Err(SearchError::invalid("flag universe is empty"));
        }
        Ok(universe)
    }

    pub fn load(path: impl AsRef<Path>) -> SearchResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            SearchError::invalid(format!("cannot read flag file {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    /// Selected flag strings in universe order.
    pub fn resolve(&self, set: &FlagSet) -> Vec<String> {
        debug_assert_eq!(set.len(), self.flags.len());
        set.ones().map(|idx| self.flags[idx].clone()).collect()
    }

    /// Empty selection over this universe.
    pub fn empty_set(&self) -> FlagSet {
        FlagSet::zeros(self.flags.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_discovery_output() {
        let json = r#"{
            "executable": "/usr/bin/g++",
            "version": "g++ 12.2.0",
            "opts": ["-fipa-pta", "-funroll-loops", "-ftree-vectorize"]
        }"#;
        let universe = FlagUniverse::from_json(json).unwrap();
        assert_eq!(universe.len(), 3);
        assert_eq!(universe.executable.as_deref(), Some("/usr/bin/g++"));

        let set = FlagSet::from_indices(3, &[2, 0]);
        assert_eq!(universe.resolve(&set), vec!["-fipa-pta", "-ftree-vectorize"]);
    }

    #[test]
    fn test_empty_universe_rejected() {
        assert!(matches!(
            FlagUniverse::new(vec![]),
            Err(SearchError::InvalidParameter(_))
        ));
        assert!(FlagUniverse::from_json(r#"{"opts": []}"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gpp_flags.json");
        std::fs::write(&path, r#"{"opts": ["-O1", "-O2"]}"#).unwrap();
        let universe = FlagUniverse::load(&path).unwrap();
        assert_eq!(universe.flags(), ["-O1", "-O2"]);
        assert!(FlagUniverse::load(dir.path().join("missing.json")).is_err());
    }
}
