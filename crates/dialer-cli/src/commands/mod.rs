//! Subcommand implementations

pub mod import;
pub mod init;
pub mod locks;
pub mod recycle;
pub mod snapshot;

use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;

/// Read and parse a JSON input file
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}
