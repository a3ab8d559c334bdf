// src/config.rs

//! On-disk apk configuration consumed by the surrounding subsystem
//!
//! Three artifacts under an install root drive the resolver's inputs:
//!
//! - `etc/apk/repositories` - one index URL per line, trailing newline
//!   required; a line may carry an `@tag` prefix naming the pin label for
//!   that index.
//! - `etc/apk/arch` - single line naming the architecture.
//! - `etc/apk/keys/` - each regular file is a named signing key.
//!
//! Downloading, signature verification and APKINDEX parsing happen
//! elsewhere; this module only reads and writes the plain files.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Repositories file location relative to the install root.
pub const REPOSITORIES_PATH: &str = "etc/apk/repositories";
/// Architecture file location relative to the install root.
pub const ARCH_PATH: &str = "etc/apk/arch";
/// Signing key directory relative to the install root.
pub const KEYS_DIR_PATH: &str = "etc/apk/keys";

/// One line of the repositories file: an index URL with an optional pin tag.
///
/// `@edge https://dl.example.org/edge/main` pins the index under the label
/// `edge`; constraints may then select it with `name@edge`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryLine {
    /// Pin label; empty for untagged lines.
    pub tag: String,
    pub url: String,
}

impl RepositoryLine {
    /// Split an optional `@tag` prefix off a repository line.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix('@') {
            if let Some((tag, url)) = rest.split_once(char::is_whitespace) {
                return Self {
                    tag: tag.to_string(),
                    url: url.trim().to_string(),
                };
            }
        }
        Self {
            tag: String::new(),
            url: line.to_string(),
        }
    }
}

fn io_err(path: &Path, err: std::io::Error) -> Error {
    Error::IoError(format!("{}: {}", path.display(), err))
}

/// Read the repository URLs from `etc/apk/repositories`.
///
/// Blank lines are skipped; lines are returned verbatim, tags included.
pub fn read_repositories(root: &Path) -> Result<Vec<String>> {
    let path = root.join(REPOSITORIES_PATH);
    let contents = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let repos: Vec<String> = contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect();
    debug!("read {} repositories from {}", repos.len(), path.display());
    Ok(repos)
}

/// Write `etc/apk/repositories`.
///
/// Refuses an empty list. The base directory must already exist; this only
/// works against an initialized root. The file ends with the required
/// trailing newline.
pub fn write_repositories(root: &Path, repos: &[String]) -> Result<()> {
    if repos.is_empty() {
        return Err(Error::ConfigError(
            "must provide at least one repository".to_string(),
        ));
    }
    let path = root.join(REPOSITORIES_PATH);
    let data = format!("{}\n", repos.join("\n"));
    fs::write(&path, data).map_err(|e| io_err(&path, e))?;
    debug!("wrote {} repositories to {}", repos.len(), path.display());
    Ok(())
}

/// Read the architecture from `etc/apk/arch`, stripping the final newline.
pub fn read_arch(root: &Path) -> Result<String> {
    let path = root.join(ARCH_PATH);
    let contents = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(contents
        .strip_suffix('\n')
        .unwrap_or(&contents)
        .to_string())
}

/// Read the signing keys from `etc/apk/keys`: filename to contents.
///
/// Subdirectories are skipped. Keys come back sorted by name so callers see
/// a stable order.
pub fn read_keys(root: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let dir = root.join(KEYS_DIR_PATH);
    let mut keys = BTreeMap::new();
    let entries = fs::read_dir(&dir).map_err(|e| io_err(&dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(&dir, e))?;
        let path: PathBuf = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        let contents = fs::read(&path).map_err(|e| io_err(&path, e))?;
        keys.insert(name, contents);
    }
    debug!("loaded {} signing keys from {}", keys.len(), dir.display());
    Ok(keys)
}
