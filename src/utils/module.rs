use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use homedir::my_home;
use tracing::debug;

/// A script file found in the scripts directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEntry {
    /// File name with extension, e.g. `hello.py`; the script's identity
    pub file_name: String,
    /// Name the file is executed under, e.g. `scripts.hello`
    pub module_name: String,
    pub path: PathBuf,
}

/// List the loadable scripts directly inside `dir`, sorted by file name
pub fn scan_scripts(dir: &Path) -> io::Result<Vec<ScriptEntry>> {
    let mut scripts = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || path.extension().map(|e| e != "py").unwrap_or(true) {
            continue;
        }

        let (Some(file_name), Some(stem)) = (
            path.file_name().map(|n| n.to_string_lossy().to_string()),
            path.file_stem().map(|s| s.to_string_lossy().to_string()),
        ) else {
            continue;
        };

        // __init__.py, hidden files and names Python cannot import
        if stem == "__init__" || stem.starts_with('.') || !is_identifier(&stem) {
            debug!(file = %file_name, "skipping non-importable file");
            continue;
        }

        scripts.push(ScriptEntry {
            file_name,
            module_name: format!("scripts.{}", stem),
            path,
        });
    }

    scripts.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(scripts)
}

/// `./scripts` when present, otherwise `~/.quickscript/scripts`
pub fn default_scripts_dir() -> PathBuf {
    let local = env::current_dir().unwrap_or_default().join("scripts");
    if local.is_dir() {
        return local;
    }

    match my_home() {
        Ok(Some(home)) => {
            let user = home.join(".quickscript").join("scripts");
            if user.is_dir() { user } else { local }
        }
        _ => local,
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}
