use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{LauncherError, Result};
use crate::plugin::{self, ScriptModule};
use crate::utils::{LaunchContext, scan_scripts};

/// Loaded scripts keyed by file name
#[derive(Debug, Default)]
pub struct Registry {
    scripts_dir: PathBuf,
    modules: BTreeMap<String, ScriptModule>,
    failures: Vec<LauncherError>,
}

impl Registry {
    /// Scan `dir` and load every script in it. A script that fails to load
    /// is skipped and kept in [`failures`](Self::failures).
    pub fn discover(dir: &Path) -> Result<Self> {
        let scripts_dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        let entries =
            scan_scripts(&scripts_dir).map_err(|source| LauncherError::ScriptsDirUnreadable {
                path: scripts_dir.clone(),
                source,
            })?;

        plugin::prepare_interpreter(&scripts_dir)?;

        let mut registry = Self {
            scripts_dir,
            ..Default::default()
        };

        for entry in &entries {
            match ScriptModule::load(entry) {
                Ok(module) => {
                    debug!(file = %module.file_name, name = module.display_name(), "loaded script");
                    registry.modules.insert(module.file_name.clone(), module);
                }
                Err(e) => {
                    warn!(file = %entry.file_name, error = %e, "skipping script");
                    registry.failures.push(e);
                }
            }
        }

        info!(
            loaded = registry.modules.len(),
            skipped = registry.failures.len(),
            dir = %registry.scripts_dir.display(),
            "script discovery finished"
        );
        Ok(registry)
    }

    /// A registry over already-built modules
    pub fn from_modules(
        scripts_dir: impl Into<PathBuf>,
        modules: impl IntoIterator<Item = ScriptModule>,
    ) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
            modules: modules
                .into_iter()
                .map(|m| (m.file_name.clone(), m))
                .collect(),
            failures: vec![],
        }
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    pub fn get(&self, file_name: &str) -> Option<&ScriptModule> {
        self.modules.get(file_name)
    }

    /// Modules in file name order
    pub fn modules(&self) -> impl Iterator<Item = &ScriptModule> {
        self.modules.values()
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Scripts that were found but could not be loaded
    pub fn failures(&self) -> &[LauncherError] {
        &self.failures
    }

    /// Find the module a user meant: exact file name, file stem, or
    /// display name (case-insensitive)
    pub fn resolve(&self, selection: &str) -> Result<&ScriptModule> {
        let selection = selection.trim();

        if let Some(module) = self
            .modules
            .get(selection)
            .or_else(|| self.modules.get(&format!("{}.py", selection)))
        {
            return Ok(module);
        }

        let wanted = selection.to_lowercase();
        let matches: Vec<&ScriptModule> = self
            .modules
            .values()
            .filter(|m| m.display_name().to_lowercase() == wanted)
            .collect();

        match matches.as_slice() {
            [module] => Ok(*module),
            [] => Err(LauncherError::UnknownScript(selection.to_string())),
            many => Err(LauncherError::AmbiguousScript {
                selection: selection.to_string(),
                candidates: many.iter().map(|m| m.file_name.clone()).collect(),
            }),
        }
    }
}

/// `NAME` if the script set one, else its file name
pub fn display_name(module: &ScriptModule) -> &str {
    module.display_name()
}

/// Run the module's entry point; [`LauncherError::NoEntryPoint`] if it has none
pub fn invoke(module: &ScriptModule, context: &LaunchContext) -> Result<()> {
    debug!(file = %module.file_name, "invoking script");
    module.invoke(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sample() -> Registry {
        Registry::from_modules(
            "scripts",
            vec![
                ScriptModule::new("backup.py").with_name("Backup"),
                ScriptModule::new("backup_home.py").with_name("backup"),
                ScriptModule::new("clean.py").with_name("Clean Temp"),
                ScriptModule::new("plain.py"),
            ],
        )
    }

    #[test]
    fn test_resolve_by_file_name_and_stem() {
        let registry = sample();
        assert_eq!(registry.resolve("clean.py").unwrap().file_name, "clean.py");
        assert_eq!(registry.resolve("clean").unwrap().file_name, "clean.py");
        assert_eq!(registry.resolve("  plain ").unwrap().file_name, "plain.py");
    }

    #[test]
    fn test_resolve_by_display_name() {
        let registry = sample();
        assert_eq!(registry.resolve("clean temp").unwrap().file_name, "clean.py");
    }

    #[test]
    fn test_resolve_ambiguous_display_name() {
        let registry = Registry::from_modules(
            "scripts",
            vec![
                ScriptModule::new("one.py").with_name("Same"),
                ScriptModule::new("two.py").with_name("same"),
            ],
        );
        match registry.resolve("SAME") {
            Err(LauncherError::AmbiguousScript { candidates, .. }) => {
                assert_eq!(candidates, vec!["one.py", "two.py"]);
            }
            other => panic!("Expected AmbiguousScript, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_prefers_file_name_over_display_name() {
        // "backup" is both a stem and, case-insensitively, two display names
        let registry = sample();
        assert_eq!(registry.resolve("backup").unwrap().file_name, "backup.py");
    }

    #[test]
    fn test_resolve_unknown() {
        let registry = sample();
        assert!(matches!(
            registry.resolve("nope"),
            Err(LauncherError::UnknownScript(_))
        ));
    }

    #[test]
    fn test_display_name_fallback() {
        let registry = sample();
        assert_eq!(display_name(registry.get("plain.py").unwrap()), "plain.py");
        assert_eq!(display_name(registry.get("clean.py").unwrap()), "Clean Temp");
    }

    #[test]
    fn test_invoke_without_entry_point() {
        let registry = sample();
        let module = registry.get("plain.py").unwrap();
        let ctx = LaunchContext {
            file_name: module.file_name.clone(),
            name: module.display_name().to_string(),
            scripts_dir: registry.scripts_dir().to_path_buf(),
            settings_path: PathBuf::from("settings.json"),
            run_count: 0,
            close_on_run: false,
        };
        assert!(matches!(
            invoke(module, &ctx),
            Err(LauncherError::NoEntryPoint { .. })
        ));
    }

    #[test]
    fn test_discover_skips_broken_scripts() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("good.py"),
            "NAME = 'Good'\nTAGS = ['ok']\ndef main():\n    pass\n",
        )
        .unwrap();
        fs::write(dir.path().join("syntax.py"), "def main(:\n").unwrap();
        fs::write(dir.path().join("badtags.py"), "TAGS = 5\n").unwrap();
        fs::write(dir.path().join("noentry.py"), "NAME = 'No Entry'\n").unwrap();

        let registry = Registry::discover(dir.path()).unwrap();
        let names: Vec<&str> = registry.file_names().collect();
        assert_eq!(names, vec!["good.py", "noentry.py"]);
        assert_eq!(registry.failures().len(), 2);

        let failed: Vec<&str> = registry
            .failures()
            .iter()
            .filter_map(|e| e.file_name())
            .collect();
        assert_eq!(failed, vec!["badtags.py", "syntax.py"]);
    }

    #[test]
    fn test_discover_scripts_can_import_siblings() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("qs_shared_helper.py"), "GREETING = 'hi'\n").unwrap();
        fs::write(
            dir.path().join("greeter.py"),
            "import qs_shared_helper\nNAME = qs_shared_helper.GREETING\n",
        )
        .unwrap();

        let registry = Registry::discover(dir.path()).unwrap();
        assert_eq!(registry.get("greeter.py").unwrap().display_name(), "hi");
    }

    #[test]
    fn test_discover_missing_directory() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Registry::discover(&dir.path().join("absent")),
            Err(LauncherError::ScriptsDirUnreadable { .. })
        ));
    }
}
