use tracing::{debug, info};

use crate::error::Result;
use crate::registry::{self, Registry};
use crate::search;
use crate::settings::SettingsStore;
use crate::utils::{LaunchContext, Listing};

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    pub file_name: String,
    /// Run count after this run
    pub run_count: u64,
    /// The host should close once the script is done
    pub close_window: bool,
}

/// The registry and settings store behind the host's list and run actions
pub struct Launcher {
    registry: Registry,
    store: SettingsStore,
}

impl Launcher {
    pub fn new(registry: Registry, store: SettingsStore) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SettingsStore {
        &mut self.store
    }

    /// Scripts matching `query`, most used first. Every listed script gets a
    /// run count entry in the settings file.
    pub fn listing(&mut self, query: &str) -> Vec<Listing> {
        let matches = search::filter(query, self.registry.modules());
        let counts = self.store.run_counts(matches.iter().map(String::as_str));
        debug!(query, matches = matches.len(), "filtered scripts");

        search::rank(&matches, &self.registry, &counts)
            .into_iter()
            .filter_map(|file_name| {
                let module = self.registry.get(&file_name)?;
                let runs = counts.get(&file_name).copied().unwrap_or(0);
                Some(Listing::new(module, runs))
            })
            .collect()
    }

    /// Details for one script
    pub fn info(&mut self, selection: &str) -> Result<Listing> {
        let module = self.registry.resolve(selection)?;
        let runs = self.store.run_count(&module.file_name);
        Ok(Listing::new(module, runs))
    }

    /// Run the selected script. The run count only grows when `main`
    /// returned normally.
    pub fn launch(&mut self, selection: &str) -> Result<LaunchOutcome> {
        let module = self.registry.resolve(selection)?;
        let previous = self.store.run_count(&module.file_name);
        let settings = self.store.load_or_default();

        let context = LaunchContext {
            file_name: module.file_name.clone(),
            name: module.display_name().to_string(),
            scripts_dir: self.registry.scripts_dir().to_path_buf(),
            settings_path: self.store.path().to_path_buf(),
            run_count: previous,
            close_on_run: settings.close_on_run,
        };

        registry::invoke(module, &context)?;

        let run_count = self.store.increment_run_count(&module.file_name);
        // Re-read: the script itself may have changed the preference
        let close_window = self.store.close_on_run();
        info!(file = %module.file_name, run_count, "script finished");

        Ok(LaunchOutcome {
            file_name: module.file_name.clone(),
            run_count,
            close_window,
        })
    }

    /// Close the settings store
    pub fn shutdown(self) {
        self.store.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LauncherError;
    use crate::plugin::ScriptModule;
    use std::fs;
    use tempfile::TempDir;

    fn script_dir(dir: &TempDir) -> std::path::PathBuf {
        let scripts = dir.path().join("scripts");
        fs::create_dir(&scripts).unwrap();
        fs::write(
            scripts.join("hello.py"),
            "NAME = 'Hello'\nTAGS = ['greet']\ndef main():\n    pass\n",
        )
        .unwrap();
        fs::write(
            scripts.join("counter.py"),
            "NAME = 'Counter'\nDESCRIPTION = 'reads its context'\ndef main(ctx):\n    assert ctx['file_name'] == 'counter.py'\n",
        )
        .unwrap();
        fs::write(scripts.join("inert.py"), "NAME = 'Inert'\n").unwrap();
        fs::write(scripts.join("crash.py"), "def main():\n    1 / 0\n").unwrap();
        scripts
    }

    fn launcher(dir: &TempDir) -> Launcher {
        let registry = Registry::discover(&script_dir(dir)).unwrap();
        let store = SettingsStore::open(dir.path().join("settings.json")).unwrap();
        Launcher::new(registry, store)
    }

    #[test]
    fn test_launch_increments_run_count() {
        let dir = TempDir::new().unwrap();
        let mut launcher = launcher(&dir);

        let first = launcher.launch("hello").unwrap();
        let second = launcher.launch("Hello").unwrap();
        assert_eq!(first.run_count, 1);
        assert_eq!(second.run_count, 2);
        assert!(!second.close_window);
        assert_eq!(launcher.store_mut().run_count("hello.py"), 2);
    }

    #[test]
    fn test_launch_passes_context() {
        let dir = TempDir::new().unwrap();
        let mut launcher = launcher(&dir);
        assert!(launcher.launch("counter.py").is_ok());
    }

    #[test]
    fn test_launch_reports_close_on_run() {
        let dir = TempDir::new().unwrap();
        let mut launcher = launcher(&dir);
        launcher.store_mut().set_close_on_run(true);

        assert!(launcher.launch("hello").unwrap().close_window);
    }

    #[test]
    fn test_launch_without_entry_point_is_not_counted() {
        let dir = TempDir::new().unwrap();
        let mut launcher = launcher(&dir);

        assert!(matches!(
            launcher.launch("inert"),
            Err(LauncherError::NoEntryPoint { .. })
        ));
        assert_eq!(launcher.store_mut().run_count("inert.py"), 0);
    }

    #[test]
    fn test_launch_failure_is_not_counted() {
        let dir = TempDir::new().unwrap();
        let mut launcher = launcher(&dir);

        match launcher.launch("crash") {
            Err(LauncherError::ScriptFailed { message, .. }) => {
                assert!(message.contains("ZeroDivisionError"))
            }
            other => panic!("Expected ScriptFailed, got {:?}", other),
        }
        assert_eq!(launcher.store_mut().run_count("crash.py"), 0);
    }

    #[test]
    fn test_listing_ranks_and_records_counts() {
        let dir = TempDir::new().unwrap();
        let mut launcher = launcher(&dir);
        launcher.launch("counter").unwrap();

        let listed: Vec<String> = launcher
            .listing("")
            .into_iter()
            .map(|l| l.file_name)
            .collect();
        assert_eq!(listed, vec!["counter.py", "crash.py", "hello.py", "inert.py"]);

        let record = launcher.store().load().unwrap();
        assert_eq!(record.run_count.len(), 4);
        assert_eq!(record.run_count.get("counter.py"), Some(&1));
    }

    #[test]
    fn test_listing_filters() {
        let dir = TempDir::new().unwrap();
        let mut launcher = launcher(&dir);

        let listed = launcher.listing("greet");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].display_name, "Hello");
        assert!(listed[0].runnable);
        assert!(!launcher.store().load().unwrap().run_count.contains_key("inert.py"));
    }

    #[test]
    fn test_info_and_unknown() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.json")).unwrap();
        let registry = Registry::from_modules(
            dir.path(),
            vec![ScriptModule::new("only.py").with_description("the one")],
        );
        let mut launcher = Launcher::new(registry, store);

        let info = launcher.info("only").unwrap();
        assert_eq!(info.description, "the one");
        assert!(matches!(
            launcher.info("other"),
            Err(LauncherError::UnknownScript(_))
        ));
        launcher.shutdown();
    }
}
