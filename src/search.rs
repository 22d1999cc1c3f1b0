//! Query matching and result ordering

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use crate::plugin::ScriptModule;
use crate::registry::Registry;

/// File names of the modules matching `query`.
///
/// The query is split on whitespace; a module matches when any term is a
/// case-insensitive substring of its file name, a tag, its description or
/// its name. A blank query matches everything.
pub fn filter<'a>(
    query: &str,
    modules: impl IntoIterator<Item = &'a ScriptModule>,
) -> BTreeSet<String> {
    let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();

    modules
        .into_iter()
        .filter(|module| terms.is_empty() || terms.iter().any(|term| matches_term(module, term)))
        .map(|module| module.file_name.clone())
        .collect()
}

/// Most-run first, then by display name, then by file name
pub fn rank(
    matches: &BTreeSet<String>,
    registry: &Registry,
    counts: &BTreeMap<String, u64>,
) -> Vec<String> {
    let mut ranked: Vec<(Reverse<u64>, String, &String)> = matches
        .iter()
        .map(|file_name| {
            let display = registry
                .get(file_name)
                .map(|m| m.display_name())
                .unwrap_or(file_name)
                .to_lowercase();
            let count = counts.get(file_name).copied().unwrap_or(0);
            (Reverse(count), display, file_name)
        })
        .collect();

    ranked.sort();
    ranked.into_iter().map(|(_, _, file_name)| file_name.clone()).collect()
}

fn matches_term(module: &ScriptModule, term: &str) -> bool {
    let contains = |field: &str| field.to_lowercase().contains(term);

    contains(&module.file_name)
        || module.tags.iter().any(|tag| contains(tag))
        || contains(&module.description)
        || module.name.as_deref().map(contains).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modules() -> Vec<ScriptModule> {
        vec![
            ScriptModule::new("backup.py")
                .with_name("Backup Home")
                .with_description("Copies ~ to the NAS")
                .with_tags(["files", "Tag1"]),
            ScriptModule::new("clock.py")
                .with_name("World Clock")
                .with_description("shows tag1 times")
                .with_tags(["time"]),
            ScriptModule::new("tag1_tool.py"),
            ScriptModule::new("volume.py")
                .with_name("Volume TAG1 Up")
                .with_tags(["audio"]),
            ScriptModule::new("weather.py")
                .with_name("Weather")
                .with_description("Forecast")
                .with_tags(["net"]),
        ]
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_query_matches_all() {
        let modules = modules();
        assert_eq!(filter("", &modules).len(), modules.len());
        assert_eq!(filter("   \t ", &modules).len(), modules.len());
    }

    #[test]
    fn test_term_matches_every_field() {
        let modules = modules();
        // tag, description, file name and name respectively
        assert_eq!(
            filter("tag1", &modules),
            set(&["backup.py", "clock.py", "tag1_tool.py", "volume.py"])
        );
    }

    #[test]
    fn test_any_term_matches() {
        let modules = modules();
        assert_eq!(filter("audio forecast", &modules), set(&["volume.py", "weather.py"]));
    }

    #[test]
    fn test_extension_is_searchable() {
        let modules = modules();
        assert_eq!(filter(".PY", &modules).len(), modules.len());
    }

    #[test]
    fn test_no_match() {
        let modules = modules();
        assert!(filter("zzz", &modules).is_empty());
    }

    #[test]
    fn test_rank_by_run_count_then_name() {
        let registry = Registry::from_modules("scripts", modules());
        let matches = filter("", registry.modules());
        let counts: BTreeMap<String, u64> =
            [("weather.py".to_string(), 5), ("clock.py".to_string(), 2)].into();

        let ranked = rank(&matches, &registry, &counts);
        assert_eq!(
            ranked,
            vec!["weather.py", "clock.py", "backup.py", "tag1_tool.py", "volume.py"]
        );
    }
}
