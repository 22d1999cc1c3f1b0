use std::fmt;

use crate::plugin::ScriptModule;

/// What the host shows for one script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub file_name: String,
    pub display_name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub run_count: u64,
    pub runnable: bool,
}

impl Listing {
    pub fn new(module: &ScriptModule, run_count: u64) -> Self {
        Self {
            file_name: module.file_name.clone(),
            display_name: module.display_name().to_string(),
            description: module.description.clone(),
            tags: module.tags.clone(),
            run_count,
            runnable: module.entry_point().is_runnable(),
        }
    }

    /// The tooltip text the script list shows on hover
    pub fn summary(&self) -> String {
        format!(
            "Runs: {}\nTags: {}\nDescription: {}",
            self.run_count,
            self.tags.join(", "),
            self.description
        )
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "       Name: {}", self.display_name)?;
        writeln!(f, "       File: {}", self.file_name)?;
        if !self.description.is_empty() {
            writeln!(f, "Description: {}", self.description)?;
        }
        if !self.tags.is_empty() {
            writeln!(f, "       Tags: {}", self.tags.join(", "))?;
        }
        writeln!(f, "       Runs: {}", self.run_count)?;
        if !self.runnable {
            writeln!(f, "      Entry: none (no main() defined)")?;
        }
        Ok(())
    }
}
