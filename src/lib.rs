pub mod commands;
pub mod error;
pub mod interactive;
pub mod launcher;
pub mod plugin;
pub mod registry;
pub mod search;
pub mod settings;
pub mod utils;

pub use error::{LauncherError, Result};
pub use launcher::{LaunchOutcome, Launcher};
pub use plugin::{EntryPoint, ScriptModule};
pub use registry::Registry;
pub use settings::{SettingsRecord, SettingsStore};
