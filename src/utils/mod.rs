// Re-export all utility modules
pub mod context;
pub mod display;
pub mod logging;
pub mod metadata;
pub mod module;

// Re-export commonly used items for convenience
pub use context::LaunchContext;
pub use display::{ListingTable, print_banner};
pub use metadata::Listing;
pub use module::{ScriptEntry, default_scripts_dir, scan_scripts};
