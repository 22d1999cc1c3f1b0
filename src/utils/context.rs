use std::path::PathBuf;

use pyo3::prelude::*;
use pyo3::types::PyDict;

/// What a script's `main(context)` receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchContext {
    pub file_name: String,
    pub name: String,
    pub scripts_dir: PathBuf,
    pub settings_path: PathBuf,
    /// Successful runs before this one
    pub run_count: u64,
    pub close_on_run: bool,
}

impl LaunchContext {
    /// Build the plain `dict` handed to Python
    pub fn to_py_dict<'py>(&self, py: Python<'py>) -> PyResult<&'py PyDict> {
        let dict = PyDict::new(py);
        dict.set_item("file_name", &self.file_name)?;
        dict.set_item("name", &self.name)?;
        dict.set_item("scripts_dir", self.scripts_dir.to_string_lossy().to_string())?;
        dict.set_item("settings_path", self.settings_path.to_string_lossy().to_string())?;
        dict.set_item("run_count", self.run_count)?;
        dict.set_item("close_on_run", self.close_on_run)?;
        Ok(dict)
    }
}
