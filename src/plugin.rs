//! Python scripts as launcher plugins
//!
//! A script may define `NAME`, `DESCRIPTION`, `TAGS` and a callable `main`
//! taking zero or one argument. Loading executes the file once and checks
//! those attributes; anything of the wrong shape is rejected with
//! [`LauncherError::InvalidScript`] instead of surfacing later.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use pyo3::exceptions::PySystemExit;
use pyo3::prelude::*;
use pyo3::types::{PyList, PyModule};
use tracing::debug;

use crate::error::{LauncherError, Result};
use crate::utils::{LaunchContext, ScriptEntry};

/// How a script's `main` wants to be called
#[derive(Debug)]
pub enum EntryPoint {
    /// No callable `main`
    Missing,
    /// `main()`
    Plain(PyObject),
    /// `main(context)`
    WithContext(PyObject),
}

impl EntryPoint {
    pub fn is_runnable(&self) -> bool {
        !matches!(self, Self::Missing)
    }
}

#[derive(Debug)]
pub struct ScriptModule {
    pub file_name: String,
    pub name: Option<String>,
    pub description: String,
    pub tags: Vec<String>,
    pub path: PathBuf,
    entry: EntryPoint,
}

impl ScriptModule {
    /// A script with metadata only and no entry point
    pub fn new(file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        Self {
            path: PathBuf::from(&file_name),
            file_name,
            name: None,
            description: String::new(),
            tags: vec![],
            entry: EntryPoint::Missing,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn entry_point(&self) -> &EntryPoint {
        &self.entry
    }

    /// `NAME` when set and not blank, otherwise the file name
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.file_name,
        }
    }

    /// Execute the script file and validate what it defines
    pub fn load(entry: &ScriptEntry) -> Result<Self> {
        let code = fs::read_to_string(&entry.path).map_err(|e| LauncherError::ScriptLoad {
            file_name: entry.file_name.clone(),
            message: e.to_string(),
        })?;

        Python::with_gil(|py| {
            let module = PyModule::from_code(
                py,
                &code,
                &entry.path.to_string_lossy(),
                &entry.module_name,
            )
            .map_err(|e| LauncherError::ScriptLoad {
                file_name: entry.file_name.clone(),
                message: describe_exception(py, &e),
            })?;
            debug!(file = %entry.file_name, "executed script module");

            let file_name = entry.file_name.as_str();
            let name = optional_string(module, "NAME", file_name)?;
            let description = optional_string(module, "DESCRIPTION", file_name)?.unwrap_or_default();
            let tags = optional_tags(module, file_name)?;
            let entry_point = entry_point(py, module, file_name)?;

            Ok(Self {
                file_name: entry.file_name.clone(),
                name,
                description,
                tags,
                path: entry.path.clone(),
                entry: entry_point,
            })
        })
    }

    /// Call `main`, handing over `context` only if it takes an argument
    pub fn invoke(&self, context: &LaunchContext) -> Result<()> {
        Python::with_gil(|py| {
            let outcome = match &self.entry {
                EntryPoint::Missing => {
                    return Err(LauncherError::NoEntryPoint {
                        file_name: self.file_name.clone(),
                    });
                }
                EntryPoint::Plain(main) => main.call0(py),
                EntryPoint::WithContext(main) => context
                    .to_py_dict(py)
                    .and_then(|ctx| main.call1(py, (ctx,))),
            };

            match outcome {
                Ok(_) => Ok(()),
                Err(e) if is_clean_exit(py, &e) => {
                    debug!(file = %self.file_name, "script called sys.exit(0)");
                    Ok(())
                }
                Err(e) => Err(LauncherError::ScriptFailed {
                    file_name: self.file_name.clone(),
                    message: describe_exception(py, &e),
                }),
            }
        })
    }
}

/// Make the scripts directory, its parent and the host interpreter's
/// search path importable from scripts
pub fn prepare_interpreter(scripts_dir: &Path) -> Result<()> {
    let host_paths = host_python_paths();

    Python::with_gil(|py| {
        let sys = py.import("sys")?;
        let path: &PyList = sys.getattr("path")?.downcast().map_err(PyErr::from)?;
        let current: Vec<String> = path.extract()?;

        for extra in host_paths.iter().filter(|p| !current.contains(p)) {
            path.append(extra)?;
        }

        // Inserted in reverse so the scripts directory ends up first
        let mut front = vec![];
        if let Some(parent) = scripts_dir.parent().filter(|p| !p.as_os_str().is_empty()) {
            front.push(parent.to_string_lossy().to_string());
        }
        front.push(scripts_dir.to_string_lossy().to_string());
        for dir in front {
            if !current.contains(&dir) {
                path.insert(0, dir)?;
            }
        }

        debug!(entries = path.len(), scripts_dir = %scripts_dir.display(), "python search path ready");
        Ok(())
    })
}

/// The embedded interpreter does not see a virtualenv's or the system's
/// site-packages, so borrow `sys.path` from whichever `python` is on PATH
fn host_python_paths() -> Vec<String> {
    for interpreter in ["python3", "python"] {
        let output = Command::new(interpreter)
            .arg("-c")
            .arg("import json, sys; print(json.dumps(sys.path))")
            .output();

        match output {
            Ok(out) if out.status.success() => {
                match serde_json::from_slice::<Vec<String>>(&out.stdout) {
                    Ok(paths) => return paths.into_iter().filter(|p| !p.is_empty()).collect(),
                    Err(e) => debug!(interpreter, error = %e, "unparseable sys.path"),
                }
            }
            Ok(out) => debug!(interpreter, status = %out.status, "interpreter failed"),
            Err(e) => debug!(interpreter, error = %e, "interpreter not available"),
        }
    }
    vec![]
}

fn optional_string(module: &PyModule, attr: &str, file_name: &str) -> Result<Option<String>> {
    let Some(value) = optional_attr(module, attr) else {
        return Ok(None);
    };
    value.extract::<String>().map(Some).map_err(|_| {
        invalid(file_name, format!("{} must be a string, got {}", attr, type_name(value)))
    })
}

fn optional_tags(module: &PyModule, file_name: &str) -> Result<Vec<String>> {
    let Some(value) = optional_attr(module, "TAGS") else {
        return Ok(vec![]);
    };
    // extract::<Vec<_>> refuses a bare str, so TAGS = "x" is rejected too
    value.extract::<Vec<String>>().map_err(|_| {
        invalid(
            file_name,
            format!("TAGS must be a list of strings, got {}", type_name(value)),
        )
    })
}

fn entry_point(py: Python<'_>, module: &PyModule, file_name: &str) -> Result<EntryPoint> {
    let main = match module.getattr("main") {
        Ok(main) if main.is_callable() => main,
        _ => return Ok(EntryPoint::Missing),
    };

    match parameter_count(py, main) {
        None | Some(0) => Ok(EntryPoint::Plain(main.into())),
        Some(1) => Ok(EntryPoint::WithContext(main.into())),
        Some(n) => Err(invalid(
            file_name,
            format!("main() takes {} parameters, expected zero or one", n),
        )),
    }
}

/// Parameter count from `inspect.signature`, `None` when unavailable
fn parameter_count(py: Python<'_>, callable: &PyAny) -> Option<usize> {
    let inspect = py.import("inspect").ok()?;
    let signature = inspect.call_method1("signature", (callable,)).ok()?;
    signature.getattr("parameters").ok()?.len().ok()
}

fn optional_attr<'py>(module: &'py PyModule, attr: &str) -> Option<&'py PyAny> {
    match module.getattr(attr) {
        Ok(value) if !value.is_none() => Some(value),
        _ => None,
    }
}

fn type_name(value: &PyAny) -> String {
    value
        .get_type()
        .name()
        .map(str::to_string)
        .unwrap_or_else(|_| "unknown".to_string())
}

fn invalid(file_name: &str, reason: String) -> LauncherError {
    LauncherError::InvalidScript {
        file_name: file_name.to_string(),
        reason,
    }
}

fn is_clean_exit(py: Python<'_>, err: &PyErr) -> bool {
    if !err.is_instance_of::<PySystemExit>(py) {
        return false;
    }
    match err.value(py).getattr("code") {
        Ok(code) => code.is_none() || code.extract::<i64>().map(|c| c == 0).unwrap_or(false),
        Err(_) => false,
    }
}

/// Traceback (when there is one) followed by `Type: message`
fn describe_exception(py: Python<'_>, err: &PyErr) -> String {
    let traceback = err
        .traceback(py)
        .and_then(|tb| tb.format().ok())
        .unwrap_or_default();
    format!("{}{}", traceback, err).trim_end().to_string()
}
