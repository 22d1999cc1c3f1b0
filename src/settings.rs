//! Persisted preferences and per-script run counters
//!
//! The settings file is a small JSON object, re-read before every query and
//! rewritten after every mutation. Writes go through a temporary file and a
//! rename, and every read-modify-write cycle holds an exclusive lock on a
//! `<settings>.lock` sidecar so concurrent launchers cannot lose updates.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::ser::{Formatter, PrettyFormatter, Serializer};
use tracing::{debug, warn};

use crate::error::{LauncherError, Result};

/// The on-disk settings document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsRecord {
    /// Exit the launcher after a script ran successfully
    #[serde(default)]
    pub close_on_run: bool,
    /// Successful runs per script file name
    #[serde(default)]
    pub run_count: BTreeMap<String, u64>,
    /// Keys this version does not know about, written back untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Handle to the settings file, opened once at startup
pub struct SettingsStore {
    path: PathBuf,
    lock: RwLock<File>,
}

impl SettingsStore {
    /// Open the store, creating a default settings file if none exists yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(sidecar(&path, ".lock"))?;

        let mut store = Self {
            path,
            lock: RwLock::new(lock_file),
        };

        if !store.path.exists() {
            let _guard = store.lock.write()?;
            if !store.path.exists() {
                write_atomic(&store.path, &SettingsRecord::default())?;
                debug!(path = %store.path.display(), "created default settings file");
            }
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the settings file
    pub fn load(&self) -> Result<SettingsRecord> {
        read_record(&self.path)
    }

    /// Like [`load`](Self::load), but a corrupt file yields the default record
    pub fn load_or_default(&self) -> SettingsRecord {
        read_or_default(&self.path)
    }

    /// Overwrite the settings file with `record`. Returns false on failure.
    pub fn save(&mut self, record: &SettingsRecord) -> bool {
        let _guard = match self.lock.write() {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!(error = %e, "settings lock unavailable, writing unlocked");
                None
            }
        };
        persist(&self.path, record)
    }

    /// Stored run count for `file_name`, initialising it to zero if absent
    pub fn run_count(&mut self, file_name: &str) -> u64 {
        self.modify(|record| *record.run_count.entry(file_name.to_string()).or_insert(0))
    }

    /// Run counts for several scripts, initialising missing ones in one write
    pub fn run_counts<'a>(
        &mut self,
        file_names: impl IntoIterator<Item = &'a str>,
    ) -> BTreeMap<String, u64> {
        self.modify(|record| {
            file_names
                .into_iter()
                .map(|name| {
                    let count = *record.run_count.entry(name.to_string()).or_insert(0);
                    (name.to_string(), count)
                })
                .collect()
        })
    }

    /// Bump the run count for `file_name` and return the new value
    pub fn increment_run_count(&mut self, file_name: &str) -> u64 {
        self.modify(|record| {
            let count = record.run_count.entry(file_name.to_string()).or_insert(0);
            *count = count.saturating_add(1);
            *count
        })
    }

    pub fn reset_run_count(&mut self, file_name: &str) {
        self.modify(|record| {
            record.run_count.insert(file_name.to_string(), 0);
        })
    }

    pub fn close_on_run(&self) -> bool {
        self.load_or_default().close_on_run
    }

    pub fn set_close_on_run(&mut self, value: bool) {
        self.modify(|record| record.close_on_run = value)
    }

    /// Release the lock file handle
    pub fn close(self) {
        debug!(path = %self.path.display(), "settings store closed");
    }

    /// Locked read-modify-write; the file is only rewritten if `apply`
    /// changed the record
    fn modify<T>(&mut self, apply: impl FnOnce(&mut SettingsRecord) -> T) -> T {
        let _guard = match self.lock.write() {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!(error = %e, "settings lock unavailable, updating unlocked");
                None
            }
        };

        let Some(before) = read_for_update(&self.path) else {
            // Unreadable but possibly intact: answer from defaults, keep the file
            return apply(&mut SettingsRecord::default());
        };
        let mut record = before.clone();
        let value = apply(&mut record);

        if record != before {
            persist(&self.path, &record);
        }

        value
    }
}

fn read_record(path: &Path) -> Result<SettingsRecord> {
    let raw = fs::read(path)?;
    serde_json::from_slice(&raw).map_err(|source| LauncherError::CorruptSettings {
        path: path.to_path_buf(),
        source,
    })
}

fn read_or_default(path: &Path) -> SettingsRecord {
    match read_record(path) {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "using default settings");
            SettingsRecord::default()
        }
    }
}

/// The record to base a mutation on. A missing or corrupt file starts over
/// from defaults; any other read failure yields `None` so nothing is written.
fn read_for_update(path: &Path) -> Option<SettingsRecord> {
    match read_record(path) {
        Ok(record) => Some(record),
        Err(e @ LauncherError::CorruptSettings { .. }) => {
            warn!(error = %e, "replacing corrupt settings");
            Some(SettingsRecord::default())
        }
        Err(LauncherError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "settings file missing, recreating");
            Some(SettingsRecord::default())
        }
        Err(e) => {
            warn!(error = %e, "settings unreadable, leaving file untouched");
            None
        }
    }
}

fn persist(path: &Path, record: &SettingsRecord) -> bool {
    match write_atomic(path, record) {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to write settings");
            false
        }
    }
}

/// Same bytes as Python's `json.dump(indent=4, sort_keys=True)`: four-space
/// indent, every object's keys sorted, ASCII-only, no trailing newline
fn to_json(record: &SettingsRecord) -> serde_json::Result<Vec<u8>> {
    // Going through Value sorts flattened extra keys among the known ones
    let document = serde_json::to_value(record)?;
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, AsciiFormatter::new());
    document.serialize(&mut ser)?;
    Ok(buf)
}

/// Pretty printer that writes DEL and non-ASCII characters as `\uXXXX`
/// escapes, using surrogate pairs outside the BMP
struct AsciiFormatter(PrettyFormatter<'static>);

impl AsciiFormatter {
    fn new() -> Self {
        Self(PrettyFormatter::with_indent(b"    "))
    }
}

impl Formatter for AsciiFormatter {
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_array(writer)
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object(writer)
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.0.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() && ch != '\x7f' {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

fn write_atomic(path: &Path, record: &SettingsRecord) -> Result<()> {
    let json = to_json(record).map_err(io::Error::other)?;
    let tmp_path = sidecar(path, ".tmp");

    let mut file = File::create(&tmp_path)?;
    file.write_all(&json)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
