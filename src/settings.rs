use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// key/value persistence scoped to a single workspace
pub trait SettingsStore {
    /// read a key; `None` when the key has never been written
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// write a key, returning only once the value is durable
    fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// settings persisted as a single JSON object on disk
pub struct JsonFileSettings {
    path: PathBuf,
}

impl JsonFileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read {}", self.path.display()));
            }
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", self.path.display()))?
        {
            Value::Object(map) => Ok(map),
            _ => bail!("{} does not contain a JSON object", self.path.display()),
        }
    }

    fn write_all(&self, map: &Map<String, Value>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;

        let content =
            serde_json::to_string_pretty(map).context("failed to serialise settings")?;

        // write to a sibling temp file and rename over the target so readers never
        // observe a half-written store
        let mut temp_file = tempfile::Builder::new()
            .prefix(".changegroups")
            .suffix(".tmp")
            .tempfile_in(dir)
            .context("failed to create temporary settings file")?;
        temp_file
            .write_all(content.as_bytes())
            .context("failed to write temporary settings file")?;
        temp_file
            .as_file()
            .sync_all()
            .context("failed to flush temporary settings file")?;
        temp_file
            .persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("failed to write {}", self.path.display()))?;

        Ok(())
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        // other keys in the file are preserved, so an unreadable file is an error
        // rather than something to overwrite
        let mut map = self.read_all()?;
        map.insert(key.to_string(), value);
        self.write_all(&map)
    }
}

/// in-memory settings for tests, optionally refusing writes
#[cfg(test)]
#[derive(Default)]
pub struct MemorySettings {
    values: std::cell::RefCell<Map<String, Value>>,
    fail_writes: std::cell::Cell<bool>,
    writes: std::cell::Cell<usize>,
}

#[cfg(test)]
impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: Value) -> Self {
        let settings = Self::default();
        settings.values.borrow_mut().insert(key.to_string(), value);
        settings
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    pub fn raw(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }
}

#[cfg(test)]
impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        if self.fail_writes.get() {
            bail!("settings store is read-only");
        }
        self.values.borrow_mut().insert(key.to_string(), value);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}
