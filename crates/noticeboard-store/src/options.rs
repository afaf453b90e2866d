use std::path::{Path, PathBuf};

use anyhow::Context;
use noticeboard_core::OptionStore;
use tracing::debug;

use crate::write_atomic;

type OptionMap = serde_json::Map<String, serde_json::Value>;

/// Option store backed by a single JSON object on disk.
///
/// The file is read once on open. Every `store`/`delete` rewrites it
/// atomically, so a crash never leaves a half-written file behind.
#[derive(Debug)]
pub struct JsonOptionStore {
    path: PathBuf,
    options: OptionMap,
}

impl JsonOptionStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let options = read_options(&path)?;
        debug!(path = %path.display(), count = options.len(), "opened option store");
        Ok(Self { path, options })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }

    fn persist(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.options)?;
        write_atomic(&self.path, json.as_bytes())
            .with_context(|| format!("writing options: {}", self.path.display()))
    }
}

impl OptionStore for JsonOptionStore {
    fn load(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
        Ok(self.options.get(key).cloned())
    }

    fn store(&mut self, key: &str, value: serde_json::Value) -> anyhow::Result<()> {
        if self.options.get(key) == Some(&value) {
            return Ok(());
        }
        self.options.insert(key.to_string(), value);
        self.persist()
    }

    fn delete(&mut self, key: &str) -> anyhow::Result<()> {
        if self.options.remove(key).is_none() {
            return Ok(());
        }
        self.persist()
    }
}

fn read_options(path: &Path) -> anyhow::Result<OptionMap> {
    if !path.exists() {
        return Ok(OptionMap::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading options: {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(OptionMap::new());
    }
    let val: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("parsing options: {}", path.display()))?;
    match val {
        serde_json::Value::Object(map) => Ok(map),
        _ => anyhow::bail!("options file is not a JSON object: {}", path.display()),
    }
}
