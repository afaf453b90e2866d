use std::path::{Path, PathBuf};

/// All well-known paths under `.noticeboard/`.
#[derive(Debug, Clone)]
pub struct NoticeboardPaths {
    pub root: PathBuf,
    pub dir: PathBuf,
    pub options_json: PathBuf,
    pub config_json: PathBuf,
    pub lock_file: PathBuf,
}

impl NoticeboardPaths {
    /// Derive all paths from a site root. Pure computation, no I/O.
    pub fn discover(site_root: impl Into<PathBuf>) -> Self {
        let root = site_root.into();
        let dir = root.join(".noticeboard");
        Self {
            options_json: dir.join("options.json"),
            config_json: dir.join("config.json"),
            lock_file: dir.join("LOCK"),
            dir,
            root,
        }
    }

    /// Create the `.noticeboard/` directory. Idempotent.
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.dir.is_dir()
    }

    /// Walk up from `start` looking for a directory containing `.noticeboard/`.
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        let mut cur = start.to_path_buf();
        loop {
            if cur.join(".noticeboard").is_dir() {
                return Some(cur);
            }
            if !cur.pop() {
                return None;
            }
        }
    }
}
