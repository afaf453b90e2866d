use anyhow::Context;
use fs2::FileExt;
use std::fs::{File, OpenOptions};

use crate::paths::NoticeboardPaths;

/// Exclusive lock on `.noticeboard/LOCK`. Commands that touch the option
/// store or config hold it for their whole run; it is released on drop.
pub struct StoreLock {
    _file: File,
}

impl StoreLock {
    /// Try to acquire the lock without blocking. Fails when another
    /// noticeboard command is mutating the same site.
    pub fn acquire(paths: &NoticeboardPaths) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&paths.lock_file)
            .with_context(|| {
                format!(
                    "open notice store lock {} (run `noticeboard init` first?)",
                    paths.lock_file.display()
                )
            })?;

        file.try_lock_exclusive().with_context(|| {
            format!(
                "notice store at {} is busy: another noticeboard command holds {}",
                paths.root.display(),
                paths.lock_file.display()
            )
        })?;
        tracing::trace!(lock = %paths.lock_file.display(), "notice store locked");

        Ok(Self { _file: file })
    }
}
