use std::path::Path;

use noticeboard_store::{NoticeConfig, NoticeboardPaths};
use sha2::{Digest, Sha256};

pub fn execute(cwd: &Path) -> anyhow::Result<()> {
    let paths = NoticeboardPaths::discover(cwd);

    if paths.is_initialized() && paths.config_json.exists() {
        println!("Already initialized at {}", paths.dir.display());
        return Ok(());
    }

    paths.ensure_layout()?;
    let config = NoticeConfig {
        nonce_secret: generate_secret(cwd),
        ..NoticeConfig::default()
    };
    config.save(&paths)?;

    println!("Initialized noticeboard at {}", paths.dir.display());
    Ok(())
}

/// Derive a per-site nonce secret from the path, clock and process id.
fn generate_secret(cwd: &Path) -> String {
    let now = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    let mut hasher = Sha256::new();
    hasher.update(cwd.to_string_lossy().as_bytes());
    hasher.update(now.to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    hex::encode(hasher.finalize())
}
