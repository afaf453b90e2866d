use clap::Subcommand;
use noticeboard_store::{NoticeConfig, NoticeboardPaths, StoreLock};
use std::path::Path;

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value
    Set {
        /// Config key (e.g. target_version)
        key: String,
        /// Config value (true/false/number/string, or a JSON array)
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, cwd: &Path) -> anyhow::Result<()> {
    let paths = site_paths(cwd)?;
    match cmd {
        ConfigCmd::Set { key, value } => set(&paths, &key, &value),
        ConfigCmd::Get { key } => get(&paths, &key),
        ConfigCmd::List => list(&paths),
    }
}

// ── Command Implementations ──

fn site_paths(cwd: &Path) -> anyhow::Result<NoticeboardPaths> {
    match NoticeboardPaths::find_root(cwd) {
        Some(root) => Ok(NoticeboardPaths::discover(root)),
        None => anyhow::bail!("No .noticeboard/ store found. Run `noticeboard init` first."),
    }
}

fn config_map(config: &NoticeConfig) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
    match serde_json::to_value(config)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}

/// Parse a string value into an appropriate JSON value (bool/number/array/string).
fn parse_value(s: &str) -> serde_json::Value {
    match s {
        "true" => serde_json::Value::Bool(true),
        "false" => serde_json::Value::Bool(false),
        _ if s.starts_with('[') => serde_json::from_str(s)
            .unwrap_or_else(|_| serde_json::Value::String(s.to_string())),
        _ => {
            if let Ok(n) = s.parse::<i64>() {
                serde_json::Value::Number(n.into())
            } else {
                serde_json::Value::String(s.to_string())
            }
        }
    }
}

/// `noticeboard config set <key> <value>`
///
/// The result must still deserialize as a config, so unknown keys and values
/// of the wrong type are rejected.
pub fn set(paths: &NoticeboardPaths, key: &str, value: &str) -> anyhow::Result<()> {
    let _lock = StoreLock::acquire(paths)?;
    let current = NoticeConfig::load(paths);
    let mut map = config_map(&current)?;
    if !map.contains_key(key) {
        anyhow::bail!("unknown config key: {key}");
    }
    let mut parsed = parse_value(value);
    // versions and secrets are always strings
    if matches!(map.get(key), Some(serde_json::Value::String(_))) && !parsed.is_string() {
        parsed = serde_json::Value::String(value.to_string());
    }
    map.insert(key.to_string(), parsed);
    let updated: NoticeConfig = serde_json::from_value(serde_json::Value::Object(map))
        .map_err(|e| anyhow::anyhow!("invalid value for {key}: {e}"))?;
    updated.save(paths)?;
    tracing::info!(key, "config updated");
    println!("{key} = {value}");
    Ok(())
}

/// `noticeboard config get <key>`
pub fn get(paths: &NoticeboardPaths, key: &str) -> anyhow::Result<()> {
    let map = config_map(&NoticeConfig::load(paths))?;
    match map.get(key) {
        Some(val) => println!("{val}"),
        None => println!("(not set)"),
    }
    Ok(())
}

/// `noticeboard config list`
pub fn list(paths: &NoticeboardPaths) -> anyhow::Result<()> {
    let map = config_map(&NoticeConfig::load(paths))?;
    for (k, v) in &map {
        println!("{k} = {v}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_paths() -> (tempfile::TempDir, NoticeboardPaths) {
        let tmp = tempfile::tempdir().unwrap();
        crate::cmd_init::execute(tmp.path()).unwrap();
        let paths = NoticeboardPaths::discover(tmp.path());
        (tmp, paths)
    }

    #[test]
    fn parse_value_types() {
        assert_eq!(parse_value("true"), serde_json::json!(true));
        assert_eq!(parse_value("42"), serde_json::json!(42));
        assert_eq!(parse_value("1.2.0"), serde_json::json!("1.2.0"));
        assert_eq!(parse_value(r#"["a","b"]"#), serde_json::json!(["a", "b"]));
    }

    #[test]
    fn set_updates_typed_config() {
        let (_tmp, paths) = init_paths();
        set(&paths, "target_version", "1.2.0").unwrap();
        set(&paths, "updating", "true").unwrap();
        set(&paths, "allowed_sources", r#"["jetpack_banner"]"#).unwrap();
        let cfg = NoticeConfig::load(&paths);
        assert_eq!(cfg.target_version, "1.2.0");
        assert!(cfg.updating);
        assert_eq!(cfg.allowed_sources, vec!["jetpack_banner"]);
    }

    #[test]
    fn set_coerces_numeric_version_to_string() {
        let (_tmp, paths) = init_paths();
        set(&paths, "target_version", "2").unwrap();
        assert_eq!(NoticeConfig::load(&paths).target_version, "2");
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_type() {
        let (_tmp, paths) = init_paths();
        assert!(set(&paths, "no_such_key", "x").is_err());
        assert!(set(&paths, "updating", "maybe").is_err());
    }

    #[test]
    fn set_refuses_while_store_is_locked() {
        let (_tmp, paths) = init_paths();
        let held = StoreLock::acquire(&paths).unwrap();
        assert!(set(&paths, "updating", "true").is_err());
        assert!(!NoticeConfig::load(&paths).updating);
        drop(held);
        set(&paths, "updating", "true").unwrap();
        assert!(NoticeConfig::load(&paths).updating);
    }

    #[test]
    fn run_requires_init() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(run(ConfigCmd::List, tmp.path()).is_err());
    }
}
