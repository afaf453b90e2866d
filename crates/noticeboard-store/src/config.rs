use serde::{Deserialize, Serialize};

use crate::paths::NoticeboardPaths;

fn default_target_version() -> String {
    "1.0.0".to_string()
}

fn default_capability() -> String {
    noticeboard_core::MANAGE_CAPABILITY.to_string()
}

/// Site configuration, stored in `.noticeboard/config.json`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NoticeConfig {
    /// Schema version the running code expects.
    #[serde(default = "default_target_version")]
    pub target_version: String,
    /// Capability required to see and dismiss notices.
    #[serde(default = "default_capability")]
    pub capability: String,
    /// Secret dismiss-link nonces are signed with.
    #[serde(default)]
    pub nonce_secret: String,
    /// Whether a background schema update is in progress.
    #[serde(default)]
    pub updating: bool,
    /// Capabilities held by the local operator.
    #[serde(default = "default_granted")]
    pub granted_capabilities: Vec<String>,
    /// Notice sources never suppressed on plugin pages.
    #[serde(default)]
    pub allowed_sources: Vec<String>,
}

fn default_granted() -> Vec<String> {
    vec![default_capability()]
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            target_version: default_target_version(),
            capability: default_capability(),
            nonce_secret: String::new(),
            updating: false,
            granted_capabilities: default_granted(),
            allowed_sources: Vec::new(),
        }
    }
}

impl NoticeConfig {
    /// Load from `.noticeboard/config.json`.
    /// Returns defaults if the file is missing or unparseable.
    pub fn load(paths: &NoticeboardPaths) -> Self {
        let content = match std::fs::read_to_string(&paths.config_json) {
            Ok(c) => c,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&content) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unparseable config.json");
                Self::default()
            }
        }
    }

    pub fn save(&self, paths: &NoticeboardPaths) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        crate::write_atomic(&paths.config_json, json.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = NoticeboardPaths::discover(tmp.path());
        let cfg = NoticeConfig::load(&paths);
        assert_eq!(cfg, NoticeConfig::default());
        assert_eq!(cfg.capability, "manage_everest_forms");
        assert_eq!(cfg.granted_capabilities, vec!["manage_everest_forms"]);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = NoticeboardPaths::discover(tmp.path());
        paths.ensure_layout().unwrap();
        std::fs::write(&paths.config_json, r#"{"target_version":"1.2.0","updating":true}"#)
            .unwrap();
        let cfg = NoticeConfig::load(&paths);
        assert_eq!(cfg.target_version, "1.2.0");
        assert!(cfg.updating);
        assert_eq!(cfg.capability, "manage_everest_forms");
    }

    #[test]
    fn garbage_file_yields_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = NoticeboardPaths::discover(tmp.path());
        paths.ensure_layout().unwrap();
        std::fs::write(&paths.config_json, "not json").unwrap();
        assert_eq!(NoticeConfig::load(&paths), NoticeConfig::default());
    }

    #[test]
    fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = NoticeboardPaths::discover(tmp.path());
        let cfg = NoticeConfig {
            nonce_secret: "s3cret".into(),
            allowed_sources: vec!["jetpack_banner".into()],
            ..NoticeConfig::default()
        };
        cfg.save(&paths).unwrap();
        assert_eq!(NoticeConfig::load(&paths), cfg);
    }
}
