use serde::{Deserialize, Deserializer, Serialize};

/// Option key holding the active notice list.
pub const NOTICES_OPTION: &str = "everest_forms_admin_notices";

/// Option key prefix for custom notice HTML: `<prefix><notice id>`.
pub const CUSTOM_NOTICE_PREFIX: &str = "everest_forms_admin_notice_";

/// Option key holding the installed schema version.
pub const DB_VERSION_OPTION: &str = "everest_forms_db_version";

/// Capability required to view and manage notices.
pub const MANAGE_CAPABILITY: &str = "manage_everest_forms";

/// Nonce action the dismiss link is signed for.
pub const HIDE_NOTICES_NONCE_ACTION: &str = "everest_forms_hide_notices_nonce";

/// Stylesheet enqueued whenever at least one notice is active.
pub const ACTIVATION_STYLE: &str = "everest-forms-activation";

/// Request parameter names read by the registry.
pub mod param {
    pub const HIDE_NOTICE: &str = "evf-hide-notice";
    pub const NOTICE_NONCE: &str = "_evf_notice_nonce";
    pub const DO_UPDATE: &str = "do_update_everest_forms";
    pub const PAGE: &str = "page";
    pub const TAB: &str = "tab";
    pub const FORM_ID: &str = "form_id";
    pub const CREATE_FORM: &str = "create-form";
}

/// Substring that marks a page or notice source as belonging to this plugin.
pub const PLUGIN_PAGE_MARKER: &str = "evf-";
pub const PLUGIN_SOURCE_MARKER: &str = "evf_";
pub const BUILDER_PAGE: &str = "evf-builder";

/// Notice ids with a built-in renderer.
pub const UPDATE_NOTICE: &str = "update";

/// Built-in renderers keyed by notice id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreNotice {
    Update,
}

impl CoreNotice {
    /// Look up the built-in renderer for a notice id.
    pub fn lookup(id: &str) -> Option<Self> {
        match id {
            UPDATE_NOTICE => Some(CoreNotice::Update),
            _ => None,
        }
    }
}

/// Option key for a custom notice's stored HTML.
pub fn custom_notice_key(id: &str) -> String {
    format!("{CUSTOM_NOTICE_PREFIX}{id}")
}

/// Deduplicated set of active notice ids.
///
/// Insertion order is kept so rendering is deterministic; equality ignores it.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct NoticeSet {
    ids: Vec<String>,
}

impl NoticeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `id`. Returns false if it was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    /// Remove `id`. Returns false if it was absent.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|n| n != id);
        self.ids.len() != before
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|n| n == id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Build from a stored value. Non-string entries are skipped and
    /// duplicates collapsed; anything other than an array or object yields
    /// an empty set.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let mut set = Self::new();
        let items: Vec<&serde_json::Value> = match value {
            serde_json::Value::Array(arr) => arr.iter().collect(),
            // Lists with gaps in their indices are stored as index-keyed objects.
            serde_json::Value::Object(map) => map.values().collect(),
            _ => Vec::new(),
        };
        for item in items {
            if let Some(id) = item.as_str() {
                set.insert(id);
            }
        }
        set
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.ids
                .iter()
                .map(|id| serde_json::Value::String(id.clone()))
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for NoticeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ids = Vec::<String>::deserialize(deserializer)?;
        Ok(ids.iter().map(String::as_str).collect())
    }
}

impl PartialEq for NoticeSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|id| other.contains(id))
    }
}

impl Eq for NoticeSet {}

impl<'a> FromIterator<&'a str> for NoticeSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// How a notice callback was registered at a hook point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Anonymous inline function.
    Closure,
    /// Method bound to an object of the given type.
    Method { receiver_type: String },
    /// Free function or static callable.
    Function,
}

/// A notice-rendering callback registered by some component, as seen by the
/// suppression stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeSource {
    /// Hook point the source renders at (e.g. `admin_notices`).
    pub hook: String,
    pub priority: i32,
    /// Identifying name of the callback.
    pub name: String,
    pub kind: SourceKind,
}

impl NoticeSource {
    pub fn function(hook: &str, priority: i32, name: &str) -> Self {
        Self {
            hook: hook.to_string(),
            priority,
            name: name.to_string(),
            kind: SourceKind::Function,
        }
    }

    pub fn method(hook: &str, priority: i32, name: &str, receiver_type: &str) -> Self {
        Self {
            hook: hook.to_string(),
            priority,
            name: name.to_string(),
            kind: SourceKind::Method {
                receiver_type: receiver_type.to_string(),
            },
        }
    }

    pub fn closure(hook: &str, priority: i32, name: &str) -> Self {
        Self {
            hook: hook.to_string(),
            priority,
            name: name.to_string(),
            kind: SourceKind::Closure,
        }
    }
}

/// Hook points whose sources are subject to suppression.
pub const NOTICE_HOOKS: [&str; 3] = ["user_admin_notices", "admin_notices", "all_admin_notices"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut set = NoticeSet::new();
        assert!(set.insert("update"));
        assert!(!set.insert("update"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn equality_ignores_order() {
        let a: NoticeSet = ["a", "b", "c"].into_iter().collect();
        let b: NoticeSet = ["c", "a", "b"].into_iter().collect();
        assert_eq!(a, b);
        let c: NoticeSet = ["a", "b"].into_iter().collect();
        assert_ne!(a, c);
    }

    #[test]
    fn from_value_accepts_sparse_object() {
        let v = serde_json::json!({"0": "update", "2": "welcome", "3": 7});
        let set = NoticeSet::from_value(&v);
        assert!(set.contains("update"));
        assert!(set.contains("welcome"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn from_value_collapses_duplicates() {
        let v = serde_json::json!(["a", "a", "b"]);
        assert_eq!(NoticeSet::from_value(&v).len(), 2);
    }

    #[test]
    fn from_value_non_collection_is_empty() {
        assert!(NoticeSet::from_value(&serde_json::json!("update")).is_empty());
        assert!(NoticeSet::from_value(&serde_json::Value::Null).is_empty());
    }

    #[test]
    fn serializes_as_plain_array() {
        let set: NoticeSet = ["update", "x"].into_iter().collect();
        assert_eq!(
            serde_json::to_string(&set).unwrap(),
            r#"["update","x"]"#
        );
        assert_eq!(set.to_value(), serde_json::json!(["update", "x"]));
    }

    #[test]
    fn deserialize_collapses_duplicates() {
        let set: NoticeSet = serde_json::from_str(r#"["a","a","b"]"#).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set, ["a", "b"].into_iter().collect::<NoticeSet>());
    }

    #[test]
    fn core_notice_lookup() {
        assert_eq!(CoreNotice::lookup("update"), Some(CoreNotice::Update));
        assert_eq!(CoreNotice::lookup("welcome"), None);
        assert_eq!(custom_notice_key("welcome"), "everest_forms_admin_notice_welcome");
    }
}
