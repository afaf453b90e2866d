//! Seams to the hosting application: option storage, the incoming request,
//! the response renderer and the background updater.
//!
//! Plain implementations live here too so the registry can be driven from a
//! CLI or a test without a real host.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::nonce::NonceSigner;

// ── Storage ──

/// Durable key-value option storage.
pub trait OptionStore {
    fn load(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>>;
    fn store(&mut self, key: &str, value: serde_json::Value) -> anyhow::Result<()>;
    fn delete(&mut self, key: &str) -> anyhow::Result<()>;
}

/// In-memory option store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    options: BTreeMap<String, serde_json::Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }
}

impl OptionStore for MemoryStore {
    fn load(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
        Ok(self.options.get(key).cloned())
    }

    fn store(&mut self, key: &str, value: serde_json::Value) -> anyhow::Result<()> {
        self.options.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> anyhow::Result<()> {
        self.options.remove(key);
        Ok(())
    }
}

// ── Request ──

/// Read-only view of the current request and actor.
pub trait RequestContext {
    /// Query or form parameter, if present.
    fn param(&self, name: &str) -> Option<String>;
    fn verify_nonce(&self, token: &str, action: &str) -> bool;
    fn current_user_can(&self, capability: &str) -> bool;
}

/// Request built from explicit parameters and capabilities.
#[derive(Debug, Clone, Default)]
pub struct StaticRequest {
    params: HashMap<String, String>,
    capabilities: BTreeSet<String>,
    signer: Option<NonceSigner>,
}

impl StaticRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_capability(mut self, capability: &str) -> Self {
        self.capabilities.insert(capability.to_string());
        self
    }

    /// Verify nonces with `signer`. Without one every token is rejected.
    pub fn with_signer(mut self, signer: NonceSigner) -> Self {
        self.signer = Some(signer);
        self
    }
}

impl RequestContext for StaticRequest {
    fn param(&self, name: &str) -> Option<String> {
        self.params.get(name).cloned()
    }

    fn verify_nonce(&self, token: &str, action: &str) -> bool {
        self.signer
            .as_ref()
            .is_some_and(|s| s.verify(token, action))
    }

    fn current_user_can(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

// ── Rendering ──

/// Views the registry can ask the host to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Schema update pending; offers a control to start it.
    UpdateAvailable,
    /// Schema update running in the background.
    Updating,
    /// Schema is current.
    Updated,
    /// Stored, already sanitized HTML for a custom notice.
    Custom { id: String, html: String },
}

impl View {
    /// Template name the host resolves the view to.
    pub fn template(&self) -> &'static str {
        match self {
            View::UpdateAvailable => "html-notice-update",
            View::Updating => "html-notice-updating",
            View::Updated => "html-notice-updated",
            View::Custom { .. } => "html-notice-custom",
        }
    }
}

/// Response-side collaborator.
pub trait NoticeRenderer {
    /// Queue a stylesheet. Repeated handles must be harmless.
    fn enqueue_style(&mut self, handle: &str);
    fn render(&mut self, view: View);
}

/// Renderer that records everything it is given.
#[derive(Debug, Clone, Default)]
pub struct BufferRenderer {
    pub styles: Vec<String>,
    pub views: Vec<View>,
}

impl BufferRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NoticeRenderer for BufferRenderer {
    fn enqueue_style(&mut self, handle: &str) {
        if !self.styles.iter().any(|s| s == handle) {
            self.styles.push(handle.to_string());
        }
    }

    fn render(&mut self, view: View) {
        self.views.push(view);
    }
}

// ── Background job ──

/// Schema update job running outside the request.
pub trait BackgroundUpdater {
    fn is_updating(&self) -> bool;
}

/// Updater whose state is fixed up front.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedUpdater(pub bool);

impl BackgroundUpdater for FixedUpdater {
    fn is_updating(&self) -> bool {
        self.0
    }
}
