use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::error::NoticeError;
use crate::hooks::{HookBus, NoticeEvent};
use crate::host::{BackgroundUpdater, NoticeRenderer, OptionStore, RequestContext, View};
use crate::sanitize::{sanitize_post_html, sanitize_text_field};
use crate::types::*;
use crate::version::needs_update;

/// Points in the request lifecycle the registry wants to be called at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleHook {
    /// Request parsed: handle a dismiss link.
    Loaded,
    /// Styles printed: render active notices.
    PrintStyles,
    /// Scripts printed: drop notice sources from other components.
    PrintScripts,
    /// Request done: persist the notice set.
    Shutdown,
}

/// Hooks requested by [`NoticeRegistry::init`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitHooks {
    pub hooks: Vec<LifecycleHook>,
}

impl InitHooks {
    pub fn contains(&self, hook: LifecycleHook) -> bool {
        self.hooks.contains(&hook)
    }
}

/// What [`NoticeRegistry::render_notices`] runs for the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledRender {
    Core(CoreNotice),
    Custom,
}

/// Request-scoped notice registry.
///
/// The active set is read from the option store once at construction, changed
/// in memory, and written back by [`flush`](Self::flush). Concurrent requests
/// are not coordinated; the last flush wins.
pub struct NoticeRegistry<S: OptionStore> {
    store: S,
    notices: NoticeSet,
    capability: String,
    target_version: String,
    allowed_sources: BTreeSet<String>,
}

impl<S: OptionStore> NoticeRegistry<S> {
    /// Load the active set from `store`. A missing option means no notices.
    pub fn load(store: S, target_version: impl Into<String>) -> Result<Self, NoticeError> {
        let notices = store
            .load(NOTICES_OPTION)?
            .map(|v| NoticeSet::from_value(&v))
            .unwrap_or_default();
        debug!(count = notices.len(), "loaded notices");
        Ok(Self {
            store,
            notices,
            capability: MANAGE_CAPABILITY.to_string(),
            target_version: target_version.into(),
            allowed_sources: BTreeSet::new(),
        })
    }

    /// Load the set and decide which lifecycle hooks to register for this
    /// actor. Rendering and suppression are only wired for actors holding the
    /// manage capability.
    pub fn init(
        store: S,
        target_version: impl Into<String>,
        request: &dyn RequestContext,
    ) -> Result<(Self, InitHooks), NoticeError> {
        let registry = Self::load(store, target_version)?;
        let hooks = registry.lifecycle_hooks(request);
        Ok((registry, hooks))
    }

    /// Lifecycle hooks to register for the actor behind `request`.
    pub fn lifecycle_hooks(&self, request: &dyn RequestContext) -> InitHooks {
        let mut hooks = vec![LifecycleHook::Loaded, LifecycleHook::Shutdown];
        if request.current_user_can(&self.capability) {
            hooks.push(LifecycleHook::PrintStyles);
            hooks.push(LifecycleHook::PrintScripts);
        }
        InitHooks { hooks }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capability = capability.into();
        self
    }

    /// Notice sources that survive suppression regardless of their name.
    pub fn with_allowed_sources<I, T>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.allowed_sources = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn capability(&self) -> &str {
        &self.capability
    }

    pub fn target_version(&self) -> &str {
        &self.target_version
    }

    pub fn notices(&self) -> &NoticeSet {
        &self.notices
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Persist the active set.
    pub fn flush(&mut self) -> Result<(), NoticeError> {
        self.store.store(NOTICES_OPTION, self.notices.to_value())?;
        debug!(count = self.notices.len(), "stored notices");
        Ok(())
    }

    // ── Set operations ──

    pub fn add_notice(&mut self, name: &str) {
        if self.notices.insert(name) {
            debug!(notice = name, "notice added");
        }
    }

    /// Drop `name` from the set along with any custom HTML stored for it.
    pub fn remove_notice(&mut self, name: &str) -> Result<(), NoticeError> {
        if self.notices.remove(name) {
            debug!(notice = name, "notice removed");
        }
        self.store.delete(&custom_notice_key(name))?;
        Ok(())
    }

    pub fn has_notice(&self, name: &str) -> bool {
        self.notices.contains(name)
    }

    /// Activate `name` with caller-supplied HTML. The HTML is filtered against
    /// the post allow-list before it is stored.
    pub fn add_custom_notice(&mut self, name: &str, html: &str) -> Result<(), NoticeError> {
        self.add_notice(name);
        let clean = sanitize_post_html(html);
        self.store
            .store(&custom_notice_key(name), serde_json::Value::String(clean))?;
        Ok(())
    }

    /// Stored HTML for a custom notice, if any.
    pub fn custom_notice_html(&self, name: &str) -> Result<Option<String>, NoticeError> {
        let value = self.store.load(&custom_notice_key(name))?;
        Ok(value.and_then(|v| v.as_str().map(str::to_string)))
    }

    /// Clear the set and the custom HTML of every notice in it.
    pub fn remove_all_notices(&mut self) -> Result<(), NoticeError> {
        let ids: Vec<String> = self.notices.iter().map(str::to_string).collect();
        for id in &ids {
            self.store.delete(&custom_notice_key(id))?;
        }
        self.notices.clear();
        debug!(count = ids.len(), "all notices removed");
        Ok(())
    }

    // ── Rendering ──

    /// Decide which renderers the active set needs. Core notices vetoed by a
    /// show filter fall back to the custom renderer, which skips them.
    pub fn schedule_notices(&self, bus: &HookBus) -> Vec<ScheduledRender> {
        let mut schedule = Vec::new();
        for id in self.notices.iter() {
            let render = match CoreNotice::lookup(id) {
                Some(core) if bus.apply_show_notice(id) => ScheduledRender::Core(core),
                _ => ScheduledRender::Custom,
            };
            if !schedule.contains(&render) {
                schedule.push(render);
            }
        }
        schedule
    }

    /// Render every active notice. The activation stylesheet is queued once
    /// when anything is active.
    pub fn render_notices(
        &self,
        request: &dyn RequestContext,
        bus: &HookBus,
        updater: &dyn BackgroundUpdater,
        renderer: &mut dyn NoticeRenderer,
    ) -> Result<(), NoticeError> {
        if self.notices.is_empty() {
            return Ok(());
        }
        renderer.enqueue_style(ACTIVATION_STYLE);
        for render in self.schedule_notices(bus) {
            match render {
                ScheduledRender::Core(CoreNotice::Update) => {
                    self.render_update_notice(request, updater, renderer)?;
                }
                ScheduledRender::Custom => self.render_custom_notices(renderer)?,
            }
        }
        Ok(())
    }

    /// Render stored HTML for every active notice without a core renderer.
    /// Notices with no or empty HTML are skipped.
    pub fn render_custom_notices(
        &self,
        renderer: &mut dyn NoticeRenderer,
    ) -> Result<(), NoticeError> {
        for id in self.notices.iter() {
            if CoreNotice::lookup(id).is_some() {
                continue;
            }
            match self.custom_notice_html(id)? {
                Some(html) if !html.is_empty() => renderer.render(View::Custom {
                    id: id.to_string(),
                    html,
                }),
                _ => {}
            }
        }
        Ok(())
    }

    /// Render the schema update notice in whichever state applies.
    pub fn render_update_notice(
        &self,
        request: &dyn RequestContext,
        updater: &dyn BackgroundUpdater,
        renderer: &mut dyn NoticeRenderer,
    ) -> Result<(), NoticeError> {
        let view = self.update_view(request, updater)?;
        renderer.render(view);
        Ok(())
    }

    fn update_view(
        &self,
        request: &dyn RequestContext,
        updater: &dyn BackgroundUpdater,
    ) -> Result<View, NoticeError> {
        let stored = self.stored_db_version()?;
        if !needs_update(stored.as_deref(), &self.target_version) {
            return Ok(View::Updated);
        }
        let start_requested = request
            .param(param::DO_UPDATE)
            .is_some_and(|v| !is_empty_flag(&v));
        if updater.is_updating() || start_requested {
            Ok(View::Updating)
        } else {
            Ok(View::UpdateAvailable)
        }
    }

    /// Schema version currently recorded in the store.
    pub fn stored_db_version(&self) -> Result<Option<String>, NoticeError> {
        let value = self.store.load(DB_VERSION_OPTION)?;
        Ok(value.and_then(|v| match v {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }))
    }

    pub fn set_stored_db_version(&mut self, version: &str) -> Result<(), NoticeError> {
        self.store.store(
            DB_VERSION_OPTION,
            serde_json::Value::String(version.to_string()),
        )?;
        Ok(())
    }

    // ── Dismissal ──

    /// Handle a dismiss link carried by `request`.
    ///
    /// Returns the dismissed id, or `None` when the request carries no dismiss
    /// parameters. A bad nonce or a missing capability aborts the request.
    pub fn process_dismiss_request(
        &mut self,
        request: &dyn RequestContext,
        bus: &mut HookBus,
    ) -> Result<Option<String>, NoticeError> {
        let (Some(raw_id), Some(nonce)) = (
            request.param(param::HIDE_NOTICE),
            request.param(param::NOTICE_NONCE),
        ) else {
            return Ok(None);
        };

        if !request.verify_nonce(&nonce, HIDE_NOTICES_NONCE_ACTION) {
            warn!("dismiss rejected: nonce failed verification");
            return Err(NoticeError::InvalidNonce);
        }
        if !request.current_user_can(&self.capability) {
            warn!(capability = %self.capability, "dismiss rejected: missing capability");
            return Err(NoticeError::InsufficientPrivilege);
        }

        let id = sanitize_text_field(&raw_id);
        if id.is_empty() {
            warn!("dismiss ignored: empty notice id");
            return Ok(None);
        }
        self.remove_notice(&id)?;
        let event = NoticeEvent::Dismissed { id: id.clone() };
        let handlers = bus.emit(&event);
        info!(notice = %id, handlers, "notice dismissed");
        Ok(Some(id))
    }

    // ── Suppression ──

    /// Filter the notice sources registered by other components when showing
    /// one of this plugin's pages.
    ///
    /// Only sources at the three admin notice hook points are considered.
    /// Anonymous closures are dropped, methods on this plugin's types kept,
    /// explicitly allowed names kept, and anything else dropped unless its
    /// name carries the plugin marker. On the form builder every remaining
    /// named source is dropped.
    pub fn suppress_unrelated_notices(
        &self,
        request: &dyn RequestContext,
        sources: Vec<NoticeSource>,
    ) -> Vec<NoticeSource> {
        if !request.current_user_can(&self.capability) {
            return sources;
        }
        let page = request
            .param(param::PAGE)
            .map(|p| sanitize_text_field(&p))
            .unwrap_or_default();
        if page.is_empty() || !page.contains(PLUGIN_PAGE_MARKER) {
            return sources;
        }
        let on_builder = page == BUILDER_PAGE
            && ((request.param(param::TAB).is_some() && request.param(param::FORM_ID).is_some())
                || request.param(param::CREATE_FORM).is_some());

        let before = sources.len();
        let kept: Vec<NoticeSource> = sources
            .into_iter()
            .filter(|s| self.keep_source(s, on_builder))
            .collect();
        debug!(page = %page, dropped = before - kept.len(), "suppressed notice sources");
        kept
    }

    fn keep_source(&self, source: &NoticeSource, on_builder: bool) -> bool {
        if !NOTICE_HOOKS.contains(&source.hook.as_str()) {
            return true;
        }
        match &source.kind {
            SourceKind::Closure => return false,
            SourceKind::Method { receiver_type }
                if receiver_type
                    .to_ascii_lowercase()
                    .contains(PLUGIN_SOURCE_MARKER) =>
            {
                return true;
            }
            _ => {}
        }
        if self.allowed_sources.contains(&source.name) {
            return true;
        }
        let foreign = !source
            .name
            .to_ascii_lowercase()
            .contains(PLUGIN_SOURCE_MARKER);
        source.name.is_empty() || !(on_builder || foreign)
    }
}

/// Query flags count as unset when empty or `"0"`.
fn is_empty_flag(v: &str) -> bool {
    v.is_empty() || v == "0"
}
