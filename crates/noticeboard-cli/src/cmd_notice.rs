use std::path::Path;

use noticeboard_core::{
    HookBus, InitHooks, NonceSigner, NoticeRegistry, StaticRequest, HIDE_NOTICES_NONCE_ACTION,
};
use noticeboard_store::{JsonOptionStore, NoticeConfig, NoticeboardPaths, StoreLock};

// ── Site handle ──

/// Store, config and registry for the site containing `cwd`.
pub struct Site {
    pub config: NoticeConfig,
    pub registry: NoticeRegistry<JsonOptionStore>,
    /// Lifecycle hooks the registry asked for, given the local operator.
    pub hooks: InitHooks,
    _lock: StoreLock,
}

impl Site {
    pub fn open(cwd: &Path) -> anyhow::Result<Self> {
        let Some(root) = NoticeboardPaths::find_root(cwd) else {
            anyhow::bail!("No .noticeboard/ store found. Run `noticeboard init` first.");
        };
        let paths = NoticeboardPaths::discover(root);
        let lock = StoreLock::acquire(&paths)?;
        let config = NoticeConfig::load(&paths);
        let store = JsonOptionStore::open(&paths.options_json)?;
        let registry = NoticeRegistry::load(store, config.target_version.clone())?
            .with_capability(config.capability.clone())
            .with_allowed_sources(config.allowed_sources.clone());
        let hooks = registry.lifecycle_hooks(&operator_request(&config));
        tracing::debug!(root = %paths.root.display(), hooks = ?hooks.hooks, "opened site");
        Ok(Self {
            config,
            registry,
            hooks,
            _lock: lock,
        })
    }

    /// Request made by the local operator.
    pub fn operator_request(&self) -> StaticRequest {
        operator_request(&self.config)
    }

    pub fn signer(&self) -> NonceSigner {
        NonceSigner::new(self.config.nonce_secret.clone())
    }
}

fn operator_request(config: &NoticeConfig) -> StaticRequest {
    let mut req = StaticRequest::new().with_signer(NonceSigner::new(config.nonce_secret.clone()));
    for cap in &config.granted_capabilities {
        req = req.with_capability(cap);
    }
    req
}

// ── Commands ──

/// `noticeboard add <id>`
pub fn add(cwd: &Path, id: &str) -> anyhow::Result<()> {
    let mut site = Site::open(cwd)?;
    site.registry.add_notice(id);
    site.registry.flush()?;
    println!("Added notice {id}");
    Ok(())
}

/// `noticeboard add-custom <id> <html>`
pub fn add_custom(cwd: &Path, id: &str, html: &str) -> anyhow::Result<()> {
    let mut site = Site::open(cwd)?;
    site.registry.add_custom_notice(id, html)?;
    site.registry.flush()?;
    println!("Added custom notice {id}");
    Ok(())
}

/// `noticeboard remove <id>`
pub fn remove(cwd: &Path, id: &str) -> anyhow::Result<()> {
    let mut site = Site::open(cwd)?;
    if !site.registry.has_notice(id) {
        println!("Notice {id} is not active");
    }
    site.registry.remove_notice(id)?;
    site.registry.flush()?;
    Ok(())
}

/// `noticeboard clear`
pub fn clear(cwd: &Path) -> anyhow::Result<()> {
    let mut site = Site::open(cwd)?;
    let count = site.registry.notices().len();
    site.registry.remove_all_notices()?;
    site.registry.flush()?;
    println!("Removed {count} notice(s)");
    Ok(())
}

/// `noticeboard list`
pub fn list(cwd: &Path, json: bool) -> anyhow::Result<()> {
    let site = Site::open(cwd)?;
    let notices = site.registry.notices();
    if json {
        println!("{}", serde_json::to_string(notices)?);
        return Ok(());
    }
    if notices.is_empty() {
        println!("(no active notices)");
        return Ok(());
    }
    for id in notices.iter() {
        let kind = if noticeboard_core::CoreNotice::lookup(id).is_some() {
            "core"
        } else {
            "custom"
        };
        println!("{id}\t{kind}");
    }
    Ok(())
}

/// `noticeboard nonce`
pub fn nonce(cwd: &Path) -> anyhow::Result<()> {
    let site = Site::open(cwd)?;
    if site.config.nonce_secret.is_empty() {
        anyhow::bail!("No nonce secret configured. Run `noticeboard config set nonce_secret <value>`.");
    }
    println!("{}", site.signer().create(HIDE_NOTICES_NONCE_ACTION));
    Ok(())
}

/// `noticeboard dismiss <id> --nonce <token>`
pub fn dismiss(cwd: &Path, id: &str, nonce: &str) -> anyhow::Result<()> {
    let mut site = Site::open(cwd)?;
    let request = site
        .operator_request()
        .with_param(noticeboard_core::param::HIDE_NOTICE, id)
        .with_param(noticeboard_core::param::NOTICE_NONCE, nonce);
    let mut bus = HookBus::new();
    bus.subscribe(noticeboard_core::hooks::DEFAULT_PRIORITY, |event| {
        println!("{}", event.legacy_hook_name());
    });

    let dismissed = site
        .registry
        .process_dismiss_request(&request, &mut bus)
        .inspect_err(|e| tracing::warn!(notice = id, error = %e, "dismiss rejected"))?;
    site.registry.flush()?;
    match dismissed {
        Some(id) => println!("Dismissed {id}"),
        None => println!("Nothing to dismiss"),
    }
    Ok(())
}

/// `noticeboard db-version [<version>]`
pub fn db_version(cwd: &Path, version: Option<&str>) -> anyhow::Result<()> {
    let mut site = Site::open(cwd)?;
    match version {
        Some(v) => {
            site.registry.set_stored_db_version(v)?;
            println!("db version = {v}");
        }
        None => match site.registry.stored_db_version()? {
            Some(v) => println!("{v} (target {})", site.registry.target_version()),
            None => println!("(not set, target {})", site.registry.target_version()),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_site() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        crate::cmd_init::execute(tmp.path()).unwrap();
        tmp
    }

    #[test]
    fn open_requires_init() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Site::open(tmp.path()).is_err());
    }

    #[test]
    fn add_remove_persist() {
        let tmp = init_site();
        add(tmp.path(), "update").unwrap();
        add_custom(tmp.path(), "promo", "<p>hi</p>").unwrap();
        assert!(Site::open(tmp.path()).unwrap().registry.has_notice("promo"));

        remove(tmp.path(), "promo").unwrap();
        let site = Site::open(tmp.path()).unwrap();
        assert!(!site.registry.has_notice("promo"));
        assert!(site.registry.has_notice("update"));
        assert!(site.registry.custom_notice_html("promo").unwrap().is_none());
    }

    #[test]
    fn dismiss_with_minted_nonce() {
        let tmp = init_site();
        add(tmp.path(), "update").unwrap();
        let token = {
            let site = Site::open(tmp.path()).unwrap();
            site.signer().create(HIDE_NOTICES_NONCE_ACTION)
        };
        dismiss(tmp.path(), "update", &token).unwrap();
        assert!(!Site::open(tmp.path()).unwrap().registry.has_notice("update"));
    }

    #[test]
    fn dismiss_with_bad_nonce_fails_without_change() {
        let tmp = init_site();
        add(tmp.path(), "update").unwrap();
        let err = dismiss(tmp.path(), "update", "bogus").unwrap_err();
        assert!(err.to_string().contains("Action failed"));
        assert!(Site::open(tmp.path()).unwrap().registry.has_notice("update"));
    }

    #[test]
    fn clear_removes_everything() {
        let tmp = init_site();
        add(tmp.path(), "a").unwrap();
        add(tmp.path(), "b").unwrap();
        clear(tmp.path()).unwrap();
        assert!(Site::open(tmp.path()).unwrap().registry.notices().is_empty());
    }
}
