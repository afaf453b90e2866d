use std::path::Path;

use noticeboard_core::{BufferRenderer, FixedUpdater, HookBus, LifecycleHook, NoticeSource, View};

use crate::cmd_notice::Site;

/// `noticeboard render [--page P] [--param k=v]... [--source SOURCE]...`
///
/// Runs one admin request through the registry's lifecycle hooks in order and
/// prints what would reach the page.
pub fn execute(
    cwd: &Path,
    page: Option<&str>,
    params: &[String],
    sources: &[String],
) -> anyhow::Result<()> {
    let mut site = Site::open(cwd)?;
    let mut request = site.operator_request();
    if let Some(page) = page {
        request = request.with_param(noticeboard_core::param::PAGE, page);
    }
    for kv in params {
        let (k, v) = kv
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("--param expects key=value, got {kv:?}"))?;
        request = request.with_param(k, v);
    }
    let sources = sources
        .iter()
        .map(|s| parse_source(s))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut bus = HookBus::new();
    let updater = FixedUpdater(site.config.updating);
    let mut out = BufferRenderer::new();
    let mut kept_sources = sources.clone();

    for hook in [
        LifecycleHook::Loaded,
        LifecycleHook::PrintStyles,
        LifecycleHook::PrintScripts,
        LifecycleHook::Shutdown,
    ] {
        if !site.hooks.contains(hook) {
            continue;
        }
        match hook {
            LifecycleHook::Loaded => {
                if let Some(id) = site.registry.process_dismiss_request(&request, &mut bus)? {
                    println!("dismissed: {id}");
                }
            }
            LifecycleHook::PrintStyles => {
                site.registry
                    .render_notices(&request, &bus, &updater, &mut out)?;
            }
            LifecycleHook::PrintScripts => {
                kept_sources = site
                    .registry
                    .suppress_unrelated_notices(&request, kept_sources);
            }
            LifecycleHook::Shutdown => site.registry.flush()?,
        }
    }

    print_output(&out, &sources, &kept_sources);
    Ok(())
}

fn print_output(out: &BufferRenderer, sources: &[NoticeSource], kept: &[NoticeSource]) {
    for style in &out.styles {
        println!("style: {style}");
    }
    if out.views.is_empty() {
        println!("(no notices rendered)");
    }
    for view in &out.views {
        match view {
            View::Custom { id, html } => println!("[{}] {id}: {html}", view.template()),
            _ => println!("[{}]", view.template()),
        }
    }
    for source in sources {
        let verdict = if kept.contains(source) { "keep" } else { "drop" };
        println!("{verdict}: {}:{}", source.hook, source.name);
    }
}

/// Parse `hook:name`, `hook:name@Type` or `hook:{closure}`.
fn parse_source(spec: &str) -> anyhow::Result<NoticeSource> {
    let (hook, rest) = spec
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("--source expects hook:name, got {spec:?}"))?;
    if rest == "{closure}" {
        return Ok(NoticeSource::closure(hook, 10, rest));
    }
    Ok(match rest.split_once('@') {
        Some((name, receiver)) => NoticeSource::method(hook, 10, name, receiver),
        None => NoticeSource::function(hook, 10, rest),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use noticeboard_core::SourceKind;

    #[test]
    fn parse_source_forms() {
        let s = parse_source("admin_notices:nag").unwrap();
        assert_eq!(s.kind, SourceKind::Function);
        assert_eq!(s.hook, "admin_notices");

        let s = parse_source("admin_notices:output@EVF_Admin").unwrap();
        assert_eq!(
            s.kind,
            SourceKind::Method {
                receiver_type: "EVF_Admin".into()
            }
        );
        assert_eq!(s.name, "output");

        let s = parse_source("all_admin_notices:{closure}").unwrap();
        assert_eq!(s.kind, SourceKind::Closure);

        assert!(parse_source("nohook").is_err());
    }

    #[test]
    fn render_runs_full_lifecycle() {
        let tmp = tempfile::tempdir().unwrap();
        crate::cmd_init::execute(tmp.path()).unwrap();
        crate::cmd_notice::add(tmp.path(), "update").unwrap();
        execute(tmp.path(), Some("evf-settings"), &[], &["admin_notices:nag".into()]).unwrap();
        assert!(Site::open(tmp.path()).unwrap().registry.has_notice("update"));
    }

    #[test]
    fn render_rejects_malformed_param() {
        let tmp = tempfile::tempdir().unwrap();
        crate::cmd_init::execute(tmp.path()).unwrap();
        assert!(execute(tmp.path(), None, &["novalue".into()], &[]).is_err());
    }
}
