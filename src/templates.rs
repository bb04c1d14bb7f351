use std::{path::Path, sync::Arc};

use anyhow::Context as _;
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use tracing as log;

use crate::AppContext;

pub fn load(dir: &Path) -> anyhow::Result<tera::Tera> {
    let glob = dir.join("**").join("*.html");
    let glob = glob.to_str().context("templates path isn't valid utf-8")?;
    let templates = tera::Tera::new(glob).context("when loading templates")?;
    log::debug!(
        "loaded {} templates from {dir:?}",
        templates.get_template_names().count()
    );
    Ok(templates)
}

/// Reloads all the templates whenever something changes in the templates directory. Reloading
/// stops when the returned watcher is dropped.
pub fn watch(ctx: Arc<AppContext>) -> anyhow::Result<RecommendedWatcher> {
    let dir = ctx.config.templates_dir.clone();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let event = match res {
            Ok(event) => event,
            Err(err) => {
                log::error!("error when watching templates: {err}");
                return;
            }
        };

        if event.kind.is_access() {
            return;
        }

        log::debug!("templates changed ({:?}), reloading", event.paths);
        let mut templates = match ctx.templates.write() {
            Ok(templates) => templates,
            Err(err) => {
                log::error!("unable to lock templates for reload: {err}");
                return;
            }
        };
        if let Err(err) = templates.full_reload() {
            log::error!("unable to reload templates: {err}");
        }
    })?;

    watcher
        .watch(&dir, RecursiveMode::Recursive)
        .with_context(|| format!("when watching templates in {dir:?}"))?;

    Ok(watcher)
}
