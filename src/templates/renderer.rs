use minijinja::{path_loader, Environment};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::assets::{AssetRegistrar, RegisterMode};

/// Handle and path of the client-side templating runtime that inline
/// templates need for browser-side compilation.
pub const CLIENT_RUNTIME_HANDLE: &str = "force-refresh-handlebars";
pub const CLIENT_RUNTIME_PATH: &str = "/dist/js/handlebars.runtime.js";

/// Inline templates are embedded under this type so browsers never execute
/// them as script.
pub const INLINE_TEMPLATE_MIME: &str = "text/x-handlebars-template";

struct Engine {
    env: Environment<'static>,
    dir: PathBuf,
}

impl Engine {
    fn build(dir: &Path) -> Self {
        let mut env = Environment::new();
        env.set_loader(path_loader(dir.to_path_buf()));
        Engine {
            env,
            dir: dir.to_path_buf(),
        }
    }
}

/// Server-side template renderer bound to a template directory.
///
/// The compiled environment is owned by this instance and rebuilt only when
/// a render targets a directory other than the one currently bound (install
/// paths can vary between sites). Partials follow the `partial-` filename
/// prefix convention and are pulled in with `{% include %}`.
///
/// A missing template logs an error and renders nothing; callers never see
/// an error.
pub struct Renderer {
    theme_directory_uri: String,
    engine: RwLock<Option<Engine>>,
    builds: AtomicUsize,
}

impl Renderer {
    pub fn new(theme_directory_uri: impl Into<String>) -> Self {
        Renderer {
            theme_directory_uri: theme_directory_uri.into(),
            engine: RwLock::new(None),
            builds: AtomicUsize::new(0),
        }
    }

    /// Renders `name` from `dir` with the supplied context, augmented with
    /// the active theme directory URI. Returns `None` when the template is
    /// missing or fails to render.
    pub async fn render(
        &self,
        dir: &Path,
        name: &str,
        context: &serde_json::Value,
    ) -> Option<String> {
        self.ensure_engine(dir).await;
        let guard = self.engine.read().await;
        let engine = guard.as_ref()?;

        let context = self.augment(context);
        let template = match engine.env.get_template(name) {
            Ok(template) => template,
            Err(_) => {
                tracing::error!(
                    "unable to locate template: {}",
                    dir.join(name).display()
                );
                return None;
            }
        };
        match template.render(&context) {
            Ok(html) => Some(html),
            Err(err) => {
                tracing::error!("failed to render template {}: {}", name, err);
                None
            }
        }
    }

    /// Write-output mode: renders directly into `out`. Writes nothing when
    /// the template is missing.
    pub async fn render_into(
        &self,
        dir: &Path,
        name: &str,
        context: &serde_json::Value,
        out: &mut impl std::io::Write,
    ) -> std::io::Result<()> {
        if let Some(html) = self.render(dir, name, context).await {
            out.write_all(html.as_bytes())?;
        }
        Ok(())
    }

    /// Number of engine builds so far. One per directory change.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    async fn ensure_engine(&self, dir: &Path) {
        {
            let guard = self.engine.read().await;
            if let Some(engine) = guard.as_ref() {
                if engine.dir == dir {
                    return;
                }
            }
        }
        let mut guard = self.engine.write().await;
        // Re-check under the write lock.
        if guard.as_ref().map_or(true, |engine| engine.dir != dir) {
            *guard = Some(Engine::build(dir));
            self.builds.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn augment(&self, context: &serde_json::Value) -> serde_json::Value {
        let mut context = context.clone();
        if let Some(object) = context.as_object_mut() {
            object.insert(
                "template_directory_uri".to_string(),
                serde_json::Value::String(self.theme_directory_uri.clone()),
            );
        }
        context
    }
}

/// Embeds the raw source of a template inside a non-executing script tag
/// keyed by `id`, for later client-side compilation. Always ensures the
/// client templating runtime is registered first; the registrar's handle
/// dedup makes repeated calls register it once per page render.
pub fn inject_inline_template(
    assets: &mut AssetRegistrar,
    template_dir: &Path,
    id: &str,
    src: &str,
) {
    assets.add_script(CLIENT_RUNTIME_HANDLE, CLIENT_RUNTIME_PATH, RegisterMode::Enqueue);

    let location = template_dir.join(src);
    match std::fs::read_to_string(&location) {
        Ok(contents) => assets.embed(format!(
            "<script id=\"{}\" type=\"{}\">{}</script>",
            id, INLINE_TEMPLATE_MIME, contents
        )),
        Err(_) => {
            tracing::error!("inline template doesn't exist: {}", location.display());
        }
    }
}
