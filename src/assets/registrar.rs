use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

/// Handles every script we emit depends on. The host page is expected to
/// provide these bundles.
pub const SCRIPT_DEPENDENCIES: [&str; 2] = ["jquery", "jquery-ui-core"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterMode {
    /// Make the asset available without emitting it; a later
    /// [`AssetRegistrar::enqueue_registered`] call emits it. Used when a
    /// localized data payload has to land before the script tag.
    RegisterOnly,
    Enqueue,
}

/// Page-scoped asset registry. Owns the tags for a single page render:
/// scripts and styles are resolved against the install root, versioned by
/// file mtime, and collected in registration order. A missing file degrades
/// to a visible error notice; nothing aborts the render.
pub struct AssetRegistrar {
    install_root: PathBuf,
    public_url: String,
    handles: HashSet<String>,
    registered_scripts: HashMap<String, String>,
    notices: Vec<String>,
    output: Vec<String>,
}

impl AssetRegistrar {
    pub fn new(install_root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        AssetRegistrar {
            install_root: install_root.into(),
            public_url: public_url.into(),
            handles: HashSet::new(),
            registered_scripts: HashMap::new(),
            notices: Vec::new(),
            output: Vec::new(),
        }
    }

    pub fn add_script(&mut self, handle: &str, path: &str, mode: RegisterMode) {
        if self.handles.contains(handle) {
            return;
        }
        let Some(version) = self.file_version(path) else {
            self.push_missing_notice(path);
            return;
        };

        let deps = SCRIPT_DEPENDENCIES.join(",");
        let tag = format!(
            "<script src=\"{}\" id=\"{}-js\" data-deps=\"{}\" defer></script>",
            self.asset_url(path, version),
            handle,
            deps
        );
        self.handles.insert(handle.to_string());
        match mode {
            RegisterMode::RegisterOnly => {
                self.registered_scripts.insert(handle.to_string(), tag);
            }
            RegisterMode::Enqueue => self.output.push(tag),
        }
    }

    pub fn add_style(&mut self, handle: &str, path: &str) {
        if self.handles.contains(handle) {
            return;
        }
        let Some(version) = self.file_version(path) else {
            self.push_missing_notice(path);
            return;
        };

        let tag = format!(
            "<link rel=\"stylesheet\" id=\"{}-css\" href=\"{}\" media=\"all\">",
            handle,
            self.asset_url(path, version)
        );
        self.handles.insert(handle.to_string());
        self.output.push(tag);
    }

    /// Emits a previously register-only script. A no-op for unknown handles.
    pub fn enqueue_registered(&mut self, handle: &str) {
        if let Some(tag) = self.registered_scripts.remove(handle) {
            self.output.push(tag);
        }
    }

    /// Emits an inline script assigning `data` to a named global, for
    /// consumption by a script enqueued afterwards. Angle brackets are
    /// emitted as unicode escapes so a value can never close the script tag.
    pub fn localize(&mut self, object_name: &str, data: &serde_json::Value) {
        // JSON only carries `<`/`>` inside string literals, where \uXXXX is
        // valid, so a blanket replace is safe.
        let json = data
            .to_string()
            .replace('<', "\\u003c")
            .replace('>', "\\u003e");
        self.output.push(format!(
            "<script>var {} = {};</script>",
            object_name, json
        ));
    }

    /// Appends a raw HTML fragment (inline templates, toolbar markup).
    pub fn embed(&mut self, html: String) {
        self.output.push(html);
    }

    pub fn has_handle(&self, handle: &str) -> bool {
        self.handles.contains(handle)
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    /// Notices first, then tags in registration order.
    pub fn render_head(&self) -> String {
        let mut fragments: Vec<&str> = Vec::with_capacity(self.notices.len() + self.output.len());
        fragments.extend(self.notices.iter().map(String::as_str));
        fragments.extend(self.output.iter().map(String::as_str));
        fragments.join("\n")
    }

    fn push_missing_notice(&mut self, path: &str) {
        tracing::warn!("asset file is missing: {}", path);
        self.notices.push(format!(
            "<div class=\"notice notice-error\"><p>{} is missing.</p></div>",
            path
        ));
    }

    fn file_version(&self, path: &str) -> Option<u64> {
        let file_path = self.install_root.join(path.trim_start_matches('/'));
        let modified = std::fs::metadata(&file_path).ok()?.modified().ok()?;
        modified
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|elapsed| elapsed.as_secs())
    }

    fn asset_url(&self, path: &str, version: u64) -> String {
        format!(
            "{}/{}?ver={}",
            self.public_url.trim_end_matches('/'),
            path.trim_start_matches('/'),
            version
        )
    }
}
