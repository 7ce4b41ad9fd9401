pub mod signal;
pub mod toolbar;

pub use toolbar::{can_request_refresh, ToolbarContext, REFRESH_CAPABILITY};

use crate::api::middleware::auth::UserInfo;
use crate::api::state::ApiState;
use crate::assets::{AssetRegistrar, RegisterMode};
use crate::core::hooks::HookPipeline;
use crate::core::nonce::REFRESH_ACTION;
use crate::settings::{load_settings, Settings};
use crate::templates::inject_inline_template;

pub const NOTICE_TEMPLATE_ID: &str = "force-refresh-admin-notice-template";
pub const NOTICE_TEMPLATE_FILE: &str = "force-refresh-main-admin-notice.html";

pub const ADMIN_STYLE_HANDLE: &str = "force-refresh-admin-css";
pub const ADMIN_STYLE_PATH: &str = "/dist/css/force-refresh-admin.css";

pub const MAIN_SCRIPT_HANDLE: &str = "force-refresh-main-admin-js";
pub const MAIN_SCRIPT_PATH: &str = "/dist/js/force-refresh-main-admin.js";

pub const META_BOX_SCRIPT_HANDLE: &str = "force-refresh-meta-box-admin-js";
pub const META_BOX_SCRIPT_PATH: &str = "/dist/js/force-refresh-meta-box-admin.js";
pub const META_BOX_CLASS: &str = "force-refresh-meta-box";

/// A page a refresh can be scoped to.
pub struct PageRef {
    pub id: i64,
    pub post_type: String,
    pub title: String,
}

pub fn new_page_assets(state: &ApiState) -> AssetRegistrar {
    AssetRegistrar::new(
        state.config.install_root.clone(),
        state.config.public_url.clone(),
    )
}

/// Builds the head fragment every admin page embeds.
///
/// The toolbar entry is conditional: the `show_in_toolbar` setting registers
/// a deferred callback which re-checks the capability before touching the
/// menu. The notice template, the admin stylesheet, and the main admin
/// bundle go out on every admin page regardless, since a refresh notice can
/// surface anywhere.
pub async fn render_admin_head(state: &ApiState, user: &UserInfo) -> String {
    let settings = load_settings(&state.settings, state.config.default_refresh_interval).await;

    let mut assets = new_page_assets(state);
    let mut toolbar_hooks: HookPipeline<ToolbarContext> = HookPipeline::new();

    if settings.show_in_toolbar {
        toolbar::register_toolbar_item(&mut toolbar_hooks);
    }

    inject_inline_template(
        &mut assets,
        &state.config.template_dir,
        NOTICE_TEMPLATE_ID,
        NOTICE_TEMPLATE_FILE,
    );
    assets.add_style(ADMIN_STYLE_HANDLE, ADMIN_STYLE_PATH);
    add_refresh_script(state, user, &settings, &mut assets);

    let mut toolbar = ToolbarContext::new(user.clone());
    toolbar_hooks.run(&mut toolbar);

    let mut head = assets.render_head();
    let toolbar_html = toolbar.render();
    if !toolbar_html.is_empty() {
        head.push('\n');
        head.push_str(&toolbar_html);
    }
    head
}

/// Registers the main admin script and the localized payload it reads,
/// including the nonce the refresh call presents, then enqueues the script.
pub fn add_refresh_script(
    state: &ApiState,
    user: &UserInfo,
    settings: &Settings,
    assets: &mut AssetRegistrar,
) {
    assets.add_script(MAIN_SCRIPT_HANDLE, MAIN_SCRIPT_PATH, RegisterMode::RegisterOnly);

    let payload = serde_json::json!({
        "api_url": state.config.public_url,
        "site_id": state.config.site_id,
        "nonce": state.nonces.issue(REFRESH_ACTION, user.user_id),
        "notice_template_id": NOTICE_TEMPLATE_ID,
        "refresh_interval": settings.refresh_interval_seconds,
    });
    assets.localize("force_refresh_local_js", &payload);
    assets.enqueue_registered(MAIN_SCRIPT_HANDLE);
}

/// Builds the per-page meta box fragment: the meta-box script with its
/// localized payload, followed by the target element the client script
/// mounts into.
pub async fn render_page_refresh_box(state: &ApiState, user: &UserInfo, page: &PageRef) -> String {
    let settings = load_settings(&state.settings, state.config.default_refresh_interval).await;

    let mut assets = new_page_assets(state);
    assets.add_script(
        META_BOX_SCRIPT_HANDLE,
        META_BOX_SCRIPT_PATH,
        RegisterMode::RegisterOnly,
    );

    // The inner object keeps the primitive types intact on the client side.
    let payload = serde_json::json!({
        "localData": {
            "apiUrl": state.config.public_url,
            "siteId": state.config.site_id,
            "nonce": state.nonces.issue(REFRESH_ACTION, user.user_id),
            "postId": page.id,
            "postType": page.post_type,
            "postName": page.title,
            "targetClass": META_BOX_CLASS,
            "refreshInterval": settings.refresh_interval_seconds,
        },
    });
    assets.localize("forceRefreshLocalJs", &payload);
    assets.enqueue_registered(META_BOX_SCRIPT_HANDLE);

    format!(
        "{}\n<div class=\"{}\"></div>",
        assets.render_head(),
        META_BOX_CLASS
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::state::AppConfig;
    use crate::core::{AdminHooks, NonceStore};
    use crate::settings::{SettingsStore, OPTION_SHOW_IN_TOOLBAR};
    use crate::templates::Renderer;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::HashSet;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn test_state(show_in_toolbar: bool) -> (ApiState, TempDir) {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("dist/js")).unwrap();
        fs::create_dir_all(root.path().join("dist/css")).unwrap();
        fs::create_dir_all(root.path().join("templates")).unwrap();
        for script in [
            "force-refresh-main-admin.js",
            "force-refresh-meta-box-admin.js",
            "handlebars.runtime.js",
        ] {
            fs::write(root.path().join("dist/js").join(script), "// js").unwrap();
        }
        fs::write(
            root.path().join("dist/css/force-refresh-admin.css"),
            "/* css */",
        )
        .unwrap();
        fs::write(
            root.path().join("templates").join(NOTICE_TEMPLATE_FILE),
            "<div class=\"notice\">{{message}}</div>",
        )
        .unwrap();

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let settings = SettingsStore::new(pool.clone());
        settings.bootstrap().await.unwrap();
        settings
            .set_option(
                OPTION_SHOW_IN_TOOLBAR,
                if show_in_toolbar { "true" } else { "false" },
            )
            .await
            .unwrap();

        let config = AppConfig {
            install_root: root.path().to_path_buf(),
            template_dir: root.path().join("templates"),
            public_url: "https://example.test/force-refresh".to_string(),
            theme_directory_uri: "https://example.test/theme".to_string(),
            site_id: 1,
            site_name: "Example".to_string(),
            default_refresh_interval: 60,
            nonce_ttl_hours: 12,
            database_url: "sqlite::memory:".to_string(),
        };
        let state = ApiState {
            db: pool,
            settings,
            renderer: Arc::new(Renderer::new(config.theme_directory_uri.clone())),
            nonces: Arc::new(NonceStore::new(config.nonce_ttl_hours)),
            hooks: Arc::new(AdminHooks::default()),
            config: Arc::new(config),
        };
        (state, root)
    }

    fn user_with(capabilities: &[&str]) -> UserInfo {
        UserInfo {
            user_id: 3,
            capabilities: capabilities.iter().map(|c| c.to_string()).collect::<HashSet<_>>(),
        }
    }

    #[tokio::test]
    async fn test_toolbar_renders_for_capable_user_when_enabled() {
        let (state, _root) = test_state(true).await;
        let head = render_admin_head(&state, &user_with(&[REFRESH_CAPABILITY])).await;
        assert!(head.contains("force-refresh-toolbar"));
        assert!(head.contains("Force Refresh Site"));
    }

    #[tokio::test]
    async fn test_toolbar_omitted_without_capability() {
        let (state, _root) = test_state(true).await;
        let head = render_admin_head(&state, &user_with(&["edit_pages"])).await;
        assert!(!head.contains("force-refresh-toolbar"));
    }

    #[tokio::test]
    async fn test_toolbar_omitted_when_setting_disabled() {
        let (state, _root) = test_state(false).await;
        let head = render_admin_head(&state, &user_with(&[REFRESH_CAPABILITY])).await;
        assert!(!head.contains("force-refresh-toolbar"));
    }

    #[tokio::test]
    async fn test_fixed_cost_assets_go_out_regardless_of_toolbar() {
        let (state, _root) = test_state(false).await;
        let head = render_admin_head(&state, &user_with(&["edit_pages"])).await;

        assert!(head.contains(&format!("id=\"{}\"", NOTICE_TEMPLATE_ID)));
        assert!(head.contains("force-refresh-admin.css?ver="));
        assert!(head.contains("force-refresh-main-admin.js?ver="));
        assert!(head.contains("var force_refresh_local_js"));
        assert_eq!(head.matches("handlebars.runtime.js").count(), 1);
    }

    #[tokio::test]
    async fn test_localized_payload_carries_interval_and_nonce() {
        let (state, _root) = test_state(false).await;
        state
            .settings
            .set_option(crate::settings::OPTION_REFRESH_INTERVAL, "90")
            .await
            .unwrap();

        let head = render_admin_head(&state, &user_with(&[REFRESH_CAPABILITY])).await;
        assert!(head.contains("\"refresh_interval\":90"));
        assert!(head.contains("\"nonce\":"));
    }

    #[tokio::test]
    async fn test_meta_box_fragment() {
        let (state, _root) = test_state(false).await;
        let page = PageRef {
            id: 42,
            post_type: "page".to_string(),
            title: "About".to_string(),
        };

        let html = render_page_refresh_box(&state, &user_with(&[REFRESH_CAPABILITY]), &page).await;

        assert!(html.contains("var forceRefreshLocalJs"));
        assert!(html.contains("\"postId\":42"));
        assert!(html.contains("\"postName\":\"About\""));
        assert!(html.contains("\"targetClass\":\"force-refresh-meta-box\""));
        assert!(html.ends_with("<div class=\"force-refresh-meta-box\"></div>"));
        assert!(html.contains("force-refresh-meta-box-admin.js?ver="));
    }

    #[tokio::test]
    async fn test_hostile_page_title_stays_inside_the_payload() {
        let (state, _root) = test_state(false).await;
        let page = PageRef {
            id: 9,
            post_type: "page".to_string(),
            title: "</script><script>alert(1)</script>".to_string(),
        };

        let html = render_page_refresh_box(&state, &user_with(&[REFRESH_CAPABILITY]), &page).await;

        assert!(!html.contains("</script><script>alert(1)"));
        assert!(html.contains("\\u003c/script\\u003e"));
    }
}
