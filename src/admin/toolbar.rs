use crate::api::middleware::auth::UserInfo;
use crate::core::hooks::HookPipeline;

/// Capability gating the toolbar entry and the refresh endpoints.
pub const REFRESH_CAPABILITY: &str = "request_force_refresh";

/// Toolbar handlers run late so other page chrome lands first.
pub const TOOLBAR_PRIORITY: u32 = 999;

pub struct ToolbarItem {
    pub id: String,
    pub title: String,
    pub href: Option<String>,
}

pub struct ToolbarContext {
    pub user: UserInfo,
    pub items: Vec<ToolbarItem>,
}

impl ToolbarContext {
    pub fn new(user: UserInfo) -> Self {
        ToolbarContext {
            user,
            items: Vec::new(),
        }
    }

    pub fn render(&self) -> String {
        if self.items.is_empty() {
            return String::new();
        }
        let mut html = String::from("<ul class=\"force-refresh-toolbar\">");
        for item in &self.items {
            html.push_str(&format!("<li id=\"{}\">", item.id));
            match &item.href {
                Some(href) => html.push_str(&format!("<a href=\"{}\">{}</a>", href, item.title)),
                None => html.push_str(&format!("<span>{}</span>", item.title)),
            }
            html.push_str("</li>");
        }
        html.push_str("</ul>");
        html
    }
}

pub fn can_request_refresh(user: &UserInfo) -> bool {
    user.capabilities.contains(REFRESH_CAPABILITY)
}

/// Registers the deferred toolbar callback. The capability is re-checked
/// inside the callback so a registration made against stale state never
/// surfaces the entry to an unauthorized user.
pub fn register_toolbar_item(pipeline: &mut HookPipeline<ToolbarContext>) {
    pipeline.register(TOOLBAR_PRIORITY, |ctx| {
        if !can_request_refresh(&ctx.user) {
            return;
        }
        ctx.items.push(ToolbarItem {
            id: "force-refresh".to_string(),
            title: "<i class=\"fa fa-refresh\" aria-hidden=\"true\"></i> \
                    <span>Force Refresh Site</span>"
                .to_string(),
            href: None,
        });
    });
}
