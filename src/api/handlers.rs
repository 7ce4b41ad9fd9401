use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

use super::error::{ApiError, ApiResult};
use super::middleware::auth::{extract_user, UserInfo};
use super::state::ApiState;
use crate::admin::{self, can_request_refresh, signal, PageRef};
use crate::core::nonce::REFRESH_ACTION;
use crate::settings::{load_settings, save_settings, Settings, ALLOWED_REFRESH_INTERVALS};

pub const SETTINGS_TEMPLATE: &str = "force-refresh-main-admin.html";

/// Header carrying the single-use token for refresh requests.
pub const NONCE_HEADER: &str = "X-Refresh-Nonce";

/// Admin settings screen.
pub async fn settings_page(req: HttpRequest, state: web::Data<ApiState>) -> ApiResult<HttpResponse> {
    state.hooks.run_request_start(req.path());
    let user = authenticated_user(&req)?;
    let html = render_settings_screen(&state, &user).await;
    Ok(html_response(html))
}

/// Admin settings form submission. Saving only happens when the form
/// carries the save marker; either way the screen re-renders with the
/// current values.
pub async fn settings_save(
    req: HttpRequest,
    form: web::Form<HashMap<String, String>>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    state.hooks.run_request_start(req.path());
    let user = authenticated_user(&req)?;

    let saved = save_settings(&state.settings, &form).await?;
    if saved {
        let settings = load_settings(&state.settings, state.config.default_refresh_interval).await;
        state.hooks.run_settings_save(settings);
    }

    let html = render_settings_screen(&state, &user).await;
    Ok(html_response(html))
}

/// The head fragment arbitrary admin pages embed.
pub async fn admin_head(req: HttpRequest, state: web::Data<ApiState>) -> ApiResult<HttpResponse> {
    state.hooks.run_request_start(req.path());
    let user = authenticated_user(&req)?;
    let html = admin::render_admin_head(&state, &user).await;
    Ok(html_response(html))
}

#[derive(Deserialize)]
pub struct PageMeta {
    pub post_type: Option<String>,
    pub title: Option<String>,
}

/// The per-page refresh meta box fragment.
pub async fn page_refresh_box(
    req: HttpRequest,
    path: web::Path<i64>,
    meta: web::Query<PageMeta>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    state.hooks.run_request_start(req.path());
    let user = authenticated_user(&req)?;

    let id = path.into_inner();
    let page = PageRef {
        id,
        post_type: meta.post_type.clone().unwrap_or_else(|| "page".to_string()),
        title: meta.title.clone().unwrap_or_else(|| format!("Page {}", id)),
    };
    let html = admin::render_page_refresh_box(&state, &user, &page).await;
    Ok(html_response(html))
}

/// Records a site-wide refresh signal. Requires the refresh capability and
/// a single-use nonce.
pub async fn request_site_refresh(
    req: HttpRequest,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let user = authenticated_user(&req)?;
    verify_refresh_request(&req, &state, &user)?;

    let signal = signal::record_site_refresh(&state.settings).await?;
    tracing::info!("site refresh requested by user {}", user.user_id);

    Ok(HttpResponse::Ok().json(json!({
        "status": "accepted",
        "scope": "site",
        "id": signal.id,
        "requested_at": signal.requested_at,
    })))
}

/// Records a refresh signal scoped to a single page.
pub async fn request_page_refresh(
    req: HttpRequest,
    path: web::Path<i64>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let user = authenticated_user(&req)?;
    verify_refresh_request(&req, &state, &user)?;

    let page_id = path.into_inner();
    let signal = signal::record_page_refresh(&state.settings, page_id).await?;
    tracing::info!("page {} refresh requested by user {}", page_id, user.user_id);

    Ok(HttpResponse::Ok().json(json!({
        "status": "accepted",
        "scope": "page",
        "page_id": page_id,
        "id": signal.id,
        "requested_at": signal.requested_at,
    })))
}

#[derive(Deserialize)]
pub struct StatusQuery {
    pub page_id: Option<i64>,
}

/// Current refresh signals. Clients poll this at the configured interval
/// and reload when an id changes.
pub async fn refresh_status(
    query: web::Query<StatusQuery>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let site = signal::site_signal(&state.settings).await?;
    let page = match query.page_id {
        Some(page_id) => signal::page_signal(&state.settings, page_id).await?,
        None => None,
    };

    Ok(HttpResponse::Ok().json(json!({
        "site": site,
        "page": page,
    })))
}

/// Template context for the settings screen: the site name plus one
/// `selected` marker per option value, exactly one of which is non-empty
/// per select.
pub fn settings_template_context(site_name: &str, settings: &Settings) -> serde_json::Value {
    fn selected(on: bool) -> serde_json::Value {
        serde_json::Value::String(if on { "selected" } else { "" }.to_string())
    }

    let mut options = serde_json::Map::new();
    options.insert(
        "show_in_admin_bar_show".to_string(),
        selected(settings.show_in_toolbar),
    );
    options.insert(
        "show_in_admin_bar_hide".to_string(),
        selected(!settings.show_in_toolbar),
    );
    for interval in ALLOWED_REFRESH_INTERVALS {
        options.insert(
            format!("refresh_interval_{}", interval),
            selected(settings.refresh_interval_seconds == interval),
        );
    }

    json!({
        "site_name": site_name,
        "options": options,
    })
}

async fn render_settings_screen(state: &ApiState, user: &UserInfo) -> String {
    let settings = load_settings(&state.settings, state.config.default_refresh_interval).await;

    let mut assets = admin::new_page_assets(state);
    admin::add_refresh_script(state, user, &settings, &mut assets);

    let context = settings_template_context(&state.config.site_name, &settings);
    let body = state
        .renderer
        .render(&state.config.template_dir, SETTINGS_TEMPLATE, &context)
        .await
        .unwrap_or_default();

    format!("{}\n{}", assets.render_head(), body)
}

fn verify_refresh_request(
    req: &HttpRequest,
    state: &ApiState,
    user: &UserInfo,
) -> Result<(), ApiError> {
    if !can_request_refresh(user) {
        return Err(ApiError::forbidden("user may not request a refresh"));
    }
    let token = req
        .headers()
        .get(NONCE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::forbidden("missing refresh nonce"))?;
    state
        .nonces
        .consume(token, REFRESH_ACTION, user.user_id)
        .map_err(|err| ApiError::forbidden(err.to_string()))
}

fn authenticated_user(req: &HttpRequest) -> Result<UserInfo, ApiError> {
    extract_user(req).ok_or_else(|| ApiError::forbidden("no authenticated user"))
}

fn html_response(html: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html)
}
