use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, HttpResponse};

use super::handlers;
use super::middleware::auth::create_auth_middleware;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health checks
        .route("/health", web::get().to(health_check))
        .route("/ready", web::get().to(readiness_check))

        // Admin pages
        .service(
            web::scope("/admin")
                .wrap(create_auth_middleware())
                .wrap(Logger::default())
                .route("/force-refresh", web::get().to(handlers::settings_page))
                .route("/force-refresh", web::post().to(handlers::settings_save))
                .route("/head", web::get().to(handlers::admin_head))
                .route("/pages/{id}/refresh-box", web::get().to(handlers::page_refresh_box)),
        )

        // Refresh API (consumed by the client-side scripts)
        .service(
            web::scope("/api/v1")
                .wrap(create_auth_middleware())
                .wrap(
                    Cors::default()
                        .allowed_origin_fn(|origin, _req_head| {
                            origin.as_bytes().starts_with(b"http://localhost") ||
                            origin.as_bytes().starts_with(b"https://")
                        })
                        .allowed_methods(vec!["GET", "POST"])
                        .allowed_headers(vec![
                            "Content-Type",
                            "Authorization",
                            handlers::NONCE_HEADER,
                        ])
                        .max_age(3600)
                )
                .service(
                    web::scope("/refresh")
                        .route("", web::post().to(handlers::request_site_refresh))
                        .route("/page/{id}", web::post().to(handlers::request_page_refresh))
                        .route("/status", web::get().to(handlers::refresh_status)),
                ),
        );
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy"
    }))
}

async fn readiness_check(state: web::Data<crate::api::ApiState>) -> HttpResponse {
    let db_healthy = sqlx::query("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();

    if db_healthy {
        HttpResponse::Ok().json(serde_json::json!({
            "status": "ready",
            "checks": { "database": "ok" }
        }))
    } else {
        HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "not_ready",
            "checks": { "database": "failed" }
        }))
    }
}
