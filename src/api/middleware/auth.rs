use actix_web::{dev::ServiceRequest, Error, HttpMessage};
use actix_web_httpauth::extractors::bearer::{BearerAuth, Config};
use actix_web_httpauth::extractors::AuthenticationError;
use actix_web_httpauth::middleware::HttpAuthentication;
use std::collections::HashSet;
use std::future::{ready, Ready};

use crate::admin::REFRESH_CAPABILITY;

pub fn create_auth_middleware() -> HttpAuthentication<BearerAuth, fn(ServiceRequest, BearerAuth) -> Ready<Result<ServiceRequest, (Error, ServiceRequest)>>> {
    HttpAuthentication::bearer(validator)
}

fn validator(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Ready<Result<ServiceRequest, (Error, ServiceRequest)>> {
    // Stand-in for the host platform's session and role lookup.
    // Token shape: valid_{role}_{user_id}, e.g. valid_admin_3.
    match parse_token(credentials.token()) {
        Some(user) => {
            req.extensions_mut().insert(user);
            ready(Ok(req))
        }
        None => {
            let config = Config::default();
            ready(Err((AuthenticationError::from(config).into(), req)))
        }
    }
}

fn parse_token(token: &str) -> Option<UserInfo> {
    let mut parts = token.split('_');
    if parts.next()? != "valid" {
        return None;
    }
    let role = parts.next()?;
    let user_id = parts.next()?.parse::<i64>().ok()?;

    let capabilities: HashSet<String> = match role {
        "admin" => ["manage_options", REFRESH_CAPABILITY],
        "editor" => ["edit_pages", "read"],
        _ => return None,
    }
    .iter()
    .map(|capability| capability.to_string())
    .collect();

    Some(UserInfo {
        user_id,
        capabilities,
    })
}

#[derive(Clone, Debug)]
pub struct UserInfo {
    pub user_id: i64,
    pub capabilities: HashSet<String>,
}

pub fn extract_user(req: &actix_web::HttpRequest) -> Option<UserInfo> {
    req.extensions().get::<UserInfo>().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_token_grants_refresh_capability() {
        let user = parse_token("valid_admin_3").unwrap();
        assert_eq!(user.user_id, 3);
        assert!(user.capabilities.contains(REFRESH_CAPABILITY));
    }

    #[test]
    fn test_editor_token_lacks_refresh_capability() {
        let user = parse_token("valid_editor_5").unwrap();
        assert!(!user.capabilities.contains(REFRESH_CAPABILITY));
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        assert!(parse_token("").is_none());
        assert!(parse_token("valid_admin").is_none());
        assert!(parse_token("valid_admin_x").is_none());
        assert!(parse_token("valid_intruder_3").is_none());
        assert!(parse_token("invalid_admin_3").is_none());
    }
}
