use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dto::auth::Claims,
    error::{AppError, AppResult},
    state::AppState,
};

pub const TOKEN_COOKIE: &str = "token";

/// Identity of the caller, resolved once per request and passed explicitly
/// into every service call.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub is_admin: bool,
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_admin {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_owner_or_admin(user: &AuthUser, owner_id: Uuid) -> Result<(), AppError> {
    if user.user_id != owner_id && !user.is_admin {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

pub fn issue_token(config: &AppConfig, user_id: Uuid, is_admin: bool) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.jwt_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id,
        is_admin,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_token(secret: &str, token: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthenticated("token failed"))
}

pub fn session_cookie(config: &AppConfig, token: &str) -> Cookie<'static> {
    let mut cookie = base_cookie(config, token.to_string());
    cookie.set_max_age(time::Duration::hours(config.jwt_ttl_hours));
    cookie
}

pub fn clear_session_cookie(config: &AppConfig) -> Cookie<'static> {
    let mut cookie = base_cookie(config, String::new());
    cookie.set_max_age(time::Duration::ZERO);
    cookie
}

fn base_cookie(config: &AppConfig, value: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, value))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .build()
}

fn bearer_token(headers: &HeaderMap) -> AppResult<Option<&str>> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::Unauthenticated("invalid Authorization header"))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthenticated("invalid Authorization scheme"))?;
    Ok(Some(token.trim()))
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(&parts.headers)? {
            Some(token) => token.to_string(),
            None => cookie_token(&parts.headers).ok_or(AppError::Unauthenticated("no token"))?,
        };

        let claims = verify_token(&state.config.jwt_secret, &token)?;

        Ok(AuthUser {
            user_id: claims.sub,
            is_admin: claims.is_admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config() -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/storefront".into(),
            host: "127.0.0.1".into(),
            port: 3000,
            jwt_secret: "test-secret".into(),
            jwt_ttl_hours: 1,
            cors_origins: vec![],
            cookie_secure: true,
            db_max_connections: 1,
            concurrency_limit: 10,
        }
    }

    #[test]
    fn token_round_trip_keeps_identity() {
        let cfg = config();
        let user_id = Uuid::new_v4();
        let token = issue_token(&cfg, user_id, true).unwrap();
        let claims = verify_token(&cfg.jwt_secret, &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(claims.is_admin);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token(&config(), Uuid::new_v4(), false).unwrap();
        let err = verify_token("another-secret", &token).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
    }

    #[test]
    fn token_is_read_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; token=abc.def.ghi; lang=en"),
        );
        assert_eq!(cookie_token(&headers).as_deref(), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap(), None);
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        assert!(bearer_token(&headers).is_err());
    }

    #[test]
    fn session_cookie_honours_secure_flag() {
        let cfg = config();
        let cookie = session_cookie(&cfg, "abc");
        assert_eq!(cookie.name(), TOKEN_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(1)));

        let cleared = clear_session_cookie(&cfg);
        assert_eq!(cleared.value(), "");
        assert_eq!(cleared.max_age(), Some(time::Duration::ZERO));
    }

    #[test]
    fn empty_token_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("token=; theme=dark"));
        assert_eq!(cookie_token(&headers), None);
    }

    #[test]
    fn ownership_check_allows_owner_and_admin_only() {
        let owner = Uuid::new_v4();
        let user = AuthUser {
            user_id: owner,
            is_admin: false,
        };
        let stranger = AuthUser {
            user_id: Uuid::new_v4(),
            is_admin: false,
        };
        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            is_admin: true,
        };
        assert!(ensure_owner_or_admin(&user, owner).is_ok());
        assert!(ensure_owner_or_admin(&admin, owner).is_ok());
        assert!(matches!(
            ensure_owner_or_admin(&stranger, owner),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(ensure_admin(&user), Err(AppError::Forbidden)));
    }
}
