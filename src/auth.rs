use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::Row;
use thiserror::Error;

use crate::db::Database;

const AUTH_COOKIE_NAME: &str = "auth_token";

/// Token issuance lives with the external identity provider; this module
/// only verifies what arrives on a request: signature, expiry, and a live
/// session row for the token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("missing JWT_SECRET")]
    MissingSecret,
    #[error("session expired or revoked")]
    SessionNotFound,
    #[error("database error: {0}")]
    Database(String),
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = get_cookie(headers, AUTH_COOKIE_NAME) {
        return Some(token);
    }

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|value| value.to_string())
}

pub async fn verify_request_token(db: &Database, token: &str) -> Result<AuthUser, AuthError> {
    let secret = std::env::var("JWT_SECRET").map_err(|_| AuthError::MissingSecret)?;
    let user_id = verify_jwt_hs256(token, &secret)?;
    let token_hash = hash_token(token);

    let row = sqlx::query(
        r#"
        SELECT u."id", u."email", u."username"
        FROM "sessions" s
        JOIN "users" u ON u."id" = s."userId"
        WHERE s."tokenHash" = $1 AND s."expiresAt" > NOW() AND u."id" = $2
        LIMIT 1
        "#,
    )
    .bind(&token_hash)
    .bind(&user_id)
    .fetch_optional(db.pool())
    .await
    .map_err(|err| AuthError::Database(err.to_string()))?;

    let Some(row) = row else {
        return Err(AuthError::SessionNotFound);
    };

    Ok(AuthUser {
        id: row.try_get("id").unwrap_or_default(),
        email: row.try_get("email").unwrap_or_default(),
        username: row.try_get("username").unwrap_or_default(),
    })
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn verify_jwt_hs256(token: &str, secret: &str) -> Result<String, AuthError> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    let payload_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    let sig_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    if parts.next().is_some() {
        return Err(AuthError::InvalidToken);
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    let sig_bytes = URL_SAFE_NO_PAD
        .decode(sig_b64.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;

    let header_json: serde_json::Value =
        serde_json::from_slice(&header_bytes).map_err(|_| AuthError::InvalidToken)?;
    if header_json.get("alg").and_then(|v| v.as_str()) != Some("HS256") {
        return Err(AuthError::InvalidToken);
    }

    type HmacSha256 = Hmac<Sha256>;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidToken)?;
    mac.update(format!("{header_b64}.{payload_b64}").as_bytes());
    mac.verify_slice(&sig_bytes)
        .map_err(|_| AuthError::InvalidToken)?;

    let payload_json: serde_json::Value =
        serde_json::from_slice(&payload_bytes).map_err(|_| AuthError::InvalidToken)?;

    let now = Utc::now().timestamp();
    if let Some(exp) = payload_json.get("exp").and_then(|v| v.as_i64()) {
        if now >= exp {
            return Err(AuthError::InvalidToken);
        }
    }
    if let Some(nbf) = payload_json.get("nbf").and_then(|v| v.as_i64()) {
        if now < nbf {
            return Err(AuthError::InvalidToken);
        }
    }

    payload_json
        .get("userId")
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or(AuthError::InvalidToken)
}

fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key == name && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn cookie_takes_precedence_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("other=x; auth_token=cookie-token"),
        );
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer header-token"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("cookie-token"));
    }

    #[test]
    fn rejects_malformed_jwt() {
        assert!(verify_jwt_hs256("not-a-jwt", "secret").is_err());
        assert!(verify_jwt_hs256("a.b", "secret").is_err());
        assert!(verify_jwt_hs256("a.b.c.d", "secret").is_err());
    }

    #[test]
    fn token_hash_is_stable_hex() {
        let hash = hash_token("token");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("token"));
        assert_ne!(hash, hash_token("other"));
    }
}
