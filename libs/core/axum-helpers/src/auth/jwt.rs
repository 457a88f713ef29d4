use access_control::{SupplierProfile, UserPayload};
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use super::config::JwtConfig;

/// Access token time-to-live in seconds (24 hours)
pub const ACCESS_TOKEN_TTL: i64 = 86400;

/// Stateless JWT authentication.
///
/// Tokens embed the full [`UserPayload`] so a request can be authorized
/// without a user lookup; only the role's permissions are fetched per request.
#[derive(Clone)]
pub struct JwtAuth {
    secret: String,
}

impl JwtAuth {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            secret: config.secret.clone(),
        }
    }

    /// Create an access token for the given user.
    ///
    /// `supplier` carries the requester's supplier affiliation when they have
    /// one; it widens their rule set with supplier permissions.
    pub fn create_access_token(
        &self,
        user_id: Uuid,
        role_id: Uuid,
        supplier: Option<SupplierProfile>,
    ) -> eyre::Result<String> {
        let now = Utc::now();
        let claims = UserPayload {
            id: user_id,
            role_id,
            supplier,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ACCESS_TOKEN_TTL)).timestamp(),
        };

        let header = Header {
            alg: jsonwebtoken::Algorithm::HS256,
            ..Default::default()
        };

        let token = encode(
            &header,
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Verify token signature and expiry, returning the decoded claims
    pub fn verify_token(&self, token: &str) -> eyre::Result<UserPayload> {
        let token_data = decode::<UserPayload>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }
}

/// Extract a bearer token from the Authorization header or `access_token` cookie
pub fn extract_token_from_request(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer ").map(|s| s.to_string()))
        .or_else(|| {
            headers
                .get("cookie")
                .and_then(|v| v.to_str().ok())
                .and_then(|cookies| {
                    cookies.split(';').find_map(|cookie| {
                        let parts: Vec<&str> = cookie.trim().splitn(2, '=').collect();
                        if parts.len() == 2 && parts[0] == "access_token" {
                            Some(parts[1].to_string())
                        } else {
                            None
                        }
                    })
                })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn auth() -> JwtAuth {
        JwtAuth::new(&JwtConfig::new(
            "test-secret-that-is-at-least-32-chars!!",
        ))
    }

    #[test]
    fn test_token_round_trip() {
        let auth = auth();
        let user_id = Uuid::now_v7();
        let role_id = Uuid::now_v7();

        let token = auth.create_access_token(user_id, role_id, None).unwrap();
        let payload = auth.verify_token(&token).unwrap();

        assert_eq!(payload.id, user_id);
        assert_eq!(payload.role_id, role_id);
        assert!(payload.supplier.is_none());
        assert!(payload.exp > payload.iat);
    }

    #[test]
    fn test_token_carries_supplier_profile() {
        let auth = auth();
        let supplier_id = Uuid::now_v7();

        let token = auth
            .create_access_token(
                Uuid::now_v7(),
                Uuid::now_v7(),
                Some(SupplierProfile { id: supplier_id }),
            )
            .unwrap();
        let payload = auth.verify_token(&token).unwrap();

        assert_eq!(payload.supplier.unwrap().id, supplier_id);
    }

    #[test]
    fn test_verify_rejects_tampered_token() {
        let auth = auth();
        let token = auth
            .create_access_token(Uuid::now_v7(), Uuid::now_v7(), None)
            .unwrap();

        let mut tampered = token.clone();
        tampered.push('x');
        assert!(auth.verify_token(&tampered).is_err());
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let token = auth()
            .create_access_token(Uuid::now_v7(), Uuid::now_v7(), None)
            .unwrap();

        let other = JwtAuth::new(&JwtConfig::new(
            "another-secret-that-is-32-chars-long!!!!",
        ));
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn test_extract_token_from_authorization_header() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(
            extract_token_from_request(&headers),
            Some("abc.def".to_string())
        );
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("theme=dark; access_token=abc.def"),
        );
        assert_eq!(
            extract_token_from_request(&headers),
            Some("abc.def".to_string())
        );
    }

    #[test]
    fn test_extract_token_missing() {
        assert_eq!(extract_token_from_request(&HeaderMap::new()), None);
    }
}
