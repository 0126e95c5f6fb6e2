//! Bearer token pair: short-lived access token plus a longer-lived refresh
//! token that can be exchanged for a new access token without the password.

use anyhow::Result;
use chrono::Duration;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use worklink_types::api::{Claims, TokenType};
use worklink_types::models::Role;

const ACCESS_TTL_MINUTES: i64 = 60;
const REFRESH_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub fn issue_pair(secret: &str, user_id: Uuid, email: &str, role: Role) -> Result<TokenPair> {
    Ok(TokenPair {
        access: issue(
            secret,
            user_id,
            email,
            role,
            TokenType::Access,
            Duration::minutes(ACCESS_TTL_MINUTES),
        )?,
        refresh: issue(
            secret,
            user_id,
            email,
            role,
            TokenType::Refresh,
            Duration::days(REFRESH_TTL_DAYS),
        )?,
    })
}

/// Exchange a refresh token for a new access token. Access tokens are not
/// accepted here; the `token_type` claim is the discriminator.
pub fn refresh_access(secret: &str, refresh_token: &str) -> Result<String, RefreshError> {
    // Validation::default() tolerates 60s of expiry skew; refresh tokens are
    // cut off at their stated TTL.
    let mut validation = Validation::default();
    validation.leeway = 0;
    let data = decode::<Claims>(
        refresh_token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| RefreshError::Invalid)?;

    let claims = data.claims;
    if claims.token_type != TokenType::Refresh {
        return Err(RefreshError::Invalid);
    }

    issue(
        secret,
        claims.sub,
        &claims.email,
        claims.role,
        TokenType::Access,
        Duration::minutes(ACCESS_TTL_MINUTES),
    )
    .map_err(|_| RefreshError::Invalid)
}

#[derive(Debug, PartialEq, Eq)]
pub enum RefreshError {
    Invalid,
}

fn issue(
    secret: &str,
    user_id: Uuid,
    email: &str,
    role: Role,
    token_type: TokenType,
    ttl: Duration,
) -> Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        token_type,
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn decode_claims(token: &str) -> Claims {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(SECRET.as_bytes()),
            &Validation::default(),
        )
        .unwrap()
        .claims
    }

    #[test]
    fn pair_carries_matching_identity() {
        let user_id = Uuid::new_v4();
        let pair = issue_pair(SECRET, user_id, "a@x.com", Role::Employer).unwrap();

        let access = decode_claims(&pair.access);
        let refresh = decode_claims(&pair.refresh);
        assert_eq!(access.sub, user_id);
        assert_eq!(refresh.sub, user_id);
        assert_eq!(access.token_type, TokenType::Access);
        assert_eq!(refresh.token_type, TokenType::Refresh);
        assert_eq!(access.role, Role::Employer);
    }

    #[test]
    fn refresh_exchanges_for_new_access() {
        let user_id = Uuid::new_v4();
        let pair = issue_pair(SECRET, user_id, "a@x.com", Role::Employee).unwrap();

        let access = refresh_access(SECRET, &pair.refresh).unwrap();
        let claims = decode_claims(&access);
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn access_token_cannot_refresh() {
        let pair = issue_pair(SECRET, Uuid::new_v4(), "a@x.com", Role::Employee).unwrap();
        assert_eq!(
            refresh_access(SECRET, &pair.access),
            Err(RefreshError::Invalid)
        );
    }

    #[test]
    fn expired_refresh_is_rejected() {
        let token = issue(
            SECRET,
            Uuid::new_v4(),
            "a@x.com",
            Role::Employee,
            TokenType::Refresh,
            Duration::minutes(-1),
        )
        .unwrap();
        assert_eq!(refresh_access(SECRET, &token), Err(RefreshError::Invalid));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(
            refresh_access(SECRET, "not-a-token"),
            Err(RefreshError::Invalid)
        );
    }
}
