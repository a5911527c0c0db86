//! Auth Gate: bearer token verification and guest identity minting,
//! shared between the REST surface and the socket handshake.

use std::sync::Arc;
use vidbridge_protocol::ids::guest_username;
use vidbridge_store::{CredentialStore, TokenService};

/// The resolved identity for a new connection, after either a token was
/// verified or a guest identity was minted.
pub struct Identity {
    pub user_id: Option<String>,
    pub username: String,
    pub authenticated: bool,
}

/// Resolve the identity for a new socket handshake. A missing or invalid
/// token is not an error here -- guests are first-class traffic, so this
/// never logs a warning for that case (unlike REST, where a protected
/// route rejects outright).
pub async fn resolve_handshake_identity(
    token: Option<&str>,
    tokens: &TokenService,
    credentials: &Arc<dyn CredentialStore>,
) -> Identity {
    let Some(token) = token else {
        return Identity {
            user_id: None,
            username: guest_username(),
            authenticated: false,
        };
    };

    let Some(claims) = tokens.verify(token) else {
        return Identity {
            user_id: None,
            username: guest_username(),
            authenticated: false,
        };
    };

    let username = match credentials.get_user(&claims.sub).await {
        Ok(Some(user)) => user.username,
        _ => format!("User_{}", claims.sub),
    };

    Identity {
        user_id: Some(claims.sub),
        username,
        authenticated: true,
    }
}

/// Extract a `Bearer <token>` credential from a REST `Authorization`
/// header value. Returns `None` for a missing or malformed header.
pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
    header?.strip_prefix("Bearer ").map(str::trim)
}
