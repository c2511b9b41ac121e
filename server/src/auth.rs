use axum::http::{HeaderMap, StatusCode, header};

use crate::state::AppState;

/// Gate for registry writes. With no token configured every write is
/// refused; otherwise the request must carry `Authorization: Bearer <token>`.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), StatusCode> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(StatusCode::FORBIDDEN);
    };
    let Some(presented) = bearer_token(headers) else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if tokens_match(presented.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Compares every byte regardless of where the first mismatch is.
fn tokens_match(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
