use axum::{extract::FromRequestParts, http::request::Parts};

use propview_api::USER_ID_HEADER;

use crate::error::ApiErr;

// ---------------------------------------------------------------------------
// Acting user extractor
// ---------------------------------------------------------------------------

/// The user the host runtime authenticated, taken from the `X-User-Id` header.
pub struct ActingUser {
    pub user_id: String,
}

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = ApiErr;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiErr::unauthorized("missing X-User-Id header"))?;

        Ok(ActingUser {
            user_id: user_id.to_string(),
        })
    }
}
