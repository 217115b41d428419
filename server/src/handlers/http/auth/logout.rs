use bytes::Bytes;
use hyper::Request;
use tracing::info;

use shared::types::LogoutData;

use crate::AppState;
use crate::handlers::http::routes::HandlerResult;
use crate::handlers::http::utils::{deliver_no_content, parse_body};

/// Revoke the token named in the body. The route is public: the token to
/// revoke travels in the body, not in `Authorization`.
pub async fn handle_logout(req: Request<Bytes>, state: AppState) -> HandlerResult {
    info!("Processing logout request");

    let data: LogoutData = parse_body(&req, "Expected a body with the key 'token' in it")?;

    let expires_at = state.sessions.revoke(&data.token).await?;
    info!("Token revoked until {}", expires_at);

    Ok(deliver_no_content()?)
}
