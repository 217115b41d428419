use bytes::Bytes;
use hyper::{Request, StatusCode};
use tracing::debug;

use crate::AppState;
use crate::auth::DecodedToken;
use crate::handlers::http::routes::HandlerResult;
use crate::handlers::http::utils::deliver_serialized_json;

pub async fn handle_list_users(
    _req: Request<Bytes>,
    state: AppState,
    identity: DecodedToken,
) -> HandlerResult {
    debug!("{} listing users", identity.payload.username);
    let users = state.users.list_users().await?;
    Ok(deliver_serialized_json(&users, StatusCode::OK)?)
}

/// The identity the gate attached, straight from the token.
pub async fn handle_me(
    _req: Request<Bytes>,
    _state: AppState,
    identity: DecodedToken,
) -> HandlerResult {
    Ok(deliver_serialized_json(&identity.payload, StatusCode::OK)?)
}

pub async fn handle_get_user(
    req: Request<Bytes>,
    state: AppState,
    _identity: DecodedToken,
) -> HandlerResult {
    let username = req
        .uri()
        .path()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    let user = state.users.get_user(username).await?;
    Ok(deliver_serialized_json(&user, StatusCode::OK)?)
}
