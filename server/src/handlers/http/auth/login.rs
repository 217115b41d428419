use bytes::Bytes;
use hyper::{Request, StatusCode};
use tracing::info;

use shared::types::LoginData;

use crate::AppState;
use crate::handlers::http::routes::HandlerResult;
use crate::handlers::http::utils::{
    deliver_serialized_json, parse_body, validate_string, validate_username_or_email,
};

/// Check credentials and hand back a fresh token.
pub async fn handle_login(req: Request<Bytes>, state: AppState) -> HandlerResult {
    info!("Processing login request");

    let data: LoginData = parse_body(
        &req,
        "Expected a body with the emailOrUsername and password fields",
    )?;

    validate_username_or_email(&data.email_or_username)?;
    validate_string(&data.password, "password")?;

    let user = state
        .users
        .login(&data.email_or_username, &data.password)
        .await?;
    info!("User logged in successfully: {} (ID: {})", user.username, user.id);

    let response = state.sessions.issue(user)?;
    Ok(deliver_serialized_json(&response, StatusCode::OK)?)
}
