use bytes::Bytes;
use hyper::{Request, StatusCode};
use tracing::info;

use shared::types::RegistrationData;

use crate::AppState;
use crate::handlers::http::routes::HandlerResult;
use crate::handlers::http::utils::{
    deliver_serialized_json, parse_body, validate_email, validate_string,
};

/// Create an account and log it in straight away.
pub async fn handle_register(req: Request<Bytes>, state: AppState) -> HandlerResult {
    info!("Processing registration request");

    let data: RegistrationData = parse_body(
        &req,
        "Expected a body with the user account data in it",
    )?;

    validate_string(&data.username, "username")?;
    validate_string(&data.password, "password")?;
    validate_email(&data.email)?;

    let user = state
        .users
        .create_user(&data.username, &data.email, &data.password)
        .await?;
    info!("User registered successfully: {} (ID: {})", user.username, user.id);

    let response = state.sessions.issue(user)?;
    Ok(deliver_serialized_json(&response, StatusCode::CREATED)?)
}
