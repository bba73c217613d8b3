use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        State,
    },
    routing::{get, post},
    Form, Json, Router,
};
use tracing::{debug, instrument};

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        error::{AuthError, AuthResult},
        extractors::BearerToken,
    },
    state::AppState,
    users::model::User,
};

/// Body rejections carry serde's text, which quotes the offending value
/// (possibly a password). Only a fixed message leaves this module.
fn json_rejection(rejection: JsonRejection) -> AuthError {
    debug!(status = %rejection.status(), "register body rejected");
    let message = match rejection {
        JsonRejection::JsonDataError(_) => "Request body has missing or invalid fields",
        JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON",
        JsonRejection::MissingJsonContentType(_) => "Expected `Content-Type: application/json`",
        _ => "Invalid request body",
    };
    AuthError::Validation(message.into())
}

fn form_rejection(rejection: FormRejection) -> AuthError {
    debug!(status = %rejection.status(), "login form rejected");
    let message = match rejection {
        FormRejection::InvalidFormContentType(_) => {
            "Expected `Content-Type: application/x-www-form-urlencoded`"
        }
        FormRejection::FailedToDeserializeForm(_)
        | FormRejection::FailedToDeserializeFormBody(_) => "Form has missing or invalid fields",
        _ => "Invalid request body",
    };
    AuthError::Validation(message.into())
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile", get(profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AuthResult<&'static str> {
    let Json(payload) = payload.map_err(json_rejection)?;
    state.auth.register(payload).await
}

/// Returns the bearer token as the plain response body.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Form<LoginRequest>, FormRejection>,
) -> AuthResult<String> {
    let Form(payload) = payload.map_err(form_rejection)?;
    state
        .auth
        .authenticate(&payload.email, &payload.password)
        .await
}

#[instrument(skip_all)]
pub async fn profile(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> AuthResult<Json<User>> {
    state.auth.get_profile(&token).await.map(Json)
}
