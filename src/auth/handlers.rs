use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, SignupRequest, TokenResponse},
        error::AuthError,
        extractors::Bearer,
        jwt::JwtKeys,
        services::AuthService,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

fn service(state: &AppState) -> AuthService {
    AuthService::new(state.store.clone(), JwtKeys::from_ref(state))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AuthError> {
    let user = service(&state)
        .signup(&payload.email, &payload.name, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let token = service(&state)
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(TokenResponse::bearer(token)))
}

#[instrument(skip(state, token))]
pub async fn me(
    State(state): State<AppState>,
    Bearer(token): Bearer,
) -> Result<Json<PublicUser>, AuthError> {
    let user = service(&state).current_user(&token).await?;
    Ok(Json(user.into()))
}
