use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::{
    dto::auth::{LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest},
    error::AppResult,
    middleware::auth::{AuthUser, clear_session_cookie, session_cookie},
    models::User,
    response::{ApiResponse, Meta},
    services::auth_service::{get_profile, login_user, register_user, update_profile},
    state::AppState,
};

type WithCookie<T> = (StatusCode, CookieJar, Json<ApiResponse<T>>);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/profile", get(profile).put(edit_profile))
}

#[utoipa::path(
    post,
    path = "/api/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register user and start a session", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Invalid input or email taken")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<WithCookie<LoginResponse>> {
    let resp = register_user(&state, payload).await?;
    let jar = jar.add(cookie_for(&state, &resp));
    Ok((StatusCode::CREATED, jar, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> AppResult<WithCookie<LoginResponse>> {
    let resp = login_user(&state, payload).await?;
    let jar = jar.add(cookie_for(&state, &resp));
    Ok((StatusCode::OK, jar, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/users/logout",
    responses(
        (status = 200, description = "Session cookie cleared")
    ),
    tag = "Auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> WithCookie<serde_json::Value> {
    let body = ApiResponse::success(
        "Logged out successfully",
        serde_json::json!({}),
        Some(Meta::empty()),
    );
    (
        StatusCode::OK,
        jar.add(clear_session_cookie(&state.config)),
        Json(body),
    )
}

#[utoipa::path(
    get,
    path = "/api/users/profile",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<User>),
        (status = 401, description = "Not logged in")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = get_profile(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/users/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ApiResponse<User>),
        (status = 400, description = "Invalid input or email taken"),
        (status = 401, description = "Not logged in")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn edit_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = update_profile(&state, &user, payload).await?;
    Ok(Json(resp))
}

fn cookie_for(state: &AppState, resp: &ApiResponse<LoginResponse>) -> Cookie<'static> {
    let token = resp.data.as_ref().map(|d| d.token.as_str()).unwrap_or_default();
    session_cookie(&state.config, token)
}
