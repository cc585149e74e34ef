use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Utc};
use password_hash::rand_core::OsRng;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::auth::{
        LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest, check_password,
        normalize_email,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, issue_token},
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    is_admin: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            is_admin: row.is_admin,
            created_at: row.created_at,
        }
    }
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let RegisterRequest {
        name,
        email,
        password,
    } = payload.validate()?;

    if email_taken(&state.pool, &email, None).await? {
        return Err(AppError::validation("Email is already taken"));
    }

    let password_hash = hash_password(&password)?;
    let user: UserRow = sqlx::query_as(
        "INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(name.as_str())
    .bind(email.as_str())
    .bind(password_hash)
    .fetch_one(&state.pool)
    .await?;

    let token = issue_token(&state.config, user.id, user.is_admin)?;
    tracing::info!(user_id = %user.id, "user registered");

    audit::record(
        &state.pool,
        user.id,
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "User created",
        LoginResponse {
            token,
            user: user.into(),
        },
        Some(Meta::empty()),
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let email = email.trim().to_lowercase();
    let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(&state.pool)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AppError::Unauthenticated("invalid email or password")),
    };

    if !verify_password(&password, &user.password_hash)? {
        return Err(AppError::Unauthenticated("invalid email or password"));
    }

    let token = issue_token(&state.config, user.id, user.is_admin)?;

    audit::record(
        &state.pool,
        user.id,
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token,
            user: user.into(),
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let row = find_user(&state.pool, user.user_id).await?;
    Ok(ApiResponse::success("Profile", User::from(row), None))
}

/// Blank or missing fields keep their stored values.
pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    let existing = find_user(&state.pool, user.user_id).await?;

    let name = payload
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or(existing.name);

    let email = match payload.email.filter(|e| !e.trim().is_empty()) {
        Some(raw) => {
            let email = normalize_email(&raw)?;
            if email_taken(&state.pool, &email, Some(existing.id)).await? {
                return Err(AppError::validation("Email is already taken"));
            }
            email
        }
        None => existing.email,
    };

    let password_hash = match payload.password.filter(|p| !p.is_empty()) {
        Some(password) => {
            check_password(&password)?;
            hash_password(&password)?
        }
        None => existing.password_hash,
    };

    let updated: UserRow = sqlx::query_as(
        r#"
        UPDATE users
        SET name = $2, email = $3, password_hash = $4
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(existing.id)
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .fetch_one(&state.pool)
    .await?;

    audit::record(
        &state.pool,
        updated.id,
        "user_update",
        "users",
        serde_json::json!({ "user_id": updated.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Profile updated",
        User::from(updated),
        Some(Meta::empty()),
    ))
}

async fn find_user(pool: &DbPool, id: Uuid) -> AppResult<UserRow> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User"))
}

async fn email_taken(pool: &DbPool, email: &str, except: Option<Uuid>) -> AppResult<bool> {
    let exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(matches!(exist, Some((id,)) if Some(id) != except))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
