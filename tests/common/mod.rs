#![allow(dead_code)]

use sea_orm::ActiveModelTrait;
use sea_orm::ActiveValue::NotSet;
use sea_orm::Set;
use storefront_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    entity::{products::ActiveModel as ProductActive, users::ActiveModel as UserActive},
    middleware::auth::AuthUser,
    state::AppState,
};
use uuid::Uuid;

pub fn test_config(database_url: &str) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "integration-secret".into(),
        jwt_ttl_hours: 1,
        cors_origins: vec!["http://localhost:5173".into()],
        cookie_secure: false,
        db_max_connections: 5,
        concurrency_limit: 32,
    }
}

/// Connects to the test database, or returns `None` so the caller can skip.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run flow tests.");
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url, 5).await?;
    run_migrations(&pool).await?;
    Ok(Some(AppState::new(pool, test_config(&database_url))))
}

/// Tests share one database, so every row they create carries a fresh tag.
pub fn tag() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_string()
}

pub async fn create_user(state: &AppState, is_admin: bool) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set("Test Shopper".into()),
        email: Set(format!("{}@example.com", tag())),
        password_hash: Set("not-a-real-hash".into()),
        is_admin: Set(is_admin),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        is_admin,
    })
}

pub async fn create_product(
    state: &AppState,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set("Fixture product".into()),
        price: Set(price),
        images: Set(vec!["https://img.example/fixture.jpg".into()]),
        category: Set("home".into()),
        stock: Set(stock),
        rating: Set(0.0),
        num_reviews: Set(0),
        featured: Set(false),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(product.id)
}
