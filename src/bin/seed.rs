//! Seeds an admin account and a sample catalog.
//!
//! `seed` replaces every product with the sample set; `seed -d` only removes
//! products.

use storefront_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    services::auth_service::hash_password,
};
use uuid::Uuid;

struct SeedProduct {
    name: &'static str,
    description: &'static str,
    price: i64,
    images: &'static [&'static str],
    category: &'static str,
    stock: i32,
    rating: f64,
    num_reviews: i32,
    featured: bool,
}

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name: "Wireless Noise Cancelling Headphones",
        description: "Over-ear wireless headphones with active noise cancellation and a 30-hour battery.",
        price: 24999,
        images: &[
            "https://images.pexels.com/photos/3394650/pexels-photo-3394650.jpeg",
            "https://images.pexels.com/photos/3394665/pexels-photo-3394665.jpeg",
        ],
        category: "electronics",
        stock: 25,
        rating: 4.8,
        num_reviews: 127,
        featured: true,
    },
    SeedProduct {
        name: "Smart Fitness Watch",
        description: "Heart rate, GPS and sleep tracking with a 7-day battery. Water-resistant.",
        price: 19999,
        images: &["https://images.pexels.com/photos/437037/pexels-photo-437037.jpeg"],
        category: "electronics",
        stock: 42,
        rating: 4.5,
        num_reviews: 89,
        featured: true,
    },
    SeedProduct {
        name: "Premium Cotton T-Shirt",
        description: "Organic cotton t-shirt with a modern fit.",
        price: 2999,
        images: &["https://images.pexels.com/photos/428340/pexels-photo-428340.jpeg"],
        category: "clothing",
        stock: 150,
        rating: 4.3,
        num_reviews: 214,
        featured: false,
    },
    SeedProduct {
        name: "Designer Denim Jacket",
        description: "Classic denim jacket in a premium wash.",
        price: 8999,
        images: &["https://images.pexels.com/photos/1040945/pexels-photo-1040945.jpeg"],
        category: "clothing",
        stock: 75,
        rating: 4.7,
        num_reviews: 63,
        featured: true,
    },
    SeedProduct {
        name: "Ceramic Pour-Over Set",
        description: "Dripper, carafe and two cups for slow mornings.",
        price: 4599,
        images: &["https://images.pexels.com/photos/302899/pexels-photo-302899.jpeg"],
        category: "home",
        stock: 30,
        rating: 4.6,
        num_reviews: 41,
        featured: false,
    },
    SeedProduct {
        name: "Async Rust in Practice",
        description: "A field guide to futures, executors and structured concurrency.",
        price: 3999,
        images: &["https://images.pexels.com/photos/159711/books-bookstore-book-reading-159711.jpeg"],
        category: "books",
        stock: 60,
        rating: 4.9,
        num_reviews: 18,
        featured: false,
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url, 1).await?;
    run_migrations(&pool).await?;

    let destroy = std::env::args().nth(1).as_deref() == Some("-d");

    let removed = sqlx::query("DELETE FROM products").execute(&pool).await?;
    println!("Removed {} products", removed.rows_affected());
    if destroy {
        return Ok(());
    }

    let admin_id = ensure_admin(&pool, "admin@example.com", "admin123").await?;
    seed_products(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}");
    Ok(())
}

async fn ensure_admin(pool: &sqlx::PgPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, password_hash, is_admin)
        VALUES ($1, $2, $3, $4, TRUE)
        ON CONFLICT (email) DO UPDATE SET is_admin = TRUE
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind("Admin User")
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    println!("Ensured admin {email}");
    Ok(id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    for product in PRODUCTS {
        let images: Vec<String> = product.images.iter().map(|s| s.to_string()).collect();
        sqlx::query(
            r#"
            INSERT INTO products
                (id, name, description, price, images, category, stock, rating, num_reviews, featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product.name)
        .bind(product.description)
        .bind(product.price)
        .bind(images)
        .bind(product.category)
        .bind(product.stock)
        .bind(product.rating)
        .bind(product.num_reviews)
        .bind(product.featured)
        .execute(pool)
        .await?;
    }

    println!("Seeded {} products", PRODUCTS.len());
    Ok(())
}
