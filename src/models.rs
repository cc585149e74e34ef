use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Product categories. Input is matched case-insensitively and always
/// stored in its lowercase form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Electronics,
    Clothing,
    Home,
    Beauty,
    Sports,
    Books,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Electronics,
        Category::Clothing,
        Category::Home,
        Category::Beauty,
        Category::Sports,
        Category::Books,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "electronics",
            Category::Clothing => "clothing",
            Category::Home => "home",
            Category::Beauty => "beauty",
            Category::Sports => "sports",
            Category::Books => "books",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` is not a valid category", self.0)
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Minor currency units.
    pub price: i64,
    pub images: Vec<String>,
    pub category: String,
    pub stock: i32,
    pub rating: f64,
    pub num_reviews: i32,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The product fields expanded into each cart line.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartProduct {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub images: Vec<String>,
    pub stock: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub product: CartProduct,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn quantity_of(&self, product_id: Uuid) -> Option<i32> {
        self.items
            .iter()
            .find(|line| line.product.id == product_id)
            .map(|line| line.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub price: i64,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub total_price: i64,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parsing_is_case_insensitive() {
        assert_eq!("Electronics".parse::<Category>(), Ok(Category::Electronics));
        assert_eq!(" CLOTHING ".parse::<Category>(), Ok(Category::Clothing));
        assert_eq!("books".parse::<Category>(), Ok(Category::Books));
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = "toys".parse::<Category>().unwrap_err();
        assert_eq!(err.to_string(), "`toys` is not a valid category");
    }

    #[test]
    fn category_serializes_lowercase() {
        let json = serde_json::to_value(Category::Home).unwrap();
        assert_eq!(json, serde_json::json!("home"));
    }
}
