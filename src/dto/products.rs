use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{Category, Product},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub images: Vec<String>,
    pub category: String,
    pub stock: i32,
    pub featured: Option<bool>,
}

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub images: Vec<String>,
    pub category: Category,
    pub stock: i32,
    pub featured: bool,
}

impl CreateProductRequest {
    pub fn validate(self) -> AppResult<NewProduct> {
        let name = required_text(&self.name, "name")?;
        let description = required_text(&self.description, "description")?;
        if self.price < 0 {
            return Err(AppError::validation("price must not be negative"));
        }
        if self.stock < 0 {
            return Err(AppError::validation("stock must not be negative"));
        }
        let images = clean_images(self.images);
        if images.is_empty() {
            return Err(AppError::validation("Product must have at least one image"));
        }
        let category = parse_category(&self.category)?;

        Ok(NewProduct {
            name,
            description,
            price: self.price,
            images,
            category,
            stock: self.stock,
            featured: self.featured.unwrap_or(false),
        })
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub images: Option<Vec<String>>,
    pub category: Option<String>,
    pub stock: Option<i32>,
}

/// Fully specified partial update. `None` keeps the stored value.
///
/// Falsy input (empty string, zero, empty list) is folded into `None`, so
/// this path can never set price or stock to zero or blank out a field.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub images: Option<Vec<String>>,
    pub category: Option<Category>,
    pub stock: Option<i32>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        *self == ProductPatch::default()
    }
}

impl UpdateProductRequest {
    pub fn into_patch(self) -> AppResult<ProductPatch> {
        let price = match self.price {
            Some(p) if p < 0 => return Err(AppError::validation("price must not be negative")),
            Some(0) | None => None,
            Some(p) => Some(p),
        };
        let stock = match self.stock {
            Some(s) if s < 0 => return Err(AppError::validation("stock must not be negative")),
            Some(0) | None => None,
            Some(s) => Some(s),
        };
        let category = match non_blank(self.category) {
            Some(raw) => Some(parse_category(&raw)?),
            None => None,
        };
        let images = self.images.map(clean_images).filter(|imgs| !imgs.is_empty());

        Ok(ProductPatch {
            name: non_blank(self.name),
            description: non_blank(self.description),
            price,
            images,
            category,
            stock,
        })
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductListQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    /// One of `price-asc`, `price-desc`, `newest`, `rating`.
    pub sort: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: i64,
    pub pages: i64,
    pub total: i64,
}

fn required_text(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_images(images: Vec<String>) -> Vec<String> {
    images
        .into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect()
}

pub fn parse_category(raw: &str) -> AppResult<Category> {
    raw.parse::<Category>()
        .map_err(|err| AppError::validation(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateProductRequest {
        CreateProductRequest {
            name: " Ferris Mug ".into(),
            description: "Coffee tastes better with Ferris".into(),
            price: 1299,
            images: vec!["https://img.example/mug.jpg".into()],
            category: "Home".into(),
            stock: 10,
            featured: None,
        }
    }

    #[test]
    fn create_request_normalizes_name_and_category() {
        let product = create_request().validate().unwrap();
        assert_eq!(product.name, "Ferris Mug");
        assert_eq!(product.category, Category::Home);
        assert!(!product.featured);
    }

    #[test]
    fn create_request_requires_an_image() {
        let mut req = create_request();
        req.images = vec!["  ".into()];
        let err = req.validate().unwrap_err();
        assert_eq!(err.to_string(), "Product must have at least one image");
    }

    #[test]
    fn create_request_rejects_negative_numbers_and_unknown_category() {
        let mut req = create_request();
        req.price = -1;
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));

        let mut req = create_request();
        req.category = "toys".into();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn falsy_update_fields_keep_existing_values() {
        let patch = UpdateProductRequest {
            name: Some("".into()),
            description: Some("   ".into()),
            price: Some(0),
            images: Some(vec![]),
            category: Some("".into()),
            stock: Some(0),
        }
        .into_patch()
        .unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn provided_update_fields_are_carried() {
        let patch = UpdateProductRequest {
            price: Some(500),
            category: Some("SPORTS".into()),
            ..Default::default()
        }
        .into_patch()
        .unwrap();
        assert_eq!(patch.price, Some(500));
        assert_eq!(patch.category, Some(Category::Sports));
        assert_eq!(patch.stock, None);
        assert_eq!(patch.name, None);
    }

    #[test]
    fn negative_update_values_are_rejected() {
        let err = UpdateProductRequest {
            stock: Some(-3),
            ..Default::default()
        }
        .into_patch()
        .unwrap_err();
        assert_eq!(err.to_string(), "stock must not be negative");
    }
}
