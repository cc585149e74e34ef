use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Body of both `POST /cart/add` and `PUT /cart/update`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

impl CartItemRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.quantity < 1 {
            return Err(AppError::validation("quantity must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_body_is_accepted() {
        let id = Uuid::new_v4();
        let req: CartItemRequest =
            serde_json::from_value(serde_json::json!({ "productId": id, "quantity": 2 })).unwrap();
        assert_eq!(req.product_id, id);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let req = CartItemRequest {
            product_id: Uuid::new_v4(),
            quantity: 0,
        };
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }
}
