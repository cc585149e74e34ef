use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Order, ShippingAddress},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    #[serde(alias = "product")]
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub price: i64,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub order_items: Vec<OrderItemRequest>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub total_price: i64,
}

impl CreateOrderRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.order_items.is_empty() {
            return Err(AppError::validation("No order items"));
        }
        for item in &self.order_items {
            if item.quantity < 1 {
                return Err(AppError::validation(format!(
                    "quantity for {} must be at least 1",
                    item.name
                )));
            }
            if item.price < 0 {
                return Err(AppError::validation(format!(
                    "price for {} must not be negative",
                    item.name
                )));
            }
        }
        if self.total_price < 0 {
            return Err(AppError::validation("totalPrice must not be negative"));
        }
        let address = &self.shipping_address;
        for (field, value) in [
            ("address", &address.address),
            ("city", &address.city),
            ("postalCode", &address.postal_code),
            ("country", &address.country),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "shippingAddress.{field} is required"
                )));
            }
        }
        if self.payment_method.trim().is_empty() {
            return Err(AppError::validation("paymentMethod is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
