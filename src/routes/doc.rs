use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest},
        cart::CartItemRequest,
        orders::{CreateOrderRequest, OrderItemRequest, OrderList},
        products::{CreateProductRequest, ProductPage, UpdateProductRequest},
    },
    models::{Cart, CartLine, CartProduct, Category, Order, OrderItem, Product, ShippingAddress, User},
    response::{ApiResponse, Meta},
    routes::{auth, cart, health, orders, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::logout,
        auth::profile,
        auth::edit_profile,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        cart::get_cart,
        cart::add_item,
        cart::update_item,
        cart::remove_item,
        cart::clear_cart,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::pay_order,
        orders::deliver_order
    ),
    components(
        schemas(
            User,
            Product,
            Category,
            Cart,
            CartLine,
            CartProduct,
            Order,
            OrderItem,
            ShippingAddress,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UpdateProfileRequest,
            CreateProductRequest,
            UpdateProductRequest,
            ProductPage,
            CartItemRequest,
            CreateOrderRequest,
            OrderItemRequest,
            OrderList,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductPage>,
            ApiResponse<Cart>,
            ApiResponse<Order>,
            ApiResponse<OrderList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness endpoint"),
        (name = "Auth", description = "Registration, login and profile"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Per-user cart endpoints"),
        (name = "Orders", description = "Checkout and order endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
