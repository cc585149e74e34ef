use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::CartItemRequest,
    entity::{
        cart_items::{ActiveModel as CartItemActive, Column as ItemCol, Entity as CartItems},
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
        products::{Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Cart, CartLine, CartProduct},
    response::ApiResponse,
    services::product_service::find_product,
    state::AppState,
};

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Cart>> {
    let cart = get_or_create_cart(&state.orm, user.user_id).await?;
    let cart = load_cart(&state.orm, cart).await?;
    Ok(ApiResponse::success("Cart", cart, None))
}

/// Adds `quantity` units of a product. Only the incoming quantity is checked
/// against stock; the accumulated line total is not.
pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    payload: CartItemRequest,
) -> AppResult<ApiResponse<Cart>> {
    payload.validate()?;
    let product = find_product(&state.orm, payload.product_id).await?;
    check_stock(&product, payload.quantity)?;

    let cart = get_or_create_cart(&state.orm, user.user_id).await?;

    // Insert or increment in one statement.
    CartItems::insert(CartItemActive {
        id: Set(Uuid::new_v4()),
        cart_id: Set(cart.id),
        product_id: Set(product.id),
        quantity: Set(payload.quantity),
        created_at: Set(Utc::now().into()),
    })
    .on_conflict(
        OnConflict::columns([ItemCol::CartId, ItemCol::ProductId])
            .value(
                ItemCol::Quantity,
                Expr::col((CartItems, ItemCol::Quantity)).add(payload.quantity),
            )
            .to_owned(),
    )
    .exec_without_returning(&state.orm)
    .await?;
    let cart = touch_cart(&state.orm, cart).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "cart_add",
        "cart_items",
        serde_json::json!({ "product_id": product.id, "quantity": payload.quantity }),
    )
    .await;

    let cart = load_cart(&state.orm, cart).await?;
    Ok(ApiResponse::success("Item added to cart", cart, None))
}

pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    payload: CartItemRequest,
) -> AppResult<ApiResponse<Cart>> {
    payload.validate()?;
    let product = find_product(&state.orm, payload.product_id).await?;
    check_stock(&product, payload.quantity)?;

    let cart = find_cart(&state.orm, user.user_id)
        .await?
        .ok_or(AppError::NotFound("Cart"))?;
    let line = find_line(&state.orm, cart.id, product.id)
        .await?
        .ok_or(AppError::NotFound("Cart item"))?;

    let mut active: CartItemActive = line.into();
    active.quantity = Set(payload.quantity);
    active.update(&state.orm).await?;
    let cart = touch_cart(&state.orm, cart).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "cart_update",
        "cart_items",
        serde_json::json!({ "product_id": product.id, "quantity": payload.quantity }),
    )
    .await;

    let cart = load_cart(&state.orm, cart).await?;
    Ok(ApiResponse::success("Cart updated", cart, None))
}

/// Removing a product that is not in the cart leaves it unchanged.
pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<Cart>> {
    let cart = find_cart(&state.orm, user.user_id)
        .await?
        .ok_or(AppError::NotFound("Cart"))?;

    let result = CartItems::delete_many()
        .filter(ItemCol::CartId.eq(cart.id))
        .filter(ItemCol::ProductId.eq(product_id))
        .exec(&state.orm)
        .await?;

    let cart = if result.rows_affected > 0 {
        audit::record(
            &state.pool,
            user.user_id,
            "cart_remove",
            "cart_items",
            serde_json::json!({ "product_id": product_id }),
        )
        .await;
        touch_cart(&state.orm, cart).await?
    } else {
        cart
    };

    let cart = load_cart(&state.orm, cart).await?;
    Ok(ApiResponse::success("Item removed from cart", cart, None))
}

pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Cart>> {
    let cart = find_cart(&state.orm, user.user_id)
        .await?
        .ok_or(AppError::NotFound("Cart"))?;

    clear_items(&state.orm, user.user_id).await?;
    let cart = touch_cart(&state.orm, cart).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "cart_clear",
        "cart_items",
        serde_json::json!({ "cart_id": cart.id }),
    )
    .await;

    let cart = load_cart(&state.orm, cart).await?;
    Ok(ApiResponse::success("Cart cleared successfully", cart, None))
}

pub(crate) async fn get_or_create_cart<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> AppResult<CartModel> {
    if let Some(cart) = find_cart(db, user_id).await? {
        return Ok(cart);
    }

    // Concurrent first reads race on the unique user_id; the loser re-reads.
    Carts::insert(CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        created_at: NotSet,
        updated_at: NotSet,
    })
    .on_conflict(OnConflict::column(CartCol::UserId).do_nothing().to_owned())
    .exec_without_returning(db)
    .await?;
    tracing::debug!(user_id = %user_id, "cart created");

    find_cart(db, user_id)
        .await?
        .ok_or(AppError::NotFound("Cart"))
}

/// Empties the user's cart if one exists. Returns the number of removed lines.
pub(crate) async fn clear_items<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<u64> {
    let Some(cart) = find_cart(db, user_id).await? else {
        return Ok(0);
    };
    let result = CartItems::delete_many()
        .filter(ItemCol::CartId.eq(cart.id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

async fn find_cart<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<Option<CartModel>> {
    let cart = Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .one(db)
        .await?;
    Ok(cart)
}

async fn find_line<C: ConnectionTrait>(
    db: &C,
    cart_id: Uuid,
    product_id: Uuid,
) -> AppResult<Option<crate::entity::cart_items::Model>> {
    let line = CartItems::find()
        .filter(ItemCol::CartId.eq(cart_id))
        .filter(ItemCol::ProductId.eq(product_id))
        .one(db)
        .await?;
    Ok(line)
}

async fn touch_cart<C: ConnectionTrait>(db: &C, cart: CartModel) -> AppResult<CartModel> {
    let mut active: CartActive = cart.into();
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(db).await?)
}

/// Expands each line with the product fields the cart view shows.
async fn load_cart<C: ConnectionTrait>(db: &C, cart: CartModel) -> AppResult<Cart> {
    let items = CartItems::find()
        .filter(ItemCol::CartId.eq(cart.id))
        .order_by_asc(ItemCol::CreatedAt)
        .order_by_asc(ItemCol::Id)
        .find_also_related(Products)
        .all(db)
        .await?
        .into_iter()
        .filter_map(|(line, product)| {
            product.map(|p| CartLine {
                product: cart_product(p),
                quantity: line.quantity,
            })
        })
        .collect();

    Ok(Cart {
        id: cart.id,
        user_id: cart.user_id,
        items,
        created_at: cart.created_at.with_timezone(&Utc),
        updated_at: cart.updated_at.with_timezone(&Utc),
    })
}

fn check_stock(product: &ProductModel, requested: i32) -> AppResult<()> {
    if product.stock < requested {
        return Err(AppError::InsufficientStock {
            product: product.name.clone(),
        });
    }
    Ok(())
}

fn cart_product(model: ProductModel) -> CartProduct {
    CartProduct {
        id: model.id,
        name: model.name,
        price: model.price,
        images: model.images,
        stock: model.stock,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i32) -> ProductModel {
        let now = Utc::now().into();
        ProductModel {
            id: Uuid::new_v4(),
            name: "Ferris Mug".into(),
            description: "Coffee tastes better with Ferris".into(),
            price: 1299,
            images: vec!["https://img.example/mug.jpg".into()],
            category: "home".into(),
            stock,
            rating: 4.5,
            num_reviews: 3,
            featured: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn stock_check_compares_requested_quantity_only() {
        let mug = product(5);
        assert!(check_stock(&mug, 5).is_ok());
        assert!(check_stock(&mug, 3).is_ok());
        let err = check_stock(&mug, 6).unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { .. }));
    }

    #[test]
    fn cart_product_keeps_display_fields() {
        let mug = product(7);
        let id = mug.id;
        let expanded = cart_product(mug);
        assert_eq!(expanded.id, id);
        assert_eq!(expanded.stock, 7);
        assert_eq!(expanded.images.len(), 1);
    }
}
