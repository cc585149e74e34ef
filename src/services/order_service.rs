use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CreateOrderRequest, OrderItemRequest, OrderList},
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_owner_or_admin},
    models::{Order, OrderItem, ShippingAddress},
    response::{ApiResponse, Meta},
    services::cart_service::clear_items,
    state::AppState,
};

/// Places an order from the submitted line items.
///
/// The snapshot insert, the per-line stock decrements and the cart clear run
/// in one transaction. Each decrement only applies while `stock >= quantity`;
/// a line that cannot be covered rolls the whole order back.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    payload.validate()?;
    let txn = state.orm.begin().await?;

    let address = payload.shipping_address;
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        address: Set(address.address.trim().to_string()),
        city: Set(address.city.trim().to_string()),
        postal_code: Set(address.postal_code.trim().to_string()),
        country: Set(address.country.trim().to_string()),
        payment_method: Set(payload.payment_method.trim().to_string()),
        total_price: Set(payload.total_price),
        is_paid: Set(false),
        paid_at: Set(None),
        is_delivered: Set(false),
        delivered_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(payload.order_items.len());
    for (line_no, item) in payload.order_items.iter().enumerate() {
        let row = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            line_no: Set(line_no as i32),
            product_id: Set(item.product_id),
            name: Set(item.name.clone()),
            quantity: Set(item.quantity),
            price: Set(item.price),
            image: Set(item.image.clone()),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        items.push(row);
    }

    for item in &payload.order_items {
        decrement_stock(&txn, item).await?;
    }

    let cleared = clear_items(&txn, user.user_id).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        lines = items.len(),
        cleared,
        "order created"
    );

    audit::record(
        &state.pool,
        user.user_id,
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_price": order.total_price }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        order_from_entity(order, items),
        Some(Meta::empty()),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order = find_order(&state.orm, id).await?;
    ensure_owner_or_admin(user, order.user_id)?;

    let items = load_items(&state.orm, order.id).await?;
    Ok(ApiResponse::success(
        "OK",
        order_from_entity(order, items),
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderList>> {
    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_asc(OrderCol::CreatedAt)
        .order_by_asc(OrderCol::Id)
        .all(&state.orm)
        .await?;

    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut items_by_order: HashMap<Uuid, Vec<OrderItemModel>> = HashMap::new();
    if !ids.is_empty() {
        let rows = OrderItems::find()
            .filter(OrderItemCol::OrderId.is_in(ids))
            .order_by_asc(OrderItemCol::LineNo)
            .all(&state.orm)
            .await?;
        for row in rows {
            items_by_order.entry(row.order_id).or_default().push(row);
        }
    }

    let total = orders.len() as i64;
    let items = orders
        .into_iter()
        .map(|order| {
            let lines = items_by_order.remove(&order.id).unwrap_or_default();
            order_from_entity(order, lines)
        })
        .collect();

    Ok(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(Meta::new(1, total, total)),
    ))
}

/// Records payment. There is no gateway behind this; it only flips the flag.
/// Paying an already paid order keeps the original `paid_at`.
pub async fn mark_paid(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, id).await?;
    ensure_owner_or_admin(user, order.user_id)?;

    let order = if order.is_paid {
        order
    } else {
        let now = Utc::now();
        let mut active: OrderActive = order.into();
        active.is_paid = Set(true);
        active.paid_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        active.update(&txn).await?
    };
    let items = load_items(&txn, order.id).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "order_paid",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment recorded",
        order_from_entity(order, items),
        Some(Meta::empty()),
    ))
}

pub async fn mark_delivered(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, id).await?;

    let order = if order.is_delivered {
        order
    } else {
        let now = Utc::now();
        let mut active: OrderActive = order.into();
        active.is_delivered = Set(true);
        active.delivered_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        active.update(&txn).await?
    };
    let items = load_items(&txn, order.id).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "order_delivered",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order delivered",
        order_from_entity(order, items),
        Some(Meta::empty()),
    ))
}

async fn decrement_stock(txn: &DatabaseTransaction, item: &OrderItemRequest) -> AppResult<()> {
    let result = Products::update_many()
        .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(item.quantity))
        .col_expr(ProdCol::UpdatedAt, SimpleExpr::from(Expr::current_timestamp()))
        .filter(ProdCol::Id.eq(item.product_id))
        .filter(ProdCol::Stock.gte(item.quantity))
        .exec(txn)
        .await?;

    if result.rows_affected > 0 {
        return Ok(());
    }

    match Products::find_by_id(item.product_id).one(txn).await? {
        Some(product) => Err(AppError::InsufficientStock {
            product: product.name,
        }),
        None => {
            tracing::warn!(
                product_id = %item.product_id,
                "ordered product no longer in catalog; stock left untouched"
            );
            Ok(())
        }
    }
}

async fn find_order<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("Order"))
}

async fn lock_order(txn: &DatabaseTransaction, id: Uuid) -> AppResult<OrderModel> {
    Orders::find()
        .filter(OrderCol::Id.eq(id))
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound("Order"))
}

async fn load_items<C: ConnectionTrait>(db: &C, order_id: Uuid) -> AppResult<Vec<OrderItemModel>> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::LineNo)
        .all(db)
        .await?;
    Ok(items)
}

fn order_from_entity(model: OrderModel, items: Vec<OrderItemModel>) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        order_items: items.into_iter().map(order_item_from_entity).collect(),
        shipping_address: ShippingAddress {
            address: model.address,
            city: model.city,
            postal_code: model.postal_code,
            country: model.country,
        },
        payment_method: model.payment_method,
        total_price: model.total_price,
        is_paid: model.is_paid,
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        is_delivered: model.is_delivered,
        delivered_at: model.delivered_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        product_id: model.product_id,
        name: model.name,
        quantity: model.quantity,
        price: model.price,
        image: model.image,
    }
}
