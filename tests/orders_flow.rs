mod common;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use storefront_api::{
    dto::{
        cart::CartItemRequest,
        orders::{CreateOrderRequest, OrderItemRequest},
    },
    entity::{
        audit_logs::{Column as AuditCol, Entity as AuditLogs},
        orders::{Column as OrderCol, Entity as Orders},
        products::Entity as Products,
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::ShippingAddress,
    services::{cart_service, order_service},
};
use uuid::Uuid;

fn address() -> ShippingAddress {
    ShippingAddress {
        address: "1 Crab Lane".into(),
        city: "Portland".into(),
        postal_code: "97201".into(),
        country: "US".into(),
    }
}

fn order_for(lines: &[(Uuid, i32, i64)]) -> CreateOrderRequest {
    CreateOrderRequest {
        order_items: lines
            .iter()
            .map(|&(product_id, quantity, price)| OrderItemRequest {
                product_id,
                name: "Fixture".into(),
                quantity,
                price,
                image: String::new(),
            })
            .collect(),
        shipping_address: address(),
        payment_method: "PayPal".into(),
        total_price: lines.iter().map(|&(_, q, p)| q as i64 * p).sum(),
    }
}

async fn stock_of(state: &storefront_api::state::AppState, id: Uuid) -> anyhow::Result<i32> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .expect("product exists");
    Ok(product.stock)
}

// cart -> order -> stock decremented, cart emptied -> paid -> delivered
#[tokio::test]
async fn checkout_decrements_stock_clears_cart_and_records_payment() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let shopper = common::create_user(&state, false).await?;
    let admin = common::create_user(&state, true).await?;
    let mug = common::create_product(&state, "Ferris Mug", 1500, 10).await?;

    cart_service::add_item(
        &state,
        &shopper,
        CartItemRequest {
            product_id: mug,
            quantity: 2,
        },
    )
    .await?;

    let created = order_service::create_order(&state, &shopper, order_for(&[(mug, 2, 1500)])).await?;
    let order = created.data.expect("order");
    assert_eq!(order.user_id, shopper.user_id);
    assert_eq!(order.total_price, 3000);
    assert_eq!(order.order_items.len(), 1);
    assert!(!order.is_paid);

    assert_eq!(stock_of(&state, mug).await?, 8);
    let cart = cart_service::get_cart(&state, &shopper).await?.data.expect("cart");
    assert!(cart.items.is_empty());

    let audit = AuditLogs::find()
        .filter(AuditCol::UserId.eq(shopper.user_id))
        .filter(AuditCol::Action.eq("order_create"))
        .all(&state.orm)
        .await?;
    assert_eq!(audit.len(), 1);

    let paid = order_service::mark_paid(&state, &shopper, order.id)
        .await?
        .data
        .expect("order");
    assert!(paid.is_paid);
    let paid_at = paid.paid_at.expect("paid_at");

    // Paying twice keeps the first timestamp.
    let again = order_service::mark_paid(&state, &shopper, order.id)
        .await?
        .data
        .expect("order");
    assert_eq!(again.paid_at, Some(paid_at));

    let delivered = order_service::mark_delivered(&state, &admin, order.id)
        .await?
        .data
        .expect("order");
    assert!(delivered.is_delivered);
    assert!(delivered.delivered_at.is_some());

    let listed = order_service::list_orders(&state, &shopper)
        .await?
        .data
        .expect("orders");
    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.items[0].id, order.id);

    Ok(())
}

#[tokio::test]
async fn short_stock_rolls_back_the_whole_order() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let shopper = common::create_user(&state, false).await?;
    let plenty = common::create_product(&state, "Tote Bag", 900, 10).await?;
    let scarce = common::create_product(&state, "Signed Poster", 5000, 1).await?;

    let result = order_service::create_order(
        &state,
        &shopper,
        order_for(&[(plenty, 3, 900), (scarce, 2, 5000)]),
    )
    .await;
    let Err(err) = result else {
        panic!("order should fail on short stock");
    };
    assert!(matches!(err, AppError::InsufficientStock { ref product } if product == "Signed Poster"));

    assert_eq!(stock_of(&state, plenty).await?, 10);
    assert_eq!(stock_of(&state, scarce).await?, 1);
    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(shopper.user_id))
        .all(&state.orm)
        .await?;
    assert!(orders.is_empty());

    Ok(())
}

#[tokio::test]
async fn empty_order_is_rejected_without_side_effects() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let shopper = common::create_user(&state, false).await?;

    let Err(err) = order_service::create_order(&state, &shopper, order_for(&[])).await else {
        panic!("empty order should fail");
    };
    assert!(matches!(err, AppError::Validation(ref msg) if msg == "No order items"));

    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(shopper.user_id))
        .all(&state.orm)
        .await?;
    assert!(orders.is_empty());

    Ok(())
}

#[tokio::test]
async fn product_missing_from_catalog_does_not_block_the_order() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let shopper = common::create_user(&state, false).await?;
    let gone = Uuid::new_v4();

    let order = order_service::create_order(&state, &shopper, order_for(&[(gone, 1, 700)]))
        .await?
        .data
        .expect("order");
    assert_eq!(order.order_items[0].product_id, gone);

    Ok(())
}

#[tokio::test]
async fn only_owner_or_admin_may_read_an_order() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let owner = common::create_user(&state, false).await?;
    let stranger = common::create_user(&state, false).await?;
    let admin = common::create_user(&state, true).await?;
    let lamp = common::create_product(&state, "Desk Lamp", 3200, 4).await?;

    let order = order_service::create_order(&state, &owner, order_for(&[(lamp, 1, 3200)]))
        .await?
        .data
        .expect("order");

    let Err(err) = order_service::get_order(&state, &stranger, order.id).await else {
        panic!("stranger must not read the order");
    };
    assert!(matches!(err, AppError::Unauthorized));

    let Err(err) = order_service::mark_paid(&state, &stranger, order.id).await else {
        panic!("stranger must not pay the order");
    };
    assert!(matches!(err, AppError::Unauthorized));

    let Err(err) = order_service::mark_delivered(&state, &owner, order.id).await else {
        panic!("owner is not an admin");
    };
    assert!(matches!(err, AppError::Forbidden));

    let seen = order_service::get_order(&state, &admin, order.id)
        .await?
        .data
        .expect("order");
    assert_eq!(seen.id, order.id);

    let missing = AuthUser {
        user_id: owner.user_id,
        is_admin: false,
    };
    let Err(err) = order_service::get_order(&state, &missing, Uuid::new_v4()).await else {
        panic!("unknown order id");
    };
    assert!(matches!(err, AppError::NotFound("Order")));

    Ok(())
}
