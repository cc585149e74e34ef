mod common;

use storefront_api::{
    dto::products::{ProductListQuery, UpdateProductRequest},
    error::AppError,
    services::product_service,
};

#[tokio::test]
async fn search_pages_and_sorts() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let tag = common::tag();
    for (i, price) in [4000_i64, 1000, 3000, 2000, 5000].into_iter().enumerate() {
        common::create_product(&state, &format!("{tag} item {i}"), price, 3).await?;
    }

    let query = |page: i64| ProductListQuery {
        search: Some(tag.to_uppercase()),
        sort: Some("price-asc".into()),
        page: Some(page),
        limit: Some(2),
        ..Default::default()
    };

    let first = product_service::list_products(&state, query(1))
        .await?
        .data
        .expect("page");
    assert_eq!(first.total, 5);
    assert_eq!(first.pages, 3);
    let prices: Vec<i64> = first.products.iter().map(|p| p.price).collect();
    assert_eq!(prices, [1000, 2000]);

    let last = product_service::list_products(&state, query(3))
        .await?
        .data
        .expect("page");
    assert_eq!(last.page, 3);
    assert_eq!(last.products.len(), 1);
    assert_eq!(last.products[0].price, 5000);

    let beyond = product_service::list_products(
        &state,
        ProductListQuery {
            search: Some(tag.clone()),
            page: Some(i64::MAX),
            limit: Some(100),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("page");
    assert!(beyond.products.is_empty());
    assert_eq!(beyond.total, 5);

    let capped = product_service::list_products(
        &state,
        ProductListQuery {
            search: Some(tag.clone()),
            min_price: Some(2000),
            max_price: Some(4000),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("page");
    assert_eq!(capped.total, 3);

    Ok(())
}

#[tokio::test]
async fn unknown_category_filter_is_a_validation_error() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let Err(err) = product_service::list_products(
        &state,
        ProductListQuery {
            category: Some("garden".into()),
            ..Default::default()
        },
    )
    .await
    else {
        panic!("garden is not a category");
    };
    assert!(matches!(err, AppError::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn zero_and_blank_fields_leave_product_untouched() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::create_user(&state, true).await?;
    let shopper = common::create_user(&state, false).await?;
    let id = common::create_product(&state, "Bamboo Board", 2200, 6).await?;

    let updated = product_service::update_product(
        &state,
        &admin,
        id,
        UpdateProductRequest {
            name: Some(String::new()),
            price: Some(0),
            stock: Some(0),
            description: Some("Now oiled".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("product");
    assert_eq!(updated.name, "Bamboo Board");
    assert_eq!(updated.price, 2200);
    assert_eq!(updated.stock, 6);
    assert_eq!(updated.description, "Now oiled");

    let Err(err) =
        product_service::update_product(&state, &shopper, id, UpdateProductRequest::default())
            .await
    else {
        panic!("shoppers cannot edit products");
    };
    assert!(matches!(err, AppError::Forbidden));

    product_service::delete_product(&state, &admin, id).await?;
    let Err(err) = product_service::get_product(&state, id).await else {
        panic!("product was deleted");
    };
    assert!(matches!(err, AppError::NotFound("Product")));

    Ok(())
}
