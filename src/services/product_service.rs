use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::products::{
        CreateProductRequest, ProductListQuery, ProductPage, UpdateProductRequest, parse_category,
    },
    entity::products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{Pagination, ProductSort, page_count},
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductListQuery,
) -> AppResult<ApiResponse<ProductPage>> {
    let (page, limit, offset) = Pagination {
        page: query.page,
        limit: query.limit,
    }
    .normalize();
    let mut condition = Condition::all();

    if let Some(raw) = query.category.as_deref().filter(|c| !c.trim().is_empty()) {
        let category = parse_category(raw)?;
        condition = condition.add(Column::Category.eq(category.as_str()));
    }

    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        condition = condition.add(Expr::col(Column::Name).ilike(like_pattern(search.trim())));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let finder = Products::find().filter(condition);
    let total = finder.clone().count(&state.orm).await? as i64;

    let finder = match ProductSort::from_param(query.sort.as_deref()) {
        ProductSort::PriceAsc => finder.order_by_asc(Column::Price),
        ProductSort::PriceDesc => finder.order_by_desc(Column::Price),
        ProductSort::Newest => finder.order_by_desc(Column::CreatedAt),
        ProductSort::Rating => finder
            .order_by_desc(Column::Rating)
            .order_by_desc(Column::CreatedAt),
    };

    let products: Vec<Product> = finder
        .order_by_asc(Column::Id)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    let data = ProductPage {
        products,
        page,
        pages: page_count(total, limit),
        total,
    };
    Ok(ApiResponse::success("Products", data, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = find_product(&state.orm, id).await?;
    Ok(ApiResponse::success(
        "Product",
        product_from_entity(product),
        None,
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let new = payload.validate()?;

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(new.name),
        description: Set(new.description),
        price: Set(new.price),
        images: Set(new.images),
        category: Set(new.category.as_str().to_string()),
        stock: Set(new.stock),
        rating: Set(0.0),
        num_reviews: Set(0),
        featured: Set(new.featured),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;
    tracing::info!(product_id = %product.id, "product created");

    audit::record(
        &state.pool,
        user.user_id,
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let patch = payload.into_patch()?;
    let existing = find_product(&state.orm, id).await?;
    if patch.is_empty() {
        return Ok(ApiResponse::success(
            "Updated",
            product_from_entity(existing),
            Some(Meta::empty()),
        ));
    }

    let mut active: ActiveModel = existing.into();
    if let Some(name) = patch.name {
        active.name = Set(name);
    }
    if let Some(description) = patch.description {
        active.description = Set(description);
    }
    if let Some(price) = patch.price {
        active.price = Set(price);
    }
    if let Some(images) = patch.images {
        active.images = Set(images);
    }
    if let Some(category) = patch.category {
        active.category = Set(category.as_str().to_string());
    }
    if let Some(stock) = patch.stock {
        active.stock = Set(stock);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Product"));
    }
    tracing::info!(product_id = %id, "product deleted");

    audit::record(
        &state.pool,
        user.user_id,
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product removed",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub(crate) async fn find_product<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<ProductModel> {
    Products::find_by_id(id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("Product"))
}

/// Substring pattern for `ILIKE`, with the pattern metacharacters escaped.
fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    for ch in search.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    format!("%{escaped}%")
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        images: model.images,
        category: model.category,
        stock: model.stock,
        rating: model.rating,
        num_reviews: model.num_reviews,
        featured: model.featured,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
