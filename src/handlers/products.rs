use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::types::Json as SqlJson;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    database::{AppState, Database},
    error::{map_restrict, map_unique, ApiError, ApiResult},
    models::{
        ProductDetail, ProductImageInput, ProductImagePayload, ProductImageRow, ProductInput,
        ProductRow, ProductSummary, SubcategoryMeta, SubcategoryPayload, PRODUCT_TYPES,
    },
};

const PRODUCT_SELECT: &str = r#"
    SELECT p.*, s.name AS subcategory_name, s.category_id AS category_id,
           c.name AS category_name
    FROM products p
    JOIN subcategories s ON s.id = p.subcategory_id
    JOIN categories c ON c.id = s.category_id
"#;

const PRODUCT_COUNT: &str = r#"
    SELECT COUNT(*)
    FROM products p
    JOIN subcategories s ON s.id = p.subcategory_id
"#;

const SUBCATEGORY_META_SELECT: &str = r#"
    SELECT s.id, s.name, s.slug, s.category_id, s.icon, s.description,
           c.name AS category_name,
           (SELECT COUNT(*) FROM products p
             WHERE p.subcategory_id = s.id AND p.is_active = TRUE) AS product_count
    FROM subcategories s
    JOIN categories c ON c.id = s.category_id
"#;

const FEATURED_LIMIT: i64 = 6;
const SHORTCUT_LIMIT: i64 = 8;

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    subcategory: Option<Uuid>,
    category: Option<Uuid>,
    brand: Option<String>,
    in_stock: Option<bool>,
    is_featured: Option<bool>,
    product_type: Option<String>,
    search: Option<String>,
    ordering: Option<String>,
    page: Option<i64>,
    page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub page: i64,
    pub page_size: i64,
    pub results: Vec<T>,
}

fn push_product_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    builder.push(" WHERE p.is_active = TRUE");

    if let Some(subcategory_id) = query.subcategory {
        builder.push(" AND p.subcategory_id = ").push_bind(subcategory_id);
    }
    if let Some(category_id) = query.category {
        builder.push(" AND s.category_id = ").push_bind(category_id);
    }
    if let Some(brand) = &query.brand {
        builder.push(" AND p.brand = ").push_bind(brand.clone());
    }
    if let Some(in_stock) = query.in_stock {
        builder.push(" AND p.in_stock = ").push_bind(in_stock);
    }
    if let Some(is_featured) = query.is_featured {
        builder.push(" AND p.is_featured = ").push_bind(is_featured);
    }
    if let Some(product_type) = &query.product_type {
        builder.push(" AND p.product_type = ").push_bind(product_type.clone());
    }
    if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = format!("%{}%", term);
        builder
            .push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.sku ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.brand ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn order_clause(ordering: Option<&str>) -> &'static str {
    match ordering.unwrap_or("-created_at") {
        "price" => " ORDER BY p.price, p.id",
        "-price" => " ORDER BY p.price DESC, p.id",
        "name" => " ORDER BY p.name, p.id",
        "-name" => " ORDER BY p.name DESC, p.id",
        "created_at" => " ORDER BY p.created_at, p.id",
        _ => " ORDER BY p.created_at DESC, p.id",
    }
}

fn clamp_page_size(requested: Option<i64>, default: i64, max: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, max)
}

async fn run_product_query(
    state: &AppState,
    query: ProductQuery,
) -> ApiResult<Page<ProductSummary>> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = clamp_page_size(
        query.page_size,
        state.config.page_size,
        state.config.max_page_size,
    );
    let offset = (page - 1) * page_size;

    let mut count_builder = QueryBuilder::<Postgres>::new(PRODUCT_COUNT);
    push_product_filters(&mut count_builder, &query);
    let count: i64 = count_builder
        .build_query_scalar()
        .fetch_one(&state.db)
        .await?;

    let mut builder = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
    push_product_filters(&mut builder, &query);
    builder.push(order_clause(query.ordering.as_deref()));
    builder.push(" LIMIT ").push_bind(page_size);
    builder.push(" OFFSET ").push_bind(offset);

    let rows: Vec<ProductRow> = builder.build_query_as().fetch_all(&state.db).await?;
    let results = rows
        .iter()
        .map(|row| ProductSummary::from_row(row, &state.config.media_base_url))
        .collect();

    Ok(Page {
        count,
        page,
        page_size,
        results,
    })
}

// Filterable, searchable, paginated product list.
pub async fn products_list(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Json<Page<ProductSummary>>> {
    run_product_query(&state, query).await.map(Json)
}

async fn bounded_collection(
    state: &AppState,
    condition: &str,
    limit: i64,
) -> ApiResult<Json<Vec<ProductSummary>>> {
    let sql = format!(
        "{} WHERE p.is_active = TRUE AND {} ORDER BY p.created_at DESC, p.id LIMIT {}",
        PRODUCT_SELECT, condition, limit
    );
    let rows = sqlx::query_as::<_, ProductRow>(&sql).fetch_all(&state.db).await?;
    Ok(Json(
        rows.iter()
            .map(|row| ProductSummary::from_row(row, &state.config.media_base_url))
            .collect(),
    ))
}

pub async fn featured_products(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ProductSummary>>> {
    bounded_collection(&state, "p.is_featured = TRUE", FEATURED_LIMIT).await
}

pub async fn new_products(State(state): State<AppState>) -> ApiResult<Json<Vec<ProductSummary>>> {
    bounded_collection(&state, "p.product_type = 'new'", SHORTCUT_LIMIT).await
}

pub async fn refurbished_products(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ProductSummary>>> {
    bounded_collection(&state, "p.product_type = 'refurbished'", SHORTCUT_LIMIT).await
}

pub async fn rental_products(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ProductSummary>>> {
    bounded_collection(&state, "p.product_type = 'rental'", SHORTCUT_LIMIT).await
}

async fn fetch_subcategory_payload(
    db: &Database,
    subcategory_id: Uuid,
) -> Result<SubcategoryPayload, sqlx::Error> {
    let meta = sqlx::query_as::<_, SubcategoryMeta>(&format!(
        "{} WHERE s.id = $1",
        SUBCATEGORY_META_SELECT
    ))
    .bind(subcategory_id)
    .fetch_one(db)
    .await?;
    Ok(SubcategoryPayload::from(meta))
}

async fn fetch_images(
    db: &Database,
    product_id: Uuid,
    media_base: &str,
) -> Result<Vec<ProductImagePayload>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ProductImageRow>(
        "SELECT * FROM product_images WHERE product_id = $1 ORDER BY display_order, created_at",
    )
    .bind(product_id)
    .fetch_all(db)
    .await?;
    Ok(rows
        .into_iter()
        .map(|row| ProductImagePayload::from_row(row, media_base))
        .collect())
}

async fn load_detail(state: &AppState, row: ProductRow) -> ApiResult<ProductDetail> {
    let subcategory = fetch_subcategory_payload(&state.db, row.subcategory_id).await?;
    let images = fetch_images(&state.db, row.id, &state.config.media_base_url).await?;
    Ok(ProductDetail::from_parts(
        row,
        subcategory,
        images,
        &state.config.media_base_url,
    ))
}

pub async fn product_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<ProductDetail>> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "{} WHERE p.slug = $1 AND p.is_active = TRUE",
        PRODUCT_SELECT
    ))
    .bind(&slug)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("product '{}' not found", slug)))?;

    Ok(Json(load_detail(&state, row).await?))
}

// ---------------------------------------------------------------------------
// Listing routes: human-readable URL segments resolved to filters
// ---------------------------------------------------------------------------

pub async fn listing_by_type(
    State(state): State<AppState>,
    Path(product_type): Path<String>,
    Query(mut query): Query<ProductQuery>,
) -> ApiResult<Json<Page<ProductSummary>>> {
    if !PRODUCT_TYPES.contains(&product_type.as_str()) {
        return Err(ApiError::UnknownProductType(product_type));
    }
    query.product_type = Some(product_type);
    run_product_query(&state, query).await.map(Json)
}

async fn resolve_category_slug(db: &Database, slug: &str) -> ApiResult<Uuid> {
    sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM categories WHERE slug = $1 AND is_active = TRUE",
    )
    .bind(slug)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("category '{}' not found", slug)))
}

pub async fn listing_by_category(
    State(state): State<AppState>,
    Path(category_slug): Path<String>,
    Query(mut query): Query<ProductQuery>,
) -> ApiResult<Json<Page<ProductSummary>>> {
    query.category = Some(resolve_category_slug(&state.db, &category_slug).await?);
    run_product_query(&state, query).await.map(Json)
}

pub async fn listing_by_type_and_category(
    State(state): State<AppState>,
    Path((product_type, category_slug)): Path<(String, String)>,
    Query(mut query): Query<ProductQuery>,
) -> ApiResult<Json<Page<ProductSummary>>> {
    if !PRODUCT_TYPES.contains(&product_type.as_str()) {
        return Err(ApiError::UnknownProductType(product_type));
    }
    query.product_type = Some(product_type);
    query.category = Some(resolve_category_slug(&state.db, &category_slug).await?);
    run_product_query(&state, query).await.map(Json)
}

// ---------------------------------------------------------------------------
// Admin writes
// ---------------------------------------------------------------------------

const PRODUCT_INSERT: &str = r#"
    INSERT INTO products (
        name, slug, sku, subcategory_id, brand, product_type,
        price, original_price, discount,
        rental_price_daily, rental_price_weekly, rental_price_monthly, min_rental_period,
        stock_count, in_stock, description, features, specifications,
        weight, warranty_months, condition, rating, reviews,
        main_image, seo_title, seo_description, is_active, is_featured
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
            $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28)
    RETURNING id
"#;

const PRODUCT_UPDATE: &str = r#"
    UPDATE products
    SET name = $2, slug = $3, sku = $4, subcategory_id = $5, brand = $6,
        product_type = $7, price = $8, original_price = $9, discount = $10,
        rental_price_daily = $11, rental_price_weekly = $12,
        rental_price_monthly = $13, min_rental_period = $14,
        stock_count = $15, in_stock = $16, description = $17,
        features = $18, specifications = $19, weight = $20,
        warranty_months = $21, condition = $22, rating = $23, reviews = $24,
        main_image = $25, seo_title = $26, seo_description = $27,
        is_active = $28, is_featured = $29, updated_at = NOW()
    WHERE id = $1
    RETURNING id
"#;

fn map_product_write_error(err: sqlx::Error) -> ApiError {
    match map_unique(err, "a product with this sku or slug already exists") {
        ApiError::Database(inner) => map_restrict(inner, "unknown subcategory"),
        other => other,
    }
}

async fn fetch_product_row(db: &Database, id: Uuid) -> ApiResult<ProductRow> {
    sqlx::query_as::<_, ProductRow>(&format!("{} WHERE p.id = $1", PRODUCT_SELECT))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("product not found".to_string()))
}

// Admin: create a product. Normalizes, validates the catalog invariants,
// then persists.
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> ApiResult<(StatusCode, Json<ProductDetail>)> {
    let input = input.normalized();
    input.validate()?;

    let id: Uuid = sqlx::query_scalar(PRODUCT_INSERT)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.sku)
        .bind(input.subcategory_id)
        .bind(&input.brand)
        .bind(&input.product_type)
        .bind(input.price)
        .bind(input.original_price)
        .bind(input.discount)
        .bind(input.rental_price_daily)
        .bind(input.rental_price_weekly)
        .bind(input.rental_price_monthly)
        .bind(input.min_rental_period)
        .bind(input.stock_count)
        .bind(input.in_stock)
        .bind(&input.description)
        .bind(SqlJson(&input.features))
        .bind(SqlJson(&input.specifications))
        .bind(&input.weight)
        .bind(input.warranty_months)
        .bind(&input.condition)
        .bind(input.rating)
        .bind(input.reviews)
        .bind(&input.main_image)
        .bind(&input.seo_title)
        .bind(&input.seo_description)
        .bind(input.is_active)
        .bind(input.is_featured)
        .fetch_one(&state.db)
        .await
        .map_err(map_product_write_error)?;

    let row = fetch_product_row(&state.db, id).await?;
    Ok((StatusCode::CREATED, Json(load_detail(&state, row).await?)))
}

// Admin: full update of a product, same validation as create.
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ProductInput>,
) -> ApiResult<Json<ProductDetail>> {
    let input = input.normalized();
    input.validate()?;

    let updated: Option<Uuid> = sqlx::query_scalar(PRODUCT_UPDATE)
        .bind(id)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.sku)
        .bind(input.subcategory_id)
        .bind(&input.brand)
        .bind(&input.product_type)
        .bind(input.price)
        .bind(input.original_price)
        .bind(input.discount)
        .bind(input.rental_price_daily)
        .bind(input.rental_price_weekly)
        .bind(input.rental_price_monthly)
        .bind(input.min_rental_period)
        .bind(input.stock_count)
        .bind(input.in_stock)
        .bind(&input.description)
        .bind(SqlJson(&input.features))
        .bind(SqlJson(&input.specifications))
        .bind(&input.weight)
        .bind(input.warranty_months)
        .bind(&input.condition)
        .bind(input.rating)
        .bind(input.reviews)
        .bind(&input.main_image)
        .bind(&input.seo_title)
        .bind(&input.seo_description)
        .bind(input.is_active)
        .bind(input.is_featured)
        .fetch_optional(&state.db)
        .await
        .map_err(map_product_write_error)?;

    let id = updated.ok_or_else(|| ApiError::NotFound("product not found".to_string()))?;
    let row = fetch_product_row(&state.db, id).await?;
    Ok(Json(load_detail(&state, row).await?))
}

// Admin: delete a product; its images and quote lines cascade.
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("product not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

// Admin: attach an auxiliary image to a product.
pub async fn add_product_image(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<ProductImageInput>,
) -> ApiResult<(StatusCode, Json<ProductImagePayload>)> {
    input.validate()?;

    let product_name: String =
        sqlx::query_scalar("SELECT name FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("product not found".to_string()))?;

    let input = input.normalized(&product_name);

    let row = sqlx::query_as::<_, ProductImageRow>(
        r#"
        INSERT INTO product_images (product_id, image, alt_text, is_primary, display_order)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(product_id)
    .bind(&input.image)
    .bind(&input.alt_text)
    .bind(input.is_primary)
    .bind(input.order)
    .fetch_one(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ProductImagePayload::from_row(row, &state.config.media_base_url)),
    ))
}

pub async fn delete_product_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM product_images WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("image not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ordering_is_newest_first() {
        assert_eq!(order_clause(None), " ORDER BY p.created_at DESC, p.id");
        assert_eq!(
            order_clause(Some("-created_at")),
            " ORDER BY p.created_at DESC, p.id"
        );
    }

    #[test]
    fn ordering_keys_are_whitelisted() {
        assert_eq!(order_clause(Some("price")), " ORDER BY p.price, p.id");
        assert_eq!(order_clause(Some("-price")), " ORDER BY p.price DESC, p.id");
        assert_eq!(order_clause(Some("name")), " ORDER BY p.name, p.id");
        // anything unrecognized falls back to the default
        assert_eq!(
            order_clause(Some("sku; DROP TABLE products")),
            " ORDER BY p.created_at DESC, p.id"
        );
    }

    #[test]
    fn page_size_is_clamped_to_the_cap() {
        assert_eq!(clamp_page_size(None, 15, 100), 15);
        assert_eq!(clamp_page_size(Some(50), 15, 100), 50);
        assert_eq!(clamp_page_size(Some(5000), 15, 100), 100);
        assert_eq!(clamp_page_size(Some(0), 15, 100), 1);
        assert_eq!(clamp_page_size(Some(-3), 15, 100), 1);
    }

    #[test]
    fn page_envelope_shape() {
        let page = Page {
            count: 42,
            page: 2,
            page_size: 15,
            results: vec!["x"],
        };
        let body = serde_json::to_value(&page).unwrap();
        assert_eq!(body["count"], 42);
        assert_eq!(body["page"], 2);
        assert_eq!(body["page_size"], 15);
        assert_eq!(body["results"][0], "x");
    }
}
