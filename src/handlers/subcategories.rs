use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    database::AppState,
    error::{map_restrict, map_unique, ApiError, ApiResult},
    models::{Subcategory, SubcategoryInput, SubcategoryMeta, SubcategoryPayload},
};

const SUBCATEGORY_META_SELECT: &str = r#"
    SELECT s.id, s.name, s.slug, s.category_id, s.icon, s.description,
           c.name AS category_name,
           (SELECT COUNT(*) FROM products p
             WHERE p.subcategory_id = s.id AND p.is_active = TRUE) AS product_count
    FROM subcategories s
    JOIN categories c ON c.id = s.category_id
"#;

#[derive(Debug, Default, Deserialize)]
pub struct SubcategoryListQuery {
    category: Option<Uuid>,
}

// List active subcategories, optionally restricted to one category.
pub async fn subcategories_list(
    State(state): State<AppState>,
    Query(query): Query<SubcategoryListQuery>,
) -> ApiResult<Json<Vec<SubcategoryPayload>>> {
    let rows = match query.category {
        Some(category_id) => {
            sqlx::query_as::<_, SubcategoryMeta>(&format!(
                "{} WHERE s.is_active = TRUE AND s.category_id = $1 ORDER BY s.name",
                SUBCATEGORY_META_SELECT
            ))
            .bind(category_id)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, SubcategoryMeta>(&format!(
                "{} WHERE s.is_active = TRUE ORDER BY c.name, s.name",
                SUBCATEGORY_META_SELECT
            ))
            .fetch_all(&state.db)
            .await?
        }
    };

    Ok(Json(rows.into_iter().map(SubcategoryPayload::from).collect()))
}

pub async fn subcategory_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<SubcategoryPayload>> {
    let row = sqlx::query_as::<_, SubcategoryMeta>(&format!(
        "{} WHERE s.slug = $1 AND s.is_active = TRUE LIMIT 1",
        SUBCATEGORY_META_SELECT
    ))
    .bind(&slug)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("subcategory '{}' not found", slug)))?;

    Ok(Json(SubcategoryPayload::from(row)))
}

// Admin: create a subcategory under a category
pub async fn create_subcategory(
    State(state): State<AppState>,
    Json(input): Json<SubcategoryInput>,
) -> ApiResult<(StatusCode, Json<Subcategory>)> {
    let input = input.normalized();
    input.validate()?;

    let subcategory = sqlx::query_as::<_, Subcategory>(
        r#"
        INSERT INTO subcategories (name, slug, category_id, icon, description, is_active)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&input.name)
    .bind(&input.slug)
    .bind(input.category_id)
    .bind(&input.icon)
    .bind(&input.description)
    .bind(input.is_active)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        let err = map_unique(e, "a subcategory with this name already exists in the category");
        match err {
            ApiError::Database(inner) => map_restrict(inner, "unknown category"),
            other => other,
        }
    })?;

    Ok((StatusCode::CREATED, Json(subcategory)))
}

// Admin: update a subcategory
pub async fn update_subcategory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<SubcategoryInput>,
) -> ApiResult<Json<Subcategory>> {
    let input = input.normalized();
    input.validate()?;

    let subcategory = sqlx::query_as::<_, Subcategory>(
        r#"
        UPDATE subcategories
        SET name = $2, slug = $3, category_id = $4, icon = $5,
            description = $6, is_active = $7, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&input.name)
    .bind(&input.slug)
    .bind(input.category_id)
    .bind(&input.icon)
    .bind(&input.description)
    .bind(input.is_active)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| map_unique(e, "a subcategory with this name already exists in the category"))?
    .ok_or_else(|| ApiError::NotFound("subcategory not found".to_string()))?;

    Ok(Json(subcategory))
}

// Admin: delete a subcategory. Rejected while products still reference it.
pub async fn delete_subcategory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM subcategories WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(|e| map_restrict(e, "subcategory still has products"))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("subcategory not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
