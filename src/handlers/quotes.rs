use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    database::{AppState, Database},
    error::{ApiError, ApiResult, FieldErrors},
    models::{
        validate_status, CreateQuoteRequest, QuoteItemPayload, QuoteItemRow, QuotePayload,
        QuoteRequest, QuoteSummary, UpdateQuoteRequest,
    },
};

const QUOTE_ITEM_SELECT: &str = r#"
    SELECT qi.id, qi.quote_id, qi.product_id, qi.quantity, qi.price,
           p.name AS product_name, p.sku AS product_sku
    FROM quote_items qi
    JOIN products p ON p.id = qi.product_id
"#;

async fn fetch_quote_items(
    db: &Database,
    quote_id: Uuid,
) -> Result<Vec<QuoteItemPayload>, sqlx::Error> {
    let rows = sqlx::query_as::<_, QuoteItemRow>(&format!(
        "{} WHERE qi.quote_id = $1 ORDER BY qi.position",
        QUOTE_ITEM_SELECT
    ))
    .bind(quote_id)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(QuoteItemPayload::from).collect())
}

// Public: submit a quote request. The header and every line item persist in
// one transaction; any failure rolls the whole submission back.
pub async fn create_quote(
    State(state): State<AppState>,
    Json(payload): Json<CreateQuoteRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    payload.validated()?;

    let mut tx = state.db.begin().await?;

    let quote = sqlx::query_as::<_, QuoteRequest>(
        r#"
        INSERT INTO quote_requests (name, email, phone, company, message)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(&payload.company)
    .bind(&payload.message)
    .fetch_one(&mut *tx)
    .await?;

    let mut items = Vec::with_capacity(payload.items.len());
    for (position, item) in payload.items.iter().enumerate() {
        // freeze the product's current price into the line item
        let product: Option<(String, String, Decimal)> = sqlx::query_as(
            "SELECT name, sku, price FROM products WHERE id = $1 AND is_active = TRUE",
        )
        .bind(item.product)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((product_name, product_sku, price)) = product else {
            // dropping the open transaction rolls the header back
            return Err(ApiError::Validation(FieldErrors::single(
                "items",
                format!("unknown product: {}", item.product),
            )));
        };

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO quote_items (quote_id, product_id, quantity, price, position)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(quote.id)
        .bind(item.product)
        .bind(item.quantity)
        .bind(price)
        .bind(position as i32)
        .fetch_one(&mut *tx)
        .await?;

        items.push(QuoteItemPayload::from(QuoteItemRow {
            id,
            quote_id: quote.id,
            product_id: item.product,
            quantity: item.quantity,
            price,
            product_name,
            product_sku,
        }));
    }

    tx.commit().await?;

    let data = QuotePayload::from_parts(quote, items);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Quote request submitted successfully",
            "data": data,
        })),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct QuoteListQuery {
    status: Option<String>,
}

// Admin: list quote requests, newest first, with computed totals.
pub async fn quotes_list(
    State(state): State<AppState>,
    Query(query): Query<QuoteListQuery>,
) -> ApiResult<Json<Vec<QuoteSummary>>> {
    let quotes = match &query.status {
        Some(status) => {
            validate_status(status)?;
            sqlx::query_as::<_, QuoteRequest>(
                "SELECT * FROM quote_requests WHERE status = $1 ORDER BY created_at DESC",
            )
            .bind(status)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, QuoteRequest>(
                "SELECT * FROM quote_requests ORDER BY created_at DESC",
            )
            .fetch_all(&state.db)
            .await?
        }
    };

    let ids: Vec<Uuid> = quotes.iter().map(|q| q.id).collect();
    let totals: Vec<(Uuid, i64, Decimal)> = sqlx::query_as(
        r#"
        SELECT quote_id, COUNT(*), COALESCE(SUM(price * quantity), 0)
        FROM quote_items
        WHERE quote_id = ANY($1)
        GROUP BY quote_id
        "#,
    )
    .bind(&ids)
    .fetch_all(&state.db)
    .await?;

    let totals: HashMap<Uuid, (i64, Decimal)> = totals
        .into_iter()
        .map(|(id, count, total)| (id, (count, total)))
        .collect();

    let payload = quotes
        .into_iter()
        .map(|quote| {
            let (item_count, total_amount) =
                totals.get(&quote.id).copied().unwrap_or((0, Decimal::ZERO));
            QuoteSummary {
                id: quote.id,
                name: quote.name,
                email: quote.email,
                phone: quote.phone,
                company: quote.company,
                status: quote.status,
                item_count,
                total_amount,
                created_at: quote.created_at,
            }
        })
        .collect();

    Ok(Json(payload))
}

async fn fetch_quote(db: &Database, id: Uuid) -> ApiResult<QuoteRequest> {
    sqlx::query_as::<_, QuoteRequest>("SELECT * FROM quote_requests WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("quote request not found".to_string()))
}

// Admin: quote detail with line items and computed total.
pub async fn quote_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<QuotePayload>> {
    let quote = fetch_quote(&state.db, id).await?;
    let items = fetch_quote_items(&state.db, id).await?;
    Ok(Json(QuotePayload::from_parts(quote, items)))
}

// Admin: move a quote to any status label, optionally updating notes.
pub async fn update_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateQuoteRequest>,
) -> ApiResult<Json<QuotePayload>> {
    if let Some(status) = &input.status {
        validate_status(status)?;
    }

    let quote = sqlx::query_as::<_, QuoteRequest>(
        r#"
        UPDATE quote_requests
        SET status = COALESCE($2, status),
            admin_notes = COALESCE($3, admin_notes),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&input.status)
    .bind(&input.admin_notes)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("quote request not found".to_string()))?;

    let items = fetch_quote_items(&state.db, id).await?;
    Ok(Json(QuotePayload::from_parts(quote, items)))
}
