mod config;
mod database;
mod error;
mod handlers;
mod models;
mod utils;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use std::env;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use dotenvy::dotenv;

use config::Config;
use database::{create_database_pool, run_migrations, AppState};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    // Initialize database
    let database_url = env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set");

    let db = create_database_pool(&database_url).await
        .expect("Failed to connect to database");

    run_migrations(&db).await
        .expect("Failed to run database migrations");

    log::info!("Database connection successful");

    let config = Config::from_env();

    // Build the application router
    let app = create_router(AppState { db, config });

    // Get port from environment or use default
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{}", port);

    log::info!("storefront API listening on http://{}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

fn create_router(state: AppState) -> Router {
    Router::new()
        // Catalog read routes
        .route("/api/categories", get(handlers::categories::categories_list))
        .route("/api/categories/:slug", get(handlers::categories::category_detail))
        .route("/api/subcategories", get(handlers::subcategories::subcategories_list))
        .route("/api/subcategories/:slug", get(handlers::subcategories::subcategory_detail))
        .route("/api/products", get(handlers::products::products_list))
        .route("/api/products/featured", get(handlers::products::featured_products))
        .route("/api/products/new", get(handlers::products::new_products))
        .route("/api/products/refurbished", get(handlers::products::refurbished_products))
        .route("/api/products/rental", get(handlers::products::rental_products))
        .route("/api/products/:slug", get(handlers::products::product_detail))

        // Listing routes: slug/token segments resolved to filters
        .route("/api/listing/category/:category_slug", get(handlers::products::listing_by_category))
        .route("/api/listing/:product_type", get(handlers::products::listing_by_type))
        .route("/api/listing/:product_type/:category_slug", get(handlers::products::listing_by_type_and_category))

        // Quote submission (public)
        .route("/api/quotes", post(handlers::quotes::create_quote))

        // Admin routes (authentication handled at the deployment edge)
        .route("/api/admin/categories", post(handlers::categories::create_category))
        .route("/api/admin/categories/:id", put(handlers::categories::update_category))
        .route("/api/admin/categories/:id", delete(handlers::categories::delete_category))
        .route("/api/admin/subcategories", post(handlers::subcategories::create_subcategory))
        .route("/api/admin/subcategories/:id", put(handlers::subcategories::update_subcategory))
        .route("/api/admin/subcategories/:id", delete(handlers::subcategories::delete_subcategory))
        .route("/api/admin/products", post(handlers::products::create_product))
        .route("/api/admin/products/:id", put(handlers::products::update_product))
        .route("/api/admin/products/:id", delete(handlers::products::delete_product))
        .route("/api/admin/products/:id/images", post(handlers::products::add_product_image))
        .route("/api/admin/images/:id", delete(handlers::products::delete_product_image))
        .route("/api/admin/quotes", get(handlers::quotes::quotes_list))
        .route("/api/admin/quotes/:id", get(handlers::quotes::quote_detail))
        .route("/api/admin/quotes/:id", patch(handlers::quotes::update_quote))

        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
        )
        .with_state(state)
}
