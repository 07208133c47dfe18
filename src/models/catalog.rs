use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::FieldErrors;
use crate::utils::{resolve_media, slugify};

pub const PRODUCT_TYPES: [&str; 3] = ["new", "refurbished", "rental"];

pub fn product_type_display(product_type: &str) -> &'static str {
    match product_type {
        "refurbished" => "Refurbished Product",
        "rental" => "Rental Product",
        _ => "New Product",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub icon: String,
    pub description: String,
    pub is_active: bool,
    pub show_in_navbar: bool,
    pub navbar_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subcategory {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub category_id: Uuid,
    pub icon: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subcategory joined with its category name and active-product count, the
/// shape every read surface wants.
#[derive(Debug, Clone, FromRow)]
pub struct SubcategoryMeta {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub category_id: Uuid,
    pub icon: String,
    pub description: String,
    pub category_name: String,
    pub product_count: i64,
}

/// Product row joined with its subcategory and category names.
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub subcategory_id: Uuid,
    pub brand: String,
    pub product_type: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub discount: i32,
    pub rental_price_daily: Option<Decimal>,
    pub rental_price_weekly: Option<Decimal>,
    pub rental_price_monthly: Option<Decimal>,
    pub min_rental_period: Option<i32>,
    pub stock_count: i32,
    pub in_stock: bool,
    pub description: String,
    pub features: Json<Vec<String>>,
    pub specifications: Json<BTreeMap<String, String>>,
    pub weight: Option<String>,
    pub warranty_months: Option<i32>,
    pub condition: Option<String>,
    pub rating: Decimal,
    pub reviews: i32,
    pub main_image: Option<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    // joined columns
    pub subcategory_name: String,
    pub category_id: Uuid,
    pub category_name: String,
}

impl ProductRow {
    /// Price after discount. Recomputed on every read, never stored.
    pub fn final_price(&self) -> Decimal {
        match self.original_price {
            Some(original) if self.discount > 0 => {
                (original - original * Decimal::from(self.discount) / Decimal::from(100))
                    .round_dp(2)
            }
            _ => self.price,
        }
    }

    pub fn discount_amount(&self) -> Decimal {
        self.original_price
            .map(|original| original - self.price)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn is_on_sale(&self) -> bool {
        self.discount > 0 && self.original_price.is_some()
    }

    pub fn stock_status(&self) -> &'static str {
        match self.stock_count {
            0 => "Out of Stock",
            1..=4 => "Low Stock",
            _ => "In Stock",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ProductImageRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub image: String,
    pub alt_text: String,
    pub is_primary: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Write-side inputs
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_product_type() -> String {
    "new".to_string()
}

fn default_rating() -> Decimal {
    Decimal::new(45, 1)
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub show_in_navbar: bool,
    #[serde(default)]
    pub navbar_order: i32,
}

impl CategoryInput {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        if self.slug.trim().is_empty() {
            self.slug = slugify(&self.name);
        } else {
            self.slug = slugify(&self.slug);
        }
        self
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.name.is_empty() {
            errors.add("name", "name is required");
        }
        if self.navbar_order < 0 {
            errors.add("navbar_order", "must not be negative");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubcategoryInput {
    pub name: String,
    #[serde(default)]
    pub slug: String,
    pub category_id: Uuid,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl SubcategoryInput {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        if self.slug.trim().is_empty() {
            self.slug = slugify(&self.name);
        } else {
            self.slug = slugify(&self.slug);
        }
        self
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.name.is_empty() {
            errors.add("name", "name is required");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub slug: String,
    pub sku: String,
    pub subcategory_id: Uuid,
    pub brand: String,
    #[serde(default = "default_product_type")]
    pub product_type: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub discount: i32,
    pub rental_price_daily: Option<Decimal>,
    pub rental_price_weekly: Option<Decimal>,
    pub rental_price_monthly: Option<Decimal>,
    pub min_rental_period: Option<i32>,
    #[serde(default)]
    pub stock_count: i32,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    pub weight: Option<String>,
    pub warranty_months: Option<i32>,
    pub condition: Option<String>,
    #[serde(default = "default_rating")]
    pub rating: Decimal,
    #[serde(default)]
    pub reviews: i32,
    pub main_image: Option<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
}

impl ProductInput {
    /// Pre-persistence normalization: derive a blank slug from the name,
    /// trim identifying fields, fall back to the name for a blank SEO title.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.sku = self.sku.trim().to_string();
        self.brand = self.brand.trim().to_string();
        if self.slug.trim().is_empty() {
            self.slug = slugify(&self.name);
        } else {
            self.slug = slugify(&self.slug);
        }
        if self.seo_title.as_deref().map_or(true, |t| t.trim().is_empty()) {
            self.seo_title = Some(self.name.clone());
        }
        self
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        if self.name.is_empty() {
            errors.add("name", "name is required");
        }
        if self.sku.is_empty() {
            errors.add("sku", "sku is required");
        }
        if self.brand.is_empty() {
            errors.add("brand", "brand is required");
        }
        if self.description.trim().is_empty() {
            errors.add("description", "description is required");
        }
        if !PRODUCT_TYPES.contains(&self.product_type.as_str()) {
            errors.add(
                "product_type",
                format!("must be one of: {}", PRODUCT_TYPES.join(", ")),
            );
        }
        if self.price < Decimal::ZERO {
            errors.add("price", "must not be negative");
        }
        if !(0..=100).contains(&self.discount) {
            errors.add("discount", "must be between 0 and 100");
        }
        if self.stock_count < 0 {
            errors.add("stock_count", "must not be negative");
        }
        if self.rating < Decimal::ZERO || self.rating > Decimal::from(5) {
            errors.add("rating", "must be between 0.0 and 5.0");
        }
        if let Some(period) = self.min_rental_period {
            if period < 1 {
                errors.add("min_rental_period", "must be at least 1");
            }
        }

        // rental products must carry at least one rental price
        if self.product_type == "rental"
            && self.rental_price_daily.is_none()
            && self.rental_price_weekly.is_none()
            && self.rental_price_monthly.is_none()
        {
            errors.add(
                "rental_prices",
                "rental products require at least one of rental_price_daily, \
                 rental_price_weekly, rental_price_monthly",
            );
        }

        // an in-stock product cannot have an empty shelf
        if self.in_stock && self.stock_count == 0 {
            errors.add(
                "stock_count",
                "in-stock products must have a stock count greater than zero",
            );
        }

        if self.discount > 0 && self.original_price.is_none() {
            errors.add("original_price", "required when a discount is set");
        }
        if let Some(original) = self.original_price {
            if self.price > original {
                errors.add("price", "must not exceed original_price");
            }
        }

        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductImageInput {
    pub image: String,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub order: i32,
}

impl ProductImageInput {
    pub fn normalized(mut self, product_name: &str) -> Self {
        if self.alt_text.trim().is_empty() {
            self.alt_text = format!("{} - Image {}", product_name, self.order);
        }
        self
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.image.trim().is_empty() {
            errors.add("image", "image is required");
        }
        if self.order < 0 {
            errors.add("order", "must not be negative");
        }
        errors.into_result()
    }
}

// ---------------------------------------------------------------------------
// Read-side payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct SubcategoryPayload {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub icon: String,
    pub description: String,
    pub category_id: Uuid,
    pub category_name: String,
    pub product_count: i64,
}

impl From<SubcategoryMeta> for SubcategoryPayload {
    fn from(meta: SubcategoryMeta) -> Self {
        Self {
            id: meta.id,
            name: meta.name,
            slug: meta.slug,
            icon: meta.icon,
            description: meta.description,
            category_id: meta.category_id,
            category_name: meta.category_name,
            product_count: meta.product_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryPayload {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub icon: String,
    pub description: String,
    pub show_in_navbar: bool,
    pub navbar_order: i32,
    pub subcategories: Vec<SubcategoryPayload>,
    pub product_count: i64,
}

impl CategoryPayload {
    pub fn from_parts(category: Category, subcategories: Vec<SubcategoryPayload>) -> Self {
        let product_count = subcategories.iter().map(|s| s.product_count).sum();
        Self {
            id: category.id,
            name: category.name,
            slug: category.slug,
            icon: category.icon,
            description: category.description,
            show_in_navbar: category.show_in_navbar,
            navbar_order: category.navbar_order,
            subcategories,
            product_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductImagePayload {
    pub id: Uuid,
    pub image: String,
    pub alt_text: String,
    pub is_primary: bool,
    pub order: i32,
}

impl ProductImagePayload {
    pub fn from_row(row: ProductImageRow, media_base: &str) -> Self {
        Self {
            id: row.id,
            image: crate::utils::media_url(media_base, &row.image),
            alt_text: row.alt_text,
            is_primary: row.is_primary,
            order: row.display_order,
        }
    }
}

/// Compact product shape for list responses.
#[derive(Debug, Serialize)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub category_name: String,
    pub subcategory_name: String,
    pub brand: String,
    pub product_type: String,
    pub product_type_display: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub discount: i32,
    pub final_price: Decimal,
    pub discount_amount: Decimal,
    pub is_on_sale: bool,
    pub main_image: Option<String>,
    pub stock_count: i32,
    pub in_stock: bool,
    pub stock_status: String,
    pub rating: Decimal,
    pub reviews: i32,
    pub is_featured: bool,
}

impl ProductSummary {
    pub fn from_row(row: &ProductRow, media_base: &str) -> Self {
        Self {
            id: row.id,
            name: row.name.clone(),
            slug: row.slug.clone(),
            sku: row.sku.clone(),
            category_name: row.category_name.clone(),
            subcategory_name: row.subcategory_name.clone(),
            brand: row.brand.clone(),
            product_type: row.product_type.clone(),
            product_type_display: product_type_display(&row.product_type).to_string(),
            price: row.price,
            original_price: row.original_price,
            discount: row.discount,
            final_price: row.final_price(),
            discount_amount: row.discount_amount(),
            is_on_sale: row.is_on_sale(),
            main_image: resolve_media(media_base, row.main_image.as_deref()),
            stock_count: row.stock_count,
            in_stock: row.in_stock,
            stock_status: row.stock_status().to_string(),
            rating: row.rating,
            reviews: row.reviews,
            is_featured: row.is_featured,
        }
    }
}

/// Full product shape for detail responses.
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub category_name: String,
    pub subcategory_name: String,
    pub subcategory: SubcategoryPayload,
    pub brand: String,
    pub product_type: String,
    pub product_type_display: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub discount: i32,
    pub final_price: Decimal,
    pub discount_amount: Decimal,
    pub is_on_sale: bool,
    pub rental_price_daily: Option<Decimal>,
    pub rental_price_weekly: Option<Decimal>,
    pub rental_price_monthly: Option<Decimal>,
    pub min_rental_period: Option<i32>,
    pub main_image: Option<String>,
    pub images: Vec<ProductImagePayload>,
    pub stock_count: i32,
    pub in_stock: bool,
    pub stock_status: String,
    pub description: String,
    pub features: Vec<String>,
    pub specifications: BTreeMap<String, String>,
    pub weight: Option<String>,
    pub warranty_months: Option<i32>,
    pub condition: Option<String>,
    pub rating: Decimal,
    pub reviews: i32,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}

impl ProductDetail {
    pub fn from_parts(
        row: ProductRow,
        subcategory: SubcategoryPayload,
        images: Vec<ProductImagePayload>,
        media_base: &str,
    ) -> Self {
        let final_price = row.final_price();
        let discount_amount = row.discount_amount();
        let is_on_sale = row.is_on_sale();
        let stock_status = row.stock_status().to_string();
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            sku: row.sku,
            category_name: row.category_name,
            subcategory_name: row.subcategory_name,
            subcategory,
            brand: row.brand,
            product_type_display: product_type_display(&row.product_type).to_string(),
            product_type: row.product_type,
            price: row.price,
            original_price: row.original_price,
            discount: row.discount,
            final_price,
            discount_amount,
            is_on_sale,
            rental_price_daily: row.rental_price_daily,
            rental_price_weekly: row.rental_price_weekly,
            rental_price_monthly: row.rental_price_monthly,
            min_rental_period: row.min_rental_period,
            main_image: resolve_media(media_base, row.main_image.as_deref()),
            images,
            stock_count: row.stock_count,
            in_stock: row.in_stock,
            stock_status,
            description: row.description,
            features: row.features.0,
            specifications: row.specifications.0,
            weight: row.weight,
            warranty_months: row.warranty_months,
            condition: row.condition,
            rating: row.rating,
            reviews: row.reviews,
            seo_title: row.seo_title,
            seo_description: row.seo_description,
            is_active: row.is_active,
            is_featured: row.is_featured,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn base_input() -> ProductInput {
        ProductInput {
            name: "HP LaserJet Pro M404n".to_string(),
            slug: String::new(),
            sku: "PRN-HP-M404N".to_string(),
            subcategory_id: Uuid::new_v4(),
            brand: "HP".to_string(),
            product_type: "new".to_string(),
            price: dec("899.00"),
            original_price: None,
            discount: 0,
            rental_price_daily: None,
            rental_price_weekly: None,
            rental_price_monthly: None,
            min_rental_period: None,
            stock_count: 12,
            in_stock: true,
            description: "Compact monochrome laser printer".to_string(),
            features: vec!["38 ppm".to_string()],
            specifications: BTreeMap::new(),
            weight: None,
            warranty_months: Some(12),
            condition: None,
            rating: dec("4.5"),
            reviews: 0,
            main_image: None,
            seo_title: None,
            seo_description: None,
            is_active: true,
            is_featured: false,
        }
    }

    fn sample_row() -> ProductRow {
        let input = base_input();
        ProductRow {
            id: Uuid::new_v4(),
            name: input.name,
            slug: "hp-laserjet-pro-m404n".to_string(),
            sku: input.sku,
            subcategory_id: input.subcategory_id,
            brand: input.brand,
            product_type: input.product_type,
            price: input.price,
            original_price: None,
            discount: 0,
            rental_price_daily: None,
            rental_price_weekly: None,
            rental_price_monthly: None,
            min_rental_period: None,
            stock_count: 12,
            in_stock: true,
            description: input.description,
            features: Json(vec![]),
            specifications: Json(BTreeMap::new()),
            weight: None,
            warranty_months: None,
            condition: None,
            rating: dec("4.5"),
            reviews: 0,
            main_image: None,
            seo_title: None,
            seo_description: None,
            is_active: true,
            is_featured: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            subcategory_name: "Printers".to_string(),
            category_id: Uuid::new_v4(),
            category_name: "Technology".to_string(),
        }
    }

    #[test]
    fn final_price_without_discount_is_price() {
        let row = sample_row();
        assert_eq!(row.final_price(), dec("899.00"));
        assert!(!row.is_on_sale());
        assert_eq!(row.discount_amount(), Decimal::ZERO);
    }

    #[test]
    fn final_price_applies_discount_to_original_price() {
        let mut row = sample_row();
        row.price = dec("75.00");
        row.original_price = Some(dec("100.00"));
        row.discount = 25;
        assert_eq!(row.final_price(), dec("75.00"));
        assert!(row.is_on_sale());
        assert_eq!(row.discount_amount(), dec("25.00"));
    }

    #[test]
    fn final_price_rounds_to_two_decimals() {
        let mut row = sample_row();
        row.price = dec("66.99");
        row.original_price = Some(dec("99.99"));
        row.discount = 33;
        // 99.99 - 99.99 * 0.33 = 66.9933
        assert_eq!(row.final_price(), dec("66.99"));
    }

    #[test]
    fn stock_status_thresholds() {
        let mut row = sample_row();
        row.stock_count = 0;
        assert_eq!(row.stock_status(), "Out of Stock");
        row.stock_count = 1;
        assert_eq!(row.stock_status(), "Low Stock");
        row.stock_count = 4;
        assert_eq!(row.stock_status(), "Low Stock");
        row.stock_count = 5;
        assert_eq!(row.stock_status(), "In Stock");
    }

    #[test]
    fn valid_input_passes_validation() {
        assert!(base_input().normalized().validate().is_ok());
    }

    #[test]
    fn rental_product_requires_a_rental_price() {
        let mut input = base_input();
        input.product_type = "rental".to_string();
        let errors = input.validate().unwrap_err();
        let body = serde_json::to_value(&errors).unwrap();
        assert!(body.get("rental_prices").is_some());

        input.rental_price_weekly = Some(dec("270.00"));
        assert!(input.validate().is_ok());
    }

    #[test]
    fn in_stock_with_zero_count_is_rejected() {
        let mut input = base_input();
        input.in_stock = true;
        input.stock_count = 0;
        let errors = input.validate().unwrap_err();
        let body = serde_json::to_value(&errors).unwrap();
        assert!(body.get("stock_count").is_some());

        input.in_stock = false;
        assert!(input.validate().is_ok());
    }

    #[test]
    fn discount_requires_original_price() {
        let mut input = base_input();
        input.discount = 10;
        let errors = input.validate().unwrap_err();
        let body = serde_json::to_value(&errors).unwrap();
        assert!(body.get("original_price").is_some());

        input.original_price = Some(dec("999.00"));
        assert!(input.validate().is_ok());
    }

    #[test]
    fn price_must_not_exceed_original_price() {
        let mut input = base_input();
        input.original_price = Some(dec("800.00"));
        let errors = input.validate().unwrap_err();
        let body = serde_json::to_value(&errors).unwrap();
        assert_eq!(body["price"][0], "must not exceed original_price");
    }

    #[test]
    fn unknown_product_type_is_rejected() {
        let mut input = base_input();
        input.product_type = "vintage".to_string();
        let errors = input.validate().unwrap_err();
        let body = serde_json::to_value(&errors).unwrap();
        assert!(body.get("product_type").is_some());
    }

    #[test]
    fn normalization_fills_slug_and_seo_title() {
        let input = base_input().normalized();
        assert_eq!(input.slug, "hp-laserjet-pro-m404n");
        assert_eq!(input.seo_title.as_deref(), Some("HP LaserJet Pro M404n"));
    }

    #[test]
    fn normalization_keeps_explicit_slug() {
        let mut input = base_input();
        input.slug = "Custom Slug".to_string();
        input.seo_title = Some("Buy the M404n".to_string());
        let input = input.normalized();
        assert_eq!(input.slug, "custom-slug");
        assert_eq!(input.seo_title.as_deref(), Some("Buy the M404n"));
    }

    #[test]
    fn image_alt_text_auto_fills_from_product_name() {
        let image = ProductImageInput {
            image: "products/2025/01/p1.jpg".to_string(),
            alt_text: String::new(),
            is_primary: false,
            order: 2,
        }
        .normalized("HP LaserJet Pro M404n");
        assert_eq!(image.alt_text, "HP LaserJet Pro M404n - Image 2");

        let image = ProductImageInput {
            image: "products/2025/01/p2.jpg".to_string(),
            alt_text: "Side view".to_string(),
            is_primary: false,
            order: 3,
        }
        .normalized("HP LaserJet Pro M404n");
        assert_eq!(image.alt_text, "Side view");
    }

    #[test]
    fn category_input_derives_slug() {
        let input = CategoryInput {
            name: "Office Supplies".to_string(),
            slug: String::new(),
            icon: "Package".to_string(),
            description: String::new(),
            is_active: true,
            show_in_navbar: true,
            navbar_order: 1,
        }
        .normalized();
        assert_eq!(input.slug, "office-supplies");
        assert!(input.validate().is_ok());
    }
}
