pub mod catalog;
pub mod quote;

// Re-export only the types we actually use
pub use catalog::{
    product_type_display, Category, CategoryInput, CategoryPayload, ProductDetail,
    ProductImageInput, ProductImagePayload, ProductImageRow, ProductInput, ProductRow,
    ProductSummary, Subcategory, SubcategoryInput, SubcategoryMeta, SubcategoryPayload,
    PRODUCT_TYPES,
};
pub use quote::{
    validate_status, CreateQuoteRequest, QuoteItemPayload, QuoteItemRow, QuotePayload,
    QuoteRequest, QuoteSummary, UpdateQuoteRequest, QUOTE_STATUSES,
};
