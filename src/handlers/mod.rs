pub mod categories;
pub mod products;
pub mod quotes;
pub mod subcategories;
