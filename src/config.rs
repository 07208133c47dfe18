use std::env;

/// Settings shared by the request handlers, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the external media host; stored image paths are joined
    /// onto this when building responses.
    pub media_base_url: String,
    /// Default page size for product listings.
    pub page_size: i64,
    /// Hard cap on client-requested page sizes.
    pub max_page_size: i64,
}

impl Config {
    pub fn from_env() -> Self {
        let media_base_url = env::var("MEDIA_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000/media".to_string());

        let page_size = env::var("PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(15);

        let max_page_size = env::var("MAX_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);

        Self {
            media_base_url,
            page_size,
            max_page_size,
        }
    }
}
