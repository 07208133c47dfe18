pub mod media;
pub mod slug;

pub use media::{media_url, resolve_media};
pub use slug::slugify;
