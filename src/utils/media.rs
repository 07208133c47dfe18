/// Join a stored media path onto the external media host. Values that are
/// already absolute URLs pass through untouched.
pub fn media_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Resolve an optional stored path, treating blank values as absent.
pub fn resolve_media(base: &str, path: Option<&str>) -> Option<String> {
    path.filter(|p| !p.trim().is_empty())
        .map(|p| media_url(base, p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_relative_paths() {
        assert_eq!(
            media_url("https://media.example.com", "products/2025/01/p1.jpg"),
            "https://media.example.com/products/2025/01/p1.jpg"
        );
        assert_eq!(
            media_url("https://media.example.com/", "/products/p1.jpg"),
            "https://media.example.com/products/p1.jpg"
        );
    }

    #[test]
    fn passes_absolute_urls_through() {
        assert_eq!(
            media_url("https://media.example.com", "https://cdn.other.com/x.png"),
            "https://cdn.other.com/x.png"
        );
    }

    #[test]
    fn blank_paths_resolve_to_none() {
        assert_eq!(resolve_media("https://media.example.com", None), None);
        assert_eq!(resolve_media("https://media.example.com", Some("")), None);
        assert_eq!(
            resolve_media("https://media.example.com", Some("a.jpg")),
            Some("https://media.example.com/a.jpg".to_string())
        );
    }
}
