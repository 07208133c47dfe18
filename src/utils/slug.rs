/// URL-safe identifier derived from a human-readable name: lowercase
/// ASCII alphanumerics with separator runs collapsed to single hyphens.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_separator = false;

    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else if c == '-' || c == '_' || c.is_whitespace() {
            pending_separator = true;
        }
        // remaining punctuation is dropped
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn lowercases_and_hyphenates() {
        assert_eq!(slugify("Office Supplies"), "office-supplies");
        assert_eq!(slugify("HP LaserJet Pro M404n"), "hp-laserjet-pro-m404n");
    }

    #[test]
    fn collapses_separator_runs() {
        assert_eq!(slugify("A4  Copy   Paper"), "a4-copy-paper");
        assert_eq!(slugify("desk_-_lamp"), "desk-lamp");
    }

    #[test]
    fn strips_punctuation_and_edges() {
        assert_eq!(slugify("  Pens & Markers!  "), "pens-markers");
        assert_eq!(slugify("--Printers--"), "printers");
        assert_eq!(slugify(""), "");
    }
}
