//! Domain normalization
//!
//! Every domain that is stored against a tenant and every domain that is
//! looked up goes through [`normalize_domain`]. Matching is plain string
//! equality on the normalized form, so both sides must use this function.

/// Canonicalize a raw host or URL-ish string into a comparable domain key.
///
/// Steps, in order: strip a leading `http://` or `https://`, strip a leading
/// `www.`, strip one trailing `/`, lower-case, trim. Scheme and `www.` are
/// matched case-insensitively. Returns `None` when nothing is left.
pub fn normalize_domain(raw: &str) -> Option<String> {
    let mut rest = raw.trim();

    rest = strip_prefix_ignore_case(rest, "https://")
        .or_else(|| strip_prefix_ignore_case(rest, "http://"))
        .unwrap_or(rest);
    rest = strip_prefix_ignore_case(rest, "www.").unwrap_or(rest);
    rest = rest.strip_suffix('/').unwrap_or(rest);

    let normalized = rest.to_lowercase().trim().to_string();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_domain() {
        assert_eq!(
            normalize_domain("HTTPS://WWW.Example.com/").as_deref(),
            Some("example.com")
        );
        assert_eq!(normalize_domain("example.com").as_deref(), Some("example.com"));
        assert_eq!(
            normalize_domain("http://lodha.com").as_deref(),
            Some("lodha.com")
        );
        assert_eq!(
            normalize_domain("www.Nivasa.COM").as_deref(),
            Some("nivasa.com")
        );
    }

    #[test]
    fn test_normalize_domain_empty() {
        assert_eq!(normalize_domain(""), None);
        assert_eq!(normalize_domain("   "), None);
        assert_eq!(normalize_domain("https://"), None);
        assert_eq!(normalize_domain("https://www./"), None);
    }

    #[test]
    fn test_normalize_domain_strips_single_trailing_slash() {
        assert_eq!(
            normalize_domain("example.com//").as_deref(),
            Some("example.com/")
        );
    }

    #[test]
    fn test_normalize_domain_keeps_path_and_port() {
        assert_eq!(
            normalize_domain("https://example.com:8443/listing").as_deref(),
            Some("example.com:8443/listing")
        );
    }

    #[test]
    fn test_normalize_domain_variants_agree() {
        let variants = [
            "example.com",
            "EXAMPLE.COM",
            "http://example.com",
            "https://www.example.com/",
            "  www.example.com  ",
            "Https://Www.Example.Com",
        ];
        for v in variants {
            assert_eq!(normalize_domain(v).as_deref(), Some("example.com"), "{v}");
        }
    }

    #[test]
    fn test_normalize_domain_non_ascii_prefix() {
        // Must not panic on a char boundary inside the prefix window
        assert_eq!(normalize_domain("ü.example").as_deref(), Some("ü.example"));
    }
}
