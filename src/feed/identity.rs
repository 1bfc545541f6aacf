use sha2::{Digest, Sha256};

/// Content identifier for an article: lowercase hex SHA-256 of the permalink.
///
/// Stored ids are compared verbatim, so changing the digest or its encoding
/// makes every previously saved article look new again.
pub fn generate_id(link: &str) -> String {
    format!("{:x}", Sha256::digest(link.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_link_yields_same_id() {
        let link = "https://example.com/posts/42";
        assert_eq!(generate_id(link), generate_id(link));
    }

    #[test]
    fn distinct_links_yield_distinct_ids() {
        let ids = [
            generate_id("https://example.com/a"),
            generate_id("https://example.com/b"),
            generate_id("https://example.com/a/"),
            generate_id("http://example.com/a"),
        ];
        for (i, left) in ids.iter().enumerate() {
            for right in &ids[i + 1..] {
                assert_ne!(left, right);
            }
        }
    }

    #[test]
    fn id_is_fixed_width_hex() {
        let id = generate_id("https://example.com/posts/42");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn empty_link_still_hashes() {
        assert_eq!(
            generate_id(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
