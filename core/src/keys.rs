use sha1::{Digest, Sha1};

pub const PAGE_PREFIX: &str = "page/";
pub const TERM_PREFIX: &str = "term/";
pub const URL_TERM_PREFIX: &str = "url/";
pub const TITLE_TERM_PREFIX: &str = "title/";
pub const DOMAIN_PREFIX: &str = "domain/";
pub const VISIT_PREFIX: &str = "visit/";
pub const BOOKMARK_PREFIX: &str = "bookmark/";

/// Millisecond timestamps in visit/bookmark keys are zero-padded to this
/// width so lexicographic key order equals numeric order under range scans.
pub const TIMESTAMP_DIGITS: usize = 13;

pub fn prefixed(prefix: &str, part: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + part.len());
    key.extend_from_slice(prefix.as_bytes());
    key.extend_from_slice(part.as_bytes());
    key
}

pub fn page_key(id: &str) -> Vec<u8> {
    prefixed(PAGE_PREFIX, id)
}

pub fn visit_key(ms: u64) -> String {
    format!("{VISIT_PREFIX}{ms:0width$}", width = TIMESTAMP_DIGITS)
}

pub fn bookmark_key(ms: u64) -> String {
    format!("{BOOKMARK_PREFIX}{ms:0width$}", width = TIMESTAMP_DIGITS)
}

/// Canonical form of a URL used for id derivation: no scheme, no `www.`,
/// no fragment, no trailing slash.
pub fn normalize_url(raw: &str) -> String {
    let s = raw.trim();
    let s = s.split('#').next().unwrap_or(s);
    let s = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .unwrap_or(s);
    let s = s.strip_prefix("www.").unwrap_or(s);
    s.trim_end_matches('/').to_string()
}

/// Stable page id: hex SHA-1 over the normalized URL.
pub fn page_id(normalized_url: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(normalized_url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_ms() -> u64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_keys_sort_numerically() {
        assert_eq!(visit_key(99), "visit/0000000000099");
        assert!(visit_key(99).as_bytes() < visit_key(100).as_bytes());
        assert!(bookmark_key(1_700_000_000_000) < bookmark_key(1_700_000_000_001));
    }

    #[test]
    fn url_variants_share_an_id() {
        let a = page_id(&normalize_url("https://www.example.com/a/"));
        let b = page_id(&normalize_url("http://example.com/a#section"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
    }
}
