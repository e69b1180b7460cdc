use crate::doc::Document;
use crate::error::{IndexError, Result};
use crate::keys;
use crate::tokenizer::{term_set, url_term_set};
use std::collections::HashSet;
use url::Url;

/// A raw page record before term extraction.
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub url: String,
    pub title: Option<String>,
    pub content: String,
}

/// A full indexing request: one page plus any visit/bookmark timestamps
/// (Unix milliseconds) that arrived with it.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub page: PageRecord,
    pub visits: Vec<u64>,
    pub bookmarks: Vec<u64>,
}

impl PageRequest {
    pub fn new(page: PageRecord) -> Self {
        Self { page, visits: Vec::new(), bookmarks: Vec::new() }
    }
}

/// Turn a raw request into a normalized [`Document`].
///
/// An empty URL is a pipeline error; empty extracted term sets are not (the
/// orchestrator skips such documents without writing anything). `latest` is
/// the maximum supplied timestamp, falling back to the current time.
pub fn process(req: &PageRequest) -> Result<Document> {
    let page = &req.page;
    if page.url.trim().is_empty() {
        return Err(IndexError::Pipeline("page record has no url".into()));
    }

    let normalized = keys::normalize_url(&page.url);
    let id = keys::page_id(&normalized);
    let domain = host_of(&page.url).unwrap_or_default();

    let terms = term_set(&page.content);
    let title_terms = page.title.as_deref().map(term_set).unwrap_or_default();
    let url_terms = url_term_set(&normalized);

    let visits: HashSet<String> = req.visits.iter().map(|&ms| keys::visit_key(ms)).collect();
    let bookmarks: HashSet<String> =
        req.bookmarks.iter().map(|&ms| keys::bookmark_key(ms)).collect();
    let latest = req
        .visits
        .iter()
        .chain(req.bookmarks.iter())
        .copied()
        .max()
        .unwrap_or_else(keys::now_ms);

    Ok(Document {
        id,
        domain,
        terms,
        url_terms,
        title_terms,
        visits,
        bookmarks,
        latest,
        score: 0.0,
    })
}

/// Host part of a URL, `www.`-stripped. Bare hosts without a scheme are
/// retried with an https prefix.
fn host_of(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed)
        .or_else(|_| Url::parse(&format!("https://{trimmed}")))
        .ok()?;
    let host = url.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str, title: Option<&str>, content: &str) -> PageRequest {
        PageRequest::new(PageRecord {
            url: url.into(),
            title: title.map(str::to_string),
            content: content.into(),
        })
    }

    #[test]
    fn builds_all_term_families() {
        let mut req = request(
            "https://www.example.com/rust-guide",
            Some("A Rust Guide"),
            "Learning systems programming with Rust.",
        );
        req.visits = vec![100, 300];
        req.bookmarks = vec![200];

        let doc = process(&req).unwrap();
        assert_eq!(doc.domain, "example.com");
        assert!(doc.terms.contains("rust"));
        assert!(doc.title_terms.contains("guid"));
        assert!(doc.url_terms.contains("guide"));
        assert!(doc.visits.contains(&keys::visit_key(100)));
        assert!(doc.bookmarks.contains(&keys::bookmark_key(200)));
        assert_eq!(doc.latest, 300);
    }

    #[test]
    fn same_page_url_variants_map_to_one_id() {
        let a = process(&request("https://www.example.com/a/", None, "x")).unwrap();
        let b = process(&request("http://example.com/a", None, "x")).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn empty_url_is_a_pipeline_error() {
        let err = process(&request("  ", None, "body")).unwrap_err();
        assert!(matches!(err, IndexError::Pipeline(_)));
    }

    #[test]
    fn empty_content_is_not_an_error() {
        let doc = process(&request("https://example.com/empty", None, "")).unwrap();
        assert!(doc.terms.is_empty());
    }
}
