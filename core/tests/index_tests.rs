use retrace::pipeline::{PageRecord, PageRequest};
use retrace::postings::{lookup_by_keys, term_range_lookup};
use retrace::{keys, Document, IndexConfig, IndexError, MemoryStore, PostingsEntry, SearchIndex, SledStore, Store};
use std::collections::HashSet;

fn request(url: &str, content: &str, visits: &[u64]) -> PageRequest {
    PageRequest {
        page: PageRecord { url: url.into(), title: None, content: content.into() },
        visits: visits.to_vec(),
        bookmarks: Vec::new(),
    }
}

fn postings(store: &MemoryStore, key: &str) -> PostingsEntry {
    let raw = store
        .get(key.as_bytes())
        .unwrap()
        .unwrap_or_else(|| panic!("no postings under {key}"));
    bincode::deserialize(&raw).unwrap()
}

fn document(id: &str, terms: &[&str], url_terms: &[&str], latest: u64) -> Document {
    Document {
        id: id.into(),
        domain: "example.com".into(),
        terms: terms.iter().map(|s| s.to_string()).collect(),
        url_terms: url_terms.iter().map(|s| s.to_string()).collect(),
        title_terms: HashSet::new(),
        visits: HashSet::new(),
        bookmarks: HashSet::new(),
        latest,
        score: 0.0,
    }
}

#[tokio::test]
async fn reindexing_the_same_document_is_idempotent() {
    let store = MemoryStore::new();
    let index = SearchIndex::new(store.clone());
    let req = request("https://example.com/a", "foo bar", &[100]);

    let first = index.add_page(req.clone()).await.unwrap();
    assert!(first.indexed && first.is_clean());
    let foo_once = postings(&store, "term/foo");
    let bar_once = postings(&store, "term/bar");

    let second = index.add_page(req).await.unwrap();
    assert!(second.indexed && second.is_clean());
    assert_eq!(postings(&store, "term/foo"), foo_once);
    assert_eq!(postings(&store, "term/bar"), bar_once);

    let record = index.get_page(&first.page_id).unwrap().unwrap();
    let expected: HashSet<String> = ["foo", "bar"].iter().map(|s| s.to_string()).collect();
    assert_eq!(record.terms, expected);
    index.shutdown().await;
}

#[tokio::test]
async fn reindexing_unions_term_visit_and_bookmark_sets() {
    let store = MemoryStore::new();
    let index = SearchIndex::new(store.clone());
    let url = "https://example.com/page";

    let mut first = request(url, "alpha beta", &[100]);
    first.page.title = Some("Gamma".into());
    index.add_page(first).await.unwrap();

    let mut second = request(url, "delta", &[200]);
    second.page.title = Some("Epsilon".into());
    second.bookmarks = vec![300];
    let outcome = index.add_page(second).await.unwrap();

    let record = index.get_page(&outcome.page_id).unwrap().unwrap();
    for term in ["alpha", "beta", "delta"] {
        assert!(record.terms.contains(term), "terms lost {term}");
    }
    for term in ["gamma", "epsilon"] {
        assert!(record.title_terms.contains(term), "title terms lost {term}");
    }
    assert!(record.visits.contains(&keys::visit_key(100)));
    assert!(record.visits.contains(&keys::visit_key(200)));
    assert!(record.bookmarks.contains(&keys::bookmark_key(300)));
    assert_eq!(record.latest, 300);
    index.shutdown().await;
}

// Documents current behavior: url_terms is the one set NOT unioned on
// re-index; the incoming document's url_terms replace the stored ones.
#[tokio::test]
async fn reindex_does_not_union_url_terms() {
    let store = MemoryStore::new();
    let index = SearchIndex::new(store.clone());

    let old = document("p1", &["foo"], &["old"], 100);
    let new = document("p1", &["bar"], &["new"], 200);
    index.index_document(async { Ok(old) }).await.unwrap();
    index.index_document(async { Ok(new) }).await.unwrap();

    let record = index.get_page("p1").unwrap().unwrap();
    assert!(record.terms.contains("foo") && record.terms.contains("bar"));
    assert!(record.url_terms.contains("new"));
    assert!(!record.url_terms.contains("old"));
    index.shutdown().await;
}

#[tokio::test]
async fn empty_term_set_writes_nothing() {
    let store = MemoryStore::new();
    let index = SearchIndex::new(store.clone());

    let outcome = index
        .add_page(request("https://example.com/empty", "", &[100]))
        .await
        .unwrap();
    assert!(!outcome.indexed);
    assert!(outcome.is_clean());
    assert_eq!(store.write_count(), 0);
    index.shutdown().await;
}

// The merged record drives every term indexer, so a term from the first
// pass picks up the latest timestamp of the second pass.
#[tokio::test]
async fn reindex_refreshes_latest_for_all_merged_terms() {
    let store = MemoryStore::new();
    let index = SearchIndex::new(store.clone());
    let url = "https://example.com/p1";

    index.add_page(request(url, "foo bar", &[100])).await.unwrap();
    let outcome = index.add_page(request(url, "bar baz", &[200])).await.unwrap();
    let id = outcome.page_id;

    for term in ["foo", "bar", "baz"] {
        let entry = postings(&store, &format!("term/{term}"));
        assert_eq!(entry[&id].latest, 200, "stale latest for {term}");
    }
    index.shutdown().await;
}

#[tokio::test]
async fn racing_passes_on_a_shared_term_lose_no_update() {
    let store = MemoryStore::new();
    let index = SearchIndex::new(store.clone());

    let a = index.add_page(request("https://a.example.com/", "network alpha", &[100]));
    let b = index.add_page(request("https://b.example.com/", "network beta", &[200]));
    let (a, b) = tokio::join!(a, b);
    let (a, b) = (a.unwrap(), b.unwrap());

    let entry = postings(&store, "term/network");
    assert_eq!(entry.len(), 2);
    assert_eq!(entry[&a.page_id].latest, 100);
    assert_eq!(entry[&b.page_id].latest, 200);
    index.shutdown().await;
}

#[tokio::test]
async fn bookmarking_an_unknown_page_fails_without_writes() {
    let store = MemoryStore::new();
    let index = SearchIndex::new(store.clone());

    let err = index.add_bookmark("deadbeef", Some(1_000)).await.unwrap_err();
    assert!(matches!(err, IndexError::PageNotFound(_)));
    assert_eq!(store.write_count(), 0);
    index.shutdown().await;
}

#[tokio::test]
async fn bookmark_attaches_to_record_and_reverse_index() {
    let store = MemoryStore::new();
    let index = SearchIndex::new(store.clone());

    let outcome = index
        .add_page(request("https://example.com/keep", "keeper content", &[100]))
        .await
        .unwrap();
    index.add_bookmark(&outcome.page_id, Some(500)).await.unwrap();

    let record = index.get_page(&outcome.page_id).unwrap().unwrap();
    let bookmark = keys::bookmark_key(500);
    assert!(record.bookmarks.contains(&bookmark));
    let owner = store.get(bookmark.as_bytes()).unwrap().unwrap();
    assert_eq!(owner, outcome.page_id.as_bytes());
    index.shutdown().await;
}

// Documents current behavior: a timestamp key already owned by a different
// page is reassigned to the page indexed later.
#[tokio::test]
async fn visit_key_reassigned_to_new_owner() {
    let store = MemoryStore::new();
    let index = SearchIndex::new(store.clone());

    index
        .add_page(request("https://a.example.com/", "first page", &[555]))
        .await
        .unwrap();
    let b = index
        .add_page(request("https://b.example.com/", "second page", &[555]))
        .await
        .unwrap();

    let owner = store.get(keys::visit_key(555).as_bytes()).unwrap().unwrap();
    assert_eq!(owner, b.page_id.as_bytes());
    index.shutdown().await;
}

#[tokio::test]
async fn lookup_strategies_return_identical_results() {
    let store = MemoryStore::new();
    let index = SearchIndex::new(store.clone());
    index
        .add_page(request("https://example.com/one", "foo bar baz", &[100]))
        .await
        .unwrap();

    let term_keys: Vec<Vec<u8>> = ["foo", "bar", "baz", "missing"]
        .iter()
        .map(|t| keys::prefixed(keys::TERM_PREFIX, t))
        .collect();
    let by_keys = lookup_by_keys(&store, &term_keys).unwrap();
    let by_range = term_range_lookup(&store, keys::TERM_PREFIX.as_bytes(), &term_keys).unwrap();
    assert_eq!(by_keys, by_range);
    assert!(by_keys[&keys::prefixed(keys::TERM_PREFIX, "missing")].is_none());
    index.shutdown().await;
}

// Forcing the threshold to each extreme drives the two lookup paths end to
// end; the resulting postings must not differ.
#[tokio::test]
async fn threshold_choice_does_not_change_outcomes() {
    let mut stores = Vec::new();
    for threshold in [0usize, usize::MAX] {
        let store = MemoryStore::new();
        let config = IndexConfig { range_scan_threshold: threshold, ..IndexConfig::default() };
        let index = SearchIndex::with_config(store.clone(), config);
        index
            .add_page(request("https://example.com/a", "foo bar", &[100]))
            .await
            .unwrap();
        index
            .add_page(request("https://example.com/b", "bar baz", &[200]))
            .await
            .unwrap();
        index.shutdown().await;
        stores.push(store);
    }

    for term in ["foo", "bar", "baz"] {
        let key = format!("term/{term}");
        assert_eq!(postings(&stores[0], &key), postings(&stores[1], &key));
    }
}

#[tokio::test]
async fn sled_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let index = SearchIndex::new(SledStore::open(dir.path()).unwrap());

    let outcome = index
        .add_page(request("https://example.com/disk", "persisted content", &[100]))
        .await
        .unwrap();
    assert!(outcome.indexed && outcome.is_clean());

    let record = index.get_page(&outcome.page_id).unwrap().unwrap();
    assert!(record.terms.contains("persist"));

    let raw = index
        .store()
        .get(&keys::prefixed(keys::TERM_PREFIX, "persist"))
        .unwrap()
        .unwrap();
    let entry: PostingsEntry = bincode::deserialize(&raw).unwrap();
    assert_eq!(entry[&outcome.page_id].latest, 100);
    index.shutdown().await;
}
