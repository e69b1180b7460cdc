use crate::doc::{self, Document};
use crate::error::{IndexError, Result};
use crate::keys;
use crate::pipeline::{self, PageRequest};
use crate::postings::{lookup_by_keys, merge_postings, single_lookup, term_range_lookup};
use crate::queue::WriteQueue;
use crate::store::{Store, WriteBatch};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Tuning knobs for an index.
#[derive(Clone, Copy)]
pub struct IndexConfig {
    /// Term-set size above which a family lookup switches from batched point
    /// reads to one prefix range scan.
    pub range_scan_threshold: usize,
    /// Augmentation applied to the merged record before it is persisted.
    /// Pure over the document; no store access.
    pub augment: fn(&mut Document),
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { range_scan_threshold: 3000, augment: doc::activity_score }
    }
}

/// One independently updated slice of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Page,
    Terms,
    UrlTerms,
    TitleTerms,
    Domain,
    Timestamps,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Family::Page => "page",
            Family::Terms => "terms",
            Family::UrlTerms => "url_terms",
            Family::TitleTerms => "title_terms",
            Family::Domain => "domain",
            Family::Timestamps => "timestamps",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct FamilyFailure {
    pub family: Family,
    pub error: IndexError,
}

/// What happened to one indexing pass. Store faults inside a pass do not fail
/// the pass (the submit call still resolves `Ok`); they are logged and
/// recorded here so callers that want strictness can inspect `failures`.
#[derive(Debug)]
pub struct IndexOutcome {
    pub page_id: String,
    /// False when the document had no extractable terms and the pass wrote
    /// nothing, or when the page merge itself failed.
    pub indexed: bool,
    pub failures: Vec<FamilyFailure>,
}

impl IndexOutcome {
    fn skipped(page_id: String) -> Self {
        Self { page_id, indexed: false, failures: Vec::new() }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, family: Family, result: Result<()>) {
        if let Err(error) = result {
            tracing::warn!(page = %self.page_id, %family, %error, "index update failed");
            self.failures.push(FamilyFailure { family, error });
        }
    }
}

struct IndexCore<S: Store> {
    store: S,
    config: IndexConfig,
}

impl<S: Store> IndexCore<S> {
    /// Merge one term family into its postings: resolve current entries for
    /// every term (strategy chosen by cardinality), fold the document in, and
    /// flush a single atomic batch. Empty term set: no store operations.
    fn index_term_family(&self, doc: &Document, terms: &HashSet<String>, prefix: &str) -> Result<()> {
        if terms.is_empty() {
            return Ok(());
        }
        let term_keys: Vec<Vec<u8>> = terms.iter().map(|t| keys::prefixed(prefix, t)).collect();
        let current = if term_keys.len() > self.config.range_scan_threshold {
            term_range_lookup(&self.store, prefix.as_bytes(), &term_keys)?
        } else {
            lookup_by_keys(&self.store, &term_keys)?
        };

        let mut batch = WriteBatch::new();
        for (key, existing) in current {
            let merged = merge_postings(existing, doc);
            batch.put(key, bincode::serialize(&merged)?);
        }
        self.store.apply_batch(batch)
    }

    /// Single-key variant for the page's domain.
    fn index_domain(&self, doc: &Document) -> Result<()> {
        if doc.domain.is_empty() {
            return Ok(());
        }
        let key = keys::prefixed(keys::DOMAIN_PREFIX, &doc.domain);
        let merged = merge_postings(single_lookup(&self.store, &key)?, doc);
        self.store.put(&key, &bincode::serialize(&merged)?)
    }

    /// Reverse lookups from visit/bookmark timestamp keys to the owning page.
    /// A key already mapping to this page is left alone; a key mapping to a
    /// different page is overwritten, reassigning ownership.
    fn index_timestamps(&self, doc: &Document) -> Result<()> {
        let stamp_keys: Vec<Vec<u8>> = doc
            .bookmarks
            .iter()
            .chain(doc.visits.iter())
            .map(|k| k.as_bytes().to_vec())
            .collect();
        if stamp_keys.is_empty() {
            return Ok(());
        }
        let current = self.store.multi_get(&stamp_keys)?;

        let mut batch = WriteBatch::new();
        for (key, existing) in stamp_keys.into_iter().zip(current) {
            if existing.as_deref() != Some(doc.id.as_bytes()) {
                batch.put(key, doc.id.as_bytes().to_vec());
            }
        }
        if batch.is_empty() {
            return Ok(());
        }
        self.store.apply_batch(batch)
    }

    /// Reconcile the incoming document with any stored record for the same
    /// id: `terms`, `title_terms`, `visits`, and `bookmarks` are unioned;
    /// `url_terms`, `domain`, and `latest` are taken from the incoming
    /// document. The augmented merged record is persisted and returned as the
    /// source for all postings updates.
    fn index_page(&self, mut doc: Document) -> Result<Document> {
        let key = keys::page_key(&doc.id);
        if let Some(raw) = self.store.get(&key)? {
            let existing: Document = bincode::deserialize(&raw)?;
            doc.terms.extend(existing.terms);
            doc.title_terms.extend(existing.title_terms);
            doc.visits.extend(existing.visits);
            doc.bookmarks.extend(existing.bookmarks);
        }
        (self.config.augment)(&mut doc);
        self.store.put(&key, &bincode::serialize(&doc)?)?;
        Ok(doc)
    }

    /// One full indexing pass over a produced document. Never fails: store
    /// faults are logged and recorded in the outcome, and the five postings
    /// families are independent of one another, so a fault in one leaves the
    /// others committed.
    async fn perform_indexing(&self, doc: Document) -> IndexOutcome {
        if doc.terms.is_empty() {
            tracing::debug!(page = %doc.id, "no extractable terms, skipping");
            return IndexOutcome::skipped(doc.id);
        }

        let mut outcome = IndexOutcome { page_id: doc.id.clone(), indexed: true, failures: Vec::new() };
        let merged = match self.index_page(doc) {
            Ok(merged) => merged,
            Err(error) => {
                outcome.indexed = false;
                outcome.record(Family::Page, Err(error));
                return outcome;
            }
        };

        let (terms, url_terms, title_terms, domain, timestamps) = tokio::join!(
            async { self.index_term_family(&merged, &merged.terms, keys::TERM_PREFIX) },
            async { self.index_term_family(&merged, &merged.url_terms, keys::URL_TERM_PREFIX) },
            async { self.index_term_family(&merged, &merged.title_terms, keys::TITLE_TERM_PREFIX) },
            async { self.index_domain(&merged) },
            async { self.index_timestamps(&merged) },
        );
        outcome.record(Family::Terms, terms);
        outcome.record(Family::UrlTerms, url_terms);
        outcome.record(Family::TitleTerms, title_terms);
        outcome.record(Family::Domain, domain);
        outcome.record(Family::Timestamps, timestamps);

        tracing::debug!(
            page = %outcome.page_id,
            failures = outcome.failures.len(),
            "indexing pass complete"
        );
        outcome
    }

    fn attach_bookmark(&self, page_id: &str, when: Option<u64>) -> Result<()> {
        let key = keys::page_key(page_id);
        let raw = self
            .store
            .get(&key)?
            .ok_or_else(|| IndexError::PageNotFound(page_id.to_string()))?;
        let mut record: Document = bincode::deserialize(&raw)?;

        let when = when.unwrap_or_else(keys::now_ms);
        let bookmark = keys::bookmark_key(when);
        self.store.put(bookmark.as_bytes(), record.id.as_bytes())?;
        record.bookmarks.insert(bookmark);
        self.store.put(&key, &bincode::serialize(&record)?)?;
        Ok(())
    }
}

/// Handle to one index: the store, the tuning config, and the serialized
/// write queue. Construct it once and pass it around; there is no ambient
/// global instance.
pub struct SearchIndex<S: Store> {
    core: Arc<IndexCore<S>>,
    queue: WriteQueue,
}

impl<S: Store> SearchIndex<S> {
    /// Must be called within a tokio runtime (the queue worker is spawned
    /// here).
    pub fn new(store: S) -> Self {
        Self::with_config(store, IndexConfig::default())
    }

    pub fn with_config(store: S, config: IndexConfig) -> Self {
        Self { core: Arc::new(IndexCore { store, config }), queue: WriteQueue::new() }
    }

    pub fn store(&self) -> &S {
        &self.core.store
    }

    /// Submit a page (plus any visits/bookmarks) for indexing through the
    /// write queue. The pipeline runs first: a pipeline error propagates to
    /// the caller and enqueues nothing. Store faults inside the pass do not
    /// fail the call; see [`IndexOutcome`].
    pub async fn add_page(&self, req: PageRequest) -> Result<IndexOutcome> {
        let document = pipeline::process(&req)?;
        let core = Arc::clone(&self.core);
        self.queue.run(async move { core.perform_indexing(document).await }).await
    }

    /// Direct-call variant of [`add_page`](Self::add_page) accepting any
    /// (possibly still pending) document production and bypassing the write
    /// queue. Not safe under concurrent index mutation; use it only when the
    /// caller guarantees no other mutating pass is in flight.
    pub async fn index_document<F>(&self, production: F) -> Result<IndexOutcome>
    where
        F: Future<Output = Result<Document>>,
    {
        let document = production.await?;
        Ok(self.core.perform_indexing(document).await)
    }

    /// Attach a bookmark to an already indexed page, through the write
    /// queue. `when` is Unix milliseconds, defaulting to now. Fails with
    /// [`IndexError::PageNotFound`] before any write if the page has never
    /// been indexed.
    pub async fn add_bookmark(&self, page_id: &str, when: Option<u64>) -> Result<()> {
        let core = Arc::clone(&self.core);
        let page_id = page_id.to_string();
        self.queue.run(async move { core.attach_bookmark(&page_id, when) }).await?
    }

    /// Direct-call variant of [`add_bookmark`](Self::add_bookmark); same
    /// caveat as [`index_document`](Self::index_document).
    pub async fn add_bookmark_direct(&self, page_id: &str, when: Option<u64>) -> Result<()> {
        self.core.attach_bookmark(page_id, when)
    }

    /// Fetch the stored record for a page id.
    pub fn get_page(&self, page_id: &str) -> Result<Option<Document>> {
        match self.core.store.get(&keys::page_key(page_id))? {
            Some(raw) => Ok(Some(bincode::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Finish all queued work and stop the queue worker.
    pub async fn shutdown(mut self) {
        self.queue.shutdown().await;
    }
}
