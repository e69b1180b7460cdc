use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A page document as produced by the pipeline and stored under its page key.
///
/// The term fields are sets of already normalized terms; `visits` and
/// `bookmarks` hold fully formatted timestamp keys (see [`crate::keys`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub domain: String,
    pub terms: HashSet<String>,
    pub url_terms: HashSet<String>,
    pub title_terms: HashSet<String>,
    pub visits: HashSet<String>,
    pub bookmarks: HashSet<String>,
    /// Most recent activity in Unix milliseconds.
    pub latest: u64,
    /// Derived ranking score, filled in during augmentation.
    #[serde(default)]
    pub score: f64,
}

/// Per-document value stored inside a postings entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostingInfo {
    pub latest: u64,
}

/// One postings entry: document id -> per-document info, stored bincode
/// encoded under a single term/domain key.
pub type PostingsEntry = HashMap<String, PostingInfo>;

/// Default augmentation: a recency-weighted activity score. Visits contribute
/// logarithmically, bookmarks linearly.
pub fn activity_score(doc: &mut Document) {
    let visits = doc.visits.len() as f64;
    let bookmarks = doc.bookmarks.len() as f64;
    doc.score = doc.latest as f64 * (1.0 + 0.1 * visits.ln_1p() + 0.25 * bookmarks);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document {
            id: "d1".into(),
            domain: "example.com".into(),
            terms: HashSet::new(),
            url_terms: HashSet::new(),
            title_terms: HashSet::new(),
            visits: HashSet::new(),
            bookmarks: HashSet::new(),
            latest: 1_000,
            score: 0.0,
        }
    }

    #[test]
    fn score_grows_with_activity() {
        let mut bare = doc();
        activity_score(&mut bare);

        let mut busy = doc();
        busy.visits.insert("visit/0000000000001".into());
        busy.bookmarks.insert("bookmark/0000000000002".into());
        activity_score(&mut busy);

        assert!(busy.score > bare.score);
        assert_eq!(bare.score, 1_000.0);
    }
}
