use crate::doc::{Document, PostingInfo, PostingsEntry};
use crate::error::Result;
use crate::store::Store;
use std::collections::HashMap;

/// Fold a document into a postings entry. Returns an owned map: the entry for
/// `doc.id` is set or overwritten, every other document id is preserved.
pub fn merge_postings(existing: Option<PostingsEntry>, doc: &Document) -> PostingsEntry {
    let mut entry = existing.unwrap_or_default();
    entry.insert(doc.id.clone(), PostingInfo { latest: doc.latest });
    entry
}

/// Point read of one postings entry.
pub fn single_lookup<S: Store>(store: &S, key: &[u8]) -> Result<Option<PostingsEntry>> {
    decode(store.get(key)?)
}

/// Batched point reads. Every requested key appears in the result, `None`
/// when absent.
pub fn lookup_by_keys<S: Store>(
    store: &S,
    keys: &[Vec<u8>],
) -> Result<HashMap<Vec<u8>, Option<PostingsEntry>>> {
    let values = store.multi_get(keys)?;
    keys.iter()
        .zip(values)
        .map(|(key, value)| Ok((key.clone(), decode(value)?)))
        .collect()
}

/// Range-scan alternative to [`lookup_by_keys`]: one ordered scan over
/// `prefix`, intersected with the requested key set. Amortizes lookup cost
/// when the requested set is large relative to the keyspace under the prefix.
/// Same result contract as the batched variant.
pub fn term_range_lookup<S: Store>(
    store: &S,
    prefix: &[u8],
    keys: &[Vec<u8>],
) -> Result<HashMap<Vec<u8>, Option<PostingsEntry>>> {
    let mut out: HashMap<Vec<u8>, Option<PostingsEntry>> =
        keys.iter().map(|key| (key.clone(), None)).collect();
    for (key, value) in store.scan_prefix(prefix)? {
        if let Some(slot) = out.get_mut(&key) {
            *slot = decode(Some(value))?;
        }
    }
    Ok(out)
}

fn decode(raw: Option<Vec<u8>>) -> Result<Option<PostingsEntry>> {
    match raw {
        Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
        None => Ok(None),
    }
}
