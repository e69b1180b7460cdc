//! Index update and merge engine for a local web history search store:
//! term/URL/title/domain postings plus a reverse timestamp index over an
//! ordered key-value store, with all mutating passes serialized through a
//! single write queue.

pub mod doc;
pub mod error;
pub mod index;
pub mod keys;
pub mod pipeline;
pub mod postings;
pub mod queue;
pub mod store;
pub mod tokenizer;

pub use doc::{Document, PostingInfo, PostingsEntry};
pub use error::{IndexError, Result};
pub use index::{Family, FamilyFailure, IndexConfig, IndexOutcome, SearchIndex};
pub use store::{MemoryStore, SledStore, Store, WriteBatch};
