use std::num::NonZeroUsize;

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;

use crate::completion::AnswerPayload;

/// A memoized answer for one `(dataset id, question)` pair.
#[derive(Debug, Clone)]
pub struct CachedAnswer {
    pub payload: AnswerPayload,
    pub created_at: DateTime<Utc>,
}

/// Answer cache keyed by the literal `(dataset id, question)` pair.
///
/// Keys are case- and whitespace-sensitive: two textually distinct
/// phrasings of the same question are distinct entries. Backed by an LRU
/// with a configured capacity; sized generously so eviction is a safety
/// valve rather than expected behavior.
pub struct AnswerCache {
    cache: Mutex<LruCache<(String, String), CachedAnswer>>,
}

impl AnswerCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(10_000).unwrap());
        Self {
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn put(&self, dataset_id: &str, question: &str, payload: AnswerPayload) {
        let entry = CachedAnswer {
            payload,
            created_at: Utc::now(),
        };
        self.cache
            .lock()
            .put((dataset_id.to_string(), question.to_string()), entry);
    }

    pub fn get(&self, dataset_id: &str, question: &str) -> Option<CachedAnswer> {
        self.cache
            .lock()
            .get(&(dataset_id.to_string(), question.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}
