use std::sync::Arc;

use crate::analysis::AnswerCache;
use crate::completion::CompletionBackend;
use crate::dataset::DatasetStore;
use crate::server::rate_limit::RateLimiter;
use crate::settings::Settings;

/// Shared per-process state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub datasets: Arc<DatasetStore>,
    pub answers: Arc<AnswerCache>,
    pub limiter: Arc<RateLimiter>,
    pub completion: Arc<dyn CompletionBackend>,
}

impl AppState {
    pub fn new(settings: Settings, completion: Arc<dyn CompletionBackend>) -> Self {
        Self {
            datasets: Arc::new(DatasetStore::new(settings.max_datasets)),
            answers: Arc::new(AnswerCache::new(settings.cache_capacity)),
            limiter: Arc::new(RateLimiter::new(
                settings.rate_limit_window,
                settings.rate_limit_max_requests,
            )),
            completion,
            settings: Arc::new(settings),
        }
    }
}
