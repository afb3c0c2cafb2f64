use crate::cache::TtlCache;
use crate::data_structures::AnalysisResult;
use crate::error::JobError;
use crate::poller::JobPoller;
use crate::ticker::normalize_ticker;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

pub type SharedAnalysisCache = Arc<Mutex<TtlCache<String, AnalysisResult>>>;

/// Read-through front for the job poller, keyed by normalized ticker
pub struct AnalysisService {
    poller: JobPoller,
    cache: SharedAnalysisCache,
}

impl AnalysisService {
    pub fn new(poller: JobPoller, cache_ttl: Duration) -> Self {
        Self {
            poller,
            cache: Arc::new(Mutex::new(TtlCache::new(cache_ttl))),
        }
    }

    pub fn cache(&self) -> SharedAnalysisCache {
        self.cache.clone()
    }

    #[instrument(skip(self))]
    pub async fn analyze(&self, symbol: &str) -> Result<AnalysisResult, JobError> {
        let key = normalize_ticker(symbol);

        {
            let mut cache = self.cache.lock().await;
            if let Some(cached) = cache.get(&key) {
                info!(symbol = %key, "Serving cached analysis");
                return Ok(cached);
            }
            cache.purge_expired();
        }

        // The lock is released while polling; identical concurrent misses each hit the crew.
        match self.poller.run(&key).await {
            Ok(result) => {
                self.cache.lock().await.insert(key, result.clone());
                Ok(result)
            }
            Err(error) => {
                warn!(symbol = %key, %error, "Analysis failed");
                Err(error)
            }
        }
    }
}
