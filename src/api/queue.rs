use backon::{ExponentialBuilder, Retryable};
use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

use super::error::ApiError;
use super::transport::{ApiRequest, ApiResponse, Transport};
use crate::config::ApiConfig;

/// Pacing rules for the request queue.
#[derive(Debug, Clone)]
pub struct QueuePolicy {
    /// No request starts sooner than this after the previous start.
    pub min_interval: Duration,
    /// Extra pause after every successful request.
    pub cooldown: Duration,
    /// Delay before the first retry of a 429; doubles on each further 429.
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: usize,
}

impl From<&ApiConfig> for QueuePolicy {
    fn from(api: &ApiConfig) -> Self {
        Self {
            min_interval: Duration::from_millis(api.min_interval_ms),
            cooldown: Duration::from_millis(api.cooldown_ms),
            base_delay: Duration::from_millis(api.base_delay_ms),
            max_delay: Duration::from_millis(api.max_delay_ms),
            max_retries: api.max_retries,
        }
    }
}

struct QueuedRequest {
    request: ApiRequest,
    reply: oneshot::Sender<Result<ApiResponse, ApiError>>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueuedRequest>,
    draining: bool,
    last_start: Option<Instant>,
}

struct Shared {
    transport: Arc<dyn Transport>,
    policy: QueuePolicy,
    state: Mutex<QueueState>,
}

/// Serialises backend calls through a single worker.
///
/// Requests leave in enqueue order. The worker exits when the queue is empty
/// and is spawned again by the next `enqueue`. A request that keeps failing
/// only costs its own retry budget; the rest of the queue carries on.
#[derive(Clone)]
pub struct RequestQueue {
    shared: Arc<Shared>,
}

impl RequestQueue {
    pub fn new(transport: Arc<dyn Transport>, policy: QueuePolicy) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                policy,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    /// Queue a request and wait for it to settle.
    pub async fn enqueue(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let (reply, settled) = oneshot::channel();
        let spawn_worker = {
            let mut state = self.shared.state();
            state.pending.push_back(QueuedRequest { request, reply });
            !std::mem::replace(&mut state.draining, true)
        };
        if spawn_worker {
            debug!("request queue worker starting");
            tokio::spawn(drain(Arc::clone(&self.shared)));
        }
        settled.await.map_err(|_| ApiError::QueueClosed)?
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.shared.state().pending.len()
    }

    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        !self.shared.state().draining
    }
}

async fn drain(shared: Arc<Shared>) {
    loop {
        let next = {
            let mut state = shared.state();
            match state.pending.pop_front() {
                Some(next) => next,
                None => {
                    state.draining = false;
                    debug!("request queue drained");
                    return;
                }
            }
        };

        let result = shared.dispatch(&next.request).await;
        let succeeded = result.is_ok();
        // The caller may have gone away; nothing to do then.
        let _ = next.reply.send(result);

        if succeeded && !shared.policy.cooldown.is_zero() {
            tokio::time::sleep(shared.policy.cooldown).await;
        }
    }
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.policy.base_delay)
            .with_max_delay(self.policy.max_delay)
            .with_factor(2.0)
            .with_max_times(self.policy.max_retries);

        let response = (|| self.attempt(request))
            .retry(backoff)
            .when(ApiError::is_rate_limited)
            .notify(|e: &ApiError, dur: Duration| {
                warn!(
                    "{} {} {}, retrying after {:.2}s",
                    request.method,
                    request.path,
                    e,
                    dur.as_secs_f64()
                )
            })
            .await?;

        if response.is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_status(response.status, response.body))
        }
    }

    /// One send, spaced from the previous start. A 429 becomes an error so
    /// the retry policy can see it.
    async fn attempt(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.wait_for_slot().await;
        let response = self.transport.send(request).await?;
        if response.status == 429 {
            return Err(ApiError::RateLimited);
        }
        Ok(response)
    }

    async fn wait_for_slot(&self) {
        let wait = {
            let state = self.state();
            state.last_start.map(|last| {
                (last + self.policy.min_interval).saturating_duration_since(Instant::now())
            })
        };
        if let Some(wait) = wait.filter(|w| !w.is_zero()) {
            tokio::time::sleep(wait).await;
        }
        self.state().last_start = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Answers from a per-path script of status codes (200 once exhausted)
    /// and records when each call started.
    #[derive(Default)]
    struct ScriptedTransport {
        script: Mutex<HashMap<String, VecDeque<u16>>>,
        calls: Mutex<Vec<(String, Instant)>>,
    }

    impl ScriptedTransport {
        fn with(path: &str, statuses: &[u16]) -> Self {
            let t = Self::default();
            t.script
                .lock()
                .unwrap()
                .insert(path.to_string(), statuses.iter().copied().collect());
            t
        }

        fn calls(&self) -> Vec<(String, Instant)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push((request.path.clone(), Instant::now()));
            let status = self
                .script
                .lock()
                .unwrap()
                .get_mut(&request.path)
                .and_then(|s| s.pop_front())
                .unwrap_or(200);
            Ok(ApiResponse {
                status,
                body: format!("{{\"path\":\"{}\"}}", request.path),
            })
        }
    }

    fn policy() -> QueuePolicy {
        QueuePolicy {
            min_interval: Duration::from_millis(500),
            cooldown: Duration::from_millis(50),
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(60),
            max_retries: 3,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dispatches_in_enqueue_order_with_spacing() {
        let transport = Arc::new(ScriptedTransport::default());
        let queue = RequestQueue::new(transport.clone(), policy());

        let (a, b, c) = tokio::join!(
            queue.enqueue(ApiRequest::get("/a")),
            queue.enqueue(ApiRequest::get("/b")),
            queue.enqueue(ApiRequest::get("/c")),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());

        let calls = transport.calls();
        let order: Vec<_> = calls.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(order, ["/a", "/b", "/c"]);
        for pair in calls.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= Duration::from_millis(500));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn backs_off_exponentially_on_rate_limit_then_rejects() {
        let transport = Arc::new(ScriptedTransport::with("/busy", &[429, 429, 429, 429, 429]));
        let queue = RequestQueue::new(transport.clone(), policy());

        let result = queue.enqueue(ApiRequest::get("/busy")).await;
        assert_eq!(result, Err(ApiError::RateLimited));

        let calls = transport.calls();
        assert_eq!(calls.len(), 1 + policy().max_retries);
        let gaps: Vec<Duration> = calls.windows(2).map(|w| w[1].1 - w[0].1).collect();
        assert!(gaps[0] >= Duration::from_millis(1000));
        for pair in gaps.windows(2) {
            assert!(pair[1] >= pair[0] * 2, "gaps {:?}", gaps);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_when_rate_limit_clears() {
        let transport = Arc::new(ScriptedTransport::with("/flaky", &[429, 429]));
        let queue = RequestQueue::new(transport.clone(), policy());

        let response = queue.enqueue(ApiRequest::get("/flaky")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn other_failures_settle_without_retry_and_do_not_block() {
        let transport = Arc::new(ScriptedTransport::with("/broken", &[500]));
        let queue = RequestQueue::new(transport.clone(), policy());

        let (broken, fine) = tokio::join!(
            queue.enqueue(ApiRequest::get("/broken")),
            queue.enqueue(ApiRequest::get("/fine")),
        );
        assert!(matches!(broken, Err(ApiError::Http { status: 500, .. })));
        assert!(fine.is_ok());
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn worker_stops_when_empty_and_restarts_on_demand() {
        let transport = Arc::new(ScriptedTransport::default());
        let queue = RequestQueue::new(transport.clone(), policy());

        queue.enqueue(ApiRequest::get("/one")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(queue.is_idle());
        assert_eq!(queue.len(), 0);

        queue.enqueue(ApiRequest::get("/two")).await.unwrap();
        assert_eq!(transport.calls().len(), 2);
    }
}
