use crate::backend::{GenerationOptions, TextGenerationBackend};
use crate::error::{BackendError, Result, SchedulerError};
use crate::prompt::PromptTemplate;
use crate::rate_gate::RateGate;
use crate::retry::RetryPolicy;
use codedoc_cache::{ErrorKind, Fingerprint, FingerprintCache, GenerationResult};
use codedoc_chunker::{Chunk, ChunkId};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub const MAX_CONCURRENCY: usize = 64;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Upper bound on concurrent backend calls (and worker tasks)
    pub concurrency_ceiling: usize,
    /// Minimum spacing between dispatches; zero disables the gate
    pub rate_limit_interval: Duration,
    pub per_attempt_timeout: Duration,
    pub retry: RetryPolicy,
    pub options: GenerationOptions,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            concurrency_ceiling: 4,
            rate_limit_interval: Duration::ZERO,
            per_attempt_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            options: GenerationOptions::default(),
        }
    }
}

impl SchedulerSettings {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency_ceiling) {
            return Err(SchedulerError::InvalidSettings(format!(
                "concurrency ceiling must be within 1..={MAX_CONCURRENCY}, got {}",
                self.concurrency_ceiling
            )));
        }
        if self.per_attempt_timeout.is_zero() {
            return Err(SchedulerError::InvalidSettings(
                "per-attempt timeout must be positive".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(SchedulerError::InvalidSettings(
                "retry budget must allow at least one attempt".to_string(),
            ));
        }
        if self.retry.base_delay > self.retry.max_delay {
            return Err(SchedulerError::InvalidSettings(format!(
                "backoff base {:?} exceeds cap {:?}",
                self.retry.base_delay, self.retry.max_delay
            )));
        }
        Ok(())
    }
}

/// Lifecycle of one generation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkState {
    Pending,
    InFlight,
    Retrying,
    Succeeded,
    Failed,
}

impl ChunkState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InFlight)
                | (Self::Pending, Self::Failed)
                | (Self::InFlight, Self::Succeeded)
                | (Self::InFlight, Self::Retrying)
                | (Self::InFlight, Self::Failed)
                | (Self::Retrying, Self::InFlight)
                | (Self::Retrying, Self::Failed)
        )
    }

    pub fn transition(self, next: Self) -> Result<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SchedulerError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

/// Published on every state change of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationEvent {
    pub chunk_id: ChunkId,
    pub fingerprint: Fingerprint,
    pub from: ChunkState,
    pub to: ChunkState,
    pub attempt: u32,
    pub error_kind: Option<ErrorKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulerSnapshot {
    pub limit: usize,
    pub in_flight: usize,
    pub peak_in_flight: usize,
    /// Backend calls started so far, retries included
    pub dispatched: usize,
}

#[derive(Default)]
struct Gauge {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    dispatched: AtomicUsize,
}

struct InFlightGuard<'a> {
    gauge: &'a Gauge,
}

impl Gauge {
    fn begin(&self) -> InFlightGuard<'_> {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
        InFlightGuard { gauge: self }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.gauge.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// One backend job: a distinct fingerprint and every chunk that shares it
#[derive(Clone)]
struct Job {
    fingerprint: Fingerprint,
    chunk: Arc<Chunk>,
    members: Vec<ChunkId>,
}

type Completed = Arc<Mutex<Vec<(Vec<ChunkId>, GenerationResult)>>>;

/// Job each worker is running, keyed by worker index
type Active = Arc<Mutex<HashMap<usize, Job>>>;

struct SchedulerInner {
    backend: Arc<dyn TextGenerationBackend>,
    template: PromptTemplate,
    cache: FingerprintCache,
    settings: SchedulerSettings,
    rate_gate: RateGate,
    events: broadcast::Sender<GenerationEvent>,
    gauge: Gauge,
}

/// Drives chunks through the backend with bounded concurrency.
///
/// Owns its rate gate and gauge; create one per run.
#[derive(Clone)]
pub struct GenerationScheduler {
    inner: Arc<SchedulerInner>,
}

impl GenerationScheduler {
    pub fn new(
        backend: Arc<dyn TextGenerationBackend>,
        template: PromptTemplate,
        cache: FingerprintCache,
        settings: SchedulerSettings,
    ) -> Result<Self> {
        settings.validate()?;
        if template.version.trim().is_empty() {
            return Err(SchedulerError::InvalidSettings(
                "prompt template version must not be empty".to_string(),
            ));
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            inner: Arc::new(SchedulerInner {
                rate_gate: RateGate::new(settings.rate_limit_interval),
                backend,
                template,
                cache,
                settings,
                events,
                gauge: Gauge::default(),
            }),
        })
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<GenerationEvent> {
        self.inner.events.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> SchedulerSnapshot {
        let gauge = &self.inner.gauge;
        SchedulerSnapshot {
            limit: self.inner.settings.concurrency_ceiling,
            in_flight: gauge.in_flight.load(Ordering::Relaxed),
            peak_in_flight: gauge.peak.load(Ordering::Relaxed),
            dispatched: gauge.dispatched.load(Ordering::Relaxed),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &SchedulerSettings {
        &self.inner.settings
    }

    #[must_use]
    pub fn cache(&self) -> &FingerprintCache {
        &self.inner.cache
    }

    #[must_use]
    pub fn fingerprint(&self, chunk: &Chunk) -> Fingerprint {
        Fingerprint::compute(&self.inner.template.version, &chunk.text)
    }

    /// Produce exactly one result per distinct chunk id.
    ///
    /// Cache hits come back `Skipped`, blank chunks are resolved without a
    /// backend call, and chunks sharing a fingerprint are generated once.
    /// After `cancel` fires, every unfinished chunk gets a `Failed` result
    /// with [`ErrorKind::Cancelled`].
    pub async fn generate(
        &self,
        chunks: &[Arc<Chunk>],
        cancel: &CancellationToken,
    ) -> HashMap<ChunkId, GenerationResult> {
        let mut results = HashMap::with_capacity(chunks.len());
        let mut queue = VecDeque::new();

        for job in self.plan(chunks) {
            if job.chunk.text.trim().is_empty() {
                let result = GenerationResult::empty(job.fingerprint.clone());
                fan_out(&mut results, job.members, result);
                continue;
            }
            if let Some(hit) = self.inner.cache.lookup(&job.fingerprint).await {
                log::debug!("cache hit for {}", job.chunk.id);
                fan_out(&mut results, job.members, hit.into_cache_hit());
                continue;
            }
            queue.push_back(job);
        }

        let workers = self.inner.settings.concurrency_ceiling.min(queue.len());
        let queue = Arc::new(Mutex::new(queue));
        let completed: Completed = Arc::new(Mutex::new(Vec::new()));
        let active: Active = Arc::new(Mutex::new(HashMap::new()));

        let mut set = JoinSet::new();
        for worker in 0..workers {
            let inner = self.inner.clone();
            let queue = queue.clone();
            let completed = completed.clone();
            let active = active.clone();
            let cancel = cancel.clone();
            set.spawn(async move { inner.work(worker, &queue, &completed, &active, &cancel).await });
        }
        while let Some(joined) = set.join_next().await {
            if let Err(err) = joined {
                log::error!("generation worker stopped unexpectedly: {err}");
            }
        }

        let finished = std::mem::take(&mut *completed.lock().unwrap_or_else(PoisonError::into_inner));
        for (members, result) in finished {
            fan_out(&mut results, members, result);
        }

        // Jobs whose worker died mid-call
        let stranded: Vec<Job> = active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, job)| job)
            .collect();
        for job in stranded {
            log::warn!("{}: worker stopped during generation", job.chunk.id);
            let mut state = ChunkState::InFlight;
            self.inner.advance(
                &job,
                &mut state,
                ChunkState::Failed,
                1,
                Some(ErrorKind::BackendError),
            );
            let result = GenerationResult::failed(job.fingerprint.clone(), ErrorKind::BackendError, 1);
            fan_out(&mut results, job.members, result);
        }

        let leftover: Vec<Job> = queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        let kind = if cancel.is_cancelled() {
            ErrorKind::Cancelled
        } else {
            ErrorKind::BackendError
        };
        for job in leftover {
            let mut state = ChunkState::Pending;
            self.inner
                .advance(&job, &mut state, ChunkState::Failed, 0, Some(kind));
            let result = GenerationResult::failed(job.fingerprint.clone(), kind, 0);
            fan_out(&mut results, job.members, result);
        }

        results
    }

    /// Drop repeated chunk ids and group the rest by fingerprint, in input order
    fn plan(&self, chunks: &[Arc<Chunk>]) -> Vec<Job> {
        let mut seen = HashSet::new();
        let mut by_fingerprint: HashMap<Fingerprint, usize> = HashMap::new();
        let mut jobs: Vec<Job> = Vec::new();

        for chunk in chunks {
            if !seen.insert(chunk.id.clone()) {
                continue;
            }
            let fingerprint = self.fingerprint(chunk);
            if let Some(&idx) = by_fingerprint.get(&fingerprint) {
                jobs[idx].members.push(chunk.id.clone());
                continue;
            }
            by_fingerprint.insert(fingerprint.clone(), jobs.len());
            jobs.push(Job {
                fingerprint,
                chunk: chunk.clone(),
                members: vec![chunk.id.clone()],
            });
        }
        jobs
    }
}

fn fan_out(
    results: &mut HashMap<ChunkId, GenerationResult>,
    members: Vec<ChunkId>,
    result: GenerationResult,
) {
    for id in members {
        results.insert(id, result.clone());
    }
}

impl SchedulerInner {
    async fn work(
        &self,
        worker: usize,
        queue: &Mutex<VecDeque<Job>>,
        completed: &Completed,
        active: &Active,
        cancel: &CancellationToken,
    ) {
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let next = queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
            let Some(job) = next else {
                break;
            };
            active
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(worker, job.clone());
            let result = self.run_job(&job, cancel).await;
            active
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&worker);
            completed
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((job.members, result));
        }
    }

    async fn run_job(&self, job: &Job, cancel: &CancellationToken) -> GenerationResult {
        let settings = &self.settings;
        let prompt = self.template.render(&job.chunk);
        let mut state = ChunkState::Pending;
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            tokio::select! {
                biased;
                () = cancel.cancelled() => return self.cancelled(job, &mut state, attempt - 1),
                () = self.rate_gate.wait() => {}
            }

            self.advance(job, &mut state, ChunkState::InFlight, attempt, None);
            let outcome = {
                let _in_flight = self.gauge.begin();
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    outcome = tokio::time::timeout(
                        settings.per_attempt_timeout,
                        self.backend.complete(&prompt, &settings.options),
                    ) => Some(outcome),
                }
            };

            let error = match outcome {
                None => return self.cancelled(job, &mut state, attempt),
                Some(Ok(Ok(text))) => {
                    self.advance(job, &mut state, ChunkState::Succeeded, attempt, None);
                    let result = GenerationResult::success(job.fingerprint.clone(), text, attempt);
                    self.cache.record(&job.fingerprint, &result).await;
                    return result;
                }
                Some(Ok(Err(err))) => err,
                Some(Err(_elapsed)) => BackendError::Timeout,
            };

            let kind = error.kind();
            if settings.retry.should_retry(kind, attempt) {
                let delay = settings.retry.delay(attempt, error.retry_after());
                log::debug!(
                    "{}: attempt {attempt}/{} failed ({error}); retrying in {delay:?}",
                    job.chunk.id,
                    settings.retry.max_attempts
                );
                self.advance(job, &mut state, ChunkState::Retrying, attempt, Some(kind));
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return self.cancelled(job, &mut state, attempt),
                    () = tokio::time::sleep(delay) => {}
                }
                continue;
            }

            let final_kind = if kind.is_retryable() {
                ErrorKind::RetriesExhausted
            } else {
                kind
            };
            log::warn!(
                "{}: giving up after {attempt} attempt(s): {error}",
                job.chunk.id
            );
            self.advance(job, &mut state, ChunkState::Failed, attempt, Some(final_kind));
            let result = GenerationResult::failed(job.fingerprint.clone(), final_kind, attempt);
            self.cache.record(&job.fingerprint, &result).await;
            return result;
        }
    }

    /// Abandoned work is reported but never persisted
    fn cancelled(&self, job: &Job, state: &mut ChunkState, attempts: u32) -> GenerationResult {
        self.advance(job, state, ChunkState::Failed, attempts, Some(ErrorKind::Cancelled));
        GenerationResult::failed(job.fingerprint.clone(), ErrorKind::Cancelled, attempts)
    }

    fn advance(
        &self,
        job: &Job,
        state: &mut ChunkState,
        to: ChunkState,
        attempt: u32,
        error_kind: Option<ErrorKind>,
    ) {
        match state.transition(to) {
            Ok(next) => {
                let from = *state;
                *state = next;
                let _ = self.events.send(GenerationEvent {
                    chunk_id: job.chunk.id.clone(),
                    fingerprint: job.fingerprint.clone(),
                    from,
                    to,
                    attempt,
                    error_kind,
                });
            }
            Err(err) => log::error!("{}: {err}", job.chunk.id),
        }
    }
}
