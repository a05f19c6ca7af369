use crate::classify::{Category, classify};
use crate::error::{Result, ScanError};
use crate::extract::{Extractor, LinkMatch};
use crate::frontier::{DEFAULT_BUDGET, EnqueueOutcome, Frontier};
use crate::normalize::{derive_file_name, hostname};
use crate::request::{Label, Request};
use crate::result::{CrawlResult, FetchResult};
use crate::transport::{HttpTransport, Transport};
use crate::writer::{ArtifactWriter, ByteSink, CollisionPolicy, FsSink, OutputLayout};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;
pub type ResultCallback = Arc<dyn Fn(CrawlResult) + Send + Sync>;

pub const DEFAULT_MAX_RETRIES: usize = 3;
pub const DEFAULT_WORKERS: usize = 10;

/// Parse and validate a seed URL. The seed must be absolute http(s) with a
/// host, since the host becomes the crawl's domain scope.
pub fn parse_seed(input: &str) -> Result<Url> {
    let invalid = |reason: String| ScanError::SeedInvalid {
        input: input.to_string(),
        reason,
    };

    let mut url = Url::parse(input.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if hostname(&url).is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    // Same identity as a discovered link to this page
    url.set_fragment(None);
    Ok(url)
}

pub struct Crawler {
    transport: Arc<dyn Transport>,
    sink: Arc<dyn ByteSink>,
    layout: OutputLayout,
    budget: usize,
    max_retries: usize,
    link_match: LinkMatch,
    collision_policy: CollisionPolicy,
    progress_callback: Option<ProgressCallback>,
    result_callback: Option<ResultCallback>,
}

impl Crawler {
    /// Crawler over HTTP writing to the local filesystem.
    pub fn new(layout: OutputLayout) -> Result<Self> {
        Ok(Self::with_transport(layout, Arc::new(HttpTransport::new()?)))
    }

    pub fn with_transport(layout: OutputLayout, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            sink: Arc::new(FsSink),
            layout,
            budget: DEFAULT_BUDGET,
            max_retries: DEFAULT_MAX_RETRIES,
            link_match: LinkMatch::default(),
            collision_policy: CollisionPolicy::default(),
            progress_callback: None,
            result_callback: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ByteSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_link_match(mut self, link_match: LinkMatch) -> Self {
        self.link_match = link_match;
        self
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_result_callback(mut self, callback: ResultCallback) -> Self {
        self.result_callback = Some(callback);
        self
    }

    /// Mirror everything reachable from `seed` using `workers` concurrent
    /// workers. Only an invalid seed fails the crawl; every per-request
    /// failure is recorded in the returned results.
    pub async fn crawl(&self, seed: &str, workers: usize) -> Result<Vec<CrawlResult>> {
        let seed_url = parse_seed(seed)?;
        let scope = hostname(&seed_url).unwrap_or_default().to_string();
        let workers = workers.max(1);
        info!(
            "Starting mirror of {} with {} workers (scope: {}, budget: {})",
            seed_url, workers, scope, self.budget
        );

        let writer = ArtifactWriter::new(self.layout.clone(), self.sink.clone())
            .with_policy(self.collision_policy);
        if let Err(e) = writer.prepare().await {
            warn!("Could not prepare output directories: {}", e);
        }

        let pipeline = Arc::new(Pipeline {
            transport: self.transport.clone(),
            writer,
            extractor: Extractor::new(scope).with_link_match(self.link_match),
            max_retries: self.max_retries,
        });

        let frontier = Arc::new(Frontier::new(self.budget));
        frontier.enqueue(seed_url, Label::Html).await;

        let results: Arc<Mutex<Vec<CrawlResult>>> = Arc::new(Mutex::new(Vec::new()));
        let mut worker_handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let frontier = frontier.clone();
            let pipeline = pipeline.clone();
            let results = results.clone();
            let progress_cb = self.progress_callback.clone();
            let result_cb = self.result_callback.clone();

            let handle = tokio::spawn(async move {
                debug!("Worker {} started", worker_id);

                while let Some(request) = frontier.dequeue().await {
                    let handled = AssertUnwindSafe(async {
                        if let Some(ref callback) = progress_cb {
                            callback(worker_id, request.url.to_string());
                        }

                        let result = pipeline.process(&request, &frontier).await;

                        if let Some(ref callback) = result_cb {
                            callback(result.clone());
                        }
                        results.lock().await.push(result);
                    })
                    .catch_unwind()
                    .await;

                    // Release the slot before unwinding so the other workers
                    // can still drain the frontier and exit.
                    frontier.complete().await;
                    if let Err(panic) = handled {
                        error!("Worker {} panicked on {}", worker_id, request.url);
                        std::panic::resume_unwind(panic);
                    }
                }

                debug!("Worker {} finished", worker_id);
            });

            worker_handles.push(handle);
        }

        for outcome in futures::future::join_all(worker_handles).await {
            outcome?;
        }

        let results = std::mem::take(&mut *results.lock().await);
        let failed = results.iter().filter(|r| r.fetch_failed()).count();
        info!(
            "Mirror complete. Processed {} requests ({} failed)",
            results.len(),
            failed
        );
        Ok(results)
    }
}

/// Everything a worker needs to turn one request into a saved artifact and
/// new frontier entries.
struct Pipeline {
    transport: Arc<dyn Transport>,
    writer: ArtifactWriter,
    extractor: Extractor,
    max_retries: usize,
}

impl Pipeline {
    async fn process(&self, request: &Request, frontier: &Frontier) -> CrawlResult {
        info!("Processing {}", request.url);
        let start = Instant::now();

        let fetched = match self.fetch_with_retries(request).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!("Request failed {}: {}", request.url, e);
                let mut result = CrawlResult::with_error(request, e.to_string());
                result.response_time = start.elapsed();
                return result;
            }
        };

        let mut result = CrawlResult::new(request);
        result.response_time = start.elapsed();
        result.status_code = fetched.status;
        result.content_type = fetched.content_type.clone();
        result.content_length = fetched.payload.len();

        let category = classify(&fetched.request, fetched.content_type.as_deref());
        result.category = Some(category);
        debug!(
            "Classified {} as {} (label {}, content-type {:?})",
            request.url, category, request.label, fetched.content_type
        );

        if category.is_persisted() {
            let file_name = derive_file_name(&request.url);
            match self
                .writer
                .persist(category, &file_name, &request.url, &fetched.payload)
                .await
            {
                Ok(Some(path)) => {
                    info!("Saved {} {}", category, path.display());
                    result.saved_to = Some(path);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Not saving {}: {}", request.url, e);
                    result.error = Some(e.to_string());
                }
            }
        } else {
            debug!("Not saving {}: unrecognised resource", request.url);
        }

        if matches!(category, Category::Html | Category::Stylesheet) {
            let body = fetched.payload.as_text();
            for discovery in self.extractor.extract(category, &body, &request.url) {
                if frontier.enqueue(discovery.url, discovery.label).await == EnqueueOutcome::Accepted {
                    result.discovered += 1;
                }
            }
        }

        result
    }

    async fn fetch_with_retries(&self, request: &Request) -> Result<FetchResult> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(request).await {
                Ok(fetched) => return Ok(fetched),
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    attempt += 1;
                    debug!(
                        "Retrying {} ({}/{}): {}",
                        request.url, attempt, self.max_retries, e
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, request: &Request) -> Result<FetchResult> {
        let response = self.transport.fetch(&request.url).await?;
        if response.status >= 400 {
            return Err(ScanError::HttpStatus(response.status));
        }
        Ok(FetchResult::new(request.clone(), response))
    }
}

fn is_retryable(error: &ScanError) -> bool {
    match error {
        ScanError::Transport(_) => true,
        ScanError::HttpStatus(status) => *status >= 500,
        _ => false,
    }
}
