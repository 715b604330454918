use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use review_core::{
    update, ConfigurationError, CrawlState, Effect, Msg, RawRecord, ReviewFilters, ReviewSet,
    StopReason, DEFAULT_MAX_PAGES,
};
use review_logging::{review_debug, review_info, review_warn};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::decode::decode_page;
use crate::extract::Extractor;
use crate::fetch::{Fetcher, ProgressSink, DEFAULT_USER_AGENT};
use crate::listing::{listing_url, page_of, validate_domain, DEFAULT_BASE_URL};
use crate::robots::{fetch_rules, request_target};
use crate::{FailureKind, FetchError, FetchOutput, HarvestEvent, PageProgress, Stage};

#[derive(Debug, Clone)]
pub struct HarvestSettings {
    pub base_url: String,
    pub max_pages: u32,
    /// Pause before every page after the first.
    pub page_delay: Duration,
    /// Attempts per page, first try included.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles for each further one.
    pub retry_backoff: Duration,
    pub max_runtime: Option<Duration>,
    pub respect_robots: bool,
    /// Agent name robots.txt groups are matched against.
    pub user_agent: String,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            page_delay: Duration::from_millis(1000),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(1000),
            max_runtime: None,
            respect_robots: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// What to collect: one business and the filters pushed to the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestRequest {
    pub domain: String,
    pub filters: ReviewFilters,
}

#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("robots.txt disallows {0}")]
    Disallowed(String),
}

enum PageOutcome {
    Records(Vec<RawRecord>),
    Ended(StopReason),
}

/// Drives the pagination state machine against a real [`Fetcher`].
pub struct Harvester {
    fetcher: Arc<dyn Fetcher>,
    extractor: Box<dyn Extractor>,
    settings: HarvestSettings,
}

impl Harvester {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Box<dyn Extractor>,
        settings: HarvestSettings,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            settings,
        }
    }

    pub fn settings(&self) -> &HarvestSettings {
        &self.settings
    }

    /// Collect every review of `request.domain`, one page at a time.
    ///
    /// Fetch exhaustion, cancellation and the run time budget all return the
    /// reviews gathered so far with `complete == false`. Only bad settings and
    /// a robots.txt refusal fail the run, and both happen before page 1.
    pub async fn run(
        &self,
        request: &HarvestRequest,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Result<ReviewSet, HarvestError> {
        if self.settings.max_pages == 0 {
            return Err(
                ConfigurationError::InvalidSetting("max pages must be at least 1".into()).into(),
            );
        }
        if self.settings.max_attempts == 0 {
            return Err(ConfigurationError::InvalidSetting(
                "retries must allow at least 1 attempt".into(),
            )
            .into());
        }
        let domain = validate_domain(&request.domain)?;
        let first = listing_url(&self.settings.base_url, &domain, 1, &request.filters)?;
        let started = Instant::now();
        if self.settings.respect_robots {
            self.check_robots(&first).await?;
            // The robots.txt request counts against the same host; a
            // cancellation here is picked up before page 1.
            pause(self.settings.page_delay, cancel).await;
        }
        review_info!("Collecting reviews for {} from {}", domain, first);

        let (mut state, effects) = CrawlState::start(self.settings.max_pages);
        let mut pending: VecDeque<Effect> = effects.into();

        while let Some(effect) = pending.pop_front() {
            match effect {
                Effect::FetchPage { page } => {
                    let msg = match self.stop_signal(cancel, started) {
                        Some(reason) => Msg::StopRequested { reason },
                        None => {
                            self.next_page(&domain, page, &request.filters, cancel, sink)
                                .await?
                        }
                    };
                    let (next, effects) = update(state, msg);
                    state = next;
                    pending.extend(effects);
                }
                Effect::Finished { complete } => {
                    sink.emit(HarvestEvent::Finished {
                        reviews: state.reviews().len(),
                        pages: state.pages_fetched(),
                        complete,
                    });
                }
            }
        }

        Ok(state.into_review_set())
    }

    async fn check_robots(&self, listing: &Url) -> Result<(), HarvestError> {
        let rules = fetch_rules(self.fetcher.as_ref(), listing, &self.settings.user_agent).await;
        let target = request_target(listing);
        if rules.is_allowed(&target) {
            Ok(())
        } else {
            Err(HarvestError::Disallowed(target))
        }
    }

    fn stop_signal(&self, cancel: &CancellationToken, started: Instant) -> Option<StopReason> {
        if cancel.is_cancelled() {
            return Some(StopReason::Cancelled);
        }
        match self.settings.max_runtime {
            Some(budget) if started.elapsed() >= budget => Some(StopReason::DeadlineReached),
            _ => None,
        }
    }

    /// Politeness delay, then the page with retries, turned into a controller message.
    async fn next_page(
        &self,
        domain: &str,
        page: u32,
        filters: &ReviewFilters,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Result<Msg, HarvestError> {
        let url = listing_url(&self.settings.base_url, domain, page, filters)?;
        if page > 1 && !pause(self.settings.page_delay, cancel).await {
            return Ok(Msg::StopRequested {
                reason: StopReason::Cancelled,
            });
        }

        let mut attempt = 1;
        loop {
            let stage = if attempt == 1 {
                Stage::Requesting
            } else {
                Stage::Retrying
            };
            sink.emit(progress(page, stage, attempt, None));

            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    return Ok(Msg::StopRequested { reason: StopReason::Cancelled });
                }
                outcome = self.load_page(&url, page, attempt, sink) => outcome,
            };

            match outcome {
                Ok(PageOutcome::Records(records)) => {
                    sink.emit(progress(page, Stage::Done, attempt, Some(records.len())));
                    return Ok(Msg::PageLoaded { page, records });
                }
                Ok(PageOutcome::Ended(reason)) => {
                    return Ok(Msg::ListingEnded { page, reason });
                }
                Err(err) if err.kind.is_retryable() && attempt < self.settings.max_attempts => {
                    review_warn!(
                        "Page {} attempt {}/{} failed: {}",
                        page,
                        attempt,
                        self.settings.max_attempts,
                        err
                    );
                    if !pause(self.backoff(attempt), cancel).await {
                        return Ok(Msg::StopRequested {
                            reason: StopReason::Cancelled,
                        });
                    }
                    attempt += 1;
                }
                Err(err) => {
                    review_warn!("Page {} failed after {} attempts: {}", page, attempt, err);
                    return Ok(Msg::PageFailed {
                        page,
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    async fn load_page(
        &self,
        url: &Url,
        page: u32,
        attempt: u32,
        sink: &dyn ProgressSink,
    ) -> Result<PageOutcome, FetchError> {
        let output = match self.fetcher.fetch(url.as_str()).await {
            Ok(output) => output,
            Err(err) if err.kind == FailureKind::HttpStatus(404) => {
                return Ok(PageOutcome::Ended(StopReason::NotFound));
            }
            Err(err) => return Err(err),
        };
        if redirected_elsewhere(&output, page) {
            review_debug!(
                "Page {} redirected to {}",
                page,
                output.metadata.final_url
            );
            return Ok(PageOutcome::Ended(StopReason::Redirected));
        }

        sink.emit(progress(page, Stage::Extracting, attempt, None));
        let decoded = decode_page(&output)?;
        let records = self.extractor.extract(&decoded.html)?;
        Ok(PageOutcome::Records(records))
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.settings.retry_backoff.saturating_mul(factor)
    }
}

/// The source answers a page past the end by redirecting to an earlier one.
fn redirected_elsewhere(output: &FetchOutput, page: u32) -> bool {
    if output.metadata.final_url == output.metadata.original_url {
        return false;
    }
    Url::parse(&output.metadata.final_url).is_ok_and(|url| page_of(&url) != page)
}

/// Sleep unless cancelled first. Returns false on cancellation.
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

fn progress(page: u32, stage: Stage, attempt: u32, records: Option<usize>) -> HarvestEvent {
    HarvestEvent::Progress(PageProgress {
        page,
        stage,
        attempt,
        records,
    })
}
