use review_logging::{review_debug, review_info, review_warn};

use crate::{normalize, CrawlState, Effect, Msg, PageState, RawRecord, StopReason};

/// Pure update function: applies a message to the controller and returns any effects.
pub fn update(mut state: CrawlState, msg: Msg) -> (CrawlState, Vec<Effect>) {
    let PageState::Fetching(current) = state.page else {
        review_debug!("Ignoring {:?} in state {:?}", msg, state.page);
        return (state, Vec::new());
    };

    let effects = match msg {
        Msg::PageLoaded { page, records } if page == current => {
            state.pages_fetched += 1;
            let count = records.len();
            accept_records(&mut state, page, records);
            state.page = PageState::Extracted {
                page,
                records: count,
            };
            settle(&mut state)
        }
        Msg::ListingEnded { page, reason } if page == current => {
            review_info!("Listing ended at page {}: {}", page, reason);
            finish(&mut state, PageState::Done, reason)
        }
        Msg::PageFailed { page, reason } if page == current => {
            review_warn!(
                "Page {} failed; keeping {} reviews from earlier pages: {}",
                page,
                state.reviews.len(),
                reason
            );
            state
                .warnings
                .push(format!("page {page} could not be fetched: {reason}"));
            finish(&mut state, PageState::Aborted, StopReason::FetchFailed)
        }
        Msg::StopRequested { reason } => {
            review_warn!("Stopping before page {}: {}", current, reason);
            state
                .warnings
                .push(format!("stopped before page {current}: {reason}"));
            finish(&mut state, PageState::Aborted, reason)
        }
        other => {
            review_debug!("Ignoring {:?} while fetching page {}", other, current);
            Vec::new()
        }
    };

    (state, effects)
}

fn accept_records(state: &mut CrawlState, page: u32, records: Vec<RawRecord>) {
    for (index, raw) in records.iter().enumerate() {
        match normalize(raw) {
            Ok(review) => {
                if state.seen.insert(review.dedup_key()) {
                    state.reviews.push(review);
                } else {
                    state.duplicate_records += 1;
                    review_debug!("Duplicate review on page {} (block {})", page, index);
                }
            }
            Err(err) => {
                state.dropped_records += 1;
                review_warn!("Dropping review block {} on page {}: {}", index, page, err);
            }
        }
    }
}

/// Resolve `Extracted` into the next fetch or a terminal state.
fn settle(state: &mut CrawlState) -> Vec<Effect> {
    let PageState::Extracted { page, records } = state.page else {
        return Vec::new();
    };
    review_info!(
        "Page {}: {} review blocks, {} reviews so far",
        page,
        records,
        state.reviews.len()
    );

    if records == 0 {
        finish(state, PageState::Done, StopReason::EmptyPage)
    } else if page >= state.max_pages {
        state
            .warnings
            .push(format!("stopped at the page limit ({})", state.max_pages));
        finish(state, PageState::Done, StopReason::PageLimit)
    } else {
        state.page = PageState::Fetching(page + 1);
        vec![Effect::FetchPage { page: page + 1 }]
    }
}

fn finish(state: &mut CrawlState, terminal: PageState, reason: StopReason) -> Vec<Effect> {
    state.page = terminal;
    state.stop_reason = Some(reason);
    vec![Effect::Finished {
        complete: terminal == PageState::Done,
    }]
}
