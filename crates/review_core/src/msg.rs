use crate::{RawRecord, StopReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Page fetched and extracted; `records` may be empty.
    PageLoaded { page: u32, records: Vec<RawRecord> },
    /// The source signalled there is no such page (404, or a redirect away from it).
    ListingEnded { page: u32, reason: StopReason },
    /// The fetcher gave up on this page after exhausting its retries.
    PageFailed { page: u32, reason: String },
    /// External stop (interrupt, wall-clock budget), honored between pages.
    StopRequested { reason: StopReason },
}
