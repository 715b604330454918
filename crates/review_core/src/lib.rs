//! Review core: pure data model, normalization, pagination state machine and
//! the filter/sort stage. Nothing in here performs IO.
mod effect;
mod filter;
mod msg;
mod normalize;
mod record;
mod review;
mod state;
mod update;

pub use effect::Effect;
pub use filter::{
    apply, ConfigurationError, DateWindow, LanguageFilter, ReviewFilters, SortKey, SortOrder,
    SortSpec,
};
pub use msg::Msg;
pub use normalize::{normalize, parse_source_date, NormalizationError};
pub use record::{RawField, RawRecord};
pub use review::{DedupKey, Rating, RatingOutOfRange, Review};
pub use state::{CrawlState, PageState, ReviewSet, StopReason, DEFAULT_MAX_PAGES};
pub use update::update;
