//! Review harvester engine: fetching, extraction, the page loop and export.
mod decode;
mod export;
mod extract;
mod fetch;
mod keywords;
mod listing;
mod persist;
mod pipeline;
mod robots;
mod types;

pub use decode::{decode_html, decode_page, DecodeError, DecodedPage};
pub use export::{
    export_keywords, export_reviews, keywords_to_csv, reviews_to_csv, reviews_to_json,
    ExportError, ExportFormat, ExportSummary, CSV_COLUMNS,
};
pub use extract::{
    parse_payload, CardExtractor, ExtractError, Extractor, PayloadExtractor, ReviewPageExtractor,
};
pub use fetch::{
    FetchSettings, Fetcher, LogProgressSink, ProgressSink, ReqwestFetcher, DEFAULT_USER_AGENT,
};
pub use keywords::{keyword_report, KeywordStats, DEFAULT_MIN_KEYWORD_LEN};
pub use listing::{listing_url, page_of, validate_domain, DEFAULT_BASE_URL};
pub use persist::{ensure_output_dir, output_filename, AtomicFileWriter, PersistError};
pub use pipeline::{HarvestError, HarvestRequest, HarvestSettings, Harvester};
pub use robots::{fetch_rules, request_target, robots_url, RobotsRules};
pub use types::{
    FailureKind, FetchError, FetchMetadata, FetchOutput, HarvestEvent, PageProgress, Stage,
};
