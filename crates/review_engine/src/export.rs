use std::path::{Path, PathBuf};
use std::str::FromStr;

use review_core::{ConfigurationError, Review};

use crate::keywords::KeywordStats;
use crate::persist::{output_filename, AtomicFileWriter, PersistError};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Column order of the review CSV. Absent values become empty cells.
pub const CSV_COLUMNS: [&str; 14] = [
    "review_id",
    "reviewer_name",
    "reviewer_country",
    "title",
    "content",
    "rating",
    "likes",
    "language",
    "reviewer_review_count",
    "published_date",
    "experience_date",
    "verified",
    "has_reply",
    "reply_message",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
    Both,
}

impl ExportFormat {
    fn csv(self) -> bool {
        matches!(self, ExportFormat::Csv | ExportFormat::Both)
    }

    fn json(self) -> bool {
        matches!(self, ExportFormat::Json | ExportFormat::Both)
    }
}

impl FromStr for ExportFormat {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "both" => Ok(ExportFormat::Both),
            _ => Err(ConfigurationError::UnknownOutputFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub review_count: usize,
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Semicolon-delimited, BOM-prefixed CSV with a fixed header.
pub fn reviews_to_csv(reviews: &[Review]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(UTF8_BOM.to_vec());
    writer.write_record(CSV_COLUMNS)?;
    for review in reviews {
        writer.write_record(csv_row(review))?;
    }
    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

fn csv_row(review: &Review) -> [String; 14] {
    fn opt<T: ToString>(value: &Option<T>) -> String {
        value.as_ref().map(ToString::to_string).unwrap_or_default()
    }
    [
        opt(&review.review_id),
        opt(&review.reviewer_name),
        opt(&review.reviewer_country),
        opt(&review.title),
        review.content.clone(),
        review.rating.get().to_string(),
        opt(&review.likes),
        opt(&review.language),
        opt(&review.reviewer_review_count),
        opt(&review.published_date),
        opt(&review.experience_date),
        review.verified.to_string(),
        review.has_reply.to_string(),
        opt(&review.reply_message),
    ]
}

/// Pretty-printed JSON array; absent fields are left out of each object.
pub fn reviews_to_json(reviews: &[Review]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(reviews)?)
}

/// Write `reviews_<domain>.csv` and/or `reviews_<domain>.json` into `dir`.
pub fn export_reviews(
    dir: &Path,
    domain: &str,
    reviews: &[Review],
    format: ExportFormat,
) -> Result<ExportSummary, ExportError> {
    let writer = AtomicFileWriter::new(dir.to_path_buf());
    let mut paths = Vec::new();
    if format.csv() {
        let bytes = reviews_to_csv(reviews)?;
        paths.push(writer.write(&output_filename("reviews", domain, "csv"), &bytes)?);
    }
    if format.json() {
        let json = reviews_to_json(reviews)?;
        paths.push(writer.write(&output_filename("reviews", domain, "json"), json.as_bytes())?);
    }
    Ok(ExportSummary {
        review_count: reviews.len(),
        paths,
    })
}

pub fn keywords_to_csv(stats: &[KeywordStats]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["keyword", "average_rating", "count"])?;
    for entry in stats {
        writer.write_record([
            entry.keyword.clone(),
            format!("{:.2}", entry.average_rating()),
            entry.count.to_string(),
        ])?;
    }
    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

/// Write `keywords_<domain>.csv` into `dir`.
pub fn export_keywords(
    dir: &Path,
    domain: &str,
    stats: &[KeywordStats],
) -> Result<PathBuf, ExportError> {
    let bytes = keywords_to_csv(stats)?;
    let writer = AtomicFileWriter::new(dir.to_path_buf());
    Ok(writer.write(&output_filename("keywords", domain, "csv"), &bytes)?)
}
