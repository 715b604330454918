use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use review_logging::review_debug;

use crate::{RawField, RawRecord, Rating, Review};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizationError {
    #[error("invalid rating {raw:?}")]
    InvalidRating { raw: String },
    #[error("missing required field {field}")]
    MissingRequiredField { field: RawField },
}

/// Turn one raw record into a typed review.
///
/// Only the rating and the content are hard requirements. Dates that do not
/// parse are left empty so a locale quirk never costs an otherwise valid record.
pub fn normalize(raw: &RawRecord) -> Result<Review, NormalizationError> {
    let rating = normalize_rating(raw)?;
    let content = raw
        .text(RawField::Content)
        .ok_or(NormalizationError::MissingRequiredField {
            field: RawField::Content,
        })?
        .to_string();

    Ok(Review {
        review_id: owned_text(raw, RawField::ReviewId),
        title: owned_text(raw, RawField::Title),
        content,
        rating,
        published_date: date_field(raw, RawField::PublishedDate),
        experience_date: date_field(raw, RawField::ExperienceDate),
        verified: raw.has(RawField::VerifiedMarker),
        has_reply: raw.has(RawField::ReplyMarker),
        language: owned_text(raw, RawField::Language),
        reviewer_name: owned_text(raw, RawField::ReviewerName),
        reviewer_country: owned_text(raw, RawField::ReviewerCountry),
        reviewer_review_count: raw.text(RawField::ReviewerReviewCount).and_then(parse_count),
        likes: raw.text(RawField::Likes).and_then(parse_count),
        reply_message: owned_text(raw, RawField::ReplyMessage),
    })
}

fn normalize_rating(raw: &RawRecord) -> Result<Rating, NormalizationError> {
    let text = raw
        .text(RawField::Rating)
        .ok_or(NormalizationError::MissingRequiredField {
            field: RawField::Rating,
        })?;
    let invalid = || NormalizationError::InvalidRating {
        raw: text.to_string(),
    };

    let value = match text.parse::<i64>() {
        Ok(v) => v,
        // Some payloads serialize integral ratings as floats ("4.0").
        Err(_) => match text.parse::<f64>() {
            Ok(f) if f.fract() == 0.0 && f.is_finite() => f as i64,
            _ => return Err(invalid()),
        },
    };

    u8::try_from(value)
        .ok()
        .and_then(Rating::new)
        .ok_or_else(invalid)
}

fn owned_text(raw: &RawRecord, field: RawField) -> Option<String> {
    raw.text(field).map(str::to_string)
}

fn date_field(raw: &RawRecord, field: RawField) -> Option<NaiveDate> {
    let text = raw.text(field)?;
    let parsed = parse_source_date(text);
    if parsed.is_none() {
        review_debug!("Unparseable {} {:?}; leaving it empty", field, text);
    }
    parsed
}

/// Parse the date shapes the source emits into a UTC calendar date.
pub fn parse_source_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

/// Leading digit run, so "12 reviews" and "1,204" style labels still count.
fn parse_count(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
