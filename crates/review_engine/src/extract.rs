use review_core::{RawField, RawRecord};
use review_logging::review_error;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::{FailureKind, FetchError};

/// Script tag carrying the page's server-rendered state.
const PAYLOAD_SCRIPT: &str = "script#__NEXT_DATA__";
/// Location of the review list inside that state.
const REVIEWS_POINTER: &str = "/props/pageProps/reviews";
/// One rendered review block.
const CARD_SELECTOR: &str = "article[data-service-review-card-paper]";
/// Present on a rendered listing even when it holds no review cards.
const LISTING_SELECTOR: &str =
    "section[data-business-unit-reviews-section], nav[aria-label=\"Pagination\"]";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("review payload is not valid JSON: {0}")]
    InvalidPayload(String),
    #[error("review payload has no review list at {0}")]
    MissingReviewList(&'static str),
    #[error("page has neither a review payload nor review cards")]
    NoReviewStructure,
}

impl From<ExtractError> for FetchError {
    fn from(err: ExtractError) -> Self {
        FetchError::new(FailureKind::Empty, err.to_string())
    }
}

pub trait Extractor: Send + Sync {
    /// Pull the raw review blocks out of one listing page.
    ///
    /// `Ok(vec![])` means the page is a valid listing with no reviews left.
    fn extract(&self, html: &str) -> Result<Vec<RawRecord>, ExtractError>;
}

/// How a field is read from a payload review object (JSON pointer relative to it).
#[derive(Debug, Clone, Copy)]
enum JsonLookup {
    /// String, number or bool, stringified.
    Scalar(&'static str),
    /// Marker set only when the value is `true`.
    Flag(&'static str),
    /// Marker set when the value exists and is not null.
    Present(&'static str),
}

const PAYLOAD_FIELDS: &[(RawField, JsonLookup)] = &[
    (RawField::ReviewId, JsonLookup::Scalar("/id")),
    (RawField::Title, JsonLookup::Scalar("/title")),
    (RawField::Content, JsonLookup::Scalar("/text")),
    (RawField::Rating, JsonLookup::Scalar("/rating")),
    (RawField::PublishedDate, JsonLookup::Scalar("/dates/publishedDate")),
    (RawField::ExperienceDate, JsonLookup::Scalar("/dates/experiencedDate")),
    (RawField::Language, JsonLookup::Scalar("/language")),
    (RawField::ReviewerName, JsonLookup::Scalar("/consumer/displayName")),
    (RawField::ReviewerCountry, JsonLookup::Scalar("/consumer/countryCode")),
    (RawField::ReviewerReviewCount, JsonLookup::Scalar("/consumer/numberOfReviews")),
    (RawField::Likes, JsonLookup::Scalar("/likes")),
    (RawField::VerifiedMarker, JsonLookup::Flag("/labels/verification/isVerified")),
    (RawField::ReplyMarker, JsonLookup::Present("/reply")),
    (RawField::ReplyMessage, JsonLookup::Scalar("/reply/message")),
];

impl JsonLookup {
    fn apply(self, field: RawField, review: &Value, record: &mut RawRecord) {
        match self {
            JsonLookup::Scalar(pointer) => {
                let value = match review.pointer(pointer) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    Some(Value::Bool(b)) => b.to_string(),
                    _ => return,
                };
                record.set(field, value);
            }
            JsonLookup::Flag(pointer) => {
                if review.pointer(pointer).and_then(Value::as_bool) == Some(true) {
                    record.mark(field);
                }
            }
            JsonLookup::Present(pointer) => {
                if review.pointer(pointer).is_some_and(|v| !v.is_null()) {
                    record.mark(field);
                }
            }
        }
    }
}

/// Reads reviews from the JSON state embedded in the page.
#[derive(Debug, Clone)]
pub struct PayloadExtractor {
    script: Option<Selector>,
}

impl PayloadExtractor {
    pub fn new() -> Self {
        Self {
            script: compile(PAYLOAD_SCRIPT),
        }
    }

    /// `None` when the page carries no payload script at all.
    fn records(&self, doc: &Html) -> Option<Result<Vec<RawRecord>, ExtractError>> {
        let script = doc.select(self.script.as_ref()?).next()?;
        let json: String = script.text().collect();
        Some(parse_payload(&json))
    }
}

impl Default for PayloadExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for PayloadExtractor {
    fn extract(&self, html: &str) -> Result<Vec<RawRecord>, ExtractError> {
        let doc = Html::parse_document(html);
        self.records(&doc)
            .unwrap_or(Err(ExtractError::NoReviewStructure))
    }
}

/// Parse the embedded page state and read every review object in it.
pub fn parse_payload(json: &str) -> Result<Vec<RawRecord>, ExtractError> {
    let payload: Value =
        serde_json::from_str(json).map_err(|err| ExtractError::InvalidPayload(err.to_string()))?;
    let reviews = payload
        .pointer(REVIEWS_POINTER)
        .and_then(Value::as_array)
        .ok_or(ExtractError::MissingReviewList(REVIEWS_POINTER))?;

    Ok(reviews
        .iter()
        .map(|review| {
            let mut record = RawRecord::new();
            for (field, lookup) in PAYLOAD_FIELDS {
                lookup.apply(*field, review, &mut record);
            }
            record
        })
        .collect())
}

/// How a field is read from a rendered review card.
#[derive(Debug, Clone, Copy)]
enum CardLookup {
    /// Text content of the first matching descendant.
    Text(&'static str),
    /// Attribute of the first matching descendant.
    Attr(&'static str, &'static str),
    /// Attribute of the card element itself.
    OwnAttr(&'static str),
    /// Marker set when a matching descendant exists.
    Marker(&'static str),
}

const CARD_FIELDS: &[(RawField, CardLookup)] = &[
    (RawField::Title, CardLookup::Text("[data-service-review-title-typography]")),
    (RawField::Content, CardLookup::Text("[data-service-review-text-typography]")),
    (
        RawField::Rating,
        CardLookup::Attr("[data-service-review-rating]", "data-service-review-rating"),
    ),
    (RawField::PublishedDate, CardLookup::Attr("time[datetime]", "datetime")),
    (RawField::Language, CardLookup::OwnAttr("lang")),
    (RawField::ReviewerName, CardLookup::Text("[data-consumer-name-typography]")),
    (RawField::ReviewerCountry, CardLookup::Text("[data-consumer-country-typography]")),
    (
        RawField::ReviewerReviewCount,
        CardLookup::Text("[data-consumer-reviews-count-typography]"),
    ),
    (RawField::VerifiedMarker, CardLookup::Marker("[data-review-label-verified]")),
    (
        RawField::ReplyMarker,
        CardLookup::Marker("[data-service-review-business-reply-text-typography]"),
    ),
    (
        RawField::ReplyMessage,
        CardLookup::Text("[data-service-review-business-reply-text-typography]"),
    ),
];

#[derive(Debug, Clone)]
enum Locator {
    Text(Selector),
    Attr(Selector, &'static str),
    OwnAttr(&'static str),
    Marker(Selector),
}

impl Locator {
    fn compile(lookup: CardLookup) -> Option<Self> {
        Some(match lookup {
            CardLookup::Text(css) => Locator::Text(compile(css)?),
            CardLookup::Attr(css, attr) => Locator::Attr(compile(css)?, attr),
            CardLookup::OwnAttr(attr) => Locator::OwnAttr(attr),
            CardLookup::Marker(css) => Locator::Marker(compile(css)?),
        })
    }

    fn apply(&self, field: RawField, card: ElementRef, record: &mut RawRecord) {
        match self {
            Locator::Text(sel) => {
                if let Some(node) = card.select(sel).next() {
                    record.set(field, collapsed_text(node));
                }
            }
            Locator::Attr(sel, attr) => {
                if let Some(value) = card.select(sel).next().and_then(|n| n.value().attr(attr)) {
                    record.set(field, value);
                }
            }
            Locator::OwnAttr(attr) => {
                if let Some(value) = card.value().attr(attr) {
                    record.set(field, value);
                }
            }
            Locator::Marker(sel) => {
                if card.select(sel).next().is_some() {
                    record.mark(field);
                }
            }
        }
    }
}

/// Reads reviews from rendered review cards, by attribute and position.
#[derive(Debug, Clone)]
pub struct CardExtractor {
    card: Option<Selector>,
    listing: Option<Selector>,
    fields: Vec<(RawField, Locator)>,
}

impl CardExtractor {
    pub fn new() -> Self {
        let fields = CARD_FIELDS
            .iter()
            .filter_map(|(field, lookup)| Locator::compile(*lookup).map(|loc| (*field, loc)))
            .collect();
        Self {
            card: compile(CARD_SELECTOR),
            listing: compile(LISTING_SELECTOR),
            fields,
        }
    }

    /// Cards in document order. No cards is only an empty listing when the
    /// listing container itself is there.
    fn records(&self, doc: &Html) -> Result<Vec<RawRecord>, ExtractError> {
        let records: Vec<RawRecord> = match self.card.as_ref() {
            Some(card_sel) => doc
                .select(card_sel)
                .map(|card| {
                    let mut record = RawRecord::new();
                    for (field, locator) in &self.fields {
                        locator.apply(*field, card, &mut record);
                    }
                    record
                })
                .collect(),
            None => Vec::new(),
        };
        if !records.is_empty() || self.is_listing(doc) {
            Ok(records)
        } else {
            Err(ExtractError::NoReviewStructure)
        }
    }

    fn is_listing(&self, doc: &Html) -> bool {
        self.listing
            .as_ref()
            .is_some_and(|sel| doc.select(sel).next().is_some())
    }
}

impl Default for CardExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for CardExtractor {
    fn extract(&self, html: &str) -> Result<Vec<RawRecord>, ExtractError> {
        self.records(&Html::parse_document(html))
    }
}

/// Payload first, rendered cards as the fallback.
#[derive(Debug, Clone, Default)]
pub struct ReviewPageExtractor {
    payload: PayloadExtractor,
    cards: CardExtractor,
}

impl ReviewPageExtractor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Extractor for ReviewPageExtractor {
    fn extract(&self, html: &str) -> Result<Vec<RawRecord>, ExtractError> {
        let doc = Html::parse_document(html);
        if let Some(result) = self.payload.records(&doc) {
            return result;
        }
        self.cards.records(&doc)
    }
}

fn compile(css: &'static str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(err) => {
            review_error!("Invalid selector {:?}: {}", css, err);
            None
        }
    }
}

fn collapsed_text(node: ElementRef) -> String {
    node.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
