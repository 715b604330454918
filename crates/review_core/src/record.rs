use std::collections::BTreeMap;
use std::fmt;

/// Every sub-field an extractor may pull out of one review block.
///
/// Marker fields (`VerifiedMarker`, `ReplyMarker`) carry no meaningful value:
/// the normalizer only looks at whether they are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RawField {
    ReviewId,
    Title,
    Content,
    Rating,
    PublishedDate,
    ExperienceDate,
    Language,
    ReviewerName,
    ReviewerCountry,
    ReviewerReviewCount,
    Likes,
    VerifiedMarker,
    ReplyMarker,
    ReplyMessage,
}

impl RawField {
    pub fn as_str(self) -> &'static str {
        match self {
            RawField::ReviewId => "review_id",
            RawField::Title => "title",
            RawField::Content => "content",
            RawField::Rating => "rating",
            RawField::PublishedDate => "published_date",
            RawField::ExperienceDate => "experience_date",
            RawField::Language => "language",
            RawField::ReviewerName => "reviewer_name",
            RawField::ReviewerCountry => "reviewer_country",
            RawField::ReviewerReviewCount => "reviewer_review_count",
            RawField::Likes => "likes",
            RawField::VerifiedMarker => "verified_marker",
            RawField::ReplyMarker => "reply_marker",
            RawField::ReplyMessage => "reply_message",
        }
    }
}

impl fmt::Display for RawField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Untyped field bag for one review block, as found on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: BTreeMap<RawField, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with(mut self, field: RawField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: RawField, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    pub fn mark(&mut self, field: RawField) {
        self.fields.entry(field).or_default();
    }

    pub fn get(&self, field: RawField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Trimmed value, treating blank text as absent.
    pub fn text(&self, field: RawField) -> Option<&str> {
        self.get(field).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn has(&self, field: RawField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (RawField, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }
}
