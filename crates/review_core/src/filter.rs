use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{Days, Months, NaiveDate};

use crate::{Rating, Review};

/// Invalid filter or sort values supplied by the caller. Raised before any
/// page is fetched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("star filter {0} outside 1..=5")]
    InvalidStar(u8),
    #[error("unknown date window {0:?} (expected last30days, last3months, last6months or last12months)")]
    UnknownDateWindow(String),
    #[error("invalid language code {0:?}")]
    InvalidLanguage(String),
    #[error("unknown sort field {0:?}")]
    UnknownSortKey(String),
    #[error("unknown sort order {0:?} (expected asc or desc)")]
    UnknownSortOrder(String),
    #[error("unknown output format {0:?} (expected csv, json or both)")]
    UnknownOutputFormat(String),
    #[error("invalid domain {0:?}")]
    InvalidDomain(String),
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateWindow {
    #[default]
    None,
    Last30Days,
    Last3Months,
    Last6Months,
    Last12Months,
}

impl DateWindow {
    /// Query value the source understands, if any.
    pub fn as_param(self) -> Option<&'static str> {
        match self {
            DateWindow::None => None,
            DateWindow::Last30Days => Some("last30days"),
            DateWindow::Last3Months => Some("last3months"),
            DateWindow::Last6Months => Some("last6months"),
            DateWindow::Last12Months => Some("last12months"),
        }
    }

    /// Earliest published date inside the window, relative to `reference`.
    pub fn cutoff(self, reference: NaiveDate) -> Option<NaiveDate> {
        match self {
            DateWindow::None => None,
            DateWindow::Last30Days => reference.checked_sub_days(Days::new(30)),
            DateWindow::Last3Months => reference.checked_sub_months(Months::new(3)),
            DateWindow::Last6Months => reference.checked_sub_months(Months::new(6)),
            DateWindow::Last12Months => reference.checked_sub_months(Months::new(12)),
        }
    }
}

impl FromStr for DateWindow {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(DateWindow::None),
            "last30days" => Ok(DateWindow::Last30Days),
            "last3months" => Ok(DateWindow::Last3Months),
            "last6months" => Ok(DateWindow::Last6Months),
            "last12months" => Ok(DateWindow::Last12Months),
            _ => Err(ConfigurationError::UnknownDateWindow(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LanguageFilter {
    #[default]
    All,
    Only(String),
}

impl LanguageFilter {
    pub fn as_param(&self) -> &str {
        match self {
            LanguageFilter::All => "all",
            LanguageFilter::Only(code) => code,
        }
    }

    fn matches(&self, language: Option<&str>) -> bool {
        match self {
            LanguageFilter::All => true,
            LanguageFilter::Only(code) => language.is_some_and(|l| l.eq_ignore_ascii_case(code)),
        }
    }
}

impl FromStr for LanguageFilter {
    type Err = ConfigurationError;

    /// Accepts `all` or a locale code such as `en`, `pt-BR`, `de_DE`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.eq_ignore_ascii_case("all") {
            return Ok(LanguageFilter::All);
        }
        let mut parts = code.split(['-', '_']);
        let primary_ok = parts
            .next()
            .is_some_and(|p| (2..=3).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphabetic()));
        let rest_ok = parts.all(|p| (2..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric()));
        if primary_ok && rest_ok {
            Ok(LanguageFilter::Only(code.to_string()))
        } else {
            Err(ConfigurationError::InvalidLanguage(s.to_string()))
        }
    }
}

/// Conjunctive filter set. Every unset filter imposes no constraint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReviewFilters {
    stars: BTreeSet<u8>,
    pub date_window: DateWindow,
    pub keyword: Option<String>,
    pub language: LanguageFilter,
    pub verified_only: bool,
    pub has_reply_only: bool,
}

impl ReviewFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stars(
        mut self,
        stars: impl IntoIterator<Item = u8>,
    ) -> Result<Self, ConfigurationError> {
        for star in stars {
            if Rating::new(star).is_none() {
                return Err(ConfigurationError::InvalidStar(star));
            }
            self.stars.insert(star);
        }
        Ok(self)
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        self.keyword = (!keyword.trim().is_empty()).then(|| keyword.trim().to_string());
        self
    }

    pub fn stars(&self) -> impl Iterator<Item = u8> + '_ {
        self.stars.iter().copied()
    }

    pub fn matches(&self, review: &Review, reference: NaiveDate) -> bool {
        if !self.stars.is_empty() && !self.stars.contains(&review.rating.get()) {
            return false;
        }
        if let Some(cutoff) = self.date_window.cutoff(reference) {
            match review.published_date {
                Some(date) if date >= cutoff => {}
                _ => return false,
            }
        }
        if let Some(keyword) = &self.keyword {
            let needle = keyword.to_lowercase();
            let in_title = review
                .title
                .as_deref()
                .is_some_and(|t| t.to_lowercase().contains(&needle));
            if !in_title && !review.content.to_lowercase().contains(&needle) {
                return false;
            }
        }
        if !self.language.matches(review.language.as_deref()) {
            return false;
        }
        if self.verified_only && !review.verified {
            return false;
        }
        if self.has_reply_only && !review.has_reply {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    PublishedDate,
    ExperienceDate,
    Rating,
    ReviewerName,
    ReviewerCountry,
    ReviewerReviewCount,
    Likes,
    Language,
    Title,
}

impl SortKey {
    fn compare(self, a: &Review, b: &Review) -> Ordering {
        match self {
            SortKey::PublishedDate => a.published_date.cmp(&b.published_date),
            SortKey::ExperienceDate => a.experience_date.cmp(&b.experience_date),
            SortKey::Rating => a.rating.cmp(&b.rating),
            SortKey::ReviewerName => a.reviewer_name.cmp(&b.reviewer_name),
            SortKey::ReviewerCountry => a.reviewer_country.cmp(&b.reviewer_country),
            SortKey::ReviewerReviewCount => a.reviewer_review_count.cmp(&b.reviewer_review_count),
            SortKey::Likes => a.likes.cmp(&b.likes),
            SortKey::Language => a.language.cmp(&b.language),
            SortKey::Title => a.title.cmp(&b.title),
        }
    }
}

impl FromStr for SortKey {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "publisheddate" | "date" | "published" => Ok(SortKey::PublishedDate),
            "experiencedate" | "experienceddate" => Ok(SortKey::ExperienceDate),
            "rating" | "stars" => Ok(SortKey::Rating),
            "reviewername" | "displayname" | "name" => Ok(SortKey::ReviewerName),
            "reviewercountry" | "countrycode" | "country" => Ok(SortKey::ReviewerCountry),
            "reviewerreviewcount" | "reviewcount" => Ok(SortKey::ReviewerReviewCount),
            "likes" => Ok(SortKey::Likes),
            "language" => Ok(SortKey::Language),
            "title" => Ok(SortKey::Title),
            _ => Err(ConfigurationError::UnknownSortKey(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            _ => Err(ConfigurationError::UnknownSortOrder(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

/// Filter then stable-sort `reviews` into a new ordered view.
///
/// `reference` is the run's start date; date windows are measured from it so a
/// run is deterministic no matter how long it takes. Ties keep the input order
/// in both directions.
pub fn apply(
    reviews: &[Review],
    filters: &ReviewFilters,
    sort: SortSpec,
    reference: NaiveDate,
) -> Vec<Review> {
    let mut kept: Vec<Review> = reviews
        .iter()
        .filter(|review| filters.matches(review, reference))
        .cloned()
        .collect();
    kept.sort_by(|a, b| {
        let ord = sort.key.compare(a, b);
        match sort.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
    kept
}
