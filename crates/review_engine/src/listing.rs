use review_core::{ConfigurationError, ReviewFilters};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.trustpilot.com/review/";

/// Lowercased, validated business domain (`example.com`, `www.shop.co.uk`).
pub fn validate_domain(raw: &str) -> Result<String, ConfigurationError> {
    let domain = raw.trim().trim_end_matches('.').to_ascii_lowercase();
    let labels: Vec<&str> = domain.split('.').collect();
    let valid = labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
    if valid {
        Ok(domain)
    } else {
        Err(ConfigurationError::InvalidDomain(raw.to_string()))
    }
}

/// URL of one listing page. Filters the source understands go into the query;
/// `page` is left out for the first page.
pub fn listing_url(
    base: &str,
    domain: &str,
    page: u32,
    filters: &ReviewFilters,
) -> Result<Url, ConfigurationError> {
    let mut base = Url::parse(base)
        .map_err(|err| ConfigurationError::InvalidSetting(format!("base url {base:?}: {err}")))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    let mut url = base
        .join(domain)
        .map_err(|_| ConfigurationError::InvalidDomain(domain.to_string()))?;

    {
        let mut query = url.query_pairs_mut();
        query.clear();
        for star in filters.stars() {
            query.append_pair("stars", &star.to_string());
        }
        if let Some(date) = filters.date_window.as_param() {
            query.append_pair("date", date);
        }
        if let Some(keyword) = &filters.keyword {
            query.append_pair("search", keyword);
        }
        query.append_pair("languages", filters.language.as_param());
        if filters.verified_only {
            query.append_pair("verified", "true");
        }
        if filters.has_reply_only {
            query.append_pair("replies", "true");
        }
        if page > 1 {
            query.append_pair("page", &page.to_string());
        }
    }
    Ok(url)
}

/// Page number carried by a listing URL; absent means page 1.
pub fn page_of(url: &Url) -> u32 {
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use review_core::{DateWindow, LanguageFilter};

    #[test]
    fn first_page_has_no_page_parameter() {
        let url = listing_url(DEFAULT_BASE_URL, "example.com", 1, &ReviewFilters::new()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.trustpilot.com/review/example.com?languages=all"
        );
        assert_eq!(page_of(&url), 1);
    }

    #[test]
    fn filters_are_pushed_into_the_query() {
        let mut filters = ReviewFilters::new()
            .with_stars([5, 4])
            .unwrap()
            .with_keyword("late delivery");
        filters.date_window = DateWindow::Last3Months;
        filters.language = LanguageFilter::Only("en".into());
        filters.verified_only = true;
        filters.has_reply_only = true;

        let url = listing_url("https://reviews.test/review", "shop.test", 3, &filters).unwrap();
        assert_eq!(
            url.as_str(),
            "https://reviews.test/review/shop.test?stars=4&stars=5&date=last3months\
             &search=late+delivery&languages=en&verified=true&replies=true&page=3"
        );
        assert_eq!(page_of(&url), 3);
    }

    #[test]
    fn domains_are_validated() {
        assert_eq!(validate_domain(" Example.COM ").unwrap(), "example.com");
        assert!(validate_domain("localhost").is_err());
        assert!(validate_domain("exa mple.com").is_err());
        assert!(validate_domain("https://example.com").is_err());
        assert!(validate_domain("-bad.com").is_err());
    }
}
