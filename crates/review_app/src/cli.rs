use std::path::PathBuf;

use clap::Parser;
use review_core::{ConfigurationError, ReviewFilters, SortSpec};

use crate::config::HarvestConfig;

#[derive(Debug, Parser)]
#[command(
    name = "review-harvester",
    version,
    about = "Collect the public reviews of a business and export them as CSV or JSON"
)]
pub struct Cli {
    /// Business domain whose reviews are collected, e.g. example.com
    pub domain: String,

    /// Keep only these star ratings (e.g. --stars 4 5)
    #[arg(long, num_args = 1..)]
    pub stars: Vec<u8>,

    /// last30days, last3months, last6months or last12months
    #[arg(long)]
    pub date: Option<String>,

    /// Keep reviews whose title or text contains this text
    #[arg(long)]
    pub search: Option<String>,

    /// Language code such as en or pt-BR, or "all"
    #[arg(long)]
    pub languages: Option<String>,

    /// Only reviews marked as verified
    #[arg(long)]
    pub verified: bool,

    /// Only reviews the business replied to
    #[arg(long)]
    pub replies: bool,

    /// published_date, experience_date, rating, reviewer_name, reviewer_country,
    /// reviewer_review_count, likes, language or title
    #[arg(long, default_value = "published_date")]
    pub sort_by: String,

    /// asc or desc
    #[arg(long, default_value = "asc")]
    pub sort_order: String,

    /// csv, json or both
    #[arg(long)]
    pub output: Option<String>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Hard cap on listing pages requested
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Pause between pages, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Attempts per page before giving up on it
    #[arg(long)]
    pub retries: Option<u32>,

    /// Stop requesting pages after this many seconds
    #[arg(long)]
    pub max_runtime_secs: Option<u64>,

    /// Do not consult robots.txt
    #[arg(long)]
    pub ignore_robots: bool,

    /// Also write a keyword report
    #[arg(long)]
    pub analyze: bool,

    /// RON settings file
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,

    /// Also log to ./review_harvester.log
    #[arg(long)]
    pub log_file: bool,
}

impl Cli {
    pub fn filters(&self) -> Result<ReviewFilters, ConfigurationError> {
        let mut filters = ReviewFilters::new().with_stars(self.stars.iter().copied())?;
        if let Some(date) = &self.date {
            filters.date_window = date.parse()?;
        }
        if let Some(keyword) = &self.search {
            filters = filters.with_keyword(keyword.as_str());
        }
        if let Some(language) = &self.languages {
            filters.language = language.parse()?;
        }
        filters.verified_only = self.verified;
        filters.has_reply_only = self.replies;
        Ok(filters)
    }

    pub fn sort(&self) -> Result<SortSpec, ConfigurationError> {
        Ok(SortSpec {
            key: self.sort_by.parse()?,
            order: self.sort_order.parse()?,
        })
    }

    /// Flags given on the command line win over the settings file.
    pub fn apply_overrides(&self, config: &mut HarvestConfig) {
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(pages) = self.max_pages {
            config.max_pages = pages;
        }
        if let Some(delay) = self.delay_ms {
            config.delay_ms = delay;
        }
        if let Some(attempts) = self.retries {
            config.max_attempts = attempts;
        }
        if let Some(secs) = self.max_runtime_secs {
            config.max_runtime_secs = Some(secs);
        }
        if self.ignore_robots {
            config.respect_robots = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use review_core::{DateWindow, LanguageFilter, SortKey, SortOrder};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("review-harvester").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn filters_from_flags() {
        let cli = parse(&[
            "example.com",
            "--stars",
            "4",
            "5",
            "--date",
            "last6months",
            "--search",
            "refund",
            "--languages",
            "en",
            "--verified",
        ]);
        let filters = cli.filters().unwrap();
        assert_eq!(filters.stars().collect::<Vec<_>>(), vec![4, 5]);
        assert_eq!(filters.date_window, DateWindow::Last6Months);
        assert_eq!(filters.keyword.as_deref(), Some("refund"));
        assert_eq!(filters.language, LanguageFilter::Only("en".into()));
        assert!(filters.verified_only);
        assert!(!filters.has_reply_only);
    }

    #[test]
    fn invalid_values_are_configuration_errors() {
        let cli = parse(&["example.com", "--stars", "6"]);
        assert_eq!(cli.filters(), Err(ConfigurationError::InvalidStar(6)));

        let cli = parse(&["example.com", "--date", "yesterday"]);
        assert!(matches!(
            cli.filters(),
            Err(ConfigurationError::UnknownDateWindow(_))
        ));

        let cli = parse(&["example.com", "--sort-by", "mood"]);
        assert!(matches!(cli.sort(), Err(ConfigurationError::UnknownSortKey(_))));

        let cli = parse(&["example.com", "--sort-order", "sideways"]);
        assert!(matches!(cli.sort(), Err(ConfigurationError::UnknownSortOrder(_))));
    }

    #[test]
    fn sort_defaults_to_oldest_first() {
        let sort = parse(&["example.com"]).sort().unwrap();
        assert_eq!(sort.key, SortKey::PublishedDate);
        assert_eq!(sort.order, SortOrder::Asc);
        assert_eq!(sort, SortSpec::default());

        let sort = parse(&["example.com", "--sort-order", "desc"]).sort().unwrap();
        assert_eq!(sort.order, SortOrder::Desc);
    }

    #[test]
    fn flags_override_the_settings_file() {
        let mut config = HarvestConfig {
            max_pages: 7,
            delay_ms: 50,
            ..HarvestConfig::default()
        };
        parse(&[
            "example.com",
            "--max-pages",
            "2",
            "--retries",
            "5",
            "--ignore-robots",
            "--output",
            "json",
        ])
        .apply_overrides(&mut config);

        assert_eq!(config.max_pages, 2);
        assert_eq!(config.delay_ms, 50);
        assert_eq!(config.max_attempts, 5);
        assert!(!config.respect_robots);
        assert_eq!(config.output, "json");
    }

    #[test]
    fn domain_is_required() {
        assert!(Cli::try_parse_from(["review-harvester"]).is_err());
    }
}
