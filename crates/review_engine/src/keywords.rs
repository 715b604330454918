use std::collections::HashMap;

use review_core::Review;

/// Every word counts unless a longer minimum is configured.
pub const DEFAULT_MIN_KEYWORD_LEN: usize = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordStats {
    pub keyword: String,
    pub count: u32,
    pub total_rating: u32,
}

impl KeywordStats {
    pub fn average_rating(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        f64::from(self.total_rating) / f64::from(self.count)
    }
}

/// Count every lowercase word (letters, digits, `_`) of at least `min_len`
/// characters across review contents, with the summed rating of the reviews
/// using it.
/// Most frequent first, ties by word.
pub fn keyword_report(reviews: &[Review], min_len: usize) -> Vec<KeywordStats> {
    let mut tally: HashMap<String, (u32, u32)> = HashMap::new();
    for review in reviews {
        let text = review.content.to_lowercase();
        let rating = u32::from(review.rating.get());
        for word in text
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|w| w.chars().count() >= min_len.max(1))
        {
            let entry = tally.entry(word.to_string()).or_default();
            entry.0 += 1;
            entry.1 += rating;
        }
    }

    let mut stats: Vec<KeywordStats> = tally
        .into_iter()
        .map(|(keyword, (count, total_rating))| KeywordStats {
            keyword,
            count,
            total_rating,
        })
        .collect();
    stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.keyword.cmp(&b.keyword)));
    stats
}
