use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use review_core::{
    apply, DateWindow, LanguageFilter, Rating, Review, ReviewFilters, SortKey, SortOrder, SortSpec,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn review(id: usize, rating: u8) -> Review {
    Review {
        review_id: Some(format!("r{id}")),
        title: None,
        content: format!("review number {id}"),
        rating: Rating::new(rating).unwrap(),
        published_date: Some(day(2024, 6, 1)),
        experience_date: None,
        verified: false,
        has_reply: false,
        language: Some("en".to_string()),
        reviewer_name: Some(format!("user{id}")),
        reviewer_country: None,
        reviewer_review_count: None,
        likes: None,
        reply_message: None,
    }
}

fn ids(reviews: &[Review]) -> Vec<String> {
    reviews
        .iter()
        .map(|r| r.review_id.clone().unwrap_or_default())
        .collect()
}

fn reference() -> NaiveDate {
    day(2024, 6, 30)
}

#[test]
fn star_filter_keeps_only_matching_ratings() {
    // 40 reviews: the first 12 are five-star, the rest cycle through 1..=4.
    let reviews: Vec<Review> = (0..40)
        .map(|i| review(i, if i < 12 { 5 } else { (i % 4 + 1) as u8 }))
        .collect();
    assert_eq!(reviews.iter().filter(|r| r.rating.get() == 5).count(), 12);

    let filters = ReviewFilters::new().with_stars([5]).unwrap();
    let out = apply(&reviews, &filters, SortSpec::default(), reference());

    assert_eq!(out.len(), 12);
    assert!(out.iter().all(|r| r.rating.get() == 5));
}

#[test]
fn rating_sort_descending_is_stable() {
    let reviews: Vec<Review> = [3, 5, 1, 5, 2]
        .iter()
        .enumerate()
        .map(|(i, rating)| review(i, *rating))
        .collect();
    let sort = SortSpec {
        key: SortKey::Rating,
        order: SortOrder::Desc,
    };

    let out = apply(&reviews, &ReviewFilters::new(), sort, reference());

    let ratings: Vec<u8> = out.iter().map(|r| r.rating.get()).collect();
    assert_eq!(ratings, vec![5, 5, 3, 2, 1]);
    assert_eq!(ids(&out), vec!["r1", "r3", "r0", "r4", "r2"]);
}

#[test]
fn apply_is_deterministic_and_leaves_input_untouched() {
    let reviews: Vec<Review> = (0..20).map(|i| review(i, (i % 5 + 1) as u8)).collect();
    let before = reviews.clone();
    let filters = ReviewFilters::new().with_keyword("number 1");
    let sort = SortSpec {
        key: SortKey::Rating,
        order: SortOrder::Asc,
    };

    let first = apply(&reviews, &filters, sort, reference());
    let second = apply(&reviews, &filters, sort, reference());

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(reviews, before);
}

#[test]
fn keyword_matches_title_or_content_case_insensitively() {
    let mut titled = review(1, 4);
    titled.title = Some("FAST Shipping".to_string());
    let mut body = review(2, 4);
    body.content = "Shipping was fast and cheap".to_string();
    let other = review(3, 4);

    let filters = ReviewFilters::new().with_keyword("fast");
    let out = apply(&[titled, body, other], &filters, SortSpec::default(), reference());

    assert_eq!(ids(&out), vec!["r1", "r2"]);
}

#[test]
fn date_window_is_measured_from_the_reference_date() {
    let mut recent = review(1, 4);
    recent.published_date = Some(day(2024, 6, 15));
    let mut edge = review(2, 4);
    edge.published_date = Some(day(2024, 5, 31));
    let mut old = review(3, 4);
    old.published_date = Some(day(2024, 1, 1));
    let mut undated = review(4, 4);
    undated.published_date = None;
    let all = [recent, edge, old, undated];

    let mut filters = ReviewFilters::new();
    filters.date_window = DateWindow::Last30Days;
    assert_eq!(
        ids(&apply(&all, &filters, SortSpec::default(), reference())),
        vec!["r2", "r1"]
    );

    // Same data, later reference: the window moves with it.
    assert_eq!(
        ids(&apply(&all, &filters, SortSpec::default(), day(2024, 7, 10))),
        vec!["r1"]
    );

    filters.date_window = DateWindow::None;
    assert_eq!(
        apply(&all, &filters, SortSpec::default(), reference()).len(),
        4
    );
}

#[test]
fn filters_are_conjunctive() {
    let mut a = review(1, 5);
    a.verified = true;
    a.has_reply = true;
    let mut b = review(2, 5);
    b.verified = true;
    let mut c = review(3, 5);
    c.has_reply = true;
    c.verified = true;
    c.language = Some("DE".to_string());

    let mut filters = ReviewFilters::new().with_stars([5]).unwrap();
    filters.verified_only = true;
    filters.has_reply_only = true;
    filters.language = LanguageFilter::Only("en".to_string());

    let out = apply(&[a, b, c.clone()], &filters, SortSpec::default(), reference());
    assert_eq!(ids(&out), vec!["r1"]);

    filters.language = "de".parse().unwrap();
    let out = apply(&[c], &filters, SortSpec::default(), reference());
    assert_eq!(ids(&out), vec!["r3"]);
}

#[test]
fn missing_sort_values_come_first_ascending() {
    let mut first = review(1, 3);
    first.published_date = Some(day(2024, 2, 1));
    let mut second = review(2, 3);
    second.published_date = None;
    let mut third = review(3, 3);
    third.published_date = Some(day(2024, 1, 1));
    let all = [first, second, third];

    let asc = apply(&all, &ReviewFilters::new(), SortSpec::default(), reference());
    assert_eq!(ids(&asc), vec!["r2", "r3", "r1"]);

    let desc = SortSpec {
        key: SortKey::PublishedDate,
        order: SortOrder::Desc,
    };
    let out = apply(&all, &ReviewFilters::new(), desc, reference());
    assert_eq!(ids(&out), vec!["r1", "r3", "r2"]);
}
