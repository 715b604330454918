use std::sync::{Arc, Once};
use std::time::Duration;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use review_core::{apply, ReviewFilters, SortKey, SortOrder, SortSpec, StopReason};
use review_engine::{
    export_reviews, ExportFormat, FetchSettings, HarvestRequest, HarvestSettings, Harvester,
    LogProgressSink, ReqwestFetcher, ReviewPageExtractor,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(review_logging::initialize_for_tests);
}

fn page_body(reviews: &[(&str, u8, &str)]) -> String {
    let items: Vec<String> = reviews
        .iter()
        .map(|(id, rating, text)| {
            format!(
                r#"{{"id":"{id}","text":"{text}","rating":{rating},"language":"en",
                "dates":{{"publishedDate":"2024-0{rating}-01T08:00:00.000Z"}},
                "consumer":{{"displayName":"user {id}"}},
                "labels":{{"verification":{{"isVerified":true}}}}}}"#
            )
        })
        .collect();
    format!(
        r#"<!DOCTYPE html><html><body><script id="__NEXT_DATA__" type="application/json">{{"props":{{"pageProps":{{"reviews":[{}]}}}}}}</script></body></html>"#,
        items.join(",")
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

fn harvester(server: &MockServer) -> Harvester {
    let settings = HarvestSettings {
        base_url: format!("{}/review/", server.uri()),
        page_delay: Duration::ZERO,
        retry_backoff: Duration::from_millis(10),
        ..HarvestSettings::default()
    };
    Harvester::new(
        Arc::new(ReqwestFetcher::new(FetchSettings::default())),
        Box::new(ReviewPageExtractor::new()),
        settings,
    )
}

#[tokio::test]
async fn harvests_filters_and_exports_a_listing() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "User-agent: *\nDisallow: /account\n",
            "text/plain",
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/review/shop.test"))
        .and(query_param_is_missing("page"))
        .respond_with(html(page_body(&[
            ("a", 5, "Great"),
            ("b", 3, "Fine"),
            ("c", 5, "Superb"),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/review/shop.test"))
        .and(query_param("page", "2"))
        .respond_with(html(page_body(&[("d", 1, "Awful"), ("e", 5, "Lovely")])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/review/shop.test"))
        .and(query_param("page", "3"))
        .respond_with(html(page_body(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let request = HarvestRequest {
        domain: "shop.test".into(),
        filters: ReviewFilters::new(),
    };
    let set = harvester(&server)
        .run(&request, &CancellationToken::new(), &LogProgressSink)
        .await
        .unwrap();

    assert!(set.complete);
    assert_eq!(set.stop_reason, Some(StopReason::EmptyPage));
    assert_eq!(set.reviews.len(), 5);

    let five_stars = ReviewFilters::new().with_stars([5]).unwrap();
    let sort = SortSpec {
        key: SortKey::ReviewerName,
        order: SortOrder::Desc,
    };
    let reference = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    let selected = apply(&set.reviews, &five_stars, sort, reference);
    let names: Vec<_> = selected
        .iter()
        .map(|r| r.reviewer_name.as_deref().unwrap())
        .collect();
    assert_eq!(names, vec!["user e", "user c", "user a"]);

    let temp = TempDir::new().unwrap();
    let summary = export_reviews(temp.path(), "shop.test", &selected, ExportFormat::Csv).unwrap();
    let csv = std::fs::read_to_string(&summary.paths[0]).unwrap();
    assert_eq!(csv.trim_start_matches('\u{feff}').lines().count(), 4);
}

#[tokio::test]
async fn server_error_is_retried_then_succeeds() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/review/shop.test"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/review/shop.test"))
        .and(query_param_is_missing("page"))
        .respond_with(html(page_body(&[("a", 4, "Good")])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/review/shop.test"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let request = HarvestRequest {
        domain: "shop.test".into(),
        filters: ReviewFilters::new(),
    };
    let set = harvester(&server)
        .run(&request, &CancellationToken::new(), &LogProgressSink)
        .await
        .unwrap();

    assert!(set.complete);
    assert_eq!(set.stop_reason, Some(StopReason::NotFound));
    assert_eq!(set.reviews.len(), 1);
    assert!(set.reviews[0].verified);
}
