//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the search provider and run
//! whole crawls end-to-end against it.

use chrono::NaiveDate;
use post_sweep::config::{Config, MalformedItemPolicy, QueryConfig};
use post_sweep::crawler::Coordinator;
use post_sweep::output::{CrawlOutcome, JsonLinesSink, ResultSink};
use post_sweep::run_crawl;
use post_sweep::state::PaginationCursor;
use post_sweep::storage::{CheckpointStore, FileCheckpoint, MemoryCheckpoint};
use post_sweep::{ExtractedResult, SweepError};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// 2017-07-10 12:00 UTC
const JUL_10: i64 = 1_499_688_000;
// 2017-07-05 12:00 UTC
const JUL_05: i64 = 1_499_256_000;
// 2017-06-30 00:00 UTC, before the crawl window
const JUN_30: i64 = 1_498_780_800;
// 2017-07-01 00:05 UTC, just inside the crawl window
const JUL_01_0005: i64 = 1_498_867_500;

fn from_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2017, 7, 1).unwrap()
}

fn to_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2017, 7, 10).unwrap()
}

/// Creates a test configuration pointing every endpoint at the mock server
fn create_test_config(base_url: &str) -> Config {
    let mut config = Config::default();

    config.endpoint.site_url = format!("{}/", base_url);
    config.endpoint.search_url = format!("{}/search", base_url);
    config.endpoint.timeline_url = format!("{}/i/search/timeline", base_url);

    config.crawler.page_delay_ms = 0;
    config.crawler.host_utc_offset_hours = Some(0);
    config.crawler.max_attempts = Some(3);
    config.crawler.retry_base_delay_ms = 1;
    config.crawler.retry_max_delay_ms = 5;

    config.query = QueryConfig {
        any_of: vec!["ios".to_string()],
        ..QueryConfig::default()
    };

    config
}

fn tweet_item(id: &str, epoch: i64) -> String {
    format!(
        r#"<li class="js-stream-item stream-item">
             <div class="tweet" data-tweet-id="{id}" data-name="User {id}" data-screen-name="user{id}"
                  data-permalink-path="/user{id}/status/{id}">
               <small class="time"><a class="tweet-timestamp"><span class="_timestamp" data-time="{epoch}"></span></a></small>
               <p class="tweet-text">post number {id}</p>
             </div>
           </li>"#
    )
}

fn malformed_item() -> String {
    r#"<li class="js-stream-item stream-item"><div class="tweet" data-screen-name="ghost">
         <p class="tweet-text">no id, no time</p>
       </div></li>"#
        .to_string()
}

fn first_page(cursor: &str, items: &[String]) -> String {
    format!(
        r#"<html><body><div id="timeline">
             <div class="stream-container" data-max-position="{}">
               <ol id="stream-items-id">{}</ol>
             </div>
           </div></body></html>"#,
        cursor,
        items.concat()
    )
}

fn timeline_page(min_position: &str, items: &[String]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "min_position": min_position,
        "has_more_items": true,
        "items_html": items.concat(),
    }))
}

fn ids(results: &[ExtractedResult]) -> Vec<&str> {
    results.iter().map(|r| r.id.as_str()).collect()
}

async fn crawl(
    config: &Config,
    checkpoint: Box<dyn CheckpointStore>,
    sink: &mut dyn ResultSink,
) -> Result<post_sweep::output::CrawlSummary, SweepError> {
    run_crawl(
        config,
        from_date(),
        to_date(),
        checkpoint,
        sink,
        CancellationToken::new(),
    )
    .await
}

#[tokio::test]
async fn test_crawl_stops_at_start_date() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "ios since:2017-07-01 until:2017-07-10"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(first_page("TWEET-300-9", &[tweet_item("3", JUL_10)]))
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/i/search/timeline"))
        .and(query_param("max_position", "TWEET-300-9"))
        .and(query_param("include_entities", "1"))
        .respond_with(timeline_page("TWEET-200-9", &[tweet_item("2", JUL_05)]))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/i/search/timeline"))
        .and(query_param("max_position", "TWEET-200-9"))
        .respond_with(timeline_page("TWEET-100-9", &[tweet_item("1", JUN_30)]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut results: Vec<ExtractedResult> = Vec::new();
    let summary = crawl(&config, Box::new(MemoryCheckpoint::default()), &mut results)
        .await
        .unwrap();

    assert_eq!(summary.outcome, CrawlOutcome::ReachedStartDate);
    assert_eq!(summary.pages, 3);
    assert_eq!(summary.results, 3);
    assert_eq!(summary.cursor_jumps, 0);
    assert_eq!(summary.last_cursor, Some(PaginationCursor::new("TWEET-100-9")));
    assert_eq!(ids(&results), vec!["3", "2", "1"]);

    let newest = &results[0];
    assert_eq!(newest.author, "User 3");
    assert_eq!(newest.raw_timestamp_epoch, JUL_10);
    assert_eq!(
        newest.permalink.as_str(),
        format!("{}/user3/status/3", mock_server.uri())
    );
}

#[tokio::test]
async fn test_empty_page_jumps_cursor() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/i/search/timeline"))
        .and(query_param("max_position", "TWEET-5000000000000-9"))
        .respond_with(timeline_page("TWEET-5000000000000-9", &[]))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/i/search/timeline"))
        .and(query_param("max_position", "TWEET-2480000000000-9"))
        .respond_with(timeline_page("TWEET-1-9", &[tweet_item("7", JUN_30)]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let checkpoint = MemoryCheckpoint::new(Some(PaginationCursor::new("TWEET-5000000000000-9")));
    let mut results: Vec<ExtractedResult> = Vec::new();
    let summary = crawl(&config, Box::new(checkpoint), &mut results)
        .await
        .unwrap();

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.cursor_jumps, 1);
    assert_eq!(ids(&results), vec!["7"]);
    assert_eq!(summary.last_cursor, Some(PaginationCursor::new("TWEET-1-9")));
}

#[tokio::test]
async fn test_resume_from_file_checkpoint() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());
    let dir = TempDir::new().unwrap();
    let checkpoint_path = dir.path().join("20170701_20170710_maxpos.log");
    std::fs::write(&checkpoint_path, "X-1-Y\n").unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/i/search/timeline"))
        .and(query_param("max_position", "X-1-Y"))
        .respond_with(timeline_page("X-0-Y", &[tweet_item("4", JUN_30)]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut results: Vec<ExtractedResult> = Vec::new();
    let summary = crawl(
        &config,
        Box::new(FileCheckpoint::new(&checkpoint_path)),
        &mut results,
    )
    .await
    .unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(ids(&results), vec!["4"]);
    assert_eq!(std::fs::read_to_string(&checkpoint_path).unwrap(), "X-0-Y");
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/i/search/timeline"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/i/search/timeline"))
        .respond_with(timeline_page("A-1-B", &[tweet_item("5", JUN_30)]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let checkpoint = MemoryCheckpoint::new(Some(PaginationCursor::new("A-2-B")));
    let mut results: Vec<ExtractedResult> = Vec::new();
    let summary = crawl(&config, Box::new(checkpoint), &mut results)
        .await
        .unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(ids(&results), vec!["5"]);
}

#[tokio::test]
async fn test_crawl_aborts_after_retry_ceiling() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());
    let dir = TempDir::new().unwrap();
    let checkpoint_path = dir.path().join("cursor.txt");
    std::fs::write(&checkpoint_path, "A-2-B").unwrap();

    Mock::given(method("GET"))
        .and(path("/i/search/timeline"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let mut results: Vec<ExtractedResult> = Vec::new();
    let result = crawl(
        &config,
        Box::new(FileCheckpoint::new(&checkpoint_path)),
        &mut results,
    )
    .await;

    match result {
        Err(SweepError::CrawlAborted {
            attempts,
            last_error,
        }) => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("503"));
        }
        other => panic!("expected CrawlAborted, got {:?}", other),
    }
    assert!(results.is_empty());
    assert_eq!(std::fs::read_to_string(&checkpoint_path).unwrap(), "A-2-B");
}

#[tokio::test]
async fn test_unparseable_timeline_is_retried() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/i/search/timeline"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>try again</html>"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/i/search/timeline"))
        .respond_with(timeline_page("A-1-B", &[tweet_item("6", JUN_30)]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let checkpoint = MemoryCheckpoint::new(Some(PaginationCursor::new("A-2-B")));
    let mut results: Vec<ExtractedResult> = Vec::new();
    let summary = crawl(&config, Box::new(checkpoint), &mut results)
        .await
        .unwrap();

    assert_eq!(ids(&results), vec!["6"]);
    assert_eq!(summary.pages, 1);
}

#[tokio::test]
async fn test_malformed_item_skipped() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());
    assert_eq!(config.crawler.malformed_items, MalformedItemPolicy::Skip);

    Mock::given(method("GET"))
        .and(path("/i/search/timeline"))
        .respond_with(timeline_page(
            "A-1-B",
            &[malformed_item(), tweet_item("8", JUN_30)],
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let checkpoint = MemoryCheckpoint::new(Some(PaginationCursor::new("A-2-B")));
    let mut results: Vec<ExtractedResult> = Vec::new();
    let summary = crawl(&config, Box::new(checkpoint), &mut results)
        .await
        .unwrap();

    assert_eq!(ids(&results), vec!["8"]);
    assert_eq!(summary.skipped_items, 1);
}

#[tokio::test]
async fn test_malformed_item_retries_page() {
    let mock_server = MockServer::start().await;
    let mut config = create_test_config(&mock_server.uri());
    config.crawler.malformed_items = MalformedItemPolicy::RetryPage;

    Mock::given(method("GET"))
        .and(path("/i/search/timeline"))
        .respond_with(timeline_page(
            "A-1-B",
            &[tweet_item("9", JUL_05), malformed_item()],
        ))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/i/search/timeline"))
        .respond_with(timeline_page("A-1-B", &[tweet_item("9", JUN_30)]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let checkpoint = MemoryCheckpoint::new(Some(PaginationCursor::new("A-2-B")));
    let mut results: Vec<ExtractedResult> = Vec::new();
    let summary = crawl(&config, Box::new(checkpoint), &mut results)
        .await
        .unwrap();

    // Nothing from the failed attempt reaches the sink
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].raw_timestamp_epoch, JUN_30);
    assert_eq!(summary.skipped_items, 0);
}

#[tokio::test]
async fn test_max_empty_pages_aborts() {
    let mock_server = MockServer::start().await;
    let mut config = create_test_config(&mock_server.uri());
    config.crawler.max_empty_pages = Some(2);

    // Opaque cursors cannot be jumped and are reused unchanged
    Mock::given(method("GET"))
        .and(path("/i/search/timeline"))
        .respond_with(timeline_page("opaque", &[]))
        .expect(2)
        .mount(&mock_server)
        .await;

    let checkpoint = MemoryCheckpoint::new(Some(PaginationCursor::new("opaque")));
    let mut results: Vec<ExtractedResult> = Vec::new();
    let result = crawl(&config, Box::new(checkpoint), &mut results).await;

    assert!(matches!(
        result,
        Err(SweepError::CrawlAborted { attempts: 2, .. })
    ));
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let criteria = config
        .query
        .to_builder()
        .since(from_date())
        .until(to_date())
        .build();
    let checkpoint = MemoryCheckpoint::new(Some(PaginationCursor::new("A-2-B")));
    let mut coordinator =
        Coordinator::new(&config, criteria, from_date(), Box::new(checkpoint), cancel).unwrap();

    let mut results: Vec<ExtractedResult> = Vec::new();
    let summary = coordinator.run(&mut results).await.unwrap();

    assert_eq!(summary.outcome, CrawlOutcome::Cancelled);
    assert_eq!(summary.pages, 0);
    assert_eq!(summary.last_cursor, Some(PaginationCursor::new("A-2-B")));
}

#[tokio::test]
async fn test_cancel_interrupts_retry_loop() {
    let mock_server = MockServer::start().await;
    let mut config = create_test_config(&mock_server.uri());
    config.crawler.retry_forever = true;

    Mock::given(method("GET"))
        .and(path("/i/search/timeline"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let cancel = CancellationToken::new();
    let criteria = config
        .query
        .to_builder()
        .since(from_date())
        .until(to_date())
        .build();
    let checkpoint = MemoryCheckpoint::new(Some(PaginationCursor::new("A-2-B")));
    let mut coordinator = Coordinator::new(
        &config,
        criteria,
        from_date(),
        Box::new(checkpoint),
        cancel.clone(),
    )
    .unwrap();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel.cancel();
    });

    let mut results: Vec<ExtractedResult> = Vec::new();
    let summary = tokio::time::timeout(Duration::from_secs(10), coordinator.run(&mut results))
        .await
        .expect("cancellation should end the retry loop")
        .unwrap();

    assert_eq!(summary.outcome, CrawlOutcome::Cancelled);
    assert_eq!(summary.pages, 0);
    assert!(results.is_empty());
    assert_eq!(summary.last_cursor, Some(PaginationCursor::new("A-2-B")));

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.len() > 3, "retried past the default ceiling");
}

#[tokio::test]
async fn test_empty_page_steps_marker_past_start_date() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/i/search/timeline"))
        .and(query_param("max_position", "A-9-B"))
        .respond_with(timeline_page(
            "A-5000000000000-B",
            &[tweet_item("1", JUL_01_0005)],
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/i/search/timeline"))
        .and(query_param("max_position", "A-5000000000000-B"))
        .respond_with(timeline_page("A-5000000000000-B", &[]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let checkpoint = MemoryCheckpoint::new(Some(PaginationCursor::new("A-9-B")));
    let mut results: Vec<ExtractedResult> = Vec::new();
    let summary = crawl(&config, Box::new(checkpoint), &mut results)
        .await
        .unwrap();

    assert_eq!(summary.outcome, CrawlOutcome::ReachedStartDate);
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.cursor_jumps, 1);
    // 00:05 stepped back ten minutes lands before the 00:00 boundary
    assert_eq!(summary.marker.map(|m| m.timestamp()), Some(JUL_01_0005 - 600));
    assert_eq!(
        summary.last_cursor,
        Some(PaginationCursor::new("A-2480000000000-B"))
    );
    assert_eq!(ids(&results), vec!["1"]);
}

#[tokio::test]
async fn test_results_written_as_json_lines() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());
    let dir = TempDir::new().unwrap();
    let results_path = dir.path().join("20170701_20170710.jsonl");

    Mock::given(method("GET"))
        .and(path("/i/search/timeline"))
        .respond_with(timeline_page(
            "A-1-B",
            &[tweet_item("11", JUL_05), tweet_item("10", JUN_30)],
        ))
        .mount(&mock_server)
        .await;

    {
        let mut sink = JsonLinesSink::append_to(&results_path).unwrap();
        let checkpoint = MemoryCheckpoint::new(Some(PaginationCursor::new("A-2-B")));
        crawl(&config, Box::new(checkpoint), &mut sink).await.unwrap();
        assert_eq!(sink.written(), 2);
    }

    let content = std::fs::read_to_string(&results_path).unwrap();
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["id"], "11");
    assert_eq!(lines[0]["timestamp"], "2017-07-05 12:00+00:00");
    assert_eq!(lines[0]["timezone"], "UTC");
    assert_eq!(lines[1]["ts"], JUN_30);
}

#[tokio::test]
async fn test_start_after_end_is_rejected() {
    let config = Config::default();
    let mut results: Vec<ExtractedResult> = Vec::new();

    let result = run_crawl(
        &config,
        to_date(),
        from_date(),
        Box::new(MemoryCheckpoint::default()),
        &mut results,
        CancellationToken::new(),
    )
    .await;

    assert!(matches!(result, Err(SweepError::Config(_))));
}
