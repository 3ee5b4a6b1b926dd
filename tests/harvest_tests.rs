//! End-to-end tests for the harvest and backfill controllers, driven
//! against scripted service doubles.
//!
//! Tests run on the paused tokio clock: sleeps resolve instantly while the
//! mock-recorded instants still reflect the pacing delays, so fixed-delay
//! policies can be asserted without real waiting.

use std::sync::Arc;
use std::time::Duration;

use bookharvest::api::mock::{make_book, MockCatalog, MockSearchApi};
use bookharvest::api::{ApiError, BatchOutcome};
use bookharvest::harvest::{BatchImportController, HarvestController};
use bookharvest::models::{BookRecord, HarvestQuery, PageSize};

fn fiction_query(max_pages: u32) -> HarvestQuery {
    HarvestQuery::new("fiction")
        .page_size(PageSize::Twenty)
        .max_pages(max_pages)
}

fn transient() -> ApiError {
    ApiError::Network("connection reset".to_string())
}

fn books(seeds: std::ops::RangeInclusive<u32>) -> Vec<BookRecord> {
    seeds.map(make_book).collect()
}

fn isbn13_of(seed: u32) -> String {
    format!("978{:010}", seed)
}

#[tokio::test(start_paused = true)]
async fn three_page_run_with_existing_overlap_and_rate_limits() {
    let search = Arc::new(MockSearchApi::new());
    let catalog = Arc::new(MockCatalog::new());

    // 5 of page 1 and 2 of page 2 are already in the catalog
    catalog.seed_existing((1..=5).map(isbn13_of));
    catalog.seed_existing((21..=22).map(isbn13_of));

    // Page 1: 20 records, 5 existing -> 15 new
    search.push_page(812, books(1..=20));
    // Page 2: 3 repeats of page 1, 2 existing, 15 new
    let mut page2 = books(6..=8);
    page2.extend(books(21..=22));
    page2.extend(books(23..=37));
    search.push_page(812, page2);
    // Page 3: rate limited twice, then 10 new records
    search.push_error(ApiError::RateLimited {
        retry_after: Some(Duration::from_millis(1000)),
    });
    search.push_error(ApiError::RateLimited {
        retry_after: Some(Duration::from_millis(1000)),
    });
    search.push_page(812, books(40..=49));

    let mut controller = HarvestController::new(search.clone(), catalog);
    let report = controller.run(&fiction_query(3)).await.unwrap();

    assert_eq!(report.records.len(), 40);
    assert_eq!(report.state.pages_fetched, 3);
    assert_eq!(report.duplicates, 3);
    assert_eq!(report.existing_filtered, 7);
    assert!(!report.state.aborted);
    assert_eq!(report.state.stop_reason.as_deref(), Some("limit reached"));

    assert_eq!(search.pages_requested(), vec![1, 2, 3, 3, 3]);

    let instants = search.call_instants();
    // 2 s pacing between successful pages, none before the first
    assert!(instants[1] - instants[0] >= Duration::from_secs(2));
    // the advertised rate-limit delay before each retry of page 3
    assert!(instants[3] - instants[2] >= Duration::from_millis(1000));
    assert!(instants[4] - instants[3] >= Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn single_page_limit_issues_exactly_one_call() {
    let search = Arc::new(MockSearchApi::new());
    let catalog = Arc::new(MockCatalog::new());
    search.push_page(99, books(1..=10));

    let mut controller = HarvestController::new(search.clone(), catalog);
    let report = controller.run(&fiction_query(1)).await.unwrap();

    assert_eq!(search.call_count(), 1);
    assert_eq!(report.records.len(), 10);
    assert_eq!(report.state.pages_fetched, 1);
}

#[tokio::test(start_paused = true)]
async fn quota_exhaustion_aborts_but_keeps_partial_results() {
    let search = Arc::new(MockSearchApi::new());
    let catalog = Arc::new(MockCatalog::new());
    search.push_page(500, books(1..=10));
    search.push_error(ApiError::QuotaExceeded);

    let mut controller = HarvestController::new(search.clone(), catalog);
    let rx = controller.snapshots();
    let report = controller.run(&fiction_query(5)).await.unwrap();

    // Only pages before the failing one contribute records
    assert_eq!(report.records.len(), 10);
    assert!(report.state.aborted);
    assert_eq!(
        report.state.abort_reason.as_deref(),
        Some("daily quota exceeded")
    );
    assert_eq!(report.state.pages_fetched, 1);

    // The final published snapshot carries the partial tally
    let snapshot = rx.borrow().clone();
    assert!(snapshot.state.aborted);
    assert_eq!(snapshot.accumulated, 10);
}

#[tokio::test(start_paused = true)]
async fn five_consecutive_transient_errors_abort_retaining_prior_pages() {
    let search = Arc::new(MockSearchApi::new());
    let catalog = Arc::new(MockCatalog::new());
    search.push_page(500, books(1..=5));
    for _ in 0..5 {
        search.push_error(transient());
    }

    let mut controller = HarvestController::new(search.clone(), catalog);
    let report = controller.run(&fiction_query(10)).await.unwrap();

    assert!(report.state.aborted);
    assert_eq!(
        report.state.abort_reason.as_deref(),
        Some("too many consecutive errors")
    );
    assert_eq!(report.records.len(), 5);
    // Page 2 gets three attempts before being skipped; the counter keeps
    // running and aborts the run two failures into page 3.
    assert_eq!(search.pages_requested(), vec![1, 2, 2, 2, 3, 3]);
    assert_eq!(report.state.pages_skipped, 1);
}

#[tokio::test(start_paused = true)]
async fn skipped_page_does_not_end_the_run() {
    let search = Arc::new(MockSearchApi::new());
    let catalog = Arc::new(MockCatalog::new());
    search.push_page(500, books(1..=5));
    // Page 2 fails its full retry budget, page 3 succeeds
    search.push_error(transient());
    search.push_error(transient());
    search.push_error(transient());
    search.push_page(500, books(6..=10));

    let mut controller = HarvestController::new(search.clone(), catalog);
    let report = controller.run(&fiction_query(3)).await.unwrap();

    assert!(!report.state.aborted);
    assert_eq!(report.records.len(), 10);
    assert_eq!(report.state.pages_fetched, 2);
    assert_eq!(report.state.pages_skipped, 1);
    assert_eq!(search.pages_requested(), vec![1, 2, 2, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn blank_subject_rejected_before_any_network_call() {
    let search = Arc::new(MockSearchApi::new());
    let catalog = Arc::new(MockCatalog::new());

    let mut controller = HarvestController::new(search.clone(), catalog);
    let err = controller
        .run(&HarvestQuery::new("   ").max_pages(3))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidRequest(_)));
    assert_eq!(search.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn empty_page_stops_the_run() {
    let search = Arc::new(MockSearchApi::new());
    let catalog = Arc::new(MockCatalog::new());
    search.push_page(12, books(1..=12));
    search.push_page(12, vec![]);

    let mut controller = HarvestController::new(search.clone(), catalog);
    let report = controller.run(&fiction_query(10)).await.unwrap();

    assert_eq!(report.records.len(), 12);
    assert_eq!(report.state.stop_reason.as_deref(), Some("no more results"));
    assert_eq!(search.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn degraded_existence_check_fails_open_with_warning() {
    let search = Arc::new(MockSearchApi::new());
    let catalog = Arc::new(MockCatalog::new());
    catalog.seed_existing((1..=5).map(isbn13_of));
    catalog.fail_existence_checks(true);
    search.push_page(20, books(1..=20));

    let mut controller = HarvestController::new(search, catalog);
    let report = controller.run(&fiction_query(1)).await.unwrap();

    // Nothing filtered, run not blocked, degradation surfaced
    assert_eq!(report.records.len(), 20);
    assert_eq!(report.existing_filtered, 0);
    assert_eq!(report.warnings.len(), 1);
    assert!(!report.state.aborted);
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_between_iterations() {
    let search = Arc::new(MockSearchApi::new());
    let catalog = Arc::new(MockCatalog::new());
    search.push_page(100, books(1..=10));

    let mut controller = HarvestController::new(search.clone(), catalog);
    controller.cancel_handle().cancel();
    let report = controller.run(&fiction_query(5)).await.unwrap();

    assert_eq!(search.call_count(), 0);
    assert_eq!(report.state.stop_reason.as_deref(), Some("cancelled"));
    assert!(report.records.is_empty());
}

#[tokio::test(start_paused = true)]
async fn backfill_reaches_target_in_three_paced_calls() {
    let catalog = Arc::new(MockCatalog::new());
    for processed in [20, 20, 5] {
        catalog.push_batch_outcome(Ok(BatchOutcome {
            success: true,
            processed,
            errors: Vec::new(),
            error: None,
        }));
    }

    let mut controller = BatchImportController::new(catalog.clone());
    let state = controller.run(45, 20).await;

    assert!(state.completed);
    assert_eq!(state.total_processed, 45);
    assert_eq!(state.total_failed, 0);

    let instants = catalog.batch_call_instants();
    assert_eq!(instants.len(), 3);
    assert!(instants[1] - instants[0] >= Duration::from_secs(5));
    assert!(instants[2] - instants[1] >= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn backfill_stops_immediately_on_hard_failure() {
    let catalog = Arc::new(MockCatalog::new());
    catalog.push_batch_outcome(Ok(BatchOutcome {
        success: true,
        processed: 20,
        errors: vec!["isbn 9781111111111: no author match".to_string()],
        error: None,
    }));
    catalog.push_batch_outcome(Ok(BatchOutcome {
        success: false,
        processed: 0,
        errors: Vec::new(),
        error: Some("backfill worker offline".to_string()),
    }));
    // A third outcome must never be consumed
    catalog.push_batch_outcome(Ok(BatchOutcome {
        success: true,
        processed: 20,
        errors: Vec::new(),
        error: None,
    }));

    let mut controller = BatchImportController::new(catalog.clone());
    let state = controller.run(60, 20).await;

    assert!(state.completed);
    assert_eq!(state.total_processed, 20);
    assert_eq!(catalog.batch_call_instants().len(), 2);
    assert!(state
        .errors
        .iter()
        .any(|e| e.contains("backfill worker offline")));
}

#[tokio::test(start_paused = true)]
async fn backfill_transport_error_is_terminal() {
    let catalog = Arc::new(MockCatalog::new());
    catalog.push_batch_outcome(Err(ApiError::Network("connection refused".to_string())));

    let mut controller = BatchImportController::new(catalog.clone());
    let state = controller.run(40, 20).await;

    assert!(state.completed);
    assert_eq!(state.total_processed, 0);
    assert_eq!(catalog.batch_call_instants().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn backfill_snapshots_track_real_progress() {
    let catalog = Arc::new(MockCatalog::new());
    for processed in [20, 20, 5] {
        catalog.push_batch_outcome(Ok(BatchOutcome {
            success: true,
            processed,
            errors: Vec::new(),
            error: None,
        }));
    }

    let mut controller = BatchImportController::new(catalog);
    let rx = controller.snapshots();
    let state = controller.run(45, 20).await;

    assert!(state.completed);
    let snapshot = rx.borrow().clone();
    assert_eq!(snapshot.state.total_processed, 45);
    assert_eq!(snapshot.calls, 3);
    assert_eq!(snapshot.percent(), 100.0);
}
