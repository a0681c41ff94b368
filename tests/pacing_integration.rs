//! Pauses between network requests, measured on tokio's paused clock

mod common;

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::Instant;

use osm_fetcher::app::{CatalogueBuilder, DataSource, ItemStatus, Listing, Session};

use common::{
    parent_row, pbf_row, session_config, two_branch_pages, url, CountingFetcher,
    FakeDirectoryPage, ScriptedConfirmation,
};

const INTERVAL: Duration = Duration::from_secs(2);

#[tokio::test(start_paused = true)]
async fn test_batch_waits_only_between_fetches() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = session_config(&temp_dir.path().join("cache"));
    config.download.interval = INTERVAL;
    let fetcher = Arc::new(CountingFetcher::default());
    let confirmation = Arc::new(ScriptedConfirmation::new(&[true, false, true]));
    let session = Session::new(
        config,
        Arc::new(two_branch_pages()),
        fetcher.clone(),
        confirmation.clone(),
    );
    let dest = temp_dir.path().join("extracts");
    session.catalogue().await.unwrap();

    let names: Vec<String> = ["A", "B1", "B2", "A"].iter().map(|s| s.to_string()).collect();
    let start = Instant::now();
    let report = session
        .ensure_local_batch(&names, "pbf", &dest, false, true)
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(
        report.statuses(),
        vec![
            &ItemStatus::Downloaded,
            &ItemStatus::Skipped,
            &ItemStatus::Downloaded,
            &ItemStatus::AlreadyPresent,
        ]
    );
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(confirmation.prompts().len(), 3);
    assert!(elapsed >= INTERVAL, "waited {:?}", elapsed);
    assert!(elapsed < INTERVAL * 2, "waited {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_batch_with_nothing_to_fetch_does_not_wait() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = session_config(&temp_dir.path().join("cache"));
    config.download.interval = INTERVAL;
    let fetcher = Arc::new(CountingFetcher::default());
    let session = Session::new(
        config,
        Arc::new(two_branch_pages()),
        fetcher.clone(),
        Arc::new(ScriptedConfirmation::default()),
    );
    let dest = temp_dir.path().join("extracts");
    let names: Vec<String> = ["A", "B1"].iter().map(|s| s.to_string()).collect();

    let declined = session
        .ensure_local_batch(&names, "pbf", &dest, false, true)
        .await
        .unwrap();
    assert_eq!(declined.skipped(), 2);

    session
        .ensure_local_batch(&names, "pbf", &dest, false, false)
        .await
        .unwrap();

    let start = Instant::now();
    let present = session
        .ensure_local_batch(&names, "pbf", &dest, false, false)
        .await
        .unwrap();
    assert_eq!(present.already_present(), 2);
    assert!(start.elapsed() < INTERVAL, "waited {:?}", start.elapsed());
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_crawler_waits_before_each_subregion_page() {
    let delay = Duration::from_millis(500);
    let pages = FakeDirectoryPage::new()
        .page("", Listing::with_rows(vec![parent_row("Earth", "earth.html")]))
        .page(
            "earth.html",
            Listing::with_rows(vec![
                parent_row("Asia", "asia.html"),
                parent_row("Europe", "europe.html"),
            ]),
        )
        .page(
            "asia.html",
            Listing::with_rows(vec![pbf_row("Japan", "asia/japan-latest.osm.pbf", None)]),
        )
        .page(
            "europe.html",
            Listing::with_rows(vec![pbf_row("Malta", "europe/malta-latest.osm.pbf", None)]),
        );
    let pages = Arc::new(pages);
    let builder = CatalogueBuilder::new(pages.clone(), DataSource::Geofabrik, url(""))
        .with_page_delay(delay);

    let start = Instant::now();
    let catalogue = builder.build().await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(catalogue.leaf_names(), vec!["Japan", "Malta"]);
    assert_eq!(pages.request_count(), 4);
    assert!(elapsed >= delay * 3, "waited {:?}", elapsed);
    assert!(elapsed < delay * 4, "waited {:?}", elapsed);
}
