//! Integration tests for the crawler
//!
//! These tests run the full crawl cycle against an in-memory site that
//! implements `BrowserDriver`, from the first form stage to the exported table.

mod fake_site;

use fake_site::{FakeSite, SiteOptions, View};
use listing_crawler::config::{AbortPolicy, Config, TimeoutConfig};
use listing_crawler::crawler::frames::find_frame_with_option;
use listing_crawler::crawler::Coordinator;
use listing_crawler::driver::{BrowserDriver, DriverError, FrameId, Probe};
use listing_crawler::output::{ExportResult, ResultCollection, TabularExporter};
use listing_crawler::retry::PollPolicy;
use listing_crawler::{crawl, CrawlerError, Field};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Creates a test configuration writing into the given directory
fn create_test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.site.target_url = "https://fake.example/busca".to_string();
    config.browser.keep_open = false;
    config.timeouts = TimeoutConfig {
        poll_interval: 10,
        navigation: 1_000,
        frame: 300,
        option: 300,
        stage_two: 300,
        price_band: 300,
        list_ready: 300,
        detail_ready: 300,
        navigation_check: 200,
        settle: 1, // Very short for testing
    };
    config.output.path = dir
        .path()
        .join("out")
        .join("resultados.csv")
        .display()
        .to_string();
    config
}

fn read_table(config: &Config) -> Vec<String> {
    std::fs::read_to_string(&config.output.path)
        .expect("Failed to read exported table")
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_full_crawl_two_pages() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let site = Arc::new(FakeSite::new(SiteOptions::default()));

    let report = crawl(site.clone(), config.clone()).await;
    assert!(report.is_success(), "crawl failed: {:?}", report.error);

    // Every detail link, page by page, in list order
    let journal = site.journal();
    assert_eq!(journal.visited_details, vec![(1, 0), (1, 1), (2, 0)]);
    assert_eq!(journal.stale_frame_hits, 0);

    assert_eq!(report.session.page_indices(), &[1, 2]);
    assert_eq!(report.session.current_page(), Some(2));
    assert_eq!(report.stats.pages_visited, 2);
    // "Governo Federal" and its kind are not detail links
    assert_eq!(report.stats.links_seen, 3);
    assert_eq!(report.stats.records, 3);
    assert_eq!(report.exported_rows, Some(3));

    let names: Vec<&str> = report
        .records
        .iter()
        .map(|r| r.get(Field::Name))
        .collect();
    assert_eq!(names, vec!["Residencial 1-1", "Residencial 1-2", "Residencial 2-1"]);

    let first = &report.records.as_slice()[0];
    assert_eq!(first.get(Field::PropertyType), "Apartamento");
    assert_eq!(first.get(Field::TotalArea), "70,00 m²");
    assert_eq!(first.get(Field::PrivateArea), "60,00 m²");
    assert_eq!(first.get(Field::Bedrooms), "2");
    assert_eq!(first.get(Field::Parking), "1");
    assert_eq!(first.get(Field::Address), "Rua 1, 100 - Centro");
    assert_eq!(first.get(Field::Description), "Apartamento 1-1 com varanda.");
    // The content frame's location, not the unchanging page URL
    assert_eq!(
        first.get(Field::DetailLink),
        "https://fake.example/detalhe?pagina=1&item=0"
    );
    assert_ne!(first.get(Field::DetailLink), fake_site::SEARCH_URL);
    assert!(first.missing().is_empty());

    let table = read_table(&config);
    assert_eq!(table.len(), 4);
    assert_eq!(
        table[0],
        "Name;Type;Total Area;Private Area;Bedrooms;Parking;Address;Description;Detail Link"
    );
    assert!(table[3].starts_with("Residencial 2-1;Apartamento;"));

    // Returned through the script anchor every time
    assert_eq!(journal.back_paths, vec!["anchor"; 3]);
    assert_eq!(journal.page_paths, vec![(2, "link")]);
    assert_eq!(site.view(), View::List { page: 2 });
}

#[tokio::test]
async fn test_form_filters_survive_reset_and_listeners() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let site = Arc::new(FakeSite::new(SiteOptions {
        clobber_type_on_change: true,
        items_per_page: vec![1],
        ..Default::default()
    }));

    let report = crawl(site.clone(), config).await;
    assert!(report.is_success(), "crawl failed: {:?}", report.error);

    let journal = site.journal();
    assert_eq!(journal.submitted.len(), 2);

    // Stage 1: named fields kept, everything else reset, boxes checked
    assert_eq!(journal.submitted_value(0, "estado"), Some("MG"));
    assert_eq!(journal.submitted_value(0, "cidade"), Some("BELO HORIZONTE"));
    assert_eq!(journal.submitted_value(0, "modalidade"), Some("INDIFERENTE"));
    // Resetting the sale mode redraws the boxes, so they are checked after it
    assert_eq!(journal.submitted_value(0, "checkboxes"), Some("all"));

    // Stage 2: the type outlives the reset pass and the listeners
    assert_eq!(
        journal.submitted_value(1, fake_site::TYPE_SELECT),
        Some("Apartamento")
    );
    assert_eq!(
        journal.submitted_value(1, fake_site::PRICE_SELECT),
        Some("DE R$200.000,01 ATÉ R$400.000,00")
    );
    assert_eq!(journal.submitted_value(1, "quartos"), Some("INDIFERENTE"));
    assert_eq!(journal.submitted_value(1, "vagas"), Some("Indiferente"));

    let session = &report.session;
    assert_eq!(session.applied_value("state"), Some("MG"));
    assert_eq!(session.applied_value("city"), Some("BELO HORIZONTE"));
    assert_eq!(session.applied_value("type"), Some("APARTAMENTO"));
    assert_eq!(session.applied_value("price band"), Some("3"));
    assert!(session.stage().is_terminal());
}

#[tokio::test]
async fn test_hidden_select_in_main_frame_is_skipped() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let site = Arc::new(FakeSite::new(SiteOptions {
        items_per_page: vec![1],
        hidden_select_in_main: true,
        ..Default::default()
    }));

    let report = crawl(site.clone(), config).await;
    assert!(report.is_success(), "crawl failed: {:?}", report.error);
    assert_eq!(site.journal().submitted_value(0, "estado"), Some("MG"));
}

#[tokio::test]
async fn test_missing_description_keeps_record() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let site = Arc::new(FakeSite::new(SiteOptions {
        items_per_page: vec![2],
        missing_description: vec![(1, 1)],
        ..Default::default()
    }));

    let report = crawl(site, config.clone()).await;
    assert!(report.is_success(), "crawl failed: {:?}", report.error);
    assert_eq!(report.records.len(), 2);

    let second = &report.records.as_slice()[1];
    assert_eq!(second.get(Field::Description), "not found");
    assert!(second.is_missing(Field::Description));
    assert_eq!(second.get(Field::Name), "Residencial 1-2");
    assert_eq!(report.stats.misses.get(&Field::Description), Some(&1));

    let table = read_table(&config);
    assert_eq!(table.len(), 3);
    assert!(table[2].contains(";not found;"));
}

#[tokio::test]
async fn test_single_page_defaults_to_first() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let site = Arc::new(FakeSite::new(SiteOptions {
        items_per_page: vec![3],
        ..Default::default()
    }));

    let report = crawl(site.clone(), config).await;
    assert!(report.is_success(), "crawl failed: {:?}", report.error);
    assert_eq!(report.session.page_indices(), &[1]);
    assert_eq!(report.records.len(), 3);
    assert_eq!(site.journal().visited_details, vec![(1, 0), (1, 1), (1, 2)]);
}

#[tokio::test]
async fn test_back_falls_back_to_caption() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let site = Arc::new(FakeSite::new(SiteOptions {
        items_per_page: vec![2],
        caption_only_back: vec![(1, 0)],
        ..Default::default()
    }));

    let report = crawl(site.clone(), config).await;
    assert!(report.is_success(), "crawl failed: {:?}", report.error);
    assert_eq!(report.records.len(), 2);
    assert_eq!(site.journal().back_paths, vec!["caption", "anchor"]);
}

#[tokio::test]
async fn test_dead_back_anchor_falls_through_to_caption() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let site = Arc::new(FakeSite::new(SiteOptions {
        dead_back_anchor: true,
        ..Default::default()
    }));

    let report = crawl(site.clone(), config).await;
    assert!(report.is_success(), "crawl failed: {:?}", report.error);
    assert_eq!(report.records.len(), 3);

    let journal = site.journal();
    assert_eq!(journal.back_paths, vec!["caption"; 3]);
    assert_eq!(journal.visited_details, vec![(1, 0), (1, 1), (2, 0)]);
}

#[tokio::test]
async fn test_dead_page_link_falls_through_to_text() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let site = Arc::new(FakeSite::new(SiteOptions {
        dead_page_links: true,
        ..Default::default()
    }));

    let report = crawl(site.clone(), config).await;
    assert!(report.is_success(), "crawl failed: {:?}", report.error);
    assert_eq!(report.stats.pages_visited, 2);

    let journal = site.journal();
    assert_eq!(journal.page_paths, vec![(2, "text")]);
    assert_eq!(journal.visited_details, vec![(1, 0), (1, 1), (2, 0)]);
}

#[tokio::test]
async fn test_labelled_page_links_found_by_text() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let site = Arc::new(FakeSite::new(SiteOptions {
        items_per_page: vec![1, 1, 1],
        labelled_page_links: true,
        ..Default::default()
    }));

    let report = crawl(site.clone(), config).await;
    assert!(report.is_success(), "crawl failed: {:?}", report.error);
    assert_eq!(report.session.page_indices(), &[1, 2, 3]);
    assert_eq!(site.journal().page_paths, vec![(2, "text"), (3, "text")]);
    assert_eq!(report.records.len(), 3);
}

#[tokio::test]
async fn test_price_band_by_option_text() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let site = Arc::new(FakeSite::new(SiteOptions {
        items_per_page: vec![1],
        unnamed_price_select: true,
        ..Default::default()
    }));

    let report = crawl(site.clone(), config).await;
    assert!(report.is_success(), "crawl failed: {:?}", report.error);

    let band = "DE R$200.000,01 ATÉ R$400.000,00";
    assert_eq!(report.session.applied_value("price band"), Some(band));
    let journal = site.journal();
    assert_eq!(
        journal.submitted_value(1, fake_site::UNNAMED_PRICE_SELECT),
        Some(band)
    );
    assert_eq!(journal.submitted_value(1, "quartos"), Some("INDIFERENTE"));
}

#[tokio::test]
async fn test_type_falls_back_to_named_select() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let site = Arc::new(FakeSite::new(SiteOptions {
        items_per_page: vec![1],
        type_caption_suffix: true,
        ..Default::default()
    }));

    let report = crawl(site.clone(), config).await;
    assert!(report.is_success(), "crawl failed: {:?}", report.error);

    // No option reads exactly "APARTAMENTO", so the named select takes the closest caption
    assert_eq!(
        report.session.applied_value("type"),
        Some("Apartamento (residencial)")
    );
    assert_eq!(
        site.journal().submitted_value(1, fake_site::TYPE_SELECT),
        Some("Apartamento (residencial)")
    );
    assert_eq!(report.records.len(), 1);
}

#[tokio::test]
async fn test_stage_two_reached_through_main_tree() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let site = Arc::new(FakeSite::new(SiteOptions {
        items_per_page: vec![1],
        nested_stage_two: true,
        ..Default::default()
    }));

    let report = crawl(site.clone(), config).await;
    assert!(report.is_success(), "crawl failed: {:?}", report.error);

    let journal = site.journal();
    assert!(journal.nested_calls > 0);
    assert_eq!(
        journal.submitted_value(1, fake_site::TYPE_SELECT),
        Some("Apartamento")
    );
    assert_eq!(report.records.len(), 1);
}

#[tokio::test]
async fn test_window_closed_mid_run_exports_partial() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let site = Arc::new(FakeSite::new(SiteOptions {
        close_on_detail: Some(2),
        ..Default::default()
    }));

    let report = crawl(site, config.clone()).await;

    assert!(matches!(report.error, Some(CrawlerError::BrowserClosed)));
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.exported_rows, Some(1));
    assert!(report.stats.finished_at.is_some());

    let table = read_table(&config);
    assert_eq!(table.len(), 2);
    assert!(table[1].starts_with("Residencial 1-1;"));
}

#[tokio::test]
async fn test_discard_policy_drops_partial() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.output.on_abort = AbortPolicy::Discard;
    let site = Arc::new(FakeSite::new(SiteOptions {
        close_on_detail: Some(2),
        ..Default::default()
    }));

    let report = crawl(site, config.clone()).await;

    assert!(matches!(report.error, Some(CrawlerError::BrowserClosed)));
    assert_eq!(report.exported_rows, None);
    assert!(!std::path::Path::new(&config.output.path).exists());

    // Still handed back to the caller
    assert_eq!(report.records.len(), 1);
}

#[tokio::test]
async fn test_type_mismatch_aborts_before_results() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let site = Arc::new(FakeSite::new(SiteOptions {
        type_never_sticks: true,
        ..Default::default()
    }));

    let report = crawl(site.clone(), config.clone()).await;

    match &report.error {
        Some(e @ CrawlerError::ValidationMismatch { field, actual, .. }) => {
            assert_eq!(field, "type");
            assert_eq!(actual, "INDIFERENTE");
            assert!(e.is_fatal());
        }
        other => panic!("expected a validation mismatch, got {:?}", other),
    }

    // Stage 2 was never submitted
    assert_eq!(site.journal().submitted.len(), 1);
    assert_eq!(site.view(), View::Stage2);
    assert!(report.records.is_empty());
    assert!(!std::path::Path::new(&config.output.path).exists());
}

#[tokio::test]
async fn test_empty_results_time_out() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let site = Arc::new(FakeSite::new(SiteOptions {
        items_per_page: Vec::new(),
        ..Default::default()
    }));

    let report = crawl(site, config).await;

    match report.error {
        Some(CrawlerError::DiscoveryTimeout { what, waited }) => {
            assert_eq!(what, "the result list");
            assert!(waited >= Duration::from_millis(300));
        }
        other => panic!("expected a discovery timeout, got {:?}", other),
    }
    assert!(report.records.is_empty());
    assert_eq!(report.exported_rows, None);
}

/// Exporter that keeps the rows in memory
struct MemoryExporter(Arc<Mutex<Vec<String>>>);

impl TabularExporter for MemoryExporter {
    fn export(&self, collection: &ResultCollection) -> ExportResult<usize> {
        let mut rows = self.0.lock().unwrap();
        for record in collection {
            rows.push(record.get(Field::Name).to_string());
        }
        Ok(collection.len())
    }

    fn destination(&self) -> String {
        "memory".to_string()
    }
}

#[tokio::test]
async fn test_coordinator_with_custom_exporter() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let site = Arc::new(FakeSite::new(SiteOptions {
        items_per_page: vec![1, 1],
        ..Default::default()
    }));
    let rows = Arc::new(Mutex::new(Vec::new()));

    let mut coordinator = Coordinator::new(site, config.clone())
        .with_exporter(Box::new(MemoryExporter(rows.clone())));
    coordinator.run().await.expect("crawl failed");

    assert_eq!(coordinator.records().len(), 2);
    assert_eq!(coordinator.exported_rows(), Some(2));
    assert_eq!(coordinator.stats().pages_visited, 2);
    assert_eq!(coordinator.session().page_indices(), &[1, 2]);
    assert_eq!(
        *rows.lock().unwrap(),
        vec!["Residencial 1-1".to_string(), "Residencial 2-1".to_string()]
    );
    assert!(!std::path::Path::new(&config.output.path).exists());
}

#[tokio::test]
async fn test_frame_resolution_by_option() {
    let site = FakeSite::new(SiteOptions::default());
    site.goto("https://fake.example/busca", Duration::from_secs(1))
        .await
        .unwrap();

    // The form lives in the child frame, not the main one
    let frame = find_frame_with_option(&site, "mg", PollPolicy::from_millis(10, 200))
        .await
        .unwrap();
    assert_eq!(frame, FrameId::new("content-1"));

    let err = find_frame_with_option(&site, "Casa", PollPolicy::from_millis(10, 50))
        .await
        .unwrap_err();
    assert!(matches!(err, CrawlerError::DiscoveryTimeout { .. }));
}

#[tokio::test]
async fn test_stale_frame_is_detached_after_navigation() {
    let site = FakeSite::new(SiteOptions::default());
    site.goto("https://fake.example/busca", Duration::from_secs(1))
        .await
        .unwrap();
    let old = site.frames().await.unwrap()[1].clone();

    site.goto("https://fake.example/busca", Duration::from_secs(1))
        .await
        .unwrap();

    let offers_mg = Probe::OptionInFrame {
        option: "MG".to_string(),
    };
    let err = site.probe(&old, &offers_mg).await.unwrap_err();
    assert!(matches!(err, DriverError::FrameDetached(_)));
    assert_eq!(site.journal().stale_frame_hits, 1);

    let fresh = site.frames().await.unwrap()[1].clone();
    assert!(site.probe(&fresh, &offers_mg).await.unwrap());
}
