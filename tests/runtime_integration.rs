use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;
use jobsift::config::{Config, SettingsFile, SettingsUpdate, StoredSettings};
use jobsift::dom::{DomSurface, HtmlPage};
use jobsift::navigation::NavigationSignal;
use jobsift::orchestrator::{InboundMessage, MessageResponse, StatusReport};
use jobsift::runtime;

const LISTING: &str = "https://www.upwork.com/nx/find-work/best-matches";

fn page() -> HtmlPage {
    HtmlPage::parse(
        r#"<html><head><title>Best Matches</title></head><body>
            <div data-test="job-tile-list">
                <section><small data-test="client-spendings">$0 spent</small><strong data-test="proposals">Less than 5</strong></section>
                <section><small data-test="client-spendings">$500+ spent</small><strong data-test="proposals">10 to 15</strong></section>
                <section><small data-test="client-spendings">$3k+ spent</small><strong data-test="proposals">50+</strong></section>
            </div>
        </body></html>"#,
        LISTING,
    )
}

fn status(response: MessageResponse) -> StatusReport {
    match response {
        MessageResponse::Status(report) => report,
        other => panic!("expected status, got {:?}", other),
    }
}

async fn settings_file(dir: &TempDir, stored: Option<StoredSettings>) -> SettingsFile {
    let file = SettingsFile::new(dir.path().join("settings.json"));
    if let Some(stored) = stored {
        file.store(&stored).await.unwrap();
    }
    file
}

#[tokio::test(start_paused = true)]
async fn test_stored_settings_apply_at_startup() {
    let temp_dir = TempDir::new().unwrap();
    let stored = StoredSettings {
        minimum_spent: 1_000.0,
        auto_refresh_enabled: false,
        ..StoredSettings::default()
    };
    let file = settings_file(&temp_dir, Some(stored)).await;

    let (event_loop, handle) = runtime::start(Config::default(), &file, page())
        .await
        .unwrap();

    let client = async move {
        let report = status(handle.send_message(InboundMessage::GetStatus).await.unwrap());
        handle.shutdown().await.unwrap();
        report
    };
    let (orchestrator, report) = tokio::join!(event_loop.run(), client);

    assert_eq!(report.thresholds.minimum_spent, 1_000.0);
    assert!(!report.auto_refresh.enabled);
    assert_eq!(report.last_hidden_count, 2);
    assert_eq!(report.last_visible_count, 1);
    assert_eq!(orchestrator.pending_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_settings_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let file = settings_file(&temp_dir, None).await;

    let (event_loop, handle) = runtime::start(Config::default(), &file, page())
        .await
        .unwrap();

    let client = async move {
        let report = status(handle.send_message(InboundMessage::GetStatus).await.unwrap());
        handle.shutdown().await.unwrap();
        report
    };
    let (_, report) = tokio::join!(event_loop.run(), client);

    assert!(report.filtering_enabled);
    assert_eq!(report.thresholds.minimum_spent, 1.0);
    assert_eq!(report.auto_refresh.refresh_interval_ms, 60_000);
    assert_eq!(report.last_hidden_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_auto_refresh_reloads_listing_page() {
    let temp_dir = TempDir::new().unwrap();
    let file = settings_file(&temp_dir, None).await;
    let (event_loop, handle) = runtime::start(Config::default(), &file, page())
        .await
        .unwrap();

    let client = async move {
        sleep(Duration::from_millis(125_000)).await;
        handle.shutdown().await.unwrap();
    };
    let (orchestrator, _) = tokio::join!(event_loop.run(), client);

    assert_eq!(orchestrator.dom().reload_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_settings_message_stops_refresh_and_refilters() {
    let temp_dir = TempDir::new().unwrap();
    let file = settings_file(&temp_dir, None).await;
    let (event_loop, handle) = runtime::start(Config::default(), &file, page())
        .await
        .unwrap();

    let client = async move {
        let ack = handle
            .send_message(InboundMessage::SettingsUpdated {
                data: SettingsUpdate {
                    minimum_spent: 100.0,
                    proposals_min: 0,
                    proposals_max: 20,
                    filtering_enabled: None,
                    auto_refresh_enabled: Some(false),
                    auto_refresh_interval_ms: None,
                },
            })
            .await
            .unwrap();
        sleep(Duration::from_millis(180_000)).await;
        let report = status(handle.send_message(InboundMessage::GetStatus).await.unwrap());
        handle.shutdown().await.unwrap();
        (ack, report)
    };
    let (orchestrator, (ack, report)) = tokio::join!(event_loop.run(), client);

    assert_eq!(ack, MessageResponse::ok());
    // $0 fails on spend, "50+" falls outside 0..=20
    assert_eq!(report.last_hidden_count, 2);
    assert_eq!(report.last_visible_count, 1);
    assert_eq!(orchestrator.dom().reload_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_leaving_listing_stops_refresh() {
    let temp_dir = TempDir::new().unwrap();
    let file = settings_file(&temp_dir, None).await;
    let (event_loop, handle) = runtime::start(Config::default(), &file, page())
        .await
        .unwrap();

    let client = async move {
        handle
            .edit_page(|page: &mut HtmlPage| {
                page.navigate("https://www.upwork.com/freelancers/~01abc");
                Vec::new()
            })
            .await
            .unwrap();
        handle.navigate(NavigationSignal::HistoryPush).await.unwrap();
        sleep(Duration::from_millis(90_000)).await;
        handle.shutdown().await.unwrap();
    };
    let (orchestrator, _) = tokio::join!(event_loop.run(), client);

    assert_eq!(orchestrator.dom().reload_count(), 0);
    assert!(orchestrator.dom().location().contains("/freelancers/"));
}
