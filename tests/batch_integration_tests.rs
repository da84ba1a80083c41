//! End-to-end tests for the translate batch
//!
//! These tests drive the full pipeline: folder discovery, eligibility
//! checks, the chat-completion call over HTTP (mocked), the backup-then-
//! rewrite file sequence, and the state/metrics bookkeeping. They verify:
//! - Mixed batches classify every folder correctly
//! - Re-running a batch never re-translates a processed folder
//! - Provider failure marks the folder failed and leaves it untouched
//! - Cancellation before the run makes no network calls
//! - Outcome events arrive in folder order

use camino::{Utf8Path, Utf8PathBuf};
use rimnamer::models::FolderStatus;
use rimnamer::providers::{ProviderKind, ProviderSettings, RetryPolicy, create_provider_with_policy};
use rimnamer::services::metadata::{ABOUT_DIR, ABOUT_FILE, BACKUP_FILE};
use rimnamer::services::{BatchOptions, TranslateService, discover_mod_folders, run_batch};
use rimnamer::{StateChange, StateManager};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tempfile::TempDir;
use tokio::sync::watch;
use tokio::time::{Duration, timeout};

fn workshop() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, root)
}

fn about_xml(name: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <ModMetaData>\n  <name>{name}</name>\n  \
         <description>Adds a full firearms pack.</description>\n</ModMetaData>\n"
    )
}

fn write_mod(root: &Utf8Path, folder: &str, name: &str) -> Utf8PathBuf {
    let about = root.join(folder).join(ABOUT_DIR);
    fs::create_dir_all(&about).unwrap();
    fs::write(about.join(ABOUT_FILE), about_xml(name)).unwrap();
    about
}

/// Provider wired to the mock server, with a millisecond retry schedule.
fn test_provider(server_url: &str) -> Arc<dyn rimnamer::ChatProvider> {
    let settings = ProviderSettings {
        kind: ProviderKind::Glm,
        api_key: "test-key".to_string(),
        base_url_override: Some(server_url.to_string()),
    };
    let policy = RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(10),
    };
    create_provider_with_policy(&settings, policy).unwrap()
}

fn quick_options() -> BatchOptions {
    BatchOptions {
        courtesy_delay: Duration::from_millis(5),
    }
}

fn completion_body(content: &str) -> String {
    format!(
        r#"{{"choices":[{{"message":{{"role":"assistant","content":"{content}"}}}}]}}"#
    )
}

#[tokio::test]
async fn test_translate_batch_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body("整合武器包"))
        .expect(1)
        .create_async()
        .await;

    let (_temp_dir, root) = workshop();
    // Eligible English-named mod, already-Chinese mod, folder with no About.xml.
    let eligible = write_mod(&root, "100000001", "RimGuns");
    let chinese = write_mod(&root, "100000002", "中文模组");
    fs::create_dir_all(root.join("100000003").join(ABOUT_DIR)).unwrap();

    let state = Arc::new(StateManager::new());
    let provider = test_provider(&server.url());
    let service = TranslateService::new(provider, state.metrics());

    let folders = discover_mod_folders(&root).unwrap();
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let summary = run_batch(&service, &folders, &state, cancel_rx, &quick_options()).await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 1);

    // The eligible mod has the summary as its name and the original bytes
    // preserved in the backup slot.
    let rewritten = fs::read_to_string(eligible.join(ABOUT_FILE)).unwrap();
    assert!(rewritten.contains("<name>整合武器包</name>"), "{rewritten}");
    assert!(rewritten.contains("Adds a full firearms pack."));
    assert_eq!(
        fs::read_to_string(eligible.join(BACKUP_FILE)).unwrap(),
        about_xml("RimGuns")
    );

    // The Chinese-named mod is untouched.
    assert_eq!(
        fs::read_to_string(chinese.join(ABOUT_FILE)).unwrap(),
        about_xml("中文模组")
    );
    assert!(!chinese.join(BACKUP_FILE).exists());

    let snapshot = state.snapshot();
    assert!(snapshot.succeeded_folders.contains("100000001"));
    assert!(snapshot.skipped_folders.contains("100000002"));
    assert!(snapshot.failed_folders.contains("100000003"));

    // Exactly one completion call went over the wire.
    let metrics = state.metrics();
    assert_eq!(metrics.provider_calls.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.provider_failures.load(Ordering::Relaxed), 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_translate_batch_is_idempotent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body("新名字"))
        .expect(1)
        .create_async()
        .await;

    let (_temp_dir, root) = workshop();
    let about = write_mod(&root, "200000001", "Some Mod");

    let state = Arc::new(StateManager::new());
    let provider = test_provider(&server.url());
    let service = TranslateService::new(provider, state.metrics());
    let folders = discover_mod_folders(&root).unwrap();

    let (_tx1, rx1) = watch::channel(false);
    let first = run_batch(&service, &folders, &state, rx1, &quick_options()).await;
    assert_eq!(first.succeeded, 1);

    let renamed = fs::read_to_string(about.join(ABOUT_FILE)).unwrap();
    assert!(renamed.contains("新名字"));

    // Second run: the backup marks the folder as processed, so nothing is
    // translated again and the files stay as the first run left them.
    let (_tx2, rx2) = watch::channel(false);
    let second = run_batch(&service, &folders, &state, rx2, &quick_options()).await;
    assert_eq!(second.succeeded, 0);
    assert_eq!(second.skipped, 1);

    assert_eq!(fs::read_to_string(about.join(ABOUT_FILE)).unwrap(), renamed);

    // Still exactly one call in total.
    mock.assert_async().await;
}

#[tokio::test]
async fn test_provider_failure_leaves_folder_untouched() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body("upstream exploded")
        .expect(3)
        .create_async()
        .await;

    let (_temp_dir, root) = workshop();
    let about = write_mod(&root, "300000001", "Doomed Mod");

    let state = Arc::new(StateManager::new());
    let provider = test_provider(&server.url());
    let service = TranslateService::new(provider, state.metrics());
    let folders = discover_mod_folders(&root).unwrap();

    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let summary = run_batch(&service, &folders, &state, cancel_rx, &quick_options()).await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 0);

    // No backup, no rewrite: the folder looks exactly as before the run.
    assert_eq!(
        fs::read_to_string(about.join(ABOUT_FILE)).unwrap(),
        about_xml("Doomed Mod")
    );
    assert!(!about.join(BACKUP_FILE).exists());

    let metrics = state.metrics();
    assert_eq!(metrics.provider_calls.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.provider_failures.load(Ordering::Relaxed), 1);

    // All three retry attempts reached the server.
    mock.assert_async().await;
}

#[tokio::test]
async fn test_cancelled_translate_batch_makes_no_calls() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(completion_body("不该出现"))
        .expect(0)
        .create_async()
        .await;

    let (_temp_dir, root) = workshop();
    write_mod(&root, "400000001", "Mod A");
    write_mod(&root, "400000002", "Mod B");

    let state = Arc::new(StateManager::new());
    let provider = test_provider(&server.url());
    let service = TranslateService::new(provider, state.metrics());
    let folders = discover_mod_folders(&root).unwrap();

    let (cancel_tx, cancel_rx) = watch::channel(false);
    cancel_tx.send(true).unwrap();

    let summary = run_batch(&service, &folders, &state, cancel_rx, &quick_options()).await;

    assert!(summary.cancelled);
    assert_eq!(summary.processed(), 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_outcome_events_arrive_in_folder_order() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body("译名"))
        .expect(2)
        .create_async()
        .await;

    let (_temp_dir, root) = workshop();
    write_mod(&root, "500000001", "First Mod");
    write_mod(&root, "500000002", "中文模组");
    write_mod(&root, "500000003", "Third Mod");

    let state = Arc::new(StateManager::new());
    let mut rx = state.subscribe();

    let provider = test_provider(&server.url());
    let service = TranslateService::new(provider, state.metrics());
    let folders = discover_mod_folders(&root).unwrap();

    let (_cancel_tx, cancel_rx) = watch::channel(false);
    run_batch(&service, &folders, &state, cancel_rx, &quick_options()).await;

    // Collect the per-folder outcome events; the buffer (100) easily holds
    // a three-folder run.
    let mut outcomes = Vec::new();
    while outcomes.len() < 3 {
        match timeout(Duration::from_millis(200), rx.recv()).await {
            Ok(Ok(StateChange::FolderProcessed { folder, status, .. })) => {
                outcomes.push((folder, status));
            }
            Ok(Ok(_)) => continue,
            _ => break,
        }
    }

    assert_eq!(
        outcomes,
        vec![
            ("500000001".to_string(), FolderStatus::Succeeded),
            ("500000002".to_string(), FolderStatus::Skipped),
            ("500000003".to_string(), FolderStatus::Succeeded),
        ]
    );
}
