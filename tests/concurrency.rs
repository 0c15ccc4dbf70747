use callconf::{ConfigSnapshot, ConfigStore, StoreSettings, UpdateRequest};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

const WRITERS: usize = 16;

fn open(dir: &TempDir) -> Arc<ConfigStore> {
    ConfigStore::open(StoreSettings::at(dir.path().join("config.json")))
}

/// Writer `i` always sets both fields together, so a reader seeing one
/// without the other has observed a torn update.
fn paired_update(i: usize) -> UpdateRequest {
    UpdateRequest::new()
        .caller_name(format!("caller-{}", i))
        .tts_language(format!("lang-{}", i))
        .extension(format!("writer_{}", i), json!(i))
}

fn assert_not_torn(snapshot: &ConfigSnapshot) {
    let caller = snapshot.caller_name();
    if let Some(id) = caller.strip_prefix("caller-") {
        assert_eq!(snapshot.tts_language(), format!("lang-{}", id));
        assert_eq!(
            snapshot.get(&format!("writer_{}", id)),
            Some(json!(id.parse::<usize>().unwrap()))
        );
    } else {
        assert_eq!(caller, "Guest");
        assert_eq!(snapshot.tts_language(), "en");
    }
}

fn read_file(store: &ConfigStore) -> ConfigSnapshot {
    serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap()
}

#[test]
fn test_concurrent_disjoint_updates_all_land() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut previous = 0.0;
            while !done.load(Ordering::SeqCst) {
                let snapshot = store.load();
                assert_not_torn(&snapshot);
                assert!(snapshot.last_updated() >= previous);
                previous = snapshot.last_updated();
            }
        })
    };

    let writers: Vec<_> = (0..WRITERS)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.update(paired_update(i)).unwrap())
        })
        .collect();

    for writer in writers {
        let outcome = writer.join().unwrap();
        assert!(!outcome.persistence.is_degraded());
        assert_not_torn(&outcome.snapshot);
    }
    done.store(true, Ordering::SeqCst);
    reader.join().unwrap();

    let last = store.load();
    for i in 0..WRITERS {
        assert_eq!(last.get(&format!("writer_{}", i)), Some(json!(i)));
    }
    assert_not_torn(&last);

    // The file holds the final snapshot, not an earlier one.
    assert_eq!(read_file(&store), last);
}

#[test]
fn test_updates_apply_in_commit_order() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);

    store
        .update(UpdateRequest::new().caller_name("Alice").tts_emotion("Happy"))
        .unwrap();
    store
        .update(UpdateRequest::new().tts_emotion("Sad").extension("room", json!("r1")))
        .unwrap();
    store
        .update(UpdateRequest::new().extension("room", json!("r2")))
        .unwrap();

    let snapshot = store.load();
    assert_eq!(snapshot.caller_name(), "Alice");
    assert_eq!(snapshot.tts_emotion(), "Sad");
    assert_eq!(snapshot.get("room"), Some(json!("r2")));
    assert_eq!(read_file(&store), snapshot);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_async_updates_share_the_store() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let handle = store.to_async();

    let writers: Vec<_> = (0..WRITERS)
        .map(|i| {
            let handle = handle.clone();
            tokio::spawn(async move { handle.update(paired_update(i)).await })
        })
        .collect();
    let readers: Vec<_> = (0..WRITERS)
        .map(|_| {
            let handle = handle.clone();
            tokio::spawn(async move { handle.load().await })
        })
        .collect();

    for writer in writers {
        let outcome = writer.await.unwrap().unwrap();
        assert_not_torn(&outcome.snapshot);
    }
    for reader in readers {
        assert_not_torn(&reader.await.unwrap());
    }

    // Blocking and async surfaces see the same instance.
    let from_async = handle.load().await;
    assert_eq!(from_async, store.load());
    for i in 0..WRITERS {
        assert_eq!(
            handle.get(&format!("writer_{}", i), json!(null)).await,
            json!(i)
        );
    }
}

#[tokio::test]
async fn test_async_session_and_reset() {
    let dir = TempDir::new().unwrap();
    let handle = open(&dir).to_async();

    handle
        .update(UpdateRequest::new().caller_name("Alice").tts_emotion("Excited"))
        .await
        .unwrap();
    let session = handle.begin_session().await;

    let reset = handle.reset().await.unwrap();
    assert_eq!(reset.snapshot.caller_name(), "Guest");

    assert_eq!(session.caller_name(), "Alice");
    assert_eq!(session.emotion(), callconf::TtsEmotion::Excited);
    assert_eq!(handle.get_str("caller_name", "x").await, "Guest");
}

#[test]
fn test_two_handles_on_one_file() {
    // Request handler and worker in separate processes, modelled as two
    // stores over the same canonical file.
    let dir = TempDir::new().unwrap();
    let handler = open(&dir);
    let worker = open(&dir);

    handler
        .update(UpdateRequest::new().caller_name("Alice").agent_instructions("Be brief."))
        .unwrap();

    let session = worker.begin_session();
    assert_eq!(session.caller_name(), "Alice");
    assert_eq!(session.instructions(), "Be brief.");
}
