use futures::future::join_all;
use parley_core::cache::{QaStore, ResponseCache, normalize_question};
use parley_infrastructure::JsonQaCache;
use std::fs;
use tempfile::TempDir;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_saves_are_all_persisted() {
    let temp_dir = TempDir::new().unwrap();
    let cache = JsonQaCache::open(temp_dir.path().join("data.json"))
        .await
        .expect("Should open store");

    let tasks = (0..24).map(|i| {
        let cache = cache.clone();
        tokio::spawn(async move {
            cache
                .save(&format!("Question number {i}?"), &format!("Answer {i}"))
                .await
        })
    });

    for result in join_all(tasks).await {
        result.expect("Task should not panic").expect("Save should succeed");
    }

    let raw = fs::read_to_string(cache.path()).unwrap();
    let store: QaStore = serde_json::from_str(&raw).expect("Store should stay parseable");
    assert_eq!(store.len(), 24);
    assert_eq!(store.metadata.total_pairs, 24);
    for i in 0..24 {
        let key = normalize_question(&format!("Question number {i}?"));
        assert_eq!(store.records[&key].answer, format!("Answer {i}"));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_partial_writes() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.json");
    let cache = JsonQaCache::open(path.clone()).await.unwrap();

    let writer = {
        let cache = cache.clone();
        tokio::spawn(async move {
            for i in 0..40 {
                cache
                    .save(&format!("q{i}"), &"long answer ".repeat(200))
                    .await
                    .unwrap();
            }
        })
    };

    // Raw reads bypass the lock entirely; atomic rename keeps them whole
    let reader = tokio::task::spawn_blocking(move || {
        for _ in 0..200 {
            let raw = fs::read_to_string(&path).unwrap();
            serde_json::from_str::<QaStore>(&raw).expect("File must always be complete");
        }
    });

    writer.await.unwrap();
    reader.await.unwrap();
    assert_eq!(cache.stats().await.unwrap().total_pairs, 40);
}

#[tokio::test]
async fn test_non_ascii_is_stored_readably() {
    let temp_dir = TempDir::new().unwrap();
    let cache = JsonQaCache::open(temp_dir.path().join("data.json")).await.unwrap();

    cache.save("مرحبا، كيف حالك؟", "أنا بخير، شكراً لسؤالك!").await.unwrap();

    let raw = fs::read_to_string(cache.path()).unwrap();
    assert!(raw.contains("أنا بخير"));
    assert_eq!(
        cache.lookup("مرحبا، كيف حالك؟").await.unwrap().as_deref(),
        Some("أنا بخير، شكراً لسؤالك!")
    );
}
