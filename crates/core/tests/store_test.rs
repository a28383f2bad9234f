use pretty_assertions::assert_eq;
use rizbot_core::errors::BotError;
use rizbot_core::models::participants::ParticipantList;
use rizbot_core::store::{JsonFileStore, ParticipantStore, load_non_empty};
use std::sync::Arc;
use tempfile::TempDir;

const MISSING: &str = "The participant list does not exist.";

fn store_in(dir: &TempDir) -> JsonFileStore {
    JsonFileStore::new(dir.path().join("list.json"))
}

#[tokio::test]
async fn test_missing_file_loads_as_none() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn test_save_overwrites_whole_file() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    store
        .save(&ParticipantList::from_ids(["1", "2", "3"]))
        .await
        .unwrap();
    store.save(&ParticipantList::from_ids(["9"])).await.unwrap();

    let on_disk = std::fs::read_to_string(store.path()).unwrap();
    assert_eq!(on_disk, "[\n    \"9\"\n]");
    assert_eq!(
        store.load().await.unwrap(),
        Some(ParticipantList::from_ids(["9"]))
    );
}

#[tokio::test]
async fn test_corrupt_file_is_reset_on_registration() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    std::fs::write(store.path(), "{ not a list").unwrap();

    assert!(matches!(store.load().await, Err(BotError::Json(_))));

    let update = store.update(Box::new(|_: &mut ParticipantList| false)).await.unwrap();
    assert!(update.list.is_empty());
    assert!(!update.changed);
    assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "[]");
}

#[tokio::test]
async fn test_load_non_empty_messages() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let err = load_non_empty(&store, MISSING, "The participant list is empty.")
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), Some("The participant list does not exist."));

    store.save(&ParticipantList::new()).await.unwrap();
    let err = load_non_empty(&store, MISSING, "The participant list is empty.")
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), Some("The participant list is empty."));

    store.save(&ParticipantList::from_ids(["7"])).await.unwrap();
    let list = load_non_empty(&store, MISSING, "The participant list is empty.")
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
}

#[tokio::test]
async fn test_update_saves_only_changes() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.save(&ParticipantList::from_ids(["1"])).await.unwrap();

    let update = store
        .update(Box::new(|list: &mut ParticipantList| list.register("2")))
        .await
        .unwrap();
    assert!(update.changed);
    assert_eq!(update.list, ParticipantList::from_ids(["1", "2"]));

    let update = store
        .update(Box::new(|list: &mut ParticipantList| list.register("2")))
        .await
        .unwrap();
    assert!(!update.changed);

    let update = store
        .update(Box::new(|list: &mut ParticipantList| list.cancel("1")))
        .await
        .unwrap();
    assert!(update.changed);
    assert_eq!(
        store.load().await.unwrap(),
        Some(ParticipantList::from_ids(["2"]))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_are_all_kept() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(store_in(&dir));

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .update(Box::new(move |list: &mut ParticipantList| {
                        list.register(i.to_string())
                    }))
                    .await
                    .unwrap()
            })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().changed);
    }

    let list = store.load().await.unwrap().unwrap();
    assert_eq!(list.len(), 20);
    for i in 0..20 {
        assert!(list.contains(&i.to_string()));
    }
}
