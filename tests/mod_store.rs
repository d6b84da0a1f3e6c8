use bson::{Bson, doc};
use cappedlite::errors::DbError;
use cappedlite::query::{CursorOptions, Filter, QueryDescriptor};
use cappedlite::store::{
    CappedOptions, CappedStore, CollectionOptions, MemoryStore, ReadHandle, RecordSink,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn tailing(ms: u64) -> QueryDescriptor {
    QueryDescriptor::new(
        Filter::True,
        CursorOptions { max_await: Some(Duration::from_millis(ms)), ..CursorOptions::tailing() },
    )
}

#[test]
fn capped_flag_follows_creation_options() {
    let store = MemoryStore::new();
    store.create_capped("c", CappedOptions::by_count(3)).unwrap();
    store.create_collection("p", CollectionOptions::default()).unwrap();
    assert!(store.is_capped("c").unwrap());
    assert!(!store.is_capped("p").unwrap());
    assert!(matches!(store.is_capped("nope"), Err(DbError::NoSuchCollection(_))));
    assert!(matches!(
        store.create_capped("c", CappedOptions::by_count(3)),
        Err(DbError::CollectionAlreadyExists(_))
    ));
    assert_eq!(store.collection_names(), ["c", "p"]);
}

#[test]
fn plain_collections_never_trim() {
    let store = MemoryStore::new();
    store.create_collection("p", CollectionOptions::default()).unwrap();
    for i in 0..50 {
        store.insert("p", doc! {"i": i}).unwrap();
    }
    assert_eq!(store.len("p").unwrap(), 50);
    assert_eq!(store.trimmed("p").unwrap(), 0);
}

#[test]
fn user_ids_are_kept() {
    let store = MemoryStore::new();
    store.create_capped("c", CappedOptions::by_count(3)).unwrap();
    let id = store.insert("c", doc! {"_id": "custom", "v": 1}).unwrap();
    assert_eq!(id, Bson::String("custom".into()));
    let ids = store.insert_many("c", vec![doc! {"v": 2}, doc! {"v": 3}]).unwrap();
    assert!(ids.iter().all(|i| matches!(i, Bson::ObjectId(_))));
    assert_eq!(store.find("c", &Filter::eq("v", 1)).unwrap()[0].get_str("_id").unwrap(), "custom");
}

#[test]
fn handle_returns_only_matching_records_in_order() {
    let store = MemoryStore::new();
    store.create_capped("c", CappedOptions::by_count(10)).unwrap();
    for (i, kind) in ["a", "b", "a", "b", "a"].iter().enumerate() {
        store.insert("c", doc! {"i": i as i32, "kind": *kind}).unwrap();
    }
    let q = QueryDescriptor::new(Filter::eq("kind", "a"), CursorOptions::default());
    let mut h = store.open_tailable("c", &q).unwrap();
    let mut seen = Vec::new();
    while let Some(d) = h.try_next().unwrap() {
        seen.push(d.get_i32("i").unwrap());
    }
    assert_eq!(seen, [0, 2, 4]);
    assert!(!h.is_alive());
}

#[test]
fn await_window_bounds_an_empty_pull() {
    let store = MemoryStore::new();
    store.create_capped("c", CappedOptions::by_count(10)).unwrap();
    store.insert("c", doc! {"i": 0}).unwrap();
    let mut h = store.open_tailable("c", &tailing(60)).unwrap();
    assert!(h.try_next().unwrap().is_some());
    let started = Instant::now();
    assert!(h.try_next().unwrap().is_none());
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(55), "{waited:?}");
    assert!(waited < Duration::from_millis(500), "{waited:?}");
    assert!(h.is_alive());
}

#[test]
fn handles_work_across_threads_through_arc() {
    let store = Arc::new(MemoryStore::new());
    store.create_capped("c", CappedOptions::by_count(10)).unwrap();
    store.insert("c", doc! {"i": 0}).unwrap();
    let mut h = store.open_tailable("c", &tailing(1000)).unwrap();
    assert!(h.try_next().unwrap().is_some());
    let writer = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            store.insert("c", doc! {"i": 1}).unwrap();
        })
    };
    let got = h.try_next().unwrap();
    writer.join().unwrap();
    assert_eq!(got.unwrap().get_i32("i").unwrap(), 1);
}

#[test]
fn dropping_a_collection_kills_open_handles() {
    let store = MemoryStore::new();
    store.create_capped("c", CappedOptions::by_count(10)).unwrap();
    store.insert("c", doc! {"i": 0}).unwrap();
    let mut h = store.open_tailable("c", &tailing(10)).unwrap();
    assert!(h.try_next().unwrap().is_some());
    assert!(store.drop_collection("c"));
    assert!(h.try_next().unwrap().is_none());
    assert!(!h.is_alive());
    assert!(matches!(store.insert("c", doc! {}), Err(DbError::NoSuchCollection(_))));
    h.close();
    h.close();
    assert_eq!(store.open_handles(), 0);
}
