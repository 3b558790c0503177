use memoria_rs_memory::{
    ImportPayload, ImportRecord, InMemoryBackend, MemoryBackend, MemoryError, MemoryStore,
    RetentionPolicy, SearchOptions, SqliteBackend, Tagger, TaggerPipeline, TaggingPolicy, Tier,
};
use memoria_rs_test_utils::{
    FailPoint, FailingTagger, FixedTagger, FlakyBackend, PanickingTagger, RecordingTagger,
    SlowTagger, record_at, records_for,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

fn contents(records: &[memoria_rs_memory::MemoryRecord]) -> Vec<&str> {
    records.iter().map(|record| record.content.as_str()).collect()
}

fn bounded(backend: Arc<dyn MemoryBackend>, max_active: usize, batch: usize) -> MemoryStore {
    MemoryStore::new(backend)
        .with_retention(RetentionPolicy::new(max_active, batch).expect("policy"))
        .expect("store")
}

fn backends() -> Vec<Arc<dyn MemoryBackend>> {
    vec![
        Arc::new(InMemoryBackend::new()),
        Arc::new(SqliteBackend::open_in_memory().expect("sqlite")),
    ]
}

#[test]
fn oldest_records_move_to_archive_in_order() {
    for backend in backends() {
        let store = bounded(backend, 2, 1);
        for content in ["A", "B", "C", "D"] {
            store.add("u1", "user", content, None).expect("add");
        }

        let active = store.get("u1", None, false).expect("active");
        assert_eq!(contents(&active), vec!["D", "C"]);

        let all = store.get("u1", None, true).expect("all");
        assert_eq!(contents(&all), vec!["D", "C", "B", "A"]);

        let info = store.info().expect("info");
        assert_eq!(info.active_total, 2);
        assert_eq!(info.archive_total, 2);
    }
}

#[test]
fn get_limit_caps_each_tier() {
    let store = bounded(Arc::new(InMemoryBackend::new()), 3, 2);
    for idx in 0..8 {
        store.add("u1", "user", &format!("m{idx}"), None).expect("add");
    }
    let records = store.get("u1", Some(2), true).expect("get");
    assert_eq!(contents(&records), vec!["m7", "m6", "m4", "m3"]);
}

#[test]
fn users_are_isolated() {
    let store = bounded(Arc::new(InMemoryBackend::new()), 1, 1);
    store.add("u1", "user", "mine", None).expect("add");
    store.add("u2", "user", "theirs", None).expect("add");
    store.add("u2", "user", "theirs again", None).expect("add");

    assert_eq!(contents(&store.get("u1", None, true).expect("u1")), vec!["mine"]);
    assert_eq!(
        store.get("u2", None, false).expect("u2 active").len(),
        1
    );
    assert!(store.get("nobody", None, true).expect("nobody").is_empty());
}

#[test]
fn search_returns_active_matches_before_archive() {
    for backend in backends() {
        let store = bounded(backend, 2, 1);
        store.add("u1", "user", "I feel SAD", None).expect("add");
        store.add("u1", "user", "neutral", None).expect("add");
        store.add("u1", "user", "still sad", None).expect("add");
        store.add("u1", "user", "bright day", None).expect("add");

        let active_only = store
            .search("u1", "sad", SearchOptions::default())
            .expect("search");
        assert_eq!(contents(&active_only), vec!["still sad"]);

        let options = SearchOptions {
            include_archive: true,
            limit: None,
        };
        let everywhere = store.search("u1", "Sad", options).expect("search");
        assert_eq!(contents(&everywhere), vec!["still sad", "I feel SAD"]);

        let capped = SearchOptions {
            include_archive: true,
            limit: Some(1),
        };
        assert_eq!(store.search("u1", "sad", capped).expect("search").len(), 1);
    }
}

#[test]
fn get_relevant_never_reads_archive() {
    let store = bounded(Arc::new(InMemoryBackend::new()), 2, 1);
    for content in ["A", "B", "C"] {
        store.add("u1", "user", content, None).expect("add");
    }
    let relevant = store.get_relevant("u1", 10).expect("relevant");
    assert_eq!(contents(&relevant), vec!["C", "B"]);
    assert_eq!(contents(&store.get_relevant("u1", 1).expect("one")), vec!["C"]);
}

#[test]
fn tagger_failures_do_not_fail_add() {
    let recording = Arc::new(RecordingTagger::new());
    let store = MemoryStore::new(Arc::new(InMemoryBackend::new()))
        .with_tagger(Arc::new(FailingTagger))
        .with_tagger(Arc::new(PanickingTagger))
        .with_tagger(Arc::new(FixedTagger::new("mood", &["mood:sad", "caller"])))
        .with_tagger(recording.clone());

    let record = store
        .add("u1", "assistant", "hello", Some(vec!["caller".to_string()]))
        .expect("add");
    assert_eq!(record.tags, vec!["caller", "mood:sad"]);
    assert_eq!(
        recording.calls(),
        vec![("u1".to_string(), "assistant".to_string(), "hello".to_string())]
    );

    let stored = store.get("u1", None, false).expect("get");
    assert_eq!(stored, vec![record]);
}

#[test]
fn slow_tagger_still_contributes_tags() {
    let slow: Arc<dyn Tagger> = Arc::new(SlowTagger::new(Duration::from_millis(5)));
    let pipeline = TaggerPipeline::new(vec![slow]).with_policy(TaggingPolicy {
        slow_tagger_warn: Some(Duration::from_millis(1)),
    });
    let store = MemoryStore::new(Arc::new(InMemoryBackend::new())).with_taggers(pipeline);
    let record = store.add("u1", "user", "hello", None).expect("add");
    assert_eq!(record.tags, vec!["slow"]);
}

#[test]
fn get_concatenates_tiers_even_when_archive_is_newer() {
    for backend in backends() {
        let store = MemoryStore::new(backend);
        let payload = ImportPayload {
            active: vec![record_at("u1", "older active", 0).into()],
            archive: vec![record_at("u1", "newer archive", 60).into()],
        };
        store.import(payload, true).expect("import");

        let records = store.get("u1", None, true).expect("get");
        assert_eq!(contents(&records), vec!["older active", "newer archive"]);
        assert_eq!(store.get_relevant("u1", 5).expect("relevant").len(), 1);
    }
}

#[test]
fn export_import_round_trip_preserves_records() {
    let dir = tempdir().expect("tempdir");
    let source = bounded(
        Arc::new(SqliteBackend::open(dir.path().join("source.db")).expect("open")),
        2,
        1,
    );
    for content in ["one", "two", "three"] {
        source.add("u1", "user", content, None).expect("add");
    }
    source.add("u2", "system", "other", None).expect("add");
    let export = source.export(None).expect("export");
    assert_eq!(export.active.len(), 3);
    assert_eq!(export.archive.len(), 1);

    let target = MemoryStore::new(Arc::new(InMemoryBackend::new()));
    target.import(export.clone().into(), false).expect("import");
    assert_eq!(target.export(None).expect("re-export"), export);

    let only_u2 = target.export(Some("u2")).expect("u2 export");
    assert_eq!(contents(&only_u2.active), vec!["other"]);
    assert!(only_u2.archive.is_empty());
}

#[test]
fn merge_import_upserts_and_replace_import_wipes() {
    let store = MemoryStore::new(Arc::new(InMemoryBackend::new()));
    let kept = store.add("u1", "user", "kept", None).expect("add");

    let mut rows = records_for("u2", &["first", "second"]);
    let payload = ImportPayload {
        active: rows.iter().cloned().map(ImportRecord::from).collect(),
        archive: Vec::new(),
    };
    store.import(payload, true).expect("merge");
    assert_eq!(store.info().expect("info").active_total, 3);

    rows[0].content = "first, edited".to_string();
    let payload = ImportPayload {
        active: Vec::new(),
        archive: vec![ImportRecord::from(rows[0].clone())],
    };
    store.import(payload, true).expect("move");
    let u2 = store.get("u2", None, true).expect("u2");
    assert_eq!(contents(&u2), vec!["second", "first, edited"]);

    let payload = ImportPayload {
        active: vec![ImportRecord::from(rows[1].clone())],
        archive: Vec::new(),
    };
    store.import(payload, false).expect("replace");
    assert!(store.get("u1", None, true).expect("u1").is_empty());
    assert!(!store.export(None).expect("export").active.contains(&kept));
    assert_eq!(store.info().expect("info").active_total, 1);
}

#[test]
fn concurrent_adds_keep_the_bound() {
    for backend in backends() {
        let store = Arc::new(bounded(backend, 7, 3));
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = Arc::clone(&store);
                let user_id = if worker % 2 == 0 { "even" } else { "odd" };
                thread::spawn(move || {
                    for idx in 0..30 {
                        store
                            .add(user_id, "user", &format!("w{worker}-{idx}"), None)
                            .expect("add");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("join");
        }

        let info = store.info().expect("info");
        assert_eq!(info.active_total, 14);
        assert_eq!(info.archive_total, 226);
        for user_id in ["even", "odd"] {
            assert_eq!(store.get(user_id, None, false).expect("active").len(), 7);
        }

        let export = store.export(None).expect("export");
        let ids: HashSet<_> = export
            .active
            .iter()
            .chain(&export.archive)
            .map(|record| record.id)
            .collect();
        assert_eq!(ids.len(), 240);

        let copy = MemoryStore::new(Arc::new(InMemoryBackend::new()));
        copy.import(export.clone().into(), false).expect("import");
        assert_eq!(copy.export(None).expect("re-export"), export);
    }
}

#[test]
fn failed_migration_keeps_record_and_heals_on_next_add() {
    let backend = Arc::new(FlakyBackend::new());
    let store = bounded(backend.clone(), 2, 1);
    store.add("u1", "user", "A", None).expect("add");
    store.add("u1", "user", "B", None).expect("add");

    backend.fail(FailPoint::Archive, 1);
    let err = store.add("u1", "user", "C", None).unwrap_err();
    assert!(matches!(err, MemoryError::StorageUnavailable(_)));
    assert_eq!(backend.count(Tier::Active, Some("u1")).expect("count"), 3);
    assert_eq!(backend.count(Tier::Archive, Some("u1")).expect("count"), 0);

    store.add("u1", "user", "D", None).expect("add");
    let all = store.get("u1", None, true).expect("all");
    assert_eq!(contents(&all), vec!["D", "C", "B", "A"]);
    assert_eq!(backend.count(Tier::Active, Some("u1")).expect("count"), 2);
}

#[test]
fn failed_insert_stores_nothing() {
    let backend = Arc::new(FlakyBackend::new());
    let store = MemoryStore::new(backend.clone());
    backend.fail(FailPoint::Insert, 1);
    assert!(matches!(
        store.add("u1", "user", "lost", None),
        Err(MemoryError::StorageUnavailable(_))
    ));
    assert_eq!(backend.archive_calls(), 0);
    assert!(store.get("u1", None, true).expect("get").is_empty());
}

#[test]
fn sqlite_store_survives_reopen() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("memory.db");
    {
        let store = bounded(Arc::new(SqliteBackend::open(&path).expect("open")), 1, 1);
        store.add("u1", "user", "before", None).expect("add");
        store.add("u1", "user", "after", None).expect("add");
    }
    let store = MemoryStore::new(Arc::new(SqliteBackend::open(&path).expect("reopen")));
    let all = store.get("u1", None, true).expect("get");
    assert_eq!(contents(&all), vec!["after", "before"]);
}
