use std::{
    fs,
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use core_types::{
    CleanupRecord, ControlSignal, InstructionBatch, LifecycleEvent, Record, StorageNodeRef,
    WriterState,
};
use instruction_writer::{
    Error, InstructionBus, InstructionWriter, WriterDependencies, WriterSettings,
    cleanup::{ChannelCleanupListener, CleanupListener, RecordingCleanupListener},
    metrics::InMemoryMetrics,
    spool_fs_ops::mock::MockSpoolFileSystemOps,
};
use tempfile::tempdir;

const TEST_INSTANCE: &str = "zone-test";

fn record(key: &str, shards: &[&str], fields: &[Option<&str>]) -> Record {
    Record::new(
        key,
        10,
        shards.iter().map(|n| StorageNodeRef::new(*n)).collect(),
        fields.iter().map(|f| f.map(String::from)).collect(),
    )
}

fn k1(shards: &[&str]) -> Record {
    record("k1", shards, &[Some("acct1"), Some("obj1")])
}

fn start_writer(root: &Path, cleanup: &RecordingCleanupListener) -> InstructionWriter {
    let deps = WriterDependencies::new(Arc::new(cleanup.clone()));
    InstructionWriter::start(
        WriterSettings::new(root, TEST_INSTANCE),
        Arc::new(InstructionBus::new()),
        deps,
    )
    .unwrap()
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    paths.sort();
    paths
}

#[async_std::test]
async fn test_first_node_batch_writes_file_without_cleanup() {
    let temp_dir = tempdir().unwrap();
    let cleanup = RecordingCleanupListener::new();
    let writer = start_writer(temp_dir.path(), &cleanup);

    let report = writer
        .dispatch(InstructionBatch::new("s1", vec![k1(&["s1", "s2"])]))
        .unwrap()
        .await
        .unwrap();

    assert_eq!(
        writer.records().remaining("k1"),
        Some(vec![StorageNodeRef::new("s2")])
    );
    assert!(cleanup.received().is_empty());
    assert_eq!(fs::read_to_string(&report.path).unwrap(), "mako\ts1\tacct1\tobj1\n");

    let name = report.path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.contains(&format!("-{}-X-", TEST_INSTANCE)));
    assert!(name.ends_with("-mako-s1"));
    assert_eq!(files_in(&temp_dir.path().join("s1")), vec![report.path.clone()]);
    assert!(files_in(&temp_dir.path().join("s1.tmp")).is_empty());
}

#[async_std::test]
async fn test_last_node_batch_emits_cleanup() {
    let temp_dir = tempdir().unwrap();
    let cleanup = RecordingCleanupListener::new();
    let writer = start_writer(temp_dir.path(), &cleanup);

    writer
        .dispatch(InstructionBatch::new("s1", vec![k1(&["s1", "s2"])]))
        .unwrap()
        .await
        .unwrap();
    let report = writer
        .dispatch(InstructionBatch::new("s2", vec![k1(&["s2"])]))
        .unwrap()
        .await
        .unwrap();

    assert_eq!(writer.records().remaining("k1"), Some(vec![]));
    assert_eq!(report.cleaned, vec![CleanupRecord::drained("k1", 10)]);
    assert_eq!(cleanup.received(), vec![vec![CleanupRecord::drained("k1", 10)]]);
    assert!(report.path.exists());
}

#[async_std::test]
async fn test_missing_field_still_written() {
    let temp_dir = tempdir().unwrap();
    let cleanup = RecordingCleanupListener::new();
    let writer = start_writer(temp_dir.path(), &cleanup);

    let report = writer
        .dispatch(InstructionBatch::new(
            "s1",
            vec![record("k2", &["s1"], &[None, Some("obj2")])],
        ))
        .unwrap()
        .await
        .unwrap();

    assert_eq!(report.validation_warnings, 1);
    assert_eq!(fs::read_to_string(&report.path).unwrap(), "mako\ts1\t\tobj2\n");
    assert_eq!(cleanup.all_records(), vec![CleanupRecord::drained("k2", 10)]);
}

#[async_std::test]
async fn test_repeated_shutdown_keeps_state() {
    let temp_dir = tempdir().unwrap();
    let cleanup = RecordingCleanupListener::new();
    let writer = start_writer(temp_dir.path(), &cleanup);
    let events = writer.lifecycle_events();

    assert_eq!(writer.signal(ControlSignal::Shutdown), WriterState::Shutdown);
    assert_eq!(writer.signal(ControlSignal::Shutdown), WriterState::Shutdown);

    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        vec![LifecycleEvent::Running, LifecycleEvent::Shutdown]
    );
    assert!(writer.dispatch(InstructionBatch::new("s1", vec![k1(&["s1"])])).is_none());
}

#[async_std::test]
async fn test_scratch_name_collision_fails_batch() {
    let fs_ops = MockSpoolFileSystemOps::new();
    // every exclusive create collides, as if the file were already present
    fs_ops.fail_write_with(io::ErrorKind::AlreadyExists);
    let temp_dir = tempdir().unwrap();
    let cleanup = RecordingCleanupListener::new();
    let deps = WriterDependencies::new(Arc::new(cleanup.clone())).with_fs_ops(Arc::new(fs_ops.clone()));
    let writer = InstructionWriter::start(
        WriterSettings::new(temp_dir.path(), TEST_INSTANCE),
        Arc::new(InstructionBus::new()),
        deps,
    )
    .unwrap();

    let result = writer
        .dispatch(InstructionBatch::new("s1", vec![k1(&["s1"])]))
        .unwrap()
        .await;

    match result {
        Err(Error::WriteError(msg)) => {
            assert!(msg.contains(&temp_dir.path().join("s1.tmp").display().to_string()));
        }
        other => panic!("Expected WriteError, got {:?}", other),
    }
    assert!(cleanup.received().is_empty());
    assert!(!writer.records().is_cleaned("k1"));
    assert!(fs_ops.renames().is_empty());
}

#[async_std::test]
async fn test_paused_writer_does_not_accept_batches() {
    let temp_dir = tempdir().unwrap();
    let cleanup = RecordingCleanupListener::new();
    let writer = start_writer(temp_dir.path(), &cleanup);

    writer.pause();
    assert!(writer.dispatch(InstructionBatch::new("s1", vec![k1(&["s1"])])).is_none());
    assert!(writer.records().is_empty());
    assert!(!temp_dir.path().join("s1").exists());

    // the producer redelivers after resume; it is processed exactly once
    writer.resume();
    let report = writer
        .dispatch(InstructionBatch::new("s1", vec![k1(&["s1"])]))
        .unwrap()
        .await
        .unwrap();
    assert_eq!(report.cleaned.len(), 1);
    assert_eq!(files_in(&temp_dir.path().join("s1")).len(), 1);
}

#[async_std::test]
async fn test_in_flight_write_completes_after_shutdown() {
    let temp_dir = tempdir().unwrap();
    let cleanup = RecordingCleanupListener::new();
    let writer = start_writer(temp_dir.path(), &cleanup);

    let handle = writer
        .dispatch(InstructionBatch::new("s1", vec![k1(&["s1"])]))
        .unwrap();
    writer.shutdown();

    let report = handle.await.unwrap();
    assert!(report.path.exists());
    assert_eq!(cleanup.received().len(), 1);
}

#[async_std::test]
async fn test_concurrent_batches_drain_shared_record_once() {
    let temp_dir = tempdir().unwrap();
    let cleanup = RecordingCleanupListener::new();
    let metrics = InMemoryMetrics::new();
    let deps = WriterDependencies::new(Arc::new(cleanup.clone()))
        .with_metrics(Arc::new(metrics.clone()));
    let writer = InstructionWriter::start(
        WriterSettings::new(temp_dir.path(), TEST_INSTANCE),
        Arc::new(InstructionBus::new()),
        deps,
    )
    .unwrap();

    let nodes = ["s1", "s2", "s3", "s4"];
    let handles: Vec<_> = nodes
        .iter()
        .map(|node| {
            writer
                .dispatch(InstructionBatch::new(*node, vec![k1(&nodes)]))
                .unwrap()
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(cleanup.all_records(), vec![CleanupRecord::drained("k1", 10)]);
    assert!(writer.records().is_cleaned("k1"));
    for node in nodes {
        assert_eq!(files_in(&temp_dir.path().join(node)).len(), 1);
        assert_eq!(metrics.stats_for(node).unwrap().instructions, 1);
    }
}

#[async_std::test]
async fn test_many_batches_same_node_do_not_collide() {
    let temp_dir = tempdir().unwrap();
    let cleanup = RecordingCleanupListener::new();
    let writer = start_writer(temp_dir.path(), &cleanup);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let key = format!("k{}", i);
            writer
                .dispatch(InstructionBatch::new(
                    "s1",
                    vec![record(&key, &["s1"], &[Some("acct"), Some("obj")])],
                ))
                .unwrap()
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(files_in(&temp_dir.path().join("s1")).len(), 8);
    assert_eq!(cleanup.all_records().len(), 8);
}

#[async_std::test]
async fn test_cleanup_channel_receives_after_write() {
    let temp_dir = tempdir().unwrap();
    let (listener, rx) = ChannelCleanupListener::unbounded();
    let deps = WriterDependencies::new(Arc::new(listener));
    let writer = InstructionWriter::start(
        WriterSettings::new(temp_dir.path(), TEST_INSTANCE),
        Arc::new(InstructionBus::new()),
        deps,
    )
    .unwrap();

    let report = writer
        .dispatch(InstructionBatch::new("s1", vec![k1(&["s1"])]))
        .unwrap()
        .await
        .unwrap();

    let cleaned = rx.recv_async().await.unwrap();
    assert_eq!(cleaned, vec![CleanupRecord::drained("k1", 10)]);
    assert!(report.path.exists());
}

/// Counts the published instruction files of every node at the moment a
/// cleanup set arrives.
#[derive(Clone)]
struct SpoolSnapshotListener {
    root: PathBuf,
    nodes: Vec<&'static str>,
    snapshots: Arc<Mutex<Vec<Vec<usize>>>>,
}

impl CleanupListener for SpoolSnapshotListener {
    fn on_cleanup(&self, _records: Vec<CleanupRecord>) {
        let counts = self
            .nodes
            .iter()
            .map(|node| {
                let dir = self.root.join(node);
                if dir.is_dir() { files_in(&dir).len() } else { 0 }
            })
            .collect();
        self.snapshots.lock().unwrap().push(counts);
    }
}

#[async_std::test]
async fn test_every_node_file_is_published_before_cleanup() {
    let temp_dir = tempdir().unwrap();
    let listener = SpoolSnapshotListener {
        root: temp_dir.path().to_path_buf(),
        nodes: vec!["s1", "s2"],
        snapshots: Arc::new(Mutex::new(Vec::new())),
    };
    let deps = WriterDependencies::new(Arc::new(listener.clone()));
    let writer = InstructionWriter::start(
        WriterSettings::new(temp_dir.path(), TEST_INSTANCE),
        Arc::new(InstructionBus::new()),
        deps,
    )
    .unwrap();

    for node in ["s1", "s2"] {
        writer
            .dispatch(InstructionBatch::new(node, vec![k1(&["s1", "s2"])]))
            .unwrap()
            .await
            .unwrap();
    }

    // one cleanup, seen with both node files already renamed into place
    assert_eq!(*listener.snapshots.lock().unwrap(), vec![vec![1, 1]]);
}

#[async_std::test]
async fn test_failed_node_write_holds_back_cleanup() {
    let temp_dir = tempdir().unwrap();
    let cleanup = RecordingCleanupListener::new();
    let writer = start_writer(temp_dir.path(), &cleanup);

    // s1 cannot be provisioned: a plain file sits where its scratch dir goes
    fs::write(temp_dir.path().join("s1.tmp"), "x").unwrap();
    let result = writer
        .dispatch(InstructionBatch::new("s1", vec![k1(&["s1", "s2"])]))
        .unwrap()
        .await;
    assert!(result.is_err());

    let report = writer
        .dispatch(InstructionBatch::new("s2", vec![k1(&["s2"])]))
        .unwrap()
        .await
        .unwrap();
    assert!(report.cleaned.is_empty());
    assert!(cleanup.received().is_empty());

    // redelivered once the directory is fixed
    fs::remove_file(temp_dir.path().join("s1.tmp")).unwrap();
    let report = writer
        .dispatch(InstructionBatch::new("s1", vec![k1(&["s1"])]))
        .unwrap()
        .await
        .unwrap();
    assert_eq!(report.cleaned, vec![CleanupRecord::drained("k1", 10)]);
    assert_eq!(cleanup.all_records(), vec![CleanupRecord::drained("k1", 10)]);
}
