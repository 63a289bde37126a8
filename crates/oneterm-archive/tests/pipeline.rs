use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Barrier;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use oneterm_archive::detected_parallelism;
use oneterm_archive::ArchiveConfig;
use oneterm_archive::Archiver;
use oneterm_archive::CompressionLevel;

fn config(dir: &Path, workers: Option<usize>) -> ArchiveConfig {
    ArchiveConfig {
        log_dir: dir.to_path_buf(),
        workers,
        archive_on_exit: false,
    }
}

fn decode(path: &Path) -> String {
    let bytes = std::fs::read(path).unwrap();
    String::from_utf8(zstd::stream::decode_all(bytes.as_slice()).unwrap()).unwrap()
}

fn logz_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "logz"))
        .collect();
    files.sort();
    files
}

#[test]
fn test_hello_world_round_trip_at_interactive_level() {
    let root = tempfile::tempdir().unwrap();
    let archiver = Archiver::new(config(root.path(), Some(2)));

    let path = archiver
        .submit_text("hello\nworld\n".to_string(), CompressionLevel::INTERACTIVE)
        .unwrap()
        .unwrap();
    archiver.shutdown();

    assert_eq!(decode(&path), "hello\nworld\n");
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("terminal_"));
    assert!(name.ends_with(".logz"));
}

#[test]
fn test_same_second_submissions_get_distinct_paths() {
    let root = tempfile::tempdir().unwrap();
    let archiver = Archiver::new(config(root.path(), Some(2)));

    let first = archiver
        .submit_text("first\n".to_string(), CompressionLevel::INTERACTIVE)
        .unwrap()
        .unwrap();
    let second = archiver
        .submit_text("second\n".to_string(), CompressionLevel::INTERACTIVE)
        .unwrap()
        .unwrap();
    archiver.shutdown();

    assert_ne!(first, second);
    assert_eq!(decode(&first), "first\n");
    assert_eq!(decode(&second), "second\n");
}

#[test]
fn test_thousand_small_jobs_on_four_workers() {
    let root = tempfile::tempdir().unwrap();
    let archiver = Archiver::new(config(root.path(), Some(4)));

    let mut expected = Vec::with_capacity(1000);
    for i in 0..1000 {
        let text = format!("{:04}:{}\n", i, "x".repeat(1018));
        let path = archiver
            .submit_text(text.clone(), CompressionLevel::new(3).unwrap())
            .unwrap()
            .unwrap();
        expected.push((path, text));
    }
    let stats = archiver.shutdown();

    assert_eq!(stats.submitted, 1000);
    assert_eq!(stats.completed, 1000);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.workers, 4);
    assert_eq!(logz_files(root.path()).len(), 1000);
    for (path, text) in expected {
        assert_eq!(decode(&path), text);
    }
}

#[test]
fn test_blank_capture_creates_nothing() {
    let root = tempfile::tempdir().unwrap();
    let log_dir = root.path().join("logs");
    let archiver = Archiver::new(config(&log_dir, Some(1)));

    for text in ["", "   ", "\n\n\t \r\n"] {
        let queued = archiver
            .submit_text(text.to_string(), CompressionLevel::INTERACTIVE)
            .unwrap();
        assert!(queued.is_none());
    }
    let stats = archiver.shutdown();

    assert_eq!(stats.submitted, 0);
    assert!(!log_dir.exists());
}

#[test]
fn test_concurrent_first_submissions_build_one_pool() {
    let root = tempfile::tempdir().unwrap();
    let archiver = Arc::new(Archiver::new(config(root.path(), None)));
    let threads = 16;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let archiver = Arc::clone(&archiver);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                archiver
                    .submit_text(format!("thread {}\n", i), CompressionLevel::new(1).unwrap())
                    .unwrap()
                    .unwrap()
            })
        })
        .collect();
    let paths: HashSet<PathBuf> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let stats = archiver.shutdown();

    assert_eq!(paths.len(), threads);
    assert_eq!(stats.pools_created, 1);
    assert_eq!(stats.workers, detected_parallelism());
    assert_eq!(stats.completed, threads as u64);
    assert_eq!(logz_files(root.path()).len(), threads);
}

#[test]
fn test_large_submission_returns_promptly() {
    let root = tempfile::tempdir().unwrap();
    let archiver = Archiver::new(config(root.path(), Some(1)));
    // Start the pool so the timing below covers only the hand-off.
    archiver
        .submit_text("warm up\n".to_string(), CompressionLevel::new(1).unwrap())
        .unwrap();

    let line = "0123456789abcdefghijklmnopqrstuvwxyz ABCDEFGHIJKLMNOPQRSTUVWXYZ\n";
    let text = line.repeat(50 * 1024 * 1024 / line.len());
    let size = text.len();

    let started = Instant::now();
    let path = archiver
        .submit_text(text, CompressionLevel::new(1).unwrap())
        .unwrap()
        .unwrap();
    let elapsed = started.elapsed();

    assert!(
        elapsed < Duration::from_millis(500),
        "submit took {:?} for {} bytes",
        elapsed,
        size
    );

    let stats = archiver.shutdown();
    assert_eq!(stats.completed, 2);
    assert_eq!(decode(&path).len(), size);
}
