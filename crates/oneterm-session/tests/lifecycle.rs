#![cfg(unix)]

use std::path::Path;
use std::sync::Arc;

use oneterm_archive::ArchiveConfig;
use oneterm_archive::CompressionLevel;
use oneterm_session::AppConfig;
use oneterm_session::AppContext;
use oneterm_session::CaptureMode;
use oneterm_session::CaptureOutcome;
use oneterm_session::Session;
use oneterm_session::SessionId;
use oneterm_session::SessionRegistry;
use oneterm_session::ShellCommand;
use oneterm_terminal::MemoryClipboard;

fn context(dir: &Path, capture: CaptureMode) -> AppContext {
    let config = AppConfig::default()
        .with_capture(capture)
        .with_user("ana")
        .with_archive(ArchiveConfig::default().with_log_dir(dir).with_workers(2));
    AppContext::with_clipboard(config, Arc::new(MemoryClipboard::new())).unwrap()
}

/// Runs `script` to completion and returns the finished session.
fn run_shell(ctx: &AppContext, id: &str, script: &str) -> Session {
    let shell = ShellCommand::new("/bin/sh").with_args(["-c", script]);
    let (mut session, mut reader) = Session::spawn(
        SessionId::new(id),
        &shell,
        &ctx.config().user,
        80,
        24,
        ctx.scrollback_limit(),
    )
    .unwrap();
    session.set_range_reads(ctx.range_reads());

    let mut buf = [0u8; 4096];
    while let Ok(n) = reader.read_chunk(&mut buf) {
        if n == 0 {
            break;
        }
        session.process_output(&buf[..n]);
    }
    session.reap();
    session
}

fn decode(path: &Path) -> String {
    let bytes = std::fs::read(path).unwrap();
    String::from_utf8(zstd::stream::decode_all(&bytes[..]).unwrap()).unwrap()
}

#[test]
fn test_direct_capture_of_closed_tab() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), CaptureMode::Direct);
    let mut registry: SessionRegistry = SessionRegistry::new();
    let window = registry.create_window();

    let session = run_shell(&ctx, "a1", "echo hello; echo world");
    let handle = registry.add_tab(window, SessionId::new("a1"), session).unwrap();
    drop(handle);

    let teardown = registry.remove_session(&SessionId::new("a1")).unwrap();
    assert!(teardown.window_closed);
    assert!(registry.is_empty());

    let outcome = ctx
        .capture()
        .archive_at(&teardown.session, CompressionLevel::BACKGROUND)
        .unwrap();
    let path = match outcome {
        CaptureOutcome::Submitted(path) => path,
        other => panic!("expected Submitted, got {:?}", other),
    };

    let stats = ctx.shutdown();
    assert_eq!(stats.completed, 1);
    assert_eq!(decode(&path), "hello\nworld\n");
}

#[test]
fn test_clipboard_capture_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), CaptureMode::Clipboard);
    let mut registry: SessionRegistry = SessionRegistry::new();
    let window = registry.create_window();

    let session = run_shell(&ctx, "b2", "printf 'line one\\nline two\\n'");
    let handle = registry.add_tab(window, SessionId::new("b2"), session).unwrap();

    let outcome = ctx.capture().archive(&handle).unwrap();
    let pending = match outcome {
        CaptureOutcome::Pending(pending) => pending,
        other => panic!("expected Pending, got {:?}", other),
    };
    let path = ctx
        .runtime_handle()
        .block_on(pending)
        .unwrap()
        .expect("archive path");

    assert!(!handle.lock().unwrap().terminal().supports_range_reads());
    let stats = ctx.shutdown();
    assert_eq!(stats.submitted, 1);
    assert_eq!(decode(&path), "line one\nline two\n");
}

#[test]
fn test_silent_shell_archives_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), CaptureMode::Direct);
    let session = Arc::new(std::sync::Mutex::new(run_shell(&ctx, "c3", "true")));

    let outcome = ctx.capture().archive(&session).unwrap();
    assert!(matches!(outcome, CaptureOutcome::Empty));
    assert_eq!(ctx.shutdown().submitted, 0);
    assert_eq!(std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0), 0);
}
