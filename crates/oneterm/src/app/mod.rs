//! The interactive shell: windows of tabs drawn onto the host terminal.
//!
//! One thread owns every session and does all drawing. PTY readers, the
//! input thread and clipboard tasks only send [`UiEvent`]s to it.

pub mod events;
pub mod host;
pub mod keys;
pub mod render;
pub mod signals;

use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::Receiver;
use crossbeam_channel::RecvTimeoutError;
use crossbeam_channel::Sender;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use oneterm_archive::CompressionLevel;
use oneterm_common::mutex_lock_or_recover;
use oneterm_session::generate_session_id;
use oneterm_session::AppConfig;
use oneterm_session::AppContext;
use oneterm_session::CaptureOutcome;
use oneterm_session::Session;
use oneterm_session::SessionId;
use oneterm_session::SessionRegistry;
use oneterm_session::WindowId;
use oneterm_terminal::read_text_async;
use oneterm_terminal::PtyReader;
use oneterm_terminal::TerminalWidget;

use crate::error::AppError;
use events::UiEvent;
use host::HostTerminal;
use keys::Action;
use keys::KeyRouter;
use keys::Routed;
use render::Chrome;
use signals::SignalHandler;

const TICK: Duration = Duration::from_millis(100);

/// Entry point used by `main`: runs the UI, then shuts the archiver down.
pub struct Application {
    config: AppConfig,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Runs until the last window closes or a quit is requested. Returns
    /// the process exit code.
    pub fn run(self) -> i32 {
        let ctx = match AppContext::init(self.config) {
            Ok(ctx) => ctx,
            Err(e) => return report(&AppError::from(e)),
        };

        let result = run_ui(&ctx);
        let stats = ctx.shutdown();
        info!(
            submitted = stats.submitted,
            completed = stats.completed,
            failed = stats.failed,
            "oneterm exiting"
        );

        match result {
            Ok(()) => 0,
            Err(e) => report(&e),
        }
    }
}

fn report(e: &AppError) -> i32 {
    error!(error = %e, context = %e.context(), "oneterm failed");
    eprintln!("Error: {}", e);
    eprintln!("Suggestion: {}", e.suggestion());
    if e.is_retryable() {
        eprintln!("(This error may be transient - retry may succeed)");
    }
    e.exit_code()
}

/// Takes over the host terminal and runs the event loop.
pub fn run_ui(ctx: &AppContext) -> Result<(), AppError> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let _signals = SignalHandler::setup(Arc::clone(&shutdown))?;

    let host = HostTerminal::enter()?;
    let size = HostTerminal::size()?;

    let mut app = App::new(ctx, size, Arc::clone(&shutdown));
    let input = events::spawn_input_thread(app.sender(), Arc::clone(&shutdown))?;

    let result = app.open_window().and_then(|_| app.run(&mut io::stdout()));

    app.finish();
    shutdown.store(true, Ordering::SeqCst);
    drop(host);
    if input.join().is_err() {
        warn!("Input thread panicked");
    }
    result
}

pub struct App<'a> {
    ctx: &'a AppContext,
    registry: SessionRegistry,
    current: Option<WindowId>,
    tx: Sender<UiEvent>,
    rx: Receiver<UiEvent>,
    keys: KeyRouter,
    status: Option<String>,
    cols: u16,
    rows: u16,
    shutdown: Arc<AtomicBool>,
    quit: bool,
    dirty: bool,
}

impl<'a> App<'a> {
    pub fn new(ctx: &'a AppContext, (cols, rows): (u16, u16), shutdown: Arc<AtomicBool>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            ctx,
            registry: SessionRegistry::new(),
            current: None,
            tx,
            rx,
            keys: KeyRouter::new(),
            status: None,
            cols,
            rows,
            shutdown,
            quit: false,
            dirty: true,
        }
    }

    pub fn sender(&self) -> Sender<UiEvent> {
        self.tx.clone()
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn current_window(&self) -> Option<WindowId> {
        self.current
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn should_quit(&self) -> bool {
        self.quit || self.shutdown.load(Ordering::SeqCst) || self.registry.is_empty()
    }

    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<(), AppError> {
        while !self.should_quit() {
            match self.rx.recv_timeout(TICK) {
                Ok(event) => {
                    self.handle_event(event)?;
                    while !self.should_quit() {
                        match self.rx.try_recv() {
                            Ok(event) => self.handle_event(event)?,
                            Err(_) => break,
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if self.dirty && !self.should_quit() {
                self.render(out)?;
            }
        }
        debug!(
            quit = self.quit,
            signalled = self.shutdown.load(Ordering::SeqCst),
            "Event loop finished"
        );
        Ok(())
    }

    /// Opens a window with one tab and makes it current.
    pub fn open_window(&mut self) -> Result<WindowId, AppError> {
        let (id, session, reader) = self.spawn_session()?;
        let window = self.registry.create_window();
        self.attach(window, id, session, reader)?;
        self.current = Some(window);
        self.dirty = true;
        info!(window = %window, "Window opened");
        Ok(window)
    }

    /// Opens a tab in the current window, or a new window if there is none.
    pub fn open_tab(&mut self) -> Result<(), AppError> {
        let Some(window) = self.current else {
            return self.open_window().map(|_| ());
        };
        let (id, session, reader) = self.spawn_session()?;
        self.attach(window, id, session, reader)?;
        self.dirty = true;
        Ok(())
    }

    fn spawn_session(&self) -> Result<(SessionId, Session, PtyReader), AppError> {
        let config = self.ctx.config();
        let id = generate_session_id();
        let (mut session, reader) = Session::spawn(
            id.clone(),
            &config.shell,
            &config.user,
            self.cols,
            render::content_rows(self.rows),
            self.ctx.scrollback_limit(),
        )?;
        session.set_range_reads(self.ctx.range_reads());
        Ok((id, session, reader))
    }

    fn attach(
        &mut self,
        window: WindowId,
        id: SessionId,
        session: Session,
        reader: PtyReader,
    ) -> Result<(), AppError> {
        self.registry.add_tab(window, id.clone(), session)?;
        if let Err(e) = events::spawn_reader(id.clone(), reader, self.sender()) {
            self.registry.remove_session(&id);
            return Err(e);
        }
        Ok(())
    }

    pub fn handle_event(&mut self, event: UiEvent) -> Result<(), AppError> {
        match event {
            UiEvent::Key(key) => {
                let was_pending = self.keys.prefix_pending();
                match self.keys.route(&key) {
                    Routed::Action(action) => self.handle_action(action),
                    Routed::Input(bytes) => {
                        self.status = None;
                        self.send_input(&bytes);
                    }
                    Routed::Prefix => self.dirty = true,
                    Routed::Ignored => self.dirty |= was_pending,
                }
            }
            UiEvent::Paste(text) => self.paste(&text),
            UiEvent::Resize { cols, rows } => self.resize(cols, rows),
            UiEvent::Output { id, data } => self.output(&id, &data),
            UiEvent::Exited { id } => self.session_exited(&id),
            UiEvent::ClipboardText { id, text } => {
                if let Some(session) = self.registry.get(&id) {
                    if let Err(e) = mutex_lock_or_recover(&session).paste(&text) {
                        warn!(session_id = %id, error = %e, "Paste failed");
                    }
                }
            }
            UiEvent::Status(message) => {
                self.status = Some(message);
                self.dirty = true;
            }
            UiEvent::InputFailed(reason) => return Err(AppError::EventRead(reason)),
        }
        Ok(())
    }

    pub fn handle_action(&mut self, action: Action) {
        debug!(?action, "Action");
        self.dirty = true;
        match action {
            Action::ArchiveScrollback => self.archive_active(),
            Action::SelectAllCopy => self.copy(true),
            Action::Copy => self.copy(false),
            Action::Paste => self.paste_from_clipboard(),
            Action::NewTab => {
                if let Err(e) = self.open_tab() {
                    self.fail("New tab failed", &e);
                }
            }
            Action::CloseTab => self.close_tab(),
            Action::NewWindow => {
                if let Err(e) = self.open_window() {
                    self.fail("New window failed", &e);
                }
            }
            Action::NextWindow => self.next_window(),
            Action::NextTab => {
                if let Some(window) = self.current {
                    self.registry.next_tab(window);
                }
            }
            Action::PrevTab => {
                if let Some(window) = self.current {
                    self.registry.prev_tab(window);
                }
            }
            Action::ToggleScrollback => self.toggle_scrollback(),
            Action::Quit => self.quit = true,
        }
    }

    fn fail(&mut self, what: &str, e: &AppError) {
        warn!(error = %e, context = %e.context(), "{}", what);
        self.status = Some(format!("{}: {}", what, e));
    }

    fn active(&self) -> Option<Arc<Mutex<Session>>> {
        self.registry.active_session(self.current?)
    }

    fn send_input(&mut self, bytes: &[u8]) {
        let Some(session) = self.active() else {
            return;
        };
        let mut session = mutex_lock_or_recover(&session);
        if let Err(e) = session.send_input(bytes) {
            warn!(session_id = %session.id(), error = %e, "Input write failed");
        }
    }

    fn paste(&mut self, text: &str) {
        let Some(session) = self.active() else {
            return;
        };
        let mut session = mutex_lock_or_recover(&session);
        if let Err(e) = session.paste(text) {
            warn!(session_id = %session.id(), error = %e, "Paste failed");
        }
    }

    fn paste_from_clipboard(&mut self) {
        let Some(id) = self.current.and_then(|w| self.registry.active_session_id(w)) else {
            return;
        };
        let clipboard = Arc::clone(self.ctx.clipboard());
        let tx = self.sender();
        self.ctx.runtime_handle().spawn(async move {
            match read_text_async(clipboard).await {
                Ok(text) => {
                    if tx.send(UiEvent::ClipboardText { id, text }).is_err() {
                        debug!("UI loop gone; paste dropped");
                    }
                }
                Err(e) => debug!(error = %e, "Clipboard read failed; nothing pasted"),
            }
        });
    }

    fn copy(&mut self, select_all: bool) {
        let Some(session) = self.active() else {
            return;
        };
        let mut session = mutex_lock_or_recover(&session);
        if select_all {
            session.select_all();
        }
        if !session.has_selection() {
            return;
        }
        match session.copy_selection(self.ctx.clipboard().as_ref()) {
            Ok(()) => self.status = Some("copied".to_string()),
            Err(e) => debug!(error = %e, "Copy failed"),
        }
    }

    fn archive_active(&mut self) {
        if let Some(session) = self.active() {
            self.archive(&session, CompressionLevel::INTERACTIVE);
        }
    }

    fn archive(&mut self, session: &Arc<Mutex<Session>>, level: CompressionLevel) {
        match self.ctx.capture().archive_at(session, level) {
            Ok(CaptureOutcome::Submitted(path)) => self.status = Some(archived_status(&path)),
            Ok(CaptureOutcome::Pending(handle)) => {
                let tx = self.sender();
                self.ctx.runtime_handle().spawn(async move {
                    if let Ok(Some(path)) = handle.await {
                        if tx.send(UiEvent::Status(archived_status(&path))).is_err() {
                            debug!(path = %path.display(), "UI loop gone; archive status dropped");
                        }
                    }
                });
            }
            Ok(CaptureOutcome::Empty) => {}
            Err(e) => {
                warn!(error = %e, "Scrollback archive failed");
                self.status = Some(format!("archive failed: {}", e));
            }
        }
    }

    fn close_tab(&mut self) {
        let Some(window) = self.current else {
            return;
        };
        if self.ctx.config().archive.archive_on_exit {
            if let Some(session) = self.registry.active_session(window) {
                self.archive(&session, CompressionLevel::BACKGROUND);
            }
        }
        if let Some(teardown) = self.registry.close_current_tab(window) {
            mutex_lock_or_recover(&teardown.session).kill();
            if teardown.window_closed {
                self.window_closed(window);
            }
        }
    }

    fn session_exited(&mut self, id: &SessionId) {
        let Some(session) = self.registry.get(id) else {
            debug!(session_id = %id, "Exit for closed session");
            return;
        };

        let status = {
            let mut session = mutex_lock_or_recover(&session);
            // Output can end before the shell does; never block on it.
            session.kill();
            session.reap()
        };
        info!(session_id = %id, exit_code = ?status.map(|s| s.code), "Shell exited");

        if self.ctx.config().archive.archive_on_exit {
            self.archive(&session, CompressionLevel::BACKGROUND);
        }

        if let Some(teardown) = self.registry.remove_session(id) {
            if teardown.window_closed {
                self.window_closed(teardown.window);
            }
        }
        self.dirty = true;
    }

    fn window_closed(&mut self, window: WindowId) {
        info!(window = %window, "Window closed");
        if self.current == Some(window) {
            self.current = self.registry.window_ids().first().copied();
        }
        self.dirty = true;
    }

    fn next_window(&mut self) {
        let windows = self.registry.window_ids();
        if windows.is_empty() {
            return;
        }
        let index = self
            .current
            .and_then(|current| windows.iter().position(|w| *w == current))
            .map(|i| (i + 1) % windows.len())
            .unwrap_or(0);
        self.current = Some(windows[index]);
    }

    fn toggle_scrollback(&mut self) {
        let enabled = self.ctx.toggle_scrollback();
        let limit = self.ctx.scrollback_limit();
        for session in self.registry.sessions() {
            mutex_lock_or_recover(&session).set_scrollback_limit(limit);
        }
        self.status = Some(if enabled { "scrollback on" } else { "scrollback off" }.to_string());
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
        let content_rows = render::content_rows(rows);
        for session in self.registry.sessions() {
            let mut session = mutex_lock_or_recover(&session);
            if let Err(e) = session.resize(cols, content_rows) {
                warn!(session_id = %session.id(), error = %e, "Resize failed");
            }
        }
        self.dirty = true;
    }

    fn output(&mut self, id: &SessionId, data: &[u8]) {
        let Some(session) = self.registry.get(id) else {
            return;
        };
        let events = mutex_lock_or_recover(&session).process_output(data);
        if !events.is_empty() || self.registry.is_active(id) {
            self.dirty = true;
        }
    }

    pub fn render<W: Write>(&mut self, out: &mut W) -> Result<(), AppError> {
        self.dirty = false;
        let Some(window) = self.current else {
            return Ok(());
        };
        let Some(session) = self.registry.active_session(window) else {
            return Ok(());
        };

        let tabs = self.registry.tab_titles(window);
        let windows = self.registry.window_ids();
        let chrome = Chrome {
            window_index: windows.iter().position(|w| *w == window).unwrap_or(0),
            window_count: windows.len(),
            tabs: &tabs,
            active: self.registry.active_index(window).unwrap_or(0),
            status: self.status.as_deref(),
            prefix_pending: self.keys.prefix_pending(),
        };

        let session = mutex_lock_or_recover(&session);
        let title = session.display_title();
        render::draw(out, &chrome, session.terminal(), &title, self.cols)?;
        Ok(())
    }

    /// Archives what is left when configured to, then ends every shell.
    pub fn finish(&mut self) {
        let sessions = self.registry.sessions();
        if self.ctx.config().archive.archive_on_exit {
            for session in &sessions {
                self.archive(session, CompressionLevel::BACKGROUND);
            }
        }
        for session in &sessions {
            mutex_lock_or_recover(session).kill();
        }
        debug!(sessions = sessions.len(), "Sessions closed");
    }
}

fn archived_status(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    format!("archived {}", name)
}
