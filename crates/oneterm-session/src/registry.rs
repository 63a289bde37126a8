//! Windows, their tabs, and the sessions behind them.
//!
//! Ownership is tracked with explicit maps: each window lists its tabs in
//! order, and every session maps back to the window holding it. Sessions are
//! shared as `Arc<Mutex<_>>`, so a capture still running against a closed
//! tab keeps its session alive until it finishes.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;

use tracing::debug;

use oneterm_common::mutex_lock_or_recover;

use crate::error::SessionError;
use crate::session::Session;
use crate::session::SessionId;

/// Anything that can label a tab.
pub trait Titled {
    fn display_title(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl WindowId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

/// Result of removing a session.
pub struct Teardown<S> {
    pub window: WindowId,
    /// The window had no tabs left and was removed.
    pub window_closed: bool,
    /// Tab now active in `window`, if it still exists.
    pub new_active: Option<SessionId>,
    pub session: Arc<Mutex<S>>,
}

impl<S> fmt::Debug for Teardown<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown")
            .field("window", &self.window)
            .field("window_closed", &self.window_closed)
            .field("new_active", &self.new_active)
            .finish()
    }
}

#[derive(Debug, Default)]
struct WindowEntry {
    tabs: Vec<SessionId>,
    active: usize,
}

impl WindowEntry {
    fn active_id(&self) -> Option<&SessionId> {
        self.tabs.get(self.active)
    }
}

pub struct SessionRegistry<S = Session> {
    next_window: u64,
    windows: BTreeMap<WindowId, WindowEntry>,
    owners: HashMap<SessionId, WindowId>,
    sessions: HashMap<SessionId, Arc<Mutex<S>>>,
}

impl<S> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SessionRegistry<S> {
    pub fn new() -> Self {
        Self {
            next_window: 1,
            windows: BTreeMap::new(),
            owners: HashMap::new(),
            sessions: HashMap::new(),
        }
    }

    pub fn create_window(&mut self) -> WindowId {
        let id = WindowId(self.next_window);
        self.next_window += 1;
        self.windows.insert(id, WindowEntry::default());
        debug!(window = %id, "Window created");
        id
    }

    /// Appends a tab to `window` and makes it active.
    pub fn add_tab(
        &mut self,
        window: WindowId,
        id: SessionId,
        session: S,
    ) -> Result<Arc<Mutex<S>>, SessionError> {
        let entry = self
            .windows
            .get_mut(&window)
            .ok_or_else(|| SessionError::WindowNotFound(window.to_string()))?;

        entry.tabs.push(id.clone());
        entry.active = entry.tabs.len() - 1;

        let session = Arc::new(Mutex::new(session));
        self.owners.insert(id.clone(), window);
        self.sessions.insert(id.clone(), Arc::clone(&session));
        debug!(window = %window, session_id = %id, tabs = entry.tabs.len(), "Tab added");
        Ok(session)
    }

    /// Drops a session from its window. A window left without tabs is
    /// removed as well.
    pub fn remove_session(&mut self, id: &SessionId) -> Option<Teardown<S>> {
        let session = self.sessions.remove(id)?;
        let window = self.owners.remove(id)?;

        let Some(entry) = self.windows.get_mut(&window) else {
            return Some(Teardown {
                window,
                window_closed: true,
                new_active: None,
                session,
            });
        };

        if let Some(index) = entry.tabs.iter().position(|t| t == id) {
            entry.tabs.remove(index);
            if index < entry.active || entry.active >= entry.tabs.len() {
                entry.active = entry.active.saturating_sub(1);
            }
        }

        let window_closed = entry.tabs.is_empty();
        let new_active = entry.active_id().cloned();
        if window_closed {
            self.windows.remove(&window);
        }

        debug!(window = %window, session_id = %id, window_closed, "Session removed");
        Some(Teardown {
            window,
            window_closed,
            new_active,
            session,
        })
    }

    pub fn close_current_tab(&mut self, window: WindowId) -> Option<Teardown<S>> {
        let id = self.active_session_id(window)?;
        self.remove_session(&id)
    }

    /// Activates the tab at `index`; returns the now-active session.
    pub fn switch_tab(&mut self, window: WindowId, index: usize) -> Option<SessionId> {
        let entry = self.windows.get_mut(&window)?;
        if index >= entry.tabs.len() {
            return None;
        }
        entry.active = index;
        entry.active_id().cloned()
    }

    pub fn next_tab(&mut self, window: WindowId) -> Option<SessionId> {
        let entry = self.windows.get_mut(&window)?;
        if entry.tabs.is_empty() {
            return None;
        }
        entry.active = (entry.active + 1) % entry.tabs.len();
        entry.active_id().cloned()
    }

    pub fn prev_tab(&mut self, window: WindowId) -> Option<SessionId> {
        let entry = self.windows.get_mut(&window)?;
        if entry.tabs.is_empty() {
            return None;
        }
        entry.active = (entry.active + entry.tabs.len() - 1) % entry.tabs.len();
        entry.active_id().cloned()
    }

    pub fn owning_window(&self, id: &SessionId) -> Option<WindowId> {
        self.owners.get(id).copied()
    }

    pub fn active_session_id(&self, window: WindowId) -> Option<SessionId> {
        self.windows.get(&window)?.active_id().cloned()
    }

    pub fn active_session(&self, window: WindowId) -> Option<Arc<Mutex<S>>> {
        let id = self.active_session_id(window)?;
        self.get(&id)
    }

    pub fn active_index(&self, window: WindowId) -> Option<usize> {
        self.windows.get(&window).map(|entry| entry.active)
    }

    pub fn is_active(&self, id: &SessionId) -> bool {
        self.owning_window(id)
            .and_then(|window| self.active_session_id(window))
            .is_some_and(|active| &active == id)
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Mutex<S>>> {
        self.sessions.get(id).cloned()
    }

    pub fn tabs(&self, window: WindowId) -> Vec<SessionId> {
        self.windows
            .get(&window)
            .map(|entry| entry.tabs.clone())
            .unwrap_or_default()
    }

    pub fn window_ids(&self) -> Vec<WindowId> {
        self.windows.keys().copied().collect()
    }

    /// Every live session, in no particular order.
    pub fn sessions(&self) -> Vec<Arc<Mutex<S>>> {
        self.sessions.values().cloned().collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// No windows remain.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl<S: Titled> SessionRegistry<S> {
    pub fn tab_titles(&self, window: WindowId) -> Vec<String> {
        self.tabs(window)
            .iter()
            .filter_map(|id| self.sessions.get(id))
            .map(|session| mutex_lock_or_recover(session).display_title())
            .collect()
    }

    /// Title of the window: the label of its active tab.
    pub fn window_title(&self, window: WindowId) -> Option<String> {
        let session = self.active_session(window)?;
        let title = mutex_lock_or_recover(&session).display_title();
        Some(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FakeTab(String);

    impl Titled for FakeTab {
        fn display_title(&self) -> String {
            self.0.clone()
        }
    }

    fn id(s: &str) -> SessionId {
        SessionId::new(s)
    }

    fn registry_with_tabs(names: &[&str]) -> (SessionRegistry<FakeTab>, WindowId) {
        let mut registry = SessionRegistry::new();
        let window = registry.create_window();
        for name in names {
            registry
                .add_tab(window, id(name), FakeTab(name.to_string()))
                .unwrap();
        }
        (registry, window)
    }

    #[test]
    fn test_new_tab_becomes_active() {
        let (registry, window) = registry_with_tabs(&["a", "b", "c"]);
        assert_eq!(registry.active_session_id(window), Some(id("c")));
        assert_eq!(registry.tab_titles(window), vec!["a", "b", "c"]);
        assert_eq!(registry.owning_window(&id("b")), Some(window));
        assert_eq!(registry.window_title(window), Some("c".to_string()));
    }

    #[test]
    fn test_add_tab_to_missing_window() {
        let mut registry: SessionRegistry<FakeTab> = SessionRegistry::new();
        let err = registry
            .add_tab(WindowId(42), id("x"), FakeTab("x".into()))
            .unwrap_err();
        assert!(matches!(err, SessionError::WindowNotFound(_)));
    }

    #[test]
    fn test_remove_active_tab_selects_next() {
        let (mut registry, window) = registry_with_tabs(&["a", "b", "c"]);
        registry.switch_tab(window, 1);

        let teardown = registry.remove_session(&id("b")).unwrap();
        assert_eq!(teardown.window, window);
        assert!(!teardown.window_closed);
        assert_eq!(teardown.new_active, Some(id("c")));
        assert_eq!(registry.owning_window(&id("b")), None);
    }

    #[test]
    fn test_remove_active_last_tab_selects_previous() {
        let (mut registry, window) = registry_with_tabs(&["a", "b", "c"]);
        let teardown = registry.close_current_tab(window).unwrap();
        assert_eq!(teardown.new_active, Some(id("b")));
    }

    #[test]
    fn test_remove_tab_before_active_keeps_active() {
        let (mut registry, window) = registry_with_tabs(&["a", "b", "c"]);
        let teardown = registry.remove_session(&id("a")).unwrap();
        assert_eq!(teardown.new_active, Some(id("c")));
        assert_eq!(registry.active_index(window), Some(1));
    }

    #[test]
    fn test_remove_last_tab_closes_window() {
        let (mut registry, window) = registry_with_tabs(&["only"]);
        let teardown = registry.close_current_tab(window).unwrap();
        assert!(teardown.window_closed);
        assert_eq!(teardown.new_active, None);
        assert!(registry.is_empty());
        assert_eq!(registry.session_count(), 0);
    }

    #[test]
    fn test_remove_unknown_session() {
        let (mut registry, _) = registry_with_tabs(&["a"]);
        assert!(registry.remove_session(&id("zzz")).is_none());
    }

    #[test]
    fn test_tab_cycling_wraps() {
        let (mut registry, window) = registry_with_tabs(&["a", "b", "c"]);
        assert_eq!(registry.next_tab(window), Some(id("a")));
        assert_eq!(registry.prev_tab(window), Some(id("c")));
        assert_eq!(registry.switch_tab(window, 1), Some(id("b")));
        assert_eq!(registry.switch_tab(window, 9), None);
        assert_eq!(registry.active_session_id(window), Some(id("b")));
    }

    #[test]
    fn test_removed_session_outlives_registry_entry() {
        let (mut registry, window) = registry_with_tabs(&["a"]);
        let held = registry.active_session(window).unwrap();

        let teardown = registry.remove_session(&id("a")).unwrap();
        drop(teardown);

        assert_eq!(mutex_lock_or_recover(&held).display_title(), "a");
        assert!(registry.get(&id("a")).is_none());
    }

    #[test]
    fn test_multiple_windows() {
        let mut registry: SessionRegistry<FakeTab> = SessionRegistry::new();
        let w1 = registry.create_window();
        let w2 = registry.create_window();
        registry.add_tab(w1, id("a"), FakeTab("a".into())).unwrap();
        registry.add_tab(w2, id("b"), FakeTab("b".into())).unwrap();

        assert_eq!(registry.window_ids(), vec![w1, w2]);
        assert!(registry.is_active(&id("a")));
        assert!(registry.is_active(&id("b")));

        registry.remove_session(&id("a"));
        assert_eq!(registry.window_ids(), vec![w2]);
        assert!(!registry.is_empty());
    }
}
