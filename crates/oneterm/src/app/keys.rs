//! Key handling: command bindings and encoding of everything else for the shell.

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;

/// ASCII FS, what Ctrl+\ sends.
const PREFIX_BYTE: u8 = 0x1c;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ArchiveScrollback,
    SelectAllCopy,
    Copy,
    Paste,
    NewTab,
    CloseTab,
    NewWindow,
    NextWindow,
    NextTab,
    PrevTab,
    ToggleScrollback,
    Quit,
}

impl Action {
    pub fn from_key(c: char) -> Option<Self> {
        let action = match c.to_ascii_lowercase() {
            'b' => Action::ArchiveScrollback,
            'a' => Action::SelectAllCopy,
            'c' => Action::Copy,
            'v' => Action::Paste,
            't' => Action::NewTab,
            'w' => Action::CloseTab,
            'n' => Action::NewWindow,
            'o' => Action::NextWindow,
            ']' | '}' => Action::NextTab,
            '[' | '{' => Action::PrevTab,
            's' => Action::ToggleScrollback,
            'q' => Action::Quit,
            _ => return None,
        };
        Some(action)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    Action(Action),
    Input(Vec<u8>),
    /// The prefix was pressed; the next key picks the command.
    Prefix,
    Ignored,
}

/// Turns key events into commands or shell input.
#[derive(Debug, Default)]
pub struct KeyRouter {
    prefix_pending: bool,
}

impl KeyRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix_pending(&self) -> bool {
        self.prefix_pending
    }

    pub fn route(&mut self, key: &KeyEvent) -> Routed {
        if key.kind == KeyEventKind::Release {
            return Routed::Ignored;
        }

        if self.prefix_pending {
            self.prefix_pending = false;
            return match key.code {
                // Pressing the prefix twice sends it through.
                _ if is_prefix(key) => Routed::Input(vec![PREFIX_BYTE]),
                KeyCode::Esc => Routed::Ignored,
                KeyCode::Char(c) => match Action::from_key(c) {
                    Some(action) => Routed::Action(action),
                    None => Routed::Ignored,
                },
                _ => Routed::Ignored,
            };
        }

        if is_prefix(key) {
            self.prefix_pending = true;
            return Routed::Prefix;
        }

        let ctrl_shift = key
            .modifiers
            .contains(KeyModifiers::CONTROL | KeyModifiers::SHIFT);
        if ctrl_shift {
            if let Some(action) = match key.code {
                KeyCode::Char(c) => Action::from_key(c),
                _ => None,
            } {
                return Routed::Action(action);
            }
        }

        match key_event_to_bytes(key) {
            Some(bytes) => Routed::Input(bytes),
            None => Routed::Ignored,
        }
    }
}

/// Detects Ctrl+\ across terminal encodings.
fn is_prefix(key: &KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('\\') | KeyCode::Char('4') => ctrl,
        KeyCode::Char('\x1c') => true,
        _ => false,
    }
}

pub fn key_event_to_bytes(key_event: &KeyEvent) -> Option<Vec<u8>> {
    use KeyCode::*;

    let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key_event.modifiers.contains(KeyModifiers::ALT);

    let bytes = match key_event.code {
        Char(c) => {
            if ctrl {
                if c.is_ascii_lowercase() {
                    vec![c as u8 - b'a' + 1]
                } else if c.is_ascii_uppercase() {
                    vec![c as u8 - b'A' + 1]
                } else {
                    match c {
                        '[' | '3' => vec![0x1b],
                        '\\' | '4' => vec![0x1c],
                        ']' | '5' => vec![0x1d],
                        '^' | '6' => vec![0x1e],
                        '_' | '7' => vec![0x1f],
                        '?' | '8' => vec![0x7f],
                        ' ' | '2' | '@' => vec![0x00],
                        _ => return None,
                    }
                }
            } else {
                let mut buf = [0u8; 4];
                c.encode_utf8(&mut buf).as_bytes().to_vec()
            }
        }
        Enter => vec![b'\r'],
        Tab if key_event.modifiers.contains(KeyModifiers::SHIFT) => b"\x1b[Z".to_vec(),
        Tab => vec![b'\t'],
        BackTab => b"\x1b[Z".to_vec(),
        Backspace => vec![0x7f],
        Delete => b"\x1b[3~".to_vec(),
        Esc => vec![0x1b],
        Up => b"\x1b[A".to_vec(),
        Down => b"\x1b[B".to_vec(),
        Right => b"\x1b[C".to_vec(),
        Left => b"\x1b[D".to_vec(),
        Home => b"\x1b[H".to_vec(),
        End => b"\x1b[F".to_vec(),
        PageUp => b"\x1b[5~".to_vec(),
        PageDown => b"\x1b[6~".to_vec(),
        Insert => b"\x1b[2~".to_vec(),
        F(n) => match n {
            1 => b"\x1bOP".to_vec(),
            2 => b"\x1bOQ".to_vec(),
            3 => b"\x1bOR".to_vec(),
            4 => b"\x1bOS".to_vec(),
            5 => b"\x1b[15~".to_vec(),
            6 => b"\x1b[17~".to_vec(),
            7 => b"\x1b[18~".to_vec(),
            8 => b"\x1b[19~".to_vec(),
            9 => b"\x1b[20~".to_vec(),
            10 => b"\x1b[21~".to_vec(),
            11 => b"\x1b[23~".to_vec(),
            12 => b"\x1b[24~".to_vec(),
            _ => return None,
        },
        _ => return None,
    };

    if alt && !ctrl {
        let mut prefixed = Vec::with_capacity(bytes.len() + 1);
        prefixed.push(0x1b);
        prefixed.extend_from_slice(&bytes);
        return Some(prefixed);
    }
    Some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_key_event_to_bytes_char() {
        let event = key(KeyCode::Char('a'), KeyModifiers::NONE);
        assert_eq!(key_event_to_bytes(&event), Some(vec![b'a']));
    }

    #[test]
    fn test_key_event_to_bytes_ctrl() {
        let event = key(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_event_to_bytes(&event), Some(vec![0x03]));
    }

    #[test]
    fn test_key_event_to_bytes_alt_multibyte() {
        let event = key(KeyCode::Char('é'), KeyModifiers::ALT);
        assert_eq!(key_event_to_bytes(&event), Some("\x1bé".as_bytes().to_vec()));
    }

    #[test]
    fn test_key_event_to_bytes_arrow_and_f1() {
        assert_eq!(
            key_event_to_bytes(&key(KeyCode::Up, KeyModifiers::NONE)),
            Some(b"\x1b[A".to_vec())
        );
        assert_eq!(
            key_event_to_bytes(&key(KeyCode::F(1), KeyModifiers::NONE)),
            Some(b"\x1bOP".to_vec())
        );
    }

    #[test]
    fn test_ctrl_shift_binding() {
        let mut router = KeyRouter::new();
        let event = key(KeyCode::Char('B'), KeyModifiers::CONTROL | KeyModifiers::SHIFT);
        assert_eq!(router.route(&event), Routed::Action(Action::ArchiveScrollback));

        let event = key(KeyCode::Char('}'), KeyModifiers::CONTROL | KeyModifiers::SHIFT);
        assert_eq!(router.route(&event), Routed::Action(Action::NextTab));
    }

    #[test]
    fn test_plain_ctrl_goes_to_shell() {
        let mut router = KeyRouter::new();
        let event = key(KeyCode::Char('b'), KeyModifiers::CONTROL);
        assert_eq!(router.route(&event), Routed::Input(vec![0x02]));
    }

    #[test]
    fn test_prefix_then_key() {
        let mut router = KeyRouter::new();
        assert_eq!(
            router.route(&key(KeyCode::Char('\\'), KeyModifiers::CONTROL)),
            Routed::Prefix
        );
        assert!(router.prefix_pending());
        assert_eq!(
            router.route(&key(KeyCode::Char('t'), KeyModifiers::NONE)),
            Routed::Action(Action::NewTab)
        );
        assert!(!router.prefix_pending());
        assert_eq!(
            router.route(&key(KeyCode::Char('t'), KeyModifiers::NONE)),
            Routed::Input(vec![b't'])
        );
    }

    #[test]
    fn test_prefix_raw_fs_byte() {
        let mut router = KeyRouter::new();
        assert_eq!(
            router.route(&key(KeyCode::Char('\x1c'), KeyModifiers::NONE)),
            Routed::Prefix
        );
        assert_eq!(
            router.route(&key(KeyCode::Char('['), KeyModifiers::NONE)),
            Routed::Action(Action::PrevTab)
        );
    }

    #[test]
    fn test_double_prefix_sends_literal() {
        let mut router = KeyRouter::new();
        let prefix = key(KeyCode::Char('\\'), KeyModifiers::CONTROL);
        assert_eq!(router.route(&prefix), Routed::Prefix);
        assert_eq!(router.route(&prefix), Routed::Input(vec![0x1c]));
    }

    #[test]
    fn test_prefix_unknown_key_cancels() {
        let mut router = KeyRouter::new();
        router.route(&key(KeyCode::Char('\\'), KeyModifiers::CONTROL));
        assert_eq!(
            router.route(&key(KeyCode::Char('x'), KeyModifiers::NONE)),
            Routed::Ignored
        );
        assert!(!router.prefix_pending());
    }

    #[test]
    fn test_release_events_ignored() {
        let mut router = KeyRouter::new();
        let mut event = key(KeyCode::Char('a'), KeyModifiers::NONE);
        event.kind = KeyEventKind::Release;
        assert_eq!(router.route(&event), Routed::Ignored);
    }

    #[test]
    fn test_every_binding_letter() {
        let expected = [
            ('b', Action::ArchiveScrollback),
            ('A', Action::SelectAllCopy),
            ('c', Action::Copy),
            ('v', Action::Paste),
            ('t', Action::NewTab),
            ('w', Action::CloseTab),
            ('n', Action::NewWindow),
            ('o', Action::NextWindow),
            (']', Action::NextTab),
            ('[', Action::PrevTab),
            ('s', Action::ToggleScrollback),
            ('Q', Action::Quit),
        ];
        for (c, action) in expected {
            assert_eq!(Action::from_key(c), Some(action), "key {}", c);
        }
        assert_eq!(Action::from_key('z'), None);
    }
}
