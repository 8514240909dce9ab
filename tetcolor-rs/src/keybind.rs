//! Key bindings: [`KeyAction`], the byte-sequence [`Keymap`], and the
//! incremental [`KeyDecoder`] fed from raw terminal input.
//!
//! ## Key sequence format
//!
//! Keys are stored as the raw bytes the terminal sends in raw mode
//! (`Vec<u8>`).  [`key_sequence`] converts a readable notation used in the
//! rc file:
//!
//! | Notation        | Bytes            |
//! |-----------------|------------------|
//! | `^X`            | Ctrl-X           |
//! | `\e`            | ESC              |
//! | `\r`, `\n`, `\t`| CR, LF, TAB      |
//! | `space`, `enter`, `tab` | whole-word names |
//! | anything else   | taken literally  |

use std::collections::HashMap;

// ── KeyAction ─────────────────────────────────────────────────────────────────

/// What the player can ask for from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Left,
    Right,
    Up,
    Down,
    Drop,
    Pause,
    StartStop,
    Quit,
}

impl KeyAction {
    /// Name used by `/bind`.
    pub fn name(self) -> &'static str {
        match self {
            KeyAction::Left => "left",
            KeyAction::Right => "right",
            KeyAction::Up => "up",
            KeyAction::Down => "down",
            KeyAction::Drop => "drop",
            KeyAction::Pause => "pause",
            KeyAction::StartStop => "startstop",
            KeyAction::Quit => "quit",
        }
    }

    pub const ALL: &'static [KeyAction] = &[
        KeyAction::Left,
        KeyAction::Right,
        KeyAction::Up,
        KeyAction::Down,
        KeyAction::Drop,
        KeyAction::Pause,
        KeyAction::StartStop,
        KeyAction::Quit,
    ];

    /// Parse a name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        Self::ALL.iter().copied().find(|a| a.name() == lower)
    }
}

// ── Keymap ────────────────────────────────────────────────────────────────────

/// Maps byte sequences to [`KeyAction`]s.
#[derive(Debug, Default)]
pub struct Keymap {
    bindings: HashMap<Vec<u8>, KeyAction>,
}

impl Keymap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `sequence` to `action`, replacing any previous binding.
    pub fn bind(&mut self, sequence: Vec<u8>, action: KeyAction) {
        self.bindings.insert(sequence, action);
    }

    pub fn unbind(&mut self, sequence: &[u8]) {
        self.bindings.remove(sequence);
    }

    pub fn lookup(&self, sequence: &[u8]) -> Option<KeyAction> {
        self.bindings.get(sequence).copied()
    }

    /// `true` if `prefix` is a proper prefix of some bound sequence.
    pub fn has_prefix(&self, prefix: &[u8]) -> bool {
        self.bindings
            .keys()
            .any(|k| k.len() > prefix.len() && k.starts_with(prefix))
    }

    /// Standard bindings: arrows, vi keys and the numeric keypad digits
    /// for movement, Space to drop, Enter to start/stop, `p` to pause and
    /// `q` or Ctrl-C to quit.
    pub fn with_defaults(mut self) -> Self {
        use KeyAction::*;

        for (keys, action) in [
            (&["\\e[D", "\\eOD", "h", "4"][..], Left),
            (&["\\e[C", "\\eOC", "l", "6"][..], Right),
            (&["\\e[A", "\\eOA", "k", "8", "5"][..], Up),
            (&["\\e[B", "\\eOB", "j", "2"][..], Down),
            (&["space"][..], Drop),
            (&["\\r", "\\n"][..], StartStop),
            (&["p", "P"][..], Pause),
            (&["q", "Q", "^C"][..], Quit),
        ] {
            for key in keys {
                self.bind(key_sequence(key), action);
            }
        }
        self
    }
}

// ── KeyDecoder ────────────────────────────────────────────────────────────────

/// Accumulates raw bytes from stdin and translates them into
/// [`KeyAction`]s by matching against a [`Keymap`].
///
/// Multi-byte escape sequences (e.g. `ESC [ A` for Up Arrow) are buffered
/// until a complete sequence is recognised.
#[derive(Debug)]
pub struct KeyDecoder {
    buf: Vec<u8>,
    keymap: Keymap,
}

impl KeyDecoder {
    pub fn new(keymap: Keymap) -> Self {
        Self { buf: Vec::new(), keymap }
    }

    /// Push one byte.  Returns the bound action once a complete sequence is
    /// recognised, `None` while more bytes are expected or after an unbound
    /// sequence is discarded.
    pub fn push(&mut self, b: u8) -> Option<KeyAction> {
        self.buf.push(b);

        if let Some(action) = self.keymap.lookup(&self.buf) {
            self.buf.clear();
            return Some(action);
        }

        if !self.keymap.has_prefix(&self.buf) {
            // Unknown sequence: discard and start fresh.
            self.buf.clear();
        }
        None
    }

    pub fn keymap_mut(&mut self) -> &mut Keymap {
        &mut self.keymap
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Convert key notation to the raw byte sequence.
pub fn key_sequence(s: &str) -> Vec<u8> {
    match s.to_ascii_lowercase().as_str() {
        "space" => return vec![b' '],
        "enter" => return vec![b'\r'],
        "tab" => return vec![b'\t'],
        _ => {}
    }

    let mut out = Vec::new();
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '^' => match chars.next() {
                Some(next) if next.is_ascii_alphabetic() || "@[\\]^_".contains(next) => {
                    out.push(next.to_ascii_uppercase() as u8 - b'@');
                }
                Some(next) => {
                    out.push(b'^');
                    push_char(&mut out, next);
                }
                None => out.push(b'^'),
            },
            '\\' => match chars.next() {
                Some('e') | Some('E') => out.push(0x1b),
                Some('n') => out.push(b'\n'),
                Some('r') => out.push(b'\r'),
                Some('t') => out.push(b'\t'),
                Some(c) => push_char(&mut out, c),
                None => {}
            },
            _ => push_char(&mut out, ch),
        }
    }
    out
}

fn push_char(out: &mut Vec<u8>, ch: char) {
    let mut utf8 = [0u8; 4];
    out.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder() -> KeyDecoder {
        KeyDecoder::new(Keymap::new().with_defaults())
    }

    #[test]
    fn action_names_round_trip() {
        for &a in KeyAction::ALL {
            assert_eq!(KeyAction::from_name(a.name()), Some(a));
        }
        assert_eq!(KeyAction::from_name("DROP"), Some(KeyAction::Drop));
        assert_eq!(KeyAction::from_name("jump"), None);
    }

    #[test]
    fn key_sequence_ctrl() {
        assert_eq!(key_sequence("^C"), vec![0x03]);
        assert_eq!(key_sequence("^m"), vec![0x0D]);
        assert_eq!(key_sequence("^1"), b"^1".to_vec());
    }

    #[test]
    fn key_sequence_escape_and_names() {
        assert_eq!(key_sequence("\\e[A"), b"\x1b[A".to_vec());
        assert_eq!(key_sequence("space"), vec![b' ']);
        assert_eq!(key_sequence("Enter"), vec![b'\r']);
        assert_eq!(key_sequence("x"), vec![b'x']);
    }

    #[test]
    fn decoder_single_bytes() {
        let mut kd = decoder();
        assert_eq!(kd.push(b'h'), Some(KeyAction::Left));
        assert_eq!(kd.push(b' '), Some(KeyAction::Drop));
        assert_eq!(kd.push(b'\r'), Some(KeyAction::StartStop));
        assert_eq!(kd.push(b'p'), Some(KeyAction::Pause));
        assert_eq!(kd.push(0x03), Some(KeyAction::Quit));
    }

    #[test]
    fn decoder_arrow_three_bytes() {
        let mut kd = decoder();
        assert_eq!(kd.push(0x1B), None);
        assert_eq!(kd.push(b'['), None);
        assert_eq!(kd.push(b'A'), Some(KeyAction::Up));
        kd.push(0x1B);
        kd.push(b'O');
        assert_eq!(kd.push(b'D'), Some(KeyAction::Left));
    }

    #[test]
    fn decoder_discards_unknown() {
        let mut kd = decoder();
        assert_eq!(kd.push(b'z'), None);
        kd.push(0x1B);
        kd.push(b'[');
        assert_eq!(kd.push(b'Z'), None);
        assert_eq!(kd.push(b'l'), Some(KeyAction::Right));
    }

    #[test]
    fn rebinding_replaces_default() {
        let mut kd = decoder();
        kd.keymap_mut().bind(b"h".to_vec(), KeyAction::Drop);
        kd.keymap_mut().unbind(b"q");
        assert_eq!(kd.push(b'h'), Some(KeyAction::Drop));
        assert_eq!(kd.push(b'q'), None);
    }

    #[test]
    fn defaults_cover_every_action() {
        let km = Keymap::new().with_defaults();
        for &a in KeyAction::ALL {
            assert!(km.bindings.values().any(|&b| b == a), "{a:?} unbound");
        }
    }
}
