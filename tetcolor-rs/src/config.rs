//! `tetcolor.rc` configuration file parser.
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `/set <name>=<value>` or `/set <name> <value>` | set a variable |
//! | `/bind <key> <action>` | bind a key (see [`crate::keybind`]) |
//! | Lines starting with `;` | comment, ignored |
//! | Any other `/command` | silently skipped |
//!
//! Recognised variables:
//!
//! | Variable  | Meaning                          | Default              |
//! |-----------|----------------------------------|----------------------|
//! | `width`   | field columns (1..=1024)         | 7                    |
//! | `height`  | field rows (1..=1024)            | 18                   |
//! | `script`  | Lua rules file                   | `scripts/game.lua`   |
//! | `tick`    | milliseconds between turns (≥10) | 1000                 |
//! | `logfile` | write a log to this file         | none                 |

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::game::{DEFAULT_HEIGHT, DEFAULT_SCRIPT, DEFAULT_WIDTH, MAX_DIMENSION};
use crate::keybind::{key_sequence, KeyAction};

pub const DEFAULT_TICK: Duration = Duration::from_millis(1000);
const MIN_TICK_MS: u64 = 10;

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

/// Effective runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub width: usize,
    pub height: usize,
    pub script: PathBuf,
    pub tick: Duration,
    pub log_file: Option<PathBuf>,
    /// Extra key bindings, applied on top of the defaults in order.
    pub bindings: Vec<(Vec<u8>, KeyAction)>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            script: PathBuf::from(DEFAULT_SCRIPT),
            tick: DEFAULT_TICK,
            log_file: None,
            bindings: Vec::new(),
        }
    }
}

impl Settings {
    /// Apply the directives in `s` on top of the current settings.
    ///
    /// Unknown directives are skipped.  Returns the errors found on
    /// recognised lines; those lines leave the settings unchanged.
    pub fn apply_str(&mut self, s: &str) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            let Some(rest) = line.strip_prefix('/') else { continue };

            let (cmd, args_str) = rest
                .split_once(|c: char| c.is_ascii_whitespace())
                .unwrap_or((rest, ""));
            let tokens = split_args(args_str.trim());

            let result = match cmd {
                "set" => parse_set(&tokens).and_then(|(name, value)| self.set(&name, &value)),
                "bind" => parse_bind(&tokens).map(|b| self.bindings.push(b)),
                _ => Ok(()),
            };
            if let Err(message) = result {
                errors.push(ConfigError { line: lineno, message });
            }
        }

        errors
    }

    /// Read `path` and apply it.
    pub fn apply_file(&mut self, path: &Path) -> std::io::Result<Vec<ConfigError>> {
        let s = std::fs::read_to_string(path)?;
        Ok(self.apply_str(&s))
    }

    /// Set one variable by name.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), String> {
        match name {
            "width" => self.width = parse_dimension(name, value)?,
            "height" => self.height = parse_dimension(name, value)?,
            "script" => {
                if value.is_empty() {
                    return Err("script: path cannot be empty".into());
                }
                self.script = PathBuf::from(value);
            }
            "tick" => {
                let ms: u64 = value
                    .parse()
                    .map_err(|_| format!("tick: not a number of milliseconds: '{value}'"))?;
                if ms < MIN_TICK_MS {
                    return Err(format!("tick: must be at least {MIN_TICK_MS} ms"));
                }
                self.tick = Duration::from_millis(ms);
            }
            "logfile" => {
                self.log_file = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            _ => return Err(format!("unknown variable '{name}'")),
        }
        Ok(())
    }
}

fn parse_dimension(name: &str, value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(n) if (1..=MAX_DIMENSION).contains(&n) => Ok(n),
        _ => Err(format!(
            "{name}: expected an integer from 1 to {MAX_DIMENSION}, got '{value}'"
        )),
    }
}

// ── Argument tokenizer ────────────────────────────────────────────────────────

/// Split `s` into whitespace-delimited tokens, honouring double-quoted strings
/// and `\"` escapes within them.
fn split_args(s: &str) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    if escaped != '"' && escaped != '\\' {
                        cur.push('\\');
                    }
                    cur.push(escaped);
                }
            }
            c if c.is_ascii_whitespace() && !in_quotes => {
                if !cur.is_empty() {
                    args.push(std::mem::take(&mut cur));
                }
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() {
        args.push(cur);
    }
    args
}

// ── /set ─────────────────────────────────────────────────────────────────────

/// Parse `/set <name>=<value>` or `/set <name> <value>`.
fn parse_set(tokens: &[String]) -> Result<(String, String), String> {
    if tokens.is_empty() {
        return Err("/set: requires an argument".into());
    }

    let (name, value) = if let Some((name, value)) = tokens[0].split_once('=') {
        (name.to_owned(), value.to_owned())
    } else if tokens.len() >= 2 {
        (tokens[0].clone(), tokens[1..].join(" "))
    } else {
        return Err(format!("/set: missing value for '{}'", tokens[0]));
    };

    if name.is_empty() {
        return Err("/set: variable name cannot be empty".into());
    }
    Ok((name, value))
}

// ── /bind ────────────────────────────────────────────────────────────────────

/// Parse `/bind <key> <action>`.
fn parse_bind(tokens: &[String]) -> Result<(Vec<u8>, KeyAction), String> {
    let [key, action] = tokens else {
        return Err("/bind: expected <key> <action>".into());
    };
    let action = KeyAction::from_name(action)
        .ok_or_else(|| format!("/bind: unknown action '{action}'"))?;
    let seq = key_sequence(key);
    if seq.is_empty() {
        return Err(format!("/bind: empty key sequence '{key}'"));
    }
    Ok((seq, action))
}

// ── Search ────────────────────────────────────────────────────────────────────

/// Search for the user config file in the standard locations.
/// Returns the first path that exists, or `None`.
pub fn find_user_config() -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(home) = std::env::var("HOME") {
        candidates.push(PathBuf::from(home).join(".tetcolorrc"));
    }
    if let Some(dirs) = directories::ProjectDirs::from("", "", "tetcolor") {
        candidates.push(dirs.config_dir().join("tetcolor.rc"));
    }
    candidates.push(PathBuf::from("./.tetcolorrc"));
    candidates.push(PathBuf::from("./tetcolorrc"));
    candidates.into_iter().find(|p| p.exists())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
