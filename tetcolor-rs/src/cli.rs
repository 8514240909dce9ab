//! Command-line argument parsing.
//!
//! Usage:
//!   tetcolor [-f[<file>]] [-s<script>] [-W<width>] [-H<height>] [-t<ms>] [-l<logfile>] [-d]

use std::path::PathBuf;

use crate::config::Settings;

pub const USAGE: &str =
    "Usage: tetcolor [-f[<file>]] [-s<script>] [-W<width>] [-H<height>] [-t<ms>] [-l<logfile>] [-d]";

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Config-file specification.
    pub config: ConfigFile,
    /// Lua rules file (`-s<script>`).
    pub script: Option<PathBuf>,
    /// Field columns (`-W<n>`).
    pub width: Option<usize>,
    /// Field rows (`-H<n>`).
    pub height: Option<usize>,
    /// Turn interval in milliseconds (`-t<ms>`).
    pub tick_ms: Option<u64>,
    /// Log file (`-l<file>`).
    pub log_file: Option<PathBuf>,
    /// Debug logging (`-d`).
    pub debug: bool,
}

/// How to choose the rc file.
#[derive(Debug, Default)]
pub enum ConfigFile {
    /// Search the standard locations (default).
    #[default]
    Search,
    /// `-f` with no file argument: skip the rc file.
    Skip,
    /// `-f<file>`: load this specific file.
    Explicit(PathBuf),
}

impl CliArgs {
    /// Override `settings` with whatever was given on the command line.
    pub fn apply(&self, settings: &mut Settings) -> Result<(), String> {
        if let Some(w) = self.width {
            settings.set("width", &w.to_string())?;
        }
        if let Some(h) = self.height {
            settings.set("height", &h.to_string())?;
        }
        if let Some(ms) = self.tick_ms {
            settings.set("tick", &ms.to_string())?;
        }
        if let Some(script) = &self.script {
            settings.script = script.clone();
        }
        if let Some(log) = &self.log_file {
            settings.log_file = Some(log.clone());
        }
        Ok(())
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or(&[]))
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        if !arg.starts_with('-') || arg == "-" {
            return Err(format!("unexpected argument: {arg}"));
        }

        // Flag argument: iterate over characters after the leading `-`.
        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'd' => args.debug = true,

                // -f[<file>]
                'f' => {
                    if j + 1 < chars.len() {
                        let file: String = chars[j + 1..].iter().collect();
                        args.config = ConfigFile::Explicit(PathBuf::from(file));
                        j = chars.len();
                    } else if i + 1 < argv.len() && !argv[i + 1].starts_with('-') {
                        i += 1;
                        args.config = ConfigFile::Explicit(PathBuf::from(&argv[i]));
                    } else {
                        args.config = ConfigFile::Skip;
                    }
                }

                // Options that require a value, attached or separate.
                flag @ ('s' | 'W' | 'H' | 't' | 'l') => {
                    let value = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err(format!("-{flag} requires an argument"));
                    };
                    match flag {
                        's' => args.script = Some(PathBuf::from(value)),
                        'l' => args.log_file = Some(PathBuf::from(value)),
                        'W' => args.width = Some(parse_number(flag, &value)?),
                        'H' => args.height = Some(parse_number(flag, &value)?),
                        _ => args.tick_ms = Some(parse_number(flag, &value)?),
                    }
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    Ok(args)
}

fn parse_number<T: std::str::FromStr>(flag: char, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("-{flag}: invalid number: {value}"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
