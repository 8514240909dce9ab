//! Tetcolor: a falling-blocks game whose rules are written in Lua.
//!
//! - [`script`]: embedded Lua host and its calling conventions
//! - [`game`]: the game session state machine and field snapshot
//! - [`config`]: rc-file settings
//! - [`cli`]: command-line parsing
//! - [`keybind`]: key actions and the byte-sequence keymap
//! - [`terminal`]: crossterm rendering
//! - [`event_loop`]: the interactive driver

pub mod cli;
pub mod config;
pub mod event_loop;
pub mod game;
pub mod keybind;
pub mod script;
pub mod terminal;
