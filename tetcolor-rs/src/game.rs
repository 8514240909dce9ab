//! Game session: the Stopped/Running/Paused state machine driving the
//! script, plus the row-major field snapshot used for rendering.
//!
//! ## Script contract
//!
//! | Lua global          | Called by                    | Result used        |
//! |---------------------|------------------------------|--------------------|
//! | `game_start()`      | [`Game::start`]              | none               |
//! | `game_stop()`       | [`Game::stop`], game over    | none               |
//! | `game_turn()`       | [`Game::turn`]               | `0` = continue, other = game over |
//! | `game_move_left()` … `game_move_drop()` | [`Game::apply_move`] | none |
//! | `get_game_field()`  | after every mutating call    | `height` rows × `width` numbers |
//!
//! Operations that do not apply in the current state are silent no-ops and
//! make no script call.  Script failures are returned unchanged.

use std::path::Path;

use crate::config::Settings;
use crate::script::{Result, ScriptHost};

pub const DEFAULT_WIDTH: usize = 7;
pub const DEFAULT_HEIGHT: usize = 18;
/// Largest width or height accepted from settings.
pub const MAX_DIMENSION: usize = 1024;
/// Script loaded when nothing else is configured, relative to the working
/// directory.
pub const DEFAULT_SCRIPT: &str = "scripts/game.lua";
/// Cell value meaning "nothing here".
pub const EMPTY_CELL: i8 = -1;

const FIELD_FN: &str = "get_game_field";

// ── State ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameState {
    #[default]
    Stopped,
    Running,
    Paused,
}

impl GameState {
    pub fn name(self) -> &'static str {
        match self {
            GameState::Stopped => "stopped",
            GameState::Running => "running",
            GameState::Paused => "paused",
        }
    }
}

/// Player moves, each bound to one script function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Left,
    Right,
    Up,
    Down,
    Drop,
}

impl Move {
    pub const ALL: &'static [Move] = &[Move::Left, Move::Right, Move::Up, Move::Down, Move::Drop];

    /// Name of the Lua global implementing the move.
    pub fn function_name(self) -> &'static str {
        match self {
            Move::Left => "game_move_left",
            Move::Right => "game_move_right",
            Move::Up => "game_move_up",
            Move::Down => "game_move_down",
            Move::Drop => "game_move_drop",
        }
    }
}

// ── Game ──────────────────────────────────────────────────────────────────────

/// One game session.  Owns its [`ScriptHost`] exclusively.
#[derive(Debug)]
pub struct Game {
    width: usize,
    height: usize,
    state: GameState,
    turn_no: u64,
    level: u32,
    field: Vec<i8>,
    script: ScriptHost,
}

impl Game {
    /// Build a session whose rules come from the Lua file at `script_path`.
    pub fn new(width: usize, height: usize, script_path: &Path) -> Result<Self> {
        let script = ScriptHost::from_file(script_path)?;
        Ok(Self::with_host(width, height, script))
    }

    /// Build a session using the configured dimensions and script.
    pub fn from_config(settings: &Settings) -> Result<Self> {
        Self::new(settings.width, settings.height, &settings.script)
    }

    /// Wire an already-loaded host into a new session.
    ///
    /// The field holds `width * height` cells; settings keep both within
    /// [`MAX_DIMENSION`].
    pub fn with_host(width: usize, height: usize, script: ScriptHost) -> Self {
        tracing::debug!(width, height, script = script.origin(), "game created");
        Self {
            width,
            height,
            state: GameState::Stopped,
            turn_no: 0,
            level: 0,
            field: vec![EMPTY_CELL; width * height],
            script,
        }
    }

    // ── State changes ─────────────────────────────────────────────────────────

    /// Stopped → Running: `game_start()`, level reset, field refresh.
    pub fn start(&mut self) -> Result<()> {
        if self.state != GameState::Stopped {
            return Ok(());
        }
        self.set_state(GameState::Running);
        self.script.call("game_start")?;
        self.level = 0;
        self.update_field_buffer()
    }

    /// Running/Paused → Stopped with a `game_stop()` notification.
    ///
    /// The session is Stopped even if the notification fails.
    pub fn stop(&mut self) -> Result<()> {
        let old = self.state;
        self.set_state(GameState::Stopped);
        if old != GameState::Stopped {
            self.script.call("game_stop")?;
        }
        Ok(())
    }

    /// Running ↔ Paused.  No effect while stopped.
    pub fn toggle_pause(&mut self) {
        match self.state {
            GameState::Running => self.set_state(GameState::Paused),
            GameState::Paused => self.set_state(GameState::Running),
            GameState::Stopped => {}
        }
    }

    /// Advance the simulation one step.  A non-zero `game_turn()` result ends
    /// the game through [`Game::stop`].
    pub fn turn(&mut self) -> Result<()> {
        if self.state != GameState::Running {
            return Ok(());
        }
        let rc = self.script.call_int("game_turn")?;
        self.update_field_buffer()?;
        self.turn_no += 1;

        if rc != 0 {
            tracing::info!(turn = self.turn_no, rc, "game over");
            self.stop()?;
        }
        Ok(())
    }

    // ── Controls ──────────────────────────────────────────────────────────────

    /// Forward a move to the script and refresh the field.  Only while
    /// running; moves never end the game.
    pub fn apply_move(&mut self, m: Move) -> Result<()> {
        if self.state != GameState::Running {
            return Ok(());
        }
        self.script.call(m.function_name())?;
        self.update_field_buffer()
    }

    pub fn move_left(&mut self) -> Result<()> {
        self.apply_move(Move::Left)
    }

    pub fn move_right(&mut self) -> Result<()> {
        self.apply_move(Move::Right)
    }

    pub fn move_up(&mut self) -> Result<()> {
        self.apply_move(Move::Up)
    }

    pub fn move_down(&mut self) -> Result<()> {
        self.apply_move(Move::Down)
    }

    pub fn move_drop(&mut self) -> Result<()> {
        self.apply_move(Move::Drop)
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == GameState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state == GameState::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.state == GameState::Stopped
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Number of completed turns since construction.
    pub fn turn_number(&self) -> u64 {
        self.turn_no
    }

    /// The field snapshot, row-major: `field()[row * width + col]`.
    pub fn field(&self) -> &[i8] {
        &self.field
    }

    /// One cell of the field snapshot, or `None` outside the grid.
    pub fn cell(&self, row: usize, col: usize) -> Option<i8> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.field.get(row * self.width + col).copied()
    }

    /// The session's script host.
    pub fn script(&self) -> &ScriptHost {
        &self.script
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn set_state(&mut self, state: GameState) {
        if self.state != state {
            tracing::debug!(from = self.state.name(), to = state.name(), "state change");
        }
        self.state = state;
    }

    fn update_field_buffer(&mut self) -> Result<()> {
        self.script
            .matrix(FIELD_FN, self.height, self.width, &mut self.field)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
