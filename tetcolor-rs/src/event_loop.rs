//! Interactive driver: the application context and its event loop.
//!
//! ## Architecture
//!
//! A dedicated thread reads raw bytes from stdin and forwards them through
//! an [`mpsc`] channel.  [`App::run`] owns everything else and waits on a
//! single `tokio::select!`:
//!
//! ```text
//!   ┌──────────────────────────┐
//!   │  App::run()              │
//!   │  tokio::select! over:    │
//!   │  • stdin bytes           │◄── stdin thread
//!   │  • turn tick deadline    │
//!   │  • SIGWINCH              │
//!   │  • SIGTERM / SIGINT      │
//!   └──────────────────────────┘
//! ```
//!
//! Every handler runs to completion before the next event is taken, so the
//! [`Game`] is only ever touched by one caller at a time.  A script error
//! coming out of any game operation ends the loop; [`App::run`] returns it.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use crate::config::Settings;
use crate::game::{Game, GameState};
use crate::keybind::{KeyAction, KeyDecoder, Keymap};
use crate::script::ScriptError;
use crate::terminal::Terminal;

/// Why the event loop stopped abnormally.
#[derive(Debug, Error)]
pub enum LoopError {
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("terminal: {0}")]
    Io(#[from] io::Error),
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Everything the interactive front end owns.  Handlers receive it
/// explicitly; there is no global state.
pub struct App {
    pub settings: Settings,
    pub game: Option<Game>,
    pub terminal: Terminal,
    decoder: KeyDecoder,
    /// Next turn, when the tick is armed.
    next_tick: Option<Instant>,
    /// Current tick interval.
    tick: Duration,
    pub quit: bool,
    need_redraw: bool,
}

impl App {
    pub fn new(settings: Settings, terminal: Terminal) -> Self {
        let mut keymap = Keymap::new().with_defaults();
        for (seq, action) in &settings.bindings {
            keymap.bind(seq.clone(), *action);
        }
        let tick = settings.tick;
        Self {
            settings,
            game: None,
            terminal,
            decoder: KeyDecoder::new(keymap),
            next_tick: None,
            tick,
            quit: false,
            need_redraw: true,
        }
    }

    /// `true` while turns are being scheduled.
    pub fn tick_armed(&self) -> bool {
        self.next_tick.is_some()
    }

    // ── Main loop ─────────────────────────────────────────────────────────────

    /// Run until the player quits, a signal arrives, or a game operation
    /// fails.
    pub async fn run(&mut self) -> Result<(), LoopError> {
        let mut sigwinch = signal(SignalKind::window_change())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        let _raw = Terminal::enter_raw_mode()?;

        // A dedicated thread owns stdin: dropping a read future inside
        // select! would otherwise orphan blocking reads.
        let (stdin_tx, mut stdin_rx) = mpsc::channel::<Vec<u8>>(16);
        std::thread::spawn(move || {
            use std::io::Read;
            let stdin = std::io::stdin();
            let mut guard = stdin.lock();
            let mut buf = [0u8; 64];
            loop {
                match guard.read(&mut buf) {
                    Ok(0) | Err(_) => {
                        // EOF or error: empty vec as sentinel.
                        let _ = stdin_tx.blocking_send(vec![]);
                        break;
                    }
                    Ok(n) => {
                        if stdin_tx.blocking_send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let result = self.event_loop(&mut stdin_rx, &mut sigwinch, &mut sigterm, &mut sigint).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "session aborted");
        }
        result
    }

    async fn event_loop(
        &mut self,
        stdin_rx: &mut mpsc::Receiver<Vec<u8>>,
        sigwinch: &mut tokio::signal::unix::Signal,
        sigterm: &mut tokio::signal::unix::Signal,
        sigint: &mut tokio::signal::unix::Signal,
    ) -> Result<(), LoopError> {
        while !self.quit {
            if self.need_redraw {
                self.redraw()?;
            }

            let tick = self.next_tick;
            let timer = async {
                match tick {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                Some(bytes) = stdin_rx.recv() => {
                    if bytes.is_empty() {
                        self.quit = true;
                    }
                    for b in bytes {
                        if let Some(action) = self.decoder.push(b) {
                            self.on_key(action)?;
                        }
                        if self.quit {
                            break;
                        }
                    }
                }
                _ = timer => self.on_tick()?,
                _ = sigwinch.recv() => {
                    if let Ok((w, h)) = crossterm::terminal::size() {
                        self.terminal.handle_resize(w, h);
                    }
                    self.need_redraw = true;
                }
                _ = sigterm.recv() => self.quit = true,
                _ = sigint.recv() => self.quit = true,
            }
        }
        Ok(())
    }

    // ── Handlers ──────────────────────────────────────────────────────────────

    /// Timer expiry: one turn.  Disarms the tick once the game has stopped.
    pub fn on_tick(&mut self) -> Result<(), ScriptError> {
        let Some(game) = self.game.as_mut() else {
            self.next_tick = None;
            return Ok(());
        };
        game.turn()?;
        self.need_redraw = true;
        if game.is_stopped() {
            tracing::info!(turns = game.turn_number(), "game finished");
            self.next_tick = None;
        } else {
            self.reset_timer(self.tick);
        }
        Ok(())
    }

    /// Dispatch one decoded key.
    pub fn on_key(&mut self, action: KeyAction) -> Result<(), ScriptError> {
        tracing::debug!(key = action.name(), "key");
        match action {
            KeyAction::Quit => self.quit = true,
            KeyAction::StartStop => match self.game.as_ref().map(Game::state) {
                Some(GameState::Running) => {
                    self.next_tick = None;
                    self.need_redraw = true;
                    if let Some(game) = self.game.as_mut() {
                        game.stop()?;
                    }
                }
                Some(GameState::Paused) => {}
                Some(GameState::Stopped) | None => self.launch_game()?,
            },
            KeyAction::Pause => {
                if let Some(game) = self.game.as_mut() {
                    if !game.is_stopped() {
                        game.toggle_pause();
                        self.need_redraw = true;
                    }
                }
            }
            KeyAction::Left | KeyAction::Right | KeyAction::Up | KeyAction::Down | KeyAction::Drop => {
                let Some(game) = self.game.as_mut() else { return Ok(()) };
                if !game.is_running() {
                    return Ok(());
                }
                match action {
                    KeyAction::Left => game.move_left()?,
                    KeyAction::Right => game.move_right()?,
                    KeyAction::Up => game.move_up()?,
                    KeyAction::Down => game.move_down()?,
                    _ => {
                        game.move_drop()?;
                        self.reset_timer(self.tick);
                    }
                }
                self.need_redraw = true;
            }
        }
        Ok(())
    }

    /// Replace any previous session with a fresh one, start it, play the
    /// first turn and arm the tick.
    pub fn launch_game(&mut self) -> Result<(), ScriptError> {
        // Drop the old session (and its interpreter) before loading anew.
        self.game = None;
        let mut game = Game::from_config(&self.settings)?;
        tracing::info!(script = %self.settings.script.display(), "launch game");
        game.start()?;
        game.turn()?;
        let running = !game.is_stopped();
        self.game = Some(game);
        if running {
            self.reset_timer(self.tick);
        }
        self.need_redraw = true;
        Ok(())
    }

    fn reset_timer(&mut self, interval: Duration) {
        self.tick = interval;
        self.next_tick = Some(Instant::now() + interval);
    }

    fn redraw(&mut self) -> io::Result<()> {
        let idle = (self.settings.width, self.settings.height);
        self.terminal.render(self.game.as_ref(), idle)?;
        self.need_redraw = false;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCRIPT: &str = r#"
        turns = 0
        over_at = 3
        function game_start() turns = 0 end
        function game_stop() end
        function game_turn()
            turns = turns + 1
            if turns >= over_at then return 1 end
            return 0
        end
        function game_move_left() end
        function game_move_right() end
        function game_move_up() end
        function game_move_down() end
        function game_move_drop() end
        function get_game_field()
            local f = {}
            for r = 1, 2 do f[r] = {turns, turns} end
            return f
        end
    "#;

    fn app(script: &str) -> (App, tempfile::NamedTempFile) {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{script}").unwrap();
        let settings = Settings {
            width: 2,
            height: 2,
            script: f.path().to_path_buf(),
            ..Settings::default()
        };
        let term = Terminal::with_size(io::sink(), 40, 10);
        (App::new(settings, term), f)
    }

    #[test]
    fn enter_launches_and_plays_first_turn() {
        let (mut a, _f) = app(SCRIPT);
        a.on_key(KeyAction::StartStop).unwrap();
        let g = a.game.as_ref().unwrap();
        assert!(g.is_running());
        assert_eq!(g.turn_number(), 1);
        assert_eq!(g.field(), &[1, 1, 1, 1]);
        assert!(a.tick_armed());
    }

    #[test]
    fn enter_while_running_stops_and_disarms() {
        let (mut a, _f) = app(SCRIPT);
        a.on_key(KeyAction::StartStop).unwrap();
        a.on_key(KeyAction::StartStop).unwrap();
        assert!(a.game.as_ref().unwrap().is_stopped());
        assert!(!a.tick_armed());

        // A stopped game is replaced by a fresh one.
        a.on_key(KeyAction::StartStop).unwrap();
        let g = a.game.as_ref().unwrap();
        assert!(g.is_running());
        assert_eq!(g.turn_number(), 1);
    }

    #[test]
    fn ticks_until_game_over() {
        let (mut a, _f) = app(SCRIPT);
        a.on_key(KeyAction::StartStop).unwrap();
        a.on_tick().unwrap();
        assert!(a.tick_armed());
        a.on_tick().unwrap();
        let g = a.game.as_ref().unwrap();
        assert!(g.is_stopped());
        assert_eq!(g.turn_number(), 3);
        assert!(!a.tick_armed());
    }

    #[test]
    fn pause_blocks_moves_and_turns() {
        let (mut a, _f) = app(SCRIPT);
        a.on_key(KeyAction::StartStop).unwrap();
        a.on_key(KeyAction::Pause).unwrap();
        assert!(a.game.as_ref().unwrap().is_paused());
        a.on_tick().unwrap();
        a.on_key(KeyAction::Left).unwrap();
        assert_eq!(a.game.as_ref().unwrap().turn_number(), 1);

        a.on_key(KeyAction::Pause).unwrap();
        assert!(a.game.as_ref().unwrap().is_running());
    }

    #[test]
    fn keys_without_game_are_harmless() {
        let (mut a, _f) = app(SCRIPT);
        for action in [KeyAction::Left, KeyAction::Drop, KeyAction::Pause] {
            a.on_key(action).unwrap();
        }
        a.on_tick().unwrap();
        assert!(a.game.is_none());
        a.on_key(KeyAction::Quit).unwrap();
        assert!(a.quit);
    }

    #[test]
    fn script_error_surfaces_from_handlers() {
        let (mut a, _f) = app(&SCRIPT.replace(
            "function game_move_left() end",
            "function game_move_left() error('stuck') end",
        ));
        a.on_key(KeyAction::StartStop).unwrap();
        let err = a.on_key(KeyAction::Left).unwrap_err();
        assert_eq!(err.function(), Some("game_move_left"));
    }

    #[test]
    fn missing_script_fails_launch() {
        let (mut a, f) = app(SCRIPT);
        a.settings.script = f.path().with_extension("missing");
        let err = a.on_key(KeyAction::StartStop).unwrap_err();
        assert!(matches!(err, ScriptError::Load { .. }));
        assert!(a.game.is_none());
    }

    #[test]
    fn custom_bindings_apply() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{SCRIPT}").unwrap();
        let mut settings = Settings {
            script: f.path().to_path_buf(),
            ..Settings::default()
        };
        settings.bindings.push((b"x".to_vec(), KeyAction::Quit));
        let mut a = App::new(settings, Terminal::with_size(io::sink(), 40, 10));
        assert_eq!(a.decoder.push(b'x'), Some(KeyAction::Quit));
    }
}
