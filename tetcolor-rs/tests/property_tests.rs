use proptest::prelude::*;
use tetcolor::game::{Game, GameState, Move, EMPTY_CELL};
use tetcolor::script::{ScriptError, ScriptHost};

// ── Session state machine ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Op {
    Start,
    Stop,
    Pause,
    Turn,
    Play(Move),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => Just(Op::Start),
        1 => Just(Op::Stop),
        1 => Just(Op::Pause),
        3 => Just(Op::Turn),
        2 => prop::sample::select(Move::ALL).prop_map(Op::Play),
    ]
}

/// `game_turn` reports game over on every `over_every`-th call (never when
/// 0).  The field is filled with the number of moves made so far.
const MODEL_RULES: &str = r#"
    calls = {}
    over_every = 0
    local moves = 0
    local function count(name) calls[name] = (calls[name] or 0) + 1 end

    function game_start() count('game_start') end
    function game_stop() count('game_stop') end
    function game_turn()
        count('game_turn')
        if over_every > 0 and calls.game_turn % over_every == 0 then return 1 end
        return 0
    end
    for _, n in ipairs({'left', 'right', 'up', 'down', 'drop'}) do
        _G['game_move_' .. n] = function() count('game_move_' .. n) moves = moves + 1 end
    end
    function get_game_field()
        count('get_game_field')
        local f = {}
        for r = 1, 2 do f[r] = {moves, moves, moves} end
        return f
    end
"#;

/// What the session should look like after a sequence of operations.
#[derive(Debug, Default)]
struct Model {
    state: GameState,
    turns: u64,
    starts: i64,
    stops: i64,
    turn_calls: i64,
    move_calls: i64,
    refreshes: i64,
    cell: i8,
}

impl Model {
    fn new() -> Self {
        Self { cell: EMPTY_CELL, ..Self::default() }
    }

    fn refresh(&mut self) {
        self.refreshes += 1;
        self.cell = self.move_calls as i8;
    }

    fn apply(&mut self, op: Op, over_every: i64) {
        match (op, self.state) {
            (Op::Start, GameState::Stopped) => {
                self.state = GameState::Running;
                self.starts += 1;
                self.refresh();
            }
            (Op::Stop, GameState::Running | GameState::Paused) => {
                self.state = GameState::Stopped;
                self.stops += 1;
            }
            (Op::Pause, GameState::Running) => self.state = GameState::Paused,
            (Op::Pause, GameState::Paused) => self.state = GameState::Running,
            (Op::Turn, GameState::Running) => {
                self.turn_calls += 1;
                self.refresh();
                self.turns += 1;
                if over_every > 0 && self.turn_calls % over_every == 0 {
                    self.state = GameState::Stopped;
                    self.stops += 1;
                }
            }
            (Op::Play(_), GameState::Running) => {
                self.move_calls += 1;
                self.refresh();
            }
            _ => {}
        }
    }
}

fn apply(game: &mut Game, op: Op) -> Result<(), ScriptError> {
    match op {
        Op::Start => game.start(),
        Op::Stop => game.stop(),
        Op::Pause => {
            game.toggle_pause();
            Ok(())
        }
        Op::Turn => game.turn(),
        Op::Play(m) => game.apply_move(m),
    }
}

fn count(game: &Game, name: &str) -> i64 {
    game.script()
        .eval::<Option<i64>>(&format!("calls['{name}']"))
        .unwrap()
        .unwrap_or(0)
}

proptest! {
    /// Any sequence of controls keeps the session consistent with a simple
    /// model of the state machine and the script calls it makes.
    #[test]
    fn session_follows_model(
        ops in prop::collection::vec(op(), 0..80),
        over_every in 0i64..6,
    ) {
        let host = ScriptHost::new().unwrap();
        host.do_string(MODEL_RULES).unwrap();
        host.do_string(&format!("over_every = {over_every}")).unwrap();
        let mut game = Game::with_host(3, 2, host);
        let mut model = Model::new();

        for op in ops {
            apply(&mut game, op).unwrap();
            model.apply(op, over_every);

            prop_assert_eq!(game.state(), model.state);
            prop_assert_eq!(game.turn_number(), model.turns);
            prop_assert_eq!(game.field().len(), 6);
            prop_assert!(game.field().iter().all(|&c| c == model.cell));
        }

        prop_assert_eq!(count(&game, "game_start"), model.starts);
        prop_assert_eq!(count(&game, "game_stop"), model.stops);
        prop_assert_eq!(count(&game, "game_turn"), model.turn_calls);
        prop_assert_eq!(count(&game, "get_game_field"), model.refreshes);
        let moves: i64 = Move::ALL.iter().map(|m| count(&game, m.function_name())).sum();
        prop_assert_eq!(moves, model.move_calls);
        prop_assert_eq!(game.level(), 0);
    }
}

// ── Matrix conversion ─────────────────────────────────────────────────────────

proptest! {
    /// A bad cell at `(bad_r, bad_c)` leaves every earlier row converted and
    /// the failing row and all later rows untouched.
    #[test]
    fn matrix_commits_whole_rows_only(
        rows in 1usize..7,
        cols in 1usize..7,
        bad in prop::option::of((0usize..7, 0usize..7)),
        fill in any::<i8>(),
    ) {
        let bad = bad.map(|(r, c)| (r % rows, c % cols));
        let host = ScriptHost::new().unwrap();
        let (bad_r, bad_c) = bad.map_or((0, 0), |(r, c)| (r + 1, c + 1));
        host.do_string(&format!(
            "function field()
                 local f = {{}}
                 for r = 1, {rows} do
                     f[r] = {{}}
                     for c = 1, {cols} do f[r][c] = r * 100 + c end
                 end
                 if {bad_r} > 0 then f[{bad_r}][{bad_c}] = 'x' end
                 return f
             end"
        )).unwrap();

        let mut dest = vec![fill; rows * cols];
        let result = host.matrix("field", rows, cols, &mut dest);

        let expect = |r: usize, c: usize| ((r + 1) * 100 + c + 1) as i64 as i8;
        match bad {
            None => {
                prop_assert!(result.is_ok());
                for r in 0..rows {
                    for c in 0..cols {
                        prop_assert_eq!(dest[r * cols + c], expect(r, c));
                    }
                }
            }
            Some((br, bc)) => {
                let err = result.unwrap_err();
                prop_assert_eq!(err.position(), Some((br + 1, Some(bc + 1))));
                for r in 0..rows {
                    for c in 0..cols {
                        let want = if r < br { expect(r, c) } else { fill };
                        prop_assert_eq!(dest[r * cols + c], want);
                    }
                }
            }
        }
    }

    /// Integer results wrap to their low 8 bits; floats truncate first.
    #[test]
    fn matrix_cells_wrap_to_eight_bits(n in -100_000i64..100_000, frac in 0.0f64..0.99) {
        let host = ScriptHost::new().unwrap();
        host.do_string(&format!(
            "function ints() return {{{{{n}}}}} end
             function floats() return {{{{{n} + ({frac})}}}} end"
        )).unwrap();

        let mut dest = [0i8; 1];
        host.matrix("ints", 1, 1, &mut dest).unwrap();
        prop_assert_eq!(dest[0], n as i8);

        host.matrix("floats", 1, 1, &mut dest).unwrap();
        let f = n as f64 + frac;
        prop_assert_eq!(dest[0], (f as i64) as i8);
    }
}
