use std::fs::File;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use tetcolor::cli::{self, ConfigFile};
use tetcolor::config::{self, Settings};
use tetcolor::event_loop::App;
use tetcolor::terminal::Terminal;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("tetcolor: {e}");
            eprintln!("{}", cli::USAGE);
            std::process::exit(1);
        }
    };

    // ── Settings: defaults < rc file < command line ───────────────────────────
    let mut settings = Settings::default();
    let rc = match &args.config {
        ConfigFile::Skip => None,
        ConfigFile::Explicit(path) => Some(path.clone()),
        ConfigFile::Search => config::find_user_config(),
    };
    let mut rc_errors = Vec::new();
    if let Some(path) = &rc {
        match settings.apply_file(path) {
            Ok(errors) => rc_errors = errors,
            Err(e) => {
                eprintln!("tetcolor: {}: {e}", path.display());
                std::process::exit(1);
            }
        }
    }
    if let Err(e) = args.apply(&mut settings) {
        eprintln!("tetcolor: {e}");
        std::process::exit(1);
    }

    // ── Logging ───────────────────────────────────────────────────────────────
    // The terminal is in raw mode while playing, so logs only go to a file.
    if let Some(path) = &settings.log_file {
        let file = match File::create(path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("tetcolor: cannot open log file {}: {e}", path.display());
                std::process::exit(1);
            }
        };
        let default_level = if args.debug { "debug" } else { "info" };
        let filter = EnvFilter::try_from_env("TETCOLOR_LOG")
            .unwrap_or_else(|_| EnvFilter::new(default_level));
        let layer = fmt::layer()
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file));
        tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .init();
    }

    if let Some(path) = &rc {
        tracing::info!(path = %path.display(), "config loaded");
    }
    for e in &rc_errors {
        tracing::warn!("rc file: {e}");
        eprintln!("tetcolor: warning: {e}");
    }

    let is_tty = unsafe {
        libc::isatty(libc::STDIN_FILENO) != 0 && libc::isatty(libc::STDOUT_FILENO) != 0
    };
    if !is_tty {
        eprintln!("tetcolor: needs an interactive terminal");
        std::process::exit(1);
    }

    // ── Play ──────────────────────────────────────────────────────────────────
    let terminal = Terminal::new(std::io::stdout());
    let mut app = App::new(settings, terminal);
    let result = app.run().await;
    drop(app);

    if let Err(e) = result {
        eprintln!("tetcolor: {e}");
        std::process::exit(1);
    }
}
