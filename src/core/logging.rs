//! Terminal Logging Module
//!
//! Provides the command line's output surface:
//! - Structured diagnostics through `tracing` (stderr, optional JSON file)
//! - `log` crate events bridged into `tracing`
//! - Error reports rendered by miette
//! - Styled one-line status messages and summary panels (console)

use std::fs;
use std::io;
use std::path::Path;
use std::sync::OnceLock;

use console::{style, Term};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// File name prefix of the rolling JSON log.
const LOG_FILE_PREFIX: &str = "compendium-forge.log";

static TERMINAL_CAPS: OnceLock<TerminalCapabilities> = OnceLock::new();

fn get_terminal_caps() -> &'static TerminalCapabilities {
    TERMINAL_CAPS.get_or_init(TerminalCapabilities::detect)
}

// ============================================================================
// Terminal Capability Detection
// ============================================================================

/// Detected terminal capabilities
#[derive(Debug, Clone)]
pub struct TerminalCapabilities {
    pub supports_color: bool,
    pub supports_unicode: bool,
    pub is_interactive: bool,
    pub width: u16,
}

impl TerminalCapabilities {
    /// Detect terminal capabilities from environment
    pub fn detect() -> Self {
        use is_terminal::IsTerminal;

        let term = Term::stdout();
        let is_interactive = io::stdout().is_terminal();
        let width = term.size().1;

        // Unicode support heuristic
        let supports_unicode = std::env::var("TERM")
            .map(|t| !t.contains("dumb"))
            .unwrap_or(true)
            && std::env::var("LANG")
                .map(|l| l.contains("UTF-8") || l.contains("utf8"))
                .unwrap_or(true);

        Self {
            supports_color: term.features().colors_supported(),
            supports_unicode,
            is_interactive,
            width,
        }
    }

    /// Check if colors should be used
    pub fn should_colorize(&self) -> bool {
        self.is_interactive && self.supports_color
    }
}

// ============================================================================
// Logging Initialization
// ============================================================================

/// Default filter directive for a `-v` count.
///
/// `RUST_LOG` always takes precedence over the flag.
pub fn filter_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn,compendium_forge=info",
        1 => "info,compendium_forge=debug",
        _ => "debug,compendium_forge=trace",
    }
}

/// Initialize the logging system.
///
/// This sets up:
/// 1. A stderr logger (compact, colored when interactive) so stdout stays
///    free for command output.
/// 2. When `log_dir` is given, a daily rolling JSON file logger.
/// 3. Redirects standard `log` crate events to `tracing`.
/// 4. Configures miette for error reporting.
///
/// Returns the file writer's `WorkerGuard`, which must be kept alive for
/// the duration of the run so buffered lines are flushed on exit.
pub fn init(verbosity: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbosity)));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .compact()
        .with_target(false)
        .with_ansi(get_terminal_caps().should_colorize())
        .with_filter(env_filter.clone());

    let (file_layer, guard) = match log_dir {
        Some(dir) => match fs::create_dir_all(dir) {
            Ok(()) => {
                let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // File Layer: JSON format for easy parsing/ingestion
                let layer = tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .json()
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(true)
                    .with_filter(env_filter);
                (Some(layer), Some(guard))
            }
            Err(e) => {
                eprintln!("Failed to create logs directory {}: {}", dir.display(), e);
                (None, None)
            }
        },
        None => (None, None),
    };

    if tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        // A subscriber is already installed (repeated init in one process).
        return guard;
    }

    // Usually already bridged by the subscriber's own log support.
    let _ = tracing_log::LogTracer::init();

    init_miette();

    if let Some(dir) = log_dir {
        log::debug!("Logging to {:?} (daily rolling)", dir.join(LOG_FILE_PREFIX));
    }

    guard
}

/// Initialize miette for error reporting
fn init_miette() {
    let caps = get_terminal_caps();

    miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .unicode(caps.supports_unicode)
                .context_lines(3)
                .tab_width(4)
                .break_words(true)
                .color(caps.should_colorize())
                .build(),
        )
    }))
    .ok(); // Ignore if already set
}

// ============================================================================
// Console Output Utilities
// ============================================================================

fn marker(unicode: &'static str, ascii: &'static str) -> &'static str {
    if get_terminal_caps().supports_unicode {
        unicode
    } else {
        ascii
    }
}

/// Render a panel with title and `key: value` rows.
pub fn render_panel(title: &str, rows: &[(String, String)], unicode: bool, width: usize) -> Vec<String> {
    let width = width.clamp(20, 80);
    let (h, tl, tr, bl, br, side) = if unicode {
        ("─", "╭", "╮", "╰", "╯", "│")
    } else {
        ("-", "+", "+", "+", "+", "|")
    };

    let title_display = format!(" {} ", title);
    let border_len = width
        .saturating_sub(title_display.chars().count())
        .saturating_sub(2)
        .max(1);
    let key_width = rows.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
    let content_width = width.saturating_sub(4).max(1);

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format!("{}{}{}{}", tl, title_display, h.repeat(border_len), tr));
    for (key, value) in rows {
        let row = format!("{:key_width$}  {}", key, value, key_width = key_width);
        lines.push(format!("{} {:content_width$} {}", side, row, side, content_width = content_width));
    }
    lines.push(format!("{}{}{}", bl, h.repeat(width.saturating_sub(2).max(1)), br));
    lines
}

/// Print a styled panel with title and `key: value` rows
pub fn print_panel(title: &str, rows: &[(String, String)]) {
    let caps = get_terminal_caps();
    for line in render_panel(title, rows, caps.supports_unicode, caps.width as usize) {
        println!("{}", style(line).cyan());
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", style(marker("✔", "[ok]")).green(), style(message).green());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!(
        "{} {}",
        style(marker("⚠", "[warn]")).yellow(),
        style(message).yellow().bold()
    );
}

// ============================================================================
// Tests
// ============================================================================
