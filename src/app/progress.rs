use std::io::{IsTerminal, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use crossterm::{
    cursor, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Receives run progress. `start` announces the number of ticks that make a
/// complete run; `increment` is one completed request (count mode) or one
/// elapsed second (duration mode).
pub trait ProgressSink: Send + Sync {
    fn start(&self, total: u64);
    fn increment(&self);
    fn finish(&self);
}

/// Sink used with `--no-progress` or when stderr is not a terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&self, _total: u64) {}
    fn increment(&self) {}
    fn finish(&self) {}
}

const REFRESH: Duration = Duration::from_millis(250);
const BAR_WIDTH: usize = 30;

#[derive(Debug, Default)]
struct ProgressState {
    total: AtomicU64,
    done: AtomicU64,
    started: OnceLock<Instant>,
    finished: AtomicBool,
    // Serialises writes so the final line is never overdrawn.
    print_lock: Mutex<()>,
}

/// Single-line stderr progress bar redrawn at a fixed interval.
#[derive(Debug)]
pub struct TerminalProgress {
    state: Arc<ProgressState>,
    no_color: bool,
    refresh: CancellationToken,
}

impl TerminalProgress {
    #[must_use]
    pub fn new(no_color: bool) -> Self {
        Self {
            state: Arc::new(ProgressState::default()),
            no_color,
            refresh: CancellationToken::new(),
        }
    }
}

/// Chooses the terminal sink when it is wanted and stderr is a TTY.
#[must_use]
pub fn progress_sink(no_progress: bool, no_color: bool) -> Arc<dyn ProgressSink> {
    if no_progress || !std::io::stderr().is_terminal() {
        Arc::new(NoProgress)
    } else {
        Arc::new(TerminalProgress::new(no_color))
    }
}

impl ProgressSink for TerminalProgress {
    fn start(&self, total: u64) {
        self.state.total.store(total.max(1), Ordering::Relaxed);
        if self.state.started.set(Instant::now()).is_err() {
            return;
        }

        let state = Arc::clone(&self.state);
        let cancel = self.refresh.clone();
        let no_color = self.no_color;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REFRESH);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if draw(&state, no_color, false).is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }

    fn increment(&self) {
        self.state.done.fetch_add(1, Ordering::Relaxed);
    }

    fn finish(&self) {
        self.refresh.cancel();
        if self.state.started.get().is_some() && draw(&self.state, self.no_color, true).is_err() {
            tracing::debug!("Failed to draw final progress line.");
        }
    }
}

fn draw(state: &ProgressState, no_color: bool, last: bool) -> Result<(), std::io::Error> {
    let Ok(_guard) = state.print_lock.lock() else {
        return Ok(());
    };
    if state.finished.load(Ordering::Relaxed) {
        return Ok(());
    }
    if last {
        state.finished.store(true, Ordering::Relaxed);
    }

    let total = state.total.load(Ordering::Relaxed).max(1);
    let done = state.done.load(Ordering::Relaxed).min(total);
    let elapsed_ms = state
        .started
        .get()
        .map_or(0, |started| started.elapsed().as_millis());

    let mut out = std::io::stderr();
    queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine))?;
    for (text, color) in progress_segments(done, total, elapsed_ms) {
        match color {
            Some(color) if !no_color => {
                queue!(out, SetForegroundColor(color), Print(&text), ResetColor)?;
            }
            Some(_) | None => queue!(out, Print(&text))?,
        }
    }
    if last {
        queue!(out, Print("\n"))?;
    }
    out.flush()
}

fn progress_segments(done: u64, total: u64, elapsed_ms: u128) -> Vec<(String, Option<Color>)> {
    let total = u128::from(total.max(1));
    let done = u128::from(done).min(total);
    let width = u128::from(u64::try_from(BAR_WIDTH).unwrap_or(u64::MAX));

    let filled = done
        .saturating_mul(width)
        .checked_div(total)
        .map_or(0, |value| usize::try_from(value).unwrap_or(BAR_WIDTH))
        .min(BAR_WIDTH);
    let percent_x100 = done.saturating_mul(10_000).checked_div(total).unwrap_or(0);
    let elapsed_tenths = elapsed_ms.checked_div(100).unwrap_or(0);

    vec![
        (
            format!(
                "[{}{}]",
                "#".repeat(filled),
                "-".repeat(BAR_WIDTH.saturating_sub(filled))
            ),
            None,
        ),
        (
            format!(
                " {}.{:02}%",
                percent_x100.checked_div(100).unwrap_or(0),
                percent_x100.checked_rem(100).unwrap_or(0)
            ),
            Some(Color::Cyan),
        ),
        (
            format!(
                " | {}/{} | {}.{}s",
                done,
                total,
                elapsed_tenths.checked_div(10).unwrap_or(0),
                elapsed_tenths.checked_rem(10).unwrap_or(0)
            ),
            Some(Color::Yellow),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};

    #[test]
    fn segments_show_percentage_and_counts() -> AppResult<()> {
        let segments = progress_segments(3, 12, 2_340);
        let text: String = segments.iter().map(|(text, _)| text.as_str()).collect();
        let expected = format!("[{}{}] 25.00% | 3/12 | 2.3s", "#".repeat(7), "-".repeat(23));
        if text != expected {
            return Err(AppError::validation(format!("Unexpected line: {}", text)));
        }
        Ok(())
    }

    #[test]
    fn segments_clamp_overshoot() -> AppResult<()> {
        let segments = progress_segments(50, 10, 0);
        let text: String = segments.iter().map(|(text, _)| text.as_str()).collect();
        if !text.contains("100.00%") || !text.contains("10/10") {
            return Err(AppError::validation(format!("Unexpected line: {}", text)));
        }
        Ok(())
    }
}
