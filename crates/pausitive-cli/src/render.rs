//! Terminal rendering of engine events.

use std::io::Write;

use pausitive_core::{EngineEvent, Phase, Technique};

const BAR_WIDTH: usize = 30;

/// Whole seconds left in a phase, as shown on the countdown.
pub fn countdown(phase_secs: f64, progress: f64) -> u64 {
    (phase_secs * (1.0 - progress)).ceil().max(0.0) as u64
}

/// Fixed-width bar filled in proportion to `progress`.
pub fn progress_bar(progress: f64, width: usize) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), " ".repeat(width - filled))
}

pub fn phase_secs(technique: &Technique, phase: Phase) -> f64 {
    match phase {
        Phase::Inhale => technique.inhale_secs,
        Phase::Exhale => technique.exhale_secs,
    }
}

/// Human-readable line for a discrete event; `None` for progress ticks.
pub fn describe(event: &EngineEvent, technique: &Technique) -> Option<String> {
    match event {
        EngineEvent::PhaseChange {
            phase,
            set,
            total_sets,
        } => Some(format!(
            "Set {set}/{total_sets}  {} ({}s)",
            phase.label(),
            phase_secs(technique, *phase)
        )),
        EngineEvent::SetComplete {
            completed_set,
            total_sets,
        } => Some(format!("Set {completed_set} of {total_sets} complete")),
        EngineEvent::SessionComplete { total_sets, technique } => Some(format!(
            "Session complete: {total_sets} sets of {}",
            technique.name
        )),
        EngineEvent::Progress { .. } => None,
    }
}

/// Redraw the in-place progress line on stderr.
pub fn draw_progress(phase: Phase, progress: f64, technique: &Technique) {
    let mut err = std::io::stderr().lock();
    let _ = write!(
        err,
        "\r{} {:>3}s {:<12}",
        progress_bar(progress, BAR_WIDTH),
        countdown(phase_secs(technique, phase), progress),
        phase.label()
    );
    let _ = err.flush();
}

/// Print one line to stdout, ending it with `\r\n` while the terminal is in
/// raw mode.
pub fn say(text: &str) {
    let raw = crossterm::terminal::is_raw_mode_enabled().unwrap_or(false);
    let mut out = std::io::stdout().lock();
    let _ = if raw {
        write!(out, "{text}\r\n")
    } else {
        writeln!(out, "{text}")
    };
    let _ = out.flush();
}

pub fn clear_progress() {
    let mut err = std::io::stderr().lock();
    let _ = write!(err, "\r{}\r", " ".repeat(BAR_WIDTH + 20));
    let _ = err.flush();
}
