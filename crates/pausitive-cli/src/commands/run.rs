use std::io::{self, IsTerminal};
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Args;
use pausitive_core::catalog::format_duration;
use pausitive_core::storage::{MAX_FPS, MIN_FPS};
use pausitive_core::{
    BreathingEngine, BreathingSession, Clock, Config, EngineEvent, EngineEventKind, FrameQueue,
    ManualClock, SessionRecord, SessionTracker, SystemClock, Technique,
};

use super::open_history;
use crate::keys::{self, KeyCommand};
use crate::render;

/// Longest accepted value for `--pause-after` and `--pause-for`.
const MAX_PAUSE_SECS: f64 = 24.0 * 60.0 * 60.0;

#[derive(Args)]
pub struct RunArgs {
    /// Technique id (defaults to session.default_technique)
    #[arg(long)]
    pub technique: Option<String>,
    /// Mode id (defaults to session.default_mode)
    #[arg(long)]
    pub mode: Option<String>,
    /// Set count for the custom mode
    #[arg(long)]
    pub sets: Option<u32>,
    /// Drive the session on a simulated clock instead of waiting
    #[arg(long)]
    pub simulate: bool,
    /// Frames per second (defaults to display.fps)
    #[arg(long)]
    pub fps: Option<u32>,
    /// Print events and the final record as JSON lines
    #[arg(long)]
    pub json: bool,
    /// Pause after this many seconds of breathing
    #[arg(long, value_name = "SECS")]
    pub pause_after: Option<f64>,
    /// How long the scripted pause lasts
    #[arg(long, value_name = "SECS", default_value_t = 5.0)]
    pub pause_for: f64,
}

/// A pause scheduled from the command line, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ScriptedPause {
    at_ms: f64,
    for_ms: f64,
}

/// Validate the pause flags. Both must be finite and within a day.
fn scripted_pause_from(
    pause_after: Option<f64>,
    pause_for: f64,
) -> Result<Option<ScriptedPause>, String> {
    let flags = [
        ("--pause-after", pause_after.unwrap_or(0.0)),
        ("--pause-for", pause_for),
    ];
    for (flag, secs) in flags {
        if !secs.is_finite() || !(0.0..=MAX_PAUSE_SECS).contains(&secs) {
            return Err(format!(
                "{flag} must be between 0 and {MAX_PAUSE_SECS} seconds, got {secs}"
            ));
        }
    }
    Ok(pause_after.map(|after| ScriptedPause {
        at_ms: after * 1000.0,
        for_ms: pause_for * 1000.0,
    }))
}

#[derive(Debug, Clone, Copy)]
struct Output {
    json: bool,
    draws_bar: bool,
}

enum Outcome {
    Completed(SessionRecord),
    Stopped,
}

/// Where frame time comes from.
enum Driver {
    Realtime {
        clock: SystemClock,
        interactive: bool,
    },
    Simulated {
        clock: ManualClock,
        started: DateTime<Utc>,
    },
}

impl Driver {
    fn engine_clock(&self) -> Box<dyn Clock> {
        match self {
            Driver::Realtime { clock, .. } => Box::new(*clock),
            Driver::Simulated { clock, .. } => Box::new(clock.clone()),
        }
    }

    fn is_interactive(&self) -> bool {
        matches!(self, Driver::Realtime { interactive: true, .. })
    }

    fn now_ms(&self) -> f64 {
        match self {
            Driver::Realtime { clock, .. } => clock.now_ms(),
            Driver::Simulated { clock, .. } => clock.now_ms(),
        }
    }

    /// Let `ms` pass. Returns the new clock reading and any key pressed
    /// meanwhile; an interactive wait ends early on a key press.
    fn wait(&self, ms: f64) -> io::Result<(f64, Option<KeyCommand>)> {
        match self {
            Driver::Realtime { clock, interactive } => {
                let timeout = Duration::from_secs_f64(ms / 1000.0);
                let key = if *interactive {
                    keys::poll(timeout)?
                } else {
                    std::thread::sleep(timeout);
                    None
                };
                Ok((clock.now_ms(), key))
            }
            Driver::Simulated { clock, .. } => Ok((clock.advance(ms), None)),
        }
    }

    fn wall(&self) -> DateTime<Utc> {
        match self {
            Driver::Realtime { .. } => Utc::now(),
            Driver::Simulated { clock, started } => {
                chrono::Duration::try_milliseconds(clock.now_ms().round() as i64)
                    .and_then(|elapsed| started.checked_add_signed(elapsed))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC)
            }
        }
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let catalog = config.catalog();
    let technique = catalog
        .technique(args.technique.as_deref().unwrap_or(&config.session.default_technique))?
        .clone();
    let mode = catalog
        .mode(args.mode.as_deref().unwrap_or(&config.session.default_mode))?
        .clone();

    let fps = args.fps.unwrap_or(config.display.fps);
    if !(MIN_FPS..=MAX_FPS).contains(&fps) {
        return Err(format!("fps must be between {MIN_FPS} and {MAX_FPS}").into());
    }
    let frame_ms = 1000.0 / f64::from(fps);
    let mut scripted = scripted_pause_from(args.pause_after, args.pause_for)?;

    let driver = if args.simulate {
        Driver::Simulated {
            clock: ManualClock::new(),
            started: Utc::now(),
        }
    } else {
        Driver::Realtime {
            clock: SystemClock::new(),
            interactive: io::stdin().is_terminal(),
        }
    };

    let frames = FrameQueue::new();
    let engine = BreathingEngine::new(Box::new(frames.clone()), driver.engine_clock());
    let mut session = BreathingSession::new(engine, SessionTracker::new(open_history()));

    let out = Output {
        json: args.json,
        draws_bar: !args.simulate && !args.json && config.display.show_progress_bar,
    };
    subscribe_output(&mut session, &technique, out);

    let _raw = if driver.is_interactive() {
        Some(keys::RawMode::enable()?)
    } else {
        None
    };

    if !args.simulate && !args.json {
        if driver.is_interactive() {
            render::say("Space pauses or resumes, Esc stops.");
        }
        if config.session.countdown_secs > 0 {
            render::say(&format!(
                "Get ready: {} ({})",
                technique.name, technique.description
            ));
            std::thread::sleep(Duration::from_secs(u64::from(config.session.countdown_secs)));
        }
    }

    session.begin(technique, mode, args.sets, driver.wall())?;
    tracing::info!(fps, simulate = args.simulate, "session started");

    loop {
        match drive(&mut session, &driver, &frames, frame_ms, &mut scripted, out)? {
            Outcome::Completed(record) => print_record(&record, out)?,
            Outcome::Stopped => announce("Stopped", out),
        }

        if !driver.is_interactive() || out.json {
            return Ok(());
        }
        render::say("Press r to repeat, any other key to exit.");
        if keys::next_key()? != Some(KeyCommand::Repeat) {
            return Ok(());
        }
        session.repeat(driver.wall())?;
        tracing::info!("session repeated");
    }
}

/// Feed frames until the session completes or is stopped.
fn drive(
    session: &mut BreathingSession,
    driver: &Driver,
    frames: &FrameQueue,
    frame_ms: f64,
    scripted: &mut Option<ScriptedPause>,
    out: Output,
) -> Result<Outcome, Box<dyn std::error::Error>> {
    let started_ms = driver.now_ms();
    loop {
        if let Some(pause) = *scripted {
            if session.engine().is_running() && driver.now_ms() - started_ms >= pause.at_ms {
                *scripted = None;
                scripted_pause(session, driver, pause.for_ms, out)?;
            }
        }

        let (now_ms, key) = driver.wait(frame_ms)?;
        match key {
            Some(KeyCommand::TogglePause) => {
                let state = session.toggle_pause(driver.wall())?;
                announce(&format!("{state:?}"), out);
                continue;
            }
            Some(KeyCommand::Stop) => {
                session.stop();
                return Ok(Outcome::Stopped);
            }
            Some(KeyCommand::Repeat) | None => {}
        }

        let Some(frame) = frames.next_frame() else {
            if session.engine().is_paused() {
                continue;
            }
            return Err("session ended before completing".into());
        };
        if let Some(record) = session.pump(frame, now_ms, driver.wall()) {
            return Ok(Outcome::Completed(record));
        }
    }
}

fn subscribe_output(session: &mut BreathingSession, technique: &Technique, out: Output) {
    let discrete = [
        EngineEventKind::PhaseChange,
        EngineEventKind::SetComplete,
        EngineEventKind::SessionComplete,
    ];
    for kind in discrete {
        let technique = technique.clone();
        session.engine_mut().subscribe(kind, move |event| {
            if out.json {
                match serde_json::to_string(event) {
                    Ok(line) => render::say(&line),
                    Err(e) => tracing::warn!("Unprintable event: {}", e),
                }
                return;
            }
            if out.draws_bar {
                render::clear_progress();
            }
            if let Some(line) = render::describe(event, &technique) {
                render::say(&line);
            }
        });
    }

    if out.draws_bar {
        let technique = technique.clone();
        session
            .engine_mut()
            .subscribe(EngineEventKind::Progress, move |event| {
                if let EngineEvent::Progress { phase, progress, .. } = event {
                    render::draw_progress(*phase, *progress, &technique);
                }
            });
    }
}

fn scripted_pause(
    session: &mut BreathingSession,
    driver: &Driver,
    pause_ms: f64,
    out: Output,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = session.toggle_pause(driver.wall())?;
    announce(&format!("{state:?}"), out);
    driver.wait(pause_ms)?;
    let state = session.toggle_pause(driver.wall())?;
    announce(&format!("{state:?}"), out);
    Ok(())
}

fn announce(state: &str, out: Output) {
    if out.json {
        let line = serde_json::json!({ "type": "state", "state": state.to_lowercase() });
        render::say(&line.to_string());
        return;
    }
    if out.draws_bar {
        render::clear_progress();
    }
    render::say(state);
}

fn print_record(record: &SessionRecord, out: Output) -> Result<(), Box<dyn std::error::Error>> {
    if out.json {
        render::say(&serde_json::to_string(record)?);
        return Ok(());
    }
    render::say(&format!(
        "Recorded {}/{} sets of {} in {} (paused {})",
        record.completed_sets,
        record.total_sets,
        record.technique.name,
        format_duration(record.total_duration_ms / 1000),
        format_duration(record.paused_duration_ms / 1000)
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_flags_convert_to_milliseconds() {
        assert_eq!(scripted_pause_from(None, 5.0), Ok(None));
        assert_eq!(
            scripted_pause_from(Some(2.0), 30.0),
            Ok(Some(ScriptedPause {
                at_ms: 2_000.0,
                for_ms: 30_000.0
            }))
        );
        assert!(scripted_pause_from(Some(0.0), MAX_PAUSE_SECS).is_ok());
    }

    #[test]
    fn pause_flags_reject_unusable_values() {
        for bad in [-1.0, f64::INFINITY, f64::NAN, 1e300, MAX_PAUSE_SECS + 1.0] {
            assert!(scripted_pause_from(Some(1.0), bad).is_err(), "pause_for {bad}");
            assert!(scripted_pause_from(Some(bad), 5.0).is_err(), "pause_after {bad}");
        }
        assert!(scripted_pause_from(None, f64::INFINITY).is_err());
    }

    #[test]
    fn simulated_wall_time_saturates_instead_of_overflowing() {
        let clock = ManualClock::new();
        let driver = Driver::Simulated {
            clock: clock.clone(),
            started: Utc::now(),
        };
        clock.set(1e300);
        assert_eq!(driver.wall(), DateTime::<Utc>::MAX_UTC);
    }
}
