//! Session runner
//!
//! Host-side wiring around one engine: the sprite it drives, the log it
//! writes to, and the run / stop / reset / save / load actions of the
//! editor toolbar. Two drive loops feed it ticks: a real-time one paced by
//! a tokio interval, and a simulated one that advances a manual clock.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::compiler::{compile, BlockGraph, JsonWorkspace, WorkspaceError};
use crate::config::Config;
use crate::interpreter::{Clock, Engine, LogBuffer, ManualClock, Program, SystemClock, TickOutcome};
use crate::stage::{SharedSprite, Sprite};
use crate::storage::{ProjectStorage, StorageError};

/* ===================== Session ===================== */

pub struct Session {
    engine: Engine,
    sprite: SharedSprite,
    log: Rc<RefCell<LogBuffer>>,
}

impl Session {
    /// Session on the wall clock
    pub fn new(config: &Config) -> Self {
        Self::with_clock(config, SystemClock::new())
    }

    pub fn with_clock(config: &Config, clock: impl Clock + 'static) -> Self {
        let log = Rc::new(RefCell::new(LogBuffer::new(config.runner.log_capacity)));
        let engine = Engine::new(config.engine.clone())
            .with_clock(clock)
            .with_observer(log.clone());
        Self {
            engine,
            sprite: Sprite::shared(),
            log,
        }
    }

    /// Compile the graph and start it, replacing whatever was running
    pub fn run<G: BlockGraph>(&mut self, graph: &G) {
        let program = compile(graph);
        info!(scripts = program.scripts.len(), "running compiled program");
        self.note(&format!("Compiled: {} script(s).", program.scripts.len()));

        self.engine.stop();
        self.engine.load_program(program);
        self.engine.bind_runtime(self.sprite.clone());
        self.engine.start();
    }

    /// Parse a saved workspace and run it
    pub fn run_workspace(&mut self, workspace: Value) -> Result<(), WorkspaceError> {
        let graph = JsonWorkspace::from_value(workspace)?;
        self.run(&graph);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.engine.stop();
        self.note("Stopped.");
    }

    /// Stop and put the sprite back at the origin
    pub fn reset(&mut self) {
        self.engine.stop();
        self.sprite.borrow_mut().reset();
        self.note("Reset sprite + stopped engine.");
    }

    pub fn save(
        &mut self,
        storage: &mut impl ProjectStorage,
        workspace: &Value,
    ) -> Result<(), StorageError> {
        storage.save(workspace)?;
        self.note("Saved project.");
        Ok(())
    }

    pub fn load(&mut self, storage: &impl ProjectStorage) -> Result<Option<Value>, StorageError> {
        let workspace = storage.load()?;
        match workspace {
            Some(_) => self.note("Loaded project."),
            None => self.note("No saved project found."),
        }
        Ok(workspace)
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.engine.tick()
    }

    /* ===================== Introspection ===================== */

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The program of the last run
    pub fn program(&self) -> Option<&Program> {
        self.engine.program()
    }

    pub fn sprite(&self) -> Sprite {
        *self.sprite.borrow()
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.log.borrow().lines().map(str::to_string).collect()
    }

    pub fn highlighted(&self) -> Option<String> {
        self.log.borrow().highlighted().map(str::to_string)
    }

    fn note(&self, line: &str) {
        self.log.borrow_mut().push(line);
    }
}

/* ===================== Drive Loops ===================== */

/// How a drive loop ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub elapsed: Duration,
    /// The engine stopped by itself rather than hitting the time limit
    pub finished: bool,
}

/// Tick on a fixed-rate tokio interval until the engine stops or `limit`
/// passes. The session should run on the wall clock.
pub async fn drive_realtime(session: &mut Session, frame: Duration, limit: Duration) -> RunSummary {
    let mut interval = time::interval(frame);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let started = Instant::now();
    let mut frames = 0;

    while session.engine().is_tick_pending() {
        interval.tick().await;
        if started.elapsed() >= limit {
            debug!(frames, "time limit reached");
            break;
        }
        session.tick();
        frames += 1;
    }

    summarize(session, frames, started.elapsed())
}

/// Advance `clock` one frame per tick until the engine stops or `limit`
/// of simulated time passes. `clock` must be the session's clock.
pub fn drive_simulated(
    session: &mut Session,
    clock: &ManualClock,
    frame: Duration,
    limit: Duration,
) -> RunSummary {
    let mut elapsed = Duration::ZERO;
    let mut frames = 0;

    while session.engine().is_tick_pending() && elapsed < limit {
        clock.advance(frame);
        elapsed += frame;
        session.tick();
        frames += 1;
    }

    summarize(session, frames, elapsed)
}

fn summarize(session: &Session, frames: u64, elapsed: Duration) -> RunSummary {
    let summary = RunSummary {
        frames,
        elapsed,
        finished: !session.engine().is_running(),
    };
    debug!(?summary, "drive loop ended");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryProjectStorage;
    use serde_json::json;

    const FRAME: Duration = Duration::from_millis(16);

    fn move_then_wait() -> Value {
        json!({
            "blocks": { "blocks": [{
                "type": "bp_start", "id": "s",
                "next": { "block": {
                    "type": "bp_move", "id": "m",
                    "inputs": { "STEPS": { "block": { "type": "math_number", "fields": { "NUM": 100 } } } },
                    "next": { "block": {
                        "type": "bp_wait", "id": "w",
                        "inputs": { "SECS": { "block": { "type": "math_number", "fields": { "NUM": 0.1 } } } }
                    }}
                }}
            }]}
        })
    }

    fn forever_wait() -> Value {
        json!({
            "blocks": { "blocks": [{
                "type": "bp_start", "id": "s",
                "next": { "block": {
                    "type": "bp_forever", "id": "f",
                    "inputs": { "DO": { "block": {
                        "type": "bp_wait", "id": "w",
                        "inputs": { "SECS": { "block": { "type": "math_number", "fields": { "NUM": 0.05 } } } }
                    }}}
                }}
            }]}
        })
    }

    fn simulated() -> (Session, ManualClock) {
        let clock = ManualClock::new();
        (Session::with_clock(&Config::default(), clock.clone()), clock)
    }

    #[test]
    fn test_run_compiles_and_starts() {
        let (mut session, clock) = simulated();
        session.run_workspace(move_then_wait()).unwrap();
        assert_eq!(session.program().unwrap().scripts.len(), 1);
        assert!(session.engine().is_running());

        let summary = drive_simulated(&mut session, &clock, FRAME, Duration::from_secs(5));
        assert!(summary.finished);
        assert!((session.sprite().x - 100.0).abs() < 1e-6);

        let lines = session.log_lines();
        assert_eq!(lines[0], "Compiled: 1 script(s).");
        assert!(lines.iter().any(|l| l == "Engine started (1 script(s))."));
        assert!(lines.iter().any(|l| l == "All scripts finished."));
    }

    #[test]
    fn test_simulated_limit() {
        let (mut session, clock) = simulated();
        session.run_workspace(forever_wait()).unwrap();

        let summary = drive_simulated(&mut session, &clock, FRAME, Duration::from_millis(160));
        assert_eq!(summary.frames, 10);
        assert!(!summary.finished);
        assert!(session.engine().is_running());
    }

    #[test]
    fn test_run_replaces_previous_run() {
        let (mut session, clock) = simulated();
        session.run_workspace(forever_wait()).unwrap();
        drive_simulated(&mut session, &clock, FRAME, Duration::from_millis(100));

        session.run_workspace(move_then_wait()).unwrap();
        assert_eq!(session.engine().threads().len(), 1);
        assert_eq!(session.engine().threads()[0].origin, "s");
    }

    #[test]
    fn test_stop_and_reset() {
        let (mut session, clock) = simulated();
        session.run_workspace(move_then_wait()).unwrap();
        drive_simulated(&mut session, &clock, FRAME, Duration::from_millis(160));
        assert!(session.sprite().x > 0.0);

        session.stop();
        assert!(!session.engine().is_running());
        assert!(session.sprite().x > 0.0, "stop leaves the sprite where it is");
        assert_eq!(session.highlighted(), None);

        session.reset();
        assert_eq!(session.sprite(), Sprite::new());
        let lines = session.log_lines();
        assert!(lines.contains(&"Stopped.".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("Reset sprite + stopped engine."));
    }

    #[test]
    fn test_run_without_scripts() {
        let (mut session, clock) = simulated();
        session.run_workspace(json!({})).unwrap();
        assert!(session.program().unwrap().scripts.is_empty());

        let summary = drive_simulated(&mut session, &clock, FRAME, Duration::from_secs(1));
        assert_eq!(summary.frames, 0);
        assert!(session.log_lines().iter().any(|l| l == "No start scripts found."));
    }

    #[test]
    fn test_save_and_load() {
        let (mut session, _) = simulated();
        let mut storage = MemoryProjectStorage::new();

        assert_eq!(session.load(&storage).unwrap(), None);
        session.save(&mut storage, &move_then_wait()).unwrap();
        assert_eq!(session.load(&storage).unwrap(), Some(move_then_wait()));

        let lines = session.log_lines();
        assert_eq!(
            lines,
            vec!["No saved project found.", "Saved project.", "Loaded project."]
        );
    }

    #[test]
    fn test_log_capacity_from_config() {
        let mut config = Config::default();
        config.runner.log_capacity = 2;
        let mut session = Session::with_clock(&config, ManualClock::new());

        session.stop();
        session.stop();
        session.reset();
        assert_eq!(
            session.log_lines(),
            vec!["Stopped.", "Reset sprite + stopped engine."]
        );
    }

    #[test]
    fn test_drive_realtime() {
        let mut session = Session::new(&Config::default());
        session.run_workspace(move_then_wait()).unwrap();

        let summary = tokio_test::block_on(drive_realtime(
            &mut session,
            FRAME,
            Duration::from_secs(5),
        ));

        assert!(summary.finished);
        assert!(summary.frames > 0);
        assert!((session.sprite().x - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_drive_realtime_time_limit() {
        let mut session = Session::new(&Config::default());
        session.run_workspace(forever_wait()).unwrap();

        let summary = tokio_test::block_on(drive_realtime(
            &mut session,
            FRAME,
            Duration::from_millis(100),
        ));

        assert!(!summary.finished);
        assert!(session.engine().is_running());
    }
}
