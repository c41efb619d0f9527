//! Tests for engine start, stop and introspection

use super::helpers::*;
use crate::config::EngineConfig;
use crate::interpreter::TickOutcome;
use crate::stage::Sprite;

#[test]
fn test_start_without_program_fails_soft() {
    let mut h = Harness::idle(EngineConfig::default());
    h.engine.bind_runtime(h.sprite.clone());
    h.engine.start();

    assert!(!h.engine.is_running());
    assert!(h.logged("Engine: missing program/runtime."));
    assert_eq!(h.frame(), TickOutcome::Idle);
}

#[test]
fn test_start_without_sprite_fails_soft() {
    let mut h = Harness::idle(EngineConfig::default());
    h.engine.load_program(program(vec![vec![incr("n")]]));
    h.engine.start();

    assert!(!h.engine.is_running());
    assert!(h.logged("Engine: missing program/runtime."));
}

#[test]
fn test_start_with_only_handlers() {
    let prog = with_handler(program(vec![]), "go", vec![incr("n")]);
    let h = Harness::start(prog);

    assert!(!h.engine.is_running());
    assert!(h.logged("No start scripts found."));
}

#[test]
fn test_start_creates_one_thread_per_script() {
    let h = Harness::start(program(vec![vec![wait(1.0)], vec![wait(1.0)]]));

    assert!(h.engine.is_running());
    assert!(h.engine.is_tick_pending());
    assert!(h.logged("Engine started (2 script(s))."));

    let origins: Vec<&str> = h.engine.threads().iter().map(|t| t.origin.as_str()).collect();
    assert_eq!(origins, vec!["script-0", "script-1"]);
    let ids: Vec<u64> = h.engine.threads().iter().map(|t| t.id.0).collect();
    assert!(ids[0] >= 1 && ids[1] > ids[0]);
}

#[test]
fn test_stop_is_idempotent() {
    let mut h = Harness::start(program(vec![vec![forever(vec![wait(0.1)])]]));
    h.frames(3);
    assert_eq!(h.log.borrow().highlighted(), Some("blk-wait"));

    h.engine.stop();
    h.engine.stop();

    assert!(!h.engine.is_running());
    assert!(!h.engine.is_tick_pending());
    assert!(h.engine.threads().is_empty());
    assert_eq!(h.log.borrow().highlighted(), None);
    assert_eq!(h.frame(), TickOutcome::Idle);
}

#[test]
fn test_stop_before_start() {
    let mut h = Harness::idle(EngineConfig::default());
    h.engine.stop();
    assert!(!h.engine.is_running());
}

#[test]
fn test_stop_all_halts_every_thread() {
    // A: wait 0.05; stop all; set never = 1
    // B: forever { wait 0.01 }
    let mut h = Harness::start(program(vec![
        vec![wait(0.05), stop_all(), set("never", num(1.0))],
        vec![forever(vec![wait(0.01)])],
    ]));
    h.run_until_stopped(20);

    assert_eq!(h.var("never"), 0.0);
    assert!(h.engine.threads().is_empty());
    assert!(h.logged("STOP ALL encountered."));
    assert!(!h.logged("All scripts finished."));
    assert_eq!(h.log.borrow().highlighted(), None);
}

#[test]
fn test_stop_this_ends_only_its_thread() {
    let mut h = Harness::start(program(vec![
        vec![stop_this(), set("a", num(1.0))],
        vec![wait(0.05), set("b", num(1.0))],
    ]));
    h.frame();
    assert_eq!(h.engine.live_thread_count(), 1);

    h.run_until_stopped(20);
    assert_eq!(h.var("a"), 0.0);
    assert_eq!(h.var("b"), 1.0);
    assert!(h.logged("STOP THIS SCRIPT encountered."));
}

#[test]
fn test_engine_stops_when_all_scripts_finish() {
    let mut h = Harness::start(program(vec![vec![incr("n")]]));
    assert_eq!(h.frame(), TickOutcome::Stopped);

    assert!(!h.engine.is_running());
    assert!(!h.engine.is_tick_pending());
    assert!(h.logged("All scripts finished."));
}

#[test]
fn test_tick_requests_next_tick_while_running() {
    let mut h = Harness::start(program(vec![vec![wait(1.0)]]));
    assert_eq!(h.frame(), TickOutcome::Continue);
    assert!(h.engine.is_tick_pending());
    assert_eq!(h.engine.tick_count(), 1);
}

#[test]
fn test_variables_survive_restart() {
    let mut h = Harness::start(program(vec![vec![incr("runs")]]));
    h.run_until_stopped(10);
    h.engine.start();
    h.run_until_stopped(10);

    assert_eq!(h.var("runs"), 2.0);
}

#[test]
fn test_engines_are_independent() {
    let mut a = Harness::start(program(vec![vec![mv(100.0)]]));
    let mut b = Harness::start(program(vec![vec![turn(90.0), set("b", num(1.0))]]));
    a.run_until_stopped(100);
    b.run_until_stopped(100);

    assert!(approx(a.sprite().x, 100.0));
    assert_eq!(a.sprite().rotation, 0.0);
    assert!(approx(b.sprite().rotation, 90.0));
    assert_eq!(b.sprite().x, 0.0);
    assert_eq!(a.var("b"), 0.0);
    assert_eq!(b.var("b"), 1.0);
}

#[test]
fn test_unsupported_command_is_skipped() {
    use crate::interpreter::{Command, CommandKind};
    let mut h = Harness::start(program(vec![vec![
        Command::new("blk-x", CommandKind::Unsupported),
        set("after", num(1.0)),
    ]]));
    h.run_until_stopped(10);

    assert_eq!(h.var("after"), 1.0);
    assert_eq!(h.sprite(), Sprite::new());
}
