//! Test helpers for interpreter tests
//!
//! Command builders plus a harness that owns an engine, a manual clock, a
//! sprite and a log buffer, and advances them one display frame at a time.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::interpreter::types::{ArithOp, Block, CmpOp, Command, CommandKind, Expr, Program, Script};
use crate::interpreter::{Engine, LogBuffer, ManualClock, TickOutcome};
use crate::stage::{SharedSprite, Sprite};

pub const FRAME: Duration = Duration::from_millis(16);

/* ===================== Command Builders ===================== */

pub fn body(commands: Vec<Command>) -> Block {
    commands.into()
}

fn cmd(kind: CommandKind) -> Command {
    Command::new(format!("blk-{}", kind.name()), kind)
}

pub fn mv(steps: f64) -> Command {
    cmd(CommandKind::Move {
        steps: Expr::num(steps),
    })
}

pub fn mv_expr(steps: Expr) -> Command {
    cmd(CommandKind::Move { steps })
}

pub fn turn(degrees: f64) -> Command {
    cmd(CommandKind::Turn {
        degrees: Expr::num(degrees),
    })
}

pub fn wait(seconds: f64) -> Command {
    cmd(CommandKind::Wait {
        seconds: Expr::num(seconds),
    })
}

pub fn set(name: &str, value: Expr) -> Command {
    cmd(CommandKind::SetVar {
        name: name.to_string(),
        value,
    })
}

pub fn change(name: &str, delta: Expr) -> Command {
    cmd(CommandKind::ChangeVar {
        name: name.to_string(),
        delta,
    })
}

pub fn incr(name: &str) -> Command {
    change(name, Expr::num(1.0))
}

pub fn delete(name: &str) -> Command {
    cmd(CommandKind::DeleteVar {
        name: name.to_string(),
    })
}

pub fn repeat(times: f64, commands: Vec<Command>) -> Command {
    cmd(CommandKind::Repeat {
        times: Expr::num(times),
        body: body(commands),
    })
}

pub fn repeat_expr(times: Expr, commands: Vec<Command>) -> Command {
    cmd(CommandKind::Repeat {
        times,
        body: body(commands),
    })
}

pub fn forever(commands: Vec<Command>) -> Command {
    cmd(CommandKind::Forever {
        body: body(commands),
    })
}

pub fn when(cond: Expr, commands: Vec<Command>) -> Command {
    cmd(CommandKind::If {
        cond,
        body: body(commands),
    })
}

pub fn when_else(cond: Expr, then_cmds: Vec<Command>, else_cmds: Vec<Command>) -> Command {
    cmd(CommandKind::IfElse {
        cond,
        then_body: body(then_cmds),
        else_body: body(else_cmds),
    })
}

pub fn broadcast(message: &str) -> Command {
    cmd(CommandKind::Broadcast {
        message: Expr::str(message),
        wait: false,
    })
}

pub fn broadcast_wait(message: &str) -> Command {
    cmd(CommandKind::Broadcast {
        message: Expr::str(message),
        wait: true,
    })
}

pub fn brk() -> Command {
    cmd(CommandKind::Break)
}

pub fn cont() -> Command {
    cmd(CommandKind::Continue)
}

pub fn stop_all() -> Command {
    cmd(CommandKind::StopAll)
}

pub fn stop_this() -> Command {
    cmd(CommandKind::StopThis)
}

/* ===================== Expression Builders ===================== */

pub fn num(n: f64) -> Expr {
    Expr::num(n)
}

pub fn var(name: &str) -> Expr {
    Expr::var(name)
}

pub fn gt(left: Expr, right: Expr) -> Expr {
    Expr::cmp(CmpOp::Gt, left, right)
}

pub fn eq(left: Expr, right: Expr) -> Expr {
    Expr::cmp(CmpOp::Eq, left, right)
}

pub fn mul(left: Expr, right: Expr) -> Expr {
    Expr::bin(ArithOp::Mul, left, right)
}

/* ===================== Programs ===================== */

/// One script per command list, ids `script-0`, `script-1`, ...
pub fn program(scripts: Vec<Vec<Command>>) -> Program {
    Program {
        scripts: scripts
            .into_iter()
            .enumerate()
            .map(|(i, commands)| Script::new(format!("script-{}", i), commands))
            .collect(),
        ..Default::default()
    }
}

/// Register a handler for `message`
pub fn with_handler(mut program: Program, message: &str, commands: Vec<Command>) -> Program {
    let handlers = program.handlers.entry(message.to_string()).or_default();
    let id = format!("handler-{}-{}", message, handlers.len());
    handlers.push(Script::new(id, commands));
    program
}

/* ===================== Harness ===================== */

pub struct Harness {
    pub engine: Engine,
    pub clock: ManualClock,
    pub sprite: SharedSprite,
    pub log: Rc<RefCell<LogBuffer>>,
}

impl Harness {
    /// Load, bind and start `program` with the default engine config
    pub fn start(program: Program) -> Self {
        Self::start_with(program, EngineConfig::default())
    }

    pub fn start_with(program: Program, config: EngineConfig) -> Self {
        let mut harness = Self::idle(config);
        harness.engine.load_program(program);
        harness.engine.bind_runtime(harness.sprite.clone());
        harness.engine.start();
        harness
    }

    /// Engine wired to a clock, sprite and log, with nothing loaded
    pub fn idle(config: EngineConfig) -> Self {
        let clock = ManualClock::new();
        let log = Rc::new(RefCell::new(LogBuffer::new(10_000)));
        let engine = Engine::new(config)
            .with_clock(clock.clone())
            .with_observer(log.clone());
        Self {
            engine,
            clock,
            sprite: Sprite::shared(),
            log,
        }
    }

    /// Advance the clock one frame and tick
    pub fn frame(&mut self) -> TickOutcome {
        self.clock.advance(FRAME);
        self.engine.tick()
    }

    pub fn frames(&mut self, n: usize) {
        for _ in 0..n {
            self.frame();
        }
    }

    /// Tick until the engine stops; returns the number of frames taken.
    /// Panics if it is still running after `max_frames`.
    pub fn run_until_stopped(&mut self, max_frames: usize) -> usize {
        for n in 1..=max_frames {
            if self.frame() != TickOutcome::Continue {
                return n;
            }
        }
        panic!("engine still running after {} frames", max_frames);
    }

    pub fn sprite(&self) -> Sprite {
        *self.sprite.borrow()
    }

    pub fn var(&self, name: &str) -> f64 {
        self.engine.variable(name)
    }

    pub fn logged(&self, needle: &str) -> bool {
        self.log.borrow().contains(needle)
    }
}

pub fn approx(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-6
}
