//! Command execution handlers
//!
//! Each command kind has a handler that runs one step of it and reports a
//! [`Step`]: advance past it, leave the frame stack as the handler arranged
//! it, or come back next tick.

use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use super::engine::Engine;
use super::exec_loop::finish_body;
use super::expressions::{eval_condition, eval_number, evaluate, read_var};
use super::types::{ActionKind, ActionState, Command, CommandKind, Expr, Frame, Step, Thread};

/* ===================== Dispatcher ===================== */

impl Engine {
    /// Step one command on behalf of `thread`
    pub(crate) fn step_command(&mut self, thread: &mut Thread, command: &Command, dt: f64) -> Step {
        if !command.block_id.is_empty() {
            trace!(thread = %thread.id, block = %command.block_id, "highlight");
            self.observer.on_highlight(Some(command.block_id.as_str()));
        }

        match &command.kind {
            CommandKind::StopAll => {
                info!(thread = %thread.id, "stop all");
                self.notify("STOP ALL encountered.");
                self.stop();
                Step::Stay
            }

            CommandKind::StopThis => {
                debug!(thread = %thread.id, "stop this script");
                self.notify("STOP THIS SCRIPT encountered.");
                thread.finish();
                Step::Stay
            }

            CommandKind::Break => self.execute_break(thread),

            CommandKind::Continue => self.execute_continue(thread),

            CommandKind::SetVar { name, value } => {
                let v = eval_number(value, &self.vars);
                if !name.is_empty() {
                    self.vars.insert(name.clone(), v);
                }
                self.notify(&format!("set {} = {}", name, v));
                Step::Advance
            }

            CommandKind::ChangeVar { name, delta } => {
                let delta = eval_number(delta, &self.vars);
                let next = read_var(&self.vars, name) + delta;
                if !name.is_empty() {
                    self.vars.insert(name.clone(), next);
                }
                self.notify(&format!("change {} by {} -> {}", name, delta, next));
                Step::Advance
            }

            CommandKind::DeleteVar { name } => {
                self.vars.remove(name);
                self.notify(&format!("delete {} (defaults to 0 when read)", name));
                Step::Advance
            }

            CommandKind::Broadcast { message, wait } => {
                self.execute_broadcast(thread, message, *wait)
            }

            CommandKind::Repeat { times, body } => {
                let times = eval_number(times, &self.vars).floor().max(0.0) as u64;
                if times == 0 {
                    return Step::Advance;
                }
                thread.frames.push(Frame::repeat(Arc::clone(body), times));
                Step::Stay
            }

            CommandKind::Forever { body } => {
                thread.frames.push(Frame::forever(Arc::clone(body)));
                Step::Stay
            }

            CommandKind::If { cond, body } => {
                if eval_condition(cond, &self.vars) {
                    thread.frames.push(Frame::seq(Arc::clone(body)));
                    Step::Stay
                } else {
                    Step::Advance
                }
            }

            CommandKind::IfElse {
                cond,
                then_body,
                else_body,
            } => {
                let chosen = if eval_condition(cond, &self.vars) {
                    then_body
                } else {
                    else_body
                };
                thread.frames.push(Frame::seq(Arc::clone(chosen)));
                Step::Stay
            }

            CommandKind::Move { .. } | CommandKind::Turn { .. } | CommandKind::Wait { .. } => {
                self.step_action(thread, &command.kind, dt)
            }

            CommandKind::Unsupported => Step::Advance,
        }
    }
}

/* ===================== Loop Control ===================== */

impl Engine {
    /// Leave the nearest loop: drop it and everything above it
    fn execute_break(&mut self, thread: &mut Thread) -> Step {
        let Some(index) = thread.nearest_loop() else {
            warn!(thread = %thread.id, "break outside of a loop");
            self.notify("break: no loop to break.");
            return Step::Advance;
        };

        thread.frames.truncate(index);
        thread.action = None;
        thread.waiting_on = None;

        match thread.frames.last_mut() {
            Some(parent) => parent.ip += 1,
            None => thread.finished = true,
        }
        Step::Stay
    }

    /// Skip the rest of this iteration of the nearest loop
    fn execute_continue(&mut self, thread: &mut Thread) -> Step {
        let Some(index) = thread.nearest_loop() else {
            warn!(thread = %thread.id, "continue outside of a loop");
            self.notify("continue: no loop to continue.");
            return Step::Advance;
        };

        thread.frames.truncate(index + 1);
        thread.action = None;
        thread.waiting_on = None;

        let frame = &mut thread.frames[index];
        frame.ip = frame.commands.len();
        finish_body(thread);
        Step::Stay
    }
}

/* ===================== Events ===================== */

impl Engine {
    fn execute_broadcast(&mut self, thread: &mut Thread, message: &Expr, wait: bool) -> Step {
        if !wait {
            let message = evaluate(message, &self.vars).to_string();
            debug!(thread = %thread.id, message = %message, "broadcast");
            self.notify(&format!("broadcast \"{}\"", message));
            self.spawn_handlers(&message);
            return Step::Advance;
        }

        // Spawn once per occurrence; later steps only poll.
        if thread.waiting_on.is_none() {
            let message = evaluate(message, &self.vars).to_string();
            debug!(thread = %thread.id, message = %message, "broadcast and wait");
            self.notify(&format!("broadcast \"{}\" and wait", message));
            thread.waiting_on = Some(self.spawn_handlers(&message));
        }

        let pending = thread
            .waiting_on
            .as_ref()
            .is_some_and(|ids| ids.iter().any(|id| self.is_live(*id)));

        if pending {
            Step::Pending
        } else {
            thread.waiting_on = None;
            Step::Advance
        }
    }
}

/* ===================== Timed Actions ===================== */

impl Engine {
    /// Start or continue a move/turn/wait
    fn step_action(&mut self, thread: &mut Thread, kind: &CommandKind, dt: f64) -> Step {
        if thread.action.is_none() {
            match self.begin_action(kind) {
                Some(state) => thread.action = Some(state),
                None => return Step::Advance,
            }
        }

        let tick = self.tick_count;
        let Some(action) = thread.action.as_mut() else {
            return Step::Advance;
        };
        action.advance(tick, dt);
        let p = action.progress();

        if let Some(sprite) = &self.sprite {
            let mut sprite = sprite.borrow_mut();
            match action.kind {
                ActionKind::Move {
                    steps,
                    start_x,
                    start_y,
                } => {
                    let heading = sprite.rotation.to_radians();
                    sprite.x = start_x + heading.cos() * steps * p;
                    sprite.y = start_y + heading.sin() * steps * p;
                }
                ActionKind::Turn {
                    degrees,
                    start_rotation,
                } => {
                    sprite.rotation = start_rotation + degrees * p;
                }
                ActionKind::Wait => {}
            }
        }

        if p >= 1.0 {
            thread.action = None;
            Step::Advance
        } else {
            Step::Pending
        }
    }

    /// Evaluate parameters and snapshot the sprite. `None` when the action
    /// cannot run (no sprite bound for a move or turn).
    fn begin_action(&self, kind: &CommandKind) -> Option<ActionState> {
        match kind {
            CommandKind::Move { steps } => {
                let sprite = self.sprite.as_ref()?.borrow();
                let steps = eval_number(steps, &self.vars);
                let duration = (steps.abs() / 200.0).clamp(0.05, 2.0);
                Some(ActionState::new(
                    ActionKind::Move {
                        steps,
                        start_x: sprite.x,
                        start_y: sprite.y,
                    },
                    duration,
                    self.tick_count,
                ))
            }
            CommandKind::Turn { degrees } => {
                let sprite = self.sprite.as_ref()?.borrow();
                let degrees = eval_number(degrees, &self.vars);
                let duration = (degrees.abs() / 180.0).clamp(0.05, 1.5);
                Some(ActionState::new(
                    ActionKind::Turn {
                        degrees,
                        start_rotation: sprite.rotation,
                    },
                    duration,
                    self.tick_count,
                ))
            }
            CommandKind::Wait { seconds } => {
                let seconds = eval_number(seconds, &self.vars).max(0.0);
                Some(ActionState::new(ActionKind::Wait, seconds, self.tick_count))
            }
            _ => None,
        }
    }
}
