//! Action executor: the single consumer of the action queue.
//!
//! ```text
//!                 ┌───────────────┐
//!                 │ ActionQueue   │
//!                 └──────┬────────┘
//!                        │ poll(now)
//!        ┌───────────────┼────────────────┬─────────────┐
//!        ▼               ▼                ▼             ▼
//!   LightEngine       Beeper         PressEngine    AssertKill
//!        │               │                │             │
//!   status light      buzzer        device button   power cut
//! ```
//!
//! Each poll drains whatever was queued when the poll began, then advances
//! all three engines whether or not anything new arrived. Nothing blocks;
//! every wait is a deadline compared on the next poll.
//!
//! A device press that arrives while the press engine is holding or in its
//! guard gap is parked in a small FIFO inside the executor and started as
//! soon as the engine goes idle, so a commanded press is delayed rather
//! than lost. It never goes back on the action queue: later light and beep
//! actions run on time, and a parked press holds no queue slot. Presses
//! keep their relative order because a new press joins the back of the
//! FIFO whenever one is already waiting.

pub mod beeper;
pub mod light;
pub mod press;

use embedded_hal::digital::OutputPin;
use heapless::Deque;
use log::{debug, error, warn};

use crate::actions::{Action, ActionId, LightPattern, PressKind};
use crate::config::DEFERRED_PRESS_SLOTS;
use crate::drivers::outputs::OutputLine;
use crate::queue::ActionQueue;
use beeper::Beeper;
use light::LightEngine;
use press::PressEngine;

pub struct Executor<L, B, D, K> {
    light_line: OutputLine<L>,
    buzzer_line: OutputLine<B>,
    press_line: OutputLine<D>,
    kill_line: OutputLine<K>,

    light: LightEngine,
    beeper: Beeper,
    press: PressEngine,

    deferred: Deque<PressKind, DEFERRED_PRESS_SLOTS>,
    killed: bool,
    requeued: u32,
}

impl<L, B, D, K> Executor<L, B, D, K>
where
    L: OutputPin,
    B: OutputPin,
    D: OutputPin,
    K: OutputPin,
{
    /// Lines are driven inactive by [`OutputLine::new`] before they get here,
    /// which also releases the power-cut line at boot.
    pub fn new(
        light_line: OutputLine<L>,
        buzzer_line: OutputLine<B>,
        press_line: OutputLine<D>,
        kill_line: OutputLine<K>,
    ) -> Self {
        Self {
            light_line,
            buzzer_line,
            press_line,
            kill_line,
            light: LightEngine::new(),
            beeper: Beeper::new(),
            press: PressEngine::new(),
            deferred: Deque::new(),
            killed: false,
            requeued: 0,
        }
    }

    pub fn poll(&mut self, now_ms: u32, actions: &ActionQueue) {
        self.start_deferred(now_ms);
        while let Some(action) = actions.pop() {
            self.dispatch(now_ms, action);
        }

        if self.killed {
            // Keep re-asserting until the rail actually drops.
            if !self.kill_line.is_active() {
                drive(&mut self.kill_line, true);
            }
            return;
        }

        let lit = self.light.tick(now_ms);
        let beep = self.beeper.tick(now_ms);
        let pressed = self.press.tick(now_ms);
        drive(&mut self.light_line, lit);
        drive(&mut self.buzzer_line, beep);
        drive(&mut self.press_line, pressed);
    }

    pub fn light_pattern(&self) -> LightPattern {
        self.light.pattern()
    }

    pub fn beeping(&self) -> bool {
        self.beeper.is_busy()
    }

    pub fn press_busy(&self) -> bool {
        self.press.is_busy()
    }

    pub fn presses_completed(&self) -> u32 {
        self.press.completed()
    }

    pub fn killed(&self) -> bool {
        self.killed
    }

    /// Device presses that had to wait for the press engine, counted once
    /// each.
    pub fn requeued(&self) -> u32 {
        self.requeued
    }

    /// Presses currently waiting for the press engine.
    pub fn deferred(&self) -> usize {
        self.deferred.len()
    }

    pub fn light_line(&self) -> &OutputLine<L> {
        &self.light_line
    }

    pub fn buzzer_line(&self) -> &OutputLine<B> {
        &self.buzzer_line
    }

    pub fn press_line(&self) -> &OutputLine<D> {
        &self.press_line
    }

    pub fn kill_line(&self) -> &OutputLine<K> {
        &self.kill_line
    }

    fn start_deferred(&mut self, now_ms: u32) {
        if self.killed {
            self.deferred.clear();
            return;
        }
        if let Some(&kind) = self.deferred.front() {
            if self.press.try_start(now_ms, kind) {
                self.deferred.pop_front();
            }
        }
    }

    fn dispatch(&mut self, now_ms: u32, action: Action) {
        if self.killed {
            debug!("executor: {} ignored after power cut", action.id.name());
            return;
        }
        match action.id {
            ActionId::Light(pattern) => self.light.set(now_ms, pattern),
            ActionId::Beep(pattern) => self.beeper.start(now_ms, pattern),
            ActionId::DevicePress(kind) => {
                if self.deferred.is_empty() && self.press.try_start(now_ms, kind) {
                    return;
                }
                if self.deferred.push_back(kind).is_ok() {
                    self.requeued = self.requeued.wrapping_add(1);
                } else {
                    warn!("executor: press FIFO full, {:?} press lost", kind);
                }
            }
            ActionId::AssertKill => {
                error!("executor: asserting power cut");
                self.killed = true;
                self.deferred.clear();
                drive(&mut self.kill_line, true);
            }
        }
    }
}

fn drive<P: OutputPin>(line: &mut OutputLine<P>, active: bool) {
    if line.is_active() == active {
        return;
    }
    if let Err(e) = line.set(active) {
        warn!("executor: {e}");
    }
}
