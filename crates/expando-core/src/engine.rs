//! The trigger state machine.
//!
//! Every transition runs on the caller's thread. Delayed matches are not
//! timed here: the engine hands back a [`Step::Pending`] carrying the match
//! generation, and whoever owns the clock calls [`TriggerEngine::on_timer`]
//! with that generation once the delay has passed. Any input in between bumps
//! the generation, so a late timer finds nothing to fire.

use crate::buffer::KeystrokeBuffer;
use crate::config::{Settings, Terminator, TriggerSettings};
use crate::error::ExpandoError;
use crate::index::TriggerIndex;
use crate::input::KeyInput;
use crate::models::{Expansion, ExpansionId, Library};
use crate::replacer::TextReplacer;
use crate::whitelist::WhitelistPolicy;
use crate::window::{WindowContext, WindowResolver};
use std::ops::Range;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// A prefix match waiting to fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveMatch {
    pub expansion_id: ExpansionId,
    /// Character range of the prefix within the buffer at match time.
    pub matched_span: Range<usize>,
    pub pending_since: Instant,
    pub generation: u64,
    pub terminator: Option<Terminator>,
}

impl ActiveMatch {
    /// Characters the replacement has to delete, terminator included.
    pub fn delete_len(&self) -> usize {
        self.matched_span.len() + usize::from(self.terminator.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Matched(ActiveMatch),
    Firing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
    Replaced(ExpansionId),
    /// The whitelist refused the active window; the typed text was left alone.
    Denied(ExpansionId),
    Interrupted(ExpansionId),
    Failed(ExpansionId),
}

/// What the caller has to do after feeding the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Idle,
    /// Call `on_timer(generation)` once `delay` passes without further input.
    Pending { generation: u64, delay: Duration },
    Fired(FireOutcome),
}

pub struct TriggerEngine<R, T> {
    index: TriggerIndex,
    buffer: KeystrokeBuffer,
    policy: WhitelistPolicy,
    trigger: TriggerSettings,
    resolver: R,
    replacer: T,
    state: EngineState,
    generation: u64,
}

impl<R: WindowResolver, T: TextReplacer> TriggerEngine<R, T> {
    pub fn new(resolver: R, replacer: T, settings: &Settings) -> Self {
        let trigger = settings.trigger.clone();
        Self {
            index: TriggerIndex::new(),
            buffer: KeystrokeBuffer::new(trigger.buffer_capacity(0)),
            policy: settings.whitelist.clone(),
            trigger,
            resolver,
            replacer,
            state: EngineState::Idle,
            generation: 0,
        }
    }

    /// Build an engine already loaded with a library's active expansions.
    pub fn from_library(resolver: R, replacer: T, library: &Library) -> Self {
        let mut engine = Self::new(resolver, replacer, &library.settings);
        engine.load(library);
        engine
    }

    /// Re-read expansions and settings after the data source changed.
    pub fn load(&mut self, library: &Library) -> Vec<ExpandoError> {
        self.reload(
            library.active_expansions().cloned(),
            library.settings.clone(),
        )
    }

    pub fn reload<I>(&mut self, expansions: I, settings: Settings) -> Vec<ExpandoError>
    where
        I: IntoIterator<Item = Expansion>,
    {
        self.cancel_pending();
        let rejected = self.index.rebuild(expansions);
        self.policy = settings.whitelist;
        self.trigger = settings.trigger;
        // Room for a terminator after the longest prefix.
        let capacity = self
            .trigger
            .buffer_capacity(self.index.longest_prefix_len() + 1);
        self.buffer.set_capacity(capacity);
        info!(
            expansions = self.index.len(),
            rejected = rejected.len(),
            "Loaded expansions"
        );
        rejected
    }

    /// Feed one key event.
    pub fn handle(&mut self, input: KeyInput) -> Step {
        trace!(?input, "Key input");
        self.cancel_pending();

        if let Some(terminator) = input.terminator() {
            if self.trigger.terminator.accepts(terminator) {
                if let Some(step) = self.evaluate(Some(terminator)) {
                    return step;
                }
            }
        }

        match input {
            KeyInput::FocusChange => {
                self.buffer.on_focus_change();
                Step::Idle
            }
            KeyInput::Control(key) => {
                self.buffer.on_control_key(key);
                Step::Idle
            }
            KeyInput::Char(c) => {
                self.buffer.on_char(c);
                if self.trigger.terminator.is_required() {
                    return Step::Idle;
                }
                self.evaluate(None).unwrap_or(Step::Idle)
            }
        }
    }

    /// A delay scheduled by `Step::Pending` has elapsed.
    pub fn on_timer(&mut self, generation: u64) -> Step {
        match &self.state {
            EngineState::Matched(active) if active.generation == generation => {
                let active = active.clone();
                self.fire(active)
            }
            _ => {
                debug!(generation, current = self.generation, "Ignoring stale timer");
                Step::Idle
            }
        }
    }

    /// Drop any pending match and all typed text.
    pub fn reset(&mut self) {
        self.cancel_pending();
        self.state = EngineState::Idle;
        self.buffer.clear();
    }

    /// Match the buffer, optionally as confirmed by a terminator. `None`
    /// means nothing matched.
    fn evaluate(&mut self, terminator: Option<Terminator>) -> Option<Step> {
        let tail = self.buffer.snapshot();
        let (expansion_id, prefix_len, trigger) = {
            let best = self.index.find_matches(&tail).into_iter().next()?;
            (best.id, best.prefix_len(), best.trigger)
        };

        let buffer_len = tail.chars().count();
        let delay = if !trigger.delay().is_zero() {
            trigger.delay()
        } else if terminator.is_none() && self.index.can_extend(&tail, prefix_len) {
            self.trigger.ambiguity_delay()
        } else {
            Duration::ZERO
        };

        self.generation = self.generation.wrapping_add(1);
        let active = ActiveMatch {
            expansion_id,
            matched_span: buffer_len - prefix_len..buffer_len,
            pending_since: Instant::now(),
            generation: self.generation,
            terminator,
        };
        debug!(%expansion_id, generation = active.generation, ?delay, "Prefix matched");

        if delay.is_zero() {
            return Some(self.fire(active));
        }
        self.state = EngineState::Matched(active);
        Some(Step::Pending {
            generation: self.generation,
            delay,
        })
    }

    fn fire(&mut self, active: ActiveMatch) -> Step {
        self.state = EngineState::Firing;
        let outcome = self.run_fire(&active);

        self.state = EngineState::Idle;
        self.buffer.clear();
        Step::Fired(outcome)
    }

    fn run_fire(&mut self, active: &ActiveMatch) -> FireOutcome {
        let id = active.expansion_id;
        let Some(expansion) = self.index.get(id) else {
            warn!(%id, "Matched expansion no longer registered");
            return FireOutcome::Failed(id);
        };

        let context = if self.policy.needs_context() {
            self.resolver.current_context()
        } else {
            WindowContext::Unknown
        };
        if !self.policy.allows(&context) {
            info!(%id, ?context, "Expansion blocked by whitelist");
            return FireOutcome::Denied(id);
        }

        let mut body = expansion.body.clone();
        if let Some(terminator) = active.terminator {
            body.push(terminator.as_char());
        }

        match self.replacer.replace(active.delete_len(), &body) {
            Ok(()) => {
                info!(%id, deleted = active.delete_len(), "Expansion fired");
                FireOutcome::Replaced(id)
            }
            Err(err @ ExpandoError::ReplacementInterrupted { .. }) => {
                warn!(%id, "{}", err);
                FireOutcome::Interrupted(id)
            }
            Err(err) => {
                warn!(%id, "Replacement failed: {}", err);
                FireOutcome::Failed(id)
            }
        }
    }

    fn cancel_pending(&mut self) {
        if let EngineState::Matched(active) = &self.state {
            debug!(generation = active.generation, "Pending match cancelled");
            self.state = EngineState::Idle;
            self.generation = self.generation.wrapping_add(1);
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn buffer_snapshot(&self) -> String {
        self.buffer.snapshot()
    }

    pub fn index(&self) -> &TriggerIndex {
        &self.index
    }

    pub fn policy(&self) -> &WhitelistPolicy {
        &self.policy
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn replacer(&self) -> &T {
        &self.replacer
    }

    pub fn replacer_mut(&mut self) -> &mut T {
        &mut self.replacer
    }
}
