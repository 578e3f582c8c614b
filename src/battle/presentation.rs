//! The boundary with whatever renders the battle.
//!
//! Outbound directives are fire-and-forget. Inbound animation keys arrive on
//! an unbounded channel and are awaited with a deadline, so a presentation
//! layer that never answers cannot stall the simulation.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};

use crate::combatant::CombatantId;

pub const MOVE_TO_TARGET_TRIGGER: &str = "MoveToTarget";
pub const ATTACK_TRIGGER: &str = "Attack";
pub const RETURN_TO_START_TRIGGER: &str = "ReturnToStart";
pub const MOVE_TO_TARGET_CLIP: &str = "Action_MoveToTarget";
pub const ATTACK_CLIP: &str = "Action_Attack";
pub const RETURN_TO_START_CLIP: &str = "Action_ReturnToStart";
/// Key the attack animation signals at its point of impact.
pub const HIT_KEY: &str = "Hit";

/// Directives the battle core sends to the presentation layer.
pub trait Presentation {
    fn play_animation(&mut self, combatant: CombatantId, trigger: &str);

    fn set_animator_override(&mut self, combatant: CombatantId, handle: &str);

    fn restore_default_animator(&mut self, combatant: CombatantId);

    fn play_dodge_animation(&mut self, combatant: CombatantId);

    /// Length of a named clip in seconds, if the presentation knows it.
    fn animation_clip_length(&self, combatant: CombatantId, clip: &str) -> Option<f32>;
}

/// Headless presentation: every directive is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresentation;

impl Presentation for NullPresentation {
    fn play_animation(&mut self, _combatant: CombatantId, _trigger: &str) {}

    fn set_animator_override(&mut self, _combatant: CombatantId, _handle: &str) {}

    fn restore_default_animator(&mut self, _combatant: CombatantId) {}

    fn play_dodge_animation(&mut self, _combatant: CombatantId) {}

    fn animation_clip_length(&self, _combatant: CombatantId, _clip: &str) -> Option<f32> {
        None
    }
}

/// An animation key raised by `caster`'s animation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationSignal {
    pub caster: CombatantId,
    pub key: String,
}

impl AnimationSignal {
    pub fn new(caster: CombatantId, key: &str) -> Self {
        Self {
            caster,
            key: key.to_string(),
        }
    }
}

pub type SignalSender = mpsc::UnboundedSender<AnimationSignal>;

/// Receiving end of the animation-key channel.
#[derive(Debug)]
pub struct AnimationSignals {
    sender: SignalSender,
    receiver: mpsc::UnboundedReceiver<AnimationSignal>,
}

impl AnimationSignals {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender, receiver }
    }

    /// A handle the presentation layer uses to deliver keys.
    pub fn sender(&self) -> SignalSender {
        self.sender.clone()
    }

    /// Waits until `caster` signals `key`, discarding any other signal.
    ///
    /// Returns false when the deadline passed first; the caller proceeds as
    /// if the key had arrived.
    pub async fn wait_for_key(&mut self, caster: CombatantId, key: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            match timeout_at(deadline, self.receiver.recv()).await {
                Ok(Some(signal)) if signal.caster == caster && signal.key == key => return true,
                Ok(Some(signal)) => {
                    tracing::debug!(
                        "Discarding signal '{}' from {} while waiting for '{}' from {}",
                        signal.key,
                        signal.caster,
                        key,
                        caster
                    );
                }
                Ok(None) => return false,
                Err(_) => {
                    tracing::warn!(
                        "Timed out after {:.2}s waiting for '{}' from {}; continuing",
                        timeout.as_secs_f32(),
                        key,
                        caster
                    );
                    return false;
                }
            }
        }
    }
}

impl Default for AnimationSignals {
    fn default() -> Self {
        Self::new()
    }
}
