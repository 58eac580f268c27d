//! Input sampling and the intent latch shared by the controllers.
//!
//! Device callbacks never touch simulation state directly. A host collects
//! discrete events and continuous axes into an [`InputSample`] once per frame,
//! the sample is folded into an [`IntentLatch`], and the fixed step consumes
//! the latch.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Discrete press/release events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Jump (and jetpack) button went down.
    JumpPressed,
    /// Jump (and jetpack) button went up.
    JumpReleased,
    /// Sprint modifier went down.
    SprintPressed,
    /// Sprint modifier went up.
    SprintReleased,
    /// Pickup button went down.
    PickupPressed,
    /// Pickup button went up.
    PickupReleased,
}

/// Everything read from the input devices for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSample {
    /// Strafe (x) and forward (y) axes in [-1, 1].
    pub move_axis: Vector2<f32>,
    /// Look delta. Consumed by the camera, not by these controllers.
    pub look_axis: Vector2<f32>,
    /// Scroll delta this frame.
    pub scroll: f32,
    /// Discrete events in arrival order.
    pub events: Vec<InputEvent>,
}

impl InputSample {
    /// Sample with only a move axis.
    pub fn moving(x: f32, y: f32) -> Self {
        Self {
            move_axis: Vector2::new(x, y),
            ..Self::default()
        }
    }

    /// Append an event.
    pub fn with_event(mut self, event: InputEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Set the scroll delta.
    pub fn with_scroll(mut self, scroll: f32) -> Self {
        self.scroll = scroll;
        self
    }
}

/// A device or script producing one [`InputSample`] per frame.
pub trait InputSource {
    /// Read input for a frame lasting `dt` seconds.
    fn poll(&mut self, dt: f32) -> InputSample;
}

/// Intents latched from input, read and consumed by the simulation step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntentLatch {
    /// Latest move axis.
    pub move_axis: Vector2<f32>,
    /// Scroll delta of the latest frame.
    pub scroll: f32,
    /// Jump pressed since the last fixed step.
    pub jump_requested: bool,
    /// Jetpack held.
    pub thrust_active: bool,
    /// Sprint held.
    pub sprinting: bool,
    /// Pickup held.
    pub hold_intent: bool,
}

impl IntentLatch {
    /// Fold a frame's input into the latch.
    ///
    /// Jump press sets both the jump request and the jetpack; release only
    /// stops the jetpack. A pending jump survives until a step consumes it.
    pub fn apply(&mut self, sample: &InputSample) {
        self.move_axis = sample.move_axis.map(sanitize_axis);
        self.scroll = if sample.scroll.is_finite() {
            sample.scroll
        } else {
            0.0
        };

        for event in &sample.events {
            match event {
                InputEvent::JumpPressed => {
                    self.jump_requested = true;
                    self.thrust_active = true;
                }
                InputEvent::JumpReleased => self.thrust_active = false,
                InputEvent::SprintPressed => self.sprinting = true,
                InputEvent::SprintReleased => self.sprinting = false,
                InputEvent::PickupPressed => self.hold_intent = true,
                InputEvent::PickupReleased => self.hold_intent = false,
            }
        }
    }

    /// Consume the jump request.
    pub fn take_jump(&mut self) -> bool {
        std::mem::take(&mut self.jump_requested)
    }

    /// Drop every intent.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn sanitize_axis(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Held-button state at a point in a scripted timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputKeyframe {
    /// Time (s) from which this state applies.
    pub at: f32,
    /// Strafe and forward axes.
    pub move_axis: [f32; 2],
    /// Look delta per frame.
    pub look_axis: [f32; 2],
    /// Jump/jetpack held.
    pub jump: bool,
    /// Sprint held.
    pub sprint: bool,
    /// Pickup held.
    pub pickup: bool,
    /// Scroll delta per frame.
    pub scroll: f32,
}

/// Replays a keyframed timeline, turning held-state changes into events.
#[derive(Debug, Clone)]
pub struct ScriptedInput {
    keys: Vec<InputKeyframe>,
    clock: f32,
    jump: bool,
    sprint: bool,
    pickup: bool,
}

impl ScriptedInput {
    /// Create from keyframes in any order.
    pub fn new(mut keys: Vec<InputKeyframe>) -> Self {
        keys.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self {
            keys,
            clock: 0.0,
            jump: false,
            sprint: false,
            pickup: false,
        }
    }

    /// Time of the next sample.
    pub fn clock(&self) -> f32 {
        self.clock
    }

    /// Time of the last keyframe.
    pub fn duration(&self) -> f32 {
        self.keys.last().map_or(0.0, |k| k.at)
    }

    fn current(&self) -> Option<&InputKeyframe> {
        self.keys.iter().take_while(|k| k.at <= self.clock).last()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self, dt: f32) -> InputSample {
        let key = self.current().cloned().unwrap_or_default();
        let mut sample = InputSample {
            move_axis: Vector2::from(key.move_axis),
            look_axis: Vector2::from(key.look_axis),
            scroll: key.scroll,
            events: Vec::new(),
        };

        let edges = [
            (&mut self.jump, key.jump, InputEvent::JumpPressed, InputEvent::JumpReleased),
            (&mut self.sprint, key.sprint, InputEvent::SprintPressed, InputEvent::SprintReleased),
            (&mut self.pickup, key.pickup, InputEvent::PickupPressed, InputEvent::PickupReleased),
        ];
        for (held, want, press, release) in edges {
            if *held != want {
                *held = want;
                sample.events.push(if want { press } else { release });
            }
        }

        self.clock += dt.max(0.0);
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jump_press_latches_jump_and_thrust() {
        let mut latch = IntentLatch::default();
        latch.apply(&InputSample::default().with_event(InputEvent::JumpPressed));
        assert!(latch.jump_requested);
        assert!(latch.thrust_active);

        latch.apply(&InputSample::default().with_event(InputEvent::JumpReleased));
        assert!(latch.jump_requested, "release must not cancel a pending jump");
        assert!(!latch.thrust_active);

        assert!(latch.take_jump());
        assert!(!latch.take_jump());
    }

    #[test]
    fn test_events_apply_in_order() {
        let mut latch = IntentLatch::default();
        let sample = InputSample::default()
            .with_event(InputEvent::PickupPressed)
            .with_event(InputEvent::PickupReleased)
            .with_event(InputEvent::SprintPressed);
        latch.apply(&sample);

        assert!(!latch.hold_intent);
        assert!(latch.sprinting);
    }

    #[test]
    fn test_axes_are_sanitized() {
        let mut latch = IntentLatch::default();
        latch.apply(&InputSample::moving(f32::NAN, 3.0).with_scroll(f32::INFINITY));

        assert_eq!(latch.move_axis, Vector2::new(0.0, 1.0));
        assert_eq!(latch.scroll, 0.0);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut latch = IntentLatch::default();
        latch.apply(
            &InputSample::moving(1.0, 0.0)
                .with_event(InputEvent::JumpPressed)
                .with_event(InputEvent::PickupPressed),
        );
        latch.clear();
        assert_eq!(latch, IntentLatch::default());
    }

    #[test]
    fn test_script_emits_edges() {
        let mut script = ScriptedInput::new(vec![
            InputKeyframe {
                at: 0.5,
                jump: false,
                ..Default::default()
            },
            InputKeyframe {
                at: 0.0,
                jump: true,
                move_axis: [0.0, 1.0],
                ..Default::default()
            },
        ]);
        assert_eq!(script.duration(), 0.5);

        let first = script.poll(0.25);
        assert_eq!(first.events, vec![InputEvent::JumpPressed]);
        assert_eq!(first.move_axis, Vector2::new(0.0, 1.0));

        let held = script.poll(0.25);
        assert!(held.events.is_empty());

        let released = script.poll(0.25);
        assert_eq!(released.events, vec![InputEvent::JumpReleased]);
        assert_eq!(released.move_axis, Vector2::zeros());
        assert_eq!(script.clock(), 0.75);
    }
}
