//! A complete first-person rig: intent latch, locomotion and grab on one body.

use kinesis_physics::PhysicsBackend;
use serde::Serialize;

use crate::config::ControllerConfig;
use crate::display::FuelDisplay;
use crate::grab::{GrabController, GrabEvent, ViewPose};
use crate::input::{InputSample, IntentLatch};
use crate::locomotion::{Heading, LocomotionController, StepReport};

/// What a frame did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FrameReport {
    /// The ground probe went from miss to hit.
    pub landed: bool,
    /// Hold state change, if any.
    pub grab: Option<GrabEvent>,
}

/// Player rig driving one character body.
#[derive(Debug, Clone)]
pub struct Player<B> {
    intents: IntentLatch,
    locomotion: LocomotionController<B>,
    grab: GrabController<B>,
    enabled: bool,
}

impl<B: Copy + PartialEq + std::fmt::Debug> Player<B> {
    /// Rig for `body`. The grab probe never picks up `body` itself.
    pub fn new(config: &ControllerConfig, body: B) -> Self {
        Self {
            intents: IntentLatch::default(),
            locomotion: LocomotionController::new(config.locomotion.clone(), body),
            grab: GrabController::new(config.grab.clone()).ignoring(body),
            enabled: true,
        }
    }

    /// Character body handle.
    pub fn body(&self) -> B {
        self.locomotion.body()
    }

    /// Current latched intents.
    pub fn intents(&self) -> &IntentLatch {
        &self.intents
    }

    /// Movement and jetpack state.
    pub fn locomotion(&self) -> &LocomotionController<B> {
        &self.locomotion
    }

    /// Mutable movement state, e.g. to refuel.
    pub fn locomotion_mut(&mut self) -> &mut LocomotionController<B> {
        &mut self.locomotion
    }

    /// Hold state.
    pub fn grab(&self) -> &GrabController<B> {
        &self.grab
    }

    /// Whether the rig reacts to input.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Variable-rate update.
    ///
    /// Order: latch input, probe ground and refill fuel, update the grab,
    /// then project fuel to the display.
    pub fn frame<P>(
        &mut self,
        dt: f32,
        input: &InputSample,
        heading: Heading,
        view: ViewPose,
        physics: &mut P,
        display: &mut dyn FuelDisplay,
    ) -> FrameReport
    where
        P: PhysicsBackend<Body = B>,
    {
        if !self.enabled {
            return FrameReport::default();
        }

        self.intents.apply(input);
        let landed = self.locomotion.frame(dt, heading, physics);
        let grab = self.grab.frame(dt, view, &self.intents, physics);
        self.locomotion.project_fuel(display);

        FrameReport { landed, grab }
    }

    /// Fixed-rate update: locomotion writes, then hold tracking. Grab events
    /// raised here, such as losing a destroyed body, land in the report.
    pub fn fixed_step<P>(&mut self, dt: f32, physics: &mut P) -> StepReport
    where
        P: PhysicsBackend<Body = B>,
    {
        if !self.enabled {
            return StepReport::default();
        }

        let mut report = self.locomotion.fixed_step(dt, &mut self.intents, physics);
        report.grab = self.grab.fixed_step(dt, &self.intents, physics);
        report
    }

    /// Enable or disable the rig. Disabling drops every intent and lets go
    /// of a held body.
    pub fn set_enabled<P>(&mut self, enabled: bool, physics: &mut P)
    where
        P: PhysicsBackend<Body = B>,
    {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if !enabled {
            self.intents.clear();
            self.grab.release(physics);
            tracing::debug!(body = ?self.body(), "player disabled");
        }
    }
}
