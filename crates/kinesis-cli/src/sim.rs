//! Headless scenario runner.

use std::io::Write;

use anyhow::{Context, Result};
use kinesis_controller::{
    ControllerConfig, FixedStepper, FuelGauge, GrabEvent, Heading, InputSource, Player,
    ScriptedInput, ViewPose,
};
use kinesis_physics::{BodyShape, CollisionMask, PhysicsBackend, PhysicsWorld, RigidBodyHandle};
use nalgebra::{Point3, Vector3};
use serde::Serialize;

use crate::scenario::Scenario;

const GROUND: CollisionMask = CollisionMask::layer(0);
const PLAYER: CollisionMask = CollisionMask::layer(1);
const PROPS: CollisionMask = CollisionMask::layer(2);

const SETTLE_STEPS: u32 = 10;
const MAX_PITCH: f32 = 1.5;

/// State written once per frame in `--json` mode.
#[derive(Debug, Serialize)]
struct FrameSnapshot {
    time: f32,
    frame_dt: f32,
    steps: u32,
    alpha: f32,
    position: [f32; 3],
    velocity: [f32; 3],
    grounded: bool,
    fuel: f32,
    holding: bool,
    hold_distance: f32,
    landed: bool,
    jumped: bool,
    thrusted: bool,
    grab: Vec<GrabEvent>,
}

/// Totals over the whole run.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub frames: u64,
    pub fixed_steps: u64,
    pub jumps: u32,
    pub landings: u32,
    pub thrust_steps: u64,
    pub pickups: u32,
    pub throws: u32,
    pub lost: u32,
    pub max_height: f32,
    pub final_position: [f32; 3],
}

struct Simulation {
    world: PhysicsWorld,
    body: RigidBodyHandle,
    player: Player<RigidBodyHandle>,
    stepper: FixedStepper,
    gauge: FuelGauge,
    input: ScriptedInput,
    eye_height: f32,
    yaw: f32,
    pitch: f32,
}

impl Simulation {
    fn build(scenario: &Scenario, config: &ControllerConfig) -> Result<Self> {
        let mut world = PhysicsWorld::new();
        world
            .spawn_static(
                BodyShape::cuboid(100.0, 1.0, 100.0),
                Point3::new(0.0, -0.5, 0.0),
                GROUND,
            )
            .context("Failed to create ground")?;

        let spawn = &scenario.player;
        let body = world
            .spawn_character(
                BodyShape::Capsule {
                    half_height: spawn.half_height,
                    radius: spawn.radius,
                },
                Point3::from(spawn.position),
                spawn.mass,
                PLAYER,
            )
            .context("Failed to create player")?;

        for (i, prop) in scenario.props.iter().enumerate() {
            world
                .spawn_dynamic(prop.shape, Point3::from(prop.position), prop.density, PROPS)
                .with_context(|| format!("Failed to create prop {i}"))?;
        }

        for _ in 0..SETTLE_STEPS {
            world.step(config.simulation.fixed_dt());
        }

        Ok(Self {
            world,
            body,
            player: Player::new(config, body),
            stepper: FixedStepper::from_config(&config.simulation),
            gauge: FuelGauge::default(),
            input: ScriptedInput::new(scenario.keyframes.clone()),
            eye_height: spawn.eye_height,
            yaw: spawn.yaw,
            pitch: 0.0,
        })
    }

    fn view(&self) -> Result<ViewPose> {
        let position = self
            .world
            .position(self.body)
            .context("Player body was removed")?;
        let eye = position + Vector3::new(0.0, self.eye_height, 0.0);
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let forward = Vector3::new(-sin_yaw * cos_pitch, sin_pitch, -cos_yaw * cos_pitch);
        Ok(ViewPose::new(eye, forward))
    }

    fn frame(&mut self, dt: f32, summary: &mut Summary) -> Result<FrameSnapshot> {
        let sample = self.input.poll(dt);
        self.yaw -= sample.look_axis.x * dt;
        self.pitch = (self.pitch + sample.look_axis.y * dt).clamp(-MAX_PITCH, MAX_PITCH);

        let view = self.view()?;
        let report = self.player.frame(
            dt,
            &sample,
            Heading::from_yaw(self.yaw),
            view,
            &mut self.world,
            &mut self.gauge,
        );

        let steps = self.stepper.advance(dt);
        let fixed_dt = self.stepper.fixed_dt();
        let (mut jumped, mut thrusted) = (false, false);
        let mut grab_events: Vec<GrabEvent> = report.grab.into_iter().collect();
        for _ in 0..steps {
            let step = self.player.fixed_step(fixed_dt, &mut self.world);
            self.world.step(fixed_dt);
            jumped |= step.jumped;
            thrusted |= step.thrusted;
            summary.jumps += u32::from(step.jumped);
            summary.thrust_steps += u64::from(step.thrusted);
            grab_events.extend(step.grab);
        }

        summary.frames += 1;
        summary.fixed_steps += u64::from(steps);
        summary.landings += u32::from(report.landed);
        for event in &grab_events {
            match event {
                GrabEvent::Acquired { .. } => summary.pickups += 1,
                GrabEvent::Released { .. } => summary.throws += 1,
                GrabEvent::Lost => summary.lost += 1,
            }
        }

        let position = self
            .world
            .position(self.body)
            .context("Player body was removed")?;
        let velocity = self
            .world
            .linear_velocity(self.body)
            .unwrap_or_else(Vector3::zeros);
        summary.max_height = summary.max_height.max(position.y);
        summary.final_position = position.coords.into();

        let locomotion = self.player.locomotion();
        let grab = self.player.grab();
        Ok(FrameSnapshot {
            time: self.input.clock(),
            frame_dt: dt,
            steps,
            alpha: self.stepper.alpha(),
            position: position.coords.into(),
            velocity: velocity.into(),
            grounded: locomotion.is_grounded(),
            fuel: locomotion.fuel(),
            holding: grab.is_holding(),
            hold_distance: grab.hold_distance(),
            landed: report.landed,
            jumped,
            thrusted,
            grab: grab_events,
        })
    }
}

/// Run `scenario` to completion, writing either a line per simulated second
/// or a JSON object per frame to `out`.
pub fn run(
    scenario: &Scenario,
    config: &ControllerConfig,
    json: bool,
    out: &mut dyn Write,
) -> Result<Summary> {
    let mut sim = Simulation::build(scenario, config)?;
    let mut summary = Summary::default();
    let mut next_report = 1.0;

    tracing::info!(
        duration = scenario.duration,
        props = scenario.props.len(),
        keyframes = scenario.keyframes.len(),
        fixed_dt = sim.stepper.fixed_dt(),
        "running scenario"
    );

    let mut frame = 0;
    while sim.input.clock() < scenario.duration {
        let dt = scenario.frame_times[frame % scenario.frame_times.len()];
        frame += 1;
        let snapshot = sim.frame(dt, &mut summary)?;

        if json {
            serde_json::to_writer(&mut *out, &snapshot)?;
            writeln!(out)?;
        } else if snapshot.time >= next_report {
            next_report += 1.0;
            let [x, y, z] = snapshot.position;
            writeln!(
                out,
                "t={:5.2}s pos=({x:6.2}, {y:5.2}, {z:6.2}) speed={:5.2} {} fuel={:3.0}% {}",
                snapshot.time,
                Vector3::from(snapshot.velocity).norm(),
                if snapshot.grounded { "grounded" } else { "airborne" },
                snapshot.fuel * 100.0,
                if snapshot.holding { "holding" } else { "" },
            )?;
        }
    }

    tracing::info!(
        frames = summary.frames,
        fixed_steps = summary.fixed_steps,
        jumps = summary.jumps,
        landings = summary.landings,
        "scenario finished"
    );

    if !json {
        writeln!(
            out,
            "{} frames, {} fixed steps, {} jumps, {} landings, {} thrust steps, {} pickups, {} throws, {} lost, max height {:.2} m",
            summary.frames,
            summary.fixed_steps,
            summary.jumps,
            summary.landings,
            summary.thrust_steps,
            summary.pickups,
            summary.throws,
            summary.lost,
            summary.max_height,
        )?;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::PropSpawn;
    use kinesis_controller::InputKeyframe;

    fn walk_jump_and_grab() -> Scenario {
        Scenario {
            duration: 3.0,
            frame_times: vec![1.0 / 60.0, 1.0 / 30.0, 1.0 / 144.0],
            keyframes: vec![
                // Look down at the crate while reaching for it.
                InputKeyframe {
                    at: 0.0,
                    look_axis: [0.0, -1.4],
                    pickup: true,
                    ..Default::default()
                },
                InputKeyframe {
                    at: 0.5,
                    pickup: true,
                    ..Default::default()
                },
                InputKeyframe {
                    at: 1.0,
                    move_axis: [1.0, 0.0],
                    pickup: true,
                    jump: true,
                    ..Default::default()
                },
                InputKeyframe {
                    at: 1.1,
                    move_axis: [1.0, 0.0],
                    ..Default::default()
                },
            ],
            props: vec![PropSpawn {
                position: [0.0, 0.25, -1.2],
                ..PropSpawn::default()
            }],
            ..Scenario::default()
        }
    }

    #[test]
    fn test_run_counts_events() {
        let mut out = Vec::new();
        let summary = run(&walk_jump_and_grab(), &ControllerConfig::default(), false, &mut out).unwrap();

        assert!(summary.frames > 100);
        assert!(summary.fixed_steps >= 140);
        assert_eq!(summary.jumps, 1);
        assert!(summary.landings >= 1);
        assert_eq!(summary.pickups, 1);
        assert_eq!(summary.throws, 1);
        assert_eq!(summary.lost, 0);
        assert!(summary.max_height > 1.5);

        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().count() >= 3);
        assert!(text.contains("1 jumps"));
    }

    #[test]
    fn test_json_lines_parse() {
        let scenario = Scenario {
            duration: 0.5,
            ..Scenario::default()
        };
        let mut out = Vec::new();
        let summary = run(&scenario, &ControllerConfig::default(), true, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len() as u64, summary.frames);
        assert_eq!(lines[0]["grounded"], serde_json::Value::Bool(true));
        assert_eq!(lines[0]["holding"], serde_json::Value::Bool(false));
        assert_eq!(lines[0]["grab"], serde_json::json!([]));
    }
}
