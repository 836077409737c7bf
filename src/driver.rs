//! Frame driver
//!
//! Owns the simulation state, the live config and the ambient stream. External
//! events never touch the state directly: they are queued as `Command`s and
//! drained once at the start of the next frame, so a frame always sees the
//! same ordering no matter how the host interleaves its callbacks.

use std::collections::VecDeque;

use crate::config::SimConfig;
use crate::sim::spawn::{AmbientStream, run_demo, spawn_at_pointer};
use crate::sim::state::SimulationState;
use crate::sim::tick::step;
use crate::snapshot::{BodyInstance, RenderSnapshot, body_instances};

/// An external event, applied at the next frame boundary
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Pointer press at screen coordinates
    Spawn { x: f32, y: f32 },
    /// Viewport size change
    Resize { width: f32, height: f32 },
    /// Clear the board and drop the demonstration batch
    RunDemo,
    /// Swap in a new config
    Configure(Box<SimConfig>),
}

/// Drives the simulation from wall-clock time
#[derive(Debug, Clone)]
pub struct FrameDriver {
    state: SimulationState,
    config: SimConfig,
    commands: VecDeque<Command>,
    stream: AmbientStream,
    /// Timestamp of the previous frame (seconds)
    last_time: Option<f64>,
    running: bool,
    frames: u64,
}

impl FrameDriver {
    pub fn new(width: f32, height: f32, seed: u64, config: SimConfig) -> Self {
        let config = config.sanitized();
        Self {
            state: SimulationState::new(width, height, seed, &config),
            config,
            commands: VecDeque::new(),
            stream: AmbientStream::default(),
            last_time: None,
            running: false,
            frames: 0,
        }
    }

    /// Begin issuing frames at wall-clock `now` (seconds) and start the
    /// ambient stream, which fires its first batch immediately
    pub fn start(&mut self, now: f64) {
        if self.running {
            return;
        }
        self.running = true;
        self.last_time = Some(now);
        self.stream.start(&mut self.state, &self.config);
        log::info!(
            "Board started ({}x{}, seed {})",
            self.state.width(),
            self.state.height(),
            self.state.seed
        );
    }

    /// Stop issuing frames, stop the ambient stream and drop pending commands
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.last_time = None;
        self.stream.stop();
        let dropped = self.commands.len();
        self.commands.clear();
        log::info!("Board stopped after {} frames ({dropped} commands dropped)", self.frames);
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push_back(command);
    }

    /// Commands waiting for the next frame
    pub fn pending(&self) -> usize {
        self.commands.len()
    }

    /// Run one frame at wall-clock `now` (seconds)
    ///
    /// Returns whether the host should schedule another frame.
    pub fn frame(&mut self, now: f64) -> bool {
        if !self.running {
            return false;
        }
        let dt = match self.last_time {
            Some(prev) if now.is_finite() && now > prev => (now - prev) as f32,
            _ => 0.0,
        };
        if now.is_finite() {
            self.last_time = Some(now);
        }
        self.advance(dt);
        true
    }

    /// Run one frame with an explicit delta, clamped to `max_frame_dt`
    pub fn advance(&mut self, dt: f32) {
        while let Some(command) = self.commands.pop_front() {
            self.apply(command);
        }

        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.config.max_frame_dt)
        } else {
            0.0
        };
        self.stream.advance(&mut self.state, &self.config, dt);
        step(&mut self.state, &self.config, dt);
        self.frames += 1;
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Spawn { x, y } => {
                spawn_at_pointer(&mut self.state, &self.config, x, y);
            }
            Command::Resize { width, height } => {
                self.state.resize(width, height, &self.config);
                log::info!(
                    "Resized to {}x{} ({} buckets, {} pegs)",
                    self.state.width(),
                    self.state.height(),
                    self.state.layout.buckets.len(),
                    self.state.layout.pegs.len()
                );
            }
            Command::RunDemo => run_demo(&mut self.state, &self.config),
            Command::Configure(config) => self.configure(*config),
        }
    }

    fn configure(&mut self, config: SimConfig) {
        let config = config.sanitized();
        if config.body_radius != self.config.body_radius {
            self.state.set_body_radius(config.body_radius);
        }
        if config.layout_differs(&self.config) {
            let (width, height) = (self.state.width(), self.state.height());
            self.state.resize(width, height, &config);
        }
        self.config = config;
        log::info!("Config updated");
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        RenderSnapshot::capture(&self.state, &self.config)
    }

    pub fn instances(&self) -> Vec<BodyInstance> {
        body_instances(&self.state, &self.config)
    }

    #[inline]
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    #[inline]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Frames run since construction
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
