//! Browser bindings
//!
//! A thin `wasm-bindgen` wrapper around `FrameDriver`. The host page owns the
//! canvas, the animation frame loop and the event listeners; each callback
//! just forwards into the board, which queues it for the next frame.

use wasm_bindgen::prelude::*;

use crate::config::SimConfig;
use crate::driver::{Command, FrameDriver};

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    // A second module instance on the same page already installed a logger
    if console_log::init_with_level(log::Level::Info).is_err() {
        log::debug!("Logger already initialized");
    }
}

fn to_js(err: serde_json::Error) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// A Pachinko board bound to one canvas
#[wasm_bindgen]
pub struct PachinkoBoard {
    driver: FrameDriver,
}

#[wasm_bindgen]
impl PachinkoBoard {
    /// Create a board for a `width` x `height` viewport (CSS pixels)
    ///
    /// `config_json` may be a partial document; omitted fields use defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f32, height: f32, config_json: Option<String>) -> Result<PachinkoBoard, JsValue> {
        let config = match config_json {
            Some(json) => SimConfig::from_json(&json).map_err(to_js)?,
            None => SimConfig::default(),
        };
        let seed = js_sys::Date::now() as u64;
        log::info!("Board created with seed: {seed}");
        Ok(Self {
            driver: FrameDriver::new(width, height, seed, config),
        })
    }

    /// Start the frame loop; `now_ms` is `performance.now()`
    pub fn start(&mut self, now_ms: f64) {
        self.driver.start(now_ms / 1000.0);
    }

    /// Run one animation frame; returns false once the board has stopped
    pub fn frame(&mut self, now_ms: f64) -> bool {
        self.driver.frame(now_ms / 1000.0)
    }

    pub fn stop(&mut self) {
        self.driver.stop();
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.driver.push(Command::Resize { width, height });
    }

    /// Pointer press in canvas-local coordinates
    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.driver.push(Command::Spawn { x, y });
    }

    pub fn run_demo(&mut self) {
        self.driver.push(Command::RunDemo);
    }

    /// Retune the running board; omitted fields keep their current values
    pub fn configure(&mut self, json: &str) -> Result<(), JsValue> {
        let config = self.driver.config().with_json_overrides(json).map_err(to_js)?;
        self.driver.push(Command::Configure(Box::new(config)));
        Ok(())
    }

    pub fn config_json(&self) -> Result<String, JsValue> {
        self.driver.config().to_json().map_err(to_js)
    }

    /// Bodies, pegs and buckets for the current frame as JSON
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        self.driver.snapshot().to_json().map_err(to_js)
    }

    /// Flat instance buffer: 8 floats per ball (x, y, radius, opacity, r, g, b, a)
    pub fn body_instances(&self) -> js_sys::Float32Array {
        let instances = self.driver.instances();
        let floats: &[f32] = bytemuck::cast_slice(&instances);
        js_sys::Float32Array::from(floats)
    }

    pub fn body_count(&self) -> usize {
        self.driver.state().bodies.len()
    }

    pub fn bucket_counts(&self) -> Vec<u32> {
        self.driver
            .state()
            .bucket_counts()
            .into_iter()
            .map(|c| c as u32)
            .collect()
    }
}
