//! Pachinko Board entry point
//!
//! The browser build is driven from JS through `pachinko_board::web`. Natively
//! this runs a headless demonstration and prints the settled histogram.
//!
//! Usage: `pachinko-board [config.json]` (seed from `PACHINKO_SEED`)

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use pachinko_board::sim::is_at_rest;
    use pachinko_board::{Command, FrameDriver, SimConfig};

    const WIDTH: f32 = 960.0;
    const HEIGHT: f32 = 900.0;
    const FRAME_DT: f32 = 1.0 / 60.0;
    /// Give up waiting for rest after this many simulated seconds
    const MAX_SECONDS: f32 = 30.0;
    const REST_SPEED: f32 = 2.0;
    const BAR_WIDTH: usize = 50;

    fn load_config(path: &str) -> Result<SimConfig, Box<dyn std::error::Error>> {
        let json = std::fs::read_to_string(path)?;
        Ok(SimConfig::from_json(&json)?)
    }

    pub fn run() -> Result<(), Box<dyn std::error::Error>> {
        let config = match std::env::args().nth(1) {
            Some(path) => {
                log::info!("Loading config from {path}");
                load_config(&path)?
            }
            None => SimConfig::default(),
        };
        let seed = std::env::var("PACHINKO_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(2024);

        // Keep every ball so the histogram reflects the whole batch
        let config = SimConfig {
            decay_threshold: f32::MAX,
            stream_batch: 0,
            ..config
        };
        let mut driver = FrameDriver::new(WIDTH, HEIGHT, seed, config);
        driver.push(Command::RunDemo);

        let max_frames = (MAX_SECONDS / FRAME_DT) as u64;
        let mut settled = false;
        while driver.frames() < max_frames {
            driver.advance(FRAME_DT);
            let state = driver.state();
            if is_at_rest(&state.layout, &state.bodies, REST_SPEED) {
                settled = true;
                break;
            }
        }
        let seconds = driver.frames() as f32 * FRAME_DT;
        if settled {
            log::info!("Settled after {seconds:.1}s (seed {seed})");
        } else {
            log::warn!("Still moving after {seconds:.1}s (seed {seed})");
        }

        let counts = driver.state().bucket_counts();
        let peak = counts.iter().copied().max().unwrap_or(0).max(1);
        for (i, count) in counts.iter().enumerate() {
            let bar = "#".repeat(count * BAR_WIDTH / peak);
            println!("{i:>3} {count:>4} {bar}");
        }
        println!("total {}", counts.iter().sum::<usize>());
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Pachinko Board (native, headless) starting...");

    if let Err(err) = headless::run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is web::init, this is just to satisfy the compiler
}
