pub mod app;
pub mod error;
pub mod input;
pub mod renderer;
pub mod samples;
pub mod scene;
pub mod settings;
pub mod time;

pub use app::{run, FrameContext, Sample};
pub use error::{RenderError, Result};
pub use settings::RenderSettings;

/// `Info` by default; `RUST_LOG` overrides.
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}

/// Loads `settings.json`, then runs the sample called `name`.
pub fn run_sample(name: &str) -> Result<()> {
    init_logging();
    let mut settings = RenderSettings::load();
    settings.sample = name.to_string();
    let sample = samples::by_name(name, &settings)?;
    log::info!("Starting sample {}", name);
    run(sample, settings)
}
