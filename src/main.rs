use render_tutorials::{init_logging, run, samples, RenderSettings};

fn main() {
    init_logging();

    let settings = RenderSettings::load();
    let name = std::env::args().nth(1).unwrap_or_else(|| settings.sample.clone());

    let sample = match samples::by_name(&name, &settings) {
        Ok(sample) => sample,
        Err(err) => {
            eprintln!("{err}. Available samples: {}", samples::NAMES.join(", "));
            std::process::exit(2);
        }
    };

    if let Err(err) = run(sample, settings) {
        eprintln!("Application error: {err}");
        std::process::exit(1);
    }
}
