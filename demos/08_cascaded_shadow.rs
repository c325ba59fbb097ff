fn main() {
    if let Err(err) = render_tutorials::run_sample("cascaded_shadow") {
        eprintln!("Application error: {err}");
        std::process::exit(1);
    }
}
