fn main() {
    if let Err(err) = render_tutorials::run_sample("cube") {
        eprintln!("Application error: {err}");
        std::process::exit(1);
    }
}
