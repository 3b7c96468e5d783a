fn main() {
    if let Err(err) = streamgrid::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
