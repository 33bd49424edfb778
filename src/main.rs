fn main() {
    if let Err(err) = correlativas::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
