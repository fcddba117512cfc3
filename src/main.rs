fn main() {
    if let Err(e) = clrvote::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
