//! elenchus entry point.

fn main() {
    if let Err(e) = elenchus::cli::run_cli() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
