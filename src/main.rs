use std::process;

fn main() {
    if let Err(e) = sprocket::cli::run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
