//! scratchrun CLI binary
//!
//! All logic is in the library; main.rs only invokes cli::run().

fn main() {
    // cli::run() prints every message itself
    if let Err(code) = scratchrun::cli::run() {
        std::process::exit(code.as_i32());
    }
}
