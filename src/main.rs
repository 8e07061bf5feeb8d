//! Pixtile - Command-line tool for inspecting and editing layered tilemap levels

use std::process::ExitCode;

use pixtile::cli;

fn main() -> ExitCode {
    env_logger::init();
    cli::run()
}
