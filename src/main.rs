//! Stitch - command-line tool for compositing tile directories into sheets

use std::process::ExitCode;

use tilestitch::cli;

fn main() -> ExitCode {
    cli::run()
}
