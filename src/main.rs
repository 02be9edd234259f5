//
// main.rs
// Oct-Tools-rs
//
// Binary entry point that hands off execution to the CLI layer.
//
// Thales Matheus Mendonça Santos - October 2026

use oct_tools::cli;

fn main() -> anyhow::Result<()> {
    cli::run()
}
