//! gmon-profile main module.
//!
//! This program reads a binary gmon dump produced by sampling profilers,
//! reconstructs which function owns each sampled program-counter region,
//! and prints a flat per-function time profile or a caller/callee graph.
//!
//! Function names come from a symbol listing of the profiled binary, one
//! symbol per line as printed by `nm`:
//!     `nm -C <binary> > symbols.txt`
//!
//! Without a listing the load still succeeds, but nothing can be
//! attributed and the profile comes out empty.

#![forbid(unsafe_code)]
#![deny(warnings)]

mod cli;

use gmon_profile::error::Result;
use gmon_profile::{config, filebuf, profile};
use std::io;

fn main() {
    init_logger();
    if let Err(err) = execute(cli::application()) {
        eprintln!("Error: {:#}", err);
        std::process::exit(config::FAILURE);
    }
}

/// Initializes the logger.
fn init_logger() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();
}

/// Dispatches CLI commands.
fn execute(app: cli::Application) -> Result<()> {
    match app.cmd {
        cli::Command::Flat {
            gmon,
            symbols,
            output,
        } => {
            let profile = profile::load(&gmon, symbols.as_deref())?;
            match output {
                None => profile.write_flat(io::stdout())?,
                Some(path) => profile.write_flat(filebuf::open_w(&path)?)?,
            }
        }

        cli::Command::Calls {
            gmon,
            symbols,
            output,
        } => {
            let profile = profile::load(&gmon, symbols.as_deref())?;
            match output {
                None => profile.write_call_graph(io::stdout())?,
                Some(path) => profile.write_call_graph(filebuf::open_w(&path)?)?,
            }
        }
    }

    Ok(())
}
