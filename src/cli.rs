//! gmon-profile options parser.

use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(about = "gmon profiler dump analyzer")]
pub struct Application {
    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(StructOpt)]
pub enum Command {
    #[structopt(about = "Prints the flat per-function time profile")]
    Flat {
        #[structopt(parse(from_os_str), help = "Path to the gmon dump file")]
        gmon: PathBuf,

        #[structopt(
            parse(from_os_str),
            short,
            long,
            help = "Optional path to the symbol listing (nm output) of the profiled binary"
        )]
        symbols: Option<PathBuf>,

        #[structopt(
            parse(from_os_str),
            short,
            long,
            help = "Optional path to generated file (STDOUT otherwise)"
        )]
        output: Option<PathBuf>,
    },

    #[structopt(about = "Prints the caller/callee graph with call counts")]
    Calls {
        #[structopt(parse(from_os_str), help = "Path to the gmon dump file")]
        gmon: PathBuf,

        #[structopt(
            parse(from_os_str),
            short,
            long,
            help = "Optional path to the symbol listing (nm output) of the profiled binary"
        )]
        symbols: Option<PathBuf>,

        #[structopt(
            parse(from_os_str),
            short,
            long,
            help = "Optional path to generated file (STDOUT otherwise)"
        )]
        output: Option<PathBuf>,
    },
}

/// Constructs an instance of the Application.
pub fn application() -> Application {
    Application::from_args()
}
