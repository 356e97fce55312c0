mod argsets;
mod command;
mod constants;
mod data_mgmt;
mod helpers;
mod interfaces;

use std::process::ExitCode;

use dotenv::dotenv;
use log::LevelFilter;

const EXIT_USAGE: u8 = 2;

fn main() -> ExitCode {
    let _ = dotenv();

    let args = match argsets::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("{}", argsets::USAGE);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    init_logging(args.verbose_count);

    match command::import(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}

/// Base level is WARN; each `-v` raises it one step, bottoming out at TRACE.
fn init_logging(verbose_count: u8) {
    let level = match verbose_count {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();
}
