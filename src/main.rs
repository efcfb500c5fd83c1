#[macro_use]
extern crate log;

use cannon::app::App;
use cannon::configuration::command_line::{LogLevel, Opt};
use cannon::configuration::constants::exit_code;
use log::LevelFilter;
use signal_hook::{consts::SIGINT, iterator::Signals};
use std::{path::PathBuf, process::exit, thread};
use structopt::StructOpt;

#[tokio::main]
async fn main() {
    let options = Opt::from_args();

    if let Err(e) = init_logging(
        options.logging.unwrap_or(LogLevel::Info).into(),
        &options.log_output_file,
    ) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match Signals::new(&[SIGINT]) {
        Ok(mut signals) => {
            thread::spawn(move || {
                for sig in signals.forever() {
                    info!("Received signal {:?}, stopping", sig);
                    exit(exit_code::INTERRUPTED);
                }
            });
        }
        Err(e) => warn!("Cannot register signal handler: {}", e),
    }

    let app = match App::load(options.file) {
        Ok(app) => app.with_output(options.output),
        Err(e) => {
            error!("{}", e);
            exit(exit_code::SETUP);
        }
    };
    let code = match app.run().await {
        Ok(result) if result.focused && options.forbid_only => {
            error!("Focused specs are forbidden, remove `only` flags");
            exit_code::FOCUSED
        }
        Ok(result) if result.is_success() => exit_code::SUCCESS,
        Ok(_) => exit_code::FAILURES,
        Err(e) => {
            error!("{}", e);
            exit_code::SETUP
        }
    };
    exit(code);
}

fn init_logging(level: LevelFilter, output: &Option<PathBuf>) -> Result<(), fern::InitError> {
    let mut dispatcher = fern::Dispatch::new()
        // Perform allocation-free log formatting
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}:{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record
                    .line()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "".to_owned()),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    if let Some(log_file) = output {
        dispatcher = dispatcher.chain(fern::log_file(log_file)?)
    }
    dispatcher.apply()?;
    info!("Logging level {} enabled", level);
    Ok(())
}
