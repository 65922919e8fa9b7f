use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use boxpile::{export, Args};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let data_dir = PathBuf::from(&args.data_dir);
    if !data_dir.exists() {
        error!("The specified data_dir does not exist: {}", args.data_dir);
        return ExitCode::FAILURE;
    }

    info!("Starting the export process...");

    match export::export(&data_dir, &args.export_options()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to export records: {e}");
            ExitCode::FAILURE
        }
    }
}
