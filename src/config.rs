use clap::Parser;
use std::str::FromStr;

use crate::export::ExportOptions;

/// Command-line arguments parser for exporting labeled images to TFRecord files.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct Args {
    /// Directory holding the images/ and annotations/ subdirectories
    #[arg(short = 'd', long = "data_dir")]
    pub data_dir: String,

    /// Proportion of examples routed to the eval record
    #[arg(long = "eval_size", default_value_t = 0.2, value_parser = validate_size)]
    pub eval_size: f64,

    /// Write every example to a single data.record instead of splitting
    #[arg(long = "no_split")]
    pub no_split: bool,
}

impl Args {
    pub fn export_options(&self) -> ExportOptions {
        let eval_fraction = if self.no_split || self.eval_size == 0.0 {
            None
        } else {
            Some(self.eval_size)
        };
        ExportOptions { eval_fraction }
    }
}

// Validate that the size is between 0.0 and 1.0
fn validate_size(s: &str) -> Result<f64, String> {
    match f64::from_str(s) {
        Ok(val) if (0.0..=1.0).contains(&val) => Ok(val),
        _ => Err("SIZE must be between 0.0 and 1.0".to_string()),
    }
}
