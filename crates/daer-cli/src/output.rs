// SPDX-License-Identifier: MIT

use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print `value` as pretty JSON, or fall back to `text` for human display.
pub fn print_report<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce() -> String) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => eprintln!("failed to render report as json: {err}"),
        },
        OutputFormat::Text => println!("{}", text()),
    }
}
