//! In-place SoC status line
//!
//! The ticker owns stdout for the single overwritable value line; discrete
//! events go through the tracing subscriber on stderr, so the two output
//! channels never interleave.

use std::io::{self, Write};

pub struct SocTicker;

impl SocTicker {
    /// Rewrite the status line with the latest reading.
    pub fn update(&self, soc: f64) {
        print!("\r{}", format_line(soc));
        io::stdout().flush().ok();
    }

    /// Terminate the ephemeral line before the process exits.
    pub fn finish(&self) {
        println!();
    }
}

fn format_line(soc: f64) -> String {
    format!("Battery SoC {:5.1}%", soc)
}
