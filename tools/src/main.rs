//! prac-sim: PRAC/RFM ALERT denial-of-service simulator.
//!
//! Usage:
//!   prac-sim report --dram-type ddr5 --rows 1 --threshold 128
//!   prac-sim explore --rows 4 --trc 45ns --threshold 32 --rfmabo 4 \
//!       --trfcrfm 410ns --rfmfreqmin 32us --rfmfreqmax 48us --csv
//!
//! RUST_LOG=debug prints every ALERT and proactive RFM to stderr.

mod cli;
mod dram_types;
mod report;
mod units;

use anyhow::{Context, Result};
use clap::Parser;
use prac_core::{event::EventLogEntry, simulate, simulate_with_log};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let cli = cli::Cli::parse();
    let plan = cli::resolve(cli.mode)?;

    let result = match &plan.output.trace {
        Some(path) => {
            let (result, entries) = simulate_with_log(&plan.config, plan.seed)?;
            write_trace(path, &entries)?;
            log::info!("wrote {} trace entries to {}", entries.len(), path.display());
            result
        }
        None => simulate(&plan.config, plan.seed)?,
    };

    if plan.output.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if plan.output.csv {
        println!("{}", report::csv_line(&plan.raw, &result));
    } else {
        print!("{}", report::summary(&result)?);
    }

    Ok(())
}

/// One JSON object per line, in application order.
fn write_trace(path: &Path, entries: &[EventLogEntry]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Cannot create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for entry in entries {
        serde_json::to_writer(&mut out, entry)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}
