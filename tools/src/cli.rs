//! Command-line surface: report and explore modes.
//!
//! Everything here ends in a validated `SimulationConfig`; the core
//! never sees a time string.

use crate::{dram_types, units::parse_time};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use prac_core::{ProactiveTarget, ReactiveTarget, SimulationConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "prac-sim",
    version,
    about = "Simulate DRAM ACTIVATEs with GLOBAL ALERT stalls due to PRAC."
)]
pub struct Cli {
    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// DRAM protocol parameters from a DRAM-type preset.
    Report(ReportArgs),
    /// All parameters via command-line flags.
    Explore(ExploreArgs),
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// DRAM type (e.g. 'ddr5', 'ddr6_bg').
    #[arg(long = "dram-type")]
    pub dram_type: String,

    /// JSON file with extra or overriding DRAM-type presets.
    #[arg(long = "dram-config")]
    pub dram_config: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct ExploreArgs {
    /// tRC per ACTIVATE (e.g. '45ns', '3.2us').
    #[arg(long)]
    pub trc: String,

    /// RFM ABO multiplier; alert duration = rfmabo x trfcrfm.
    #[arg(long)]
    pub rfmabo: u64,

    /// tRFC-RFM time consumed per RFM. '0' consumes no time.
    #[arg(long, default_value = "0")]
    pub trfcrfm: String,

    /// ACTIVATEs issued after a breach but before the reactive RFMs.
    #[arg(long, default_value_t = 0)]
    pub isoc: u64,

    /// Minimum ACTIVATEs between two ALERTs of the same row (0 to 3).
    #[arg(
        long = "abo-delay",
        alias = "abo_delay",
        default_value_t = 0,
        value_parser = clap::value_parser!(u64).range(0..=3)
    )]
    pub abo_delay: u64,

    /// Total simulated runtime.
    #[arg(long, default_value = "128ms")]
    pub runtime: String,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Number of rows to operate on.
    #[arg(long)]
    pub rows: usize,

    /// ALERT raised when a counter strictly exceeds this value.
    #[arg(long)]
    pub threshold: u64,

    /// RFM window start time and period (e.g. '32us'). '0' disables RFM.
    #[arg(long, default_value = "0")]
    pub rfmfreqmin: String,

    /// RFM window end time (e.g. '48us'). Must be >= rfmfreqmin and
    /// < 2 x rfmfreqmin. '0' disables RFM.
    #[arg(long, default_value = "0")]
    pub rfmfreqmax: String,

    /// Counters reset to a random value in 0..=randreset.
    #[arg(long, default_value_t = 0)]
    pub randreset: u64,

    /// Seed for the random number generator.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Which row a proactive RFM services.
    #[arg(long = "proactive-target", value_enum, default_value_t = TargetArg::RoundRobin)]
    pub proactive_target: TargetArg,

    /// Which rows the RFMs of an ALERT service.
    #[arg(long = "reactive-target", value_enum, default_value_t = ReactiveArg::TriggeringRow)]
    pub reactive_target: ReactiveArg,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// One CSV line: rows,trc,threshold,isoc,rfmabo,rfmfreqmin,rfmfreqmax,
    /// trfcrfm,runtime,Row,Activations,ALERTs,RFMs,ALERTTime,TotalALERTs,
    /// LongestSeqConsecALERTs
    #[arg(long, conflicts_with = "json")]
    pub csv: bool,

    /// Full result record as JSON.
    #[arg(long)]
    pub json: bool,

    /// Write the event log to this file as JSON lines.
    #[arg(long)]
    pub trace: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetArg {
    RoundRobin,
    HighestCounter,
}

impl From<TargetArg> for ProactiveTarget {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::RoundRobin => ProactiveTarget::RoundRobin,
            TargetArg::HighestCounter => ProactiveTarget::HighestCounter,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactiveArg {
    /// One RFM to the row that raised the ALERT.
    TriggeringRow,
    /// RFM ABO RFMs to the rows with the largest counters.
    HighestCounters,
}

impl From<ReactiveArg> for ReactiveTarget {
    fn from(arg: ReactiveArg) -> Self {
        match arg {
            ReactiveArg::TriggeringRow => ReactiveTarget::TriggeringRow,
            ReactiveArg::HighestCounters => ReactiveTarget::HighestCounters,
        }
    }
}

/// Time parameters exactly as the user (or preset) wrote them.
/// Echoed back in CSV output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTimings {
    pub trc:        String,
    pub rfmfreqmin: String,
    pub rfmfreqmax: String,
    pub trfcrfm:    String,
    pub runtime:    String,
}

#[derive(Debug)]
pub struct RunPlan {
    pub config: SimulationConfig,
    pub seed:   u64,
    pub raw:    RawTimings,
    pub output: OutputArgs,
}

/// Merge presets and flags into a validated plan.
pub fn resolve(mode: Mode) -> Result<RunPlan> {
    let (raw, rfm_abo, isoc, abo_delay, common) = match mode {
        Mode::Report(args) => {
            let overrides = match &args.dram_config {
                Some(path) => dram_types::load(path)?,
                None => Vec::new(),
            };
            let preset = dram_types::lookup(&args.dram_type, &overrides)?;
            log::info!("report mode: using DRAM type '{}'", preset.name);
            let raw = RawTimings {
                trc:        preset.trc,
                rfmfreqmin: args.common.rfmfreqmin.clone(),
                rfmfreqmax: args.common.rfmfreqmax.clone(),
                trfcrfm:    preset.trfcrfm,
                runtime:    preset.refw,
            };
            (raw, preset.rfmabo, preset.isoc, preset.abo_delay, args.common)
        }
        Mode::Explore(args) => {
            let raw = RawTimings {
                trc:        args.trc,
                rfmfreqmin: args.common.rfmfreqmin.clone(),
                rfmfreqmax: args.common.rfmfreqmax.clone(),
                trfcrfm:    args.trfcrfm,
                runtime:    args.runtime,
            };
            (raw, args.rfmabo, args.isoc, args.abo_delay, args.common)
        }
    };

    let config = SimulationConfig {
        row_count:            common.rows,
        activation_duration:  parse_time(&raw.trc).context("--trc")?,
        threshold:            common.threshold,
        rfm_abo_multiplier:   rfm_abo,
        rfm_service_duration: parse_time(&raw.trfcrfm).context("--trfcrfm")?,
        window_start:         parse_time(&raw.rfmfreqmin).context("--rfmfreqmin")?,
        window_end:           parse_time(&raw.rfmfreqmax).context("--rfmfreqmax")?,
        isoc_count:           isoc,
        abo_delay_count:      abo_delay,
        rand_reset_range:     common.randreset,
        runtime_budget:       parse_time(&raw.runtime).context("--runtime")?,
        proactive_target:     common.proactive_target.into(),
        reactive_target:      common.reactive_target.into(),
    };
    config.validate()?;

    Ok(RunPlan {
        config,
        seed: common.seed,
        raw,
        output: common.output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use prac_core::types::{ms, ns, us};

    fn plan(argv: &[&str]) -> Result<RunPlan> {
        let cli = Cli::try_parse_from(argv)?;
        resolve(cli.mode)
    }

    #[test]
    fn explore_mode_parses_every_flag() {
        let plan = plan(&[
            "prac-sim", "explore", "--rows", "4", "--trc", "45ns", "--threshold", "32",
            "--rfmabo", "4", "--trfcrfm", "410ns", "--isoc", "2", "--abo-delay", "1",
            "--runtime", "1ms", "--rfmfreqmin", "32us", "--rfmfreqmax", "48us",
            "--randreset", "3", "--seed", "9", "--csv",
        ])
        .unwrap();
        let c = &plan.config;
        assert_eq!(c.row_count, 4);
        assert_eq!(c.activation_duration, ns(45));
        assert_eq!(c.alert_duration(), ns(1640));
        assert_eq!(c.isoc_count, 2);
        assert_eq!(c.abo_delay_count, 1);
        assert_eq!(c.runtime_budget, ms(1));
        assert_eq!((c.window_start, c.window_end), (us(32), us(48)));
        assert_eq!(plan.seed, 9);
        assert!(plan.output.csv);
        assert_eq!(plan.raw.runtime, "1ms");
    }

    #[test]
    fn report_mode_takes_timings_from_preset() {
        let plan = plan(&["prac-sim", "report", "--dram-type", "ddr5_bg", "--rows", "1", "--threshold", "16"])
            .unwrap();
        assert_eq!(plan.config.activation_duration, 2_500);
        assert_eq!(plan.config.rfm_service_duration, ns(350));
        assert_eq!(plan.config.runtime_budget, ms(32));
        assert_eq!(plan.raw.trc, "2.5ns");
        assert!(!plan.config.windowing_enabled());
    }

    #[test]
    fn target_policies_default_and_override() {
        let base = ["prac-sim", "explore", "--rows", "2", "--trc", "45ns", "--threshold", "4", "--rfmabo", "4"];
        let plan_default = plan(&base).unwrap();
        assert_eq!(plan_default.config.reactive_target, ReactiveTarget::TriggeringRow);
        assert_eq!(plan_default.config.proactive_target, ProactiveTarget::RoundRobin);

        let mut argv = base.to_vec();
        argv.extend(["--reactive-target", "highest-counters", "--proactive-target", "highest-counter"]);
        let plan_custom = plan(&argv).unwrap();
        assert_eq!(plan_custom.config.reactive_target, ReactiveTarget::HighestCounters);
        assert_eq!(plan_custom.config.proactive_target, ProactiveTarget::HighestCounter);
    }

    #[test]
    fn abo_delay_is_bounded() {
        let err = Cli::try_parse_from([
            "prac-sim", "explore", "--rows", "1", "--trc", "45ns", "--threshold", "1",
            "--rfmabo", "1", "--abo-delay", "4",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn invalid_window_fails_validation() {
        let result = plan(&[
            "prac-sim", "explore", "--rows", "1", "--trc", "45ns", "--threshold", "1",
            "--rfmabo", "1", "--rfmfreqmin", "32us", "--rfmfreqmax", "80us",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn bad_time_string_names_the_flag() {
        let err = plan(&[
            "prac-sim", "explore", "--rows", "1", "--trc", "fast", "--threshold", "1", "--rfmabo", "1",
        ])
        .unwrap_err();
        assert!(format!("{err:#}").contains("--trc"), "{err:#}");
    }
}
