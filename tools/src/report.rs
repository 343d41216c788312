//! Human-readable summary and single-line CSV for a finished run.

use crate::{
    cli::RawTimings,
    units::{human_time, seconds},
};
use prac_core::SimulationResult;
use std::fmt::{self, Write};

pub fn summary(result: &SimulationResult) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_summary(&mut out, result)?;
    Ok(out)
}

fn write_summary(out: &mut impl Write, result: &SimulationResult) -> fmt::Result {
    let c = &result.config;
    let g = &result.global;
    writeln!(out, "=== DRAM Activation Simulation Summary ===")?;
    writeln!(out, "  runtime:          {}", human_time(c.runtime_budget))?;
    writeln!(out, "  tRC per activate: {}", human_time(c.activation_duration))?;
    writeln!(out, "  rows:             {}", c.row_count)?;
    writeln!(out, "  threshold (>):    {}", c.threshold)?;
    writeln!(out, "  tRFC per RFM:     {}", human_time(c.rfm_service_duration))?;
    writeln!(out, "  RFM ABO:          {}", c.rfm_abo_multiplier)?;
    writeln!(out, "  ISOC:             {}", c.isoc_count)?;
    writeln!(out, "  ABO delay:        {}", c.abo_delay_count)?;
    writeln!(out, "  RandReset:        {}", c.rand_reset_range)?;
    writeln!(out, "  proactive target: {:?}", c.proactive_target)?;
    writeln!(out, "  ALERT RFM target: {:?}", c.reactive_target)?;
    writeln!(out, "  seed:             {}", result.seed)?;
    if c.alerting_enabled() {
        writeln!(
            out,
            "  ALERT servicing:  {} (RFM ABO x tRFC per RFM)",
            human_time(c.alert_duration())
        )?;
    } else {
        writeln!(out, "  ALERT servicing:  disabled")?;
    }

    writeln!(out)?;
    writeln!(out, "  total ACTIVATEs:  {}", g.total_activations)?;
    writeln!(out, "  used time:        {}", human_time(result.used_time()))?;
    writeln!(out, "  idle time:        {}", human_time(g.idle_time))?;

    writeln!(out)?;
    writeln!(out, "  total RFMs:       {}", g.total_rfms)?;
    writeln!(out, "  ABO-based RFMs:   {}", g.abo_rfm_count)?;
    writeln!(out, "  proactive RFMs:   {}", g.proactive_rfm_count)?;
    if c.windowing_enabled() {
        writeln!(out, "  RFM window start: {}", human_time(c.window_start))?;
        writeln!(out, "  RFM window end:   {}", human_time(c.window_end))?;
        writeln!(out, "  RFM window dur.:  {}", human_time(c.window_end - c.window_start))?;
        writeln!(out, "  skipped windows:  {}", g.skipped_rfm_windows)?;
    }
    writeln!(out, "  proactive time:   {}", human_time(g.proactive_rfm_time))?;

    writeln!(out)?;
    writeln!(out, "  total ALERTs:     {}", g.total_alerts)?;
    writeln!(out, "  ALERT time:       {}", human_time(g.total_alert_time))?;
    writeln!(out, "  longest consecutive ALERTs: {}", g.longest_consecutive_alert_run)?;

    writeln!(out)?;
    writeln!(out, "Per-row metrics:")?;
    writeln!(
        out,
        "{:>6} | {:>12} | {:>6} | {:>6} | {:>12}",
        "Row", "Activations", "ALERTs", "RFMs", "ALERT Time"
    )?;
    writeln!(out, "{}", "-".repeat(58))?;
    for row in &result.rows {
        writeln!(
            out,
            "{:>6} | {:>12} | {:>6} | {:>6} | {:>12}",
            row.id,
            row.activation_count,
            row.alert_count,
            row.rfm_count,
            human_time(row.alert_time_accum)
        )?;
    }
    Ok(())
}

/// One header-less line. A single row reports as row `0`; anything
/// wider reports the per-row sums as `ALL`.
pub fn csv_line(raw: &RawTimings, result: &SimulationResult) -> String {
    let c = &result.config;
    let g = &result.global;
    let totals = result.row_totals();
    let row_label = if c.row_count == 1 { "0" } else { "ALL" };

    format!(
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        c.row_count,
        raw.trc,
        c.threshold,
        c.isoc_count,
        c.rfm_abo_multiplier,
        raw.rfmfreqmin,
        raw.rfmfreqmax,
        raw.trfcrfm,
        raw.runtime,
        row_label,
        totals.activations,
        totals.alerts,
        totals.rfms,
        seconds(totals.alert_time),
        g.total_alerts,
        g.longest_consecutive_alert_run,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use prac_core::{
        simulate,
        types::{ns, us},
        SimulationConfig,
    };

    fn raw() -> RawTimings {
        RawTimings {
            trc:        "100ns".into(),
            rfmfreqmin: "0".into(),
            rfmfreqmax: "0".into(),
            trfcrfm:    "100ns".into(),
            runtime:    "1us".into(),
        }
    }

    fn config(rows: usize) -> SimulationConfig {
        SimulationConfig {
            row_count: rows,
            activation_duration: ns(100),
            threshold: 1,
            rfm_abo_multiplier: 4,
            rfm_service_duration: ns(100),
            runtime_budget: us(1),
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn single_row_csv_uses_row_zero() {
        // ACT ACT STALL(400) ACT ACT STALL(200, truncated)
        let result = simulate(&config(1), 0).unwrap();
        assert_eq!(
            csv_line(&raw(), &result),
            "1,100ns,1,0,4,0,0,100ns,1us,0,4,2,2,6e-07,2,1"
        );
    }

    #[test]
    fn multi_row_csv_reports_all() {
        let result = simulate(&config(3), 0).unwrap();
        let line = csv_line(&raw(), &result);
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), 16);
        assert_eq!(fields[0], "3");
        assert_eq!(fields[9], "ALL");
        assert_eq!(fields[10], result.global.total_activations.to_string());
    }

    #[test]
    fn summary_lists_every_row() {
        let result = simulate(&config(3), 0).unwrap();
        let text = summary(&result).unwrap();
        assert!(text.starts_with("=== DRAM Activation Simulation Summary ==="));
        assert!(text.contains("ALERT servicing:  400.000 ns"));
        assert!(!text.contains("RFM window start"));
        assert!(text.contains("ALERT RFM target: TriggeringRow"));
        let table: Vec<&str> = text.lines().skip_while(|l| !l.starts_with('-')).skip(1).collect();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn summary_shows_windows_when_enabled() {
        let config = SimulationConfig {
            threshold: 1000,
            window_start: us(1),
            window_end: us(1) + ns(500),
            runtime_budget: us(4),
            ..config(2)
        };
        let text = summary(&simulate(&config, 3).unwrap()).unwrap();
        assert!(text.contains("RFM window start: 1.000 us"));
        assert!(text.contains("RFM window dur.:  500.000 ns"));
    }
}
