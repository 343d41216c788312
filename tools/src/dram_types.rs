//! DRAM-type presets used by report mode.
//!
//! The built-in table covers DDR5 and DDR6, single bank and across bank
//! groups. A JSON file can add types or override built-in ones:
//!
//! ```json
//! { "profiles": [ { "name": "ddr5", "trc": "46ns", "rfmabo": 4,
//!                   "trfcrfm": "410ns", "refw": "32ms" } ] }
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DramProfile {
    pub name:      String,
    /// tRC between ACTIVATEs.
    pub trc:       String,
    /// RFMs serviced per ALERT.
    pub rfmabo:    u64,
    /// tRFC-RFM per RFM.
    pub trfcrfm:   String,
    /// Refresh window, used as the simulated runtime.
    pub refw:      String,
    #[serde(default)]
    pub isoc:      u64,
    #[serde(default)]
    pub abo_delay: u64,
}

#[derive(Debug, Deserialize)]
struct ProfileFile {
    profiles: Vec<DramProfile>,
}

fn profile(name: &str, trc: &str, trfcrfm: &str) -> DramProfile {
    DramProfile {
        name:      name.into(),
        trc:       trc.into(),
        rfmabo:    4,
        trfcrfm:   trfcrfm.into(),
        refw:      "32ms".into(),
        isoc:      0,
        abo_delay: 0,
    }
}

pub fn builtin() -> Vec<DramProfile> {
    vec![
        // Single bank.
        profile("ddr5", "45ns", "410ns"),
        // Across bank groups, 6400 speed grade (tRRD_S = 2.5ns).
        profile("ddr5_bg", "2.5ns", "350ns"),
        // Single bank.
        profile("ddr6", "63ns", "400ns"),
        // Across bank groups.
        profile("ddr6_bg", "2.5ns", "400ns"),
    ]
}

pub fn load(path: &Path) -> Result<Vec<DramProfile>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("Cannot read {}: {e}", path.display()))?;
    let file: ProfileFile = serde_json::from_str(&content)?;
    Ok(file.profiles)
}

/// Find `name`, preferring `overrides` over the built-in table.
pub fn lookup(name: &str, overrides: &[DramProfile]) -> Result<DramProfile> {
    let wanted = name.trim().to_lowercase();
    overrides
        .iter()
        .cloned()
        .chain(builtin())
        .find(|p| p.name.to_lowercase() == wanted)
        .ok_or_else(|| {
            let known: Vec<String> = overrides.iter().cloned().chain(builtin()).map(|p| p.name).collect();
            anyhow!("Unknown DRAM type '{name}' (known: {})", known.join(", "))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_types_resolve() {
        let ddr5 = lookup("DDR5", &[]).unwrap();
        assert_eq!(ddr5.trc, "45ns");
        assert_eq!(ddr5.trfcrfm, "410ns");
        assert_eq!(lookup("ddr6_bg", &[]).unwrap().trc, "2.5ns");
    }

    #[test]
    fn overrides_win_over_builtin() {
        let custom = DramProfile { trc: "46ns".into(), ..profile("ddr5", "45ns", "410ns") };
        assert_eq!(lookup("ddr5", &[custom]).unwrap().trc, "46ns");
    }

    #[test]
    fn unknown_type_lists_known_ones() {
        let err = lookup("lpddr9", &[]).unwrap_err().to_string();
        assert!(err.contains("ddr5_bg"), "{err}");
    }

    #[test]
    fn profile_file_defaults_optional_fields() {
        let file: ProfileFile = serde_json::from_str(
            r#"{ "profiles": [ { "name": "x", "trc": "40ns", "rfmabo": 2, "trfcrfm": "300ns", "refw": "64ms" } ] }"#,
        )
        .unwrap();
        assert_eq!(file.profiles[0].isoc, 0);
        assert_eq!(file.profiles[0].abo_delay, 0);
    }
}
