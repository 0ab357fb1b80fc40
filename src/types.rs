use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// What gets restarted once a cycle has decided that an update is required.
///
/// - `WholeStack`: bring the entire declared stack down and back up whenever
///   any active workload changed (default).
/// - `Subset`: only stop/start the workloads whose digest actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartMode {
    #[default]
    WholeStack,
    Subset,
}

impl FromStr for RestartMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "whole-stack" | "whole_stack" | "stack" => Ok(RestartMode::WholeStack),
            "subset" => Ok(RestartMode::Subset),
            other => Err(format!(
                "invalid restart_mode: {other} (expected \"whole-stack\" or \"subset\")"
            )),
        }
    }
}

impl fmt::Display for RestartMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartMode::WholeStack => f.write_str("whole-stack"),
            RestartMode::Subset => f.write_str("subset"),
        }
    }
}

/// Parse a duration string such as `"300ms"`, `"30s"`, `"5m"` or `"1h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
