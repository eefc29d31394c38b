// src/bbref/models.rs
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::utils::error::ExtractError;

/// Year-based WNBA statistics path on basketball-reference.com.
pub const DEFAULT_BASE_URL: &str = "https://www.basketball-reference.com/wnba/years";

// Labels look like `<name>_stats`; the capture is the short name used in the URL
static STAT_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+)_stats$").expect("Failed to compile STAT_LABEL_RE")
});

/// One of the per-season player statistics tables published for a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatType {
    PerGame,
    Totals,
    PerMinute,
    PerPossession,
    Advanced,
}

impl StatType {
    /// Every recognized stat type, in the order the site lists them.
    pub const ALL: [StatType; 5] = [
        StatType::PerGame,
        StatType::Totals,
        StatType::PerMinute,
        StatType::PerPossession,
        StatType::Advanced,
    ];

    /// Caller-facing label, e.g. `per_poss_stats`.
    pub fn label(self) -> &'static str {
        match self {
            StatType::PerGame => "per_game_stats",
            StatType::Totals => "totals_stats",
            StatType::PerMinute => "per_minute_stats",
            StatType::PerPossession => "per_poss_stats",
            StatType::Advanced => "advanced_stats",
        }
    }

    /// Short name used in the page path and anchor, e.g. `per_poss`.
    pub fn short_name(self) -> &'static str {
        match self {
            StatType::PerGame => "per_game",
            StatType::Totals => "totals",
            StatType::PerMinute => "per_minute",
            StatType::PerPossession => "per_poss",
            StatType::Advanced => "advanced",
        }
    }

    /// Parses a full `<name>_stats` label. Bare short names are rejected.
    pub fn from_label(label: &str) -> Result<Self, ExtractError> {
        let short = STAT_LABEL_RE
            .captures(label)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| ExtractError::InvalidStatType(label.to_string()))?;

        StatType::ALL
            .into_iter()
            .find(|st| st.short_name() == short)
            .ok_or_else(|| ExtractError::InvalidStatType(label.to_string()))
    }
}

impl fmt::Display for StatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lenient parsing for the command line: accepts the label or the short name.
impl FromStr for StatType {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        StatType::from_label(s).or_else(|err| {
            StatType::ALL
                .into_iter()
                .find(|st| st.short_name() == s)
                .ok_or(err)
        })
    }
}

impl Serialize for StatType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Builds the page URL for a year and a stat type label.
///
/// `base` is the year-based statistics path (see [`DEFAULT_BASE_URL`]); a
/// trailing slash is tolerated. The URL carries the short name both in the
/// file name and as the anchor of the table on the page:
/// `{base}/2020_per_poss.html#per_poss`.
#[allow(dead_code)]
pub fn build_url(base: &str, year: u32, stat_type: &str) -> Result<String, ExtractError> {
    let stat_type = StatType::from_label(stat_type)?;
    Ok(format_url(base, year, stat_type))
}

fn format_url(base: &str, year: u32, stat_type: StatType) -> String {
    let short = stat_type.short_name();
    format!("{}/{}_{}.html#{}", base.trim_end_matches('/'), year, short, short)
}

/// A single (season, stat type) page to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct StatRequest {
    pub year: u32,
    pub stat_type: StatType,
}

impl StatRequest {
    pub fn new(year: u32, stat_type: StatType) -> Self {
        Self { year, stat_type }
    }

    /// Expands years x stat types, years outermost.
    pub fn cartesian(years: &[u32], stat_types: &[StatType]) -> Vec<StatRequest> {
        years
            .iter()
            .flat_map(|&year| stat_types.iter().map(move |&st| StatRequest::new(year, st)))
            .collect()
    }

    /// Constructs the URL for this request under `base`.
    pub fn url(&self, base: &str) -> String {
        format_url(base, self.year, self.stat_type)
    }
}

impl fmt::Display for StatRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.year, self.stat_type)
    }
}
