//! Pulse and indicator records as returned by the threat-intel API
//!
//! Every field is optional: the API omits fields freely and this tool only
//! reads what it needs, falling back to empty values when rendering.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format of the `modified` timestamp up to the seconds; a `.` and 1-6
/// fractional digits must follow
pub const MODIFIED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Most fractional digits accepted after the seconds
const MAX_FRACTION_DIGITS: usize = 6;

/// Sort key used for pulses with a missing or malformed `modified` field
pub const EPOCH_SENTINEL: &str = "1970-01-01T00:00:00.000000";

/// A curated collection of indicators
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pulse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// ISO-8601 timestamp with microseconds
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub related: Option<Related>,
}

/// The `related` block of a pulse
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Related {
    #[serde(default)]
    pub pulses: Option<Vec<RelatedPulse>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatedPulse {
    #[serde(default)]
    pub name: Option<String>,
}

impl Pulse {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn with_modified(mut self, modified: &str) -> Self {
        self.modified = Some(modified.to_string());
        self
    }

    pub fn with_related(mut self, names: &[&str]) -> Self {
        self.related = Some(Related {
            pulses: Some(
                names
                    .iter()
                    .map(|n| RelatedPulse {
                        name: Some(n.to_string()),
                    })
                    .collect(),
            ),
        });
        self
    }

    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Modification time, or the epoch sentinel when missing or unparseable
    pub fn modified_at(&self) -> NaiveDateTime {
        self.modified
            .as_deref()
            .and_then(parse_modified)
            .unwrap_or_default()
    }

    /// Names of related pulses in API order
    pub fn related_names(&self) -> Vec<String> {
        self.related
            .as_ref()
            .and_then(|r| r.pulses.as_ref())
            .map(|pulses| {
                pulses
                    .iter()
                    .map(|p| p.name.clone().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Parse `YYYY-MM-DDTHH:MM:SS.ffffff`, where the fraction is 1-6 digits
pub fn parse_modified(s: &str) -> Option<NaiveDateTime> {
    let (seconds, fraction) = s.split_once('.')?;
    if fraction.is_empty()
        || fraction.len() > MAX_FRACTION_DIGITS
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let micros: u32 = format!("{:0<width$}", fraction, width = MAX_FRACTION_DIGITS)
        .parse()
        .ok()?;
    NaiveDateTime::parse_from_str(seconds, MODIFIED_FORMAT)
        .ok()?
        .with_nanosecond(micros * 1000)
}

/// Sort pulses newest first by modification time.
///
/// The sort is stable: pulses with equal timestamps (including every pulse
/// that fell back to the epoch sentinel) keep the order the API gave them.
pub fn sort_newest_first(pulses: &mut [Pulse]) {
    pulses.sort_by_key(|p| std::cmp::Reverse(p.modified_at()));
}

/// Indicator role: the API sends either a single string or a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Role {
    Many(Vec<String>),
    One(String),
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Many(roles) => write!(f, "{}", roles.join(",")),
            Role::One(role) => write!(f, "{}", role),
        }
    }
}

/// The `is_active` flag, reported as 1/0 by the API but tolerated in any scalar form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActiveFlag {
    Flag(bool),
    Number(i64),
    Text(String),
}

impl fmt::Display for ActiveFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveFlag::Flag(b) => write!(f, "{}", b),
            ActiveFlag::Number(n) => write!(f, "{}", n),
            ActiveFlag::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A single threat artifact belonging to a pulse
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    /// The indicator value itself (IP, domain, hash, ...)
    #[serde(default)]
    pub indicator: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub is_active: Option<ActiveFlag>,
}

impl Indicator {
    pub fn new(kind: &str, value: &str) -> Self {
        Self {
            indicator: Some(value.to_string()),
            kind: Some(kind.to_string()),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_created(mut self, created: &str) -> Self {
        self.created = Some(created.to_string());
        self
    }

    pub fn with_active(mut self, active: ActiveFlag) -> Self {
        self.is_active = Some(active);
        self
    }

    /// Indicator value; missing values dedupe as the empty string
    pub fn value(&self) -> &str {
        self.indicator.as_deref().unwrap_or_default()
    }

    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or_default()
    }

    pub fn roles(&self) -> String {
        self.role.as_ref().map(Role::to_string).unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    pub fn created(&self) -> &str {
        self.created.as_deref().unwrap_or_default()
    }

    pub fn active(&self) -> String {
        self.is_active
            .as_ref()
            .map(ActiveFlag::to_string)
            .unwrap_or_default()
    }
}

/// One page of a pulse search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PulsePage {
    #[serde(default)]
    pub results: Vec<Pulse>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
}

/// Search results in either of the shapes the API has used over time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PulseListing {
    Bare(Vec<Pulse>),
    Paged(PulsePage),
}

impl PulseListing {
    pub fn into_pulses(self) -> Vec<Pulse> {
        match self {
            PulseListing::Bare(pulses) => pulses,
            PulseListing::Paged(page) => page.results,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PulseListing::Bare(pulses) => pulses.is_empty(),
            PulseListing::Paged(page) => page.results.is_empty(),
        }
    }
}

impl Default for PulseListing {
    fn default() -> Self {
        PulseListing::Bare(Vec::new())
    }
}
