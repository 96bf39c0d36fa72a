use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Severity attached to rules, diagnostics and violations.
///
/// Variants are declared from most to least severe so that an ascending sort
/// lists blockers first.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Blocker,
    Critical,
    Major,
    Minor,
    Info,
}

impl Severity {
    pub const ALL: &'static [Severity] = &[
        Severity::Blocker,
        Severity::Critical,
        Severity::Major,
        Severity::Minor,
        Severity::Info,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Blocker => "BLOCKER",
            Severity::Critical => "CRITICAL",
            Severity::Major => "MAJOR",
            Severity::Minor => "MINOR",
            Severity::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "blocker" => Ok(Severity::Blocker),
            "critical" => Ok(Severity::Critical),
            "major" => Ok(Severity::Major),
            "minor" => Ok(Severity::Minor),
            "info" => Ok(Severity::Info),
            _ => Err(()),
        }
    }
}

/// How aggressively equivalent violations are collapsed before reporting.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Verbosity {
    /// No reduction at all.
    Full,
    /// Drop exact duplicates (same rule id, file and line).
    #[default]
    Partial,
    /// Drop duplicates and collapse every rule id into one counted entry.
    Minimized,
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verbosity::Full => "full",
            Verbosity::Partial => "partial",
            Verbosity::Minimized => "minimized",
        };
        f.write_str(label)
    }
}

impl FromStr for Verbosity {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "full" => Ok(Verbosity::Full),
            "partial" => Ok(Verbosity::Partial),
            "minimized" => Ok(Verbosity::Minimized),
            _ => Err(()),
        }
    }
}

/// Combinator applied across the checks of a single rule.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CheckMode {
    /// Every failing check produces its own violation.
    #[default]
    All,
    /// Stop at the first failing check.
    FirstFailure,
    /// The rule holds when any check passes; otherwise report the first failure.
    Any,
}

impl fmt::Display for CheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CheckMode::All => "all",
            CheckMode::FirstFailure => "first-failure",
            CheckMode::Any => "any",
        };
        f.write_str(label)
    }
}

impl FromStr for CheckMode {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "all" => Ok(CheckMode::All),
            "first-failure" => Ok(CheckMode::FirstFailure),
            "any" => Ok(CheckMode::Any),
            _ => Err(()),
        }
    }
}

/// Treatment of directories matched by an include expression.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DirectoryPolicy {
    /// Include every file inside the directory, recursively.
    #[default]
    Expand,
    /// Drop directory matches and keep the files next to them.
    Skip,
    /// Reject the whole include when any match is a directory.
    Refuse,
}

impl DirectoryPolicy {
    pub fn allows_directories(self) -> bool {
        matches!(self, DirectoryPolicy::Expand)
    }
}

impl fmt::Display for DirectoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DirectoryPolicy::Expand => "expand",
            DirectoryPolicy::Skip => "skip",
            DirectoryPolicy::Refuse => "refuse",
        };
        f.write_str(label)
    }
}

impl FromStr for DirectoryPolicy {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "expand" => Ok(DirectoryPolicy::Expand),
            "skip" => Ok(DirectoryPolicy::Skip),
            "refuse" => Ok(DirectoryPolicy::Refuse),
            _ => Err(()),
        }
    }
}
