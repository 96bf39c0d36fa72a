use dispatchlint_config::Severity;

use crate::Source;

/// Recoverable problem found while reading configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub source: Source,
}

/// Sink collecting diagnostics in the order they were raised.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and record a diagnostic.
    pub fn record(&mut self, severity: Severity, message: impl Into<String>, source: &Source) {
        let message = message.into();
        match severity {
            Severity::Info => tracing::info!("{source}: {message}"),
            _ => tracing::warn!(%severity, "{source}: {message}"),
        }
        self.entries.push(Diagnostic {
            severity,
            message,
            source: source.clone(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
