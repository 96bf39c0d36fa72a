use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use dispatchlint_config::EnvironmentSettings;
use regex::{Captures, Regex};

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}\s]+)\}").expect("variable pattern is valid"))
}

/// Variables visible to `${NAME}` substitution.
///
/// Explicit definitions (from settings or httpd `Define`) shadow the process
/// environment; `undefine` hides a name from both.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    variables: BTreeMap<String, String>,
    hidden: BTreeSet<String>,
    inherit_process: bool,
}

/// Outcome of a lenient substitution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    pub unresolved: Vec<String>,
}

impl Environment {
    /// Environment consulting only explicit definitions.
    pub fn isolated() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &EnvironmentSettings) -> Self {
        Environment {
            variables: settings.variables.clone(),
            hidden: BTreeSet::new(),
            inherit_process: settings.inherit_process,
        }
    }

    pub fn define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.hidden.remove(&name);
        self.variables.insert(name, value.into());
    }

    pub fn undefine(&mut self, name: &str) {
        self.variables.remove(name);
        self.hidden.insert(name.to_string());
    }

    pub fn get(&self, name: &str) -> Option<String> {
        if self.hidden.contains(name) {
            return None;
        }
        if let Some(value) = self.variables.get(name) {
            return Some(value.clone());
        }
        if self.inherit_process {
            return std::env::var(name).ok();
        }
        None
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replace every resolvable `${NAME}`; unresolved references stay verbatim.
    pub fn substitute(&self, text: &str) -> Substitution {
        let mut unresolved = Vec::new();
        let replaced = variable_pattern().replace_all(text, |caps: &Captures<'_>| {
            let name = &caps[1];
            match self.get(name) {
                Some(value) => value,
                None => {
                    if !unresolved.iter().any(|known| known == name) {
                        unresolved.push(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });
        Substitution {
            text: replaced.into_owned(),
            unresolved,
        }
    }

    /// Substitute every `${NAME}` or report the names that could not be resolved.
    pub fn substitute_strict(&self, text: &str) -> Result<String, Vec<String>> {
        let Substitution { text, unresolved } = self.substitute(text);
        if unresolved.is_empty() {
            Ok(text)
        } else {
            Err(unresolved)
        }
    }
}
