use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

const BUILTIN_FILE: &str = "<default>";

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
enum Origin {
    Builtin,
    Parsed,
}

/// Location a parsed value was read from.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct Source {
    pub file: PathBuf,
    pub line: usize,
    pub included_from: Option<PathBuf>,
    origin: Origin,
}

impl Source {
    pub fn new(file: impl Into<PathBuf>, line: usize, included_from: Option<PathBuf>) -> Self {
        Source {
            file: file.into(),
            line,
            included_from,
            origin: Origin::Parsed,
        }
    }

    /// Sentinel used for compiled-in defaults.
    pub fn builtin() -> Self {
        Source {
            file: PathBuf::from(BUILTIN_FILE),
            line: 0,
            included_from: None,
            origin: Origin::Builtin,
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.origin == Origin::Builtin
    }

    /// The (file, line) pair two violations are compared on.
    pub fn fingerprint(&self) -> (&Path, usize) {
        (&self.file, self.line)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_builtin() {
            return f.write_str("built-in default");
        }
        write!(f, "{}:{}", self.file.display(), self.line)?;
        if let Some(parent) = &self.included_from {
            write!(f, " (included from {})", parent.display())?;
        }
        Ok(())
    }
}

/// A payload together with the location it came from.
///
/// Equality, ordering and hashing look at the payload only.
#[derive(Clone, Debug)]
pub struct Value<T> {
    payload: T,
    source: Source,
    explicit: bool,
}

impl<T> Value<T> {
    /// A value read from configuration text.
    pub fn new(payload: T, source: Source) -> Self {
        Value {
            payload,
            source,
            explicit: true,
        }
    }

    /// A compiled-in default carrying the sentinel source.
    pub fn builtin(payload: T) -> Self {
        Value {
            payload,
            source: Source::builtin(),
            explicit: false,
        }
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn into_payload(self) -> T {
        self.payload
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// True while the value still carries the default sentinel source.
    pub fn is_default(&self) -> bool {
        self.source.is_builtin()
    }

    /// True when the value was written in the configuration, even after
    /// default propagation rewrote the source of its defaulted siblings.
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Replace the sentinel source with `source`; explicit values are untouched.
    pub fn adopt_source(&mut self, source: &Source) {
        if self.is_default() {
            self.source = source.clone();
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Value<U> {
        Value {
            payload: f(self.payload),
            source: self.source,
            explicit: self.explicit,
        }
    }
}

impl<T: Default> Default for Value<T> {
    fn default() -> Self {
        Value::builtin(T::default())
    }
}

impl<T: PartialEq> PartialEq for Value<T> {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

impl<T: Eq> Eq for Value<T> {}

impl<T: PartialOrd> PartialOrd for Value<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.payload.partial_cmp(&other.payload)
    }
}

impl<T: Ord> Ord for Value<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.payload.cmp(&other.payload)
    }
}

impl<T: Hash> Hash for Value<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.payload.hash(state);
    }
}

/// Item of a labeled collection such as `/renders { /rend01 { ... } }`.
///
/// Labels are optional and not guaranteed to be unique.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Labeled<T> {
    pub label: Option<String>,
    pub value: Value<T>,
}

impl<T> Labeled<T> {
    pub fn new(label: Option<String>, value: Value<T>) -> Self {
        Labeled { label, value }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn source(&self) -> &Source {
        self.value.source()
    }
}

/// Default-value propagation run when a block closes: every field still
/// holding the sentinel source takes the block's opening source.
pub trait PropagateDefaults {
    fn propagate_defaults(&mut self, source: &Source);
}

impl<T: PropagateDefaults> PropagateDefaults for Value<T> {
    fn propagate_defaults(&mut self, source: &Source) {
        self.adopt_source(source);
        self.payload.propagate_defaults(source);
    }
}

impl<T: PropagateDefaults> PropagateDefaults for Option<T> {
    fn propagate_defaults(&mut self, source: &Source) {
        if let Some(inner) = self {
            inner.propagate_defaults(source);
        }
    }
}

impl<T: PropagateDefaults> PropagateDefaults for Labeled<T> {
    fn propagate_defaults(&mut self, source: &Source) {
        self.value.propagate_defaults(source);
    }
}

impl<T: PropagateDefaults> PropagateDefaults for Vec<Labeled<T>> {
    fn propagate_defaults(&mut self, source: &Source) {
        for item in self {
            item.propagate_defaults(source);
        }
    }
}

macro_rules! leaf_payload {
    ($($ty:ty),* $(,)?) => {
        $(
            impl PropagateDefaults for $ty {
                fn propagate_defaults(&mut self, _source: &Source) {}
            }
        )*
    };
}

leaf_payload!(i64, bool, String, Vec<String>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_source() {
        let a = Value::new(3i64, Source::new("a.any", 1, None));
        let b = Value::new(3i64, Source::new("b.any", 9, None));
        assert_eq!(a, b);
        assert!(Value::new(2i64, Source::builtin()) < a);
    }

    #[test]
    fn adopt_source_only_rewrites_defaults() {
        let block = Source::new("farm.any", 4, None);
        let mut defaulted = Value::builtin(5i64);
        let mut written = Value::new(7i64, Source::new("farm.any", 6, None));

        defaulted.propagate_defaults(&block);
        written.propagate_defaults(&block);

        assert_eq!(defaulted.source(), &block);
        assert!(!defaulted.is_default());
        assert!(!defaulted.is_explicit());
        assert_eq!(written.source().line, 6);
        assert!(written.is_explicit());
    }

    #[test]
    fn display_mentions_include_parent() {
        let source = Source::new(
            "conf.d/farms/publish.farm",
            12,
            Some(PathBuf::from("conf.d/dispatcher.any")),
        );
        assert_eq!(
            source.to_string(),
            "conf.d/farms/publish.farm:12 (included from conf.d/dispatcher.any)"
        );
        assert_eq!(Source::builtin().to_string(), "built-in default");
    }
}
