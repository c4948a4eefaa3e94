//! Compile-time errors.

use std::fmt;

use thiserror::Error;

/// Which of the two code namespaces an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NamespaceKind {
    State,
    Function,
}

impl fmt::Display for NamespaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State => f.write_str("state"),
            Self::Function => f.write_str("function"),
        }
    }
}

/// Location of a value inside the model document, e.g.
/// `states_transitions.Init.Activate`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a new path one level deeper.
    #[must_use]
    pub fn join(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(key.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        f.write_str(&self.0.join("."))
    }
}

/// Errors that abort a compilation. No artifact is produced when one occurs.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("malformed model at `{path}`: {reason}")]
    MalformedModel { path: KeyPath, reason: String },

    #[error("{count} unique {namespace} names exceed the code space (at most {max} per namespace)")]
    CodeSpaceExhausted {
        namespace: NamespaceKind,
        count: usize,
        max: usize,
    },

    #[error(
        "ambiguous transition: `{function}` in state `{state}` targets both `{first}` and `{second}`"
    )]
    DuplicateTargetAmbiguity {
        state: String,
        function: String,
        first: String,
        second: String,
    },

    #[error("{namespace} `{name}` has no code in the namespace it was compiled with")]
    Unallocated { namespace: NamespaceKind, name: String },

    #[error("model document is not valid YAML: {0}")]
    Decode(#[from] serde_yaml::Error),

    #[error("generated Rust code does not parse: {0}")]
    Render(#[from] syn::Error),
}

impl CompileError {
    pub(crate) fn malformed(path: &KeyPath, reason: impl Into<String>) -> Self {
        Self::MalformedModel {
            path: path.clone(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = CompileError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_path_display() {
        assert_eq!(KeyPath::root().to_string(), "<root>");
        let path = KeyPath::root().join("states_transitions").join("Init");
        assert_eq!(path.to_string(), "states_transitions.Init");
        assert_eq!(path.segments().len(), 2);
    }
}
