//! Constant Allocator: assigns every state and function name a distinct code.
//!
//! Names are sorted lexicographically and spaced evenly across the positive
//! `i16` range: with `n` names the step is `round(32768 / (n + 1))` and the
//! k-th name receives `k * step`. The two namespaces are allocated
//! independently and may reuse numeric values.

use std::collections::BTreeMap;

use state_enforcer_core::{Code, STATE_UNSPECIFIED};
use tracing::debug;

use crate::error::{CompileError, NamespaceKind, Result};
use crate::model::StructuredModel;

/// Size of the code space the spacing formula divides.
pub const CODE_SPACE: u32 = 32768;

/// Largest namespace that is allocated.
///
/// The spacing formula keeps every code inside `(0, 32767]` for all counts up
/// to 255. At 256 names the step rounds up to 128 and the last code would be
/// 32768, and beyond that failures are scattered, so 255 is the hard limit.
pub const MAX_NAMES_PER_NAMESPACE: usize = 255;

/// Error from [`allocate`]; the caller knows which namespace it was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exhausted {
    pub count: usize,
}

/// Returns `count` evenly spaced, distinct codes in ascending order.
pub fn allocate(count: usize) -> std::result::Result<Vec<Code>, Exhausted> {
    if count > MAX_NAMES_PER_NAMESPACE {
        return Err(Exhausted { count });
    }
    let slots = count as u32 + 1;
    let step = (CODE_SPACE + slots / 2) / slots;
    if step == 0 {
        return Err(Exhausted { count });
    }

    let mut codes: Vec<Code> = Vec::with_capacity(count);
    for k in 1..=count as u32 {
        let code = Code::try_from(k * step).map_err(|_| Exhausted { count })?;
        let collides = code == STATE_UNSPECIFIED || codes.last().is_some_and(|prev| *prev >= code);
        if code <= 0 || collides {
            return Err(Exhausted { count });
        }
        codes.push(code);
    }
    Ok(codes)
}

/// Sorted names of one namespace together with their codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    kind: NamespaceKind,
    entries: Vec<(String, Code)>,
    index: BTreeMap<String, Code>,
}

impl CodeTable {
    /// Allocates codes for `names`. Duplicates are ignored; order is irrelevant.
    pub fn build<I, S>(kind: NamespaceKind, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sorted: std::collections::BTreeSet<String> = names.into_iter().map(Into::into).collect();
        let codes = allocate(sorted.len()).map_err(|Exhausted { count }| {
            CompileError::CodeSpaceExhausted {
                namespace: kind,
                count,
                max: MAX_NAMES_PER_NAMESPACE,
            }
        })?;

        let entries: Vec<(String, Code)> = sorted.into_iter().zip(codes).collect();
        let index = entries.iter().cloned().collect();
        debug!(namespace = %kind, count = entries.len(), "codes allocated");
        Ok(Self {
            kind,
            entries,
            index,
        })
    }

    pub fn kind(&self) -> NamespaceKind {
        self.kind
    }

    pub fn code(&self, name: &str) -> Option<Code> {
        self.index.get(name).copied()
    }

    /// Name owning `code`, if any.
    pub fn name(&self, code: Code) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(name, _)| name.as_str())
    }

    pub fn contains_code(&self, code: Code) -> bool {
        self.name(code).is_some()
    }

    /// Entries in lexicographic name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Code)> + '_ {
        self.entries.iter().map(|(name, code)| (name.as_str(), *code))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Code tables for both namespaces of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub states: CodeTable,
    pub functions: CodeTable,
}

impl Namespace {
    pub fn allocate(model: &StructuredModel) -> Result<Self> {
        let states = CodeTable::build(
            NamespaceKind::State,
            model.states().into_iter().map(|s| s.as_str()),
        )?;
        let functions = CodeTable::build(
            NamespaceKind::Function,
            model.functions().into_iter().map(|f| f.as_str()),
        )?;
        Ok(Self { states, functions })
    }

    pub fn state(&self, name: &str) -> Option<Code> {
        self.states.code(name)
    }

    pub fn function(&self, name: &str) -> Option<Code> {
        self.functions.code(name)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn spacing_follows_the_formula() {
        assert_eq!(allocate(0).unwrap(), Vec::<Code>::new());
        assert_eq!(allocate(1).unwrap(), vec![0x4000]);
        assert_eq!(allocate(2).unwrap(), vec![10923, 21846]);
        assert_eq!(allocate(3).unwrap(), vec![0x2000, 0x4000, 0x6000]);
    }

    #[test]
    fn every_count_up_to_the_limit_is_valid() {
        for count in 0..=MAX_NAMES_PER_NAMESPACE {
            let codes = allocate(count).unwrap();
            assert_eq!(codes.len(), count);
            assert!(codes.windows(2).all(|w| w[0] < w[1]));
            assert!(codes.iter().all(|c| *c > 0 && *c != STATE_UNSPECIFIED));
        }
    }

    #[test]
    fn counts_past_the_limit_are_exhausted() {
        assert_eq!(allocate(256), Err(Exhausted { count: 256 }));
        assert_eq!(allocate(70_000), Err(Exhausted { count: 70_000 }));
    }

    #[test]
    fn table_is_sorted_and_deduplicated() {
        let table = CodeTable::build(NamespaceKind::State, ["Init", "Active", "Init"]).unwrap();
        let entries: Vec<_> = table.iter().collect();
        assert_eq!(entries, vec![("Active", 10923), ("Init", 21846)]);
        assert_eq!(table.code("Init"), Some(21846));
        assert_eq!(table.name(10923), Some("Active"));
        assert_eq!(table.code("Missing"), None);
    }

    #[test]
    fn exhausted_table_names_its_namespace() {
        let names = (0..300).map(|i| format!("f{i}"));
        let err = CodeTable::build(NamespaceKind::Function, names).unwrap_err();
        match err {
            CompileError::CodeSpaceExhausted {
                namespace, count, ..
            } => {
                assert_eq!(namespace, NamespaceKind::Function);
                assert_eq!(count, 300);
            }
            other => panic!("expected CodeSpaceExhausted, got {other:?}"),
        }
    }
}
