//! Model Loader: turns the decoded model document into a [`StructuredModel`].
//!
//! Every section of the document is optional. Absent or null sections give
//! empty collections; a section with the wrong shape fails with
//! [`CompileError::MalformedModel`] naming the offending key path.

use std::borrow::Borrow;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_yaml::Value;
use tracing::{debug, warn};

use crate::document::Node;
use crate::error::{CompileError, KeyPath, Result};

pub const TAG_CONFIG: &str = "config";
pub const TAG_STATES_TRANSITIONS: &str = "states_transitions";
pub const TAG_STATES_SPECIAL: &str = "states_special";
pub const TAG_SECONDARY_STATE_CHECK: &str = "secondary_state_check";

pub const TAG_PACKAGE_NAME: &str = "package_name";
pub const TAG_CLASS_NAME: &str = "class_name";
pub const TAG_COLORING: &str = "coloring";
pub const TAG_ANYTIME_CALL: &str = "anytime_call";
pub const TAG_ANYTIME_REACH: &str = "anytime_reach";

pub const DEFAULT_PACKAGE_NAME: &str = "yourpackage";
pub const DEFAULT_CLASS_NAME: &str = "StateModel";

/// State names that would shadow constants or fields of the generated code.
const RESERVED_STATE_NAMES: &[&str] = &[
    "STATE_UNSPECIFIED",
    "STATE_CURRENT",
    "STATE_SECONDARY",
    "UNSPECIFIED",
];
const RESERVED_STATE_PREFIXES: &[&str] = &["SW_", "FNC_"];

/// Identifiers the Java class already uses. States are emitted verbatim, so
/// a state with one of these names would shadow it.
const JAVA_GENERATED_NAMES: &[&str] = &[
    "ISOException",
    "requestedFnc",
    "currentState",
    "currentSecondaryState",
    "newState",
    "newSecondaryState",
    "startState",
];

/// Java reserved words and literals.
const JAVA_KEYWORDS: &[&str] = &[
    "_", "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class",
    "const", "continue", "default", "do", "double", "else", "enum", "extends", "false", "final",
    "finally", "float", "for", "goto", "if", "implements", "import", "instanceof", "int",
    "interface", "long", "native", "new", "null", "package", "private", "protected", "public",
    "return", "short", "static", "strictfp", "super", "switch", "synchronized", "this", "throw",
    "throws", "transient", "true", "try", "void", "volatile", "while",
];

/// Rust strict and reserved keywords (edition 2024).
const RUST_KEYWORDS: &[&str] = &[
    "_", "Self", "abstract", "as", "async", "await", "become", "box", "break", "const",
    "continue", "crate", "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for",
    "gen", "if", "impl", "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override",
    "priv", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "try",
    "type", "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

macro_rules! name_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

name_type!(
    /// Case-sensitive name of a (primary or secondary) state.
    StateName
);
name_type!(
    /// Case-sensitive name of a guarded function.
    FunctionName
);

impl StateName {
    /// Validates `raw` as a state name.
    pub fn new(raw: impl Into<String>) -> std::result::Result<Self, String> {
        let raw = raw.into();
        check_identifier(&raw)?;
        if RESERVED_STATE_NAMES.contains(&raw.as_str())
            || RESERVED_STATE_PREFIXES.iter().any(|p| raw.starts_with(p))
        {
            return Err(format!("`{raw}` is reserved for generated constants"));
        }
        if is_java_keyword(&raw) || JAVA_GENERATED_NAMES.contains(&raw.as_str()) {
            return Err(format!("`{raw}` cannot name a constant of the Java class"));
        }
        Ok(Self(raw))
    }
}

impl FunctionName {
    /// Validates `raw` as a function name.
    pub fn new(raw: impl Into<String>) -> std::result::Result<Self, String> {
        let raw = raw.into();
        check_identifier(&raw)?;
        Ok(Self(raw))
    }
}

fn check_identifier(raw: &str) -> std::result::Result<(), String> {
    let mut chars = raw.chars();
    let Some(first) = chars.next() else {
        return Err("name must not be empty".to_string());
    };
    if !(first.is_ascii_alphabetic() || first == '_')
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(format!("`{raw}` is not a valid identifier"));
    }
    Ok(())
}

fn is_java_keyword(raw: &str) -> bool {
    JAVA_KEYWORDS.contains(&raw)
}

/// The class name doubles as the Rust type name.
fn check_class_name(raw: &str) -> std::result::Result<(), String> {
    check_identifier(raw)?;
    if is_java_keyword(raw) || RUST_KEYWORDS.contains(&raw) || raw == "ISOException" {
        return Err(format!("`{raw}` cannot name the generated class"));
    }
    Ok(())
}

/// Values from the `config` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub package_name: String,
    pub class_name: String,
    /// Edge colours for the diagram, keyed by function.
    pub coloring: BTreeMap<FunctionName, String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            package_name: DEFAULT_PACKAGE_NAME.to_string(),
            class_name: DEFAULT_CLASS_NAME.to_string(),
            coloring: BTreeMap::new(),
        }
    }
}

/// Outgoing functions of one state, each with its single target.
pub type Transitions = BTreeMap<FunctionName, StateName>;

/// Validated, immutable FSM model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredModel {
    pub config: ModelConfig,
    pub transitions: BTreeMap<StateName, Transitions>,
    pub secondary: BTreeMap<StateName, BTreeSet<FunctionName>>,
    pub anytime_call: BTreeSet<FunctionName>,
    pub anytime_reach: BTreeSet<StateName>,
}

impl StructuredModel {
    /// Decodes YAML text and loads it.
    ///
    /// Repeated keys reach the loader instead of failing the decode, so a
    /// function listed twice under one state with different targets is a
    /// [`CompileError::DuplicateTargetAmbiguity`].
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let document: Node = serde_yaml::from_str(text)?;
        Self::from_node(&document)
    }

    /// Loads a model from an already decoded document.
    pub fn from_value(document: &Value) -> Result<Self> {
        Self::from_node(&Node::from(document))
    }

    fn from_node(document: &Node) -> Result<Self> {
        let root = KeyPath::root();
        let Some(sections) = as_mapping(&root, document)? else {
            return Ok(Self::default());
        };

        let mut builder = ModelBuilder::default();
        for (key, value) in sections {
            let tag = key_str(&root, key)?;
            let path = root.join(tag);
            match tag {
                TAG_CONFIG => builder.config = load_config(&path, value)?,
                TAG_STATES_TRANSITIONS => load_transitions(&mut builder, &path, value)?,
                TAG_STATES_SPECIAL => load_special(&mut builder, &path, value)?,
                TAG_SECONDARY_STATE_CHECK => load_secondary(&mut builder, &path, value)?,
                other => warn!(section = other, "ignoring unknown model section"),
            }
        }

        let model = builder.build();
        let functions = model.functions();
        for function in model.config.coloring.keys() {
            if !functions.contains(&function) {
                warn!(%function, "coloring refers to a function not used by the model");
            }
        }
        debug!(
            states = model.transitions.len(),
            secondary = model.secondary.len(),
            anytime_call = model.anytime_call.len(),
            anytime_reach = model.anytime_reach.len(),
            "model loaded"
        );
        Ok(model)
    }

    /// States of the primary machine: transition sources, transition targets
    /// and anytime-reach states.
    pub fn primary_states(&self) -> BTreeSet<&StateName> {
        self.transitions
            .iter()
            .flat_map(|(from, fncs)| std::iter::once(from).chain(fncs.values()))
            .chain(&self.anytime_reach)
            .collect()
    }

    /// Every state name of the model, primary and secondary.
    pub fn states(&self) -> BTreeSet<&StateName> {
        let mut states = self.primary_states();
        states.extend(self.secondary.keys());
        states
    }

    /// Every function name of the model.
    pub fn functions(&self) -> BTreeSet<&FunctionName> {
        self.transitions
            .values()
            .flat_map(|fncs| fncs.keys())
            .chain(&self.anytime_call)
            .chain(self.secondary.values().flatten())
            .collect()
    }

    /// Outgoing functions of `state`, empty for states without a case.
    pub fn transitions_from(&self, state: &str) -> Option<&Transitions> {
        self.transitions.get(state)
    }
}

/// Programmatic construction of a [`StructuredModel`].
///
/// The loader goes through the builder so the single-target invariant is
/// checked in exactly one place.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    config: ModelConfig,
    transitions: BTreeMap<StateName, Transitions>,
    secondary: BTreeMap<StateName, BTreeSet<FunctionName>>,
    anytime_call: BTreeSet<FunctionName>,
    anytime_reach: BTreeSet<StateName>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&mut self, config: ModelConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Declares a primary state, possibly without outgoing functions.
    pub fn state(&mut self, state: StateName) -> &mut Self {
        self.transitions.entry(state).or_default();
        self
    }

    /// Adds `from --function--> to`.
    ///
    /// Re-adding the same edge is a no-op; a different target for an existing
    /// (state, function) pair fails.
    pub fn transition(
        &mut self,
        from: StateName,
        function: FunctionName,
        to: StateName,
    ) -> Result<&mut Self> {
        let fncs = self.transitions.entry(from.clone()).or_default();
        match fncs.entry(function) {
            Entry::Vacant(slot) => {
                slot.insert(to);
            }
            Entry::Occupied(slot) if *slot.get() != to => {
                return Err(CompileError::DuplicateTargetAmbiguity {
                    state: from.to_string(),
                    function: slot.key().to_string(),
                    first: slot.get().to_string(),
                    second: to.to_string(),
                });
            }
            Entry::Occupied(_) => {}
        }
        Ok(self)
    }

    pub fn anytime_call(&mut self, function: FunctionName) -> &mut Self {
        self.anytime_call.insert(function);
        self
    }

    pub fn anytime_reach(&mut self, state: StateName) -> &mut Self {
        self.anytime_reach.insert(state);
        self
    }

    /// Declares a secondary state, possibly allowing nothing.
    pub fn secondary_state(&mut self, state: StateName) -> &mut Self {
        self.secondary.entry(state).or_default();
        self
    }

    /// Allows `function` while the secondary state equals `state`.
    pub fn secondary(&mut self, state: StateName, function: FunctionName) -> &mut Self {
        self.secondary.entry(state).or_default().insert(function);
        self
    }

    pub fn build(self) -> StructuredModel {
        StructuredModel {
            config: self.config,
            transitions: self.transitions,
            secondary: self.secondary,
            anytime_call: self.anytime_call,
            anytime_reach: self.anytime_reach,
        }
    }
}

fn load_config(path: &KeyPath, node: &Node) -> Result<ModelConfig> {
    let mut config = ModelConfig::default();
    let Some(entries) = as_mapping(path, node)? else {
        return Ok(config);
    };
    for (key, node) in entries {
        let tag = key_str(path, key)?;
        let path = path.join(tag);
        match tag {
            TAG_PACKAGE_NAME => {
                let package = non_empty_str(&path, node)?;
                if !package
                    .split('.')
                    .all(|segment| check_identifier(segment).is_ok() && !is_java_keyword(segment))
                {
                    return Err(CompileError::malformed(
                        &path,
                        format!("`{package}` is not a valid package name"),
                    ));
                }
                config.package_name = package.to_string();
            }
            TAG_CLASS_NAME => {
                let class = non_empty_str(&path, node)?;
                check_class_name(class).map_err(|reason| CompileError::malformed(&path, reason))?;
                config.class_name = class.to_string();
            }
            TAG_COLORING => {
                let Some(colors) = as_mapping(&path, node)? else {
                    continue;
                };
                for (fnc, color) in colors {
                    let fnc = function_name(&path, fnc)?;
                    let color = non_empty_str(&path.join(fnc.as_str()), color)?;
                    config.coloring.insert(fnc, color.to_string());
                }
            }
            other => warn!(key = other, "ignoring unknown config key"),
        }
    }
    Ok(config)
}

fn load_transitions(builder: &mut ModelBuilder, path: &KeyPath, node: &Node) -> Result<()> {
    let Some(states) = as_mapping(path, node)? else {
        return Ok(());
    };
    for (state, fncs) in states {
        let from = state_name(path, state)?;
        let path = path.join(from.as_str());
        builder.state(from.clone());
        // Repeated function keys are kept; the builder decides whether they agree.
        let Some(fncs) = as_entries(&path, fncs)? else {
            continue;
        };
        for (fnc, target) in fncs {
            let function = function_name(&path, fnc)?;
            let to = state_value(&path.join(function.as_str()), target)?;
            builder.transition(from.clone(), function, to)?;
        }
    }
    Ok(())
}

fn load_special(builder: &mut ModelBuilder, path: &KeyPath, node: &Node) -> Result<()> {
    let Some(entries) = as_mapping(path, node)? else {
        return Ok(());
    };
    for (key, node) in entries {
        let tag = key_str(path, key)?;
        let path = path.join(tag);
        match tag {
            TAG_ANYTIME_CALL => {
                for item in as_sequence(&path, node)? {
                    builder.anytime_call(function_value(&path, item)?);
                }
            }
            TAG_ANYTIME_REACH => {
                for item in as_sequence(&path, node)? {
                    builder.anytime_reach(state_value(&path, item)?);
                }
            }
            other => warn!(key = other, "ignoring unknown states_special key"),
        }
    }
    Ok(())
}

fn load_secondary(builder: &mut ModelBuilder, path: &KeyPath, node: &Node) -> Result<()> {
    let Some(states) = as_mapping(path, node)? else {
        return Ok(());
    };
    for (state, fncs) in states {
        let state = state_name(path, state)?;
        let path = path.join(state.as_str());
        builder.secondary_state(state.clone());
        for fnc in as_sequence(&path, fncs)? {
            builder.secondary(state.clone(), function_value(&path, fnc)?);
        }
    }
    Ok(())
}

/// Entries of a mapping in document order, `None` for null.
fn as_entries<'a>(path: &KeyPath, node: &'a Node) -> Result<Option<&'a [(Value, Node)]>> {
    match node {
        Node::Null => Ok(None),
        Node::Mapping(entries) => Ok(Some(entries.as_slice())),
        other => Err(CompileError::malformed(
            path,
            format!("expected a mapping, found {}", other.describe()),
        )),
    }
}

/// Like [`as_entries`], but a repeated key is malformed.
fn as_mapping<'a>(path: &KeyPath, node: &'a Node) -> Result<Option<&'a [(Value, Node)]>> {
    let Some(entries) = as_entries(path, node)? else {
        return Ok(None);
    };
    let mut seen = BTreeSet::new();
    for key in entries.iter().filter_map(|(key, _)| key.as_str()) {
        if !seen.insert(key) {
            return Err(CompileError::malformed(
                &path.join(key),
                "key appears more than once",
            ));
        }
    }
    Ok(Some(entries))
}

/// Null reads as an empty list.
fn as_sequence<'a>(path: &KeyPath, node: &'a Node) -> Result<&'a [Node]> {
    match node {
        Node::Null => Ok(&[]),
        Node::Sequence(items) => Ok(items.as_slice()),
        other => Err(CompileError::malformed(
            path,
            format!("expected a list, found {}", other.describe()),
        )),
    }
}

fn key_str<'a>(path: &KeyPath, key: &'a Value) -> Result<&'a str> {
    key.as_str().ok_or_else(|| {
        CompileError::malformed(
            path,
            format!("expected a string key, found {}", Node::from(key).describe()),
        )
    })
}

fn non_empty_str<'a>(path: &KeyPath, node: &'a Node) -> Result<&'a str> {
    match node.as_str() {
        Some(s) if !s.is_empty() => Ok(s),
        Some(_) => Err(CompileError::malformed(path, "value must not be empty")),
        None => Err(CompileError::malformed(
            path,
            format!("expected a string, found {}", node.describe()),
        )),
    }
}

/// A state used as a mapping key.
fn state_name(path: &KeyPath, key: &Value) -> Result<StateName> {
    let raw = key_str(path, key)?;
    StateName::new(raw).map_err(|reason| CompileError::malformed(&path.join(raw), reason))
}

/// A function used as a mapping key.
fn function_name(path: &KeyPath, key: &Value) -> Result<FunctionName> {
    let raw = key_str(path, key)?;
    FunctionName::new(raw).map_err(|reason| CompileError::malformed(&path.join(raw), reason))
}

/// A state used as a value, such as a transition target.
fn state_value(path: &KeyPath, node: &Node) -> Result<StateName> {
    let raw = node.as_str().ok_or_else(|| {
        CompileError::malformed(
            path,
            format!("expected a single state name, found {}", node.describe()),
        )
    })?;
    StateName::new(raw).map_err(|reason| CompileError::malformed(path, reason))
}

/// A function used as a list item.
fn function_value(path: &KeyPath, node: &Node) -> Result<FunctionName> {
    let raw = node.as_str().ok_or_else(|| {
        CompileError::malformed(
            path,
            format!("expected a function name, found {}", node.describe()),
        )
    })?;
    FunctionName::new(raw).map_err(|reason| CompileError::malformed(path, reason))
}
