//! Compiler from declarative state models to guard code.
//!
//! The pipeline is the same for every target:
//!
//! 1. [`StructuredModel`] loads and validates the YAML document.
//! 2. [`Namespace`] assigns a 16-bit code to every state and function.
//! 3. [`GuardSet`] builds the three guard procedures as data.
//! 4. A [`Backend`] renders the guards; [`compile`] picks it from [`Target`].
//!
//! [`render_dot`] draws the same model as a Graphviz digraph.

pub mod allocator;
pub mod assemble;
pub mod backend;
pub mod diagram;
pub mod document;
pub mod error;
pub mod ir;
pub mod model;

pub use allocator::{allocate, CodeTable, Namespace, MAX_NAMES_PER_NAMESPACE};
pub use assemble::{compile, Backend, Compiled, Options, Target, Unit};
pub use backend::{JavaCard, RustModule};
pub use diagram::{render_dot, DIAGRAM_FILE_NAME};
pub use error::{CompileError, KeyPath, NamespaceKind, Result};
pub use ir::{Guard, GuardKind, GuardSet};
pub use model::{FunctionName, ModelBuilder, ModelConfig, StateName, StructuredModel};

/// Loads `text` and compiles it in one step.
pub fn compile_str(text: &str, options: &Options) -> Result<Compiled> {
    compile(&StructuredModel::from_yaml_str(text)?, options)
}
