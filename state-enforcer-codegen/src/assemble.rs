//! Output Assembler: renders the logical sections of an artifact through a
//! [`Backend`] and joins them in a fixed order.

use tracing::{debug, info};

use crate::allocator::Namespace;
use crate::backend::{JavaCard, RustModule};
use crate::error::Result;
use crate::ir::GuardSet;
use crate::model::StructuredModel;

/// Logical sections of a generated artifact, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Header,
    FailureCodes,
    StateConstants,
    FunctionConstants,
    Fields,
    Mutators,
    FunctionGuard,
    SecondaryGuard,
    TransitionGuard,
    Trailer,
}

impl Section {
    pub const ORDER: [Section; 10] = [
        Section::Header,
        Section::FailureCodes,
        Section::StateConstants,
        Section::FunctionConstants,
        Section::Fields,
        Section::Mutators,
        Section::FunctionGuard,
        Section::SecondaryGuard,
        Section::TransitionGuard,
        Section::Trailer,
    ];
}

/// Everything a backend may read while rendering.
#[derive(Debug, Clone, Copy)]
pub struct Unit<'a> {
    pub model: &'a StructuredModel,
    pub namespace: &'a Namespace,
    pub guards: &'a GuardSet,
    pub package_name: &'a str,
    pub class_name: &'a str,
}

/// Rendered sections, kept in [`Section::ORDER`].
#[derive(Debug)]
pub struct Artifact<F> {
    sections: Vec<(Section, F)>,
}

impl<F> Artifact<F> {
    pub fn new() -> Self {
        Self {
            sections: Vec::with_capacity(Section::ORDER.len()),
        }
    }

    pub fn push(&mut self, section: Section, fragment: F) {
        self.sections.push((section, fragment));
    }

    pub fn get(&self, section: Section) -> Option<&F> {
        self.sections
            .iter()
            .find(|(s, _)| *s == section)
            .map(|(_, fragment)| fragment)
    }

    /// Removes and returns a section, for backends that reorder fragments.
    pub fn take(&mut self, section: Section) -> Option<F> {
        let index = self.sections.iter().position(|(s, _)| *s == section)?;
        Some(self.sections.remove(index).1)
    }

    pub fn into_fragments(self) -> impl Iterator<Item = F> {
        self.sections.into_iter().map(|(_, fragment)| fragment)
    }
}

impl<F> Default for Artifact<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// A target language for the generated guards.
pub trait Backend {
    type Fragment;

    /// Name of the artifact file inside the output directory.
    fn file_name(&self, unit: &Unit<'_>) -> String;

    fn render(&self, section: Section, unit: &Unit<'_>) -> Result<Self::Fragment>;

    fn assemble(&self, artifact: Artifact<Self::Fragment>) -> Result<String>;
}

/// Renders all sections in order.
pub fn render_all<B: Backend>(backend: &B, unit: &Unit<'_>) -> Result<Artifact<B::Fragment>> {
    let mut artifact = Artifact::new();
    for section in Section::ORDER {
        debug!(?section, "rendering section");
        artifact.push(section, backend.render(section, unit)?);
    }
    Ok(artifact)
}

/// Renders and assembles one artifact.
pub fn emit<B: Backend>(backend: &B, unit: &Unit<'_>) -> Result<String> {
    backend.assemble(render_all(backend, unit)?)
}

/// Emission target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Target {
    /// Java Card class throwing `ISOException` status words.
    #[default]
    JavaCard,
    /// Rust module built on `state_enforcer_core`.
    Rust,
}

/// Settings that are not part of the model itself.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub target: Target,
    /// Overrides `config.package_name`.
    pub package_name: Option<String>,
}

/// Result of a successful compilation.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub file_name: String,
    pub text: String,
    pub namespace: Namespace,
}

/// Runs the whole pipeline on a loaded model.
///
/// Pure: identical input always yields byte-identical text.
pub fn compile(model: &StructuredModel, options: &Options) -> Result<Compiled> {
    let namespace = Namespace::allocate(model)?;
    let guards = GuardSet::build(model, &namespace)?;
    let unit = Unit {
        model,
        namespace: &namespace,
        guards: &guards,
        package_name: options
            .package_name
            .as_deref()
            .unwrap_or(&model.config.package_name),
        class_name: &model.config.class_name,
    };

    let (file_name, text) = match options.target {
        Target::JavaCard => (JavaCard.file_name(&unit), emit(&JavaCard, &unit)?),
        Target::Rust => {
            let backend = RustModule::standalone(unit.class_name);
            (backend.file_name(&unit), emit(&backend, &unit)?)
        }
    };
    info!(
        file = %file_name,
        states = namespace.states.len(),
        functions = namespace.functions.len(),
        "guards generated"
    );
    Ok(Compiled {
        file_name,
        text,
        namespace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Names;

    impl Backend for Names {
        type Fragment = &'static str;

        fn file_name(&self, _unit: &Unit<'_>) -> String {
            "names.txt".to_string()
        }

        fn render(&self, section: Section, _unit: &Unit<'_>) -> Result<Self::Fragment> {
            Ok(match section {
                Section::Header => "header",
                Section::Trailer => "trailer",
                _ => "",
            })
        }

        fn assemble(&self, artifact: Artifact<Self::Fragment>) -> Result<String> {
            Ok(artifact
                .into_fragments()
                .filter(|f| !f.is_empty())
                .collect::<Vec<_>>()
                .join("|"))
        }
    }

    #[test]
    fn sections_are_rendered_in_order() {
        let model = StructuredModel::default();
        let namespace = Namespace::allocate(&model).unwrap();
        let guards = GuardSet::build(&model, &namespace).unwrap();
        let unit = Unit {
            model: &model,
            namespace: &namespace,
            guards: &guards,
            package_name: "p",
            class_name: "C",
        };
        let artifact = render_all(&Names, &unit).unwrap();
        assert_eq!(artifact.get(Section::Header), Some(&"header"));
        assert_eq!(emit(&Names, &unit).unwrap(), "header|trailer");
    }

    #[test]
    fn package_override_wins() {
        let model = StructuredModel::from_yaml_str("config: {package_name: from.model}").unwrap();
        let options = Options {
            package_name: Some("from.cli".to_string()),
            ..Options::default()
        };
        let compiled = compile(&model, &options).unwrap();
        assert!(compiled.text.contains("package from.cli;"));
        assert_eq!(compiled.file_name, "StateModel.java");
    }
}
