//! Command line front end: read a model, write the guards and the diagram.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use state_enforcer_codegen::{
    compile, render_dot, CodeTable, Namespace, Options, StructuredModel, Target,
    DIAGRAM_FILE_NAME,
};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetArg {
    /// Java Card class
    Java,
    /// Rust module built on state-enforcer-core
    Rust,
}

impl From<TargetArg> for Target {
    fn from(target: TargetArg) -> Self {
        match target {
            TargetArg::Java => Target::JavaCard,
            TargetArg::Rust => Target::Rust,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "state-enforcer")]
#[command(about = "Generates state guards and a Graphviz diagram from a YAML state model", long_about = None)]
#[command(version)]
pub struct Cli {
    /// YAML file with the state model
    pub model: PathBuf,

    /// Directory receiving the generated files
    #[arg(default_value = ".")]
    pub out_dir: PathBuf,

    /// Language of the generated guards
    #[arg(long, value_enum, default_value_t = TargetArg::Java)]
    pub target: TargetArg,

    /// Package name, overriding `config.package_name`
    #[arg(long)]
    pub package: Option<String>,

    /// Skip the Graphviz diagram
    #[arg(long)]
    pub no_diagram: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Default log filter for the requested verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Compiles the model and writes every output. Returns the summary printed
/// on stdout.
///
/// All outputs are rendered before the first write and staged before the
/// first rename, so a failure leaves no partial set of outputs behind.
pub fn run(cli: &Cli) -> Result<String> {
    let text = fs::read_to_string(&cli.model)
        .with_context(|| format!("failed to read model `{}`", cli.model.display()))?;
    let model = StructuredModel::from_yaml_str(&text)
        .with_context(|| format!("failed to load model `{}`", cli.model.display()))?;

    let options = Options {
        target: cli.target.into(),
        package_name: cli.package.clone(),
    };
    let compiled = compile(&model, &options)
        .with_context(|| format!("failed to compile model `{}`", cli.model.display()))?;

    let mut outputs = vec![(cli.out_dir.join(&compiled.file_name), compiled.text)];
    if !cli.no_diagram {
        let dot = render_dot(&model, &source_label(&cli.model));
        outputs.push((cli.out_dir.join(DIAGRAM_FILE_NAME), dot));
    }

    fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("failed to create `{}`", cli.out_dir.display()))?;
    let staged: Vec<PathBuf> = outputs.iter().map(|(path, _)| staging_path(path)).collect();
    if let Err(err) = commit(&outputs, &staged) {
        for tmp in &staged {
            let _ = fs::remove_file(tmp);
        }
        return Err(err);
    }

    Ok(summary(&compiled.namespace))
}

/// Writes every output to its staging path, then renames them into place.
fn commit(outputs: &[(PathBuf, String)], staged: &[PathBuf]) -> Result<()> {
    for ((_, contents), tmp) in outputs.iter().zip(staged) {
        fs::write(tmp, contents).with_context(|| format!("failed to write `{}`", tmp.display()))?;
        debug!(path = %tmp.display(), "staged output");
    }
    if let Some((path, _)) = outputs.iter().find(|(path, _)| path.is_dir()) {
        bail!("failed to write `{}`: it is a directory", path.display());
    }
    for ((path, contents), tmp) in outputs.iter().zip(staged) {
        fs::rename(tmp, path).with_context(|| format!("failed to write `{}`", path.display()))?;
        info!(path = %path.display(), bytes = contents.len(), "wrote output");
    }
    Ok(())
}

/// Hidden sibling of `path`, on the same file system so the rename is atomic.
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

fn source_label(model: &Path) -> String {
    model
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| model.display().to_string())
}

/// Lists both namespaces with their codes.
pub fn summary(namespace: &Namespace) -> String {
    let mut out = String::new();
    table(&mut out, "states", &namespace.states);
    out.push('\n');
    table(&mut out, "functions", &namespace.functions);
    out
}

fn table(out: &mut String, title: &str, table: &CodeTable) {
    debug!(kind = %table.kind(), count = table.len(), "summarising namespace");
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{} unique {title} found:", table.len());
    for (name, code) in table.iter() {
        let _ = writeln!(out, "  {name:<32} 0x{:04X}", code as u16);
    }
}
