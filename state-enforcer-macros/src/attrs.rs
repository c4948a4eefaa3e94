//! Attribute parsing for the `#[state_model]` macro.

use std::path::PathBuf;

use darling::FromMeta;
use proc_macro2::Span;
use syn::LitStr;

/// Arguments for `#[state_model(path = "...")]` or `#[state_model(yaml = "...")]`.
#[derive(Debug, FromMeta)]
pub struct ModelArgs {
    /// Model file, relative to the invoking crate's manifest directory.
    pub path: Option<LitStr>,
    /// Inline model document.
    pub yaml: Option<LitStr>,
}

/// Where the model document comes from.
pub enum ModelSource {
    File { path: PathBuf, lit: LitStr },
    Inline(LitStr),
}

impl ModelSource {
    pub fn span(&self) -> Span {
        match self {
            Self::File { lit, .. } | Self::Inline(lit) => lit.span(),
        }
    }
}

impl ModelArgs {
    pub fn source(self) -> syn::Result<ModelSource> {
        match (self.path, self.yaml) {
            (Some(lit), None) => {
                let root = std::env::var("CARGO_MANIFEST_DIR")
                    .map_err(|_| syn::Error::new(lit.span(), "CARGO_MANIFEST_DIR is not set"))?;
                let path = PathBuf::from(root).join(lit.value());
                Ok(ModelSource::File { path, lit })
            }
            (None, Some(lit)) => Ok(ModelSource::Inline(lit)),
            (Some(_), Some(yaml)) => Err(syn::Error::new(
                yaml.span(),
                "`path` and `yaml` are mutually exclusive",
            )),
            (None, None) => Err(syn::Error::new(
                Span::call_site(),
                "missing model: expected `path = \"...\"` or `yaml = \"...\"`",
            )),
        }
    }
}
