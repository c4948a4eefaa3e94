//! Proc macro turning a state model into guard code on a unit struct.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use state_enforcer_codegen::{GuardSet, Namespace, RustModule, StructuredModel, Unit};
use syn::{parse_macro_input, parse_quote, Fields, ItemStruct};

mod attrs;

use attrs::{ModelArgs, ModelSource};

/// Replaces a unit struct with the guards compiled from a state model.
///
/// ```ignore
/// #[state_model(path = "models/door.yml")]
/// pub struct Door;
///
/// let mut door = Door::new(Door::STATE_Init);
/// door.check_allowed_function(Door::FNC_Activate)?;
/// door.change_state(Door::STATE_Active)?;
/// ```
///
/// The struct gains `STATE_*`, `FNC_*` and `SW_*` constants, the three
/// guard functions and the stateful wrappers around them. Model errors are
/// reported at the attribute argument.
#[proc_macro_attribute]
pub fn state_model(args: TokenStream, input: TokenStream) -> TokenStream {
    use darling::FromMeta;
    use darling::ast::NestedMeta;

    let metas = match NestedMeta::parse_meta_list(args.into()) {
        Ok(metas) => metas,
        Err(e) => return darling::Error::from(e).write_errors().into(),
    };
    let args = match ModelArgs::from_list(&metas) {
        Ok(args) => args,
        Err(e) => return e.write_errors().into(),
    };
    let item = parse_macro_input!(input as ItemStruct);

    match generate(args, item) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn generate(args: ModelArgs, item: ItemStruct) -> syn::Result<TokenStream2> {
    if !matches!(item.fields, Fields::Unit) {
        return Err(syn::Error::new_spanned(
            &item.fields,
            "#[state_model] expects a unit struct",
        ));
    }
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "#[state_model] does not support generics",
        ));
    }

    let source = args.source()?;
    let span = source.span();
    let (text, tracked) = match &source {
        ModelSource::File { path, lit } => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                syn::Error::new(lit.span(), format!("cannot read `{}`: {e}", path.display()))
            })?;
            let path = path.display().to_string();
            // Rebuild when the model file changes.
            (text, quote!(const _: &str = include_str!(#path);))
        }
        ModelSource::Inline(lit) => (lit.value(), TokenStream2::new()),
    };

    let model = StructuredModel::from_yaml_str(&text)
        .map_err(|e| syn::Error::new(span, e.to_string()))?;
    let namespace =
        Namespace::allocate(&model).map_err(|e| syn::Error::new(span, e.to_string()))?;
    let guards =
        GuardSet::build(&model, &namespace).map_err(|e| syn::Error::new(span, e.to_string()))?;
    let class_name = item.ident.to_string();
    let unit = Unit {
        model: &model,
        namespace: &namespace,
        guards: &guards,
        package_name: &model.config.package_name,
        class_name: &class_name,
    };

    let tokens = RustModule::for_item(&item, parse_quote!(::state_enforcer))
        .tokens(&unit)
        .map_err(|e| syn::Error::new(span, e.to_string()))?;

    Ok(quote! {
        #tokens
        #tracked
    })
}
