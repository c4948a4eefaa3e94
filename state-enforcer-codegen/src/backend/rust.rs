//! Rust backend.
//!
//! Renders the guards as a struct with associated constants and guard
//! methods. The CLI pretty-prints the tokens into a file; the attribute macro
//! splices them into the caller's crate.

use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use state_enforcer_core::{Code, Rejection};
use syn::{parse_quote, Attribute, Ident, ItemStruct, LitInt, Path, Visibility};

use super::{binary, hex};
use crate::assemble::{render_all, Artifact, Backend, Section, Unit};
use crate::error::{NamespaceKind, Result};
use crate::ir::{Guard, GuardKind, Symbol};

/// Where the generated struct gets its name, visibility and runtime from.
pub struct RustModule {
    type_name: Ident,
    vis: Visibility,
    attrs: Vec<Attribute>,
    runtime: Path,
}

impl RustModule {
    /// Standalone file built against `state_enforcer_core`.
    pub fn standalone(type_name: &str) -> Self {
        Self {
            type_name: format_ident!("{}", type_name),
            vis: parse_quote!(pub),
            attrs: Vec::new(),
            runtime: parse_quote!(::state_enforcer_core),
        }
    }

    /// Expansion replacing a unit struct, keeping its name, visibility and
    /// attributes.
    pub fn for_item(item: &ItemStruct, runtime: Path) -> Self {
        Self {
            type_name: item.ident.clone(),
            vis: item.vis.clone(),
            attrs: item.attrs.clone(),
            runtime,
        }
    }

    /// Renders the complete item tokens.
    pub fn tokens(&self, unit: &Unit<'_>) -> Result<TokenStream> {
        Ok(self.arrange(render_all(self, unit)?))
    }

    fn arrange(&self, mut artifact: Artifact<TokenStream>) -> TokenStream {
        let mut take = |section| artifact.take(section).unwrap_or_default();
        let header = take(Section::Header);
        let failure_codes = take(Section::FailureCodes);
        let state_constants = take(Section::StateConstants);
        let function_constants = take(Section::FunctionConstants);
        let fields = take(Section::Fields);
        let mutators = take(Section::Mutators);
        let function_guard = take(Section::FunctionGuard);
        let secondary_guard = take(Section::SecondaryGuard);
        let transition_guard = take(Section::TransitionGuard);
        let trailer = take(Section::Trailer);

        let Self {
            type_name,
            vis,
            attrs,
            ..
        } = self;

        quote! {
            #header
            #(#attrs)*
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            #vis struct #type_name {
                #fields
            }

            #[allow(non_upper_case_globals, dead_code, unused_variables, clippy::match_single_binding)]
            impl #type_name {
                #failure_codes
                #state_constants
                #function_constants
                #mutators
                #function_guard
                #secondary_guard
                #transition_guard
            }

            #trailer
        }
    }

    fn ident(symbol: &Symbol) -> Ident {
        match symbol.kind {
            NamespaceKind::State => format_ident!("STATE_{}", symbol.name),
            NamespaceKind::Function => format_ident!("FNC_{}", symbol.name),
        }
    }

    fn rejection(&self, rejection: Rejection) -> TokenStream {
        let runtime = &self.runtime;
        let variant = match rejection {
            Rejection::FunctionNotAllowed => quote!(FunctionNotAllowed),
            Rejection::UnknownState => quote!(UnknownState),
            Rejection::UnknownFunction => quote!(UnknownFunction),
            Rejection::IncorrectStateTransition => quote!(IncorrectStateTransition),
        };
        quote!(#runtime::Rejection::#variant)
    }

    fn constant(&self, symbol: &Symbol) -> TokenStream {
        let runtime = &self.runtime;
        let ident = Self::ident(symbol);
        let value = code_literal(symbol.code);
        let doc = format!(" `{}` = {} (0b{})", symbol.name, hex(symbol.code), binary(symbol.code));
        quote! {
            #[doc = #doc]
            pub const #ident: #runtime::Code = #value;
        }
    }

    /// `matches!(request, Self::A | Self::B)`, or `false` for an empty set.
    fn membership(request: &Ident, symbols: &[Symbol]) -> TokenStream {
        if symbols.is_empty() {
            return quote!(false);
        }
        let idents = symbols.iter().map(Self::ident);
        quote!(matches!(#request, #(Self::#idents)|*))
    }

    fn function_guard(&self, name: &Ident, state_param: &Ident, guard: &Guard) -> TokenStream {
        debug_assert!(guard.kind != GuardKind::Transition);
        let runtime = &self.runtime;
        let request = format_ident!("requested_fnc");
        let unknown_state = self.rejection(Rejection::UnknownState);

        let overrides = if guard.overrides.is_empty() {
            quote!()
        } else {
            let any = Self::membership(&request, &guard.overrides);
            quote! {
                if #any {
                    return Ok(());
                }
            }
        };
        let arms = guard.cases.iter().map(|case| {
            let state = Self::ident(&case.state);
            if case.allowed.is_empty() {
                return quote! {
                    Self::#state => Err(Self::reject_function(#request)),
                };
            }
            let allowed = Self::membership(&request, &case.allowed);
            quote! {
                Self::#state => {
                    if #allowed {
                        Ok(())
                    } else {
                        Err(Self::reject_function(#request))
                    }
                }
            }
        });

        quote! {
            pub fn #name(
                #request: #runtime::Code,
                #state_param: #runtime::Code,
            ) -> ::core::result::Result<(), #runtime::Rejection> {
                #overrides
                match #state_param {
                    #(#arms)*
                    _ => Err(#unknown_state),
                }
            }
        }
    }

    fn reject_function(&self, guard: &Guard) -> TokenStream {
        let runtime = &self.runtime;
        let request = format_ident!("requested_fnc");
        let known = Self::membership(&request, &guard.vocabulary);
        let not_allowed = self.rejection(Rejection::FunctionNotAllowed);
        let unknown = self.rejection(Rejection::UnknownFunction);
        quote! {
            fn reject_function(#request: #runtime::Code) -> #runtime::Rejection {
                if #known {
                    #not_allowed
                } else {
                    #unknown
                }
            }
        }
    }

    fn transition_guard(&self, guard: &Guard) -> TokenStream {
        let runtime = &self.runtime;
        let target = format_ident!("new_state");
        let unknown_state = self.rejection(Rejection::UnknownState);
        let incorrect = self.rejection(Rejection::IncorrectStateTransition);

        let overrides = if guard.overrides.is_empty() {
            quote!()
        } else {
            let any = Self::membership(&target, &guard.overrides);
            quote! {
                if #any {
                    return Ok(#target);
                }
            }
        };
        let arms = guard.cases.iter().map(|case| {
            let state = Self::ident(&case.state);
            if case.allowed.is_empty() {
                return quote! {
                    Self::#state => Err(#incorrect),
                };
            }
            let allowed = Self::membership(&target, &case.allowed);
            quote! {
                Self::#state => {
                    if #allowed {
                        Ok(#target)
                    } else {
                        Err(#incorrect)
                    }
                }
            }
        });

        quote! {
            /// Checks `current_state -> new_state` and returns the new state.
            pub fn transition(
                current_state: #runtime::Code,
                #target: #runtime::Code,
            ) -> ::core::result::Result<#runtime::Code, #runtime::Rejection> {
                #overrides
                match current_state {
                    #(#arms)*
                    _ => Err(#unknown_state),
                }
            }
        }
    }

    fn mutators(&self, unit: &Unit<'_>) -> TokenStream {
        let runtime = &self.runtime;
        let secondary_check = if unit.guards.has_secondary() {
            quote!(Self::check_function_in_secondary_state(requested_fnc, self.state_secondary))
        } else {
            quote!(Ok(()))
        };
        quote! {
            /// Creates a guard in `start_state` with an unspecified secondary state.
            pub const fn new(start_state: #runtime::Code) -> Self {
                Self {
                    state_current: start_state,
                    state_secondary: Self::STATE_UNSPECIFIED,
                }
            }

            /// Checks `requested_fnc` against the primary and the secondary state.
            pub fn check_allowed_function(
                &self,
                requested_fnc: #runtime::Code,
            ) -> ::core::result::Result<(), #runtime::Rejection> {
                Self::check_function_in_state(requested_fnc, self.state_current)?;
                #secondary_check
            }

            /// Moves to `new_state` if the transition is allowed.
            pub fn change_state(
                &mut self,
                new_state: #runtime::Code,
            ) -> ::core::result::Result<#runtime::Code, #runtime::Rejection> {
                self.state_current = Self::transition(self.state_current, new_state)?;
                Ok(self.state_current)
            }

            pub fn set_secondary_state(&mut self, new_secondary_state: #runtime::Code) -> #runtime::Code {
                self.state_secondary = new_secondary_state;
                self.state_secondary
            }

            pub const fn state(&self) -> #runtime::Code {
                self.state_current
            }

            pub const fn secondary_state(&self) -> #runtime::Code {
                self.state_secondary
            }
        }
    }
}

fn code_literal(code: Code) -> LitInt {
    LitInt::new(&hex(code), Span::call_site())
}

impl Backend for RustModule {
    type Fragment = TokenStream;

    fn file_name(&self, _unit: &Unit<'_>) -> String {
        "state_model.rs".to_string()
    }

    fn render(&self, section: Section, unit: &Unit<'_>) -> Result<TokenStream> {
        let runtime = &self.runtime;
        let tokens = match section {
            Section::Header => {
                let doc = format!(
                    " State guards generated by state-enforcer for package `{}`.",
                    unit.package_name
                );
                quote!(#[doc = #doc])
            }
            Section::FailureCodes => {
                let constants = Rejection::ALL.into_iter().map(|rejection| {
                    let name = format_ident!("SW_{}", screaming(&format!("{rejection:?}")));
                    let value = self.rejection(rejection);
                    quote! {
                        pub const #name: u16 = #value.status_word();
                    }
                });
                quote!(#(#constants)*)
            }
            Section::StateConstants => {
                let constants = unit
                    .guards
                    .transition
                    .vocabulary
                    .iter()
                    .map(|symbol| self.constant(symbol));
                quote! {
                    pub const STATE_UNSPECIFIED: #runtime::Code = #runtime::STATE_UNSPECIFIED;
                    #(#constants)*
                }
            }
            Section::FunctionConstants => {
                let constants = unit
                    .guards
                    .function
                    .vocabulary
                    .iter()
                    .map(|symbol| self.constant(symbol));
                quote!(#(#constants)*)
            }
            Section::Fields => quote! {
                state_current: #runtime::Code,
                state_secondary: #runtime::Code,
            },
            Section::Mutators => self.mutators(unit),
            Section::FunctionGuard => {
                let guard = &unit.guards.function;
                let check = self.function_guard(
                    &format_ident!("check_function_in_state"),
                    &format_ident!("current_state"),
                    guard,
                );
                let reject = self.reject_function(guard);
                quote!(#check #reject)
            }
            Section::SecondaryGuard => self.function_guard(
                &format_ident!("check_function_in_secondary_state"),
                &format_ident!("current_secondary_state"),
                &unit.guards.secondary,
            ),
            Section::TransitionGuard => self.transition_guard(&unit.guards.transition),
            Section::Trailer => TokenStream::new(),
        };
        Ok(tokens)
    }

    fn assemble(&self, artifact: Artifact<TokenStream>) -> Result<String> {
        let file: syn::File = syn::parse2(self.arrange(artifact))?;
        Ok(format!(
            "// Generated by state-enforcer {}, do not edit\n\n{}",
            env!("CARGO_PKG_VERSION"),
            prettyplease::unparse(&file)
        ))
    }
}

/// `FunctionNotAllowed` -> `FUNCTION_NOT_ALLOWED`
fn screaming(camel: &str) -> String {
    let mut out = String::with_capacity(camel.len() + 4);
    for (i, c) in camel.chars().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            out.push('_');
        }
        out.push(c.to_ascii_uppercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::{compile, Options, Target};
    use crate::model::StructuredModel;

    fn rust(yaml: &str) -> String {
        let model = StructuredModel::from_yaml_str(yaml).unwrap();
        let options = Options {
            target: Target::Rust,
            ..Options::default()
        };
        compile(&model, &options).unwrap().text
    }

    #[test]
    fn screaming_case() {
        assert_eq!(screaming("FunctionNotAllowed"), "FUNCTION_NOT_ALLOWED");
        assert_eq!(screaming("UnknownState"), "UNKNOWN_STATE");
    }

    #[test]
    fn standalone_file_parses_and_names_everything() {
        let text = rust(
            "
states_transitions:
  Init:
    Activate: Active
  Active:
    Deactivate: Init
states_special:
  anytime_call: [Reset]
  anytime_reach: [Init]
",
        );
        assert!(text.starts_with("// Generated by state-enforcer"));
        syn::parse_file(&text).unwrap();
        for needle in [
            "pub struct StateModel",
            "pub const STATE_Active: ::state_enforcer_core::Code = 0x2AAB;",
            "pub const FNC_Reset",
            "pub const SW_INCORRECT_STATE_TRANSITION: u16",
            "pub fn check_function_in_state(",
            "pub fn check_function_in_secondary_state(",
            "pub fn transition(",
            "fn reject_function(",
        ] {
            assert!(text.contains(needle), "missing `{needle}` in\n{text}");
        }
    }

    #[test]
    fn empty_model_still_renders() {
        let text = rust("");
        assert!(text.contains("Err(::state_enforcer_core::Rejection::UnknownState)"));
    }
}
