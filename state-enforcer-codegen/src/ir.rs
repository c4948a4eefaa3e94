use std::collections::BTreeSet;

use state_enforcer_core::{Code, Rejection};

use crate::allocator::{CodeTable, Namespace};
use crate::error::{CompileError, NamespaceKind};
use crate::model::{FunctionName, StateName, StructuredModel};

/// A named constant of the generated code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Symbol {
    pub kind: NamespaceKind,
    pub name: String,
    pub code: Code,
}

/// Which of the three guard procedures a [`Guard`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    /// Function allowed in the current primary state.
    Function,
    /// Function allowed in the current secondary state.
    SecondaryFunction,
    /// Transition from the current state to a requested target.
    Transition,
}

/// One `case` of the state dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardCase {
    pub state: Symbol,
    /// Sorted, deduplicated requests accepted in this state.
    pub allowed: Vec<Symbol>,
}

/// Complete Intermediate Representation of one guard procedure.
///
/// Backends render it; [`Guard::evaluate`] defines what the rendering must do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    pub kind: GuardKind,
    /// Requests accepted before any state dispatch.
    pub overrides: Vec<Symbol>,
    /// Cases in state name order.
    pub cases: Vec<GuardCase>,
    /// Every request the model knows, used to tell a disallowed function
    /// from an unknown one.
    pub vocabulary: Vec<Symbol>,
}

impl Guard {
    /// Decision procedure of the guard.
    pub fn evaluate(&self, request: Code, current: Code) -> Result<(), Rejection> {
        if self.overrides.iter().any(|s| s.code == request) {
            return Ok(());
        }
        let case = self
            .cases
            .iter()
            .find(|case| case.state.code == current)
            .ok_or(Rejection::UnknownState)?;
        if case.allowed.iter().any(|s| s.code == request) {
            return Ok(());
        }
        Err(self.miss(request))
    }

    /// Rejection for a request that reached a case and was not allowed.
    pub fn miss(&self, request: Code) -> Rejection {
        match self.kind {
            GuardKind::Transition => Rejection::IncorrectStateTransition,
            GuardKind::Function | GuardKind::SecondaryFunction => {
                if self.vocabulary.iter().any(|s| s.code == request) {
                    Rejection::FunctionNotAllowed
                } else {
                    Rejection::UnknownFunction
                }
            }
        }
    }
}

/// The three guards of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardSet {
    pub function: Guard,
    pub secondary: Guard,
    pub transition: Guard,
}

impl GuardSet {
    /// Builds the guards of `model`. Every name must have a code in `namespace`.
    pub fn build(model: &StructuredModel, namespace: &Namespace) -> Result<Self, CompileError> {
        let state = |name: &StateName| lookup(NamespaceKind::State, name.as_str(), namespace.state(name.as_str()));
        let function =
            |name: &FunctionName| lookup(NamespaceKind::Function, name.as_str(), namespace.function(name.as_str()));

        let anytime_call = model.anytime_call.iter().map(function).collect::<Result<Vec<_>, _>>()?;
        let primary = model.primary_states();

        let function_cases = primary
            .iter()
            .map(|&s| {
                Ok(GuardCase {
                    state: state(s)?,
                    allowed: sorted(
                        model
                            .transitions_from(s.as_str())
                            .into_iter()
                            .flat_map(|fncs| fncs.keys())
                            .map(function)
                            .collect::<Result<Vec<_>, _>>()?,
                    ),
                })
            })
            .collect::<Result<Vec<_>, CompileError>>()?;

        let secondary_cases = model
            .secondary
            .iter()
            .map(|(s, fncs)| {
                Ok(GuardCase {
                    state: state(s)?,
                    allowed: sorted(fncs.iter().map(function).collect::<Result<Vec<_>, _>>()?),
                })
            })
            .collect::<Result<Vec<_>, CompileError>>()?;

        let transition_cases = primary
            .iter()
            .map(|&s| {
                Ok(GuardCase {
                    state: state(s)?,
                    allowed: sorted(
                        model
                            .transitions_from(s.as_str())
                            .into_iter()
                            .flat_map(|fncs| fncs.values())
                            .map(state)
                            .collect::<Result<Vec<_>, _>>()?,
                    ),
                })
            })
            .collect::<Result<Vec<_>, CompileError>>()?;

        let reach = model.anytime_reach.iter().map(state).collect::<Result<Vec<_>, _>>()?;
        let functions = vocabulary(NamespaceKind::Function, &namespace.functions);
        let states = vocabulary(NamespaceKind::State, &namespace.states);

        Ok(Self {
            function: Guard {
                kind: GuardKind::Function,
                overrides: anytime_call.clone(),
                cases: function_cases,
                vocabulary: functions.clone(),
            },
            secondary: Guard {
                kind: GuardKind::SecondaryFunction,
                overrides: anytime_call,
                cases: secondary_cases,
                vocabulary: functions,
            },
            transition: Guard {
                kind: GuardKind::Transition,
                overrides: sorted(reach),
                cases: transition_cases,
                vocabulary: states,
            },
        })
    }

    /// Whether the model defines a secondary axis at all.
    pub fn has_secondary(&self) -> bool {
        !self.secondary.cases.is_empty()
    }

    /// Combined primary and secondary function check.
    pub fn check_function(&self, request: Code, primary: Code, secondary: Code) -> Result<(), Rejection> {
        self.function.evaluate(request, primary)?;
        if self.has_secondary() {
            self.secondary.evaluate(request, secondary)?;
        }
        Ok(())
    }
}

fn symbol(kind: NamespaceKind, name: &str, code: Code) -> Symbol {
    Symbol {
        kind,
        name: name.to_string(),
        code,
    }
}

fn lookup(kind: NamespaceKind, name: &str, code: Option<Code>) -> Result<Symbol, CompileError> {
    match code {
        Some(code) => Ok(symbol(kind, name, code)),
        None => Err(CompileError::Unallocated {
            namespace: kind,
            name: name.to_string(),
        }),
    }
}

/// Orders by name and drops repeats.
fn sorted(symbols: impl IntoIterator<Item = Symbol>) -> Vec<Symbol> {
    let unique: BTreeSet<(String, Symbol)> = symbols.into_iter().map(|s| (s.name.clone(), s)).collect();
    unique.into_iter().map(|(_, s)| s).collect()
}

fn vocabulary(kind: NamespaceKind, table: &CodeTable) -> Vec<Symbol> {
    table.iter().map(|(name, code)| symbol(kind, name, code)).collect()
}
