//! Java Card backend.
//!
//! Emits a `StateModel` class whose guards throw `ISOException` status words.

use state_enforcer_core::{Rejection, STATE_UNSPECIFIED};

use super::{binary, hex};
use crate::assemble::{Artifact, Backend, Section, Unit};
use crate::error::{NamespaceKind, Result};
use crate::ir::{Guard, GuardKind, Symbol};

const INDENT: &str = "    ";
/// Column at which `=` of a constant declaration is aligned.
const PADDING: usize = 72;

pub struct JavaCard;

impl JavaCard {
    fn status_word_name(rejection: Rejection) -> &'static str {
        match rejection {
            Rejection::FunctionNotAllowed => "SW_FUNCTINNOTALLOWED",
            Rejection::UnknownState => "SW_UNKNOWNSTATE",
            Rejection::UnknownFunction => "SW_UNKNOWNFUNCTION",
            Rejection::IncorrectStateTransition => "SW_INCORRECTSTATETRANSITION",
        }
    }

    fn ident(symbol: &Symbol) -> String {
        match symbol.kind {
            NamespaceKind::State => symbol.name.clone(),
            NamespaceKind::Function => format!("FNC_{}", symbol.name),
        }
    }

    fn throw(rejection: Rejection) -> String {
        format!("ISOException.throwIt({});", Self::status_word_name(rejection))
    }
}

/// Line-oriented text builder.
#[derive(Default)]
struct Source {
    text: String,
}

impl Source {
    fn line(&mut self, depth: usize, text: impl AsRef<str>) -> &mut Self {
        for _ in 0..depth {
            self.text.push_str(INDENT);
        }
        self.text.push_str(text.as_ref());
        self.text.push('\n');
        self
    }

    fn blank(&mut self) -> &mut Self {
        self.text.push('\n');
        self
    }

    /// `public static final short NAME = (short) 0x....;` padded to [`PADDING`].
    fn constant(&mut self, name: &str, value: &str, comment: Option<&str>) -> &mut Self {
        let declaration = format!("{INDENT}public static final short {name}");
        self.text.push_str(&format!("{declaration:<PADDING$}= (short) {value};"));
        if let Some(comment) = comment {
            self.text.push_str(" // ");
            self.text.push_str(comment);
        }
        self.text.push('\n');
        self
    }

    fn finish(self) -> String {
        self.text
    }
}

impl Backend for JavaCard {
    type Fragment = String;

    fn file_name(&self, unit: &Unit<'_>) -> String {
        format!("{}.java", unit.class_name)
    }

    fn render(&self, section: Section, unit: &Unit<'_>) -> Result<String> {
        let mut out = Source::default();
        match section {
            Section::Header => {
                out.line(
                    0,
                    format!(
                        "// Generated by state-enforcer {}, do not edit",
                        env!("CARGO_PKG_VERSION")
                    ),
                )
                .line(0, format!("package {};", unit.package_name))
                .blank()
                .line(0, "import javacard.framework.ISOException;")
                .blank()
                .line(0, format!("public class {} {{", unit.class_name))
                .blank();
            }
            Section::FailureCodes => {
                for rejection in Rejection::ALL {
                    out.constant(
                        Self::status_word_name(rejection),
                        &format!("0x{:04X}", rejection.status_word()),
                        None,
                    );
                }
                out.blank().blank();
            }
            Section::StateConstants => {
                out.line(1, "// States constants");
                out.constant("STATE_UNSPECIFIED", &hex(STATE_UNSPECIFIED), None);
                for (name, code) in unit.namespace.states.iter() {
                    out.constant(name, &hex(code), Some(&binary(code)));
                }
            }
            Section::FunctionConstants => {
                out.blank().line(1, "// Functions constants");
                for (name, code) in unit.namespace.functions.iter() {
                    out.constant(&format!("FNC_{name}"), &hex(code), Some(&binary(code)));
                }
            }
            Section::Fields => {
                out.blank()
                    .blank()
                    .line(1, "private short STATE_CURRENT = STATE_UNSPECIFIED;")
                    .blank()
                    .line(1, "private short STATE_SECONDARY = STATE_UNSPECIFIED;")
                    .blank();
            }
            Section::Mutators => render_mutators(&mut out, unit),
            Section::FunctionGuard => {
                render_function_guard(
                    &mut out,
                    "checkAllowedFunction",
                    "currentState",
                    &unit.guards.function,
                );
                render_reject_function(&mut out, &unit.guards.function);
            }
            Section::SecondaryGuard => render_function_guard(
                &mut out,
                "checkAllowedFunctionSecondary",
                "currentSecondaryState",
                &unit.guards.secondary,
            ),
            Section::TransitionGuard => render_transition_guard(&mut out, &unit.guards.transition),
            Section::Trailer => {
                out.line(0, "}");
            }
        }
        Ok(out.finish())
    }

    fn assemble(&self, artifact: Artifact<String>) -> Result<String> {
        Ok(artifact.into_fragments().collect())
    }
}

fn render_mutators(out: &mut Source, unit: &Unit<'_>) {
    out.line(1, format!("public {}(short startState) {{", unit.class_name))
        .line(2, "STATE_CURRENT = startState;")
        .line(1, "}")
        .blank()
        .line(1, "public void checkAllowedFunction(short requestedFnc) {")
        .line(2, "// Check allowed function in current state")
        .line(2, "checkAllowedFunction(requestedFnc, STATE_CURRENT);");
    if unit.guards.has_secondary() {
        out.line(2, "// Check allowed function in secondary state")
            .line(2, "checkAllowedFunctionSecondary(requestedFnc, STATE_SECONDARY);");
    } else {
        out.line(2, "// No secondary state model defined");
    }
    out.line(1, "}")
        .blank()
        .line(1, "public short changeState(short newState) {")
        .line(2, "STATE_CURRENT = changeState(STATE_CURRENT, newState);")
        .line(2, "return STATE_CURRENT;")
        .line(1, "}")
        .blank()
        .line(1, "public short setSecondaryState(short newSecondaryState) {")
        .line(2, "STATE_SECONDARY = newSecondaryState;")
        .line(2, "return STATE_SECONDARY;")
        .line(1, "}")
        .blank()
        .line(1, "public short getState() {")
        .line(2, "return STATE_CURRENT;")
        .line(1, "}")
        .blank();
}

fn render_function_guard(out: &mut Source, method: &str, state_param: &str, guard: &Guard) {
    debug_assert!(guard.kind != GuardKind::Transition);
    out.line(
        1,
        format!("private static void {method}(short requestedFnc, short {state_param}) {{"),
    );
    if !guard.overrides.is_empty() {
        out.line(2, "// Functions which can be called from any state")
            .line(2, "switch (requestedFnc) {");
        for symbol in &guard.overrides {
            out.line(3, format!("case {}: return;", JavaCard::ident(symbol)));
        }
        out.line(2, "}").blank();
    }

    out.line(2, "// Check if function can be called from current state")
        .line(2, format!("switch ({state_param}) {{"));
    for case in &guard.cases {
        out.line(3, format!("case {}:", JavaCard::ident(&case.state)));
        for symbol in &case.allowed {
            out.line(4, format!("if (requestedFnc == {}) return;", JavaCard::ident(symbol)));
        }
        out.line(
            4,
            "rejectFunction(requestedFnc); // if reached, function is not allowed in given state",
        )
        .line(4, "break;");
    }
    out.line(3, "default:")
        .line(4, JavaCard::throw(Rejection::UnknownState))
        .line(4, "break;")
        .line(2, "}")
        .line(1, "}")
        .blank();
}

/// Tells a known but disallowed function apart from an unknown one.
fn render_reject_function(out: &mut Source, guard: &Guard) {
    out.line(1, "private static void rejectFunction(short requestedFnc) {")
        .line(2, "switch (requestedFnc) {");
    if !guard.vocabulary.is_empty() {
        for symbol in &guard.vocabulary {
            out.line(3, format!("case {}:", JavaCard::ident(symbol)));
        }
        out.line(4, JavaCard::throw(Rejection::FunctionNotAllowed))
            .line(4, "break;");
    }
    out.line(3, "default:")
        .line(4, JavaCard::throw(Rejection::UnknownFunction))
        .line(4, "break;")
        .line(2, "}")
        .line(1, "}")
        .blank();
}

fn render_transition_guard(out: &mut Source, guard: &Guard) {
    out.line(
        1,
        "private static short changeState(short currentState, short newState) {",
    );
    if !guard.overrides.is_empty() {
        out.line(2, "// States which can be reached from any other state")
            .line(2, "switch (newState) {");
        for symbol in &guard.overrides {
            out.line(3, format!("case {}: return newState;", JavaCard::ident(symbol)));
        }
        out.line(2, "}").blank();
    }

    out.line(2, "switch (currentState) {");
    for case in &guard.cases {
        out.line(3, format!("case {}:", JavaCard::ident(&case.state)));
        for symbol in &case.allowed {
            out.line(
                4,
                format!("if (newState == {}) return newState;", JavaCard::ident(symbol)),
            );
        }
        out.line(
            4,
            format!(
                "{} // if reached, transition is not allowed",
                JavaCard::throw(Rejection::IncorrectStateTransition)
            ),
        )
        .line(4, "break;");
    }
    out.line(3, "default:")
        .line(4, JavaCard::throw(Rejection::UnknownState))
        .line(4, "break;")
        .line(2, "}")
        .line(2, JavaCard::throw(Rejection::IncorrectStateTransition))
        .line(2, "return newState;")
        .line(1, "}")
        .blank();
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use crate::assemble::{compile, Options};
    use crate::model::StructuredModel;

    fn java(yaml: &str) -> String {
        let model = StructuredModel::from_yaml_str(yaml).unwrap();
        compile(&model, &Options::default()).unwrap().text
    }

    fn method<'a>(text: &'a str, signature: &str) -> &'a str {
        let start = text.find(signature).unwrap();
        let end = start + text[start..].find("\n    }\n").unwrap();
        &text[start..end]
    }

    #[test]
    fn constants_are_sorted_padded_and_documented() {
        let text = java(indoc! {"
            states_transitions:
              Init:
                Activate: Active
              Active:
                Deactivate: Init
        "});
        let expected = indoc! {"
            // States constants
                public static final short STATE_UNSPECIFIED                         = (short) 0xF0F0;
                public static final short Active                                    = (short) 0x2AAB; // 0010101010101011
                public static final short Init                                      = (short) 0x5556; // 0101010101010110

                // Functions constants
                public static final short FNC_Activate                              = (short) 0x2AAB; // 0010101010101011
                public static final short FNC_Deactivate                            = (short) 0x5556; // 0101010101010110
        "};
        assert!(text.contains(expected), "{text}");
        assert!(text.contains(
            "    public static final short SW_FUNCTINNOTALLOWED                      = (short) 0x9AF0;\n"
        ));
    }

    #[test]
    fn function_guard_dispatches_on_state() {
        let text = java(indoc! {"
            states_transitions:
              Init:
                Activate: Active
            states_special:
              anytime_call: [Reset]
        "});
        let expected = indoc! {"
            private static void checkAllowedFunction(short requestedFnc, short currentState) {
                    // Functions which can be called from any state
                    switch (requestedFnc) {
                        case FNC_Reset: return;
                    }

                    // Check if function can be called from current state
                    switch (currentState) {
                        case Active:
                            rejectFunction(requestedFnc); // if reached, function is not allowed in given state
                            break;
                        case Init:
                            if (requestedFnc == FNC_Activate) return;
                            rejectFunction(requestedFnc); // if reached, function is not allowed in given state
                            break;
                        default:
                            ISOException.throwIt(SW_UNKNOWNSTATE);
                            break;
                    }"};
        assert_eq!(
            method(&text, "private static void checkAllowedFunction("),
            expected
        );
    }

    #[test]
    fn transition_guard_checks_anytime_targets_first() {
        let text = java(indoc! {"
            states_transitions:
              Init:
                Activate: Active
            states_special:
              anytime_reach: [Init]
        "});
        let guard = method(&text, "private static short changeState(");
        let reach = guard.find("case Init: return newState;").unwrap();
        let dispatch = guard.find("switch (currentState)").unwrap();
        assert!(reach < dispatch);
        assert!(guard.contains("if (newState == Active) return newState;"));
    }

    #[test]
    fn combined_check_skips_missing_secondary_axis() {
        let text = java("states_transitions: {Init: {Activate: Init}}");
        assert!(text.contains("// No secondary state model defined"));

        let text = java(indoc! {"
            states_transitions: {Init: {Activate: Init}}
            secondary_state_check: {Admin: [Activate]}
        "});
        assert!(text.contains("checkAllowedFunctionSecondary(requestedFnc, STATE_SECONDARY);"));
        assert!(text.contains("case Admin:"));
    }

    #[test]
    fn class_is_closed_once() {
        let text = java("");
        assert!(text.starts_with("// Generated by state-enforcer"));
        assert!(text.contains("public class StateModel {"));
        assert!(text.ends_with("    }\n\n}\n"));
    }
}
