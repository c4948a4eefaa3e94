//! Target languages for the generated guards.

mod java;
mod rust;

pub use java::JavaCard;
pub use rust::RustModule;

use state_enforcer_core::Code;

/// `0x4000` style rendering of a code.
pub(crate) fn hex(code: Code) -> String {
    format!("0x{:04X}", code as u16)
}

/// 16-digit binary rendering of a code.
pub(crate) fn binary(code: Code) -> String {
    format!("{:016b}", code as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodings_are_fixed_width() {
        assert_eq!(hex(0x4000), "0x4000");
        assert_eq!(hex(10923), "0x2AAB");
        assert_eq!(binary(0x4000), "0100000000000000");
        assert_eq!(hex(state_enforcer_core::STATE_UNSPECIFIED), "0xF0F0");
    }
}
