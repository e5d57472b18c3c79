//! Assembly block support.
//!
//! Scripts may embed `!asm`/`!c2` blocks. Turning their bodies into bytes is
//! left to a [`BlockAssembler`]; the built-in [`HexBlockAssembler`] only
//! understands pre-assembled data.

use crate::types::{self, OperandError};

pub trait BlockAssembler {
    /// Assemble the body lines of one block.
    fn assemble(&self, lines: &[&str]) -> Result<Vec<u8>, OperandError>;
}

/// Accepts hex words and `.long`/`.short`/`.byte` data directives.
#[derive(Clone, Copy, Debug, Default)]
pub struct HexBlockAssembler;

impl BlockAssembler for HexBlockAssembler {
    fn assemble(&self, lines: &[&str]) -> Result<Vec<u8>, OperandError> {
        let mut out = Vec::new();
        for line in lines {
            let text = line.split('#').next().unwrap_or("").trim();
            if text.is_empty() {
                continue;
            }
            if let Some(directive) = text.strip_prefix('.') {
                let (name, values) = directive
                    .split_once(char::is_whitespace)
                    .unwrap_or((directive, ""));
                let width = match name {
                    "long" => 4,
                    "short" => 2,
                    "byte" => 1,
                    _ => return Err(OperandError::Assembly(format!("unsupported directive: .{}", name))),
                };
                for value in values.split(',').map(str::trim).filter(|v| !v.is_empty()) {
                    push_value(&mut out, value, width)?;
                }
            } else {
                out.extend(types::hex_string(text).map_err(|_| {
                    OperandError::Assembly(format!("unsupported line: {}", text))
                })?);
            }
        }
        Ok(out)
    }
}

fn push_value(out: &mut Vec<u8>, value: &str, width: usize) -> Result<(), OperandError> {
    let parsed = types::integer(value)?;
    let limit = 1i64 << (width * 8);
    if parsed >= limit || parsed < -(limit / 2) {
        return Err(OperandError::Assembly(format!(
            "value {} does not fit in {} byte(s)",
            value, width
        )));
    }
    let bytes = (parsed as u64).to_be_bytes();
    out.extend_from_slice(&bytes[8 - width..]);
    Ok(())
}

/// Wrap an assembled body in a Gecko `C2` (insert ASM) code.
///
/// A body ending mid-line is closed with a `00000000` word; one ending on a
/// line boundary gets an extra `60000000 00000000` line.
pub fn c2_code(address: u32, body: &[u8]) -> Result<Vec<u8>, OperandError> {
    if body.len() % 4 != 0 {
        return Err(OperandError::Assembly(format!(
            "c2 body is 0x{:X} bytes, not a whole number of instructions",
            body.len()
        )));
    }
    let mut payload = body.to_vec();
    if payload.len() % 8 == 0 {
        payload.extend_from_slice(&[0x60, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    } else {
        payload.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    }
    let line_count = (payload.len() / 8) as u32;

    let mut out = Vec::with_capacity(payload.len() + 8);
    out.extend_from_slice(&(0xC200_0000 | (address & 0x01FF_FFFF)).to_be_bytes());
    out.extend_from_slice(&line_count.to_be_bytes());
    out.extend(payload);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_words_and_directives() {
        let bytes = HexBlockAssembler
            .assemble(&["38600001 # li r3,1", "", ".long 0x4E800020", ".short 1, 2", ".byte 0xFF"])
            .unwrap();
        assert_eq!(
            types::to_hex(&bytes),
            "386000014E80002000010002FF"
        );
    }

    #[test]
    fn mnemonics_are_rejected() {
        let err = HexBlockAssembler.assemble(&["li r3, 1"]).unwrap_err();
        assert!(matches!(err, OperandError::Assembly(_)));
    }

    #[test]
    fn directive_range_is_checked() {
        assert!(HexBlockAssembler.assemble(&[".byte 256"]).is_err());
        assert!(HexBlockAssembler.assemble(&[".short 0x10000"]).is_err());
        assert_eq!(
            types::to_hex(&HexBlockAssembler.assemble(&[".byte -1", ".short -2"]).unwrap()),
            "FFFFFE"
        );
    }

    #[test]
    fn word_directive_is_not_accepted() {
        // `.word` width differs between assemblers; blocks spell out `.long` or `.short`
        assert_eq!(
            HexBlockAssembler.assemble(&[".word 0x4E800020"]),
            Err(OperandError::Assembly("unsupported directive: .word".to_string()))
        );
    }

    #[test]
    fn c2_pads_odd_instruction_count() {
        let code = c2_code(0x8012_3456, &[0x38, 0x60, 0x00, 0x01]).unwrap();
        assert_eq!(types::to_hex(&code), "C2123456000000013860000100000000");
    }

    #[test]
    fn c2_adds_nop_line_for_even_instruction_count() {
        let code = c2_code(0x8000_0010, &[0u8; 8]).unwrap();
        assert_eq!(
            types::to_hex(&code),
            "C2000010000000020000000000000000".to_string() + "6000000000000000"
        );
    }
}
