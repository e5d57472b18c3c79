//! Operand typing.
//!
//! Converts the untyped text of a script operand into a typed value. Every
//! conversion is all-or-nothing: the whole operand is valid or the call fails.

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OperandError {
    #[error("invalid syntax: {0:?}")]
    InvalidSyntax(String),

    #[error("hex is not byte-aligned or contains invalid characters")]
    BadHex,

    #[error("binary is not byte-aligned")]
    BinaryNotAligned,

    #[error("binary contains invalid characters")]
    BadBinary,

    #[error("invalid integer format: {0:?}")]
    BadInteger(String),

    #[error("invalid address: {0:?}")]
    BadAddress(String),

    #[error("expected a string wrapped in quotes")]
    Unquoted,

    #[error("string cannot be empty")]
    EmptyString,

    #[error("string contains non-ASCII characters")]
    NonAscii,

    #[error("unknown command: !{0}")]
    UnknownCommand(String),

    #[error("!{command} expects {expected} operand(s), found {found}")]
    OperandCount {
        command: String,
        expected: usize,
        found: usize,
    },

    #[error("!{0} block is never closed")]
    UnterminatedBlock(String),

    #[error("unable to assemble block: {0}")]
    Assembly(String),
}

/// Raw data, either hex (`ff`) or binary (`%11111111`).
pub fn data(untyped: &str) -> Result<Vec<u8>, OperandError> {
    match untyped.chars().next() {
        Some(c) if c.is_ascii_hexdigit() => hex_string(untyped),
        Some('%') => binary_string(untyped),
        _ => Err(OperandError::InvalidSyntax(untyped.to_string())),
    }
}

/// Plain hex data. Whitespace between digits is ignored.
pub fn hex_string(untyped: &str) -> Result<Vec<u8>, OperandError> {
    let digits = untyped
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_digit(16).map(|d| d as u8).ok_or(OperandError::BadHex))
        .collect::<Result<Vec<u8>, _>>()?;
    if digits.len() % 2 != 0 {
        return Err(OperandError::BadHex);
    }
    Ok(digits.chunks(2).map(|pair| pair[0] << 4 | pair[1]).collect())
}

/// Binary data prefixed with `%`. Whitespace between bits is ignored.
pub fn binary_string(untyped: &str) -> Result<Vec<u8>, OperandError> {
    let body = untyped.strip_prefix('%').unwrap_or(untyped);
    let bits: Vec<char> = body.chars().filter(|c| !c.is_whitespace()).collect();
    if bits.is_empty() {
        return Err(OperandError::BadBinary);
    }
    if bits.iter().any(|&c| c != '0' && c != '1') {
        return Err(OperandError::BadBinary);
    }
    if bits.len() % 8 != 0 {
        return Err(OperandError::BinaryNotAligned);
    }
    Ok(bits
        .chunks(8)
        .map(|byte| byte.iter().fold(0u8, |acc, &bit| acc << 1 | (bit == '1') as u8))
        .collect())
}

/// An integer in decimal (`19`) or hex (`0x13`) notation.
pub fn integer(untyped: &str) -> Result<i64, OperandError> {
    let err = || OperandError::BadInteger(untyped.to_string());
    let (negative, magnitude) = match untyped.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, untyped),
    };
    let value = match magnitude.strip_prefix("0x") {
        Some(hex) if is_digits(hex, 16) => i64::from_str_radix(hex, 16).map_err(|_| err())?,
        Some(_) => return Err(err()),
        None if is_digits(magnitude, 10) => magnitude.parse::<i64>().map_err(|_| err())?,
        None => return Err(err()),
    };
    Ok(if negative { -value } else { value })
}

/// An address in pure hex, without `0x` notation.
pub fn address(untyped: &str) -> Result<u32, OperandError> {
    let err = || OperandError::BadAddress(untyped.to_string());
    if !is_digits(untyped, 16) {
        return Err(err());
    }
    u32::from_str_radix(untyped, 16).map_err(|_| err())
}

/// A non-empty string wrapped in quotes.
pub fn string(untyped: &str) -> Result<String, OperandError> {
    let typed = untyped
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or(OperandError::Unquoted)?;
    if typed.is_empty() {
        return Err(OperandError::EmptyString);
    }
    Ok(typed.to_string())
}

/// Unchecked operand, e.g. a file name.
pub fn any(untyped: &str) -> String {
    untyped.to_string()
}

/// Uppercase hex rendering used in diagnostics.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

fn is_digits(text: &str, radix: u32) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_digit(radix))
}
