//! Source string literals to M1 byte syntax.
//!
//! A literal that decodes to printable bytes is passed through with its
//! escapes replaced (regular form). Anything else, including embedded
//! double quotes and whitespace-before-`:` pairs that would collide with
//! assembler label syntax, is spelled out as hex byte pairs with a `00`
//! sentinel (hex form). Both forms end with a newline.

#[cfg(test)]
mod strings_tests;

use crate::lexer::LexError;

/// Escape decoding shared by string emission and character literals.
fn decode_escape(bytes: &[u8], at: usize) -> Result<(u8, usize), LexError> {
    let code = bytes.get(at).copied().ok_or(LexError::UnterminatedString)?;
    let simple = match code {
        b'0' => 0,
        b'a' => 7,
        b'b' => 8,
        b't' => 9,
        b'n' => 10,
        b'v' => 11,
        b'f' => 12,
        b'r' => 13,
        b'e' => 27,
        b'"' => 34,
        b'\'' => 39,
        b'\\' => 92,
        b'x' => {
            let hex = bytes
                .get(at + 1..at + 3)
                .ok_or(LexError::UnknownEscape('x'))?;
            let text = std::str::from_utf8(hex).map_err(|_| LexError::UnknownEscape('x'))?;
            let value =
                u8::from_str_radix(text, 16).map_err(|_| LexError::UnknownEscape('x'))?;
            return Ok((value, at + 3));
        }
        other => return Err(LexError::UnknownEscape(other as char)),
    };
    Ok((simple, at + 1))
}

/// Decode a quoted literal (quotes included) into its raw bytes.
pub fn decode(literal: &str) -> Result<Vec<u8>, LexError> {
    let bytes = literal.as_bytes();
    if bytes.len() < 2 {
        return Err(LexError::UnterminatedString);
    }
    let inner = &bytes[1..bytes.len() - 1];
    let mut decoded = Vec::with_capacity(inner.len());
    let mut at = 0;
    while at < inner.len() {
        if inner[at] == b'\\' {
            let (byte, next) = decode_escape(inner, at + 1)?;
            decoded.push(byte);
            at = next;
        } else {
            decoded.push(inner[at]);
            at += 1;
        }
    }
    Ok(decoded)
}

/// Integer value of a character literal; multi-byte literals take the
/// first byte, an empty literal is 0.
pub fn char_value(literal: &str) -> Result<i64, LexError> {
    let decoded = decode(literal)?;
    Ok(decoded.first().map_or(0, |&b| i64::from(b)))
}

/// The printable subset the assembler accepts inside a raw string. The
/// exact membership is load-bearing for emitted assembly; a stray `"`
/// or a whitespace byte followed by `:` must fall back to hex form.
fn is_regular(decoded: &[u8]) -> bool {
    for (at, &byte) in decoded.iter().enumerate() {
        let printable = byte == 9 || byte == 10 || (32..=126).contains(&byte);
        if !printable || byte == b'"' {
            return false;
        }
        let whitespace = byte == 9 || byte == 10 || byte == b' ';
        if whitespace && decoded.get(at + 1) == Some(&b':') {
            return false;
        }
    }
    true
}

/// Encode a quoted source literal into the assembler's byte syntax.
pub fn encode(literal: &str) -> Result<String, LexError> {
    let decoded = decode(literal)?;
    if is_regular(&decoded) {
        let mut out = String::with_capacity(decoded.len() + 3);
        out.push('"');
        for byte in decoded {
            out.push(byte as char);
        }
        out.push('"');
        out.push('\n');
        Ok(out)
    } else {
        let mut out = String::with_capacity(decoded.len() * 3 + 6);
        out.push('\'');
        for byte in decoded {
            out.push_str(&format!("{byte:02X} "));
        }
        out.push_str("00'");
        out.push('\n');
        Ok(out)
    }
}
