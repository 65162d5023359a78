use super::*;

#[test]
fn test_regular_passthrough() {
    assert_eq!("\"Hello mes\n\"\n", encode("\"Hello mes\\n\"").unwrap());
}

#[test]
fn test_regular_keeps_tabs() {
    assert_eq!("\"a\tb\"\n", encode("\"a\\tb\"").unwrap());
}

#[test]
fn test_embedded_quote_goes_hex() {
    assert_eq!("'61 22 62 00'\n", encode("\"a\\\"b\"").unwrap());
}

#[test]
fn test_nul_goes_hex() {
    assert_eq!("'61 00 62 00'\n", encode("\"a\\0b\"").unwrap());
}

#[test]
fn test_label_collision_goes_hex() {
    // a whitespace byte followed by ':' would read as an assembler label
    assert_eq!("'61 20 3A 62 00'\n", encode("\"a :b\"").unwrap());
}

#[test]
fn test_colon_without_whitespace_is_regular() {
    assert_eq!("\"a:b\"\n", encode("\"a:b\"").unwrap());
}

#[test]
fn test_hex_escape() {
    assert_eq!(vec![0x1Bu8, b'Z'], decode("\"\\x1BZ\"").unwrap());
}

#[test]
fn test_unknown_escape() {
    assert_eq!(Err(LexError::UnknownEscape('q')), decode("\"\\q\""));
}

#[test]
fn test_char_values() {
    assert_eq!(97, char_value("'a'").unwrap());
    assert_eq!(10, char_value("'\\n'").unwrap());
    assert_eq!(0, char_value("'\\0'").unwrap());
    assert_eq!(39, char_value("'\\''").unwrap());
}

#[test]
fn test_hex_form_round_trips() {
    let bytes = decode("\"a\\0b\"").unwrap();
    let encoded = encode("\"a\\0b\"").unwrap();
    let inner = encoded.trim_end().trim_matches('\'').trim_end();
    let parsed: Vec<u8> = inner
        .split(' ')
        .map(|pair| u8::from_str_radix(pair, 16).unwrap())
        .collect();
    // the encoder appends a 00 sentinel
    assert_eq!(bytes, parsed[..parsed.len() - 1].to_vec());
}
