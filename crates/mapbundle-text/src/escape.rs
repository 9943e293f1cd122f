//! Lossless byte <-> ASCII escaping for game text.
//!
//! Any byte outside the printable-ASCII allowlist is represented as a
//! `#hh` two-digit lowercase hex escape, and `#` itself must be escaped
//! to avoid ambiguity. `import`/`export` are exact inverses.

const ALLOWED: &[u8] = b" \\\n\r\t\"/~!@$%^&*_-+=()[]{}':;,.";

fn is_allowed(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || ALLOWED.contains(&byte)
}

/// Escape raw bytes into the game's ASCII text form.
///
/// When `null_terminate` is set, only the bytes up to (not including) the
/// first NUL byte are escaped, matching how the game treats fixed-size
/// null-terminated name fields.
pub fn import(bytes: &[u8], null_terminate: bool) -> String {
    let bytes = if null_terminate {
        match bytes.iter().position(|&b| b == 0) {
            Some(pos) => &bytes[..pos],
            None => bytes,
        }
    } else {
        bytes
    };

    let mut out = String::with_capacity(bytes.len());
    for &byte in bytes {
        if is_allowed(byte) && byte != b'#' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("#{byte:02x}"));
        }
    }
    out
}

/// Inverse of [`import`]: turn escaped text back into raw bytes.
pub fn export(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'#' && i + 2 < bytes.len() {
            if let Ok(value) = u8::from_str_radix(&text[i + 1..i + 3], 16) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trips_printable_ascii() {
        let text = "hello world, this/is_a-test.txt";
        assert_eq!(import(text.as_bytes(), false), text);
        assert_eq!(export(text), text.as_bytes());
    }

    #[test]
    fn escapes_non_printable_bytes() {
        let bytes = [0x01, b'a', 0xff, b'#'];
        let escaped = import(&bytes, false);
        assert_eq!(escaped, "#01a#ff#23");
        assert_eq!(export(&escaped), bytes);
    }

    #[test]
    fn null_terminates_by_default() {
        let bytes = b"name\0garbagegarbage";
        assert_eq!(import(bytes, true), "name");
    }

    #[test]
    fn round_trip_is_identity_for_arbitrary_bytes() {
        let bytes: Vec<u8> = (0u16..=255).map(|b| b as u8).collect();
        let escaped = import(&bytes, false);
        assert_eq!(export(&escaped), bytes);
    }
}
