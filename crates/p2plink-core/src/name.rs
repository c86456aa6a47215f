//! Well-known name codec.
//!
//! DNS-SD instance names are case-insensitive, so bus names are escaped
//! before they go on the air: every uppercase letter and every `-` is
//! written as `-` followed by the lowercase character. `decode_name`
//! reverses the transformation.

/// Escape char used by the codec.
const ESCAPE: char = '-';

/// Encode a well-known name into its DNS-SD safe form.
pub fn encode_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + name.len() / 4);
    for c in name.chars() {
        if c.is_uppercase() || c == ESCAPE {
            out.push(ESCAPE);
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Decode a name produced by [`encode_name`].
///
/// `--` yields a literal `-`, `-x` yields `X`. A final character left over
/// after the escape scan is copied through verbatim, so a dangling `-` at
/// the end of the input survives decoding unchanged.
pub fn decode_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len());
    let mut i = 0;

    while i + 1 < chars.len() {
        let c = chars[i];
        let next = chars[i + 1];
        if c == ESCAPE {
            if next == ESCAPE {
                out.push(next);
            } else {
                out.extend(next.to_uppercase());
            }
            i += 2;
        } else {
            out.push(c);
            i += 1;
        }
    }

    // Trailing character (possibly a dangling escape marker).
    if i + 1 == chars.len() {
        out.push(chars[i]);
    }
    out
}
