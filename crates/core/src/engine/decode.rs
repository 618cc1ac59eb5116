use encoding_rs::{Encoding, UTF_8};

/// Map a configured encoding label to an encoding, falling back to UTF-8 when
/// the label is unset or unknown.
pub fn resolve_encoding(label: Option<&str>) -> &'static Encoding {
    label
        .and_then(|l| Encoding::for_label(l.trim().as_bytes()))
        .unwrap_or(UTF_8)
}

/// Turn raw engine output bytes into ordered recommendation lines. Undecodable
/// sequences become U+FFFD instead of failing the invocation; lines are
/// trimmed and empty lines dropped.
pub fn decode_lines(bytes: &[u8], encoding: &'static Encoding) -> Vec<String> {
    let (text, _, _) = encoding.decode(bytes);
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_drops_empty_lines_preserving_order() {
        let out = decode_lines(b"  uno  \n\n   \ndos\ntres \n", UTF_8);
        assert_eq!(out, ["uno", "dos", "tres"]);
    }

    #[test]
    fn invalid_bytes_become_replacement_chars_not_errors() {
        // 0xFF is never valid UTF-8.
        let out = decode_lines(b"hola \xff mundo\n", UTF_8);
        assert_eq!(out, ["hola \u{FFFD} mundo"]);
    }

    #[test]
    fn unknown_label_falls_back_to_utf8() {
        assert_eq!(resolve_encoding(Some("no-such-encoding")), UTF_8);
        assert_eq!(resolve_encoding(None), UTF_8);
    }

    #[test]
    fn known_label_decodes_legacy_bytes() {
        let enc = resolve_encoding(Some("latin1"));
        // "años" in ISO-8859-1.
        let out = decode_lines(b"a\xf1os\n", enc);
        assert_eq!(out, ["años"]);
    }
}
