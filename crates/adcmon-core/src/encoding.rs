use encoding_rs::{DecoderResult, UTF_8};

/// Decodes `bytes` as UTF-8, dropping malformed sequences instead of
/// substituting U+FFFD for them.
pub fn decode_dropping_invalid(bytes: &[u8]) -> String {
    let mut decoder = UTF_8.new_decoder_without_bom_handling();
    let mut text = String::with_capacity(bytes.len());
    let mut src = bytes;
    let mut dropped = 0usize;

    loop {
        let needed = decoder
            .max_utf8_buffer_length_without_replacement(src.len())
            .unwrap_or(src.len().saturating_mul(3));
        text.reserve(needed);

        let (result, read) = decoder.decode_to_string_without_replacement(src, &mut text, true);
        src = &src[read..];
        match result {
            DecoderResult::InputEmpty => break,
            DecoderResult::OutputFull => continue,
            DecoderResult::Malformed(bad, _) => dropped += bad as usize,
        }
    }

    if dropped > 0 {
        log::debug!("dropped {dropped} undecodable byte(s) from a {}-byte line", bytes.len());
    }
    text
}

/// Whitespace plus the ASCII file, group, record and unit separators.
fn is_padding(c: char) -> bool {
    c.is_whitespace() || ('\x1c'..='\x1f').contains(&c)
}

/// Decodes a raw line and trims surrounding padding. Blank lines yield `None`.
pub fn clean_line(raw: &[u8]) -> Option<String> {
    let text = decode_dropping_invalid(raw);
    let trimmed = text.trim_matches(is_padding);
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_utf8_passes_through() {
        assert_eq!(decode_dropping_invalid("adc=1.25V ñ".as_bytes()), "adc=1.25V ñ");
    }

    #[test]
    fn malformed_bytes_are_omitted() {
        assert_eq!(decode_dropping_invalid(b"4\xff2"), "42");
        assert_eq!(decode_dropping_invalid(b"\xc3(ok"), "(ok");
    }

    #[test]
    fn truncated_sequence_at_end_is_omitted() {
        assert_eq!(decode_dropping_invalid(b"raw \xe2\x82"), "raw ");
    }

    #[test]
    fn clean_line_trims_terminators() {
        assert_eq!(clean_line(b"  42\r\n").as_deref(), Some("42"));
    }

    #[test]
    fn clean_line_strips_separator_controls() {
        assert_eq!(clean_line(b"\x1c\x1d\x1e\x1f\n"), None);
        assert_eq!(clean_line(b"\x1e 512\x1f\r\n").as_deref(), Some("512"));
        assert_eq!(clean_line(b"a\x1fb\n").as_deref(), Some("a\x1fb"));
    }

    #[test]
    fn clean_line_rejects_blank() {
        assert_eq!(clean_line(b" \t\r\n"), None);
        assert_eq!(clean_line(b"\xff\n"), None);
        assert_eq!(clean_line(b""), None);
    }
}
