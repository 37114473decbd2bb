//! PlantUML text encoding.
//!
//! The rendering service expects the diagram source in its URL path as
//! raw DEFLATE output written with a URL-safe base64 variant. The digits
//! come first in that alphabet, so a zero sextet is `0` rather than `A`,
//! and a trailing partial group is padded with zero sextets instead of `=`.

use std::io::Write;

use base64::Engine;
use base64::alphabet::Alphabet;
use base64::engine::{GeneralPurpose, general_purpose};
use flate2::Compression;
use flate2::write::DeflateEncoder;

use crate::error::PreviewResult;

const PLANTUML_ALPHABET: Alphabet =
    match Alphabet::new("0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_") {
        Ok(alphabet) => alphabet,
        Err(_) => panic!("invalid PlantUML alphabet"),
    };

const PLANTUML_ENGINE: GeneralPurpose =
    GeneralPurpose::new(&PLANTUML_ALPHABET, general_purpose::NO_PAD);

/// Encode a diagram source for use in a render request path.
pub fn encode_diagram(source: &str) -> PreviewResult<String> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(source.as_bytes())?;
    let compressed = encoder.finish()?;
    Ok(encode64(&compressed))
}

/// Base64 over the PlantUML alphabet, always emitting whole four-character groups.
fn encode64(bytes: &[u8]) -> String {
    let mut encoded = PLANTUML_ENGINE.encode(bytes);
    while encoded.len() % 4 != 0 {
        encoded.push('0');
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::DeflateDecoder;
    use std::io::Read;

    #[test]
    fn test_encode64_alphabet_edges() {
        assert_eq!(encode64(&[0, 0, 0]), "0000");
        assert_eq!(encode64(&[0xFF, 0xFF, 0xFF]), "____");
        // 0b000001 000010 000011 000100
        assert_eq!(encode64(&[0x04, 0x20, 0xC4]), "1234");
    }

    #[test]
    fn test_encode64_pads_partial_groups_with_zero_digit() {
        let one = encode64(&[0xFF]);
        assert_eq!(one, "_m00");
        let two = encode64(&[0xFF, 0xFF]);
        assert_eq!(two, "__y0");
        assert!(!one.contains('='));
    }

    #[test]
    fn test_encoded_diagram_inflates_back_to_source() {
        let source = "@startuml\nAlice -> Bob: héllo\n@enduml";
        let encoded = encode_diagram(source).unwrap();

        assert_eq!(encoded.len() % 4, 0);
        assert!(
            encoded
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );

        // Padding digits decode to trailing zero bytes past the final deflate block.
        let compressed = PLANTUML_ENGINE.decode(&encoded).unwrap();
        let mut inflated = String::new();
        DeflateDecoder::new(compressed.as_slice())
            .read_to_string(&mut inflated)
            .unwrap();
        assert_eq!(inflated, source);
    }

    #[test]
    fn test_empty_source_still_encodes() {
        let encoded = encode_diagram("").unwrap();
        assert!(!encoded.is_empty());
    }
}
