//! Source payload decoding
//!
//! The source declares UTF-8 but has historically served Windows-1252
//! bodies. UTF-8 is attempted first; on failure the payload is re-decoded
//! as Windows-1252, and that fallback is a logged decision rather than a
//! silent one. A payload neither encoding can represent is fatal.

use encoding_rs::WINDOWS_1252;
use std::borrow::Cow;
use tracing::{debug, warn};
use urgences_common::{CollectorError, Result};

/// A decoded source payload and the encoding that produced it
#[derive(Debug)]
pub struct DecodedPayload<'a> {
    pub text: Cow<'a, str>,
    pub encoding: &'static str,
}

/// Decode the raw payload into text
///
/// Tries UTF-8, then Windows-1252. A leading BOM is stripped in either case.
pub fn decode_payload(bytes: &[u8]) -> Result<DecodedPayload<'_>> {
    match std::str::from_utf8(bytes) {
        Ok(text) => {
            debug!(bytes = bytes.len(), "Source payload decoded as UTF-8");
            Ok(DecodedPayload {
                text: strip_bom(Cow::Borrowed(text)),
                encoding: "utf-8",
            })
        },
        Err(utf8_err) => {
            warn!(
                error = %utf8_err,
                "Source payload is not valid UTF-8, falling back to windows-1252"
            );
            let (text, _, had_errors) = WINDOWS_1252.decode(bytes);
            if had_errors {
                return Err(CollectorError::decode(
                    "payload is neither valid UTF-8 nor windows-1252",
                ));
            }
            Ok(DecodedPayload {
                text: strip_bom(text),
                encoding: "windows-1252",
            })
        },
    }
}

fn strip_bom(text: Cow<'_, str>) -> Cow<'_, str> {
    match text {
        Cow::Borrowed(s) => Cow::Borrowed(s.strip_prefix('\u{feff}').unwrap_or(s)),
        Cow::Owned(s) => match s.strip_prefix('\u{feff}') {
            Some(stripped) => Cow::Owned(stripped.to_string()),
            None => Cow::Owned(s),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_utf8() {
        let decoded = decode_payload("Nom,Région\nHôpital,06\n".as_bytes()).unwrap();
        assert_eq!(decoded.encoding, "utf-8");
        assert_eq!(decoded.text, "Nom,Région\nHôpital,06\n");
    }

    #[test]
    fn test_windows_1252_fallback() {
        // "Hôpital Général" in windows-1252: ô = 0xF4, é = 0xE9
        let bytes = b"Nom\nH\xf4pital G\xe9n\xe9ral\n";
        let decoded = decode_payload(bytes).unwrap();
        assert_eq!(decoded.encoding, "windows-1252");
        assert_eq!(decoded.text, "Nom\nHôpital Général\n");
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"Nom\nA\n");
        let decoded = decode_payload(&bytes).unwrap();
        assert_eq!(decoded.encoding, "utf-8");
        assert_eq!(decoded.text, "Nom\nA\n");
    }

    #[test]
    fn test_empty_payload() {
        let decoded = decode_payload(b"").unwrap();
        assert_eq!(decoded.encoding, "utf-8");
        assert!(decoded.text.is_empty());
    }
}
