use chardetng::EncodingDetector;
use encoding_rs::Encoding;

use crate::{FailureKind, FetchError, FetchOutput};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPage {
    pub html: String,
    pub encoding_label: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("failed to decode bytes with {encoding}")]
    Malformed { encoding: String },
}

impl From<DecodeError> for FetchError {
    fn from(err: DecodeError) -> Self {
        FetchError::new(FailureKind::Empty, err.to_string())
    }
}

/// Decode a fetched page into UTF-8 text.
pub fn decode_page(output: &FetchOutput) -> Result<DecodedPage, DecodeError> {
    decode_html(&output.bytes, output.metadata.content_type.as_deref())
}

/// Decode raw bytes using: BOM -> Content-Type charset -> chardetng guess.
/// Listing pages are localized, so the header is not always trustworthy.
pub fn decode_html(bytes: &[u8], content_type: Option<&str>) -> Result<DecodedPage, DecodeError> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(enc) = content_type
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return decode_with(bytes, enc);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn charset_label(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim_matches([' ', '"', '\'']).to_string())
    })
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> Result<DecodedPage, DecodeError> {
    let (text, _, had_errors) = enc.decode(bytes);
    if had_errors {
        return Err(DecodeError::Malformed {
            encoding: enc.name().to_string(),
        });
    }
    Ok(DecodedPage {
        html: text.into_owned(),
        encoding_label: enc.name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{charset_label, decode_html};

    #[test]
    fn charset_parameter_is_case_insensitive() {
        assert_eq!(
            charset_label("text/html; Charset=\"ISO-8859-1\""),
            Some("ISO-8859-1".to_string())
        );
        assert_eq!(charset_label("text/html"), None);
    }

    #[test]
    fn header_charset_is_honored() {
        let decoded = decode_html(b"Cr\xe8me", Some("text/html; charset=ISO-8859-1")).unwrap();
        assert_eq!(decoded.html, "Crème");
    }

    #[test]
    fn bom_wins_over_header() {
        let decoded = decode_html(b"\xEF\xBB\xBFok", Some("text/html; charset=ISO-8859-1")).unwrap();
        assert_eq!(decoded.html, "ok");
        assert_eq!(decoded.encoding_label, "UTF-8");
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        assert!(decode_html(b"abc \xc3\x28 def", Some("text/html; charset=utf-8")).is_err());
    }
}
