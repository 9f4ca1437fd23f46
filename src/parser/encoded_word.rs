//! RFC 2047 encoded-word decoding for header values.

use tracing::debug;

use crate::parser::{charset, transfer};

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// Whitespace between two adjacent encoded-words is dropped (RFC 2047 §6.2).
/// A token that cannot be decoded (unknown charset, encoding other than `B`
/// or `Q`, missing `?=`, bad base64) is kept verbatim.
pub fn decode_encoded_words(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        let after_start = &remaining[start + 2..];

        match try_decode_one_word(after_start) {
            Some(decoded) => {
                if !last_was_encoded || !before.trim().is_empty() {
                    result.push_str(before);
                }
                result.push_str(&decoded.text);
                remaining = &after_start[decoded.consumed..];
                last_was_encoded = true;
            }
            None => {
                result.push_str(before);
                result.push_str("=?");
                remaining = after_start;
                last_was_encoded = false;
            }
        }
    }

    result.push_str(remaining);
    result
}

struct DecodedWord {
    text: String,
    /// Bytes consumed from the string *after* the initial `=?`.
    consumed: usize,
}

fn try_decode_one_word(s: &str) -> Option<DecodedWord> {
    // Format: charset?encoding?encoded_text?=
    let first_q = s.find('?')?;
    let charset_spec = &s[..first_q];
    if charset_spec.is_empty() || charset_spec.contains(char::is_whitespace) {
        return None;
    }
    // RFC 2231 §5: charset*language
    let charset_name = charset_spec.split('*').next().unwrap_or(charset_spec);

    let rest = &s[first_q + 1..];
    let second_q = rest.find('?')?;
    let encoding = &rest[..second_q];

    let rest2 = &rest[second_q + 1..];
    let end = rest2.find("?=")?;
    let encoded_text = &rest2[..end];

    let consumed = first_q + 1 + second_q + 1 + end + 2;

    let bytes = if encoding.eq_ignore_ascii_case("B") {
        match transfer::decode_base64(encoded_text.as_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(error = %e, "Undecodable B encoded-word kept verbatim");
                return None;
            }
        }
    } else if encoding.eq_ignore_ascii_case("Q") {
        decode_q_encoding(encoded_text)
    } else {
        return None;
    };

    match charset::decode(charset_name, &bytes) {
        Ok(text) => Some(DecodedWord { text, consumed }),
        Err(e) => {
            debug!(charset = charset_name, error = %e, "Encoded-word kept verbatim");
            None
        }
    }
}

/// Decode Q-encoding (RFC 2047 §4.2): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                match transfer::hex_pair(bytes[i + 1], bytes[i + 2]) {
                    Some(byte) => {
                        result.push(byte);
                        i += 3;
                    }
                    None => {
                        result.push(b'=');
                        i += 1;
                    }
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_encoded_word() {
        assert_eq!(decode_encoded_words("=?utf-8?B?SGVsbG8=?="), "Hello");
    }

    #[test]
    fn test_decode_q_encoded_word() {
        assert_eq!(decode_encoded_words("=?ISO-8859-1?Q?caf=E9?="), "café");
    }

    #[test]
    fn test_adjacent_words_concatenate() {
        let input = "=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?=";
        assert_eq!(decode_encoded_words(input), "Hola mundo");

        let folded = "=?UTF-8?Q?ab?=\r\n\t=?UTF-8?Q?cd?=";
        assert_eq!(decode_encoded_words(folded), "abcd");
    }

    #[test]
    fn test_mixed_plain_and_encoded_keeps_spaces() {
        let input = "Re: =?UTF-8?B?SG9sYQ==?= there";
        assert_eq!(decode_encoded_words(input), "Re: Hola there");
    }

    #[test]
    fn test_lowercase_encoding_letter() {
        assert_eq!(decode_encoded_words("=?utf-8?q?a_b?="), "a b");
        assert_eq!(decode_encoded_words("=?utf-8?b?SGk=?="), "Hi");
    }

    #[test]
    fn test_unknown_charset_kept_verbatim() {
        let input = "=?x-klingon?Q?qapla?=";
        assert_eq!(decode_encoded_words(input), input);
    }

    #[test]
    fn test_unknown_encoding_kept_verbatim() {
        let input = "=?utf-8?X?abc?= tail";
        assert_eq!(decode_encoded_words(input), input);
    }

    #[test]
    fn test_truncated_word_kept_verbatim() {
        let input = "Subject =?utf-8?B?SGVsbG8=";
        assert_eq!(decode_encoded_words(input), input);
    }

    #[test]
    fn test_bad_base64_kept_verbatim() {
        let input = "=?utf-8?B?SGV*sbG8=?=";
        assert_eq!(decode_encoded_words(input), input);
    }

    #[test]
    fn test_verbatim_word_does_not_swallow_next_gap() {
        let input = "=?x-klingon?Q?a?= =?utf-8?Q?b?=";
        assert_eq!(decode_encoded_words(input), "=?x-klingon?Q?a?= b");
    }

    #[test]
    fn test_gap_before_verbatim_word_is_kept() {
        let input = "=?utf-8?Q?a?= =?x-klingon?Q?b?=";
        assert_eq!(decode_encoded_words(input), "a =?x-klingon?Q?b?=");
        let input = "=?utf-8?Q?a?=  =?utf-8?Z?b?= =?utf-8?Q?c?=";
        assert_eq!(decode_encoded_words(input), "a  =?utf-8?Z?b?= c");
    }

    #[test]
    fn test_rfc2231_language_suffix() {
        assert_eq!(decode_encoded_words("=?US-ASCII*EN?Q?Keith_Moore?="), "Keith Moore");
    }

    #[test]
    fn test_decode_iso8859_encoded_word() {
        let input = "=?ISO-8859-1?Q?R=E9sum=E9_du_projet?=";
        assert_eq!(decode_encoded_words(input), "Résumé du projet");
    }

    #[test]
    fn test_decode_utf8_base64_japanese() {
        // 山田太郎
        assert_eq!(decode_encoded_words("=?UTF-8?B?5bGx55Sw5aSq6YOO?="), "山田太郎");
    }

    #[test]
    fn test_decode_windows1252_encoded_word() {
        assert_eq!(decode_encoded_words("=?Windows-1252?Q?M=FCller?="), "Müller");
    }
}
