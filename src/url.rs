//! Eddystone-URL compression.
//!
//! An encoded URL is one scheme prefix byte followed by the URL body, where the longest
//! known expansion at the very end of the body is replaced by its single byte code.
use heapless::String;

use crate::frame::EncodingError;
use crate::params::URL_MAX_LEN;

/// Maximum length of an encoded URL, scheme prefix byte included.
pub const URL_DATA_MAX: usize = 18;

const SCHEMES: [&str; 4] = ["http://www.", "https://www.", "http://", "https://"];

const EXPANSIONS: [&str; 14] = [
    ".com/", ".org/", ".edu/", ".net/", ".info/", ".biz/", ".gov/", ".com", ".org", ".edu", ".net", ".info", ".biz",
    ".gov",
];

fn is_literal(b: u8) -> bool {
    (0x21..0x7f).contains(&b)
}

/// Compresses `url` into `dest`, returning the encoded length.
pub fn encode(url: &str, dest: &mut [u8]) -> Result<usize, EncodingError> {
    let (scheme, body) = SCHEMES
        .iter()
        .enumerate()
        .filter(|(_, s)| url.starts_with(*s))
        .max_by_key(|(_, s)| s.len())
        .map(|(code, s)| (code as u8, &url[s.len()..]))
        .ok_or(EncodingError::UnknownScheme)?;

    let suffix = EXPANSIONS
        .iter()
        .enumerate()
        .filter(|(_, e)| body.ends_with(*e))
        .max_by_key(|(_, e)| e.len())
        .map(|(code, e)| (code as u8, e.len()));

    let literal = match suffix {
        Some((_, len)) => &body.as_bytes()[..body.len() - len],
        None => body.as_bytes(),
    };
    if !literal.iter().copied().all(is_literal) {
        return Err(EncodingError::InvalidCharacter);
    }

    let len = 1 + literal.len() + suffix.map_or(0, |_| 1);
    if len > URL_DATA_MAX {
        return Err(EncodingError::UrlTooLong);
    }
    if len > dest.len() {
        return Err(EncodingError::InsufficientSpace);
    }

    dest[0] = scheme;
    dest[1..1 + literal.len()].copy_from_slice(literal);
    if let Some((code, _)) = suffix {
        dest[len - 1] = code;
    }
    Ok(len)
}

/// Expands an encoded URL back into its textual form.
pub fn decode(src: &[u8]) -> Result<String<URL_MAX_LEN>, EncodingError> {
    let (scheme, body) = src.split_first().ok_or(EncodingError::InvalidFrame)?;
    let scheme = SCHEMES
        .get(*scheme as usize)
        .ok_or(EncodingError::UnknownScheme)?;

    let mut out = String::new();
    out.push_str(scheme).map_err(|_| EncodingError::UrlTooLong)?;
    for b in body.iter().copied() {
        let pushed = if let Some(expansion) = EXPANSIONS.get(b as usize) {
            out.push_str(expansion)
        } else if is_literal(b) {
            out.push(b as char)
        } else {
            return Err(EncodingError::InvalidCharacter);
        };
        pushed.map_err(|_| EncodingError::UrlTooLong)?;
    }
    Ok(out)
}
