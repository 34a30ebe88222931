//! HTTP status classification
//!
//! Maps a non-2xx status from the Monzo API onto the error taxonomy. The
//! table is exact-match; anything it does not name falls back to `General`.

use crate::error::Error;

/// Build the typed error for a failed response.
///
/// `body` is the raw response text and is carried in the message so callers
/// can log what Monzo said.
pub fn classify_status(status: u16, body: &str) -> Error {
    let message = if body.is_empty() {
        format!("Monzo returned {status}")
    } else {
        format!("Monzo returned {status}: {body}")
    };

    match status {
        400 | 404 => Error::Http(message),
        401 => Error::authentication(message),
        403 => Error::Permissions(message),
        405 | 406 => Error::General(message),
        429 => Error::Rate(message),
        500 | 504 => Error::Server(message),
        _ => Error::General(message),
    }
}
