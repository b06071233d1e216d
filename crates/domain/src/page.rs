//! Opaque continuation tokens for paginated reads.
//!
//! Tokens are URL-safe base64 over a small JSON document. Callers must treat
//! them as opaque and pass them back unchanged.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Continuation for `List`: offset into the key-ordered live rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListToken {
    #[serde(rename = "o")]
    pub start_offset: i64,
}

/// Continuation for `History`: resume strictly below this version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryToken {
    #[serde(rename = "v")]
    pub before_version: i64,
}

/// Encode a token into its opaque string form.
#[must_use]
pub fn encode<T: Serialize>(token: &T) -> String {
    // Serializing these plain structs cannot fail.
    let json = serde_json::to_vec(token).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode an opaque token produced by [`encode`].
///
/// # Errors
///
/// Returns [`ValidationError::InvalidPageToken`] when the token is not valid
/// base64 or does not describe a `T`.
pub fn decode<T: DeserializeOwned>(token: &str) -> Result<T, ValidationError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| ValidationError::InvalidPageToken)?;
    serde_json::from_slice(&bytes).map_err(|_| ValidationError::InvalidPageToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_decode_what_was_encoded() {
        let token = ListToken { start_offset: 40 };
        let decoded: ListToken = decode(&encode(&token)).unwrap();
        assert_eq!(decoded, token);
    }

    #[test]
    fn should_reject_garbage_token() {
        let result = decode::<HistoryToken>("%%%not-base64");
        assert_eq!(result, Err(ValidationError::InvalidPageToken));
    }

    #[test]
    fn should_reject_token_of_another_shape() {
        let list = encode(&ListToken { start_offset: 3 });
        let result = decode::<HistoryToken>(&list);
        assert_eq!(result, Err(ValidationError::InvalidPageToken));
    }
}
