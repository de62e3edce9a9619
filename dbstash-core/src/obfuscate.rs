//! Reversible obfuscation for values at rest.
//!
//! This is base64, not encryption. It only keeps passwords from being
//! shoulder-surfed in a config file; anyone with the file can reverse it.
//! It must never be treated as a security boundary.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::DbStashError;
use crate::Result;

/// Encodes a cleartext value for storage.
pub fn encode(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// Decodes a stored value back to cleartext.
///
/// # Errors
/// Returns `Obfuscation` if the stored value is not valid base64-encoded
/// UTF-8, which indicates a hand-edited or corrupted record.
pub fn decode(value: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(value)
        .map_err(|e| DbStashError::obfuscation(format!("invalid base64: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| DbStashError::obfuscation(format!("decoded value is not UTF-8: {e}")))
}
