//! Value encoding for stored entries.

use crate::error::{Result, StorageError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

type EncodeFn<T> = dyn Fn(&T) -> std::result::Result<String, String> + Send + Sync;
type DecodeFn<T> = dyn Fn(&str) -> std::result::Result<T, String> + Send + Sync;

/// Converts values to and from the strings a [`Storage`](crate::Storage)
/// backend holds.
///
/// [`Codec::json`] is the usual choice; [`Codec::custom`] accepts any pair of
/// functions, for example to keep a legacy format readable.
pub struct Codec<T> {
    encode: Arc<EncodeFn<T>>,
    decode: Arc<DecodeFn<T>>,
}

impl<T> Clone for Codec<T> {
    fn clone(&self) -> Self {
        Self {
            encode: Arc::clone(&self.encode),
            decode: Arc::clone(&self.decode),
        }
    }
}

impl<T> fmt::Debug for Codec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec").finish_non_exhaustive()
    }
}

impl<T> Codec<T>
where
    T: Serialize + DeserializeOwned,
{
    /// JSON via `serde_json`
    #[must_use]
    pub fn json() -> Self {
        Self::custom(
            |value| serde_json::to_string(value).map_err(|e| e.to_string()),
            |raw| serde_json::from_str(raw).map_err(|e| e.to_string()),
        )
    }
}

impl<T> Codec<T> {
    /// Build a codec from an encoder and a decoder
    pub fn custom<E, D>(encode: E, decode: D) -> Self
    where
        E: Fn(&T) -> std::result::Result<String, String> + Send + Sync + 'static,
        D: Fn(&str) -> std::result::Result<T, String> + Send + Sync + 'static,
    {
        Self {
            encode: Arc::new(encode),
            decode: Arc::new(decode),
        }
    }

    /// Encode `value` stored under `key`
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Codec`] when the encoder rejects the value.
    pub fn encode(&self, key: &str, value: &T) -> Result<String> {
        (self.encode)(value).map_err(|message| StorageError::codec(key, message))
    }

    /// Decode the raw value stored under `key`
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Codec`] when the stored text cannot be decoded.
    pub fn decode(&self, key: &str, raw: &str) -> Result<T> {
        (self.decode)(raw).map_err(|message| StorageError::codec(key, message))
    }
}

impl<T> Default for Codec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn default() -> Self {
        Self::json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        theme: String,
    }

    #[test]
    fn test_json_codec() {
        let codec = Codec::<Prefs>::json();
        let raw = codec
            .encode("prefs", &Prefs { theme: "dark".into() })
            .unwrap();
        assert_eq!(raw, r#"{"theme":"dark"}"#);
        assert_eq!(
            codec.decode("prefs", &raw).unwrap(),
            Prefs { theme: "dark".into() }
        );
    }

    #[test]
    fn test_decode_failure_names_key() {
        let codec = Codec::<Prefs>::json();
        let err = codec.decode("prefs", "not json").unwrap_err();
        assert!(matches!(err, StorageError::Codec { ref key, .. } if key == "prefs"));
    }

    #[test]
    fn test_custom_codec() {
        let codec = Codec::<u32>::custom(
            |n| Ok(format!("n={n}")),
            |raw| {
                raw.strip_prefix("n=")
                    .and_then(|n| n.parse().ok())
                    .ok_or_else(|| format!("unrecognised: {raw}"))
            },
        );
        assert_eq!(codec.encode("count", &7).unwrap(), "n=7");
        assert_eq!(codec.decode("count", "n=7").unwrap(), 7);
        assert!(codec.decode("count", "7").is_err());
    }
}
