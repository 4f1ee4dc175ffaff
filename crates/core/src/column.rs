//! Decoding helpers for JSON columns.
//!
//! Rows and the JSON columns inside them can be written by any client of the
//! hosted database, so most fields may arrive as `null` as well as missing.

use serde::{Deserialize, Deserializer};

/// Deserialize `null` as `T::default()`.
///
/// Pair with `#[serde(default)]` so a missing key decodes the same way.
///
/// # Errors
///
/// Returns the deserializer's error when the value is neither `null` nor a
/// valid `T`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "nullable")]
        name: String,
        #[serde(default, deserialize_with = "nullable")]
        count: u32,
    }

    #[test]
    fn test_null_and_missing_decode_as_default() {
        let row: Row = serde_json::from_str(r#"{"name":null}"#).unwrap();
        assert!(row.name.is_empty());
        assert_eq!(row.count, 0);

        let row: Row = serde_json::from_str(r#"{"name":"Lamp","count":3}"#).unwrap();
        assert_eq!(row.name, "Lamp");
        assert_eq!(row.count, 3);
    }

    #[test]
    fn test_wrong_type_is_still_an_error() {
        assert!(serde_json::from_str::<Row>(r#"{"count":"many"}"#).is_err());
    }
}
