use serde::de::DeserializeOwned;

use crate::error::SchemaError;

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, SchemaError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(into_decode_error)
}

/// Same as [`from_str_with_path`] but for an already parsed document.
pub fn from_value_with_path<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, SchemaError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(into_decode_error)
}

fn into_decode_error<E: std::fmt::Display>(err: serde_path_to_error::Error<E>) -> SchemaError {
    let path = err.path().to_string();
    SchemaError::Decode { path, message: err.into_inner().to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuilderConfig;

    #[test]
    fn decode_error_names_the_offending_path() {
        let src = r#"{ "formats": { "date": 5 } }"#;
        let err = from_str_with_path::<BuilderConfig>(src).unwrap_err();
        match err {
            SchemaError::Decode { path, .. } => assert_eq!(path, "formats.date"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn decode_error_from_parsed_value() {
        let value = serde_json::json!({ "zero-bounds": "sometimes" });
        let err = from_value_with_path::<BuilderConfig>(value).unwrap_err();
        assert!(matches!(err, SchemaError::Decode { ref path, .. } if path == "zero-bounds"));
    }
}
