use serde::Serialize;
use super::FormatError;

pub fn to_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String, FormatError> {
    serde_yaml::to_string(value).map_err(FormatError::from)
}
