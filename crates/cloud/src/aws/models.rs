//! Wire shapes shared by every AWS protocol.

use serde::{Deserialize, Deserializer};

/// An EC2 `<xxxSet>` list: a wrapper element holding repeated `<item>` children.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemSet<T> {
    #[serde(rename = "item", default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> Default for ItemSet<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> ItemSet<T> {
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

/// Deserialize an optional text element, treating an empty element as absent.
///
/// # Errors
/// Propagates the underlying deserializer error.
pub fn non_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// EC2 error body: `<Response><Errors><Error>...`.
#[derive(Debug, Deserialize)]
pub struct XmlErrorBody {
    #[serde(rename = "Errors")]
    pub errors: Option<XmlErrors>,
    /// STS / RDS put the error directly under `<ErrorResponse>`.
    #[serde(rename = "Error")]
    pub error: Option<XmlError>,
}

#[derive(Debug, Deserialize)]
pub struct XmlErrors {
    #[serde(rename = "Error", default)]
    pub error: Vec<XmlError>,
}

#[derive(Debug, Deserialize)]
pub struct XmlError {
    #[serde(rename = "Code", default)]
    pub code: String,
    #[serde(rename = "Message", default)]
    pub message: String,
}

impl XmlErrorBody {
    /// The first error in the body, whichever layout it uses.
    #[must_use]
    pub fn into_error(self) -> Option<XmlError> {
        self.error
            .or_else(|| self.errors.and_then(|e| e.error.into_iter().next()))
    }
}

/// JSON protocol error body.
#[derive(Debug, Deserialize)]
pub struct JsonErrorBody {
    #[serde(rename = "__type", alias = "code", alias = "Code", default)]
    pub kind: String,
    #[serde(alias = "Message", default)]
    pub message: String,
}

/// Strip the namespace (`aws.foo#`) and trailing detail (`:http://...`) of an error type.
#[must_use]
pub fn error_code(raw: &str) -> String {
    let code = raw.rsplit('#').next().unwrap_or(raw);
    code.split(':').next().unwrap_or(code).to_string()
}
