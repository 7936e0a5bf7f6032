use serde::{Deserialize, Serialize};

use crate::Stacktrace;

/// A single exception.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exception {
    /// Exception type, for example `TypeError`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,

    /// Human readable description of the exception.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Stack trace leading to the exception.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<Stacktrace>,
}

impl Exception {
    /// Returns `"Type: value"`, or only the value if the type is unknown.
    pub fn prefixed_value(&self) -> String {
        let value = self.value.as_deref().unwrap_or_default();
        match self.ty.as_deref() {
            Some(ty) if !ty.is_empty() => format!("{ty}: {value}"),
            _ => value.to_owned(),
        }
    }
}
