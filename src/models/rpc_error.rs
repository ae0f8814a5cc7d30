use std::fmt;

use crate::reply::RawRpcError;

/// An `rpc-error` returned by the device in response to an `edit-config`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    error_type: String,
    error_tag: String,
    severity: String,
    message: String,
    message_lang: Option<String>,
    path: String,
}

impl RpcError {
    /// Converts a decoded `rpc-error` element. Returns None if the element
    /// carries no message, in which case the device is not considered to
    /// have rejected anything.
    pub(crate) fn from_raw(raw: RawRpcError) -> Option<Self> {
        let (message, message_lang) = match raw.error_message {
            Some(m) if !m.text.trim().is_empty() => (m.text.trim().to_owned(), m.lang),
            _ => return None,
        };
        Some(Self {
            error_type: raw.error_type.trim().to_owned(),
            error_tag: raw.error_tag.trim().to_owned(),
            severity: raw.error_severity.trim().to_owned(),
            message,
            message_lang,
            path: raw.error_path.trim().to_owned(),
        })
    }

    /// Layer the error occurred in, e.g. `application` or `protocol`
    pub fn error_type(&self) -> &str {
        &self.error_type
    }

    /// e.g. `invalid-value`, `operation-failed`
    pub fn error_tag(&self) -> &str {
        &self.error_tag
    }

    pub fn severity(&self) -> &str {
        &self.severity
    }

    /// Human readable message, exactly as the device sent it (minus
    /// surrounding whitespace)
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Value of the `xml:lang` attribute on the message, if present
    pub fn message_lang(&self) -> Option<&str> {
        self.message_lang.as_deref()
    }

    /// Path of the offending element; empty if the device didn't say
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}): {}",
            self.severity, self.error_type, self.error_tag, self.message
        )
    }
}
