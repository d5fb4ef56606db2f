//! Error types for calls, transport and model mapping.
//!
//! [`Error`] is what callers of the service and queue see. Mapping failures are
//! described by [`MappingError`] and wrapped into [`Error::Mapping`] when they
//! surface from a call.

use http::StatusCode;
use serde_json::Value;

/// The main error type for calls made through a [`Service`](crate::Service) or
/// [`ServiceQueue`](crate::ServiceQueue).
///
/// # Examples
///
/// ```no_run
/// use tether::{Call, Configuration, Error, Service};
///
/// # async fn example() -> Result<(), Error> {
/// let service = Service::new(Configuration::new("https://api.example.com"))?;
///
/// match service.fetch_json(Call::new("products")).await {
///     Ok(json) => println!("Success: {json}"),
///     Err(Error::HttpStatus { status, raw_response }) => {
///         eprintln!("HTTP error {status}: {raw_response}");
///     }
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The base URL and call path did not form a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A network-level error occurred (connection failed, DNS lookup failed, etc.).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The request took longer than the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The server answered with a status the call does not accept.
    #[error("HTTP error {status}: {raw_response}")]
    HttpStatus {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body, lossily decoded as UTF-8
        raw_response: String,
    },

    /// The response body was not valid JSON.
    #[error("Invalid response data: {serde_error}")]
    InvalidResponseData {
        /// The raw response body, lossily decoded as UTF-8
        raw_response: String,
        /// The error message from serde
        serde_error: String,
    },

    /// The root node of the response cannot be turned into the requested model(s).
    ///
    /// Returned when a single model was requested but the node is not an object,
    /// or when a collection was requested but the node is not an array of objects.
    #[error("No model for node at '{path}': {node}")]
    NoModelForNode {
        /// The path of the call that produced the node
        path: String,
        /// The node that could not be converted
        node: Value,
    },

    /// Converting JSON into a model failed.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// The task was cancelled before it delivered a result.
    #[error("Task was cancelled")]
    Cancelled,

    /// Failed to serialize a request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// Invalid configuration was provided.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::HttpStatus { raw_response, .. } => Some(raw_response),
            Error::InvalidResponseData { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Returns the mapping error if this error came from model conversion.
    pub fn mapping(&self) -> Option<&MappingError> {
        match self {
            Error::Mapping(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors raised while converting JSON into models.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    /// The JSON did not have the shape the conversion needs (object or array).
    #[error("Wrong JSON shape: {0}")]
    WrongJsonShape(Value),

    /// A field was present but its JSON type is not compatible with the target.
    #[error("Type mismatch for '{field}': expected {expected}, got {} {got}", json_type_name(.got))]
    TypeMismatch {
        /// The JSON key of the field
        field: String,
        /// The expected JSON type
        expected: &'static str,
        /// The JSON value that was found
        got: Value,
    },

    /// A date could not be read as epoch seconds or with the given format.
    #[error("Cannot read date {value} with format '{format}'")]
    DateFormatError {
        /// The JSON value that was found
        value: Value,
        /// The chrono format that was tried
        format: String,
    },

    /// A required field was absent.
    #[error("Missing required field '{0}'")]
    MissingRequiredField(String),
}

/// A specialized `Result` type for calls.
///
/// This is a convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the JSON type name of a value, used in mismatch reports.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
