//! Call descriptors and root-node extraction.

use crate::{config::Configuration, session::Request, Error, Result};
use http::Method;
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

/// A declarative description of one HTTP operation.
///
/// A call holds a path relative to the configured base URL, the HTTP method,
/// an optional root-node key that selects the part of the response holding the
/// model data, and an optional JSON body.
///
/// # Examples
///
/// ```
/// use tether::{Call, Configuration};
/// use http::Method;
/// use serde_json::json;
///
/// let call = Call::new("products")
///     .method(Method::POST)
///     .root_node("product")
///     .body(json!({ "name": "Melon", "points": 100 }));
///
/// let request = call.request(&Configuration::new("http://api.test")).unwrap();
/// assert_eq!(request.url.as_str(), "http://api.test/products");
/// ```
#[derive(Debug, Clone)]
pub struct Call {
    /// The request path (relative to the base URL).
    pub path: String,

    /// The HTTP method (GET by default).
    pub method: Method,

    /// Key of the response object holding the model data.
    pub root_node: Option<String>,

    /// JSON body sent with the request.
    pub body: Option<Value>,

    /// Non-2xx statuses that still count as success.
    pub accepted_statuses: Vec<u16>,
}

impl Call {
    /// Creates a GET call for the given path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::GET,
            root_node: None,
            body: None,
            accepted_statuses: Vec::new(),
        }
    }

    /// Sets the HTTP method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the key of the response object that holds the model data.
    pub fn root_node(mut self, key: impl Into<String>) -> Self {
        self.root_node = Some(key.into());
        self
    }

    /// Sets a JSON body.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serializes `body` to JSON and sets it as the request body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if the value cannot be serialized.
    pub fn json_body<T: Serialize>(self, body: &T) -> Result<Self> {
        let json =
            serde_json::to_value(body).map_err(|e| Error::SerializationFailed(e.to_string()))?;
        Ok(self.body(json))
    }

    /// Treats the given status as success even though it is outside 200-299.
    pub fn accept_status(mut self, status: u16) -> Self {
        self.accepted_statuses.push(status);
        self
    }

    /// Returns `true` if a response with this status counts as success.
    pub fn accepts(&self, status: http::StatusCode) -> bool {
        status.is_success() || self.accepted_statuses.contains(&status.as_u16())
    }

    /// Builds the concrete request for this call.
    ///
    /// The path is joined to the base URL with exactly one separating slash.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the joined string is not a valid URL.
    pub fn request(&self, configuration: &Configuration) -> Result<Request> {
        let joined = format!(
            "{}/{}",
            configuration.base_url().trim_end_matches('/'),
            self.path.trim_start_matches('/')
        );
        let url = Url::parse(&joined).map_err(|e| Error::InvalidUrl(format!("{joined}: {e}")))?;

        Ok(Request {
            method: self.method.clone(),
            url,
            path: self.path.clone(),
            body: self.body.clone(),
            timeout: configuration.request_timeout(),
        })
    }

    /// Selects the node of `json` that holds the model data.
    ///
    /// With a root-node key and an object response, the value under that key is
    /// used (`Null` when the key is missing). Otherwise `json` itself is used.
    pub fn extract_node(&self, json: Value) -> JsonNode {
        let node = match (&self.root_node, json) {
            (Some(key), Value::Object(mut object)) => object.remove(key).unwrap_or(Value::Null),
            (_, json) => json,
        };

        match node {
            Value::Object(object) => JsonNode::Object(object),
            Value::Array(array) => JsonNode::Array(array),
            other => JsonNode::NotFound(other),
        }
    }
}

/// The node selected from a response by [`Call::extract_node`].
#[derive(Debug, Clone, PartialEq)]
pub enum JsonNode {
    /// A JSON object, convertible to a single model.
    Object(Map<String, Value>),
    /// A JSON array, convertible to a collection of models.
    Array(Vec<Value>),
    /// Anything else, kept for error reporting.
    NotFound(Value),
}

impl JsonNode {
    /// Converts the node back into a plain JSON value.
    pub fn into_value(self) -> Value {
        match self {
            JsonNode::Object(object) => Value::Object(object),
            JsonNode::Array(array) => Value::Array(array),
            JsonNode::NotFound(value) => value,
        }
    }
}
