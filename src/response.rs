//! Raw responses as returned by a [`Session`](crate::session::Session).
//!
//! A [`RawResponse`] keeps the status, the undecoded body and the request
//! latency. Status checking and JSON decoding happen here so every session
//! implementation gets the same treatment.

use crate::mapping::{
    reconcile_to_many, Deserializable, Linkable, Mapper, RelationPolicy, Updatable,
};
use crate::{Call, Error, JsonNode, MappingError, Result};
use http::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// The undecoded result of executing a request.
///
/// # Examples
///
/// ```
/// use tether::{Call, RawResponse};
/// use http::StatusCode;
/// use std::time::Duration;
///
/// let response = RawResponse::new(
///     StatusCode::OK,
///     br#"{"uuid":"x"}"#.to_vec(),
///     Duration::from_millis(12),
/// );
///
/// let json = response.json(&Call::new("products")).unwrap();
/// assert_eq!(json["uuid"], "x");
/// ```
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The raw response body.
    pub body: Vec<u8>,

    /// Time from sending the request until the body was read.
    pub latency: Duration,
}

impl RawResponse {
    /// Creates a new `RawResponse`.
    pub fn new(status: StatusCode, body: Vec<u8>, latency: Duration) -> Self {
        Self {
            status,
            body,
            latency,
        }
    }

    /// The body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Fails with [`Error::HttpStatus`] unless `call` accepts the status.
    pub fn check_status(&self, call: &Call) -> Result<()> {
        tracing::info!(
            status = self.status.as_u16(),
            latency_ms = self.latency.as_millis(),
            path = %call.path,
            "Received HTTP response"
        );

        if call.accepts(self.status) {
            return Ok(());
        }

        let raw_response = self.text();
        if self.status.is_client_error() {
            tracing::error!(
                status = self.status.as_u16(),
                response = %raw_response,
                "Client error (4xx)"
            );
        } else if self.status.is_server_error() {
            tracing::warn!(
                status = self.status.as_u16(),
                response = %raw_response,
                "Server error (5xx)"
            );
        }

        Err(Error::HttpStatus {
            status: self.status,
            raw_response,
        })
    }

    /// Checks the status and decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HttpStatus`] for an unaccepted status and
    /// [`Error::InvalidResponseData`] if the body is not JSON.
    pub fn json(&self, call: &Call) -> Result<Value> {
        self.check_status(call)?;

        serde_json::from_slice(&self.body).map_err(|e| {
            let raw_response = self.text();
            tracing::error!(
                error = %e,
                raw_response = %raw_response,
                "Failed to decode response"
            );
            Error::InvalidResponseData {
                raw_response,
                serde_error: e.to_string(),
            }
        })
    }

    /// Checks the status only; any body, including an empty one, is accepted.
    pub fn no_data(&self, call: &Call) -> Result<()> {
        self.check_status(call)
    }

    /// Decodes the root node of the response into a single model.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoModelForNode`] unless the root node is an object.
    pub fn model<T: Deserializable>(&self, call: &Call, policy: RelationPolicy) -> Result<T> {
        match call.extract_node(self.json(call)?) {
            JsonNode::Object(object) => {
                Ok(T::from_json(&Mapper::from_object(&object, policy)).inspect_err(log_mapping)?)
            }
            node => Err(no_model(call, node)),
        }
    }

    /// Decodes the root node of the response into a collection of models.
    ///
    /// Elements are converted in order and the first failure aborts the whole
    /// collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoModelForNode`] unless the root node is an array of
    /// objects.
    pub fn models<T: Deserializable>(&self, call: &Call, policy: RelationPolicy) -> Result<Vec<T>> {
        let elements = self.object_array(call)?;
        let models = elements
            .iter()
            .map(|element| Mapper::new(element, policy).and_then(|map| T::from_json(&map)))
            .collect::<std::result::Result<Vec<T>, _>>()
            .inspect_err(log_mapping)?;
        Ok(models)
    }

    /// Applies the root node of the response to an existing model.
    pub fn update<T: Updatable>(
        &self,
        call: &Call,
        target: &mut T,
        policy: RelationPolicy,
    ) -> Result<()> {
        match call.extract_node(self.json(call)?) {
            JsonNode::Object(object) => Ok(target
                .update_from(&Mapper::from_object(&object, policy))
                .inspect_err(log_mapping)?),
            node => Err(no_model(call, node)),
        }
    }

    /// Reconciles an existing collection with the root node of the response.
    pub fn reconcile<T>(&self, call: &Call, target: &mut Vec<T>, policy: RelationPolicy) -> Result<()>
    where
        T: Deserializable + Updatable + Linkable,
    {
        let elements = Value::Array(self.object_array(call)?);
        Ok(reconcile_to_many(target, &elements, policy).inspect_err(log_mapping)?)
    }

    fn object_array(&self, call: &Call) -> Result<Vec<Value>> {
        match call.extract_node(self.json(call)?) {
            JsonNode::Array(elements) if elements.iter().all(Value::is_object) => Ok(elements),
            node => Err(no_model(call, node)),
        }
    }
}

fn no_model(call: &Call, node: JsonNode) -> Error {
    let node = node.into_value();
    tracing::error!(path = %call.path, node = %node, "No model for node");
    Error::NoModelForNode {
        path: call.path.clone(),
        node,
    }
}

fn log_mapping(error: &MappingError) {
    tracing::error!(error = %error, "Failed to map response");
}
