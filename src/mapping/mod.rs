//! Bidirectional mapping between JSON and typed models.
//!
//! A model opts in by implementing some of the capability traits:
//!
//! * [`Deserializable`] builds a fresh instance from a JSON object,
//! * [`Updatable`] updates an existing instance in place,
//! * [`Linkable`] exposes the identity key used to match instances to JSON
//!   elements when collections are reconciled,
//! * [`Serializable`] writes the instance back to JSON.
//!
//! Decoding goes through a [`Mapper`], encoding through an [`Encoder`].
//!
//! ```
//! use tether::mapping::{
//!     Deserializable, Encoder, Linkable, Mapper, RelationPolicy, Serializable, Updatable,
//! };
//! use tether::MappingError;
//! use serde_json::{json, Value};
//!
//! #[derive(Debug, PartialEq)]
//! struct Product {
//!     uuid: String,
//!     price: Option<f64>,
//! }
//!
//! impl Deserializable for Product {
//!     fn from_json(map: &Mapper<'_>) -> Result<Self, MappingError> {
//!         let mut product = Product { uuid: map.required("uuid")?, price: None };
//!         product.update_from(map)?;
//!         Ok(product)
//!     }
//! }
//!
//! impl Updatable for Product {
//!     fn update_from(&mut self, map: &Mapper<'_>) -> Result<(), MappingError> {
//!         map.field("price", &mut self.price)
//!     }
//! }
//!
//! impl Linkable for Product {
//!     type Key = String;
//!     const KEY: &'static str = "uuid";
//!
//!     fn identity_key(&self) -> String {
//!         self.uuid.clone()
//!     }
//! }
//!
//! impl Serializable for Product {
//!     fn to_json(&self) -> Value {
//!         Encoder::new()
//!             .field("uuid", &self.uuid)
//!             .field("price", &self.price)
//!             .finish()
//!     }
//! }
//!
//! let json = json!({ "uuid": "x", "price": 5.0 });
//! let product: Product = tether::mapping::map_object(None, &json, RelationPolicy::Strict).unwrap();
//! assert_eq!(product.to_json(), json);
//! ```

mod collection;
mod field;
mod mapper;

pub use collection::{map_object, reconcile_to_many, reconcile_to_many_set, update_object};
pub use field::{date_to_json, map_date, map_field, parse_date, Field, Scalar};
pub use mapper::{Encoder, Mapper};

use crate::MappingError;
use serde_json::Value;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

/// Builds a fresh instance from a JSON object.
pub trait Deserializable: Sized {
    /// Creates the instance from the object wrapped by `map`.
    fn from_json(map: &Mapper<'_>) -> Result<Self, MappingError>;
}

/// Updates an existing instance in place from a JSON object.
///
/// Fields absent from the JSON must be left untouched.
pub trait Updatable {
    /// Applies the object wrapped by `map` to `self`.
    fn update_from(&mut self, map: &Mapper<'_>) -> Result<(), MappingError>;
}

/// Exposes the identity key that matches an instance to its JSON element.
pub trait Linkable {
    /// The identity key type.
    type Key: Scalar + Eq + Hash + Clone + Debug;

    /// JSON key holding the identity.
    const KEY: &'static str;

    /// The identity of this instance.
    fn identity_key(&self) -> Self::Key;

    /// Reads the identity from a JSON element.
    ///
    /// The default reads [`KEY`](Self::KEY) from the object.
    fn identity_key_of(json: &Value) -> Result<Self::Key, MappingError> {
        let object = json
            .as_object()
            .ok_or_else(|| MappingError::WrongJsonShape(json.clone()))?;
        let value = object
            .get(Self::KEY)
            .ok_or_else(|| MappingError::MissingRequiredField(Self::KEY.to_string()))?;
        Self::Key::from_json(Self::KEY, value)
    }
}

/// Writes an instance to JSON.
pub trait Serializable {
    /// The JSON representation of `self`.
    fn to_json(&self) -> Value;
}

/// What to do when a relation fails to map while its parent is being mapped.
///
/// Scalar fields always propagate their errors. Relations (nested objects and
/// to-many collections) follow the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelationPolicy {
    /// Propagate the error; the parent mapping fails.
    Strict,
    /// Log the error and keep mapping the remaining fields.
    #[default]
    BestEffort,
}

impl RelationPolicy {
    pub(crate) fn settle(
        self,
        field: &str,
        result: Result<(), MappingError>,
    ) -> Result<(), MappingError> {
        match (self, result) {
            (_, Ok(())) => Ok(()),
            (RelationPolicy::Strict, Err(e)) => Err(e),
            (RelationPolicy::BestEffort, Err(e)) => {
                tracing::warn!(field = field, error = %e, "Skipping relation that failed to map");
                Ok(())
            }
        }
    }
}

/// A model shared between a collection and outside holders.
///
/// Reconciling a `Vec<Shared<T>>` updates the pointee in place, so every clone
/// of the `Arc` observes the change.
pub type Shared<T> = Arc<Mutex<T>>;

impl<T: Deserializable> Deserializable for Arc<Mutex<T>> {
    fn from_json(map: &Mapper<'_>) -> Result<Self, MappingError> {
        Ok(Arc::new(Mutex::new(T::from_json(map)?)))
    }
}

impl<T: Updatable> Updatable for Arc<Mutex<T>> {
    fn update_from(&mut self, map: &Mapper<'_>) -> Result<(), MappingError> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update_from(map)
    }
}

impl<T: Linkable> Linkable for Arc<Mutex<T>> {
    type Key = T::Key;
    const KEY: &'static str = T::KEY;

    fn identity_key(&self) -> Self::Key {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .identity_key()
    }

    fn identity_key_of(json: &Value) -> Result<Self::Key, MappingError> {
        T::identity_key_of(json)
    }
}

impl<T: Serializable> Serializable for Arc<Mutex<T>> {
    fn to_json(&self) -> Value {
        self.lock().unwrap_or_else(PoisonError::into_inner).to_json()
    }
}
