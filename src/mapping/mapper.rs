//! The decode ([`Mapper`]) and encode ([`Encoder`]) sides of a model mapping.

use super::collection::{reconcile_to_many, reconcile_to_many_set, update_object};
use super::field::{date_to_json, map_date, map_field, Field, Scalar};
use super::{Deserializable, Linkable, RelationPolicy, Serializable, Updatable};
use crate::MappingError;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::hash::Hash;

/// Read access to one JSON object while a model is decoded from it.
///
/// Every method takes the JSON key to read. Absent keys leave the target
/// untouched. Relations follow the mapper's [`RelationPolicy`], which is handed
/// down to nested mappers.
#[derive(Debug, Clone, Copy)]
pub struct Mapper<'a> {
    object: &'a Map<String, Value>,
    policy: RelationPolicy,
}

impl<'a> Mapper<'a> {
    /// Wraps `json`, which must be an object.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::WrongJsonShape`] for any other JSON value.
    pub fn new(json: &'a Value, policy: RelationPolicy) -> Result<Self, MappingError> {
        match json {
            Value::Object(object) => Ok(Self::from_object(object, policy)),
            other => Err(MappingError::WrongJsonShape(other.clone())),
        }
    }

    /// Wraps an object.
    pub fn from_object(object: &'a Map<String, Value>, policy: RelationPolicy) -> Self {
        Self { object, policy }
    }

    /// The policy applied to relations.
    pub fn policy(&self) -> RelationPolicy {
        self.policy
    }

    /// The wrapped object.
    pub fn json(&self) -> &'a Map<String, Value> {
        self.object
    }

    /// The raw value under `key`.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key)
    }

    /// Maps the value under `key` into a scalar field.
    pub fn field<F: Field>(&self, key: &str, target: &mut F) -> Result<(), MappingError> {
        map_field(key, target, self.get(key))
    }

    /// Maps the value under `key` into a date field using the chrono `format`.
    pub fn date(
        &self,
        key: &str,
        target: &mut Option<DateTime<Utc>>,
        format: &str,
    ) -> Result<(), MappingError> {
        map_date(key, target, self.get(key), format)
    }

    /// Reads a value that must be present and not `null`.
    pub fn required<T: Scalar>(&self, key: &str) -> Result<T, MappingError> {
        match self.get(key) {
            None | Some(Value::Null) => Err(MappingError::MissingRequiredField(key.to_string())),
            Some(value) => T::from_json(key, value),
        }
    }

    /// Reads a value that may be absent or `null`.
    pub fn optional<T: Scalar>(&self, key: &str) -> Result<Option<T>, MappingError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => T::from_json(key, value).map(Some),
        }
    }

    /// Builds a nested model from the object under `key`, which must be present.
    ///
    /// Used by constructors; errors always propagate.
    pub fn object<T: Deserializable>(&self, key: &str) -> Result<T, MappingError> {
        let value = self
            .get(key)
            .ok_or_else(|| MappingError::MissingRequiredField(key.to_string()))?;
        T::from_json(&Mapper::new(value, self.policy)?)
    }

    /// Updates a nested model in place from the object under `key`.
    pub fn relation<T: Updatable>(&self, key: &str, target: &mut T) -> Result<(), MappingError> {
        let Some(value) = self.get(key) else {
            return Ok(());
        };
        self.policy
            .settle(key, update_object(target, value, self.policy))
    }

    /// Updates or creates an optional nested model from the object under `key`.
    ///
    /// `null` clears the relation.
    pub fn optional_relation<T>(&self, key: &str, target: &mut Option<T>) -> Result<(), MappingError>
    where
        T: Deserializable + Updatable,
    {
        let result = match self.get(key) {
            None => return Ok(()),
            Some(Value::Null) => {
                *target = None;
                Ok(())
            }
            Some(value) => match target.as_mut() {
                Some(existing) => update_object(existing, value, self.policy),
                None => Mapper::new(value, self.policy)
                    .and_then(|map| T::from_json(&map))
                    .map(|created| *target = Some(created)),
            },
        };
        self.policy.settle(key, result)
    }

    /// Reconciles an ordered to-many relation with the array under `key`.
    ///
    /// See [`reconcile_to_many`].
    pub fn to_many<T>(&self, key: &str, target: &mut Vec<T>) -> Result<(), MappingError>
    where
        T: Deserializable + Updatable + Linkable,
    {
        let Some(value) = self.get(key) else {
            return Ok(());
        };
        self.policy
            .settle(key, reconcile_to_many(target, value, self.policy))
    }

    /// Reconciles an unordered to-many relation with the array under `key`.
    ///
    /// See [`reconcile_to_many_set`].
    pub fn to_many_set<T>(&self, key: &str, target: &mut HashSet<T>) -> Result<(), MappingError>
    where
        T: Deserializable + Updatable + Linkable + Hash + Eq,
    {
        let Some(value) = self.get(key) else {
            return Ok(());
        };
        self.policy
            .settle(key, reconcile_to_many_set(target, value, self.policy))
    }
}

/// Builds the JSON object for a model.
///
/// `None` fields are left out, so encoding followed by decoding into an existing
/// instance never clears anything.
///
/// # Examples
///
/// ```
/// use tether::mapping::Encoder;
/// use serde_json::json;
///
/// let json = Encoder::new()
///     .field("uuid", &"x".to_string())
///     .field("price", &Some(5.0))
///     .field("amount", &None::<i64>)
///     .finish();
///
/// assert_eq!(json, json!({ "uuid": "x", "price": 5.0 }));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    object: Map<String, Value>,
}

impl Encoder {
    /// Creates an encoder for an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a scalar field.
    pub fn field<F: Field>(mut self, key: &str, value: &F) -> Self {
        if let Some(json) = value.encode() {
            self.object.insert(key.to_string(), json);
        }
        self
    }

    /// Writes a date field as a string in the chrono `format`.
    pub fn date(mut self, key: &str, value: &Option<DateTime<Utc>>, format: &str) -> Self {
        if let Some(date) = value {
            self.object
                .insert(key.to_string(), date_to_json(date, format));
        }
        self
    }

    /// Writes a nested model.
    pub fn relation<T: Serializable>(mut self, key: &str, value: &T) -> Self {
        self.object.insert(key.to_string(), value.to_json());
        self
    }

    /// Writes a nested model if present.
    pub fn optional_relation<T: Serializable>(self, key: &str, value: &Option<T>) -> Self {
        match value {
            Some(value) => self.relation(key, value),
            None => self,
        }
    }

    /// Writes a to-many relation as an array.
    pub fn to_many<'t, T, I>(mut self, key: &str, values: I) -> Self
    where
        T: Serializable + 't,
        I: IntoIterator<Item = &'t T>,
    {
        let array = values.into_iter().map(Serializable::to_json).collect();
        self.object.insert(key.to_string(), Value::Array(array));
        self
    }

    /// The finished JSON object.
    pub fn finish(self) -> Value {
        Value::Object(self.object)
    }
}
