//! Object mapping and identity-preserving reconciliation of collections.

use super::mapper::Mapper;
use super::{Deserializable, Linkable, RelationPolicy, Updatable};
use crate::MappingError;
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Creates or updates a model from a JSON object.
///
/// With no `existing` instance a fresh one is built with
/// [`Deserializable::from_json`]. Otherwise the instance is updated in place and
/// returned; fields absent from the JSON keep their values.
///
/// # Errors
///
/// Returns [`MappingError::WrongJsonShape`] if `json` is not an object, or the
/// first error raised by the model.
pub fn map_object<T>(
    existing: Option<T>,
    json: &Value,
    policy: RelationPolicy,
) -> Result<T, MappingError>
where
    T: Deserializable + Updatable,
{
    let map = Mapper::new(json, policy)?;
    match existing {
        Some(mut instance) => {
            instance.update_from(&map)?;
            Ok(instance)
        }
        None => T::from_json(&map),
    }
}

/// Updates a model in place from a JSON object.
pub fn update_object<T: Updatable>(
    target: &mut T,
    json: &Value,
    policy: RelationPolicy,
) -> Result<(), MappingError> {
    target.update_from(&Mapper::new(json, policy)?)
}

fn identity_keys<T: Linkable>(json: &Value) -> Result<(&[Value], Vec<T::Key>), MappingError> {
    let elements = json
        .as_array()
        .ok_or_else(|| MappingError::WrongJsonShape(json.clone()))?;
    let keys = elements
        .iter()
        .map(T::identity_key_of)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((elements, keys))
}

/// Reconciles an ordered collection with a JSON array.
///
/// Elements are matched by [`Linkable`] identity. A matching element is updated
/// in place and moved, never rebuilt. Unknown identities are created, and
/// elements whose identity is missing from the JSON are dropped. The result
/// follows the order of the JSON array. Repeated identities in the JSON collapse
/// into one element, updated once per occurrence. Repeated identities in
/// `target` keep only their first element.
///
/// Every identity is read before the collection is touched, so a malformed
/// element leaves `target` as it was. If updating or creating an element fails,
/// `target` is restored to its previous elements in their previous order,
/// including elements that shared an identity key, and nothing created is kept.
/// Updates already applied in place are not rolled back.
///
/// # Examples
///
/// ```
/// # use tether::mapping::{Deserializable, Linkable, Mapper, Updatable};
/// # use tether::MappingError;
/// use tether::mapping::{reconcile_to_many, RelationPolicy};
/// use serde_json::json;
///
/// # #[derive(Debug)]
/// # struct Item { id: u32, v: u32 }
/// # impl Deserializable for Item {
/// #     fn from_json(map: &Mapper<'_>) -> Result<Self, MappingError> {
/// #         Ok(Item { id: map.required("id")?, v: map.required("v")? })
/// #     }
/// # }
/// # impl Updatable for Item {
/// #     fn update_from(&mut self, map: &Mapper<'_>) -> Result<(), MappingError> {
/// #         map.field("v", &mut self.v)
/// #     }
/// # }
/// # impl Linkable for Item {
/// #     type Key = u32;
/// #     const KEY: &'static str = "id";
/// #     fn identity_key(&self) -> u32 { self.id }
/// # }
/// let mut items = vec![Item { id: 1, v: 1 }, Item { id: 2, v: 1 }];
/// let json = json!([{ "id": 2, "v": 2 }, { "id": 3, "v": 1 }]);
///
/// reconcile_to_many(&mut items, &json, RelationPolicy::Strict).unwrap();
///
/// let ids: Vec<(u32, u32)> = items.iter().map(|i| (i.id, i.v)).collect();
/// assert_eq!(ids, vec![(2, 2), (3, 1)]);
/// ```
pub fn reconcile_to_many<T>(
    target: &mut Vec<T>,
    json: &Value,
    policy: RelationPolicy,
) -> Result<(), MappingError>
where
    T: Deserializable + Updatable + Linkable,
{
    let (elements, keys) = identity_keys::<T>(json)?;

    let mut existing: HashMap<T::Key, (usize, T)> = HashMap::with_capacity(target.len());
    let mut duplicates: Vec<(usize, T)> = Vec::new();
    for (index, item) in target.drain(..).enumerate() {
        match existing.entry(item.identity_key()) {
            Entry::Occupied(_) => duplicates.push((index, item)),
            Entry::Vacant(slot) => {
                slot.insert((index, item));
            }
        }
    }

    let mut reconciled = Vec::with_capacity(elements.len());
    let outcome = merge_ordered(elements, keys, &mut existing, &mut reconciled, policy);

    match outcome {
        Ok(()) => {
            let created = reconciled.iter().filter(|(index, _)| index.is_none()).count();
            tracing::debug!(
                kept = reconciled.len() - created,
                created = created,
                removed = existing.len() + duplicates.len(),
                "Reconciled to-many relation"
            );
            target.extend(reconciled.into_iter().map(|(_, item)| item));
            Ok(())
        }
        Err(e) => {
            let mut previous: Vec<(usize, T)> = reconciled
                .into_iter()
                .filter_map(|(index, item)| index.map(|index| (index, item)))
                .chain(existing.into_values())
                .chain(duplicates)
                .collect();
            previous.sort_by_key(|(index, _)| *index);
            target.extend(previous.into_iter().map(|(_, item)| item));
            Err(e)
        }
    }
}

/// Pushes each element with its index in the previous collection, or `None`
/// when it was created.
fn merge_ordered<T>(
    elements: &[Value],
    keys: Vec<T::Key>,
    existing: &mut HashMap<T::Key, (usize, T)>,
    reconciled: &mut Vec<(Option<usize>, T)>,
    policy: RelationPolicy,
) -> Result<(), MappingError>
where
    T: Deserializable + Updatable + Linkable,
{
    let mut positions: HashMap<T::Key, usize> = HashMap::with_capacity(elements.len());

    for (element, key) in elements.iter().zip(keys) {
        let map = Mapper::new(element, policy)?;

        if let Some(&position) = positions.get(&key) {
            reconciled[position].1.update_from(&map)?;
            continue;
        }

        let entry = match existing.remove(&key) {
            Some((index, mut item)) => {
                if let Err(e) = item.update_from(&map) {
                    existing.insert(key, (index, item));
                    return Err(e);
                }
                (Some(index), item)
            }
            None => (None, T::from_json(&map)?),
        };

        positions.insert(key, reconciled.len());
        reconciled.push(entry);
    }

    Ok(())
}

/// Reconciles an unordered, identity-deduplicated collection with a JSON array.
///
/// Same rules as [`reconcile_to_many`]; `T` must hash and compare by its
/// identity key so that an in-place update keeps its slot valid.
pub fn reconcile_to_many_set<T>(
    target: &mut HashSet<T>,
    json: &Value,
    policy: RelationPolicy,
) -> Result<(), MappingError>
where
    T: Deserializable + Updatable + Linkable + Hash + Eq,
{
    let (elements, keys) = identity_keys::<T>(json)?;

    let mut existing: HashMap<T::Key, T> = target
        .drain()
        .map(|item| (item.identity_key(), item))
        .collect();
    let mut reconciled: HashMap<T::Key, (bool, T)> = HashMap::with_capacity(elements.len());

    let outcome = merge_unordered(elements, keys, &mut existing, &mut reconciled, policy);

    match outcome {
        Ok(()) => {
            target.extend(reconciled.into_values().map(|(_, item)| item));
            tracing::debug!(
                size = target.len(),
                removed = existing.len(),
                "Reconciled to-many set relation"
            );
            Ok(())
        }
        Err(e) => {
            target.extend(
                reconciled
                    .into_values()
                    .filter(|(created, _)| !created)
                    .map(|(_, item)| item),
            );
            target.extend(existing.into_values());
            Err(e)
        }
    }
}

/// Inserts each element flagged with whether it was created.
fn merge_unordered<T>(
    elements: &[Value],
    keys: Vec<T::Key>,
    existing: &mut HashMap<T::Key, T>,
    reconciled: &mut HashMap<T::Key, (bool, T)>,
    policy: RelationPolicy,
) -> Result<(), MappingError>
where
    T: Deserializable + Updatable + Linkable,
{
    for (element, key) in elements.iter().zip(keys) {
        let map = Mapper::new(element, policy)?;

        if let Some((_, item)) = reconciled.get_mut(&key) {
            item.update_from(&map)?;
            continue;
        }

        let entry = match existing.remove(&key) {
            Some(mut item) => {
                if let Err(e) = item.update_from(&map) {
                    existing.insert(key, item);
                    return Err(e);
                }
                (false, item)
            }
            None => (true, T::from_json(&map)?),
        };
        reconciled.insert(key, entry);
    }

    Ok(())
}
