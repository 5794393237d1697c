use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::copier::{DeepCopier, PointerTracker, Tracked};
use crate::error::{Error, Result};
use crate::runtime::{Kind, Map, MapKey, MapStorage, Value};

/// Copy a mapping; keys and values are copied independently
///
/// Entries are visited in hash order, so which failing entry is reported
/// first is unspecified when several fail. Backing storage is tracked like
/// a pointer target, so shared and self-containing maps keep their shape.
pub(super) fn copy_map(copier: &mut DeepCopier<'_>, value: &Value) -> Result<Value> {
    let map = match value {
        Value::Map(map) => map,
        other => {
            return Err(Error::KindMismatch {
                expected: Kind::Map,
                got: other.kind(),
            })
        }
    };

    let data = match map.storage() {
        Some(data) => data,
        None => {
            return Ok(Value::Map(Map::nil(
                map.key_type().clone(),
                map.value_type().clone(),
            )))
        }
    };

    let id = PointerTracker::identity(data);
    if let Some(Tracked::Entries(storage)) = copier.tracker.get(id) {
        tracing::trace!("map storage 0x{:x} already copied, reusing it", id);
        return Ok(Value::Map(Map::from_storage(
            map.key_type().clone(),
            map.value_type().clone(),
            storage,
        )));
    }

    let storage: MapStorage = Arc::new(RwLock::new(HashMap::new()));
    copier.tracker.register(id, Tracked::Entries(Arc::clone(&storage)));

    let entries = data.read_recursive();
    let mut copied = HashMap::with_capacity(entries.len());
    for (key, item) in entries.iter() {
        let item = copier.copy(item).map_err(|e| Error::MapValue {
            key: key.value().to_string(),
            source: Box::new(e),
        })?;
        let copied_key = copier.copy(key.value()).map_err(|e| Error::MapKey {
            key: key.value().to_string(),
            source: Box::new(e),
        })?;
        copied.insert(MapKey::from(copied_key), item);
    }
    *storage.write() = copied;

    Ok(Value::Map(Map::from_storage(
        map.key_type().clone(),
        map.value_type().clone(),
        storage,
    )))
}
