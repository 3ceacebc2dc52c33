use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::table::normalize_id;
use crate::types::{Result, SegmentId};

/// An `id -> [connected ids]` dictionary that remembers insertion order.
///
/// Encoded as a JSON object with decimal-string keys and integer arrays.
/// Decoding tolerates integral floats (`12.0`) in keys and values, since some
/// producers write ids that way.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdjointMap {
    keys: Vec<SegmentId>,
    entries: FxHashMap<SegmentId, Vec<SegmentId>>,
}

impl AdjointMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut entries = FxHashMap::default();
        entries.reserve(capacity);
        Self {
            keys: Vec::with_capacity(capacity),
            entries,
        }
    }

    /// Inserts an entry, returning the previous chain for `id` if any.
    ///
    /// Replacing an entry keeps its original position.
    pub fn insert(&mut self, id: SegmentId, chain: Vec<SegmentId>) -> Option<Vec<SegmentId>> {
        let previous = self.entries.insert(id, chain);
        if previous.is_none() {
            self.keys.push(id);
        }
        previous
    }

    /// Chain stored for `id`.
    pub fn get(&self, id: SegmentId) -> Option<&[SegmentId]> {
        self.entries.get(&id).map(Vec::as_slice)
    }

    /// True when `id` has an entry.
    pub fn contains_key(&self, id: SegmentId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> &[SegmentId] {
        &self.keys
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (SegmentId, &[SegmentId])> + '_ {
        self.keys
            .iter()
            .map(move |id| (*id, self.entries[id].as_slice()))
    }

    /// Reads a map from a JSON file.
    pub fn read_json(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Reads a map from JSON.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}

impl FromIterator<(SegmentId, Vec<SegmentId>)> for AdjointMap {
    fn from_iter<I: IntoIterator<Item = (SegmentId, Vec<SegmentId>)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut map = AdjointMap::with_capacity(iter.size_hint().0);
        for (id, chain) in iter {
            map.insert(id, chain);
        }
        map
    }
}

impl Serialize for AdjointMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.keys.len()))?;
        for (id, chain) in self.iter() {
            map.serialize_entry(&id.to_string(), chain)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AdjointMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(AdjointMapVisitor)
    }
}

struct AdjointMapVisitor;

impl<'de> Visitor<'de> for AdjointMapVisitor {
    type Value = AdjointMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping segment ids to arrays of segment ids")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<AdjointMap, A::Error> {
        let mut map = AdjointMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, chain)) = access.next_entry::<String, Vec<JsonId>>()? {
            let id = normalize_id(&key)
                .ok_or_else(|| de::Error::custom(format!("invalid segment id key '{key}'")))?;
            map.insert(id, chain.into_iter().map(|JsonId(id)| id).collect());
        }
        Ok(map)
    }
}

/// A segment id in JSON, accepted as an integer or an integral float.
struct JsonId(SegmentId);

impl<'de> Deserialize<'de> for JsonId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(JsonIdVisitor)
    }
}

struct JsonIdVisitor;

impl<'de> Visitor<'de> for JsonIdVisitor {
    type Value = JsonId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer segment id")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<JsonId, E> {
        Ok(JsonId(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<JsonId, E> {
        SegmentId::try_from(value)
            .map(JsonId)
            .map_err(|_| E::custom(format!("segment id {value} out of range")))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<JsonId, E> {
        normalize_id(&value.to_string())
            .map(JsonId)
            .ok_or_else(|| E::custom(format!("segment id {value} is not an integer")))
    }
}
