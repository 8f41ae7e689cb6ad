use std::collections::HashMap;
use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Tile – where one frame's pixels live in the source file
// ---------------------------------------------------------------------------

/// Location of one frame inside the SIF pixel block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tile {
    pub frame: usize,
    /// Byte offset of the first pixel.
    pub offset: u64,
    pub width: usize,
    pub height: usize,
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame {} @ {} ({}x{})",
            self.frame, self.offset, self.width, self.height
        )
    }
}

// ---------------------------------------------------------------------------
// MetadataValue – a single entry of the acquisition header
// ---------------------------------------------------------------------------

/// A dynamically-typed header value as found in SIF files.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    IntList(Vec<i64>),
    FloatList(Vec<f64>),
    Tiles(Vec<Tile>),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::IntList(vs) => write_list(f, vs),
            MetadataValue::FloatList(vs) => write_list(f, vs),
            MetadataValue::Tiles(tiles) => {
                let parts: Vec<String> = tiles.iter().map(Tile::to_string).collect();
                write!(f, "[{}]", parts.join("; "))
            }
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
    let parts: Vec<String> = values.iter().map(T::to_string).collect();
    write!(f, "({})", parts.join(", "))
}

impl MetadataValue {
    /// Try to interpret the value as an `f64` scalar.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to interpret the value as an integer scalar. Floats are truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Integer(i) => Some(*i),
            MetadataValue::Float(v) if v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric lists as `f64`, used for calibration coefficients.
    pub fn as_f64_list(&self) -> Option<Vec<f64>> {
        match self {
            MetadataValue::FloatList(vs) => Some(vs.clone()),
            MetadataValue::IntList(vs) => Some(vs.iter().map(|&v| v as f64).collect()),
            _ => None,
        }
    }

    pub fn as_i64_list(&self) -> Option<&[i64]> {
        match self {
            MetadataValue::IntList(vs) => Some(vs),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Integer(i)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

// ---------------------------------------------------------------------------
// Metadata – insertion-ordered key/value store
// ---------------------------------------------------------------------------

/// Free-form acquisition metadata.
///
/// Keys keep the order in which the decoder produced them, so
/// `timestamp_of_10` follows `timestamp_of_9` rather than `timestamp_of_1`.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    entries: Vec<(String, MetadataValue)>,
    /// key -> position in `entries`
    index: HashMap<String, usize>,
}

impl PartialEq for Metadata {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. An existing key keeps its position and gets the new
    /// value, which is returned as the previous one.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) -> Option<MetadataValue> {
        let key = key.into();
        let value = value.into();
        if let Some(&idx) = self.index.get(&key) {
            return Some(std::mem::replace(&mut self.entries[idx].1, value));
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        None
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.index.get(key).map(|&idx| &self.entries[idx].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries whose key starts with `prefix`, in insertion order.
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a MetadataValue)> + 'a {
        self.iter().filter(move |(k, _)| k.starts_with(prefix))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<MetadataValue>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for (k, v) in iter {
            metadata.insert(k, v);
        }
        metadata
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_preserved() {
        let mut info = Metadata::new();
        for i in [0, 1, 2, 10, 9] {
            info.insert(format!("timestamp_of_{i}"), i as i64);
        }
        let keys: Vec<&str> = info.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            [
                "timestamp_of_0",
                "timestamp_of_1",
                "timestamp_of_2",
                "timestamp_of_10",
                "timestamp_of_9"
            ]
        );
    }

    #[test]
    fn reinsert_replaces_in_place() {
        let mut info: Metadata = [("a", 1i64), ("b", 2), ("c", 3)].into_iter().collect();
        let previous = info.insert("b", MetadataValue::Float(2.5));
        assert_eq!(previous, Some(MetadataValue::Integer(2)));
        let keys: Vec<&str> = info.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b", "c"]);
        assert_eq!(info.get("b").and_then(MetadataValue::as_f64), Some(2.5));
    }

    #[test]
    fn long_kinetic_series_stays_ordered_and_addressable() {
        let mut info = Metadata::new();
        for f in 0..20_000i64 {
            info.insert(format!("timestamp_of_{f}"), f * 10);
        }
        info.insert("timestamp_of_7", -1i64);
        assert_eq!(info.len(), 20_000);
        assert_eq!(info.get("timestamp_of_19999"), Some(&MetadataValue::Integer(199_990)));
        assert_eq!(info.get("timestamp_of_7"), Some(&MetadataValue::Integer(-1)));
        let (eighth, _) = info.iter().nth(7).unwrap();
        assert_eq!(eighth, "timestamp_of_7");
        assert!(!info.contains_key("timestamp_of_20000"));
    }

    #[test]
    fn serializes_as_ordered_json_object() {
        let mut info = Metadata::new();
        info.insert("Zeta", "last letter");
        info.insert("Alpha", 1i64);
        info.insert("ShutterTime", MetadataValue::FloatList(vec![0.0, 0.5]));
        let json = serde_json::to_string(&info).unwrap();
        assert_eq!(
            json,
            r#"{"Zeta":"last letter","Alpha":1,"ShutterTime":[0.0,0.5]}"#
        );
    }

    #[test]
    fn display_formats_lists_and_tiles() {
        assert_eq!(MetadataValue::IntList(vec![1024, 1]).to_string(), "(1024, 1)");
        let tiles = MetadataValue::Tiles(vec![Tile {
            frame: 0,
            offset: 2048,
            width: 1024,
            height: 1,
        }]);
        assert_eq!(tiles.to_string(), "[frame 0 @ 2048 (1024x1)]");
    }
}
