//! Keyed, insertion-ordered embedding collections.
//!
//! Insertion order is the only order the crate ever uses: k-means seeds from the first
//! `k` vectors, neighbor ties resolve to the earlier index, and bounded samples take a
//! prefix. Keys carry no other meaning.

use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, TesseraError};

/// Mapping from unique string keys to fixed-length embeddings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingCollection {
    keys: Vec<String>,
    vectors: Vec<Vec<f32>>,
    index: HashMap<String, usize>,
}

impl EmbeddingCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            vectors: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Build from entries, rejecting duplicate keys.
    pub fn try_from_entries<I, K>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Vec<f32>)>,
        K: Into<String>,
    {
        let mut collection = Self::new();
        for (key, vector) in entries {
            let key = key.into();
            if collection.contains_key(&key) {
                return Err(TesseraError::DuplicateKey(key));
            }
            collection.insert(key, vector);
        }
        Ok(collection)
    }

    /// Insert an embedding. An existing key keeps its position and gets the new vector;
    /// the old vector is returned.
    pub fn insert(&mut self, key: impl Into<String>, vector: Vec<f32>) -> Option<Vec<f32>> {
        let key = key.into();
        if let Some(&pos) = self.index.get(&key) {
            return Some(std::mem::replace(&mut self.vectors[pos], vector));
        }
        self.index.insert(key.clone(), self.keys.len());
        self.keys.push(key);
        self.vectors.push(vector);
        None
    }

    pub fn get(&self, key: &str) -> Option<&[f32]> {
        self.index.get(key).map(|&i| self.vectors[i].as_slice())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> + '_ {
        self.keys
            .iter()
            .map(String::as_str)
            .zip(self.vectors.iter().map(Vec::as_slice))
    }

    /// Dimension of the first embedding, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.vectors.first().map(Vec::len)
    }

    /// Check dimension consistency and finiteness. Returns the shared dimension
    /// (`0` for an empty collection).
    pub fn validate(&self) -> Result<usize> {
        let Some(expected) = self.dimension() else {
            return Ok(0);
        };
        for (key, vector) in self.iter() {
            if vector.len() != expected {
                return Err(TesseraError::DimensionMismatch {
                    expected,
                    found: vector.len(),
                });
            }
            if let Some(index) = vector.iter().position(|x| !x.is_finite()) {
                return Err(TesseraError::NonFinite {
                    key: key.to_string(),
                    index,
                });
            }
        }
        Ok(expected)
    }

    /// New collection with the same keys, in the same order, and transformed vectors.
    pub fn map_vectors<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&str, &[f32]) -> Vec<f32>,
    {
        let vectors = self.iter().map(|(k, v)| f(k, v)).collect();
        Self {
            keys: self.keys.clone(),
            vectors,
            index: self.index.clone(),
        }
    }

    /// New collection with the same keys and the given vectors (one per key, in order).
    pub(crate) fn with_vectors(&self, vectors: Vec<Vec<f32>>) -> Self {
        debug_assert_eq!(vectors.len(), self.keys.len());
        Self {
            keys: self.keys.clone(),
            vectors,
            index: self.index.clone(),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<f32>)> for EmbeddingCollection {
    fn from_iter<I: IntoIterator<Item = (K, Vec<f32>)>>(iter: I) -> Self {
        let mut collection = Self::new();
        for (k, v) in iter {
            collection.insert(k, v);
        }
        collection
    }
}

impl Serialize for EmbeddingCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EmbeddingCollection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct CollectionVisitor;

        impl<'de> Visitor<'de> for CollectionVisitor {
            type Value = EmbeddingCollection;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from keys to embedding arrays")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut collection =
                    EmbeddingCollection::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, vector)) = access.next_entry::<String, Vec<f32>>()? {
                    if collection.contains_key(&key) {
                        return Err(serde::de::Error::custom(format!("duplicate key `{key}`")));
                    }
                    collection.insert(key, vector);
                }
                Ok(collection)
            }
        }

        deserializer.deserialize_map(CollectionVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut c = EmbeddingCollection::new();
        c.insert("a", vec![1.0]);
        c.insert("b", vec![2.0]);
        let old = c.insert("a", vec![3.0]);
        assert_eq!(old, Some(vec![1.0]));
        assert_eq!(c.keys(), &["a".to_string(), "b".to_string()]);
        assert_eq!(c.get("a"), Some(&[3.0][..]));
    }

    #[test]
    fn strict_constructor_rejects_duplicates() {
        let err = EmbeddingCollection::try_from_entries(vec![("a", vec![1.0]), ("a", vec![2.0])])
            .unwrap_err();
        assert_eq!(err, TesseraError::DuplicateKey("a".into()));
    }

    #[test]
    fn validate_reports_dimension_mismatch() {
        let c: EmbeddingCollection = vec![("a", vec![1.0, 2.0]), ("b", vec![1.0])]
            .into_iter()
            .collect();
        assert_eq!(
            c.validate(),
            Err(TesseraError::DimensionMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn validate_reports_non_finite() {
        let c: EmbeddingCollection = vec![("a", vec![1.0, 2.0]), ("b", vec![1.0, f32::NAN])]
            .into_iter()
            .collect();
        assert_eq!(
            c.validate(),
            Err(TesseraError::NonFinite {
                key: "b".into(),
                index: 1
            })
        );
    }

    #[test]
    fn json_preserves_insertion_order() {
        let c: EmbeddingCollection = vec![("z", vec![1.0]), ("a", vec![2.0]), ("m", vec![3.0])]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, r#"{"z":[1.0],"a":[2.0],"m":[3.0]}"#);
        let parsed: EmbeddingCollection = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, c);
    }
}
