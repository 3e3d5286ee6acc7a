use ecow::EcoVec;

use crate::{value::Value, AplError, AplResult};

/// A keyed container with insertion-ordered keys
///
/// Keys are values, typically strings written with a backtick. Indexing a
/// dict with a vector of keys selects a sub-dict.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict {
    keys: EcoVec<Value>,
    values: EcoVec<Value>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn len(&self) -> usize {
        self.keys.len()
    }
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
    /// The keys, in insertion order
    pub fn keys(&self) -> &[Value] {
        &self.keys
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.keys.iter().zip(self.values.iter())
    }
    /// Look up the value for a key
    pub fn at(&self, key: &Value) -> Option<Value> {
        self.keys
            .iter()
            .position(|k| k == key)
            .map(|i| self.values[i].clone())
    }
    /// Update the value for a key, or append a new entry
    pub fn set(&mut self, key: Value, value: Value) {
        if let Some(i) = self.keys.iter().position(|k| *k == key) {
            self.values.make_mut()[i] = value;
        } else {
            self.keys.push(key);
            self.values.push(value);
        }
    }
    /// Select a sub-dict with the given keys, preserving their order
    pub fn select(&self, keys: impl IntoIterator<Item = Value>) -> AplResult<Dict> {
        let mut dict = Dict::new();
        for key in keys {
            let Some(value) = self.at(&key) else {
                return Err(AplError::index(format!("key not found: {key}")));
            };
            dict.set(key, value);
        }
        Ok(dict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_keys() {
        let mut d = Dict::new();
        d.set(Value::from("b"), Value::from(1i64));
        d.set(Value::from("a"), Value::from(2i64));
        d.set(Value::from("b"), Value::from(3i64));
        assert_eq!(d.len(), 2);
        assert_eq!(d.keys(), [Value::from("b"), Value::from("a")]);
        assert_eq!(d.at(&Value::from("b")), Some(Value::from(3i64)));
        assert_eq!(d.at(&Value::from("missing")), None);
        let sub = d.select([Value::from("a")]).unwrap();
        assert_eq!(sub.len(), 1);
        assert!(d.select([Value::from("missing")]).is_err());
    }
}
