use std::fmt;

use ecow::{EcoString, EcoVec};

use crate::{num::Num, shape::Shape, value::Value, AplError, AplResult};

/// A rectangular, row-major tensor
///
/// Uniform data is stored unboxed; anything else is a mixed array of
/// values. Storage is copy-on-write, so assigning an array to a second
/// name shares it until one side mutates.
#[derive(Debug, Clone)]
pub struct Array {
    shape: Shape,
    data: ArrayData,
}

#[derive(Debug, Clone)]
pub enum ArrayData {
    Ints(EcoVec<i64>),
    Floats(EcoVec<f64>),
    Chars(EcoVec<char>),
    Strings(EcoVec<EcoString>),
    Mixed(EcoVec<Value>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Ints(v) => v.len(),
            ArrayData::Floats(v) => v.len(),
            ArrayData::Chars(v) => v.len(),
            ArrayData::Strings(v) => v.len(),
            ArrayData::Mixed(v) => v.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Array {
    pub fn new(shape: Shape, data: ArrayData) -> Self {
        debug_assert_eq!(shape.elements(), data.len());
        Array { shape, data }
    }
    /// The empty vector
    pub fn empty() -> Self {
        Array {
            shape: Shape::from(0),
            data: ArrayData::Ints(EcoVec::new()),
        }
    }
    pub fn rank(&self) -> usize {
        self.shape.len()
    }
    pub fn shape(&self) -> &Shape {
        &self.shape
    }
    pub fn data(&self) -> &ArrayData {
        &self.data
    }
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.data.len()
    }
    /// Clone out the element at a flat index
    pub fn get(&self, i: usize) -> Value {
        match &self.data {
            ArrayData::Ints(v) => Value::Num(Num::Int(v[i])),
            ArrayData::Floats(v) => Value::Num(Num::Float(v[i])),
            ArrayData::Chars(v) => Value::Char(v[i]),
            ArrayData::Strings(v) => Value::Str(v[i].clone()),
            ArrayData::Mixed(v) => v[i].clone(),
        }
    }
    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }
    /// Whether the array stores one of the unboxed uniform forms
    pub fn is_uniform(&self) -> bool {
        !matches!(self.data, ArrayData::Mixed(_))
    }
    /// Give the array a new shape, cycling its ravel to fill
    pub fn reshape(&self, shape: Shape) -> AplResult<Array> {
        let n = shape.elements();
        if self.len() == 0 && n > 0 {
            return Err(AplError::domain("reshape of an empty array"));
        }
        let data = match &self.data {
            ArrayData::Ints(v) => ArrayData::Ints(cycle(v, n)),
            ArrayData::Floats(v) => ArrayData::Floats(cycle(v, n)),
            ArrayData::Chars(v) => ArrayData::Chars(cycle(v, n)),
            ArrayData::Strings(v) => ArrayData::Strings(cycle(v, n)),
            ArrayData::Mixed(v) => ArrayData::Mixed(cycle(v, n)),
        };
        Ok(Array::new(shape, data))
    }
    /// The ravel: the same elements as a vector
    pub fn ravel(&self) -> Array {
        Array {
            shape: Shape::from(self.len()),
            data: self.data.clone(),
        }
    }
    /// Catenate along the first axis
    pub fn catenate(&self, other: &Array) -> AplResult<Array> {
        if self.rank() <= 1 && other.rank() <= 1 {
            let values: Vec<Value> = self.iter().chain(other.iter()).collect();
            return Ok(Array::from(values));
        }
        if self.rank() != other.rank() || self.shape[1..] != other.shape[1..] {
            return Err(AplError::length(format!(
                "cannot catenate shapes {} and {}",
                self.shape, other.shape
            )));
        }
        let mut shape = self.shape.clone();
        shape[0] += other.shape[0];
        let values: Vec<Value> = self.iter().chain(other.iter()).collect();
        Ok(Array::new(shape, data_from_values(values)))
    }
}

fn cycle<T: Clone>(v: &EcoVec<T>, n: usize) -> EcoVec<T> {
    v.iter().cloned().cycle().take(n).collect()
}

/// Pack values into the tightest uniform storage
fn data_from_values(values: Vec<Value>) -> ArrayData {
    if !values.is_empty() {
        if values.iter().all(|v| matches!(v, Value::Num(Num::Int(_)))) {
            return ArrayData::Ints(
                values
                    .iter()
                    .map(|v| match v {
                        Value::Num(Num::Int(i)) => *i,
                        _ => unreachable!(),
                    })
                    .collect(),
            );
        }
        if values.iter().all(|v| matches!(v, Value::Num(Num::Float(_)))) {
            return ArrayData::Floats(
                values
                    .iter()
                    .map(|v| match v {
                        Value::Num(Num::Float(f)) => *f,
                        _ => unreachable!(),
                    })
                    .collect(),
            );
        }
        if values.iter().all(|v| matches!(v, Value::Char(_))) {
            return ArrayData::Chars(
                values
                    .iter()
                    .map(|v| match v {
                        Value::Char(c) => *c,
                        _ => unreachable!(),
                    })
                    .collect(),
            );
        }
        if values.iter().all(|v| matches!(v, Value::Str(_))) {
            return ArrayData::Strings(
                values
                    .iter()
                    .map(|v| match v {
                        Value::Str(s) => s.clone(),
                        _ => unreachable!(),
                    })
                    .collect(),
            );
        }
    }
    ArrayData::Mixed(values.into_iter().collect())
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match crate::format::format_value(&Value::Array(self.clone()), &Default::default()) {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "{:?}", self.shape),
        }
    }
}

impl From<Vec<i64>> for Array {
    fn from(v: Vec<i64>) -> Self {
        Array {
            shape: Shape::from(v.len()),
            data: ArrayData::Ints(v.into_iter().collect()),
        }
    }
}

impl From<Vec<f64>> for Array {
    fn from(v: Vec<f64>) -> Self {
        Array {
            shape: Shape::from(v.len()),
            data: ArrayData::Floats(v.into_iter().collect()),
        }
    }
}

impl From<Vec<char>> for Array {
    fn from(v: Vec<char>) -> Self {
        Array {
            shape: Shape::from(v.len()),
            data: ArrayData::Chars(v.into_iter().collect()),
        }
    }
}

impl From<Vec<Value>> for Array {
    fn from(v: Vec<Value>) -> Self {
        Array {
            shape: Shape::from(v.len()),
            data: data_from_values(v),
        }
    }
}

impl From<(Shape, Vec<Value>)> for Array {
    fn from((shape, v): (Shape, Vec<Value>)) -> Self {
        Array::new(shape, data_from_values(v))
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_data_invariant() {
        let a = Array::from(vec![1i64, 2, 3, 4, 5, 6]);
        let m = a.reshape(Shape::from([2, 3])).unwrap();
        assert_eq!(m.shape().elements(), m.len());
        assert_eq!(m.get(4), Value::from(5i64));
        let cycled = Array::from(vec![7i64]).reshape(Shape::from([2, 2])).unwrap();
        assert_eq!(cycled.iter().collect::<Vec<_>>(), vec![Value::from(7i64); 4]);
        assert!(Array::empty().reshape(Shape::from([3])).is_err());
        assert!(Array::from(vec![1i64]).reshape(Shape::from(0)).is_ok());
    }

    #[test]
    fn reshape_to_empty_keeps_the_variant() {
        let mixed = Array::from(vec![Value::from(1i64), Value::from("s")]);
        assert!(!mixed.is_uniform());
        let empty = mixed.reshape(Shape::from(0)).unwrap();
        assert!(!empty.is_uniform());
        let floats = Array::from(vec![1.5, 2.5]).reshape(Shape::from(0)).unwrap();
        assert!(matches!(floats.data(), ArrayData::Floats(_)));
    }

    #[test]
    fn normalization() {
        let a = Array::from(vec![Value::from(1i64), Value::from(2i64)]);
        assert!(a.is_uniform());
        let b = Array::from(vec![Value::from(1i64), Value::from(2.5)]);
        assert!(!b.is_uniform());
        // Numeric equality is storage-blind
        assert_eq!(
            Array::from(vec![1i64, 2]),
            Array::from(vec![Value::from(1i64), Value::from(2i64)])
        );
    }

    #[test]
    fn catenation() {
        let a = Array::from(vec![1i64, 2]);
        let b = Array::from(vec![3i64]);
        assert_eq!(a.catenate(&b).unwrap(), Array::from(vec![1i64, 2, 3]));
        let m = Array::from(vec![1i64, 2, 3, 4]).reshape(Shape::from([2, 2])).unwrap();
        let n = Array::from(vec![5i64, 6]).reshape(Shape::from([1, 2])).unwrap();
        let cat = m.catenate(&n).unwrap();
        assert_eq!(*cat.shape(), [3, 2]);
        let bad = Array::from(vec![5i64, 6, 7]).reshape(Shape::from([1, 3])).unwrap();
        assert!(m.catenate(&bad).is_err());
    }
}
