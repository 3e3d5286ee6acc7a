use crate::{array::Array, value::Value, AplError, AplResult};

/// Apply a scalar function to every element of a value
pub fn un_pervade(
    a: &Value,
    f: &mut dyn FnMut(&Value) -> AplResult<Value>,
) -> AplResult<Value> {
    match a {
        Value::Array(arr) => {
            let mut values = Vec::with_capacity(arr.len());
            for v in arr.iter() {
                values.push(un_pervade(&v, f)?);
            }
            Ok(Value::Array(Array::from((arr.shape().clone(), values))))
        }
        v => f(v),
    }
}

/// Apply a scalar function elementwise with scalar extension
///
/// A scalar argument broadcasts to the partner's shape; two arrays must
/// agree in shape exactly.
pub fn bin_pervade(
    a: &Value,
    b: &Value,
    f: &mut dyn FnMut(&Value, &Value) -> AplResult<Value>,
) -> AplResult<Value> {
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => {
            if x.rank() != y.rank() {
                return Err(AplError::rank(format!(
                    "ranks {} and {} do not match",
                    x.shape(),
                    y.shape()
                )));
            }
            if x.shape() != y.shape() {
                return Err(AplError::length(format!(
                    "shapes {} and {} do not match",
                    x.shape(),
                    y.shape()
                )));
            }
            let mut values = Vec::with_capacity(x.len());
            for (xe, ye) in x.iter().zip(y.iter()) {
                values.push(bin_pervade(&xe, &ye, f)?);
            }
            Ok(Value::Array(Array::from((x.shape().clone(), values))))
        }
        (Value::Array(x), b) => {
            let mut values = Vec::with_capacity(x.len());
            for xe in x.iter() {
                values.push(bin_pervade(&xe, b, f)?);
            }
            Ok(Value::Array(Array::from((x.shape().clone(), values))))
        }
        (a, Value::Array(y)) => {
            let mut values = Vec::with_capacity(y.len());
            for ye in y.iter() {
                values.push(bin_pervade(a, &ye, f)?);
            }
            Ok(Value::Array(Array::from((y.shape().clone(), values))))
        }
        (a, b) => f(a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::{Dyad, Tower};

    fn add(a: &Value, b: &Value) -> AplResult<Value> {
        let t = Tower::default();
        Ok(Value::Num(t.dyadic(
            Dyad::Add,
            a.as_num().unwrap(),
            b.as_num().unwrap(),
        )?))
    }

    #[test]
    fn scalar_extension() {
        let v = Value::Array(Array::from(vec![1i64, 2, 3]));
        let r = bin_pervade(&Value::from(10i64), &v, &mut add).unwrap();
        assert_eq!(r, Value::Array(Array::from(vec![11i64, 12, 13])));
        let r = bin_pervade(&v, &v, &mut add).unwrap();
        assert_eq!(r, Value::Array(Array::from(vec![2i64, 4, 6])));
    }

    #[test]
    fn shape_agreement() {
        let a = Value::Array(Array::from(vec![1i64, 2, 3]));
        let b = Value::Array(Array::from(vec![1i64, 2]));
        assert!(matches!(
            bin_pervade(&a, &b, &mut add),
            Err(AplError::Length(_))
        ));
        let m = Value::Array(
            Array::from(vec![1i64, 2, 3, 4])
                .reshape(crate::Shape::from([2, 2]))
                .unwrap(),
        );
        assert!(matches!(
            bin_pervade(&a, &m, &mut add),
            Err(AplError::Rank(_))
        ));
    }
}
