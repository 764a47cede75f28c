use serde_json::{Number, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;
use std::sync::Arc;

/// A comparison function that decides whether two values are equal.
pub type Compare<T> = fn(&T, &T) -> bool;

/// Structural equality over nested values.
///
/// Scalars compare by value, floats by same-value semantics (`NaN` equals
/// `NaN`, `+0.0` and `-0.0` differ). Sequences are equal when they have the
/// same length and are element-wise equal in order. Maps are equal when their
/// key sets match and every key's value is equal, regardless of key order.
pub trait DeepEqual {
    fn deep_equal(&self, other: &Self) -> bool;
}

/// Compares two values with [`DeepEqual`], short-circuiting on identity.
pub fn deep_equal<T: DeepEqual + ?Sized>(a: &T, b: &T) -> bool {
    std::ptr::eq(a, b) || a.deep_equal(b)
}

/// Compares two values with their `PartialEq` implementation.
pub fn partial_equal<T: PartialEq + ?Sized>(a: &T, b: &T) -> bool {
    a == b
}

/// Compares two references by address only.
pub fn ref_equal<T: ?Sized>(a: &T, b: &T) -> bool {
    std::ptr::eq(a, b)
}

/// Same-value equality for floats.
pub fn same_value(a: f64, b: f64) -> bool {
    if a.is_nan() && b.is_nan() {
        return true;
    }
    a.to_bits() == b.to_bits()
}

macro_rules! deep_equal_by_partial_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl DeepEqual for $ty {
                fn deep_equal(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

deep_equal_by_partial_eq!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, str, String,
);

impl DeepEqual for f64 {
    fn deep_equal(&self, other: &Self) -> bool {
        same_value(*self, *other)
    }
}

impl DeepEqual for f32 {
    fn deep_equal(&self, other: &Self) -> bool {
        same_value(f64::from(*self), f64::from(*other))
    }
}

impl<T: DeepEqual + ?Sized> DeepEqual for &T {
    fn deep_equal(&self, other: &Self) -> bool {
        deep_equal(*self, *other)
    }
}

impl<T: DeepEqual + ?Sized> DeepEqual for Box<T> {
    fn deep_equal(&self, other: &Self) -> bool {
        deep_equal(self.as_ref(), other.as_ref())
    }
}

impl<T: DeepEqual + ?Sized> DeepEqual for Arc<T> {
    fn deep_equal(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other) || deep_equal(self.as_ref(), other.as_ref())
    }
}

impl<T: DeepEqual + ?Sized> DeepEqual for Rc<T> {
    fn deep_equal(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other) || deep_equal(self.as_ref(), other.as_ref())
    }
}

impl<T: DeepEqual> DeepEqual for Option<T> {
    fn deep_equal(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => deep_equal(a, b),
            _ => false,
        }
    }
}

impl<T: DeepEqual> DeepEqual for [T] {
    fn deep_equal(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| deep_equal(a, b))
    }
}

impl<T: DeepEqual, const N: usize> DeepEqual for [T; N] {
    fn deep_equal(&self, other: &Self) -> bool {
        self.as_slice().deep_equal(other.as_slice())
    }
}

impl<T: DeepEqual> DeepEqual for Vec<T> {
    fn deep_equal(&self, other: &Self) -> bool {
        self.as_slice().deep_equal(other.as_slice())
    }
}

impl<T: DeepEqual> DeepEqual for VecDeque<T> {
    fn deep_equal(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| deep_equal(a, b))
    }
}

impl<K: Ord, V: DeepEqual> DeepEqual for BTreeMap<K, V> {
    fn deep_equal(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, a)| other.get(key).is_some_and(|b| deep_equal(a, b)))
    }
}

impl<K: Eq + Hash, V: DeepEqual, S: BuildHasher> DeepEqual for HashMap<K, V, S> {
    fn deep_equal(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, a)| other.get(key).is_some_and(|b| deep_equal(a, b)))
    }
}

impl<A: DeepEqual, B: DeepEqual> DeepEqual for (A, B) {
    fn deep_equal(&self, other: &Self) -> bool {
        deep_equal(&self.0, &other.0) && deep_equal(&self.1, &other.1)
    }
}

impl<A: DeepEqual, B: DeepEqual, C: DeepEqual> DeepEqual for (A, B, C) {
    fn deep_equal(&self, other: &Self) -> bool {
        deep_equal(&self.0, &other.0)
            && deep_equal(&self.1, &other.1)
            && deep_equal(&self.2, &other.2)
    }
}

fn number_equal(a: &Number, b: &Number) -> bool {
    if a == b {
        return true;
    }
    if a.is_f64() || b.is_f64() {
        return match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => same_value(x, y),
            _ => false,
        };
    }
    false
}

impl DeepEqual for Value {
    fn deep_equal(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => number_equal(a, b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.deep_equal(b),
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(key, a)| b.get(key).is_some_and(|b| deep_equal(a, b)))
            }
            _ => false,
        }
    }
}

/// Identity used for the members of a [`ShallowEqual`] comparison.
///
/// Plain values compare by value and floats with [`same_value`]. Shared
/// pointers and references compare by address, and so do the arrays and
/// objects inside a [`Value`].
pub trait Identical {
    fn identical(&self, other: &Self) -> bool;
}

macro_rules! identical_by_partial_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identical for $ty {
                fn identical(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

identical_by_partial_eq!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, str, String,
);

impl Identical for f64 {
    fn identical(&self, other: &Self) -> bool {
        same_value(*self, *other)
    }
}

impl Identical for f32 {
    fn identical(&self, other: &Self) -> bool {
        same_value(f64::from(*self), f64::from(*other))
    }
}

impl<T: ?Sized> Identical for &T {
    fn identical(&self, other: &Self) -> bool {
        std::ptr::eq(*self, *other)
    }
}

impl<T: ?Sized> Identical for Arc<T> {
    fn identical(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> Identical for Rc<T> {
    fn identical(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: Identical> Identical for Option<T> {
    fn identical(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.identical(b),
            _ => false,
        }
    }
}

impl Identical for Value {
    fn identical(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => number_equal(a, b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
                std::ptr::eq(self, other)
            }
            _ => false,
        }
    }
}

/// One-level equality: same length or key set, members compared with
/// [`Identical`] rather than recursively.
pub trait ShallowEqual {
    fn shallow_equal(&self, other: &Self) -> bool;
}

/// Compares two values with [`ShallowEqual`], short-circuiting on identity.
pub fn shallow_equal<T: ShallowEqual + ?Sized>(a: &T, b: &T) -> bool {
    std::ptr::eq(a, b) || a.shallow_equal(b)
}

impl<T: Identical> ShallowEqual for [T] {
    fn shallow_equal(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.identical(b))
    }
}

impl<T: Identical, const N: usize> ShallowEqual for [T; N] {
    fn shallow_equal(&self, other: &Self) -> bool {
        self.as_slice().shallow_equal(other.as_slice())
    }
}

impl<T: Identical> ShallowEqual for Vec<T> {
    fn shallow_equal(&self, other: &Self) -> bool {
        self.as_slice().shallow_equal(other.as_slice())
    }
}

impl<K: Ord, V: Identical> ShallowEqual for BTreeMap<K, V> {
    fn shallow_equal(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, a)| other.get(key).is_some_and(|b| a.identical(b)))
    }
}

impl<K: Eq + Hash, V: Identical, S: BuildHasher> ShallowEqual for HashMap<K, V, S> {
    fn shallow_equal(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, a)| other.get(key).is_some_and(|b| a.identical(b)))
    }
}

/// Arrays and objects compare their members one level down; anything else
/// compares with [`Identical`].
impl ShallowEqual for Value {
    fn shallow_equal(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => a.shallow_equal(b),
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(key, a)| b.get(key).is_some_and(|b| a.identical(b)))
            }
            _ => self.identical(other),
        }
    }
}
