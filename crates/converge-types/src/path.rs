//! The path container (spec.md §3 "Path").
//!
//! This module holds the plain data structure only; the `head`/`tail`/
//! `push`/`term_to_path` operations of spec.md §4.1 live in
//! `converge-resolver::path`, since `push` needs the hashpath commit
//! function from `converge-crypto`.

use crate::Value;

/// One element of a path: in practice always a scalar (a key segment or a
/// content-addressed reference id), but stored as a [`Value`] so a path
/// element can carry any scalar shape the key normalizer accepts.
pub type PathElement = Value;

/// An ordered sequence of path elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path(Vec<PathElement>);

impl Path {
    /// An empty path.
    pub fn new(elements: Vec<PathElement>) -> Self {
        Self(elements)
    }

    /// A single-element path.
    pub fn single(element: PathElement) -> Self {
        Self(vec![element])
    }

    /// Builds a path from plain key strings, the common case.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(|k| Value::text(k.into())).collect())
    }

    /// Interprets a [`Value`] as a path per spec.md §4.1 `term_to_path`:
    /// a `List` unpacks element-wise; any other (atomic) value becomes a
    /// single-element path.
    pub fn term_to_path(value: &Value) -> Self {
        match value {
            Value::List(items) => Self(items.clone()),
            other => Self::single(other.clone()),
        }
    }

    /// The inverse rendering: a single-element path collapses back to its
    /// lone value; otherwise the path renders as a `List`.
    pub fn to_value(&self) -> Value {
        match self.0.as_slice() {
            [single] => single.clone(),
            _ => Value::List(self.0.clone()),
        }
    }

    /// `true` if the path has no elements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of elements.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The first element, if any.
    pub fn first(&self) -> Option<&PathElement> {
        self.0.first()
    }

    /// The elements after the first, as a new path. Empty if `self` has
    /// zero or one elements.
    pub fn rest(&self) -> Path {
        if self.0.len() <= 1 {
            Path::default()
        } else {
            Path(self.0[1..].to_vec())
        }
    }

    /// Returns a new path with `element` appended.
    #[must_use]
    pub fn pushed(&self, element: PathElement) -> Path {
        let mut elements = self.0.clone();
        elements.push(element);
        Path(elements)
    }

    /// The raw element slice.
    pub fn elements(&self) -> &[PathElement] {
        &self.0
    }
}

impl From<Vec<PathElement>> for Path {
    fn from(elements: Vec<PathElement>) -> Self {
        Self(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_to_path_unpacks_lists() {
        let v = Value::List(vec![Value::text("a"), Value::text("b")]);
        let p = Path::term_to_path(&v);
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn term_to_path_wraps_atoms() {
        let v = Value::text("a");
        let p = Path::term_to_path(&v);
        assert_eq!(p.len(), 1);
        assert_eq!(p.first(), Some(&Value::text("a")));
    }

    #[test]
    fn rest_of_single_element_is_empty() {
        let p = Path::from_keys(["a"]);
        assert!(p.rest().is_empty());
    }

    #[test]
    fn rest_of_multi_element_drops_head() {
        let p = Path::from_keys(["a", "b", "c"]);
        let rest = p.rest();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest.first(), Some(&Value::text("b")));
    }

    #[test]
    fn to_value_collapses_single_element() {
        let p = Path::single(Value::text("a"));
        assert_eq!(p.to_value(), Value::text("a"));
    }
}
