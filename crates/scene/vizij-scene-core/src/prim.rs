//! Per-prim data: type tags, authored states and attribute values.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::PrimId;
use crate::path::ScenePath;

/// Type tag of a scene node as far as skeleton binding is concerned.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A skeleton root; the only kind that may be populated.
    Root,
    Skeleton,
    Animation,
    /// Renderable geometry that may be deformed by a skeleton.
    Skinnable,
    #[default]
    Other,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Root => "root",
            NodeKind::Skeleton => "skeleton",
            NodeKind::Animation => "animation",
            NodeKind::Skinnable => "skinnable",
            NodeKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// Authored state of an inheritable relationship or attribute on one node.
#[derive(Clone, Debug, PartialEq)]
pub enum Authored<T> {
    /// Nothing authored here; defer to the parent.
    Unauthored,
    /// An explicit value overriding anything inherited.
    Authored(T),
    /// An explicit empty override that stops inheritance.
    Blocked,
}

impl<T> Default for Authored<T> {
    fn default() -> Self {
        Authored::Unauthored
    }
}

impl<T> Authored<T> {
    pub fn is_unauthored(&self) -> bool {
        matches!(self, Authored::Unauthored)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Authored::Blocked)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Authored::Authored(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Authored::Authored(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Authored<&T> {
        match self {
            Authored::Unauthored => Authored::Unauthored,
            Authored::Authored(v) => Authored::Authored(v),
            Authored::Blocked => Authored::Blocked,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Authored<U> {
        match self {
            Authored::Unauthored => Authored::Unauthored,
            Authored::Authored(v) => Authored::Authored(f(v)),
            Authored::Blocked => Authored::Blocked,
        }
    }
}

/// Already-composed attribute value. Serialized untagged so stage documents can
/// use plain JSON literals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Token(String),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
    TokenArray(Vec<String>),
}

impl AttrValue {
    pub fn tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttrValue::TokenArray(tokens.into_iter().map(Into::into).collect())
    }

    /// Token view. An empty array of any element type reads as an empty token
    /// array, since JSON `[]` carries no element type.
    pub fn as_tokens(&self) -> Option<&[String]> {
        match self {
            AttrValue::TokenArray(v) => Some(v),
            v if v.is_empty_array() => Some(&[]),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            AttrValue::IntArray(v) => Some(v),
            v if v.is_empty_array() => Some(&[]),
            _ => None,
        }
    }

    /// Float view; integer arrays are not converted, see
    /// [`to_floats`](Self::to_floats).
    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            AttrValue::FloatArray(v) => Some(v),
            v if v.is_empty_array() => Some(&[]),
            _ => None,
        }
    }

    /// Numeric values widened to floats. JSON `[1, 0]` parses as an integer
    /// array, so weights authored without a decimal point are read through
    /// this.
    pub fn to_floats(&self) -> Option<Vec<f64>> {
        match self {
            AttrValue::FloatArray(v) => Some(v.clone()),
            AttrValue::IntArray(v) => Some(v.iter().map(|&i| i as f64).collect()),
            AttrValue::Float(f) => Some(vec![*f]),
            AttrValue::Int(i) => Some(vec![*i as f64]),
            _ => None,
        }
    }

    fn is_empty_array(&self) -> bool {
        match self {
            AttrValue::IntArray(v) => v.is_empty(),
            AttrValue::FloatArray(v) => v.is_empty(),
            AttrValue::TokenArray(v) => v.is_empty(),
            _ => false,
        }
    }

    /// Element count for array values, 1 for scalars.
    pub fn len(&self) -> usize {
        match self {
            AttrValue::IntArray(v) => v.len(),
            AttrValue::FloatArray(v) => v.len(),
            AttrValue::TokenArray(v) => v.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Storage for one authored prim.
#[derive(Clone, Debug)]
pub struct Prim {
    pub(crate) id: PrimId,
    pub(crate) path: ScenePath,
    pub(crate) kind: NodeKind,
    pub(crate) active: bool,
    pub(crate) parent: Option<PrimId>,
    pub(crate) children: Vec<PrimId>,
    /// Prototype referenced when this prim is an instance.
    pub(crate) prototype: Option<ScenePath>,
    pub(crate) relationships: HashMap<String, Authored<Vec<ScenePath>>>,
    pub(crate) attributes: HashMap<String, Authored<AttrValue>>,
}

impl Prim {
    pub(crate) fn new(id: PrimId, path: ScenePath, kind: NodeKind, parent: Option<PrimId>) -> Self {
        Self {
            id,
            path,
            kind,
            active: true,
            parent,
            children: Vec::new(),
            prototype: None,
            relationships: HashMap::new(),
            attributes: HashMap::new(),
        }
    }

    pub fn id(&self) -> PrimId {
        self.id
    }

    pub fn path(&self) -> &ScenePath {
        &self.path
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn prototype(&self) -> Option<&ScenePath> {
        self.prototype.as_ref()
    }

    pub fn children(&self) -> &[PrimId] {
        &self.children
    }

    pub fn relationship(&self, name: &str) -> Authored<&Vec<ScenePath>> {
        self.relationships
            .get(name)
            .map(Authored::as_ref)
            .unwrap_or_default()
    }

    pub fn attribute(&self, name: &str) -> Authored<&AttrValue> {
        self.attributes
            .get(name)
            .map(Authored::as_ref)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_values_parse_from_plain_json() {
        let v: AttrValue = serde_json::from_str("[\"a\", \"b\"]").unwrap();
        assert_eq!(v.as_tokens().map(<[String]>::len), Some(2));
        let v: AttrValue = serde_json::from_str("[0, 1, 2]").unwrap();
        assert_eq!(v.as_ints(), Some(&[0, 1, 2][..]));
        let v: AttrValue = serde_json::from_str("[0.5, 1]").unwrap();
        assert_eq!(v.as_floats(), Some(&[0.5, 1.0][..]));
        let v: AttrValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, AttrValue::Bool(true));
    }

    #[test]
    fn untyped_json_arrays_read_through_any_view() {
        let empty: AttrValue = serde_json::from_str("[]").unwrap();
        assert_eq!(empty.as_tokens(), Some(&[][..]));
        assert_eq!(empty.as_floats(), Some(&[][..]));
        assert!(empty.is_empty());

        let weights: AttrValue = serde_json::from_str("[1, 0]").unwrap();
        assert_eq!(weights.as_floats(), None);
        assert_eq!(weights.to_floats(), Some(vec![1.0, 0.0]));
        assert_eq!(AttrValue::tokens(["a"]).to_floats(), None);
    }

    #[test]
    fn authored_helpers() {
        let a: Authored<i32> = Authored::Authored(3);
        assert_eq!(a.value(), Some(&3));
        assert_eq!(a.clone().map(|v| v * 2), Authored::Authored(6));
        assert!(Authored::<i32>::Blocked.is_blocked());
        assert!(Authored::<i32>::default().is_unauthored());
    }
}
