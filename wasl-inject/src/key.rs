//! Binding identification keys.
//!
//! [`BindingKey`] identifies a dependency inside an injector. It combines
//! a [`TypeId`] with an optional annotation so that several bindings of
//! the same type can coexist (e.g. a "users" and an "articles" database).

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

use wasl_support::rendering::shorten_type_name;

/// Identifies a dependency in an injector.
///
/// Two keys are equal iff both the [`TypeId`] and the annotation compare
/// equal. Within one injector a key maps to at most one binding; rebinding
/// the same key overwrites the previous binding.
///
/// # Examples
/// ```
/// use wasl_inject::key::BindingKey;
///
/// // Plain key — just a type
/// let key = BindingKey::of::<String>();
/// assert_eq!(key.annotation(), None);
///
/// // Annotated key — type + discriminator
/// let users = BindingKey::annotated::<String>("users");
/// let articles = BindingKey::annotated::<String>("articles");
/// assert_ne!(users, articles);
/// ```
#[derive(Clone)]
pub struct BindingKey {
    type_id: TypeId,
    type_name: &'static str,
    annotation: Option<&'static str>,
}

impl BindingKey {
    /// Creates a key for type `T` with no annotation.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            annotation: None,
        }
    }

    /// Creates an annotated key for type `T`.
    #[inline]
    pub fn annotated<T: ?Sized + 'static>(annotation: &'static str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            annotation: Some(annotation),
        }
    }

    /// Returns a copy of this key carrying the given annotation.
    #[inline]
    pub fn with_annotation(mut self, annotation: &'static str) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// Returns the un-annotated form of this key.
    ///
    /// Lookup falls back to this key when an annotated lookup misses.
    #[inline]
    pub fn without_annotation(&self) -> Self {
        Self {
            type_id: self.type_id,
            type_name: self.type_name,
            annotation: None,
        }
    }

    /// Returns the [`TypeId`] of the dependency.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the full type name, used in error messages.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the annotation, if any.
    #[inline]
    pub fn annotation(&self) -> Option<&'static str> {
        self.annotation
    }
}

impl PartialEq for BindingKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.annotation == other.annotation
    }
}

impl Eq for BindingKey {}

impl Hash for BindingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.annotation.hash(state);
    }
}

impl fmt::Debug for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.annotation {
            Some(a) => write!(f, "BindingKey({}, annotation={a:?})", self.type_name),
            None => write!(f, "BindingKey({})", self.type_name),
        }
    }
}

// Display shortens the type path; the full path stays in Debug.
impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = shorten_type_name(self.type_name);
        match self.annotation {
            Some(a) => write!(f, "{short} (annotation={a:?})"),
            None => write!(f, "{short}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Database;

    #[test]
    fn key_of_type() {
        let key = BindingKey::of::<Database>();
        assert!(key.type_name().contains("Database"));
        assert_eq!(key.annotation(), None);
    }

    #[test]
    fn key_equality_same_type() {
        assert_eq!(BindingKey::of::<String>(), BindingKey::of::<String>());
    }

    #[test]
    fn key_inequality_different_types() {
        assert_ne!(BindingKey::of::<String>(), BindingKey::of::<i32>());
    }

    #[test]
    fn annotated_keys_differ() {
        let users = BindingKey::annotated::<Database>("users");
        let articles = BindingKey::annotated::<Database>("articles");
        assert_ne!(users, articles);
    }

    #[test]
    fn annotated_vs_plain_differ() {
        assert_ne!(
            BindingKey::annotated::<Database>("users"),
            BindingKey::of::<Database>()
        );
    }

    #[test]
    fn without_annotation_strips() {
        let key = BindingKey::annotated::<Database>("users");
        assert_eq!(key.without_annotation(), BindingKey::of::<Database>());
    }

    #[test]
    fn key_in_hashmap() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(BindingKey::of::<String>(), "plain");
        map.insert(BindingKey::annotated::<String>("x"), "annotated");
        assert_eq!(map.get(&BindingKey::of::<String>()), Some(&"plain"));
        assert_eq!(
            map.get(&BindingKey::annotated::<String>("x")),
            Some(&"annotated")
        );
        assert_eq!(map.get(&BindingKey::annotated::<String>("y")), None);
    }

    #[test]
    fn unsized_type_key() {
        trait Repository {}
        let _key = BindingKey::of::<dyn Repository>();
    }

    #[test]
    fn display_shortens_path() {
        let key = BindingKey::annotated::<Database>("users");
        let shown = format!("{key}");
        assert!(shown.starts_with("Database"));
        assert!(shown.contains("users"));
    }
}
