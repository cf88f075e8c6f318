//! Identity keys.

use std::any::type_name;
use std::borrow::{Borrow, Cow};
use std::fmt;

/// [`Key`] is the identity under which a provider, its cached instance, and any scoped override
/// are stored.
///
/// Keys derived with [`Key::of`] are stable for a given type: requesting the same type twice
/// always yields equal keys. Keys can also be chosen explicitly with [`Key::new`], e.g. to
/// register a constructor under a name of your own.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Cow<'static, str>);

impl Key {
    /// Creates a key from an explicit name.
    pub fn new<N>(name: N) -> Self
    where
        N: Into<Cow<'static, str>>,
    {
        Self(name.into())
    }

    /// Returns the key identifying values of type `T`.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use ioc_core::Key;
    ///
    /// assert_eq!(Key::of::<String>(), Key::of::<String>());
    /// assert_ne!(Key::of::<String>(), Key::of::<Arc<String>>());
    /// ```
    #[inline]
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self(Cow::Borrowed(type_name::<T>()))
    }

    /// Returns the key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Key {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct Logger;

    mod other {
        pub struct Logger;
    }

    #[test]
    fn test_of_is_deterministic() {
        assert_eq!(Key::of::<Logger>(), Key::of::<Logger>());
        assert_eq!(Key::of::<Vec<u8>>(), Key::of::<Vec<u8>>());
    }

    #[test]
    fn test_of_distinguishes_paths() {
        assert_ne!(Key::of::<Logger>(), Key::of::<other::Logger>());
        assert_ne!(Key::of::<u32>(), Key::of::<i32>());
    }

    #[test]
    fn test_explicit_matches_borrowed() {
        let owned = Key::new(String::from("Logger"));
        let borrowed = Key::from("Logger");
        assert_eq!(owned, borrowed);
        assert_eq!(owned.to_string(), "Logger");
    }

    #[test]
    fn test_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(Key::new("db"), 1);
        assert_eq!(map.get("db"), Some(&1));
    }
}
