use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Typed key into [`ComputedData`].
///
/// Declared as a `const` next to the precondition that produces the value,
/// so readers and writers agree on both the slot name and the value type.
pub struct DataKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> DataKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for DataKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DataKey<T> {}

impl<T> fmt::Debug for DataKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataKey({})", self.name)
    }
}

/// Values computed by preconditions and handed on to promo display.
#[derive(Default)]
pub struct ComputedData {
    values: HashMap<&'static str, Box<dyn Any + Send>>,
}

impl ComputedData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`, returning whatever was previously under `key`.
    pub fn insert<T: Any + Send>(&mut self, key: DataKey<T>, value: T) -> Option<T> {
        self.values
            .insert(key.name, Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    pub fn get<T: Any + Send>(&self, key: DataKey<T>) -> Option<&T> {
        self.values.get(key.name).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn take<T: Any + Send>(&mut self, key: DataKey<T>) -> Option<T> {
        match self.values.get(key.name) {
            Some(v) if v.is::<T>() => {}
            _ => return None,
        }
        self.values
            .remove(key.name)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    pub fn contains<T: Any + Send>(&self, key: DataKey<T>) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for ComputedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("ComputedData").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANCHOR: DataKey<String> = DataKey::new("anchor_element");
    const SHOW_COUNT: DataKey<u32> = DataKey::new("show_count");

    #[test]
    fn test_typed_round_trip() {
        let mut data = ComputedData::new();
        assert!(data.insert(ANCHOR, "app-menu".to_string()).is_none());
        data.insert(SHOW_COUNT, 3);

        assert_eq!(data.get(ANCHOR).map(String::as_str), Some("app-menu"));
        assert_eq!(data.take(SHOW_COUNT), Some(3));
        assert!(!data.contains(SHOW_COUNT));
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_mismatched_type_is_not_removed() {
        let mut data = ComputedData::new();
        data.insert(SHOW_COUNT, 7);

        const WRONG: DataKey<String> = DataKey::new("show_count");
        assert!(data.get(WRONG).is_none());
        assert!(data.take(WRONG).is_none());
        assert_eq!(data.get(SHOW_COUNT), Some(&7));
    }
}
