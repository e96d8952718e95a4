use fxhash::FxHashMap;
use std::borrow::Borrow;
use std::hash::Hash;
use std::mem;

/// A name-to-child map optimized for the common case of a directory having
/// very few entries: no heap-allocated hash table is built until a second
/// child arrives.
pub(crate) struct Map<K, V> {
    inner: Inner<K, V>,
}

enum Inner<K, V> {
    Empty,
    One(K, V),
    Many(Box<FxHashMap<K, V>>),
}

impl<K, V> Default for Map<K, V> {
    fn default() -> Self {
        Map {
            inner: Inner::Empty,
        }
    }
}

impl<K, V> Map<K, V>
where
    K: Eq + Hash,
{
    pub(crate) fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match &self.inner {
            Inner::One(k, v) if k.borrow() == key => Some(v),
            Inner::Many(map) => map.get(key),
            Inner::Empty | Inner::One(..) => None,
        }
    }

    pub(crate) fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    pub(crate) fn is_empty(&self) -> bool {
        match &self.inner {
            Inner::Empty => true,
            Inner::One(..) => false,
            Inner::Many(map) => map.is_empty(),
        }
    }

    /// Inserts `value` under `key`. Returns `false` without modifying the
    /// map if `key` was already present.
    pub(crate) fn insert(&mut self, key: K, value: V) -> bool {
        match &self.inner {
            Inner::Empty => {
                self.inner = Inner::One(key, value);
                true
            }
            Inner::One(k, _) if *k == key => false,
            Inner::One(..) => {
                let (old_key, old_value) = match mem::replace(&mut self.inner, Inner::Empty) {
                    Inner::One(k, v) => (k, v),
                    _ => unreachable!(),
                };
                let mut map: FxHashMap<K, V> = Default::default();
                map.insert(old_key, old_value);
                map.insert(key, value);
                self.inner = Inner::Many(Box::new(map));
                true
            }
            Inner::Many(_) => {
                let map = match &mut self.inner {
                    Inner::Many(map) => map,
                    _ => unreachable!(),
                };
                if map.contains_key(&key) {
                    false
                } else {
                    map.insert(key, value);
                    true
                }
            }
        }
    }

    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match &mut self.inner {
            Inner::One(k, _) if (*k).borrow() == key => {
                match mem::replace(&mut self.inner, Inner::Empty) {
                    Inner::One(_, v) => Some(v),
                    _ => unreachable!(),
                }
            }
            Inner::Many(map) => map.remove(key),
            Inner::Empty | Inner::One(..) => None,
        }
    }

    /// Keys in unspecified order.
    pub(crate) fn keys(&self) -> Box<dyn Iterator<Item = &K> + '_> {
        match &self.inner {
            Inner::Empty => Box::new(std::iter::empty()),
            Inner::One(k, _) => Box::new(std::iter::once(k)),
            Inner::Many(map) => Box::new(map.keys()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Map;

    #[test]
    fn single_entry_avoids_hash_map() {
        let mut map: Map<Box<str>, i32> = Map::default();
        assert!(map.insert(Box::from("a"), 1));
        assert_eq!(map.get("a"), Some(&1));
        assert!(!map.insert(Box::from("a"), 2));
        assert_eq!(map.get("a"), Some(&1));
    }

    #[test]
    fn grows_past_one_entry() {
        let mut map: Map<Box<str>, i32> = Map::default();
        map.insert(Box::from("a"), 1);
        map.insert(Box::from("b"), 2);
        assert_eq!(map.get("a"), Some(&1));
        assert_eq!(map.get("b"), Some(&2));
        assert_eq!(map.remove("a"), Some(1));
        assert_eq!(map.get("a"), None);
        assert_eq!(map.get("b"), Some(&2));
    }

    #[test]
    fn empty_after_removing_only_entry() {
        let mut map: Map<Box<str>, i32> = Map::default();
        map.insert(Box::from("a"), 1);
        assert_eq!(map.remove("a"), Some(1));
        assert!(map.is_empty());
    }
}
