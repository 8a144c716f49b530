//! Insertion-ordered per-material storage.
//!
//! Aggregation results must iterate materials in the order they were first
//! produced by a depth-first walk of the scene graph, so the map keeps its
//! entries in a `Vec` instead of hashing. Scenes carry a handful of
//! materials, so lookups are linear.

use crate::texture::TextureId;

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialMap<T> {
    entries: Vec<(TextureId, T)>,
}

impl<T> Default for MaterialMap<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> MaterialMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, material: TextureId) -> bool {
        self.get(material).is_some()
    }

    pub fn get(&self, material: TextureId) -> Option<&T> {
        self.entries
            .iter()
            .find(|(id, _)| *id == material)
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, material: TextureId) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|(id, _)| *id == material)
            .map(|(_, v)| v)
    }

    /// Returns the entry for `material`, appending `make()` if absent.
    pub fn get_or_insert_with(&mut self, material: TextureId, make: impl FnOnce() -> T) -> &mut T {
        let pos = match self.entries.iter().position(|(id, _)| *id == material) {
            Some(pos) => pos,
            None => {
                self.entries.push((material, make()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[pos].1
    }

    /// Stores `value`, keeping the original position when the key exists.
    pub fn insert(&mut self, material: TextureId, value: T) -> Option<T> {
        match self.get_mut(material) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((material, value));
                None
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = TextureId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TextureId, &T)> {
        self.entries.iter().map(|(id, v)| (*id, v))
    }
}

impl<T: Default> MaterialMap<T> {
    pub fn entry(&mut self, material: TextureId) -> &mut T {
        self.get_or_insert_with(material, T::default)
    }
}

impl<T> IntoIterator for MaterialMap<T> {
    type Item = (TextureId, T);
    type IntoIter = std::vec::IntoIter<(TextureId, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<T> FromIterator<(TextureId, T)> for MaterialMap<T> {
    fn from_iter<I: IntoIterator<Item = (TextureId, T)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (id, v) in iter {
            map.insert(id, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TextureRegistry;

    fn ids() -> (TextureId, TextureId, TextureId) {
        let mut reg = TextureRegistry::new("");
        (reg.color("a"), reg.color("b"), reg.color("c"))
    }

    #[test]
    fn keeps_first_insertion_order() {
        let (a, b, c) = ids();
        let mut m = MaterialMap::new();
        m.insert(c, 1);
        m.insert(a, 2);
        m.insert(b, 3);
        m.insert(c, 4);
        assert_eq!(m.keys().collect::<Vec<_>>(), vec![c, a, b]);
        assert_eq!(m.get(c), Some(&4));
    }

    #[test]
    fn entry_defaults_missing_keys() {
        let (a, _, _) = ids();
        let mut m: MaterialMap<u32> = MaterialMap::new();
        *m.entry(a) += 3;
        *m.entry(a) += 4;
        assert_eq!(m.get(a), Some(&7));
        assert_eq!(m.len(), 1);
    }
}
