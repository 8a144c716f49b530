use std::fmt;
use std::path::{Path, PathBuf};

/// Handle to a texture registered with a [`TextureRegistry`].
///
/// A color texture's id doubles as the material key during aggregation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TextureId(u32);

impl TextureId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "texture#{}", self.0)
    }
}

/// How the texels are interpreted once decoded.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureRole {
    /// sRGB-encoded surface color.
    Color,
    /// Tangent-space normal map, linear.
    Normal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureEntry {
    pub path: PathBuf,
    pub role: TextureRole,
}

/// Interns texture files so every use of one file shares one handle.
#[derive(Debug, Clone)]
pub struct TextureRegistry {
    root: PathBuf,
    entries: Vec<TextureEntry>,
}

impl TextureRegistry {
    /// Creates an empty registry resolving file names against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), entries: Vec::new() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the handle for `file` in `role`, registering it on first use.
    pub fn register(&mut self, file: &str, role: TextureRole) -> TextureId {
        let path = self.root.join(file);
        if let Some(pos) = self
            .entries
            .iter()
            .position(|e| e.path == path && e.role == role)
        {
            return TextureId(pos as u32);
        }

        self.entries.push(TextureEntry { path, role });
        TextureId((self.entries.len() - 1) as u32)
    }

    #[inline]
    pub fn color(&mut self, file: &str) -> TextureId {
        self.register(file, TextureRole::Color)
    }

    #[inline]
    pub fn normal(&mut self, file: &str) -> TextureId {
        self.register(file, TextureRole::Normal)
    }

    pub fn get(&self, id: TextureId) -> Option<&TextureEntry> {
        self.entries.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (TextureId, &TextureEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (TextureId(i as u32), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_file_same_role_is_interned() {
        let mut reg = TextureRegistry::new("Resource");
        let a = reg.color("leg_texture.png");
        let b = reg.color("leg_texture.png");
        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn role_is_part_of_the_key() {
        let mut reg = TextureRegistry::new("Resource");
        let a = reg.color("x.png");
        let b = reg.normal("x.png");
        assert_ne!(a, b);
    }

    #[test]
    fn paths_resolve_against_root() {
        let mut reg = TextureRegistry::new("assets");
        let id = reg.color("floor.png");
        assert_eq!(reg.get(id).map(|e| e.path.clone()), Some(PathBuf::from("assets/floor.png")));
    }
}
