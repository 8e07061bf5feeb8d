//! Registries for named items.
//!
//! Provides a unified `Registry` trait and the `SheetRegistry` a tilemap uses
//! to resolve `tilesheetId` references.

use std::collections::BTreeMap;

use crate::tilemap::MapError;
use crate::tilesheet::TileSheet;

/// Common trait for registries that store named items.
///
/// # Example
///
/// ```
/// use pixtile::registry::{Registry, SheetRegistry};
/// use pixtile::tilesheet::{ImageSource, TileSheet};
///
/// let mut registry = SheetRegistry::new();
/// registry.register("house", TileSheet::new(ImageSource::None, 16)).unwrap();
///
/// assert!(registry.contains("house"));
/// assert_eq!(registry.len(), 1);
/// ```
pub trait Registry<V> {
    /// Check if an item with the given name exists in the registry.
    fn contains(&self, name: &str) -> bool;

    /// Get an item by name.
    fn get(&self, name: &str) -> Option<&V>;

    /// Get the number of items in the registry.
    fn len(&self) -> usize;

    /// Check if the registry is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all items from the registry.
    fn clear(&mut self);

    /// Get an iterator over all names in the registry.
    fn names(&self) -> Box<dyn Iterator<Item = &String> + '_>;
}

/// Tile sheets keyed by sheet id.
#[derive(Debug, Clone, Default)]
pub struct SheetRegistry {
    sheets: BTreeMap<String, TileSheet>,
}

impl SheetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sheet, replacing any sheet with the same id.
    ///
    /// An empty id is a programming error and is rejected.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        sheet: TileSheet,
    ) -> Result<Option<TileSheet>, MapError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(MapError::EmptySheetId);
        }
        Ok(self.sheets.insert(id, sheet))
    }

    /// Remove a sheet. Entries referencing it stay in the map.
    pub fn unregister(&mut self, id: &str) -> Option<TileSheet> {
        self.sheets.remove(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut TileSheet> {
        self.sheets.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TileSheet)> {
        self.sheets.iter().map(|(id, sheet)| (id.as_str(), sheet))
    }
}

impl Registry<TileSheet> for SheetRegistry {
    fn contains(&self, name: &str) -> bool {
        self.sheets.contains_key(name)
    }

    fn get(&self, name: &str) -> Option<&TileSheet> {
        self.sheets.get(name)
    }

    fn len(&self) -> usize {
        self.sheets.len()
    }

    fn clear(&mut self) {
        self.sheets.clear();
    }

    fn names(&self) -> Box<dyn Iterator<Item = &String> + '_> {
        Box::new(self.sheets.keys())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tilesheet::ImageSource;

    #[test]
    fn test_registry_new_is_empty() {
        let registry = SheetRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.contains("anything"));
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = SheetRegistry::new();
        registry.register("a", TileSheet::new(ImageSource::None, 8)).unwrap();
        let old = registry.register("a", TileSheet::new(ImageSource::None, 16)).unwrap();

        assert_eq!(old.map(|s| s.slice_px()), Some(8));
        assert_eq!(registry.get("a").map(|s| s.slice_px()), Some(16));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_empty_id_rejected() {
        let mut registry = SheetRegistry::new();
        let result = registry.register("", TileSheet::new(ImageSource::None, 8));
        assert_eq!(result, Err(MapError::EmptySheetId));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_and_names() {
        let mut registry = SheetRegistry::new();
        registry.register("b", TileSheet::new(ImageSource::None, 8)).unwrap();
        registry.register("a", TileSheet::new(ImageSource::None, 8)).unwrap();

        let names: Vec<&String> = registry.names().collect();
        assert_eq!(names, vec!["a", "b"]);

        assert!(registry.unregister("a").is_some());
        assert!(registry.unregister("a").is_none());
        assert_eq!(registry.len(), 1);
    }
}
