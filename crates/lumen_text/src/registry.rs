//! Bitmap font registry
//!
//! Maps font names to parsed [`FontDescriptor`]s. A registry is an explicit
//! service: create one, wrap it in an `Arc`, and hand it to every text field
//! that should see the same fonts. Lookups take a shared lock and may run on
//! any thread; registration and unregistration take the exclusive lock.

use crate::config::TextConfig;
use crate::font::FontDescriptor;
use crate::mini::{mini_font, MINI_FONT_NAME};
use crate::texture::Texture;
use crate::Result;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Registry of bitmap fonts keyed by name
pub struct FontRegistry {
    /// Registered fonts (last write wins on a name collision)
    fonts: RwLock<FxHashMap<String, Arc<FontDescriptor>>>,
    /// Built-in debug font, created on first lookup
    mini: OnceLock<Arc<FontDescriptor>>,
}

impl FontRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            fonts: RwLock::new(FxHashMap::default()),
            mini: OnceLock::new(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, FxHashMap<String, Arc<FontDescriptor>>> {
        // Every mutation is a single insert/remove, so a poisoned map is still consistent
        self.fonts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FxHashMap<String, Arc<FontDescriptor>>> {
        self.fonts.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a font under `name`, or under its intrinsic name when `None`
    ///
    /// Replaces any font already stored under the same name. Fails with
    /// `InvalidFontDescriptor` (leaving the registry untouched) when the
    /// descriptor has no atlas texture or no glyphs.
    ///
    /// Returns the name the font was stored under.
    pub fn register(&self, font: FontDescriptor, name: Option<&str>) -> Result<String> {
        font.validate()?;

        let name = name.unwrap_or(font.name()).to_string();
        let glyph_count = font.glyph_count();
        let previous = self.write().insert(name.clone(), Arc::new(font));

        if previous.is_some() {
            tracing::warn!("Bitmap font '{}' replaced an existing registration", name);
        }
        tracing::debug!("Registered bitmap font '{}' ({} glyphs)", name, glyph_count);

        Ok(name)
    }

    /// Load a BMFont XML file and register it
    ///
    /// Blocks for the file read and atlas decode; call it off the render
    /// thread if that matters. With `texture: None` the atlas image named in
    /// the descriptor is decoded from disk.
    pub fn register_from_file(
        &self,
        path: impl AsRef<Path>,
        texture: Option<Arc<dyn Texture>>,
        name: Option<&str>,
    ) -> Result<String> {
        let font = FontDescriptor::from_file(path.as_ref(), texture)?;
        self.register(font, name)
    }

    /// Register every font listed in the configuration, in order
    ///
    /// Stops at the first failure; fonts registered before it stay registered.
    pub fn preload(&self, config: &TextConfig) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(config.fonts.len());
        for entry in &config.fonts {
            names.push(self.register_from_file(&entry.path, None, entry.name.as_deref())?);
        }
        Ok(names)
    }

    /// Remove a registration; unknown names are ignored
    pub fn unregister(&self, name: &str) -> Option<Arc<FontDescriptor>> {
        let removed = self.write().remove(name);
        if removed.is_some() {
            tracing::debug!("Unregistered bitmap font '{}'", name);
        }
        removed
    }

    /// Find the font registered under `name`
    ///
    /// [`MINI_FONT_NAME`] resolves to the built-in debug font unless a font was
    /// explicitly registered under that name.
    pub fn lookup(&self, name: &str) -> Option<Arc<FontDescriptor>> {
        if let Some(font) = self.read().get(name) {
            return Some(Arc::clone(font));
        }
        if name == MINI_FONT_NAME {
            return Some(Arc::clone(self.mini.get_or_init(|| Arc::new(mini_font()))));
        }
        None
    }

    /// Whether `name` resolves to a bitmap font
    pub fn contains(&self, name: &str) -> bool {
        name == MINI_FONT_NAME || self.read().contains_key(name)
    }

    /// Explicitly registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of explicit registrations (the built-in font is not counted)
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FontRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontRegistry")
            .field("fonts", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::Glyph;
    use crate::texture::AtlasTexture;
    use crate::TextError;
    use lumen_core::Rect;

    fn font(name: &str) -> FontDescriptor {
        FontDescriptor::new(name, 20.0, 24.0)
            .with_glyph(Glyph::new('a', Rect::new(0.0, 0.0, 8.0, 10.0), 10.0))
            .with_glyph(Glyph::new('b', Rect::new(10.0, 0.0, 8.0, 10.0), 11.0))
            .with_kerning('a', 'b', -2.0)
            .with_texture(Arc::new(AtlasTexture::blank(64, 64)))
    }

    #[test]
    fn test_register_uses_intrinsic_name() {
        let registry = FontRegistry::new();
        let name = registry.register(font("Pixel"), None).unwrap();
        assert_eq!(name, "Pixel");
        assert!(registry.lookup("Pixel").is_some());
    }

    #[test]
    fn test_register_with_explicit_name() {
        let registry = FontRegistry::new();
        let name = registry.register(font("Pixel"), Some("hud")).unwrap();
        assert_eq!(name, "hud");
        assert!(registry.lookup("Pixel").is_none());
        assert_eq!(registry.lookup("hud").unwrap().name(), "Pixel");
    }

    #[test]
    fn test_lookup_round_trips_metrics() {
        let registry = FontRegistry::new();
        let original = font("Pixel");
        registry.register(original.clone(), None).unwrap();

        let found = registry.lookup("Pixel").unwrap();
        assert_eq!(found.glyphs(), original.glyphs());
        assert_eq!(found.kerning_pairs(), original.kerning_pairs());
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = FontRegistry::new();
        registry.register(font("first"), Some("shared")).unwrap();
        registry.register(font("second"), Some("shared")).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("shared").unwrap().name(), "second");
    }

    #[test]
    fn test_invalid_descriptor_leaves_registry_unchanged() {
        let registry = FontRegistry::new();
        registry.register(font("keep"), Some("slot")).unwrap();

        let textureless = FontDescriptor::new("broken", 10.0, 12.0).with_glyph(Glyph::new(
            'x',
            Rect::new(0.0, 0.0, 4.0, 4.0),
            5.0,
        ));
        let err = registry.register(textureless, Some("slot")).unwrap_err();
        assert!(matches!(err, TextError::InvalidFontDescriptor(_)));
        assert_eq!(registry.lookup("slot").unwrap().name(), "keep");
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = FontRegistry::new();
        registry.register(font("gone"), None).unwrap();

        assert!(registry.unregister("gone").is_some());
        for _ in 0..3 {
            assert!(registry.unregister("gone").is_none());
            assert!(registry.lookup("gone").is_none());
        }
        assert!(registry.unregister("never-registered").is_none());
    }

    #[test]
    fn test_mini_font_is_built_in() {
        let registry = FontRegistry::new();
        assert!(registry.is_empty());
        let mini = registry.lookup(MINI_FONT_NAME).unwrap();
        assert_eq!(mini.name(), MINI_FONT_NAME);
        assert!(registry.contains(MINI_FONT_NAME));

        // Same instance every time
        let again = registry.lookup(MINI_FONT_NAME).unwrap();
        assert!(Arc::ptr_eq(&mini, &again));
    }

    #[test]
    fn test_registered_font_shadows_mini() {
        let registry = FontRegistry::new();
        registry.register(font("custom"), Some(MINI_FONT_NAME)).unwrap();
        assert_eq!(registry.lookup(MINI_FONT_NAME).unwrap().name(), "custom");

        registry.unregister(MINI_FONT_NAME);
        assert_eq!(registry.lookup(MINI_FONT_NAME).unwrap().name(), MINI_FONT_NAME);
    }

    #[test]
    fn test_registries_are_isolated() {
        let a = FontRegistry::new();
        let b = FontRegistry::new();
        a.register(font("only-a"), None).unwrap();
        assert!(b.lookup("only-a").is_none());
    }

    #[test]
    fn test_concurrent_lookups_and_registration() {
        let registry = Arc::new(FontRegistry::new());
        registry.register(font("base"), None).unwrap();

        std::thread::scope(|scope| {
            for i in 0..4 {
                let registry = Arc::clone(&registry);
                scope.spawn(move || {
                    for _ in 0..100 {
                        assert!(registry.lookup("base").is_some());
                    }
                    registry
                        .register(font("worker"), Some(&format!("worker-{}", i)))
                        .unwrap();
                });
            }
        });

        assert_eq!(registry.len(), 5);
        assert_eq!(
            registry.names(),
            vec!["base", "worker-0", "worker-1", "worker-2", "worker-3"]
        );
    }
}
