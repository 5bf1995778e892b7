//! One-shot snapshot renaming.
//!
//! When renaming is requested, the first snapshot name the run encounters
//! is paired with a freshly generated 32-hex-character identifier. Every
//! later sighting of that same name — in BEGIN records, in the `tosnap`
//! property, in snapshot property keys — resolves to the same identifier;
//! any other name passes through untouched.

use uuid::Uuid;

/// Process-wide single-shot rename cache.
#[derive(Clone, Debug, Default)]
pub struct SnapshotAliaser {
    enabled: bool,
    cached: Option<(String, String)>,
}

impl SnapshotAliaser {
    /// Creates an aliaser; a disabled aliaser is the identity function.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            cached: None,
        }
    }

    /// Reports whether renaming is active.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Resolves `original` to its alias.
    ///
    /// The first non-empty name seen is cached together with a new random
    /// identifier. Later calls return the cached identifier only for that
    /// exact name; everything else comes back unchanged.
    pub fn alias(&mut self, original: &str) -> String {
        if !self.enabled || original.is_empty() {
            return original.to_owned();
        }
        match &self.cached {
            Some((cached, alias)) if cached == original => alias.clone(),
            Some(_) => original.to_owned(),
            None => {
                let alias = Uuid::new_v4().simple().to_string();
                self.cached = Some((original.to_owned(), alias.clone()));
                alias
            }
        }
    }

    /// Forgets the cached name, restoring first-sight behavior.
    pub fn reset(&mut self) {
        self.cached = None;
    }
}
