//! ProviderRegistry - the well-known global namespace providers are injected into.
//!
//! Mirrors the browser layout (`window.midnight.mnLace`, `window.cardano.midnight`)
//! as `namespace.key` slots. Cheap to clone; clones share the same slots, so a
//! provider injected after the session was built is visible to `detect()`.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use super::WalletProvider;
use crate::core::paths::slots;

type Slots = BTreeMap<String, BTreeMap<String, Arc<dyn WalletProvider>>>;

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    slots: Arc<RwLock<Slots>>,
}

impl ProviderRegistry {
    pub fn new() -> Self { Self::default() }

    /// Inject a provider at `namespace.key`, replacing any previous one.
    pub fn inject(&self, namespace: &str, key: &str, provider: Arc<dyn WalletProvider>) {
        let mut guard = self.slots.write().unwrap_or_else(|p| p.into_inner());
        guard.entry(namespace.to_string()).or_default().insert(key.to_string(), provider);
    }

    /// Inject at the canonical `midnight.mnLace` slot.
    pub fn inject_lace(&self, provider: Arc<dyn WalletProvider>) {
        self.inject(slots::MIDNIGHT, slots::MN_LACE, provider);
    }

    pub fn remove(&self, namespace: &str, key: &str) -> Option<Arc<dyn WalletProvider>> {
        let mut guard = self.slots.write().unwrap_or_else(|p| p.into_inner());
        let ns = guard.get_mut(namespace)?;
        let removed = ns.remove(key);
        if ns.is_empty() { guard.remove(namespace); }
        removed
    }

    pub fn clear(&self) {
        self.slots.write().unwrap_or_else(|p| p.into_inner()).clear();
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<Arc<dyn WalletProvider>> {
        let guard = self.slots.read().unwrap_or_else(|p| p.into_inner());
        guard.get(namespace)?.get(key).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().unwrap_or_else(|p| p.into_inner()).is_empty()
    }

    /// Resolve the provider to use. Prefers `midnight.mnLace`, then
    /// `midnight.lace`, then any other `midnight.*` entry, then the legacy
    /// `cardano.midnight` slot.
    pub fn discover(&self) -> Option<(String, Arc<dyn WalletProvider>)> {
        let guard = self.slots.read().unwrap_or_else(|p| p.into_inner());
        if let Some(midnight) = guard.get(slots::MIDNIGHT) {
            for key in slots::PREFERRED {
                if let Some(p) = midnight.get(*key) {
                    return Some((format!("{}.{}", slots::MIDNIGHT, key), p.clone()));
                }
            }
            if let Some((key, p)) = midnight.iter().next() {
                return Some((format!("{}.{}", slots::MIDNIGHT, key), p.clone()));
            }
        }
        guard
            .get(slots::CARDANO)
            .and_then(|ns| ns.get(slots::LEGACY))
            .map(|p| (format!("{}.{}", slots::CARDANO, slots::LEGACY), p.clone()))
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.slots.read().unwrap_or_else(|p| p.into_inner());
        let names: Vec<String> = guard
            .iter()
            .flat_map(|(ns, keys)| keys.keys().map(move |k| format!("{ns}.{k}")))
            .collect();
        f.debug_struct("ProviderRegistry").field("slots", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{FixtureProvider, FixtureSpec};

    fn provider(name: &str) -> Arc<dyn WalletProvider> {
        Arc::new(FixtureProvider::new(FixtureSpec { name: name.into(), ..Default::default() }))
    }

    #[test]
    fn empty_registry_discovers_nothing() {
        assert!(ProviderRegistry::new().discover().is_none());
    }

    #[test]
    fn prefers_mn_lace_over_lace_and_others() {
        let registry = ProviderRegistry::new();
        registry.inject("midnight", "aardvark", provider("other"));
        registry.inject("midnight", "lace", provider("lace"));
        registry.inject("cardano", "midnight", provider("legacy"));
        let (slot, p) = registry.discover().unwrap();
        assert_eq!(slot, "midnight.lace");
        assert_eq!(p.name(), "lace");

        registry.inject_lace(provider("mnLace"));
        let (slot, p) = registry.discover().unwrap();
        assert_eq!(slot, "midnight.mnLace");
        assert_eq!(p.name(), "mnLace");
    }

    #[test]
    fn any_midnight_entry_beats_legacy() {
        let registry = ProviderRegistry::new();
        registry.inject("cardano", "midnight", provider("legacy"));
        registry.inject("midnight", "zeta", provider("zeta"));
        assert_eq!(registry.discover().unwrap().0, "midnight.zeta");
    }

    #[test]
    fn legacy_slot_is_last_resort() {
        let registry = ProviderRegistry::new();
        registry.inject("cardano", "midnight", provider("legacy"));
        assert_eq!(registry.discover().unwrap().0, "cardano.midnight");
    }

    #[test]
    fn clones_share_slots() {
        let registry = ProviderRegistry::new();
        let view = registry.clone();
        registry.inject_lace(provider("late"));
        assert!(view.discover().is_some());
        assert!(view.remove("midnight", "mnLace").is_some());
        assert!(registry.is_empty());
    }
}
