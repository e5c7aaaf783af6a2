use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::assets::AssetResolver;
use crate::catalog::InterventionCatalog;
use crate::controller::SimulationController;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct SessionEntry {
    controller: SimulationController,
    presentation_epoch: u64,
}

/// Independent sessions sharing one catalog and asset resolver.
///
/// Each session also carries a presentation epoch. Hosts bump it whenever they
/// put a new image on screen and tag any deferred follow-up with the value, so
/// a stale follow-up can tell it has been overtaken.
pub struct SessionRegistry {
    catalog: Arc<InterventionCatalog>,
    assets: Arc<dyn AssetResolver>,
    base_seed: Option<u64>,
    next_id: u64,
    sessions: BTreeMap<SessionId, SessionEntry>,
}

impl SessionRegistry {
    pub fn new(catalog: Arc<InterventionCatalog>, assets: Arc<dyn AssetResolver>) -> Self {
        Self {
            catalog,
            assets,
            base_seed: None,
            next_id: 1,
            sessions: BTreeMap::new(),
        }
    }

    /// Seeds every session from `base ^ id`, making runs reproducible per session.
    pub fn with_base_seed(mut self, seed: Option<u64>) -> Self {
        self.base_seed = seed;
        self
    }

    pub fn catalog(&self) -> &Arc<InterventionCatalog> {
        &self.catalog
    }

    pub fn open(&mut self) -> SessionId {
        let id = SessionId(self.next_id);
        self.next_id += 1;
        let catalog = Arc::clone(&self.catalog);
        let assets = Arc::clone(&self.assets);
        let controller = match self.base_seed {
            Some(base) => SimulationController::with_seed(catalog, assets, base ^ id.0),
            None => SimulationController::new(catalog, assets),
        };
        self.sessions.insert(
            id,
            SessionEntry {
                controller,
                presentation_epoch: 0,
            },
        );
        tracing::info!(
            target: "regen_sim::server",
            session = %id,
            open_sessions = self.sessions.len(),
            "session.opened"
        );
        id
    }

    pub fn get(&self, id: SessionId) -> Option<&SimulationController> {
        self.sessions.get(&id).map(|entry| &entry.controller)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut SimulationController> {
        self.sessions.get_mut(&id).map(|entry| &mut entry.controller)
    }

    pub fn close(&mut self, id: SessionId) -> bool {
        let removed = self.sessions.remove(&id).is_some();
        if removed {
            tracing::info!(
                target: "regen_sim::server",
                session = %id,
                open_sessions = self.sessions.len(),
                "session.closed"
            );
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.sessions.keys().copied()
    }

    /// Marks a new image as presented and returns its epoch.
    pub fn begin_presentation(&mut self, id: SessionId) -> Option<u64> {
        self.sessions.get_mut(&id).map(|entry| {
            entry.presentation_epoch += 1;
            entry.presentation_epoch
        })
    }

    pub fn presentation_is_current(&self, id: SessionId, epoch: u64) -> bool {
        self.sessions
            .get(&id)
            .is_some_and(|entry| entry.presentation_epoch == epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::InMemoryAssets;
    use regen_protocol::{CategoryKind, InterventionId};

    fn registry() -> SessionRegistry {
        SessionRegistry::new(InterventionCatalog::builtin(), Arc::new(InMemoryAssets::new()))
            .with_base_seed(Some(99))
    }

    #[test]
    fn sessions_do_not_share_selection() {
        let mut registry = registry();
        let a = registry.open();
        let b = registry.open();
        assert_ne!(a, b);

        registry
            .get_mut(a)
            .expect("session a open")
            .activate(CategoryKind::SupportCell, &InterventionId::new("Schwann"))
            .expect("a accepts Schwann");
        let other = registry
            .get_mut(b)
            .expect("session b open")
            .activate(CategoryKind::SupportCell, &InterventionId::new("SchwannLike"));
        assert!(other.is_ok());
        assert!(registry
            .get(b)
            .expect("session b open")
            .snapshot()
            .active_in(CategoryKind::SupportCell)
            .contains(&InterventionId::new("SchwannLike")));
    }

    #[test]
    fn closed_sessions_are_gone() {
        let mut registry = registry();
        let id = registry.open();
        assert_eq!(registry.len(), 1);
        assert!(registry.close(id));
        assert!(!registry.close(id));
        assert!(registry.get(id).is_none());
        assert!(registry.is_empty());
        assert_eq!(registry.begin_presentation(id), None);
    }

    #[test]
    fn newer_presentation_supersedes_older_epoch() {
        let mut registry = registry();
        let id = registry.open();
        let first = registry.begin_presentation(id).expect("session open");
        assert!(registry.presentation_is_current(id, first));
        let second = registry.begin_presentation(id).expect("session open");
        assert!(!registry.presentation_is_current(id, first));
        assert!(registry.presentation_is_current(id, second));
    }

    #[test]
    fn base_seed_makes_sessions_reproducible() {
        let mut left = registry();
        let mut right = registry();
        let a = left.open();
        let b = right.open();
        let left_runs: Vec<_> = (0..20)
            .map(|_| left.get_mut(a).expect("open").run().success)
            .collect();
        let right_runs: Vec<_> = (0..20)
            .map(|_| right.get_mut(b).expect("open").run().success)
            .collect();
        assert_eq!(left_runs, right_runs);
    }
}
