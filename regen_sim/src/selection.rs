use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use regen_protocol::{CategoryKind, InterventionId};
use thiserror::Error;

use crate::catalog::{Cardinality, InterventionCatalog};

/// An exclusive category already holds a different choice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{category} is locked to {active}; {requested} cannot be activated until reset")]
pub struct ExclusivityViolation {
    pub category: CategoryKind,
    pub active: InterventionId,
    pub requested: InterventionId,
}

/// Error that can occur when activating an intervention.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationError {
    #[error(transparent)]
    Exclusivity(#[from] ExclusivityViolation),
    #[error("category {0} is not part of the loaded catalog")]
    UnknownCategory(CategoryKind),
    #[error("intervention {intervention} is not a member of {category}")]
    UnknownIntervention {
        category: CategoryKind,
        intervention: InterventionId,
    },
}

/// Result of a successful activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The intervention was not active before.
    Inserted,
    /// The intervention was already active; nothing changed.
    Reconfirmed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Exclusive(Option<InterventionId>),
    Multi(BTreeSet<InterventionId>),
}

impl Slot {
    fn empty(cardinality: Cardinality) -> Self {
        match cardinality {
            Cardinality::Exclusive => Slot::Exclusive(None),
            Cardinality::Multi => Slot::Multi(BTreeSet::new()),
        }
    }

    fn clear(&mut self) {
        match self {
            Slot::Exclusive(choice) => *choice = None,
            Slot::Multi(set) => set.clear(),
        }
    }

    fn active(&self) -> Vec<InterventionId> {
        match self {
            Slot::Exclusive(choice) => choice.iter().cloned().collect(),
            Slot::Multi(set) => set.iter().cloned().collect(),
        }
    }
}

/// Mutable per-session record of which interventions are active.
#[derive(Debug, Clone)]
pub struct SelectionStore {
    catalog: Arc<InterventionCatalog>,
    slots: BTreeMap<CategoryKind, Slot>,
    revision: u64,
}

impl SelectionStore {
    pub fn new(catalog: Arc<InterventionCatalog>) -> Self {
        let slots = catalog
            .categories()
            .iter()
            .map(|category| (category.kind(), Slot::empty(category.cardinality())))
            .collect();
        Self {
            catalog,
            slots,
            revision: 0,
        }
    }

    /// Marks `intervention` active in `category`.
    ///
    /// Exclusive categories lock on their first choice: activating the same
    /// intervention again is a no-op, any other one is rejected and leaves the
    /// store untouched.
    pub fn activate(
        &mut self,
        category: CategoryKind,
        intervention: &InterventionId,
    ) -> Result<ActivationOutcome, ActivationError> {
        let definition = self
            .catalog
            .category(category)
            .ok_or(ActivationError::UnknownCategory(category))?;
        if definition.intervention(intervention).is_none() {
            return Err(ActivationError::UnknownIntervention {
                category,
                intervention: intervention.clone(),
            });
        }

        let slot = self
            .slots
            .get_mut(&category)
            .ok_or(ActivationError::UnknownCategory(category))?;

        let outcome = match slot {
            Slot::Exclusive(Some(active)) if active == intervention => {
                ActivationOutcome::Reconfirmed
            }
            Slot::Exclusive(Some(active)) => {
                return Err(ExclusivityViolation {
                    category,
                    active: active.clone(),
                    requested: intervention.clone(),
                }
                .into());
            }
            Slot::Exclusive(choice @ None) => {
                *choice = Some(intervention.clone());
                ActivationOutcome::Inserted
            }
            Slot::Multi(set) => {
                if set.insert(intervention.clone()) {
                    ActivationOutcome::Inserted
                } else {
                    ActivationOutcome::Reconfirmed
                }
            }
        };

        if outcome == ActivationOutcome::Inserted {
            self.revision = self.revision.wrapping_add(1);
        }
        Ok(outcome)
    }

    pub fn reset(&mut self) {
        for slot in self.slots.values_mut() {
            slot.clear();
        }
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn snapshot(&self) -> SelectionSnapshot {
        let active = self
            .slots
            .iter()
            .filter_map(|(kind, slot)| {
                let ids = slot.active();
                (!ids.is_empty()).then_some((*kind, ids))
            })
            .collect();
        SelectionSnapshot {
            revision: self.revision,
            active,
        }
    }

    /// Incremented whenever the active set changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether an exclusive category has already been committed to a choice.
    pub fn is_locked(&self, category: CategoryKind) -> bool {
        matches!(self.slots.get(&category), Some(Slot::Exclusive(Some(_))))
    }
}

/// Read-only view of the active interventions at one revision.
///
/// Only categories with at least one active intervention appear.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionSnapshot {
    revision: u64,
    active: BTreeMap<CategoryKind, Vec<InterventionId>>,
}

impl SelectionSnapshot {
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_active(&self, category: CategoryKind) -> bool {
        self.active.contains_key(&category)
    }

    pub fn active_in(&self, category: CategoryKind) -> &[InterventionId] {
        self.active
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn categories(&self) -> impl Iterator<Item = (CategoryKind, &[InterventionId])> {
        self.active
            .iter()
            .map(|(kind, ids)| (*kind, ids.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn to_map(&self) -> BTreeMap<CategoryKind, Vec<InterventionId>> {
        self.active.clone()
    }
}
