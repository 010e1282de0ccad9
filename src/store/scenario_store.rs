use crate::events::ScenarioDelta;
use crate::models::Scenario;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// The client-side cached projection of the scenario list.
///
/// Exactly two mutation entry points exist: [`ScenarioStore::apply_delta`]
/// (partial patch, last-applied-wins per field) and
/// [`ScenarioStore::replace_all`] (authoritative reload). Callers never
/// mutate cached entities directly, which keeps the patch semantics exact.
#[derive(Debug, Default)]
pub struct ScenarioStore {
    scenarios: RwLock<HashMap<Uuid, Scenario>>,
}

impl ScenarioStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a partial patch to the matching cached scenario.
    ///
    /// Unknown ids are ignored — the entity will arrive with the next
    /// authoritative reload. Applying the same delta twice is idempotent.
    pub fn apply_delta(&self, delta: &ScenarioDelta) {
        let mut scenarios = self.scenarios.write();
        if let Some(scenario) = scenarios.get_mut(&delta.scenario_id) {
            delta.apply_to(scenario);
        }
    }

    /// Replace the full projection with an authoritative snapshot
    pub fn replace_all(&self, snapshot: Vec<Scenario>) {
        let mut scenarios = self.scenarios.write();
        scenarios.clear();
        scenarios.extend(snapshot.into_iter().map(|s| (s.id, s)));
    }

    pub fn get(&self, id: Uuid) -> Option<Scenario> {
        self.scenarios.read().get(&id).cloned()
    }

    /// Snapshot of all cached scenarios, newest first
    pub fn list(&self) -> Vec<Scenario> {
        let mut items: Vec<Scenario> = self.scenarios.read().values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        items
    }

    pub fn len(&self) -> usize {
        self.scenarios.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.read().is_empty()
    }
}
