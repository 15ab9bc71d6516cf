/// Mechanic workload ranking
///
/// Counts, per mechanic, the distinct service tickets they are a member
/// of and orders the result busiest first. Mechanics with no tickets are
/// left out. Nothing is cached; every call reads the current link rows.

use crate::error::ShopResult;
use crate::models::{Mechanic, MechanicWorkload};
use crate::store::{Membership, ResourceStore};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct WorkloadAggregator {
    store: Arc<dyn ResourceStore>,
}

impl WorkloadAggregator {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Mechanics ordered by ticket count descending, ties by ascending id
    pub async fn most_worked_mechanics(&self) -> ShopResult<Vec<MechanicWorkload>> {
        let mut tx = self.store.begin().await?;
        let mechanics = tx.list_mechanics().await?;
        let memberships = tx.memberships().await?;
        tx.commit().await?;

        let ranking = rank_mechanics(mechanics, &memberships);
        debug!(ranked = ranking.len(), "Computed mechanic workload");
        Ok(ranking)
    }
}

/// Pure ranking over a snapshot of mechanics and link rows
pub fn rank_mechanics(mechanics: Vec<Mechanic>, memberships: &[Membership]) -> Vec<MechanicWorkload> {
    let mut tickets: HashMap<i64, HashSet<i64>> = HashMap::new();
    for link in memberships {
        tickets
            .entry(link.mechanic_id)
            .or_default()
            .insert(link.ticket_id);
    }

    let mut ranking: Vec<MechanicWorkload> = mechanics
        .into_iter()
        .filter_map(|mechanic| {
            let ticket_count = tickets.get(&mechanic.id).map_or(0, |set| set.len() as u64);
            (ticket_count > 0).then_some(MechanicWorkload {
                mechanic,
                ticket_count,
            })
        })
        .collect();

    ranking.sort_by(|a, b| {
        b.ticket_count
            .cmp(&a.ticket_count)
            .then(a.mechanic.id.cmp(&b.mechanic.id))
    });
    ranking
}
