use slotmap::{SecondaryMap, SlotMap};

use crate::agent::Agent;
use crate::types::AgentId;

/// All agents ever registered, living and dead, in registration order.
///
/// Registration order is the processing order of a turn.
#[derive(Debug, Default, Clone)]
pub struct Population {
    agents: SlotMap<AgentId, Agent>,
    order: Vec<AgentId>,
    serials: SecondaryMap<AgentId, u64>,
    next_serial: u64,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, agent: Agent) -> AgentId {
        let id = self.agents.insert(agent);
        self.order.push(id);
        self.serials.insert(id, self.next_serial);
        self.next_serial += 1;
        id
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(id)
    }

    /// Two distinct agents mutably at once.
    pub fn pair_mut(&mut self, a: AgentId, b: AgentId) -> Option<[&mut Agent; 2]> {
        self.agents.get_disjoint_mut([a, b])
    }

    pub fn order(&self) -> &[AgentId] {
        &self.order
    }

    /// Registration serial; sorts like registration order and survives pruning.
    pub fn serial(&self, id: AgentId) -> Option<u64> {
        self.serials.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &Agent)> + '_ {
        self.order.iter().filter_map(|&id| self.agents.get(id).map(|a| (id, a)))
    }

    pub fn living(&self) -> impl Iterator<Item = (AgentId, &Agent)> + '_ {
        self.iter().filter(|(_, a)| a.alive)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn alive_count(&self) -> usize {
        self.agents.values().filter(|a| a.alive).count()
    }

    /// Drop dead agents, returning their ids.
    pub fn prune_dead(&mut self) -> Vec<AgentId> {
        let dead: Vec<AgentId> = self
            .order
            .iter()
            .copied()
            .filter(|&id| self.agents.get(id).is_some_and(|a| !a.alive))
            .collect();
        for &id in &dead {
            self.agents.remove(id);
            self.serials.remove(id);
        }
        self.order.retain(|id| self.agents.contains_key(*id));
        dead
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Traits;
    use crate::types::PerCommodity;

    fn agent() -> Agent {
        Agent::new(Traits::default(), PerCommodity::splat(1.0))
    }

    #[test]
    fn test_registration_order_kept_through_pruning() {
        let mut pop = Population::new();
        let ids: Vec<AgentId> = (0..4).map(|_| pop.register(agent())).collect();
        pop.get_mut(ids[1]).unwrap().alive = false;

        assert_eq!(pop.alive_count(), 3);
        assert_eq!(pop.living().count(), 3);
        assert_eq!(pop.len(), 4);

        let dead = pop.prune_dead();
        assert_eq!(dead, vec![ids[1]]);
        assert_eq!(pop.order(), &[ids[0], ids[2], ids[3]]);
        assert!(pop.get(ids[1]).is_none());
        assert_eq!(pop.serial(ids[3]), Some(3));
        assert_eq!(pop.serial(ids[1]), None);
    }

    #[test]
    fn test_pair_mut_requires_distinct_ids() {
        let mut pop = Population::new();
        let a = pop.register(agent());
        let b = pop.register(agent());
        assert!(pop.pair_mut(a, a).is_none());
        let [x, y] = pop.pair_mut(a, b).unwrap();
        x.reserve.sugar = 9.0;
        y.reserve.sugar = 3.0;
        assert_eq!(pop.get(a).unwrap().reserve.sugar, 9.0);
    }
}
