use super::super::World;
use crate::interaction::{
    bacterial_attack_damage, bacterial_attack_eligible, competition_strength, engulf_chance,
    engulf_eligible, in_interaction_range, infection_chance, infection_eligible, threat_score,
};
use crate::organism::{Offspring, OrganismKind};
use rand::Rng;

/// Padding added to the contact query radius so the bucket scan covers the
/// largest possible size-to-size reach.
const CONTACT_QUERY_PAD: f64 = 16.0;

impl World {
    /// Pairwise interactions for this tick, in a fixed order: infection
    /// attempts, host draining, bacterial attacks, bacterial competition,
    /// engulfment, viral bursts, then cleanup of cross-references invalidated
    /// by this tick's deaths.
    pub(in crate::world) fn interaction_phase(&mut self) {
        self.run_infections();
        self.drain_hosts();
        self.run_bacterial_attacks();
        self.run_bacterial_competition();
        self.run_engulfment();
        self.run_viral_bursts();
        self.resolve_stale_references();
    }

    fn run_infections(&mut self) {
        let contact_radius = self.config.interaction_radius + CONTACT_QUERY_PAD;
        let mut attempts: Vec<(usize, usize)> = Vec::new();
        for (vi, virus) in self.organisms.iter().enumerate() {
            if !virus.alive || !virus.kind.is_virus() {
                continue;
            }
            for ci in self.spatial.query_within(virus.position, contact_radius, Some(vi)) {
                let cell = &self.organisms[ci];
                if infection_eligible(virus, cell)
                    && in_interaction_range(virus, cell, self.config.interaction_radius)
                {
                    attempts.push((vi, ci));
                }
            }
        }

        for (vi, ci) in attempts {
            // An earlier attempt this tick may have claimed either party.
            if !infection_eligible(&self.organisms[vi], &self.organisms[ci]) {
                continue;
            }
            let chance = infection_chance(&self.organisms[vi], &self.organisms[ci], &self.config);
            if !self.rng.random_bool(chance) {
                continue;
            }
            let cell_id = self.organisms[ci].id;
            let cell_position = self.organisms[ci].position;
            let virus_id = self.organisms[vi].id;
            let species_factor = match self.organisms[vi].kind {
                OrganismKind::Virus(species) => species.virulence_factor(),
                _ => 1.0,
            };
            if let Some(state) = self.organisms[vi].virus_state_mut() {
                state.host = Some(cell_id);
                state.last_host_position = Some(cell_position);
            }
            // Taking hold costs the cell a fixed hit plus a virulence share.
            let initial_damage = 10.0 + self.config.virulence * species_factor * 1.5;
            let cell = &mut self.organisms[ci];
            cell.apply_damage(initial_damage);
            if cell.health <= 0.0 {
                cell.alive = false;
            }
            if let Some(state) = cell.body_state_mut() {
                state.infected_by = Some(virus_id);
                state.damage_level += initial_damage;
            }
            log::debug!("virus {virus_id:?} infected cell {cell_id:?}");
        }
    }

    /// Hosted viruses ride their host, drain its health, and siphon energy.
    /// A host reaching zero health is marked dead here so the burst fires in
    /// the same tick.
    fn drain_hosts(&mut self) {
        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for (vi, virus) in self.organisms.iter().enumerate() {
            if !virus.alive {
                continue;
            }
            if let Some(host_id) = virus.virus_state().and_then(|s| s.host) {
                if let Some(hi) = self.index_of_living(host_id) {
                    pairs.push((vi, hi));
                }
            }
        }

        for (vi, hi) in pairs {
            let species_factor = match self.organisms[vi].kind {
                OrganismKind::Virus(species) => species.virulence_factor(),
                _ => continue,
            };
            let drain = self.config.virulence * species_factor;
            let host = &mut self.organisms[hi];
            host.apply_damage(drain);
            if host.health <= 0.0 {
                host.alive = false;
            }
            let host_position = host.position;
            if let Some(state) = host.body_state_mut() {
                state.damage_level += drain;
            }

            let virus = &mut self.organisms[vi];
            virus.position = host_position;
            if let Some(state) = virus.virus_state_mut() {
                state.last_host_position = Some(host_position);
            }
            virus.gain_energy(drain * self.config.host_drain_energy_factor, &self.config);
        }
    }

    /// Harmful bacteria gnaw at body cells in contact range, gaining energy
    /// from the damage dealt. Red blood cells take extra species damage.
    fn run_bacterial_attacks(&mut self) {
        let contact_radius = self.config.interaction_radius + CONTACT_QUERY_PAD;
        let mut attacks: Vec<(usize, usize)> = Vec::new();
        for (bi, bacterium) in self.organisms.iter().enumerate() {
            if !bacterium.alive || !bacterium.kind.is_bacterium() {
                continue;
            }
            for ci in self.spatial.query_within(bacterium.position, contact_radius, Some(bi)) {
                let cell = &self.organisms[ci];
                if bacterial_attack_eligible(bacterium, cell)
                    && in_interaction_range(bacterium, cell, self.config.interaction_radius)
                {
                    attacks.push((bi, ci));
                }
            }
        }

        for (bi, ci) in attacks {
            if !bacterial_attack_eligible(&self.organisms[bi], &self.organisms[ci]) {
                continue;
            }
            let damage =
                bacterial_attack_damage(&self.organisms[bi], &self.organisms[ci], &self.config);
            let cell = &mut self.organisms[ci];
            cell.apply_damage(damage);
            if cell.health <= 0.0 {
                cell.alive = false;
            }
            if let Some(state) = cell.body_state_mut() {
                state.damage_level += damage;
            }
            let gain = damage * self.config.bacteria_attack_energy_factor;
            self.organisms[bi].gain_energy(gain, &self.config);
        }
    }

    /// Adjacent bacteria compete for resources: a bacterium with a clear
    /// strength advantage siphons energy from the weaker one. Each pair is
    /// contested once per tick.
    fn run_bacterial_competition(&mut self) {
        let contact_radius = self.config.interaction_radius + CONTACT_QUERY_PAD;
        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for (ai, a) in self.organisms.iter().enumerate() {
            if !a.alive || !a.kind.is_bacterium() {
                continue;
            }
            for bi in self.spatial.query_within(a.position, contact_radius, Some(ai)) {
                if bi <= ai {
                    continue;
                }
                let b = &self.organisms[bi];
                if b.alive
                    && b.kind.is_bacterium()
                    && in_interaction_range(a, b, self.config.interaction_radius)
                {
                    pairs.push((ai, bi));
                }
            }
        }

        let margin = self.config.bacteria_competition_margin;
        let transfer = self.config.bacteria_competition_transfer;
        for (ai, bi) in pairs {
            if !self.organisms[ai].alive || !self.organisms[bi].alive {
                continue;
            }
            let strength_a = competition_strength(&self.organisms[ai]);
            let strength_b = competition_strength(&self.organisms[bi]);
            let (winner, loser) = if strength_a > strength_b * margin {
                (ai, bi)
            } else if strength_b > strength_a * margin {
                (bi, ai)
            } else {
                continue;
            };
            let taken = transfer.min(self.organisms[loser].energy);
            self.organisms[loser].energy -= taken;
            self.organisms[winner].gain_energy(taken, &self.config);
        }
    }

    fn run_engulfment(&mut self) {
        self.acquire_engulf_targets();
        self.attack_engulf_targets();
    }

    /// Idle immune cells with spare capacity pick the highest-scoring
    /// pathogen in detection range, then roll the acquisition chance.
    fn acquire_engulf_targets(&mut self) {
        let mut candidates: Vec<(usize, usize)> = Vec::new();
        for (ii, immune) in self.organisms.iter().enumerate() {
            let role = match immune.kind {
                OrganismKind::ImmuneCell(role) => role,
                _ => continue,
            };
            if !immune.alive {
                continue;
            }
            let boost = immune.immune_state().map_or(0.0, |s| s.detection_boost);
            let detection = role.detection_radius() + boost;

            let mut best: Option<(usize, f64)> = None;
            for ti in self.spatial.query_within(immune.position, detection, Some(ii)) {
                let target = &self.organisms[ti];
                if !engulf_eligible(immune, target) {
                    continue;
                }
                let dx = immune.position[0] - target.position[0];
                let dy = immune.position[1] - target.position[1];
                let dist = (dx * dx + dy * dy).sqrt();
                let score = threat_score(immune, target, dist, detection, &self.config);
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((ti, score));
                }
            }
            if let Some((ti, _)) = best {
                candidates.push((ii, ti));
            }
        }

        for (ii, ti) in candidates {
            if !engulf_eligible(&self.organisms[ii], &self.organisms[ti]) {
                continue;
            }
            let chance = engulf_chance(&self.organisms[ii], &self.organisms[ti], &self.config);
            if !self.rng.random_bool(chance) {
                continue;
            }
            let target_id = self.organisms[ti].id;
            let lock = self.config.immune_target_lock_ticks;
            if let Some(state) = self.organisms[ii].immune_state_mut() {
                state.engulfing_target = Some(target_id);
                state.target_lock_remaining = lock;
            }
            log::trace!("immune cell {:?} locked onto {target_id:?}", self.organisms[ii].id);
        }
    }

    /// Locked immune cells in contact range damage their target; a kill moves
    /// the pathogen's signature into digestion and memory. Expired locks on
    /// out-of-range targets are abandoned.
    fn attack_engulf_targets(&mut self) {
        let mut engaged: Vec<(usize, Option<usize>)> = Vec::new();
        for (ii, immune) in self.organisms.iter().enumerate() {
            if !immune.alive {
                continue;
            }
            if let Some(target_id) = immune.immune_state().and_then(|s| s.engulfing_target) {
                engaged.push((ii, self.index_of_living(target_id)));
            }
        }

        for (ii, target_index) in engaged {
            let Some(ti) = target_index else {
                // Target died or vanished before contact.
                if let Some(state) = self.organisms[ii].immune_state_mut() {
                    state.engulfing_target = None;
                    state.target_lock_remaining = 0;
                }
                continue;
            };
            if !self.organisms[ti].alive {
                continue;
            }

            let in_range = in_interaction_range(
                &self.organisms[ii],
                &self.organisms[ti],
                self.config.interaction_radius,
            );
            if !in_range {
                let expired = self.organisms[ii]
                    .immune_state()
                    .is_some_and(|s| s.target_lock_remaining == 0);
                if expired {
                    if let Some(state) = self.organisms[ii].immune_state_mut() {
                        state.engulfing_target = None;
                    }
                }
                continue;
            }

            let attack = match self.organisms[ii].kind {
                OrganismKind::ImmuneCell(role) => role.attack_strength(),
                _ => continue,
            };
            self.organisms[ti].apply_damage(attack);
            if self.organisms[ti].health > 0.0 {
                continue;
            }

            self.organisms[ti].alive = false;
            let signature = self.organisms[ti].signature();
            let target_id = self.organisms[ti].id;
            let digestion_ticks = self.config.digestion_ticks;
            let memory_capacity = self.config.immune_memory_capacity;
            let immune_id = self.organisms[ii].id;
            if let Some(state) = self.organisms[ii].immune_state_mut() {
                state.digesting.push(crate::organism::DigestingPathogen {
                    signature: signature.clone(),
                    ticks_remaining: digestion_ticks,
                });
                if !state.memory.iter().any(|m| m.matches(&signature)) {
                    if state.memory.len() >= memory_capacity {
                        state.memory.remove(0);
                    }
                    state.memory.push(signature);
                }
                state.engulfing_target = None;
                state.target_lock_remaining = 0;
            }
            log::debug!("immune cell {immune_id:?} engulfed {target_id:?}");
        }
    }

    /// A virus whose host died this tick bursts: exactly `viral_burst_count`
    /// mutated offspring spawn near the host's last position and the parent
    /// virus is spent. The population cap is enforced afterwards by the
    /// removal phase, never by dropping burst offspring.
    fn run_viral_bursts(&mut self) {
        let mut bursts: Vec<(usize, [f64; 2])> = Vec::new();
        let mut lost: Vec<usize> = Vec::new();
        for (vi, virus) in self.organisms.iter().enumerate() {
            if !virus.alive {
                continue;
            }
            let Some(state) = virus.virus_state() else { continue };
            let Some(host_id) = state.host else { continue };
            match self.registry.get(&host_id) {
                Some(&hi) if self.organisms[hi].id == host_id => {
                    if !self.organisms[hi].alive {
                        bursts.push((vi, self.organisms[hi].position));
                    }
                }
                _ => lost.push(vi),
            }
        }

        for vi in lost {
            let id = self.organisms[vi].id;
            if let Some(state) = self.organisms[vi].virus_state_mut() {
                state.host = None;
            }
            log::warn!("virus {id:?} lost its host reference");
        }

        let mutation = (self.config.mutation_rate * self.config.virus_mutation_factor).min(1.0);
        let mut proposals: Vec<Offspring> = Vec::new();
        for (vi, origin) in bursts {
            let kind = self.organisms[vi].kind;
            let parent_dna = self.organisms[vi].dna.clone();
            for _ in 0..self.config.viral_burst_count {
                let mut dna = parent_dna.clone();
                dna.mutate(&mut self.rng, mutation);
                let offset = self.config.viral_burst_offset;
                let position = [
                    origin[0] + self.rng.random_range(-offset..=offset),
                    origin[1] + self.rng.random_range(-offset..=offset),
                ];
                proposals.push(Offspring {
                    kind,
                    position,
                    dna,
                    energy: self.config.burst_offspring_energy,
                    inherited_memory: Vec::new(),
                });
            }
            self.organisms[vi].alive = false;
            log::debug!(
                "virus {:?} burst into {} offspring",
                self.organisms[vi].id,
                self.config.viral_burst_count
            );
        }
        for proposal in proposals {
            self.insert_offspring(proposal);
        }
    }

    /// Clear cross-references invalidated by this tick's deaths so no
    /// organism starts the next tick pointing at a corpse.
    fn resolve_stale_references(&mut self) {
        let mut clear_targets: Vec<usize> = Vec::new();
        let mut clear_infections: Vec<usize> = Vec::new();
        for (i, org) in self.organisms.iter().enumerate() {
            if !org.alive {
                continue;
            }
            if let Some(target_id) = org.immune_state().and_then(|s| s.engulfing_target) {
                if self.index_of_living(target_id).is_none() {
                    clear_targets.push(i);
                }
            }
            if let Some(virus_id) = org.body_state().and_then(|s| s.infected_by) {
                let still_hosted = self.index_of_living(virus_id).is_some_and(|vi| {
                    self.organisms[vi]
                        .virus_state()
                        .is_some_and(|s| s.host == Some(org.id))
                });
                if !still_hosted {
                    clear_infections.push(i);
                }
            }
        }
        for i in clear_targets {
            if let Some(state) = self.organisms[i].immune_state_mut() {
                state.engulfing_target = None;
                state.target_lock_remaining = 0;
            }
        }
        for i in clear_infections {
            if let Some(state) = self.organisms[i].body_state_mut() {
                state.infected_by = None;
            }
        }
    }
}
