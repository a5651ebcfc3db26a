use super::super::World;
use crate::organism::{BodyCellRole, Offspring, Organism, OrganismKind};
use rand::Rng;
use std::cmp::Ordering;

impl World {
    /// Collect reproduction proposals and materialize them afterwards.
    /// Viruses go first and get a per-tick birth budget; everyone respects
    /// the population cap.
    pub(in crate::world) fn reproduction_phase(&mut self) {
        let max = self.config.max_organisms;
        let mut population = self.alive_count();
        let mut proposals: Vec<Offspring> = Vec::new();

        let mut virus_births = 0usize;
        for i in 0..self.organisms.len() {
            if virus_births >= self.config.max_virus_reproductions_per_tick || population >= max {
                break;
            }
            if !self.organisms[i].kind.is_virus() {
                continue;
            }
            if let Some(offspring) = self.organisms[i].reproduce(&self.config, &mut self.rng) {
                proposals.push(offspring);
                virus_births += 1;
                population += 1;
            }
        }

        for i in 0..self.organisms.len() {
            if population >= max {
                break;
            }
            if self.organisms[i].kind.is_virus() {
                continue;
            }
            if let Some(offspring) = self.organisms[i].reproduce(&self.config, &mut self.rng) {
                proposals.push(offspring);
                population += 1;
            }
        }

        for offspring in proposals {
            self.insert_offspring(offspring);
        }
    }

    /// Periodic body-cell replenishment at the inflow (left) edge.
    pub(in crate::world) fn spawn_body_cells_phase(&mut self) {
        let interval = self.config.cell_spawn_interval;
        if interval == 0 || !self.tick.is_multiple_of(interval) {
            return;
        }
        // Mostly epithelial tissue, with some blood cells mixed in.
        let roles = [
            BodyCellRole::Epithelial,
            BodyCellRole::Epithelial,
            BodyCellRole::Epithelial,
            BodyCellRole::RedBlood,
            BodyCellRole::Platelet,
        ];
        for _ in 0..self.config.cell_spawn_count {
            if self.alive_count() >= self.config.max_organisms {
                break;
            }
            let role = roles[self.rng.random_range(0..roles.len())];
            let strip = self.config.cell_spawn_strip_width.min(self.config.world_width);
            let position = [
                self.rng.random_range(0.0..strip),
                self.rng.random_range(0.0..self.config.world_height),
            ];
            self.spawn_at(OrganismKind::BodyCell(role), position);
        }
    }

    /// Compact the population: drop the dead, then enforce the cap by
    /// culling the lowest-vitality non-viruses first. The id registry is
    /// rebuilt afterwards since indices shift.
    pub(in crate::world) fn remove_dead_phase(&mut self) {
        let before = self.organisms.len();
        self.organisms.retain(|o| o.alive);
        let removed = before - self.organisms.len();
        if removed > 0 {
            self.total_deaths += removed;
            log::debug!("{removed} organism(s) died at tick {}", self.tick);
        }

        let max = self.config.max_organisms;
        if self.organisms.len() > max {
            let culled = self.organisms.len() - max;
            self.organisms.sort_by(|a, b| {
                let key = |o: &Organism| (u8::from(o.kind.is_virus()), o.health + o.energy);
                let (va, sa) = key(a);
                let (vb, sb) = key(b);
                vb.cmp(&va)
                    .then(sb.partial_cmp(&sa).unwrap_or(Ordering::Equal))
            });
            self.organisms.truncate(max);
            self.total_deaths += culled;
            log::warn!("population cap reached: culled {culled} organism(s)");
        }

        self.rebuild_registry();
    }
}
