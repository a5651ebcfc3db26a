use super::super::World;
use crate::organism::{BacteriumSpecies, OrganismKind};
use rand::Rng;

impl World {
    /// Apply every active treatment to the population, collect probiotic
    /// spawn waves, and drop treatments whose duration ran out.
    pub(in crate::world) fn apply_treatments_phase(&mut self) {
        if self.treatments.is_empty() {
            return;
        }
        let mut probiotic_spawns = 0usize;
        // Take the list out so per-organism application can borrow the rest
        // of the world freely.
        let mut treatments = std::mem::take(&mut self.treatments);
        for treatment in &mut treatments {
            if let Some(count) = treatment.probiotic_spawn_due() {
                probiotic_spawns += count;
            }
            for organism in &mut self.organisms {
                treatment.apply_to_organism(organism, &self.config, &mut self.rng);
            }
            treatment.tick();
        }
        let before = treatments.len();
        treatments.retain(|t| t.is_active());
        if treatments.len() < before {
            log::info!("{} treatment(s) expired at tick {}", before - treatments.len(), self.tick);
        }
        self.treatments = treatments;

        for _ in 0..probiotic_spawns {
            if self.alive_count() >= self.config.max_organisms {
                break;
            }
            let position = [
                self.rng.random_range(0.0..self.config.world_width),
                self.rng.random_range(0.0..self.config.world_height),
            ];
            self.spawn_at(
                OrganismKind::Bacterium(BacteriumSpecies::Beneficial),
                position,
            );
        }
    }
}
