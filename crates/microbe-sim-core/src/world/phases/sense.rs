use super::super::World;
use crate::organism::{NeighborSense, OrganismKind};

/// Sensing radius for organisms without a specialized detection range.
const SENSE_RADIUS: f64 = 100.0;

/// Neighbor count at which a density input saturates at 1.0.
const DENSITY_SATURATION: f32 = 8.0;

impl World {
    /// Compute every organism's neighborhood against the tick-start spatial
    /// snapshot, then run the per-organism updates. Senses are computed
    /// up-front so no organism reacts to another's same-tick movement.
    pub(in crate::world) fn update_organisms_phase(&mut self) {
        let senses: Vec<NeighborSense> = (0..self.organisms.len())
            .map(|index| self.sense_for(index))
            .collect();
        for (index, sense) in senses.iter().enumerate() {
            self.organisms[index].update(&mut self.environment, sense, &self.config, &mut self.rng);
        }
    }

    fn sense_for(&self, index: usize) -> NeighborSense {
        let org = &self.organisms[index];
        if !org.alive || org.kind.is_body_cell() {
            // Body cells ride the flow and never consult their neighborhood.
            return NeighborSense::default();
        }

        let radius = match org.kind {
            OrganismKind::ImmuneCell(role) => {
                let boost = org.immune_state().map_or(0.0, |s| s.detection_boost);
                role.detection_radius() + boost
            }
            _ => SENSE_RADIUS,
        };
        let neighbors = self.spatial.query_within(org.position, radius, Some(index));

        let mut sense = NeighborSense::default();
        let mut threat_count = 0u32;
        let mut food_count = 0u32;
        let mut nearest_threat_sq = f64::INFINITY;
        let mut nearest_food_sq = f64::INFINITY;

        let dist_sq = |a: [f64; 2], b: [f64; 2]| {
            let dx = a[0] - b[0];
            let dy = a[1] - b[1];
            dx * dx + dy * dy
        };

        for &ni in &neighbors {
            let other = &self.organisms[ni];
            if !other.alive {
                continue;
            }
            let is_threat = org.kind.is_pathogenic() && other.kind.is_immune();
            let is_food = match org.kind {
                OrganismKind::Virus(_) => {
                    other.kind.is_infectable()
                        && other.body_state().is_some_and(|s| s.infected_by.is_none())
                }
                OrganismKind::ImmuneCell(_) => other.kind.is_engulfable(),
                _ => false,
            };
            if is_threat {
                threat_count += 1;
                let d = dist_sq(org.position, other.position);
                if d < nearest_threat_sq {
                    nearest_threat_sq = d;
                    sense.nearest_threat = Some(other.position);
                }
            }
            if is_food {
                food_count += 1;
                let d = dist_sq(org.position, other.position);
                if d < nearest_food_sq {
                    nearest_food_sq = d;
                    sense.nearest_food = Some(other.position);
                }
            }
        }

        // Cross-references override proximity: a hosted virus tracks its
        // host, a locked immune cell tracks its target. Lost references
        // resolve to nothing here and are cleaned up by the interaction
        // phase.
        match org.kind {
            OrganismKind::Virus(_) => {
                if let Some(host_id) = org.virus_state().and_then(|s| s.host) {
                    if let Some(host_index) = self.index_of_living(host_id) {
                        sense.nearest_food = Some(self.organisms[host_index].position);
                    }
                }
            }
            OrganismKind::ImmuneCell(_) => {
                if let Some(target_id) = org.immune_state().and_then(|s| s.engulfing_target) {
                    if let Some(target_index) = self.index_of_living(target_id) {
                        sense.nearest_food = Some(self.organisms[target_index].position);
                    }
                }
            }
            OrganismKind::Bacterium(_) => {
                // Bacteria forage by nutrient gradient rather than by
                // neighbor positions.
                let (target, richness) = self.nutrient_gradient_target(org.position);
                sense.nearest_food = target;
                sense.food_density = (richness / 200.0).min(1.0);
            }
            OrganismKind::BodyCell(_) => {}
        }

        sense.threat_density = (threat_count as f32 / DENSITY_SATURATION).min(1.0);
        if !org.kind.is_bacterium() {
            sense.food_density = (food_count as f32 / DENSITY_SATURATION).min(1.0);
        }
        sense
    }

    /// Pick the richest adjacent grid cell as a foraging target. Returns
    /// `None` when the local cell is at least as rich as every neighbor.
    fn nutrient_gradient_target(&self, position: [f64; 2]) -> (Option<[f64; 2]>, f32) {
        let step = self.config.environment_grid_resolution;
        let here = self.environment.conditions_at(position[0], position[1]).nutrients;
        let mut best = here;
        let mut target = None;
        for (dx, dy) in [(step, 0.0), (-step, 0.0), (0.0, step), (0.0, -step)] {
            let x = position[0] + dx;
            let y = position[1] + dy;
            if x < 0.0 || y < 0.0 || x >= self.config.world_width || y >= self.config.world_height {
                continue;
            }
            let nutrients = self.environment.conditions_at(x, y).nutrients;
            if nutrients > best {
                best = nutrients;
                target = Some([x, y]);
            }
        }
        (target, best)
    }
}
