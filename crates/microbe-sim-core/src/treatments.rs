//! Synthetic treatments applied between ticks. A treatment mutates fields on
//! the organisms it is handed and submits new organisms through the same
//! insertion contract as reproduction; it never touches the population list.

use crate::config::SimConfig;
use crate::organism::{KindState, Organism};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentKind {
    /// Damages bacteria, scaled down by their heritable resistance.
    Antibiotic,
    /// Suppresses virus replication and can detach a virus from its host.
    Antiviral,
    /// Periodically introduces beneficial bacteria.
    Probiotic,
    /// Boosts immune detection and antibody-marks pathogens.
    Immunization,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Treatment {
    pub kind: TreatmentKind,
    /// Potency in [0, 1]; clamped at construction.
    pub strength: f64,
    pub duration: u32,
    pub remaining: u32,
    /// Probiotic-only: ticks until the next spawn wave.
    spawn_cooldown: u32,
}

impl Treatment {
    pub fn new(kind: TreatmentKind, strength: f64, duration: u32) -> Self {
        Self {
            kind,
            strength: strength.clamp(0.0, 1.0),
            duration,
            remaining: duration,
            spawn_cooldown: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    /// Consume one tick of duration.
    pub fn tick(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// For probiotics: number of beneficial bacteria to introduce this tick,
    /// if the spawn wave is due. Stronger doses spawn more, more often.
    pub fn probiotic_spawn_due(&mut self) -> Option<usize> {
        if self.kind != TreatmentKind::Probiotic || !self.is_active() {
            return None;
        }
        if self.spawn_cooldown > 0 {
            self.spawn_cooldown -= 1;
            return None;
        }
        // A zero-strength dose never fires.
        if self.strength <= 0.0 {
            return None;
        }
        self.spawn_cooldown = (100.0 / self.strength) as u32;
        Some((self.strength * 3.0) as usize + 1)
    }

    /// Apply this treatment's per-organism effects. Kinds the treatment does
    /// not address are left untouched.
    pub fn apply_to_organism<R: Rng + ?Sized>(
        &self,
        organism: &mut Organism,
        _config: &SimConfig,
        rng: &mut R,
    ) {
        if !self.is_active() || !organism.alive {
            return;
        }
        match self.kind {
            TreatmentKind::Antibiotic => {
                let resistance = match &organism.state {
                    KindState::Bacterium { antibiotic_resistance } => *antibiotic_resistance as f64,
                    _ => return,
                };
                let kill_chance = self.strength * (1.0 - resistance);
                organism.apply_damage(rng.random_range(0.3..0.6) * self.strength as f32);
                if rng.random_bool((kill_chance * 0.2).clamp(0.0, 1.0)) {
                    organism.apply_damage(organism.health);
                }
                organism.energy *= 1.0 - (kill_chance * 0.5) as f32;
            }
            TreatmentKind::Antiviral => {
                let Some(state) = organism.virus_state_mut() else {
                    return;
                };
                let cooldown_increase = ((25.0 * self.strength) as u32).max(15);
                state.replication_cooldown =
                    state.replication_cooldown.saturating_add(cooldown_increase);
                if state.host.is_some() && rng.random_bool((0.1 * self.strength).clamp(0.0, 1.0)) {
                    state.host = None;
                    state.last_host_position = None;
                }
                organism.apply_damage(rng.random_range(0.2..0.4) * self.strength as f32);
                organism.energy *= 1.0 - (rng.random_range(0.1..0.3) * self.strength) as f32;
            }
            TreatmentKind::Probiotic => {
                // Spawning only; handled via `probiotic_spawn_due`.
            }
            TreatmentKind::Immunization => {
                if organism.kind.is_immune() {
                    if let Some(state) = organism.immune_state_mut() {
                        state.detection_boost = self.strength * 25.0;
                    }
                } else if organism.kind.is_pathogenic() {
                    organism.apply_damage(rng.random_range(0.05..0.15) * self.strength as f32);
                    if let Some(state) = organism.virus_state_mut() {
                        if !state.antibody_marked
                            && rng.random_bool((self.strength * 0.3).clamp(0.0, 1.0))
                        {
                            state.antibody_marked = true;
                            log::debug!("virus {:?} antibody-marked", organism.id);
                        }
                    }
                }
            }
        }
    }
}
