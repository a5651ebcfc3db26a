//! Pairwise interaction rules: eligibility predicates and stochastic chance
//! tables. Pure functions over organism state; the world's interaction phase
//! draws the randomness and applies the outcomes. An ineligible pair is a
//! no-op, never an error.

use crate::config::SimConfig;
use crate::organism::{BodyCellRole, Organism, OrganismKind};
use serde::{Deserialize, Serialize};

/// Kind tag plus a quantized trait fingerprint. The unit of immune memory:
/// clearing a pathogen stores its signature, and future encounters with a
/// matching signature get detection and engulf bonuses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathogenSignature {
    pub kind: OrganismKind,
    /// Traits quantized to 4 bits each, so small mutations still match.
    pub fingerprint: [u8; 4],
}

impl PathogenSignature {
    pub fn of(organism: &Organism) -> Self {
        let quantize = |v: f32| (v.clamp(0.0, 1.0) * 15.0).round() as u8;
        let t = organism.traits;
        Self {
            kind: organism.kind,
            fingerprint: [
                quantize(t.temperature_preference),
                quantize(t.ph_preference),
                quantize(t.reproduction_modifier),
                quantize(t.resistance),
            ],
        }
    }

    /// Same kind and a near-identical fingerprint. Tolerates the drift a few
    /// generations of mutation introduce.
    pub fn matches(&self, other: &PathogenSignature) -> bool {
        if self.kind != other.kind {
            return false;
        }
        let distance: u32 = self
            .fingerprint
            .iter()
            .zip(&other.fingerprint)
            .map(|(a, b)| a.abs_diff(*b) as u32)
            .sum();
        distance <= 2
    }
}

/// Two organisms are in contact range when their edges are within the
/// configured interaction radius.
pub fn in_interaction_range(a: &Organism, b: &Organism, interaction_radius: f64) -> bool {
    let dx = a.position[0] - b.position[0];
    let dy = a.position[1] - b.position[1];
    let reach = a.size + b.size + interaction_radius;
    dx * dx + dy * dy <= reach * reach
}

pub fn distance(a: &Organism, b: &Organism) -> f64 {
    let dx = a.position[0] - b.position[0];
    let dy = a.position[1] - b.position[1];
    (dx * dx + dy * dy).sqrt()
}

/// A virus may attempt infection only against a living, uninfected,
/// infectable body cell, and only while it has no host of its own.
/// Repeat attempts against an already-infected cell are no-ops.
pub fn infection_eligible(virus: &Organism, cell: &Organism) -> bool {
    if !virus.alive || !cell.alive {
        return false;
    }
    let hostless = virus.virus_state().is_some_and(|s| s.host.is_none());
    let uninfected = cell.body_state().is_some_and(|s| s.infected_by.is_none());
    virus.kind.is_virus() && hostless && cell.kind.is_infectable() && uninfected
}

/// Infection success probability: base chance scaled by virus species and
/// damped by the target's heritable resistance trait.
pub fn infection_chance(virus: &Organism, cell: &Organism, config: &SimConfig) -> f64 {
    let species_factor = match virus.kind {
        OrganismKind::Virus(species) => species.infection_factor(),
        _ => return 0.0,
    };
    let resistance = cell.traits.resistance as f64;
    (config.infection_chance * species_factor * (1.0 - 0.5 * resistance)).clamp(0.0, 1.0)
}

/// A harmful bacterium attacks any living body cell it is in contact with.
/// Beneficial bacteria never attack.
pub fn bacterial_attack_eligible(bacterium: &Organism, cell: &Organism) -> bool {
    bacterium.alive
        && cell.alive
        && bacterium.kind.is_bacterium()
        && bacterium.kind.is_pathogenic()
        && cell.kind.is_body_cell()
}

/// Per-tick damage a harmful bacterium deals to a body cell: the configured
/// base, plus a species-specific surcharge against red blood cells.
pub fn bacterial_attack_damage(bacterium: &Organism, cell: &Organism, config: &SimConfig) -> f32 {
    let species = match bacterium.kind {
        OrganismKind::Bacterium(species) => species,
        _ => return 0.0,
    };
    let mut damage = config.bacteria_attack_damage;
    if cell.kind == OrganismKind::BodyCell(BodyCellRole::RedBlood) {
        damage += species.red_blood_cell_damage();
    }
    damage
}

/// Contest strength for bacteria-vs-bacteria resource competition: energy
/// weighted by health.
pub fn competition_strength(org: &Organism) -> f32 {
    org.energy * (org.health / 100.0)
}

/// An immune cell may acquire a target only with spare digestion capacity,
/// no engulf already in progress, and an engulfable (pathogenic) target.
pub fn engulf_eligible(immune: &Organism, target: &Organism) -> bool {
    if !immune.alive || !target.alive || !target.kind.is_engulfable() {
        return false;
    }
    let role = match immune.kind {
        OrganismKind::ImmuneCell(role) => role,
        _ => return false,
    };
    immune.immune_state().is_some_and(|s| {
        s.engulfing_target.is_none() && s.digesting.len() < role.engulf_capacity()
    })
}

/// Engulf-acquisition probability. Antibody-marked targets are easiest to
/// clear, then weakened ones, then pathogenic bacteria, then healthy viruses;
/// the relative ordering comes from configuration, with a bonus as the
/// target's health ratio falls below one half and a multiplier for
/// remembered signatures.
pub fn engulf_chance(immune: &Organism, target: &Organism, config: &SimConfig) -> f64 {
    let marked = target.virus_state().is_some_and(|s| s.antibody_marked);
    let mut chance = if marked {
        config.engulf_chance_marked
    } else if target.kind.is_virus() {
        config.engulf_chance_virus
    } else {
        config.engulf_chance_bacteria
    };

    let health_ratio = (target.health / 100.0) as f64;
    if health_ratio < 0.5 {
        chance = chance.max(config.engulf_chance_weakened);
        chance += config.engulf_weakness_bonus * (0.5 - health_ratio) * 2.0;
    }
    if remembers(immune, target) {
        chance *= config.engulf_memory_factor;
    }
    chance.clamp(0.0, 1.0)
}

/// Threat score used to pick among multiple candidates: viruses outrank
/// bacteria, closer and weaker targets score higher, remembered signatures
/// get the memory multiplier.
pub fn threat_score(
    immune: &Organism,
    target: &Organism,
    dist: f64,
    detection_radius: f64,
    config: &SimConfig,
) -> f64 {
    let base = if target.kind.is_virus() { 8.0 } else { 5.0 };
    let proximity = (1.0 - (dist / detection_radius).min(1.0)).powf(1.5);
    let mut score = base * (0.5 + proximity);
    if target.health < 50.0 {
        score *= 1.3;
    }
    if remembers(immune, target) {
        score *= config.engulf_memory_factor;
    }
    score
}

fn remembers(immune: &Organism, target: &Organism) -> bool {
    let signature = target.signature();
    immune
        .immune_state()
        .is_some_and(|s| s.memory.iter().any(|m| m.matches(&signature)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organism::{
        BacteriumSpecies, BodyCellRole, ImmuneCellRole, OrganismId, VirusSpecies,
    };
    use crate::rng::create_rng;
    use rand_chacha::ChaCha12Rng;

    fn spawn(kind: OrganismKind, id: u64, rng: &mut ChaCha12Rng) -> Organism {
        Organism::spawn(OrganismId(id), kind, [100.0, 100.0], rng)
    }

    #[test]
    fn infection_requires_uninfected_infectable_target() {
        let mut rng = create_rng(40);
        let virus = spawn(OrganismKind::Virus(VirusSpecies::Influenza), 1, &mut rng);
        let mut cell = spawn(OrganismKind::BodyCell(BodyCellRole::Epithelial), 2, &mut rng);
        let platelet = spawn(OrganismKind::BodyCell(BodyCellRole::Platelet), 3, &mut rng);
        let bacterium = spawn(OrganismKind::Bacterium(BacteriumSpecies::EColi), 4, &mut rng);

        assert!(infection_eligible(&virus, &cell));
        assert!(!infection_eligible(&virus, &platelet));
        assert!(!infection_eligible(&virus, &bacterium));

        cell.body_state_mut().unwrap().infected_by = Some(OrganismId(99));
        assert!(!infection_eligible(&virus, &cell), "repeat infection must be a no-op");
    }

    #[test]
    fn hosted_virus_does_not_start_new_infections() {
        let mut rng = create_rng(41);
        let mut virus = spawn(OrganismKind::Virus(VirusSpecies::Influenza), 1, &mut rng);
        let cell = spawn(OrganismKind::BodyCell(BodyCellRole::Epithelial), 2, &mut rng);
        virus.virus_state_mut().unwrap().host = Some(OrganismId(5));
        assert!(!infection_eligible(&virus, &cell));
    }

    #[test]
    fn bacterial_attack_targets_body_cells_only() {
        let mut rng = create_rng(49);
        let ecoli = spawn(OrganismKind::Bacterium(BacteriumSpecies::EColi), 1, &mut rng);
        let beneficial = spawn(OrganismKind::Bacterium(BacteriumSpecies::Beneficial), 2, &mut rng);
        let cell = spawn(OrganismKind::BodyCell(BodyCellRole::Epithelial), 3, &mut rng);
        let immune = spawn(OrganismKind::ImmuneCell(ImmuneCellRole::Neutrophil), 4, &mut rng);
        let other = spawn(OrganismKind::Bacterium(BacteriumSpecies::Streptococcus), 5, &mut rng);

        assert!(bacterial_attack_eligible(&ecoli, &cell));
        assert!(!bacterial_attack_eligible(&beneficial, &cell));
        assert!(!bacterial_attack_eligible(&ecoli, &immune));
        assert!(!bacterial_attack_eligible(&ecoli, &other));
    }

    #[test]
    fn bacterial_attack_hits_red_blood_cells_harder() {
        let config = SimConfig::default();
        let mut rng = create_rng(55);
        let ecoli = spawn(OrganismKind::Bacterium(BacteriumSpecies::EColi), 1, &mut rng);
        let strep = spawn(OrganismKind::Bacterium(BacteriumSpecies::Streptococcus), 2, &mut rng);
        let epithelial = spawn(OrganismKind::BodyCell(BodyCellRole::Epithelial), 3, &mut rng);
        let red_blood = spawn(OrganismKind::BodyCell(BodyCellRole::RedBlood), 4, &mut rng);

        let base = bacterial_attack_damage(&ecoli, &epithelial, &config);
        assert_eq!(base, config.bacteria_attack_damage);
        let ecoli_rbc = bacterial_attack_damage(&ecoli, &red_blood, &config);
        let strep_rbc = bacterial_attack_damage(&strep, &red_blood, &config);
        assert!(ecoli_rbc > base);
        assert!(strep_rbc > ecoli_rbc);
    }

    #[test]
    fn competition_strength_weighs_energy_by_health() {
        let mut rng = create_rng(56);
        let mut a = spawn(OrganismKind::Bacterium(BacteriumSpecies::EColi), 1, &mut rng);
        let mut b = spawn(OrganismKind::Bacterium(BacteriumSpecies::EColi), 2, &mut rng);
        a.energy = 80.0;
        a.health = 100.0;
        b.energy = 80.0;
        b.health = 40.0;
        assert_eq!(competition_strength(&a), 80.0);
        assert!(competition_strength(&b) < competition_strength(&a));
    }

    #[test]
    fn engulf_blocked_at_capacity_or_with_target_in_progress() {
        let mut rng = create_rng(42);
        let mut immune = spawn(OrganismKind::ImmuneCell(ImmuneCellRole::Neutrophil), 1, &mut rng);
        let pathogen = spawn(OrganismKind::Virus(VirusSpecies::Influenza), 2, &mut rng);

        assert!(engulf_eligible(&immune, &pathogen));

        immune.immune_state_mut().unwrap().engulfing_target = Some(OrganismId(9));
        assert!(!engulf_eligible(&immune, &pathogen));

        immune.immune_state_mut().unwrap().engulfing_target = None;
        let capacity = ImmuneCellRole::Neutrophil.engulf_capacity();
        for _ in 0..capacity {
            immune.immune_state_mut().unwrap().digesting.push(
                crate::organism::DigestingPathogen {
                    signature: pathogen.signature(),
                    ticks_remaining: 10,
                },
            );
        }
        assert!(!engulf_eligible(&immune, &pathogen));
    }

    #[test]
    fn beneficial_bacteria_and_body_cells_are_never_engulfable() {
        let mut rng = create_rng(43);
        let immune = spawn(OrganismKind::ImmuneCell(ImmuneCellRole::Macrophage), 1, &mut rng);
        let beneficial = spawn(OrganismKind::Bacterium(BacteriumSpecies::Beneficial), 2, &mut rng);
        let body = spawn(OrganismKind::BodyCell(BodyCellRole::RedBlood), 3, &mut rng);
        let other_immune = spawn(OrganismKind::ImmuneCell(ImmuneCellRole::Neutrophil), 4, &mut rng);
        assert!(!engulf_eligible(&immune, &beneficial));
        assert!(!engulf_eligible(&immune, &body));
        assert!(!engulf_eligible(&immune, &other_immune));
    }

    #[test]
    fn engulf_chance_preserves_configured_ordering() {
        let config = SimConfig::default();
        let mut rng = create_rng(44);
        let immune = spawn(OrganismKind::ImmuneCell(ImmuneCellRole::Macrophage), 1, &mut rng);
        let mut virus = spawn(OrganismKind::Virus(VirusSpecies::Influenza), 2, &mut rng);
        let bacterium = spawn(OrganismKind::Bacterium(BacteriumSpecies::EColi), 3, &mut rng);

        let healthy_virus = engulf_chance(&immune, &virus, &config);
        let healthy_bacterium = engulf_chance(&immune, &bacterium, &config);
        assert!(healthy_bacterium > healthy_virus);

        virus.health = 20.0;
        let weakened_virus = engulf_chance(&immune, &virus, &config);
        assert!(weakened_virus > healthy_bacterium);

        virus.health = 100.0;
        virus.virus_state_mut().unwrap().antibody_marked = true;
        let marked_virus = engulf_chance(&immune, &virus, &config);
        assert!(marked_virus > healthy_bacterium);
        assert!((0.0..=1.0).contains(&marked_virus));
    }

    #[test]
    fn memory_match_boosts_chance_and_score() {
        let config = SimConfig::default();
        let mut rng = create_rng(45);
        let mut immune = spawn(OrganismKind::ImmuneCell(ImmuneCellRole::Macrophage), 1, &mut rng);
        let virus = spawn(OrganismKind::Virus(VirusSpecies::Influenza), 2, &mut rng);

        let before = engulf_chance(&immune, &virus, &config);
        let score_before = threat_score(&immune, &virus, 50.0, 250.0, &config);
        immune.immune_state_mut().unwrap().memory.push(virus.signature());
        let after = engulf_chance(&immune, &virus, &config);
        let score_after = threat_score(&immune, &virus, 50.0, 250.0, &config);
        assert!(after > before);
        assert!(score_after > score_before);
    }

    #[test]
    fn threat_score_ranks_viruses_above_bacteria_at_equal_distance() {
        let config = SimConfig::default();
        let mut rng = create_rng(46);
        let immune = spawn(OrganismKind::ImmuneCell(ImmuneCellRole::Neutrophil), 1, &mut rng);
        let virus = spawn(OrganismKind::Virus(VirusSpecies::Influenza), 2, &mut rng);
        let bacterium = spawn(OrganismKind::Bacterium(BacteriumSpecies::EColi), 3, &mut rng);
        let v = threat_score(&immune, &virus, 30.0, 200.0, &config);
        let b = threat_score(&immune, &bacterium, 30.0, 200.0, &config);
        assert!(v > b);
    }

    #[test]
    fn interaction_range_accounts_for_sizes() {
        let mut rng = create_rng(47);
        let mut a = spawn(OrganismKind::Bacterium(BacteriumSpecies::EColi), 1, &mut rng);
        let mut b = spawn(OrganismKind::BodyCell(BodyCellRole::Epithelial), 2, &mut rng);
        a.position = [0.0, 0.0];
        // sizes 5 + 7 + radius 10 = reach 22
        b.position = [21.9, 0.0];
        assert!(in_interaction_range(&a, &b, 10.0));
        b.position = [22.1, 0.0];
        assert!(!in_interaction_range(&a, &b, 10.0));
    }

    #[test]
    fn signature_matching_tolerates_small_drift() {
        let mut rng = create_rng(48);
        let virus = spawn(OrganismKind::Virus(VirusSpecies::Influenza), 1, &mut rng);
        let sig = virus.signature();
        let mut close = sig.clone();
        close.fingerprint[0] = close.fingerprint[0].saturating_add(1);
        assert!(sig.matches(&close));

        let mut far = sig.clone();
        far.fingerprint[0] = far.fingerprint[0].wrapping_add(8) % 16;
        far.fingerprint[1] = far.fingerprint[1].wrapping_add(8) % 16;
        assert!(!sig.matches(&far));

        let other_kind = PathogenSignature {
            kind: OrganismKind::Bacterium(BacteriumSpecies::EColi),
            fingerprint: sig.fingerprint,
        };
        assert!(!sig.matches(&other_kind));
    }
}
