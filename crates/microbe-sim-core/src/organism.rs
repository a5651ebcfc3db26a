use crate::config::SimConfig;
use crate::constants;
use crate::dna::{DnaStrand, TraitProfile};
use crate::environment::Environment;
use crate::interaction::PathogenSignature;
use crate::nn::{Action, DecisionNet, INPUT_SIZE};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Stable organism identity, assigned by the world at insertion and never
/// reused. Cross-references (virus→host, immune→target) hold ids, not
/// indices, and must be re-resolved against the live registry every tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrganismId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BacteriumSpecies {
    EColi,
    Streptococcus,
    /// Commensal flora; never targeted by immune cells.
    Beneficial,
}

impl BacteriumSpecies {
    /// Extra per-tick damage dealt to red blood cells on top of the base
    /// attack damage. Streptococcus lyses them fastest.
    pub fn red_blood_cell_damage(self) -> f32 {
        match self {
            BacteriumSpecies::EColi => 2.0,
            BacteriumSpecies::Streptococcus => 4.0,
            BacteriumSpecies::Beneficial => 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VirusSpecies {
    Influenza,
    Rhinovirus,
}

impl VirusSpecies {
    /// Per-species scaling of the configured base infection chance.
    pub fn infection_factor(self) -> f64 {
        match self {
            VirusSpecies::Influenza => 1.0,
            VirusSpecies::Rhinovirus => 0.85,
        }
    }

    /// Per-species scaling of the configured base virulence.
    pub fn virulence_factor(self) -> f32 {
        match self {
            VirusSpecies::Influenza => 1.0,
            VirusSpecies::Rhinovirus => 0.7,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImmuneCellRole {
    Neutrophil,
    Macrophage,
}

impl ImmuneCellRole {
    pub fn detection_radius(self) -> f64 {
        match self {
            ImmuneCellRole::Neutrophil => 200.0,
            ImmuneCellRole::Macrophage => 250.0,
        }
    }

    /// Health removed from the engulfed target per tick.
    pub fn attack_strength(self) -> f32 {
        match self {
            ImmuneCellRole::Neutrophil => 5.0,
            ImmuneCellRole::Macrophage => 3.0,
        }
    }

    /// Max pathogens held in digestion at once; acquisition is blocked at cap.
    pub fn engulf_capacity(self) -> usize {
        match self {
            ImmuneCellRole::Neutrophil => 3,
            ImmuneCellRole::Macrophage => 5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyCellRole {
    Epithelial,
    RedBlood,
    Platelet,
}

/// Closed set of organism kinds. Interaction logic queries the capability
/// predicates below instead of matching on names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganismKind {
    Bacterium(BacteriumSpecies),
    Virus(VirusSpecies),
    ImmuneCell(ImmuneCellRole),
    BodyCell(BodyCellRole),
}

impl OrganismKind {
    pub fn is_bacterium(self) -> bool {
        matches!(self, OrganismKind::Bacterium(_))
    }

    pub fn is_virus(self) -> bool {
        matches!(self, OrganismKind::Virus(_))
    }

    pub fn is_immune(self) -> bool {
        matches!(self, OrganismKind::ImmuneCell(_))
    }

    pub fn is_body_cell(self) -> bool {
        matches!(self, OrganismKind::BodyCell(_))
    }

    /// Harmful to the host: all viruses plus non-beneficial bacteria.
    pub fn is_pathogenic(self) -> bool {
        match self {
            OrganismKind::Virus(_) => true,
            OrganismKind::Bacterium(species) => species != BacteriumSpecies::Beneficial,
            _ => false,
        }
    }

    /// Valid immune-cell target. Immune cells, body cells, and beneficial
    /// bacteria are never engulfable.
    pub fn is_engulfable(self) -> bool {
        self.is_pathogenic()
    }

    /// Can host a viral infection. Platelets cannot.
    pub fn is_infectable(self) -> bool {
        matches!(
            self,
            OrganismKind::BodyCell(BodyCellRole::Epithelial)
                | OrganismKind::BodyCell(BodyCellRole::RedBlood)
        )
    }

    pub fn dna_len(self) -> usize {
        match self {
            OrganismKind::Bacterium(_) => constants::BACTERIUM_DNA_LEN,
            OrganismKind::Virus(_) => constants::VIRUS_DNA_LEN,
            OrganismKind::ImmuneCell(_) => constants::IMMUNE_CELL_DNA_LEN,
            OrganismKind::BodyCell(_) => constants::BODY_CELL_DNA_LEN,
        }
    }

    /// Energy level at or below which the organism dies.
    pub fn energy_floor(self) -> f32 {
        match self {
            OrganismKind::ImmuneCell(_) => 10.0,
            _ => 0.0,
        }
    }

    pub fn energy_cap(self, config: &SimConfig) -> f32 {
        match self {
            OrganismKind::Bacterium(_) | OrganismKind::Virus(_) => config.pathogen_energy_cap,
            OrganismKind::ImmuneCell(_) => config.immune_energy_cap,
            OrganismKind::BodyCell(_) => 100.0,
        }
    }

    fn default_size(self) -> f64 {
        match self {
            OrganismKind::Bacterium(_) => 5.0,
            OrganismKind::Virus(_) => 3.0,
            OrganismKind::ImmuneCell(_) => 8.0,
            OrganismKind::BodyCell(BodyCellRole::Platelet) => 4.0,
            OrganismKind::BodyCell(_) => 7.0,
        }
    }

    fn default_speed(self) -> f64 {
        match self {
            OrganismKind::Bacterium(_) => 1.0,
            OrganismKind::Virus(_) => 1.5,
            OrganismKind::ImmuneCell(_) => 1.2,
            OrganismKind::BodyCell(_) => 0.3,
        }
    }

    /// Display color. Not behaviorally load-bearing.
    pub fn default_color(self) -> [u8; 3] {
        match self {
            OrganismKind::Bacterium(BacteriumSpecies::EColi) => [90, 160, 60],
            OrganismKind::Bacterium(BacteriumSpecies::Streptococcus) => [140, 170, 40],
            OrganismKind::Bacterium(BacteriumSpecies::Beneficial) => [60, 200, 120],
            OrganismKind::Virus(VirusSpecies::Influenza) => [200, 60, 60],
            OrganismKind::Virus(VirusSpecies::Rhinovirus) => [220, 110, 60],
            OrganismKind::ImmuneCell(ImmuneCellRole::Neutrophil) => [230, 230, 240],
            OrganismKind::ImmuneCell(ImmuneCellRole::Macrophage) => [190, 190, 220],
            OrganismKind::BodyCell(BodyCellRole::Epithelial) => [240, 200, 180],
            OrganismKind::BodyCell(BodyCellRole::RedBlood) => [180, 40, 50],
            OrganismKind::BodyCell(BodyCellRole::Platelet) => [230, 210, 120],
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VirusState {
    /// Infected host, if any. Resolved via id lookup each tick; a failed
    /// lookup means "target lost" and the virus unlinks, never faults.
    pub host: Option<OrganismId>,
    /// Where the host was last seen; burst offspring spawn here.
    pub last_host_position: Option<[f64; 2]>,
    /// Ticks spent without a host. Past the dormancy threshold the virus
    /// stops free replication to conserve energy.
    pub dormant_counter: u32,
    /// Ticks until the next free replication is allowed.
    pub replication_cooldown: u32,
    /// Antibody-marked pathogens are far easier for immune cells to clear.
    pub antibody_marked: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DigestingPathogen {
    pub signature: PathogenSignature,
    pub ticks_remaining: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ImmuneState {
    /// At most one engulf in progress; acquisition requires spare capacity.
    pub engulfing_target: Option<OrganismId>,
    /// Ticks left before the cell may abandon its current target.
    pub target_lock_remaining: u32,
    /// Pathogens killed and now being digested (bounded by capacity).
    pub digesting: Vec<DigestingPathogen>,
    /// Signatures of previously cleared pathogens (bounded, oldest evicted).
    pub memory: Vec<PathogenSignature>,
    /// Additive detection-radius boost from immunization treatments.
    pub detection_boost: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BodyState {
    pub infected_by: Option<OrganismId>,
    pub damage_level: f32,
    pub regeneration_rate: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum KindState {
    Bacterium { antibiotic_resistance: f32 },
    Virus(VirusState),
    ImmuneCell(ImmuneState),
    BodyCell(BodyState),
}

/// Proposed child. Organisms never insert into the population themselves;
/// the world materializes proposals after the update pass, assigning ids.
#[derive(Clone, Debug)]
pub struct Offspring {
    pub kind: OrganismKind,
    pub position: [f64; 2],
    pub dna: DnaStrand,
    pub energy: f32,
    pub inherited_memory: Vec<PathogenSignature>,
}

/// What an organism perceives of its neighborhood this tick. Computed by the
/// world from the spatial index; "threat" and "food" are kind-relative.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeighborSense {
    pub threat_density: f32,
    pub food_density: f32,
    pub nearest_threat: Option<[f64; 2]>,
    pub nearest_food: Option<[f64; 2]>,
}

const BASE_METABOLIC_COST: f32 = 0.1;
const ACTIVITY_COST: f32 = 0.05;
const NUTRIENT_ENERGY_YIELD: f32 = 2.0;
const SPAWN_OFFSET: f64 = 10.0;
const MOVEMENT_JITTER: f64 = 0.3;

#[derive(Clone, Debug)]
pub struct Organism {
    pub id: OrganismId,
    pub kind: OrganismKind,
    pub position: [f64; 2],
    pub velocity: [f64; 2],
    pub size: f64,
    pub base_speed: f64,
    pub color: [u8; 3],
    pub age: u32,
    pub energy: f32,
    pub health: f32,
    pub alive: bool,
    pub dna: DnaStrand,
    pub traits: TraitProfile,
    pub nn: DecisionNet,
    pub state: KindState,
}

impl Organism {
    /// Create a fresh organism with random DNA of the kind's fixed length.
    pub fn spawn<R: Rng + ?Sized>(
        id: OrganismId,
        kind: OrganismKind,
        position: [f64; 2],
        rng: &mut R,
    ) -> Self {
        let dna = DnaStrand::random(kind.dna_len(), rng);
        Self::from_dna(id, kind, position, dna, 100.0, rng)
    }

    /// Materialize a reproduction proposal. Trait values and decision weights
    /// are recomputed from the (possibly mutated) DNA.
    pub fn from_offspring<R: Rng + ?Sized>(id: OrganismId, offspring: Offspring, rng: &mut R) -> Self {
        let mut org = Self::from_dna(
            id,
            offspring.kind,
            offspring.position,
            offspring.dna,
            offspring.energy,
            rng,
        );
        if let KindState::ImmuneCell(state) = &mut org.state {
            state.memory = offspring.inherited_memory;
        }
        org
    }

    fn from_dna<R: Rng + ?Sized>(
        id: OrganismId,
        kind: OrganismKind,
        position: [f64; 2],
        dna: DnaStrand,
        energy: f32,
        rng: &mut R,
    ) -> Self {
        let traits = TraitProfile::decode(&dna);
        let nn = DecisionNet::from_dna(&dna);
        let state = match kind {
            OrganismKind::Bacterium(_) => KindState::Bacterium {
                antibiotic_resistance: traits.resistance * 0.5,
            },
            OrganismKind::Virus(_) => KindState::Virus(VirusState::default()),
            OrganismKind::ImmuneCell(_) => KindState::ImmuneCell(ImmuneState::default()),
            OrganismKind::BodyCell(_) => KindState::BodyCell(BodyState {
                infected_by: None,
                damage_level: 0.0,
                regeneration_rate: rng.random_range(0.10..0.15),
            }),
        };
        Self {
            id,
            kind,
            position,
            velocity: [0.0, 0.0],
            size: kind.default_size(),
            base_speed: kind.default_speed(),
            color: kind.default_color(),
            age: 0,
            energy,
            health: 100.0,
            alive: true,
            dna,
            traits,
            nn,
            state,
        }
    }

    /// Reduce health, clamped at 0. Death is flagged by the per-tick check,
    /// not here, so a tick's damage sources all land before the verdict.
    pub fn apply_damage(&mut self, amount: f32) {
        self.health = (self.health - amount.max(0.0)).max(0.0);
    }

    pub fn heal(&mut self, amount: f32) {
        self.health = (self.health + amount.max(0.0)).min(100.0);
    }

    pub fn gain_energy(&mut self, amount: f32, config: &SimConfig) {
        self.energy = (self.energy + amount.max(0.0)).min(self.kind.energy_cap(config));
    }

    pub fn signature(&self) -> PathogenSignature {
        PathogenSignature::of(self)
    }

    pub fn virus_state(&self) -> Option<&VirusState> {
        match &self.state {
            KindState::Virus(s) => Some(s),
            _ => None,
        }
    }

    pub fn virus_state_mut(&mut self) -> Option<&mut VirusState> {
        match &mut self.state {
            KindState::Virus(s) => Some(s),
            _ => None,
        }
    }

    pub fn immune_state(&self) -> Option<&ImmuneState> {
        match &self.state {
            KindState::ImmuneCell(s) => Some(s),
            _ => None,
        }
    }

    pub fn immune_state_mut(&mut self) -> Option<&mut ImmuneState> {
        match &mut self.state {
            KindState::ImmuneCell(s) => Some(s),
            _ => None,
        }
    }

    pub fn body_state(&self) -> Option<&BodyState> {
        match &self.state {
            KindState::BodyCell(s) => Some(s),
            _ => None,
        }
    }

    pub fn body_state_mut(&mut self) -> Option<&mut BodyState> {
        match &mut self.state {
            KindState::BodyCell(s) => Some(s),
            _ => None,
        }
    }

    /// Per-tick self-update: sense, decide, move, metabolize, age, and flag
    /// death. Never touches any other organism or shared collection.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        environment: &mut Environment,
        sense: &NeighborSense,
        config: &SimConfig,
        rng: &mut R,
    ) {
        if !self.alive {
            return;
        }
        let conditions = environment.conditions_at(self.position[0], self.position[1]);

        let action = if self.kind.is_body_cell() {
            // Body cells ride the flow; the decision net does not steer them.
            Action::Wander
        } else {
            let cap = self.kind.energy_cap(config);
            let input: [f32; INPUT_SIZE] = [
                (conditions.temperature - 20.0) / 30.0,
                (conditions.ph - 3.0) / 7.0,
                (conditions.nutrients / 200.0).min(1.0),
                conditions.flow,
                sense.threat_density,
                sense.food_density,
                (self.health / 100.0) * (self.energy / cap),
            ];
            Action::select(&self.nn.forward(&input))
        };

        self.apply_movement(action, sense, conditions.flow, rng);
        self.clamp_position(environment.width(), environment.height());

        let speed = (self.velocity[0].powi(2) + self.velocity[1].powi(2)).sqrt() as f32;
        self.energy -= BASE_METABOLIC_COST + ACTIVITY_COST * speed;

        if self.kind.is_bacterium() {
            let taken = environment.consume_nutrients(
                self.position[0],
                self.position[1],
                config.bacteria_nutrient_consumption,
            );
            self.gain_energy(taken * NUTRIENT_ENERGY_YIELD, config);
            self.apply_environmental_stress(conditions.temperature, conditions.ph, conditions.nutrients);
        }

        self.tick_kind_state(config, rng);

        self.age = self.age.saturating_add(1);
        if self.health <= 0.0 || self.energy <= self.kind.energy_floor() {
            self.alive = false;
        }
    }

    fn apply_movement<R: Rng + ?Sized>(
        &mut self,
        action: Action,
        sense: &NeighborSense,
        flow: f32,
        rng: &mut R,
    ) {
        let jx = rng.random_range(-MOVEMENT_JITTER..=MOVEMENT_JITTER);
        let jy = rng.random_range(-MOVEMENT_JITTER..=MOVEMENT_JITTER);

        if self.kind.is_body_cell() {
            self.velocity = [flow as f64 * 2.0 + jx * 0.3, jy * 0.3];
            self.position[0] += self.velocity[0];
            self.position[1] += self.velocity[1];
            return;
        }

        let direction = match action {
            Action::Pursue => sense
                .nearest_food
                .map(|target| Self::unit_toward(self.position, target)),
            Action::Flee => sense
                .nearest_threat
                .map(|threat| Self::unit_away(self.position, threat)),
            Action::Reproduce => Some([0.0, 0.0]),
            Action::Wander => None,
        };
        let direction = direction.unwrap_or([
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
        ]);

        self.velocity = [
            direction[0] * self.base_speed + jx,
            direction[1] * self.base_speed + jy,
        ];
        self.position[0] += self.velocity[0];
        self.position[1] += self.velocity[1];
    }

    /// Gradual damage when local temperature/pH/nutrients sit far from the
    /// organism's preferred band.
    fn apply_environmental_stress(&mut self, temperature: f32, ph: f32, nutrients: f32) {
        let temp_effect = (1.0 - (temperature - self.traits.optimal_temperature()).abs() / 10.0).max(0.0);
        let ph_effect = (1.0 - (ph - self.traits.optimal_ph()).abs() / 2.0).max(0.0);
        let nutrient_effect = (nutrients / 100.0).min(1.0);
        let overall = (temp_effect + ph_effect + nutrient_effect) / 3.0;
        if overall < 0.5 {
            self.apply_damage((0.5 - overall) * 2.0);
        }
    }

    fn tick_kind_state<R: Rng + ?Sized>(&mut self, config: &SimConfig, rng: &mut R) {
        match &mut self.state {
            KindState::Virus(state) => {
                state.replication_cooldown = state.replication_cooldown.saturating_sub(1);
                if state.host.is_none() {
                    state.dormant_counter = state.dormant_counter.saturating_add(1);
                } else {
                    state.dormant_counter = 0;
                }
            }
            KindState::ImmuneCell(state) => {
                state.target_lock_remaining = state.target_lock_remaining.saturating_sub(1);
                let mut gained = 0.0f32;
                state.digesting.retain_mut(|entry| {
                    entry.ticks_remaining = entry.ticks_remaining.saturating_sub(1);
                    if entry.ticks_remaining == 0 {
                        gained += config.digestion_energy_gain;
                        false
                    } else {
                        true
                    }
                });
                if gained > 0.0 {
                    self.energy = (self.energy + gained).min(config.immune_energy_cap);
                }
            }
            KindState::BodyCell(state) => {
                if state.infected_by.is_none() {
                    let rate = state.regeneration_rate;
                    self.health = (self.health + rate).min(100.0);
                } else if rng.random_bool(config.infection_recovery_chance) {
                    state.infected_by = None;
                    log::debug!("body cell {:?} cleared its infection", self.id);
                }
            }
            KindState::Bacterium { .. } => {}
        }
    }

    /// Attempt reproduction. Preconditions failing is a routine outcome that
    /// returns `None` with no side effects on the parent; the population cap
    /// is the caller's concern.
    pub fn reproduce<R: Rng + ?Sized>(
        &mut self,
        config: &SimConfig,
        rng: &mut R,
    ) -> Option<Offspring> {
        if !self.alive {
            return None;
        }
        match self.kind {
            OrganismKind::Bacterium(_) => {
                if self.energy < config.bacteria_reproduction_threshold {
                    return None;
                }
                let rate = config.bacteria_reproduction_rate * self.traits.reproduction_factor();
                if !rng.random_bool(rate.min(1.0)) {
                    return None;
                }
                self.energy -= config.bacteria_reproduction_cost;
                Some(self.make_offspring(
                    config.mutation_rate,
                    config.bacteria_child_energy,
                    SPAWN_OFFSET,
                    rng,
                ))
            }
            OrganismKind::Virus(_) => {
                let state = match &self.state {
                    KindState::Virus(s) => s,
                    _ => return None,
                };
                if state.replication_cooldown > 0
                    || state.dormant_counter >= config.virus_dormancy_threshold
                    || self.energy < config.virus_reproduction_threshold
                {
                    return None;
                }
                if !rng.random_bool(config.replication_rate) {
                    return None;
                }
                self.energy -= config.virus_reproduction_cost;
                let cooldown = rng.random_range(
                    config.replication_cooldown_min..=config.replication_cooldown_max,
                );
                if let KindState::Virus(s) = &mut self.state {
                    s.replication_cooldown = cooldown;
                }
                let rate = (config.mutation_rate * config.virus_mutation_factor).min(1.0);
                Some(self.make_offspring(rate, self.energy * 0.5, SPAWN_OFFSET, rng))
            }
            OrganismKind::ImmuneCell(_) => {
                if self.energy < config.immune_reproduction_threshold {
                    return None;
                }
                if !rng.random_bool(config.immune_reproduction_rate) {
                    return None;
                }
                self.energy -= config.immune_reproduction_cost;
                let memory = self
                    .immune_state()
                    .map(|s| s.memory.clone())
                    .unwrap_or_default();
                let mut offspring =
                    self.make_offspring(config.mutation_rate, 100.0, SPAWN_OFFSET, rng);
                offspring.inherited_memory = memory;
                Some(offspring)
            }
            // Body cells are replenished by the spawn phase, not division.
            OrganismKind::BodyCell(_) => None,
        }
    }

    fn make_offspring<R: Rng + ?Sized>(
        &self,
        mutation_rate: f64,
        energy: f32,
        offset: f64,
        rng: &mut R,
    ) -> Offspring {
        let mut dna = self.dna.clone();
        dna.mutate(rng, mutation_rate);
        let position = [
            self.position[0] + rng.random_range(-offset..=offset),
            self.position[1] + rng.random_range(-offset..=offset),
        ];
        Offspring {
            kind: self.kind,
            position,
            dna,
            energy,
            inherited_memory: Vec::new(),
        }
    }

    fn clamp_position(&mut self, width: f64, height: f64) {
        self.position[0] = self.position[0].clamp(0.0, width - 1e-6);
        self.position[1] = self.position[1].clamp(0.0, height - 1e-6);
    }

    fn unit_toward(from: [f64; 2], to: [f64; 2]) -> [f64; 2] {
        let dx = to[0] - from[0];
        let dy = to[1] - from[1];
        let dist = (dx * dx + dy * dy).sqrt();
        if dist < 1e-9 {
            [0.0, 0.0]
        } else {
            [dx / dist, dy / dist]
        }
    }

    fn unit_away(from: [f64; 2], threat: [f64; 2]) -> [f64; 2] {
        let toward = Self::unit_toward(from, threat);
        [-toward[0], -toward[1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;

    fn config() -> SimConfig {
        SimConfig::default()
    }

    #[test]
    fn spawn_uses_kind_dna_length() {
        let mut rng = create_rng(20);
        let cases = [
            (OrganismKind::Bacterium(BacteriumSpecies::EColi), 100),
            (OrganismKind::Virus(VirusSpecies::Influenza), 80),
            (OrganismKind::ImmuneCell(ImmuneCellRole::Macrophage), 120),
            (OrganismKind::BodyCell(BodyCellRole::Epithelial), 80),
        ];
        for (kind, expected) in cases {
            let org = Organism::spawn(OrganismId(1), kind, [10.0, 10.0], &mut rng);
            assert_eq!(org.dna.len(), expected, "{kind:?}");
            assert_eq!(org.health, 100.0);
            assert_eq!(org.energy, 100.0);
            assert!(org.alive);
        }
    }

    #[test]
    fn capability_predicates_exclude_protected_kinds() {
        assert!(OrganismKind::Virus(VirusSpecies::Influenza).is_engulfable());
        assert!(OrganismKind::Bacterium(BacteriumSpecies::EColi).is_engulfable());
        assert!(!OrganismKind::Bacterium(BacteriumSpecies::Beneficial).is_engulfable());
        assert!(!OrganismKind::ImmuneCell(ImmuneCellRole::Neutrophil).is_engulfable());
        assert!(!OrganismKind::BodyCell(BodyCellRole::Epithelial).is_engulfable());

        assert!(OrganismKind::BodyCell(BodyCellRole::Epithelial).is_infectable());
        assert!(OrganismKind::BodyCell(BodyCellRole::RedBlood).is_infectable());
        assert!(!OrganismKind::BodyCell(BodyCellRole::Platelet).is_infectable());
        assert!(!OrganismKind::Bacterium(BacteriumSpecies::EColi).is_infectable());
    }

    #[test]
    fn damage_and_heal_clamp_health_to_bounds() {
        let mut rng = create_rng(21);
        let mut org = Organism::spawn(
            OrganismId(1),
            OrganismKind::Bacterium(BacteriumSpecies::EColi),
            [0.0, 0.0],
            &mut rng,
        );
        org.apply_damage(250.0);
        assert_eq!(org.health, 0.0);
        org.heal(500.0);
        assert_eq!(org.health, 100.0);
    }

    #[test]
    fn update_clamps_position_to_world_bounds() {
        let cfg = config();
        let mut env = Environment::new(&cfg);
        let mut rng = create_rng(22);
        let mut org = Organism::spawn(
            OrganismId(1),
            OrganismKind::Virus(VirusSpecies::Influenza),
            [cfg.world_width - 0.1, 0.1],
            &mut rng,
        );
        for _ in 0..200 {
            org.update(&mut env, &NeighborSense::default(), &cfg, &mut rng);
            assert!(org.position[0] >= 0.0 && org.position[0] < cfg.world_width);
            assert!(org.position[1] >= 0.0 && org.position[1] < cfg.world_height);
        }
    }

    #[test]
    fn update_flags_death_at_zero_health_without_removal() {
        let cfg = config();
        let mut env = Environment::new(&cfg);
        let mut rng = create_rng(23);
        let mut org = Organism::spawn(
            OrganismId(1),
            OrganismKind::Bacterium(BacteriumSpecies::EColi),
            [10.0, 10.0],
            &mut rng,
        );
        org.health = 0.5;
        org.apply_damage(1.0);
        org.update(&mut env, &NeighborSense::default(), &cfg, &mut rng);
        assert!(!org.alive);
    }

    #[test]
    fn reproduce_below_threshold_is_a_noop() {
        let cfg = config();
        let mut rng = create_rng(24);
        let mut org = Organism::spawn(
            OrganismId(1),
            OrganismKind::Bacterium(BacteriumSpecies::EColi),
            [10.0, 10.0],
            &mut rng,
        );
        org.energy = cfg.bacteria_reproduction_threshold - 1.0;
        let before_energy = org.energy;
        let before_dna = org.dna.clone();
        for _ in 0..100 {
            assert!(org.reproduce(&cfg, &mut rng).is_none());
        }
        assert_eq!(org.energy, before_energy);
        assert_eq!(org.dna, before_dna);
    }

    #[test]
    fn bacterium_reproduction_deducts_cost_and_preserves_dna_length() {
        let mut cfg = config();
        cfg.bacteria_reproduction_rate = 1.0;
        let mut rng = create_rng(25);
        let mut org = Organism::spawn(
            OrganismId(1),
            OrganismKind::Bacterium(BacteriumSpecies::EColi),
            [10.0, 10.0],
            &mut rng,
        );
        org.energy = 120.0;
        let offspring = org.reproduce(&cfg, &mut rng).expect("should reproduce");
        assert_eq!(org.energy, 120.0 - cfg.bacteria_reproduction_cost);
        assert_eq!(offspring.dna.len(), org.dna.len());
        assert_eq!(offspring.energy, cfg.bacteria_child_energy);
        assert_eq!(offspring.kind, org.kind);
    }

    #[test]
    fn dna_length_invariant_over_generations() {
        let mut cfg = config();
        cfg.bacteria_reproduction_rate = 1.0;
        cfg.mutation_rate = 0.05;
        let mut rng = create_rng(26);
        let mut parent = Organism::spawn(
            OrganismId(1),
            OrganismKind::Bacterium(BacteriumSpecies::Streptococcus),
            [10.0, 10.0],
            &mut rng,
        );
        for generation in 0..20 {
            parent.energy = 120.0;
            let offspring = parent.reproduce(&cfg, &mut rng).expect("should reproduce");
            assert_eq!(offspring.dna.len(), constants::BACTERIUM_DNA_LEN, "gen {generation}");
            parent = Organism::from_offspring(OrganismId(generation + 2), offspring, &mut rng);
        }
    }

    #[test]
    fn virus_reproduction_respects_cooldown_and_dormancy() {
        let mut cfg = config();
        cfg.replication_rate = 1.0;
        let mut rng = create_rng(27);
        let mut virus = Organism::spawn(
            OrganismId(1),
            OrganismKind::Virus(VirusSpecies::Influenza),
            [10.0, 10.0],
            &mut rng,
        );
        virus.energy = 150.0;

        virus.virus_state_mut().unwrap().replication_cooldown = 5;
        assert!(virus.reproduce(&cfg, &mut rng).is_none());

        virus.virus_state_mut().unwrap().replication_cooldown = 0;
        virus.virus_state_mut().unwrap().dormant_counter = cfg.virus_dormancy_threshold;
        assert!(virus.reproduce(&cfg, &mut rng).is_none());

        virus.virus_state_mut().unwrap().dormant_counter = 0;
        let offspring = virus.reproduce(&cfg, &mut rng).expect("should replicate");
        assert!(virus.virus_state().unwrap().replication_cooldown >= cfg.replication_cooldown_min);
        assert_eq!(offspring.kind, virus.kind);
    }

    #[test]
    fn immune_offspring_inherits_memory() {
        let mut cfg = config();
        cfg.immune_reproduction_rate = 1.0;
        let mut rng = create_rng(28);
        let mut cell = Organism::spawn(
            OrganismId(1),
            OrganismKind::ImmuneCell(ImmuneCellRole::Neutrophil),
            [10.0, 10.0],
            &mut rng,
        );
        let pathogen = Organism::spawn(
            OrganismId(2),
            OrganismKind::Virus(VirusSpecies::Influenza),
            [12.0, 10.0],
            &mut rng,
        );
        let signature = pathogen.signature();
        cell.immune_state_mut().unwrap().memory.push(signature.clone());
        cell.energy = 150.0;
        let offspring = cell.reproduce(&cfg, &mut rng).expect("should divide");
        assert_eq!(offspring.inherited_memory, vec![signature]);
        let child = Organism::from_offspring(OrganismId(3), offspring, &mut rng);
        assert_eq!(child.immune_state().unwrap().memory.len(), 1);
    }

    #[test]
    fn body_cells_never_reproduce() {
        let cfg = config();
        let mut rng = create_rng(29);
        let mut cell = Organism::spawn(
            OrganismId(1),
            OrganismKind::BodyCell(BodyCellRole::Epithelial),
            [10.0, 10.0],
            &mut rng,
        );
        cell.energy = 1000.0;
        assert!(cell.reproduce(&cfg, &mut rng).is_none());
    }

    #[test]
    fn uninfected_body_cell_regenerates_health() {
        let cfg = config();
        let mut env = Environment::new(&cfg);
        let mut rng = create_rng(30);
        let mut cell = Organism::spawn(
            OrganismId(1),
            OrganismKind::BodyCell(BodyCellRole::Epithelial),
            [100.0, 100.0],
            &mut rng,
        );
        cell.health = 50.0;
        cell.update(&mut env, &NeighborSense::default(), &cfg, &mut rng);
        assert!(cell.health > 50.0);
    }

    #[test]
    fn digestion_completes_and_grants_energy() {
        let cfg = config();
        let mut env = Environment::new(&cfg);
        let mut rng = create_rng(31);
        let mut cell = Organism::spawn(
            OrganismId(1),
            OrganismKind::ImmuneCell(ImmuneCellRole::Macrophage),
            [100.0, 100.0],
            &mut rng,
        );
        let pathogen = Organism::spawn(
            OrganismId(2),
            OrganismKind::Bacterium(BacteriumSpecies::EColi),
            [100.0, 100.0],
            &mut rng,
        );
        cell.immune_state_mut().unwrap().digesting.push(DigestingPathogen {
            signature: pathogen.signature(),
            ticks_remaining: 1,
        });
        cell.energy = 50.0;
        cell.update(&mut env, &NeighborSense::default(), &cfg, &mut rng);
        assert!(cell.immune_state().unwrap().digesting.is_empty());
        assert!(cell.energy > 50.0);
    }
}
