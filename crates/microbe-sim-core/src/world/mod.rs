//! Simulation container and the per-tick pipeline.
//!
//! A tick runs fixed phases in order: treatments, environment, spatial-index
//! rebuild, per-organism updates, pairwise interactions, reproduction,
//! body-cell replenishment, and finally removal of the dead. Phases that
//! mutate the population do so through proposal lists applied afterwards, so
//! no phase ever inserts or removes mid-iteration.

mod phases;

use crate::config::{SimConfig, SimConfigError};
use crate::environment::Environment;
use crate::metrics::{PopulationStats, StepSummary};
use crate::organism::{
    BacteriumSpecies, BodyCellRole, ImmuneCellRole, Offspring, Organism, OrganismId, OrganismKind,
    VirusSpecies,
};
use crate::rng::create_rng;
use crate::spatial::SpatialGrid;
use crate::treatments::Treatment;
use rand::Rng;
use rand_chacha::ChaCha12Rng;
use std::collections::HashMap;
use std::{error::Error, fmt};

#[derive(Debug, Clone, PartialEq)]
pub enum WorldInitError {
    InvalidConfig(SimConfigError),
    InitialPopulationExceedsCap { requested: usize, max: usize },
}

impl fmt::Display for WorldInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldInitError::InvalidConfig(err) => write!(f, "invalid configuration: {err}"),
            WorldInitError::InitialPopulationExceedsCap { requested, max } => write!(
                f,
                "initial population ({requested}) exceeds max_organisms ({max})"
            ),
        }
    }
}

impl Error for WorldInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorldInitError::InvalidConfig(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SimConfigError> for WorldInitError {
    fn from(err: SimConfigError) -> Self {
        WorldInitError::InvalidConfig(err)
    }
}

pub struct World {
    pub(crate) config: SimConfig,
    pub(crate) environment: Environment,
    pub(crate) organisms: Vec<Organism>,
    /// id -> index into `organisms`; rebuilt whenever the vec is compacted.
    pub(crate) registry: HashMap<OrganismId, usize>,
    pub(crate) spatial: SpatialGrid,
    pub(crate) rng: ChaCha12Rng,
    pub(crate) next_id: u64,
    pub(crate) tick: usize,
    pub(crate) treatments: Vec<Treatment>,
    pub(crate) total_births: usize,
    pub(crate) total_deaths: usize,
}

impl World {
    pub fn new(config: SimConfig) -> Result<World, WorldInitError> {
        config.validate()?;
        let requested = config.initial_bacteria
            + config.initial_viruses
            + config.initial_immune_cells
            + config.initial_body_cells;
        if requested > config.max_organisms {
            return Err(WorldInitError::InitialPopulationExceedsCap {
                requested,
                max: config.max_organisms,
            });
        }

        let environment = Environment::new(&config);
        let spatial = SpatialGrid::new(
            config.world_width,
            config.world_height,
            config.spatial_cell_size,
        );
        let rng = create_rng(config.seed);
        let mut world = World {
            environment,
            spatial,
            rng,
            organisms: Vec::with_capacity(requested),
            registry: HashMap::with_capacity(requested),
            next_id: 1,
            tick: 0,
            treatments: Vec::new(),
            total_births: 0,
            total_deaths: 0,
            config,
        };
        world.seed_initial_population();
        // The seed population is not counted as births.
        world.total_births = 0;
        world.rebuild_registry();
        world.rebuild_spatial();
        Ok(world)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn organisms(&self) -> &[Organism] {
        &self.organisms
    }

    pub fn tick(&self) -> usize {
        self.tick
    }

    pub fn population_stats(&self) -> PopulationStats {
        PopulationStats::collect(&self.organisms, self.total_births, self.total_deaths)
    }

    /// Queue a treatment; it takes effect from the next tick and expires on
    /// its own.
    pub fn add_treatment(&mut self, treatment: Treatment) {
        log::info!(
            "treatment added: {:?} strength {:.2} for {} ticks",
            treatment.kind,
            treatment.strength,
            treatment.duration
        );
        self.treatments.push(treatment);
    }

    pub fn active_treatments(&self) -> &[Treatment] {
        &self.treatments
    }

    /// Switch the environment to a new profile (gradual transition).
    pub fn set_profile(&mut self, profile: crate::config::EnvironmentProfile) {
        log::info!("environment profile set to {profile:?}");
        self.environment.set_profile(profile);
    }

    /// Advance the simulation by one tick.
    pub fn step(&mut self) -> StepSummary {
        self.tick += 1;
        let births_before = self.total_births;
        let deaths_before = self.total_deaths;

        self.apply_treatments_phase();
        self.environment.step(&mut self.rng);
        self.rebuild_spatial();
        self.update_organisms_phase();
        self.interaction_phase();
        self.reproduction_phase();
        self.spawn_body_cells_phase();
        self.remove_dead_phase();

        let population = self.organisms.len();
        StepSummary {
            tick: self.tick,
            births: self.total_births - births_before,
            deaths: self.total_deaths - deaths_before,
            population,
        }
    }

    fn seed_initial_population(&mut self) {
        let bacteria_species = [
            BacteriumSpecies::EColi,
            BacteriumSpecies::Streptococcus,
            BacteriumSpecies::Beneficial,
        ];
        let virus_species = [VirusSpecies::Influenza, VirusSpecies::Rhinovirus];
        let immune_roles = [ImmuneCellRole::Neutrophil, ImmuneCellRole::Macrophage];
        let body_roles = [
            BodyCellRole::Epithelial,
            BodyCellRole::Epithelial,
            BodyCellRole::Epithelial,
            BodyCellRole::RedBlood,
            BodyCellRole::Platelet,
        ];

        for i in 0..self.config.initial_bacteria {
            let kind = OrganismKind::Bacterium(bacteria_species[i % bacteria_species.len()]);
            self.spawn_at_random(kind);
        }
        for i in 0..self.config.initial_viruses {
            let kind = OrganismKind::Virus(virus_species[i % virus_species.len()]);
            self.spawn_at_random(kind);
        }
        for i in 0..self.config.initial_immune_cells {
            let kind = OrganismKind::ImmuneCell(immune_roles[i % immune_roles.len()]);
            self.spawn_at_random(kind);
        }
        for i in 0..self.config.initial_body_cells {
            let kind = OrganismKind::BodyCell(body_roles[i % body_roles.len()]);
            self.spawn_at_random(kind);
        }
    }

    pub(crate) fn spawn_at_random(&mut self, kind: OrganismKind) {
        let position = [
            self.rng.random_range(0.0..self.config.world_width),
            self.rng.random_range(0.0..self.config.world_height),
        ];
        self.spawn_at(kind, position);
    }

    pub(crate) fn spawn_at(&mut self, kind: OrganismKind, position: [f64; 2]) {
        let id = self.allocate_id();
        let organism = Organism::spawn(id, kind, position, &mut self.rng);
        self.registry.insert(id, self.organisms.len());
        self.organisms.push(organism);
        self.total_births += 1;
    }

    /// Materialize a reproduction proposal into the population.
    pub(crate) fn insert_offspring(&mut self, offspring: Offspring) {
        let id = self.allocate_id();
        let mut organism = Organism::from_offspring(id, offspring, &mut self.rng);
        organism.position[0] = organism.position[0].clamp(0.0, self.config.world_width - 1e-6);
        organism.position[1] = organism.position[1].clamp(0.0, self.config.world_height - 1e-6);
        self.registry.insert(id, self.organisms.len());
        self.organisms.push(organism);
        self.total_births += 1;
    }

    fn allocate_id(&mut self) -> OrganismId {
        let id = OrganismId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Resolve an id to its population index, treating dead or vanished
    /// organisms as lost.
    pub(crate) fn index_of_living(&self, id: OrganismId) -> Option<usize> {
        let index = *self.registry.get(&id)?;
        let org = self.organisms.get(index)?;
        (org.id == id && org.alive).then_some(index)
    }

    pub(crate) fn rebuild_registry(&mut self) {
        self.registry.clear();
        for (index, org) in self.organisms.iter().enumerate() {
            self.registry.insert(org.id, index);
        }
    }

    pub(crate) fn rebuild_spatial(&mut self) {
        self.spatial.rebuild(
            self.organisms
                .iter()
                .enumerate()
                .filter(|(_, o)| o.alive)
                .map(|(i, o)| (i, o.position)),
        );
    }

    pub(crate) fn alive_count(&self) -> usize {
        self.organisms.iter().filter(|o| o.alive).count()
    }
}
