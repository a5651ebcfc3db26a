//! Save/load support. A snapshot stores each organism's DNA and raw state;
//! derived data (trait profile, decision weights) is recomputed from DNA on
//! load. Cross-references (virus host, immune target, cell infection) are
//! stored as ids and re-resolved against the loaded population; a dangling
//! reference degrades to "no reference" with a warning, never an error.

use crate::config::{EnvironmentProfile, SimConfig, SimConfigError};
use crate::dna::{DnaStrand, TraitProfile};
use crate::environment::Environment;
use crate::nn::DecisionNet;
use crate::organism::{KindState, Organism, OrganismId, OrganismKind};
use crate::rng::derive_stream_rng;
use crate::spatial::SpatialGrid;
use crate::treatments::Treatment;
use crate::world::World;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::{error::Error, fmt};

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SNAPSHOT_SCHEMA_VERSION
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config: SimConfig,
    pub tick: usize,
    pub next_id: u64,
    pub total_births: usize,
    pub total_deaths: usize,
    #[serde(default)]
    pub treatments: Vec<Treatment>,
    pub environment: EnvironmentSnapshot,
    pub organisms: Vec<OrganismRecord>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub profile: EnvironmentProfile,
    pub transition_remaining: usize,
    pub tick_count: usize,
    pub temperature: Vec<f32>,
    pub ph: Vec<f32>,
    pub nutrients: Vec<f32>,
    pub flow: Vec<f32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrganismRecord {
    pub id: u64,
    pub kind: OrganismKind,
    pub position: [f64; 2],
    pub velocity: [f64; 2],
    pub size: f64,
    pub base_speed: f64,
    pub color: [u8; 3],
    pub age: u32,
    pub energy: f32,
    pub health: f32,
    #[serde(default = "default_true")]
    pub alive: bool,
    pub dna: DnaStrand,
    pub state: KindState,
}

fn default_true() -> bool {
    true
}

#[derive(Debug)]
pub enum SnapshotError {
    UnsupportedSchemaVersion { found: u32, supported: u32 },
    InvalidConfig(SimConfigError),
    GridSizeMismatch { field: &'static str, expected: usize, actual: usize },
    DuplicateOrganismId(u64),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::UnsupportedSchemaVersion { found, supported } => {
                write!(f, "unsupported snapshot schema version {found} (supported: {supported})")
            }
            SnapshotError::InvalidConfig(err) => write!(f, "snapshot carries invalid config: {err}"),
            SnapshotError::GridSizeMismatch { field, expected, actual } => {
                write!(f, "{field} grid length {actual} does not match expected {expected}")
            }
            SnapshotError::DuplicateOrganismId(id) => {
                write!(f, "snapshot contains duplicate organism id {id}")
            }
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SnapshotError::InvalidConfig(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SimConfigError> for SnapshotError {
    fn from(err: SimConfigError) -> Self {
        SnapshotError::InvalidConfig(err)
    }
}

impl World {
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            config: self.config.clone(),
            tick: self.tick,
            next_id: self.next_id,
            total_births: self.total_births,
            total_deaths: self.total_deaths,
            treatments: self.treatments.clone(),
            environment: EnvironmentSnapshot {
                profile: self.environment.profile(),
                transition_remaining: self.environment.transition_remaining(),
                tick_count: self.environment.tick_count(),
                temperature: self.environment.temperature_grid().to_vec(),
                ph: self.environment.ph_grid().to_vec(),
                nutrients: self.environment.nutrient_grid().to_vec(),
                flow: self.environment.flow_grid().to_vec(),
            },
            organisms: self
                .organisms
                .iter()
                .filter(|o| o.alive)
                .map(OrganismRecord::of)
                .collect(),
        }
    }

    pub fn from_snapshot(snapshot: WorldSnapshot) -> Result<World, SnapshotError> {
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(SnapshotError::UnsupportedSchemaVersion {
                found: snapshot.schema_version,
                supported: SNAPSHOT_SCHEMA_VERSION,
            });
        }
        snapshot.config.validate()?;

        let mut environment = Environment::new(&snapshot.config);
        let expected = environment.cols() * environment.rows();
        let env = snapshot.environment;
        for (field, len) in [
            ("temperature", env.temperature.len()),
            ("ph", env.ph.len()),
            ("nutrients", env.nutrients.len()),
            ("flow", env.flow.len()),
        ] {
            if len != expected {
                return Err(SnapshotError::GridSizeMismatch { field, expected, actual: len });
            }
        }
        environment.load_state(
            env.profile,
            env.transition_remaining,
            env.tick_count,
            env.temperature,
            env.ph,
            env.nutrients,
            env.flow,
        );

        let mut seen = HashSet::with_capacity(snapshot.organisms.len());
        let mut max_id = 0u64;
        for record in &snapshot.organisms {
            if !seen.insert(record.id) {
                return Err(SnapshotError::DuplicateOrganismId(record.id));
            }
            max_id = max_id.max(record.id);
        }

        let mut organisms: Vec<Organism> =
            snapshot.organisms.into_iter().map(OrganismRecord::restore).collect();
        resolve_references(&mut organisms, &seen);

        let spatial = SpatialGrid::new(
            snapshot.config.world_width,
            snapshot.config.world_height,
            snapshot.config.spatial_cell_size,
        );
        // The RNG stream is not persisted; derive a fresh stream from the
        // seed and the resume tick so a resumed run does not replay the
        // original run's draws.
        let rng = derive_stream_rng(snapshot.config.seed, snapshot.tick as u64);

        let mut world = World {
            environment,
            spatial,
            rng,
            organisms,
            registry: std::collections::HashMap::new(),
            next_id: snapshot.next_id.max(max_id + 1),
            tick: snapshot.tick,
            treatments: snapshot.treatments,
            total_births: snapshot.total_births,
            total_deaths: snapshot.total_deaths,
            config: snapshot.config,
        };
        world.rebuild_registry();
        world.rebuild_spatial();
        Ok(world)
    }
}

/// Null out any id reference that does not resolve to a loaded organism.
fn resolve_references(organisms: &mut [Organism], ids: &HashSet<u64>) {
    let lives = |id: &OrganismId| ids.contains(&id.0);
    for org in organisms {
        match &mut org.state {
            KindState::Virus(state) => {
                if state.host.is_some_and(|id| !lives(&id)) {
                    log::warn!("virus {:?}: host reference dangling, unlinking", org.id);
                    state.host = None;
                }
            }
            KindState::ImmuneCell(state) => {
                if state.engulfing_target.is_some_and(|id| !lives(&id)) {
                    log::warn!("immune cell {:?}: target reference dangling, unlinking", org.id);
                    state.engulfing_target = None;
                    state.target_lock_remaining = 0;
                }
            }
            KindState::BodyCell(state) => {
                if state.infected_by.is_some_and(|id| !lives(&id)) {
                    log::warn!("body cell {:?}: infecting virus dangling, clearing", org.id);
                    state.infected_by = None;
                }
            }
            KindState::Bacterium { .. } => {}
        }
    }
}

impl OrganismRecord {
    fn of(org: &Organism) -> Self {
        Self {
            id: org.id.0,
            kind: org.kind,
            position: org.position,
            velocity: org.velocity,
            size: org.size,
            base_speed: org.base_speed,
            color: org.color,
            age: org.age,
            energy: org.energy,
            health: org.health,
            alive: org.alive,
            dna: org.dna.clone(),
            state: org.state.clone(),
        }
    }

    fn restore(self) -> Organism {
        let traits = TraitProfile::decode(&self.dna);
        let nn = DecisionNet::from_dna(&self.dna);
        Organism {
            id: OrganismId(self.id),
            kind: self.kind,
            position: self.position,
            velocity: self.velocity,
            size: self.size,
            base_speed: self.base_speed,
            color: self.color,
            age: self.age,
            energy: self.energy,
            health: self.health,
            alive: self.alive,
            dna: self.dna,
            traits,
            nn,
            state: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SimConfig {
        SimConfig {
            world_width: 400.0,
            world_height: 300.0,
            initial_bacteria: 6,
            initial_viruses: 4,
            initial_immune_cells: 3,
            initial_body_cells: 8,
            ..SimConfig::default()
        }
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut world = World::new(small_config()).expect("world should build");
        for _ in 0..25 {
            world.step();
        }
        let snapshot = world.snapshot();
        let json = serde_json::to_string(&snapshot).expect("snapshot should serialize");
        let parsed: WorldSnapshot = serde_json::from_str(&json).expect("snapshot should parse");
        let restored = World::from_snapshot(parsed).expect("snapshot should load");

        assert_eq!(restored.tick(), world.tick());
        assert_eq!(restored.organisms().len(), world.organisms().len());
        assert_eq!(restored.population_stats(), world.population_stats());
        for (a, b) in world.organisms().iter().zip(restored.organisms()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.kind, b.kind);
            assert_eq!(a.position, b.position);
            assert_eq!(a.dna, b.dna);
            // Derived data is recomputed, not stored.
            assert_eq!(a.traits, b.traits);
            assert_eq!(a.nn.to_weight_vec(), b.nn.to_weight_vec());
        }
        assert_eq!(
            restored.environment().nutrient_grid(),
            world.environment().nutrient_grid()
        );
    }

    #[test]
    fn dangling_host_reference_degrades_to_hostless() {
        let world = World::new(small_config()).expect("world should build");
        let mut snapshot = world.snapshot();
        let virus = snapshot
            .organisms
            .iter_mut()
            .find(|r| r.kind.is_virus())
            .expect("config seeds viruses");
        if let KindState::Virus(state) = &mut virus.state {
            state.host = Some(OrganismId(u64::MAX));
        }
        let restored = World::from_snapshot(snapshot).expect("snapshot should load");
        let virus = restored
            .organisms()
            .iter()
            .find(|o| o.kind.is_virus())
            .expect("virus survives the round trip");
        assert_eq!(virus.virus_state().expect("is a virus").host, None);
    }

    #[test]
    fn rejects_unknown_schema_version() {
        let world = World::new(small_config()).expect("world should build");
        let mut snapshot = world.snapshot();
        snapshot.schema_version = 999;
        assert!(matches!(
            World::from_snapshot(snapshot),
            Err(SnapshotError::UnsupportedSchemaVersion { found: 999, .. })
        ));
    }

    #[test]
    fn rejects_grid_length_mismatch() {
        let world = World::new(small_config()).expect("world should build");
        let mut snapshot = world.snapshot();
        snapshot.environment.nutrients.pop();
        assert!(matches!(
            World::from_snapshot(snapshot),
            Err(SnapshotError::GridSizeMismatch { field: "nutrients", .. })
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let world = World::new(small_config()).expect("world should build");
        let mut snapshot = world.snapshot();
        let first = snapshot.organisms[0].id;
        snapshot.organisms[1].id = first;
        assert!(matches!(
            World::from_snapshot(snapshot),
            Err(SnapshotError::DuplicateOrganismId(id)) if id == first
        ));
    }
}
