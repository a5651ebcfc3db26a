use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Named preset of baseline environmental conditions the grids drift toward.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentProfile {
    #[default]
    Intestine,
    Skin,
    Mouth,
}

/// Baseline condition values for a profile: (temperature °C, pH, nutrients, flow).
impl EnvironmentProfile {
    pub fn baselines(self) -> (f32, f32, f32, f32) {
        match self {
            EnvironmentProfile::Intestine => (37.0, 6.5, 150.0, 0.4),
            EnvironmentProfile::Skin => (33.0, 5.5, 40.0, 0.05),
            EnvironmentProfile::Mouth => (35.0, 6.8, 90.0, 0.25),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed for reproducible simulation runs.
    pub seed: u64,
    /// World width in world units.
    pub world_width: f64,
    /// World height in world units.
    pub world_height: f64,
    /// Starting environment profile.
    pub profile: EnvironmentProfile,
    /// Side length of one condition-grid cell in world units.
    pub environment_grid_resolution: f64,
    /// Per-tick nutrient regeneration toward the profile baseline.
    pub nutrient_regen_rate: f32,
    /// Base fraction of each cell's nutrients redistributed to neighbors per tick.
    pub diffusion_rate: f32,
    /// Additional diffusion fraction per unit of local flow.
    pub flow_diffusion_scale: f32,
    /// Ticks between random baseline perturbations (0 disables shifts).
    pub environment_shift_interval: usize,
    /// Ticks a profile transition takes after the immediate jump.
    pub profile_transition_steps: usize,
    /// Fraction of the profile gap applied immediately on `set_profile`.
    pub profile_transition_immediate: f32,

    /// Initial population per kind.
    pub initial_bacteria: usize,
    pub initial_viruses: usize,
    pub initial_immune_cells: usize,
    pub initial_body_cells: usize,
    /// Hard cap on the total organism population.
    pub max_organisms: usize,
    /// Extra distance beyond combined sizes at which two organisms interact.
    pub interaction_radius: f64,
    /// Side length of one spatial-index bucket in world units.
    pub spatial_cell_size: f64,

    /// Per-token DNA substitution probability at reproduction.
    pub mutation_rate: f64,
    /// Multiplier applied to `mutation_rate` for virus offspring.
    pub virus_mutation_factor: f64,

    /// Probability per eligible tick that a bacterium divides.
    pub bacteria_reproduction_rate: f64,
    /// Energy a bacterium needs before it can divide.
    pub bacteria_reproduction_threshold: f32,
    /// Energy deducted from a dividing bacterium.
    pub bacteria_reproduction_cost: f32,
    /// Energy a bacterial daughter cell starts with.
    pub bacteria_child_energy: f32,
    /// Nutrients a bacterium draws from its grid cell per tick.
    pub bacteria_nutrient_consumption: f32,
    /// Health a harmful bacterium takes from a body cell per tick of contact.
    pub bacteria_attack_damage: f32,
    /// Energy an attacking bacterium gains per point of damage dealt.
    pub bacteria_attack_energy_factor: f32,
    /// Strength multiple one bacterium needs over a neighbor before it can
    /// siphon the weaker one's energy.
    pub bacteria_competition_margin: f32,
    /// Energy transferred per tick when a competition contest is won.
    pub bacteria_competition_transfer: f32,
    /// Energy ceiling for bacteria and viruses.
    pub pathogen_energy_cap: f32,

    /// Base probability an infection attempt succeeds.
    pub infection_chance: f64,
    /// Per-tick health drained from an infected host.
    pub virulence: f32,
    /// Probability per eligible tick that a free virus replicates.
    pub replication_rate: f64,
    /// Offspring spawned when an infected host dies.
    pub viral_burst_count: usize,
    /// Max radius of the random offset applied to burst offspring positions.
    pub viral_burst_offset: f64,
    /// Energy each burst offspring starts with.
    pub burst_offspring_energy: f32,
    /// Energy a hosted virus siphons per point of health drained.
    pub host_drain_energy_factor: f32,
    /// Ticks a virus waits between free replications (lower bound).
    pub replication_cooldown_min: u32,
    /// Ticks a virus waits between free replications (upper bound).
    pub replication_cooldown_max: u32,
    /// Hostless ticks after which a virus goes dormant.
    pub virus_dormancy_threshold: u32,
    /// Energy a free virus needs before it can replicate.
    pub virus_reproduction_threshold: f32,
    /// Energy deducted from a replicating virus.
    pub virus_reproduction_cost: f32,
    /// Cap on virus births per tick (viruses get reproduction priority).
    pub max_virus_reproductions_per_tick: usize,

    /// Energy an immune cell needs before it can divide.
    pub immune_reproduction_threshold: f32,
    /// Probability per eligible tick that an immune cell divides.
    pub immune_reproduction_rate: f64,
    /// Energy deducted from a dividing immune cell.
    pub immune_reproduction_cost: f32,
    /// Energy ceiling for immune cells.
    pub immune_energy_cap: f32,
    /// Ticks an immune cell stays locked on its current target.
    pub immune_target_lock_ticks: u32,
    /// Ticks a macrophage takes to digest one engulfed pathogen.
    pub digestion_ticks: u32,
    /// Energy gained when digestion of one pathogen completes.
    pub digestion_energy_gain: f32,
    /// Max pathogen signatures retained in immune memory (oldest evicted).
    pub immune_memory_capacity: usize,

    /// Engulf-acquisition probability for antibody-marked pathogens.
    pub engulf_chance_marked: f64,
    /// Engulf-acquisition probability for weakened pathogens (health < 50%).
    pub engulf_chance_weakened: f64,
    /// Engulf-acquisition probability for pathogenic bacteria.
    pub engulf_chance_bacteria: f64,
    /// Engulf-acquisition probability for unmarked, healthy viruses.
    pub engulf_chance_virus: f64,
    /// Max bonus added as target health ratio falls below 50%.
    pub engulf_weakness_bonus: f64,
    /// Multiplier applied when the target matches a remembered signature.
    pub engulf_memory_factor: f64,

    /// Per-tick health regained by uninfected body cells.
    pub body_cell_regeneration: f32,
    /// Probability per tick that an infected body cell clears its infection.
    pub infection_recovery_chance: f64,
    /// Ticks between body-cell spawn waves at the inflow edge (0 disables).
    pub cell_spawn_interval: usize,
    /// Body cells spawned per wave.
    pub cell_spawn_count: usize,
    /// Width of the inflow strip at the left edge where spawn waves land.
    pub cell_spawn_strip_width: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            world_width: 800.0,
            world_height: 600.0,
            profile: EnvironmentProfile::Intestine,
            environment_grid_resolution: 20.0,
            nutrient_regen_rate: 0.01,
            diffusion_rate: 0.01,
            flow_diffusion_scale: 0.1,
            environment_shift_interval: 500,
            profile_transition_steps: 100,
            profile_transition_immediate: 0.5,

            initial_bacteria: 20,
            initial_viruses: 10,
            initial_immune_cells: 8,
            initial_body_cells: 30,
            max_organisms: 300,
            interaction_radius: 10.0,
            spatial_cell_size: 50.0,

            mutation_rate: 0.01,
            virus_mutation_factor: 2.5,

            bacteria_reproduction_rate: 0.04,
            bacteria_reproduction_threshold: 80.0,
            bacteria_reproduction_cost: 50.0,
            bacteria_child_energy: 60.0,
            bacteria_nutrient_consumption: 0.5,
            bacteria_attack_damage: 0.8,
            bacteria_attack_energy_factor: 2.0,
            bacteria_competition_margin: 1.2,
            bacteria_competition_transfer: 2.0,
            pathogen_energy_cap: 150.0,

            infection_chance: 0.4,
            virulence: 0.8,
            replication_rate: 0.5,
            viral_burst_count: 5,
            viral_burst_offset: 15.0,
            burst_offspring_energy: 60.0,
            host_drain_energy_factor: 5.0,
            replication_cooldown_min: 30,
            replication_cooldown_max: 40,
            virus_dormancy_threshold: 70,
            virus_reproduction_threshold: 100.0,
            virus_reproduction_cost: 40.0,
            max_virus_reproductions_per_tick: 10,

            immune_reproduction_threshold: 140.0,
            immune_reproduction_rate: 0.0005,
            immune_reproduction_cost: 80.0,
            immune_energy_cap: 100.0,
            immune_target_lock_ticks: 50,
            digestion_ticks: 80,
            digestion_energy_gain: 30.0,
            immune_memory_capacity: 8,

            engulf_chance_marked: 0.8,
            engulf_chance_weakened: 0.7,
            engulf_chance_bacteria: 0.5,
            engulf_chance_virus: 0.25,
            engulf_weakness_bonus: 0.5,
            engulf_memory_factor: 1.3,

            body_cell_regeneration: 0.1,
            infection_recovery_chance: 0.001,
            cell_spawn_interval: 100,
            cell_spawn_count: 2,
            cell_spawn_strip_width: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimConfigError {
    NonPositiveWorldDimensions { width: f64, height: f64 },
    WorldTooLarge { max: f64, actual: f64 },
    NonPositiveGridResolution(f64),
    NonPositiveSpatialCellSize(f64),
    ZeroMaxOrganisms,
    NonPositiveSpawnStripWidth(f64),
    ProbabilityOutOfRange { field: &'static str, value: f64 },
    ZeroViralBurstCount,
    InvalidCooldownRange { min: u32, max: u32 },
}

impl fmt::Display for SimConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimConfigError::NonPositiveWorldDimensions { width, height } => {
                write!(f, "world dimensions must be positive (got {width}x{height})")
            }
            SimConfigError::WorldTooLarge { max, actual } => {
                write!(f, "world dimension ({actual}) exceeds supported maximum ({max})")
            }
            SimConfigError::NonPositiveGridResolution(v) => {
                write!(f, "environment_grid_resolution must be positive (got {v})")
            }
            SimConfigError::NonPositiveSpatialCellSize(v) => {
                write!(f, "spatial_cell_size must be positive (got {v})")
            }
            SimConfigError::ZeroMaxOrganisms => write!(f, "max_organisms must be at least 1"),
            SimConfigError::NonPositiveSpawnStripWidth(v) => {
                write!(f, "cell_spawn_strip_width must be positive (got {v})")
            }
            SimConfigError::ProbabilityOutOfRange { field, value } => {
                write!(f, "{field} must be within [0, 1] (got {value})")
            }
            SimConfigError::ZeroViralBurstCount => write!(f, "viral_burst_count must be at least 1"),
            SimConfigError::InvalidCooldownRange { min, max } => {
                write!(f, "replication cooldown range invalid: min ({min}) > max ({max})")
            }
        }
    }
}

impl Error for SimConfigError {}

impl SimConfig {
    pub fn validate(&self) -> Result<(), SimConfigError> {
        if self.world_width <= 0.0 || self.world_height <= 0.0 {
            return Err(SimConfigError::NonPositiveWorldDimensions {
                width: self.world_width,
                height: self.world_height,
            });
        }
        let largest = self.world_width.max(self.world_height);
        if largest > crate::constants::MAX_WORLD_SIZE {
            return Err(SimConfigError::WorldTooLarge {
                max: crate::constants::MAX_WORLD_SIZE,
                actual: largest,
            });
        }
        if self.environment_grid_resolution <= 0.0 {
            return Err(SimConfigError::NonPositiveGridResolution(
                self.environment_grid_resolution,
            ));
        }
        if self.spatial_cell_size <= 0.0 {
            return Err(SimConfigError::NonPositiveSpatialCellSize(
                self.spatial_cell_size,
            ));
        }
        if self.max_organisms == 0 {
            return Err(SimConfigError::ZeroMaxOrganisms);
        }
        if self.cell_spawn_strip_width <= 0.0 {
            return Err(SimConfigError::NonPositiveSpawnStripWidth(
                self.cell_spawn_strip_width,
            ));
        }
        if self.viral_burst_count == 0 {
            return Err(SimConfigError::ZeroViralBurstCount);
        }
        if self.replication_cooldown_min > self.replication_cooldown_max {
            return Err(SimConfigError::InvalidCooldownRange {
                min: self.replication_cooldown_min,
                max: self.replication_cooldown_max,
            });
        }
        let probabilities = [
            ("mutation_rate", self.mutation_rate),
            ("bacteria_reproduction_rate", self.bacteria_reproduction_rate),
            ("infection_chance", self.infection_chance),
            ("replication_rate", self.replication_rate),
            ("immune_reproduction_rate", self.immune_reproduction_rate),
            ("engulf_chance_marked", self.engulf_chance_marked),
            ("engulf_chance_weakened", self.engulf_chance_weakened),
            ("engulf_chance_bacteria", self.engulf_chance_bacteria),
            ("engulf_chance_virus", self.engulf_chance_virus),
            ("infection_recovery_chance", self.infection_recovery_chance),
            (
                "profile_transition_immediate",
                self.profile_transition_immediate as f64,
            ),
        ];
        for (field, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(SimConfigError::ProbabilityOutOfRange { field, value });
            }
        }
        Ok(())
    }
}
