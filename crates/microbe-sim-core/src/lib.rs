pub mod config;
pub mod constants;
pub mod dna;
pub mod environment;
pub mod interaction;
pub mod metrics;
pub mod nn;
pub mod organism;
pub mod rng;
pub mod snapshot;
pub mod spatial;
pub mod treatments;
pub mod world;

pub use config::{EnvironmentProfile, SimConfig, SimConfigError};
pub use metrics::{PopulationStats, StepSummary};
pub use snapshot::{SnapshotError, WorldSnapshot};
pub use treatments::{Treatment, TreatmentKind};
pub use world::{World, WorldInitError};
