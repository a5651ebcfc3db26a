/// Largest valid world dimension (world units). Keeps grid index math in range.
pub const MAX_WORLD_SIZE: f64 = 8192.0;

/// Prime multiplier used to derive independent RNG streams from a base seed.
pub const RNG_DERIVATION_PRIME: u64 = 7919;

/// DNA strand lengths per organism kind. Fixed at creation and preserved
/// across generations; only token values mutate.
pub const BACTERIUM_DNA_LEN: usize = 100;
pub const VIRUS_DNA_LEN: usize = 80;
pub const IMMUNE_CELL_DNA_LEN: usize = 120;
pub const BODY_CELL_DNA_LEN: usize = 80;
