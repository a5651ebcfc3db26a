use crate::config::{EnvironmentProfile, SimConfig};
use rand::Rng;

/// Clamp bounds for each condition field. Values never leave these ranges.
const TEMPERATURE_BOUNDS: (f32, f32) = (20.0, 50.0);
const PH_BOUNDS: (f32, f32) = (3.0, 10.0);
const NUTRIENT_BOUNDS: (f32, f32) = (5.0, 200.0);
const FLOW_BOUNDS: (f32, f32) = (0.0, 1.0);

/// Per-tick pull of temperature/pH toward the profile baseline, and the
/// bounded random jitter added on top.
const CONDITION_DRIFT_RATE: f32 = 0.01;
const CONDITION_JITTER: f32 = 0.02;

/// Magnitudes of the periodic random baseline perturbation.
const SHIFT_TEMPERATURE: f32 = 1.0;
const SHIFT_PH: f32 = 0.3;
const SHIFT_NUTRIENTS: f32 = 10.0;

/// Conditions at one point of the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConditionSample {
    pub temperature: f32,
    pub ph: f32,
    pub nutrients: f32,
    pub flow: f32,
}

/// Coarse condition grids (temperature, pH, nutrients, flow) over the world.
/// Point queries clamp out-of-bounds coordinates to the nearest cell; nothing
/// here is ever a fatal error after construction.
#[derive(Clone, Debug)]
pub struct Environment {
    width: f64,
    height: f64,
    cell_size: f64,
    cols: usize,
    rows: usize,
    temperature: Vec<f32>,
    ph: Vec<f32>,
    nutrients: Vec<f32>,
    flow: Vec<f32>,
    profile: EnvironmentProfile,
    transition_remaining: usize,
    tick_count: usize,

    nutrient_regen_rate: f32,
    diffusion_rate: f32,
    flow_diffusion_scale: f32,
    shift_interval: usize,
    transition_steps: usize,
    transition_immediate: f32,
}

impl Environment {
    pub fn new(config: &SimConfig) -> Self {
        assert!(
            config.world_width > 0.0 && config.world_height > 0.0,
            "world dimensions must be positive"
        );
        assert!(
            config.environment_grid_resolution > 0.0,
            "grid resolution must be positive"
        );
        let cell_size = config.environment_grid_resolution;
        let cols = (config.world_width / cell_size).ceil() as usize;
        let rows = (config.world_height / cell_size).ceil() as usize;
        let (temp, ph, nutrients, flow) = config.profile.baselines();
        Self {
            width: config.world_width,
            height: config.world_height,
            cell_size,
            cols,
            rows,
            temperature: vec![temp; cols * rows],
            ph: vec![ph; cols * rows],
            nutrients: vec![nutrients; cols * rows],
            flow: vec![flow; cols * rows],
            profile: config.profile,
            transition_remaining: 0,
            tick_count: 0,
            nutrient_regen_rate: config.nutrient_regen_rate,
            diffusion_rate: config.diffusion_rate,
            flow_diffusion_scale: config.flow_diffusion_scale,
            shift_interval: config.environment_shift_interval,
            transition_steps: config.profile_transition_steps,
            transition_immediate: config.profile_transition_immediate,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn tick_count(&self) -> usize {
        self.tick_count
    }

    pub fn profile(&self) -> EnvironmentProfile {
        self.profile
    }

    pub fn temperature_grid(&self) -> &[f32] {
        &self.temperature
    }

    pub fn ph_grid(&self) -> &[f32] {
        &self.ph
    }

    pub fn nutrient_grid(&self) -> &[f32] {
        &self.nutrients
    }

    pub fn flow_grid(&self) -> &[f32] {
        &self.flow
    }

    /// Sample conditions at the cell containing (x, y). Out-of-bounds
    /// coordinates clamp to the nearest valid cell.
    pub fn conditions_at(&self, x: f64, y: f64) -> ConditionSample {
        let idx = self.clamp_index(x, y);
        ConditionSample {
            temperature: self.temperature[idx],
            ph: self.ph[idx],
            nutrients: self.nutrients[idx],
            flow: self.flow[idx],
        }
    }

    /// Withdraw up to `amount` nutrients from the addressed cell; returns the
    /// amount actually withdrawn (floored at the clamp minimum).
    pub fn consume_nutrients(&mut self, x: f64, y: f64, amount: f32) -> f32 {
        let idx = self.clamp_index(x, y);
        let available = (self.nutrients[idx] - NUTRIENT_BOUNDS.0).max(0.0);
        let removed = available.min(amount.max(0.0));
        self.nutrients[idx] -= removed;
        removed
    }

    /// Switch baseline targets. Half the gap (configurable) is applied
    /// immediately; the rest closes gradually over the configured number of
    /// ticks so organisms never see a discontinuous shock mid-tick.
    pub fn set_profile(&mut self, profile: EnvironmentProfile) {
        self.profile = profile;
        let (temp, ph, nutrients, flow) = profile.baselines();
        let immediate = self.transition_immediate;
        for cell in &mut self.temperature {
            *cell += (temp - *cell) * immediate;
        }
        for cell in &mut self.ph {
            *cell += (ph - *cell) * immediate;
        }
        for cell in &mut self.nutrients {
            *cell += (nutrients - *cell) * immediate;
        }
        for cell in &mut self.flow {
            *cell += (flow - *cell) * immediate;
        }
        self.transition_remaining = self.transition_steps;
    }

    /// Advance one tick: close any profile transition, regenerate nutrients
    /// toward baseline, diffuse nutrients along the flow direction, drift
    /// temperature/pH toward baseline with bounded jitter, and perturb the
    /// whole field at the configured shift interval.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.tick_count += 1;
        let (base_temp, base_ph, base_nutrients, base_flow) = self.profile.baselines();

        if self.transition_remaining > 0 {
            // Per-tick fraction 1/remaining closes the gap exactly at the end
            // without ever overshooting.
            let fraction = 1.0 / self.transition_remaining as f32;
            for cell in &mut self.temperature {
                *cell += (base_temp - *cell) * fraction;
            }
            for cell in &mut self.ph {
                *cell += (base_ph - *cell) * fraction;
            }
            for cell in &mut self.nutrients {
                *cell += (base_nutrients - *cell) * fraction;
            }
            for cell in &mut self.flow {
                *cell += (base_flow - *cell) * fraction;
            }
            self.transition_remaining -= 1;
        }

        for cell in &mut self.nutrients {
            let gap = base_nutrients - *cell;
            *cell += gap.clamp(-self.nutrient_regen_rate, self.nutrient_regen_rate);
        }
        self.diffuse_nutrients();

        for cell in &mut self.temperature {
            let jitter = rng.random_range(-CONDITION_JITTER..=CONDITION_JITTER);
            *cell += (base_temp - *cell) * CONDITION_DRIFT_RATE + jitter;
            *cell = cell.clamp(TEMPERATURE_BOUNDS.0, TEMPERATURE_BOUNDS.1);
        }
        for cell in &mut self.ph {
            let jitter = rng.random_range(-CONDITION_JITTER..=CONDITION_JITTER);
            *cell += (base_ph - *cell) * CONDITION_DRIFT_RATE + jitter;
            *cell = cell.clamp(PH_BOUNDS.0, PH_BOUNDS.1);
        }

        if self.shift_interval > 0 && self.tick_count.is_multiple_of(self.shift_interval) {
            self.apply_random_shift(rng);
        }

        for cell in &mut self.nutrients {
            *cell = cell.clamp(NUTRIENT_BOUNDS.0, NUTRIENT_BOUNDS.1);
        }
        for cell in &mut self.flow {
            *cell = cell.clamp(FLOW_BOUNDS.0, FLOW_BOUNDS.1);
        }
    }

    /// Flow pushes a fraction of each cell's nutrients to its right and
    /// down neighbors; edges wrap so the field is conserved.
    fn diffuse_nutrients(&mut self) {
        let mut next = self.nutrients.clone();
        for row in 0..self.rows {
            for col in 0..self.cols {
                let idx = row * self.cols + col;
                let fraction =
                    (self.diffusion_rate + self.flow[idx] * self.flow_diffusion_scale).min(0.5);
                let moved = self.nutrients[idx] * fraction;
                if moved <= 0.0 {
                    continue;
                }
                next[idx] -= moved;
                let right = row * self.cols + (col + 1) % self.cols;
                let down = ((row + 1) % self.rows) * self.cols + col;
                next[right] += moved * 0.5;
                next[down] += moved * 0.5;
            }
        }
        self.nutrients = next;
    }

    fn apply_random_shift<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let dt = rng.random_range(-SHIFT_TEMPERATURE..=SHIFT_TEMPERATURE);
        let dp = rng.random_range(-SHIFT_PH..=SHIFT_PH);
        let dn = rng.random_range(-SHIFT_NUTRIENTS..=SHIFT_NUTRIENTS);
        log::debug!("environment shift at tick {}: dT={dt:.2} dpH={dp:.2} dN={dn:.1}", self.tick_count);
        for cell in &mut self.temperature {
            *cell = (*cell + dt).clamp(TEMPERATURE_BOUNDS.0, TEMPERATURE_BOUNDS.1);
        }
        for cell in &mut self.ph {
            *cell = (*cell + dp).clamp(PH_BOUNDS.0, PH_BOUNDS.1);
        }
        for cell in &mut self.nutrients {
            *cell = (*cell + dn).clamp(NUTRIENT_BOUNDS.0, NUTRIENT_BOUNDS.1);
        }
    }

    pub(crate) fn transition_remaining(&self) -> usize {
        self.transition_remaining
    }

    /// Replace grid contents from a saved state. Lengths must already have
    /// been validated by the caller against `cols() * rows()`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn load_state(
        &mut self,
        profile: EnvironmentProfile,
        transition_remaining: usize,
        tick_count: usize,
        temperature: Vec<f32>,
        ph: Vec<f32>,
        nutrients: Vec<f32>,
        flow: Vec<f32>,
    ) {
        debug_assert_eq!(temperature.len(), self.cols * self.rows);
        debug_assert_eq!(ph.len(), self.cols * self.rows);
        debug_assert_eq!(nutrients.len(), self.cols * self.rows);
        debug_assert_eq!(flow.len(), self.cols * self.rows);
        self.profile = profile;
        self.transition_remaining = transition_remaining;
        self.tick_count = tick_count;
        self.temperature = temperature;
        self.ph = ph;
        self.nutrients = nutrients;
        self.flow = flow;
    }

    fn clamp_index(&self, x: f64, y: f64) -> usize {
        let col = ((x / self.cell_size).max(0.0) as usize).min(self.cols - 1);
        let row = ((y / self.cell_size).max(0.0) as usize).min(self.rows - 1);
        row * self.cols + col
    }
}
