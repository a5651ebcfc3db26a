//! Decision scorer: 7 inputs → 8 hidden (tanh) → 4 outputs (tanh).
//! Stack-allocated, pure, 100 weights total, derived from the organism's DNA.
//!
//! Inputs:  temperature, pH, nutrients, flow (normalized) + threat density
//!          + food density + vitality = 7
//! Outputs: wander / reproduce-urge / pursue / flee scores

use crate::dna::DnaStrand;

pub const INPUT_SIZE: usize = 7;
const HIDDEN_SIZE: usize = 8;
const OUTPUT_SIZE: usize = 4;

/// Action chosen by the highest-scoring output. Feasibility gates (energy
/// thresholds, cooldowns, target availability) live in the organism update,
/// not here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Wander,
    Reproduce,
    Pursue,
    Flee,
}

impl Action {
    /// Argmax over the output scores; ties resolve to the earlier action.
    pub fn select(scores: &[f32; OUTPUT_SIZE]) -> Action {
        const ACTIONS: [Action; OUTPUT_SIZE] =
            [Action::Wander, Action::Reproduce, Action::Pursue, Action::Flee];
        let mut best = 0;
        for (i, &s) in scores.iter().enumerate().skip(1) {
            if s > scores[best] {
                best = i;
            }
        }
        ACTIONS[best]
    }
}

#[derive(Clone, Debug)]
pub struct DecisionNet {
    w_ih: [[f32; HIDDEN_SIZE]; INPUT_SIZE],
    b_h: [f32; HIDDEN_SIZE],
    w_ho: [[f32; OUTPUT_SIZE]; HIDDEN_SIZE],
    b_o: [f32; OUTPUT_SIZE],
}

impl DecisionNet {
    pub const WEIGHT_COUNT: usize =
        INPUT_SIZE * HIDDEN_SIZE + HIDDEN_SIZE + HIDDEN_SIZE * OUTPUT_SIZE + OUTPUT_SIZE;

    /// Create a net from an iterator of f32 values. Panics if fewer than
    /// `WEIGHT_COUNT` values are supplied (construction-time programmer error).
    pub fn from_weights(mut weights: impl Iterator<Item = f32>) -> Self {
        let mut next = || {
            weights
                .next()
                .expect("insufficient weights: need WEIGHT_COUNT (100) elements")
        };

        let mut w_ih = [[0.0f32; HIDDEN_SIZE]; INPUT_SIZE];
        for row in &mut w_ih {
            for w in row.iter_mut() {
                *w = next();
            }
        }
        let mut b_h = [0.0f32; HIDDEN_SIZE];
        for b in &mut b_h {
            *b = next();
        }
        let mut w_ho = [[0.0f32; OUTPUT_SIZE]; HIDDEN_SIZE];
        for row in &mut w_ho {
            for w in row.iter_mut() {
                *w = next();
            }
        }
        let mut b_o = [0.0f32; OUTPUT_SIZE];
        for b in &mut b_o {
            *b = next();
        }

        Self { w_ih, b_h, w_ho, b_o }
    }

    /// Decode the net directly from a DNA strand, so behavior inherits and
    /// mutates through the same token mechanism as physical traits.
    pub fn from_dna(dna: &DnaStrand) -> Self {
        Self::from_weights(dna.nn_weights(Self::WEIGHT_COUNT).into_iter())
    }

    /// Forward pass. Returns [wander, reproduce, pursue, flee] scores.
    pub fn forward(&self, input: &[f32; INPUT_SIZE]) -> [f32; OUTPUT_SIZE] {
        let mut hidden = self.b_h;
        for (i, &x) in input.iter().enumerate() {
            for (j, h) in hidden.iter_mut().enumerate() {
                *h += x * self.w_ih[i][j];
            }
        }
        for h in &mut hidden {
            *h = h.tanh();
        }

        let mut output = self.b_o;
        for (i, &h) in hidden.iter().enumerate() {
            for (j, o) in output.iter_mut().enumerate() {
                *o += h * self.w_ho[i][j];
            }
        }
        for o in &mut output {
            *o = o.tanh();
        }
        output
    }

    /// Flatten parameters in the order expected by `from_weights`.
    pub fn to_weight_vec(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(Self::WEIGHT_COUNT);
        for row in &self.w_ih {
            out.extend_from_slice(row);
        }
        out.extend_from_slice(&self.b_h);
        for row in &self.w_ho {
            out.extend_from_slice(row);
        }
        out.extend_from_slice(&self.b_o);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;
    use proptest::prelude::*;

    #[test]
    fn weight_count_matches_dimensions() {
        assert_eq!(DecisionNet::WEIGHT_COUNT, 7 * 8 + 8 + 8 * 4 + 4);
        assert_eq!(DecisionNet::WEIGHT_COUNT, 100);
    }

    #[test]
    fn forward_output_bounded_by_tanh() {
        let nn =
            DecisionNet::from_weights((0..DecisionNet::WEIGHT_COUNT).map(|i| (i as f32) * 0.01));
        let output = nn.forward(&[1.0f32; INPUT_SIZE]);
        for &o in &output {
            assert!((-1.0..=1.0).contains(&o), "output {o} outside tanh range");
        }
    }

    #[test]
    fn zero_weights_produce_zero_output() {
        let nn = DecisionNet::from_weights(std::iter::repeat_n(0.0f32, DecisionNet::WEIGHT_COUNT));
        let output = nn.forward(&[1.0f32; INPUT_SIZE]);
        for &o in &output {
            assert!(o.abs() < 1e-7, "expected ~0 with zero weights, got {o}");
        }
    }

    #[test]
    #[should_panic(expected = "insufficient weights")]
    fn from_weights_panics_on_short_iterator() {
        DecisionNet::from_weights(std::iter::repeat_n(0.0f32, 10));
    }

    #[test]
    fn to_weight_vec_round_trips_into_equivalent_network() {
        let nn = DecisionNet::from_weights((0..DecisionNet::WEIGHT_COUNT).map(|i| i as f32 * 0.01));
        let round_trip = DecisionNet::from_weights(nn.to_weight_vec().into_iter());
        let input = [0.25f32; INPUT_SIZE];
        assert_eq!(nn.forward(&input), round_trip.forward(&input));
    }

    #[test]
    fn from_dna_is_deterministic_per_strand() {
        let mut rng = create_rng(11);
        let dna = DnaStrand::random(80, &mut rng);
        let a = DecisionNet::from_dna(&dna);
        let b = DecisionNet::from_dna(&dna);
        let input = [0.5f32; INPUT_SIZE];
        assert_eq!(a.forward(&input), b.forward(&input));
    }

    #[test]
    fn action_select_takes_argmax_with_first_tie_winner() {
        assert_eq!(Action::select(&[0.9, 0.1, 0.2, 0.3]), Action::Wander);
        assert_eq!(Action::select(&[0.1, 0.1, 0.8, 0.3]), Action::Pursue);
        assert_eq!(Action::select(&[0.5, 0.5, 0.5, 0.5]), Action::Wander);
        assert_eq!(Action::select(&[-1.0, -0.5, -0.9, -0.2]), Action::Flee);
    }

    proptest! {
        #[test]
        fn proptest_forward_outputs_finite_and_bounded(
            weights in proptest::collection::vec(-10.0f32..10.0f32, DecisionNet::WEIGHT_COUNT),
            inputs in proptest::collection::vec(-5.0f32..5.0f32, INPUT_SIZE),
        ) {
            let nn = DecisionNet::from_weights(weights.into_iter());
            let input: [f32; INPUT_SIZE] = inputs.try_into().expect("input size should match");
            let output = nn.forward(&input);
            prop_assert!(output.iter().all(|o| o.is_finite() && *o >= -1.0 && *o <= 1.0));
        }
    }
}
