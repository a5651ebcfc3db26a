use rand::Rng;
use serde::{Deserialize, Serialize};

/// DNA token alphabet. Four symbols; traits decode from token composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Nucleotide {
    A,
    C,
    G,
    T,
}

impl Nucleotide {
    pub const ALPHABET: [Nucleotide; 4] =
        [Nucleotide::A, Nucleotide::C, Nucleotide::G, Nucleotide::T];

    fn index(self) -> usize {
        match self {
            Nucleotide::A => 0,
            Nucleotide::C => 1,
            Nucleotide::G => 2,
            Nucleotide::T => 3,
        }
    }
}

/// Heritable trait sequence. Length is fixed at creation and preserved across
/// generations; mutation substitutes tokens in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DnaStrand {
    bases: Vec<Nucleotide>,
}

impl DnaStrand {
    pub fn random<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
        assert!(len > 0, "DNA length must be positive");
        let bases = (0..len)
            .map(|_| Nucleotide::ALPHABET[rng.random_range(0..4)])
            .collect();
        Self { bases }
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    pub fn bases(&self) -> &[Nucleotide] {
        &self.bases
    }

    /// Substitute each token independently with probability `rate`. A firing
    /// substitution always picks one of the three *other* tokens, so the
    /// expected fraction of changed tokens equals `rate`. Returns the number
    /// of substitutions applied. Length never changes.
    pub fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R, rate: f64) -> usize {
        debug_assert!((0.0..=1.0).contains(&rate), "mutation rate out of range");
        let mut substitutions = 0;
        for base in &mut self.bases {
            if rng.random_bool(rate) {
                let shift = rng.random_range(1..4);
                *base = Nucleotide::ALPHABET[(base.index() + shift) % 4];
                substitutions += 1;
            }
        }
        substitutions
    }

    /// Fraction of G/C tokens within `range` of the strand.
    pub fn gc_fraction(&self, range: std::ops::Range<usize>) -> f32 {
        let slice = &self.bases[range];
        if slice.is_empty() {
            return 0.0;
        }
        let gc = slice
            .iter()
            .filter(|b| matches!(b, Nucleotide::G | Nucleotide::C))
            .count();
        gc as f32 / slice.len() as f32
    }

    /// Deterministically expand the strand into `count` decision-net weights
    /// in [-1, 1]. Each weight reads a sliding window of four tokens as a
    /// base-4 number, so a single token substitution perturbs only the
    /// handful of weights whose windows cover it.
    pub fn nn_weights(&self, count: usize) -> Vec<f32> {
        let len = self.bases.len();
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let mut v = 0u32;
            for k in 0..4 {
                v = v * 4 + self.bases[(i * 4 + k) % len].index() as u32;
            }
            out.push((v as f32 / 255.0) * 2.0 - 1.0);
        }
        out
    }
}

/// Normalized trait values decoded from a strand. Three equal sections give
/// the first three traits; resistance reads the whole strand.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraitProfile {
    /// Temperature preference in [0, 1]; 0 maps to the cold end of the
    /// tolerated band, 1 to the warm end.
    pub temperature_preference: f32,
    /// pH preference in [0, 1].
    pub ph_preference: f32,
    /// Reproduction-rate modifier in [0, 1]; scaled to [0.5, 1.5] at use.
    pub reproduction_modifier: f32,
    /// Resistance factor in [0, 1] (antibiotics, infection).
    pub resistance: f32,
}

impl TraitProfile {
    pub fn decode(dna: &DnaStrand) -> Self {
        let len = dna.len();
        let section = len / 3;
        Self {
            temperature_preference: dna.gc_fraction(0..section),
            ph_preference: dna.gc_fraction(section..2 * section),
            reproduction_modifier: dna.gc_fraction(2 * section..len),
            resistance: dna.gc_fraction(0..len),
        }
    }

    /// Preferred temperature in °C, centered on 37.
    pub fn optimal_temperature(&self) -> f32 {
        34.0 + self.temperature_preference * 6.0
    }

    /// Preferred pH, centered on 7.
    pub fn optimal_ph(&self) -> f32 {
        6.0 + self.ph_preference * 2.0
    }

    /// Reproduction-rate multiplier in [0.5, 1.5].
    pub fn reproduction_factor(&self) -> f64 {
        0.5 + self.reproduction_modifier as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;
    use proptest::prelude::*;

    #[test]
    fn random_strand_has_requested_length() {
        let mut rng = create_rng(1);
        let dna = DnaStrand::random(100, &mut rng);
        assert_eq!(dna.len(), 100);
    }

    #[test]
    fn mutation_preserves_length_across_generations() {
        let mut rng = create_rng(2);
        let mut dna = DnaStrand::random(80, &mut rng);
        for _ in 0..50 {
            let mut child = dna.clone();
            child.mutate(&mut rng, 0.05);
            assert_eq!(child.len(), dna.len());
            dna = child;
        }
    }

    #[test]
    fn mutation_rate_converges_statistically() {
        let mut rng = create_rng(3);
        let rate = 0.02;
        let trials = 200;
        let len = 100;
        let mut changed = 0usize;
        for _ in 0..trials {
            let original = DnaStrand::random(len, &mut rng);
            let mut mutated = original.clone();
            mutated.mutate(&mut rng, rate);
            changed += original
                .bases()
                .iter()
                .zip(mutated.bases())
                .filter(|(a, b)| a != b)
                .count();
        }
        let observed = changed as f64 / (trials * len) as f64;
        // 20_000 Bernoulli draws at p=0.02: ~3 sigma is about 0.003.
        assert!(
            (observed - rate).abs() < 0.005,
            "observed mutation fraction {observed} too far from {rate}"
        );
    }

    #[test]
    fn zero_rate_never_mutates() {
        let mut rng = create_rng(4);
        let dna = DnaStrand::random(100, &mut rng);
        let mut copy = dna.clone();
        assert_eq!(copy.mutate(&mut rng, 0.0), 0);
        assert_eq!(copy, dna);
    }

    #[test]
    fn gc_fraction_counts_only_g_and_c() {
        let dna = DnaStrand {
            bases: vec![Nucleotide::G, Nucleotide::C, Nucleotide::A, Nucleotide::T],
        };
        assert!((dna.gc_fraction(0..4) - 0.5).abs() < f32::EPSILON);
        assert!((dna.gc_fraction(0..2) - 1.0).abs() < f32::EPSILON);
        assert!((dna.gc_fraction(2..4) - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn trait_decode_is_deterministic() {
        let mut rng = create_rng(5);
        let dna = DnaStrand::random(120, &mut rng);
        assert_eq!(TraitProfile::decode(&dna), TraitProfile::decode(&dna));
    }

    #[test]
    fn nn_weights_are_bounded_and_deterministic() {
        let mut rng = create_rng(6);
        let dna = DnaStrand::random(80, &mut rng);
        let w = dna.nn_weights(100);
        assert_eq!(w.len(), 100);
        assert!(w.iter().all(|v| (-1.0..=1.0).contains(v)));
        assert_eq!(w, dna.nn_weights(100));
    }

    #[test]
    fn single_substitution_perturbs_only_local_weights() {
        let mut rng = create_rng(7);
        let original = DnaStrand::random(80, &mut rng);
        let mut mutated = original.clone();
        mutated.bases[10] = match mutated.bases[10] {
            Nucleotide::A => Nucleotide::T,
            _ => Nucleotide::A,
        };
        let wa = original.nn_weights(100);
        let wb = mutated.nn_weights(100);
        let differing = wa.iter().zip(&wb).filter(|(a, b)| a != b).count();
        assert!(differing > 0, "substitution should change some weights");
        assert!(
            differing < wa.len() / 2,
            "substitution changed {differing} of {} weights",
            wa.len()
        );
    }

    proptest! {
        #[test]
        fn proptest_mutation_never_changes_length(
            seed in 0u64..1000,
            len in 1usize..200,
            rate in 0.0f64..1.0,
        ) {
            let mut rng = create_rng(seed);
            let mut dna = DnaStrand::random(len, &mut rng);
            dna.mutate(&mut rng, rate);
            prop_assert_eq!(dna.len(), len);
        }

        #[test]
        fn proptest_traits_stay_normalized(seed in 0u64..1000, len in 3usize..300) {
            let mut rng = create_rng(seed);
            let dna = DnaStrand::random(len, &mut rng);
            let t = TraitProfile::decode(&dna);
            for v in [t.temperature_preference, t.ph_preference, t.reproduction_modifier, t.resistance] {
                prop_assert!((0.0..=1.0).contains(&v));
            }
        }
    }
}
