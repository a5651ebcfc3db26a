use crate::organism::{Organism, OrganismKind};
use serde::{Deserialize, Serialize};

/// Per-kind alive counts plus lifetime birth/death totals.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub bacteria: usize,
    pub viruses: usize,
    pub immune_cells: usize,
    pub body_cells: usize,
    pub alive: usize,
    pub total_births: usize,
    pub total_deaths: usize,
}

impl PopulationStats {
    pub fn collect(organisms: &[Organism], total_births: usize, total_deaths: usize) -> Self {
        let mut stats = PopulationStats {
            total_births,
            total_deaths,
            ..PopulationStats::default()
        };
        for org in organisms.iter().filter(|o| o.alive) {
            stats.alive += 1;
            match org.kind {
                OrganismKind::Bacterium(_) => stats.bacteria += 1,
                OrganismKind::Virus(_) => stats.viruses += 1,
                OrganismKind::ImmuneCell(_) => stats.immune_cells += 1,
                OrganismKind::BodyCell(_) => stats.body_cells += 1,
            }
        }
        stats
    }
}

/// Bookkeeping returned by `World::step`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSummary {
    pub tick: usize,
    pub births: usize,
    pub deaths: usize,
    pub population: usize,
}
