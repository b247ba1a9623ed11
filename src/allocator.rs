//! Randomised repeated greedy placement.
//!
//! A trial walks participants in one order and gives each the first ranked
//! program that admits their age and still has room. The search repeats
//! trials over random orders and keeps the one with the best mean
//! satisfaction.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::error::{PlacementError, Result};
use crate::models::{ParticipantId, ProgramId, MAX_SATISFACTION, NUM_CHOICES};

/// Per-trial state of one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantState {
    pub program: Option<ProgramId>,
    /// 0-based index of the accepted choice.
    pub rank: Option<usize>,
    pub satisfaction: i32,
}

impl Default for ParticipantState {
    fn default() -> Self {
        Self {
            program: None,
            rank: None,
            satisfaction: MAX_SATISFACTION,
        }
    }
}

impl ParticipantState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_placed(&self) -> bool {
        self.program.is_some()
    }
}

/// Mutable state of a single trial, sized for one catalog.
#[derive(Debug, Clone)]
pub struct Trial {
    rosters: Vec<Vec<ParticipantId>>,
    states: Vec<ParticipantState>,
}

impl Trial {
    pub fn new(catalog: &Catalog) -> Self {
        Self {
            rosters: vec![Vec::new(); catalog.programs().len()],
            states: vec![ParticipantState::default(); catalog.participants().len()],
        }
    }

    /// Empties every roster and restores every participant to unassigned.
    pub fn reset(&mut self) {
        self.rosters.iter_mut().for_each(Vec::clear);
        self.states.iter_mut().for_each(ParticipantState::reset);
    }

    pub fn roster(&self, program: ProgramId) -> &[ParticipantId] {
        &self.rosters[program]
    }

    pub fn state(&self, participant: ParticipantId) -> ParticipantState {
        self.states[participant]
    }

    /// Mean satisfaction over all participants; 0.0 when there are none.
    pub fn mean_satisfaction(&self) -> f64 {
        if self.states.is_empty() {
            return 0.0;
        }
        let total: i64 = self.states.iter().map(|state| state.satisfaction as i64).sum();
        total as f64 / self.states.len() as f64
    }

    fn snapshot(&self, trial: usize, order: &[ParticipantId]) -> TrialOutcome {
        TrialOutcome {
            trial,
            order: order.to_vec(),
            states: self.states.clone(),
            rosters: self.rosters.clone(),
            mean_satisfaction: self.mean_satisfaction(),
        }
    }
}

/// Frozen result of one trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    /// 1-based trial number within the search.
    pub trial: usize,
    /// Order in which participants were processed.
    pub order: Vec<ParticipantId>,
    /// Indexed by `ParticipantId`.
    pub states: Vec<ParticipantState>,
    /// Indexed by `ProgramId`, in placement order.
    pub rosters: Vec<Vec<ParticipantId>>,
    pub mean_satisfaction: f64,
}

impl TrialOutcome {
    pub fn program_of(&self, participant: ParticipantId) -> Option<ProgramId> {
        self.states[participant].program
    }

    pub fn rank_of(&self, participant: ParticipantId) -> Option<usize> {
        self.states[participant].rank
    }

    pub fn satisfaction_of(&self, participant: ParticipantId) -> i32 {
        self.states[participant].satisfaction
    }

    /// Satisfaction scores in processing order.
    pub fn satisfactions(&self) -> Vec<i32> {
        self.order.iter().map(|&id| self.states[id].satisfaction).collect()
    }

    pub fn placed_count(&self) -> usize {
        self.states.iter().filter(|state| state.is_placed()).count()
    }

    pub fn unplaced(&self) -> Vec<ParticipantId> {
        self.order
            .iter()
            .copied()
            .filter(|&id| !self.states[id].is_placed())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct SearchReport {
    pub best: TrialOutcome,
    pub trials_run: usize,
    pub first_mean: f64,
    /// `(trial, mean)` each time the retained outcome changed; means strictly increase.
    pub improvements: Vec<(usize, f64)>,
}

pub struct Allocator<'a> {
    catalog: &'a Catalog,
    // Choice names resolved once; `None` ends a participant's scan.
    ranked: Vec<[Option<ProgramId>; NUM_CHOICES]>,
}

impl<'a> Allocator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        let ranked = catalog
            .participants()
            .iter()
            .map(|participant| {
                let mut resolved = [None; NUM_CHOICES];
                for (slot, choice) in resolved.iter_mut().zip(participant.choices.iter()) {
                    *slot = catalog.resolve(choice);
                }
                resolved
            })
            .collect();
        Self { catalog, ranked }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Gives `participant` the first eligible ranked program with a free slot.
    ///
    /// An unknown program name stops the scan; programs outside the
    /// participant's age or already full are skipped. Accepting choice `i`
    /// costs `i` satisfaction; finding nothing costs `MAX_SATISFACTION`.
    pub fn place(&self, trial: &mut Trial, participant: ParticipantId) -> Option<ProgramId> {
        let age = self.catalog.participant(participant).age;
        let state = &mut trial.states[participant];

        for (rank, choice) in self.ranked[participant].iter().enumerate() {
            let Some(program_id) = *choice else {
                break;
            };
            let program = self.catalog.program(program_id);
            if !program.admits_age(age) {
                continue;
            }
            let roster = &mut trial.rosters[program_id];
            if roster.len() >= program.capacity {
                continue;
            }
            roster.push(participant);
            state.program = Some(program_id);
            state.rank = Some(rank);
            state.satisfaction -= rank as i32;
            return Some(program_id);
        }

        state.satisfaction -= MAX_SATISFACTION;
        None
    }

    /// Runs one greedy pass over `order`. The trial is expected to be freshly reset.
    pub fn assign(&self, trial: &mut Trial, order: &[ParticipantId]) {
        for &participant in order {
            self.place(trial, participant);
        }
    }

    /// Convenience for a single pass on fresh state.
    pub fn run_trial(&self, order: &[ParticipantId]) -> TrialOutcome {
        let mut trial = Trial::new(self.catalog);
        self.assign(&mut trial, order);
        trial.snapshot(1, order)
    }

    /// Runs `trials` passes, each over a fresh uniform shuffle, and keeps the
    /// first pass with the strictly highest mean satisfaction.
    pub fn search<R: Rng + ?Sized>(&self, trials: usize, rng: &mut R) -> Result<SearchReport> {
        if trials == 0 {
            return Err(PlacementError::InvalidConfig(
                "trial count must be at least 1".to_string(),
            ));
        }

        let mut order: Vec<ParticipantId> = (0..self.catalog.participants().len()).collect();
        let mut trial = Trial::new(self.catalog);
        let mut best: Option<TrialOutcome> = None;
        let mut first_mean = 0.0;
        let mut improvements = Vec::new();

        for index in 1..=trials {
            order.shuffle(rng);
            trial.reset();
            self.assign(&mut trial, &order);

            let mean = trial.mean_satisfaction();
            debug!(trial = index, mean, "Trial finished");
            if index == 1 {
                first_mean = mean;
            }

            let improved = match &best {
                Some(current) => mean > current.mean_satisfaction,
                None => true,
            };
            if improved {
                improvements.push((index, mean));
                best = Some(trial.snapshot(index, &order));
            }
        }

        let best = best.ok_or_else(|| PlacementError::InvalidConfig("no trial was run".to_string()))?;
        info!(
            trials,
            best_trial = best.trial,
            mean = best.mean_satisfaction,
            "Search finished"
        );
        Ok(SearchReport {
            best,
            trials_run: trials,
            first_mean,
            improvements,
        })
    }

    /// [`Allocator::search`] over a `StdRng` seeded from `seed`, or from entropy.
    pub fn search_seeded(&self, trials: usize, seed: Option<u64>) -> Result<SearchReport> {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.search(trials, &mut rng)
    }
}
