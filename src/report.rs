use std::io::Write;
use std::path::Path;

use csv::Writer;

use crate::allocator::TrialOutcome;
use crate::catalog::Catalog;
use crate::error::{PlacementError, Result};
use crate::models::{format_choice_list, PlacementRecord, ProgramId, NUM_CHOICES};

/// Fill level of one program in the retained outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramFill {
    pub program_id: ProgramId,
    pub name: String,
    pub filled: usize,
    pub capacity: usize,
    pub age_start: i32,
    pub age_end: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacementSummary {
    pub participants: usize,
    pub placed: usize,
    pub unplaced: Vec<String>,
    pub mean_satisfaction: f64,
    /// `by_rank[i]` counts participants placed in their choice `i + 1`.
    pub by_rank: [usize; NUM_CHOICES],
    pub programs: Vec<ProgramFill>,
}

/// Projects the outcome onto output rows, in processing order.
pub fn placement_records(catalog: &Catalog, outcome: &TrialOutcome) -> Vec<PlacementRecord> {
    outcome
        .order
        .iter()
        .map(|&id| {
            let participant = catalog.participant(id);
            PlacementRecord {
                name: participant.name.clone(),
                cabin: participant.cabin.clone(),
                age: participant.age,
                program: outcome
                    .program_of(id)
                    .map(|program| catalog.program(program).name.clone())
                    .unwrap_or_default(),
                satisfaction: outcome.satisfaction_of(id),
                choices: format_choice_list(&participant.choices),
            }
        })
        .collect()
}

pub fn write_placements<W: Write>(writer: W, records: &[PlacementRecord]) -> csv::Result<()> {
    let mut writer = Writer::from_writer(writer);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_placement_csv(path: &Path, catalog: &Catalog, outcome: &TrialOutcome) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|source| PlacementError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = placement_records(catalog, outcome);
    write_placements(file, &records).map_err(|source| PlacementError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

pub fn summarize(catalog: &Catalog, outcome: &TrialOutcome) -> PlacementSummary {
    let mut by_rank = [0; NUM_CHOICES];
    for rank in outcome.states.iter().filter_map(|state| state.rank) {
        by_rank[rank] += 1;
    }

    let programs = catalog
        .programs()
        .iter()
        .enumerate()
        .map(|(program_id, program)| ProgramFill {
            program_id,
            name: program.name.clone(),
            filled: outcome.rosters[program_id].len(),
            capacity: program.capacity,
            age_start: program.age_start,
            age_end: program.age_end,
        })
        .collect();

    PlacementSummary {
        participants: outcome.states.len(),
        placed: outcome.placed_count(),
        unplaced: outcome
            .unplaced()
            .into_iter()
            .map(|id| catalog.participant(id).name.clone())
            .collect(),
        mean_satisfaction: outcome.mean_satisfaction,
        by_rank,
        programs,
    }
}
