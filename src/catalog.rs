use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{PlacementError, Result};
use crate::models::{
    DuplicatePolicy, Participant, ParticipantId, ParticipantRecord, Program, ProgramId,
    ProgramRecord,
};

/// Programs and participants of one run, addressed by dense ids in input order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    programs: Vec<Program>,
    participants: Vec<Participant>,
    program_index: HashMap<String, ProgramId>,
    participant_index: HashMap<String, ParticipantId>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads both tables from disk. Any failure aborts before a catalog exists.
    pub fn load(participants_path: &Path, programs_path: &Path, policy: DuplicatePolicy) -> Result<Self> {
        let participants_file = open(participants_path)?;
        let programs_file = open(programs_path)?;
        Self::from_readers(
            participants_file,
            participants_path,
            programs_file,
            programs_path,
            policy,
        )
    }

    /// Same as [`Catalog::load`] over arbitrary readers; `*_source` only labels errors.
    pub fn from_readers<P: Read, Q: Read>(
        participants: P,
        participants_source: &Path,
        programs: Q,
        programs_source: &Path,
        policy: DuplicatePolicy,
    ) -> Result<Self> {
        let mut catalog = Catalog::new();

        for (row, record) in read_table::<ProgramRecord, _>(programs, programs_source, &ProgramRecord::COLUMNS)? {
            let program = program_from_record(record, row, programs_source)?;
            catalog.insert_program(program, policy, programs_source)?;
        }

        for (row, record) in read_table::<ParticipantRecord, _>(
            participants,
            participants_source,
            &ParticipantRecord::COLUMNS,
        )? {
            let participant = participant_from_record(record, row, participants_source)?;
            catalog.insert_participant(participant, policy, participants_source)?;
        }

        for name in catalog.unresolved_choices() {
            warn!("Choice \"{}\" does not name any program; scans stop there", name);
        }
        info!(
            programs = catalog.programs.len(),
            participants = catalog.participants.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    /// Adds a program. Under `LastWins` a repeated name keeps its original slot
    /// and takes the new attributes.
    pub fn insert_program(&mut self, program: Program, policy: DuplicatePolicy, source: &Path) -> Result<ProgramId> {
        match self.program_index.get(&program.name) {
            Some(&id) => {
                if policy == DuplicatePolicy::Reject {
                    return Err(PlacementError::DuplicateName {
                        path: source.to_path_buf(),
                        kind: "program",
                        name: program.name,
                    });
                }
                warn!("Program \"{}\" listed more than once; keeping the last row", program.name);
                self.programs[id] = program;
                Ok(id)
            }
            None => {
                let id = self.programs.len();
                self.program_index.insert(program.name.clone(), id);
                self.programs.push(program);
                Ok(id)
            }
        }
    }

    pub fn insert_participant(
        &mut self,
        participant: Participant,
        policy: DuplicatePolicy,
        source: &Path,
    ) -> Result<ParticipantId> {
        match self.participant_index.get(&participant.name) {
            Some(&id) => {
                if policy == DuplicatePolicy::Reject {
                    return Err(PlacementError::DuplicateName {
                        path: source.to_path_buf(),
                        kind: "participant",
                        name: participant.name,
                    });
                }
                warn!(
                    "Participant \"{}\" listed more than once; keeping the last row",
                    participant.name
                );
                self.participants[id] = participant;
                Ok(id)
            }
            None => {
                let id = self.participants.len();
                self.participant_index.insert(participant.name.clone(), id);
                self.participants.push(participant);
                Ok(id)
            }
        }
    }

    pub fn resolve(&self, program_name: &str) -> Option<ProgramId> {
        self.program_index.get(program_name).copied()
    }

    pub fn participant_id(&self, name: &str) -> Option<ParticipantId> {
        self.participant_index.get(name).copied()
    }

    pub fn program(&self, id: ProgramId) -> &Program {
        &self.programs[id]
    }

    pub fn participant(&self, id: ParticipantId) -> &Participant {
        &self.participants[id]
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Distinct choice names, in first-seen order, that match no program.
    pub fn unresolved_choices(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for participant in &self.participants {
            for choice in &participant.choices {
                if self.resolve(choice).is_none() && !seen.contains(&choice.as_str()) {
                    seen.push(choice.as_str());
                }
            }
        }
        seen
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| PlacementError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads every row after checking the header carries `columns`.
/// Rows are numbered from 1, not counting the header.
fn read_table<T: DeserializeOwned, R: Read>(
    reader: R,
    source: &Path,
    columns: &[&str],
) -> Result<Vec<(usize, T)>> {
    let csv_error = |source_err: csv::Error| PlacementError::Csv {
        path: source.to_path_buf(),
        source: source_err,
    };

    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers: StringRecord = reader.headers().map_err(csv_error)?.clone();

    for column in columns {
        if !headers.iter().any(|header| header == *column) {
            return Err(PlacementError::Schema {
                path: source.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let row: T = record.deserialize(Some(&headers)).map_err(csv_error)?;
        rows.push((index + 1, row));
    }
    debug!("Read {} rows from {}", rows.len(), source.display());
    Ok(rows)
}

fn parse_number<T: std::str::FromStr>(value: &str, row: usize, column: &str, source: &Path) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| PlacementError::Parse {
        path: PathBuf::from(source),
        row,
        column: column.to_string(),
        value: value.to_string(),
    })
}

fn program_from_record(record: ProgramRecord, row: usize, source: &Path) -> Result<Program> {
    Ok(Program {
        age_start: parse_number(&record.age_start, row, "Age Start", source)?,
        age_end: parse_number(&record.age_end, row, "Age End", source)?,
        capacity: parse_number(&record.capacity, row, "Capacity", source)?,
        name: record.name,
    })
}

fn participant_from_record(record: ParticipantRecord, row: usize, source: &Path) -> Result<Participant> {
    Ok(Participant {
        age: parse_number(&record.age, row, "Age", source)?,
        name: record.name,
        cabin: record.cabin,
        choices: [record.choice1, record.choice2, record.choice3, record.choice4],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAMS: &str = "Program Name,Age Start,Age End,Capacity\n\
                            Archery,8,12,2\n\
                            Canoeing,10,16,1\n";

    const PARTICIPANTS: &str = "Name,Age,Cabin,Choice1,Choice2,Choice3,Choice4\n\
                                Ana,9,Pine,Archery,Canoeing,Drama,Hiking\n\
                                Ben,14,Oak,Canoeing,Archery,Sailing,Drama\n";

    fn load(participants: &str, programs: &str, policy: DuplicatePolicy) -> Result<Catalog> {
        Catalog::from_readers(
            participants.as_bytes(),
            Path::new("participants.csv"),
            programs.as_bytes(),
            Path::new("programs.csv"),
            policy,
        )
    }

    #[test]
    fn loads_rows_in_input_order() {
        let catalog = load(PARTICIPANTS, PROGRAMS, DuplicatePolicy::LastWins).unwrap();
        assert_eq!(catalog.programs().len(), 2);
        assert_eq!(catalog.participants().len(), 2);
        assert_eq!(catalog.program(0).name, "Archery");
        assert_eq!(catalog.program(1).capacity, 1);
        assert_eq!(catalog.participant(1).name, "Ben");
        assert_eq!(catalog.participant(1).choices[2], "Sailing");
        assert_eq!(catalog.resolve("Canoeing"), Some(1));
        assert_eq!(catalog.resolve("Sailing"), None);
    }

    #[test]
    fn lists_unresolved_choices_once() {
        let catalog = load(PARTICIPANTS, PROGRAMS, DuplicatePolicy::LastWins).unwrap();
        assert_eq!(catalog.unresolved_choices(), vec!["Drama", "Hiking", "Sailing"]);
    }

    #[test]
    fn numeric_cells_tolerate_padding() {
        let programs = "Program Name,Age Start,Age End,Capacity\nArchery, 8 ,12 , 2\n";
        let catalog = load(PARTICIPANTS, programs, DuplicatePolicy::LastWins).unwrap();
        assert_eq!(catalog.program(0).age_start, 8);
        assert_eq!(catalog.program(0).capacity, 2);
    }

    #[test]
    fn extra_columns_are_ignored() {
        let programs = "Program Name,Notes,Age Start,Age End,Capacity\nArchery,bring bows,8,12,2\n";
        let catalog = load(PARTICIPANTS, programs, DuplicatePolicy::LastWins).unwrap();
        assert_eq!(catalog.program(0).age_end, 12);
    }

    #[test]
    fn missing_column_is_a_schema_error() {
        let programs = "Program Name,Age Start,Capacity\nArchery,8,2\n";
        match load(PARTICIPANTS, programs, DuplicatePolicy::LastWins) {
            Err(PlacementError::Schema { column, .. }) => assert_eq!(column, "Age End"),
            other => panic!("expected schema error, got {:?}", other),
        }

        let participants = "Name,Age,Cabin,Choice1,Choice2,Choice3\nAna,9,Pine,Archery,Canoeing,Drama\n";
        match load(participants, PROGRAMS, DuplicatePolicy::LastWins) {
            Err(PlacementError::Schema { column, .. }) => assert_eq!(column, "Choice4"),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn non_numeric_age_is_a_parse_error() {
        let participants = "Name,Age,Cabin,Choice1,Choice2,Choice3,Choice4\n\
                            Ana,9,Pine,Archery,Canoeing,Drama,Hiking\n\
                            Ben,fourteen,Oak,Canoeing,Archery,Sailing,Drama\n";
        match load(participants, PROGRAMS, DuplicatePolicy::LastWins) {
            Err(PlacementError::Parse { row, column, value, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(column, "Age");
                assert_eq!(value, "fourteen");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn negative_capacity_is_a_parse_error() {
        let programs = "Program Name,Age Start,Age End,Capacity\nArchery,8,12,-1\n";
        assert!(matches!(
            load(PARTICIPANTS, programs, DuplicatePolicy::LastWins),
            Err(PlacementError::Parse { .. })
        ));
    }

    #[test]
    fn negative_ages_are_accepted() {
        let programs = "Program Name,Age Start,Age End,Capacity\nArchery,-1,15,1\n";
        let participants = "Name,Age,Cabin,Choice1,Choice2,Choice3,Choice4\n\
                            Ana,-3,Pine,Archery,Canoeing,Drama,Hiking\n";
        let catalog = load(participants, programs, DuplicatePolicy::LastWins).unwrap();
        assert_eq!(catalog.program(0).age_start, -1);
        assert_eq!(catalog.participant(0).age, -3);
    }

    #[test]
    fn ragged_row_is_a_csv_error() {
        let programs = "Program Name,Age Start,Age End,Capacity\nArchery,8,12\n";
        assert!(matches!(
            load(PARTICIPANTS, programs, DuplicatePolicy::LastWins),
            Err(PlacementError::Csv { .. })
        ));
    }

    #[test]
    fn duplicate_names_keep_first_slot_and_last_data() {
        let programs = "Program Name,Age Start,Age End,Capacity\n\
                        Archery,8,12,2\n\
                        Canoeing,10,16,1\n\
                        Archery,6,9,5\n";
        let catalog = load(PARTICIPANTS, programs, DuplicatePolicy::LastWins).unwrap();
        assert_eq!(catalog.programs().len(), 2);
        assert_eq!(catalog.resolve("Archery"), Some(0));
        assert_eq!(catalog.program(0).capacity, 5);
        assert_eq!(catalog.program(0).age_start, 6);
    }

    #[test]
    fn duplicate_names_rejected_on_request() {
        let participants = "Name,Age,Cabin,Choice1,Choice2,Choice3,Choice4\n\
                            Ana,9,Pine,Archery,Canoeing,Drama,Hiking\n\
                            Ana,11,Elm,Canoeing,Archery,Drama,Hiking\n";
        match load(participants, PROGRAMS, DuplicatePolicy::Reject) {
            Err(PlacementError::DuplicateName { kind, name, .. }) => {
                assert_eq!(kind, "participant");
                assert_eq!(name, "Ana");
            }
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = Catalog::load(
            Path::new("/nonexistent/participants.csv"),
            Path::new("/nonexistent/programs.csv"),
            DuplicatePolicy::LastWins,
        );
        assert!(matches!(result, Err(PlacementError::Io { .. })));
    }
}
