use serde::{Deserialize, Serialize};

/// Number of ranked choices every participant supplies (`Choice1..Choice4`).
pub const NUM_CHOICES: usize = 4;

/// Satisfaction a participant starts each trial with.
pub const MAX_SATISFACTION: i32 = NUM_CHOICES as i32 + 1;

/// Satisfaction of a participant left without a program: the full
/// `MAX_SATISFACTION` penalty is taken off the starting score.
pub const UNPLACED_SATISFACTION: i32 = MAX_SATISFACTION - (NUM_CHOICES as i32 + 1);

/// Lower bound any score must respect.
pub const SATISFACTION_FLOOR: i32 = -MAX_SATISFACTION;

pub const DEFAULT_TRIALS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub trials: usize,
    // Omitted = seed from entropy
    pub seed: Option<u64>,
    pub duplicate_names: DuplicatePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    #[serde(rename = "last_wins")]
    LastWins,
    #[serde(rename = "reject")]
    Reject,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            seed: None,
            duplicate_names: DuplicatePolicy::LastWins,
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }
}

pub type ProgramId = usize;
pub type ParticipantId = usize;

/// Raw row of the programs table. Numeric cells stay textual until validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramRecord {
    #[serde(rename = "Program Name")]
    pub name: String,
    #[serde(rename = "Age Start")]
    pub age_start: String,
    #[serde(rename = "Age End")]
    pub age_end: String,
    #[serde(rename = "Capacity")]
    pub capacity: String,
}

impl ProgramRecord {
    pub const COLUMNS: [&'static str; 4] = ["Program Name", "Age Start", "Age End", "Capacity"];
}

/// Raw row of the participants table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Age")]
    pub age: String,
    #[serde(rename = "Cabin")]
    pub cabin: String,
    #[serde(rename = "Choice1")]
    pub choice1: String,
    #[serde(rename = "Choice2")]
    pub choice2: String,
    #[serde(rename = "Choice3")]
    pub choice3: String,
    #[serde(rename = "Choice4")]
    pub choice4: String,
}

impl ParticipantRecord {
    pub const COLUMNS: [&'static str; 7] = [
        "Name", "Age", "Cabin", "Choice1", "Choice2", "Choice3", "Choice4",
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub name: String,
    pub age_start: i32,
    pub age_end: i32,
    pub capacity: usize,
}

impl Program {
    /// Inclusive age-range test.
    pub fn admits_age(&self, age: i32) -> bool {
        self.age_start <= age && age <= self.age_end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
    pub age: i32,
    pub cabin: String,
    pub choices: [String; NUM_CHOICES], // choices[0] is the most preferred
}

/// One line of the placement table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Cabin")]
    pub cabin: String,
    #[serde(rename = "Age")]
    pub age: i32,
    #[serde(rename = "Program")]
    pub program: String,
    #[serde(rename = "Satisfaction")]
    pub satisfaction: i32,
    #[serde(rename = "Choices")]
    pub choices: String,
}

/// Renders choices as a bracketed list of quoted names: `['A', 'B', 'C', 'D']`.
///
/// A name is wrapped in single quotes unless it contains a single quote and
/// no double quote, in which case double quotes are used. Backslashes and
/// the enclosing quote are escaped.
pub fn format_choice_list(choices: &[String]) -> String {
    let items: Vec<String> = choices.iter().map(|choice| quote_choice(choice)).collect();
    format!("[{}]", items.join(", "))
}

fn quote_choice(choice: &str) -> String {
    let quote = if choice.contains('\'') && !choice.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut quoted = String::with_capacity(choice.len() + 2);
    quoted.push(quote);
    for c in choice.chars() {
        if c == '\\' || c == quote {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push(quote);
    quoted
}
