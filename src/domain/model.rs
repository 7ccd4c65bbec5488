use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Workflow state of a record. States form an ordered model: operations
/// consume records from one state and advance them to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Retrieved,
    Imported,
    NeedsManualCleansing,
    Processed,
    PrescreenIncluded,
    PrescreenExcluded,
    Included,
    Excluded,
    Synthesized,
}

impl RecordState {
    /// Position in the state model. States on the same tier block the
    /// same downstream operations.
    pub fn tier(&self) -> u8 {
        match self {
            RecordState::Retrieved => 0,
            RecordState::Imported | RecordState::NeedsManualCleansing => 1,
            RecordState::Processed => 2,
            RecordState::PrescreenIncluded | RecordState::PrescreenExcluded => 3,
            RecordState::Included | RecordState::Excluded => 4,
            RecordState::Synthesized => 5,
        }
    }

    /// Terminal states no longer block downstream operations.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordState::PrescreenExcluded | RecordState::Excluded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordState::Retrieved => "retrieved",
            RecordState::Imported => "imported",
            RecordState::NeedsManualCleansing => "needs_manual_cleansing",
            RecordState::Processed => "processed",
            RecordState::PrescreenIncluded => "prescreen_included",
            RecordState::PrescreenExcluded => "prescreen_excluded",
            RecordState::Included => "included",
            RecordState::Excluded => "excluded",
            RecordState::Synthesized => "synthesized",
        }
    }

    pub fn all() -> &'static [RecordState] {
        &[
            RecordState::Retrieved,
            RecordState::Imported,
            RecordState::NeedsManualCleansing,
            RecordState::Processed,
            RecordState::PrescreenIncluded,
            RecordState::PrescreenExcluded,
            RecordState::Included,
            RecordState::Excluded,
            RecordState::Synthesized,
        ]
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bibliographic record in the review dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub entrytype: String,
    pub status: RecordState,
    #[serde(default)]
    pub origin: Vec<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Per-field defect codes (comma-separated) set by the quality model.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub notes: BTreeMap<String, String>,
}

impl Record {
    pub fn new(id: impl Into<String>, entrytype: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entrytype: entrytype.into(),
            status: RecordState::Retrieved,
            origin: Vec::new(),
            fields: BTreeMap::new(),
            notes: BTreeMap::new(),
        }
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Append a defect code to the note of a field, keeping codes unique.
    pub fn add_note(&mut self, field: &str, code: &str) {
        let entry = self.notes.entry(field.to_string()).or_default();
        if entry.split(',').any(|c| c == code) {
            return;
        }
        if entry.is_empty() {
            entry.push_str(code);
        } else {
            entry.push(',');
            entry.push_str(code);
        }
    }

    /// Whether the quality model recorded any defect. `not-missing`
    /// annotations do not count as defects.
    pub fn has_defects(&self) -> bool {
        self.notes
            .values()
            .any(|note| note.split(',').any(|code| code != "not-missing"))
    }

    pub fn author_surnames(&self) -> Vec<String> {
        let Some(author) = self.field("author") else {
            return Vec::new();
        };
        author
            .split(" and ")
            .filter_map(|part| {
                let surname = part.split(',').next()?.trim();
                if surname.is_empty() {
                    None
                } else {
                    Some(surname.to_string())
                }
            })
            .collect()
    }

    /// Token-overlap similarity (Dice coefficient) of the core metadata.
    /// Used to drop suffixed near-duplicates at search time.
    pub fn similarity(&self, other: &Record) -> f64 {
        let tokens = |record: &Record| -> BTreeSet<String> {
            ["title", "author", "year"]
                .iter()
                .filter_map(|key| record.field(key))
                .flat_map(|value| value.split_whitespace())
                .map(|token| {
                    token
                        .chars()
                        .filter(|c| c.is_alphanumeric())
                        .collect::<String>()
                        .to_lowercase()
                })
                .filter(|token| !token.is_empty())
                .collect()
        };

        let a = tokens(self);
        let b = tokens(other);
        if a.is_empty() && b.is_empty() {
            return 0.0;
        }
        let common = a.intersection(&b).count();
        (2.0 * common as f64) / (a.len() + b.len()) as f64
    }
}

/// The fixed menu of workflow operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Search,
    BackwardSearch,
    Cleanse,
    Prescreen,
    Screen,
    Data,
    Status,
}

impl OperationKind {
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Search => "search",
            OperationKind::BackwardSearch => "backward_search",
            OperationKind::Cleanse => "cleanse_records",
            OperationKind::Prescreen => "screen_1",
            OperationKind::Screen => "screen",
            OperationKind::Data => "data",
            OperationKind::Status => "status",
        }
    }

    /// Minimum tier every non-terminal record must have reached before
    /// the operation may run.
    pub fn required_tier(&self) -> u8 {
        match self {
            OperationKind::Search | OperationKind::BackwardSearch | OperationKind::Status => 0,
            OperationKind::Cleanse => 1,
            OperationKind::Prescreen => 2,
            OperationKind::Screen | OperationKind::Data => 3,
        }
    }

    pub fn mutates_records(&self) -> bool {
        !matches!(self, OperationKind::Status)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Summary returned by every operation.
#[derive(Debug, Default, Clone)]
pub struct OperationReport {
    pub operation: String,
    pub processed: usize,
    pub details: Vec<String>,
    pub output_path: Option<String>,
}

impl OperationReport {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            operation: kind.label().to_string(),
            ..Self::default()
        }
    }

    pub fn note(&mut self, detail: impl Into<String>) {
        self.details.push(detail.into());
    }
}
