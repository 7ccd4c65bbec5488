use regex::Regex;

use crate::core::Record;

const ERRONEOUS_SYMBOLS: [char; 4] = ['\u{FFFD}', '™', '®', '©'];

const NAME_TITLES: [&str; 6] = ["PhD", "Phd", "phd", "Prof", "Dr", "MD"];

const INSTITUTION_TERMS: [&str; 5] = ["University", "Institute", "Department", "Team", "Inc"];

const LANGUAGE_CODES: [&str; 22] = [
    "eng", "deu", "fra", "spa", "ita", "por", "nld", "rus", "zho", "jpn", "kor", "ara", "swe",
    "dan", "nor", "fin", "pol", "ces", "tur", "ell", "heb", "hin",
];

/// Field requirements per entry type: (required fields, fields that do
/// not belong on the type).
fn entrytype_requirements(entrytype: &str) -> (&'static [&'static str], &'static [&'static str]) {
    match entrytype {
        "article" => (
            &["author", "title", "journal", "year", "volume", "number"],
            &[],
        ),
        "inproceedings" => (
            &["author", "title", "booktitle", "year"],
            &["journal", "number"],
        ),
        "incollection" => (
            &["author", "title", "booktitle", "publisher", "year"],
            &[],
        ),
        "inbook" => (
            &["author", "title", "chapter", "publisher", "year"],
            &["journal"],
        ),
        "thesis" | "phdthesis" | "mastersthesis" => (
            &["author", "title", "year"],
            &["journal", "booktitle"],
        ),
        _ => (&["author", "title", "year"], &[]),
    }
}

/// Detects metadata defects and records them as per-field notes.
/// Mirrors the checks a reviewer applies when eyeballing an export:
/// broken symbols, shouting case, truncated or misformatted names,
/// container inconsistencies and type-specific field requirements.
pub struct QualityModel {
    year_re: Regex,
    digit_word_re: Regex,
}

impl Default for QualityModel {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityModel {
    pub fn new() -> Self {
        Self {
            year_re: Regex::new(r"^\d{4}$").unwrap(),
            digit_word_re: Regex::new(r"[A-Za-z]*\d+[A-Za-z]+\w*|[A-Za-z]+\d+\w*").unwrap(),
        }
    }

    /// Re-assesses the record, replacing any previous notes.
    pub fn assess(&self, record: &mut Record) {
        record.notes.clear();

        self.check_author(record);
        self.check_title(record);
        self.check_container(record);
        self.check_year(record);
        self.check_language(record);
        self.check_entrytype_fields(record);
    }

    fn check_author(&self, record: &mut Record) {
        let Some(author) = record.field("author").map(str::to_string) else {
            return;
        };

        if has_erroneous_symbol(&author) {
            record.add_note("author", "erroneous-symbol-in-field");
            return;
        }

        for term in INSTITUTION_TERMS {
            if author.split([',', ' ']).any(|token| token == term) {
                record.add_note("author", "erroneous-term-in-field");
            }
        }

        if is_mostly_all_caps(&author) {
            record.add_note("author", "mostly-all-caps");
            return;
        }

        let incomplete = author.trim_end().ends_with(',') || author.contains("et al");
        if incomplete {
            record.add_note("author", "incomplete-field");
            return;
        }

        if author.contains("and others") {
            record.add_note("author", "name-abbreviated");
            return;
        }

        let has_title = author
            .split(" and ")
            .flat_map(|name| name.split(','))
            .map(str::trim)
            .any(|part| NAME_TITLES.contains(&part));
        if has_title {
            record.add_note("author", "name-format-titles");
            return;
        }

        if has_separator_defect(&author) {
            record.add_note("author", "name-format-separators");
        }

        if is_thesis(&record.entrytype) && author.contains(" and ") {
            record.add_note("author", "thesis-with-multiple-authors");
        }
    }

    fn check_title(&self, record: &mut Record) {
        let Some(title) = record.field("title").map(str::to_string) else {
            return;
        };

        if has_erroneous_symbol(&title) {
            record.add_note("title", "erroneous-symbol-in-field");
            return;
        }

        if is_mostly_all_caps(&title) {
            record.add_note("title", "mostly-all-caps");
        }

        if title.trim_end().ends_with("...") {
            record.add_note("title", "incomplete-field");
        }

        if title.contains('_') || self.digit_word_re.is_match(&title) {
            record.add_note("title", "erroneous-title-field");
        }

        for container in ["journal", "booktitle"] {
            if let Some(value) = record.field(container) {
                if value.eq_ignore_ascii_case(&title) {
                    record.add_note("title", "identical-values-between-title-and-container");
                    break;
                }
            }
        }
    }

    fn check_container(&self, record: &mut Record) {
        for field in ["journal", "booktitle"] {
            let Some(value) = record.field(field).map(str::to_string) else {
                continue;
            };

            if has_erroneous_symbol(&value) {
                record.add_note(field, "erroneous-symbol-in-field");
                continue;
            }

            if is_abbreviated_container(&value) {
                record.add_note(field, "container-title-abbreviated");
            } else if is_mostly_all_caps(&value) {
                record.add_note(field, "mostly-all-caps");
            }

            let lowered = value.to_lowercase();
            if field == "journal"
                && ["conference", "proceedings", "workshop"]
                    .iter()
                    .any(|term| lowered.contains(term))
            {
                record.add_note(field, "inconsistent-content");
            }
        }
    }

    fn check_year(&self, record: &mut Record) {
        if let Some(year) = record.field("year") {
            if year != "forthcoming" && !self.year_re.is_match(year) {
                record.add_note("year", "year-format");
            }
        }
    }

    fn check_language(&self, record: &mut Record) {
        if let Some(language) = record.field("language") {
            if !LANGUAGE_CODES.contains(&language) {
                record.add_note("language", "language-format-error");
            }
        }
    }

    fn check_entrytype_fields(&self, record: &mut Record) {
        let (required, inconsistent) = entrytype_requirements(&record.entrytype);
        let forthcoming = record.field("year") == Some("forthcoming");

        for field in required {
            if record.field(field).is_some() {
                continue;
            }
            // A forthcoming article legitimately has no volume/number yet.
            if forthcoming && matches!(*field, "volume" | "number") {
                record.add_note(field, "not-missing");
            } else {
                record.add_note(field, "missing");
            }
        }

        for field in inconsistent {
            if record.field(field).is_some() {
                record.add_note(field, "inconsistent-with-entrytype");
            }
        }
    }
}

fn has_erroneous_symbol(value: &str) -> bool {
    value.chars().any(|c| ERRONEOUS_SYMBOLS.contains(&c))
}

/// True when at least 80% of the alphabetic characters are uppercase
/// and the value has enough letters to judge.
fn is_mostly_all_caps(value: &str) -> bool {
    let letters: Vec<char> = value.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() < 3 {
        return false;
    }
    let upper = letters.iter().filter(|c| c.is_uppercase()).count();
    upper as f64 / letters.len() as f64 >= 0.8
}

/// Single short all-caps token, e.g. "SAMJ".
fn is_abbreviated_container(value: &str) -> bool {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    if tokens.len() != 1 {
        return false;
    }
    let token = tokens[0];
    token.len() <= 5 && token.chars().all(|c| c.is_uppercase())
}

fn has_separator_defect(author: &str) -> bool {
    if author.contains(';') {
        return true;
    }
    for name in author.split(" and ") {
        let surname = name.split(',').next().unwrap_or("").trim();
        if surname.chars().next().is_some_and(|c| c.is_lowercase()) {
            return true;
        }
        // A bare single letter is an initial standing in for a surname.
        if surname.len() == 1 && surname.chars().all(|c| c.is_alphabetic()) {
            return true;
        }
    }
    false
}

fn is_thesis(entrytype: &str) -> bool {
    matches!(entrytype, "thesis" | "phdthesis" | "mastersthesis")
}
