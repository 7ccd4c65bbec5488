use crate::utils::error::{ReviewError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// Project settings, stored as `review.toml` at the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSettings {
    pub project: ProjectSettings,
    #[serde(default)]
    pub sources: Vec<SearchSource>,
    #[serde(default)]
    pub cleanse: CleanseSettings,
    #[serde(default)]
    pub prescreen: PrescreenSettings,
    #[serde(default)]
    pub screen: ScreenSettings,
    #[serde(default)]
    pub data: DataSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSettings {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub review_type: ReviewType,
    #[serde(default)]
    pub id_pattern: IdPattern,
    pub protocol_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewType {
    #[default]
    Literature,
    Scoping,
    Theoretical,
    Descriptive,
}

impl FromStr for ReviewType {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "literature" => Ok(ReviewType::Literature),
            "scoping" => Ok(ReviewType::Scoping),
            "theoretical" => Ok(ReviewType::Theoretical),
            "descriptive" => Ok(ReviewType::Descriptive),
            other => Err(ReviewError::Parameter(format!(
                "Unknown review type: {} (expected literature, scoping, theoretical or descriptive)",
                other
            ))),
        }
    }
}

/// How record identifiers are derived from the author and year fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdPattern {
    #[default]
    FirstAuthorYear,
    ThreeAuthorsYear,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSource {
    pub name: String,
    /// File under `data/search/` that holds the retrieved results.
    pub filename: String,
    #[serde(default)]
    pub search_type: SearchType,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    #[default]
    Db,
    Backward,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanseSettings {
    #[serde(default = "default_true")]
    pub trim_whitespace: bool,
    #[serde(default = "default_true")]
    pub remove_html_tags: bool,
    #[serde(default = "default_true")]
    pub normalize_language: bool,
    /// When non-empty, drops every field not listed here.
    #[serde(default)]
    pub fields_to_keep: Vec<String>,
}

impl Default for CleanseSettings {
    fn default() -> Self {
        Self {
            trim_whitespace: true,
            remove_html_tags: true,
            normalize_language: true,
            fields_to_keep: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescreenSettings {
    pub time_scope_from: Option<i32>,
    pub time_scope_to: Option<i32>,
    /// Entry types that survive prescreening; empty means all.
    #[serde(default)]
    pub entrytype_scope: Vec<String>,
    /// Outlets (journal/booktitle) that alone survive; empty means all.
    #[serde(default)]
    pub outlet_inclusion: Vec<String>,
    #[serde(default)]
    pub outlet_exclusion: Vec<String>,
    #[serde(default = "default_true")]
    pub exclude_complementary_materials: bool,
}

impl Default for PrescreenSettings {
    fn default() -> Self {
        Self {
            time_scope_from: None,
            time_scope_to: None,
            entrytype_scope: Vec::new(),
            outlet_inclusion: Vec::new(),
            outlet_exclusion: Vec::new(),
            exclude_complementary_materials: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenSettings {
    pub explanation: Option<String>,
    #[serde(default)]
    pub criteria: BTreeMap<String, ScreenCriterion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenCriterion {
    pub explanation: String,
    #[serde(default)]
    pub criterion_type: CriterionType,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionType {
    #[default]
    InclusionCriterion,
    ExclusionCriterion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    #[serde(default = "default_true")]
    pub profile: bool,
    pub compression: Option<CompressionSettings>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            profile: true,
            compression: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionSettings {
    pub enabled: bool,
    pub filename: String,
}

fn default_true() -> bool {
    true
}

impl ReviewSettings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);

        toml::from_str(&processed).map_err(|e| ReviewError::InvalidSettings {
            field: "review.toml".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR_NAME}` placeholders with environment values.
    /// Unknown variables are left untouched.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ReviewError::InvalidSettings {
            field: "review.toml".to_string(),
            message: format!("TOML serialization error: {}", e),
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn source_for_file(&self, filename: &str) -> Option<&SearchSource> {
        self.sources.iter().find(|s| s.filename == filename)
    }
}

impl Validate for ReviewSettings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("project.title", &self.project.title)?;

        if let Some(url) = &self.project.protocol_url {
            validate_url("project.protocol_url", url)?;
        }

        for source in &self.sources {
            validate_non_empty_string("sources.name", &source.name)?;
            validate_non_empty_string("sources.filename", &source.filename)?;
        }

        if let Some(from) = self.prescreen.time_scope_from {
            validate_range("prescreen.time_scope_from", from, 1900, 2100)?;
        }
        if let Some(to) = self.prescreen.time_scope_to {
            validate_range("prescreen.time_scope_to", to, 1900, 2100)?;
        }
        if let (Some(from), Some(to)) = (self.prescreen.time_scope_from, self.prescreen.time_scope_to)
        {
            if from > to {
                return Err(ReviewError::InvalidSettings {
                    field: "prescreen.time_scope_from".to_string(),
                    message: format!("Lower bound {} exceeds upper bound {}", from, to),
                });
            }
        }

        for (name, criterion) in &self.screen.criteria {
            validate_non_empty_string("screen.criteria", name)?;
            validate_non_empty_string("screen.criteria.explanation", &criterion.explanation)?;
        }

        Ok(())
    }
}

/// A fresh settings file for a newly initialized project.
pub fn default_settings(title: &str, review_type: ReviewType) -> ReviewSettings {
    ReviewSettings {
        project: ProjectSettings {
            title: title.to_string(),
            authors: Vec::new(),
            keywords: Vec::new(),
            review_type,
            id_pattern: IdPattern::default(),
            protocol_url: None,
        },
        sources: Vec::new(),
        cleanse: CleanseSettings::default(),
        prescreen: PrescreenSettings::default(),
        screen: ScreenSettings::default(),
        data: DataSettings::default(),
    }
}
