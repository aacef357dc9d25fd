//! User profile
//!
//! The profile is owned by the profile collaborator (see
//! `runtime::ProfileProvider`). The dialogue only ever reads snapshots of it.

use crate::gateway::ValidationError;
use serde::{Deserialize, Serialize};

/// Minimum length of a non-empty display name
pub const MIN_NAME_LEN: usize = 3;

/// University campus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Campus {
    Moscow,
    SaintPetersburg,
    NizhnyNovgorod,
    Perm,
}

impl Campus {
    pub const ALL: [Campus; 4] = [
        Campus::Moscow,
        Campus::SaintPetersburg,
        Campus::NizhnyNovgorod,
        Campus::Perm,
    ];

    /// Value the answer service filters on
    pub fn filter_value(self) -> &'static str {
        match self {
            Campus::Moscow => "Москва",
            Campus::SaintPetersburg => "Санкт-Петербург",
            Campus::NizhnyNovgorod => "Нижний Новгород",
            Campus::Perm => "Пермь",
        }
    }
}

/// Education level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    Bachelor,
    Specialist,
    Master,
    Postgraduate,
}

impl EducationLevel {
    pub const ALL: [EducationLevel; 4] = [
        EducationLevel::Bachelor,
        EducationLevel::Specialist,
        EducationLevel::Master,
        EducationLevel::Postgraduate,
    ];

    /// Value the answer service filters on
    pub fn filter_value(self) -> &'static str {
        match self {
            EducationLevel::Bachelor => "бакалавриат",
            EducationLevel::Specialist => "специалитет",
            EducationLevel::Master => "магистратура",
            EducationLevel::Postgraduate => "аспирантура",
        }
    }
}

/// User profile as edited by the user. Campus and level may still be unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub campus: Option<Campus>,
    #[serde(default)]
    pub level: Option<EducationLevel>,
}

/// The part of a profile an answer request needs, guaranteed present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerFilters {
    pub campus: Campus,
    pub level: EducationLevel,
}

impl UserProfile {
    pub fn new(name: impl Into<String>, campus: Campus, level: EducationLevel) -> Self {
        Self {
            name: name.into(),
            campus: Some(campus),
            level: Some(level),
        }
    }

    /// Name is optional, but a non-empty one must be at least [`MIN_NAME_LEN`] chars
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name = self.name.trim();
        if !name.is_empty() && name.chars().count() < MIN_NAME_LEN {
            return Err(ValidationError::NameTooShort { min: MIN_NAME_LEN });
        }
        Ok(())
    }

    /// Campus and level, or `IncompleteProfile` if either is missing
    pub fn answer_filters(&self) -> Result<AnswerFilters, ValidationError> {
        match (self.campus, self.level) {
            (Some(campus), Some(level)) => Ok(AnswerFilters { campus, level }),
            _ => Err(ValidationError::IncompleteProfile),
        }
    }
}
