//! API request and response types

use crate::profile::{Campus, EducationLevel, UserProfile};
use crate::state_machine::categories::Category;
use crate::state_machine::{ConversationState, Event};
use serde::{Deserialize, Serialize};

/// Request to create a new session
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    /// Share an existing profile; defaults to a profile of the session's own
    #[serde(default)]
    pub profile_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_key: String,
}

/// Current dialogue state
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub state: ConversationState,
    pub input_enabled: bool,
}

impl From<ConversationState> for SessionResponse {
    fn from(state: ConversationState) -> Self {
        Self {
            input_enabled: state.input_enabled(),
            state,
        }
    }
}

/// A user action, tagged by `type`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionRequest {
    Submit {
        text: String,
    },
    SelectCategory {
        category: String,
        #[serde(default)]
        subcategory: Option<String>,
    },
    Rate {
        satisfied: bool,
    },
    Clarify,
    AskNew,
    Restart,
}

impl From<ActionRequest> for Event {
    fn from(action: ActionRequest) -> Self {
        match action {
            ActionRequest::Submit { text } => Event::SubmitText { text },
            ActionRequest::SelectCategory {
                category,
                subcategory,
            } => Event::SelectCategory {
                category,
                subcategory,
            },
            ActionRequest::Rate { satisfied } => Event::Rate { satisfied },
            ActionRequest::Clarify => Event::Clarify,
            ActionRequest::AskNew => Event::AskNew,
            ActionRequest::Restart => Event::Restart,
        }
    }
}

/// Response for user actions
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub accepted: bool,
}

/// Profile as written by the client
#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    pub name: String,
    pub campus: Option<Campus>,
    pub level: Option<EducationLevel>,
}

impl From<ProfileRequest> for UserProfile {
    fn from(req: ProfileRequest) -> Self {
        Self {
            name: req.name,
            campus: req.campus,
            level: req.level,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: UserProfile,
    /// Campus and level are both set
    pub complete: bool,
}

impl From<UserProfile> for ProfileResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            complete: profile.answer_filters().is_ok(),
            profile,
        }
    }
}

/// Manual category list
#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
