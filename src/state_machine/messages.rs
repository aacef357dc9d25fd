//! Fixed bot copy

pub const GREETING: &str =
    "Hi! I'm a bot that helps with study-process questions. What is your question?";

pub const PROCESSING: &str = "Looking for an answer...";

pub const INAPPROPRIATE: &str = "Your question seems to be phrased incorrectly or is not \
     about the study process. Please rephrase it and try again.";

pub const CHOOSE_CATEGORY: &str = "I could not determine the category of your question \
     automatically. Please choose a suitable category from the list below.";

pub const REQUEST_FAILED: &str = "An error occurred while getting an answer \
     (classifier/model). Please try again or come back later.";

pub const SATISFACTION_PROMPT: &str = "Are you satisfied with the answer?";

pub const USER_SATISFIED: &str = "Yes, I'm satisfied";

pub const USER_NOT_SATISFIED: &str = "No, I'm not satisfied";

pub const THANKS: &str = "Thank you for your rating.";

pub const CLARIFY_PROMPT: &str = "Describe what exactly needs clarifying in your question. \
     I will pass the clarification to the model.";

pub const INCOMPLETE_PROFILE: &str = "Could not read your profile (campus and education \
     level). Please fill in your profile and try again.";

pub const PROFILE_UPDATED: &str = "Your profile has been updated and saved. You can ask a \
     new question or clarify the current one.";

pub const INTERRUPTED: &str =
    "The previous request was interrupted by a restart. Please ask your question again.";

/// Joins a clarification onto the current question
pub const CLARIFICATION_SEPARATOR: &str = "\n\nUser clarification: ";

pub fn category_detected(category: &str) -> String {
    format!("Category of your question: {category}.")
}

pub fn subcategory_detected(category: &str, subcategory: &str) -> String {
    format!("Category of your question: {category}. Subcategory: {subcategory}.")
}
