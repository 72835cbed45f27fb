//! Field-level input checks, run before any entity is touched.

use crate::models::{CategoryInput, CreateTicketInput, FaqInput, PostMessageInput, UpdateTicketInput};
use crate::{Result, SupportError};

pub const TITLE_MIN: usize = 5;
pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 5000;
pub const CONTENT_MAX: usize = 10_000;
pub const QUESTION_MIN: usize = 10;
pub const QUESTION_MAX: usize = 255;
pub const CATEGORY_NAME_MAX: usize = 100;

fn required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SupportError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn length_between(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(SupportError::Validation(format!(
            "{field} must be between {min} and {max} characters (got {len})"
        )));
    }
    Ok(())
}

fn at_most(field: &str, value: Option<&str>, max: usize) -> Result<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(SupportError::Validation(format!(
            "{field} must not exceed {max} characters"
        ))),
        _ => Ok(()),
    }
}

fn title(value: &str) -> Result<()> {
    required("title", value)?;
    length_between("title", value, TITLE_MIN, TITLE_MAX)
}

pub fn create_ticket(input: &CreateTicketInput) -> Result<()> {
    title(&input.title)?;
    at_most("description", input.description.as_deref(), DESCRIPTION_MAX)?;
    if let Some(body) = &input.initial_message {
        message_content(body)?;
    }
    Ok(())
}

pub fn update_ticket(input: &UpdateTicketInput) -> Result<()> {
    if let Some(t) = &input.title {
        title(t)?;
    }
    at_most("description", input.description.as_deref(), DESCRIPTION_MAX)
}

pub fn message_content(content: &str) -> Result<()> {
    required("content", content)?;
    length_between("content", content, 1, CONTENT_MAX)
}

pub fn post_message(input: &PostMessageInput) -> Result<()> {
    message_content(&input.content)?;
    if input.attachment_type.is_some() && input.attachment_url.is_none() {
        return Err(SupportError::Validation(
            "attachment_type given without attachment_url".to_string(),
        ));
    }
    Ok(())
}

pub fn category(input: &CategoryInput) -> Result<()> {
    required("name", &input.name)?;
    length_between("name", input.name.trim(), 1, CATEGORY_NAME_MAX)?;
    if matches!(input.expected_resolution_time_hours, Some(h) if h < 0) {
        return Err(SupportError::Validation(
            "expected_resolution_time_hours must not be negative".to_string(),
        ));
    }
    Ok(())
}

pub fn faq(input: &FaqInput) -> Result<()> {
    required("question", &input.question)?;
    length_between("question", &input.question, QUESTION_MIN, QUESTION_MAX)?;
    required("answer", &input.answer)
}
