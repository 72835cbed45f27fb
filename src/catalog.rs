//! Category registry and FAQ catalog rules.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Category, CategoryInput, Faq, FaqInput, FaqView};
use crate::{Result, SupportError};

pub const DEFAULT_TOP_LIMIT: i64 = 5;

/// Engagement counters on an FAQ. Each one only ever grows by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaqCounter {
    Views,
    HelpfulVotes,
    UnhelpfulVotes,
}

impl FaqCounter {
    pub fn column(&self) -> &'static str {
        match self {
            FaqCounter::Views => "view_count",
            FaqCounter::HelpfulVotes => "helpful_votes",
            FaqCounter::UnhelpfulVotes => "unhelpful_votes",
        }
    }

    pub fn bump(&self, faq: &mut Faq) {
        match self {
            FaqCounter::Views => faq.view_count += 1,
            FaqCounter::HelpfulVotes => faq.helpful_votes += 1,
            FaqCounter::UnhelpfulVotes => faq.unhelpful_votes += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaqRanking {
    MostViewed,
    MostHelpful,
}

impl FaqRanking {
    pub fn score(&self, faq: &Faq) -> i32 {
        match self {
            FaqRanking::MostViewed => faq.view_count,
            FaqRanking::MostHelpful => faq.helpful_votes,
        }
    }
}

/// Percentage of helpful votes, or `None` before the first vote.
pub fn helpful_ratio(helpful: i32, unhelpful: i32) -> Option<f64> {
    let total = helpful + unhelpful;
    if total > 0 {
        Some(f64::from(helpful) / f64::from(total) * 100.0)
    } else {
        None
    }
}

pub fn faq_view(faq: Faq, category_name: Option<String>) -> FaqView {
    let helpful_ratio = helpful_ratio(faq.helpful_votes, faq.unhelpful_votes);
    FaqView {
        faq,
        category_name,
        helpful_ratio,
    }
}

/// Case-insensitive match over question, answer and keywords.
pub fn faq_matches(faq: &Faq, keyword: &str) -> bool {
    let needle = keyword.trim().to_lowercase();
    faq.question.to_lowercase().contains(&needle)
        || faq.answer.to_lowercase().contains(&needle)
        || faq
            .search_keywords
            .as_deref()
            .is_some_and(|k| k.to_lowercase().contains(&needle))
}

pub fn ensure_category_deletable(category: &Category, ticket_count: i64) -> Result<()> {
    if ticket_count > 0 {
        return Err(SupportError::InvalidState(format!(
            "category '{}' still has {ticket_count} ticket(s)",
            category.name
        )));
    }
    Ok(())
}

/// `holder` is the category currently using the name, if any.
pub fn ensure_name_available(name: &str, holder: Option<Uuid>, updating: Option<Uuid>) -> Result<()> {
    match holder {
        Some(id) if Some(id) != updating => Err(SupportError::InvalidArgument(format!(
            "a category named '{name}' already exists"
        ))),
        _ => Ok(()),
    }
}

pub fn new_category(input: &CategoryInput, now: DateTime<Utc>) -> Category {
    Category {
        id: Uuid::new_v4(),
        name: input.name.trim().to_string(),
        description: input.description.clone(),
        active: input.active.unwrap_or(true),
        expected_resolution_time_hours: input.expected_resolution_time_hours,
        created_at: now,
        updated_at: now,
    }
}

/// Name and description are replaced; flags only when given.
pub fn apply_category(category: &mut Category, input: &CategoryInput, now: DateTime<Utc>) {
    category.name = input.name.trim().to_string();
    category.description = input.description.clone();
    if let Some(active) = input.active {
        category.active = active;
    }
    if let Some(hours) = input.expected_resolution_time_hours {
        category.expected_resolution_time_hours = Some(hours);
    }
    category.updated_at = now;
}

pub fn new_faq(input: &FaqInput, now: DateTime<Utc>) -> Faq {
    Faq {
        id: Uuid::new_v4(),
        question: input.question.clone(),
        answer: input.answer.clone(),
        category_id: input.category_id,
        view_count: 0,
        helpful_votes: 0,
        unhelpful_votes: 0,
        published: input.published.unwrap_or(false),
        search_keywords: input.search_keywords.clone(),
        display_order: input.display_order,
        created_at: now,
        updated_at: now,
    }
}

/// Content fields are replaced; `published` only when given. Counters are
/// never touched here.
pub fn apply_faq(faq: &mut Faq, input: &FaqInput, now: DateTime<Utc>) {
    faq.question = input.question.clone();
    faq.answer = input.answer.clone();
    faq.category_id = input.category_id;
    faq.search_keywords = input.search_keywords.clone();
    faq.display_order = input.display_order;
    if let Some(published) = input.published {
        faq.published = published;
    }
    faq.updated_at = now;
}
