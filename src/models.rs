use async_graphql::{Enum, InputObject, SimpleObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::SupportError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, SimpleObject)]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub user_id: i64,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub user_type: Option<UserType>,
    pub assigned_to_id: Option<i64>,
    pub course_id: Option<i64>,
    pub course_name: Option<String>,
    pub category_id: Option<Uuid>,
    pub satisfaction_rating: Option<i32>,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, Enum, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    #[default]
    New,
    Assigned,
    InProgress,
    Resolved,
    Closed,
}

#[derive(Debug, Clone, Copy, Default, Enum, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Enum, Eq, PartialEq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserType {
    Student,
    Instructor,
    Admin,
}

#[derive(Debug, Clone, Copy, Default, Enum, Eq, PartialEq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "sender_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderType {
    #[default]
    User,
    Support,
    System,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 5] = [
        TicketStatus::New,
        TicketStatus::Assigned,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
        TicketStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::New => "NEW",
            TicketStatus::Assigned => "ASSIGNED",
            TicketStatus::InProgress => "IN_PROGRESS",
            TicketStatus::Resolved => "RESOLVED",
            TicketStatus::Closed => "CLOSED",
        }
    }
}

impl TicketPriority {
    pub const ALL: [TicketPriority; 4] = [
        TicketPriority::Low,
        TicketPriority::Medium,
        TicketPriority::High,
        TicketPriority::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "LOW",
            TicketPriority::Medium => "MEDIUM",
            TicketPriority::High => "HIGH",
            TicketPriority::Critical => "CRITICAL",
        }
    }
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::User => "USER",
            SenderType::Support => "SUPPORT",
            SenderType::System => "SYSTEM",
        }
    }

    /// Support staff and automated senders may write internal notes.
    pub fn is_staff(&self) -> bool {
        matches!(self, SenderType::Support | SenderType::System)
    }
}

impl FromStr for TicketStatus {
    type Err = SupportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TicketStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| SupportError::InvalidArgument(format!("invalid ticket status: {s}")))
    }
}

impl FromStr for TicketPriority {
    type Err = SupportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TicketPriority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s.trim())
            .ok_or_else(|| SupportError::InvalidArgument(format!("invalid ticket priority: {s}")))
    }
}

impl FromStr for SenderType {
    type Err = SupportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "USER" => Ok(SenderType::User),
            "SUPPORT" => Ok(SenderType::Support),
            "SYSTEM" => Ok(SenderType::System),
            other => Err(SupportError::InvalidArgument(format!("invalid sender type: {other}"))),
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, SimpleObject)]
pub struct TicketMessage {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub content: String,
    pub sender_id: i64,
    pub sender_name: Option<String>,
    pub sender_email: Option<String>,
    pub sender_type: SenderType,
    pub attachment_url: Option<String>,
    pub attachment_type: Option<String>,
    pub is_internal_note: bool,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, SimpleObject)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub expected_resolution_time_hours: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, SimpleObject)]
pub struct Faq {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub category_id: Option<Uuid>,
    pub view_count: i32,
    pub helpful_votes: i32,
    pub unhelpful_votes: i32,
    pub published: bool,
    pub search_keywords: Option<String>,
    pub display_order: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Read-side projections; the derived fields are never stored.
#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct TicketView {
    #[serde(flatten)]
    #[graphql(flatten)]
    pub ticket: Ticket,
    pub category_name: Option<String>,
    pub message_count: i64,
    pub response_time_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct FaqView {
    #[serde(flatten)]
    #[graphql(flatten)]
    pub faq: Faq,
    pub category_name: Option<String>,
    pub helpful_ratio: Option<f64>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct CategoryView {
    #[serde(flatten)]
    #[graphql(flatten)]
    pub category: Category,
    pub ticket_count: i64,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
#[graphql(concrete(name = "TicketPage", params(TicketView)))]
#[graphql(concrete(name = "FaqPage", params(FaqView)))]
pub struct Page<T: async_graphql::OutputType> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
}

/// Zero-based page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    pub fn new(page: i64, size: i64) -> Self {
        Self {
            page: page.max(0),
            size: size.max(1),
        }
    }

    /// Saturates instead of overflowing for absurd page numbers.
    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.size)
    }

    pub fn window<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(usize::try_from(self.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(self.size).unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

// Statistics structures
#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct TicketStatusCount {
    pub status: TicketStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct TicketPriorityCount {
    pub priority: TicketPriority,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct TicketCategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct SupportStatistics {
    pub total_tickets: i64,
    pub ticket_by_status: Vec<TicketStatusCount>,
    pub ticket_by_priority: Vec<TicketPriorityCount>,
    pub ticket_by_category: Vec<TicketCategoryCount>,
    pub avg_resolution_time_days: Option<f64>,
    pub avg_satisfaction_rating: Option<f64>,
    pub avg_messages_per_ticket: Option<f64>,
    pub faq_helpfulness_ratio: Option<f64>,
    pub total_faq_views: i64,
}

// Input types
#[derive(Debug, Clone, Default, InputObject)]
pub struct CreateTicketInput {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TicketPriority>,
    pub user_id: i64,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub user_type: Option<UserType>,
    pub course_id: Option<i64>,
    pub course_name: Option<String>,
    pub category_id: Option<Uuid>,
    /// Opening message body, posted as the requester.
    pub initial_message: Option<String>,
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct UpdateTicketInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TicketPriority>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct PostMessageInput {
    pub ticket_id: Uuid,
    pub content: String,
    pub sender_id: i64,
    pub sender_name: Option<String>,
    pub sender_email: Option<String>,
    pub sender_type: SenderType,
    pub attachment_url: Option<String>,
    pub attachment_type: Option<String>,
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct TicketFilter {
    pub user_id: Option<i64>,
    pub assigned_to_id: Option<i64>,
    pub status: Option<TicketStatus>,
    pub category_id: Option<Uuid>,
    pub course_id: Option<i64>,
}

impl TicketFilter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.user_id.map_or(true, |id| ticket.user_id == id)
            && self
                .assigned_to_id
                .map_or(true, |id| ticket.assigned_to_id == Some(id))
            && self.status.map_or(true, |status| ticket.status == status)
            && self
                .category_id
                .map_or(true, |id| ticket.category_id == Some(id))
            && self.course_id.map_or(true, |id| ticket.course_id == Some(id))
    }
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
    pub active: Option<bool>,
    pub expected_resolution_time_hours: Option<i32>,
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct FaqInput {
    pub question: String,
    pub answer: String,
    pub category_id: Option<Uuid>,
    pub search_keywords: Option<String>,
    pub display_order: Option<i32>,
    pub published: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn huge_page_numbers_saturate() {
        let page = PageRequest::new(i64::MAX, 10);
        assert_eq!(page.offset(), i64::MAX);
        assert!(page.window(&[1, 2, 3]).is_empty());
    }

    #[test]
    fn window_slices_items() {
        let page = PageRequest::new(1, 2);
        assert_eq!(page.offset(), 2);
        assert_eq!(page.window(&[1, 2, 3, 4, 5]), vec![3, 4]);
        assert_eq!(PageRequest::new(-3, 0), PageRequest { page: 0, size: 1 });
    }

    #[test]
    fn status_names_parse() {
        assert_eq!("IN_PROGRESS".parse::<TicketStatus>().ok(), Some(TicketStatus::InProgress));
        assert!("DONE".parse::<TicketStatus>().is_err());
    }
}
