//! Read-side statistics. Everything here is recomputed from a snapshot on
//! each call; averages are `None` when nothing qualifies.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::collections::BTreeMap;

use crate::models::{
    SupportStatistics, TicketCategoryCount, TicketPriority, TicketPriorityCount, TicketStatus,
    TicketStatusCount,
};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// The columns of a ticket that statistics need.
#[derive(Debug, Clone, FromRow)]
pub struct TicketFacts {
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub category_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub satisfaction_rating: Option<i32>,
    pub message_count: i64,
}

#[derive(Debug, Clone, Copy, FromRow)]
pub struct FaqVotes {
    pub view_count: i32,
    pub helpful_votes: i32,
    pub unhelpful_votes: i32,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

pub fn status_counts(tickets: &[TicketFacts]) -> Vec<TicketStatusCount> {
    TicketStatus::ALL
        .into_iter()
        .map(|status| TicketStatusCount {
            status,
            count: tickets.iter().filter(|t| t.status == status).count() as i64,
        })
        .filter(|c| c.count > 0)
        .collect()
}

pub fn priority_counts(tickets: &[TicketFacts]) -> Vec<TicketPriorityCount> {
    TicketPriority::ALL
        .into_iter()
        .map(|priority| TicketPriorityCount {
            priority,
            count: tickets.iter().filter(|t| t.priority == priority).count() as i64,
        })
        .filter(|c| c.count > 0)
        .collect()
}

/// Keyed by category name; uncategorized tickets are left out.
pub fn category_counts(tickets: &[TicketFacts]) -> Vec<TicketCategoryCount> {
    let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
    for name in tickets.iter().filter_map(|t| t.category_name.as_deref()) {
        *counts.entry(name).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(category, count)| TicketCategoryCount {
            category: category.to_string(),
            count,
        })
        .collect()
}

pub fn average_resolution_days(tickets: &[TicketFacts]) -> Option<f64> {
    mean(tickets.iter().filter_map(|t| match (t.status, t.closed_at) {
        (TicketStatus::Closed, Some(closed)) => {
            Some((closed - t.created_at).num_seconds() as f64 / SECONDS_PER_DAY)
        }
        _ => None,
    }))
}

pub fn average_satisfaction(tickets: &[TicketFacts]) -> Option<f64> {
    mean(tickets.iter().filter_map(|t| t.satisfaction_rating.map(f64::from)))
}

pub fn average_messages_per_ticket(tickets: &[TicketFacts]) -> Option<f64> {
    mean(tickets.iter().map(|t| t.message_count as f64))
}

/// Mean helpful fraction (0..=1) over FAQs that have at least one vote.
pub fn faq_helpfulness_ratio(faqs: &[FaqVotes]) -> Option<f64> {
    mean(faqs.iter().filter_map(|f| {
        let total = f.helpful_votes + f.unhelpful_votes;
        (total > 0).then(|| f64::from(f.helpful_votes) / f64::from(total))
    }))
}

pub fn summarize(tickets: &[TicketFacts], faqs: &[FaqVotes]) -> SupportStatistics {
    SupportStatistics {
        total_tickets: tickets.len() as i64,
        ticket_by_status: status_counts(tickets),
        ticket_by_priority: priority_counts(tickets),
        ticket_by_category: category_counts(tickets),
        avg_resolution_time_days: average_resolution_days(tickets),
        avg_satisfaction_rating: average_satisfaction(tickets),
        avg_messages_per_ticket: average_messages_per_ticket(tickets),
        faq_helpfulness_ratio: faq_helpfulness_ratio(faqs),
        total_faq_views: faqs.iter().map(|f| i64::from(f.view_count)).sum(),
    }
}
