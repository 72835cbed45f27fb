//! Ticket lifecycle rules.
//!
//! Every status change that happens as a side effect of another operation is
//! listed in [`next_status`]. Storage implementations call into this module
//! while holding the ticket for update, so the new status lands in the same
//! transaction as the triggering write.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    CreateTicketInput, SenderType, Ticket, TicketMessage, TicketPriority, TicketStatus, TicketView,
    UpdateTicketInput,
};
use crate::{Result, SupportError};

pub const RATING_MIN: i32 = 1;
pub const RATING_MAX: i32 = 5;

/// Something that happened to a ticket and may move its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketEvent {
    Assigned,
    MessagePosted { sender_type: SenderType, internal: bool },
}

/// Mutations requested explicitly by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketCommand {
    Assign { staff_id: i64 },
    ChangeStatus(TicketStatus),
    ChangePriority(TicketPriority),
    Rate { rating: i32, feedback: Option<String> },
}

/// Implicit transition table. `None` means the status stays as it is.
pub fn next_status(current: TicketStatus, event: TicketEvent) -> Option<TicketStatus> {
    match (current, event) {
        (TicketStatus::New, TicketEvent::Assigned) => Some(TicketStatus::Assigned),
        (
            TicketStatus::Assigned,
            TicketEvent::MessagePosted {
                sender_type: SenderType::Support,
                internal: false,
            },
        ) => Some(TicketStatus::InProgress),
        _ => None,
    }
}

/// A new ticket always starts as NEW; priority falls back to MEDIUM.
pub fn new_ticket(input: &CreateTicketInput, now: DateTime<Utc>) -> Ticket {
    Ticket {
        id: Uuid::new_v4(),
        title: input.title.trim().to_string(),
        description: input.description.clone().unwrap_or_default(),
        status: TicketStatus::New,
        priority: input.priority.unwrap_or_default(),
        user_id: input.user_id,
        user_email: input.user_email.clone(),
        user_name: input.user_name.clone(),
        user_type: input.user_type,
        assigned_to_id: None,
        course_id: input.course_id,
        course_name: input.course_name.clone(),
        category_id: input.category_id,
        satisfaction_rating: None,
        feedback: None,
        created_at: now,
        updated_at: now,
        closed_at: None,
    }
}

/// Editable fields only. Status, requester and assignment have their own
/// operations.
pub fn apply_update(ticket: &mut Ticket, input: &UpdateTicketInput, now: DateTime<Utc>) {
    if let Some(title) = &input.title {
        ticket.title = title.trim().to_string();
    }
    if let Some(description) = &input.description {
        ticket.description = description.clone();
    }
    if let Some(priority) = input.priority {
        ticket.priority = priority;
    }
    if let Some(category_id) = input.category_id {
        ticket.category_id = Some(category_id);
    }
    ticket.updated_at = now;
}

/// Applies an explicit command. Preconditions are checked before the ticket
/// is modified, so an error leaves it untouched.
pub fn apply(ticket: &mut Ticket, command: TicketCommand, now: DateTime<Utc>) -> Result<()> {
    match command {
        TicketCommand::Assign { staff_id } => {
            ticket.assigned_to_id = Some(staff_id);
            if let Some(status) = next_status(ticket.status, TicketEvent::Assigned) {
                ticket.status = status;
            }
        }
        TicketCommand::ChangeStatus(status) => {
            ticket.status = status;
            if status == TicketStatus::Closed && ticket.closed_at.is_none() {
                ticket.closed_at = Some(now);
            }
        }
        TicketCommand::ChangePriority(priority) => {
            ticket.priority = priority;
        }
        TicketCommand::Rate { rating, feedback } => {
            if ticket.status != TicketStatus::Closed {
                return Err(SupportError::InvalidState(format!(
                    "only closed tickets can be rated (ticket {} is {})",
                    ticket.id, ticket.status
                )));
            }
            if !(RATING_MIN..=RATING_MAX).contains(&rating) {
                return Err(SupportError::InvalidArgument(format!(
                    "rating must be between {RATING_MIN} and {RATING_MAX}, got {rating}"
                )));
            }
            ticket.satisfaction_rating = Some(rating);
            ticket.feedback = feedback;
        }
    }
    ticket.updated_at = now;
    Ok(())
}

/// Runs the message-triggered rule. Returns true when the status moved.
pub fn on_message_posted(ticket: &mut Ticket, message: &TicketMessage, now: DateTime<Utc>) -> bool {
    let event = TicketEvent::MessagePosted {
        sender_type: message.sender_type,
        internal: message.is_internal_note,
    };
    match next_status(ticket.status, event) {
        Some(status) => {
            ticket.status = status;
            ticket.updated_at = now;
            true
        }
        None => false,
    }
}

/// Minutes from the first USER message to the first SUPPORT message after it.
pub fn response_time_minutes(thread: &[TicketMessage]) -> Option<i64> {
    let mut asked_at = None;
    for message in thread {
        match (message.sender_type, asked_at) {
            (SenderType::User, None) => asked_at = Some(message.created_at),
            (SenderType::Support, Some(asked)) => {
                return Some((message.created_at - asked).num_minutes());
            }
            _ => {}
        }
    }
    None
}

pub fn ticket_view(ticket: Ticket, category_name: Option<String>, thread: &[TicketMessage]) -> TicketView {
    TicketView {
        ticket,
        category_name,
        message_count: thread.len() as i64,
        response_time_minutes: response_time_minutes(thread),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ticket(status: TicketStatus) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: Uuid::new_v4(),
            title: "Cannot access course".to_string(),
            description: String::new(),
            status,
            priority: TicketPriority::Medium,
            user_id: 1,
            user_email: None,
            user_name: None,
            user_type: None,
            assigned_to_id: None,
            course_id: None,
            course_name: None,
            category_id: None,
            satisfaction_rating: None,
            feedback: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
        }
    }

    fn message(sender_type: SenderType, at: DateTime<Utc>) -> TicketMessage {
        TicketMessage {
            id: Uuid::new_v4(),
            ticket_id: Uuid::nil(),
            content: "hello".to_string(),
            sender_id: 1,
            sender_name: None,
            sender_email: None,
            sender_type,
            attachment_url: None,
            attachment_type: None,
            is_internal_note: false,
            is_read: false,
            created_at: at,
        }
    }

    #[test]
    fn transition_table() {
        let support_reply = TicketEvent::MessagePosted {
            sender_type: SenderType::Support,
            internal: false,
        };
        let support_note = TicketEvent::MessagePosted {
            sender_type: SenderType::Support,
            internal: true,
        };
        let user_reply = TicketEvent::MessagePosted {
            sender_type: SenderType::User,
            internal: false,
        };

        assert_eq!(next_status(TicketStatus::New, TicketEvent::Assigned), Some(TicketStatus::Assigned));
        assert_eq!(next_status(TicketStatus::Assigned, TicketEvent::Assigned), None);
        assert_eq!(next_status(TicketStatus::InProgress, TicketEvent::Assigned), None);
        assert_eq!(next_status(TicketStatus::Assigned, support_reply), Some(TicketStatus::InProgress));
        assert_eq!(next_status(TicketStatus::Assigned, support_note), None);
        assert_eq!(next_status(TicketStatus::Assigned, user_reply), None);
        assert_eq!(next_status(TicketStatus::New, support_reply), None);
        assert_eq!(next_status(TicketStatus::InProgress, support_reply), None);
    }

    #[test]
    fn new_ticket_defaults() {
        let input = CreateTicketInput {
            title: "Cannot access course".to_string(),
            user_id: 3,
            ..Default::default()
        };
        let t = new_ticket(&input, Utc::now());
        assert_eq!(t.status, TicketStatus::New);
        assert_eq!(t.priority, TicketPriority::Medium);
        assert!(t.closed_at.is_none());

        let urgent = CreateTicketInput {
            priority: Some(TicketPriority::Critical),
            ..input
        };
        assert_eq!(new_ticket(&urgent, Utc::now()).priority, TicketPriority::Critical);
    }

    #[test]
    fn update_leaves_status_alone() {
        let mut t = ticket(TicketStatus::Assigned);
        let update = UpdateTicketInput {
            title: Some("Video player is black".to_string()),
            priority: Some(TicketPriority::High),
            ..Default::default()
        };
        apply_update(&mut t, &update, Utc::now());
        assert_eq!(t.status, TicketStatus::Assigned);
        assert_eq!(t.priority, TicketPriority::High);
        assert_eq!(t.title, "Video player is black");
    }

    #[test]
    fn reassigning_keeps_status() {
        let mut t = ticket(TicketStatus::New);
        apply(&mut t, TicketCommand::Assign { staff_id: 7 }, Utc::now()).unwrap();
        assert_eq!(t.status, TicketStatus::Assigned);

        apply(&mut t, TicketCommand::Assign { staff_id: 8 }, Utc::now()).unwrap();
        assert_eq!(t.status, TicketStatus::Assigned);
        assert_eq!(t.assigned_to_id, Some(8));
    }

    #[test]
    fn closed_at_is_stamped_once() {
        let mut t = ticket(TicketStatus::InProgress);
        let first = Utc::now();
        apply(&mut t, TicketCommand::ChangeStatus(TicketStatus::Closed), first).unwrap();
        assert_eq!(t.closed_at, Some(first));

        apply(&mut t, TicketCommand::ChangeStatus(TicketStatus::InProgress), first + Duration::hours(1)).unwrap();
        assert_eq!(t.closed_at, Some(first));

        apply(&mut t, TicketCommand::ChangeStatus(TicketStatus::Closed), first + Duration::hours(2)).unwrap();
        assert_eq!(t.closed_at, Some(first));
    }

    #[test]
    fn non_closing_status_leaves_closed_at_unset() {
        let mut t = ticket(TicketStatus::New);
        for status in [TicketStatus::Assigned, TicketStatus::InProgress, TicketStatus::Resolved] {
            apply(&mut t, TicketCommand::ChangeStatus(status), Utc::now()).unwrap();
            assert!(t.closed_at.is_none());
        }
    }

    #[test]
    fn rating_requires_closed_regardless_of_value() {
        for status in [
            TicketStatus::New,
            TicketStatus::Assigned,
            TicketStatus::InProgress,
            TicketStatus::Resolved,
        ] {
            for rating in [0, 3, 9] {
                let mut t = ticket(status);
                let result = apply(&mut t, TicketCommand::Rate { rating, feedback: None }, Utc::now());
                assert!(matches!(result, Err(SupportError::InvalidState(_))));
                assert!(t.satisfaction_rating.is_none());
            }
        }
    }

    #[test]
    fn rating_range_checked_on_closed_ticket() {
        let mut t = ticket(TicketStatus::Closed);
        let result = apply(&mut t, TicketCommand::Rate { rating: 6, feedback: None }, Utc::now());
        assert!(matches!(result, Err(SupportError::InvalidArgument(_))));

        apply(
            &mut t,
            TicketCommand::Rate {
                rating: 5,
                feedback: Some("great".to_string()),
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(t.satisfaction_rating, Some(5));
        assert_eq!(t.feedback.as_deref(), Some("great"));
    }

    #[test]
    fn response_time_pairs_first_user_with_next_support() {
        let t0 = Utc::now();
        let thread = vec![
            message(SenderType::Support, t0),
            message(SenderType::User, t0 + Duration::minutes(5)),
            message(SenderType::User, t0 + Duration::minutes(10)),
            message(SenderType::System, t0 + Duration::minutes(12)),
            message(SenderType::Support, t0 + Duration::minutes(47)),
            message(SenderType::Support, t0 + Duration::minutes(90)),
        ];
        assert_eq!(response_time_minutes(&thread), Some(42));
    }

    #[test]
    fn response_time_absent_without_pair() {
        let t0 = Utc::now();
        assert_eq!(response_time_minutes(&[]), None);
        assert_eq!(response_time_minutes(&[message(SenderType::User, t0)]), None);
        assert_eq!(
            response_time_minutes(&[
                message(SenderType::Support, t0),
                message(SenderType::User, t0 + Duration::minutes(1)),
            ]),
            None
        );
    }

    #[test]
    fn view_counts_every_message() {
        let t0 = Utc::now();
        let mut note = message(SenderType::Support, t0 + Duration::minutes(3));
        note.is_internal_note = true;
        let thread = vec![message(SenderType::User, t0), note];
        let view = ticket_view(ticket(TicketStatus::New), Some("Billing".to_string()), &thread);
        assert_eq!(view.message_count, 2);
        assert_eq!(view.response_time_minutes, Some(3));
        assert_eq!(view.category_name.as_deref(), Some("Billing"));
    }
}
