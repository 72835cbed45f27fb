//! Message thread rules: construction, visibility and read state.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{PostMessageInput, SenderType, Ticket, TicketMessage};
use crate::{Result, SupportError};

/// Builds an unread message from a request. The caller has already validated
/// the content.
pub fn new_message(input: &PostMessageInput, internal: bool, now: DateTime<Utc>) -> TicketMessage {
    TicketMessage {
        id: Uuid::new_v4(),
        ticket_id: input.ticket_id,
        content: input.content.clone(),
        sender_id: input.sender_id,
        sender_name: input.sender_name.clone(),
        sender_email: input.sender_email.clone(),
        sender_type: input.sender_type,
        attachment_url: input.attachment_url.clone(),
        attachment_type: input.attachment_type.clone(),
        is_internal_note: internal,
        is_read: false,
        created_at: now,
    }
}

/// The requester's opening message on a freshly created ticket.
pub fn opening_message(ticket: &Ticket, content: &str) -> TicketMessage {
    TicketMessage {
        id: Uuid::new_v4(),
        ticket_id: ticket.id,
        content: content.to_string(),
        sender_id: ticket.user_id,
        sender_name: ticket.user_name.clone(),
        sender_email: ticket.user_email.clone(),
        sender_type: SenderType::User,
        attachment_url: None,
        attachment_type: None,
        is_internal_note: false,
        is_read: false,
        created_at: ticket.created_at,
    }
}

pub fn ensure_can_write_note(sender_type: SenderType) -> Result<()> {
    if !sender_type.is_staff() {
        return Err(SupportError::InvalidArgument(format!(
            "only SUPPORT or SYSTEM senders can write internal notes, got {}",
            sender_type.as_str()
        )));
    }
    Ok(())
}

/// Unread from the point of view of `reader_id`. A reader's own messages
/// never count.
pub fn is_unread_for(message: &TicketMessage, reader_id: i64) -> bool {
    !message.is_read && message.sender_id != reader_id
}

pub fn count_unread(thread: &[TicketMessage], reader_id: i64) -> i64 {
    thread.iter().filter(|m| is_unread_for(m, reader_id)).count() as i64
}

/// Marks everything addressed to `reader_id` as read; returns how many changed.
pub fn mark_read_for(thread: &mut [TicketMessage], reader_id: i64) -> u64 {
    let mut marked = 0;
    for message in thread.iter_mut().filter(|m| is_unread_for(m, reader_id)) {
        message.is_read = true;
        marked += 1;
    }
    marked
}

/// Creation-time order. The sort is stable, so equal timestamps keep
/// insertion order.
pub fn sort_thread(thread: &mut [TicketMessage]) {
    thread.sort_by_key(|m| m.created_at);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(sender_id: i64, is_read: bool) -> TicketMessage {
        let input = PostMessageInput {
            ticket_id: Uuid::new_v4(),
            content: "hi".to_string(),
            sender_id,
            ..Default::default()
        };
        let mut m = new_message(&input, false, Utc::now());
        m.is_read = is_read;
        m
    }

    #[test]
    fn own_messages_never_unread() {
        let thread = vec![msg(1, false), msg(1, false), msg(2, false), msg(2, true)];
        assert_eq!(count_unread(&thread, 1), 1);
        assert_eq!(count_unread(&thread, 2), 2);
        assert_eq!(count_unread(&thread, 3), 3);
    }

    #[test]
    fn mark_read_skips_own_messages() {
        let mut thread = vec![msg(1, false), msg(2, false), msg(3, false)];
        assert_eq!(mark_read_for(&mut thread, 1), 2);
        assert!(!thread[0].is_read);
        assert!(thread[1].is_read && thread[2].is_read);
        assert_eq!(mark_read_for(&mut thread, 1), 0);
    }

    #[test]
    fn only_staff_write_notes() {
        assert!(ensure_can_write_note(SenderType::Support).is_ok());
        assert!(ensure_can_write_note(SenderType::System).is_ok());
        assert!(matches!(
            ensure_can_write_note(SenderType::User),
            Err(SupportError::InvalidArgument(_))
        ));
    }

    #[test]
    fn new_messages_start_unread() {
        let m = msg(5, false);
        assert!(!m.is_read);
        assert!(!m.is_internal_note);
    }
}
