mod common;

use common::{message, service, ticket_input, REQUESTER, STAFF};
use pleme_helpdesk::{
    ErrorKind, SenderType, TicketFilter, TicketPriority, TicketStatus, UpdateTicketInput,
};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

#[tokio::test]
async fn ticket_lifecycle_end_to_end() {
    let service = service();

    let ticket = assert_ok!(service.create_ticket(ticket_input("Cannot open lesson 3")).await);
    assert_eq!(ticket.ticket.status, TicketStatus::New);
    assert_eq!(ticket.ticket.priority, TicketPriority::Medium);
    assert_eq!(ticket.message_count, 0);
    let id = ticket.ticket.id;

    let assigned = assert_ok!(service.assign_ticket(id, STAFF).await);
    assert_eq!(assigned.ticket.status, TicketStatus::Assigned);
    assert_eq!(assigned.ticket.assigned_to_id, Some(STAFF));

    assert_ok!(
        service
            .post_message(message(id, STAFF, SenderType::Support, "Looking into it"))
            .await
    );
    let in_progress = assert_ok!(service.get_ticket(id).await);
    assert_eq!(in_progress.ticket.status, TicketStatus::InProgress);
    assert_eq!(in_progress.message_count, 1);

    // Only the first qualifying reply moves the status.
    assert_ok!(
        service
            .post_message(message(id, STAFF, SenderType::Support, "Still checking"))
            .await
    );
    assert_eq!(
        assert_ok!(service.get_ticket(id).await).ticket.status,
        TicketStatus::InProgress
    );

    let closed = assert_ok!(service.change_status(id, "CLOSED").await);
    assert_eq!(closed.ticket.status, TicketStatus::Closed);
    let closed_at = closed.ticket.closed_at.expect("closed_at stamped");

    let rated = assert_ok!(service.rate_ticket(id, 5, Some("great".to_string())).await);
    assert_eq!(rated.ticket.satisfaction_rating, Some(5));
    assert_eq!(rated.ticket.feedback.as_deref(), Some("great"));

    let rerated = assert_ok!(service.rate_ticket(id, 4, None).await);
    assert_eq!(rerated.ticket.satisfaction_rating, Some(4));

    // Reopen then close again: the first closing time survives.
    assert_ok!(service.change_status(id, "IN_PROGRESS").await);
    let reclosed = assert_ok!(service.change_status(id, "CLOSED").await);
    assert_eq!(reclosed.ticket.closed_at, Some(closed_at));
}

#[tokio::test]
async fn rating_requires_closed_ticket() {
    let service = service();
    let id = assert_ok!(service.create_ticket(ticket_input("Quiz will not submit")).await)
        .ticket
        .id;

    for status in ["NEW", "ASSIGNED", "IN_PROGRESS", "RESOLVED"] {
        assert_ok!(service.change_status(id, status).await);
        let err = assert_err!(service.rate_ticket(id, 3, None).await);
        assert_eq!(err.kind(), ErrorKind::InvalidState, "status {status}");
    }

    assert_ok!(service.change_status(id, "CLOSED").await);
    let err = assert_err!(service.rate_ticket(id, 6, None).await);
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let err = assert_err!(service.rate_ticket(id, 0, None).await);
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let ticket = assert_ok!(service.get_ticket(id).await);
    assert_eq!(ticket.ticket.satisfaction_rating, None);
}

#[tokio::test]
async fn unknown_status_and_priority_names_are_rejected() {
    let service = service();
    let id = assert_ok!(service.create_ticket(ticket_input("Audio out of sync")).await)
        .ticket
        .id;

    let err = assert_err!(service.change_status(id, "DONE").await);
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let err = assert_err!(service.change_priority(id, "URGENT").await);
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let raised = assert_ok!(service.change_priority(id, "CRITICAL").await);
    assert_eq!(raised.ticket.priority, TicketPriority::Critical);
}

#[tokio::test]
async fn assignment_outside_new_keeps_status() {
    let service = service();
    let id = assert_ok!(service.create_ticket(ticket_input("Slides missing")).await)
        .ticket
        .id;
    assert_ok!(service.change_status(id, "RESOLVED").await);

    let ticket = assert_ok!(service.assign_ticket(id, STAFF).await);
    assert_eq!(ticket.ticket.status, TicketStatus::Resolved);
    assert_eq!(ticket.ticket.assigned_to_id, Some(STAFF));
}

#[tokio::test]
async fn user_messages_and_internal_notes_do_not_start_work() {
    let service = service();
    let id = assert_ok!(service.create_ticket(ticket_input("Payment declined")).await)
        .ticket
        .id;
    assert_ok!(service.assign_ticket(id, STAFF).await);

    assert_ok!(
        service
            .post_message(message(id, REQUESTER, SenderType::User, "Any news?"))
            .await
    );
    assert_ok!(
        service
            .post_internal_note(message(id, STAFF, SenderType::Support, "Check the gateway logs"))
            .await
    );

    let ticket = assert_ok!(service.get_ticket(id).await);
    assert_eq!(ticket.ticket.status, TicketStatus::Assigned);
    assert_eq!(ticket.message_count, 2);

    let notes = assert_ok!(service.list_internal_notes(id).await);
    assert_eq!(notes.len(), 1);
    assert!(notes[0].is_internal_note);
}

#[tokio::test]
async fn internal_notes_need_staff_sender() {
    let service = service();
    let id = assert_ok!(service.create_ticket(ticket_input("Wrong grade shown")).await)
        .ticket
        .id;

    let err = assert_err!(
        service
            .post_internal_note(message(id, REQUESTER, SenderType::User, "Private remark"))
            .await
    );
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(assert_ok!(service.list_messages(id).await).is_empty());

    assert_ok!(
        service
            .post_internal_note(message(id, 0, SenderType::System, "Auto-triaged"))
            .await
    );
}

#[tokio::test]
async fn posting_to_missing_ticket_fails() {
    let service = service();
    let err = assert_err!(
        service
            .post_message(message(Uuid::new_v4(), REQUESTER, SenderType::User, "Hello"))
            .await
    );
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = assert_err!(service.list_messages(Uuid::new_v4()).await);
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn initial_message_opens_the_thread() {
    let service = service();
    let mut input = ticket_input("Certificate not issued");
    input.initial_message = Some("I finished the course yesterday".to_string());

    let ticket = assert_ok!(service.create_ticket(input).await);
    assert_eq!(ticket.message_count, 1);
    assert_eq!(ticket.response_time_minutes, None);

    let thread = assert_ok!(service.list_messages(ticket.ticket.id).await);
    assert_eq!(thread[0].sender_type, SenderType::User);
    assert_eq!(thread[0].sender_id, REQUESTER);
    assert!(!thread[0].is_internal_note);
    assert!(!thread[0].is_read);

    assert_ok!(
        service
            .post_message(message(ticket.ticket.id, STAFF, SenderType::Support, "Issued now"))
            .await
    );
    let answered = assert_ok!(service.get_ticket(ticket.ticket.id).await);
    assert_eq!(answered.response_time_minutes, Some(0));
}

#[tokio::test]
async fn unread_counts_exclude_own_messages() {
    let service = service();
    let id = assert_ok!(service.create_ticket(ticket_input("Cannot download notes")).await)
        .ticket
        .id;

    assert_ok!(service.post_message(message(id, REQUESTER, SenderType::User, "Hi")).await);
    assert_ok!(service.post_message(message(id, STAFF, SenderType::Support, "Hello")).await);
    assert_ok!(service.post_message(message(id, STAFF, SenderType::Support, "Try again")).await);

    assert_eq!(assert_ok!(service.count_unread(id, REQUESTER).await), 2);
    assert_eq!(assert_ok!(service.count_unread(id, STAFF).await), 1);

    assert_eq!(assert_ok!(service.mark_all_read(id, REQUESTER).await), 2);
    assert_eq!(assert_ok!(service.count_unread(id, REQUESTER).await), 0);
    // The requester's own message is still unread for staff.
    assert_eq!(assert_ok!(service.count_unread(id, STAFF).await), 1);

    let own = assert_ok!(service.list_messages(id).await)
        .into_iter()
        .find(|m| m.sender_id == REQUESTER)
        .unwrap();
    assert!(assert_ok!(service.mark_read(own.id).await).is_read);
    assert_eq!(assert_ok!(service.count_unread(id, STAFF).await), 0);
}

#[tokio::test]
async fn deleting_ticket_removes_thread() {
    let service = service();
    let id = assert_ok!(service.create_ticket(ticket_input("Duplicate charge")).await)
        .ticket
        .id;
    let posted = assert_ok!(service.post_message(message(id, REQUESTER, SenderType::User, "Charged twice")).await);

    assert_ok!(service.delete_ticket(id).await);

    assert_eq!(assert_err!(service.get_ticket(id).await).kind(), ErrorKind::NotFound);
    assert_eq!(assert_err!(service.get_message(posted.id).await).kind(), ErrorKind::NotFound);
    assert_eq!(assert_err!(service.delete_ticket(id).await).kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn update_touches_editable_fields_only() {
    let service = service();
    let category = assert_ok!(service.create_category(common::category_input("Technical Issues")).await);
    let id = assert_ok!(service.create_ticket(ticket_input("Video is blank")).await)
        .ticket
        .id;

    let updated = assert_ok!(
        service
            .update_ticket(
                id,
                UpdateTicketInput {
                    title: Some("Video player is blank".to_string()),
                    priority: Some(TicketPriority::High),
                    category_id: Some(category.category.id),
                    ..Default::default()
                },
            )
            .await
    );
    assert_eq!(updated.ticket.title, "Video player is blank");
    assert_eq!(updated.ticket.priority, TicketPriority::High);
    assert_eq!(updated.ticket.status, TicketStatus::New);
    assert_eq!(updated.ticket.user_id, REQUESTER);
    assert_eq!(updated.category_name.as_deref(), Some("Technical Issues"));

    let err = assert_err!(
        service
            .update_ticket(
                id,
                UpdateTicketInput {
                    category_id: Some(Uuid::new_v4()),
                    ..Default::default()
                },
            )
            .await
    );
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = assert_err!(
        service
            .update_ticket(
                id,
                UpdateTicketInput {
                    title: Some("abc".to_string()),
                    ..Default::default()
                },
            )
            .await
    );
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn create_rejects_unknown_category_and_bad_title() {
    let service = service();

    let mut input = ticket_input("Login loop");
    input.category_id = Some(Uuid::new_v4());
    assert_eq!(assert_err!(service.create_ticket(input).await).kind(), ErrorKind::NotFound);

    let err = assert_err!(service.create_ticket(ticket_input("   ")).await);
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert!(assert_ok!(service.list_tickets(TicketFilter::default()).await).is_empty());
}

#[tokio::test]
async fn filters_and_search() {
    let service = service();
    let billing = assert_ok!(service.create_category(common::category_input("Billing")).await);

    let mut refund = ticket_input("Refund for Rust course");
    refund.category_id = Some(billing.category.id);
    refund.course_id = Some(12);
    let refund = assert_ok!(service.create_ticket(refund).await).ticket.id;

    let mut other = ticket_input("Forum login problem");
    other.user_id = 555;
    assert_ok!(service.create_ticket(other).await);

    let by_category = assert_ok!(
        service
            .list_tickets(TicketFilter {
                category_id: Some(billing.category.id),
                ..Default::default()
            })
            .await
    );
    assert_eq!(by_category.len(), 1);
    assert_eq!(by_category[0].ticket.id, refund);
    assert_eq!(by_category[0].category_name.as_deref(), Some("Billing"));

    let by_user = assert_ok!(
        service
            .list_tickets(TicketFilter {
                user_id: Some(555),
                ..Default::default()
            })
            .await
    );
    assert_eq!(by_user.len(), 1);

    let err = assert_err!(
        service
            .list_tickets(TicketFilter {
                category_id: Some(Uuid::new_v4()),
                ..Default::default()
            })
            .await
    );
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let found = assert_ok!(service.search_tickets("RUST", service.page_request(None, None)).await);
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].ticket.id, refund);

    let everything = assert_ok!(service.list_tickets_page(service.page_request(Some(0), Some(1))).await);
    assert_eq!(everything.total, 2);
    assert_eq!(everything.items.len(), 1);
    assert_eq!(everything.size, 1);
}

#[tokio::test]
async fn huge_page_number_yields_empty_page() {
    let service = service();
    assert_ok!(service.create_ticket(ticket_input("Cannot access course")).await);

    let page = assert_ok!(
        service
            .list_tickets_page(service.page_request(Some(i64::MAX), Some(10)))
            .await
    );
    assert_eq!(page.total, 1);
    assert!(page.items.is_empty());

    let found = assert_ok!(
        service
            .search_tickets("course", service.page_request(Some(i64::MAX), None))
            .await
    );
    assert_eq!(found.total, 1);
    assert!(found.items.is_empty());
}

#[tokio::test]
async fn search_ignores_padding_around_keyword() {
    let service = service();
    let id = assert_ok!(service.create_ticket(ticket_input("Cannot access course")).await)
        .ticket
        .id;

    let found = assert_ok!(service.search_tickets(" course ", service.page_request(None, None)).await);
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].ticket.id, id);
}

#[tokio::test]
async fn internal_note_on_missing_ticket_reports_not_found() {
    let service = service();
    let err = assert_err!(
        service
            .post_internal_note(message(Uuid::new_v4(), REQUESTER, SenderType::User, "Private remark"))
            .await
    );
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
