mod common;

use common::{category_input, faq_input, message, service, ticket_input, REQUESTER, STAFF};
use pleme_helpdesk::{SenderType, TicketPriority, TicketStatus};
use tokio_test::assert_ok;

#[tokio::test]
async fn empty_system_has_no_averages() {
    let service = service();
    let stats = assert_ok!(service.dashboard().await);

    assert_eq!(stats.total_tickets, 0);
    assert!(stats.ticket_by_status.is_empty());
    assert_eq!(stats.avg_resolution_time_days, None);
    assert_eq!(stats.avg_satisfaction_rating, None);
    assert_eq!(stats.avg_messages_per_ticket, None);
    assert_eq!(stats.faq_helpfulness_ratio, None);
    assert_eq!(stats.total_faq_views, 0);
}

#[tokio::test]
async fn dashboard_reflects_activity() {
    let service = service();
    let billing = assert_ok!(service.create_category(category_input("Billing")).await);

    let mut first = ticket_input("Invoice missing VAT");
    first.category_id = Some(billing.category.id);
    first.priority = Some(TicketPriority::High);
    let first = assert_ok!(service.create_ticket(first).await).ticket.id;
    let second = assert_ok!(service.create_ticket(ticket_input("Cannot upload assignment")).await)
        .ticket
        .id;

    assert_ok!(service.post_message(message(first, REQUESTER, SenderType::User, "Please fix")).await);
    assert_ok!(service.post_message(message(first, STAFF, SenderType::Support, "Done")).await);
    assert_ok!(service.change_status(first, "CLOSED").await);
    assert_ok!(service.rate_ticket(first, 4, None).await);

    let faq = assert_ok!(service.create_faq(faq_input("Where is my invoice?", true)).await).faq.id;
    assert_ok!(service.record_view(faq).await);
    assert_ok!(service.vote_helpful(faq).await);
    assert_ok!(service.vote_unhelpful(faq).await);

    let stats = assert_ok!(service.dashboard().await);
    assert_eq!(stats.total_tickets, 2);
    assert_eq!(stats.ticket_by_category.len(), 1);
    assert_eq!(stats.ticket_by_category[0].category, "Billing");
    assert_eq!(stats.avg_satisfaction_rating, Some(4.0));
    assert_eq!(stats.avg_messages_per_ticket, Some(1.0));
    assert_eq!(stats.faq_helpfulness_ratio, Some(0.5));
    assert_eq!(stats.total_faq_views, 1);
    assert!(stats.avg_resolution_time_days.is_some_and(|d| d >= 0.0));

    let by_status = assert_ok!(service.status_distribution().await);
    let closed = by_status.iter().find(|c| c.status == TicketStatus::Closed).unwrap();
    assert_eq!(closed.count, 1);
    let open = by_status.iter().find(|c| c.status == TicketStatus::New).unwrap();
    assert_eq!(open.count, 1);

    let by_priority = assert_ok!(service.priority_distribution().await);
    assert_eq!(by_priority.iter().map(|c| c.count).sum::<i64>(), 2);

    // Resolution time ignores the ticket that is still open.
    assert_ok!(service.assign_ticket(second, STAFF).await);
    assert_eq!(
        assert_ok!(service.average_resolution_days().await),
        stats.avg_resolution_time_days
    );
}
