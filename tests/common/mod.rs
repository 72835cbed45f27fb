#![allow(dead_code)]

use pleme_helpdesk::{
    CategoryInput, CreateTicketInput, FaqInput, InMemoryStore, PostMessageInput, SenderType,
    SupportConfig, SupportService,
};
use std::sync::Arc;
use uuid::Uuid;

pub const REQUESTER: i64 = 100;
pub const STAFF: i64 = 7;

pub fn service() -> SupportService {
    SupportService::new(Arc::new(InMemoryStore::new()), &SupportConfig::default())
}

pub fn ticket_input(title: &str) -> CreateTicketInput {
    CreateTicketInput {
        title: title.to_string(),
        description: Some("Something is not working as expected".to_string()),
        user_id: REQUESTER,
        user_name: Some("Ana".to_string()),
        ..Default::default()
    }
}

pub fn message(ticket_id: Uuid, sender_id: i64, sender_type: SenderType, content: &str) -> PostMessageInput {
    PostMessageInput {
        ticket_id,
        content: content.to_string(),
        sender_id,
        sender_type,
        ..Default::default()
    }
}

pub fn category_input(name: &str) -> CategoryInput {
    CategoryInput {
        name: name.to_string(),
        description: Some(format!("{name} requests")),
        expected_resolution_time_hours: Some(24),
        ..Default::default()
    }
}

pub fn faq_input(question: &str, published: bool) -> FaqInput {
    FaqInput {
        question: question.to_string(),
        answer: "See the help center for details.".to_string(),
        published: Some(published),
        ..Default::default()
    }
}
