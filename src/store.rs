//! Storage seam.
//!
//! Each mutating method is one atomic unit of work: implementations load the
//! affected rows, apply the rules from [`crate::lifecycle`], [`crate::thread`]
//! and [`crate::catalog`], and persist the result without exposing partial
//! state. Field-level validation happens before a store is called.

use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::catalog::{FaqCounter, FaqRanking};
use crate::lifecycle::TicketCommand;
use crate::models::{
    Category, CategoryInput, CreateTicketInput, Faq, FaqInput, Page, PageRequest, PostMessageInput,
    Ticket, TicketFilter, TicketMessage, UpdateTicketInput,
};
use crate::stats::{FaqVotes, TicketFacts};
use crate::Result;

#[async_trait]
pub trait SupportStore: Send + Sync {
    // Categories
    async fn list_categories(&self, active_only: bool) -> Result<Vec<Category>>;

    async fn get_category(&self, id: Uuid) -> Result<Category>;

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// Fails with `InvalidArgument` when the name is taken.
    async fn insert_category(&self, input: &CategoryInput) -> Result<Category>;

    async fn update_category(&self, id: Uuid, input: &CategoryInput) -> Result<Category>;

    async fn set_category_active(&self, id: Uuid, active: bool) -> Result<Category>;

    /// Fails with `InvalidState` while any ticket references the category.
    async fn delete_category(&self, id: Uuid) -> Result<()>;

    async fn count_category_tickets(&self, id: Uuid) -> Result<i64>;

    // FAQs
    /// Ordered by display order, unordered entries last.
    async fn list_faqs(&self, published_only: bool, category_id: Option<Uuid>) -> Result<Vec<Faq>>;

    async fn get_faq(&self, id: Uuid) -> Result<Faq>;

    async fn insert_faq(&self, input: &FaqInput) -> Result<Faq>;

    async fn update_faq(&self, id: Uuid, input: &FaqInput) -> Result<Faq>;

    async fn delete_faq(&self, id: Uuid) -> Result<()>;

    async fn set_faq_published(&self, id: Uuid, published: bool) -> Result<Faq>;

    /// Single read-modify-write at the storage layer so concurrent
    /// increments are never lost.
    async fn increment_faq_counter(&self, id: Uuid, counter: FaqCounter) -> Result<Faq>;

    /// Published FAQs only.
    async fn search_faqs(&self, keyword: &str, page: PageRequest) -> Result<Page<Faq>>;

    async fn top_faqs(&self, ranking: FaqRanking, limit: i64) -> Result<Vec<Faq>>;

    // Tickets
    /// Resolves the category, stores the ticket and its opening message.
    async fn insert_ticket(&self, input: &CreateTicketInput) -> Result<Ticket>;

    async fn get_ticket(&self, id: Uuid) -> Result<Ticket>;

    /// Newest first.
    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>>;

    async fn page_tickets(&self, page: PageRequest) -> Result<Page<Ticket>>;

    /// Case-insensitive over title and description, newest first.
    async fn search_tickets(&self, keyword: &str, page: PageRequest) -> Result<Page<Ticket>>;

    async fn update_ticket(&self, id: Uuid, input: &UpdateTicketInput) -> Result<Ticket>;

    async fn apply_ticket_command(&self, id: Uuid, command: TicketCommand) -> Result<Ticket>;

    /// Removes the thread, then the ticket.
    async fn delete_ticket(&self, id: Uuid) -> Result<()>;

    // Messages
    /// Stores the message and runs the message-triggered status rule in the
    /// same unit of work.
    async fn insert_message(&self, input: &PostMessageInput, internal: bool) -> Result<TicketMessage>;

    async fn get_message(&self, id: Uuid) -> Result<TicketMessage>;

    /// Creation order. Fails with `NotFound` for an unknown ticket.
    async fn thread(&self, ticket_id: Uuid) -> Result<Vec<TicketMessage>>;

    /// Threads of several tickets at once; tickets without messages are absent.
    async fn threads(&self, ticket_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<TicketMessage>>>;

    async fn mark_message_read(&self, id: Uuid) -> Result<TicketMessage>;

    async fn mark_thread_read(&self, ticket_id: Uuid, reader_id: i64) -> Result<u64>;

    async fn count_unread(&self, ticket_id: Uuid, reader_id: i64) -> Result<i64>;

    // Statistics snapshots
    async fn ticket_facts(&self) -> Result<Vec<TicketFacts>>;

    async fn faq_votes(&self) -> Result<Vec<FaqVotes>>;
}
