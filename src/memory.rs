//! In-process store.
//!
//! All state sits behind one `RwLock`; every mutation holds the write guard
//! for its whole duration, which gives the same all-or-nothing behaviour as a
//! database transaction. Useful for tests and single-node deployments.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::catalog::{self, FaqCounter, FaqRanking};
use crate::lifecycle::{self, TicketCommand};
use crate::models::{
    Category, CategoryInput, CreateTicketInput, Faq, FaqInput, Page, PageRequest, PostMessageInput,
    Ticket, TicketFilter, TicketMessage, UpdateTicketInput,
};
use crate::stats::{FaqVotes, TicketFacts};
use crate::store::SupportStore;
use crate::thread;
use crate::{Result, SupportError};

// Vectors keep insertion order, which breaks timestamp ties.
#[derive(Default)]
struct State {
    categories: Vec<Category>,
    faqs: Vec<Faq>,
    tickets: Vec<Ticket>,
    messages: Vec<TicketMessage>,
}

impl State {
    fn category(&self, id: Uuid) -> Result<&Category> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| SupportError::not_found("Category", id))
    }

    fn category_mut(&mut self, id: Uuid) -> Result<&mut Category> {
        self.categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| SupportError::not_found("Category", id))
    }

    fn category_holding(&self, name: &str) -> Option<Uuid> {
        let name = name.trim();
        self.categories.iter().find(|c| c.name == name).map(|c| c.id)
    }

    fn faq_mut(&mut self, id: Uuid) -> Result<&mut Faq> {
        self.faqs
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| SupportError::not_found("FAQ", id))
    }

    fn ticket(&self, id: Uuid) -> Result<&Ticket> {
        self.tickets
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| SupportError::not_found("Ticket", id))
    }

    fn ticket_mut(&mut self, id: Uuid) -> Result<&mut Ticket> {
        self.tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| SupportError::not_found("Ticket", id))
    }

    fn thread(&self, ticket_id: Uuid) -> Vec<TicketMessage> {
        let mut messages: Vec<TicketMessage> = self
            .messages
            .iter()
            .filter(|m| m.ticket_id == ticket_id)
            .cloned()
            .collect();
        thread::sort_thread(&mut messages);
        messages
    }

    fn tickets_newest_first(&self) -> impl Iterator<Item = &Ticket> {
        let mut tickets: Vec<&Ticket> = self.tickets.iter().rev().collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tickets.into_iter()
    }
}

fn page_of<T: Clone + async_graphql::OutputType>(items: Vec<T>, page: PageRequest) -> Page<T> {
    Page {
        total: items.len() as i64,
        items: page.window(&items),
        page: page.page,
        size: page.size,
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SupportStore for InMemoryStore {
    async fn list_categories(&self, active_only: bool) -> Result<Vec<Category>> {
        let state = self.state.read().await;
        let mut categories: Vec<Category> = state
            .categories
            .iter()
            .filter(|c| !active_only || c.active)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, id: Uuid) -> Result<Category> {
        self.state.read().await.category(id).cloned()
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let state = self.state.read().await;
        Ok(state.categories.iter().find(|c| c.name == name).cloned())
    }

    async fn insert_category(&self, input: &CategoryInput) -> Result<Category> {
        let mut state = self.state.write().await;
        catalog::ensure_name_available(&input.name, state.category_holding(&input.name), None)?;
        let category = catalog::new_category(input, Utc::now());
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: Uuid, input: &CategoryInput) -> Result<Category> {
        let mut state = self.state.write().await;
        state.category(id)?;
        catalog::ensure_name_available(&input.name, state.category_holding(&input.name), Some(id))?;
        let category = state.category_mut(id)?;
        catalog::apply_category(category, input, Utc::now());
        Ok(category.clone())
    }

    async fn set_category_active(&self, id: Uuid, active: bool) -> Result<Category> {
        let mut state = self.state.write().await;
        let category = state.category_mut(id)?;
        category.active = active;
        category.updated_at = Utc::now();
        Ok(category.clone())
    }

    async fn delete_category(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        let in_use = state.tickets.iter().filter(|t| t.category_id == Some(id)).count() as i64;
        catalog::ensure_category_deletable(state.category(id)?, in_use)?;
        state.categories.retain(|c| c.id != id);
        for faq in state.faqs.iter_mut().filter(|f| f.category_id == Some(id)) {
            faq.category_id = None;
        }
        Ok(())
    }

    async fn count_category_tickets(&self, id: Uuid) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state.tickets.iter().filter(|t| t.category_id == Some(id)).count() as i64)
    }

    async fn list_faqs(&self, published_only: bool, category_id: Option<Uuid>) -> Result<Vec<Faq>> {
        let state = self.state.read().await;
        let mut faqs: Vec<Faq> = state
            .faqs
            .iter()
            .filter(|f| !published_only || f.published)
            .filter(|f| category_id.map_or(true, |id| f.category_id == Some(id)))
            .cloned()
            .collect();
        faqs.sort_by_key(|f| (f.display_order.is_none(), f.display_order, f.created_at));
        Ok(faqs)
    }

    async fn get_faq(&self, id: Uuid) -> Result<Faq> {
        let state = self.state.read().await;
        state
            .faqs
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .ok_or_else(|| SupportError::not_found("FAQ", id))
    }

    async fn insert_faq(&self, input: &FaqInput) -> Result<Faq> {
        let mut state = self.state.write().await;
        if let Some(category_id) = input.category_id {
            state.category(category_id)?;
        }
        let faq = catalog::new_faq(input, Utc::now());
        state.faqs.push(faq.clone());
        Ok(faq)
    }

    async fn update_faq(&self, id: Uuid, input: &FaqInput) -> Result<Faq> {
        let mut state = self.state.write().await;
        if let Some(category_id) = input.category_id {
            state.category(category_id)?;
        }
        let faq = state.faq_mut(id)?;
        catalog::apply_faq(faq, input, Utc::now());
        Ok(faq.clone())
    }

    async fn delete_faq(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        state.faq_mut(id)?;
        state.faqs.retain(|f| f.id != id);
        Ok(())
    }

    async fn set_faq_published(&self, id: Uuid, published: bool) -> Result<Faq> {
        let mut state = self.state.write().await;
        let faq = state.faq_mut(id)?;
        faq.published = published;
        faq.updated_at = Utc::now();
        Ok(faq.clone())
    }

    async fn increment_faq_counter(&self, id: Uuid, counter: FaqCounter) -> Result<Faq> {
        let mut state = self.state.write().await;
        let faq = state.faq_mut(id)?;
        counter.bump(faq);
        Ok(faq.clone())
    }

    async fn search_faqs(&self, keyword: &str, page: PageRequest) -> Result<Page<Faq>> {
        let state = self.state.read().await;
        let mut hits: Vec<Faq> = state
            .faqs
            .iter()
            .filter(|f| f.published && catalog::faq_matches(f, keyword))
            .cloned()
            .collect();
        hits.sort_by_key(|f| (f.display_order.is_none(), f.display_order, f.created_at));
        Ok(page_of(hits, page))
    }

    async fn top_faqs(&self, ranking: FaqRanking, limit: i64) -> Result<Vec<Faq>> {
        let state = self.state.read().await;
        let mut faqs: Vec<Faq> = state
            .faqs
            .iter()
            .filter(|f| ranking.score(f) > 0)
            .cloned()
            .collect();
        faqs.sort_by(|a, b| ranking.score(b).cmp(&ranking.score(a)));
        faqs.truncate(limit.max(0) as usize);
        Ok(faqs)
    }

    async fn insert_ticket(&self, input: &CreateTicketInput) -> Result<Ticket> {
        let mut state = self.state.write().await;
        if let Some(category_id) = input.category_id {
            state.category(category_id)?;
        }
        let ticket = lifecycle::new_ticket(input, Utc::now());
        if let Some(body) = &input.initial_message {
            state.messages.push(thread::opening_message(&ticket, body));
        }
        state.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Ticket> {
        self.state.read().await.ticket(id).cloned()
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        let state = self.state.read().await;
        Ok(state
            .tickets_newest_first()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn page_tickets(&self, page: PageRequest) -> Result<Page<Ticket>> {
        let state = self.state.read().await;
        let tickets: Vec<Ticket> = state.tickets_newest_first().cloned().collect();
        Ok(page_of(tickets, page))
    }

    async fn search_tickets(&self, keyword: &str, page: PageRequest) -> Result<Page<Ticket>> {
        let needle = keyword.trim().to_lowercase();
        let state = self.state.read().await;
        let hits: Vec<Ticket> = state
            .tickets_newest_first()
            .filter(|t| {
                t.title.to_lowercase().contains(&needle)
                    || t.description.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        Ok(page_of(hits, page))
    }

    async fn update_ticket(&self, id: Uuid, input: &UpdateTicketInput) -> Result<Ticket> {
        let mut state = self.state.write().await;
        if let Some(category_id) = input.category_id {
            state.category(category_id)?;
        }
        let ticket = state.ticket_mut(id)?;
        lifecycle::apply_update(ticket, input, Utc::now());
        Ok(ticket.clone())
    }

    async fn apply_ticket_command(&self, id: Uuid, command: TicketCommand) -> Result<Ticket> {
        let mut state = self.state.write().await;
        let ticket = state.ticket_mut(id)?;
        // Work on a copy so a rejected command leaves no trace.
        let mut updated = ticket.clone();
        lifecycle::apply(&mut updated, command, Utc::now())?;
        *ticket = updated.clone();
        Ok(updated)
    }

    async fn delete_ticket(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        state.ticket(id)?;
        state.messages.retain(|m| m.ticket_id != id);
        state.tickets.retain(|t| t.id != id);
        Ok(())
    }

    async fn insert_message(&self, input: &PostMessageInput, internal: bool) -> Result<TicketMessage> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let message = thread::new_message(input, internal, now);
        let ticket = state.ticket_mut(input.ticket_id)?;
        lifecycle::on_message_posted(ticket, &message, now);
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn get_message(&self, id: Uuid) -> Result<TicketMessage> {
        let state = self.state.read().await;
        state
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| SupportError::not_found("Message", id))
    }

    async fn thread(&self, ticket_id: Uuid) -> Result<Vec<TicketMessage>> {
        let state = self.state.read().await;
        state.ticket(ticket_id)?;
        Ok(state.thread(ticket_id))
    }

    async fn threads(&self, ticket_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<TicketMessage>>> {
        let state = self.state.read().await;
        Ok(ticket_ids
            .iter()
            .map(|id| (*id, state.thread(*id)))
            .filter(|(_, messages)| !messages.is_empty())
            .collect())
    }

    async fn mark_message_read(&self, id: Uuid) -> Result<TicketMessage> {
        let mut state = self.state.write().await;
        let message = state
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| SupportError::not_found("Message", id))?;
        message.is_read = true;
        Ok(message.clone())
    }

    async fn mark_thread_read(&self, ticket_id: Uuid, reader_id: i64) -> Result<u64> {
        let mut state = self.state.write().await;
        state.ticket(ticket_id)?;
        let mut marked = 0;
        for message in state.messages.iter_mut().filter(|m| m.ticket_id == ticket_id) {
            if thread::is_unread_for(message, reader_id) {
                message.is_read = true;
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn count_unread(&self, ticket_id: Uuid, reader_id: i64) -> Result<i64> {
        let state = self.state.read().await;
        state.ticket(ticket_id)?;
        Ok(thread::count_unread(&state.thread(ticket_id), reader_id))
    }

    async fn ticket_facts(&self) -> Result<Vec<TicketFacts>> {
        let state = self.state.read().await;
        Ok(state
            .tickets
            .iter()
            .map(|t| TicketFacts {
                status: t.status,
                priority: t.priority,
                category_name: t
                    .category_id
                    .and_then(|id| state.category(id).ok())
                    .map(|c| c.name.clone()),
                created_at: t.created_at,
                closed_at: t.closed_at,
                satisfaction_rating: t.satisfaction_rating,
                message_count: state.messages.iter().filter(|m| m.ticket_id == t.id).count() as i64,
            })
            .collect())
    }

    async fn faq_votes(&self) -> Result<Vec<FaqVotes>> {
        let state = self.state.read().await;
        Ok(state
            .faqs
            .iter()
            .map(|f| FaqVotes {
                view_count: f.view_count,
                helpful_votes: f.helpful_votes,
                unhelpful_votes: f.unhelpful_votes,
            })
            .collect())
    }
}
