//! Operation surface of the helpdesk.
//!
//! `SupportService` validates input, delegates each atomic unit of work to a
//! [`SupportStore`], and builds the read-side views (category names, message
//! counts, response times, helpful ratios) from whatever the store returns.

use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::{self, FaqCounter, FaqRanking, DEFAULT_TOP_LIMIT};
use crate::config::SupportConfig;
use crate::lifecycle::{self, TicketCommand};
use crate::models::{
    Category, CategoryInput, CategoryView, CreateTicketInput, Faq, FaqInput, FaqView, Page,
    PageRequest, PostMessageInput, SupportStatistics, Ticket, TicketCategoryCount, TicketFilter,
    TicketMessage, TicketPriority, TicketPriorityCount, TicketStatus, TicketStatusCount, TicketView,
    UpdateTicketInput,
};
use crate::stats;
use crate::store::SupportStore;
use crate::thread;
use crate::validation;
use crate::{Result, SupportError};

pub struct SupportService {
    store: Arc<dyn SupportStore>,
    config: SupportConfig,
}

impl SupportService {
    pub fn new(store: Arc<dyn SupportStore>, config: &SupportConfig) -> Self {
        Self {
            store,
            config: config.clone(),
        }
    }

    pub fn store(&self) -> &Arc<dyn SupportStore> {
        &self.store
    }

    pub fn config(&self) -> &SupportConfig {
        &self.config
    }

    /// Zero-based page; size falls back to the configured default and is
    /// capped at the configured maximum.
    pub fn page_request(&self, page: Option<i64>, size: Option<i64>) -> PageRequest {
        PageRequest::new(page.unwrap_or(0), self.config.page_size(size))
    }

    async fn category_names(&self) -> Result<HashMap<Uuid, String>> {
        Ok(self
            .store
            .list_categories(false)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect())
    }

    async fn category_name(&self, id: Option<Uuid>) -> Result<Option<String>> {
        let Some(id) = id else {
            return Ok(None);
        };
        match self.store.get_category(id).await {
            Ok(category) => Ok(Some(category.name)),
            Err(SupportError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn ticket_view(&self, ticket: Ticket) -> Result<TicketView> {
        let thread = self.store.thread(ticket.id).await?;
        let name = self.category_name(ticket.category_id).await?;
        Ok(lifecycle::ticket_view(ticket, name, &thread))
    }

    async fn ticket_views(&self, tickets: Vec<Ticket>) -> Result<Vec<TicketView>> {
        let ids: Vec<Uuid> = tickets.iter().map(|t| t.id).collect();
        let mut threads = self.store.threads(&ids).await?;
        let names = self.category_names().await?;
        Ok(tickets
            .into_iter()
            .map(|ticket| {
                let thread = threads.remove(&ticket.id).unwrap_or_default();
                let name = ticket.category_id.and_then(|id| names.get(&id).cloned());
                lifecycle::ticket_view(ticket, name, &thread)
            })
            .collect())
    }

    async fn ticket_page(&self, page: Page<Ticket>) -> Result<Page<TicketView>> {
        let Page { items, total, page, size } = page;
        Ok(Page {
            items: self.ticket_views(items).await?,
            total,
            page,
            size,
        })
    }

    async fn faq_view(&self, faq: Faq) -> Result<FaqView> {
        let name = self.category_name(faq.category_id).await?;
        Ok(catalog::faq_view(faq, name))
    }

    async fn faq_views(&self, faqs: Vec<Faq>) -> Result<Vec<FaqView>> {
        let names = self.category_names().await?;
        Ok(faqs
            .into_iter()
            .map(|faq| {
                let name = faq.category_id.and_then(|id| names.get(&id).cloned());
                catalog::faq_view(faq, name)
            })
            .collect())
    }

    async fn category_view(&self, category: Category) -> Result<CategoryView> {
        let ticket_count = self.store.count_category_tickets(category.id).await?;
        Ok(CategoryView { category, ticket_count })
    }

    async fn category_views(&self, categories: Vec<Category>) -> Result<Vec<CategoryView>> {
        let mut views = Vec::with_capacity(categories.len());
        for category in categories {
            views.push(self.category_view(category).await?);
        }
        Ok(views)
    }

    async fn command(&self, id: Uuid, command: TicketCommand) -> Result<TicketView> {
        let ticket = self.store.apply_ticket_command(id, command).await?;
        self.ticket_view(ticket).await
    }

    // ----- Tickets -----

    #[tracing::instrument(skip(self, input), fields(user_id = input.user_id))]
    pub async fn create_ticket(&self, input: CreateTicketInput) -> Result<TicketView> {
        validation::create_ticket(&input)?;
        let ticket = self.store.insert_ticket(&input).await?;
        tracing::info!(
            target: "audit",
            ticket_id = %ticket.id,
            user_id = ticket.user_id,
            priority = %ticket.priority,
            "Support ticket created"
        );
        self.ticket_view(ticket).await
    }

    pub async fn get_ticket(&self, id: Uuid) -> Result<TicketView> {
        let ticket = self.store.get_ticket(id).await?;
        self.ticket_view(ticket).await
    }

    /// Newest first. A category filter must name an existing category.
    pub async fn list_tickets(&self, filter: TicketFilter) -> Result<Vec<TicketView>> {
        if let Some(category_id) = filter.category_id {
            self.store.get_category(category_id).await?;
        }
        let tickets = self.store.list_tickets(&filter).await?;
        self.ticket_views(tickets).await
    }

    pub async fn list_tickets_page(&self, page: PageRequest) -> Result<Page<TicketView>> {
        let tickets = self.store.page_tickets(page).await?;
        self.ticket_page(tickets).await
    }

    pub async fn search_tickets(&self, keyword: &str, page: PageRequest) -> Result<Page<TicketView>> {
        let tickets = self.store.search_tickets(keyword.trim(), page).await?;
        self.ticket_page(tickets).await
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update_ticket(&self, id: Uuid, input: UpdateTicketInput) -> Result<TicketView> {
        validation::update_ticket(&input)?;
        let ticket = self.store.update_ticket(id, &input).await?;
        tracing::info!(target: "audit", ticket_id = %id, "Support ticket updated");
        self.ticket_view(ticket).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn assign_ticket(&self, id: Uuid, staff_id: i64) -> Result<TicketView> {
        let view = self.command(id, TicketCommand::Assign { staff_id }).await?;
        tracing::info!(
            target: "audit",
            ticket_id = %id,
            staff_id,
            status = %view.ticket.status,
            "Support ticket assigned"
        );
        Ok(view)
    }

    /// Accepts the wire name of a status, e.g. `IN_PROGRESS`.
    pub async fn change_status(&self, id: Uuid, status: &str) -> Result<TicketView> {
        self.set_status(id, status.parse()?).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_status(&self, id: Uuid, status: TicketStatus) -> Result<TicketView> {
        let view = self.command(id, TicketCommand::ChangeStatus(status)).await?;
        tracing::info!(target: "audit", ticket_id = %id, status = %status, "Support ticket status changed");
        Ok(view)
    }

    pub async fn change_priority(&self, id: Uuid, priority: &str) -> Result<TicketView> {
        self.set_priority(id, priority.parse()?).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_priority(&self, id: Uuid, priority: TicketPriority) -> Result<TicketView> {
        let view = self.command(id, TicketCommand::ChangePriority(priority)).await?;
        tracing::info!(target: "audit", ticket_id = %id, priority = %priority, "Support ticket priority changed");
        Ok(view)
    }

    #[tracing::instrument(skip(self, feedback))]
    pub async fn rate_ticket(&self, id: Uuid, rating: i32, feedback: Option<String>) -> Result<TicketView> {
        let view = self.command(id, TicketCommand::Rate { rating, feedback }).await?;
        tracing::info!(target: "audit", ticket_id = %id, rating, "Support ticket rated");
        Ok(view)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_ticket(&self, id: Uuid) -> Result<()> {
        self.store.delete_ticket(id).await?;
        tracing::info!(target: "audit", ticket_id = %id, "Support ticket deleted");
        Ok(())
    }

    // ----- Messages -----

    #[tracing::instrument(skip(self, input), fields(ticket_id = %input.ticket_id, sender_id = input.sender_id))]
    pub async fn post_message(&self, input: PostMessageInput) -> Result<TicketMessage> {
        validation::post_message(&input)?;
        let message = self.store.insert_message(&input, false).await?;
        tracing::info!(
            target: "audit",
            ticket_id = %message.ticket_id,
            message_id = %message.id,
            sender_type = message.sender_type.as_str(),
            "Ticket message posted"
        );
        Ok(message)
    }

    #[tracing::instrument(skip(self, input), fields(ticket_id = %input.ticket_id, sender_id = input.sender_id))]
    pub async fn post_internal_note(&self, input: PostMessageInput) -> Result<TicketMessage> {
        self.store.get_ticket(input.ticket_id).await?;
        thread::ensure_can_write_note(input.sender_type)?;
        validation::post_message(&input)?;
        let message = self.store.insert_message(&input, true).await?;
        tracing::info!(
            target: "audit",
            ticket_id = %message.ticket_id,
            message_id = %message.id,
            "Internal note posted"
        );
        Ok(message)
    }

    pub async fn get_message(&self, id: Uuid) -> Result<TicketMessage> {
        self.store.get_message(id).await
    }

    /// The whole thread in creation order, internal notes included.
    pub async fn list_messages(&self, ticket_id: Uuid) -> Result<Vec<TicketMessage>> {
        self.store.thread(ticket_id).await
    }

    pub async fn list_internal_notes(&self, ticket_id: Uuid) -> Result<Vec<TicketMessage>> {
        let mut thread = self.store.thread(ticket_id).await?;
        thread.retain(|m| m.is_internal_note);
        Ok(thread)
    }

    pub async fn mark_read(&self, message_id: Uuid) -> Result<TicketMessage> {
        self.store.mark_message_read(message_id).await
    }

    /// Marks every unread message not sent by `user_id`; returns how many.
    #[tracing::instrument(skip(self))]
    pub async fn mark_all_read(&self, ticket_id: Uuid, user_id: i64) -> Result<u64> {
        let marked = self.store.mark_thread_read(ticket_id, user_id).await?;
        tracing::debug!(marked, "Thread marked read");
        Ok(marked)
    }

    pub async fn count_unread(&self, ticket_id: Uuid, user_id: i64) -> Result<i64> {
        self.store.count_unread(ticket_id, user_id).await
    }

    // ----- Categories -----

    pub async fn list_categories(&self) -> Result<Vec<CategoryView>> {
        let categories = self.store.list_categories(false).await?;
        self.category_views(categories).await
    }

    pub async fn list_active_categories(&self) -> Result<Vec<CategoryView>> {
        let categories = self.store.list_categories(true).await?;
        self.category_views(categories).await
    }

    pub async fn get_category(&self, id: Uuid) -> Result<CategoryView> {
        let category = self.store.get_category(id).await?;
        self.category_view(category).await
    }

    pub async fn get_category_by_name(&self, name: &str) -> Result<CategoryView> {
        let category = self
            .store
            .find_category_by_name(name.trim())
            .await?
            .ok_or_else(|| SupportError::not_found("Category", name))?;
        self.category_view(category).await
    }

    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_category(&self, input: CategoryInput) -> Result<CategoryView> {
        validation::category(&input)?;
        let category = self.store.insert_category(&input).await?;
        tracing::info!(target: "audit", category_id = %category.id, name = %category.name, "Category created");
        self.category_view(category).await
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update_category(&self, id: Uuid, input: CategoryInput) -> Result<CategoryView> {
        validation::category(&input)?;
        let category = self.store.update_category(id, &input).await?;
        tracing::info!(target: "audit", category_id = %id, "Category updated");
        self.category_view(category).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> Result<()> {
        self.store.delete_category(id).await?;
        tracing::info!(target: "audit", category_id = %id, "Category deleted");
        Ok(())
    }

    pub async fn activate_category(&self, id: Uuid) -> Result<CategoryView> {
        let category = self.store.set_category_active(id, true).await?;
        tracing::info!(target: "audit", category_id = %id, "Category activated");
        self.category_view(category).await
    }

    pub async fn deactivate_category(&self, id: Uuid) -> Result<CategoryView> {
        let category = self.store.set_category_active(id, false).await?;
        tracing::info!(target: "audit", category_id = %id, "Category deactivated");
        self.category_view(category).await
    }

    // ----- FAQs -----

    pub async fn list_faqs(&self) -> Result<Vec<FaqView>> {
        let faqs = self.store.list_faqs(false, None).await?;
        self.faq_views(faqs).await
    }

    pub async fn list_published_faqs(&self) -> Result<Vec<FaqView>> {
        let faqs = self.store.list_faqs(true, None).await?;
        self.faq_views(faqs).await
    }

    pub async fn get_faq(&self, id: Uuid) -> Result<FaqView> {
        let faq = self.store.get_faq(id).await?;
        self.faq_view(faq).await
    }

    /// Published entries of an existing category.
    pub async fn list_faqs_by_category(&self, category_id: Uuid) -> Result<Vec<FaqView>> {
        let category = self.store.get_category(category_id).await?;
        let faqs = self.store.list_faqs(true, Some(category_id)).await?;
        Ok(faqs
            .into_iter()
            .map(|faq| catalog::faq_view(faq, Some(category.name.clone())))
            .collect())
    }

    pub async fn search_faqs(&self, keyword: &str, page: PageRequest) -> Result<Page<FaqView>> {
        let Page { items, total, page, size } = self.store.search_faqs(keyword.trim(), page).await?;
        Ok(Page {
            items: self.faq_views(items).await?,
            total,
            page,
            size,
        })
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn create_faq(&self, input: FaqInput) -> Result<FaqView> {
        validation::faq(&input)?;
        let faq = self.store.insert_faq(&input).await?;
        tracing::info!(target: "audit", faq_id = %faq.id, published = faq.published, "FAQ created");
        self.faq_view(faq).await
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update_faq(&self, id: Uuid, input: FaqInput) -> Result<FaqView> {
        validation::faq(&input)?;
        let faq = self.store.update_faq(id, &input).await?;
        tracing::info!(target: "audit", faq_id = %id, "FAQ updated");
        self.faq_view(faq).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_faq(&self, id: Uuid) -> Result<()> {
        self.store.delete_faq(id).await?;
        tracing::info!(target: "audit", faq_id = %id, "FAQ deleted");
        Ok(())
    }

    pub async fn publish_faq(&self, id: Uuid) -> Result<FaqView> {
        let faq = self.store.set_faq_published(id, true).await?;
        tracing::info!(target: "audit", faq_id = %id, "FAQ published");
        self.faq_view(faq).await
    }

    pub async fn unpublish_faq(&self, id: Uuid) -> Result<FaqView> {
        let faq = self.store.set_faq_published(id, false).await?;
        tracing::info!(target: "audit", faq_id = %id, "FAQ unpublished");
        self.faq_view(faq).await
    }

    pub async fn record_view(&self, id: Uuid) -> Result<FaqView> {
        let faq = self.store.increment_faq_counter(id, FaqCounter::Views).await?;
        self.faq_view(faq).await
    }

    pub async fn vote_helpful(&self, id: Uuid) -> Result<FaqView> {
        let faq = self.store.increment_faq_counter(id, FaqCounter::HelpfulVotes).await?;
        self.faq_view(faq).await
    }

    pub async fn vote_unhelpful(&self, id: Uuid) -> Result<FaqView> {
        let faq = self.store.increment_faq_counter(id, FaqCounter::UnhelpfulVotes).await?;
        self.faq_view(faq).await
    }

    pub async fn most_viewed_faqs(&self, limit: Option<i64>) -> Result<Vec<FaqView>> {
        let faqs = self
            .store
            .top_faqs(FaqRanking::MostViewed, limit.unwrap_or(DEFAULT_TOP_LIMIT))
            .await?;
        self.faq_views(faqs).await
    }

    pub async fn most_helpful_faqs(&self, limit: Option<i64>) -> Result<Vec<FaqView>> {
        let faqs = self
            .store
            .top_faqs(FaqRanking::MostHelpful, limit.unwrap_or(DEFAULT_TOP_LIMIT))
            .await?;
        self.faq_views(faqs).await
    }

    // ----- Statistics -----

    pub async fn status_distribution(&self) -> Result<Vec<TicketStatusCount>> {
        Ok(stats::status_counts(&self.store.ticket_facts().await?))
    }

    pub async fn priority_distribution(&self) -> Result<Vec<TicketPriorityCount>> {
        Ok(stats::priority_counts(&self.store.ticket_facts().await?))
    }

    pub async fn category_distribution(&self) -> Result<Vec<TicketCategoryCount>> {
        Ok(stats::category_counts(&self.store.ticket_facts().await?))
    }

    pub async fn average_resolution_days(&self) -> Result<Option<f64>> {
        Ok(stats::average_resolution_days(&self.store.ticket_facts().await?))
    }

    pub async fn average_satisfaction(&self) -> Result<Option<f64>> {
        Ok(stats::average_satisfaction(&self.store.ticket_facts().await?))
    }

    pub async fn average_messages_per_ticket(&self) -> Result<Option<f64>> {
        Ok(stats::average_messages_per_ticket(&self.store.ticket_facts().await?))
    }

    pub async fn faq_helpfulness_ratio(&self) -> Result<Option<f64>> {
        Ok(stats::faq_helpfulness_ratio(&self.store.faq_votes().await?))
    }

    /// Every statistic from one snapshot.
    #[tracing::instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<SupportStatistics> {
        let tickets = self.store.ticket_facts().await?;
        let faqs = self.store.faq_votes().await?;
        tracing::debug!(tickets = tickets.len(), faqs = faqs.len(), "Computing support statistics");
        Ok(stats::summarize(&tickets, &faqs))
    }
}
