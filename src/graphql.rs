//! GraphQL API for the helpdesk
//!
//! Provides SupportQueries and SupportMutations that can be merged into any
//! service's GraphQL schema.
//!
//! ## Usage in Services
//!
//! Put an `Arc<SupportService>` into the schema data. Authorization checks
//! belong to the hosting service and should run before these resolvers.
//!
//! Failures carry `code` and `status` extensions, e.g.
//! `{"code": "INVALID_STATE", "status": 409}`.

use async_graphql::{Context, Error, ErrorExtensions, Object, Result as GraphQLResult};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    CategoryInput, CategoryView, CreateTicketInput, FaqInput, FaqView, Page, PostMessageInput,
    SupportStatistics, TicketCategoryCount, TicketFilter, TicketMessage, TicketPriorityCount,
    TicketStatusCount, TicketView, UpdateTicketInput,
};
use crate::service::SupportService;
use crate::SupportError;

fn extended(err: SupportError) -> Error {
    let code = err.code();
    let status = i32::from(err.http_status());
    Error::new(err.to_string()).extend_with(|_, ext| {
        ext.set("code", code);
        ext.set("status", status);
    })
}

fn service<'a>(ctx: &Context<'a>) -> GraphQLResult<&'a Arc<SupportService>> {
    ctx.data::<Arc<SupportService>>()
}

pub struct SupportQueries;

#[Object(name = "Query", extends)]
impl SupportQueries {
    /// Get a single support ticket by ID
    ///
    /// Note: Services should implement authorization checks before calling this
    async fn support_ticket(&self, ctx: &Context<'_>, id: Uuid) -> GraphQLResult<TicketView> {
        service(ctx)?.get_ticket(id).await.map_err(extended)
    }

    /// List support tickets with filters, newest first
    async fn support_tickets(
        &self,
        ctx: &Context<'_>,
        filter: Option<TicketFilter>,
    ) -> GraphQLResult<Vec<TicketView>> {
        service(ctx)?
            .list_tickets(filter.unwrap_or_default())
            .await
            .map_err(extended)
    }

    async fn support_tickets_page(
        &self,
        ctx: &Context<'_>,
        page: Option<i64>,
        size: Option<i64>,
    ) -> GraphQLResult<Page<TicketView>> {
        let service = service(ctx)?;
        service
            .list_tickets_page(service.page_request(page, size))
            .await
            .map_err(extended)
    }

    /// Case-insensitive search over title and description
    async fn search_support_tickets(
        &self,
        ctx: &Context<'_>,
        keyword: String,
        page: Option<i64>,
        size: Option<i64>,
    ) -> GraphQLResult<Page<TicketView>> {
        let service = service(ctx)?;
        service
            .search_tickets(&keyword, service.page_request(page, size))
            .await
            .map_err(extended)
    }

    /// Get messages for a ticket, internal notes included
    async fn ticket_messages(&self, ctx: &Context<'_>, ticket_id: Uuid) -> GraphQLResult<Vec<TicketMessage>> {
        service(ctx)?.list_messages(ticket_id).await.map_err(extended)
    }

    async fn ticket_internal_notes(&self, ctx: &Context<'_>, ticket_id: Uuid) -> GraphQLResult<Vec<TicketMessage>> {
        service(ctx)?.list_internal_notes(ticket_id).await.map_err(extended)
    }

    async fn ticket_message(&self, ctx: &Context<'_>, id: Uuid) -> GraphQLResult<TicketMessage> {
        service(ctx)?.get_message(id).await.map_err(extended)
    }

    /// Unread messages in a ticket that were not sent by `user_id`
    async fn unread_message_count(&self, ctx: &Context<'_>, ticket_id: Uuid, user_id: i64) -> GraphQLResult<i64> {
        service(ctx)?.count_unread(ticket_id, user_id).await.map_err(extended)
    }

    async fn support_categories(
        &self,
        ctx: &Context<'_>,
        active_only: Option<bool>,
    ) -> GraphQLResult<Vec<CategoryView>> {
        let service = service(ctx)?;
        let categories = if active_only.unwrap_or(false) {
            service.list_active_categories().await
        } else {
            service.list_categories().await
        };
        categories.map_err(extended)
    }

    async fn support_category(&self, ctx: &Context<'_>, id: Uuid) -> GraphQLResult<CategoryView> {
        service(ctx)?.get_category(id).await.map_err(extended)
    }

    async fn support_category_by_name(&self, ctx: &Context<'_>, name: String) -> GraphQLResult<CategoryView> {
        service(ctx)?.get_category_by_name(&name).await.map_err(extended)
    }

    async fn faqs(&self, ctx: &Context<'_>, published_only: Option<bool>) -> GraphQLResult<Vec<FaqView>> {
        let service = service(ctx)?;
        let faqs = if published_only.unwrap_or(true) {
            service.list_published_faqs().await
        } else {
            service.list_faqs().await
        };
        faqs.map_err(extended)
    }

    async fn faq(&self, ctx: &Context<'_>, id: Uuid) -> GraphQLResult<FaqView> {
        service(ctx)?.get_faq(id).await.map_err(extended)
    }

    async fn faqs_by_category(&self, ctx: &Context<'_>, category_id: Uuid) -> GraphQLResult<Vec<FaqView>> {
        service(ctx)?.list_faqs_by_category(category_id).await.map_err(extended)
    }

    async fn search_faqs(
        &self,
        ctx: &Context<'_>,
        keyword: String,
        page: Option<i64>,
        size: Option<i64>,
    ) -> GraphQLResult<Page<FaqView>> {
        let service = service(ctx)?;
        service
            .search_faqs(&keyword, service.page_request(page, size))
            .await
            .map_err(extended)
    }

    async fn most_viewed_faqs(&self, ctx: &Context<'_>, limit: Option<i64>) -> GraphQLResult<Vec<FaqView>> {
        service(ctx)?.most_viewed_faqs(limit).await.map_err(extended)
    }

    async fn most_helpful_faqs(&self, ctx: &Context<'_>, limit: Option<i64>) -> GraphQLResult<Vec<FaqView>> {
        service(ctx)?.most_helpful_faqs(limit).await.map_err(extended)
    }

    /// Get every support statistic in one snapshot
    ///
    /// Note: Services should implement admin-only authorization before calling this
    async fn support_statistics(&self, ctx: &Context<'_>) -> GraphQLResult<SupportStatistics> {
        service(ctx)?.dashboard().await.map_err(extended)
    }

    async fn ticket_status_distribution(&self, ctx: &Context<'_>) -> GraphQLResult<Vec<TicketStatusCount>> {
        service(ctx)?.status_distribution().await.map_err(extended)
    }

    async fn ticket_priority_distribution(&self, ctx: &Context<'_>) -> GraphQLResult<Vec<TicketPriorityCount>> {
        service(ctx)?.priority_distribution().await.map_err(extended)
    }

    async fn ticket_category_distribution(&self, ctx: &Context<'_>) -> GraphQLResult<Vec<TicketCategoryCount>> {
        service(ctx)?.category_distribution().await.map_err(extended)
    }

    // Display fields: 0.0 when there is no data.

    async fn average_resolution_days(&self, ctx: &Context<'_>) -> GraphQLResult<f64> {
        let value = service(ctx)?.average_resolution_days().await.map_err(extended)?;
        Ok(value.unwrap_or(0.0))
    }

    async fn average_satisfaction_rating(&self, ctx: &Context<'_>) -> GraphQLResult<f64> {
        let value = service(ctx)?.average_satisfaction().await.map_err(extended)?;
        Ok(value.unwrap_or(0.0))
    }

    async fn average_messages_per_ticket(&self, ctx: &Context<'_>) -> GraphQLResult<f64> {
        let value = service(ctx)?.average_messages_per_ticket().await.map_err(extended)?;
        Ok(value.unwrap_or(0.0))
    }

    async fn faq_helpfulness_ratio(&self, ctx: &Context<'_>) -> GraphQLResult<f64> {
        let value = service(ctx)?.faq_helpfulness_ratio().await.map_err(extended)?;
        Ok(value.unwrap_or(0.0))
    }
}

pub struct SupportMutations;

#[Object(name = "Mutation", extends)]
impl SupportMutations {
    /// Create a new support ticket
    ///
    /// Note: Services should verify user authentication before calling this
    async fn create_support_ticket(&self, ctx: &Context<'_>, input: CreateTicketInput) -> GraphQLResult<TicketView> {
        service(ctx)?.create_ticket(input).await.map_err(extended)
    }

    /// Update title, description, priority or category
    async fn update_support_ticket(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: UpdateTicketInput,
    ) -> GraphQLResult<TicketView> {
        service(ctx)?.update_ticket(id, input).await.map_err(extended)
    }

    async fn assign_support_ticket(&self, ctx: &Context<'_>, id: Uuid, staff_id: i64) -> GraphQLResult<TicketView> {
        service(ctx)?.assign_ticket(id, staff_id).await.map_err(extended)
    }

    /// `status` is one of NEW, ASSIGNED, IN_PROGRESS, RESOLVED, CLOSED
    async fn change_ticket_status(&self, ctx: &Context<'_>, id: Uuid, status: String) -> GraphQLResult<TicketView> {
        service(ctx)?.change_status(id, &status).await.map_err(extended)
    }

    /// `priority` is one of LOW, MEDIUM, HIGH, CRITICAL
    async fn change_ticket_priority(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        priority: String,
    ) -> GraphQLResult<TicketView> {
        service(ctx)?.change_priority(id, &priority).await.map_err(extended)
    }

    async fn rate_support_ticket(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        rating: i32,
        feedback: Option<String>,
    ) -> GraphQLResult<TicketView> {
        service(ctx)?.rate_ticket(id, rating, feedback).await.map_err(extended)
    }

    async fn delete_support_ticket(&self, ctx: &Context<'_>, id: Uuid) -> GraphQLResult<bool> {
        service(ctx)?.delete_ticket(id).await.map_err(extended)?;
        Ok(true)
    }

    /// Add a public message to a ticket
    ///
    /// Note: Services should fill the sender from the authenticated user context
    async fn post_ticket_message(&self, ctx: &Context<'_>, input: PostMessageInput) -> GraphQLResult<TicketMessage> {
        service(ctx)?.post_message(input).await.map_err(extended)
    }

    async fn post_internal_note(&self, ctx: &Context<'_>, input: PostMessageInput) -> GraphQLResult<TicketMessage> {
        service(ctx)?.post_internal_note(input).await.map_err(extended)
    }

    async fn mark_message_read(&self, ctx: &Context<'_>, id: Uuid) -> GraphQLResult<TicketMessage> {
        service(ctx)?.mark_read(id).await.map_err(extended)
    }

    /// Returns the number of messages marked
    async fn mark_ticket_messages_read(&self, ctx: &Context<'_>, ticket_id: Uuid, user_id: i64) -> GraphQLResult<i64> {
        let marked = service(ctx)?.mark_all_read(ticket_id, user_id).await.map_err(extended)?;
        Ok(i64::try_from(marked).unwrap_or(i64::MAX))
    }

    async fn create_support_category(&self, ctx: &Context<'_>, input: CategoryInput) -> GraphQLResult<CategoryView> {
        service(ctx)?.create_category(input).await.map_err(extended)
    }

    async fn update_support_category(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: CategoryInput,
    ) -> GraphQLResult<CategoryView> {
        service(ctx)?.update_category(id, input).await.map_err(extended)
    }

    async fn delete_support_category(&self, ctx: &Context<'_>, id: Uuid) -> GraphQLResult<bool> {
        service(ctx)?.delete_category(id).await.map_err(extended)?;
        Ok(true)
    }

    async fn activate_support_category(&self, ctx: &Context<'_>, id: Uuid) -> GraphQLResult<CategoryView> {
        service(ctx)?.activate_category(id).await.map_err(extended)
    }

    async fn deactivate_support_category(&self, ctx: &Context<'_>, id: Uuid) -> GraphQLResult<CategoryView> {
        service(ctx)?.deactivate_category(id).await.map_err(extended)
    }

    async fn create_faq(&self, ctx: &Context<'_>, input: FaqInput) -> GraphQLResult<FaqView> {
        service(ctx)?.create_faq(input).await.map_err(extended)
    }

    async fn update_faq(&self, ctx: &Context<'_>, id: Uuid, input: FaqInput) -> GraphQLResult<FaqView> {
        service(ctx)?.update_faq(id, input).await.map_err(extended)
    }

    async fn delete_faq(&self, ctx: &Context<'_>, id: Uuid) -> GraphQLResult<bool> {
        service(ctx)?.delete_faq(id).await.map_err(extended)?;
        Ok(true)
    }

    async fn publish_faq(&self, ctx: &Context<'_>, id: Uuid) -> GraphQLResult<FaqView> {
        service(ctx)?.publish_faq(id).await.map_err(extended)
    }

    async fn unpublish_faq(&self, ctx: &Context<'_>, id: Uuid) -> GraphQLResult<FaqView> {
        service(ctx)?.unpublish_faq(id).await.map_err(extended)
    }

    async fn record_faq_view(&self, ctx: &Context<'_>, id: Uuid) -> GraphQLResult<FaqView> {
        service(ctx)?.record_view(id).await.map_err(extended)
    }

    async fn vote_faq_helpful(&self, ctx: &Context<'_>, id: Uuid) -> GraphQLResult<FaqView> {
        service(ctx)?.vote_helpful(id).await.map_err(extended)
    }

    async fn vote_faq_unhelpful(&self, ctx: &Context<'_>, id: Uuid) -> GraphQLResult<FaqView> {
        service(ctx)?.vote_unhelpful(id).await.map_err(extended)
    }
}
