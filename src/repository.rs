use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
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

const TICKET_COLUMNS: &str = "id, title, description, status, priority, user_id, user_email, user_name, \
     user_type, assigned_to_id, course_id, course_name, category_id, satisfaction_rating, feedback, \
     created_at, updated_at, closed_at";

const MESSAGE_COLUMNS: &str = "id, ticket_id, content, sender_id, sender_name, sender_email, sender_type, \
     attachment_url, attachment_type, is_internal_note, is_read, created_at";

/// Logs and wraps a database failure.
fn db_error(action: &'static str) -> impl Fn(sqlx::Error) -> SupportError {
    move |e| {
        tracing::error!("Failed to {}: {}", action, e);
        SupportError::Database(e)
    }
}

/// `%` and `_` in user keywords match literally.
fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

pub struct SupportRepository {
    pool: PgPool,
}

impl SupportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn lock_ticket(conn: &mut PgConnection, id: Uuid) -> Result<Ticket> {
        sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM support_tickets WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(db_error("lock support ticket"))?
        .ok_or_else(|| SupportError::not_found("Ticket", id))
    }

    async fn lock_category(conn: &mut PgConnection, id: Uuid) -> Result<Category> {
        sqlx::query_as::<_, Category>("SELECT * FROM support_categories WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(db_error("lock category"))?
            .ok_or_else(|| SupportError::not_found("Category", id))
    }

    /// Shares the category row so it cannot be deleted before commit.
    async fn require_category(conn: &mut PgConnection, id: Uuid) -> Result<()> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM support_categories WHERE id = $1 FOR KEY SHARE")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(db_error("resolve category"))?
            .map(|_| ())
            .ok_or_else(|| SupportError::not_found("Category", id))
    }

    async fn category_holding(conn: &mut PgConnection, name: &str) -> Result<Option<Uuid>> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM support_categories WHERE name = $1")
            .bind(name.trim())
            .fetch_optional(conn)
            .await
            .map_err(db_error("check category name"))
    }

    async fn write_ticket(conn: &mut PgConnection, ticket: &Ticket) -> Result<Ticket> {
        sqlx::query_as::<_, Ticket>(&format!(
            r#"
            UPDATE support_tickets SET
                title = $2,
                description = $3,
                status = $4,
                priority = $5,
                assigned_to_id = $6,
                category_id = $7,
                satisfaction_rating = $8,
                feedback = $9,
                updated_at = $10,
                closed_at = $11
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(ticket.id)
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(ticket.status)
        .bind(ticket.priority)
        .bind(ticket.assigned_to_id)
        .bind(ticket.category_id)
        .bind(ticket.satisfaction_rating)
        .bind(&ticket.feedback)
        .bind(ticket.updated_at)
        .bind(ticket.closed_at)
        .fetch_one(conn)
        .await
        .map_err(db_error("update support ticket"))
    }

    async fn write_message(conn: &mut PgConnection, message: &TicketMessage) -> Result<TicketMessage> {
        sqlx::query_as::<_, TicketMessage>(&format!(
            r#"
            INSERT INTO ticket_messages (
                id, ticket_id, content, sender_id, sender_name, sender_email, sender_type,
                attachment_url, attachment_type, is_internal_note, is_read, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(message.id)
        .bind(message.ticket_id)
        .bind(&message.content)
        .bind(message.sender_id)
        .bind(&message.sender_name)
        .bind(&message.sender_email)
        .bind(message.sender_type)
        .bind(&message.attachment_url)
        .bind(&message.attachment_type)
        .bind(message.is_internal_note)
        .bind(message.is_read)
        .bind(message.created_at)
        .fetch_one(conn)
        .await
        .map_err(db_error("create ticket message"))
    }

    async fn write_category(conn: &mut PgConnection, category: &Category) -> Result<Category> {
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE support_categories SET
                name = $2,
                description = $3,
                active = $4,
                expected_resolution_time_hours = $5,
                updated_at = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.active)
        .bind(category.expected_resolution_time_hours)
        .bind(category.updated_at)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                SupportError::InvalidArgument(format!("a category named '{}' already exists", category.name))
            } else {
                db_error("update category")(e)
            }
        })
    }

    async fn ensure_ticket_exists(&self, id: Uuid) -> Result<()> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM support_tickets WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("check support ticket"))?;
        if !exists {
            return Err(SupportError::not_found("Ticket", id));
        }
        Ok(())
    }
}

#[async_trait]
impl SupportStore for SupportRepository {
    async fn list_categories(&self, active_only: bool) -> Result<Vec<Category>> {
        sqlx::query_as::<_, Category>(
            "SELECT * FROM support_categories WHERE ($1 = FALSE OR active) ORDER BY name",
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list categories"))
    }

    async fn get_category(&self, id: Uuid) -> Result<Category> {
        sqlx::query_as::<_, Category>("SELECT * FROM support_categories WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => SupportError::not_found("Category", id),
                _ => db_error("fetch category")(e),
            })
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        sqlx::query_as::<_, Category>("SELECT * FROM support_categories WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("fetch category by name"))
    }

    async fn insert_category(&self, input: &CategoryInput) -> Result<Category> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;
        let holder = Self::category_holding(&mut tx, &input.name).await?;
        catalog::ensure_name_available(&input.name, holder, None)?;

        let category = catalog::new_category(input, Utc::now());
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO support_categories (
                id, name, description, active, expected_resolution_time_hours, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.active)
        .bind(category.expected_resolution_time_hours)
        .bind(category.created_at)
        .bind(category.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                SupportError::InvalidArgument(format!("a category named '{}' already exists", category.name))
            } else {
                db_error("create category")(e)
            }
        })?;

        tx.commit().await.map_err(db_error("commit category"))?;
        Ok(category)
    }

    async fn update_category(&self, id: Uuid, input: &CategoryInput) -> Result<Category> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;
        let mut category = Self::lock_category(&mut tx, id).await?;
        let holder = Self::category_holding(&mut tx, &input.name).await?;
        catalog::ensure_name_available(&input.name, holder, Some(id))?;

        catalog::apply_category(&mut category, input, Utc::now());
        let category = Self::write_category(&mut tx, &category).await?;
        tx.commit().await.map_err(db_error("commit category"))?;
        Ok(category)
    }

    async fn set_category_active(&self, id: Uuid, active: bool) -> Result<Category> {
        sqlx::query_as::<_, Category>(
            "UPDATE support_categories SET active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => SupportError::not_found("Category", id),
            _ => db_error("toggle category")(e),
        })
    }

    async fn delete_category(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;
        let category = Self::lock_category(&mut tx, id).await?;
        let in_use = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM support_tickets WHERE category_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("count category tickets"))?;
        catalog::ensure_category_deletable(&category, in_use)?;

        // faqs.category_id is ON DELETE SET NULL
        sqlx::query("DELETE FROM support_categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete category"))?;
        tx.commit().await.map_err(db_error("commit category deletion"))?;
        Ok(())
    }

    async fn count_category_tickets(&self, id: Uuid) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM support_tickets WHERE category_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count category tickets"))
    }

    async fn list_faqs(&self, published_only: bool, category_id: Option<Uuid>) -> Result<Vec<Faq>> {
        sqlx::query_as::<_, Faq>(
            r#"
            SELECT * FROM support_faqs
            WHERE ($1 = FALSE OR published)
              AND ($2::UUID IS NULL OR category_id = $2)
            ORDER BY display_order ASC NULLS LAST, created_at ASC
            "#,
        )
        .bind(published_only)
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list faqs"))
    }

    async fn get_faq(&self, id: Uuid) -> Result<Faq> {
        sqlx::query_as::<_, Faq>("SELECT * FROM support_faqs WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => SupportError::not_found("FAQ", id),
                _ => db_error("fetch faq")(e),
            })
    }

    async fn insert_faq(&self, input: &FaqInput) -> Result<Faq> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;
        if let Some(category_id) = input.category_id {
            Self::require_category(&mut tx, category_id).await?;
        }

        let faq = catalog::new_faq(input, Utc::now());
        let faq = sqlx::query_as::<_, Faq>(
            r#"
            INSERT INTO support_faqs (
                id, question, answer, category_id, view_count, helpful_votes, unhelpful_votes,
                published, search_keywords, display_order, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, 0, 0, 0, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(faq.id)
        .bind(&faq.question)
        .bind(&faq.answer)
        .bind(faq.category_id)
        .bind(faq.published)
        .bind(&faq.search_keywords)
        .bind(faq.display_order)
        .bind(faq.created_at)
        .bind(faq.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("create faq"))?;

        tx.commit().await.map_err(db_error("commit faq"))?;
        Ok(faq)
    }

    async fn update_faq(&self, id: Uuid, input: &FaqInput) -> Result<Faq> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;
        if let Some(category_id) = input.category_id {
            Self::require_category(&mut tx, category_id).await?;
        }
        let mut faq = sqlx::query_as::<_, Faq>("SELECT * FROM support_faqs WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("lock faq"))?
            .ok_or_else(|| SupportError::not_found("FAQ", id))?;

        catalog::apply_faq(&mut faq, input, Utc::now());
        let faq = sqlx::query_as::<_, Faq>(
            r#"
            UPDATE support_faqs SET
                question = $2,
                answer = $3,
                category_id = $4,
                search_keywords = $5,
                display_order = $6,
                published = $7,
                updated_at = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(faq.id)
        .bind(&faq.question)
        .bind(&faq.answer)
        .bind(faq.category_id)
        .bind(&faq.search_keywords)
        .bind(faq.display_order)
        .bind(faq.published)
        .bind(faq.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("update faq"))?;

        tx.commit().await.map_err(db_error("commit faq"))?;
        Ok(faq)
    }

    async fn delete_faq(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM support_faqs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete faq"))?;
        if result.rows_affected() == 0 {
            return Err(SupportError::not_found("FAQ", id));
        }
        Ok(())
    }

    async fn set_faq_published(&self, id: Uuid, published: bool) -> Result<Faq> {
        sqlx::query_as::<_, Faq>(
            "UPDATE support_faqs SET published = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(published)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => SupportError::not_found("FAQ", id),
            _ => db_error("publish faq")(e),
        })
    }

    async fn increment_faq_counter(&self, id: Uuid, counter: FaqCounter) -> Result<Faq> {
        let column = counter.column();
        sqlx::query_as::<_, Faq>(&format!(
            "UPDATE support_faqs SET {column} = {column} + 1 WHERE id = $1 RETURNING *"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => SupportError::not_found("FAQ", id),
            _ => db_error("increment faq counter")(e),
        })
    }

    async fn search_faqs(&self, keyword: &str, page: PageRequest) -> Result<Page<Faq>> {
        let pattern = like_pattern(keyword);
        let filter = r#"
            FROM support_faqs
            WHERE published
              AND (question ILIKE $1 OR answer ILIKE $1 OR COALESCE(search_keywords, '') ILIKE $1)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {filter}"))
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count faq search"))?;

        let items = sqlx::query_as::<_, Faq>(&format!(
            "SELECT * {filter} ORDER BY display_order ASC NULLS LAST, created_at ASC LIMIT $2 OFFSET $3"
        ))
        .bind(&pattern)
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("search faqs"))?;

        Ok(Page {
            items,
            total,
            page: page.page,
            size: page.size,
        })
    }

    async fn top_faqs(&self, ranking: FaqRanking, limit: i64) -> Result<Vec<Faq>> {
        let column = match ranking {
            FaqRanking::MostViewed => FaqCounter::Views.column(),
            FaqRanking::MostHelpful => FaqCounter::HelpfulVotes.column(),
        };
        sqlx::query_as::<_, Faq>(&format!(
            "SELECT * FROM support_faqs WHERE {column} > 0 ORDER BY {column} DESC LIMIT $1"
        ))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("rank faqs"))
    }

    async fn insert_ticket(&self, input: &CreateTicketInput) -> Result<Ticket> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;
        if let Some(category_id) = input.category_id {
            Self::require_category(&mut tx, category_id).await?;
        }

        let ticket = lifecycle::new_ticket(input, Utc::now());
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            INSERT INTO support_tickets (
                id, title, description, status, priority, user_id, user_email, user_name, user_type,
                course_id, course_name, category_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(ticket.id)
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(ticket.status)
        .bind(ticket.priority)
        .bind(ticket.user_id)
        .bind(&ticket.user_email)
        .bind(&ticket.user_name)
        .bind(ticket.user_type)
        .bind(ticket.course_id)
        .bind(&ticket.course_name)
        .bind(ticket.category_id)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("create support ticket"))?;

        if let Some(body) = &input.initial_message {
            Self::write_message(&mut tx, &thread::opening_message(&ticket, body)).await?;
        }

        tx.commit().await.map_err(db_error("commit support ticket"))?;
        Ok(ticket)
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Ticket> {
        sqlx::query_as::<_, Ticket>(&format!("SELECT {TICKET_COLUMNS} FROM support_tickets WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => SupportError::not_found("Ticket", id),
                _ => db_error("fetch support ticket")(e),
            })
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        let mut query = format!("SELECT {TICKET_COLUMNS} FROM support_tickets WHERE TRUE");
        let mut params_count = 0;

        if filter.user_id.is_some() {
            params_count += 1;
            query.push_str(&format!(" AND user_id = ${}", params_count));
        }

        if filter.assigned_to_id.is_some() {
            params_count += 1;
            query.push_str(&format!(" AND assigned_to_id = ${}", params_count));
        }

        if filter.status.is_some() {
            params_count += 1;
            query.push_str(&format!(" AND status = ${}", params_count));
        }

        if filter.category_id.is_some() {
            params_count += 1;
            query.push_str(&format!(" AND category_id = ${}", params_count));
        }

        if filter.course_id.is_some() {
            params_count += 1;
            query.push_str(&format!(" AND course_id = ${}", params_count));
        }

        query.push_str(" ORDER BY created_at DESC");

        let mut q = sqlx::query_as::<_, Ticket>(&query);

        if let Some(user_id) = filter.user_id {
            q = q.bind(user_id);
        }
        if let Some(assigned_to_id) = filter.assigned_to_id {
            q = q.bind(assigned_to_id);
        }
        if let Some(status) = filter.status {
            q = q.bind(status);
        }
        if let Some(category_id) = filter.category_id {
            q = q.bind(category_id);
        }
        if let Some(course_id) = filter.course_id {
            q = q.bind(course_id);
        }

        q.fetch_all(&self.pool).await.map_err(db_error("list support tickets"))
    }

    async fn page_tickets(&self, page: PageRequest) -> Result<Page<Ticket>> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM support_tickets")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count support tickets"))?;

        let items = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM support_tickets ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("page support tickets"))?;

        Ok(Page {
            items,
            total,
            page: page.page,
            size: page.size,
        })
    }

    async fn search_tickets(&self, keyword: &str, page: PageRequest) -> Result<Page<Ticket>> {
        let pattern = like_pattern(keyword);

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM support_tickets WHERE title ILIKE $1 OR description ILIKE $1",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count ticket search"))?;

        let items = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            SELECT {TICKET_COLUMNS} FROM support_tickets
            WHERE title ILIKE $1 OR description ILIKE $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(&pattern)
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("search support tickets"))?;

        Ok(Page {
            items,
            total,
            page: page.page,
            size: page.size,
        })
    }

    async fn update_ticket(&self, id: Uuid, input: &UpdateTicketInput) -> Result<Ticket> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;
        let mut ticket = Self::lock_ticket(&mut tx, id).await?;
        if let Some(category_id) = input.category_id {
            Self::require_category(&mut tx, category_id).await?;
        }

        lifecycle::apply_update(&mut ticket, input, Utc::now());
        let ticket = Self::write_ticket(&mut tx, &ticket).await?;
        tx.commit().await.map_err(db_error("commit support ticket"))?;
        Ok(ticket)
    }

    async fn apply_ticket_command(&self, id: Uuid, command: TicketCommand) -> Result<Ticket> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;
        let mut ticket = Self::lock_ticket(&mut tx, id).await?;

        // A rejected command drops the transaction, which rolls back.
        lifecycle::apply(&mut ticket, command, Utc::now())?;
        let ticket = Self::write_ticket(&mut tx, &ticket).await?;
        tx.commit().await.map_err(db_error("commit support ticket"))?;
        Ok(ticket)
    }

    async fn delete_ticket(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;
        Self::lock_ticket(&mut tx, id).await?;

        sqlx::query("DELETE FROM ticket_messages WHERE ticket_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete ticket messages"))?;

        sqlx::query("DELETE FROM support_tickets WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete support ticket"))?;

        tx.commit().await.map_err(db_error("commit ticket deletion"))?;
        Ok(())
    }

    async fn insert_message(&self, input: &PostMessageInput, internal: bool) -> Result<TicketMessage> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;
        let mut ticket = Self::lock_ticket(&mut tx, input.ticket_id).await?;

        let now = Utc::now();
        let message = Self::write_message(&mut tx, &thread::new_message(input, internal, now)).await?;
        if lifecycle::on_message_posted(&mut ticket, &message, now) {
            Self::write_ticket(&mut tx, &ticket).await?;
        }

        tx.commit().await.map_err(db_error("commit ticket message"))?;
        Ok(message)
    }

    async fn get_message(&self, id: Uuid) -> Result<TicketMessage> {
        sqlx::query_as::<_, TicketMessage>(&format!("SELECT {MESSAGE_COLUMNS} FROM ticket_messages WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => SupportError::not_found("Message", id),
                _ => db_error("fetch ticket message")(e),
            })
    }

    async fn thread(&self, ticket_id: Uuid) -> Result<Vec<TicketMessage>> {
        self.ensure_ticket_exists(ticket_id).await?;
        sqlx::query_as::<_, TicketMessage>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM ticket_messages WHERE ticket_id = $1 ORDER BY created_at ASC, seq ASC"
        ))
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("fetch ticket messages"))
    }

    async fn threads(&self, ticket_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<TicketMessage>>> {
        let messages = sqlx::query_as::<_, TicketMessage>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM ticket_messages WHERE ticket_id = ANY($1) ORDER BY created_at ASC, seq ASC"
        ))
        .bind(ticket_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("fetch ticket threads"))?;

        let mut threads: HashMap<Uuid, Vec<TicketMessage>> = HashMap::new();
        for message in messages {
            threads.entry(message.ticket_id).or_default().push(message);
        }
        Ok(threads)
    }

    async fn mark_message_read(&self, id: Uuid) -> Result<TicketMessage> {
        sqlx::query_as::<_, TicketMessage>(&format!(
            "UPDATE ticket_messages SET is_read = TRUE WHERE id = $1 RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => SupportError::not_found("Message", id),
            _ => db_error("mark message read")(e),
        })
    }

    async fn mark_thread_read(&self, ticket_id: Uuid, reader_id: i64) -> Result<u64> {
        self.ensure_ticket_exists(ticket_id).await?;
        let result = sqlx::query(
            "UPDATE ticket_messages SET is_read = TRUE WHERE ticket_id = $1 AND NOT is_read AND sender_id <> $2",
        )
        .bind(ticket_id)
        .bind(reader_id)
        .execute(&self.pool)
        .await
        .map_err(db_error("mark thread read"))?;
        Ok(result.rows_affected())
    }

    async fn count_unread(&self, ticket_id: Uuid, reader_id: i64) -> Result<i64> {
        self.ensure_ticket_exists(ticket_id).await?;
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM ticket_messages WHERE ticket_id = $1 AND NOT is_read AND sender_id <> $2",
        )
        .bind(ticket_id)
        .bind(reader_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count unread messages"))
    }

    async fn ticket_facts(&self) -> Result<Vec<TicketFacts>> {
        sqlx::query_as::<_, TicketFacts>(
            r#"
            SELECT
                t.status,
                t.priority,
                c.name AS category_name,
                t.created_at,
                t.closed_at,
                t.satisfaction_rating,
                (SELECT COUNT(*) FROM ticket_messages m WHERE m.ticket_id = t.id)::BIGINT AS message_count
            FROM support_tickets t
            LEFT JOIN support_categories c ON c.id = t.category_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("load ticket statistics"))
    }

    async fn faq_votes(&self) -> Result<Vec<FaqVotes>> {
        sqlx::query_as::<_, FaqVotes>("SELECT view_count, helpful_votes, unhelpful_votes FROM support_faqs")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("load faq statistics"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" course "), "%course%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }
}
