//! Repository for the `messages` table.

use servicematch_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::message::Message;

const COLUMNS: &str = "id, booking_id, sender_id, body, client_id, read_at, created_at";

pub struct MessageRepo;

impl MessageRepo {
    /// Store a message, deduplicating on `(booking_id, sender_id, client_id)`.
    ///
    /// Returns the stored row and whether this call created it. A retried
    /// send gets the original row back with `false`.
    pub async fn create(
        pool: &PgPool,
        booking_id: DbId,
        sender_id: DbId,
        body: &str,
        client_id: &str,
    ) -> Result<(Message, bool), sqlx::Error> {
        let query = format!(
            "INSERT INTO messages (booking_id, sender_id, body, client_id)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT ON CONSTRAINT uq_messages_client_id DO NOTHING
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, Message>(&query)
            .bind(booking_id)
            .bind(sender_id)
            .bind(body)
            .bind(client_id)
            .fetch_optional(pool)
            .await?;
        if let Some(message) = inserted {
            return Ok((message, true));
        }

        let query = format!(
            "SELECT {COLUMNS} FROM messages
             WHERE booking_id = $1 AND sender_id = $2 AND client_id = $3"
        );
        let existing = sqlx::query_as::<_, Message>(&query)
            .bind(booking_id)
            .bind(sender_id)
            .bind(client_id)
            .fetch_one(pool)
            .await?;
        Ok((existing, false))
    }

    /// Messages in a thread, oldest first. `before` pages backwards from a
    /// message timestamp; the newest `limit` rows are returned otherwise.
    pub async fn list_for_booking(
        pool: &PgPool,
        booking_id: DbId,
        before: Option<Timestamp>,
        limit: i64,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM (
                SELECT {COLUMNS} FROM messages
                WHERE booking_id = $1 AND ($2::TIMESTAMPTZ IS NULL OR created_at < $2)
                ORDER BY created_at DESC, id DESC
                LIMIT $3
             ) latest
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(booking_id)
            .bind(before)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Mark every message from the other participant as read.
    pub async fn mark_read(
        pool: &PgPool,
        booking_id: DbId,
        reader_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE messages SET read_at = NOW()
             WHERE booking_id = $1 AND sender_id <> $2 AND read_at IS NULL",
        )
        .bind(booking_id)
        .bind(reader_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
