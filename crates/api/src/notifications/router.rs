//! Event-to-notification routing.

use std::sync::Arc;

use serde_json::json;
use servicematch_core::messaging::thread_channel;
use servicematch_core::roles::ROLE_ADMIN;
use servicematch_core::types::DbId;
use servicematch_db::models::notification::CreateNotification;
use servicematch_db::repositories::NotificationRepo;
use servicematch_db::DbPool;
use servicematch_events::{types, PlatformEvent};
use tokio::sync::broadcast;

use super::templates::{render, NotificationTemplate};
use crate::ws::WsManager;

/// Consumes bus events and delivers them to users.
///
/// For every recipient (minus the actor) a notification row is stored and
/// pushed as `{"type": "notification", ...}`. `message.sent` events are
/// additionally pushed as `{"type": "message", ...}` on the booking's
/// thread channel so open chat windows update live.
pub struct NotificationRouter {
    pool: DbPool,
    ws_manager: Arc<WsManager>,
}

impl NotificationRouter {
    pub fn new(pool: DbPool, ws_manager: Arc<WsManager>) -> Self {
        Self { pool, ws_manager }
    }

    /// Run until the bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.route_event(&event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to route event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    /// Deliver one event to everyone it concerns.
    ///
    /// Returns how many recipients got a notification. A failed delivery is
    /// logged and does not stop the remaining recipients; only failing to
    /// work out the recipients is an error.
    pub async fn route_event(&self, event: &PlatformEvent) -> Result<usize, sqlx::Error> {
        let Some(template) = render(event) else {
            tracing::debug!(event_type = %event.event_type, "No template, skipping");
            return Ok(0);
        };

        let targets = self.determine_targets(event).await?;

        if event.event_type == types::MESSAGE_SENT {
            self.push_thread_message(event, &targets).await;
        }

        let mut delivered = 0;
        for user_id in targets {
            match self.deliver_in_app(user_id, &template).await {
                Ok(()) => delivered += 1,
                Err(e) => tracing::error!(
                    error = %e,
                    user_id,
                    event_type = %event.event_type,
                    "Failed to deliver notification"
                ),
            }
        }
        Ok(delivered)
    }

    /// Event recipients minus the actor, plus all active admins for new
    /// disputes.
    async fn determine_targets(&self, event: &PlatformEvent) -> Result<Vec<DbId>, sqlx::Error> {
        let mut targets: Vec<DbId> = event.audience().collect();

        if event.event_type == types::DISPUTE_OPENED {
            for admin_id in self.active_admin_ids().await? {
                if !targets.contains(&admin_id) && Some(admin_id) != event.actor_user_id {
                    targets.push(admin_id);
                }
            }
        }
        Ok(targets)
    }

    async fn active_admin_ids(&self) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM users WHERE role = $1 AND is_active = true")
            .bind(ROLE_ADMIN)
            .fetch_all(&self.pool)
            .await
    }

    async fn deliver_in_app(
        &self,
        user_id: DbId,
        template: &NotificationTemplate,
    ) -> Result<(), sqlx::Error> {
        let input = CreateNotification {
            user_id,
            kind: template.kind.to_string(),
            title: template.title.clone(),
            body: template.body.clone(),
            link: template.link.clone(),
        };
        let notification = NotificationRepo::create(&self.pool, &input).await?;

        let msg = json!({
            "type": "notification",
            "notification": notification,
        });
        self.ws_manager.send_json_to_user(user_id, &msg).await;
        Ok(())
    }

    async fn push_thread_message(&self, event: &PlatformEvent, targets: &[DbId]) {
        let Some(booking_id) = event.source_entity_id else {
            return;
        };
        let msg = json!({
            "type": "message",
            "channel": thread_channel(booking_id),
            "message": event.payload.get("message"),
        });
        for user_id in targets {
            self.ws_manager.send_json_to_user(*user_id, &msg).await;
        }
    }
}
