//! Discord direct-message notifier

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use twilight_http::Client as HttpClient;
use twilight_model::id::{marker::UserMarker, Id};

use crate::notifier::{AlertNotification, Notifier, NotifyError};

/// Sends fired alerts to their owner as a Discord DM.
///
/// The alert's `owner_id` must be a Discord user id.
pub struct DiscordNotifier {
    http: Arc<HttpClient>,
}

impl DiscordNotifier {
    pub fn new(token: String) -> Self {
        Self {
            http: Arc::new(HttpClient::new(token)),
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, notification: &AlertNotification) -> Result<(), NotifyError> {
        let user_id = parse_user_id(&notification.owner_id)?;

        let channel = self
            .http
            .create_private_channel(user_id)
            .await
            .map_err(|e| NotifyError::DeliveryUnavailable(format!("open DM channel: {}", e)))?
            .model()
            .await
            .map_err(|e| NotifyError::DeliveryUnavailable(format!("decode DM channel: {}", e)))?;

        self.http
            .create_message(channel.id)
            .content(&notification.message())
            .await
            .map_err(|e| NotifyError::DeliveryUnavailable(format!("send message: {}", e)))?;

        debug!(
            "Delivered alert {} to Discord user {}",
            notification.alert_id, notification.owner_id
        );
        Ok(())
    }
}

fn parse_user_id(owner_id: &str) -> Result<Id<UserMarker>, NotifyError> {
    owner_id
        .parse::<u64>()
        .ok()
        .and_then(Id::new_checked)
        .ok_or_else(|| {
            NotifyError::DeliveryUnavailable(format!("{} is not a Discord user id", owner_id))
        })
}
