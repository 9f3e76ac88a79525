use std::future::Future;
use std::time::Duration;

use irhabi_core::{AppError, env};
use reqwest::Client;
use serde::Serialize;

use crate::notify::Notification;

pub const ONESIGNAL_URL: &str = "https://onesignal.com/api/v1/notifications";
const DEFAULT_ICON: &str = "ic_stat_onesignal_default";
const PUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers a stored notification to the user's device.
pub trait Pusher: Send + Sync + Clone {
    fn push(&self, notification: &Notification)
    -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Pusher that delivers nothing. Used when no push service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPusher;

impl Pusher for NoopPusher {
    async fn push(&self, _notification: &Notification) -> Result<(), AppError> {
        Ok(())
    }
}

/// OneSignal REST push client.
#[derive(Clone)]
pub struct OneSignal {
    client: Client,
    app_id: String,
    url: String,
}

impl OneSignal {
    pub fn new(app_id: &str, url: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(PUSH_TIMEOUT)
            .build()
            .map_err(|e| AppError::Push(e.to_string()))?;

        Ok(Self {
            client,
            app_id: app_id.to_string(),
            url: url.to_string(),
        })
    }

    /// `ONES_KEY` (app id) and `ONES_URL`. `None` when `ONES_KEY` is unset.
    pub fn from_env() -> Result<Option<Self>, AppError> {
        match env::get_optional("ONES_KEY") {
            Some(app_id) => Self::new(&app_id, &env::get_string("ONES_URL", ONESIGNAL_URL)).map(Some),
            None => Ok(None),
        }
    }
}

// ---- OneSignal API types ----

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    app_id: &'a str,
    include_player_ids: Vec<&'a str>,
    small_icon: &'a str,
    large_icon: &'a str,
    contents: Localized<'a>,
    headings: Localized<'a>,
    data: PushData<'a>,
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct Localized<'a> {
    en: &'a str,
}

#[derive(Debug, Serialize)]
struct PushData<'a> {
    url: &'a str,
}

impl<'a> PushRequest<'a> {
    fn new(app_id: &'a str, n: &'a Notification) -> Self {
        Self {
            app_id,
            include_player_ids: vec![n.device_id.as_str()],
            small_icon: DEFAULT_ICON,
            large_icon: DEFAULT_ICON,
            contents: Localized { en: &n.message },
            headings: Localized { en: &n.title },
            data: PushData { url: &n.action_url },
            url: &n.action_url,
        }
    }
}

impl Pusher for OneSignal {
    async fn push(&self, notification: &Notification) -> Result<(), AppError> {
        if notification.device_id.is_empty() {
            tracing::debug!(id = %notification.id, "No device for notification, skipping push");
            return Ok(());
        }

        let request = PushRequest::new(&self.app_id, notification);
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Push(format!("Failed to dispatch request to {}: {e}", self.url)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AppError::Push(format!("HTTP {}: {body}", status.as_u16())));
        }

        tracing::debug!(id = %notification.id, response = %body, "Push notification dispatched");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::notify::NewNotification;

    #[test]
    fn test_payload_shape() {
        let n = Notification::stamp(
            &NewNotification {
                user_id: 1,
                device_id: "player-1".into(),
                title: "Order approved".into(),
                message: "Your order #12 was approved".into(),
                action_url: "/orders/12".into(),
                object_action: None,
            },
            Utc::now(),
        );

        let payload = serde_json::to_value(PushRequest::new("app-123", &n)).unwrap();
        assert_eq!(
            payload,
            json!({
                "app_id": "app-123",
                "include_player_ids": ["player-1"],
                "small_icon": "ic_stat_onesignal_default",
                "large_icon": "ic_stat_onesignal_default",
                "contents": {"en": "Your order #12 was approved"},
                "headings": {"en": "Order approved"},
                "data": {"url": "/orders/12"},
                "url": "/orders/12"
            })
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_push_error() {
        let pusher = OneSignal::new("app", "http://127.0.0.1:9/notifications").unwrap();
        let mut n = Notification::stamp(
            &NewNotification {
                user_id: 1,
                message: "m".into(),
                action_url: "/".into(),
                ..Default::default()
            },
            Utc::now(),
        );

        assert!(pusher.push(&n).await.is_ok());

        n.device_id = "player".into();
        assert!(matches!(pusher.push(&n).await, Err(AppError::Push(_))));
    }
}
