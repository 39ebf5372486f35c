//! Notification REST endpoints

use super::{ApiRequest, CanteenClient, ClientError};
use crate::types::{Notification, UnreadCount};
use serde::Deserialize;

/// `GET /notifications` may answer with a list, a single object or `null`
#[derive(Deserialize)]
#[serde(untagged)]
enum NotificationList {
    Many(Vec<Notification>),
    One(Box<Notification>),
}

impl CanteenClient {
    /// Notifications of the signed-in user, in server order
    pub async fn list_notifications(&self) -> Result<Vec<Notification>, ClientError> {
        let list: Option<NotificationList> = self.execute(ApiRequest::get("/notifications")).await?;
        Ok(match list {
            None => Vec::new(),
            Some(NotificationList::Many(items)) => items,
            Some(NotificationList::One(item)) => vec![*item],
        })
    }

    pub async fn unread_notification_count(&self) -> Result<u64, ClientError> {
        let count: UnreadCount = self
            .execute(ApiRequest::get("/notifications/unread-count"))
            .await?;
        Ok(count.get())
    }

    pub async fn mark_notification_read(&self, id: i64) -> Result<Notification, ClientError> {
        self.execute(ApiRequest::post(format!("/notifications/{id}/read")))
            .await
    }

    pub async fn mark_all_notifications_read(&self) -> Result<(), ClientError> {
        self.execute_unit(ApiRequest::post("/notifications/read-all"))
            .await
    }
}
