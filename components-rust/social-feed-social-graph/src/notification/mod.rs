use crate::common::{PageRequest, Pagination, SocialError};
use crate::common::settings::NOTIFICATIONS_DEFAULT_LIMIT;
use golem_rust::{agent_definition, agent_implementation, Schema};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Schema, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationType {
    Like,
    Comment,
    Follow,
    Mention,
}

impl Display for NotificationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationType::Like => write!(f, "like"),
            NotificationType::Comment => write!(f, "comment"),
            NotificationType::Follow => write!(f, "follow"),
            NotificationType::Mention => write!(f, "mention"),
        }
    }
}

/// A notification event before it lands in the recipient's inbox.
#[derive(Schema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub recipient_id: String,
    pub sender_id: String,
    pub notification_type: NotificationType,
    pub post_id: Option<String>,
    pub comment_id: Option<String>,
    pub message: String,
}

impl NewNotification {
    pub fn follow(recipient_id: String, sender_id: String) -> Self {
        NewNotification {
            recipient_id,
            sender_id,
            notification_type: NotificationType::Follow,
            post_id: None,
            comment_id: None,
            message: "started following you".to_string(),
        }
    }

    pub fn like(recipient_id: String, sender_id: String, post_id: String) -> Self {
        NewNotification {
            recipient_id,
            sender_id,
            notification_type: NotificationType::Like,
            post_id: Some(post_id),
            comment_id: None,
            message: "liked your post".to_string(),
        }
    }

    pub fn comment(
        recipient_id: String,
        sender_id: String,
        post_id: String,
        comment_id: String,
    ) -> Self {
        NewNotification {
            recipient_id,
            sender_id,
            notification_type: NotificationType::Comment,
            post_id: Some(post_id),
            comment_id: Some(comment_id),
            message: "commented on your post".to_string(),
        }
    }

    pub fn mention(recipient_id: String, sender_id: String, post_id: String) -> Self {
        NewNotification {
            recipient_id,
            sender_id,
            notification_type: NotificationType::Mention,
            post_id: Some(post_id),
            comment_id: None,
            message: "mentioned you in a post".to_string(),
        }
    }

    pub fn is_self_notification(&self) -> bool {
        self.recipient_id == self.sender_id
    }
}

#[derive(Schema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: String,
    pub recipient_id: String,
    pub sender_id: String,
    pub notification_type: NotificationType,
    pub post_id: Option<String>,
    pub comment_id: Option<String>,
    pub message: String,
    pub is_read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Schema, Clone, Debug, Serialize, Deserialize)]
pub struct NotificationsPage {
    pub notifications: Vec<Notification>,
    pub unread_count: u64,
    pub pagination: Pagination,
}

/// Notifications of one recipient, newest first.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Inbox {
    pub user_id: String,
    pub notifications: Vec<Notification>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Inbox {
    pub(crate) fn new(user_id: String) -> Self {
        let now = chrono::Utc::now();
        Inbox {
            user_id,
            notifications: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Stores an unread notification. Notifications addressed to another user and
    /// notifications sent by the recipient to itself are dropped.
    pub fn add(
        &mut self,
        notification: NewNotification,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Option<Notification> {
        if notification.recipient_id != self.user_id {
            log::warn!(
                "add notification - user id: {}, recipient id: {} - recipient mismatch",
                self.user_id,
                notification.recipient_id
            );
            return None;
        }
        if notification.sender_id == self.user_id {
            return None;
        }

        let notification = Notification {
            notification_id: uuid::Uuid::new_v4().to_string(),
            recipient_id: self.user_id.clone(),
            sender_id: notification.sender_id,
            notification_type: notification.notification_type,
            post_id: notification.post_id,
            comment_id: notification.comment_id,
            message: notification.message,
            is_read: false,
            created_at: now,
            updated_at: now,
        };

        self.notifications.insert(0, notification.clone());
        self.updated_at = now;

        Some(notification)
    }

    pub fn mark_as_read(
        &mut self,
        notification_id: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Notification, SocialError> {
        let notification = self
            .notifications
            .iter_mut()
            .find(|n| n.notification_id == notification_id)
            .ok_or_else(|| SocialError::not_found("Notification not found"))?;

        if !notification.is_read {
            notification.is_read = true;
            notification.updated_at = now;
            self.updated_at = now;
        }

        Ok(notification.clone())
    }

    /// Returns the number of notifications that changed state.
    pub fn mark_all_as_read(&mut self, now: chrono::DateTime<chrono::Utc>) -> u64 {
        let mut modified = 0;
        for notification in self.notifications.iter_mut().filter(|n| !n.is_read) {
            notification.is_read = true;
            notification.updated_at = now;
            modified += 1;
        }
        if modified > 0 {
            self.updated_at = now;
        }
        modified
    }

    pub fn delete(
        &mut self,
        notification_id: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), SocialError> {
        let before = self.notifications.len();
        self.notifications
            .retain(|n| n.notification_id != notification_id);

        if self.notifications.len() == before {
            Err(SocialError::not_found("Notification not found"))
        } else {
            self.updated_at = now;
            Ok(())
        }
    }

    pub fn unread_count(&self) -> u64 {
        self.notifications.iter().filter(|n| !n.is_read).count() as u64
    }

    pub fn page(&self, request: &PageRequest) -> NotificationsPage {
        let (notifications, pagination) = crate::common::paginate(&self.notifications, request);

        NotificationsPage {
            notifications,
            unread_count: self.unread_count(),
            pagination,
        }
    }
}

/// Best-effort fan-out of a notification to its recipient's inbox.
///
/// Never fails the calling operation: self notifications are dropped here and
/// delivery is fire-and-forget.
pub fn notify(notification: NewNotification) {
    if notification.is_self_notification() {
        log::warn!(
            recipient = notification.recipient_id.as_str(),
            notification_type = notification.notification_type.to_string().as_str();
            "notify - dropping self notification"
        );
        return;
    }

    log::info!(
        recipient = notification.recipient_id.as_str(),
        sender = notification.sender_id.as_str(),
        notification_type = notification.notification_type.to_string().as_str();
        "notify"
    );

    NotificationsAgentClient::get(notification.recipient_id.clone())
        .trigger_add_notification(notification);
}

#[agent_definition]
trait NotificationsAgent {
    fn new(id: String) -> Self;

    fn get_notifications(&self, page: Option<u32>, limit: Option<u32>) -> NotificationsPage;

    fn get_unread_count(&self) -> u64;

    fn add_notification(&mut self, notification: NewNotification) -> Option<Notification>;

    fn mark_as_read(&mut self, notification_id: String) -> Result<Notification, SocialError>;

    fn mark_all_as_read(&mut self) -> u64;

    fn delete_notification(&mut self, notification_id: String) -> Result<(), SocialError>;
}

struct NotificationsAgentImpl {
    _id: String,
    state: Option<Inbox>,
}

impl NotificationsAgentImpl {
    fn get_state(&mut self) -> &mut Inbox {
        self.state.get_or_insert(Inbox::new(self._id.clone()))
    }

    fn with_state<T>(&mut self, f: impl FnOnce(&mut Inbox) -> T) -> T {
        f(self.get_state())
    }
}

#[agent_implementation]
impl NotificationsAgent for NotificationsAgentImpl {
    fn new(id: String) -> Self {
        NotificationsAgentImpl {
            _id: id,
            state: None,
        }
    }

    fn get_notifications(&self, page: Option<u32>, limit: Option<u32>) -> NotificationsPage {
        let request =
            PageRequest::with_default_limit(page, limit, NOTIFICATIONS_DEFAULT_LIMIT);

        match &self.state {
            Some(state) => state.page(&request),
            None => NotificationsPage {
                notifications: vec![],
                unread_count: 0,
                pagination: request.pagination(0),
            },
        }
    }

    fn get_unread_count(&self) -> u64 {
        self.state.as_ref().map(|s| s.unread_count()).unwrap_or(0)
    }

    fn add_notification(&mut self, notification: NewNotification) -> Option<Notification> {
        self.with_state(|state| {
            log::info!(
                "add notification - recipient id: {}, sender id: {}, type: {}",
                state.user_id,
                notification.sender_id,
                notification.notification_type
            );
            state.add(notification, chrono::Utc::now())
        })
    }

    fn mark_as_read(&mut self, notification_id: String) -> Result<Notification, SocialError> {
        match self.state.as_mut() {
            Some(state) => {
                log::info!("mark as read - notification id: {notification_id}");
                state.mark_as_read(&notification_id, chrono::Utc::now())
            }
            None => Err(SocialError::not_found("Notification not found")),
        }
    }

    fn mark_all_as_read(&mut self) -> u64 {
        match self.state.as_mut() {
            Some(state) => {
                let modified = state.mark_all_as_read(chrono::Utc::now());
                log::info!("mark all as read - user id: {}, modified: {modified}", state.user_id);
                modified
            }
            None => 0,
        }
    }

    fn delete_notification(&mut self, notification_id: String) -> Result<(), SocialError> {
        match self.state.as_mut() {
            Some(state) => {
                log::info!("delete notification - notification id: {notification_id}");
                state.delete(&notification_id, chrono::Utc::now())
            }
            None => Err(SocialError::not_found("Notification not found")),
        }
    }

    async fn load_snapshot(&mut self, bytes: Vec<u8>) -> Result<(), String> {
        let data: Option<Inbox> = crate::common::snapshot::deserialize(&bytes)?;
        self.state = data;
        Ok(())
    }

    async fn save_snapshot(&self) -> Result<Vec<u8>, String> {
        crate::common::snapshot::serialize(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;

    fn inbox(user_id: &str) -> Inbox {
        Inbox::new(user_id.to_string())
    }

    #[test]
    fn test_self_notifications_are_never_stored() {
        let mut inbox = inbox("bob");
        let stored = inbox.add(
            NewNotification::like("bob".to_string(), "bob".to_string(), "p1".to_string()),
            chrono::Utc::now(),
        );
        assert!(stored.is_none());
        assert!(inbox.notifications.is_empty());
        assert!(NewNotification::follow("a".to_string(), "a".to_string()).is_self_notification());
    }

    #[test]
    fn test_misaddressed_notification_is_rejected() {
        let mut inbox = inbox("bob");
        let stored = inbox.add(
            NewNotification::follow("carol".to_string(), "alice".to_string()),
            chrono::Utc::now(),
        );
        assert!(stored.is_none());
        assert!(inbox.notifications.is_empty());
        assert_eq!(inbox.unread_count(), 0);
    }

    #[test]
    fn test_new_notifications_are_unread_and_newest_first() {
        let mut inbox = inbox("bob");
        let now = chrono::Utc::now();
        inbox.add(NewNotification::follow("bob".to_string(), "alice".to_string()), now);
        let like = inbox
            .add(
                NewNotification::like("bob".to_string(), "alice".to_string(), "p1".to_string()),
                now + chrono::Duration::seconds(1),
            )
            .unwrap();

        assert!(!like.is_read);
        assert_eq!(like.notification_type, NotificationType::Like);
        assert_eq!(like.message, "liked your post");
        assert_eq!(inbox.notifications[0].notification_id, like.notification_id);
        assert_eq!(inbox.unread_count(), 2);
    }

    #[test]
    fn test_read_state_transitions() {
        let mut inbox = inbox("bob");
        let now = chrono::Utc::now();
        let first = inbox
            .add(NewNotification::follow("bob".to_string(), "alice".to_string()), now)
            .unwrap();
        inbox.add(NewNotification::follow("bob".to_string(), "carol".to_string()), now);

        let read = inbox.mark_as_read(&first.notification_id, now).unwrap();
        assert!(read.is_read);
        assert_eq!(inbox.unread_count(), 1);

        assert_eq!(inbox.mark_all_as_read(now), 1);
        assert_eq!(inbox.unread_count(), 0);
        assert_eq!(inbox.mark_all_as_read(now), 0);
    }

    #[test]
    fn test_foreign_notifications_are_not_found() {
        let mut alice = inbox("alice");
        let mut bob = inbox("bob");
        let now = chrono::Utc::now();
        let n = bob
            .add(NewNotification::follow("bob".to_string(), "carol".to_string()), now)
            .unwrap();

        assert_eq!(
            alice.mark_as_read(&n.notification_id, now).unwrap_err().kind,
            ErrorKind::NotFound
        );
        assert!(alice.delete(&n.notification_id, now).is_err());

        bob.delete(&n.notification_id, now).unwrap();
        assert!(bob.notifications.is_empty());
    }

    #[test]
    fn test_page_reports_unread_count() {
        let mut inbox = inbox("bob");
        let now = chrono::Utc::now();
        for i in 0..5 {
            inbox.add(
                NewNotification::follow("bob".to_string(), format!("u{i}")),
                now + chrono::Duration::seconds(i),
            );
        }
        let page = inbox.page(&PageRequest::new(Some(2), Some(2)));
        assert_eq!(page.notifications.len(), 2);
        assert_eq!(page.notifications[0].sender_id, "u2");
        assert_eq!(page.unread_count, 5);
        assert_eq!(page.pagination.total_pages, 3);
    }
}
