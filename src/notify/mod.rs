//! Best-effort user notification.
//!
//! Delivery to the chat platform is a collaborator behind the [`Notifier`]
//! trait; this module only owns the fan-out rules for mass notifications.

use std::time::Duration;

use tracing::{info, warn};

use crate::database::UserRecord;
use crate::error::WardenResult;

/// Delivers a message body to a single user, best effort.
pub trait Notifier: Send + Sync {
    fn deliver(
        &self,
        username: &str,
        body: &str,
    ) -> impl std::future::Future<Output = WardenResult<()>> + Send;
}

/// Notifier that only writes to the log. Stands in wherever no chat
/// platform is wired up.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn deliver(&self, username: &str, body: &str) -> WardenResult<()> {
        info!("notify @{}: {}", username, body);
        Ok(())
    }
}

/// Outcome of a mass notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl BroadcastReport {
    pub fn total(&self) -> u32 {
        self.sent + self.skipped + self.failed
    }
}

/// Send `body` to every recipient, one at a time.
///
/// Banned users are skipped and per-recipient failures are logged without
/// aborting the batch. `delay` spaces out deliveries to stay under
/// platform rate limits.
pub async fn broadcast<N: Notifier>(
    notifier: &N,
    recipients: &[UserRecord],
    body: &str,
    delay: Duration,
) -> BroadcastReport {
    let mut report = BroadcastReport {
        sent: 0,
        skipped: 0,
        failed: 0,
    };

    for user in recipients {
        if user.banned {
            report.skipped += 1;
            continue;
        }

        match notifier.deliver(&user.username, body).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                warn!("broadcast delivery to @{} failed: {}", user.username, e);
                report.failed += 1;
            }
        }

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    info!(
        "broadcast finished: {} sent, {} skipped, {} failed",
        report.sent, report.skipped, report.failed
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WardenError;
    use std::sync::Mutex;

    struct RecordingNotifier {
        delivered: Mutex<Vec<String>>,
        fail_for: Option<String>,
    }

    impl Notifier for RecordingNotifier {
        async fn deliver(&self, username: &str, _body: &str) -> WardenResult<()> {
            if self.fail_for.as_deref() == Some(username) {
                return Err(WardenError::External("unreachable".into()));
            }
            self.delivered.lock().unwrap().push(username.to_string());
            Ok(())
        }
    }

    fn user(username: &str, banned: bool) -> UserRecord {
        let mut record = UserRecord::new(username, 1, "Test");
        record.banned = banned;
        record
    }

    #[tokio::test]
    async fn test_broadcast_skips_banned_and_survives_failures() {
        let notifier = RecordingNotifier {
            delivered: Mutex::new(Vec::new()),
            fail_for: Some("carol".to_string()),
        };
        let recipients = vec![
            user("alice", false),
            user("bob", true),
            user("carol", false),
            user("dave", false),
        ];

        let report = broadcast(&notifier, &recipients, "hello", Duration::ZERO).await;

        assert_eq!(report.sent, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total(), 4);
        assert_eq!(
            *notifier.delivered.lock().unwrap(),
            vec!["alice".to_string(), "dave".to_string()]
        );
    }
}
