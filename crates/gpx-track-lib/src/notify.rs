//! User-facing notifications

/// Receiver of user-facing messages; presentation is entirely up to the implementor
pub trait NotificationSink {
    fn notify_success(&mut self, message: &str);
    fn notify_error(&mut self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Error(String),
}

impl Notification {
    #[inline]
    pub fn message(&self) -> &str {
        match self {
            Self::Success(message) | Self::Error(message) => message,
        }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Sink that keeps every notification in arrival order
#[derive(Debug, Clone, Default)]
pub struct Notifications {
    entries: Vec<Notification>,
}

impl Notifications {
    #[inline]
    pub fn entries(&self) -> &[Notification] {
        &self.entries
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|n| n.is_error())
            .map(Notification::message)
    }

    pub fn successes(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|n| !n.is_error())
            .map(Notification::message)
    }

    /// Take all notifications received so far
    pub fn drain(&mut self) -> impl Iterator<Item = Notification> + '_ {
        self.entries.drain(..)
    }
}

impl NotificationSink for Notifications {
    fn notify_success(&mut self, message: &str) {
        self.entries.push(Notification::Success(message.to_string()));
    }

    fn notify_error(&mut self, message: &str) {
        self.entries.push(Notification::Error(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifications_keep_order() {
        let mut sink = Notifications::default();
        sink.notify_success("a loaded");
        sink.notify_error("b failed");
        sink.notify_success("c loaded");

        assert_eq!(sink.successes().collect::<Vec<_>>(), ["a loaded", "c loaded"]);
        assert_eq!(sink.errors().collect::<Vec<_>>(), ["b failed"]);

        let drained: Vec<Notification> = sink.drain().collect();
        assert_eq!(drained.len(), 3);
        assert!(drained[1].is_error());
        assert!(sink.entries().is_empty());
    }
}
