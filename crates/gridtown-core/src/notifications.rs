//! Player-facing message feed.
//!
//! Message text comes from the template table in `GameConfig`, so the
//! wording is data, not code. The feed is a bounded queue a client drains;
//! headless runs just see the log lines.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

use crate::events::NotificationEvent;
use crate::resources::{GameConfig, SimClock};

pub const FEED_CAP: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    PowerShortage,
    Blackout,
    StormDamage,
    Fire,
    Collapse,
    Abandonment,
    Bankruptcy,
    Milestone,
    Unlock,
    RepairComplete,
}

impl NotificationKind {
    /// Key into the template table
    pub fn key(&self) -> &'static str {
        match self {
            NotificationKind::PowerShortage => "power_shortage",
            NotificationKind::Blackout => "blackout",
            NotificationKind::StormDamage => "storm_damage",
            NotificationKind::Fire => "fire",
            NotificationKind::Collapse => "collapse",
            NotificationKind::Abandonment => "abandonment",
            NotificationKind::Bankruptcy => "bankruptcy",
            NotificationKind::Milestone => "milestone",
            NotificationKind::Unlock => "unlock",
            NotificationKind::RepairComplete => "repair_complete",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            NotificationKind::Blackout
            | NotificationKind::Collapse
            | NotificationKind::Bankruptcy => Severity::Critical,
            NotificationKind::PowerShortage
            | NotificationKind::StormDamage
            | NotificationKind::Fire
            | NotificationKind::Abandonment => Severity::Warning,
            NotificationKind::Milestone
            | NotificationKind::Unlock
            | NotificationKind::RepairComplete => Severity::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub severity: Severity,
    pub message: String,
    pub month: u64,
}

/// Bounded notification queue consumed by clients
#[derive(Resource, Debug, Default)]
pub struct NotificationFeed {
    entries: VecDeque<Notification>,
}

impl NotificationFeed {
    pub fn push(&mut self, notification: Notification) {
        if self.entries.len() >= FEED_CAP {
            self.entries.pop_front();
        }
        self.entries.push_back(notification);
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        self.entries.drain(..).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Formats pending notification events against the template table and
/// pushes them onto the feed
pub fn notification_system(
    mut events: EventReader<NotificationEvent>,
    mut feed: ResMut<NotificationFeed>,
    config: Res<GameConfig>,
    clock: Res<SimClock>,
) {
    for event in events.read() {
        let template = match config.notifications.get(event.kind.key()) {
            Some(template) => template.clone(),
            None => {
                log::warn!("No notification template for {:?}", event.kind);
                continue;
            }
        };

        let message = render_template(&template, event);
        let severity = event.kind.severity();

        match severity {
            Severity::Critical => log::warn!("[month {}] {}", clock.month, message),
            _ => log::info!("[month {}] {}", clock.month, message),
        }

        feed.push(Notification {
            id: Uuid::new_v4(),
            kind: event.kind,
            severity,
            message,
            month: clock.month,
        });
    }
}

fn render_template(template: &str, event: &NotificationEvent) -> String {
    let mut message = template.to_string();
    if let Some(target) = &event.target {
        message = message.replace("{target}", target);
    }
    if let Some(value) = event.value {
        message = message.replace("{value}", &value.to_string());
        message = message.replace("{ratio}", &value.to_string());
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::GridPos;

    #[test]
    fn test_template_rendering() {
        let event = NotificationEvent::new(NotificationKind::StormDamage)
            .with_target("Coal Plant")
            .at(GridPos::new(3, 4));
        assert_eq!(
            render_template("A storm damaged {target}", &event),
            "A storm damaged Coal Plant"
        );

        let event = NotificationEvent::new(NotificationKind::Milestone).with_value(500);
        assert_eq!(
            render_template("Reached {value} citizens", &event),
            "Reached 500 citizens"
        );
    }

    #[test]
    fn test_feed_is_bounded() {
        let mut feed = NotificationFeed::default();
        for i in 0..(FEED_CAP + 8) {
            feed.push(Notification {
                id: Uuid::new_v4(),
                kind: NotificationKind::Fire,
                severity: Severity::Warning,
                message: format!("fire {}", i),
                month: i as u64,
            });
        }
        assert_eq!(feed.len(), FEED_CAP);
        // Oldest entries were evicted
        assert_eq!(feed.iter().next().unwrap().month, 8);
    }

    #[test]
    fn test_drain_empties_feed() {
        let mut feed = NotificationFeed::default();
        feed.push(Notification {
            id: Uuid::new_v4(),
            kind: NotificationKind::Unlock,
            severity: Severity::Info,
            message: "School is now available".to_string(),
            month: 3,
        });
        let drained = feed.drain();
        assert_eq!(drained.len(), 1);
        assert!(feed.is_empty());
    }
}
