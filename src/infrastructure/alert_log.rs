// In-memory alert side channel
use crate::application::collaborators::{AlertSink, Severity};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub raised_at: DateTime<Utc>,
}

/// Keeps the most recent alerts, oldest dropped first.
#[derive(Debug)]
pub struct AlertLog {
    capacity: usize,
    alerts: Mutex<VecDeque<Alert>>,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            alerts: Mutex::new(VecDeque::new()),
        }
    }

    pub fn recent(&self) -> Vec<Alert> {
        self.alerts.lock().iter().cloned().collect()
    }
}

impl AlertSink for AlertLog {
    fn set(&self, title: &str, message: &str, severity: Severity) {
        match severity {
            Severity::Error => tracing::error!("{}: {}", title, message),
            Severity::Warning => tracing::warn!("{}: {}", title, message),
            Severity::Info => tracing::info!("{}: {}", title, message),
        }

        let mut alerts = self.alerts.lock();
        if alerts.len() == self.capacity {
            alerts.pop_front();
        }
        alerts.push_back(Alert {
            title: title.to_string(),
            message: message.to_string(),
            severity,
            raised_at: Utc::now(),
        });
    }
}
