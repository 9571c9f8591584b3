//! Usage Accounting
//!
//! `UsageRecorder` is the accounting collaborator a finished turn reports to.
//! `SessionUsageLedger` is the in-memory default, owned per orchestrator.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::session::UsageReport;

/// Key used for turns the backend did not assign a chat id to.
pub const UNASSIGNED_CHAT: &str = "unassigned";

#[async_trait]
pub trait UsageRecorder: Send + Sync {
    async fn record(&self, chat_id: Option<&str>, usage: &UsageReport);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTotals {
    pub turns: u32,
    pub cost: f64,
    pub tokens: u64,
}

#[derive(Debug, Default)]
pub struct SessionUsageLedger {
    totals: Mutex<HashMap<String, UsageTotals>>,
}

impl SessionUsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn totals(&self, chat_id: &str) -> Option<UsageTotals> {
        self.lock().get(chat_id).cloned()
    }

    /// Sum across every chat.
    pub fn session_totals(&self) -> UsageTotals {
        self.lock()
            .values()
            .fold(UsageTotals::default(), |acc, t| UsageTotals {
                turns: acc.turns + t.turns,
                cost: acc.cost + t.cost,
                tokens: acc.tokens + t.tokens,
            })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, UsageTotals>> {
        // A poisoned ledger still holds valid totals.
        self.totals.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl UsageRecorder for SessionUsageLedger {
    async fn record(&self, chat_id: Option<&str>, usage: &UsageReport) {
        let key = chat_id.unwrap_or(UNASSIGNED_CHAT).to_string();
        let mut totals = self.lock();
        let entry = totals.entry(key).or_default();
        entry.turns += 1;
        entry.cost += usage.cost_value();
        entry.tokens += usage.token_count();
        tracing::debug!(
            chat_id = chat_id.unwrap_or(UNASSIGNED_CHAT),
            cost = entry.cost,
            tokens = entry.tokens,
            "recorded turn usage"
        );
    }
}
