use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

use crate::types::{RiskAssessment, RiskLabel};

/// A risk-bucket change, emitted exactly once per transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskTransition {
    pub from: Option<RiskLabel>,
    pub to: RiskLabel,
    pub score: u8,
    pub at_ms: i64,
}

/// Tracks the last seen +30 min risk bucket and emits on changes only.
/// Repeated reads in the same bucket are silent, whatever the score does
/// inside it.
pub struct RiskNotifier {
    last_bucket: Option<RiskLabel>,
    tx: mpsc::Sender<RiskTransition>,
}

impl RiskNotifier {
    pub fn new(tx: mpsc::Sender<RiskTransition>) -> Self {
        Self {
            last_bucket: None,
            tx,
        }
    }

    /// Feed one projected risk read. `None` (forecast unavailable) leaves
    /// the tracked bucket untouched so availability gaps never re-trigger.
    pub fn observe(&mut self, risk: Option<&RiskAssessment>, now_ms: i64) {
        let Some(risk) = risk else { return };
        if self.last_bucket == Some(risk.label) {
            return;
        }
        let transition = RiskTransition {
            from: self.last_bucket,
            to: risk.label,
            score: risk.score,
            at_ms: now_ms,
        };
        self.last_bucket = Some(risk.label);
        if let Err(err) = self.tx.try_send(transition) {
            warn!(error = %err, "risk transition dropped, channel full or closed");
        }
    }
}
