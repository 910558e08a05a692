//! FIFO queue of placeholder identifiers awaiting their real identity.
//!
//! Every [`Account::open`](crate::Account::open) pushes the account's
//! current identifier before the open command is written. Each login
//! QR-code event pops the oldest entry and renames that account to the
//! event's `wechatId`. Correlation is purely by arrival order;
//! the QR event carries no request identifier.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::lock;

/// Pending placeholders, oldest first.
#[derive(Debug, Default)]
pub struct RebindQueue {
    /// Placeholders in push order.
    pending: Mutex<VecDeque<String>>,
}

impl RebindQueue {
    /// Enqueues a placeholder identifier.
    pub(crate) fn push(&self, placeholder: String) {
        lock(&self.pending).push_back(placeholder);
    }

    /// Takes the oldest placeholder, if any.
    pub(crate) fn pop(&self) -> Option<String> {
        lock(&self.pending).pop_front()
    }

    /// Number of opens still waiting for a QR-code event.
    pub(crate) fn len(&self) -> usize {
        lock(&self.pending).len()
    }
}
