//! Authorization gate for catalog-mutating actions.

use std::collections::HashSet;

/// Decides whether a Telegram user may add or edit catalog entries.
///
/// Membership is fixed at construction from configuration. Callers ask the
/// gate at every privileged step instead of remembering the answer in the
/// session.
#[derive(Debug, Clone, Default)]
pub struct AdminGate {
    admins: HashSet<u64>,
}

impl AdminGate {
    pub fn new(admins: impl IntoIterator<Item = u64>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }

    pub fn is_privileged(&self, user_id: u64) -> bool {
        self.admins.contains(&user_id)
    }

    pub fn len(&self) -> usize {
        self.admins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}
