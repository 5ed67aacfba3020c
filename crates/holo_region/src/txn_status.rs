//! Resolution state of a transactional lock.
//!
//! A lock probe answers with two integers, `ttl` and `commit_ts`:
//! - `ttl > 0`: the lock is still live; back off and probe again.
//! - `ttl == 0 && commit_ts == 0`: the lock was rolled back or removed.
//! - `ttl == 0 && commit_ts > 0`: the transaction committed at `commit_ts`.
//!
//! Both nonzero is not a valid answer. [`TxnStatusKind`] holds the three
//! states directly so that combination cannot be built; the two-field view is
//! kept for probe responses that still speak it.

use std::fmt;

use crate::error::{SplitError, SplitResult};

/// How the store arrived at a status. Advisory only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Action {
    NoAction,
    TtlExpireRollback,
    LockNotExistRollback,
    MinCommitTsPushed,
    TtlExpirePessimisticRollback,
    LockNotExistDoNothing,
    #[default]
    Unrecognized,
}

impl Action {
    /// Maps the probe response's numeric action code.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Action::NoAction,
            1 => Action::TtlExpireRollback,
            2 => Action::LockNotExistRollback,
            3 => Action::MinCommitTsPushed,
            4 => Action::TtlExpirePessimisticRollback,
            5 => Action::LockNotExistDoNothing,
            _ => Action::Unrecognized,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxnStatusKind {
    /// Lock not resolved yet; `ttl` is always nonzero.
    Locked { ttl: u64 },
    RolledBack,
    /// Committed; `commit_ts` is always nonzero.
    Committed { commit_ts: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxnStatus {
    kind: TxnStatusKind,
    action: Action,
}

impl Default for TxnStatus {
    /// No information yet: both fields zero, action unrecognized.
    fn default() -> Self {
        Self {
            kind: TxnStatusKind::RolledBack,
            action: Action::Unrecognized,
        }
    }
}

impl TxnStatus {
    /// Still locked with `ttl` remaining. A zero `ttl` reads as rolled back.
    pub fn locked(ttl: u64) -> Self {
        let kind = if ttl == 0 {
            TxnStatusKind::RolledBack
        } else {
            TxnStatusKind::Locked { ttl }
        };
        Self {
            kind,
            action: Action::Unrecognized,
        }
    }

    /// Decodes the two-field form.
    pub fn from_parts(ttl: u64, commit_ts: u64) -> SplitResult<Self> {
        Self::with_action(ttl, commit_ts, Action::Unrecognized)
    }

    /// Decodes the two-field form along with the probe's action.
    pub fn with_action(ttl: u64, commit_ts: u64, action: Action) -> SplitResult<Self> {
        let kind = match (ttl, commit_ts) {
            (0, 0) => TxnStatusKind::RolledBack,
            (0, commit_ts) => TxnStatusKind::Committed { commit_ts },
            (ttl, 0) => TxnStatusKind::Locked { ttl },
            (ttl, commit_ts) => {
                return Err(SplitError::invariant(format!(
                    "lock status with ttl {ttl} and commit_ts {commit_ts} both set"
                )))
            }
        };
        Ok(Self { kind, action })
    }

    pub fn kind(&self) -> TxnStatusKind {
        self.kind
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn ttl(&self) -> u64 {
        match self.kind {
            TxnStatusKind::Locked { ttl } => ttl,
            _ => 0,
        }
    }

    pub fn commit_ts(&self) -> u64 {
        match self.kind {
            TxnStatusKind::Committed { commit_ts } => commit_ts,
            _ => 0,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self.kind, TxnStatusKind::Committed { .. })
    }

    /// Updates `ttl`, keeping `commit_ts`. Rejects setting both nonzero.
    pub fn set_ttl(&mut self, ttl: u64) -> SplitResult<()> {
        *self = Self::with_action(ttl, self.commit_ts(), self.action)?;
        Ok(())
    }

    /// Updates `commit_ts`, keeping `ttl`. Rejects setting both nonzero.
    pub fn set_commit_ts(&mut self, commit_ts: u64) -> SplitResult<()> {
        *self = Self::with_action(self.ttl(), commit_ts, self.action)?;
        Ok(())
    }

    pub fn set_action(&mut self, action: Action) {
        self.action = action;
    }
}

impl fmt::Display for TxnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TxnStatusKind::Locked { ttl } => write!(f, "locked(ttl={ttl})")?,
            TxnStatusKind::RolledBack => f.write_str("rolled back")?,
            TxnStatusKind::Committed { commit_ts } => write!(f, "committed(ts={commit_ts})")?,
        }
        write!(f, " action={:?}", self.action)
    }
}
