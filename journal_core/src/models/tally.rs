//! Vote counting for policy proposals.
//!
//! There is no quorum: whoever has voted decides, and the
//! first decisive vote resolves the proposal. Ties (including no votes at
//! all) wait for the deliberation window to run out and then count as
//! consent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{policy_proposal::ProposalStatus, policy_vote::VoteChoice};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub approve: u64,
    pub reject: u64,
}

impl Tally {
    pub fn record(&mut self, vote: VoteChoice) {
        match vote {
            VoteChoice::Approve => self.approve += 1,
            VoteChoice::Reject => self.reject += 1,
        }
    }

    /// Terminal status this tally yields at `now`, or `None` while the
    /// proposal must stay pending.
    pub fn outcome(
        &self,
        now: DateTime<Utc>,
        auto_approval_date: DateTime<Utc>,
    ) -> Option<ProposalStatus> {
        if self.approve > self.reject {
            Some(ProposalStatus::Approved)
        } else if self.reject > self.approve {
            Some(ProposalStatus::Rejected)
        } else if now >= auto_approval_date {
            Some(ProposalStatus::AutoApproved)
        } else {
            None
        }
    }
}

impl FromIterator<VoteChoice> for Tally {
    fn from_iter<I: IntoIterator<Item = VoteChoice>>(iter: I) -> Self {
        let mut tally = Tally::default();
        for vote in iter {
            tally.record(vote);
        }
        tally
    }
}
