//! Penalty decisions handed down when a debate closes.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::member_penalty::PenaltyType;

/// What an admin decides when closing a debate.
///
/// The persisted form on `comment_debate.penalty` is the short string
/// encoding (`warning`, `mute_7d`, `ban`, `ban_30d`, `dismissed`), produced
/// by `Display` and read back by `FromStr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PenaltyDecision {
    Warning,
    Mute { days: u32 },
    /// `days: None` is a permanent ban.
    Ban { days: Option<u32> },
    Dismissed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PenaltyParseError {
    #[error("unknown penalty `{0}`")]
    Unknown(String),
    #[error("invalid penalty duration in `{0}`")]
    InvalidDuration(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PenaltyDurationError {
    #[error("a mute needs a duration of at least one day")]
    MuteWithoutDuration,
    #[error("a warning carries no duration")]
    WarningWithDuration,
    #[error("penalty duration must be at least one day")]
    ZeroDuration,
    #[error("penalty duration must be at most {MAX_PENALTY_DAYS} days")]
    TooLong,
}

/// Longest timed penalty; anything longer should be a permanent ban.
pub const MAX_PENALTY_DAYS: u32 = 36_500;

impl PenaltyDecision {
    /// The ledger entry this decision produces, if any.
    pub fn penalty_type(&self) -> Option<PenaltyType> {
        match self {
            PenaltyDecision::Warning => Some(PenaltyType::Warning),
            PenaltyDecision::Mute { .. } => Some(PenaltyType::Mute),
            PenaltyDecision::Ban { .. } => Some(PenaltyType::Ban),
            PenaltyDecision::Dismissed => None,
        }
    }

    pub fn duration_days(&self) -> Option<u32> {
        match self {
            PenaltyDecision::Mute { days } => Some(*days),
            PenaltyDecision::Ban { days } => *days,
            PenaltyDecision::Warning | PenaltyDecision::Dismissed => None,
        }
    }
}

impl fmt::Display for PenaltyDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PenaltyDecision::Warning => write!(f, "warning"),
            PenaltyDecision::Mute { days } => write!(f, "mute_{days}d"),
            PenaltyDecision::Ban { days: None } => write!(f, "ban"),
            PenaltyDecision::Ban { days: Some(days) } => write!(f, "ban_{days}d"),
            PenaltyDecision::Dismissed => write!(f, "dismissed"),
        }
    }
}

impl FromStr for PenaltyDecision {
    type Err = PenaltyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fn days(raw: &str, whole: &str) -> Result<u32, PenaltyParseError> {
            raw.strip_suffix('d')
                .and_then(|n| n.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .ok_or_else(|| PenaltyParseError::InvalidDuration(whole.to_string()))
        }

        match s {
            "warning" => Ok(PenaltyDecision::Warning),
            "dismissed" => Ok(PenaltyDecision::Dismissed),
            "ban" => Ok(PenaltyDecision::Ban { days: None }),
            _ => {
                if let Some(rest) = s.strip_prefix("mute_") {
                    Ok(PenaltyDecision::Mute { days: days(rest, s)? })
                } else if let Some(rest) = s.strip_prefix("ban_") {
                    Ok(PenaltyDecision::Ban { days: Some(days(rest, s)?) })
                } else {
                    Err(PenaltyParseError::Unknown(s.to_string()))
                }
            }
        }
    }
}

/// Checks the duration rules for a ledger entry: mutes are always timed,
/// warnings never are, bans may be permanent.
pub fn validate_duration(
    penalty_type: PenaltyType,
    duration_days: Option<u32>,
) -> Result<(), PenaltyDurationError> {
    match (penalty_type, duration_days) {
        (_, Some(0)) => Err(PenaltyDurationError::ZeroDuration),
        (_, Some(days)) if days > MAX_PENALTY_DAYS => Err(PenaltyDurationError::TooLong),
        (PenaltyType::Mute, None) => Err(PenaltyDurationError::MuteWithoutDuration),
        (PenaltyType::Warning, Some(_)) => Err(PenaltyDurationError::WarningWithDuration),
        _ => Ok(()),
    }
}

pub fn expires_at(issued_at: DateTime<Utc>, duration_days: Option<u32>) -> Option<DateTime<Utc>> {
    duration_days.map(|days| issued_at + Duration::days(i64::from(days)))
}

/// A penalty is in force until its expiry passes; no expiry means forever.
pub fn is_penalty_active(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expires_at {
        None => true,
        Some(expires_at) => expires_at > now,
    }
}
