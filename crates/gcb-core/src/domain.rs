/// Placeholder used whenever the feed carries no reward text for a code.
pub const REWARDS_UNKNOWN: &str = "Rewards unknown";

/// Telegram chat id (numeric). Used as the delivery destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a sent message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// One entry of a feed snapshot.
///
/// `rewards` is always populated: the feed client substitutes
/// [`REWARDS_UNKNOWN`] for missing or blank reward text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeEntry {
    pub code: String,
    pub rewards: String,
}

impl CodeEntry {
    pub fn new(code: impl Into<String>, rewards: Option<&str>) -> Self {
        let rewards = match rewards.map(str::trim) {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => REWARDS_UNKNOWN.to_string(),
        };
        Self {
            code: code.into(),
            rewards,
        }
    }
}
