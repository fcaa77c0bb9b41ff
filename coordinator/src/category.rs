use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::CoordinatorError;

/// Data categories the coordinator refreshes.
///
/// Declaration order is scheduling priority: portfolio is the most urgent,
/// AI the least (it is the slowest and most expensive upstream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Portfolio,
    Market,
    Ai,
}

/// Why a request was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// User-initiated; bypasses the rate gate and preempts scheduled work.
    Manual,
    /// Timer-driven refresh.
    Scheduled,
}

/// Priority of every manual request. Lower is more urgent.
pub const MANUAL_PRIORITY: u8 = 0;

impl Category {
    pub const ALL: [Category; 3] = [Category::Portfolio, Category::Market, Category::Ai];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Portfolio => "portfolio",
            Category::Market => "market",
            Category::Ai => "ai",
        }
    }

    /// Priority of a scheduled request for this category.
    pub fn scheduled_priority(self) -> u8 {
        match self {
            Category::Portfolio => 1,
            Category::Market => 2,
            Category::Ai => 3,
        }
    }

    pub fn priority(self, origin: Origin) -> u8 {
        match origin {
            Origin::Manual => MANUAL_PRIORITY,
            Origin::Scheduled => self.scheduled_priority(),
        }
    }

    /// Logical operation id used for deduplication, e.g. `market:manual`.
    pub fn request_id(self, origin: Origin) -> String {
        let suffix = match origin {
            Origin::Manual => "manual",
            Origin::Scheduled => "scheduled",
        };
        format!("{}:{}", self.as_str(), suffix)
    }

    pub fn cache_key(self) -> &'static str {
        match self {
            Category::Portfolio => "portfolio:snapshot",
            Category::Market => "market:quotes",
            Category::Ai => "ai:insight",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CoordinatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portfolio" => Ok(Category::Portfolio),
            "market" => Ok(Category::Market),
            "ai" | "ai-insights" | "insights" => Ok(Category::Ai),
            _ => Err(CoordinatorError::UnknownCategory(s.to_string())),
        }
    }
}
