use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// XP granted for every applied chat reply.
pub const XP_PER_MESSAGE: u64 = 15;

/// XP needed to reach level `index + 1`.
pub const LEVEL_THRESHOLDS: [u64; 11] = [0, 100, 250, 500, 800, 1200, 1700, 2300, 3000, 4000, 5500];

/// Ascending XP threshold table. `T[0]` is always 0 so every XP value maps to
/// at least level 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelTable {
    thresholds: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelTableError {
    #[error("level table must not be empty")]
    Empty,
    #[error("level table must start at 0, got {0}")]
    NonZeroStart(u64),
    #[error("level thresholds must be strictly ascending (index {index})")]
    NotAscending { index: usize },
}

impl LevelTable {
    pub fn new(thresholds: Vec<u64>) -> Result<Self, LevelTableError> {
        match thresholds.first() {
            None => return Err(LevelTableError::Empty),
            Some(&first) if first != 0 => return Err(LevelTableError::NonZeroStart(first)),
            Some(_) => {}
        }
        if let Some(index) = thresholds.windows(2).position(|pair| pair[0] >= pair[1]) {
            return Err(LevelTableError::NotAscending { index: index + 1 });
        }
        Ok(Self { thresholds })
    }

    pub fn max_level(&self) -> u32 {
        self.thresholds.len() as u32
    }

    /// `1 + max{ i : T[i] <= xp }`, which is capped at the table length.
    pub fn level(&self, xp: u64) -> u32 {
        let reached = self.thresholds.partition_point(|&threshold| threshold <= xp);
        reached.max(1) as u32
    }

    /// XP at which `level` starts.
    pub fn level_start(&self, level: u32) -> u64 {
        let index = level.saturating_sub(1) as usize;
        self.thresholds.get(index).copied().unwrap_or(0)
    }

    /// XP needed to leave `level`, `None` at max level.
    pub fn next_threshold(&self, level: u32) -> Option<u64> {
        self.thresholds.get(level as usize).copied()
    }

    pub fn progress(&self, xp: u64) -> LevelProgress {
        let level = self.level(xp);
        match self.next_threshold(level) {
            None => LevelProgress {
                level,
                xp,
                next_level_xp: None,
                percent: 100,
            },
            Some(next) => {
                let start = self.level_start(level);
                let range = next - start;
                let into = xp.saturating_sub(start);
                let percent = if range == 0 {
                    100
                } else {
                    (into.saturating_mul(100) / range).min(100) as u8
                };
                LevelProgress {
                    level,
                    xp,
                    next_level_xp: Some(next),
                    percent,
                }
            }
        }
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            thresholds: LEVEL_THRESHOLDS.to_vec(),
        }
    }
}

/// Snapshot for the XP bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelProgress {
    pub level: u32,
    pub xp: u64,
    /// `None` once the last threshold is passed (shown as "MAX")
    pub next_level_xp: Option<u64>,
    /// Bar fill, 0..=100
    pub percent: u8,
}

impl LevelProgress {
    pub fn is_max(&self) -> bool {
        self.next_level_xp.is_none()
    }

    pub fn next_label(&self) -> String {
        match self.next_level_xp {
            Some(next) => next.to_string(),
            None => "MAX".to_string(),
        }
    }
}

/// Client-side projection of the profile's XP and badges. Level is never
/// stored, only derived from `xp`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamificationState {
    pub xp: u64,
    /// Badge wire ids. Ids this client does not know are kept so that pushing
    /// the set back does not drop them.
    pub badges: BTreeSet<String>,
}

/// Outcome of an XP award, used to drive notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpAward {
    pub previous_level: u32,
    pub level: u32,
    pub xp: u64,
}

impl XpAward {
    pub fn leveled_up(&self) -> bool {
        self.level > self.previous_level
    }
}

impl GamificationState {
    pub fn level(&self, table: &LevelTable) -> u32 {
        table.level(self.xp)
    }

    /// Additive only; XP never decreases.
    pub fn add_xp(&mut self, amount: u64, table: &LevelTable) -> XpAward {
        let previous_level = table.level(self.xp);
        self.xp = self.xp.saturating_add(amount);
        XpAward {
            previous_level,
            level: table.level(self.xp),
            xp: self.xp,
        }
    }

    /// Returns the ids that were not yet present.
    pub fn add_badges<I>(&mut self, ids: I) -> Vec<String>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        ids.into_iter()
            .map(Into::into)
            .filter(|id| self.badges.insert(id.clone()))
            .collect()
    }
}
