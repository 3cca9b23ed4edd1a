//! One-time migration of the legacy local gamification copy into the remote
//! profile.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::gamification::GamificationState;
use crate::wire::GamificationUpdate;

/// XP and badges that older clients kept only in local storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyShadow {
    pub xp: Option<u64>,
    pub badges: Vec<String>,
}

/// What startup has to do with the shadow copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcilePlan {
    /// No shadow present; remote is used as is.
    Nothing,
    /// Shadow holds nothing remote lacks; delete it without pushing.
    DiscardShadow,
    /// Push the merged state once, then delete the shadow.
    Migrate {
        merged: GamificationState,
        update: GamificationUpdate,
    },
}

/// Decide how to fold `shadow` into `remote`.
///
/// Merge rule: `max(xp)` and union of badges. Remote values are never lowered.
pub fn plan(remote: &GamificationState, shadow: Option<&LegacyShadow>) -> ReconcilePlan {
    let Some(shadow) = shadow else {
        return ReconcilePlan::Nothing;
    };

    let shadow_xp = shadow.xp.unwrap_or(0);
    let shadow_badges: BTreeSet<&str> = shadow.badges.iter().map(String::as_str).collect();
    let extra_badges = shadow_badges
        .iter()
        .any(|id| !remote.badges.contains(*id));

    if shadow_xp <= remote.xp && !extra_badges {
        return ReconcilePlan::DiscardShadow;
    }

    let mut merged = remote.clone();
    merged.xp = merged.xp.max(shadow_xp);
    merged.add_badges(shadow.badges.iter().cloned());

    let update = GamificationUpdate {
        xp: (merged.xp != remote.xp).then_some(merged.xp),
        badges: extra_badges.then(|| merged.badges.iter().cloned().collect()),
    };

    ReconcilePlan::Migrate { merged, update }
}
