//! Gamification: startup reconciliation with the remote profile, optimistic
//! XP/badge awards and their fire-and-forget persistence.

use std::sync::Arc;

use ei_core::badges::{BadgeId, newly_unlocked};
use ei_core::reconcile::{self, ReconcilePlan};
use ei_core::wire::GamificationUpdate;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::{ChatService, ClientError};
use crate::app::App;
use crate::view::{ChatView, ViewEvent};

/// Background worker that pushes gamification updates in the order they were
/// queued. Failures are logged and dropped; nothing is retried or rolled back.
pub struct GamificationSync {
    tx: Option<mpsc::UnboundedSender<GamificationUpdate>>,
    worker: Option<JoinHandle<()>>,
}

impl GamificationSync {
    pub fn spawn<S: ChatService>(service: Arc<S>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<GamificationUpdate>();
        let worker = tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                if let Err(err) = service.update_gamification(update.clone()).await {
                    tracing::warn!(error = %err, ?update, "gamification sync failed");
                }
            }
        });
        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    pub fn push(&self, update: GamificationUpdate) {
        if update.is_empty() {
            return;
        }
        let queued = self
            .tx
            .as_ref()
            .is_some_and(|tx| tx.send(update).is_ok());
        if !queued {
            tracing::warn!("gamification sync worker is gone, update dropped");
        }
    }

    pub async fn flush(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if let Err(err) = worker.await {
                tracing::warn!(error = %err, "gamification sync worker panicked");
            }
        }
    }
}

/// What startup reconciliation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No legacy copy; remote profile adopted as is.
    Unchanged,
    /// Legacy copy held nothing new and was deleted.
    ShadowDiscarded,
    /// Merged values pushed and the legacy copy deleted.
    Migrated,
    /// Push failed; merged values shown locally, legacy copy kept for the
    /// next start.
    MigrationDeferred,
}

impl<S: ChatService, V: ChatView> App<S, V> {
    /// Fetch the authoritative profile and fold in the legacy local copy
    /// exactly once.
    pub async fn reconcile(&mut self) -> Result<ReconcileOutcome, ClientError> {
        let profile = self.service.user_profile().await.map_err(|err| {
            tracing::warn!(error = %err, "profile fetch failed, treating as signed out");
            ClientError::AuthRequired
        })?;

        self.state.username = Some(profile.username.clone());
        self.state.subscription = profile.subscription_status;
        let remote = profile.gamification();
        for id in &remote.badges {
            if id.parse::<BadgeId>().is_err() {
                tracing::warn!(badge = %id, "profile holds a badge this client does not know");
            }
        }

        let shadow = self.store.legacy_shadow();
        let outcome = match reconcile::plan(&remote, shadow.as_ref()) {
            ReconcilePlan::Nothing => {
                self.state.gamification = remote;
                ReconcileOutcome::Unchanged
            }
            ReconcilePlan::DiscardShadow => {
                self.state.gamification = remote;
                self.store.clear_legacy_shadow();
                self.store.flush();
                ReconcileOutcome::ShadowDiscarded
            }
            ReconcilePlan::Migrate { merged, update } => {
                self.state.gamification = merged;
                match self.service.update_gamification(update).await {
                    Ok(()) => {
                        tracing::info!(
                            xp = self.state.gamification.xp,
                            badges = self.state.gamification.badges.len(),
                            "migrated local gamification into profile"
                        );
                        self.store.clear_legacy_shadow();
                        self.store.flush();
                        ReconcileOutcome::Migrated
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "gamification migration push failed, keeping local copy");
                        ReconcileOutcome::MigrationDeferred
                    }
                }
            }
        };
        Ok(outcome)
    }

    /// Add XP locally, announce a level-up, queue the remote update.
    pub fn award_xp(&mut self, amount: u64) {
        let award = self
            .state
            .gamification
            .add_xp(amount, &self.state.levels);
        if award.leveled_up() {
            tracing::debug!(level = award.level, "level up");
            self.view.emit(ViewEvent::LevelUp { level: award.level });
        }
        self.view.emit(ViewEvent::Progress {
            progress: self.state.progress(),
        });
        self.sync.push(GamificationUpdate::xp(award.xp));
        self.evaluate_badges();
    }

    /// Unlock badges locally and queue the remote update. Returns the ids
    /// that were actually new.
    pub fn award_badges(&mut self, ids: &[BadgeId]) -> Vec<BadgeId> {
        let added: Vec<BadgeId> = ids
            .iter()
            .copied()
            .filter(|id| self.state.gamification.badges.insert(id.as_str().to_string()))
            .collect();
        if added.is_empty() {
            return added;
        }
        for badge in &added {
            tracing::debug!(badge = %badge, "badge unlocked");
            self.view.emit(ViewEvent::BadgeUnlocked { badge: *badge });
        }
        self.sync
            .push(GamificationUpdate::badges(&self.state.gamification));
        added
    }

    /// Re-run every badge predicate over the current counters.
    pub fn evaluate_badges(&mut self) -> Vec<BadgeId> {
        let unlocked = newly_unlocked(
            &self.state.badge_counters(),
            &self.state.gamification.badges,
        );
        self.award_badges(&unlocked)
    }
}
