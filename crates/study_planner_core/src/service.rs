//! crates/study_planner_core/src/service.rs
//!
//! `ScheduleService` ties the planner's algorithms to the ports. Every
//! mutating operation runs under a per-user lock, so overlapping requests
//! from several tabs or devices are applied one after another.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{ConfigPatch, LearningSchedule, ProgressSummary, ScheduleConfig};
use crate::error::{ScheduleError, ScheduleResult};
use crate::flatten::{flatten_roadmaps, FlattenOptions};
use crate::packer;
use crate::ports::{Clock, CurriculumService, PortError, ScheduleStore};
use crate::progress::{self, CompletionOutcome};
use crate::rescheduler::{self, RescheduleReport, RescheduleTrigger};

/// Lock entries are pruned once the map grows past this many users.
const LOCK_PRUNE_THRESHOLD: usize = 1024;

/// Input for creating a schedule.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub roadmap_ids: Vec<String>,
    pub config: ScheduleConfig,
    pub auto_reschedule: bool,
}

#[derive(Default)]
struct UserLocks {
    slots: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl UserLocks {
    async fn acquire(&self, user_id: Uuid) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().await;
            if slots.len() >= LOCK_PRUNE_THRESHOLD {
                slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            }
            slots.entry(user_id).or_default().clone()
        };
        slot.lock_owned().await
    }
}

pub struct ScheduleService {
    store: Arc<dyn ScheduleStore>,
    curriculum: Arc<dyn CurriculumService>,
    clock: Arc<dyn Clock>,
    options: FlattenOptions,
    locks: UserLocks,
}

impl ScheduleService {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        curriculum: Arc<dyn CurriculumService>,
        clock: Arc<dyn Clock>,
        options: FlattenOptions,
    ) -> Self {
        Self {
            store,
            curriculum,
            clock,
            options,
            locks: UserLocks::default(),
        }
    }

    /// Flattens the roadmaps, packs them from the config's start date and
    /// stores the result. A user with an active schedule gets `AlreadyExists`.
    pub async fn create_schedule(
        &self,
        user_id: Uuid,
        request: NewSchedule,
    ) -> ScheduleResult<LearningSchedule> {
        if request.roadmap_ids.is_empty() {
            return Err(ScheduleError::InvalidRequest(
                "roadmap_ids must not be empty".to_string(),
            ));
        }
        request.config.validate()?;

        let _guard = self.locks.acquire(user_id).await;
        if self.store.find_by_user(user_id).await?.is_some() {
            return Err(ScheduleError::AlreadyExists(user_id));
        }

        let units =
            flatten_roadmaps(self.curriculum.as_ref(), &request.roadmap_ids, &self.options).await?;
        if units.is_empty() {
            warn!(%user_id, roadmaps = ?request.roadmap_ids, "Roadmaps resolved to no study units");
        }
        let mut lessons = packer::pack(&units, &request.config, request.config.start_date);
        packer::renumber_days(&mut lessons);

        let now = self.clock.now();
        let mut schedule = LearningSchedule {
            id: Uuid::new_v4(),
            user_id,
            roadmap_ids: request.roadmap_ids,
            config: request.config,
            scheduled_lessons: lessons,
            auto_reschedule: request.auto_reschedule,
            last_rescheduled_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        schedule.version = self.store.insert(&schedule).await.map_err(|e| match e {
            PortError::Conflict(_) => ScheduleError::AlreadyExists(user_id),
            other => other.into(),
        })?;

        info!(
            %user_id,
            schedule_id = %schedule.id,
            units = schedule.scheduled_lessons.len(),
            "Learning schedule created"
        );
        Ok(schedule)
    }

    pub async fn get_schedule(&self, user_id: Uuid) -> ScheduleResult<LearningSchedule> {
        self.store
            .find_by_user(user_id)
            .await?
            .ok_or(ScheduleError::NoActiveSchedule(user_id))
    }

    /// Marks one unit as completed. Completing it again changes nothing and
    /// still succeeds.
    pub async fn complete_lesson(
        &self,
        user_id: Uuid,
        lesson_id: &str,
        section_id: &str,
        actual_duration: Option<u32>,
    ) -> ScheduleResult<(LearningSchedule, CompletionOutcome)> {
        let _guard = self.locks.acquire(user_id).await;
        let mut schedule = self.get_schedule(user_id).await?;

        let outcome = progress::mark_completed(
            &mut schedule.scheduled_lessons,
            lesson_id,
            section_id,
            actual_duration,
            self.clock.now(),
        )?;
        if outcome == CompletionOutcome::AlreadyCompleted {
            info!(%user_id, lesson_id, section_id, "Unit already completed");
            return Ok((schedule, outcome));
        }

        self.save(&mut schedule).await?;
        info!(%user_id, lesson_id, section_id, "Unit completed");
        Ok((schedule, outcome))
    }

    /// Applies a settings update, then repacks future incomplete units if
    /// anything affecting capacity changed.
    pub async fn update_config(
        &self,
        user_id: Uuid,
        patch: ConfigPatch,
    ) -> ScheduleResult<(LearningSchedule, Option<RescheduleReport>)> {
        let _guard = self.locks.acquire(user_id).await;
        let mut schedule = self.get_schedule(user_id).await?;

        rescheduler::apply_config(&mut schedule, &patch)?;
        let report = patch.changes_capacity().then(|| {
            rescheduler::repack_future_units(
                &mut schedule,
                RescheduleTrigger::ConfigChange,
                self.clock.today(),
                self.clock.now(),
            )
        });

        self.save(&mut schedule).await?;
        Ok((schedule, report))
    }

    pub async fn reschedule(
        &self,
        user_id: Uuid,
        trigger: RescheduleTrigger,
    ) -> ScheduleResult<(LearningSchedule, RescheduleReport)> {
        let _guard = self.locks.acquire(user_id).await;
        let mut schedule = self.get_schedule(user_id).await?;

        let report = rescheduler::reschedule(
            &mut schedule,
            trigger,
            self.clock.today(),
            self.clock.now(),
        );
        if !report.skipped {
            self.save(&mut schedule).await?;
        }
        Ok((schedule, report))
    }

    pub async fn delete_schedule(&self, user_id: Uuid) -> ScheduleResult<()> {
        let _guard = self.locks.acquire(user_id).await;
        if !self.store.delete(user_id).await? {
            return Err(ScheduleError::NoActiveSchedule(user_id));
        }
        info!(%user_id, "Learning schedule deleted");
        Ok(())
    }

    pub async fn progress(&self, user_id: Uuid) -> ScheduleResult<ProgressSummary> {
        let schedule = self.get_schedule(user_id).await?;
        Ok(progress::summarize(
            &schedule.scheduled_lessons,
            &schedule.config,
            self.clock.today(),
        ))
    }

    async fn save(&self, schedule: &mut LearningSchedule) -> ScheduleResult<()> {
        schedule.updated_at = self.clock.now();
        schedule.version = self.store.update(schedule).await?;
        Ok(())
    }
}
