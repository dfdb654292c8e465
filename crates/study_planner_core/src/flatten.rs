//! crates/study_planner_core/src/flatten.rs
//!
//! Turns roadmaps into one ordered run of study units:
//! roadmap (input order) → course (position) → lesson (order) → section (order).

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::domain::{CourseSummary, LessonSummary, Reference, RoadmapOutline, StudyUnit};
use crate::ports::{CurriculumService, PortError, PortResult};

/// Duration used for sections the catalogue has no estimate for.
pub const DEFAULT_SECTION_MINUTES: u32 = 15;

#[derive(Debug, Clone, Copy)]
pub struct FlattenOptions {
    pub default_section_minutes: u32,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            default_section_minutes: DEFAULT_SECTION_MINUTES,
        }
    }
}

/// Loads every roadmap from the catalogue and flattens them.
///
/// Roadmaps the catalogue does not know are logged and skipped; any other
/// catalogue failure aborts.
pub async fn flatten_roadmaps(
    curriculum: &dyn CurriculumService,
    roadmap_ids: &[String],
    options: &FlattenOptions,
) -> PortResult<Vec<StudyUnit>> {
    let mut seen = HashSet::new();
    let mut outlines = Vec::with_capacity(roadmap_ids.len());
    for roadmap_id in roadmap_ids {
        if !seen.insert(roadmap_id.as_str()) {
            debug!(roadmap_id = %roadmap_id, "Skipping repeated roadmap id");
            continue;
        }
        match curriculum.load_roadmap(roadmap_id).await {
            Ok(outline) => outlines.push(outline),
            Err(PortError::NotFound(reason)) => {
                warn!(roadmap_id = %roadmap_id, %reason, "Roadmap not found; it contributes no units");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(flatten_outlines(&outlines, options))
}

/// Flattens already loaded roadmaps. Sections reachable through more than
/// one roadmap are kept at their first position only.
pub fn flatten_outlines(roadmaps: &[RoadmapOutline], options: &FlattenOptions) -> Vec<StudyUnit> {
    let mut units = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for roadmap in roadmaps {
        if roadmap.courses.is_empty() {
            warn!(roadmap_id = %roadmap.id, "Roadmap has no courses");
        }
        let mut courses: Vec<_> = roadmap.courses.iter().collect();
        courses.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));

        for course in courses {
            let course_ref = Reference::Populated(CourseSummary {
                id: course.id.clone(),
                title: course.title.clone(),
            });
            let mut lessons: Vec<_> = course.lessons.iter().collect();
            lessons.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
            if lessons.is_empty() {
                warn!(course_id = %course.id, "Course has no lessons");
            }

            for lesson in lessons {
                let lesson_ref = Reference::Populated(LessonSummary {
                    id: lesson.id.clone(),
                    title: lesson.title.clone(),
                });
                let mut sections: Vec<_> = lesson.sections.iter().collect();
                sections.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
                if sections.is_empty() {
                    warn!(lesson_id = %lesson.id, "Lesson has no sections");
                }

                for section in sections {
                    if !seen.insert((lesson.id.clone(), section.id.clone())) {
                        debug!(lesson_id = %lesson.id, section_id = %section.id, "Section already scheduled");
                        continue;
                    }
                    let minutes = section
                        .duration_minutes
                        .filter(|m| *m > 0)
                        .unwrap_or(options.default_section_minutes);
                    units.push(StudyUnit {
                        course: course_ref.clone(),
                        lesson: lesson_ref.clone(),
                        section_id: section.id.clone(),
                        skill: section.skill.clone().or_else(|| lesson.skill.clone()),
                        estimated_duration_minutes: minutes,
                        order_index: units.len() as u32,
                    });
                }
            }
        }
    }
    units
}
