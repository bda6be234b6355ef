use std::sync::Arc;

use serde::Deserialize;

use crate::error::AppError;
use crate::firebase::RemoteStore;
use crate::models::{Course, Schedule};

/// Read-side access to the course catalog. Day filtering runs on the store;
/// free-text and time-of-day filtering run here on the fetched rows.
pub struct CatalogService {
    store: Arc<dyn RemoteStore>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SearchFilter {
    /// Day-of-week equality, applied server-side.
    pub day: Option<String>,
    /// Case-insensitive substring over course type and description.
    pub q: Option<String>,
    /// Earliest acceptable start time, "HH:MM".
    pub from: Option<String>,
    /// Latest acceptable start time, "HH:MM".
    pub to: Option<String>,
}

impl SearchFilter {
    fn is_empty(&self) -> bool {
        self.day.is_none() && self.q.is_none() && self.from.is_none() && self.to.is_none()
    }
}

impl CatalogService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn list_active_courses(&self) -> Result<Vec<Course>, AppError> {
        self.store.active_courses().await
    }

    /// All dated occurrences of a course, cancelled ones included. Callers
    /// wanting only bookable occurrences filter on `is_cancelled` themselves.
    pub async fn schedules_for_course(&self, course_id: i64) -> Result<Vec<Schedule>, AppError> {
        self.store.schedules_for_course(course_id).await
    }

    pub async fn search(&self, filter: &SearchFilter) -> Result<Vec<Course>, AppError> {
        if filter.is_empty() {
            return self.list_active_courses().await;
        }

        let mut courses = match &filter.day {
            Some(day) => self.store.courses_by_day(day).await?,
            None => self.store.active_courses().await?,
        };

        if let Some(query) = &filter.q {
            let needle = query.to_lowercase();
            courses.retain(|course| {
                course.course_type.to_lowercase().contains(&needle)
                    || course
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            });
        }

        if let Some(from) = &filter.from {
            courses.retain(|course| course.time.as_str() >= from.as_str());
        }
        if let Some(to) = &filter.to {
            courses.retain(|course| course.time.as_str() <= to.as_str());
        }

        Ok(courses)
    }
}
