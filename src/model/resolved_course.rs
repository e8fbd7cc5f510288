use serde::{Deserialize, Serialize};

use crate::model::time_window::TimeWindow;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCourse {
    pub name: String,
    pub window: TimeWindow,
    pub attendance_url: Option<String>,
    /// Page the card links to; the attendance form redirects back here.
    pub course_url: String,
}

impl ResolvedCourse {
    pub fn with_attendance_url(self, attendance_url: Option<String>) -> Self {
        ResolvedCourse {
            attendance_url,
            ..self
        }
    }
}

/// Outcome of one resolution pass.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Active(ResolvedCourse),
    Upcoming(ResolvedCourse),
    NoCourse,
}

impl Resolution {
    pub fn course(&self) -> Option<&ResolvedCourse> {
        match self {
            Resolution::Active(course) | Resolution::Upcoming(course) => Some(course),
            Resolution::NoCourse => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Resolution::Active(_))
    }
}
