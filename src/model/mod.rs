pub mod attendance;
pub mod course_card;
pub mod resolved_course;
pub mod time_window;
pub mod user_info;
