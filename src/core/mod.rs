pub mod html_parser;
pub mod lms;
pub mod notifier;
pub mod poller;
pub mod resolver;
pub mod submitter;
pub mod time_range;
