use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use regex::Regex;
use scraper::{Html, Selector};

use crate::core::time_range::parse_time_range;
use crate::error::lms::CardFault;
use crate::model::course_card::CourseCard;
use crate::model::resolved_course::{Resolution, ResolvedCourse};
use crate::model::time_window::TimeWindow;

pub const UNKNOWN_COURSE: &str = "unknown course";

static COURSE_VIEW_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"course/view\.php\?id=\d+").unwrap());

/// Immutable knobs handed to the resolver, derived from `config.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverSettings {
    /// A card counts only if its attendance label contains one of these.
    pub attendance_titles: Vec<String>,
    /// Period start times that get the early check-in grace.
    pub timetable: Vec<NaiveTime>,
    pub early_check_in: TimeDelta,
    pub skip_already_attended: bool,
    /// Upcoming cards must carry an allow-listed label too.
    pub upcoming_requires_title: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        ResolverSettings {
            attendance_titles: Vec::new(),
            timetable: Vec::new(),
            early_check_in: TimeDelta::minutes(5),
            skip_already_attended: false,
            upcoming_requires_title: false,
        }
    }
}

/// A named way of finding a card's time text.
#[derive(Clone, Copy)]
pub struct TimeTextSource {
    pub name: &'static str,
    pub extract: fn(&Html) -> Option<String>,
}

impl std::fmt::Debug for TimeTextSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

fn text_of_first(fragment: &Html, selector: &Selector) -> Option<String> {
    fragment
        .select(selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
}

fn dimmed_text(fragment: &Html) -> Option<String> {
    text_of_first(fragment, selector!(".dimmed_text"))
}

fn col_11(fragment: &Html) -> Option<String> {
    text_of_first(fragment, selector!(".col-11"))
}

fn test_class(fragment: &Html) -> Option<String> {
    text_of_first(fragment, selector!(".test"))
}

pub const DEFAULT_TIME_SOURCES: &[TimeTextSource] = &[
    TimeTextSource { name: "dimmed_text", extract: dimmed_text },
    TimeTextSource { name: "col-11", extract: col_11 },
    TimeTextSource { name: "test", extract: test_class },
];

/// Answers whether the learner is already marked present for a course.
pub trait AttendanceLedger {
    fn is_attended(&self, course: &ResolvedCourse) -> bool;
}

/// Ledger for callers that never check prior attendance.
pub struct NoneAttended;

impl AttendanceLedger for NoneAttended {
    fn is_attended(&self, _course: &ResolvedCourse) -> bool {
        false
    }
}

/// Course URLs known to be attended already.
impl AttendanceLedger for HashSet<String> {
    fn is_attended(&self, course: &ResolvedCourse) -> bool {
        self.contains(&course.course_url)
    }
}

/// Everything the resolver reads off a single card.
#[derive(Debug, Clone)]
struct CardReading {
    course: ResolvedCourse,
    label: String,
}

pub struct CourseWindowResolver {
    settings: ResolverSettings,
    time_sources: Vec<TimeTextSource>,
}

impl CourseWindowResolver {
    pub fn new(settings: ResolverSettings) -> Self {
        CourseWindowResolver {
            settings,
            time_sources: DEFAULT_TIME_SOURCES.to_vec(),
        }
    }

    pub fn with_time_sources(mut self, sources: Vec<TimeTextSource>) -> Self {
        self.time_sources = sources;
        self
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn parse_time_range(&self, text: &str, now: NaiveDateTime) -> TimeWindow {
        parse_time_range(
            text,
            now.date(),
            &self.settings.timetable,
            self.settings.early_check_in,
        )
    }

    /// Picks the first active card, else the soonest upcoming one.
    pub fn resolve<L>(&self, cards: &[CourseCard], now: NaiveDateTime, ledger: &L) -> Resolution
    where
        L: AttendanceLedger + ?Sized,
    {
        let mut upcoming: Option<ResolvedCourse> = None;

        for card in cards {
            let reading = self.read_card(card, now);

            if self.is_active(&reading, now) {
                if self.settings.skip_already_attended && ledger.is_attended(&reading.course) {
                    log::debug!("{} is already attended, skipping", reading.course.name);
                    continue;
                }
                return Resolution::Active(reading.course);
            }

            if reading.course.window.starts_after(now)
                && (!self.settings.upcoming_requires_title || self.has_title(&reading))
            {
                let earlier = match &upcoming {
                    Some(best) => reading.course.window.start < best.window.start,
                    None => true,
                };
                if earlier {
                    upcoming = Some(reading.course);
                }
            }
        }

        match upcoming {
            Some(course) => Resolution::Upcoming(course),
            None => Resolution::NoCourse,
        }
    }

    /// Cards that would resolve as active, in card order. Callers use this
    /// to decide which attendance pages to check before `resolve`.
    pub fn active_candidates(&self, cards: &[CourseCard], now: NaiveDateTime) -> Vec<ResolvedCourse> {
        cards
            .iter()
            .map(|card| self.read_card(card, now))
            .filter(|reading| self.is_active(reading, now))
            .map(|reading| reading.course)
            .collect()
    }

    fn is_active(&self, reading: &CardReading, now: NaiveDateTime) -> bool {
        reading.course.window.contains(now) && self.has_title(reading)
    }

    fn has_title(&self, reading: &CardReading) -> bool {
        self.settings
            .attendance_titles
            .iter()
            .filter(|title| !title.is_empty())
            .any(|title| reading.label.contains(title.as_str()))
    }

    fn read_card(&self, card: &CourseCard, now: NaiveDateTime) -> CardReading {
        let fragment = card.fragment();
        let name = extract_course_name(&fragment);

        let window = match self.time_text(&fragment) {
            Some(text) => {
                let window = self.parse_time_range(&text, now);
                if !window.is_valid() {
                    log::debug!("{name}: {}", CardFault::ParseFailure(text));
                }
                window
            }
            None => {
                log::debug!("{name}: {}", CardFault::MissingField("time text"));
                TimeWindow::empty()
            }
        };

        let label = text_of_first(&fragment, selector!("h3.name")).unwrap_or_else(|| {
            log::debug!("{name}: {}", CardFault::MissingField("attendance label"));
            String::new()
        });

        let course_url = fragment
            .select(selector!("a.card-link"))
            .chain(fragment.select(selector!("a[href]")).filter(|link| {
                link.value()
                    .attr("href")
                    .is_some_and(|href| COURSE_VIEW_HREF.is_match(href))
            }))
            .find_map(|link| link.value().attr("href"))
            .unwrap_or_default()
            .to_string();

        CardReading {
            course: ResolvedCourse {
                name,
                window,
                attendance_url: None,
                course_url,
            },
            label,
        }
    }

    fn time_text(&self, fragment: &Html) -> Option<String> {
        self.time_sources.iter().find_map(|source| {
            let text = (source.extract)(fragment)?;
            log::trace!("time text from {}: {text:?}", source.name);
            Some(text)
        })
    }
}

/// Text of the first link pointing at a course page, or [`UNKNOWN_COURSE`].
pub fn extract_course_name(fragment: &Html) -> String {
    fragment
        .select(selector!("a[href]"))
        .find(|link| {
            link.value()
                .attr("href")
                .is_some_and(|href| COURSE_VIEW_HREF.is_match(href))
        })
        .map(|link| link.text().collect::<String>().trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| {
            log::debug!("{}", CardFault::MissingField("course link"));
            UNKNOWN_COURSE.to_string()
        })
}
