use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::core::lms::{AttendancePageInfo, AttendancePageSettings, Lms};
use crate::core::resolver::CourseWindowResolver;
use crate::error::lms::LmsError;
use crate::model::attendance::AttendanceStatus;
use crate::model::course_card::CourseCard;
use crate::model::resolved_course::{Resolution, ResolvedCourse};

/// The portal reads a poll needs.
#[async_trait]
pub trait CourseSource {
    async fn fetch_calendar_cards(&self) -> Result<Vec<CourseCard>, LmsError>;

    async fn inspect_attendance_page(
        &self,
        course: &ResolvedCourse,
        settings: &AttendancePageSettings,
        today: NaiveDate,
    ) -> Result<AttendancePageInfo, LmsError>;
}

#[async_trait]
impl CourseSource for Lms {
    async fn fetch_calendar_cards(&self) -> Result<Vec<CourseCard>, LmsError> {
        Lms::fetch_calendar_cards(self).await
    }

    async fn inspect_attendance_page(
        &self,
        course: &ResolvedCourse,
        settings: &AttendancePageSettings,
        today: NaiveDate,
    ) -> Result<AttendancePageInfo, LmsError> {
        Lms::inspect_attendance_page(self, course, settings, today).await
    }
}

/// One poll: fetch today's cards, check attendance pages where the policy
/// needs it, resolve, then look up the submit link for an active course.
pub async fn poll_once<S>(
    source: &S,
    resolver: &CourseWindowResolver,
    page_settings: &AttendancePageSettings,
    now: NaiveDateTime,
) -> Result<Resolution, LmsError>
where
    S: CourseSource + ?Sized,
{
    let cards = source.fetch_calendar_cards().await?;

    let mut attended: HashSet<String> = HashSet::new();
    let mut links: HashMap<String, Option<String>> = HashMap::new();
    if resolver.settings().skip_already_attended {
        for course in resolver.active_candidates(&cards, now) {
            let page = source.inspect_attendance_page(&course, page_settings, now.date()).await?;
            if page.status == AttendanceStatus::Marked {
                attended.insert(course.course_url.clone());
            }
            links.insert(course.course_url, page.attendance_url);
        }
    }

    match resolver.resolve(&cards, now, &attended) {
        Resolution::Active(course) => {
            let attendance_url = match links.remove(&course.course_url) {
                Some(url) => url,
                None => {
                    source
                        .inspect_attendance_page(&course, page_settings, now.date())
                        .await?
                        .attendance_url
                }
            };
            Ok(Resolution::Active(course.with_attendance_url(attendance_url)))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::core::resolver::ResolverSettings;

    struct FakePortal {
        cards: Vec<CourseCard>,
        pages: HashMap<String, AttendancePageInfo>,
        inspected: Mutex<Vec<String>>,
    }

    impl FakePortal {
        fn new(cards: Vec<CourseCard>) -> Self {
            FakePortal {
                cards,
                pages: HashMap::new(),
                inspected: Mutex::new(Vec::new()),
            }
        }

        fn page(mut self, id: u32, status: AttendanceStatus, link: Option<&str>) -> Self {
            self.pages.insert(
                course_url(id),
                AttendancePageInfo {
                    attendance_url: link.map(str::to_string),
                    status,
                },
            );
            self
        }

        fn inspected(&self) -> Vec<String> {
            self.inspected.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CourseSource for FakePortal {
        async fn fetch_calendar_cards(&self) -> Result<Vec<CourseCard>, LmsError> {
            Ok(self.cards.clone())
        }

        async fn inspect_attendance_page(
            &self,
            course: &ResolvedCourse,
            _settings: &AttendancePageSettings,
            _today: NaiveDate,
        ) -> Result<AttendancePageInfo, LmsError> {
            self.inspected.lock().unwrap().push(course.course_url.clone());
            self.pages
                .get(&course.course_url)
                .cloned()
                .ok_or_else(|| LmsError::new("no such page"))
        }
    }

    fn course_url(id: u32) -> String {
        format!("https://lms.example/mod/attendance/view.php?id={id}")
    }

    fn card(name: &str, id: u32, time_text: &str) -> CourseCard {
        CourseCard::from_fragment(format!(
            r#"<div class="card rounded">
                 <h3 class="name">出席管理</h3>
                 <div class="col-11">{time_text}</div>
                 <a href="https://lms.example/course/view.php?id={id}">{name}</a>
                 <a class="card-link" href="{}">open</a>
               </div>"#,
            course_url(id)
        ))
    }

    fn resolver(skip_already_attended: bool) -> CourseWindowResolver {
        CourseWindowResolver::new(ResolverSettings {
            attendance_titles: vec!["出席".to_string()],
            skip_already_attended,
            ..ResolverSettings::default()
        })
    }

    fn page_settings() -> AttendancePageSettings {
        AttendancePageSettings {
            submit_link_labels: vec!["出欠を送信する".to_string()],
            attended_labels: vec!["出席".to_string()],
            date_format: "%Y年 %m月 %d日".to_string(),
        }
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 10, 17)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn marked_course_is_skipped_and_next_link_attached() {
        let portal = FakePortal::new(vec![
            card("Done", 1, "09:00 » 11:00"),
            card("Open", 2, "09:30 » 10:30"),
        ])
        .page(1, AttendanceStatus::Marked, None)
        .page(2, AttendanceStatus::Pending, Some("https://lms.example/att?sessid=2"));

        let resolution = poll_once(&portal, &resolver(true), &page_settings(), at(10, 0))
            .await
            .unwrap();
        let Resolution::Active(course) = resolution else {
            panic!("expected an active course");
        };
        assert_eq!(course.name, "Open");
        assert_eq!(course.attendance_url.as_deref(), Some("https://lms.example/att?sessid=2"));
        assert_eq!(portal.inspected(), vec![course_url(1), course_url(2)]);
    }

    #[tokio::test]
    async fn pending_course_comes_back_with_its_link() {
        let portal = FakePortal::new(vec![card("Open", 1, "09:00 » 11:00")]).page(
            1,
            AttendanceStatus::Pending,
            Some("https://lms.example/att?sessid=1"),
        );

        let resolution = poll_once(&portal, &resolver(true), &page_settings(), at(10, 0))
            .await
            .unwrap();
        assert!(resolution.is_active());
        assert_eq!(
            resolution.course().and_then(|c| c.attendance_url.as_deref()),
            Some("https://lms.example/att?sessid=1")
        );
        // The link found while checking the ledger is reused.
        assert_eq!(portal.inspected().len(), 1);
    }

    #[tokio::test]
    async fn without_the_policy_only_the_winner_is_inspected() {
        let portal = FakePortal::new(vec![
            card("First", 1, "09:00 » 11:00"),
            card("Second", 2, "09:30 » 10:30"),
        ])
        .page(1, AttendanceStatus::Marked, Some("https://lms.example/att?sessid=1"))
        .page(2, AttendanceStatus::Pending, Some("https://lms.example/att?sessid=2"));

        let resolution = poll_once(&portal, &resolver(false), &page_settings(), at(10, 0))
            .await
            .unwrap();
        assert_eq!(resolution.course().map(|c| c.name.as_str()), Some("First"));
        assert_eq!(portal.inspected(), vec![course_url(1)]);
    }

    #[tokio::test]
    async fn upcoming_and_empty_days_fetch_no_pages() {
        let portal = FakePortal::new(vec![card("Later", 1, "13:00 » 14:40")]);
        let resolution = poll_once(&portal, &resolver(true), &page_settings(), at(10, 0))
            .await
            .unwrap();
        let Resolution::Upcoming(course) = resolution else {
            panic!("expected an upcoming course");
        };
        assert_eq!(course.attendance_url, None);
        assert!(portal.inspected().is_empty());

        let empty = FakePortal::new(Vec::new());
        let resolution = poll_once(&empty, &resolver(false), &page_settings(), at(10, 0))
            .await
            .unwrap();
        assert_eq!(resolution, Resolution::NoCourse);
        assert!(empty.inspected().is_empty());
    }

    #[tokio::test]
    async fn page_errors_propagate() {
        let portal = FakePortal::new(vec![card("Open", 1, "09:00 » 11:00")]);
        assert!(
            poll_once(&portal, &resolver(false), &page_settings(), at(10, 0))
                .await
                .is_err()
        );
    }
}
