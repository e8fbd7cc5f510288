use chrono::NaiveDate;
use scraper::{ElementRef, Html};
use url::Url;

use crate::core::lms::AttendancePageSettings;
use crate::model::attendance::{AttendanceForm, AttendanceStatus};
use crate::model::course_card::CourseCard;
use crate::model::user_info::UserInfo;

fn element_text(element: ElementRef) -> String {
    element.text().collect::<Vec<_>>().join("").trim().to_string()
}

/// Every course tile of the calendar's day view, in page order.
pub fn parse_calendar_cards(html: &str) -> Vec<CourseCard> {
    let document = Html::parse_document(html);
    document
        .select(selector!("div.card.rounded"))
        .map(|card| CourseCard::from_fragment(card.html()))
        .collect()
}

pub fn parse_login_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(selector!("input[name=logintoken]"))
        .next()?
        .value()
        .attr("value")
        .map(str::to_string)
}

/// The profile heading reads `氏名（読み）`; only the part before the
/// full-width parenthesis is kept.
pub fn parse_user_info(html: &str) -> Option<UserInfo> {
    let document = Html::parse_document(html);
    let heading = element_text(document.select(selector!("h1.h2")).next()?);
    let name = heading.split('（').next().unwrap_or_default().trim().to_string();
    if name.is_empty() {
        return None;
    }

    let icon_url = document
        .select(selector!("img.userpicture"))
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string);

    Some(UserInfo { name, icon_url })
}

pub fn find_attendance_link(html: &str, labels: &[String]) -> Option<String> {
    let document = Html::parse_document(html);
    find_link_in(&document, labels)
}

fn find_link_in(document: &Html, labels: &[String]) -> Option<String> {
    document
        .select(selector!("a[href]"))
        .find(|link| {
            let text = element_text(*link);
            labels.iter().any(|label| *label == text)
        })
        .and_then(|link| link.value().attr("href"))
        .map(str::to_string)
}

/// Reads the attendance page of one course for today's session.
pub fn parse_attendance_status(
    html: &str,
    today: NaiveDate,
    settings: &AttendancePageSettings,
) -> AttendanceStatus {
    let document = Html::parse_document(html);
    if find_link_in(&document, &settings.submit_link_labels).is_some() {
        return AttendanceStatus::Pending;
    }

    let today_label = today.format(&settings.date_format).to_string();
    let marked = document
        .select(selector!("table.generaltable tr"))
        .filter(|row| element_text(*row).contains(&today_label))
        .any(|row| {
            let mut status_cells = row.select(selector!("td.statuscol")).peekable();
            let status_text = if status_cells.peek().is_some() {
                status_cells.map(element_text).collect::<Vec<_>>().join(" ")
            } else {
                row.select(selector!("td"))
                    .map(element_text)
                    .filter(|text| !text.contains(&today_label))
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            settings
                .attended_labels
                .iter()
                .any(|label| status_text.contains(label.as_str()))
        });

    if marked {
        AttendanceStatus::Marked
    } else {
        AttendanceStatus::Unknown
    }
}

/// Finds the form carrying the student password field on an attendance
/// form page. The first `status` radio is the "present" choice.
pub fn parse_attendance_form(html: &str, page_url: &Url) -> Option<AttendanceForm> {
    let document = Html::parse_document(html);
    let form = document
        .select(selector!("form"))
        .find(|form| form.select(selector!("input[name=studentpassword]")).next().is_some())?;

    let action = match form.value().attr("action") {
        Some(action) if !action.trim().is_empty() => page_url.join(action.trim()).ok()?,
        _ => page_url.clone(),
    };

    let mut fields: Vec<(String, String)> = form
        .select(selector!("input[type=hidden]"))
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            let value = input.value().attr("value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect();

    let status = form
        .select(selector!("input[name=status]"))
        .next()?
        .value()
        .attr("value")?;
    fields.push(("status".to_string(), status.to_string()));

    if let Some(submit) = form.select(selector!("input[name=submitbutton]")).next() {
        let value = submit.value().attr("value").unwrap_or_default();
        fields.push(("submitbutton".to_string(), value.to_string()));
    }

    Some(AttendanceForm {
        action: action.to_string(),
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AttendancePageSettings {
        AttendancePageSettings {
            submit_link_labels: vec!["出欠を送信する".to_string()],
            attended_labels: vec!["出席".to_string()],
            date_format: "%Y年 %m月 %d日".to_string(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 17).unwrap()
    }

    #[test]
    fn cards_are_collected_in_order() {
        let html = r#"<html><body>
            <div class="card rounded"><a href="/course/view.php?id=1">A</a></div>
            <div class="card"><a href="/course/view.php?id=2">not a card</a></div>
            <div class="card rounded shadow"><a href="/course/view.php?id=3">C</a></div>
        </body></html>"#;
        let cards = parse_calendar_cards(html);
        assert_eq!(cards.len(), 2);
        assert!(cards[0].html().contains(">A<"));
        assert!(cards[1].html().contains(">C<"));
    }

    #[test]
    fn login_token_is_read_from_the_form() {
        let html = r#"<form><input type="hidden" name="logintoken" value="tok123"></form>"#;
        assert_eq!(parse_login_token(html).as_deref(), Some("tok123"));
        assert_eq!(parse_login_token("<form></form>"), None);
    }

    #[test]
    fn user_name_drops_the_reading() {
        let html = r#"<h1 class="h2">山田 太郎（ヤマダ タロウ）</h1>
                      <img class="userpicture" src="https://lms.example/pluginfile.php/1/user/icon/f1">"#;
        let info = parse_user_info(html).unwrap();
        assert_eq!(info.name, "山田 太郎");
        assert_eq!(info.icon_url.as_deref(), Some("https://lms.example/pluginfile.php/1/user/icon/f1"));

        assert_eq!(parse_user_info("<p>no heading</p>"), None);
    }

    #[test]
    fn attendance_link_matches_label_text() {
        let html = r#"<a href="/a">出欠</a><a href="/mod/attendance/attendance.php?sessid=5"> 出欠を送信する </a>"#;
        assert_eq!(
            find_attendance_link(html, &settings().submit_link_labels).as_deref(),
            Some("/mod/attendance/attendance.php?sessid=5")
        );
        assert_eq!(find_attendance_link("<a href='/x'>other</a>", &settings().submit_link_labels), None);
    }

    #[test]
    fn status_is_pending_while_the_link_is_offered() {
        let html = r#"<a href="/mod/attendance/attendance.php?sessid=5">出欠を送信する</a>
            <table class="generaltable"><tr><td class="datecol">2024年 10月 17日</td><td class="statuscol">?</td></tr></table>"#;
        assert_eq!(parse_attendance_status(html, today(), &settings()), AttendanceStatus::Pending);
    }

    #[test]
    fn status_is_marked_when_todays_row_says_present() {
        let html = r#"<table class="generaltable">
            <tr><td class="datecol">2024年 10月 10日</td><td class="statuscol">欠席</td></tr>
            <tr><td class="datecol">2024年 10月 17日 (木)</td><td class="descriptioncol">授業</td><td class="statuscol">出席</td></tr>
        </table>"#;
        assert_eq!(parse_attendance_status(html, today(), &settings()), AttendanceStatus::Marked);
    }

    #[test]
    fn status_is_unknown_for_other_days_or_absence() {
        let html = r#"<table class="generaltable">
            <tr><td class="datecol">2024年 10月 10日</td><td class="statuscol">出席</td></tr>
            <tr><td class="datecol">2024年 10月 17日</td><td class="statuscol">欠席</td></tr>
        </table>"#;
        assert_eq!(parse_attendance_status(html, today(), &settings()), AttendanceStatus::Unknown);
        assert_eq!(parse_attendance_status("", today(), &settings()), AttendanceStatus::Unknown);
    }

    #[test]
    fn attendance_form_collects_hidden_fields_and_first_status() {
        let html = r#"<form action="attendance.php" method="post" class="mform">
            <input type="hidden" name="sessid" value="42">
            <input type="hidden" name="sesskey" value="abc">
            <input type="hidden" name="_qf__mod_attendance_form_studentattendance" value="1">
            <input type="radio" name="status" value="7"><span class="statusdesc">出席</span>
            <input type="radio" name="status" value="8"><span class="statusdesc">遅刻</span>
            <input type="text" name="studentpassword">
            <input type="submit" name="submitbutton" value="変更を保存する">
        </form>"#;
        let page = Url::parse("https://lms.example/mod/attendance/attendance.php?sessid=42&sesskey=abc").unwrap();
        let form = parse_attendance_form(html, &page).unwrap();
        assert_eq!(form.action, "https://lms.example/mod/attendance/attendance.php");
        assert_eq!(
            form.fields,
            vec![
                ("sessid".to_string(), "42".to_string()),
                ("sesskey".to_string(), "abc".to_string()),
                ("_qf__mod_attendance_form_studentattendance".to_string(), "1".to_string()),
                ("status".to_string(), "7".to_string()),
                ("submitbutton".to_string(), "変更を保存する".to_string()),
            ]
        );
        assert_eq!(
            form.with_password("pw").last(),
            Some(&("studentpassword".to_string(), "pw".to_string()))
        );
    }

    #[test]
    fn page_without_password_field_has_no_form() {
        let page = Url::parse("https://lms.example/mod/attendance/view.php?id=3").unwrap();
        assert_eq!(parse_attendance_form("<form><input name='q'></form>", &page), None);
    }
}
