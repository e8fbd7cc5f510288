use crate::model::resolved_course::Resolution;

pub trait Notifier {
    fn notify(&self, resolution: &Resolution);
}

pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, resolution: &Resolution) {
        println!("{}", describe(resolution));
    }
}

pub fn describe(resolution: &Resolution) -> String {
    match resolution {
        Resolution::Active(course) => {
            let mut text = format!("出席受付中: {} ({})", course.name, course.window.display());
            if course.attendance_url.is_none() {
                text.push_str("\n出欠を送信するリンクが見つかりませんでした");
            }
            text
        }
        Resolution::Upcoming(course) => {
            format!("次のコース: {} ({})", course.name, course.window.display())
        }
        Resolution::NoCourse => "出席できるコースがありません".to_string(),
    }
}
