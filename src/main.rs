use std::path::Path;

use chrono::Local;
use lms_attendance::config::app_config::Config;
use lms_attendance::core::lms::Lms;
use lms_attendance::core::notifier::{ConsoleNotifier, Notifier};
use lms_attendance::core::poller::poll_once;
use lms_attendance::core::resolver::CourseWindowResolver;
use lms_attendance::core::submitter::AttendanceSubmitter;
use lms_attendance::error::lms::LmsError;
use lms_attendance::model::resolved_course::Resolution;
use lms_attendance::utils::input::{input_password_trim, input_trim};

#[tokio::main]
async fn main() -> Result<(), LmsError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    if !Path::new(&config_path).exists() {
        let username = input_trim("LMS のユーザー名を入力してください：")?;
        Config::new(&username).save(&config_path)?;
        println!("{config_path} を作成しました。attendance_titles などを設定してください。");
    }
    let config = Config::load(&config_path)?;

    let lms = Lms::new(&config.lms_url, &config.username)?;
    if lms.check_session().await? {
        println!("{} はログイン済みです", config.username);
    } else {
        let password = match &config.password {
            Some(password) => password.clone(),
            None => input_password_trim("LMS のパスワードを入力してください：")?,
        };
        if !lms.login(&config.username, &password).await? {
            eprintln!("ログインに失敗しました...config.json の中身を確認して下さい。");
            return Err(LmsError::new("login failed"));
        }
        println!("ログインに成功しました！");
    }

    if let Some(user) = lms.fetch_user_info().await? {
        println!("{}({})", user.name, config.username);
    }

    let resolver = CourseWindowResolver::new(config.resolver_settings());
    let page_settings = config.attendance_page_settings();
    let notifier = ConsoleNotifier;

    loop {
        let now = Local::now().naive_local();
        let resolution = poll_once(&lms, &resolver, &page_settings, now).await?;
        notifier.notify(&resolution);

        let attendance_url = match &resolution {
            Resolution::Active(course) => course.attendance_url.clone(),
            _ => None,
        };

        let Some(url) = attendance_url else {
            let answer = input_trim("Enter で再確認、q で終了：")?;
            if answer.eq_ignore_ascii_case("q") {
                break;
            }
            continue;
        };

        let password = input_password_trim("出席パスワードを入力してください（空欄で終了）：")?;
        if password.is_empty() {
            break;
        }

        match lms.submit_attendance(&url, &password).await {
            Ok(()) => println!("出席登録が完了しました！"),
            Err(err) => {
                log::warn!("{err}");
                eprintln!("出席登録に失敗しました...\nパスワードが間違っているか，出席ページが閉じられた可能性があります．");
            }
        }
    }

    Ok(())
}
