//! # Progress Estimator
//!
//! 経過時間と進捗から残り時間を見積もる

use std::time::Duration;

/// 残り時間の見積もり
///
/// 進捗が 0 以下または 100 以上の場合は見積もれないので `None`
///
/// # 例
///
/// ```
/// use std::time::Duration;
/// use ocrflow::domain::services::progress_estimator::estimate_remaining;
///
/// // 25% に 30秒 → 残り 90秒
/// assert_eq!(
///     estimate_remaining(25.0, Duration::from_secs(30)),
///     Some(Duration::from_secs(90))
/// );
/// assert_eq!(estimate_remaining(0.0, Duration::from_secs(30)), None);
/// ```
pub fn estimate_remaining(progress: f64, elapsed: Duration) -> Option<Duration> {
    if !progress.is_finite() || progress <= 0.0 || progress >= 100.0 {
        return None;
    }
    let remaining = elapsed.as_secs_f64() * (100.0 - progress) / progress;
    Some(Duration::from_secs_f64(remaining))
}

/// `m:ss` / `h:mm:ss` 形式に整形
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
