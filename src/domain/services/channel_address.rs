//! # Channel Address Service
//!
//! セッションIDからリアルタイムチャネルのアドレスを導出

use url::form_urlencoded;

use crate::domain::entities::session_id::SessionId;

/// クエリパラメータ名
pub const SESSION_QUERY_KEY: &str = "sessionId";

/// `<base>?sessionId=<id>` を組み立てる
///
/// ベースに既にクエリがある場合は `&` で連結する
///
/// # 例
///
/// ```
/// use ocrflow::domain::entities::session_id::SessionId;
/// use ocrflow::domain::services::channel_address::channel_address;
///
/// let id = SessionId::from("session-1700000000-abc1234");
/// assert_eq!(
///     channel_address("wss://n8n.example.com/ws", &id),
///     "wss://n8n.example.com/ws?sessionId=session-1700000000-abc1234"
/// );
/// ```
pub fn channel_address(base: &str, session_id: &SessionId) -> String {
    let separator = if base.contains('?') {
        if base.ends_with('?') || base.ends_with('&') {
            ""
        } else {
            "&"
        }
    } else {
        "?"
    };

    let query: String = form_urlencoded::Serializer::new(String::new())
        .append_pair(SESSION_QUERY_KEY, session_id.as_str())
        .finish();

    format!("{}{}{}", base, separator, query)
}
