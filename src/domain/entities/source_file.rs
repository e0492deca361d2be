//! # SourceFile Entity
//!
//! ユーザーが選択したアップロード対象ファイル

use bytes::Bytes;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// アップロード対象ファイル
///
/// 内容は `Bytes` で保持するので、クローンやチャンク分割は安価
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    content_type: String,
    content: Bytes,
}

impl SourceFile {
    /// 新しいファイルを作成
    ///
    /// # Arguments
    ///
    /// * `name` - ファイル名
    /// * `content_type` - MIMEタイプ（空なら `application/octet-stream`）
    /// * `content` - ファイル内容
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, content: Bytes) -> Self {
        let content_type = content_type.into();
        let content_type = if content_type.trim().is_empty() {
            DEFAULT_CONTENT_TYPE.to_string()
        } else {
            content_type
        };

        Self {
            name: name.into(),
            content_type,
            content,
        }
    }

    /// ファイル名からMIMEタイプを推測して作成
    pub fn with_guessed_type(name: impl Into<String>, content: Bytes) -> Self {
        let name = name.into();
        let content_type = mime_guess::from_path(&name)
            .first_raw()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        Self::new(name, content_type, content)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// バイト数
    #[inline]
    pub fn len(&self) -> u64 {
        self.content.len() as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// 人が読めるサイズ表記（例: `1.5 KB`）
    pub fn display_size(&self) -> String {
        format_file_size(self.len())
    }
}

/// バイト数を人が読める形式に整形
///
/// 小数点以下2桁まで、末尾のゼロは省略する
///
/// # 例
///
/// ```
/// use ocrflow::domain::entities::source_file::format_file_size;
///
/// assert_eq!(format_file_size(0), "0 Bytes");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// assert_eq!(format_file_size(1048576), "1 MB");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
