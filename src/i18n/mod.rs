//! Display strings for status messages and history entries.
//!
//! Lookup falls back from the requested locale to the default locale and then
//! to the raw key.

use crate::session::StatusMessage;

pub const DEFAULT_LOCALE: &str = "ja";
pub const SUPPORTED_LOCALES: [&str; 3] = ["ja", "en", "zh"];

/// Keys used by the session for status lines.
pub mod keys {
    pub const SELECT_SCREEN: &str = "status_select_screen";
    pub const RECORDING: &str = "status_recording";
    pub const PAUSED: &str = "status_paused";
    pub const STOPPING: &str = "status_stop";
    pub const DONE: &str = "status_done";
    pub const ERROR_PREFIX: &str = "status_error_prefix";
    pub const CANCELLED: &str = "status_cancelled";
    pub const CONVERTING: &str = "status_converting";
    pub const MIC_UNAVAILABLE: &str = "status_mic_unavailable";
    pub const CONVERSION_FAILED: &str = "status_conversion_failed";
    pub const HISTORY_NONE: &str = "history_none";
    pub const CAPTURE_ENTRY: &str = "capture_entry";
    pub const DOWNLOAD_ENTRY: &str = "download_entry";
    pub const DOWNLOAD_LINK: &str = "download_link";
}

type Table = &'static [(&'static str, &'static str)];

const JA: Table = &[
    ("title", "Aro Screen Recording 2.0"),
    ("resolution_label", "解像度 (アスペクト比):"),
    ("fps_label", "FPS:"),
    ("format_label", "形式:"),
    ("mic_label", "マイク音声:"),
    ("mic_enabled", "有効"),
    ("start_btn", "録画開始"),
    ("pause_btn", "一時停止"),
    ("resume_btn", "再開"),
    ("stop_btn", "録画停止"),
    ("capture_history", "キャプチャー履歴"),
    ("download_history", "ダウンロード履歴"),
    ("download_link", "動画をダウンロード({type})"),
    ("status_select_screen", "録画する画面・ウィンドウ・タブを選択してください"),
    ("status_recording", "録画中..."),
    ("status_paused", "一時停止中..."),
    ("status_stop", "録画停止中..."),
    ("status_done", "録画完了！ダウンロードできます"),
    ("status_error_prefix", "録画エラー: "),
    ("status_preview_fail", "プレビュー取得に失敗: "),
    ("status_cancelled", "録画開始がキャンセルされました"),
    ("status_converting", "変換中...（少々お待ちください）"),
    ("status_mic_unavailable", "マイクを使用できません。マイク音声なしで録画中..."),
    ("status_conversion_failed", "変換に失敗しました。WebM でダウンロードできます: "),
    ("history_none", "履歴なし"),
    ("capture_entry", "{time} の録画"),
    ("download_entry", "{time} にダウンロード"),
];

const EN: Table = &[
    ("title", "Aro Screen Recording 2.0"),
    ("resolution_label", "Resolution (aspect ratio):"),
    ("fps_label", "FPS:"),
    ("format_label", "Format:"),
    ("mic_label", "Microphone:"),
    ("mic_enabled", "enabled"),
    ("start_btn", "Start Recording"),
    ("pause_btn", "Pause"),
    ("resume_btn", "Resume"),
    ("stop_btn", "Stop Recording"),
    ("capture_history", "Capture History"),
    ("download_history", "Download History"),
    ("download_link", "Download ({type})"),
    ("status_select_screen", "Select the screen, window or tab to record"),
    ("status_recording", "Recording..."),
    ("status_paused", "Paused..."),
    ("status_stop", "Stopping..."),
    ("status_done", "Recording finished! You can download it"),
    ("status_error_prefix", "Recording error: "),
    ("status_preview_fail", "Failed to get preview: "),
    ("status_cancelled", "Recording was cancelled"),
    ("status_converting", "Converting... please wait"),
    ("status_mic_unavailable", "Microphone unavailable, recording without mic audio"),
    ("status_conversion_failed", "Conversion failed, WebM download is available: "),
    ("history_none", "No history"),
    ("capture_entry", "Recorded on {time}"),
    ("download_entry", "Downloaded on {time}"),
];

const ZH: Table = &[
    ("title", "Aro Screen Recording 2.0"),
    ("resolution_label", "分辨率 (纵横比):"),
    ("fps_label", "帧率:"),
    ("format_label", "格式:"),
    ("mic_label", "麦克风音频:"),
    ("mic_enabled", "启用"),
    ("start_btn", "开始录制"),
    ("pause_btn", "暂停"),
    ("resume_btn", "继续"),
    ("stop_btn", "停止录制"),
    ("capture_history", "捕获记录"),
    ("download_history", "下载记录"),
    ("download_link", "下载 ({type})"),
    ("status_select_screen", "请选择要录制的屏幕、窗口或标签页"),
    ("status_recording", "录制中..."),
    ("status_paused", "已暂停..."),
    ("status_stop", "正在停止..."),
    ("status_done", "录制完成！可以下载"),
    ("status_error_prefix", "录制错误: "),
    ("status_preview_fail", "获取预览失败: "),
    ("status_cancelled", "已取消录制"),
    ("status_converting", "转换中... 请稍候"),
    ("history_none", "无记录"),
    ("capture_entry", "{time} 的录制"),
    ("download_entry", "{time} 下载"),
];

fn table(locale: &str) -> Option<Table> {
    match locale {
        "ja" => Some(JA),
        "en" => Some(EN),
        "zh" => Some(ZH),
        _ => None,
    }
}

fn find(locale: &str, key: &str) -> Option<&'static str> {
    table(locale)?
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, text)| *text)
}

pub fn is_supported(locale: &str) -> bool {
    SUPPORTED_LOCALES.contains(&locale)
}

#[derive(Debug, Clone)]
pub struct Localizer {
    default_locale: String,
}

impl Default for Localizer {
    fn default() -> Self {
        Self::new(DEFAULT_LOCALE)
    }
}

impl Localizer {
    pub fn new(default_locale: &str) -> Self {
        let default_locale = if is_supported(default_locale) {
            default_locale
        } else {
            DEFAULT_LOCALE
        };
        Self {
            default_locale: default_locale.to_string(),
        }
    }

    pub fn lookup(&self, key: &str, locale: &str) -> String {
        find(locale, key)
            .or_else(|| find(&self.default_locale, key))
            .unwrap_or(key)
            .to_string()
    }

    /// Lookup and substitute `{name}` placeholders.
    pub fn render(&self, key: &str, locale: &str, vars: &[(&str, &str)]) -> String {
        vars.iter()
            .fold(self.lookup(key, locale), |text, (name, value)| {
                text.replace(&format!("{{{name}}}"), value)
            })
    }

    pub fn status_text(&self, message: &StatusMessage, locale: &str) -> String {
        let text = self.lookup(&message.key, locale);
        match &message.detail {
            None => text,
            Some(detail) if text.ends_with(": ") => format!("{text}{detail}"),
            Some(detail) => format!("{text}: {detail}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_in_requested_locale() {
        let l = Localizer::default();
        assert_eq!(l.lookup(keys::RECORDING, "en"), "Recording...");
        assert_eq!(l.lookup(keys::RECORDING, "ja"), "録画中...");
    }

    #[test]
    fn test_falls_back_to_default_then_key() {
        let l = Localizer::default();
        // zh has no mic-unavailable string
        assert_eq!(
            l.lookup(keys::MIC_UNAVAILABLE, "zh"),
            l.lookup(keys::MIC_UNAVAILABLE, "ja")
        );
        assert_eq!(l.lookup(keys::PAUSED, "fr"), "一時停止中...");
        assert_eq!(l.lookup("no_such_key", "en"), "no_such_key");
    }

    #[test]
    fn test_unsupported_default_uses_ja() {
        let l = Localizer::new("xx");
        assert_eq!(l.lookup(keys::DONE, "fr"), l.lookup(keys::DONE, "ja"));
    }

    #[test]
    fn test_render_placeholders() {
        let l = Localizer::default();
        assert_eq!(
            l.render(keys::CAPTURE_ENTRY, "en", &[("time", "2024-05-01 09:30")]),
            "Recorded on 2024-05-01 09:30"
        );
        assert_eq!(
            l.render(keys::DOWNLOAD_LINK, "en", &[("type", "mp4")]),
            "Download (mp4)"
        );
    }

    #[test]
    fn test_status_text_with_detail() {
        let l = Localizer::default();
        let msg = StatusMessage::with_detail(keys::ERROR_PREFIX, "encoder crashed");
        assert_eq!(l.status_text(&msg, "en"), "Recording error: encoder crashed");

        let msg = StatusMessage::with_detail(keys::CANCELLED, "denied");
        assert_eq!(l.status_text(&msg, "en"), "Recording was cancelled: denied");
    }
}
