//! Localized user-facing messages
//!
//! Message lookup is a pure function of `(Lang, MessageKey)`. Callers that
//! print many messages capture a bound lookup once with [`bound_message`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported message languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Ja,
}

impl Lang {
    /// Picks a language from a locale string such as `ja_JP.UTF-8`
    pub fn from_locale(locale: &str) -> Self {
        if locale.to_ascii_lowercase().starts_with("ja") {
            Lang::Ja
        } else {
            Lang::En
        }
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Lang::En),
            "ja" => Ok(Lang::Ja),
            other => Err(format!("unsupported language '{}'; valid options: en, ja", other)),
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lang::En => f.write_str("en"),
            Lang::Ja => f.write_str("ja"),
        }
    }
}

/// Keys of every user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    ManifestRequired,
    QuestionDomain,
    QuestionUsername,
    QuestionPassword,
    StartUploading,
    FilesUploaded,
    UploadFailed,
    HasUploaded,
    SettingUpdated,
    UpdateFailed,
    Deployed,
    AuthenticationFailed,
    DeployFailed,
    WaitDeploying,
    Watching,
    Retrying,
}

impl MessageKey {
    /// Every key, used to check the table is complete
    pub const ALL: [MessageKey; 16] = [
        MessageKey::ManifestRequired,
        MessageKey::QuestionDomain,
        MessageKey::QuestionUsername,
        MessageKey::QuestionPassword,
        MessageKey::StartUploading,
        MessageKey::FilesUploaded,
        MessageKey::UploadFailed,
        MessageKey::HasUploaded,
        MessageKey::SettingUpdated,
        MessageKey::UpdateFailed,
        MessageKey::Deployed,
        MessageKey::AuthenticationFailed,
        MessageKey::DeployFailed,
        MessageKey::WaitDeploying,
        MessageKey::Watching,
        MessageKey::Retrying,
    ];
}

/// Returns the message for `key` in `lang`
pub fn get_message(lang: Lang, key: MessageKey) -> &'static str {
    let (en, ja) = match key {
        MessageKey::ManifestRequired => (
            "Please specify manifest file",
            "マニフェストファイルを指定してください",
        ),
        MessageKey::QuestionDomain => (
            "Input your kintone's domain (example.cybozu.com):",
            "kintoneのドメインを入力してください (example.cybozu.com):",
        ),
        MessageKey::QuestionUsername => (
            "Input your username:",
            "ログイン名を入力してください:",
        ),
        MessageKey::QuestionPassword => (
            "Input your password:",
            "パスワードを入力してください:",
        ),
        MessageKey::StartUploading => (
            "Start uploading customize files",
            "カスタマイズのアップロードを開始します",
        ),
        MessageKey::FilesUploaded => (
            "JavaScript/CSS files have been uploaded!",
            "JavaScript/CSS ファイルをアップロードしました!",
        ),
        MessageKey::UploadFailed => (
            "Failed to upload JavaScript/CSS files",
            "JavaScript/CSS ファイルのアップロードに失敗しました",
        ),
        MessageKey::HasUploaded => ("has been uploaded!", "をアップロードしました!"),
        MessageKey::SettingUpdated => (
            "Customize setting has been updated!",
            "JavaScript/CSS カスタマイズの設定を変更しました!",
        ),
        MessageKey::UpdateFailed => (
            "Failed to update customize setting",
            "JavaScript/CSS カスタマイズの設定の変更に失敗しました",
        ),
        MessageKey::Deployed => ("Setting has been deployed!", "運用環境に反映しました!"),
        MessageKey::AuthenticationFailed => (
            "Failed to authenticate. Please confirm your username, password, and domain",
            "認証に失敗しました。ログイン名、パスワード、ドメインを確認してください",
        ),
        MessageKey::DeployFailed => (
            "Failed to deploy setting",
            "運用環境への反映に失敗しました",
        ),
        MessageKey::WaitDeploying => (
            "Wait for deploying completed...",
            "運用環境への反映の完了を待っています...",
        ),
        MessageKey::Watching => (
            "Watching for file changes...",
            "ファイルの変更を監視しています...",
        ),
        MessageKey::Retrying => (
            "An error occurred, retry",
            "エラーが発生しました。リトライします",
        ),
    };

    match lang {
        Lang::En => en,
        Lang::Ja => ja,
    }
}

/// Returns a lookup closure bound to `lang`
pub fn bound_message(lang: Lang) -> impl Fn(MessageKey) -> &'static str + Copy + Send + Sync {
    move |key| get_message(lang, key)
}
