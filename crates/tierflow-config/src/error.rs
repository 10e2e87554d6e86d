use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "設定ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: tierflow.local.json, tierflow.local.yaml, tierflow.json, tierflow.yaml\n\
        - ./.tierflow/ ディレクトリ\n\
        - ~/.config/tierflow/tierflow.json\n\
        または TIERFLOW_CONFIG_PATH 環境変数で直接指定できます"
    )]
    ConfigFileNotFound,

    #[error("環境 '{0}' の設定が見つかりません")]
    EnvironmentNotFound(String),

    #[error("環境 '{env}' に必須項目 '{field}' がありません")]
    MissingField { env: String, field: &'static str },

    #[error("環境 '{env}' の '{field}' が不正です: {reason}")]
    InvalidField {
        env: String,
        field: &'static str,
        reason: String,
    },

    #[error("未対応の設定ファイル形式です: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("JSON パースエラー: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML パースエラー: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
