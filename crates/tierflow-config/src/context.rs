//! 環境コンテキストの解決
//!
//! 環境キー（dev, stg, prod など）から、プロビジョニング実行中に
//! 全コンポーネントが参照する `EnvironmentContext` を組み立てる。

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// 1回の実行で有効な環境設定（実行中は不変）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentContext {
    /// リソース名のプレフィックスになるシステム名
    pub system_name: String,

    /// 環境名（省略時は環境キー）
    pub env: String,

    pub region: String,

    /// 12桁の AWS アカウント ID
    pub account: String,

    /// HTTPS リスナーで使う ACM 証明書 ARN
    pub certificate_arn: Option<String>,

    pub domain_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContext {
    system_name: Option<String>,
    env: Option<String>,
    region: Option<String>,
    account: Option<String>,
    certificate_arn: Option<String>,
    domain_name: Option<String>,
}

/// 環境キーごとの設定ブロブを保持し、`EnvironmentContext` へ解決する
#[derive(Debug, Clone, Default)]
pub struct ContextResolver {
    entries: BTreeMap<String, serde_json::Value>,
}

impl ContextResolver {
    /// 設定ドキュメントから生成
    ///
    /// トップレベルが環境キーのマップ、または cdk.json と同じく
    /// `context` キーの下に環境キーが並ぶ形式のどちらも受け付ける。
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let root = match value {
            serde_json::Value::Object(mut map) => match map.remove("context") {
                Some(serde_json::Value::Object(context)) => context,
                Some(_) => {
                    return Err(ConfigError::InvalidField {
                        env: "*".to_string(),
                        field: "context",
                        reason: "オブジェクトである必要があります".to_string(),
                    });
                }
                None => map,
            },
            _ => {
                return Err(ConfigError::InvalidField {
                    env: "*".to_string(),
                    field: "root",
                    reason: "オブジェクトである必要があります".to_string(),
                });
            }
        };

        Ok(Self {
            entries: root.into_iter().collect(),
        })
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(content)?)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Self::from_value(serde_yaml::from_str(content)?)
    }

    /// 拡張子で形式を判定して読み込む
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let resolver = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content)?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        tracing::debug!(
            "Loaded {} environment(s) from {}",
            resolver.entries.len(),
            path.display()
        );
        Ok(resolver)
    }

    /// 設定ファイルを探索して読み込む
    pub fn discover() -> Result<Self> {
        let path = crate::find_config_file()?;
        Self::load(&path)
    }

    /// 定義されている環境キーの一覧
    pub fn environments(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// 環境キーを `EnvironmentContext` に解決する
    pub fn resolve(&self, env_key: &str) -> Result<EnvironmentContext> {
        let blob = self
            .entries
            .get(env_key)
            .ok_or_else(|| ConfigError::EnvironmentNotFound(env_key.to_string()))?;
        if !blob.is_object() {
            return Err(ConfigError::InvalidField {
                env: env_key.to_string(),
                field: "environment",
                reason: "オブジェクトである必要があります".to_string(),
            });
        }
        let raw: RawContext = serde_json::from_value(blob.clone())?;

        let system_name = required(env_key, "systemName", raw.system_name)?;
        let region = required(env_key, "region", raw.region)?;
        let account = required(env_key, "account", raw.account)?;

        if account.len() != 12 || !account.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::InvalidField {
                env: env_key.to_string(),
                field: "account",
                reason: format!("12桁の数字である必要があります: {}", account),
            });
        }

        let valid_system_name = system_name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        if !valid_system_name || system_name.starts_with('-') || system_name.ends_with('-') {
            return Err(ConfigError::InvalidField {
                env: env_key.to_string(),
                field: "systemName",
                reason: format!("英小文字・数字・ハイフンのみ使用できます: {}", system_name),
            });
        }

        Ok(EnvironmentContext {
            system_name,
            env: raw
                .env
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| env_key.to_string()),
            region,
            account,
            certificate_arn: raw.certificate_arn.filter(|v| !v.is_empty()),
            domain_name: raw.domain_name.filter(|v| !v.is_empty()),
        })
    }
}

fn required(env: &str, field: &'static str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingField {
            env: env.to_string(),
            field,
        }),
    }
}
