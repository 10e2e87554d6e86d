pub mod context;
pub mod error;

pub use context::{ContextResolver, EnvironmentContext};
pub use error::*;

use std::path::PathBuf;

const CANDIDATES: [&str; 4] = [
    "tierflow.local.json",
    "tierflow.local.yaml",
    "tierflow.json",
    "tierflow.yaml",
];

/// 環境コンテキストの設定ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 TIERFLOW_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: tierflow.local.json, tierflow.local.yaml, tierflow.json, tierflow.yaml
/// 3. ./.tierflow/ ディレクトリ内: 同様の順序
/// 4. ~/.config/tierflow/tierflow.json (グローバル設定)
pub fn find_config_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var("TIERFLOW_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(
            "TIERFLOW_CONFIG_PATH points to a missing file: {}",
            path.display()
        );
    }

    let current_dir = std::env::current_dir()?;

    // 2. カレントディレクトリで検索
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. ./.tierflow/ ディレクトリで検索
    let config_dir = current_dir.join(".tierflow");
    if config_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = config_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    // 4. グローバル設定ファイル
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("tierflow").join("tierflow.json");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    #[serial]
    fn test_find_config_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("tierflow.json"), "{}").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset("TIERFLOW_CONFIG_PATH", find_config_file);
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with("tierflow.json"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("tierflow.json"), "{}").unwrap();
        fs::write(temp_dir.path().join("tierflow.local.yaml"), "{}").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset("TIERFLOW_CONFIG_PATH", find_config_file);
        std::env::set_current_dir(original_dir).unwrap();

        // tierflow.local.* が優先される
        assert!(result.unwrap().ends_with("tierflow.local.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_dot_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        let dot_dir = temp_dir.path().join(".tierflow");
        fs::create_dir(&dot_dir).unwrap();
        fs::write(dot_dir.join("tierflow.yaml"), "{}").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset("TIERFLOW_CONFIG_PATH", find_config_file);
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with(".tierflow/tierflow.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.json");
        fs::write(&config_path, "{}").unwrap();

        let result = temp_env::with_var(
            "TIERFLOW_CONFIG_PATH",
            Some(config_path.to_str().unwrap()),
            find_config_file,
        );
        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    #[serial]
    fn test_discover_and_resolve() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("tierflow.yaml");
        fs::write(
            &config_path,
            "context:\n  dev:\n    systemName: acme\n    region: ap-northeast-1\n    account: \"111111111111\"\n",
        )
        .unwrap();

        let ctx = temp_env::with_var(
            "TIERFLOW_CONFIG_PATH",
            Some(config_path.to_str().unwrap()),
            || ContextResolver::discover().and_then(|r| r.resolve("dev")),
        )
        .unwrap();
        assert_eq!(ctx.system_name, "acme");
    }
}
