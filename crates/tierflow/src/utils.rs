use colored::Colorize;
use std::path::Path;
use tierflow_aws::{Component, TopologyOrchestrator};
use tierflow_config::{ContextResolver, EnvironmentContext};

/// 設定ファイルを読み込む（パス指定がなければ自動検出）
pub fn load_resolver(config: Option<&Path>) -> anyhow::Result<ContextResolver> {
    let resolver = match config {
        Some(path) => ContextResolver::load(path)?,
        None => ContextResolver::discover()?,
    };
    Ok(resolver)
}

/// 環境名を決定する
///
/// 明示指定 > "default" > 唯一の環境
pub fn determine_env_name(env: Option<String>, resolver: &ContextResolver) -> anyhow::Result<String> {
    if let Some(e) = env {
        return Ok(e);
    }

    let envs: Vec<&str> = resolver.environments().collect();
    if envs.contains(&"default") {
        Ok("default".to_string())
    } else if let [only] = envs.as_slice() {
        Ok(only.to_string())
    } else {
        Err(anyhow::anyhow!(
            "環境名を指定してください: tier <command> <env> または TIERFLOW_ENV=<env>\n利用可能な環境: {}",
            envs.join(", ")
        ))
    }
}

/// 設定の読み込みから環境コンテキストの解決まで
pub fn resolve_context(
    config: Option<&Path>,
    env: Option<String>,
) -> anyhow::Result<EnvironmentContext> {
    let resolver = load_resolver(config)?;
    let env_name = determine_env_name(env, &resolver)?;
    tracing::debug!("Resolving environment {}", env_name);
    Ok(resolver.resolve(&env_name)?)
}

pub fn orchestrator(
    config: Option<&Path>,
    env: Option<String>,
) -> anyhow::Result<TopologyOrchestrator> {
    Ok(TopologyOrchestrator::new(resolve_context(config, env)?))
}

pub fn parse_components(names: &[String]) -> anyhow::Result<Vec<Component>> {
    names
        .iter()
        .map(|n| {
            n.parse::<Component>().map_err(|_| {
                anyhow::anyhow!(
                    "不明なコンポーネント: {}\n利用可能: {}",
                    n,
                    Component::ALL
                        .iter()
                        .map(|c| c.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
        })
        .collect()
}

/// 環境コンテキストのサマリーを stderr に表示
pub fn print_context(env: &EnvironmentContext) {
    eprintln!(
        "{} {} ({} / {})",
        "環境:".bold(),
        env.env.cyan(),
        env.system_name,
        env.region
    );
}
