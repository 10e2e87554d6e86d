use crate::utils;
use colored::Colorize;
use std::path::Path;

pub fn handle(config: Option<&Path>, env: Option<String>, json: bool) -> anyhow::Result<()> {
    let synthesis = utils::orchestrator(config, env)?.synthesize()?;
    let exports = synthesis.exports();

    if json {
        let map: serde_json::Map<String, serde_json::Value> = exports
            .iter()
            .map(|e| (e.path.clone(), serde_json::Value::String(e.value.clone())))
            .collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    println!("{}", format!("エクスポート: {}個", exports.len()).bold());
    for export in exports.iter() {
        println!("  {} = {}", export.path.cyan(), export.value);
    }
    Ok(())
}
