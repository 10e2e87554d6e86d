use crate::utils;
use colored::Colorize;
use std::path::Path;

pub fn handle(
    config: Option<&Path>,
    env: Option<String>,
    output: Option<&Path>,
    only: &[String],
) -> anyhow::Result<()> {
    let mut orchestrator = utils::orchestrator(config, env)?;
    utils::print_context(orchestrator.context().env());
    if !only.is_empty() {
        orchestrator = orchestrator.only(&utils::parse_components(only)?);
    }

    let synthesis = orchestrator.synthesize()?;
    let template = serde_json::to_string_pretty(&synthesis.template()?)?;

    match output {
        Some(path) => {
            std::fs::write(path, template + "\n")?;
            eprintln!(
                "{} {} ({}個のリソース, {}個のエクスポート)",
                "✓ テンプレートを出力しました:".green().bold(),
                path.display().to_string().cyan(),
                synthesis.graph.len(),
                synthesis.exports().len()
            );
        }
        None => println!("{}", template),
    }

    Ok(())
}
