use crate::utils;
use colored::Colorize;
use std::path::Path;

pub fn handle(config: Option<&Path>, env: Option<String>, resources: bool) -> anyhow::Result<()> {
    let orchestrator = utils::orchestrator(config, env)?;

    if !resources {
        println!("{}", "コンポーネントの構築順序:".bold());
        for (i, component) in orchestrator.component_order()?.iter().enumerate() {
            let deps: Vec<&str> = component
                .depends_on()
                .iter()
                .chain(component.after())
                .map(|d| d.name())
                .collect();
            if deps.is_empty() {
                println!("  {:>2}. {}", i + 1, component.to_string().cyan());
            } else {
                println!(
                    "  {:>2}. {} ← {}",
                    i + 1,
                    component.to_string().cyan(),
                    deps.join(", ").dimmed()
                );
            }
        }
        return Ok(());
    }

    let synthesis = orchestrator.synthesize()?;
    println!("{}", "リソースのデプロイ順序:".bold());
    for (i, logical_id) in synthesis.graph.deployment_order()?.iter().enumerate() {
        let resource_type = synthesis
            .graph
            .get(logical_id)
            .map(|r| r.resource_type.as_str())
            .unwrap_or("?");
        println!(
            "  {:>3}. {} {}",
            i + 1,
            logical_id.cyan(),
            resource_type.dimmed()
        );
    }
    Ok(())
}
