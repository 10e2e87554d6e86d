use crate::utils;
use colored::Colorize;
use std::path::Path;

pub fn handle(config: Option<&Path>, env: Option<String>) -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());

    let orchestrator = match utils::orchestrator(config, env) {
        Ok(o) => o,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    let result = orchestrator.synthesize().and_then(|s| {
        let order = s.graph.deployment_order()?;
        s.template()?;
        Ok((s, order))
    });

    match result {
        Ok((synthesis, order)) => {
            let env = orchestrator.context().env();
            println!("{}", "✓ リソースグラフは正常です！".green().bold());
            println!();
            println!("サマリー:");
            println!("  環境: {} ({})", env.env.cyan(), env.region);
            println!("  コンポーネント: {}個", synthesis.order.len());
            println!("  リソース: {}個", order.len());
            println!("  エクスポート: {}個", synthesis.exports().len());
        }
        Err(e) => {
            eprintln!();
            if e.is_dependency_order() {
                eprintln!("{}", "✗ 依存関係エラー".red().bold());
            } else {
                eprintln!("{}", "✗ 検証エラー".red().bold());
            }
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
