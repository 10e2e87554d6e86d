use crate::utils;
use colored::Colorize;
use std::path::Path;
use tierflow_cloud::{FileParameterStore, ParameterStore, publish};

pub async fn handle(
    config: Option<&Path>,
    env: Option<String>,
    store_root: &Path,
    dry_run: bool,
) -> anyhow::Result<()> {
    let orchestrator = utils::orchestrator(config, env)?;
    utils::print_context(orchestrator.context().env());
    let synthesis = orchestrator.synthesize()?;
    let store = FileParameterStore::new(store_root);

    if dry_run {
        println!("{}", "ドライラン: 書き込みは行いません".yellow());
        let current = store.list().await?;
        for export in synthesis.exports().iter() {
            let mark = match current.get(&export.path) {
                Some(v) if *v == export.value => "=".dimmed(),
                Some(_) => "~".yellow(),
                None => "+".green(),
            };
            println!("  {} {} = {}", mark, export.path.cyan(), export.value);
        }
        return Ok(());
    }

    let result = publish(synthesis.exports(), &store).await;

    println!(
        "{} {}個を書き込み, {}個は変更なし ({}ms)",
        "パラメータストア:".bold(),
        result.changed(),
        result.succeeded.len() - result.changed(),
        result.duration_ms
    );
    for failure in &result.failed {
        eprintln!(
            "  {} {}: {}",
            "✗".red(),
            failure.path,
            failure.error.as_deref().unwrap_or("unknown error")
        );
    }

    if !result.is_success() {
        anyhow::bail!("{}個のエクスポートの書き込みに失敗しました", result.failed.len());
    }
    println!("{}", "✓ 完了".green().bold());
    Ok(())
}
