mod commands;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tier")]
#[command(about = "宣言する。並べる。ネットワークは、グラフになった。", long_about = None)]
struct Cli {
    /// 設定ファイルのパス（省略時は自動検出、TIERFLOW_CONFIG_PATH も可）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// テンプレートを生成
    Synth {
        /// 環境名 (dev, stg, prod)
        env: Option<String>,
        /// 環境名 (-e/--env フラグ、TIERFLOW_ENV 環境変数)
        #[arg(
            short = 'e',
            long = "env",
            env = "TIERFLOW_ENV",
            conflicts_with = "env",
            hide = true
        )]
        env_flag: Option<String>,
        /// 出力先ファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// 対象コンポーネント（依存先も含めて生成）
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,
    },
    /// エクスポートの一覧を表示
    Exports {
        /// 環境名 (dev, stg, prod)
        env: Option<String>,
        /// 環境名 (-e/--env フラグ、TIERFLOW_ENV 環境変数)
        #[arg(
            short = 'e',
            long = "env",
            env = "TIERFLOW_ENV",
            conflicts_with = "env",
            hide = true
        )]
        env_flag: Option<String>,
        /// JSONで出力
        #[arg(long)]
        json: bool,
    },
    /// コンポーネントとリソースの構築順序を表示
    Order {
        /// 環境名 (dev, stg, prod)
        env: Option<String>,
        /// 環境名 (-e/--env フラグ、TIERFLOW_ENV 環境変数)
        #[arg(
            short = 'e',
            long = "env",
            env = "TIERFLOW_ENV",
            conflicts_with = "env",
            hide = true
        )]
        env_flag: Option<String>,
        /// リソース単位の順序も表示
        #[arg(short, long)]
        resources: bool,
    },
    /// 設定とリソースグラフを検証
    Validate {
        /// 環境名 (dev, stg, prod)
        env: Option<String>,
        /// 環境名 (-e/--env フラグ、TIERFLOW_ENV 環境変数)
        #[arg(
            short = 'e',
            long = "env",
            env = "TIERFLOW_ENV",
            conflicts_with = "env",
            hide = true
        )]
        env_flag: Option<String>,
    },
    /// エクスポートをパラメータストアに書き込む
    Publish {
        /// 環境名 (dev, stg, prod)
        env: Option<String>,
        /// 環境名 (-e/--env フラグ、TIERFLOW_ENV 環境変数)
        #[arg(
            short = 'e',
            long = "env",
            env = "TIERFLOW_ENV",
            conflicts_with = "env",
            hide = true
        )]
        env_flag: Option<String>,
        /// ストアのルートディレクトリ（.tierflow/ が作成される）
        #[arg(long, default_value = ".")]
        store: PathBuf,
        /// 書き込まずに差分だけ表示
        #[arg(long)]
        dry_run: bool,
    },
    /// サブネット一覧とIPv6割り当てを表示
    Subnets {
        /// VPCに割り当てられた /56 ブロック（例: 2406:da14:abc:de00::/56）
        #[arg(long)]
        ipv6: Option<String>,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrに出力
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Synth {
            env,
            env_flag,
            output,
            only,
        } => {
            commands::synth::handle(config, env.or(env_flag), output.as_deref(), &only)?;
        }
        Commands::Exports {
            env,
            env_flag,
            json,
        } => {
            commands::exports::handle(config, env.or(env_flag), json)?;
        }
        Commands::Order {
            env,
            env_flag,
            resources,
        } => {
            commands::order::handle(config, env.or(env_flag), resources)?;
        }
        Commands::Validate { env, env_flag } => {
            commands::validate::handle(config, env.or(env_flag))?;
        }
        Commands::Publish {
            env,
            env_flag,
            store,
            dry_run,
        } => {
            commands::publish::handle(config, env.or(env_flag), &store, dry_run).await?;
        }
        Commands::Subnets { ipv6 } => {
            commands::subnets::handle(ipv6.as_deref())?;
        }
        Commands::Version => {
            println!("tierflow {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
