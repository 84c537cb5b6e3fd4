use anyhow::Context;
use clap::Parser;
use shiporder_etl::utils::{logger, validation::Validate};
use shiporder_etl::{build_pipeline, AppConfig, CliArgs, EtlEngine};

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting shiporder-etl");
    tracing::debug!("CLI args: {:?}", args);

    // 設定檔讀不到或不合法時直接結束 (非零退出碼)
    let config = AppConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        return Err(e).context("Invalid configuration");
    }
    tracing::debug!("Config: {:?}", config);

    let pipeline = build_pipeline(config);
    let mut engine = if args.dry_run {
        EtlEngine::new_dry_run(pipeline)
    } else {
        EtlEngine::new(pipeline)
    };

    match engine.run() {
        Ok(summary) => {
            if args.dry_run {
                println!("Dry run: {} orders would be written.", summary.orders);
            } else {
                for path in &summary.written {
                    tracing::info!("📁 {}", path);
                }
                println!("XML files generated successfully!");
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            println!("Error: {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
        }
    }

    Ok(())
}
