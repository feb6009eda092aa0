use clap::Parser;
use inflow_bc::utils::{logger, validation::Validate};
use inflow_bc::{CliConfig, LocalStorage, MassFluxPipeline, PipelineEngine, VtkToolkit, VtuWriteOptions};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(config.log_format, config.verbose);

    tracing::info!("Starting inflow-bc CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let write_options = VtuWriteOptions {
        compress: !config.no_compression,
        level: config.compression_level,
    };
    let dry_run = config.dry_run;

    // 創建存儲、網格工具與管道
    let storage = LocalStorage::default();
    let toolkit = VtkToolkit::new(storage.clone()).with_write_options(write_options);
    let pipeline = MassFluxPipeline::new(toolkit, storage, config);

    let engine = PipelineEngine::new_with_monitoring(pipeline, monitor_enabled).with_dry_run(dry_run);

    match engine.run().await {
        Ok(summary) => {
            tracing::info!("✅ Boundary condition prepared successfully!");
            println!("{}", summary);
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Pipeline failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            // 輸出用戶友好的錯誤信息
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}
