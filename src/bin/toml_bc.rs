use clap::Parser;
use inflow_bc::config::toml_config::TomlConfig;
use inflow_bc::domain::ports::ConfigProvider;
use inflow_bc::utils::{logger, validation::Validate};
use inflow_bc::{LocalStorage, MassFluxPipeline, PipelineEngine, VtkToolkit, VtuWriteOptions};

#[derive(Parser)]
#[command(name = "toml-bc")]
#[command(about = "Inflow boundary-condition preparation driven by a TOML file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "inflow-bc.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Compute the mass flux but write nothing
    #[arg(long)]
    dry_run: bool,

    #[arg(long, value_enum, default_value_t = logger::LogFormat::Text)]
    log_format: logger::LogFormat,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_logger(args.log_format, args.verbose);

    tracing::info!("🚀 Starting TOML-based inflow-bc");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    // 載入 TOML 配置
    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(e.exit_code());
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    // 顯示配置摘要
    display_config_summary(&config, &args);

    // 決定監控設定
    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let write_options = VtuWriteOptions {
        compress: config.compression(),
        level: config.compression_level(),
    };

    let storage = LocalStorage::default();
    let toolkit = VtkToolkit::new(storage.clone()).with_write_options(write_options);
    let pipeline = MassFluxPipeline::new(toolkit, storage, config);

    let engine =
        PipelineEngine::new_with_monitoring(pipeline, monitor_enabled).with_dry_run(args.dry_run);

    match engine.run().await {
        Ok(summary) => {
            tracing::info!("✅ Boundary condition prepared successfully!");
            println!("{}", summary);
        }
        Err(e) => {
            tracing::error!(
                "❌ Pipeline failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Input mesh: {}", config.input_path());
    println!("  Output mesh: {}", config.output_path());
    println!("  Profile: {}", config.profile_path());
    println!(
        "  Slice: origin {:?}, normal {:?}",
        config.slice.origin, config.slice.normal
    );
    println!("  Radial axis: {:?}", config.radial_axis());
    println!("  Total flux: {} kg/s", config.total_flux());
    println!("  Density: {} kg/m³", config.density());

    if let Some(path) = config.point_table_path() {
        println!("  Point table: {}", path);
    }
    if let Some(path) = config.report_path() {
        println!("  Report: {}", path);
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}
