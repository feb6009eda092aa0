use crate::core::flux::FluxReport;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::{Stage, StageTiming, SystemMonitor};
use std::time::Instant;

/// Outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Where the boundary-condition mesh was written, `None` on a dry run.
    pub output_path: Option<String>,
    pub report: FluxReport,
    /// Wall time of each stage that ran, in order.
    pub stages: Vec<StageTiming>,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let r = &self.report;
        writeln!(f, "total flux from given profile: {} [e.g. kg/s]", r.uncorrected_total_flux)?;
        writeln!(f, "requested total flux: {} kg/s", r.requested_total_flux)?;
        writeln!(f, "scale factor: {}", r.scale_factor)?;
        writeln!(
            f,
            "slice points: {} (radius {} .. {})",
            r.point_count, r.radius_min, r.radius_max
        )?;
        if r.clamped_points > 0 {
            writeln!(f, "clamped points: {}", r.clamped_points)?;
        }
        if !self.stages.is_empty() {
            let stages: Vec<String> = self.stages.iter().map(ToString::to_string).collect();
            writeln!(f, "stages: {}", stages.join(", "))?;
        }
        match &self.output_path {
            Some(path) => write!(f, "output: {}", path),
            None => write!(f, "output: (dry run, nothing written)"),
        }
    }
}

pub struct PipelineEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
    dry_run: bool,
}

impl<P: Pipeline> PipelineEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
            dry_run: false,
        }
    }

    /// Runs every stage but skips writing any output.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!("🚀 Starting inflow boundary-condition pipeline");
        let mut stages = Vec::with_capacity(3);

        // Extract
        tracing::info!("📥 Loading mesh and velocity profile...");
        let started = Instant::now();
        let source = self.pipeline.extract().await?;
        tracing::info!(
            "Loaded {} points, {} cells, {} profile samples",
            source.grid.point_count(),
            source.grid.cell_count(),
            source.profile.len()
        );
        stages.push(self.monitor.finish_stage(Stage::Extract, started));

        // Transform
        tracing::info!("🔄 Tagging, slicing and computing mass flux...");
        let started = Instant::now();
        let result = self.pipeline.transform(source).await?;
        tracing::info!(
            "Boundary mesh has {} points, {} cells",
            result.grid.point_count(),
            result.grid.cell_count()
        );
        stages.push(self.monitor.finish_stage(Stage::Transform, started));

        let report = result.report.clone();
        if self.dry_run {
            tracing::info!("🔍 DRY RUN - skipping output");
            self.monitor.log_final_stats(&stages);
            return Ok(RunSummary {
                output_path: None,
                report,
                stages,
            });
        }

        // Load
        tracing::info!("💾 Writing outputs...");
        let started = Instant::now();
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("📁 Output saved to: {}", output_path);
        stages.push(self.monitor.finish_stage(Stage::Load, started));
        self.monitor.log_final_stats(&stages);

        Ok(RunSummary {
            output_path: Some(output_path),
            report,
            stages,
        })
    }
}
