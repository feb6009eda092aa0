use std::fmt;
use std::time::{Duration, Instant};

#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

/// Pipeline stage a timing belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Transform,
    Load,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extract => "extract",
            Self::Transform => "transform",
            Self::Load => "load",
        };
        f.write_str(name)
    }
}

/// Process resources sampled at the end of a stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSample {
    pub cpu_usage: f32,
    pub memory_mb: u64,
}

/// Wall time of one stage, plus resources when monitoring is on.
#[derive(Debug, Clone, PartialEq)]
pub struct StageTiming {
    pub stage: Stage,
    pub elapsed: Duration,
    pub resources: Option<ResourceSample>,
}

impl fmt::Display for StageTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.1?}", self.stage, self.elapsed)?;
        if let Some(r) = self.resources {
            write!(f, " ({}MB, CPU {:.1}%)", r.memory_mb, r.cpu_usage)?;
        }
        Ok(())
    }
}

/// Times pipeline stages. With the `cli` feature and monitoring enabled it
/// also samples CPU and memory of the current process after each stage.
pub struct SystemMonitor {
    #[cfg(feature = "cli")]
    system: Option<(Mutex<System>, Pid)>,
}

impl SystemMonitor {
    #[cfg(feature = "cli")]
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self { system: None };
        }
        let system = match sysinfo::get_current_pid() {
            Ok(pid) => {
                let mut system = System::new_with_specifics(RefreshKind::everything());
                // 初始刷新，讓第一次取樣的 CPU 使用率有基準
                system.refresh_all();
                Some((Mutex::new(system), pid))
            }
            Err(e) => {
                tracing::warn!("⚠️ Cannot resolve current PID, resource sampling disabled: {}", e);
                None
            }
        };
        Self { system }
    }

    #[cfg(not(feature = "cli"))]
    pub fn new(_enabled: bool) -> Self {
        Self {}
    }

    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "cli")]
        {
            self.system.is_some()
        }
        #[cfg(not(feature = "cli"))]
        {
            false
        }
    }

    #[cfg(feature = "cli")]
    fn sample(&self) -> Option<ResourceSample> {
        let (system, pid) = self.system.as_ref()?;
        let mut system = system.lock().ok()?;
        system.refresh_all();
        let process = system.process(*pid)?;
        Some(ResourceSample {
            cpu_usage: process.cpu_usage(),
            memory_mb: process.memory() / 1024 / 1024,
        })
    }

    #[cfg(not(feature = "cli"))]
    fn sample(&self) -> Option<ResourceSample> {
        None
    }

    /// Closes `stage`, which began at `started`.
    pub fn finish_stage(&self, stage: Stage, started: Instant) -> StageTiming {
        let timing = StageTiming {
            stage,
            elapsed: started.elapsed(),
            resources: self.sample(),
        };
        if self.is_enabled() {
            tracing::info!("📊 {}", timing);
        } else {
            tracing::debug!("⏱️ {}", timing);
        }
        timing
    }

    pub fn log_final_stats(&self, stages: &[StageTiming]) {
        let total: Duration = stages.iter().map(|s| s.elapsed).sum();
        let peak = stages.iter().filter_map(|s| s.resources).map(|r| r.memory_mb).max();
        match peak {
            Some(peak) => tracing::info!("📊 Final Stats - Total Time: {:.1?}, Peak Memory: {}MB", total, peak),
            None => tracing::debug!("⏱️ Total Time: {:.1?}", total),
        }
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_still_times_stages() {
        let monitor = SystemMonitor::new(false);
        assert!(!monitor.is_enabled());

        let started = Instant::now();
        std::thread::sleep(Duration::from_millis(2));
        let timing = monitor.finish_stage(Stage::Transform, started);
        assert_eq!(timing.stage, Stage::Transform);
        assert!(timing.elapsed >= Duration::from_millis(2));
        assert!(timing.resources.is_none());
    }

    #[test]
    fn test_timing_display() {
        let timing = StageTiming {
            stage: Stage::Load,
            elapsed: Duration::from_millis(12),
            resources: Some(ResourceSample {
                cpu_usage: 50.0,
                memory_mb: 64,
            }),
        };
        assert_eq!(timing.to_string(), "load 12.0ms (64MB, CPU 50.0%)");
    }
}
