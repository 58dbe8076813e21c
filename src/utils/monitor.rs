//! Optional per-phase resource sampling for the sheet pipeline.

use std::time::Duration;
#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::Instant;
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

/// Resource usage when a pipeline phase finished.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSample {
    pub phase: String,
    /// Time spent in this phase alone.
    pub duration: Duration,
    pub cpu_usage: f32,
    pub memory_mb: u64,
}

#[cfg(feature = "cli")]
pub struct SystemMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    started: Instant,
    samples: Mutex<Vec<PhaseSample>>,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let pid = if enabled {
            sysinfo::get_current_pid()
                .map_err(|e| tracing::warn!("System monitoring unavailable: {}", e))
                .ok()
        } else {
            None
        };

        let system = if pid.is_some() {
            let mut system = System::new_with_specifics(RefreshKind::everything());
            system.refresh_all();
            system
        } else {
            System::new()
        };

        Self {
            system: Mutex::new(system),
            pid,
            started: Instant::now(),
            samples: Mutex::new(Vec::new()),
            enabled: pid.is_some(),
        }
    }

    /// Records and logs usage at the end of `phase`.
    pub fn log_stats(&self, phase: &str) {
        if let Some(sample) = self.sample(phase) {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB, Took: {:?}",
                sample.phase,
                sample.cpu_usage,
                sample.memory_mb,
                sample.duration
            );
        }
    }

    pub fn log_final_stats(&self) {
        let samples = self.samples();
        let Some(peak) = samples.iter().map(|s| s.memory_mb).max() else {
            return;
        };
        let slowest = samples
            .iter()
            .max_by_key(|s| s.duration)
            .map(|s| s.phase.as_str())
            .unwrap_or("-");
        tracing::info!(
            "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB, Slowest phase: {}",
            self.started.elapsed(),
            peak,
            slowest
        );
    }

    pub fn samples(&self) -> Vec<PhaseSample> {
        self.samples
            .lock()
            .map(|samples| samples.clone())
            .unwrap_or_default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn sample(&self, phase: &str) -> Option<PhaseSample> {
        if !self.enabled {
            return None;
        }

        let (cpu_usage, memory_mb) = {
            let mut system = self.system.lock().ok()?;
            system.refresh_all();
            let process = system.process(self.pid?)?;
            (process.cpu_usage(), process.memory() / 1024 / 1024)
        };

        let mut samples = self.samples.lock().ok()?;
        let elapsed_before: Duration = samples.iter().map(|s| s.duration).sum();
        let sample = PhaseSample {
            phase: phase.to_string(),
            duration: self.started.elapsed().saturating_sub(elapsed_before),
            cpu_usage,
            memory_mb,
        };
        samples.push(sample.clone());
        Some(sample)
    }
}

#[cfg(feature = "cli")]
impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// Without sysinfo every call is a no-op.
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct SystemMonitor;

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn log_stats(&self, _phase: &str) {}

    pub fn log_final_stats(&self) {}

    pub fn samples(&self) -> Vec<PhaseSample> {
        Vec::new()
    }

    pub fn is_enabled(&self) -> bool {
        false
    }
}
