use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        let name = self.pipeline.name().to_string();
        tracing::info!("🚀 Starting {} pipeline", name);
        self.monitor.log_stats("Start");

        tracing::debug!("[{}] extracting", name);
        let raw_data = self.pipeline.extract().await?;
        self.monitor.log_stats("Extract");

        tracing::debug!("[{}] transforming", name);
        let transformed = self.pipeline.transform(raw_data).await?;
        self.monitor.log_stats("Transform");

        tracing::debug!("[{}] loading", name);
        let output_path = self.pipeline.load(transformed).await?;
        self.monitor.log_stats("Load");

        tracing::info!("✅ {} pipeline finished: {}", name, output_path);
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}
