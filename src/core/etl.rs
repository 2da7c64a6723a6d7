use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Drives a [`Pipeline`] through its three phases.
pub struct ExtractEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> ExtractEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting extraction");
        self.monitor.log_stats("Started");

        tracing::info!("Loading ontology and import specification...");
        let input = self.pipeline.extract().await?;
        self.monitor.log_stats("Inputs loaded");

        tracing::info!("Extracting module...");
        let module = self.pipeline.transform(input).await?;
        tracing::info!(
            "Module has {} terms and {} edges",
            module.terms().len(),
            module.edges().len()
        );
        self.monitor.log_stats("Module extracted");

        tracing::info!("Writing module...");
        let output_path = self.pipeline.load(module).await?;
        tracing::info!("Output saved to: {}", output_path);

        self.monitor.log_final_stats();
        Ok(output_path)
    }
}
