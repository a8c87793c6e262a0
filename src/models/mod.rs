// Domain models shared by the pipeline, fetch and live paths

mod device;
mod level;
mod series;

pub use device::{DeviceInfo, Phase, StreamStatistics};
pub use level::AggregationLevel;
pub use series::{
    EnergyOverlay, Metric, MetricValues, Sample, SeriesColumn, Stream, UnifiedFrame, UnifiedSeries,
};
