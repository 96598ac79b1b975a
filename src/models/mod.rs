// Domain models: probe records and tasks, chart rows, live node reports

mod node;
mod probe;
mod row;

pub use node::{
    ConnectionsReport, CpuReport, EntitySnapshot, LOAD_KEYS, LoadReport, NetworkReport, NodeInfo,
    NodeReport, TrafficLimitType, UsedReport,
};
pub use probe::{MeasurementTask, ProbeRecord, RawSample, TaskAggregates, TaskId};
pub use row::{AlignedRow, GridRow, LiveSnapshot, TimestampMs};
