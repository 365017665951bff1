/// Options Flow - index option volume anomaly alerts
///
/// Base 5 second bars of an index and its option contracts are aggregated into 30 second,
/// 1 minute and 5 minute bars. Each option bar whose volume is an outlier against its own
/// running statistics becomes an alert tagged along twelve dimensions. Thirty minutes later
/// the alert is scored against the option's subsequent price action, and the score is folded
/// into win-rate statistics per tag combination and per tag value.
///
/// The crate includes:
/// - Bar aggregation and running statistics per contract ([`series`], [`stats`])
/// - Alert classification into [`tags::AlertTags`] ([`classifier`])
/// - Outcome scoring and win-rate statistics ([`outcome`], [`tag_stats`])
/// - A concurrent ingestion registry and background outcome worker ([`registry`], [`pipeline`])
pub mod alert;
pub mod bar;
pub mod classifier;
pub mod config;
pub mod contract;
pub mod error;
pub mod outcome;
pub mod pipeline;
pub mod queue;
pub mod registry;
pub mod series;
pub mod session;
pub mod sink;
pub mod stats;
pub mod tag_stats;
pub mod tags;
pub mod timeframe;

// Re-export commonly used types for convenience
pub use alert::Alert;
pub use bar::Bar;
pub use config::{Maturity, PipelineConfig};
pub use contract::{ContractId, ContractKind};
pub use error::FlowError;
pub use outcome::{AlertOutcome, OutcomeConfig, OutcomeEvaluator, WinClass};
pub use pipeline::{AlertPipeline, AlertPipelineBuilder, WorkerStatus};
pub use series::BarSeries;
pub use session::SessionHours;
pub use sink::{NoopHook, PersistenceHook, TagIdTable};
pub use tag_stats::{TagStatEntry, TagStatistics, TagStatsSnapshot};
pub use tags::{AlertTags, OptionType, TagDimension, TagValue};
pub use timeframe::Timeframe;
