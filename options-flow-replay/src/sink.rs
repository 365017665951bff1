use chrono::{DateTime, Utc};
use options_flow::{
    Alert, AlertOutcome, Bar, ContractId, FlowError, OptionType, PersistenceHook, TagDimension,
    TagIdTable, TagStatEntry, TagStatsSnapshot, TagValue, Timeframe,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// One line of the persistence output.
#[derive(Debug, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Record<'a> {
    TagIds {
        entries: Vec<(u16, TagValue)>,
    },
    Bar {
        timeframe: Timeframe,
        #[serde(flatten)]
        bar: &'a Bar,
    },
    Alert {
        contract: ContractId,
        option_type: OptionType,
        strike: f64,
        timeframe: Timeframe,
        reference_price: f64,
        reference_time: DateTime<Utc>,
        tag_ids: [u16; TagDimension::COUNT],
        packed_tags: u64,
    },
    Outcome {
        contract: ContractId,
        reference_time: DateTime<Utc>,
        packed_tags: u64,
        #[serde(flatten)]
        outcome: &'a AlertOutcome,
        combination: &'a TagStatEntry,
    },
    Snapshot {
        #[serde(flatten)]
        snapshot: &'a TagStatsSnapshot,
    },
}

/// [`PersistenceHook`] writing JSON lines to a file, with tags stored as [`TagIdTable`] ids.
#[derive(Debug)]
pub struct JsonlSink {
    writer: Mutex<BufWriter<File>>,
    table: TagIdTable,
    write_bars: bool,
}

impl JsonlSink {
    /// Create (truncating) `path` and write the tag id table as its first record.
    pub fn create(path: impl AsRef<Path>, write_bars: bool) -> Result<Self, FlowError> {
        let file = File::create(path).map_err(|error| FlowError::Sink(error.to_string()))?;

        let sink = Self {
            writer: Mutex::new(BufWriter::new(file)),
            table: TagIdTable::new(),
            write_bars,
        };

        sink.write(&Record::TagIds {
            entries: sink.table.entries().collect(),
        })?;

        Ok(sink)
    }

    pub fn flush(&self) -> Result<(), FlowError> {
        self.writer
            .lock()
            .flush()
            .map_err(|error| FlowError::Sink(error.to_string()))
    }

    fn write(&self, record: &Record<'_>) -> Result<(), FlowError> {
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, record)
            .map_err(|error| FlowError::Sink(error.to_string()))?;
        writer
            .write_all(b"\n")
            .map_err(|error| FlowError::Sink(error.to_string()))
    }
}

impl PersistenceHook for JsonlSink {
    fn on_bar(&self, timeframe: Timeframe, bar: &Bar) -> Result<(), FlowError> {
        if !self.write_bars {
            return Ok(());
        }
        self.write(&Record::Bar { timeframe, bar })
    }

    fn on_alert(&self, alert: &Alert) -> Result<(), FlowError> {
        self.write(&Record::Alert {
            contract: alert.contract,
            option_type: alert.option_type,
            strike: alert.strike,
            timeframe: alert.timeframe,
            reference_price: alert.reference_price,
            reference_time: alert.reference_time,
            tag_ids: self.table.ids(&alert.tags)?,
            packed_tags: self.table.pack(&alert.tags),
        })
    }

    fn on_outcome(
        &self,
        alert: &Alert,
        outcome: &AlertOutcome,
        entry: &TagStatEntry,
    ) -> Result<(), FlowError> {
        self.write(&Record::Outcome {
            contract: alert.contract,
            reference_time: alert.reference_time,
            packed_tags: self.table.pack(&alert.tags),
            outcome,
            combination: entry,
        })
    }

    fn on_snapshot(&self, snapshot: &TagStatsSnapshot) -> Result<(), FlowError> {
        self.write(&Record::Snapshot { snapshot })?;
        self.flush()
    }
}
