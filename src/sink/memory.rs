use super::{RecordSink, SinkKind};
use crate::delivery_error;
use crate::error::DeliveryError;
use crate::record::LogRecord;
use std::sync::{Arc, Mutex};

/// 进程内 sink：把记录保存在内存中，克隆共享同一份缓冲
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已接收记录的快照
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.message).collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }
}

impl RecordSink for MemorySink {
    fn emit(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        self.records
            .lock()
            .map_err(|_| delivery_error!(Poisoned { sink: SinkKind::Memory }))?
            .push(record.clone());
        Ok(())
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Memory
    }
}
