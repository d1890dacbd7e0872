use super::{RecordSink, SinkKind};
use crate::config::{ConsoleConfig, ConsoleStream};
use crate::delivery_error;
use crate::error::{DeliveryError, SinkError};
use crate::record::LogRecord;
use std::io::{self, Write};
use std::path::PathBuf;

/// 控制台 sink - 每条记录写一行并立即刷新
#[derive(Debug)]
pub struct ConsoleSink {
    stream: ConsoleStream,
}

impl ConsoleSink {
    pub fn new(config: &ConsoleConfig) -> Result<Self, SinkError> {
        Ok(Self {
            stream: config.stream,
        })
    }

    fn write_line(out: &mut dyn Write, line: &str) -> io::Result<()> {
        writeln!(out, "{line}")?;
        out.flush()
    }
}

impl RecordSink for ConsoleSink {
    fn emit(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        let line = record.render_line();
        let (result, name) = match self.stream {
            ConsoleStream::Stdout => (Self::write_line(&mut io::stdout().lock(), &line), "<stdout>"),
            ConsoleStream::Stderr => (Self::write_line(&mut io::stderr().lock(), &line), "<stderr>"),
        };
        result.map_err(|e| {
            delivery_error!(Write {
                path: PathBuf::from(name),
                reason: e.to_string(),
            })
        })
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Console
    }
}
