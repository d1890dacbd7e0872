use super::{RecordSink, SinkKind};
use crate::config::FileConfig;
use crate::error::{DeliveryError, SinkError};
use crate::record::LogRecord;
use crate::{delivery_error, sink_error};
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// 普通文件 sink - 追加写入固定路径
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    pub fn new(config: &FileConfig) -> Result<Self, SinkError> {
        let path = prepare_path(SinkKind::File, &config.file_path)?;
        let file = open_append(&path)?;
        debug!("File sink opened: {}", path.display());
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for FileSink {
    fn emit(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        let line = format!("{}\n", record.render_line());
        let mut file = self
            .file
            .lock()
            .map_err(|_| delivery_error!(Poisoned { sink: SinkKind::File }))?;
        write_line(&mut file, &self.path, &line)
    }

    fn flush(&self) -> Result<(), DeliveryError> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| delivery_error!(Poisoned { sink: SinkKind::File }))?;
        file.flush().map_err(|e| {
            delivery_error!(Write {
                path: self.path.clone(),
                reason: e.to_string(),
            })
        })
    }

    fn kind(&self) -> SinkKind {
        SinkKind::File
    }
}

/// 校验路径非空，并创建缺失的父目录
pub(super) fn prepare_path(kind: SinkKind, file_path: &str) -> Result<PathBuf, SinkError> {
    if file_path.trim().is_empty() {
        return Err(sink_error!(MissingSetting {
            sink: kind,
            field: "file_path",
        }));
    }

    let path = PathBuf::from(file_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty() && !p.exists()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            sink_error!(CreateDirectoryFailed {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })
        })?;
    }
    Ok(path)
}

/// 以追加模式打开（不存在则创建）
pub(super) fn open_append(path: &Path) -> Result<File, SinkError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            sink_error!(OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        })
}

/// 只接受 UTF-8 编码（或未设置）
pub(super) fn check_encoding(kind: SinkKind, encoding: Option<&str>) -> Result<(), SinkError> {
    match encoding {
        None => Ok(()),
        Some(enc) if enc.trim().is_empty() => Ok(()),
        Some(enc) if matches!(enc.to_ascii_lowercase().as_str(), "utf-8" | "utf8") => Ok(()),
        Some(enc) => Err(sink_error!(InvalidSetting {
            sink: kind,
            field: "encoding",
            reason: format!("unsupported encoding '{enc}', only utf-8 is available"),
        })),
    }
}

/// 整行一次写入，写入后立即刷新
pub(super) fn write_line(file: &mut File, path: &Path, line: &str) -> Result<(), DeliveryError> {
    file.write_all(line.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| {
            delivery_error!(Write {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Level, SourceLocation};

    #[test]
    fn test_file_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/app.log");
        let sink = FileSink::new(&FileConfig {
            alert_level: Level::Info,
            file_path: path.to_string_lossy().to_string(),
        })
        .unwrap();

        let loc = SourceLocation::new("main.rs", "main", 7);
        sink.emit(&LogRecord::new(Level::Info, "first", loc.clone())).unwrap();
        sink.emit(&LogRecord::new(Level::Error, "second", loc)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("INFO\tmain.rs - main:7 -> first"));
        assert!(lines[1].ends_with("ERROR\tmain.rs - main:7 -> second"));
    }

    #[test]
    fn test_empty_path_is_missing_setting() {
        let err = FileSink::new(&FileConfig {
            alert_level: Level::Info,
            file_path: "  ".to_string(),
        })
        .unwrap_err();
        assert!(matches!(err, SinkError::MissingSetting { field: "file_path", .. }));
    }

    #[test]
    fn test_check_encoding() {
        assert!(check_encoding(SinkKind::Rotating, None).is_ok());
        assert!(check_encoding(SinkKind::Rotating, Some("UTF-8")).is_ok());
        assert!(check_encoding(SinkKind::Rotating, Some("shift_jis")).is_err());
    }
}
