//! 轮转文件 sink：按大小 / 按时间

use super::file::{check_encoding, open_append, prepare_path, write_line};
use super::{RecordSink, SinkKind};
use crate::config::{RotatingConfig, RotationWhen, TimedRotatingConfig};
use crate::error::{DeliveryError, SinkError};
use crate::record::LogRecord;
use crate::{delivery_error, sink_error};
use chrono::{DateTime, Datelike, Local, NaiveDate, TimeDelta, TimeZone, Utc};
use log::debug;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// 延迟打开的文件句柄
#[derive(Debug)]
struct LazyFile {
    path: PathBuf,
    file: Option<File>,
}

impl LazyFile {
    fn new(path: PathBuf, delay: bool) -> Result<Self, SinkError> {
        let file = if delay { None } else { Some(open_append(&path)?) };
        Ok(Self { path, file })
    }

    fn get(&mut self) -> Result<&mut File, DeliveryError> {
        if self.file.is_none() {
            let file = open_append(&self.path).map_err(|e| {
                delivery_error!(Write {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })
            })?;
            self.file = Some(file);
        }
        // 上面已保证为 Some
        self.file.as_mut().ok_or_else(|| {
            delivery_error!(Write {
                path: self.path.clone(),
                reason: "file not open".to_string(),
            })
        })
    }

    fn close(&mut self) {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }
    }

    fn flush(&mut self) -> Result<(), DeliveryError> {
        match self.file.as_mut() {
            Some(file) => file.flush().map_err(|e| {
                delivery_error!(Write {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })
            }),
            None => Ok(()),
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// 目标已存在时先删除再重命名
fn replace(src: &Path, dst: &Path) -> io::Result<()> {
    if dst.exists() {
        fs::remove_file(dst)?;
    }
    fs::rename(src, dst)
}

fn rotate_error(path: &Path, e: &io::Error) -> DeliveryError {
    delivery_error!(Rotate {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[derive(Debug)]
struct SizeState {
    file: LazyFile,
    size: u64,
}

/// 按大小轮转：写入会使文件达到 `max_bytes` 时先轮转，保留 `path.1` … `path.N`
#[derive(Debug)]
pub struct RotatingFileSink {
    path: PathBuf,
    max_bytes: u64,
    backup_count: u32,
    state: Mutex<SizeState>,
}

impl RotatingFileSink {
    pub fn new(config: &RotatingConfig) -> Result<Self, SinkError> {
        check_encoding(SinkKind::Rotating, config.encoding.as_deref())?;
        let path = prepare_path(SinkKind::Rotating, &config.file_path)?;
        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let file = LazyFile::new(path.clone(), config.delay)?;
        debug!(
            "Rotating file sink: {} (max_bytes: {}, backups: {})",
            path.display(),
            config.max_bytes,
            config.backup_count
        );
        Ok(Self {
            path,
            max_bytes: config.max_bytes,
            backup_count: config.backup_count,
            state: Mutex::new(SizeState { file, size }),
        })
    }

    fn should_rollover(&self, current: u64, incoming: u64) -> bool {
        self.max_bytes > 0 && self.backup_count > 0 && current > 0 && current + incoming >= self.max_bytes
    }

    fn rollover(&self, state: &mut SizeState) -> Result<(), DeliveryError> {
        state.file.close();
        for i in (1..self.backup_count).rev() {
            let src = with_suffix(&self.path, &i.to_string());
            if src.exists() {
                let dst = with_suffix(&self.path, &(i + 1).to_string());
                replace(&src, &dst).map_err(|e| rotate_error(&src, &e))?;
            }
        }
        if self.path.exists() {
            let dst = with_suffix(&self.path, "1");
            replace(&self.path, &dst).map_err(|e| rotate_error(&self.path, &e))?;
        }
        state.size = 0;
        Ok(())
    }
}

impl RecordSink for RotatingFileSink {
    fn emit(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        let line = format!("{}\n", record.render_line());
        let mut state = self
            .state
            .lock()
            .map_err(|_| delivery_error!(Poisoned { sink: SinkKind::Rotating }))?;

        let incoming = line.len() as u64;
        if self.should_rollover(state.size, incoming) {
            self.rollover(&mut state)?;
        }
        let file = state.file.get()?;
        write_line(file, &self.path, &line)?;
        state.size += incoming;
        Ok(())
    }

    fn flush(&self) -> Result<(), DeliveryError> {
        self.state
            .lock()
            .map_err(|_| delivery_error!(Poisoned { sink: SinkKind::Rotating }))?
            .file
            .flush()
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Rotating
    }
}

/// 轮转时间计算（与具体时区解耦，便于测试）
#[derive(Debug, Clone, Copy)]
pub(crate) struct Schedule {
    pub when: RotationWhen,
    pub interval: u32,
    pub utc: bool,
}

impl Schedule {
    /// 一个轮转周期的长度
    pub fn period(&self) -> TimeDelta {
        let n = i64::from(self.interval.max(1));
        match self.when {
            RotationWhen::Seconds => TimeDelta::seconds(n),
            RotationWhen::Minutes => TimeDelta::minutes(n),
            RotationWhen::Hours => TimeDelta::hours(n),
            RotationWhen::Days | RotationWhen::Midnight => TimeDelta::days(n),
            RotationWhen::Weekday(_) => TimeDelta::weeks(n),
        }
    }

    /// 历史文件后缀格式
    pub fn suffix_format(&self) -> &'static str {
        match self.when {
            RotationWhen::Seconds => "%Y-%m-%d_%H-%M-%S",
            RotationWhen::Minutes => "%Y-%m-%d_%H-%M",
            RotationWhen::Hours => "%Y-%m-%d_%H",
            _ => "%Y-%m-%d",
        }
    }

    fn suffix_len(&self) -> usize {
        match self.when {
            RotationWhen::Seconds => 19,
            RotationWhen::Minutes => 16,
            RotationWhen::Hours => 13,
            _ => 10,
        }
    }

    pub fn suffix(&self, at: DateTime<Utc>) -> String {
        if self.utc {
            at.format(self.suffix_format()).to_string()
        } else {
            at.with_timezone(&Local).format(self.suffix_format()).to_string()
        }
    }

    fn matches_suffix(&self, suffix: &str) -> bool {
        suffix.len() == self.suffix_len()
            && suffix
                .chars()
                .all(|c| c.is_ascii_digit() || c == '-' || c == '_')
    }

    /// 所在时区的日期
    fn date_of(&self, at: DateTime<Utc>) -> NaiveDate {
        if self.utc {
            at.date_naive()
        } else {
            at.with_timezone(&Local).date_naive()
        }
    }

    /// 所在时区某日零点
    fn midnight_of(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let naive = date.and_hms_opt(0, 0, 0)?;
        if self.utc {
            Some(Utc.from_utc_datetime(&naive))
        } else {
            Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|t| t.with_timezone(&Utc))
        }
    }

    /// `now` 之后的下一次轮转时间
    pub fn next_rollover(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let extra = i64::from(self.interval.max(1)) - 1;
        let today = self.date_of(now);
        let aligned = match self.when {
            RotationWhen::Midnight => today
                .checked_add_signed(TimeDelta::days(1 + extra))
                .and_then(|d| self.midnight_of(d)),
            RotationWhen::Weekday(day) => {
                let current = i64::from(today.weekday().num_days_from_monday());
                let mut ahead = (i64::from(day) - current).rem_euclid(7);
                if ahead == 0 {
                    ahead = 7;
                }
                today
                    .checked_add_signed(TimeDelta::days(ahead + 7 * extra))
                    .and_then(|d| self.midnight_of(d))
            }
            _ => None,
        };
        aligned.unwrap_or(now + self.period())
    }
}

#[derive(Debug)]
struct TimedState {
    file: LazyFile,
    rollover_at: DateTime<Utc>,
}

/// 按时间轮转：到达轮转时间后把当前文件改名为 `path.<时间后缀>`，保留最近 `backup_count` 个
#[derive(Debug)]
pub struct TimedRotatingFileSink {
    path: PathBuf,
    schedule: Schedule,
    backup_count: u32,
    state: Mutex<TimedState>,
}

impl TimedRotatingFileSink {
    pub fn new(config: &TimedRotatingConfig) -> Result<Self, SinkError> {
        check_encoding(SinkKind::TimedRotating, config.encoding.as_deref())?;
        if config.interval == 0 {
            return Err(sink_error!(InvalidSetting {
                sink: SinkKind::TimedRotating,
                field: "interval",
                reason: "interval must be at least 1".to_string(),
            }));
        }
        let path = prepare_path(SinkKind::TimedRotating, &config.file_path)?;
        let schedule = Schedule {
            when: config.when,
            interval: config.interval,
            utc: config.utc,
        };

        // 以已有文件的修改时间为起点，避免重启后推迟轮转
        let start = fs::metadata(&path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let rollover_at = schedule.next_rollover(start);
        let file = LazyFile::new(path.clone(), config.delay)?;
        debug!(
            "Timed rotating file sink: {} (when: {}, interval: {}, next rollover: {})",
            path.display(),
            config.when,
            config.interval,
            rollover_at
        );

        Ok(Self {
            path,
            schedule,
            backup_count: config.backup_count,
            state: Mutex::new(TimedState { file, rollover_at }),
        })
    }

    fn rollover(&self, state: &mut TimedState, now: DateTime<Utc>) -> Result<(), DeliveryError> {
        state.file.close();
        if self.path.exists() {
            let suffix = self.schedule.suffix(state.rollover_at - self.schedule.period());
            let dst = with_suffix(&self.path, &suffix);
            replace(&self.path, &dst).map_err(|e| rotate_error(&self.path, &e))?;
        }
        if self.backup_count > 0 {
            for old in self.files_to_delete().map_err(|e| rotate_error(&self.path, &e))? {
                fs::remove_file(&old).map_err(|e| rotate_error(&old, &e))?;
            }
        }

        let mut next = self.schedule.next_rollover(now);
        while next <= now {
            next += self.schedule.period();
        }
        state.rollover_at = next;
        Ok(())
    }

    /// 超出保留数量的历史文件（最旧的在前）
    fn files_to_delete(&self) -> io::Result<Vec<PathBuf>> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let Some(base) = self.path.file_name().and_then(|n| n.to_str()) else {
            return Ok(Vec::new());
        };
        let prefix = format!("{base}.");

        let mut backups: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(std::result::Result::ok)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.strip_prefix(&prefix))
                    .is_some_and(|suffix| self.schedule.matches_suffix(suffix))
            })
            .map(|entry| entry.path())
            .collect();
        backups.sort();

        let keep = self.backup_count as usize;
        if backups.len() <= keep {
            return Ok(Vec::new());
        }
        let excess = backups.len() - keep;
        backups.truncate(excess);
        Ok(backups)
    }
}

impl RecordSink for TimedRotatingFileSink {
    fn emit(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        let line = format!("{}\n", record.render_line());
        let mut state = self
            .state
            .lock()
            .map_err(|_| delivery_error!(Poisoned { sink: SinkKind::TimedRotating }))?;

        let now = Utc::now();
        if now >= state.rollover_at {
            self.rollover(&mut state, now)?;
        }
        let file = state.file.get()?;
        write_line(file, &self.path, &line)
    }

    fn flush(&self) -> Result<(), DeliveryError> {
        self.state
            .lock()
            .map_err(|_| delivery_error!(Poisoned { sink: SinkKind::TimedRotating }))?
            .file
            .flush()
    }

    fn kind(&self) -> SinkKind {
        SinkKind::TimedRotating
    }
}
