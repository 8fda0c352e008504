//! MoTeC CSV raw-log writer.
//!
//! Rows are streamed to a hidden spool file in the log directory while a
//! recording is open. On save the header is written to the final file and the
//! spooled rows are copied in behind it, so a venue inferred mid-session still
//! lands in the header and the file name.

use std::fs::{self, File};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use gt7_telemetry_core::{
    ChannelSample, ChannelSchema, LapMarker, LogSink, Sample, SessionEvent, TelemetryMessage,
    TelemetrySink,
};
use gt7_telemetry_errors::{ErrorContext, ResultExt, SinkError};
use tracing::{debug, error, info, warn};

pub const DEFAULT_FILE_TEMPLATE: &str = "{datetime}_{venue}_{vehicle}.csv";

static SPOOL_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq)]
pub struct RawLogConfig {
    pub log_dir: PathBuf,
    /// Placeholders: `{datetime}`, `{date}`, `{time}`, `{venue}`, `{vehicle}`,
    /// `{driver}`, `{session}`, `{name}`
    pub file_template: String,
    pub sampling_frequency_hz: u32,
}

impl Default for RawLogConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            file_template: DEFAULT_FILE_TEMPLATE.to_string(),
            sampling_frequency_hz: gt7_telemetry_core::DEFAULT_SAMPLING_FREQUENCY_HZ,
        }
    }
}

/// Everything the header needs; the rows themselves live in the spool.
#[derive(Debug, Clone)]
pub struct RecordedLog {
    pub schema: Arc<ChannelSchema>,
    pub event: SessionEvent,
    pub laps: Vec<LapMarker>,
    pub samples: usize,
    start: Option<f64>,
    end: f64,
}

impl RecordedLog {
    pub fn new(schema: Arc<ChannelSchema>, event: SessionEvent) -> Self {
        Self {
            schema,
            event,
            laps: Vec::new(),
            samples: 0,
            start: None,
            end: 0.0,
        }
    }

    /// Count `timestamp` as a recorded row and return the log's start time.
    fn record(&mut self, timestamp: f64) -> f64 {
        let start = *self.start.get_or_insert(timestamp);
        self.end = timestamp;
        self.samples += 1;
        start
    }

    pub fn start_time(&self) -> f64 {
        self.start.unwrap_or(0.0)
    }

    pub fn duration(&self) -> f64 {
        self.start.map_or(0.0, |start| self.end - start)
    }
}

/// An open recording and the spool its rows go to.
#[derive(Debug)]
struct ActiveLog {
    log: RecordedLog,
    spool_path: PathBuf,
    /// Holds the first write error once the spool has failed
    rows: io::Result<BufWriter<File>>,
}

impl ActiveLog {
    fn open(dir: &Path, schema: &Arc<ChannelSchema>, event: &SessionEvent) -> Self {
        let seq = SPOOL_SEQ.fetch_add(1, Ordering::Relaxed);
        let spool_path = dir.join(format!(".gt7-{}-{seq}.rows", std::process::id()));
        let rows = fs::create_dir_all(dir)
            .and_then(|()| File::create(&spool_path))
            .map(BufWriter::new);
        if let Err(e) = &rows {
            error!(path = %spool_path.display(), error = %e, "Failed to open raw log spool");
        }
        Self {
            log: RecordedLog::new(Arc::clone(schema), event.clone()),
            spool_path,
            rows,
        }
    }

    fn push(&mut self, sample: &ChannelSample) {
        let start = self.log.record(sample.timestamp);
        let result = match self.rows.as_mut() {
            Ok(out) => write_row(out, sample, start),
            Err(_) => Ok(()),
        };
        if let Err(e) = result {
            error!(path = %self.spool_path.display(), error = %e, "Failed to spool raw log row");
            self.rows = Err(e);
        }
    }

    /// Write the header to `path` followed by the spooled rows, then remove
    /// the spool.
    fn save(self, path: &Path, sampling_frequency_hz: u32) -> Result<(), SinkError> {
        let Self {
            log,
            spool_path,
            rows,
        } = self;
        let result = assemble(path, &log, &spool_path, rows, sampling_frequency_hz);
        remove_spool(&spool_path);
        result
    }

    fn discard(self) {
        debug!(samples = self.log.samples, "Discarding unsaved log");
        drop(self.rows);
        remove_spool(&self.spool_path);
    }
}

/// Raw-log sink writing one MoTeC CSV file per recording.
///
/// Every call is a no-op when no recording is active.
#[derive(Debug)]
pub struct MotecCsvWriter {
    config: RawLogConfig,
    active: Option<ActiveLog>,
    saved: Vec<PathBuf>,
}

impl MotecCsvWriter {
    pub fn new(config: RawLogConfig) -> Self {
        Self {
            config,
            active: None,
            saved: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Files written so far.
    pub fn saved_files(&self) -> &[PathBuf] {
        &self.saved
    }

    fn begin(&mut self, schema: &Arc<ChannelSchema>, event: &SessionEvent) {
        if let Some(stale) = self.active.take() {
            stale.discard();
        }
        info!(vehicle = %event.vehicle, "Raw log opened");
        self.active = Some(ActiveLog::open(&self.config.log_dir, schema, event));
    }

    fn push_sample(&mut self, sample: &ChannelSample) {
        if let Some(active) = self.active.as_mut() {
            active.push(sample);
        }
    }

    fn push_lap(&mut self, marker: LapMarker) {
        if let Some(active) = self.active.as_mut() {
            active.log.laps.push(marker);
        }
    }

    fn set_event(&mut self, event: &SessionEvent) {
        if let Some(active) = self.active.as_mut() {
            active.log.event = event.clone();
        }
    }

    /// Detach the active recording and pick its path.
    fn finish(&mut self) -> Option<(PathBuf, ActiveLog)> {
        let active = self.active.take()?;
        let path = unique_path(&self.config.log_dir.join(render_file_name(
            &self.config.file_template,
            &active.log.event,
        )));
        Some((path, active))
    }

    fn record_saved(&mut self, path: PathBuf, samples: usize) {
        info!(path = %path.display(), samples, "Raw log saved");
        self.saved.push(path);
    }
}

impl Drop for MotecCsvWriter {
    fn drop(&mut self) {
        if let Some(stale) = self.active.take() {
            stale.discard();
        }
    }
}

impl LogSink for MotecCsvWriter {
    fn new_log(&mut self, schema: &Arc<ChannelSchema>, event: &SessionEvent) {
        self.begin(schema, event);
    }

    fn add_samples(&mut self, sample: ChannelSample) {
        self.push_sample(&sample);
    }

    fn add_lap(&mut self, marker: LapMarker) {
        self.push_lap(marker);
    }

    fn update_event(&mut self, event: &SessionEvent) {
        self.set_event(event);
    }

    fn save_log(&mut self) {
        let Some((path, active)) = self.finish() else {
            return;
        };
        let samples = active.log.samples;
        match active.save(&path, self.config.sampling_frequency_hz) {
            Ok(()) => self.record_saved(path, samples),
            Err(e) => error!(path = %path.display(), error = %e, "Failed to save raw log"),
        }
    }
}

#[async_trait]
impl TelemetrySink for MotecCsvWriter {
    fn name(&self) -> &str {
        "raw-log"
    }

    async fn deliver(&mut self, message: &TelemetryMessage) -> Result<(), SinkError> {
        match message {
            TelemetryMessage::SessionStarted { schema, event } => self.begin(schema, event),
            TelemetryMessage::Sample(Sample::Channels(sample)) => self.push_sample(sample),
            TelemetryMessage::Sample(Sample::Lap(marker)) => self.push_lap(*marker),
            TelemetryMessage::EventUpdated(event) => self.set_event(event),
            TelemetryMessage::SessionEnded => return self.save_in_background().await,
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.save_in_background().await
    }
}

impl MotecCsvWriter {
    async fn save_in_background(&mut self) -> Result<(), SinkError> {
        let Some((path, active)) = self.finish() else {
            return Ok(());
        };
        let frequency = self.config.sampling_frequency_hz;
        let samples = active.log.samples;
        let target = path.clone();
        let context = ErrorContext::new("write raw log").with("path", path.display().to_string());
        tokio::task::spawn_blocking(move || active.save(&target, frequency))
            .await
            .map_context(context, SinkError::Task)??;
        self.record_saved(path, samples);
        Ok(())
    }
}

fn write_row(out: &mut impl Write, sample: &ChannelSample, start: f64) -> io::Result<()> {
    write!(out, "{:.3}", sample.timestamp - start)?;
    for value in &sample.values {
        write!(out, ",{}", format_value(*value))?;
    }
    writeln!(out)
}

fn assemble(
    path: &Path,
    log: &RecordedLog,
    spool_path: &Path,
    rows: io::Result<BufWriter<File>>,
    sampling_frequency_hz: u32,
) -> Result<(), SinkError> {
    // Flushes the buffered rows and closes the spool before it is read back.
    drop(rows?.into_inner().map_err(io::IntoInnerError::into_error)?);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(render_header(log, sampling_frequency_hz).as_bytes())?;
    io::copy(&mut File::open(spool_path)?, &mut out)?;
    out.flush()?;
    Ok(())
}

fn remove_spool(path: &Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "Failed to remove raw log spool");
    }
}

/// Header block, blank line, channel names and units.
pub fn render_header(log: &RecordedLog, sampling_frequency_hz: u32) -> String {
    let event = &log.event;
    let start = log.start_time();
    let field = |key: &str, value: &str| format!("{},{}", quote(key), quote(value));

    let beacons = log
        .laps
        .iter()
        .map(|lap| format!("{:.3}", lap.timestamp - start))
        .collect::<Vec<_>>()
        .join(",");
    let names = log.schema.names().map(quote).collect::<Vec<_>>().join(",");
    let units = log
        .schema
        .channels()
        .iter()
        .map(|spec| quote(spec.unit.unwrap_or_default()))
        .collect::<Vec<_>>()
        .join(",");

    let lines = [
        field("Format", "MoTeC CSV File"),
        field("Venue", &event.venue),
        field("Vehicle", &event.vehicle),
        field("Driver", &event.driver),
        field("Device", "GT7"),
        field("Event", &event.name),
        field("Session", &event.session),
        field("Comment", &event.comment),
        field("Short Comment", &event.short_comment),
        field("Log Date", event.date().unwrap_or_default()),
        field("Log Time", event.time().unwrap_or_default()),
        format!("{},{},{}", quote("Sample Rate"), sampling_frequency_hz, quote("Hz")),
        format!("{},{:.3},{}", quote("Duration"), log.duration(), quote("s")),
        format!("{},{}", quote("Beacon Markers"), beacons),
        String::new(),
        format!("{},{}", quote("Time"), names),
        format!("{},{}", quote("s"), units),
    ];
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Expand `template` with the event's fields, keeping the result a single
/// safe path component.
pub fn render_file_name(template: &str, event: &SessionEvent) -> String {
    let datetime = event.datetime.as_deref().unwrap_or_default();
    let rendered = template
        .replace("{datetime}", &placeholder(&datetime.replace(':', "-")))
        .replace("{date}", &placeholder(event.date().unwrap_or_default()))
        .replace("{time}", &placeholder(&event.time().unwrap_or_default().replace(':', "-")))
        .replace("{venue}", &placeholder(&event.venue))
        .replace("{vehicle}", &placeholder(&event.vehicle))
        .replace("{driver}", &placeholder(&event.driver))
        .replace("{session}", &placeholder(&event.session))
        .replace("{name}", &placeholder(&event.name));
    rendered
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

fn placeholder(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (1u32..)
        .map(|n| path.with_file_name(format!("{stem}-{n}{extension}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn format_value(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        String::new()
    }
}
