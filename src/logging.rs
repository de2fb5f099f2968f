//! Best-effort debug log file. Nothing is written anywhere unless enabled.
//!
//! Formatted lines travel over a channel to a pump task that appends them to
//! the file. Call [`LogPump::finish`] before exiting so queued lines land.
use eyre::Result;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

/// Writer that forwards formatted lines to the file pump.
struct ChannelWriter {
    sender: mpsc::UnboundedSender<String>,
}

impl std::io::Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let line = String::from_utf8_lossy(buf).to_string();
        let _ = self.sender.send(line);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// RFC 3339 UTC timestamps.
struct UtcTimestamp;

impl FormatTime for UtcTimestamp {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = time::OffsetDateTime::now_utc();
        let stamp = now
            .format(&time::format_description::well_known::Rfc3339)
            .map_err(|_| std::fmt::Error)?;
        write!(w, "{stamp}")
    }
}

async fn append(file: &mut tokio::fs::File, line: &str) {
    let _ = file.write_all(line.as_bytes()).await;
    let _ = file.flush().await;
}

/// Append every received chunk to the log file until told to stop, then drain
/// whatever is still queued. Write failures are dropped.
async fn pump(
    mut rx: mpsc::UnboundedReceiver<String>,
    path: PathBuf,
    mut stop: oneshot::Receiver<()>,
) {
    let file = tokio::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(&path)
        .await;
    let Ok(mut file) = file else {
        return;
    };
    loop {
        tokio::select! {
            biased;
            line = rx.recv() => match line {
                Some(line) => append(&mut file, &line).await,
                None => return,
            },
            _ = &mut stop => break,
        }
    }
    while let Ok(line) = rx.try_recv() {
        append(&mut file, &line).await;
    }
}

/// Handle on the running pump.
pub struct LogPump {
    stop: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

impl LogPump {
    /// Write out everything logged so far and stop the pump.
    pub async fn finish(self) {
        let _ = self.stop.send(());
        let _ = self.handle.await;
    }
}

/// Create the log directory and start from an empty file.
fn prepare_log_file(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, "")?;
    Ok(())
}

/// Route tracing events into `path` when logging is enabled.
/// Returns the pump handle when a subscriber was installed.
pub fn setup_file_logger(path: Option<&Path>) -> Option<LogPump> {
    let path = path?;
    prepare_log_file(path).ok()?;

    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let (stop, stopped) = oneshot::channel();
    let handle = tokio::spawn(pump(rx, path.to_path_buf(), stopped));

    let installed = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_timer(UtcTimestamp)
        .with_file(false)
        .with_line_number(false)
        .with_level(true)
        .with_target(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || ChannelWriter { sender: tx.clone() })
        .try_init()
        .is_ok();
    installed.then_some(LogPump { stop, handle })
}
