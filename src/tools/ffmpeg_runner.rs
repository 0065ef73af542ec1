use log::{debug, warn};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// 輪詢子程序狀態的間隔
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 只保留 stderr 最後 N 位元組，避免記憶體無限成長
const MAX_STDERR_BYTES: usize = 16 * 1024;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("exited with code {code}: {stderr}")]
    Failed { code: i32, stderr: String },

    #[error("engine reported success but produced no output: {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("i/o error while waiting for engine: {0}")]
    Io(#[from] std::io::Error),
}

/// 執行外部程序並限制最長執行時間
///
/// stdout / stderr 由背景執行緒持續讀取，避免管線塞滿造成子程序卡住。
/// 逾時會 kill 並回收子程序，回傳 `EngineError::Timeout`。
pub fn run_with_timeout(mut command: Command, timeout: Duration) -> Result<Output, EngineError> {
    let program = command.get_program().to_string_lossy().to_string();
    debug!(
        "Spawning {} {}",
        program,
        command
            .get_args()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| EngineError::Spawn {
            program: program.clone(),
            source,
        })?;

    let stdout_handle = child.stdout.take().map(|s| drain(s, usize::MAX));
    let stderr_handle = child.stderr.take().map(|s| drain(s, MAX_STDERR_BYTES));

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                warn!("Cannot poll {program}, killing: {e}");
                kill_and_reap(&mut child);
                join(stdout_handle);
                join(stderr_handle);
                return Err(EngineError::Io(e));
            }
        }
        if started.elapsed() >= timeout {
            warn!("{program} exceeded {}s, killing", timeout.as_secs());
            kill_and_reap(&mut child);
            join(stdout_handle);
            join(stderr_handle);
            return Err(EngineError::Timeout {
                seconds: timeout.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let output = Output {
        status,
        stdout: join(stdout_handle),
        stderr: join(stderr_handle),
    };

    check_status(output.status, &output.stderr)?;
    Ok(output)
}

/// 確認輸出檔案存在且非空
pub fn ensure_output(path: &Path) -> Result<(), EngineError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => Err(EngineError::MissingOutput(path.to_path_buf())),
    }
}

/// 刪除失敗階段留下的殘檔，結果中不會引用失敗的檔案
pub fn discard_output(path: &Path) {
    if path.exists()
        && let Err(e) = std::fs::remove_file(path)
    {
        warn!("Failed to remove partial output {}: {e}", path.display());
    }
}

/// 終止子程序並回收，避免留下殭屍程序
fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!("kill failed (process may have exited): {e}");
    }
    let _ = child.wait();
}

fn check_status(status: ExitStatus, stderr: &[u8]) -> Result<(), EngineError> {
    if status.success() {
        return Ok(());
    }
    Err(EngineError::Failed {
        code: status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(stderr).trim().to_string(),
    })
}

fn drain<R: Read + Send + 'static>(mut reader: R, limit: usize) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut collected = Vec::new();
        let mut chunk = [0_u8; 4096];
        while let Ok(n) = reader.read(&mut chunk) {
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&chunk[..n]);
            if collected.len() > limit {
                let excess = collected.len() - limit;
                collected.drain(..excess);
            }
        }
        collected
    })
}

fn join(handle: Option<thread::JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
