use std::ffi::OsStr;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::process::{Command, Output};
#[cfg(unix)]
use std::process::{Child, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub const BODY_LEN: usize = 100;

pub struct ServerHandle {
    shutdown: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _send_result = self.shutdown.send(());
        if let Some(handle) = self.thread.take() {
            drop(handle.join());
        }
    }
}

/// Spawn a keep-alive HTTP/1.1 server that answers every request with a
/// fixed 100-byte body.
///
/// # Errors
///
/// Returns an error if the listener cannot be created or configured.
pub fn spawn_http_server() -> Result<(String, ServerHandle), String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind test server failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("server addr failed: {}", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("set_nonblocking failed: {}", err))?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            match listener.accept() {
                Ok((stream, _)) => {
                    thread::spawn(move || handle_client(stream));
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(5));
                }
                Err(_) => break,
            }
        }
    });

    Ok((
        format!("http://{}", addr),
        ServerHandle {
            shutdown: shutdown_tx,
            thread: Some(handle),
        },
    ))
}

fn handle_client(mut stream: TcpStream) {
    if stream.set_nonblocking(false).is_err() {
        return;
    }
    let mut pending: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 2048];
    loop {
        let read = match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(read) => read,
        };
        pending.extend_from_slice(chunk.get(..read).unwrap_or_default());

        while let Some(end) = header_end(&pending) {
            let head: Vec<u8> = pending.drain(..end).collect();
            let close = String::from_utf8_lossy(&head)
                .to_ascii_lowercase()
                .contains("connection: close");
            let mut response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}\r\n",
                BODY_LEN,
                if close { "Connection: close\r\n" } else { "" }
            )
            .into_bytes();
            response.extend(std::iter::repeat_n(b'x', BODY_LEN));
            if stream.write_all(&response).is_err() || stream.flush().is_err() {
                return;
            }
            if close {
                drop(stream.shutdown(Shutdown::Both));
                return;
            }
        }
    }
}

fn header_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos.saturating_add(4))
}

/// Run the `blitz` binary and capture output.
///
/// # Errors
///
/// Returns an error if the binary cannot be executed.
pub fn run_blitz<I, S>(args: I) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = blitz_bin()?;
    Command::new(bin)
        .args(args)
        .env("RUST_LOG", "error")
        .env_remove("BLITZ_LOG")
        .output()
        .map_err(|err| format!("run blitz failed: {}", err))
}

fn blitz_bin() -> Result<String, String> {
    option_env!("CARGO_BIN_EXE_blitz").map_or_else(
        || Err("CARGO_BIN_EXE_blitz missing at compile time.".to_owned()),
        |path| Ok(path.to_owned()),
    )
}

/// Fails with both output streams when the process did not succeed.
///
/// # Errors
///
/// Returns the captured output when the exit status is not success.
pub fn expect_success(output: &Output) -> Result<String, String> {
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return Ok(stdout);
    }
    Err(format!(
        "stdout: {}\nstderr: {}",
        stdout,
        String::from_utf8_lossy(&output.stderr)
    ))
}

/// Spawn the `blitz` binary with piped output and info-level, uncoloured logs.
///
/// # Errors
///
/// Returns an error if the binary cannot be started.
#[cfg(unix)]
pub fn spawn_blitz<I, S>(args: I) -> Result<Child, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = blitz_bin()?;
    Command::new(bin)
        .args(args)
        .env("RUST_LOG", "info")
        .env_remove("BLITZ_LOG")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| format!("spawn blitz failed: {}", err))
}

/// Deliver a signal (e.g. `INT`, `TERM`) to a child through `kill`.
///
/// # Errors
///
/// Returns an error if `kill` cannot run or rejects the signal.
#[cfg(unix)]
pub fn send_signal(child: &Child, signal: &str) -> Result<(), String> {
    let status = Command::new("kill")
        .arg(format!("-{}", signal))
        .arg(child.id().to_string())
        .status()
        .map_err(|err| format!("run kill failed: {}", err))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("kill -{} exited with {}", signal, status))
    }
}
