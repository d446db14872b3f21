mod support;

use std::ffi::OsStr;
use std::fs;
use std::time::Instant;

use tempfile::tempdir;

use support::{expect_success, run_blitz, spawn_http_server};
#[cfg(unix)]
use support::{send_signal, spawn_blitz};

fn row<'out>(stdout: &'out str, label: &str, tag: &str) -> Option<&'out str> {
    stdout
        .lines()
        .find(|line| line.starts_with(label) && line.contains(tag))
        .and_then(|line| line.split(tag).nth(1))
        .map(str::trim)
}

#[test]
fn e2e_count_run_reports_totals() -> Result<(), String> {
    let (url, _server) = spawn_http_server()?;

    let output = run_blitz(["-u", &url, "-n", "20", "-c", "4", "--no-progress"])?;
    let stdout = expect_success(&output)?;

    if row(&stdout, "Requests", "[total]") != Some("20 hits") {
        return Err(format!("Unexpected total:\n{}", stdout));
    }
    if row(&stdout, "Requests", "[success]") != Some("20 hits") {
        return Err(format!("Unexpected success count:\n{}", stdout));
    }
    if row(&stdout, "Status Codes", "[code:count]") != Some("200:20") {
        return Err(format!("Unexpected status codes:\n{}", stdout));
    }
    if row(&stdout, "Network Errors", "[total]") != Some("0") {
        return Err(format!("Unexpected network errors:\n{}", stdout));
    }
    Ok(())
}

#[test]
fn e2e_duration_run_stops_on_time() -> Result<(), String> {
    let (url, _server) = spawn_http_server()?;

    let started = Instant::now();
    let output = run_blitz([
        "-u",
        &url,
        "-d",
        "1",
        "-c",
        "2",
        "-r",
        "50",
        "--no-progress",
    ])?;
    let elapsed = started.elapsed();
    let stdout = expect_success(&output)?;

    if elapsed.as_secs() >= 10 {
        return Err(format!("Duration run took {:?}", elapsed));
    }
    let duration = row(&stdout, "Duration", "[total]").unwrap_or_default();
    if !duration.starts_with("1.") {
        return Err(format!("Unexpected duration:\n{}", stdout));
    }
    Ok(())
}

#[test]
fn e2e_request_file_with_exports() -> Result<(), String> {
    let (url, _server) = spawn_http_server()?;
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;

    let requests = dir.path().join("requests.txt");
    fs::write(
        &requests,
        format!(
            "{url}/a\n{url}/b\tPOST\tname=value\t-H 'X-Test: 1'\n",
            url = url
        ),
    )
    .map_err(|err| format!("write request file failed: {}", err))?;
    let csv = dir.path().join("samples.csv");
    let json = dir.path().join("report.json");

    let args: Vec<&OsStr> = vec![
        OsStr::new("-f"),
        requests.as_os_str(),
        OsStr::new("-n"),
        OsStr::new("10"),
        OsStr::new("-c"),
        OsStr::new("2"),
        OsStr::new("--disable-keepalive"),
        OsStr::new("--no-progress"),
        OsStr::new("--export-csv"),
        csv.as_os_str(),
        OsStr::new("--export-json"),
        json.as_os_str(),
    ];
    let output = run_blitz(args)?;
    expect_success(&output)?;

    let csv_text =
        fs::read_to_string(&csv).map_err(|err| format!("read csv failed: {}", err))?;
    let mut lines = csv_text.lines();
    if lines.next() != Some("elapsed_ms,latency_us,success") || lines.count() != 10 {
        return Err(format!("Unexpected CSV:\n{}", csv_text));
    }

    let json_text =
        fs::read_to_string(&json).map_err(|err| format!("read json failed: {}", err))?;
    let report: serde_json::Value =
        serde_json::from_str(&json_text).map_err(|err| format!("parse json failed: {}", err))?;
    if report.get("total_bytes") != Some(&serde_json::json!(1000)) {
        return Err(format!("Unexpected JSON report: {}", json_text));
    }
    Ok(())
}

#[test]
fn e2e_missing_stop_condition_fails() -> Result<(), String> {
    let output = run_blitz(["-u", "http://127.0.0.1:9/", "--no-progress"])?;
    if output.status.success() {
        return Err("Expected failure without --number or --duration".to_owned());
    }
    Ok(())
}

#[cfg(unix)]
#[test]
fn e2e_double_interrupt_prints_one_report() -> Result<(), String> {
    use std::io::{BufRead, BufReader, Read};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
    const EXIT_TIMEOUT: Duration = Duration::from_secs(10);

    let (url, _server) = spawn_http_server()?;
    let mut child = spawn_blitz([
        "-u",
        &url,
        "-d",
        "30",
        "-c",
        "2",
        "-r",
        "50",
        "--no-progress",
        "--no-color",
    ])?;

    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| "stderr was not piped".to_owned())?;
    let (line_tx, line_rx) = mpsc::channel();
    let reader = thread::spawn(move || {
        for line in BufReader::new(stderr).lines().map_while(Result::ok) {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut logs: Vec<String> = Vec::new();
    let started_at = Instant::now();
    while !logs.iter().any(|line| line.contains("Starting run")) {
        let remaining = STARTUP_TIMEOUT.saturating_sub(started_at.elapsed());
        match line_rx.recv_timeout(remaining) {
            Ok(line) => logs.push(line),
            Err(err) => {
                drop(child.kill());
                return Err(format!("Run never started ({}): {:?}", err, logs));
            }
        }
    }
    // Let the signal watcher task register before interrupting.
    thread::sleep(Duration::from_millis(500));

    send_signal(&child, "INT")?;
    send_signal(&child, "INT")?;

    let waiting_since = Instant::now();
    let status = loop {
        if let Some(status) = child
            .try_wait()
            .map_err(|err| format!("wait for blitz failed: {}", err))?
        {
            break status;
        }
        if waiting_since.elapsed() >= EXIT_TIMEOUT {
            drop(child.kill());
            return Err("blitz did not exit after SIGINT".to_owned());
        }
        thread::sleep(Duration::from_millis(20));
    };

    let mut stdout = String::new();
    if let Some(mut pipe) = child.stdout.take() {
        pipe.read_to_string(&mut stdout)
            .map_err(|err| format!("read stdout failed: {}", err))?;
    }
    reader
        .join()
        .map_err(|_err| "stderr reader panicked".to_owned())?;
    logs.extend(line_rx.try_iter());

    if !status.success() {
        return Err(format!(
            "Expected exit 0, got {}\nstderr: {:?}",
            status, logs
        ));
    }
    let reports = stdout
        .lines()
        .filter(|line| line.starts_with("Requests") && line.contains("[total]"))
        .count();
    if reports != 1 {
        return Err(format!(
            "Expected exactly one report, got {}:\n{}",
            reports, stdout
        ));
    }
    if !logs
        .iter()
        .any(|line| line.contains("Run stopped early: interrupt"))
    {
        return Err(format!("Missing interrupt stop reason: {:?}", logs));
    }
    Ok(())
}
