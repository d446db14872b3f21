use crate::metrics::Report;

const RULE: &str =
    "----------------------------------------------------------------------------------";
const COLUMN_GAP: &str = "   ";

/// Renders the report as aligned `label [tag] value` rows.
#[must_use]
pub fn render_summary(report: &Report, show_errors: bool) -> String {
    let rows = summary_rows(report);
    let label_width = rows.iter().map(|row| row.0.len()).max().unwrap_or(0);
    let tag_width = rows.iter().map(|row| row.1.len()).max().unwrap_or(0);

    let mut lines = Vec::with_capacity(rows.len().saturating_add(4));
    lines.push(RULE.to_owned());
    lines.extend(rows.iter().map(|(label, tag, value)| {
        format!(
            "{:<label_width$}{}{:<tag_width$}{}{}",
            label, COLUMN_GAP, tag, COLUMN_GAP, value
        )
    }));
    lines.push(RULE.to_owned());

    if show_errors && !report.errors.is_empty() {
        lines.push(String::new());
        lines.push("Network Errors: [error]: [count]".to_owned());
        lines.extend(
            report
                .errors
                .iter()
                .map(|(message, count)| format!("{}: [{}]", message, count)),
        );
    }
    lines.join("\n")
}

pub fn print_summary(report: &Report, show_errors: bool) {
    println!();
    println!("{}", render_summary(report, show_errors));
}

fn summary_rows(report: &Report) -> Vec<(&'static str, &'static str, String)> {
    let status_codes = report
        .status_codes
        .iter()
        .map(|(code, count)| format!("{}:{}", code, count))
        .collect::<Vec<_>>()
        .join("  ");
    let latency = report.latency;

    vec![
        (
            "Requests",
            "[total]",
            format!("{} hits", report.total_requests),
        ),
        (
            "Requests",
            "[success]",
            format!("{} hits", report.total_success),
        ),
        (
            "Availability",
            "[ratio]",
            format!("{}%", fixed_x100(report.availability_x100)),
        ),
        (
            "Network Errors",
            "[total]",
            report.network_errors.to_string(),
        ),
        ("Status Codes", "[code:count]", status_codes),
        (
            "Latencies",
            "[mean, 50p, 99p, max]",
            format!(
                "{}, {}, {}, {}",
                seconds_from_us(latency.avg_us),
                seconds_from_us(latency.p50_us),
                seconds_from_us(latency.p99_us),
                seconds_from_us(latency.max_us)
            ),
        ),
        (
            "Request Rate",
            "[success]",
            format!("{} hits/sec", fixed_x100(report.success_rate_x100)),
        ),
        (
            "Data Received",
            "[total]",
            format!("{} MB", megabytes(report.total_bytes)),
        ),
        (
            "Duration",
            "[total]",
            format!(
                "{}.{:02} secs",
                report.duration_ms / 1_000,
                (report.duration_ms % 1_000) / 10
            ),
        ),
    ]
}

fn fixed_x100(value: u64) -> String {
    format!("{}.{:02}", value / 100, value % 100)
}

fn seconds_from_us(us: u64) -> String {
    format!("{}.{:04}s", us / 1_000_000, (us % 1_000_000) / 100)
}

fn megabytes(bytes: u64) -> String {
    let scaled = u128::from(bytes).saturating_mul(100_000) / 1_048_576;
    format!("{}.{:05}", scaled / 100_000, scaled % 100_000)
}
