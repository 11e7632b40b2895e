use crate::models::log_record::{LogRecord, Measurement};
use crate::views::layout::{html_escape, join_query, render_page, Page};
use crate::views::state::{LogFilter, MenuState};

/// Everything the logs page shows. Each list is replaced only by a successful fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogsPageState {
    pub hourly: Vec<LogRecord>,
    pub errors: Vec<LogRecord>,
    pub hourly_failed: bool,
    pub errors_failed: bool,
}

pub fn render_logs(menu: MenuState, filter: LogFilter, state: &LogsPageState) -> String {
    let (logs_class, errors_class) = match filter {
        LogFilter::Logs => ("filter-btn active-logs", "filter-btn"),
        LogFilter::ErrorLogs => ("filter-btn", "filter-btn active-errors"),
    };

    let content = match filter {
        LogFilter::Logs => format!(
            r#"<p class="muted">This part is for experimental purposes, might remove depending on the requirements</p>
{}<div class="grid">{}</div>"#,
            failure_notice(state.hourly_failed),
            state.hourly.iter().map(render_hourly_card).collect::<String>()
        ),
        LogFilter::ErrorLogs => format!(
            r#"{}<div class="grid">{}</div>"#,
            failure_notice(state.errors_failed),
            state.errors.iter().map(render_error_card).collect::<String>()
        ),
    };

    let body = format!(
        r#"<div class="filters">
<a class="{logs_class}" href="{logs_href}">Logs</a>
<a class="{errors_class}" href="{errors_href}">Out of Parameter Logs</a>
</div>
{content}"#,
        logs_class = logs_class,
        errors_class = errors_class,
        logs_href = html_escape(&join_query("/logs", menu.query(), "filter=logs")),
        errors_href = html_escape(&join_query("/logs", menu.query(), "filter=errorLogs")),
        content = content,
    );

    let extra = format!("filter={}", filter.as_param());
    render_page(Page::Logs, menu, &extra, &body)
}

fn failure_notice(failed: bool) -> &'static str {
    if failed {
        r#"<p class="notice failure" role="status">Could not load logs. Showing the last data we had.</p>"#
    } else {
        ""
    }
}

fn time_recorded(record: &LogRecord) -> String {
    html_escape(&record.timestamp.to_string())
}

fn range_text(measurement: &Measurement, unit: &str) -> String {
    match measurement.range() {
        Some((lo, hi)) => format!("{} - {} {}", lo, hi, unit),
        None => "N/A".to_string(),
    }
}

fn value_text(measurement: &Measurement, unit: &str) -> String {
    match measurement {
        Measurement::Scalar(v) => format!("{} {}", v, unit),
        // Error logs normally hold one value; a series shows its range.
        Measurement::Series(_) => range_text(measurement, unit),
    }
}

fn render_hourly_card(record: &LogRecord) -> String {
    format!(
        r#"<div class="card" id="{id}">
<p>Time Recorded: <strong>{time}</strong></p>
<p>pH: {ph}</p>
<p>TDS: {tds}</p>
<p>Temp: {temp}</p>
</div>"#,
        id = html_escape(&record.id),
        time = time_recorded(record),
        ph = range_text(&record.ph, "pH"),
        tds = range_text(&record.tds, "ppm"),
        temp = range_text(&record.temp, "°C"),
    )
}

fn render_error_card(record: &LogRecord) -> String {
    format!(
        r#"<div class="card error" id="{id}">
<p>Time Recorded: <strong>{time}</strong></p>
<p><strong>Out of Range: {params}</strong></p>
<p>pH: {ph}</p>
<p>TDS: {tds}</p>
<p>Temp: {temp}</p>
</div>"#,
        id = html_escape(&record.id),
        time = time_recorded(record),
        params = html_escape(&record.out_of_range_label()),
        ph = value_text(&record.ph, "pH"),
        tds = value_text(&record.tds, "ppm"),
        temp = value_text(&record.temp, "°C"),
    )
}
