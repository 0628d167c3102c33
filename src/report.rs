use std::fmt::Write;

use serde_json::{json, Value};

use crate::models::{is_known_status, status_style, Dashboard, StatusTotals, STATUS_STYLES};

pub const TILE_PLACEHOLDER: &str = "-";
const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

const PAGE_STYLE: &str = r#"
        body {
            margin: 0;
            padding: 24px;
            width: 100%;
            box-sizing: border-box;
        }
        .summary-container {
            display: flex;
            flex-wrap: wrap;
            gap: 20px;
        }
        .summary-box {
            background: #f4f4f4;
            border-radius: 8px;
            padding: 20px;
            text-align: center;
            width: calc(25% - 20px);
            box-shadow: 0 2px 4px rgba(0, 0, 0, 0.1);
            box-sizing: border-box;
            font-family: Arial, sans-serif;
            font-size: 15px;
        }
        .summary-box h3 {
            margin: 10px 0;
            font-size: 1.5em;
            color: #333;
        }
        .heading {
            margin-top: 0px;
            font-size: 18px;
            color: gray;
            font-family: Arial, sans-serif;
            margin-bottom: 15px;
        }
        #status-chart {
            width: 100%;
            margin-top: 32px;
        }"#;

pub fn tile_value(totals: &StatusTotals, status: &str) -> String {
    totals
        .get(status)
        .map(|count| count.to_string())
        .unwrap_or_else(|| TILE_PLACEHOLDER.to_string())
}

pub fn render_tiles(totals: &StatusTotals) -> String {
    let mut output = String::new();

    let _ = writeln!(output, r#"<h1 class="heading">User Onboarding Summary</h1>"#);
    let _ = writeln!(output, r#"<div class="summary-container">"#);
    for style in STATUS_STYLES {
        let _ = writeln!(output, r#"    <div class="summary-box">"#);
        let _ = writeln!(output, "        <p>{}</p>", style.label);
        let _ = writeln!(output, "        <h3>{}</h3>", tile_value(totals, style.key));
        let _ = writeln!(output, "    </div>");
    }
    let _ = writeln!(output, "</div>");

    output
}

pub fn chart_title(month_label: &str) -> String {
    format!("User Onboarding Status Each Day for the month of {month_label}")
}

/// Plotly figure with one spline trace per status, in order of first
/// appearance in the daily counts.
pub fn chart_spec(dashboard: &Dashboard) -> Value {
    let mut statuses: Vec<&str> = Vec::new();
    for entry in &dashboard.daily {
        if !statuses.contains(&entry.status.as_str()) {
            statuses.push(&entry.status);
        }
    }

    let traces: Vec<Value> = statuses
        .iter()
        .map(|status| {
            let points: Vec<_> = dashboard
                .daily
                .iter()
                .filter(|entry| entry.status == *status)
                .collect();
            let x: Vec<u32> = points.iter().map(|entry| entry.day).collect();
            let y: Vec<usize> = points.iter().map(|entry| entry.count).collect();

            let mut trace = json!({
                "type": "scatter",
                "name": status,
                "legendgroup": status,
                "x": x,
                "y": y,
                "text": y,
                "mode": "lines+markers+text",
                "line": { "shape": "spline" },
                "textposition": "top right",
                "texttemplate": "%{text:.0f}",
            });
            if let Some(style) = status_style(status) {
                trace["line"]["color"] = json!(style.color);
                trace["marker"] = json!({ "color": style.color });
            }
            trace
        })
        .collect();

    let layout = json!({
        "title": {
            "text": chart_title(&dashboard.month_label),
            "font": { "color": "gray", "family": "Arial", "size": 18 },
        },
        "font": { "size": 14 },
        "height": 500,
        "autosize": true,
        "legend": { "title": { "text": "status" } },
        "xaxis": { "title": { "text": "Day" }, "tickmode": "linear" },
        "yaxis": { "title": { "text": "Status Count" } },
    });

    json!({ "data": traces, "layout": layout })
}

/// Keeps serialized data from closing the surrounding script element.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

pub fn build_html(dashboard: &Dashboard) -> String {
    let figure = script_safe(&chart_spec(dashboard).to_string());
    let mut output = String::new();

    let _ = writeln!(output, "<!DOCTYPE html>");
    let _ = writeln!(output, r#"<html lang="en">"#);
    let _ = writeln!(output, "<head>");
    let _ = writeln!(output, r#"    <meta charset="UTF-8">"#);
    let _ = writeln!(
        output,
        r#"    <meta name="viewport" content="width=device-width, initial-scale=1.0">"#
    );
    let _ = writeln!(output, "    <title>User Onboarding Dashboard</title>");
    let _ = writeln!(output, r#"    <script src="{PLOTLY_CDN}"></script>"#);
    let _ = writeln!(output, "    <style>{PAGE_STYLE}\n    </style>");
    let _ = writeln!(output, "</head>");
    let _ = writeln!(output, "<body>");
    output.push_str(&render_tiles(&dashboard.totals));
    let _ = writeln!(output, r#"<div id="status-chart"></div>"#);
    let _ = writeln!(output, "<script>");
    let _ = writeln!(output, "    const figure = {figure};");
    let _ = writeln!(
        output,
        r#"    Plotly.newPlot("status-chart", figure.data, figure.layout, {{ responsive: true }});"#
    );
    let _ = writeln!(output, "</script>");
    let _ = writeln!(output, "</body>");
    let _ = writeln!(output, "</html>");

    output
}

pub fn build_summary(dashboard: &Dashboard) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# User Onboarding Summary ({})", dashboard.dataset);
    for style in STATUS_STYLES {
        let _ = writeln!(
            output,
            "- {}: {}",
            style.label,
            tile_value(&dashboard.totals, style.key)
        );
    }

    let others: Vec<_> = dashboard
        .totals
        .iter()
        .filter(|(status, _)| !is_known_status(status))
        .collect();
    if !others.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Other statuses");
        for (status, count) in others {
            let _ = writeln!(output, "- {status}: {count}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## {}", chart_title(&dashboard.month_label));
    if dashboard.daily.is_empty() {
        let _ = writeln!(output, "No records for this month.");
    } else {
        for entry in &dashboard.daily {
            let _ = writeln!(
                output,
                "- day {:>2}: {} x{}",
                entry.day, entry.status, entry.count
            );
        }
    }

    output
}
