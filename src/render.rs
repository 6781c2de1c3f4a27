//! Terminal Rendering
//!
//! Plain-text rendering of reports and history for the command-line front
//! end. Chart sections draw their data as ASCII bars; `TABLE` sections and
//! chart sections without data render as prose.

use std::fmt::Write;

use chrono::{Local, TimeZone};
use politisight_core::{ChartDataPoint, InsightIcon, Report, ReportSection, SectionType};

use crate::services::history::HistoryEntry;

const BAR_WIDTH: usize = 32;

fn insight_marker(icon: InsightIcon) -> &'static str {
    match icon {
        InsightIcon::TrendUp => "[+]",
        InsightIcon::TrendDown => "[-]",
        InsightIcon::Alert => "[!]",
        InsightIcon::Info => "[i]",
    }
}

/// Format a chart value without trailing zeros
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(len.clamp(1, BAR_WIDTH))
}

fn render_chart(out: &mut String, kind: SectionType, points: &[ChartDataPoint], unit: &str) {
    let label_width = points
        .iter()
        .map(|p| p.name.chars().count())
        .max()
        .unwrap_or(0)
        .min(24);

    let (values, suffix): (Vec<f64>, &str) = if kind == SectionType::PieChart {
        let total: f64 = points.iter().map(|p| p.value.max(0.0)).sum();
        let shares = points
            .iter()
            .map(|p| if total > 0.0 { p.value.max(0.0) / total * 100.0 } else { 0.0 })
            .collect();
        (shares, "%")
    } else {
        (points.iter().map(|p| p.value).collect(), unit)
    };
    let max = values.iter().cloned().fold(0.0_f64, f64::max);

    for (point, value) in points.iter().zip(values) {
        let name: String = point.name.chars().take(label_width).collect();
        let shown = if kind == SectionType::PieChart {
            format!("{:.1}{}", value, suffix)
        } else {
            format!("{}{}", format_value(value), suffix)
        };
        let _ = writeln!(
            out,
            "  {:<width$} | {:<bar_width$} {}",
            name,
            bar(value, max),
            shown,
            width = label_width,
            bar_width = BAR_WIDTH
        );
    }
}

fn render_section(out: &mut String, section: &ReportSection) {
    let kind = section.render_kind();
    let _ = writeln!(out, "\n## {}", section.title);
    if kind.is_chart() {
        let _ = writeln!(out, "({})", kind.as_str().replace('_', " ").to_lowercase());
    }
    if !section.content.trim().is_empty() {
        let _ = writeln!(out, "{}", section.content.trim());
    }

    if let (true, Some(points)) = (kind.is_chart(), section.chart_data.as_deref()) {
        let config = section.chart_config.clone().unwrap_or_default();
        if let (Some(x), Some(y)) = (&config.x_axis_label, &config.y_axis_label) {
            let _ = writeln!(out, "  {} vs {}", y, x);
        }
        let unit = config.unit.as_deref().unwrap_or("");
        out.push('\n');
        render_chart(out, kind, points, unit);
    }
}

/// Render a full report as plain text
pub fn render_report(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", report.title);
    if !report.date.is_empty() {
        let _ = writeln!(out, "{}", report.date);
    }
    let _ = writeln!(out, "{}", "=".repeat(report.title.chars().count().clamp(8, 80)));

    let _ = writeln!(out, "\nExecutive summary\n{}", report.executive_summary.trim());

    if !report.key_insights.is_empty() {
        let _ = writeln!(out, "\nKey insights");
        for insight in &report.key_insights {
            let value = insight
                .value
                .as_deref()
                .map(|v| format!(" ({})", v))
                .unwrap_or_default();
            let _ = writeln!(out, "  {} {}{}", insight_marker(insight.icon), insight.text, value);
        }
    }

    for section in &report.sections {
        render_section(&mut out, section);
    }

    if !report.sources.is_empty() {
        let _ = writeln!(out, "\nSources");
        for (i, source) in report.sources.iter().enumerate() {
            let _ = writeln!(out, "  [{}] {} - {}", i + 1, source.title, source.uri);
        }
    }

    out
}

/// Render the history listing, one line per report
pub fn render_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "No saved reports.\n".to_string();
    }
    let mut out = String::new();
    for entry in entries {
        let created = Local
            .timestamp_millis_opt(entry.created_at)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "{}  {}  {}", entry.id, created, entry.title);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use politisight_core::{ChartConfig, GroundingSource, KeyInsight};

    fn point(name: &str, value: f64) -> ChartDataPoint {
        ChartDataPoint {
            name: name.to_string(),
            value,
            label: None,
            fill: None,
            extra: Default::default(),
        }
    }

    fn section(kind: SectionType, data: Option<Vec<ChartDataPoint>>) -> ReportSection {
        ReportSection {
            id: "s".to_string(),
            title: "Seats".to_string(),
            section_type: kind,
            content: "Seat projection.".to_string(),
            chart_data: data,
            chart_config: Some(ChartConfig {
                unit: Some(" seats".to_string()),
                ..Default::default()
            }),
        }
    }

    fn report(sections: Vec<ReportSection>) -> Report {
        Report {
            id: "r1".to_string(),
            created_at: 1_700_000_000_000,
            title: "Bihar Outlook".to_string(),
            date: "October 2026".to_string(),
            executive_summary: "Close race.".to_string(),
            key_insights: vec![KeyInsight {
                icon: InsightIcon::Alert,
                text: "Turnout dip".to_string(),
                value: Some("-3%".to_string()),
                color: None,
            }],
            sections,
            sources: vec![GroundingSource {
                title: "ECI".to_string(),
                uri: "https://eci.gov.in".to_string(),
            }],
        }
    }

    #[test]
    fn test_bar_chart_rendering() {
        let text = render_report(&report(vec![section(
            SectionType::BarChart,
            Some(vec![point("NDA", 120.0), point("MGB", 60.0)]),
        )]));
        assert!(text.contains("(bar chart)"));
        assert!(text.contains(&format!("NDA | {} 120 seats", "#".repeat(BAR_WIDTH))));
        assert!(text.contains(&"#".repeat(BAR_WIDTH / 2)));
        assert!(text.contains("[!] Turnout dip (-3%)"));
        assert!(text.contains("[1] ECI - https://eci.gov.in"));
    }

    #[test]
    fn test_pie_chart_shows_shares() {
        let text = render_report(&report(vec![section(
            SectionType::PieChart,
            Some(vec![point("A", 3.0), point("B", 1.0)]),
        )]));
        assert!(text.contains("75.0%"));
        assert!(text.contains("25.0%"));
    }

    #[test]
    fn test_chart_without_data_renders_as_text() {
        let text = render_report(&report(vec![
            section(SectionType::LineChart, None),
            section(SectionType::Table, Some(vec![point("A", 1.0)])),
        ]));
        assert!(!text.contains("(line chart)"));
        assert!(!text.contains('|'));
        assert!(text.contains("Seat projection."));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(42.0), "42");
        assert_eq!(format_value(41.25), "41.25");
    }

    #[test]
    fn test_render_history() {
        assert_eq!(render_history(&[]), "No saved reports.\n");
        let entries = vec![HistoryEntry::from(&report(vec![]))];
        let text = render_history(&entries);
        assert!(text.starts_with("r1  "));
        assert!(text.contains("Bihar Outlook"));
    }
}
