//! Report Schema Contract
//!
//! The shape of a generated political analysis report and its sub-entities.
//! Field names serialize in camelCase; the same JSON is used for the model's
//! structured output and for the persisted history, so a stored report and a
//! freshly generated one are interchangeable.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::schema::ParameterSchema;

/// A complete, immutable analysis report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    /// Milliseconds since the Unix epoch. Used for ordering only.
    pub created_at: i64,
    pub title: String,
    #[serde(default)]
    pub date: String,
    pub executive_summary: String,
    #[serde(default)]
    pub key_insights: Vec<KeyInsight>,
    #[serde(default)]
    pub sections: Vec<ReportSection>,
    #[serde(default)]
    pub sources: Vec<GroundingSource>,
}

impl Report {
    /// Sections that will actually render as charts.
    pub fn chart_sections(&self) -> impl Iterator<Item = &ReportSection> {
        self.sections.iter().filter(|s| s.render_kind().is_chart())
    }
}

/// Icon attached to a key insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsightIcon {
    TrendUp,
    TrendDown,
    Alert,
    #[serde(other)]
    Info,
}

/// One ranked takeaway. Array order is relevance order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyInsight {
    pub icon: InsightIcon,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Kind of a report section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionType {
    Text,
    BarChart,
    PieChart,
    LineChart,
    /// Accepted on input, never requested from the model. Renders as text.
    Table,
}

impl SectionType {
    pub fn is_chart(self) -> bool {
        matches!(
            self,
            SectionType::BarChart | SectionType::PieChart | SectionType::LineChart
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SectionType::Text => "TEXT",
            SectionType::BarChart => "BAR_CHART",
            SectionType::PieChart => "PIE_CHART",
            SectionType::LineChart => "LINE_CHART",
            SectionType::Table => "TABLE",
        }
    }
}

/// Optional presentation hints for a chart section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
}

/// A titled block of a report: prose, or prose plus chart data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSection {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    /// Markdown text
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<Vec<ChartDataPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_config: Option<ChartConfig>,
}

impl ReportSection {
    /// How the section should be displayed.
    ///
    /// Chart types without data points and `TABLE` fall back to `TEXT`.
    pub fn render_kind(&self) -> SectionType {
        let has_data = self.chart_data.as_ref().is_some_and(|d| !d.is_empty());
        if self.section_type.is_chart() && has_data {
            self.section_type
        } else {
            SectionType::Text
        }
    }
}

/// A single chart datum. Unknown fields are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataPoint {
    pub name: String,
    #[serde(deserialize_with = "deserialize_numeric")]
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A citation attached by the grounded generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub title: String,
    pub uri: String,
}

/// Deduplicate sources by URI.
///
/// An entry keeps the position of the first occurrence of its URI and the
/// title of the last occurrence.
pub fn dedupe_sources<I>(sources: I) -> Vec<GroundingSource>
where
    I: IntoIterator<Item = GroundingSource>,
{
    let mut out: Vec<GroundingSource> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for source in sources {
        match index.get(&source.uri) {
            Some(&pos) => out[pos].title = source.title,
            None => {
                index.insert(source.uri.clone(), out.len());
                out.push(source);
            }
        }
    }
    out
}

/// The model-produced part of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    pub title: String,
    #[serde(default)]
    pub date: String,
    pub executive_summary: String,
    #[serde(default)]
    pub key_insights: Vec<KeyInsight>,
    #[serde(default)]
    pub sections: Vec<ReportSection>,
}

impl ReportPayload {
    /// Parse a payload from raw JSON text.
    pub fn from_json(text: &str) -> CoreResult<Self> {
        serde_json::from_str(text).map_err(|e| CoreError::parse(e.to_string()))
    }

    /// Enforce the structural guarantees a report must satisfy.
    pub fn validate(&mut self) -> CoreResult<()> {
        if self.title.trim().is_empty() {
            return Err(CoreError::validation("report title is empty"));
        }
        if self.executive_summary.trim().is_empty() {
            return Err(CoreError::validation("executive summary is empty"));
        }
        for (n, section) in self.sections.iter_mut().enumerate() {
            if section.id.trim().is_empty() {
                section.id = format!("section-{}", n + 1);
            }
        }
        Ok(())
    }

    /// Number of sections that carry renderable chart data.
    pub fn chart_section_count(&self) -> usize {
        self.sections
            .iter()
            .filter(|s| s.render_kind().is_chart())
            .count()
    }

    pub fn into_report(self, id: String, created_at: i64, sources: Vec<GroundingSource>) -> Report {
        Report {
            id,
            created_at,
            title: self.title,
            date: self.date,
            executive_summary: self.executive_summary,
            key_insights: self.key_insights,
            sections: self.sections,
            sources,
        }
    }
}

/// Structured-output schema requested from the model.
pub fn report_response_schema() -> ParameterSchema {
    let insight = ParameterSchema::object(
        None,
        vec![
            (
                "icon",
                ParameterSchema::enumeration(
                    Some("Visual cue for the insight"),
                    &["trend-up", "trend-down", "alert", "info"],
                ),
            ),
            ("text", ParameterSchema::string(Some("One-sentence insight"))),
            (
                "value",
                ParameterSchema::string(Some("Headline figure, e.g. '42%' or '+12 seats'")),
            ),
            ("color", ParameterSchema::string(Some("Accent color name or hex"))),
        ],
        &["icon", "text"],
    );

    let data_point = ParameterSchema::object(
        None,
        vec![
            ("name", ParameterSchema::string(Some("Category or x-axis label"))),
            ("value", ParameterSchema::number(Some("Numeric value"))),
            ("label", ParameterSchema::string(None)),
            ("fill", ParameterSchema::string(Some("Optional color"))),
        ],
        &["name", "value"],
    );

    let chart_config = ParameterSchema::object(
        None,
        vec![
            ("xAxisLabel", ParameterSchema::string(None)),
            ("yAxisLabel", ParameterSchema::string(None)),
            ("unit", ParameterSchema::string(None)),
        ],
        &[],
    );

    let section = ParameterSchema::object(
        None,
        vec![
            ("id", ParameterSchema::string(None)),
            ("title", ParameterSchema::string(None)),
            (
                "type",
                ParameterSchema::enumeration(None, &["TEXT", "BAR_CHART", "PIE_CHART", "LINE_CHART"]),
            ),
            ("content", ParameterSchema::string(Some("Markdown analysis"))),
            ("chartData", ParameterSchema::array(None, data_point)),
            ("chartConfig", chart_config),
        ],
        &["id", "title", "type", "content"],
    );

    ParameterSchema::object(
        None,
        vec![
            ("title", ParameterSchema::string(None)),
            ("date", ParameterSchema::string(Some("Report date"))),
            ("executiveSummary", ParameterSchema::string(None)),
            (
                "keyInsights",
                ParameterSchema::array(Some("Ranked by relevance"), insight),
            ),
            ("sections", ParameterSchema::array(None, section)),
        ],
        &["title", "date", "executiveSummary", "keyInsights", "sections"],
    )
}

fn deserialize_numeric<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Numeric {
        Number(f64),
        Text(String),
    }

    let value = match Numeric::deserialize(deserializer)? {
        Numeric::Number(n) => n,
        Numeric::Text(s) => s
            .trim()
            .trim_end_matches('%')
            .replace(',', "")
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("chart value {:?} is not numeric", s)))?,
    };
    if !value.is_finite() {
        return Err(de::Error::custom("chart value is not finite"));
    }
    Ok(value)
}
