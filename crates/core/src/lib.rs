//! PolitiSight Core
//!
//! Foundational types for the PolitiSight workspace: the report schema
//! contract, the structured-output schema builder, unified stream events,
//! and the core error type. This crate has no network or storage code.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `report` - Report, section, insight, chart, and grounding-source types
//! - `schema` - Response schema nodes sent with structured-output requests
//! - `streaming` - Unified stream event types and adapter trait
//! - `proxy` - Outbound proxy configuration

pub mod error;
pub mod proxy;
pub mod report;
pub mod schema;
pub mod streaming;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Report Contract ────────────────────────────────────────────────────
pub use report::{
    dedupe_sources, report_response_schema, ChartConfig, ChartDataPoint, GroundingSource,
    InsightIcon, KeyInsight, Report, ReportPayload, ReportSection, SectionType,
};

// ── Schema ─────────────────────────────────────────────────────────────
pub use schema::ParameterSchema;

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::{AdapterError, StreamAdapter, UnifiedStreamEvent};

// ── Proxy Types ────────────────────────────────────────────────────────
pub use proxy::{ProxyConfig, ProxyProtocol};
