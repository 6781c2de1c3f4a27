//! Integration Tests Module
//!
//! End-to-end tests through the command layer: report generation, history
//! persistence, and the streaming chat flow. The model is replaced by a
//! scripted provider.

// Scripted provider and state builders shared by the tests
mod support;

// Report generation through commands
mod report_flow_test;

// History persistence and deletion
mod history_test;

// Chat sessions driven by commands
mod chat_session_test;
