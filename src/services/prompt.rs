//! Prompt Builders
//!
//! System instructions and user prompts for report generation and chat,
//! plus the chat context block built from the active report and history.

use politisight_core::Report;

/// Number of recent history titles used to bias tone and chat context
pub const RECENT_TOPIC_LIMIT: usize = 3;

/// Minimum chart sections requested from the model
pub const REQUESTED_CHART_SECTIONS: usize = 3;

/// Build the system instruction for report generation.
///
/// `today` is stated explicitly so the model reasons past its training
/// cutoff using fresh search results.
pub fn build_report_system_prompt(today: &str) -> String {
    format!(
        "You are a senior Indian political analyst producing data-driven briefings.\n\
         Today's date is {today}. Your training data ends earlier than that: use Google \
         Search to find the latest developments and extrapolate from them to today's date. \
         Never present stale information as current.\n\n\
         Rules:\n\
         1. Stay factual and non-partisan. Attribute claims and polling to their sources.\n\
         2. Prefer concrete numbers: seat shares, vote shares, turnout, survey results.\n\
         3. Write section content in Markdown.\n\
         4. Chart values must be plain numbers (no units, percent signs, or ranges).\n\
         5. Use the \"date\" field for the date the analysis is current as of.",
        today = today
    )
}

/// Build the user prompt for a report on `topic`.
pub fn build_report_user_prompt(topic: &str, recent_topics: &[String]) -> String {
    let mut prompt = format!(
        "Produce a political analysis report on: {}\n\n\
         Include an executive summary, 3 to 5 key insights ranked by relevance, and \
         at least {} chart sections (BAR_CHART, PIE_CHART, or LINE_CHART, each with \
         chartData) alongside the TEXT sections.",
        topic.trim(),
        REQUESTED_CHART_SECTIONS
    );

    if !recent_topics.is_empty() {
        prompt.push_str(&format!(
            "\n\nThe reader recently looked at: {}. Keep terminology consistent with those \
             reports where the topics overlap.",
            recent_topics
                .iter()
                .map(|t| format!("\"{}\"", t))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    prompt
}

/// Fixed persona for the side chat
const CHAT_PERSONA: &str = "You are PolitiSight Assistant, a neutral and well-informed guide to \
Indian politics. Answer concisely, stay non-partisan, and say so when you are unsure or when \
information may be out of date.";

/// Build the free-text context block from the active report and recent history.
///
/// Empty when neither is present.
pub fn build_chat_context(active: Option<&Report>, history: &[Report]) -> String {
    let mut parts = Vec::new();

    if let Some(report) = active {
        let mut block = format!(
            "The user is viewing the report \"{}\".\nExecutive summary: {}",
            report.title, report.executive_summary
        );
        if !report.key_insights.is_empty() {
            block.push_str("\nKey insights:");
            for insight in &report.key_insights {
                block.push_str("\n- ");
                block.push_str(&insight.text);
            }
        }
        parts.push(block);
    }

    if !history.is_empty() {
        let titles: Vec<&str> = history
            .iter()
            .take(RECENT_TOPIC_LIMIT)
            .map(|r| r.title.as_str())
            .collect();
        parts.push(format!("Recent reports: {}", titles.join("; ")));
    }

    parts.join("\n\n")
}

/// Persona plus context, as sent with every chat request.
pub fn chat_system_instruction(context: &str) -> String {
    if context.trim().is_empty() {
        CHAT_PERSONA.to_string()
    } else {
        format!("{}\n\nContext:\n{}", CHAT_PERSONA, context)
    }
}

/// First assistant message of a conversation
pub fn chat_greeting(active: Option<&Report>) -> String {
    match active {
        Some(report) => format!(
            "I've read the report \"{}\". Ask me anything about it or the wider political picture.",
            report.title
        ),
        None => "Namaste! I'm the PolitiSight assistant. Ask me about Indian elections, parties, \
                 or policy."
            .to_string(),
    }
}
