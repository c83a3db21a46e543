//! Per-intent prompt construction.
//!
//! Every prompt carries the same formatting instructions so that model output is
//! close to the canonical layout before normalization.

use serde_json::{Map, Value};

use crate::assistant::core::intent::Intent;
use crate::assistant::session::SessionHistory;
use crate::llm::{KnowledgeBase, Prompt};

/// Free-form request context (`appointment_info`, `report_text`, ...).
pub type ChatContext = Map<String, Value>;

/// Context key holding appointment details.
pub const APPOINTMENT_INFO_KEY: &str = "appointment_info";
/// Context key holding the text of a medical report.
pub const REPORT_TEXT_KEY: &str = "report_text";

const SYSTEM_PREAMBLE: &str = "You are an advanced medical AI assistant. Your role is to provide \
helpful, accurate, and empathetic medical information while maintaining appropriate medical \
disclaimers.";

const FORMATTING_INSTRUCTIONS: &str = "IMPORTANT FORMATTING INSTRUCTIONS:
1. Structure your response with these exact sections in order:
   **Information** or **Symptoms**
   **Recommendations**
   **Medical Disclaimer**
   **Next Steps**

2. Format each section like this:
   **Section Title**
   - First bullet point
   - Second bullet point

3. Rules for formatting:
   - Start each section with ** before and after the title
   - Use a dash (-) at the start of each line within sections
   - Add one blank line between sections
   - Keep bullet points concise and clear
   - Do not use any other formatting markers";

const fn intent_instruction(intent: Intent) -> &'static str {
    match intent {
        Intent::SymptomCheck => {
            "The user is describing symptoms. Use a **Symptoms** section to restate and explain \
them, suggest safe self-care, and say clearly when urgent care is needed."
        }
        Intent::AppointmentScheduling => {
            "The user needs help with an appointment. Use the appointment details if provided, \
explain how to prepare, and what to bring."
        }
        Intent::MedicationReminder => {
            "The user is asking about medication. Give general guidance on adherence and \
reminders. Never change a prescribed dose."
        }
        Intent::HealthRecommendation => {
            "The user wants general health advice. Give practical, evidence-based lifestyle \
recommendations."
        }
        Intent::MedicalRecordQuery => {
            "The user is asking about medical records or a report. Summarize findings in plain \
language and point out values worth discussing with a doctor."
        }
        Intent::General => "Answer the user's health-related question.",
    }
}

/// Builds backend prompts from the intent, history, and request context.
#[derive(Clone, Debug)]
pub struct PromptBuilder {
    history_turns: usize,
    knowledge: Option<KnowledgeBase>,
}

impl PromptBuilder {
    /// `knowledge` is folded into prompts for medical intents when present.
    #[must_use]
    pub const fn new(history_turns: usize, knowledge: Option<KnowledgeBase>) -> Self {
        Self {
            history_turns,
            knowledge,
        }
    }

    /// Build the prompt for one request.
    #[must_use]
    pub fn build(
        &self,
        intent: Intent,
        query: &str,
        history: &SessionHistory,
        context: Option<&ChatContext>,
    ) -> Prompt {
        let system = format!(
            "{SYSTEM_PREAMBLE}\n\n{}\n\n{FORMATTING_INSTRUCTIONS}",
            intent_instruction(intent)
        );

        let mut blocks: Vec<String> = Vec::new();

        if let Some(knowledge) = self.knowledge.as_ref().filter(|_| intent.is_medical()) {
            blocks.push(format!("Medical Context:\n{}", knowledge.lookup(query)));
        }

        if let Some(context) = context {
            blocks.extend(context_blocks(context));
        }

        let turns: Vec<String> = history
            .recent(self.history_turns)
            .map(|turn| format!("{}: {}", turn.role.prompt_label(), turn.content))
            .collect();
        if !turns.is_empty() {
            blocks.push(format!("Previous Conversation:\n{}", turns.join("\n")));
        }

        blocks.push(format!("User Query: {query}"));

        Prompt::new(system, blocks.join("\n\n"), query)
    }
}

fn context_blocks(context: &ChatContext) -> Vec<String> {
    let mut blocks = Vec::new();

    if let Some(info) = context.get(APPOINTMENT_INFO_KEY) {
        let lines = render_value_lines(info);
        if !lines.is_empty() {
            blocks.push(format!("Appointment Details:\n{lines}"));
        }
    }

    if let Some(report) = context.get(REPORT_TEXT_KEY).and_then(Value::as_str) {
        let report = report.trim();
        if !report.is_empty() {
            blocks.push(format!("Medical Report:\n{report}"));
        }
    }

    let extra: Vec<String> = context
        .iter()
        .filter(|(key, _)| key.as_str() != APPOINTMENT_INFO_KEY && key.as_str() != REPORT_TEXT_KEY)
        .filter_map(|(key, value)| scalar(value).map(|text| format!("{key}: {text}")))
        .collect();
    if !extra.is_empty() {
        blocks.push(format!("Additional context:\n{}", extra.join("\n")));
    }

    blocks
}

/// Objects become `key: value` lines; scalars a single line.
fn render_value_lines(value: &Value) -> String {
    match value {
        Value::Object(map) => map
            .iter()
            .filter_map(|(key, value)| scalar(value).map(|text| format!("{key}: {text}")))
            .collect::<Vec<_>>()
            .join("\n"),
        other => scalar(other).unwrap_or_default(),
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::assistant::core::turn::ConversationTurn;

    fn context(value: Value) -> ChatContext {
        match value {
            Value::Object(map) => map,
            _ => ChatContext::new(),
        }
    }

    #[test]
    fn test_prompt_contains_query_and_formatting() {
        let builder = PromptBuilder::new(5, None);
        let prompt = builder.build(Intent::General, "hello", &SessionHistory::new(10), None);
        assert!(prompt.system.contains("**Medical Disclaimer**"));
        assert_eq!(prompt.user, "User Query: hello");
        assert_eq!(prompt.query, "hello");
    }

    #[test]
    fn test_history_is_limited_to_recent_turns() {
        let mut history = SessionHistory::new(10);
        for i in 0..8 {
            history.push(ConversationTurn::user(format!("q{i}")));
        }
        let builder = PromptBuilder::new(3, None);
        let prompt = builder.build(Intent::General, "next", &history, None);
        assert!(prompt.user.contains("User: q5\nUser: q6\nUser: q7"));
        assert!(!prompt.user.contains("q4"));
    }

    #[test]
    fn test_knowledge_only_for_medical_intents() {
        let builder = PromptBuilder::new(5, Some(KnowledgeBase::default()));
        let history = SessionHistory::new(10);

        let medical = builder.build(Intent::SymptomCheck, "flu and fever", &history, None);
        assert!(medical.user.starts_with("Medical Context:\n**Information**\n- Fever and chills"));

        let booking = builder.build(Intent::AppointmentScheduling, "flu shot booking", &history, None);
        assert!(!booking.user.contains("Medical Context"));
    }

    #[test]
    fn test_context_folding() {
        let builder = PromptBuilder::new(5, None);
        let ctx = context(json!({
            "appointment_info": {"doctor": "Dr. Rao", "date": "2024-05-02", "notes": null},
            "report_text": "  HbA1c 6.1%  ",
            "clinic": "North",
            "ignored": ["list"],
        }));
        let prompt = builder.build(
            Intent::AppointmentScheduling,
            "what should I bring?",
            &SessionHistory::new(10),
            Some(&ctx),
        );
        assert!(prompt.user.contains("Appointment Details:\ndate: 2024-05-02\ndoctor: Dr. Rao"));
        assert!(prompt.user.contains("Medical Report:\nHbA1c 6.1%"));
        assert!(prompt.user.contains("Additional context:\nclinic: North"));
        assert!(!prompt.user.contains("ignored"));
        assert!(prompt.user.ends_with("User Query: what should I bring?"));
    }
}
