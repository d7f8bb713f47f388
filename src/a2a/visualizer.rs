//! Human-readable renderings of a card log.

use crate::a2a::card::{CardRecord, MessageType};

const WIDE_RULE: usize = 80;
const CARD_RULE: usize = 76;
const PREVIEW_CHARS: usize = 100;

/// Render every card with its header, content preview, and metadata.
pub fn visualize_cards(cards: &[CardRecord]) -> String {
    let rule = "=".repeat(WIDE_RULE);
    let mut out = vec![
        rule.clone(),
        "A2A CARD COMMUNICATION FLOW".to_string(),
        rule.clone(),
    ];

    for (i, card) in cards.iter().enumerate() {
        out.push(format!("\n[Card {}] {}", i + 1, card.timestamp));
        out.push(format!("  From: {}", card.sender.as_str().to_uppercase()));
        out.push(format!("  To:   {}", card.recipient.as_str().to_uppercase()));
        out.push(format!("  Type: {}", card.message_type.as_str().to_uppercase()));

        match card.message_type {
            MessageType::Task => out.push(format!("  Task: {}", preview(&card.content))),
            MessageType::Result => {
                let status = card
                    .metadata
                    .as_ref()
                    .and_then(|m| m.get("status"))
                    .and_then(|s| s.as_str())
                    .unwrap_or("unknown");
                out.push(format!("  Status: {}", status));
                out.push(format!("  Result: {}", preview(&card.content)));
            }
            MessageType::Control => out.push(format!("  Action: {}", card.content)),
            MessageType::Query => out.push(format!("  Content: {}", preview(&card.content))),
        }

        if let Some(metadata) = card.metadata.as_ref().filter(|m| !m.is_empty()) {
            let json = serde_json::to_string(metadata).unwrap_or_default();
            out.push(format!("  Metadata: {}", json));
        }
        out.push(format!("  {}", "-".repeat(CARD_RULE)));
    }

    out.push(format!("\n{}", rule));
    out.push(format!("Total Cards: {}", cards.len()));
    out.push(rule);
    out.join("\n")
}

/// One line per card: `N. SENDER  <arrow> [TYPE]  RECIPIENT`.
pub fn flow_diagram(cards: &[CardRecord]) -> String {
    let rule = "=".repeat(WIDE_RULE);
    let mut out = vec![
        "\nA2A Communication Flow Diagram:".to_string(),
        rule.clone(),
    ];

    for (i, card) in cards.iter().enumerate() {
        let symbol = match card.message_type {
            MessageType::Task => "→ [TASK]",
            MessageType::Result => "← [RESULT]",
            MessageType::Control => "⚙ [CONTROL]",
            MessageType::Query => "• [MSG]",
        };
        out.push(format!(
            "{}. {:<12} {:<12} {}",
            i + 1,
            card.sender.as_str().to_uppercase(),
            symbol,
            card.recipient.as_str().to_uppercase()
        ));
    }

    out.push(rule);
    out.join("\n")
}

fn preview(content: &str) -> String {
    let head: String = content.chars().take(PREVIEW_CHARS).collect();
    if head.len() < content.len() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::card::{metadata, CardMetadata, MessageCard, Participant};
    use serde_json::json;

    fn sample() -> Vec<CardRecord> {
        vec![
            MessageCard::task(
                Participant::Controller,
                Participant::Planner,
                "What is 5+3?",
                CardMetadata::new(),
            )
            .to_record(),
            MessageCard::result(
                Participant::Solver,
                Participant::Planner,
                "8",
                "success",
                metadata([("turn", json!(1))]),
            )
            .to_record(),
            MessageCard::control(
                Participant::Controller,
                Participant::Planner,
                "force_terminate",
                CardMetadata::new(),
            )
            .to_record(),
        ]
    }

    #[test]
    fn test_visualize_cards() {
        let text = visualize_cards(&sample());
        assert!(text.contains("[Card 1]"));
        assert!(text.contains("  From: CONTROLLER"));
        assert!(text.contains("  Task: What is 5+3?"));
        assert!(text.contains("  Status: success"));
        assert!(text.contains(r#"  Metadata: {"status":"success","turn":1}"#));
        assert!(text.contains("  Action: force_terminate"));
        assert!(text.contains("Total Cards: 3"));
    }

    #[test]
    fn test_long_content_is_truncated() {
        let long = "x".repeat(150);
        let card = MessageCard::task(
            Participant::Planner,
            Participant::Solver,
            long.as_str(),
            CardMetadata::new(),
        )
        .to_record();
        let text = visualize_cards(&[card]);
        assert!(text.contains(&format!("  Task: {}...", "x".repeat(100))));
    }

    #[test]
    fn test_flow_diagram() {
        let text = flow_diagram(&sample());
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[3].starts_with("1. CONTROLLER"));
        assert!(lines[3].contains("→ [TASK]"));
        assert!(lines[3].ends_with("PLANNER"));
        assert!(lines[4].contains("← [RESULT]"));
        assert!(lines[5].contains("⚙ [CONTROL]"));
    }
}
