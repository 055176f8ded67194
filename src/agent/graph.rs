//! Turn graph: `Agent -> {Tools | End}`, `Tools -> Agent`

use crate::core::{ConversationState, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Agent,
    Tools,
    End,
}

/// Next node after the Agent step, decided by the last message alone
pub fn route(state: &ConversationState) -> Node {
    match state.last() {
        Some(Message::Assistant { tool_calls, .. }) if !tool_calls.is_empty() => Node::Tools,
        _ => Node::End,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ToolCall;
    use serde_json::json;

    #[test]
    fn test_route() {
        let mut state = ConversationState::new();
        assert_eq!(route(&state), Node::End);

        state.push(Message::user("desk"));
        assert_eq!(route(&state), Node::End);

        state.push(Message::assistant_with_calls(
            "",
            vec![ToolCall {
                id: "call_1".to_string(),
                name: "lookup_inventory".to_string(),
                arguments: json!({"query": "desk"}),
            }],
        ));
        assert_eq!(route(&state), Node::Tools);

        state.push(Message::tool_result("call_1", "lookup_inventory", "{}"));
        state.push(Message::assistant("Two desks."));
        assert_eq!(route(&state), Node::End);
    }
}
