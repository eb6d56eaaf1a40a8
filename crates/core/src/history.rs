use crate::catalog::ChatExchange;
use crate::state::ChatMessage;

/// Rebuilds chronological chat messages from store exchanges, which arrive
/// most-recent-first. Each exchange expands to a user/assistant pair.
pub fn chronological_messages(exchanges: &[ChatExchange]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(exchanges.len() * 2);
    for exchange in exchanges.iter().rev() {
        messages.push(ChatMessage::user(exchange.message.clone()));
        messages.push(ChatMessage::assistant(exchange.response.clone()));
    }
    messages
}

/// Trims history to at most `max_messages` entries and an approximate
/// character budget, dropping from the oldest end. The latest message is
/// always kept even when it alone exceeds the budget.
pub fn trim_history(
    mut messages: Vec<ChatMessage>,
    max_messages: usize,
    max_chars: usize,
) -> Vec<ChatMessage> {
    if messages.len() > max_messages {
        messages.drain(..messages.len() - max_messages);
    }

    let mut total: usize = messages.iter().map(|message| message.content.len()).sum();
    while messages.len() > 1 && total > max_chars {
        let removed = messages.remove(0);
        total -= removed.content.len();
    }

    messages
}
