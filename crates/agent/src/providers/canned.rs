use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use syllabus_core::errors::GatewayError;
use syllabus_core::state::ChatMessage;

use crate::gateway::ModelBackend;
use crate::prompts;

/// Deterministic offline backend. Used by the CLI demo mode and as a test
/// double; produces template completions keyed on the prompt shape, with
/// optional scripted responses and failure injection.
#[derive(Default)]
pub struct CannedBackend {
    script: Mutex<VecDeque<String>>,
    failures_remaining: AtomicU32,
}

impl CannedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues responses returned verbatim, in order, before any template.
    pub fn with_script(responses: Vec<String>) -> Self {
        Self { script: Mutex::new(responses.into()), failures_remaining: AtomicU32::new(0) }
    }

    /// The next `count` calls fail with a recoverable upstream error.
    pub fn fail_next(&self, count: u32) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    fn template_for(prompt: &str) -> String {
        if let Some(draft) = prompts::draft_from_refinement_prompt(prompt) {
            return format!(
                "{draft}\n\nWould you like me to walk you through any of these courses in \
                 more detail, or help you enroll so you can start to learn right away?"
            );
        }

        if prompt.contains(prompts::SYNTHESIS_MARKER) {
            return "Putting it all together: our catalog covers these areas well, and each \
                    course builds practical skills you can apply right away. Based on the \
                    subtask findings above, I'd suggest starting with a beginner course and \
                    working up. Would you like to enroll in one of them to learn more?"
                .to_string();
        }

        if prompt.contains(prompts::SUBTASK_MARKER) {
            return "Subtask complete: reviewed the available course data and summarized \
                    the relevant findings."
                .to_string();
        }

        if prompt.contains(prompts::REJECTION_MARKER) {
            return "Of course - I won't proceed with the bulk enrollment, and nothing was \
                    changed. If you'd like, you can enroll in Docker Mastery individually \
                    and learn containers at your own pace. Would that work for you?"
                .to_string();
        }

        if prompt.contains(prompts::ROUTING_MARKER) {
            // No opinion; the caller falls back to keyword classification.
            return "unable to determine".to_string();
        }

        "Here are some options from our course catalog that could help! Each course \
         listed above is available to enroll in today, and every one is designed so \
         you can learn at your own pace. Would you like more detail on any of them?"
            .to_string()
    }
}

#[async_trait]
impl ModelBackend for CannedBackend {
    async fn complete(
        &self,
        _model_id: &str,
        prompt: &str,
        _history: &[ChatMessage],
    ) -> Result<String, GatewayError> {
        if self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(GatewayError::Upstream { message: "injected failure".to_string() });
        }

        if let Ok(mut script) = self.script.lock() {
            if let Some(scripted) = script.pop_front() {
                return Ok(scripted);
            }
        }

        Ok(Self::template_for(prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::CannedBackend;
    use crate::gateway::ModelBackend;
    use crate::prompts;

    #[tokio::test]
    async fn scripted_responses_come_first() {
        let backend = CannedBackend::with_script(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(backend.complete("offline", "anything", &[]).await.unwrap(), "first");
        assert_eq!(backend.complete("offline", "anything", &[]).await.unwrap(), "second");
        assert!(backend.complete("offline", "anything", &[]).await.unwrap().contains("catalog"));
    }

    #[tokio::test]
    async fn injected_failures_are_recoverable() {
        let backend = CannedBackend::new();
        backend.fail_next(1);
        let error = backend.complete("offline", "anything", &[]).await.unwrap_err();
        assert!(error.is_recoverable());
        assert!(backend.complete("offline", "anything", &[]).await.is_ok());
    }

    #[tokio::test]
    async fn refinement_prompts_extend_the_draft() {
        let prompt = prompts::refinement_prompt("what courses?", "A short draft.");
        let improved = CannedBackend::new().complete("offline", &prompt, &[]).await.unwrap();
        assert!(improved.starts_with("A short draft."));
        assert!(improved.len() > "A short draft.".len());
    }
}
