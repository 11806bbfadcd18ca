//! Extraction orchestrator: raw text → one or more event drafts.
//!
//! An ordered cascade of strategies, each independently attempted, first
//! valid result wins. The terminal strategy is deterministic and always
//! succeeds, so `extract` never fails — completion-service outages degrade
//! extraction quality, never availability.
//!
//! Strategies run one at a time, never concurrently, to bound outbound
//! completion calls per request.

pub mod fallback;
pub mod parse;
pub mod prompts;

use chrono::{NaiveDate, NaiveTime};

use crate::completion::CompletionService;
use crate::config::AssistantConfig;
use crate::temporal::{clean_date_string, clean_time_string};
use crate::types::{EventDraft, ExtractionResult, StrategyKind};

/// Validity predicate: every draft must carry title + date + start + end.
/// One incomplete draft invalidates the whole batch for its strategy.
fn is_valid_extraction(drafts: &[EventDraft]) -> bool {
    !drafts.is_empty() && drafts.iter().all(|d| d.is_complete())
}

/// Normalize dates and times in place. Drafts stay as extracted otherwise;
/// deeper repair (defaults, category inference) is the executor's job.
fn normalize_drafts(drafts: &mut [EventDraft], current_date: NaiveDate) {
    for draft in drafts.iter_mut() {
        if !draft.date.trim().is_empty() {
            let (cleaned, _fell_back) = clean_date_string(&draft.date, current_date);
            draft.date = cleaned;
        }
        if !draft.start.trim().is_empty() {
            draft.start = clean_time_string(&draft.start);
        }
        if !draft.end.trim().is_empty() {
            draft.end = clean_time_string(&draft.end);
        }
    }
}

/// Run one completion call and parse/normalize/validate the result.
async fn attempt_completion(
    completion: &dyn CompletionService,
    model: &str,
    prompt: &str,
    current_date: NaiveDate,
) -> Option<Vec<EventDraft>> {
    let response = match completion.complete(model, prompt).await {
        Ok(text) => text,
        Err(e) => {
            log::warn!("extract: completion call failed ({}): {}", model, e);
            return None;
        }
    };

    let mut drafts = parse::parse_drafts(&response)?;
    normalize_drafts(&mut drafts, current_date);
    is_valid_extraction(&drafts).then_some(drafts)
}

/// Extract drafts from raw text. Never fails; the deterministic fallback
/// guarantees a result for any input.
pub async fn extract(
    completion: &dyn CompletionService,
    config: &AssistantConfig,
    raw_text: &str,
    current_date: NaiveDate,
    current_time: NaiveTime,
) -> ExtractionResult {
    // Strategy 1: primary prompt, retried with model rotation and
    // exponential-style spacing.
    let prompt = prompts::primary_prompt(raw_text, current_date, current_time);
    let attempts = config.primary_extraction_attempts.max(1);
    for attempt in 0..attempts {
        let model = config
            .model_rotation
            .get(attempt as usize % config.model_rotation.len().max(1))
            .map(String::as_str)
            .unwrap_or("default");
        log::debug!(
            "extract: primary attempt {}/{} (model {})",
            attempt + 1,
            attempts,
            model
        );
        if let Some(drafts) = attempt_completion(completion, model, &prompt, current_date).await {
            log::info!("extract: primary strategy produced {} draft(s)", drafts.len());
            return ExtractionResult {
                drafts,
                strategy: StrategyKind::Primary,
                used_fallback: false,
            };
        }
        if attempt + 1 < attempts {
            let delay = config.retry_base_ms.saturating_mul(1 << attempt);
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
    }

    // Strategy 2: simplified prompt.
    let model = config
        .model_rotation
        .first()
        .map(String::as_str)
        .unwrap_or("default");
    let prompt = prompts::simplified_prompt(raw_text, current_date, current_time);
    if let Some(drafts) = attempt_completion(completion, model, &prompt, current_date).await {
        log::info!("extract: simplified strategy produced {} draft(s)", drafts.len());
        return ExtractionResult {
            drafts,
            strategy: StrategyKind::Simplified,
            used_fallback: false,
        };
    }

    // Strategy 3: strictly-structured prompt.
    let prompt = prompts::structured_prompt(raw_text, current_date, current_time);
    if let Some(drafts) = attempt_completion(completion, model, &prompt, current_date).await {
        log::info!("extract: structured strategy produced {} draft(s)", drafts.len());
        return ExtractionResult {
            drafts,
            strategy: StrategyKind::Structured,
            used_fallback: false,
        };
    }

    // Strategy 4: deterministic fallback — always succeeds.
    log::info!("extract: all completion strategies exhausted, using deterministic fallback");
    let drafts = fallback::extract_fallback(raw_text, current_date, current_time);
    ExtractionResult {
        drafts,
        strategy: StrategyKind::Deterministic,
        used_fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CompletionError, CompletionService};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted completion fake: pops responses front-to-back, then errors.
    struct ScriptedCompletion {
        responses: Mutex<Vec<Result<String, ()>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedCompletion {
        fn new(responses: Vec<Result<String, ()>>) -> Self {
            ScriptedCompletion {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self::new(vec![])
        }
    }

    #[async_trait]
    impl CompletionService for ScriptedCompletion {
        async fn complete(
            &self,
            model_hint: &str,
            _prompt: &str,
        ) -> Result<String, CompletionError> {
            self.calls.lock().unwrap().push(model_hint.to_string());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(CompletionError::Empty);
            }
            match responses.remove(0) {
                Ok(text) => Ok(text),
                Err(()) => Err(CompletionError::Empty),
            }
        }
    }

    fn fast_config() -> AssistantConfig {
        AssistantConfig {
            retry_base_ms: 1,
            ..AssistantConfig::default()
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 16).unwrap()
    }

    fn time() -> NaiveTime {
        NaiveTime::from_hms_opt(10, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_primary_strategy_wins() {
        let completion = ScriptedCompletion::new(vec![Ok(
            r#"{"title": "Lunch", "date": "2025-11-16", "start": "12:00", "end": "13:00"}"#
                .to_string(),
        )]);
        let result = extract(&completion, &fast_config(), "lunch at noon", date(), time()).await;
        assert_eq!(result.strategy, StrategyKind::Primary);
        assert!(!result.used_fallback);
        assert_eq!(result.drafts[0].title, "Lunch");
    }

    #[tokio::test]
    async fn test_model_rotation_across_retries() {
        let completion = ScriptedCompletion::new(vec![
            Err(()),
            Err(()),
            Ok(r#"{"title": "X", "date": "2025-11-16", "start": "12:00", "end": "13:00"}"#
                .to_string()),
        ]);
        let config = fast_config();
        let result = extract(&completion, &config, "x", date(), time()).await;
        assert_eq!(result.strategy, StrategyKind::Primary);

        let calls = completion.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        // Each retry used the next model in the rotation.
        assert_eq!(calls[0], config.model_rotation[0]);
        assert_eq!(calls[1], config.model_rotation[1]);
        assert_eq!(calls[2], config.model_rotation[2]);
    }

    #[tokio::test]
    async fn test_cascade_to_simplified() {
        // Primary exhausts its attempts on prose; simplified returns JSON.
        let completion = ScriptedCompletion::new(vec![
            Ok("I'd be happy to help!".to_string()),
            Ok("Sorry, I don't understand.".to_string()),
            Ok("As an AI assistant...".to_string()),
            Ok(r#"{"title": "Gym", "date": "2025-11-16", "start": "18:00", "end": "19:00"}"#
                .to_string()),
        ]);
        let result = extract(&completion, &fast_config(), "gym at 6", date(), time()).await;
        assert_eq!(result.strategy, StrategyKind::Simplified);
    }

    #[tokio::test]
    async fn test_incomplete_multi_event_invalidates_strategy() {
        // Second draft lacks an end time — the whole batch is rejected and
        // the cascade falls through to the deterministic fallback.
        let bad_batch = r#"[
            {"title": "A", "date": "2025-11-16", "start": "09:00", "end": "10:00"},
            {"title": "B", "date": "2025-11-16", "start": "10:00"}
        ]"#;
        let completion = ScriptedCompletion::new(vec![
            Ok(bad_batch.to_string()),
            Ok(bad_batch.to_string()),
            Ok(bad_batch.to_string()),
            Ok(bad_batch.to_string()),
            Ok(bad_batch.to_string()),
        ]);
        let result = extract(&completion, &fast_config(), "a then b", date(), time()).await;
        assert_eq!(result.strategy, StrategyKind::Deterministic);
        assert!(result.used_fallback);
    }

    #[tokio::test]
    async fn test_fallback_on_total_outage() {
        let completion = ScriptedCompletion::failing();
        let result = extract(
            &completion,
            &fast_config(),
            "9:00-10:00 planning",
            date(),
            time(),
        )
        .await;
        assert!(result.used_fallback);
        assert_eq!(result.drafts[0].start, "09:00");
        assert_eq!(result.drafts[0].title, "planning");
    }

    #[tokio::test]
    async fn test_never_fails_on_degenerate_input() {
        let completion = ScriptedCompletion::failing();
        for input in ["", "   ", "毎日ジムに行く", "!!!"] {
            let result = extract(&completion, &fast_config(), input, date(), time()).await;
            assert!(!result.drafts.is_empty());
            assert!(result.used_fallback);
        }
    }

    #[tokio::test]
    async fn test_normalization_applied_to_completion_output() {
        // Completion output with a relative date and sloppy times still
        // validates after normalization.
        let completion = ScriptedCompletion::new(vec![Ok(
            r#"{"title": "Call", "date": "tomorrow", "start": "5pm", "end": "6pm"}"#.to_string(),
        )]);
        let result = extract(&completion, &fast_config(), "call tomorrow", date(), time()).await;
        assert_eq!(result.drafts[0].date, "2025-11-17");
        assert_eq!(result.drafts[0].start, "17:00");
        assert_eq!(result.drafts[0].end, "18:00");
    }
}
