//! crates/math_tutor_core/src/tutor.rs
//!
//! The tutor service: every prompt the application sends to the completion
//! provider, and the solve pipeline that tries the symbolic solver before
//! asking the model.

const SOLVE_INSTRUCTIONS: &str = r#"You are a math solver. Solve the problem you are given and respond with a single JSON object and nothing else:

{"solution": "<final answer in LaTeX>", "explanation": "<step-by-step explanation>"}

Rules for "solution":
- ONLY the final result in LaTeX, e.g. "x = 2" or "\\frac{3}{4}".
- No prose, no units unless the problem asks for them, no surrounding dollar signs.

Rules for "explanation":
- Paragraphs, each step introduced with **Step N:**.
- Wrap every piece of math in single dollar signs, e.g. $x^2$. Never use $$.
- No markdown headers and no bullet points."#;

const EXPLAIN_INSTRUCTIONS: &str = r#"You are a math tutor. Explain step by step how to reach the given solution.

Rules:
1. Use paragraphs, no bullet points and no lists.
2. Introduce every step with **Step X:** in bold.
3. Wrap all math in single dollar signs, e.g. $2x + 3 = 7$. Never use $$, \[ or \(.
4. Do not add headers or a title."#;

const EXPLAIN_INPUT_TEMPLATE: &str = "Problem: {problem}\nSolution: {solution}";

const HINT_INSTRUCTIONS: &str = r#"You are a patient math tutor in HINT mode. The student is working through the problem below and wants to reach the answer on their own.

PROBLEM CONTEXT:
---
{context}
---

Rules:
- Never reveal the final answer, even if the student asks for it directly.
- Give at most ONE guiding step or ONE guiding question per reply.
- Keep every reply under 3 sentences.
- Wrap all math in single dollar signs, e.g. $x^2$. Never use $$."#;

const TUTOR_INSTRUCTIONS: &str = r#"You are a friendly, encouraging math tutor. The student is studying the problem below and may ask anything about it.

PROBLEM CONTEXT:
---
{context}
---

Rules:
- Explain as fully as the question needs; you may walk through the whole solution.
- Use analogies or everyday examples when they make an idea click.
- Keep an encouraging tone.
- Wrap all math in single dollar signs, e.g. $x^2$. Never use $$."#;

const TOPIC_INSTRUCTIONS: &str = r#"You classify math problems by syllabus topic.

Reply with EXACTLY ONE specific topic label, such as "Laplace Transform", "Quadratic Equations", "Integration by Parts" or "Z-Transform".
Never reply with a broad subject such as "Math", "Algebra" or "Calculus".
Reply with the label only: no quotes, no punctuation, no explanation."#;

pub const SOLUTION_PLACEHOLDER: &str = r"\text{Error generating solution}";
pub const EXPLANATION_PLACEHOLDER: &str = "Explanation unavailable.";
pub const FALLBACK_TOPIC: &str = "General";

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::{ChatMode, ChatTurn};
use crate::ports::{CompletionProvider, CompletionRequest, PortResult, ResponseFormat};
use crate::solver::{solve_equation, NotApplicable, SymbolicOutcome};
use crate::text;

//=========================================================================================
// Result Types
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionSource {
    Symbolic,
    Model,
}

/// The outcome of the full solve pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calculation {
    pub solution: String,
    pub explanation: String,
    pub source: SolutionSource,
}

/// A final answer produced by the completion model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSolution {
    pub solution: String,
    pub explanation: Option<String>,
}

#[derive(Deserialize)]
struct StructuredSolution {
    solution: String,
    #[serde(default)]
    explanation: Option<String>,
}

/// Runs the exact solver on the blocking pool so a slow search never holds
/// an async worker.
async fn solve_off_runtime(problem: &str) -> SymbolicOutcome {
    let problem = problem.to_string();
    tokio::task::spawn_blocking(move || solve_equation(&problem))
        .await
        .unwrap_or_else(|e| {
            warn!("Symbolic solver task failed: {}", e);
            SymbolicOutcome::NotApplicable(NotApplicable::Unsupported)
        })
}

//=========================================================================================
// The Tutor Service
//=========================================================================================

#[derive(Clone)]
pub struct MathTutor {
    completion: Arc<dyn CompletionProvider>,
}

impl MathTutor {
    pub fn new(completion: Arc<dyn CompletionProvider>) -> Self {
        Self { completion }
    }

    /// Symbolic solver first, the model as fallback, then an explanation.
    /// Never fails: provider errors degrade to placeholders.
    pub async fn calculate(&self, problem: &str) -> Calculation {
        if let SymbolicOutcome::Solved { latex, variable, .. } = solve_off_runtime(problem).await {
            info!(%variable, "solved symbolically");
            let explanation = self.explain(problem, &latex).await;
            return Calculation {
                solution: latex,
                explanation,
                source: SolutionSource::Symbolic,
            };
        }

        let answer = self.solve_final_answer(problem).await;
        let explanation = match answer.explanation {
            Some(explanation) => explanation,
            None => self.explain(problem, &answer.solution).await,
        };
        Calculation {
            solution: answer.solution,
            explanation,
            source: SolutionSource::Model,
        }
    }

    /// Asks the model for a structured final answer. Any failure yields
    /// `SOLUTION_PLACEHOLDER` with no explanation.
    pub async fn solve_final_answer(&self, problem: &str) -> ModelSolution {
        let request = CompletionRequest {
            system: SOLVE_INSTRUCTIONS.to_string(),
            turns: vec![ChatTurn::user(problem)],
            temperature: 0.2,
            format: ResponseFormat::Json,
        };
        let raw = match self.completion.complete(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Final-answer request failed: {}", e);
                return ModelSolution::placeholder();
            }
        };
        parse_model_solution(&raw).unwrap_or_else(|| {
            warn!("Could not parse structured solution from model output");
            ModelSolution::placeholder()
        })
    }

    pub async fn explain(&self, problem: &str, solution: &str) -> String {
        let request = CompletionRequest {
            system: EXPLAIN_INSTRUCTIONS.to_string(),
            turns: vec![ChatTurn::user(
                EXPLAIN_INPUT_TEMPLATE
                    .replace("{problem}", problem)
                    .replace("{solution}", solution),
            )],
            temperature: 0.4,
            format: ResponseFormat::Text,
        };
        match self.completion.complete(&request).await {
            Ok(raw) if !raw.trim().is_empty() => text::sanitize_explanation(&raw),
            Ok(_) => EXPLANATION_PLACEHOLDER.to_string(),
            Err(e) => {
                warn!("Explanation request failed: {}", e);
                EXPLANATION_PLACEHOLDER.to_string()
            }
        }
    }

    /// One conversational turn. The full history is re-sent every time.
    pub async fn chat(
        &self,
        mode: ChatMode,
        context: &str,
        history: &[ChatTurn],
        message: &str,
    ) -> PortResult<String> {
        let template = match mode {
            ChatMode::Hint => HINT_INSTRUCTIONS,
            ChatMode::Tutor => TUTOR_INSTRUCTIONS,
        };
        let mut turns = history.to_vec();
        turns.push(ChatTurn::user(message));

        let request = CompletionRequest {
            system: template.replace("{context}", context),
            turns,
            temperature: 0.6,
            format: ResponseFormat::Text,
        };
        let raw = self.completion.complete(&request).await?;
        Ok(text::sanitize_reply(&raw))
    }

    /// Returns one syllabus-level topic, or `FALLBACK_TOPIC` on any failure.
    pub async fn classify_topic(&self, problem: &str) -> String {
        let request = CompletionRequest {
            system: TOPIC_INSTRUCTIONS.to_string(),
            turns: vec![ChatTurn::user(problem)],
            temperature: 0.0,
            format: ResponseFormat::Text,
        };
        match self.completion.complete(&request).await {
            Ok(raw) => clean_topic(&raw).unwrap_or_else(|| FALLBACK_TOPIC.to_string()),
            Err(e) => {
                warn!("Topic classification failed: {}", e);
                FALLBACK_TOPIC.to_string()
            }
        }
    }
}

impl ModelSolution {
    fn placeholder() -> Self {
        Self {
            solution: SOLUTION_PLACEHOLDER.to_string(),
            explanation: None,
        }
    }
}

fn parse_model_solution(raw: &str) -> Option<ModelSolution> {
    let parsed: StructuredSolution = serde_json::from_str(&text::strip_code_fences(raw)).ok()?;
    let solution = text::strip_outer_math_delimiters(&parsed.solution);
    if solution.is_empty() {
        return None;
    }
    let explanation = parsed
        .explanation
        .map(|e| text::sanitize_explanation(&e))
        .filter(|e| !e.is_empty());
    Some(ModelSolution {
        solution,
        explanation,
    })
}

fn clean_topic(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line
        .strip_prefix("Topic:")
        .or_else(|| line.strip_prefix("topic:"))
        .unwrap_or(line);
    let topic = line
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '*' | '`' | '.'))
        .trim();
    (!topic.is_empty()).then(|| topic.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PortError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replies from a script and records every request it receives.
    #[derive(Default)]
    struct ScriptedCompletion {
        replies: Mutex<VecDeque<PortResult<String>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedCompletion {
        fn with_replies(replies: Vec<PortResult<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedCompletion {
        async fn complete(&self, request: &CompletionRequest) -> PortResult<String> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(PortError::Unexpected("script exhausted".into())))
        }
    }

    fn failure() -> PortResult<String> {
        Err(PortError::Unexpected("provider down".into()))
    }

    #[tokio::test]
    async fn symbolic_solution_skips_the_solve_call() {
        let stub = ScriptedCompletion::with_replies(vec![Ok("**Step 1:** Subtract $$3$$.".into())]);
        let tutor = MathTutor::new(stub.clone());

        let calc = tutor.calculate("2*x + 3 = 7").await;

        assert_eq!(calc.solution, r"\left[ 2\right]");
        assert_eq!(calc.explanation, "**Step 1:** Subtract $3$.");
        assert_eq!(calc.source, SolutionSource::Symbolic);
        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].turns[0].content.contains(r"Solution: \left[ 2\right]"));
    }

    #[tokio::test]
    async fn falls_back_to_structured_model_answer() {
        let reply = r#"```json
{"solution": "$\\frac{x^2}{2} + C$", "explanation": "**Step 1:** Apply the power rule to $$x$$."}
```"#;
        let stub = ScriptedCompletion::with_replies(vec![Ok(reply.into())]);
        let tutor = MathTutor::new(stub.clone());

        let calc = tutor.calculate(r"Integrate $x$ with respect to $x$").await;

        assert_eq!(calc.solution, r"\frac{x^2}{2} + C");
        assert_eq!(calc.explanation, "**Step 1:** Apply the power rule to $x$.");
        assert_eq!(calc.source, SolutionSource::Model);
        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].format, ResponseFormat::Json);
    }

    #[tokio::test]
    async fn empty_symbolic_solution_set_uses_the_model() {
        let stub = ScriptedCompletion::with_replies(vec![
            Ok(r#"{"solution": "\\text{No solution}"}"#.into()),
            Ok("**Step 1:** The sides never match.".into()),
        ]);
        let tutor = MathTutor::new(stub.clone());

        let calc = tutor.calculate("x + 1 = x + 2").await;

        assert_eq!(calc.solution, r"\text{No solution}");
        assert_eq!(calc.explanation, "**Step 1:** The sides never match.");
        assert_eq!(stub.requests().len(), 2);
    }

    #[tokio::test]
    async fn oversized_cubic_goes_to_the_model_without_stalling() {
        let stub = ScriptedCompletion::with_replies(vec![Ok(
            r#"{"solution": "x \\approx -0.68", "explanation": "**Step 1:** Use a numeric method."}"#.into(),
        )]);
        let tutor = MathTutor::new(stub.clone());

        let started = std::time::Instant::now();
        let calc = tutor
            .calculate("963761198400x^3 + x + 963761198400 = 0")
            .await;

        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        assert_eq!(calc.source, SolutionSource::Model);
        assert_eq!(calc.solution, r"x \approx -0.68");
        assert_eq!(stub.requests()[0].format, ResponseFormat::Json);
    }

    #[tokio::test]
    async fn unparseable_model_answer_becomes_placeholder() {
        let stub = ScriptedCompletion::with_replies(vec![
            Ok("The answer is 42".into()),
            failure(),
        ]);
        let tutor = MathTutor::new(stub);

        let calc = tutor.calculate("What is six times seven?").await;

        assert_eq!(calc.solution, SOLUTION_PLACEHOLDER);
        assert_eq!(calc.explanation, EXPLANATION_PLACEHOLDER);
    }

    #[tokio::test]
    async fn provider_failure_on_solve_becomes_placeholder() {
        let stub = ScriptedCompletion::with_replies(vec![failure(), Ok("Explained.".into())]);
        let tutor = MathTutor::new(stub);

        let answer = tutor.solve_final_answer("hard problem").await;

        assert_eq!(answer.solution, SOLUTION_PLACEHOLDER);
        assert_eq!(answer.explanation, None);
    }

    #[tokio::test]
    async fn hint_mode_carries_no_reveal_contract_and_full_history() {
        let stub = ScriptedCompletion::with_replies(vec![Ok(
            "What could you subtract from both sides of $$2x + 3 = 7$$?".into(),
        )]);
        let tutor = MathTutor::new(stub.clone());
        let history = vec![
            ChatTurn::user("Where do I start?"),
            ChatTurn::assistant("Look at the constant term."),
        ];

        let reply = tutor
            .chat(ChatMode::Hint, "2x + 3 = 7", &history, "Just tell me x")
            .await
            .unwrap();

        assert_eq!(reply, "What could you subtract from both sides of $2x + 3 = 7$?");
        assert!(!reply.contains("x = 2"));
        let request = &stub.requests()[0];
        assert!(request.system.contains("Never reveal the final answer"));
        assert!(request.system.contains("at most ONE guiding step"));
        assert!(request.system.contains("2x + 3 = 7"));
        assert_eq!(request.turns.len(), 3);
        assert_eq!(request.turns[2], ChatTurn::user("Just tell me x"));
    }

    #[tokio::test]
    async fn tutor_mode_allows_full_explanations() {
        let stub = ScriptedCompletion::with_replies(vec![Ok("Sure!".into())]);
        let tutor = MathTutor::new(stub.clone());

        tutor.chat(ChatMode::Tutor, "ctx", &[], "Explain").await.unwrap();

        let request = &stub.requests()[0];
        assert!(request.system.contains("analogies"));
        assert!(!request.system.contains("Never reveal"));
    }

    #[tokio::test]
    async fn chat_propagates_provider_errors() {
        let tutor = MathTutor::new(ScriptedCompletion::with_replies(vec![failure()]));
        let result = tutor.chat(ChatMode::Tutor, "ctx", &[], "hi").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn topic_classification_falls_back_to_general() {
        let tutor = MathTutor::new(ScriptedCompletion::with_replies(vec![
            failure(),
            Ok("   ".into()),
            Ok("\"Laplace Transform\".".into()),
            Ok("Topic: Z-Transform\nBecause of the z".into()),
        ]));

        assert_eq!(tutor.classify_topic("p").await, FALLBACK_TOPIC);
        assert_eq!(tutor.classify_topic("p").await, FALLBACK_TOPIC);
        assert_eq!(tutor.classify_topic("p").await, "Laplace Transform");
        assert_eq!(tutor.classify_topic("p").await, "Z-Transform");
    }
}
