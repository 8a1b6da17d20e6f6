//! Conversation state machine for the external (unauthenticated) intake
//! flow. The server keeps no session state: each turn is a function of the
//! client-echoed `(step, answers)` payload and the latest message, plus the
//! single backend call at the summarization step and the single lead save at
//! a terminal branch.

use std::sync::Arc;

use tracing::{error, info};

use crate::backend::{ChatTurn, CompletionBackend};
use crate::db::lead_store::LeadSink;
use crate::errors::AppError;
use crate::models::{Answers, IntakeTurn, StepValue};
use crate::script::{serialize_answers, ScriptEntry, INTAKE_SCRIPT};

const SUMMARY_SYSTEM_PROMPT: &str = "Você é o assistente de atendimento de uma agência de \
    projetos digitais. Receberá as respostas de um visitante a um roteiro de perguntas. \
    Escreva um resumo claro e amigável do projeto em um parágrafo, dirigido ao visitante, \
    e termine perguntando se está tudo correto ou se ele gostaria de adicionar algo.";

const COMPLEMENT_PROMPT: &str =
    "Sem problemas! O que você gostaria de adicionar ou corrigir?";

const CLOSING_MESSAGE: &str = "Perfeito, obrigado! Registramos as suas informações e a nossa \
    equipe entrará em contato em breve.";

const RESET_MESSAGE: &str =
    "Essa conversa já foi encerrada. Me mande uma mensagem para começarmos de novo!";

const APOLOGY_MESSAGE: &str = "Desculpe, estou com dificuldades técnicas no momento. \
    Por favor, tente novamente mais tarde.";

/// Phrases that close the summary review without a complement. Matched by
/// case-insensitive containment.
const CLOSURE_KEYWORDS: &[&str] = &["não", "nao", "tudo certo", "perfeito", "correto"];

/// Where a visitor is in the intake walk. `Asking(0)` is the start state;
/// `Asking(k)` for `1..=N` means the visitor is answering script entry
/// `k - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Asking(usize),
    SummaryReview,
    AddingComplement,
    Finished,
    Error,
}

impl Step {
    /// Maps the wire value to a state. Out-of-range indices and unknown
    /// names come back as `None` and are treated as a reset, the same way
    /// a finished conversation is.
    fn resolve(value: &StepValue, script_len: usize) -> Option<Step> {
        match value {
            StepValue::Index(i) if *i <= script_len => Some(Step::Asking(*i)),
            StepValue::Index(_) => None,
            StepValue::Named(name) => match name.as_str() {
                StepValue::SUMMARY_REVIEW => Some(Step::SummaryReview),
                StepValue::ADDING_COMPLEMENT => Some(Step::AddingComplement),
                StepValue::FINISHED => Some(Step::Finished),
                StepValue::ERROR => Some(Step::Error),
                _ => None,
            },
        }
    }

    fn to_wire(self) -> StepValue {
        match self {
            Step::Asking(i) => StepValue::Index(i),
            Step::SummaryReview => StepValue::named(StepValue::SUMMARY_REVIEW),
            Step::AddingComplement => StepValue::named(StepValue::ADDING_COMPLEMENT),
            Step::Finished => StepValue::named(StepValue::FINISHED),
            Step::Error => StepValue::named(StepValue::ERROR),
        }
    }
}

pub struct IntakeEngine {
    script: &'static [ScriptEntry],
    backend: Arc<dyn CompletionBackend>,
    sink: Arc<dyn LeadSink>,
}

impl IntakeEngine {
    pub fn new(backend: Arc<dyn CompletionBackend>, sink: Arc<dyn LeadSink>) -> Self {
        Self { script: INTAKE_SCRIPT, backend, sink }
    }

    /// Runs one turn. Backend failures are translated into the terminal
    /// `error` step with a displayable apology; only a lead-storage failure
    /// propagates as `Err`.
    pub async fn next_turn(
        &self,
        step: StepValue,
        answers: Answers,
        message: &str,
    ) -> Result<IntakeTurn, AppError> {
        match Step::resolve(&step, self.script.len()) {
            Some(Step::Asking(0)) => Ok(self.start(answers)),
            Some(Step::Asking(k)) => self.record_and_advance(k, answers, message).await,
            Some(Step::SummaryReview) => self.review_summary(answers, message).await,
            Some(Step::AddingComplement) => self.add_complement(answers, message).await,
            // Finished conversations and unrecognized step values both reset.
            Some(Step::Finished) | Some(Step::Error) | None => Ok(reset(answers)),
        }
    }

    /// The opening turn ignores the message and asks the first question.
    fn start(&self, answers: Answers) -> IntakeTurn {
        turn(self.script[0].render(&answers), Step::Asking(1), answers)
    }

    /// `Asking(k)`, `1 <= k <= N`: the message answers script entry `k - 1`.
    async fn record_and_advance(
        &self,
        k: usize,
        mut answers: Answers,
        message: &str,
    ) -> Result<IntakeTurn, AppError> {
        let entry = &self.script[k - 1];
        answers.insert(entry.slot.to_string(), message.to_string());

        if k < self.script.len() {
            let reply = self.script[k].render(&answers);
            return Ok(turn(reply, Step::Asking(k + 1), answers));
        }

        // Script exhausted: hand off to the backend for the summary.
        let messages = vec![
            ChatTurn::system(SUMMARY_SYSTEM_PROMPT),
            ChatTurn::user(serialize_answers(&answers)),
        ];
        match self.backend.complete(messages).await {
            Ok(summary) => Ok(turn(summary, Step::SummaryReview, answers)),
            Err(e) => {
                error!("Summary generation failed, ending conversation: {e}");
                Ok(turn(APOLOGY_MESSAGE.to_string(), Step::Error, answers))
            }
        }
    }

    /// The single branch point: a closing phrase persists the lead as-is,
    /// anything else asks for a complement. The triggering message itself is
    /// discarded in the complement branch.
    async fn review_summary(
        &self,
        answers: Answers,
        message: &str,
    ) -> Result<IntakeTurn, AppError> {
        let lower = message.to_lowercase();
        if CLOSURE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            self.sink.save(&answers, None).await?;
            info!("Lead captured without complement");
            Ok(turn(CLOSING_MESSAGE.to_string(), Step::Finished, answers))
        } else {
            Ok(turn(COMPLEMENT_PROMPT.to_string(), Step::AddingComplement, answers))
        }
    }

    /// The message is the complement, verbatim.
    async fn add_complement(
        &self,
        answers: Answers,
        message: &str,
    ) -> Result<IntakeTurn, AppError> {
        self.sink.save(&answers, Some(message)).await?;
        info!("Lead captured with complement");
        Ok(turn(CLOSING_MESSAGE.to_string(), Step::Finished, answers))
    }
}

fn turn(text: String, step: Step, answers: Answers) -> IntakeTurn {
    IntakeTurn { text, step: step.to_wire(), answers }
}

fn reset(answers: Answers) -> IntakeTurn {
    turn(RESET_MESSAGE.to_string(), Step::Asking(0), answers)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::script::SLOT_NOME;

    struct MockBackend {
        reply: Option<String>,
        calls: Mutex<usize>,
    }

    impl MockBackend {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self { reply: Some(text.to_string()), calls: Mutex::new(0) })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { reply: None, calls: Mutex::new(0) })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl CompletionBackend for MockBackend {
        async fn complete(&self, _messages: Vec<ChatTurn>) -> Result<String, AppError> {
            *self.calls.lock().unwrap() += 1;
            match &self.reply {
                Some(text) => Ok(text.clone()),
                None => Err(AppError::BackendTimeout),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        saves: Mutex<Vec<(Answers, Option<String>)>>,
    }

    impl RecordingSink {
        fn saved(&self) -> Vec<(Answers, Option<String>)> {
            self.saves.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LeadSink for RecordingSink {
        async fn save(&self, answers: &Answers, complement: Option<&str>) -> Result<(), AppError> {
            self.saves
                .lock()
                .unwrap()
                .push((answers.clone(), complement.map(str::to_string)));
            Ok(())
        }
    }

    fn engine() -> (IntakeEngine, Arc<MockBackend>, Arc<RecordingSink>) {
        let backend = MockBackend::replying("Resumo do projeto. Está tudo correto?");
        let sink = Arc::new(RecordingSink::default());
        let engine = IntakeEngine::new(backend.clone(), sink.clone());
        (engine, backend, sink)
    }

    fn full_answers() -> Answers {
        let mut answers = Answers::new();
        for (entry, value) in INTAKE_SCRIPT.iter().zip([
            "Maria",
            "maria@example.com",
            "uma loja online",
            "para vender mais",
            "clientes da região",
            "na web",
            "em três meses",
        ]) {
            answers.insert(entry.slot.to_string(), value.to_string());
        }
        answers
    }

    #[tokio::test]
    async fn start_ignores_message_and_asks_first_question() {
        let (engine, backend, sink) = engine();
        let out = engine
            .next_turn(StepValue::Index(0), Answers::new(), "qualquer coisa")
            .await
            .unwrap();

        assert_eq!(out.step, StepValue::Index(1));
        assert_eq!(out.text, INTAKE_SCRIPT[0].prompt);
        assert!(out.answers.is_empty());
        assert_eq!(backend.calls(), 0);
        assert!(sink.saved().is_empty());
    }

    #[tokio::test]
    async fn first_answer_is_recorded_and_name_is_interpolated() {
        let (engine, _, _) = engine();
        let out = engine
            .next_turn(StepValue::Index(1), Answers::new(), "Maria")
            .await
            .unwrap();

        assert_eq!(out.step, StepValue::Index(2));
        assert_eq!(out.answers.get(SLOT_NOME).unwrap(), "Maria");
        assert!(out.text.contains("Maria"));
    }

    #[tokio::test]
    async fn middle_steps_advance_by_one_and_add_exactly_one_slot() {
        let (engine, backend, _) = engine();
        let n = INTAKE_SCRIPT.len();

        let mut answers = Answers::new();
        for k in 1..n {
            let before = answers.len();
            let out = engine
                .next_turn(StepValue::Index(k), answers, &format!("resposta {k}"))
                .await
                .unwrap();
            assert_eq!(out.step, StepValue::Index(k + 1));
            assert_eq!(out.answers.len(), before + 1);
            answers = out.answers;
        }
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn final_step_calls_backend_and_moves_to_summary_review() {
        let (engine, backend, sink) = engine();
        let n = INTAKE_SCRIPT.len();

        let mut answers = full_answers();
        answers.remove(INTAKE_SCRIPT[n - 1].slot);

        let out = engine
            .next_turn(StepValue::Index(n), answers, "em três meses")
            .await
            .unwrap();

        assert_eq!(out.step, StepValue::named(StepValue::SUMMARY_REVIEW));
        assert_eq!(out.text, "Resumo do projeto. Está tudo correto?");
        assert_eq!(out.answers.len(), n);
        assert_eq!(backend.calls(), 1);
        assert!(sink.saved().is_empty());
    }

    #[tokio::test]
    async fn backend_failure_at_final_step_ends_in_error_state() {
        let backend = MockBackend::failing();
        let sink = Arc::new(RecordingSink::default());
        let engine = IntakeEngine::new(backend.clone(), sink.clone());
        let n = INTAKE_SCRIPT.len();

        let out = engine
            .next_turn(StepValue::Index(n), full_answers(), "em três meses")
            .await
            .unwrap();

        assert_eq!(out.step, StepValue::named(StepValue::ERROR));
        assert_eq!(out.text, APOLOGY_MESSAGE);
        assert!(sink.saved().is_empty());
    }

    #[tokio::test]
    async fn confirmation_phrase_persists_lead_without_complement() {
        let (engine, _, sink) = engine();
        let out = engine
            .next_turn(
                StepValue::named(StepValue::SUMMARY_REVIEW),
                full_answers(),
                "não, tudo certo",
            )
            .await
            .unwrap();

        assert_eq!(out.step, StepValue::named(StepValue::FINISHED));
        assert_eq!(out.text, CLOSING_MESSAGE);
        let saved = sink.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].1, None);
        assert_eq!(saved[0].0.get(SLOT_NOME).unwrap(), "Maria");
    }

    #[tokio::test]
    async fn closure_keywords_match_any_case() {
        let (engine, _, sink) = engine();
        let out = engine
            .next_turn(
                StepValue::named(StepValue::SUMMARY_REVIEW),
                full_answers(),
                "Correto!",
            )
            .await
            .unwrap();

        assert_eq!(out.step, StepValue::named(StepValue::FINISHED));
        assert_eq!(sink.saved().len(), 1);
    }

    #[tokio::test]
    async fn other_review_message_asks_for_complement_and_is_discarded() {
        let (engine, _, sink) = engine();
        let answers = full_answers();
        let out = engine
            .next_turn(
                StepValue::named(StepValue::SUMMARY_REVIEW),
                answers.clone(),
                "quero adicionar algo",
            )
            .await
            .unwrap();

        assert_eq!(out.step, StepValue::named(StepValue::ADDING_COMPLEMENT));
        assert_eq!(out.text, COMPLEMENT_PROMPT);
        // The triggering message is not stored anywhere.
        assert_eq!(out.answers, answers);
        assert!(sink.saved().is_empty());
    }

    #[tokio::test]
    async fn complement_is_saved_verbatim() {
        let (engine, _, sink) = engine();
        let out = engine
            .next_turn(
                StepValue::named(StepValue::ADDING_COMPLEMENT),
                full_answers(),
                "o orçamento máximo é R$ 10.000",
            )
            .await
            .unwrap();

        assert_eq!(out.step, StepValue::named(StepValue::FINISHED));
        let saved = sink.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].1.as_deref(), Some("o orçamento máximo é R$ 10.000"));
    }

    #[tokio::test]
    async fn finished_and_unknown_steps_reset_to_start() {
        let (engine, _, _) = engine();

        for step in [
            StepValue::named(StepValue::FINISHED),
            StepValue::named(StepValue::ERROR),
            StepValue::named("something_else"),
            // What `-1` and `1.5` on the wire deserialize into.
            StepValue::named("-1"),
            StepValue::named("1.5"),
            StepValue::Index(INTAKE_SCRIPT.len() + 1),
        ] {
            let out = engine
                .next_turn(step, full_answers(), "oi de novo")
                .await
                .unwrap();
            assert_eq!(out.step, StepValue::Index(0));
            assert_eq!(out.text, RESET_MESSAGE);
        }
    }

    #[tokio::test]
    async fn replaying_a_turn_is_deterministic_but_saves_twice() {
        let (engine, _, sink) = engine();
        let step = StepValue::named(StepValue::ADDING_COMPLEMENT);

        let first = engine
            .next_turn(step.clone(), full_answers(), "mesmo complemento")
            .await
            .unwrap();
        let second = engine
            .next_turn(step, full_answers(), "mesmo complemento")
            .await
            .unwrap();

        assert_eq!(first, second);
        // Pure in its outputs, but the side effect is not idempotent.
        assert_eq!(sink.saved().len(), 2);
    }

    #[tokio::test]
    async fn lead_save_failure_propagates() {
        struct FailingSink;

        #[async_trait]
        impl LeadSink for FailingSink {
            async fn save(&self, _: &Answers, _: Option<&str>) -> Result<(), AppError> {
                Err(AppError::persistence("lead file", std::io::Error::other("disk full")))
            }
        }

        let backend = MockBackend::replying("resumo");
        let engine = IntakeEngine::new(backend, Arc::new(FailingSink));

        let result = engine
            .next_turn(
                StepValue::named(StepValue::SUMMARY_REVIEW),
                full_answers(),
                "tudo certo",
            )
            .await;

        assert!(matches!(result, Err(AppError::PersistenceFailure { .. })));
    }
}
