//! Per-turn session orchestration.
//!
//! One turn is one incoming message. The orchestrator resolves navigation,
//! picks the persona for the session's current mode, calls the gateway at
//! most once, records history for personas that carry it, and ends one-shot
//! modes. Gateway failures never escape a turn: each becomes a reply.

use crate::error::TurnError;
use crate::format::{render, RenderedOutput};
use crate::history::{HistoryEntry, HistoryStore};
use crate::mode::ModeController;
use crate::navigation::{NavigationMap, NavigationTarget};
use crate::persona::{Capability, ModeId, PersonaConfig, PersonaRegistry};
use persona_desk_ai::{
    FailureCategory, GatewayError, GenerationGateway, GenerationRequest, MediaKind, MediaReference,
};
use persona_desk_core::{SessionId, TurnId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, instrument, warn};

/// One incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnInput {
    /// Text typed by the user. Navigation tokens are recognized here too.
    Text(String),
    /// An explicit navigation command.
    Navigate(NavigationTarget),
    /// Recorded speech, transcribed before processing.
    Audio(Vec<u8>),
    /// Clear the history of the current mode.
    ResetHistory,
}

/// What the user sees at the end of a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Generated text, rendered for delivery.
    Text(RenderedOutput),
    /// Generated media.
    Media {
        /// Reference to the media.
        reference: MediaReference,
        /// Caption to show with it.
        caption: Option<String>,
    },
    /// A fixed message: an entry prompt or a failure message.
    Notice(String),
}

/// Result of one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Identifier of the turn, for correlating logs.
    pub turn_id: TurnId,
    /// The session's mode after the turn.
    pub mode: ModeId,
    /// Shown before the reply while a one-shot request runs.
    pub acknowledgement: Option<String>,
    /// The reply.
    pub reply: Reply,
    /// Set when the gateway failed.
    pub failure: Option<FailureCategory>,
}

/// User-visible messages for gateway failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureMessages {
    /// Provider throttling.
    pub rate_limited: String,
    /// Provider policy refusal; the provider's reason is appended.
    pub content_rejected: String,
    /// Network trouble, used when the persona has no message of its own.
    pub transient: String,
    /// Anything else, used when the persona has no message of its own.
    pub unknown: String,
    /// Speech could not be transcribed.
    pub transcription: String,
    /// Confirmation after a history reset.
    pub history_cleared: String,
    /// Reply to a message with no text, such as a silent voice note.
    pub empty_input: String,
}

impl Default for FailureMessages {
    fn default() -> Self {
        Self {
            rate_limited: "⏳ Слишком много запросов. Попробуйте чуть позже.".to_string(),
            content_rejected: "🚫 Запрос отклонён правилами безопасности".to_string(),
            transient: "⚠️ Сервис временно недоступен. Попробуйте ещё раз.".to_string(),
            unknown: "Произошла ошибка.".to_string(),
            transcription: "Не удалось распознать голосовое сообщение.".to_string(),
            history_cleared: "🧹 История диалога очищена.".to_string(),
            empty_input: "✍️ Сообщение пустое. Напишите текст или выберите режим.".to_string(),
        }
    }
}

impl FailureMessages {
    /// Picks the message for a failed exchange with `persona`.
    #[must_use]
    pub fn for_exchange(&self, err: &GatewayError, persona: &PersonaConfig) -> String {
        match err {
            GatewayError::RateLimited { .. } => self.rate_limited.clone(),
            GatewayError::ContentRejected { reason } => {
                format!("{}: {reason}", self.content_rejected)
            }
            GatewayError::Transient { .. } => persona
                .failure_message
                .clone()
                .unwrap_or_else(|| self.transient.clone()),
            GatewayError::Unknown { .. } => persona
                .failure_message
                .clone()
                .unwrap_or_else(|| self.unknown.clone()),
        }
    }

    /// Picks the message for a failed transcription.
    #[must_use]
    pub fn for_transcription(&self, err: &GatewayError) -> String {
        match err {
            GatewayError::RateLimited { .. } => self.rate_limited.clone(),
            GatewayError::Transient { .. } => self.transient.clone(),
            GatewayError::ContentRejected { .. } | GatewayError::Unknown { .. } => {
                self.transcription.clone()
            }
        }
    }
}

/// Reply and failure of one gateway exchange.
struct Exchange {
    reply: Reply,
    failure: Option<FailureCategory>,
}

/// Drives turns for all sessions.
///
/// Turns of one session are serialized by a per-session lock; turns of
/// different sessions run concurrently.
pub struct SessionOrchestrator<G, H> {
    registry: Arc<PersonaRegistry>,
    navigation: NavigationMap,
    modes: ModeController,
    history: H,
    gateway: G,
    messages: FailureMessages,
    session_locks: Mutex<HashMap<SessionId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<G, H> SessionOrchestrator<G, H>
where
    G: GenerationGateway,
    H: HistoryStore,
{
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        registry: PersonaRegistry,
        navigation: NavigationMap,
        gateway: G,
        history: H,
    ) -> Self {
        let registry = Arc::new(registry);
        Self {
            modes: ModeController::new(Arc::clone(&registry)),
            registry,
            navigation,
            history,
            gateway,
            messages: FailureMessages::default(),
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the navigation map.
    #[must_use]
    pub fn navigation(&self) -> &NavigationMap {
        &self.navigation
    }

    /// Returns the history store.
    #[must_use]
    pub fn history(&self) -> &H {
        &self.history
    }

    fn session_lock(&self, session: &SessionId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .session_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(session.clone()).or_default())
    }

    /// Processes one turn.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::InvalidNavigation`] for a navigation target that
    /// is not registered (the mode is unchanged), or
    /// [`TurnError::HistoryUnavailable`] if the history store fails.
    #[instrument(skip(self, session, input), fields(session = %session))]
    pub async fn handle_turn(
        &self,
        session: &SessionId,
        input: TurnInput,
    ) -> persona_desk_core::Result<TurnOutcome, TurnError> {
        let lock = self.session_lock(session);
        let _turn = lock.lock().await;

        let turn_id = TurnId::new();
        debug!(turn = %turn_id, "turn started");

        match input {
            TurnInput::Navigate(target) => self.navigate(session, turn_id, &target),
            TurnInput::Text(text) => self.handle_text(session, turn_id, &text).await,
            TurnInput::Audio(audio) => self.handle_audio(session, turn_id, &audio).await,
            TurnInput::ResetHistory => self.reset_history(session, turn_id).await,
        }
    }

    fn navigate(
        &self,
        session: &SessionId,
        turn_id: TurnId,
        target: &NavigationTarget,
    ) -> persona_desk_core::Result<TurnOutcome, TurnError> {
        let change = match target {
            NavigationTarget::Enter(mode) => {
                self.modes
                    .navigate(session, mode)
                    .map_err(|e| TurnError::InvalidNavigation {
                        details: e.to_string(),
                    })?
            }
            NavigationTarget::Back => self.modes.return_to_default(session),
        };

        Ok(TurnOutcome {
            turn_id,
            mode: change.current,
            acknowledgement: None,
            reply: Reply::Notice(change.entry_prompt),
            failure: None,
        })
    }

    async fn handle_text(
        &self,
        session: &SessionId,
        turn_id: TurnId,
        text: &str,
    ) -> persona_desk_core::Result<TurnOutcome, TurnError> {
        let text = text.trim();
        if text.is_empty() {
            debug!("empty message ignored");
            return Ok(TurnOutcome {
                turn_id,
                mode: self.modes.current(session),
                acknowledgement: None,
                reply: Reply::Notice(self.messages.empty_input.clone()),
                failure: None,
            });
        }

        if let Some(target) = self.navigation.resolve(text) {
            return self.navigate(session, turn_id, target);
        }

        let mode = self.modes.current(session);
        let persona = self.registry.lookup(&mode);

        let exchange = match persona.capability {
            Capability::Chat | Capability::SingleShot => {
                self.exchange_text(session, &mode, persona, text).await
            }
            Capability::Media(kind) => Ok(self.exchange_media(persona, kind, text).await),
        };

        // One-shot modes end with the exchange, whether it succeeded or not.
        if let Some(change) = self.modes.consume_one_shot(session) {
            debug!(from = %change.previous, "one-shot mode finished");
        }
        let exchange = exchange?;

        Ok(TurnOutcome {
            turn_id,
            mode: self.modes.current(session),
            acknowledgement: persona.acknowledgement.clone(),
            reply: exchange.reply,
            failure: exchange.failure,
        })
    }

    async fn exchange_text(
        &self,
        session: &SessionId,
        mode: &ModeId,
        persona: &PersonaConfig,
        text: &str,
    ) -> persona_desk_core::Result<Exchange, TurnError> {
        let prompt = persona.user_prompt(text);

        let prior = if persona.carries_history {
            self.history
                .append(session, mode, HistoryEntry::user(prompt.clone()))
                .await
                .map_err(history_unavailable)?;
            let mut messages = self
                .history
                .get(session, mode)
                .await
                .map_err(history_unavailable)?
                .to_messages();
            // The newest entry is the prompt just appended.
            messages.pop();
            messages
        } else {
            Vec::new()
        };

        let request = GenerationRequest::new(persona.system_instruction.clone(), prompt)
            .with_history(prior)
            .with_temperature(persona.temperature)
            .with_max_tokens(persona.max_output_tokens);

        match self.gateway.complete_chat(&request).await {
            Ok(reply) => {
                if persona.carries_history {
                    self.history
                        .append(session, mode, HistoryEntry::assistant(reply.clone()))
                        .await
                        .map_err(history_unavailable)?;
                }
                Ok(Exchange {
                    reply: Reply::Text(render(reply.trim(), &persona.format)),
                    failure: None,
                })
            }
            Err(err) => Ok(self.failed(persona, &err)),
        }
    }

    async fn exchange_media(
        &self,
        persona: &PersonaConfig,
        kind: MediaKind,
        prompt: &str,
    ) -> Exchange {
        let result = match kind {
            MediaKind::Image => self.gateway.generate_image(prompt).await,
            MediaKind::Video => self.gateway.generate_video(prompt).await,
        };

        match result {
            Ok(reference) => Exchange {
                reply: Reply::Media {
                    reference,
                    caption: persona.media_caption.clone(),
                },
                failure: None,
            },
            Err(err) => self.failed(persona, &err),
        }
    }

    fn failed(&self, persona: &PersonaConfig, err: &GatewayError) -> Exchange {
        warn!(mode = %persona.id, category = %err.category(), error = %err, "generation failed");
        Exchange {
            reply: Reply::Notice(self.messages.for_exchange(err, persona)),
            failure: Some(err.category()),
        }
    }

    async fn handle_audio(
        &self,
        session: &SessionId,
        turn_id: TurnId,
        audio: &[u8],
    ) -> persona_desk_core::Result<TurnOutcome, TurnError> {
        match self.gateway.transcribe_audio(audio).await {
            Ok(transcript) => {
                debug!(chars = transcript.chars().count(), "voice message transcribed");
                self.handle_text(session, turn_id, &transcript).await
            }
            Err(err) => {
                warn!(category = %err.category(), error = %err, "transcription failed");
                Ok(TurnOutcome {
                    turn_id,
                    mode: self.modes.current(session),
                    acknowledgement: None,
                    reply: Reply::Notice(self.messages.for_transcription(&err)),
                    failure: Some(err.category()),
                })
            }
        }
    }

    async fn reset_history(
        &self,
        session: &SessionId,
        turn_id: TurnId,
    ) -> persona_desk_core::Result<TurnOutcome, TurnError> {
        let mode = self.modes.current(session);
        self.history
            .reset(session, &mode)
            .await
            .map_err(history_unavailable)?;
        info!(%mode, "history cleared");

        Ok(TurnOutcome {
            turn_id,
            mode,
            acknowledgement: None,
            reply: Reply::Notice(self.messages.history_cleared.clone()),
            failure: None,
        })
    }
}

fn history_unavailable<E: std::fmt::Display>(err: E) -> TurnError {
    TurnError::HistoryUnavailable {
        details: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::modes;
    use crate::format::Markup;
    use crate::history::{InMemoryHistoryStore, Role};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Gateway that replays scripted results and records every call.
    #[derive(Clone, Default)]
    struct ScriptedGateway {
        chat_results: Arc<Mutex<VecDeque<Result<String, GatewayError>>>>,
        media_results: Arc<Mutex<VecDeque<Result<MediaReference, GatewayError>>>>,
        transcripts: Arc<Mutex<VecDeque<Result<String, GatewayError>>>>,
        chat_calls: Arc<Mutex<Vec<GenerationRequest>>>,
        media_calls: Arc<Mutex<Vec<(MediaKind, String)>>>,
    }

    impl ScriptedGateway {
        fn push_chat(&self, result: Result<String, GatewayError>) {
            self.chat_results.lock().unwrap().push_back(result);
        }

        fn push_media(&self, result: Result<MediaReference, GatewayError>) {
            self.media_results.lock().unwrap().push_back(result);
        }

        fn push_transcript(&self, result: Result<String, GatewayError>) {
            self.transcripts.lock().unwrap().push_back(result);
        }

        fn chat_calls(&self) -> Vec<GenerationRequest> {
            self.chat_calls.lock().unwrap().clone()
        }

        fn media_calls(&self) -> Vec<(MediaKind, String)> {
            self.media_calls.lock().unwrap().clone()
        }

        fn next_media(&self, kind: MediaKind, prompt: &str) -> Result<MediaReference, GatewayError> {
            self.media_calls
                .lock()
                .unwrap()
                .push((kind, prompt.to_string()));
            self.media_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Ok(MediaReference {
                        kind,
                        location: "https://cdn.example/media.png".to_string(),
                    })
                })
        }
    }

    #[async_trait]
    impl GenerationGateway for ScriptedGateway {
        async fn complete_chat(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
            self.chat_calls.lock().unwrap().push(request.clone());
            self.chat_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(format!("reply to {}", request.user_text)))
        }

        async fn generate_image(&self, prompt: &str) -> Result<MediaReference, GatewayError> {
            self.next_media(MediaKind::Image, prompt)
        }

        async fn generate_video(&self, prompt: &str) -> Result<MediaReference, GatewayError> {
            self.next_media(MediaKind::Video, prompt)
        }

        async fn transcribe_audio(&self, _: &[u8]) -> Result<String, GatewayError> {
            self.transcripts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("transcript".to_string()))
        }
    }

    fn orchestrator(
        gateway: ScriptedGateway,
    ) -> SessionOrchestrator<ScriptedGateway, InMemoryHistoryStore> {
        SessionOrchestrator::new(
            PersonaRegistry::builtin(),
            NavigationMap::builtin(),
            gateway,
            InMemoryHistoryStore::default(),
        )
    }

    fn session() -> SessionId {
        SessionId::new("chat-1")
    }

    fn text(t: &str) -> TurnInput {
        TurnInput::Text(t.to_string())
    }

    fn enter(mode: &str) -> TurnInput {
        TurnInput::Navigate(NavigationTarget::Enter(ModeId::new(mode)))
    }

    async fn history_len<G: GenerationGateway>(
        orch: &SessionOrchestrator<G, InMemoryHistoryStore>,
        mode: &str,
    ) -> usize {
        orch.history()
            .get(&session(), &ModeId::new(mode))
            .await
            .unwrap()
            .len()
    }

    #[tokio::test]
    async fn hello_in_default_mode_records_a_pair() {
        let gateway = ScriptedGateway::default();
        gateway.push_chat(Ok("<b>Привет!</b> Чем помочь?".to_string()));
        let orch = orchestrator(gateway.clone());

        let outcome = orch.handle_turn(&session(), text("Hello")).await.unwrap();

        assert_eq!(outcome.mode, ModeId::default_mode());
        assert_eq!(outcome.failure, None);
        assert_eq!(outcome.acknowledgement, None);
        let Reply::Text(rendered) = outcome.reply else {
            panic!("expected text reply");
        };
        assert_eq!(rendered.markup, Markup::Html);
        assert_eq!(rendered.text, "<b>Привет!</b> Чем помочь?");

        let history = orch
            .history()
            .get(&session(), &ModeId::default_mode())
            .await
            .unwrap();
        assert_eq!(
            history.entries(),
            &[
                HistoryEntry::user("Hello"),
                HistoryEntry::assistant("<b>Привет!</b> Чем помочь?"),
            ]
        );

        let calls = gateway.chat_calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].history.is_empty());
        assert_eq!(calls[0].user_text, "Hello");
    }

    #[tokio::test]
    async fn chat_requests_carry_prior_history() {
        let gateway = ScriptedGateway::default();
        let orch = orchestrator(gateway.clone());

        orch.handle_turn(&session(), text("first")).await.unwrap();
        orch.handle_turn(&session(), text("second")).await.unwrap();

        let calls = gateway.chat_calls();
        assert_eq!(calls[1].history.len(), 2);
        assert_eq!(calls[1].history[0].content, "first");
        assert_eq!(calls[1].history[1].content, "reply to first");
        assert_eq!(calls[1].user_text, "second");
    }

    #[tokio::test]
    async fn seo_mode_makes_one_call_without_history_then_reverts() {
        let gateway = ScriptedGateway::default();
        let orch = orchestrator(gateway.clone());
        orch.handle_turn(&session(), text("prior chat")).await.unwrap();
        gateway.push_chat(Ok("  Тёплое термобелье для зимы.  ".to_string()));

        let entered = orch.handle_turn(&session(), text("📈 SEO")).await.unwrap();
        assert_eq!(entered.mode, ModeId::new(modes::SEO));
        assert!(matches!(entered.reply, Reply::Notice(ref p) if p.contains("ключевых слов")));

        let outcome = orch
            .handle_turn(&session(), text("термобелье, зима"))
            .await
            .unwrap();

        let calls = gateway.chat_calls();
        assert_eq!(calls.len(), 2);
        let seo_call = &calls[1];
        assert!(seo_call.history.is_empty());
        assert_eq!(
            seo_call.user_text,
            "Сгенерируй описание товара, используя следующие ключевые слова: термобелье, зима"
        );
        assert_eq!(seo_call.temperature, 0.7);
        assert_eq!(seo_call.max_tokens, 800);

        assert_eq!(outcome.mode, ModeId::default_mode());
        assert_eq!(
            outcome.acknowledgement.as_deref(),
            Some("✅ Принял. Генерирую SEO-текст...")
        );
        let Reply::Text(rendered) = outcome.reply else {
            panic!("expected text reply");
        };
        assert!(rendered.text.contains("Длина текста: 27 символов."));
        assert!(rendered.text.ends_with("<pre>Тёплое термобелье для зимы.</pre>"));

        assert_eq!(history_len(&orch, modes::SEO).await, 0);
        assert_eq!(history_len(&orch, modes::DEFAULT).await, 2);
    }

    #[tokio::test]
    async fn eleven_psychologist_exchanges_keep_ten_pairs() {
        let orch = orchestrator(ScriptedGateway::default());
        orch.handle_turn(&session(), text("💬 Психолог")).await.unwrap();

        for i in 0..11 {
            let outcome = orch
                .handle_turn(&session(), text(&format!("q{i}")))
                .await
                .unwrap();
            assert_eq!(outcome.mode, ModeId::new(modes::PSYCHOLOGIST));
        }

        let history = orch
            .history()
            .get(&session(), &ModeId::new(modes::PSYCHOLOGIST))
            .await
            .unwrap();
        assert_eq!(history.len(), 20);
        assert_eq!(history.entries()[0], HistoryEntry::user("q1"));
        assert_eq!(history.last(), Some(&HistoryEntry::assistant("reply to q10")));
    }

    #[tokio::test]
    async fn navigation_preserves_mode_histories() {
        let orch = orchestrator(ScriptedGateway::default());
        orch.handle_turn(&session(), enter(modes::ASTROLOGER)).await.unwrap();
        orch.handle_turn(&session(), text("Что ждёт Овнов?")).await.unwrap();

        let back = orch
            .handle_turn(&session(), TurnInput::Navigate(NavigationTarget::Back))
            .await
            .unwrap();
        assert_eq!(back.reply, Reply::Notice("Вы вернулись в главное меню.".to_string()));
        orch.handle_turn(&session(), enter(modes::ASTROLOGER)).await.unwrap();

        assert_eq!(history_len(&orch, modes::ASTROLOGER).await, 2);
        assert_eq!(history_len(&orch, modes::DEFAULT).await, 0);
    }

    #[tokio::test]
    async fn sticky_modes_survive_failures() {
        let gateway = ScriptedGateway::default();
        gateway.push_chat(Err(GatewayError::Transient {
            reason: "timeout".to_string(),
        }));
        let orch = orchestrator(gateway);
        orch.handle_turn(&session(), enter(modes::PSYCHOLOGIST)).await.unwrap();

        let outcome = orch.handle_turn(&session(), text("help")).await.unwrap();

        assert_eq!(outcome.mode, ModeId::new(modes::PSYCHOLOGIST));
        assert_eq!(outcome.failure, Some(FailureCategory::Transient));
        assert_eq!(
            outcome.reply,
            Reply::Notice(FailureMessages::default().transient)
        );
        // The user entry stays; the assistant half is missing.
        let history = orch
            .history()
            .get(&session(), &ModeId::new(modes::PSYCHOLOGIST))
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.last().map(|e| e.role), Some(Role::User));
    }

    #[tokio::test]
    async fn image_content_rejection_reverts_mode() {
        let gateway = ScriptedGateway::default();
        gateway.push_media(Err(GatewayError::ContentRejected {
            reason: "safety system".to_string(),
        }));
        let orch = orchestrator(gateway.clone());
        orch.handle_turn(&session(), text("🌍 Изображение")).await.unwrap();

        let outcome = orch
            .handle_turn(&session(), text("something forbidden"))
            .await
            .unwrap();

        assert_eq!(outcome.mode, ModeId::default_mode());
        assert_eq!(outcome.failure, Some(FailureCategory::ContentRejected));
        let Reply::Notice(message) = outcome.reply else {
            panic!("expected notice");
        };
        assert!(message.contains("safety system"));
        assert_eq!(history_len(&orch, modes::IMAGE).await, 0);
        assert_eq!(history_len(&orch, modes::DEFAULT).await, 0);
        assert_eq!(gateway.media_calls().len(), 1);
    }

    #[tokio::test]
    async fn image_success_returns_media_with_caption() {
        let gateway = ScriptedGateway::default();
        gateway.push_media(Ok(MediaReference::image("https://cdn.example/cat.png")));
        let orch = orchestrator(gateway.clone());
        orch.handle_turn(&session(), enter(modes::IMAGE)).await.unwrap();

        let outcome = orch.handle_turn(&session(), text("a cat")).await.unwrap();

        assert_eq!(
            outcome.reply,
            Reply::Media {
                reference: MediaReference::image("https://cdn.example/cat.png"),
                caption: Some("Ваше изображение готово!".to_string()),
            }
        );
        assert_eq!(outcome.acknowledgement.as_deref(), Some("🎨 Создаю изображение..."));
        assert_eq!(gateway.media_calls(), vec![(MediaKind::Image, "a cat".to_string())]);
        assert!(gateway.chat_calls().is_empty());
    }

    #[tokio::test]
    async fn video_mode_uses_video_generation() {
        let gateway = ScriptedGateway::default();
        let orch = orchestrator(gateway.clone());
        orch.handle_turn(&session(), text("🎬 Видео")).await.unwrap();

        let outcome = orch.handle_turn(&session(), text("waves")).await.unwrap();

        assert!(matches!(outcome.reply, Reply::Media { .. }));
        assert_eq!(gateway.media_calls()[0].0, MediaKind::Video);
        assert_eq!(outcome.mode, ModeId::default_mode());
    }

    #[tokio::test]
    async fn one_shot_failure_uses_persona_message_and_reverts() {
        let gateway = ScriptedGateway::default();
        gateway.push_chat(Err(GatewayError::Unknown {
            reason: "boom".to_string(),
        }));
        let orch = orchestrator(gateway);
        orch.handle_turn(&session(), text("💁‍♀️ Помощница")).await.unwrap();

        let outcome = orch
            .handle_turn(&session(), text("Где мой заказ?"))
            .await
            .unwrap();

        assert_eq!(outcome.mode, ModeId::default_mode());
        assert_eq!(
            outcome.reply,
            Reply::Notice("❌ Произошла ошибка при генерации ответа.".to_string())
        );
        assert_eq!(outcome.failure, Some(FailureCategory::Unknown));
    }

    #[tokio::test]
    async fn rate_limit_message_is_category_specific() {
        let gateway = ScriptedGateway::default();
        gateway.push_chat(Err(GatewayError::RateLimited {
            retry_after_secs: Some(5),
        }));
        let orch = orchestrator(gateway);
        orch.handle_turn(&session(), text("🧘‍♀️ Олеся")).await.unwrap();

        let outcome = orch.handle_turn(&session(), text("весна")).await.unwrap();

        assert_eq!(
            outcome.reply,
            Reply::Notice(FailureMessages::default().rate_limited)
        );
        assert_eq!(outcome.mode, ModeId::default_mode());
    }

    #[tokio::test]
    async fn unknown_navigation_target_is_rejected() {
        let orch = orchestrator(ScriptedGateway::default());
        orch.handle_turn(&session(), enter(modes::ASTROLOGER)).await.unwrap();

        let err = orch
            .handle_turn(&session(), enter("tarot"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("tarot"));
        let outcome = orch.handle_turn(&session(), text("stars?")).await.unwrap();
        assert_eq!(outcome.mode, ModeId::new(modes::ASTROLOGER));
    }

    #[tokio::test]
    async fn voice_input_is_processed_as_text() {
        let gateway = ScriptedGateway::default();
        gateway.push_transcript(Ok("Как дела?".to_string()));
        let orch = orchestrator(gateway.clone());

        let outcome = orch
            .handle_turn(&session(), TurnInput::Audio(vec![1, 2, 3]))
            .await
            .unwrap();

        assert!(matches!(outcome.reply, Reply::Text(_)));
        assert_eq!(gateway.chat_calls()[0].user_text, "Как дела?");
        assert_eq!(history_len(&orch, modes::DEFAULT).await, 2);
    }

    #[tokio::test]
    async fn failed_transcription_changes_nothing() {
        let gateway = ScriptedGateway::default();
        gateway.push_transcript(Err(GatewayError::Unknown {
            reason: "bad audio".to_string(),
        }));
        let orch = orchestrator(gateway.clone());
        orch.handle_turn(&session(), enter(modes::SEO)).await.unwrap();

        let outcome = orch
            .handle_turn(&session(), TurnInput::Audio(vec![0]))
            .await
            .unwrap();

        assert_eq!(
            outcome.reply,
            Reply::Notice(FailureMessages::default().transcription)
        );
        assert_eq!(outcome.mode, ModeId::new(modes::SEO));
        assert!(gateway.chat_calls().is_empty());
    }

    #[tokio::test]
    async fn silent_voice_note_is_a_notice() {
        let gateway = ScriptedGateway::default();
        gateway.push_transcript(Ok(" \n\t ".to_string()));
        let orch = orchestrator(gateway.clone());
        orch.handle_turn(&session(), enter(modes::SEO)).await.unwrap();

        let outcome = orch
            .handle_turn(&session(), TurnInput::Audio(vec![0]))
            .await
            .unwrap();

        assert_eq!(
            outcome.reply,
            Reply::Notice(FailureMessages::default().empty_input)
        );
        assert_eq!(outcome.failure, None);
        assert_eq!(outcome.mode, ModeId::new(modes::SEO));
        assert!(gateway.chat_calls().is_empty());
        assert_eq!(history_len(&orch, modes::SEO).await, 0);
    }

    #[tokio::test]
    async fn text_is_trimmed_before_use() {
        let gateway = ScriptedGateway::default();
        let orch = orchestrator(gateway.clone());

        orch.handle_turn(&session(), text("  hi \n")).await.unwrap();

        assert_eq!(gateway.chat_calls()[0].user_text, "hi");
        let history = orch
            .history()
            .get(&session(), &ModeId::default_mode())
            .await
            .unwrap();
        assert_eq!(history.entries()[0], HistoryEntry::user("hi"));
    }

    #[tokio::test]
    async fn reset_clears_current_mode_only() {
        let orch = orchestrator(ScriptedGateway::default());
        orch.handle_turn(&session(), text("hi")).await.unwrap();
        orch.handle_turn(&session(), enter(modes::ASTROLOGER)).await.unwrap();
        orch.handle_turn(&session(), text("stars?")).await.unwrap();

        orch.handle_turn(&session(), TurnInput::ResetHistory)
            .await
            .unwrap();

        assert_eq!(history_len(&orch, modes::ASTROLOGER).await, 0);
        assert_eq!(history_len(&orch, modes::DEFAULT).await, 2);
    }

    #[tokio::test]
    async fn concurrent_sessions_keep_separate_state() {
        let orch = orchestrator(ScriptedGateway::default());
        let sessions: Vec<SessionId> = (0..16).map(|i| SessionId::new(format!("s{i}"))).collect();

        let turns = sessions.iter().enumerate().map(|(i, s)| {
            let orch = &orch;
            async move {
                if i % 2 == 0 {
                    orch.handle_turn(s, enter(modes::ASTROLOGER)).await.unwrap();
                }
                orch.handle_turn(s, text(&format!("msg {i}"))).await.unwrap()
            }
        });
        let outcomes = futures::future::join_all(turns).await;

        for (i, (session, outcome)) in sessions.iter().zip(outcomes).enumerate() {
            let mode = if i % 2 == 0 { modes::ASTROLOGER } else { modes::DEFAULT };
            assert_eq!(outcome.mode, ModeId::new(mode));
            let history = orch.history().get(session, &ModeId::new(mode)).await.unwrap();
            assert_eq!(history.entries()[0], HistoryEntry::user(format!("msg {i}")));
            assert_eq!(history.len(), 2);
        }
    }

    /// Gateway whose chat call for "slow" waits until released.
    struct GatedGateway {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl GenerationGateway for GatedGateway {
        async fn complete_chat(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
            if request.user_text == "slow" {
                self.release.notified().await;
            }
            Ok(format!("reply to {}", request.user_text))
        }

        async fn generate_image(&self, _: &str) -> Result<MediaReference, GatewayError> {
            Ok(MediaReference::image("https://cdn.example/x.png"))
        }

        async fn transcribe_audio(&self, _: &[u8]) -> Result<String, GatewayError> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn slow_session_does_not_block_others() {
        let release = Arc::new(Notify::new());
        let orch = Arc::new(SessionOrchestrator::new(
            PersonaRegistry::builtin(),
            NavigationMap::builtin(),
            GatedGateway {
                release: Arc::clone(&release),
            },
            InMemoryHistoryStore::default(),
        ));

        let slow = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move {
                orch.handle_turn(&SessionId::new("a"), text("slow")).await
            })
        };
        tokio::task::yield_now().await;

        let fast = tokio::time::timeout(
            Duration::from_secs(5),
            orch.handle_turn(&SessionId::new("b"), text("fast")),
        )
        .await
        .expect("session b must not wait for session a")
        .unwrap();
        assert!(matches!(fast.reply, Reply::Text(_)));

        release.notify_one();
        let slow = slow.await.unwrap().unwrap();
        assert!(matches!(slow.reply, Reply::Text(ref r) if r.plain == "reply to slow"));
    }
}
