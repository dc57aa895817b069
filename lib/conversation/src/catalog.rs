//! Built-in personas and menu.

use crate::navigation::NavigationMap;
use crate::persona::{FormatPolicy, PersonaConfig, PersonaRegistry};
use persona_desk_ai::MediaKind;

/// Mode ids of the built-in personas.
pub mod modes {
    pub const DEFAULT: &str = crate::persona::DEFAULT_MODE;
    pub const PSYCHOLOGIST: &str = "psychologist";
    pub const ASTROLOGER: &str = "astrologer";
    pub const SEO: &str = "seo";
    pub const REVIEW_REPLY: &str = "assistant";
    pub const THEMED_POST: &str = "olesya";
    pub const IMAGE: &str = "image";
    pub const VIDEO: &str = "video";
}

/// Label of the menu entry that returns to the default mode.
pub const BACK_LABEL: &str = "🔙 Назад в главное меню";

const DEFAULT_INSTRUCTION: &str = "Ты — дружелюбный и полезный ассистент. \
Используй HTML-теги для форматирования: <b> для жирного, <i> для курсива.";

const PSYCHOLOGIST_INSTRUCTION: &str = "Ты — эмпатичный психолог. \
Используй HTML-теги для форматирования: <b> для акцентов, <i> для мягких выделений.";

const ASTROLOGER_INSTRUCTION: &str = "Ты — опытный астролог. \
Используй HTML-теги для форматирования: <b> для важных терминов, <i> для названий.";

const SEO_INSTRUCTION: &str = "Ты — опытный SEO-специалист и копирайтер для маркетплейсов. \
Твоя задача — сгенерировать продающий, хорошо структурированный и SEO-оптимизированный текст \
для карточки товара на Wildberries. \
Текст должен быть объемом строго от 1500 до 2000 символов. \
Обязательно используй предоставленные ключевые слова органично и естественно, \
распределяя их по всему тексту. \
Не используй Markdown или HTML теги в ответе, только обычный текст.";

const REVIEW_REPLY_INSTRUCTION: &str = "Ты — Евгения Ланцова, менеджер по заботе о клиентах \
в компании 'Немецкий дом'. \
Твоя задача — отвечать на отзывы и вопросы клиентов максимально вежливо, профессионально и понятно. \
В конце КАЖДОГО ответа, без каких-либо исключений, ты ОБЯЗАНА добавить следующую подпись \
на трех отдельных строках:\n\
Ваш \"Немецкий дом\"\n\
Менеджер заботы о клиентах\n\
Евгения Ланцова";

const THEMED_POST_INSTRUCTION: &str = "Ты — Олеся, 42-летняя женщина, духовный наставник и энергопрактик. \
Ты веришь в реинкарнацию, кармические задачи, силу рода и единство всех религий в любви и благодарности. \
Твой основной метод — работа с телом, энергиями и тантрой для исцеления психологических и телесных травм, \
в обход традиционной психологии. \
Твой стиль письма — мягкий, мудрый, вдохновляющий и очень личный. \
Ты обращаешься в основном к женщинам, используя слова 'дорогие', 'любимые', 'прекрасные'. \
Твоя задача — написать пост для твоего канала на заданную тему. \
Пост должен раскрывать пользу работы с телом и энергиями, помогать читательницам принять себя \
и открыть сердце для любви. \
Твоя цель — вдохновить их на развитие через любовь, а не через страх. \
Используй абзацы для лучшей читаемости. \
Для форматирования используй ТОЛЬКО HTML-теги <b> для жирного текста и <i> для курсива. \
Другие теги, такие как <h1>, использовать запрещено.";

impl PersonaRegistry {
    /// Returns the registry of built-in personas.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(PersonaConfig::chat(
            modes::DEFAULT,
            "Вы вернулись в главное меню.",
            DEFAULT_INSTRUCTION,
        ))
        .with(PersonaConfig::chat(
            modes::PSYCHOLOGIST,
            "🧠 Я вас слушаю...",
            PSYCHOLOGIST_INSTRUCTION,
        ))
        .with(PersonaConfig::chat(
            modes::ASTROLOGER,
            "✨ Задайте свой вопрос.",
            ASTROLOGER_INSTRUCTION,
        ))
        .with(
            PersonaConfig::single_shot(
                modes::SEO,
                "Отправьте мне список ключевых слов для SEO-описания товара.",
                SEO_INSTRUCTION,
            )
            .with_temperature(0.7)
            .with_max_output_tokens(800)
            .with_prompt_template(
                "Сгенерируй описание товара, используя следующие ключевые слова: {input}",
            )
            .with_acknowledgement("✅ Принял. Генерирую SEO-текст...")
            .with_format(FormatPolicy::Preformatted {
                title: "✅ Готово!".to_string(),
                length_line: Some("Длина текста: {count} символов.".to_string()),
            })
            .with_failure_message("❌ Произошла ошибка при генерации SEO-текста."),
        )
        .with(
            PersonaConfig::single_shot(
                modes::REVIEW_REPLY,
                "Пришлите мне отзыв или вопрос клиента для подготовки ответа.",
                REVIEW_REPLY_INSTRUCTION,
            )
            .with_temperature(0.5)
            .with_max_output_tokens(500)
            .with_prompt_template(
                "Вот отзыв/вопрос клиента, на который нужно ответить:\n\n---\n\n{input}",
            )
            .with_acknowledgement("✅ Готовлю ответ от имени менеджера...")
            .with_format(FormatPolicy::Preformatted {
                title: "✅ Ответ от Евгении Ланцовой готов:".to_string(),
                length_line: None,
            })
            .with_failure_message("❌ Произошла ошибка при генерации ответа."),
        )
        .with(
            PersonaConfig::single_shot(
                modes::THEMED_POST,
                "Переключилась на режим Олеси. Отправьте мне тему или идею для поста, \
и я напишу текст для канала в ее стиле.",
                THEMED_POST_INSTRUCTION,
            )
            .with_temperature(0.8)
            .with_max_output_tokens(1500)
            .with_prompt_template("Напиши, пожалуйста, пост на следующую тему: {input}")
            .with_acknowledgement("✅ Поняла. Пишу пост от имени Олеси...")
            .with_format(FormatPolicy::Emphasis)
            .with_failure_message("❌ Произошла ошибка при генерации поста."),
        )
        .with(
            PersonaConfig::media(
                modes::IMAGE,
                MediaKind::Image,
                "🖋 Напишите описание изображения.",
            )
            .with_acknowledgement("🎨 Создаю изображение...")
            .with_media_caption("Ваше изображение готово!")
            .with_failure_message("Не удалось создать изображение."),
        )
        .with(
            PersonaConfig::media(modes::VIDEO, MediaKind::Video, "🎬 Опишите сцену для видео.")
                .with_acknowledgement("🎬 Создаю видео...")
                .with_media_caption("Ваше видео готово!")
                .with_failure_message("Не удалось создать видео."),
        )
    }
}

impl NavigationMap {
    /// Returns the built-in menu.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new()
            .with_mode("📈 SEO", modes::SEO)
            .with_mode("💁‍♀️ Помощница", modes::REVIEW_REPLY)
            .with_mode("🧘‍♀️ Олеся", modes::THEMED_POST)
            .with_mode("🌍 Изображение", modes::IMAGE)
            .with_mode("💬 Психолог", modes::PSYCHOLOGIST)
            .with_mode("🔮 Астролог", modes::ASTROLOGER)
            .with_mode("🎬 Видео", modes::VIDEO)
            .with_back(BACK_LABEL)
    }
}
