//! AI writing: generate a short novel from a set of story options.

use std::sync::Arc;

use async_trait::async_trait;
use novelhub_common::{AppError, AppResult, IdGenerator, config::GenerationConfig};
use novelhub_db::{
    entities::novel::{self, NovelCategory},
    repositories::NovelRepository,
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::services::auth::AuthContext;

const SYSTEM_PERSONA: &str =
    "당신은 한국의 유명 소설가입니다. 독자들의 마음을 사로잡는 몰입감 있는 이야기를 작성합니다.";
const CONTENT_FILTER_MESSAGE: &str =
    "선택한 옵션 조합이 콘텐츠 정책에 맞지 않습니다. 다른 장르나 분위기를 선택해주세요.";
const DEFAULT_TITLE: &str = "AI가 작성한 소설";
const TITLE_MARKER: &str = "제목";
const DESCRIPTION_CHARS: usize = 100;
const MAX_TOKENS: u32 = 4000;
const TEMPERATURE: f32 = 0.8;

/// Why a completion stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Other(String),
}

impl From<&str> for FinishReason {
    fn from(value: &str) -> Self {
        match value {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_string()),
        }
    }
}

/// First choice of a chat completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: Option<String>,
    pub finish_reason: Option<FinishReason>,
}

/// A chat-completion backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run one completion with a system message and a user prompt.
    async fn complete(&self, system: &str, prompt: &str) -> AppResult<Completion>;
}

/// OpenAI-compatible `/chat/completions` client (`OpenAI` or GitHub Models).
pub struct OpenAiClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    #[must_use]
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
        }
    }

    /// Build a client from configuration. `None` when no credential is available.
    #[must_use]
    pub fn from_config(config: &GenerationConfig) -> Option<Self> {
        config
            .resolve_credentials()
            .map(|(key, base)| Self::new(key, base, config.model.clone()))
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, system: &str, prompt: &str) -> AppResult<Completion> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt},
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        });

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("AI API request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "AI API error: {status} - {body}"
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("Failed to parse AI API response: {e}"))
        })?;

        let choice = parsed.choices.into_iter().next();
        Ok(Completion {
            finish_reason: choice
                .as_ref()
                .and_then(|c| c.finish_reason.as_deref())
                .map(FinishReason::from),
            content: choice.and_then(|c| c.message).and_then(|m| m.content),
        })
    }
}

/// Story options chosen on the writing page.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateInput {
    pub genre: Option<String>,
    pub era: Option<String>,
    pub setting: Option<String>,
    pub protagonist_gender: Option<String>,
    pub protagonist_personality: Option<String>,
    pub mood: Option<String>,
    pub conflict: Option<String>,
    pub pacing: Option<String>,
    pub ending: Option<String>,
    pub pov: Option<String>,
    pub additional_request: Option<String>,
}

/// Option labels after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StoryOptions<'a> {
    genre: &'a str,
    era: &'a str,
    setting: &'a str,
    protagonist_gender: &'a str,
    protagonist_personality: &'a str,
    mood: &'a str,
    conflict: &'a str,
    pacing: &'a str,
    ending: &'a str,
    pov: &'a str,
    additional_request: Option<&'a str>,
}

impl GenerateInput {
    /// Resolve every option to its display label, failing on the first missing field.
    fn options(&self) -> AppResult<StoryOptions<'_>> {
        fn field<'a>(value: Option<&'a String>, name: &str) -> AppResult<&'a str> {
            value
                .map(String::as_str)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::BadRequest(format!("{name} 필드가 필요합니다.")))
        }

        Ok(StoryOptions {
            genre: label(GENRE_LABELS, field(self.genre.as_ref(), "genre")?),
            era: label(ERA_LABELS, field(self.era.as_ref(), "era")?),
            setting: label(SETTING_LABELS, field(self.setting.as_ref(), "setting")?),
            protagonist_gender: label(
                GENDER_LABELS,
                field(self.protagonist_gender.as_ref(), "protagonistGender")?,
            ),
            protagonist_personality: label(
                PERSONALITY_LABELS,
                field(
                    self.protagonist_personality.as_ref(),
                    "protagonistPersonality",
                )?,
            ),
            mood: label(MOOD_LABELS, field(self.mood.as_ref(), "mood")?),
            conflict: label(CONFLICT_LABELS, field(self.conflict.as_ref(), "conflict")?),
            pacing: label(PACING_LABELS, field(self.pacing.as_ref(), "pacing")?),
            ending: label(ENDING_LABELS, field(self.ending.as_ref(), "ending")?),
            pov: label(POV_LABELS, field(self.pov.as_ref(), "pov")?),
            additional_request: self
                .additional_request
                .as_deref()
                .filter(|r| !r.is_empty()),
        })
    }
}

type Labels = &'static [(&'static str, &'static str)];

const GENRE_LABELS: Labels = &[
    ("romance", "로맨스"),
    ("fantasy", "판타지"),
    ("sf", "SF"),
    ("mystery", "추리"),
    ("healing", "힐링"),
    ("martial_arts", "무협"),
    ("adventure", "모험"),
    ("modern", "현대물"),
    ("historical", "사극"),
];

const ERA_LABELS: Labels = &[
    ("modern", "현대"),
    ("joseon", "조선시대"),
    ("medieval", "중세 유럽"),
    ("future", "미래"),
    ("ancient", "고대"),
    ("other_world", "이세계"),
];

const GENDER_LABELS: Labels = &[
    ("male", "남성"),
    ("female", "여성"),
    ("other", "성별 불특정"),
];

const PERSONALITY_LABELS: Labels = &[
    ("cold", "냉철하고 이성적인"),
    ("warm", "따뜻하고 다정한"),
    ("humorous", "유머러스하고 밝은"),
    ("mysterious", "신비롭고 비밀스러운"),
    ("righteous", "정의롭고 곧은"),
    ("cunning", "영리하고 재치있는"),
];

const MOOD_LABELS: Labels = &[
    ("bright", "밝고 희망찬"),
    ("calm", "잔잔하고 평화로운"),
    ("exciting", "흥미진진한"),
    ("touching", "감동적인"),
    ("comic", "코믹하고 유쾌한"),
];

const CONFLICT_LABELS: Labels = &[
    ("love", "사랑"),
    ("friendship", "우정"),
    ("adventure", "모험"),
    ("dream", "꿈과 목표 추구"),
    ("growth", "성장"),
    ("mystery", "미스터리 해결"),
];

const PACING_LABELS: Labels = &[
    ("fast", "빠른 전개"),
    ("slow", "느린 전개로 감정선 중심"),
    ("twist", "반전이 있는"),
];

const ENDING_LABELS: Labels = &[
    ("happy", "해피엔딩"),
    ("hopeful", "희망적인 결말"),
    ("open", "열린 결말"),
    ("surprise", "반전 결말"),
];

const SETTING_LABELS: Labels = &[
    ("city", "도시"),
    ("countryside", "시골"),
    ("school", "학교"),
    ("palace", "궁궐"),
    ("other_world", "이세계"),
    ("space", "우주"),
];

const POV_LABELS: Labels = &[("first", "1인칭 시점"), ("third", "3인칭 시점")];

/// Display label of an option code. Unknown codes pass through.
fn label<'a>(labels: Labels, code: &'a str) -> &'a str {
    labels
        .iter()
        .find(|(key, _)| *key == code)
        .map_or(code, |(_, label)| label)
}

fn build_prompt(o: &StoryOptions<'_>) -> String {
    let mut prompt = format!(
        "당신은 한국의 베스트셀러 소설가입니다. 아래 조건에 맞는 창작 단편 소설을 작성해주세요.
이것은 순수 창작 문학 작품이며, 교육적이고 예술적인 목적으로 작성됩니다.

## 소설 조건
- 장르: {genre}
- 시대배경: {era}
- 배경 장소: {setting}
- 주인공: {gender}, {personality} 성격
- 분위기: {mood}
- 주요 테마/사건: {conflict}
- 전개 방식: {pacing}
- 결말: {ending}
- 서술 시점: {pov}

## 작성 규칙
1. 약 2500~3000자 분량의 완결된 단편 소설을 작성하세요.
2. 독자가 5분 내외로 읽을 수 있는 분량입니다.
3. 한국어로 작성하며, 자연스럽고 몰입감 있는 문체를 사용하세요.
4. 소설의 제목도 함께 제안해주세요.
5. 제목과 본문을 구분하여 작성하세요.
6. 폭력적이거나 선정적인 내용은 피하고, 문학적으로 표현해주세요.

## 출력 형식
제목: [소설 제목]

[소설 본문]",
        genre = o.genre,
        era = o.era,
        setting = o.setting,
        gender = o.protagonist_gender,
        personality = o.protagonist_personality,
        mood = o.mood,
        conflict = o.conflict,
        pacing = o.pacing,
        ending = o.ending,
        pov = o.pov,
    );

    if let Some(extra) = o.additional_request {
        prompt.push_str("\n\n## 추가 요청사항\n");
        prompt.push_str(extra);
    }

    prompt
}

/// A generated story split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStory {
    pub title: String,
    pub body: String,
    pub description: String,
}

/// `제목: X` / `제목 : X` → `X`.
fn strip_title_marker(line: &str) -> Option<&str> {
    if !(line.starts_with("제목:") || line.starts_with("제목 :")) {
        return None;
    }
    let rest = line[TITLE_MARKER.len()..].trim_start();
    rest.strip_prefix(':').map(str::trim)
}

/// Split model output into title, body and a short description.
#[must_use]
pub fn parse_story(content: &str) -> ParsedStory {
    let lines: Vec<&str> = content.split('\n').collect();

    // Only the first marker line counts; an empty title there falls back too
    let marked = lines
        .iter()
        .enumerate()
        .find_map(|(i, line)| strip_title_marker(line.trim()).map(|t| (t.to_string(), i + 1)))
        .filter(|(title, _)| !title.is_empty());

    let (title, mut start) = marked.unwrap_or_else(|| {
        let first = lines.first().copied().unwrap_or_default();
        let first = first.strip_prefix('#').map_or(first, str::trim_start);
        (first.trim().to_string(), 1)
    });

    while start < lines.len() && lines[start].trim().is_empty() {
        start += 1;
    }

    let body = lines
        .get(start..)
        .map(|rest| rest.join("\n"))
        .unwrap_or_default()
        .trim()
        .to_string();

    let description = format!(
        "{}...",
        body.chars()
            .take(DESCRIPTION_CHARS)
            .collect::<String>()
            .replace('\n', " ")
    );

    ParsedStory {
        title,
        body,
        description,
    }
}

/// The stored novel.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedNovel {
    pub id: String,
    pub title: String,
}

/// Response of a generation request.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateOutcome {
    pub success: bool,
    pub novel: GeneratedNovel,
}

/// Generation service.
#[derive(Clone)]
pub struct GenerationService {
    client: Option<Arc<dyn CompletionClient>>,
    novel_repo: NovelRepository,
    id_gen: IdGenerator,
}

impl GenerationService {
    /// Create a service. Without a client every request fails with a config error.
    #[must_use]
    pub fn new(client: Option<Arc<dyn CompletionClient>>, novel_repo: NovelRepository) -> Self {
        Self {
            client,
            novel_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Generate a short story and publish it under the caller's name.
    pub async fn generate(
        &self,
        ctx: &AuthContext,
        input: GenerateInput,
    ) -> AppResult<GenerateOutcome> {
        let client = self.client.as_ref().ok_or_else(|| {
            AppError::Config(
                "Text generation is not configured (GITHUB_TOKEN or OPENAI_API_KEY)".to_string(),
            )
        })?;

        let options = input.options()?;
        let prompt = build_prompt(&options);

        info!(user_id = %ctx.user_id, genre = options.genre, "Generating novel");
        let completion = client.complete(SYSTEM_PERSONA, &prompt).await?;

        if completion.finish_reason == Some(FinishReason::ContentFilter) {
            error!(user_id = %ctx.user_id, "Completion blocked by content filter");
            return Err(AppError::BadRequest(CONTENT_FILTER_MESSAGE.to_string()));
        }

        let content = completion
            .content
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                AppError::ExternalService("AI 응답을 받지 못했습니다. 다시 시도해주세요.".to_string())
            })?;

        let story = parse_story(&content);
        let title = if story.title.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            story.title
        };

        let model = novel::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(title),
            description: Set(Some(story.description)),
            content: Set(Some(story.body)),
            category: Set(NovelCategory::Short),
            author_id: Set(ctx.user_id.clone()),
            is_published: Set(true),
            view_count: Set(0),
            like_count: Set(0),
            dislike_count: Set(0),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let novel = self.novel_repo.create(model).await?;
        info!(novel_id = %novel.id, user_id = %ctx.user_id, "Generated novel stored");

        Ok(GenerateOutcome {
            success: true,
            novel: GeneratedNovel {
                id: novel.id,
                title: novel.title,
            },
        })
    }
}
