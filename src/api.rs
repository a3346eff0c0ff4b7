// api.rs — 生成请求的构造、发送与解析
//
// 纯函数部分（build_prompt / build_url / parse_response）与网络调用分离，
// 便于单测。网络调用在工作线程上阻塞执行，结果经 channel 回到 UI 线程。

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use crate::camera::{angle_category, shot_category, view_category, CameraSettings};
use crate::config::ApiConfig;
use crate::state::EncodedImage;

const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("http client build failed: {0}")]
    HttpClientBuild(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("{0}")]
    Api(String),
    #[error("response parse failed: {0}")]
    Parse(String),
    #[error("no image returned")]
    NoImageReturned,
}

// --- 1. 提示词与地址 ---

/// 固定模板，嵌入三个分类标签。标签文本改动会改变生成结果。
pub fn build_prompt(settings: &CameraSettings) -> String {
    let view = view_category(settings.view).label();
    let angle = angle_category(settings.angle).label();
    let shot = shot_category(settings.shot).label();

    format!(
        "Re-generate this image from a new 3D camera perspective.\n\
         Target Settings:\n\
         - Perspective/View: {view}\n\
         - Vertical Angle: {angle}\n\
         - Shot Type/Framing: {shot}\n\
         \n\
         Constraint: Keep all subjects, colors, lighting, and environment identical. \
         Change only the lens perspective and camera position to match these technical \
         specifications precisely."
    )
}

pub fn build_url(config: &ApiConfig) -> String {
    format!(
        "{}/v1beta/models/{}:generateContent?key={}",
        config.base_url.trim_end_matches('/'),
        config.model,
        config.api_key
    )
}

// --- 2. 请求/响应线格式 ---
// 注意：请求侧字段是 snake_case（inline_data），响应侧是 camelCase（inlineData）。

#[derive(Serialize)]
struct GenerateContentBody<'a> {
    contents: [RequestContent<'a>; 1],
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: [RequestPart<'a>; 2],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<RequestInlineData<'a>>,
}

#[derive(Serialize)]
struct RequestInlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig<'a> {
    #[serde(rename = "responseModalities")]
    response_modalities: [&'a str; 2],
    #[serde(rename = "imageConfig")]
    image_config: ImageConfig<'a>,
}

#[derive(Serialize)]
struct ImageConfig<'a> {
    #[serde(rename = "aspectRatio")]
    aspect_ratio: &'a str,
    #[serde(rename = "imageSize")]
    image_size: &'a str,
}

fn build_body<'a>(prompt: &'a str, mime: &'a str, data_b64: &'a str) -> GenerateContentBody<'a> {
    GenerateContentBody {
        contents: [RequestContent {
            role: "user",
            parts: [
                RequestPart {
                    text: Some(prompt),
                    inline_data: None,
                },
                RequestPart {
                    text: None,
                    inline_data: Some(RequestInlineData {
                        mime_type: mime,
                        data: data_b64,
                    }),
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_modalities: ["TEXT", "IMAGE"],
            image_config: ImageConfig {
                aspect_ratio: "9:16",
                image_size: "1K",
            },
        },
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(rename = "inlineData")]
    inline_data: Option<ResponseInlineData>,
}

#[derive(Deserialize)]
struct ResponseInlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

// --- 3. 解析 ---

/// 取第一个候选里第一个带内联图片的 part。
/// HTTP 成功但没有图片 part 时显式报错，不再静默吞掉。
pub fn parse_response(text: &str) -> Result<EncodedImage, GenerationError> {
    let resp: GenerateContentResponse =
        serde_json::from_str(text).map_err(|e| GenerationError::Parse(e.to_string()))?;

    let parts = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    for part in parts {
        if let Some(inline) = part.inline_data {
            let bytes = BASE64
                .decode(inline.data.as_bytes())
                .map_err(|e| GenerationError::Parse(e.to_string()))?;
            return Ok(EncodedImage {
                bytes,
                mime: inline.mime_type,
            });
        }
    }

    Err(GenerationError::NoImageReturned)
}

/// 非成功状态：优先用服务端给的 error.message，拿不到就退回状态码。
pub fn extract_error_message(body: &str, status: u16) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| format!("HTTP {status}"))
}

// --- 4. 网络调用 ---

/// 阻塞执行一次生成请求。调用方负责放到工作线程上。
pub fn generate(
    config: &ApiConfig,
    settings: CameraSettings,
    reference: &EncodedImage,
) -> Result<EncodedImage, GenerationError> {
    let prompt = build_prompt(&settings);
    let data_b64 = BASE64.encode(&reference.bytes);
    let body = build_body(&prompt, &reference.mime, &data_b64);

    // reqwest 阻塞客户端默认 30 秒超时，生成请求可能更久，这里显式关掉，
    // 请求要么成功要么出错返回，没有中途取消。
    let client = reqwest::blocking::Client::builder()
        .timeout(None)
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()
        .map_err(|e| GenerationError::HttpClientBuild(e.to_string()))?;

    let response = client
        .post(build_url(config))
        .header(reqwest::header::ACCEPT, "application/json")
        .json(&body)
        .send()
        .map_err(|e| GenerationError::Request(e.to_string()))?;

    let status = response.status().as_u16();
    let text = response
        .text()
        .map_err(|e| GenerationError::Request(e.to_string()))?;

    if !(200..300).contains(&status) {
        return Err(GenerationError::Api(extract_error_message(&text, status)));
    }

    parse_response(&text)
}

// 请求编号进程内全局递增，跨会话重载也不会重复
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

/// 在工作线程上执行生成，结果带着请求编号发回 UI 线程。
/// 在途标记由状态层把关，这里假设调用时已经通过 begin_generation。
/// 返回分配给本次请求的编号，接收端据此丢弃过期结果。
pub fn spawn_generation(
    config: ApiConfig,
    settings: CameraSettings,
    reference: EncodedImage,
    tx: Sender<(u64, Result<EncodedImage, GenerationError>)>,
) -> u64 {
    let id = next_request_id();
    thread::spawn(move || {
        log::info!(
            "generation request #{id}: model={} view={:.0} angle={:.0} shot={:.0}",
            config.model,
            settings.view,
            settings.angle,
            settings.shot
        );
        let result = generate(&config, settings, &reference);
        if let Err(e) = &result {
            log::warn!("generation failed: {e}");
        }
        if tx.send((id, result)).is_err() {
            log::warn!("generation result dropped: ui channel closed");
        }
    });
    id
}
