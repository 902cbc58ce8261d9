use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::errors::ServiceError;
use crate::models::Equipment;
use crate::schedule::SharedClock;

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Reply language for advisor answers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Zh,
    En,
}

impl Locale {
    fn advice_instruction(self) -> &'static str {
        match self {
            Locale::En => "You are an expert in industrial lubrication and reliability. Please provide concise, actionable advice in English.",
            Locale::Zh => "你是一位精通摩擦学和润滑可靠性的工业维护专家。请用中文提供简洁、可操作的建议。如果用户询问上下文中提到的特定设备，请分析提供的数据。",
        }
    }

    /// Text returned in place of an answer when the completion service fails.
    pub fn failure_message(self) -> &'static str {
        match self {
            Locale::En => "Sorry, error connecting to AI service.",
            Locale::Zh => "抱歉，连接智能服务时出现错误。",
        }
    }
}

/// Opaque text-generation backend.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String, ServiceError>;
}

/// Gemini `generateContent` over HTTPS.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: GEMINI_ENDPOINT.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl TextCompletion for GeminiClient {
    #[instrument(skip(self, system, prompt), fields(model = %self.model))]
    async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String, ServiceError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        );
        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });
        if let Some(system) = system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("advisor request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "advisor responded with status {}",
                status
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("advisor reply unreadable: {}", e)))?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        debug!(chars = text.len(), "advisor replied");
        Ok(text)
    }
}

/// Lubrication advice and schedule risk summaries.
#[derive(Clone)]
pub struct MaintenanceAdvisor {
    completion: Option<Arc<dyn TextCompletion>>,
    clock: SharedClock,
}

impl MaintenanceAdvisor {
    pub fn new(completion: Option<Arc<dyn TextCompletion>>, clock: SharedClock) -> Self {
        Self { completion, clock }
    }

    pub fn is_enabled(&self) -> bool {
        self.completion.is_some()
    }

    /// Answers a free-form question, with the equipment list as context.
    #[instrument(skip(self, equipment), fields(equipment = equipment.len()))]
    pub async fn get_advice(&self, query: &str, equipment: &[Equipment], locale: Locale) -> String {
        let mut prompt = format!("User Query: {}\n", query.trim());
        if !equipment.is_empty() {
            let context: Vec<_> = equipment
                .iter()
                .map(|e| {
                    json!({
                        "name": e.name,
                        "type": e.equipment_type,
                        "lubricant": e.lubricant,
                        "nextDue": e.next_service_date,
                    })
                })
                .collect();
            prompt.push_str(&format!(
                "Context - Current Equipment List:\n{}\n",
                serde_json::Value::Array(context)
            ));
        }
        self.ask(Some(locale.advice_instruction()), &prompt, locale).await
    }

    /// Short risk assessment of overdue equipment.
    #[instrument(skip(self, equipment), fields(equipment = equipment.len()))]
    pub async fn summarize_risk(&self, equipment: &[Equipment], locale: Locale) -> String {
        let today = self.clock.today();
        let overdue: Vec<_> = equipment
            .iter()
            .filter(|e| e.next_service_date < today)
            .map(|e| {
                json!({
                    "name": e.name,
                    "nextDue": e.next_service_date,
                    "daysOverdue": (today - e.next_service_date).num_days(),
                })
            })
            .collect();
        let overdue_count = overdue.len();
        let details = serde_json::Value::Array(overdue);

        let prompt = match locale {
            Locale::En => format!(
                "Analyze the following lubrication status:\n\
                 Total Equipment: {}\n\
                 Overdue Count: {}\n\
                 Overdue Details: {}\n\n\
                 Please provide a short, bulleted executive summary, assessing risk level and suggesting immediate actions.",
                equipment.len(),
                overdue_count,
                details
            ),
            Locale::Zh => format!(
                "分析以下润滑状态:\n\
                 设备总数: {}\n\
                 逾期设备数: {}\n\
                 逾期详情: {}\n\n\
                 请提供一份简短的、分条列出的行政摘要，评估风险等级并提出建议的立即采取措施。请用中文回答。",
                equipment.len(),
                overdue_count,
                details
            ),
        };
        self.ask(None, &prompt, locale).await
    }

    async fn ask(&self, system: Option<&str>, prompt: &str, locale: Locale) -> String {
        let Some(completion) = &self.completion else {
            warn!("advisor is not configured");
            return locale.failure_message().to_string();
        };
        match completion.complete(system, prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "advisor request failed");
                locale.failure_message().to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{parse_date, FixedClock};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl TextCompletion for Recorder {
        async fn complete(&self, _system: Option<&str>, prompt: &str) -> Result<String, ServiceError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                Err(ServiceError::ExternalServiceError("boom".into()))
            } else {
                Ok("use EP2 grease".into())
            }
        }
    }

    fn clock() -> SharedClock {
        Arc::new(FixedClock::on(parse_date("2024-06-02").unwrap()))
    }

    fn bearing(next: &str) -> Equipment {
        Equipment {
            id: "e1".into(),
            name: "Fan bearing".into(),
            equipment_type: "Bearing".into(),
            location: "Roof".into(),
            lubricant: "EP2".into(),
            cycle_days: 30,
            last_service_date: parse_date("2024-04-01").unwrap(),
            next_service_date: parse_date(next).unwrap(),
            capacity: "50g".into(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn advice_prompt_carries_equipment_context() {
        let recorder = Arc::new(Recorder::default());
        let advisor = MaintenanceAdvisor::new(Some(recorder.clone()), clock());
        let reply = advisor
            .get_advice("which grease?", &[bearing("2024-05-01")], Locale::En)
            .await;
        assert_eq!(reply, "use EP2 grease");
        let prompts = recorder.prompts.lock().unwrap();
        assert!(prompts[0].contains("\"lubricant\":\"EP2\""));
        assert!(prompts[0].contains("2024-05-01"));
    }

    #[tokio::test]
    async fn risk_summary_counts_overdue() {
        let recorder = Arc::new(Recorder::default());
        let advisor = MaintenanceAdvisor::new(Some(recorder.clone()), clock());
        advisor
            .summarize_risk(&[bearing("2024-05-01"), bearing("2024-07-01")], Locale::En)
            .await;
        let prompts = recorder.prompts.lock().unwrap();
        assert!(prompts[0].contains("Total Equipment: 2"));
        assert!(prompts[0].contains("Overdue Count: 1"));
        assert!(prompts[0].contains("\"daysOverdue\":32"));
    }

    #[tokio::test]
    async fn failures_become_localized_messages() {
        let failing = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let advisor = MaintenanceAdvisor::new(Some(failing), clock());
        assert_eq!(
            advisor.get_advice("?", &[], Locale::Zh).await,
            Locale::Zh.failure_message()
        );

        let unconfigured = MaintenanceAdvisor::new(None, clock());
        assert_eq!(
            unconfigured.summarize_risk(&[], Locale::En).await,
            "Sorry, error connecting to AI service."
        );
    }
}
