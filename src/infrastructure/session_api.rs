use crate::domain::models::{DailyStat, SessionMode, SessionSnapshot, StatsPeriod, TagStat};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Typed access to the session service. Implementations only transport and
/// decode; interpreting the results is the caller's job.
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn fetch_state(&self) -> Result<SessionSnapshot, InfraError>;

    async fn start_focus(&self, duration_minutes: u32, tag: Option<&str>) -> Result<(), InfraError>;

    async fn start_break(&self, duration_minutes: u32, tag: Option<&str>) -> Result<(), InfraError>;

    async fn stop(&self) -> Result<(), InfraError>;

    async fn recent_tags(&self, limit: Option<u32>) -> Result<Vec<String>, InfraError>;

    async fn stats_by_tag(&self) -> Result<Vec<TagStat>, InfraError>;

    async fn daily_stats(&self, period: StatsPeriod) -> Result<Vec<DailyStat>, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestSessionApiClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, serde::Serialize)]
struct StartSessionRequest<'a> {
    duration_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<&'a str>,
}

#[derive(Debug, serde::Deserialize)]
struct StatePayload {
    mode: String,
    #[serde(default)]
    remaining_seconds: Option<i64>,
    #[serde(default)]
    planned_duration_sec: Option<i64>,
    #[serde(default)]
    completed_focus_count: Option<i64>,
    #[serde(default)]
    total_focus_seconds: Option<i64>,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    cycle_count: Option<i64>,
    #[serde(default)]
    suggest_long_break: Option<bool>,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorPayload {
    error: Option<String>,
}

impl ReqwestSessionApiClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub fn with_timeout(base_url: Url, timeout_ms: Option<u64>) -> Result<Self, InfraError> {
        let Some(timeout_ms) = timeout_ms else {
            return Ok(Self::new(base_url));
        };
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|error| InfraError::InvalidConfig(format!("failed to build http client: {error}")))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &[&str]) -> Result<Url, InfraError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::InvalidConfig("session api base URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty();
            segments.push("api");
            segments.push("pomodoro");
            for segment in path {
                segments.push(segment);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T, InfraError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| InfraError::Network(format!("network error while fetching {what}: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Network(format!("failed reading {what} response: {error}")))?;

        if !status.is_success() {
            return Err(InfraError::MalformedResponse(format!(
                "unexpected http {} for {what}",
                status.as_u16()
            )));
        }
        decode_json(&body, what)
    }

    async fn post_command<B: serde::Serialize + ?Sized>(
        &self,
        url: Url,
        body: Option<&B>,
        what: &str,
    ) -> Result<(), InfraError> {
        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|error| InfraError::Network(format!("network error while {what}: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Network(format!("failed reading {what} response: {error}")))?;

        if !status.is_success() {
            return Err(rejected_command(status, &body));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionApi for ReqwestSessionApiClient {
    async fn fetch_state(&self) -> Result<SessionSnapshot, InfraError> {
        let url = self.endpoint(&["state"])?;
        let payload: StatePayload = self.get_json(url, "session state").await?;
        snapshot_from_payload(payload)
    }

    async fn start_focus(&self, duration_minutes: u32, tag: Option<&str>) -> Result<(), InfraError> {
        let url = self.endpoint(&["start"])?;
        let request = StartSessionRequest {
            duration_minutes,
            tag,
        };
        self.post_command(url, Some(&request), "starting focus").await
    }

    async fn start_break(&self, duration_minutes: u32, tag: Option<&str>) -> Result<(), InfraError> {
        let url = self.endpoint(&["break"])?;
        let request = StartSessionRequest {
            duration_minutes,
            tag,
        };
        self.post_command(url, Some(&request), "starting break").await
    }

    async fn stop(&self) -> Result<(), InfraError> {
        let url = self.endpoint(&["stop"])?;
        self.post_command::<()>(url, None, "stopping session").await
    }

    async fn recent_tags(&self, limit: Option<u32>) -> Result<Vec<String>, InfraError> {
        let mut url = self.endpoint(&["tags", "recent"])?;
        if let Some(limit) = limit {
            url.query_pairs_mut().append_pair("limit", &limit.to_string());
        }
        let tags: Vec<String> = self.get_json(url, "recent tags").await?;
        Ok(tags
            .into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect())
    }

    async fn stats_by_tag(&self) -> Result<Vec<TagStat>, InfraError> {
        let url = self.endpoint(&["stats", "by-tag"])?;
        self.get_json(url, "tag statistics").await
    }

    async fn daily_stats(&self, period: StatsPeriod) -> Result<Vec<DailyStat>, InfraError> {
        let url = self.endpoint(&["stats", period.path_segment()])?;
        self.get_json(url, "daily statistics").await
    }
}

fn decode_json<T: DeserializeOwned>(body: &str, what: &str) -> Result<T, InfraError> {
    serde_json::from_str(body).map_err(|error| {
        InfraError::MalformedResponse(format!("invalid {what} payload: {error}; body={body}"))
    })
}

fn rejected_command(status: StatusCode, body: &str) -> InfraError {
    let message = serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(|payload| payload.error)
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty());
    InfraError::RejectedCommand {
        status: status.as_u16(),
        message,
    }
}

fn non_negative_u32(value: Option<i64>) -> u32 {
    u32::try_from(value.unwrap_or(0).max(0)).unwrap_or(u32::MAX)
}

fn snapshot_from_payload(payload: StatePayload) -> Result<SessionSnapshot, InfraError> {
    let mode = SessionMode::parse(&payload.mode).ok_or_else(|| {
        InfraError::MalformedResponse(format!("unknown session mode '{}'", payload.mode))
    })?;
    let (remaining_seconds, planned_duration_seconds) = if mode.is_active() {
        (
            non_negative_u32(payload.remaining_seconds),
            non_negative_u32(payload.planned_duration_sec),
        )
    } else {
        (0, 0)
    };

    Ok(SessionSnapshot {
        mode,
        remaining_seconds,
        planned_duration_seconds,
        completed_focus_count: non_negative_u32(payload.completed_focus_count),
        total_focus_seconds: payload.total_focus_seconds.unwrap_or(0).max(0) as u64,
        tag: payload
            .tag
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty()),
        cycle_count: non_negative_u32(payload.cycle_count),
        suggest_long_break: payload.suggest_long_break.unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_state(body: &str) -> Result<SessionSnapshot, InfraError> {
        let payload: StatePayload = decode_json(body, "session state")?;
        snapshot_from_payload(payload)
    }

    #[test]
    fn active_state_payload_is_decoded() {
        let snapshot = parse_state(
            r#"{"mode":"focus","remaining_seconds":1490,"planned_duration_sec":1500,
                "completed_focus_count":3,"total_focus_seconds":4500,"tag":" Project A "}"#,
        )
        .expect("valid payload");

        assert_eq!(snapshot.mode, SessionMode::Focus);
        assert_eq!(snapshot.remaining_seconds, 1490);
        assert_eq!(snapshot.planned_duration_seconds, 1500);
        assert_eq!(snapshot.completed_focus_count, 3);
        assert_eq!(snapshot.total_focus_seconds, 4500);
        assert_eq!(snapshot.tag.as_deref(), Some("Project A"));
        assert!(!snapshot.suggest_long_break);
    }

    #[test]
    fn idle_payload_zeroes_countdown_fields() {
        let snapshot = parse_state(
            r#"{"mode":"idle","remaining_seconds":12,"completed_focus_count":4,
                "total_focus_seconds":6000,"cycle_count":4,"suggest_long_break":true}"#,
        )
        .expect("valid payload");

        assert_eq!(snapshot.mode, SessionMode::Idle);
        assert_eq!(snapshot.remaining_seconds, 0);
        assert_eq!(snapshot.planned_duration_seconds, 0);
        assert_eq!(snapshot.cycle_count, 4);
        assert!(snapshot.suggest_long_break);
    }

    #[test]
    fn negative_counters_clamp_to_zero() {
        let snapshot = parse_state(r#"{"mode":"break","remaining_seconds":-3}"#).expect("valid payload");
        assert_eq!(snapshot.remaining_seconds, 0);
        assert_eq!(snapshot.completed_focus_count, 0);
    }

    #[test]
    fn unknown_mode_or_shape_is_malformed() {
        assert!(matches!(
            parse_state(r#"{"mode":"paused"}"#),
            Err(InfraError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_state(r#"["focus"]"#),
            Err(InfraError::MalformedResponse(_))
        ));
    }

    #[test]
    fn rejection_carries_server_message_when_present() {
        match rejected_command(StatusCode::CONFLICT, r#"{"error":"Active session already exists"}"#) {
            InfraError::RejectedCommand { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message.as_deref(), Some("Active session already exists"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }

        match rejected_command(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>") {
            InfraError::RejectedCommand { message, .. } => assert_eq!(message, None),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn endpoints_are_built_under_api_prefix() {
        let client = ReqwestSessionApiClient::new(Url::parse("http://timer.local:5000/app/").expect("url"));
        assert_eq!(
            client.endpoint(&["state"]).expect("endpoint").as_str(),
            "http://timer.local:5000/app/api/pomodoro/state"
        );
        assert_eq!(
            client.endpoint(&["stats", "by-tag"]).expect("endpoint").as_str(),
            "http://timer.local:5000/app/api/pomodoro/stats/by-tag"
        );

        let root = ReqwestSessionApiClient::new(Url::parse("http://timer.local:5000").expect("url"));
        assert_eq!(
            root.endpoint(&["tags", "recent"]).expect("endpoint").as_str(),
            "http://timer.local:5000/api/pomodoro/tags/recent"
        );
    }
}
