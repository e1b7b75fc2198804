use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use super::client::HkubeClient;
use super::input::ToolInput;
use super::registry::{ToolHandler, ToolSpec};

pub const ENDPOINTS: &[&str] = &["exec"];

const PARAMS: &[&str] = &[
    "experiment_name",
    "pipeline_name",
    "pipeline_type",
    "algorithm_name",
    "pipeline_status",
    "tags",
    "dates_range",
    "fields",
    "sort",
    "page_num",
    "limit",
    "mode",
    "payload",
];

const DEFAULT_FIELDS: &[&str] = &[
    "jobId",
    "userPipeline.name",
    "pipeline.startTime",
    "pipeline.priority",
    "pipeline.tags",
    "pipeline.types",
    "status.data.details",
    "result.timeTook",
    "graph",
];

/// Job search request. `mode` picks the variant and defaults to `filter`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SearchRequest {
    Filter(SearchFilter),
    Raw { payload: Map<String, Value> },
}

/// Either end may be omitted; see [`DatesRange::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatesRange {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct ResolvedRange {
    from: String,
    to: String,
}

impl DatesRange {
    /// A missing `to` is `now`; a missing `from` is one day before `to`,
    /// or before `now` when `to` is not RFC 3339.
    fn resolve(&self, now: DateTime<Utc>) -> ResolvedRange {
        let to = self.to.clone().unwrap_or_else(|| now.to_rfc3339());
        let from = self.from.clone().unwrap_or_else(|| {
            let end = DateTime::parse_from_rfc3339(&to)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or(now);
            (end - Duration::days(1)).to_rfc3339()
        });
        ResolvedRange { from, to }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchFilter {
    pub experiment_name: Option<String>,
    pub pipeline_name: Option<String>,
    pub pipeline_type: Option<String>,
    pub algorithm_name: Option<String>,
    pub pipeline_status: Option<String>,
    pub tags: Option<Value>,
    pub dates_range: Option<DatesRange>,
    pub fields: Option<BTreeMap<String, bool>>,
    pub sort: String,
    pub page_num: u32,
    pub limit: u32,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            experiment_name: None,
            pipeline_name: None,
            pipeline_type: None,
            algorithm_name: None,
            pipeline_status: None,
            tags: None,
            dates_range: None,
            fields: None,
            sort: "desc".to_string(),
            page_num: 1,
            limit: 10,
        }
    }
}

impl SearchFilter {
    /// Request body for the search API. Unset query fields are omitted and
    /// the date range defaults to the 24 hours before `now`.
    pub fn to_payload(&self, now: DateTime<Utc>) -> Value {
        let dates_range = self.dates_range.clone().unwrap_or_default().resolve(now);

        let mut query = Map::new();
        query.insert("datesRange".to_string(), json!(dates_range));
        let optional = [
            ("experimentName", self.experiment_name.clone().map(Value::String)),
            ("pipelineName", self.pipeline_name.clone().map(Value::String)),
            ("pipelineType", self.pipeline_type.clone().map(Value::String)),
            ("algorithmName", self.algorithm_name.clone().map(Value::String)),
            ("pipelineStatus", self.pipeline_status.clone().map(Value::String)),
            ("tags", self.tags.clone().filter(|v| !v.is_null())),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                query.insert(key.to_string(), value);
            }
        }

        let mut fields: BTreeMap<String, bool> = DEFAULT_FIELDS
            .iter()
            .map(|f| (f.to_string(), true))
            .collect();
        if let Some(overrides) = &self.fields {
            fields.extend(overrides.clone());
        }

        json!({
            "query": query,
            "sort": self.sort,
            "pageNum": self.page_num,
            "limit": self.limit,
            "fields": fields,
        })
    }
}

impl SearchRequest {
    pub fn from_input(input: &ToolInput) -> Result<Self, String> {
        let mut bound = input.bind(PARAMS)?;
        match bound.get("mode") {
            None | Some(Value::Null) => {
                bound.insert("mode".to_string(), json!("filter"));
            }
            Some(Value::String(mode)) if mode == "raw" => {
                let extra: Vec<&str> = bound
                    .keys()
                    .map(String::as_str)
                    .filter(|k| *k != "mode" && *k != "payload")
                    .collect();
                if !extra.is_empty() {
                    return Err(format!(
                        "mode 'raw' only accepts 'payload', got: {}",
                        extra.join(", ")
                    ));
                }
            }
            Some(_) => {}
        }
        if bound.get("mode") == Some(&json!("filter")) && bound.contains_key("payload") {
            return Err("'payload' requires mode 'raw'".to_string());
        }

        serde_json::from_value(Value::Object(bound))
            .map_err(|e| format!("Invalid job search request: {}", e))
    }

    pub fn into_payload(self, now: DateTime<Utc>) -> Value {
        match self {
            SearchRequest::Filter(filter) => filter.to_payload(now),
            SearchRequest::Raw { payload } => Value::Object(payload),
        }
    }
}

pub fn tools(client: &HkubeClient) -> Result<Vec<ToolSpec>, String> {
    let client = client.clone();
    Ok(vec![ToolSpec::described(
        "search_jobs_tool",
        "Search jobs",
        "Search the hkube exec API for jobs matching filters and return the results. \
         Pass filter fields (experiment_name, pipeline_name, pipeline_type, algorithm_name, \
         pipeline_status, tags, dates_range, fields, sort, page_num, limit), or mode \"raw\" \
         with a payload object to send as-is.",
        ToolHandler::standalone(move |input: ToolInput| {
            let client = client.clone();
            async move { search_jobs(&client, input).await }
        }),
    )])
}

pub async fn search_jobs(client: &HkubeClient, input: ToolInput) -> Result<String, String> {
    let request = SearchRequest::from_input(&input)?;
    let payload = request.into_payload(Utc::now());
    let url = client
        .endpoints()
        .search_url()
        .map_err(|e| format!("Failed to search jobs: {}", e))?;

    client
        .post_json(&url, &payload)
        .await
        .map_err(|e| format!("Failed to search jobs: {}", e))
}
