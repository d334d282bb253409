// ==========================================
// LUCI 线索编排系统 - 编排 API
// ==========================================
// 职责: enrich / push 两个动作的入口，批量反查 webhook 回填，触达历史查询
// 说明: enrich 与 push 是两次独立调用，先 enrich 再 push
// ==========================================

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::api::dto::{
    AttemptHistoryResponse, BulkWebhookPayload, EnrichRequest, EnrichResponse, PushRequest,
    PushResponse, WebhookResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{parse_enrichment_types, require_non_empty, validate_batch_number};
use crate::config::PipelineConfig;
use crate::domain::types::{CampaignContext, Destination, PushMode};
use crate::engine::attempt_ledger::AttemptLedger;
use crate::engine::batch_controller::BatchController;
use crate::engine::push_dispatcher::{PushCommand, PushDispatcher};
use crate::enrichment::{apply_bulk_results, EnrichmentResult, VendorResult};
use crate::gateway::{GatewayError, RecordStore};

/// 默认外呼角色
const DEFAULT_AGENT: &str = "gianna";

/// 编排动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestrateAction {
    Enrich,
    Push,
}

impl OrchestrateAction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "enrich" => Some(OrchestrateAction::Enrich),
            "push" => Some(OrchestrateAction::Push),
            _ => None,
        }
    }
}

fn parse_body<T: DeserializeOwned>(body: Value) -> ApiResult<T> {
    serde_json::from_value(body).map_err(|e| ApiError::InvalidInput(format!("请求体格式错误: {}", e)))
}

// ==========================================
// OrchestrateApi - 编排 API
// ==========================================

/// 编排API
///
/// 职责：
/// 1. enrich: 处理一个批次，返回进度
/// 2. push: 派发线索块
/// 3. 批量反查 webhook 回填
/// 4. 触达历史与再触达判定
pub struct OrchestrateApi {
    store: Arc<dyn RecordStore>,
    controller: Arc<BatchController>,
    dispatcher: Arc<PushDispatcher>,
    ledger: Arc<AttemptLedger>,
    config: PipelineConfig,
}

impl OrchestrateApi {
    pub fn new(
        store: Arc<dyn RecordStore>,
        controller: Arc<BatchController>,
        dispatcher: Arc<PushDispatcher>,
        ledger: Arc<AttemptLedger>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            controller,
            dispatcher,
            ledger,
            config,
        }
    }

    /// 统一入口：按 action 分发
    ///
    /// # 参数
    /// - body: 原始 JSON 请求体
    ///
    /// # 返回
    /// - Ok(Value): enrich 或 push 的响应
    /// - Err(ApiError::ValidationError): action / sourceId 缺失或非法
    pub async fn orchestrate(&self, body: Value) -> ApiResult<Value> {
        let action = body.get("action").and_then(Value::as_str).map(str::to_string);
        let source_id = body
            .get("sourceId")
            .or_else(|| body.get("bucketId"))
            .and_then(Value::as_str)
            .map(str::to_string);
        require_non_empty(source_id.as_deref(), "sourceId")?;

        let action = action.as_deref().and_then(OrchestrateAction::from_str).ok_or_else(|| {
            ApiError::ValidationError("action is required: 'enrich' or 'push'".to_string())
        })?;

        let response = match action {
            OrchestrateAction::Enrich => {
                let request: EnrichRequest = parse_body(body)?;
                serde_json::to_value(self.enrich(request).await?)
            }
            OrchestrateAction::Push => {
                let request: PushRequest = parse_body(body)?;
                serde_json::to_value(self.push(request).await?)
            }
        };
        response.map_err(|e| ApiError::InternalError(format!("响应序列化失败: {}", e)))
    }

    /// 处理一个补全批次
    ///
    /// # 返回
    /// - Ok(EnrichResponse): 批次计数与进度
    /// - Err(ApiError::UpstreamFetchError): 记录仓库读取失败
    #[instrument(skip(self, request))]
    pub async fn enrich(&self, request: EnrichRequest) -> ApiResult<EnrichResponse> {
        let source_id = require_non_empty(request.source_id.as_deref(), "sourceId")?;
        let batch_number = validate_batch_number(request.batch_number)?;
        let types = parse_enrichment_types(request.enrichment_types.as_deref())?;

        let result = self
            .controller
            .process_batch(&source_id, batch_number, &types, &request.filters)
            .await?;
        Ok(EnrichResponse::from(result))
    }

    /// 派发线索块
    ///
    /// # 返回
    /// - Ok(PushResponse): 各渠道入队数、跳过数、下一步提示
    /// - Err(ApiError::ValidationError): leadBlockId 缺失/不匹配、无已补全线索、retarget 缺少 attemptInfo
    /// - Err(ApiError::UpstreamFetchError): 记录仓库读取失败
    #[instrument(skip(self, request))]
    pub async fn push(&self, request: PushRequest) -> ApiResult<PushResponse> {
        let source_id = require_non_empty(request.source_id.as_deref(), "sourceId")?;
        let lead_block_id = require_non_empty(request.lead_block_id.as_deref(), "leadBlockId")?;
        let agent = request
            .agent
            .clone()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AGENT.to_string());

        let command = PushCommand {
            source_id,
            lead_block_id: lead_block_id.clone(),
            destination: request.destination.unwrap_or(Destination::Sms),
            mode: request.mode.unwrap_or(PushMode::Draft),
            campaign_context: request.campaign_context.unwrap_or(CampaignContext::Initial),
            template_category: request
                .template_category
                .clone()
                .unwrap_or_else(|| "general".to_string()),
            template_override: request.template_override.clone(),
            attempt_info: request.attempt_info.clone(),
            campaign_name: request.campaign_name.clone(),
            agent: Some(agent.clone()),
        };

        let result = self.dispatcher.push(command).await?;
        Ok(PushResponse::from_result(&lead_block_id, Some(agent), result))
    }

    /// 批量反查 webhook 回填
    ///
    /// # 参数
    /// - payload: { sourceId, jobId, results[] }
    ///
    /// # 返回
    /// - Ok(WebhookResponse): resolved / failed / ignored 计数与回写成功数
    #[instrument(skip(self, payload), fields(job_id = ?payload.job_id))]
    pub async fn resolve_bulk_job(&self, payload: BulkWebhookPayload) -> ApiResult<WebhookResponse> {
        let source_id = require_non_empty(payload.source_id.as_deref(), "sourceId")?;
        let results: Vec<EnrichmentResult> = payload
            .results
            .into_iter()
            .map(VendorResult::into_result)
            .collect();

        let timeout = self.config.request_timeout();
        let mut records = match tokio::time::timeout(timeout, self.store.fetch_records(&source_id)).await {
            Ok(result) => result?,
            Err(_) => return Err(GatewayError::Timeout(self.config.request_timeout_ms).into()),
        };

        let resolution = apply_bulk_results(&mut records, payload.job_id.as_deref(), &results);

        let mut saved = 0;
        for &idx in &resolution.changed {
            let record = &records[idx];
            let write = tokio::time::timeout(timeout, self.store.save_enrichment(&source_id, record)).await;
            match write {
                Ok(Ok(())) => saved += 1,
                Ok(Err(e)) => warn!(record_id = %record.raw.id, error = %e, "webhook 回填写入失败"),
                Err(_) => warn!(record_id = %record.raw.id, "webhook 回填写入超时"),
            }
        }

        info!(
            resolved = resolution.resolved,
            failed = resolution.failed,
            ignored = resolution.ignored,
            saved,
            "批量反查任务已回填"
        );

        Ok(WebhookResponse {
            success: true,
            source_id,
            resolution,
            saved,
        })
    }

    /// 查询线索触达历史（合规审计）
    pub fn attempt_history(&self, lead_id: &str) -> ApiResult<AttemptHistoryResponse> {
        if lead_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("线索ID不能为空".to_string()));
        }
        let attempts = self.ledger.history(lead_id)?;
        let retarget = self.ledger.should_auto_retarget(lead_id)?;
        Ok(AttemptHistoryResponse {
            lead_id: lead_id.to_string(),
            attempts,
            retarget,
        })
    }
}
