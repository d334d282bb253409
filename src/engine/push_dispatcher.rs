// ==========================================
// LUCI 线索编排系统 - 派发器
// ==========================================
// 职责: 线索块 → 台账门控 → 渠道筛选 → 话术解析 → 转发 → 触达日志
// 红线: retarget + human_in_loop 时强制 draft
// 红线: 单个渠道转发失败只记 0 入队，不影响另一渠道
// 红线: 每条线索每个渠道一行触达日志，同一次派发共享 dispatch_id
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::attempt::{AttemptInfo, AttemptLog};
use crate::domain::record::EnrichedRecord;
use crate::domain::types::{AttemptStatus, CampaignContext, Destination, OutreachChannel, PushMode};
use crate::engine::attempt_ledger::AttemptLedger;
use crate::engine::lead_block_assembler::LeadBlockAssembler;
use crate::engine::template_selector::{SelectedTemplate, TemplateSelector};
use crate::gateway::{
    ChannelGateway, ChannelLead, ChannelPushRequest, GatewayError, GatewayResult, RecordStore,
};
use crate::repository::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

// ==========================================
// DispatchError - 派发错误
// ==========================================
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("派发参数错误: {0}")]
    Validation(String),

    #[error("记录仓库读取失败: {0}")]
    Upstream(#[from] GatewayError),
}

pub type DispatchResult<T> = Result<T, DispatchError>;

// ==========================================
// PushCommand - 派发指令
// ==========================================
#[derive(Debug, Clone)]
pub struct PushCommand {
    pub source_id: String,
    pub lead_block_id: String,
    pub destination: Destination,
    pub mode: PushMode,
    pub campaign_context: CampaignContext,
    pub template_category: String,
    pub template_override: Option<String>,
    pub attempt_info: Option<AttemptInfo>,
    pub campaign_name: Option<String>,
    pub agent: Option<String>,
}

impl PushCommand {
    pub fn new(source_id: &str, lead_block_id: &str, destination: Destination) -> Self {
        Self {
            source_id: source_id.to_string(),
            lead_block_id: lead_block_id.to_string(),
            destination,
            mode: PushMode::Draft,
            campaign_context: CampaignContext::Initial,
            template_category: "general".to_string(),
            template_override: None,
            attempt_info: None,
            campaign_name: None,
            agent: None,
        }
    }

    pub fn with_mode(mut self, mode: PushMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_context(mut self, context: CampaignContext) -> Self {
        self.campaign_context = context;
        self
    }

    pub fn with_attempt_info(mut self, info: AttemptInfo) -> Self {
        self.attempt_info = Some(info);
        self
    }

    pub fn with_template_category(mut self, category: &str) -> Self {
        self.template_category = category.to_string();
        self
    }

    pub fn with_template_override(mut self, text: &str) -> Self {
        self.template_override = Some(text.to_string());
        self
    }

    pub fn with_campaign_name(mut self, name: &str) -> Self {
        self.campaign_name = Some(name.to_string());
        self
    }
}

// ==========================================
// PushResult - 派发结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct PushResult {
    pub destination: Option<Destination>,
    /// 生效模式（已应用 human_in_loop 覆盖）
    pub mode: PushMode,
    pub campaign_name: String,
    pub dispatch_id: String,
    pub template_used: String,
    pub total_enriched: usize,
    pub sms_queued: usize,
    pub dialer_queued: usize,
    pub skipped: usize,
    pub attempts_logged: usize,
    /// 被台账门控拦截的线索及原因
    pub gated: Vec<(String, String)>,
    pub next_steps: Vec<String>,
}

/// 生效模式
pub fn effective_mode(requested: PushMode, context: CampaignContext, human_in_loop: bool) -> PushMode {
    if context == CampaignContext::Retarget && human_in_loop {
        PushMode::Draft
    } else {
        requested
    }
}

/// 渠道准入：sms 需要 mobile 号码，dialer 任意号码
pub fn is_eligible(record: &EnrichedRecord, channel: OutreachChannel) -> bool {
    match channel {
        OutreachChannel::Sms => record.has_mobile_phone(),
        OutreachChannel::Dialer => record.has_any_phone(),
        OutreachChannel::Email => false,
    }
}

/// 后续操作提示
pub fn next_steps(sms_queued: usize, dialer_queued: usize, mode: PushMode) -> Vec<String> {
    let mut steps = Vec::new();
    if sms_queued > 0 {
        steps.push(format!("Review {} messages in SMS Queue", sms_queued));
    }
    if dialer_queued > 0 {
        steps.push(format!("{} leads ready for dialer", dialer_queued));
    }
    if mode == PushMode::Draft {
        steps.push("Messages in draft mode - review before sending".to_string());
    }
    steps
}

/// 单渠道转发结果
struct ChannelDispatch {
    channel: OutreachChannel,
    lead_ids: Vec<String>,
    queued: usize,
    error: Option<String>,
}

// ==========================================
// PushDispatcher - 派发器
// ==========================================
pub struct PushDispatcher {
    store: Arc<dyn RecordStore>,
    channels: Arc<dyn ChannelGateway>,
    ledger: Arc<AttemptLedger>,
    selector: TemplateSelector,
    assembler: LeadBlockAssembler,
    config: PipelineConfig,
}

impl PushDispatcher {
    pub fn new(
        store: Arc<dyn RecordStore>,
        channels: Arc<dyn ChannelGateway>,
        ledger: Arc<AttemptLedger>,
        selector: TemplateSelector,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            channels,
            ledger,
            selector,
            assembler: LeadBlockAssembler::new(config.block_max),
            config,
        }
    }

    async fn fetch_records(&self, source_id: &str) -> GatewayResult<Vec<EnrichedRecord>> {
        match tokio::time::timeout(self.config.request_timeout(), self.store.fetch_records(source_id)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.config.request_timeout_ms)),
        }
    }

    /// 转发到单个渠道（超时与失败都折算为 0 入队）
    async fn forward(&self, channel: OutreachChannel, request: Option<ChannelPushRequest>) -> Option<ChannelDispatch> {
        let request = request?;
        let lead_ids: Vec<String> = request.leads.iter().map(|l| l.lead_id.clone()).collect();
        let count = lead_ids.len();

        let result = match tokio::time::timeout(
            self.config.request_timeout(),
            self.channels.forward(channel, request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.config.request_timeout_ms)),
        };

        Some(match result {
            Ok(receipt) => {
                let queued = receipt.queued.unwrap_or(count);
                info!(channel = %channel, queued, "渠道入队成功");
                ChannelDispatch { channel, lead_ids, queued, error: None }
            }
            Err(e) => {
                warn!(channel = %channel, error = %e, "渠道转发失败");
                ChannelDispatch { channel, lead_ids, queued: 0, error: Some(e.to_string()) }
            }
        })
    }

    /// 在阻塞线程池上执行台账读写（rusqlite 为同步 I/O）
    async fn run_ledger<T, F>(&self, task: F) -> RepositoryResult<T>
    where
        F: FnOnce(&AttemptLedger) -> RepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let ledger = Arc::clone(&self.ledger);
        tokio::task::spawn_blocking(move || task(ledger.as_ref()))
            .await
            .map_err(|e| RepositoryError::Other(anyhow::anyhow!("台账任务执行失败: {}", e)))?
    }

    /// 台账门控
    ///
    /// # 返回
    /// - (放行的记录, 被拦截的 (lead_id, 原因))
    async fn gate_leads(
        &self,
        context: CampaignContext,
        records: Vec<EnrichedRecord>,
        now: DateTime<Utc>,
    ) -> (Vec<EnrichedRecord>, Vec<(String, String)>) {
        let mut gated = Vec::new();
        let lead_ids: Vec<String> = records.iter().filter_map(|r| r.lead_id.clone()).collect();

        if context.is_first_contact() {
            let recent = match self
                .run_ledger(move |ledger| ledger.recently_contacted(&lead_ids, now))
                .await
            {
                Ok(recent) => recent,
                Err(e) => {
                    // 台账不可用时不拦截
                    error!(error = %e, "读取重复触达窗口失败");
                    HashSet::new()
                }
            };
            let passed = records
                .into_iter()
                .filter(|r| {
                    let lead_id = r.lead_id.as_deref().unwrap_or_default();
                    if recent.contains(lead_id) {
                        gated.push((lead_id.to_string(), "recently_contacted".to_string()));
                        false
                    } else {
                        true
                    }
                })
                .collect();
            return (passed, gated);
        }

        if context == CampaignContext::Retarget {
            let checks = match self
                .run_ledger(move |ledger| ledger.check_retarget_batch(&lead_ids, now))
                .await
            {
                Ok(checks) => checks,
                Err(e) => {
                    error!(error = %e, "读取触达历史失败");
                    HashMap::new()
                }
            };
            let passed = records
                .into_iter()
                .filter(|r| {
                    let lead_id = r.lead_id.as_deref().unwrap_or_default();
                    match checks.get(lead_id) {
                        Some(Ok(())) => true,
                        Some(Err(reason)) => {
                            gated.push((lead_id.to_string(), reason.as_str().to_string()));
                            false
                        }
                        None => {
                            gated.push((lead_id.to_string(), "ledger_unavailable".to_string()));
                            false
                        }
                    }
                })
                .collect();
            return (passed, gated);
        }

        (records, gated)
    }

    /// 派发一个线索块
    ///
    /// # 参数
    /// - command: 派发指令
    ///
    /// # 返回
    /// - Ok(PushResult): 各渠道入队数与触达日志数
    /// - Err(DispatchError::Validation): leadBlockId 不匹配 / 无已补全线索 / retarget 缺少 attemptInfo
    /// - Err(DispatchError::Upstream): 记录仓库读取失败
    #[instrument(skip(self, command), fields(
        source_id = %command.source_id,
        lead_block_id = %command.lead_block_id,
        context = %command.campaign_context
    ))]
    pub async fn push(&self, command: PushCommand) -> DispatchResult<PushResult> {
        // === 步骤 1: 参数校验 ===
        self.assembler
            .validate_block_id(&command.source_id, &command.lead_block_id)
            .map_err(DispatchError::Validation)?;

        if command.campaign_context == CampaignContext::Retarget && command.attempt_info.is_none() {
            return Err(DispatchError::Validation(
                "retarget 派发必须提供 attemptInfo".to_string(),
            ));
        }

        // === 步骤 2: 重新推导线索块 ===
        let records = self.fetch_records(&command.source_id).await.map_err(|e| {
            error!(error = %e, "记录仓库读取失败");
            e
        })?;
        let block = self
            .assembler
            .assemble(&command.source_id, &command.lead_block_id, records);
        if block.is_empty() {
            return Err(DispatchError::Validation(
                "该来源没有已补全的线索，请先执行 enrich".to_string(),
            ));
        }
        let total_enriched = block.len();

        let mode = effective_mode(command.mode, command.campaign_context, self.config.human_in_loop);
        if mode != command.mode {
            info!("retarget 已启用人工审核，强制 draft 模式");
        }

        let now = Utc::now();
        let dispatch_id = uuid::Uuid::new_v4().to_string();
        let campaign_name = command
            .campaign_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("LUCI-{}-{}", command.source_id, now.timestamp_millis()));

        // === 步骤 3: 台账门控 ===
        let (passed, gated) = self
            .gate_leads(command.campaign_context, block.records, now)
            .await;
        if !gated.is_empty() {
            info!(gated = gated.len(), "部分线索被台账门控拦截");
        }

        // === 步骤 4: 话术（每次派发解析一次） ===
        let template: SelectedTemplate = self.selector.select(
            command.campaign_context,
            command.attempt_info.as_ref(),
            &command.template_category,
            command.template_override.as_deref(),
        );
        debug!(template_id = %template.template_id, "话术已选定");

        // === 步骤 5: 按渠道筛选并组装请求 ===
        let build_request = |channel: OutreachChannel| -> Option<ChannelPushRequest> {
            if !command.destination.includes(channel) {
                return None;
            }
            let leads: Vec<ChannelLead> = passed
                .iter()
                .filter(|r| is_eligible(r, channel))
                .map(ChannelLead::from_record)
                .collect();
            if leads.is_empty() {
                debug!(channel = %channel, "无符合渠道条件的线索");
                return None;
            }
            let (template_message, priority) = match channel {
                OutreachChannel::Sms => (Some(template.body.clone()), None),
                _ => (None, Some("normal".to_string())),
            };
            Some(ChannelPushRequest {
                campaign_name: campaign_name.clone(),
                campaign_context: command.campaign_context,
                mode,
                lead_block_id: command.lead_block_id.clone(),
                leads,
                template_message,
                attempt_info: command.attempt_info.clone(),
                agent: command.agent.clone(),
                priority,
            })
        };
        let sms_request = build_request(OutreachChannel::Sms);
        let dialer_request = build_request(OutreachChannel::Dialer);

        // === 步骤 6: 并发转发 ===
        let (sms, dialer) = futures::join!(
            self.forward(OutreachChannel::Sms, sms_request),
            self.forward(OutreachChannel::Dialer, dialer_request)
        );
        let dispatches: Vec<ChannelDispatch> = sms.into_iter().chain(dialer).collect();

        let queued_of = |channel: OutreachChannel| {
            dispatches
                .iter()
                .find(|d| d.channel == channel)
                .map(|d| d.queued)
                .unwrap_or(0)
        };
        let sms_queued = queued_of(OutreachChannel::Sms);
        let dialer_queued = queued_of(OutreachChannel::Dialer);

        // === 步骤 7: 触达日志 ===
        let attempt_numbers = self.attempt_numbers(&command, &dispatches).await;
        let logs =
            build_attempt_logs(&command, &dispatch_id, &template, &dispatches, &attempt_numbers);
        let attempts_logged = match self.run_ledger(move |ledger| ledger.record(&logs)).await {
            Ok(written) => written,
            Err(e) => {
                error!(dispatch_id = %dispatch_id, error = %e, "触达日志写入失败");
                0
            }
        };

        let queued_leads: HashSet<&str> = dispatches
            .iter()
            .filter(|d| d.error.is_none() && d.queued > 0)
            .flat_map(|d| d.lead_ids.iter().map(String::as_str))
            .collect();
        let skipped = total_enriched.saturating_sub(queued_leads.len());

        info!(
            dispatch_id = %dispatch_id,
            sms_queued,
            dialer_queued,
            skipped,
            attempts_logged,
            "派发完成"
        );

        Ok(PushResult {
            destination: Some(command.destination),
            mode,
            campaign_name,
            dispatch_id,
            template_used: template.template_id,
            total_enriched,
            sms_queued,
            dialer_queued,
            skipped,
            attempts_logged,
            gated,
            next_steps: next_steps(sms_queued, dialer_queued, mode),
        })
    }

    /// 未提供 attemptInfo 时，按台账批量推导各线索的触达序号
    async fn attempt_numbers(
        &self,
        command: &PushCommand,
        dispatches: &[ChannelDispatch],
    ) -> HashMap<String, u32> {
        if command.attempt_info.is_some() {
            return HashMap::new();
        }
        let lead_ids: Vec<String> = dispatches
            .iter()
            .flat_map(|d| d.lead_ids.iter().cloned())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let context = command.campaign_context;
        match self
            .run_ledger(move |ledger| ledger.next_attempt_numbers(&lead_ids, context))
            .await
        {
            Ok(numbers) => numbers,
            Err(e) => {
                warn!(error = %e, "推导触达序号失败，按 1 记录");
                HashMap::new()
            }
        }
    }
}

/// 每条线索每个渠道一行触达日志
///
/// 转发失败或渠道回执入队数为 0 时记为 failed
fn build_attempt_logs(
    command: &PushCommand,
    dispatch_id: &str,
    template: &SelectedTemplate,
    dispatches: &[ChannelDispatch],
    attempt_numbers: &HashMap<String, u32>,
) -> Vec<AttemptLog> {
    let contact_made = command
        .attempt_info
        .as_ref()
        .map(|a| a.contact_made)
        .unwrap_or(false);

    let mut logs = Vec::new();

    for dispatch in dispatches {
        let (status, detail) = match &dispatch.error {
            Some(err) => (AttemptStatus::Failed, Some(err.clone())),
            None if dispatch.queued == 0 => {
                (AttemptStatus::Failed, Some("渠道入队数为 0".to_string()))
            }
            None => (AttemptStatus::Queued, None),
        };
        for lead_id in &dispatch.lead_ids {
            let attempt_number = match &command.attempt_info {
                Some(info) => info.attempt_number,
                None => attempt_numbers.get(lead_id).copied().unwrap_or(1),
            };
            let mut log = AttemptLog::new(
                dispatch_id,
                lead_id,
                command.campaign_context,
                attempt_number,
                dispatch.channel,
                &template.template_id,
                status,
            )
            .with_contact_made(contact_made)
            .with_lead_block(&command.lead_block_id);
            if let Some(detail) = &detail {
                log = log.with_detail(detail.clone());
            }
            logs.push(log);
        }
    }
    logs
}
