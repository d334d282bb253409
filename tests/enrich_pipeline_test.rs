// ==========================================
// 补全管线集成测试
// ==========================================
// 测试范围:
// 1. 批次切片与 block 上限
// 2. 进度单调 / 终止态幂等
// 3. 单条失败只计数，仓库读取失败整体失败
// 4. 异步批量任务 pending 与 webhook 回填
// ==========================================

mod helpers;

use helpers::api_test_helper::*;
use helpers::mock_services::*;
use helpers::test_data_builder::*;
use luci_orchestrator::api::{ApiError, BulkWebhookPayload, EnrichRequest};
use luci_orchestrator::domain::types::EnrichmentStatus;
use serde_json::json;
use std::sync::atomic::Ordering;

const SOURCE: &str = "us-construction-plumbers";

fn enrich_request(batch_number: i64) -> EnrichRequest {
    EnrichRequest {
        source_id: Some(SOURCE.to_string()),
        batch_number: Some(batch_number),
        enrichment_types: Some(vec!["skip_trace".to_string()]),
        ..Default::default()
    }
}

// ==========================================
// 批次切片
// ==========================================

#[tokio::test]
async fn test_batches_stop_at_block_max() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.store.seed(SOURCE, traceable_records(20));
    let api = &env.state.orchestrate_api;

    let mut total = 0;
    let mut last_percent = 0;
    let mut batch_number = 0;
    loop {
        let resp = api.enrich(enrich_request(batch_number)).await.expect("enrich 失败");
        assert_eq!(resp.batch.enriched + resp.batch.failed, resp.batch.size);
        assert!(resp.progress.percent_complete >= last_percent, "进度不能回退");
        last_percent = resp.progress.percent_complete;
        total += resp.batch.size;

        if resp.complete {
            assert_eq!(resp.progress.percent_complete, 100);
            assert!(resp.lead_block_id.is_some());
            assert_eq!(resp.next_batch, None);
            break;
        }
        assert!(resp.progress.percent_complete < 100);
        batch_number = resp.next_batch.expect("未完成时必须有 nextBatch") as i64;
    }

    // 20 条记录，block 上限 8：3 + 3 + 2
    assert_eq!(total, 8);
    assert_eq!(batch_number, 2);
    assert_eq!(env.bulk.submitted_count(), 8);

    // 越界后直接返回终止态，不再调用供应商
    let after = api.enrich(enrich_request(3)).await.unwrap();
    assert!(after.complete);
    assert_eq!(after.batch.size, 0);
    assert_eq!(after.progress.records_processed, 8);
    assert_eq!(after.progress.percent_complete, 100);
    let block_id = after.lead_block_id.unwrap();
    assert!(block_id.starts_with(&format!("lb_{}_", SOURCE)));
    assert_eq!(env.bulk.submitted_count(), 8);
}

#[tokio::test]
async fn test_same_batch_twice_is_idempotent() {
    let env = ApiTestEnv::new().unwrap();
    env.store.seed(SOURCE, traceable_records(10));
    let api = &env.state.orchestrate_api;

    let first = api.enrich(enrich_request(1)).await.unwrap();
    let second = api.enrich(enrich_request(1)).await.unwrap();

    assert_eq!(first.batch.size, second.batch.size);
    assert_eq!(first.next_batch, second.next_batch);
    assert_eq!(first.progress, second.progress);
    // 第二次调用时记录已锁定，仍计为 enriched
    assert_eq!(second.batch.enriched, second.batch.size);
    assert_eq!(second.enriched_leads.len(), 3);
    assert_eq!(env.bulk.submitted_count(), 3);
}

#[tokio::test]
async fn test_enrich_writes_back_and_returns_leads() {
    let env = ApiTestEnv::new().unwrap();
    env.store.seed(SOURCE, traceable_records(3));

    let resp = env.state.orchestrate_api.enrich(enrich_request(0)).await.unwrap();
    assert!(resp.complete);
    assert_eq!(resp.batch.enriched, 3);
    assert_eq!(resp.enriched_leads.len(), 3);

    let stored = env.store.record(SOURCE, "r001").unwrap();
    assert_eq!(stored.status, EnrichmentStatus::Enriched);
    assert_eq!(stored.lead_id.as_deref(), Some("lead_r001"));
    assert_eq!(stored.mobile_phone.as_deref(), Some("+1555r001"));
    assert_eq!(env.store.save_calls.load(Ordering::SeqCst), 3);
}

// ==========================================
// 失败策略
// ==========================================

#[tokio::test]
async fn test_record_failures_are_counted_not_fatal() {
    let env = ApiTestEnv::with_bulk(MockBulkEnricher::new(BulkMode::Sync).with_misses(&["r001"]))
        .unwrap();
    let mut records = traceable_records(2);
    // 无地址、无 email 的记录：没有可用供应商
    records.push(RecordBuilder::new("r_bare").build());
    env.store.seed(SOURCE, records);

    let resp = env.state.orchestrate_api.enrich(enrich_request(0)).await.unwrap();
    assert_eq!(resp.batch.size, 3);
    assert_eq!(resp.batch.enriched, 1);
    assert_eq!(resp.batch.failed, 2);

    let missed = env.store.record(SOURCE, "r001").unwrap();
    assert_eq!(missed.status, EnrichmentStatus::Failed);
    assert!(missed.lead_id.is_none());
}

#[tokio::test]
async fn test_whole_bulk_failure_counts_batch_failed() {
    let env = ApiTestEnv::with_bulk(MockBulkEnricher::new(BulkMode::Failing)).unwrap();
    env.store.seed(SOURCE, traceable_records(3));

    let resp = env.state.orchestrate_api.enrich(enrich_request(0)).await.unwrap();
    assert_eq!(resp.batch.enriched, 0);
    assert_eq!(resp.batch.failed, 3);
    assert!(resp.enriched_leads.is_empty());
}

#[tokio::test]
async fn test_failed_write_back_converts_to_failed() {
    let env = ApiTestEnv::new().unwrap();
    env.store.seed(SOURCE, traceable_records(3));
    env.store.fail_save_for("r002");

    let resp = env.state.orchestrate_api.enrich(enrich_request(0)).await.unwrap();
    assert_eq!(resp.batch.enriched, 2);
    assert_eq!(resp.batch.failed, 1);
    assert!(resp.enriched_leads.iter().all(|r| r.raw.id != "r002"));
}

#[tokio::test]
async fn test_fetch_failure_is_upstream_error() {
    let env = ApiTestEnv::new().unwrap();
    env.store.set_fail_fetch(true);

    let err = env
        .state
        .orchestrate_api
        .enrich(enrich_request(0))
        .await
        .expect_err("仓库读取失败必须返回错误");
    assert!(matches!(err, ApiError::UpstreamFetchError(_)));
    assert_eq!(err.status_code(), 500);
}

#[tokio::test]
async fn test_single_enrich_only_when_requested() {
    let env = ApiTestEnv::new().unwrap();
    env.store.seed(
        SOURCE,
        vec![RecordBuilder::new("e1").email("owner@acme.test").build()],
    );

    let mut req = enrich_request(0);
    req.enrichment_types = Some(vec!["skip_trace".to_string(), "apollo".to_string()]);
    let resp = env.state.orchestrate_api.enrich(req).await.unwrap();

    assert_eq!(resp.batch.enriched, 1);
    assert_eq!(*env.single.calls.lock().unwrap(), vec!["e1".to_string()]);
    assert_eq!(env.bulk.submitted_count(), 0);
}

// ==========================================
// 过滤条件
// ==========================================

#[tokio::test]
async fn test_filters_narrow_candidate_set() {
    let env = ApiTestEnv::new().unwrap();
    let mut records = traceable_records(4);
    records.push(
        RecordBuilder::new("ny1")
            .address("1 Broadway", "New York", "NY")
            .sic("5812")
            .build(),
    );
    env.store.seed(SOURCE, records);

    let body = json!({
        "action": "enrich",
        "bucketId": SOURCE,
        "filters": { "states": ["ny"], "sicCodes": ["58"] }
    });
    let resp = env.state.orchestrate_api.orchestrate(body).await.unwrap();
    assert_eq!(resp["batch"]["size"], 1);
    assert_eq!(resp["progress"]["totalRecords"], 1);
    assert_eq!(resp["complete"], true);
}

// ==========================================
// 异步批量任务
// ==========================================

#[tokio::test]
async fn test_async_bulk_marks_pending_until_webhook() {
    let env = ApiTestEnv::with_bulk(MockBulkEnricher::new(BulkMode::Async)).unwrap();
    env.store.seed(SOURCE, traceable_records(3));
    let api = &env.state.orchestrate_api;

    let resp = api.enrich(enrich_request(0)).await.unwrap();
    assert_eq!(resp.batch.enriched, 3);
    assert_eq!(resp.batch.pending, 3);
    assert!(resp.enriched_leads.is_empty(), "pending 记录不能作为已补全线索返回");

    let pending = env.store.record(SOURCE, "r000").unwrap();
    assert_eq!(pending.status, EnrichmentStatus::Pending);
    assert_eq!(pending.pending_job_id.as_deref(), Some(ASYNC_JOB_ID));

    let payload: BulkWebhookPayload = serde_json::from_value(json!({
        "sourceId": SOURCE,
        "jobId": ASYNC_JOB_ID,
        "results": [
            { "id": "r000", "success": true, "leadId": "lead_a",
              "phones": [{ "number": "+15125550000", "type": "cell" }] },
            { "id": "r001", "success": false, "error": "no match" },
            { "id": "unknown", "success": true }
        ]
    }))
    .unwrap();
    let resolved = api.resolve_bulk_job(payload).await.unwrap();
    assert_eq!(resolved.resolution.resolved, 1);
    assert_eq!(resolved.resolution.failed, 1);
    assert_eq!(resolved.resolution.ignored, 1);
    assert_eq!(resolved.saved, 2);

    let done = env.store.record(SOURCE, "r000").unwrap();
    assert_eq!(done.status, EnrichmentStatus::Enriched);
    assert_eq!(done.lead_id.as_deref(), Some("lead_a"));
    assert!(done.has_mobile_phone());
    assert!(done.pending_job_id.is_none());

    assert_eq!(env.store.record(SOURCE, "r001").unwrap().status, EnrichmentStatus::Failed);
    assert_eq!(env.store.record(SOURCE, "r002").unwrap().status, EnrichmentStatus::Pending);
}
