// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use luci_orchestrator::domain::record::{EnrichedRecord, PhoneCandidate, RawRecord};
use luci_orchestrator::domain::types::{EnrichmentStatus, PhoneType};

// ==========================================
// EnrichedRecord 构建器
// ==========================================

pub struct RecordBuilder {
    raw: RawRecord,
    lead_id: Option<String>,
    phones: Vec<PhoneCandidate>,
    status: EnrichmentStatus,
}

impl RecordBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            raw: RawRecord {
                id: id.to_string(),
                ..Default::default()
            },
            lead_id: None,
            phones: Vec::new(),
            status: EnrichmentStatus::Unenriched,
        }
    }

    /// 完整地址（可批量反查）
    pub fn address(mut self, address: &str, city: &str, state: &str) -> Self {
        self.raw.address = Some(address.to_string());
        self.raw.city = Some(city.to_string());
        self.raw.state = Some(state.to_string());
        self
    }

    pub fn contact(mut self, contact_name: &str, company_name: &str) -> Self {
        self.raw.contact_name = Some(contact_name.to_string());
        self.raw.company_name = Some(company_name.to_string());
        self
    }

    pub fn email(mut self, email: &str) -> Self {
        self.raw.email = Some(email.to_string());
        self
    }

    pub fn sic(mut self, code: &str) -> Self {
        self.raw.sic_code = Some(code.to_string());
        self
    }

    pub fn mobile(mut self, number: &str) -> Self {
        self.phones.push(PhoneCandidate {
            number: number.to_string(),
            phone_type: Some(PhoneType::Mobile),
        });
        self
    }

    pub fn landline(mut self, number: &str) -> Self {
        self.phones.push(PhoneCandidate {
            number: number.to_string(),
            phone_type: Some(PhoneType::Landline),
        });
        self
    }

    /// 已补全并分配 lead_id
    pub fn enriched(mut self, lead_id: &str) -> Self {
        self.lead_id = Some(lead_id.to_string());
        self.status = EnrichmentStatus::Enriched;
        self
    }

    pub fn build(self) -> EnrichedRecord {
        let mut record = EnrichedRecord::from_raw(self.raw);
        record.lead_id = self.lead_id;
        record.mobile_phone = self
            .phones
            .iter()
            .find(|p| p.is_mobile())
            .map(|p| p.number.clone());
        record.phones = self.phones;
        record.set_status(self.status);
        record
    }
}

/// n 条可批量反查的原始记录（id: r000, r001 ...）
pub fn traceable_records(n: usize) -> Vec<EnrichedRecord> {
    (0..n)
        .map(|i| {
            RecordBuilder::new(&format!("r{:03}", i))
                .address(&format!("{} Main St", i + 1), "Austin", "TX")
                .contact("Pat Lee", "Lee Plumbing")
                .sic("1711")
                .build()
        })
        .collect()
}

/// n 条已补全、带 mobile 号码的线索（lead id: L000, L001 ...）
pub fn enriched_leads(n: usize) -> Vec<EnrichedRecord> {
    (0..n)
        .map(|i| {
            RecordBuilder::new(&format!("r{:03}", i))
                .contact("Pat Lee", "Lee Plumbing")
                .mobile(&format!("+1512555{:04}", i))
                .enriched(&format!("L{:03}", i))
                .build()
        })
        .collect()
}
