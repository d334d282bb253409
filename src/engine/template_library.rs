// ==========================================
// LUCI 线索编排系统 - 话术内容库
// ==========================================
// 职责: 静态话术（开场白 / 再触达阶梯 / 固定流程话术）
// 说明: 占位符 {{first_name}} {{company_name}} {{time_1}} {{time_2}} 由渠道侧替换
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// LibraryKey - 开场白分类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryKey {
    Property,
    Business,
    General,
    NyDirect,
}

impl LibraryKey {
    /// 业务分类 -> 内容库分类（多对一，未知分类归入 general）
    pub fn from_category(category: &str) -> Self {
        match category.trim().to_lowercase().as_str() {
            "property" | "real_estate" => LibraryKey::Property,
            "blue_collar" | "business" => LibraryKey::Business,
            "ny_direct" => LibraryKey::NyDirect,
            _ => LibraryKey::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LibraryKey::Property => "property",
            LibraryKey::Business => "business",
            LibraryKey::General => "general",
            LibraryKey::NyDirect => "ny_direct",
        }
    }
}

// ==========================================
// ContentLibrary - 话术库
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentLibrary {
    pub property_openers: Vec<String>,
    pub business_openers: Vec<String>,
    pub general_openers: Vec<String>,
    pub ny_direct_openers: Vec<String>,
    /// 再触达阶梯（day-3 / day-7 / final）
    pub retarget_ladder: Vec<String>,
    pub ghost: String,
    pub nurture: String,
    pub schedule_call: String,
    pub appointment_confirm: String,
    pub follow_up: String,
    /// 阶梯缺档时的兜底
    pub generic_follow_up: String,
    /// 开场白为空时的兜底
    pub generic_initial: String,
}

impl ContentLibrary {
    pub fn openers(&self, key: LibraryKey) -> &[String] {
        match key {
            LibraryKey::Property => &self.property_openers,
            LibraryKey::Business => &self.business_openers,
            LibraryKey::General => &self.general_openers,
            LibraryKey::NyDirect => &self.ny_direct_openers,
        }
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ContentLibrary {
    fn default() -> Self {
        Self {
            property_openers: owned(&[
                "Hi {{first_name}}, quick question about your property. Have you thought about what it would sell for in today's market?",
                "{{first_name}}, we're seeing strong buyer interest near you. Open to a no-pressure number on your place?",
                "Hey {{first_name}}, are you still the owner of the property on file? I may have a buyer.",
            ]),
            business_openers: owned(&[
                "Hi {{first_name}}, I work with owners like you at {{company_name}}. Ever wondered what the business is worth?",
                "{{first_name}}, quick one: would a free valuation of {{company_name}} be useful this quarter?",
                "Hey {{first_name}}, we help trade and service businesses plan their exit. Worth a 10-minute chat?",
            ]),
            general_openers: owned(&[
                "Hi {{first_name}}, this is Gianna. Do you have a minute for a quick question?",
                "Hey {{first_name}}, reaching out with something that might be useful for {{company_name}}. Open to hearing it?",
            ]),
            ny_direct_openers: owned(&[
                "{{first_name}}, straight to the point: I have buyers looking in New York right now. Interested in a number?",
                "Hi {{first_name}}, NY owners are getting strong offers this month. Want to see where {{company_name}} lands?",
            ]),
            retarget_ladder: owned(&[
                "Hey {{first_name}}, just bumping this up. Still curious what it's worth?",
                "{{first_name}}, I'm starting to think you're playing hard to get. Quick yes or no: worth a 15-min call?",
                "{{first_name}}, this is my last message. If you ever want to know what {{company_name}} is worth, you've got my number. Best of luck!",
            ]),
            ghost: "Hi {{first_name}}, we spoke a while back and I never heard how things turned out. Still on your radar?".to_string(),
            nurture: "Totally understand, timing matters. Mind if I check back in a few months? Things change.".to_string(),
            schedule_call: "Does a call right now work? If not, I have {{time_1}} or {{time_2}} tomorrow. Which one suits you?".to_string(),
            appointment_confirm: "Hi {{first_name}}, confirming our call at {{time_1}}. Reply YES to confirm or let me know a better time.".to_string(),
            follow_up: "Hi {{first_name}}, following up on our conversation. Any questions I can answer?".to_string(),
            generic_follow_up: "Hi {{first_name}}, just following up. Let me know if now is a better time.".to_string(),
            generic_initial: "Hi {{first_name}}, this is Gianna. Do you have a moment to chat?".to_string(),
        }
    }
}
