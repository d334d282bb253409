// ==========================================
// LUCI 线索编排系统 - 话术选择器
// ==========================================
// 规则（按优先级）:
// 1. 自定义文本非空 -> 原样返回
// 2. 按上下文查内容库:
//    initial / instant / scheduled -> 分类开场白随机一条
//    retarget -> 阶梯第 min(attempt_number - 1, 2) 档
//    ghost / nurture / book_appointment / confirm_appointment / follow_up -> 固定话术
// ==========================================

use crate::domain::attempt::AttemptInfo;
use crate::domain::types::CampaignContext;
use crate::engine::template_library::{ContentLibrary, LibraryKey};
use rand::Rng;
use std::sync::Arc;

/// 选中的话术（template_id 写入触达日志）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedTemplate {
    pub template_id: String,
    pub body: String,
}

impl SelectedTemplate {
    fn new(template_id: impl Into<String>, body: &str) -> Self {
        Self {
            template_id: template_id.into(),
            body: body.to_string(),
        }
    }
}

/// 阶梯档位：缺失 attempt_number 视为 1
pub fn ladder_index(attempt_info: Option<&AttemptInfo>) -> usize {
    let attempt = attempt_info.map(|a| a.attempt_number).unwrap_or(1).max(1);
    ((attempt - 1) as usize).min(2)
}

#[derive(Debug, Clone)]
pub struct TemplateSelector {
    library: Arc<ContentLibrary>,
}

impl Default for TemplateSelector {
    fn default() -> Self {
        Self::new(Arc::new(ContentLibrary::default()))
    }
}

impl TemplateSelector {
    pub fn new(library: Arc<ContentLibrary>) -> Self {
        Self { library }
    }

    /// 选择话术正文
    pub fn select_template(
        &self,
        context: CampaignContext,
        attempt_info: Option<&AttemptInfo>,
        category: &str,
        custom_text: Option<&str>,
    ) -> String {
        self.select(context, attempt_info, category, custom_text).body
    }

    /// 选择话术（线程随机源）
    pub fn select(
        &self,
        context: CampaignContext,
        attempt_info: Option<&AttemptInfo>,
        category: &str,
        custom_text: Option<&str>,
    ) -> SelectedTemplate {
        let mut rng = rand::thread_rng();
        self.select_with_rng(context, attempt_info, category, custom_text, &mut rng)
    }

    /// 选择话术（注入随机源，便于测试）
    pub fn select_with_rng<R: Rng + ?Sized>(
        &self,
        context: CampaignContext,
        attempt_info: Option<&AttemptInfo>,
        category: &str,
        custom_text: Option<&str>,
        rng: &mut R,
    ) -> SelectedTemplate {
        if let Some(custom) = custom_text.filter(|c| !c.is_empty()) {
            return SelectedTemplate::new("custom", custom);
        }

        let lib = &self.library;
        match context {
            CampaignContext::Initial | CampaignContext::Instant | CampaignContext::Scheduled => {
                let key = LibraryKey::from_category(category);
                let openers = lib.openers(key);
                if openers.is_empty() {
                    return SelectedTemplate::new("initial_generic", &lib.generic_initial);
                }
                let idx = rng.gen_range(0..openers.len());
                SelectedTemplate::new(format!("opener_{}_{}", key.as_str(), idx + 1), &openers[idx])
            }
            CampaignContext::Retarget => {
                let idx = ladder_index(attempt_info);
                match lib.retarget_ladder.get(idx) {
                    Some(body) => SelectedTemplate::new(format!("retarget_{}", idx + 1), body),
                    None => SelectedTemplate::new("follow_up_generic", &lib.generic_follow_up),
                }
            }
            CampaignContext::Ghost => SelectedTemplate::new("ghost", &lib.ghost),
            CampaignContext::Nurture => SelectedTemplate::new("nurture", &lib.nurture),
            CampaignContext::BookAppointment => SelectedTemplate::new("schedule_call", &lib.schedule_call),
            CampaignContext::ConfirmAppointment => {
                SelectedTemplate::new("appointment_confirm", &lib.appointment_confirm)
            }
            CampaignContext::FollowUp => SelectedTemplate::new("follow_up", &lib.follow_up),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn attempt(n: u32) -> AttemptInfo {
        AttemptInfo {
            attempt_number: n,
            ..Default::default()
        }
    }

    #[test]
    fn test_custom_text_always_wins() {
        let selector = TemplateSelector::default();
        for ctx in CampaignContext::ALL {
            let body = selector.select_template(ctx, Some(&attempt(3)), "property", Some("Custom body"));
            assert_eq!(body, "Custom body");
        }
    }

    #[test]
    fn test_empty_custom_text_is_ignored() {
        let selector = TemplateSelector::default();
        let body = selector.select_template(CampaignContext::Ghost, None, "general", Some(""));
        assert_eq!(body, ContentLibrary::default().ghost);
    }

    #[test]
    fn test_retarget_ladder_rungs() {
        let selector = TemplateSelector::default();
        let lib = ContentLibrary::default();

        let rung = |n: Option<u32>| {
            let info = n.map(attempt);
            selector.select_template(CampaignContext::Retarget, info.as_ref(), "general", None)
        };
        assert_eq!(rung(None), lib.retarget_ladder[0]);
        assert_eq!(rung(Some(0)), lib.retarget_ladder[0]);
        assert_eq!(rung(Some(1)), lib.retarget_ladder[0]);
        assert_eq!(rung(Some(2)), lib.retarget_ladder[1]);
        assert_eq!(rung(Some(3)), lib.retarget_ladder[2]);
        assert_eq!(rung(Some(9)), lib.retarget_ladder[2]);
    }

    #[test]
    fn test_missing_rung_falls_back() {
        let lib = ContentLibrary {
            retarget_ladder: vec!["only one".to_string()],
            ..Default::default()
        };
        let selector = TemplateSelector::new(Arc::new(lib.clone()));
        let selected = selector.select(CampaignContext::Retarget, Some(&attempt(2)), "general", None);
        assert_eq!(selected.template_id, "follow_up_generic");
        assert_eq!(selected.body, lib.generic_follow_up);
    }

    #[test]
    fn test_opener_pick_within_category() {
        let selector = TemplateSelector::default();
        let lib = ContentLibrary::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let s = selector.select_with_rng(CampaignContext::Initial, None, "real_estate", None, &mut rng);
            assert!(lib.property_openers.contains(&s.body));
            assert!(s.template_id.starts_with("opener_property_"));
        }
    }

    #[test]
    fn test_empty_openers_fall_back_to_generic() {
        let lib = ContentLibrary {
            general_openers: Vec::new(),
            ..Default::default()
        };
        let selector = TemplateSelector::new(Arc::new(lib.clone()));
        let body = selector.select_template(CampaignContext::Instant, None, "unknown", None);
        assert_eq!(body, lib.generic_initial);
    }

    #[test]
    fn test_fixed_flows() {
        let selector = TemplateSelector::default();
        let lib = ContentLibrary::default();
        let pick = |ctx| selector.select_template(ctx, None, "general", None);
        assert_eq!(pick(CampaignContext::Nurture), lib.nurture);
        assert_eq!(pick(CampaignContext::BookAppointment), lib.schedule_call);
        assert_eq!(pick(CampaignContext::ConfirmAppointment), lib.appointment_confirm);
        assert_eq!(pick(CampaignContext::FollowUp), lib.follow_up);
    }
}
