//! Tone composer: template-driven coach messages for offline mode.

use chrono::Timelike;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::goals::{ChallengeAppetite, EnergyStatus, LootType, ThemePreference};
use crate::state::ConversationSnapshot;

const ACK_DEFAULT: &[&str] = &["좋아요!", "알겠습니다.", "훌륭해요!"];
const ACK_HIGH: &[&str] = &["모험을 떠나볼까요!", "전투 준비 완료!"];
const ACK_LOW: &[&str] = &["천천히 가볼게요.", "안정적으로 이어가요."];
const ACK_RECOVERY: &[&str] = &["잠깐 숨 고를게요.", "회복부터 챙길게요."];

const LOOT_ACHIEVEMENT: &[&str] = &[
    "{loot_term} **{loot}** 획득! 다음 단계가 한층 가까워졌어요.",
    "오늘의 성과 **{loot}** 덕분에 보스전 준비가 {progress}까지 왔습니다.",
    "대단해요! {boss}를 향한 공격이 적중했어요.",
];
const LOOT_INSIGHT: &[&str] = &[
    "방금 깨달은 **{loot}**는 다음 주 전략에 큰 힘이 될 거예요.",
    "좋은 통찰입니다. 내일은 이 배움을 실전에 적용해볼까요?",
    "이런 생각을 남겨주셔서 감사해요. {loot_term} 덱에 저장해 두었습니다.",
];
const LOOT_EMOTION: &[&str] = &[
    "지금 느끼는 감정이 자연스러워요. 오늘은 마음을 다독이는 루틴을 함께 해볼까요?",
    "그 마음을 기억하고 {loot_term} 기록으로 남겨둘게요. 필요하면 잠시 쉬어가도 괜찮아요.",
    "감정을 기록해 주셔서 고마워요. 제가 든든한 지원이 되어드릴게요.",
];

const RECOVERY_MESSAGE: &str = "사소한 휴식이 큰 힘이 됩니다. 10분간 {recovery} 회복 루틴을 해볼까요?";

const DEFAULT_LOOT_TITLE: &str = "오늘의 기록";
const DEFAULT_PROGRESS: &str = "한 단계";

/// Coarse time of day used to pick the greeting header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// 00–11 morning, 12–17 afternoon, 18–23 evening.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            _ => Self::Evening,
        }
    }

    pub fn header(&self) -> &'static str {
        match self {
            Self::Morning => "좋은 아침이에요!",
            Self::Afternoon => "점검해 볼까요?",
            Self::Evening => "오늘도 수고 많았어요.",
        }
    }
}

/// Wording for the game-flavoured concepts, per theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeTerms {
    pub boss: &'static str,
    pub quest: &'static str,
    pub loot: &'static str,
    pub recovery: &'static str,
}

impl ThemeTerms {
    pub fn for_theme(theme: ThemePreference) -> Self {
        match theme {
            ThemePreference::Game => Self {
                boss: "보스전",
                quest: "퀘스트",
                loot: "전리품",
                recovery: "물약",
            },
            ThemePreference::Professional => Self {
                boss: "핵심 마일스톤",
                quest: "실행 계획",
                loot: "성과/인사이트",
                recovery: "재충전",
            },
        }
    }
}

/// Everything that shapes one composed message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToneContext {
    pub challenge_appetite: ChallengeAppetite,
    pub energy_status: Option<EnergyStatus>,
    pub loot_type: Option<LootType>,
    pub loot_title: Option<String>,
    pub next_progress: Option<String>,
    pub boss_name: Option<String>,
    pub theme: ThemePreference,
    /// Overrides the wall-clock slot when set.
    pub time_of_day: Option<TimeOfDay>,
}

impl ToneContext {
    /// Context drawn from the live conversation state.
    pub fn from_snapshot(snapshot: &ConversationSnapshot) -> Self {
        Self {
            challenge_appetite: snapshot.preferences.challenge_appetite,
            energy_status: snapshot.last_energy,
            loot_type: snapshot.last_loot,
            loot_title: snapshot.last_mood.clone(),
            next_progress: None,
            boss_name: snapshot.current_boss_title().map(str::to_string),
            theme: snapshot.preferences.theme_preference,
            time_of_day: None,
        }
    }

    fn needs_recovery(&self) -> bool {
        self.energy_status.is_some_and(|e| e.needs_recovery())
    }
}

/// Optional replacement for the template output.
pub type ToneHook = Box<dyn Fn(&ToneContext) -> Option<String> + Send + Sync>;

/// Composes acknowledgement, greeting, loot, recovery and boss sentences.
///
/// Deterministic for a given random source.
pub struct ToneComposer<R> {
    rng: R,
    hook: Option<ToneHook>,
}

impl<R: Rng> ToneComposer<R> {
    pub fn new(rng: R) -> Self {
        Self { rng, hook: None }
    }

    pub fn with_hook(mut self, hook: ToneHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Build a message for `ctx`. `now` only matters when no slot is forced.
    pub fn compose<T: Timelike>(&mut self, ctx: &ToneContext, now: &T) -> String {
        if let Some(text) = self.hook.as_ref().and_then(|hook| hook(ctx)) {
            return text;
        }

        let terms = ThemeTerms::for_theme(ctx.theme);
        let slot = ctx
            .time_of_day
            .unwrap_or_else(|| TimeOfDay::from_hour(now.hour()));

        let mut sections = vec![self.ack(ctx).to_string(), slot.header().to_string()];
        if let Some(loot) = self.loot_sentence(ctx, &terms) {
            sections.push(loot);
        }
        if ctx.needs_recovery() {
            sections.push(RECOVERY_MESSAGE.replace("{recovery}", terms.recovery));
        }
        if let Some(boss) = ctx.boss_name.as_deref().filter(|_| !ctx.needs_recovery()) {
            sections.push(format!(
                "오늘은 {} '{}' 대비로 어떤 {}을 진행해볼까요?",
                terms.boss, boss, terms.quest
            ));
        }

        sections.retain(|s| !s.is_empty());
        sections.join(" ")
    }

    fn pick(&mut self, pool: &'static [&'static str]) -> &'static str {
        pool.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn ack(&mut self, ctx: &ToneContext) -> &'static str {
        let pool = if ctx.needs_recovery() {
            ACK_RECOVERY
        } else {
            match ctx.challenge_appetite {
                ChallengeAppetite::High => ACK_HIGH,
                ChallengeAppetite::Low => ACK_LOW,
                ChallengeAppetite::Medium => ACK_DEFAULT,
            }
        };
        self.pick(pool)
    }

    fn loot_sentence(&mut self, ctx: &ToneContext, terms: &ThemeTerms) -> Option<String> {
        let pool = match ctx.loot_type? {
            LootType::Achievement => LOOT_ACHIEVEMENT,
            LootType::Insight => LOOT_INSIGHT,
            LootType::Emotion => LOOT_EMOTION,
        };
        let template = self.pick(pool);
        Some(
            template
                .replace("{loot_term}", terms.loot)
                .replace("{loot}", ctx.loot_title.as_deref().unwrap_or(DEFAULT_LOOT_TITLE))
                .replace("{progress}", ctx.next_progress.as_deref().unwrap_or(DEFAULT_PROGRESS))
                .replace("{boss}", ctx.boss_name.as_deref().unwrap_or(terms.boss)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use rand::rngs::mock::StepRng;

    fn composer() -> ToneComposer<StepRng> {
        ToneComposer::new(StepRng::new(0, 0))
    }

    fn at(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
    }

    #[test]
    fn time_slots() {
        assert_eq!(TimeOfDay::from_hour(0), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(11), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(17), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(18), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(23), TimeOfDay::Evening);
    }

    #[test]
    fn morning_achievement_with_boss() {
        let ctx = ToneContext {
            loot_type: Some(LootType::Achievement),
            loot_title: Some("체중 기록".into()),
            boss_name: Some("사업자등록 완료".into()),
            time_of_day: Some(TimeOfDay::Morning),
            ..Default::default()
        };
        let message = composer().compose(&ctx, &at(20));
        assert_eq!(
            message,
            "좋아요! 좋은 아침이에요! 전리품 **체중 기록** 획득! 다음 단계가 한층 가까워졌어요. \
             오늘은 보스전 '사업자등록 완료' 대비로 어떤 퀘스트을 진행해볼까요?"
        );
    }

    #[test]
    fn recovery_overrides_ack_and_skips_boss() {
        let ctx = ToneContext {
            challenge_appetite: ChallengeAppetite::Low,
            energy_status: Some(EnergyStatus::NeedsPotion),
            boss_name: Some("하프 마라톤".into()),
            theme: ThemePreference::Professional,
            ..Default::default()
        };
        let message = composer().compose(&ctx, &at(20));
        assert!(message.starts_with("잠깐 숨 고를게요. 오늘도 수고 많았어요."));
        assert!(message.contains("회복 루틴"));
        assert!(!message.contains("하프 마라톤"));
    }

    #[test]
    fn appetite_selects_ack_pool() {
        let high = ToneContext {
            challenge_appetite: ChallengeAppetite::High,
            ..Default::default()
        };
        assert_eq!(composer().compose(&high, &at(13)), "모험을 떠나볼까요! 점검해 볼까요?");
    }

    #[test]
    fn professional_terms_in_boss_prompt() {
        let ctx = ToneContext {
            boss_name: Some("MVP 출시".into()),
            theme: ThemePreference::Professional,
            ..Default::default()
        };
        let message = composer().compose(&ctx, &at(9));
        assert!(message.ends_with("오늘은 핵심 마일스톤 'MVP 출시' 대비로 어떤 실행 계획을 진행해볼까요?"));
    }

    #[test]
    fn professional_terms_in_loot_and_recovery() {
        let ctx = ToneContext {
            loot_type: Some(LootType::Achievement),
            loot_title: Some("분기 보고서".into()),
            energy_status: Some(EnergyStatus::NeedsPotion),
            theme: ThemePreference::Professional,
            ..Default::default()
        };
        let message = composer().compose(&ctx, &at(9));
        assert!(message.contains("성과/인사이트 **분기 보고서** 획득!"));
        assert!(message.contains("10분간 재충전 회복 루틴"));
        assert!(!message.contains("전리품"));

        let game = ToneContext {
            theme: ThemePreference::Game,
            ..ctx
        };
        let message = composer().compose(&game, &at(9));
        assert!(message.contains("전리품 **분기 보고서** 획득!"));
        assert!(message.contains("10분간 물약 회복 루틴"));
    }

    #[test]
    fn loot_defaults_fill_placeholders() {
        let ctx = ToneContext {
            loot_type: Some(LootType::Insight),
            ..Default::default()
        };
        let message = composer().compose(&ctx, &at(9));
        assert!(message.contains("**오늘의 기록**"));
    }

    #[test]
    fn hook_replaces_template_output() {
        let mut composer = composer().with_hook(Box::new(|_| {
            Some("LLM 응답: 오늘은 어떤 전리품을 남겨볼까요?".to_string())
        }));
        let message = composer.compose(&ToneContext::default(), &at(9));
        assert_eq!(message, "LLM 응답: 오늘은 어떤 전리품을 남겨볼까요?");
    }

    #[test]
    fn hook_returning_none_falls_through() {
        let mut composer = composer().with_hook(Box::new(|_| None));
        let message = composer.compose(&ToneContext::default(), &at(9));
        assert_eq!(message, "좋아요! 좋은 아침이에요!");
    }
}
