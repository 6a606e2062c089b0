//! Markdown rendering of a `ReportSummary`.

use crate::goals::{EnergyStatus, LootType};
use crate::report::ReportSummary;

pub const NO_QUOTES: &str = "이번 기간에는 전리품 기록이 아직 없어요.";
pub const NO_USAGE: &str = "최근 기간 동안 LLM 사용 기록이 없습니다.";
const NONE_LABEL: &str = "없음";

fn table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut lines = vec![
        format!("| {} |", header.join(" | ")),
        format!("| {} |", vec!["---"; header.len()].join(" | ")),
    ];
    for row in rows {
        lines.push(format!("| {} |", row.join(" | ")));
    }
    lines.join("\n")
}

fn names(titles: &[String]) -> String {
    if titles.is_empty() {
        NONE_LABEL.to_string()
    } else {
        titles.join(", ")
    }
}

/// Deterministic file name: `{user_label}-{period}-{end_date}.md`.
pub fn file_name(summary: &ReportSummary) -> String {
    format!(
        "{}-{}-{}.md",
        summary.user_label,
        summary.period,
        summary.end.date_naive()
    )
}

pub fn render_report(summary: &ReportSummary) -> String {
    let loot_rows: Vec<Vec<String>> = LootType::ALL
        .iter()
        .map(|loot| {
            vec![
                loot.as_str().to_string(),
                summary.loot_count(loot.as_str()).to_string(),
                summary.loot_sample(loot.as_str()).unwrap_or("-").to_string(),
            ]
        })
        .collect();
    let energy_rows: Vec<Vec<String>> = EnergyStatus::ALL
        .iter()
        .map(|e| {
            vec![
                e.as_str().to_string(),
                summary.energy_count(e.as_str()).to_string(),
            ]
        })
        .collect();

    let quote_block: String = if summary.recent_quotes.is_empty() {
        format!("\n> {NO_QUOTES}")
    } else {
        summary
            .recent_quotes
            .iter()
            .map(|q| format!("\n> {q}"))
            .collect()
    };

    let usage_text = match &summary.usage {
        Some(usage) => format!(
            "모델 호출 {}회, 프롬프트 {} tokens, 응답 {} tokens",
            usage.total_requests, usage.prompt_tokens, usage.completion_tokens
        ),
        None => NO_USAGE.to_string(),
    };

    let lines = [
        format!(
            "# {} Loot Chronicle — {}",
            summary.period.title(),
            summary.user_label
        ),
        format!("생성 시각: {}", summary.generated_at.to_rfc3339()),
        String::new(),
        "## 1. 모험 요약".to_string(),
        format!(
            "- 기간: {} ~ {}",
            summary.start.date_naive(),
            summary.end.date_naive()
        ),
        format!("- 전리품 기록 횟수: {}", summary.total_loot()),
        format!(
            "- 에너지 경고 감지: NEEDS_POTION {}회",
            summary.energy_count(EnergyStatus::NeedsPotion.as_str())
        ),
        String::new(),
        "## 2. 전리품 요약".to_string(),
        table(&["유형", "획득 횟수", "대표 문장"], &loot_rows),
        String::new(),
        "### 대표 전리품".to_string(),
        quote_block,
        String::new(),
        "## 3. 보스전 진행도".to_string(),
        format!("- 완료: {}", names(&summary.boss_completed)),
        format!("- 진행 중: {}", names(&summary.boss_in_progress)),
        format!("- 다음 준비: {}", names(&summary.boss_next)),
        String::new(),
        "## 4. 에너지 & 회복 상태".to_string(),
        table(&["경고 레벨", "발생 횟수"], &energy_rows),
        String::new(),
        "## 5. LLM 사용량".to_string(),
        usage_text,
    ];
    lines.join("\n")
}
