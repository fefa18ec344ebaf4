//! 検証済みレポートの表示整形

use focusguard_core::VerifiedReport;
use focusguard_types::FocusMetrics;

const RULE_WIDTH: usize = 60;

/// `FocusMetrics` に含まれるフィールド名
const KNOWN_FIELDS: [&str; 5] = [
    "timestamp",
    "sessions_completed",
    "total_focus_minutes",
    "total_distractions",
    "last_session_distractions",
];

/// 教師向けのテキスト表示を組み立てる。末尾に改行は付けない。
pub fn format_report(report: &VerifiedReport) -> String {
    let metrics = FocusMetrics::from_payload(&report.payload);
    let rule = "=".repeat(RULE_WIDTH);

    let mut lines = vec![
        rule.clone(),
        "VERIFIED STUDENT FOCUS REPORT".to_string(),
        rule.clone(),
        String::new(),
        format!("Report Timestamp:     {}", metrics.timestamp),
        format!("Sessions Completed:   {}", metrics.sessions_completed),
        format!("Total Focus Time:     {} minutes", metrics.total_focus_minutes),
        format!("Total Distractions:   {}", metrics.total_distractions),
        format!("Last Session Distr.:  {}", metrics.last_session_distractions),
        String::new(),
    ];

    if let (Some(rate), Some(quality)) = (metrics.distraction_rate_per_hour(), metrics.focus_quality()) {
        lines.push(format!("Distraction Rate:     {rate:.1} per hour"));
        lines.push(format!("Focus Quality:        {quality}"));
        lines.push(String::new());
    }

    let extra: Vec<_> = report
        .payload
        .iter()
        .filter(|(name, _)| !KNOWN_FIELDS.contains(&name.as_str()))
        .collect();
    if !extra.is_empty() {
        lines.push("Other Metrics:".to_string());
        lines.extend(extra.into_iter().map(|(name, value)| format!("  {name}: {value}")));
        lines.push(String::new());
    }

    lines.push(format!("Signer Fingerprint:   {}", report.signer_fingerprint));
    lines.push(rule.clone());
    lines.push("Decryption successful (addressed to this key)".to_string());
    lines.push("Signature verified (record not altered since signing)".to_string());
    lines.push(rule);
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use focusguard_types::ReportPayload;

    fn report_with(payload: ReportPayload) -> VerifiedReport {
        VerifiedReport {
            payload,
            signer_fingerprint: "ab".repeat(32),
        }
    }

    #[test]
    fn test_format_scenario() {
        let metrics = FocusMetrics {
            timestamp: "2026-10-17 09:00:00".into(),
            sessions_completed: 3,
            total_focus_minutes: 75,
            total_distractions: 5,
            last_session_distractions: 2,
        };
        let text = format_report(&report_with(metrics.into_payload()));

        assert!(text.starts_with(&"=".repeat(60)));
        assert!(text.contains("Report Timestamp:     2026-10-17 09:00:00"));
        assert!(text.contains("Total Focus Time:     75 minutes"));
        assert!(text.contains("Distraction Rate:     4.0 per hour"));
        assert!(text.contains("Focus Quality:        Good"));
        assert!(text.contains(&format!("Signer Fingerprint:   {}", "ab".repeat(32))));
        assert!(!text.contains("Other Metrics"));
    }

    /// 集中時間0のレポートでは注意散漫率と品質を表示しないことを確認
    #[test]
    fn test_format_without_focus_time() {
        let text = format_report(&report_with(ReportPayload::new()));
        assert!(text.contains("Report Timestamp:     N/A"));
        assert!(!text.contains("Distraction Rate"));
        assert!(!text.contains("Focus Quality"));
    }

    #[test]
    fn test_format_lists_extra_metrics() {
        let mut payload = ReportPayload::new();
        payload.insert("total_focus_minutes".into(), 60u64.into());
        payload.insert("total_distractions".into(), 12u64.into());
        payload.insert("streak_days".into(), 4u64.into());
        let text = format_report(&report_with(payload));

        assert!(text.contains("Focus Quality:        Needs Improvement"));
        assert!(text.contains("Other Metrics:\n  streak_days: 4"));
    }

    /// 行単位で組み立てられ、罫線で始まり罫線で終わる（末尾改行なし）ことを確認
    #[test]
    fn test_format_line_layout() {
        let text = format_report(&report_with(ReportPayload::new()));
        let lines: Vec<&str> = text.split('\n').collect();
        let rule = "=".repeat(60);

        assert_eq!(lines[0], rule);
        assert_eq!(lines[1], "VERIFIED STUDENT FOCUS REPORT");
        assert_eq!(lines[3], "");
        assert_eq!(lines.last(), Some(&rule.as_str()));
        assert!(!text.ends_with('\n'));
        // ヘッダ4行・集計5行・空行1行・フィンガープリント1行・フッタ4行
        assert_eq!(lines.len(), 15);
    }
}
