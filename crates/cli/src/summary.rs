use amplify_metrics::Report;

const RULE_WIDTH: usize = 50;

/// Human-readable digest printed after each run.
pub fn render_summary(report: &Report) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    out.push('\n');
    out.push_str(&format!("{rule}\n"));
    out.push_str(&format!("  Signed Partners:   {}\n", report.signed_count));
    for (label, value) in [
        ("Total Signed", report.total_signed),
        ("Total Pipeline", report.total_pipeline),
        ("Paid", report.paid),
        ("Outstanding", report.outstanding),
        ("Waiting Billing", report.waiting_billing),
        ("Needs Invoice", report.needs_invoice),
        ("In Discussion", report.in_discussion),
    ] {
        out.push_str(&format!("  {:<18} {:>11}\n", format!("{label}:"), money(value)));
    }

    out.push_str("\n  By Stage:\n");
    for (stage, value) in &report.by_stage {
        let count = report.count_by_stage.get(stage).copied().unwrap_or(0);
        out.push_str(&format!(
            "    {stage:<25} {:>9}  ({count} partners)\n",
            money(*value)
        ));
    }

    out.push_str(&format!("\n  Features: {}\n", tallies(&report.features)));
    out.push_str(&format!("  Quarters: {}\n", tallies(&report.quarters)));
    out.push_str(&format!(
        "  Signed over time: {} months\n",
        report.signed_over_time.len()
    ));
    out.push_str(&format!("  New this week: {}\n", report.new_this_week.len()));
    out.push_str(&format!(
        "  Partners array: {} records\n",
        report.partners.len()
    ));
    out.push_str(&rule);
    out.push('\n');
    out
}

/// `$12,345` style, negative amounts keep their sign.
pub fn money(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

fn tallies(map: &std::collections::BTreeMap<String, usize>) -> String {
    if map.is_empty() {
        return "none".to_string();
    }
    map.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}
