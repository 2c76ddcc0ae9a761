//! Printable prediction summary

use super::PredictionRecord;
use std::fmt::Write;

const RULE_HEAVY: &str = "══════════════════════════════════════════════════════════════════════";
const RULE_LIGHT: &str = "──────────────────────────────────────────────────────────────────────";

/// One block per game plus a footer counting edge alerts
pub fn format_predictions(season: i32, week: u32, records: &[PredictionRecord], alert_points: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", RULE_HEAVY);
    let _ = writeln!(out, "               PREDICTIONS: SEASON {} WEEK {}", season, week);
    let _ = writeln!(out, "{}", RULE_HEAVY);
    let _ = writeln!(out, "Model line:  home spread in sportsbook notation (-3.0 = home favoured by 3)");
    let _ = writeln!(out, "Spread edge: predicted margin - market home margin (> 0 = model likes home more)");

    for r in records {
        let (favourite, points) = r.favourite();
        let _ = writeln!(out, "\n{} @ {}", r.away_team, r.home_team);
        if let Some(kickoff) = r.kickoff {
            let _ = writeln!(out, "Kickoff:          {}", kickoff.format("%a %Y-%m-%d %H:%M UTC"));
        }
        let _ = writeln!(
            out,
            "Projected:        {} {:.1} - {} {:.1} (total {:.1})",
            r.away_team, r.predicted_away_score, r.home_team, r.predicted_home_score, r.predicted_total
        );
        let _ = writeln!(out, "Favourite:        {} by {:.1}", favourite, points);
        let _ = writeln!(out, "Model line:       {} {:+.1}", r.home_team, r.model_home_spread);
        let _ = writeln!(out, "Home win prob:    {:.1}%", r.home_win_prob * 100.0);
        if let (Some(line), Some(edge)) = (r.spread_line, r.edge_spread) {
            let flag = if r.is_alert(alert_points) { "  << EDGE" } else { "" };
            let _ = writeln!(out, "Spread edge:      {:+.1} vs market home margin {:+.1}{}", edge, line, flag);
        }
        if let (Some(line), Some(edge)) = (r.total_line, r.edge_total) {
            let _ = writeln!(out, "Total edge:       {:+.1} vs market {:.1}", edge, line);
        }
        if r.zero_filled > 0 {
            let _ = writeln!(out, "Zero-filled:      {} inputs (lower confidence)", r.zero_filled);
        }
        let _ = writeln!(out, "{}", RULE_LIGHT);
    }

    let alerts = records.iter().filter(|r| r.is_alert(alert_points)).count();
    let _ = writeln!(
        out,
        "Games: {}   Spread edges >= {:.1} pts: {}",
        records.len(),
        alert_points,
        alerts
    );
    let _ = writeln!(out, "{}", RULE_HEAVY);
    out
}
