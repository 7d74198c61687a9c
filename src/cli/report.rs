use std::fmt::Write;

use ansi_term::Colour;

use crate::analysis::{switches::LoopVerdict, AnalysisReport};
use crate::config::DEEP_WORK_WEIGHT;
use crate::utils::time::format_duration;

/// Renders the human readable report. Pure string building, printing is the
/// caller's problem.
pub fn render_text(report: &AnalysisReport) -> String {
    let mut out = String::new();
    // Infallible for String targets, so the results below are ignored.
    let _ = write_report(&mut out, report);
    out
}

fn write_report(out: &mut String, report: &AnalysisReport) -> std::fmt::Result {
    writeln!(out, "{}", Colour::White.bold().paint("Weekly Focus Report"))?;
    match &report.period.date_range {
        Some(range) => writeln!(
            out,
            "{range}, {} days tracked, {} rows ({} skipped)",
            report.period.days_tracked, report.period.total_rows, report.period.skipped_rows
        )?,
        None => writeln!(out, "No tracked days in the selected range")?,
    }
    writeln!(
        out,
        "{} active, {} per day",
        hours(report.time_totals.total_active_hours),
        hours(report.time_totals.average_hours_per_day)
    )?;
    writeln!(out)?;

    writeln!(out, "{}", Colour::White.bold().paint("Scores"))?;
    let scores = &report.scores.scores;
    writeln!(
        out,
        "Combined\t{}/100\t{}",
        scores.combined_score, report.scores.interpretation
    )?;
    writeln!(
        out,
        "Productivity\t{:.0}/100\twhat the time went into",
        scores.productivity_score
    )?;
    writeln!(
        out,
        "Focus\t\t{:.0}/100\thow well attention held up",
        scores.focus_score
    )?;
    writeln!(out)?;

    if !report.category_breakdown.is_empty() {
        writeln!(out, "{}", Colour::White.bold().paint("Time by category"))?;
        for category in report.category_breakdown.iter().take(10) {
            writeln!(
                out,
                "{}%\t{}\t{}\t{}",
                category.percentage,
                hours(category.hours),
                weight_marker(category.weight),
                category.category
            )?;
        }
        writeln!(out)?;
    }

    if !report.browser_breakdown.is_empty() {
        writeln!(out, "{}", Colour::White.bold().paint("Browser activity"))?;
        for entry in report.browser_breakdown.iter().take(15) {
            writeln!(out, "{}\t{}\t{}", hours(entry.hours), entry.category, entry.title)?;
        }
        writeln!(out)?;
    }

    if !report.death_loops.is_empty() {
        writeln!(out, "{}", Colour::White.bold().paint("Switching patterns"))?;
        for death_loop in report.death_loops.iter().take(5) {
            writeln!(
                out,
                "{} \u{2194} {}\t{}x\t{}\t{}\t{}",
                death_loop.apps.0,
                death_loop.apps.1,
                death_loop.count,
                format_duration(death_loop.total_time),
                verdict_marker(death_loop.verdict),
                death_loop.suggestion
            )?;
        }
        writeln!(out)?;
    }

    if !report.ai_sessions.is_empty() {
        writeln!(out, "{}", Colour::White.bold().paint("Agent sessions"))?;
        for usage in &report.ai_sessions {
            writeln!(
                out,
                "{}\t{}\t{} switches",
                usage.agent,
                hours(usage.hours),
                usage.switches
            )?;
        }
        writeln!(out)?;
    }

    if !report.hourly_breakdown.is_empty() {
        writeln!(out, "{}", Colour::White.bold().paint("By hour"))?;
        for hour in &report.hourly_breakdown {
            writeln!(
                out,
                "{:02}:00\t{}\t{}% productive\t{} switches",
                hour.hour,
                hours(hour.total_hours),
                hour.productive_pct,
                hour.switches
            )?;
        }
        writeln!(out)?;
    }

    writeln!(out, "{}", Colour::White.bold().paint("Insights"))?;
    writeln!(out, "{}", report.insights.top_insight)?;
    for recommendation in &report.insights.schedule_recommendations {
        writeln!(out, "- {recommendation}")?;
    }
    for driver in &report.insights.productivity_drivers {
        writeln!(
            out,
            "- {} {} ({})",
            Colour::Green.paint("+"),
            driver.category,
            hours(driver.hours)
        )?;
    }
    for drain in &report.insights.productivity_drains {
        writeln!(
            out,
            "- {} {} ({})",
            Colour::Red.paint("-"),
            drain.category,
            hours(drain.hours)
        )?;
    }
    writeln!(out)?;
    writeln!(out, "{}", Colour::White.bold().paint("One change for next week"))?;
    writeln!(out, "{}", report.insights.one_change)?;
    Ok(())
}

fn hours(value: f64) -> String {
    format!("{value}h")
}

fn weight_marker(weight: f64) -> ansi_term::ANSIString<'static> {
    if weight >= DEEP_WORK_WEIGHT {
        Colour::Green.paint("productive")
    } else if weight >= 0.3 {
        Colour::Yellow.paint("mixed")
    } else if weight >= 0. {
        ansi_term::ANSIString::from("neutral")
    } else {
        Colour::Red.paint("distracting")
    }
}

fn verdict_marker(verdict: LoopVerdict) -> ansi_term::ANSIString<'static> {
    match verdict {
        LoopVerdict::AiAssisted => Colour::Cyan.paint("ai_assisted"),
        LoopVerdict::Productive => Colour::Green.paint("productive"),
        LoopVerdict::Mixed => Colour::Yellow.paint("mixed"),
        LoopVerdict::Distracting => Colour::Red.paint("distracting"),
    }
}
