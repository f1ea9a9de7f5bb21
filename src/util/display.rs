/// Display utilities for terminal output

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use colored::{ColoredString, Colorize};

use crate::analytics::service::{EntityOverview, GlobalOverview};
use crate::analytics::{
    AggregateGroup, Analysis, ComparisonRow, Forecast, HistorySummary, HotspotRow, TopEntityRow, Trend,
    VaccinationSummary,
};

const RULE_WIDTH: usize = 70;

/// `1234567` as `1,234,567`.
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn colored_trend(trend: Trend) -> ColoredString {
    match trend {
        Trend::Increasing => "increasing".red().bold(),
        Trend::Decreasing => "decreasing".green(),
        Trend::Stable => "stable".yellow(),
        Trend::Unknown => "unknown".dimmed(),
    }
}

pub fn print_header(title: &str) {
    println!("\n{}", title.bold());
    println!("{}", "=".repeat(RULE_WIDTH));
}

pub fn print_global_overview(overview: &GlobalOverview) {
    let s = &overview.snapshot;
    let r = &overview.rates;
    print_header("🌍 GLOBAL OVERVIEW");

    if let Some(updated) = Utc.timestamp_millis_opt(s.updated).single() {
        println!("   Updated: {}", updated.format("%Y-%m-%d %H:%M UTC"));
    }
    println!("   Cases: {} (+{} today)", format_count(s.cases).bold(), format_count(s.today_cases));
    println!("   Deaths: {} (+{} today)", format_count(s.deaths).red(), format_count(s.today_deaths));
    println!("   Recovered: {}", format_count(s.recovered).green());
    println!("   Active: {} ({}% of cases)", format_count(s.active), r.active_percentage);
    println!("   Per Million: {} cases, {} deaths", r.cases_per_million, r.deaths_per_million);
    println!("   Recovery Rate: {}%  Mortality Rate: {}%", r.recovery_rate, r.mortality_rate);
}

pub fn print_entity_overview(overview: &EntityOverview) {
    let s = &overview.snapshot;
    let r = &overview.analysis.rates;
    print_header(&format!("📍 {}", s.identifier.to_uppercase()));

    println!("   Region: {}", s.region());
    println!("   Cases: {} (+{} today)", format_count(s.cases).bold(), format_count(s.today_cases));
    println!("   Deaths: {}  Critical: {}", format_count(s.deaths).red(), format_count(s.critical));
    println!("   Recovery Rate: {}%  Mortality Rate: {}%", r.recovery_rate, r.mortality_rate);

    match overview.analysis.trend.ready() {
        Some(t) => {
            println!("   Trend: {}  Growth (7d): {}%", colored_trend(t.trend), t.growth_rate);
            println!(
                "   Avg Daily: {} cases, {} deaths  Doubling: {}",
                format_count(t.average_daily_cases),
                format_count(t.average_daily_deaths),
                t.doubling_time
            );
        }
        None => println!("   Trend: {}", "no history".dimmed()),
    }
}

pub fn print_region_breakdown(groups: &BTreeMap<String, AggregateGroup>) {
    print_header("🗺️  BY REGION");
    println!(
        "   {:<16} {:>6} {:>15} {:>12} {:>10} {:>9} {:>9}",
        "Region", "Count", "Cases", "Deaths", "Per Mil", "Recov %", "Mort %"
    );
    for (region, g) in groups {
        println!(
            "   {:<16} {:>6} {:>15} {:>12} {:>10} {:>9} {:>9}",
            region,
            g.entities,
            format_count(g.cases),
            format_count(g.deaths),
            format_count(g.cases_per_million),
            g.recovery_rate.to_string(),
            g.mortality_rate.to_string()
        );
    }
}

pub fn print_top_entities(rows: &[TopEntityRow]) {
    print_header(&format!("🏆 TOP {} BY CASES", rows.len()));
    for (rank, row) in rows.iter().enumerate() {
        println!(
            "   {:>2}. {:<20} {:>15} cases  {:>12} deaths  {:>10} per mil",
            rank + 1,
            row.entity,
            format_count(row.cases),
            format_count(row.deaths),
            row.cases_per_million.to_string()
        );
    }
}

pub fn print_comparison(rows: &[ComparisonRow]) {
    let metric = rows.first().map(|r| r.metric.as_str()).unwrap_or("cases");
    print_header(&format!("⚖️  COMPARISON BY {}", metric));
    for row in rows {
        println!(
            "   {:<20} {:>15}  {:<10} growth {}%",
            row.entity,
            format_count(row.value),
            colored_trend(row.trend),
            row.growth_rate
        );
    }
}

pub fn print_hotspots(rows: &[HotspotRow], threshold: u64) {
    print_header(&format!("🔥 HOTSPOTS (> {} new cases today)", format_count(threshold)));
    if rows.is_empty() {
        println!("   {}", "None above threshold".dimmed());
        return;
    }
    for row in rows {
        println!(
            "   {:<20} {:<16} +{:>10} cases  +{:>7} deaths",
            row.entity.bold(),
            row.region,
            format_count(row.today_cases),
            format_count(row.today_deaths)
        );
    }
}

pub fn print_forecast(entity: &str, forecast: &Forecast) {
    print_header(&format!("🔮 FORECAST: {}", entity));
    if forecast.is_empty() {
        println!("   {}", "Not enough history to project".dimmed());
        return;
    }
    if let Some(current) = &forecast.current {
        println!(
            "   Current: {} total, {} today",
            format_count(current.total_cases),
            format_count(current.daily_cases)
        );
    }
    for p in &forecast.predictions {
        println!(
            "   Day +{:<3} {:>10} new  {:>15} total",
            p.day,
            format_count(p.cases),
            format_count(p.total_cases)
        );
    }
    println!("   Confidence: {}%", forecast.confidence);
}

pub fn print_history_summary(entity: &str, summary: &Analysis<HistorySummary>) {
    let Some(h) = summary.ready() else {
        println!("   {}: {}", entity, "no history".dimmed());
        return;
    };
    println!(
        "   {}: peak {} cases (day {}), peak {} deaths (day {}), correlation {:.2}",
        entity,
        format_count(h.peak_cases.value),
        h.peak_cases.index,
        format_count(h.peak_deaths.value),
        h.peak_deaths.index,
        h.cases_deaths_correlation
    );
}

pub fn print_vaccination(entity: &str, summary: &Analysis<VaccinationSummary>) {
    match summary.ready() {
        Some(v) => println!(
            "   💉 {}: {} doses, {} per day, full coverage in {}",
            entity,
            format_count(v.total_vaccinated),
            format_count(v.average_daily_vaccinations),
            v.days_to_full_coverage
        ),
        None => println!("   💉 {}: {}", entity, "no vaccination data".dimmed()),
    }
}
