use std::io::Write;

use anyhow::Result;
use colored::Colorize;
use ruinseeker_game::{
    ExplorationPreview, ExplorationResult, GameCatalog, PlayerProgress, ProgressUpdate, Selection,
};
use serde::Serialize;

use crate::simulation::SimulationSummary;
use crate::util::percent;

#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    pub source: String,
    pub fingerprint: String,
    pub items: usize,
    pub combinations: usize,
    pub sites: usize,
    pub routes: usize,
    pub ruins: usize,
    pub levels: usize,
    pub issues: Vec<String>,
}

impl ValidationSummary {
    pub fn from_catalog(source: String, catalog: &GameCatalog) -> Self {
        Self {
            source,
            fingerprint: format!("{:016x}", catalog.fingerprint()),
            items: catalog.items().len(),
            combinations: catalog.combinations().len(),
            sites: catalog.sites().len(),
            routes: catalog.routes().len(),
            ruins: catalog.ruins().len(),
            levels: catalog.levels().levels.len(),
            issues: catalog
                .validate()
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteCheck {
    pub route_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExplorationSummary {
    pub seed: u64,
    pub attempt: u64,
    pub selection: Selection,
    pub warnings: Vec<String>,
    pub preview: ExplorationPreview,
    /// Why each enabled route turned the selection down.
    pub rejections: Vec<RouteCheck>,
    pub result: ExplorationResult,
    pub update: Option<ProgressUpdate>,
    pub progress: PlayerProgress,
}

pub fn generate_json_report<W: Write + ?Sized, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    let json_output = serde_json::to_string_pretty(value)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn validation_console<W: Write + ?Sized>(
    out: &mut W,
    summary: &ValidationSummary,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📚 Catalog Validation".bright_cyan().bold())?;
    writeln!(out, "{}", "=====================".cyan())?;
    writeln!(out, "Source: {}", summary.source)?;
    writeln!(out, "Fingerprint: {}", summary.fingerprint)?;
    writeln!(
        out,
        "Items: {}  Combinations: {}  Sites: {}  Routes: {}  Ruins: {}  Levels: {}",
        summary.items,
        summary.combinations,
        summary.sites,
        summary.routes,
        summary.ruins,
        summary.levels
    )?;
    if summary.issues.is_empty() {
        writeln!(out, "{}", "✅ No issues found".green())?;
    } else {
        writeln!(out, "{}", format!("⚠️  {} issue(s)", summary.issues.len()).yellow())?;
        for issue in &summary.issues {
            writeln!(out, "   • {}", issue.yellow())?;
        }
    }
    Ok(())
}

pub fn validation_markdown<W: Write + ?Sized>(
    out: &mut W,
    summary: &ValidationSummary,
) -> Result<()> {
    writeln!(out, "# Ruinseeker Catalog Validation\n")?;
    writeln!(out, "- **Source**: {}", summary.source)?;
    writeln!(out, "- **Fingerprint**: `{}`", summary.fingerprint)?;
    writeln!(out, "\n| table | entries |\n|-------|---------|")?;
    for (table, count) in [
        ("items", summary.items),
        ("combinations", summary.combinations),
        ("sites", summary.sites),
        ("routes", summary.routes),
        ("ruins", summary.ruins),
        ("levels", summary.levels),
    ] {
        writeln!(out, "| {table} | {count} |")?;
    }
    writeln!(out, "\n## Issues\n")?;
    if summary.issues.is_empty() {
        writeln!(out, "_None._")?;
    }
    for issue in &summary.issues {
        writeln!(out, "- {issue}")?;
    }
    Ok(())
}

fn outcome_label(result: &ExplorationResult) -> String {
    match result {
        ExplorationResult::Success { ruin, .. } => {
            let name = if ruin.name.is_empty() { &ruin.id } else { &ruin.name };
            if ruin.hidden {
                format!("found hidden {name}")
            } else {
                format!("found {name}")
            }
        }
        other => other.message().unwrap_or_default().to_string(),
    }
}

pub fn exploration_console<W: Write + ?Sized>(
    out: &mut W,
    summary: &ExplorationSummary,
) -> Result<()> {
    let preview = &summary.preview;
    writeln!(out)?;
    writeln!(out, "{}", "🧭 Exploration".bright_cyan().bold())?;
    writeln!(out, "{}", "==============".cyan())?;
    writeln!(
        out,
        "Seed: {} (attempt {})  Items: {}",
        summary.seed,
        summary.attempt,
        summary.selection.iter().collect::<Vec<_>>().join(", ")
    )?;
    for warning in &summary.warnings {
        writeln!(out, "{}", format!("⚠️  {warning}").yellow())?;
    }
    writeln!(
        out,
        "Weight: {:.1} ({})",
        preview.total_weight, preview.exploration_level
    )?;
    if let Some(route) = summary.result.route() {
        writeln!(
            out,
            "Route: {} [{}] -> {}",
            route.id.bold(),
            route.difficulty,
            route.target_site_id
        )?;
    }
    if !preview.can_explore {
        for check in &summary.rejections {
            writeln!(out, "   • {}: {}", check.route_id, check.reason)?;
        }
    }

    let label = outcome_label(&summary.result);
    let status = if summary.result.is_success() {
        format!("✅ {label}").green()
    } else if matches!(summary.result, ExplorationResult::InternalError { .. }) {
        format!("💥 {label}").red()
    } else {
        format!("❌ {label}").yellow()
    };
    writeln!(out, "{status}")?;

    if let Some(update) = &summary.update {
        let kind = if update.first_time { "first find" } else { "repeat" };
        writeln!(
            out,
            "Experience: +{} ({kind}, full reward {})",
            update.credited, update.full_reward
        )?;
        for level_up in &update.level_ups {
            writeln!(
                out,
                "{}",
                format!("🎉 Level {}: {}", level_up.level, level_up.title)
                    .bright_green()
                    .bold()
            )?;
            if !level_up.new_items.is_empty() {
                writeln!(out, "   New items: {}", level_up.new_items.join(", "))?;
            }
            if !level_up.new_sites.is_empty() {
                writeln!(out, "   New sites: {}", level_up.new_sites.join(", "))?;
            }
        }
    }
    writeln!(
        out,
        "Progress: level {}, {} exp, {} discoveries",
        summary.progress.level,
        summary.progress.experience,
        summary.progress.discovery_count()
    )?;
    Ok(())
}

pub fn exploration_markdown<W: Write + ?Sized>(
    out: &mut W,
    summary: &ExplorationSummary,
) -> Result<()> {
    writeln!(out, "# Ruinseeker Exploration\n")?;
    writeln!(out, "- **Seed**: {} (attempt {})", summary.seed, summary.attempt)?;
    writeln!(
        out,
        "- **Items**: {}",
        summary.selection.iter().collect::<Vec<_>>().join(", ")
    )?;
    writeln!(
        out,
        "- **Weight**: {:.1} ({})",
        summary.preview.total_weight, summary.preview.exploration_level
    )?;
    writeln!(out, "- **Outcome**: `{}`", summary.result.code())?;
    writeln!(out, "- **Detail**: {}", outcome_label(&summary.result))?;
    if let Some(update) = &summary.update {
        writeln!(out, "- **Experience**: +{}", update.credited)?;
    }
    writeln!(
        out,
        "- **Progress**: level {}, {} exp",
        summary.progress.level, summary.progress.experience
    )?;
    Ok(())
}

pub fn simulation_console<W: Write + ?Sized>(
    out: &mut W,
    summary: &SimulationSummary,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Discovery Distribution".bright_cyan().bold())?;
    writeln!(out, "{}", "=========================".cyan())?;
    writeln!(
        out,
        "Seeds: {:?}  Iterations per seed: {}  Catalog: {}",
        summary.seeds, summary.iterations, summary.catalog_fingerprint
    )?;
    for route in &summary.distribution {
        writeln!(out)?;
        writeln!(out, "{} [{}]", route.route_id.bold(), route.difficulty)?;
        writeln!(
            out,
            "   hidden rolls: {:.1}%  empty: {}  faults: {}",
            percent(route.hidden_rolls, route.rolls),
            route.empty_rolls,
            if route.faults == 0 {
                route.faults.to_string().green()
            } else {
                route.faults.to_string().red()
            }
        )?;
        for ruin in &route.ruins {
            let marker = if ruin.hidden { "★" } else { " " };
            writeln!(
                out,
                "   {marker} {:28} w={:<5} {:>6.2}%",
                ruin.ruin_id,
                ruin.weight,
                ruin.share * 100.0
            )?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", "📈 Progression Sweep".bright_yellow().bold())?;
    writeln!(out, "{}", "====================".yellow())?;
    for run in &summary.progression {
        writeln!(
            out,
            "Seed {}: level {} after {} attempts ({} exp, {} discoveries)",
            run.seed, run.final_level, run.attempts, run.final_experience, run.discoveries
        )?;
        let milestones: Vec<String> = run
            .level_reached_at
            .iter()
            .map(|(level, attempt)| format!("L{level}@{attempt}"))
            .collect();
        writeln!(out, "   {}", milestones.join("  "))?;
        writeln!(
            out,
            "   success {}  no route {}  no discovery {}  errors {}",
            run.outcomes.success,
            run.outcomes.no_route,
            run.outcomes.no_discovery,
            run.outcomes.internal_error
        )?;
    }
    Ok(())
}

pub fn simulation_markdown<W: Write + ?Sized>(
    out: &mut W,
    summary: &SimulationSummary,
) -> Result<()> {
    writeln!(out, "# Ruinseeker Simulation\n")?;
    writeln!(
        out,
        "Seeds `{:?}`, {} iterations per seed, catalog `{}`.\n",
        summary.seeds, summary.iterations, summary.catalog_fingerprint
    )?;
    writeln!(out, "## Discovery Distribution\n")?;
    for route in &summary.distribution {
        writeln!(out, "### {} ({})\n", route.route_id, route.difficulty)?;
        writeln!(out, "| ruin | hidden | weight | share |")?;
        writeln!(out, "|------|--------|--------|-------|")?;
        for ruin in &route.ruins {
            writeln!(
                out,
                "| {} | {} | {} | {:.2}% |",
                ruin.ruin_id,
                if ruin.hidden { "yes" } else { "no" },
                ruin.weight,
                ruin.share * 100.0
            )?;
        }
        writeln!(out)?;
    }
    writeln!(out, "## Progression\n")?;
    writeln!(out, "| seed | attempts | level | exp | discoveries |")?;
    writeln!(out, "|------|----------|-------|-----|-------------|")?;
    for run in &summary.progression {
        writeln!(
            out,
            "| {} | {} | {} | {} | {} |",
            run.seed, run.attempts, run.final_level, run.final_experience, run.discoveries
        )?;
    }
    Ok(())
}
