use crate::envelope::{Envelope, EstimateSummary};
use crate::error::EstimateResult;
use crate::excel::{
    inspect_template, write_default_template, ExcelExporter, FillReport, InspectReport,
    TemplatePopulator, TARGET_SHEET,
};
use colored::Colorize;
use std::path::PathBuf;

/// Format a number for display, removing unnecessary decimal places
fn format_number(n: f64) -> String {
    let rounded = (n * 100.0).round() / 100.0;
    format!("{:.2}", rounded)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Execute the fill command
pub fn fill(
    json: PathBuf,
    inbook: PathBuf,
    outbook: Option<PathBuf>,
    verbose: bool,
) -> EstimateResult<()> {
    if verbose {
        println!("{}", "🔥 Estimate Forge - Template Fill".bold().green());
        println!("   Rows:     {}", json.display());
        println!("   Template: {}\n", inbook.display());
    }

    let mut populator = TemplatePopulator::new(json, inbook);
    if let Some(path) = outbook {
        populator = populator.with_output(path);
    }
    let outcome = populator.run()?;

    if verbose {
        print_fill_details(&outcome.report);
    }

    println!(
        "Successfully wrote {} row(s) to '{}' sheet.",
        outcome.report.rows_written, TARGET_SHEET
    );
    println!("Output workbook: {}", outcome.output.display());

    if outcome.report.rows_skipped() > 0 {
        println!(
            "{} {} row(s) skipped",
            "⚠️ ".yellow(),
            outcome.report.rows_skipped()
        );
        for skip in &outcome.report.skipped_rows {
            println!("   row {}: {}", skip.index + 1, skip.reason);
        }
    }
    if !outcome.report.cell_warnings.is_empty() {
        println!(
            "{} {} cell(s) could not be written",
            "⚠️ ".yellow(),
            outcome.report.cell_warnings.len()
        );
    }

    Ok(())
}

fn print_fill_details(report: &FillReport) {
    println!("{}", "📋 Data region".cyan());
    println!("   Header row:       {}", report.header_row);
    println!("   Last filled row:  {}", report.last_filled_row);
    println!("   First new row:    {}", report.start_row);
    println!("   Columns matched:  {}", report.columns.len());
    println!("   Cells written:    {}", report.cells_written);
    if report.cell_fallbacks > 0 {
        println!("   Written as text:  {}", report.cell_fallbacks);
    }
    println!("   Formulas copied:  {}\n", report.formulas_copied);
}

/// Execute the inspect command
pub fn inspect(template: PathBuf, json: bool) -> EstimateResult<()> {
    let report = inspect_template(&template)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_inspect_report(&report);
    Ok(())
}

fn print_inspect_report(report: &InspectReport) {
    println!("{}", "🔍 Estimate Forge - Template Inspection".bold().green());
    println!("   Template: {}", report.path.display());
    println!("   Sheets:   {}\n", report.sheets.join(", "));

    println!("   Header row:      {}", report.header_row);
    println!("   Last filled row: {}", report.last_filled_row);
    println!("   Next row:        {}\n", report.next_row);

    println!("{}", "📋 Columns".cyan());
    for column in &report.columns {
        println!(
            "   {:<4} {}",
            column.letter.bright_blue(),
            column.field.as_str()
        );
    }

    if !report.missing_fields.is_empty() {
        println!("\n{}", "⚠️  Not in template (values will be skipped)".yellow());
        for field in &report.missing_fields {
            println!("   {}", field.as_str());
        }
    }

    if !report.formula_columns.is_empty() {
        println!(
            "\n{} {}",
            "🧮 Formulas carried down:".cyan(),
            report.formula_columns.join(", ")
        );
    }

    if report.is_fillable() {
        println!("\n{}", "✅ Template can be filled".bold().green());
    } else {
        println!("\n{}", "❌ No known estimation column found".bold().red());
    }
}

/// Execute the template command
pub fn template(output: PathBuf) -> EstimateResult<()> {
    write_default_template(&output)?;
    println!("{}", "✅ Template created".bold().green());
    println!("   File: {}", output.display());
    Ok(())
}

/// Execute the export command
pub fn export(json: PathBuf, output: PathBuf, verbose: bool) -> EstimateResult<()> {
    println!("{}", "🔥 Estimate Forge - Feature Export".bold().green());
    println!("   Input:  {}", json.display());
    println!("   Output: {}\n", output.display());

    let envelope = Envelope::load(&json)?;
    if verbose {
        println!(
            "   Project {} with {} row(s)\n",
            envelope.project.name.bright_yellow(),
            envelope.rows.len()
        );
    }

    ExcelExporter::new(envelope).export(&output)?;

    println!("{}", "✅ Export Complete!".bold().green());
    println!("   Excel file: {}", output.display());
    Ok(())
}

/// Execute the summary command
pub fn summary(json: PathBuf) -> EstimateResult<()> {
    let envelope = Envelope::load(&json)?;
    let summary = EstimateSummary::from_envelope(&envelope);

    println!("{}", "📊 Estimate Forge - Summary".bold().green());
    println!("   Project: {}", summary.project.bright_yellow().bold());
    println!("   Client:  {}\n", envelope.client());

    println!("   Rows:                  {}", summary.row_count);
    println!(
        "   Total hours:           {}",
        format_number(summary.total_hours)
    );
    println!(
        "   With contingency ({}%): {}",
        format_number(summary.contingency_pct * 100.0),
        format_number(summary.total_hours_with_contingency)
    );
    println!(
        "   Single resource:       {} day(s), {} month(s)",
        summary.single_resource_duration_days,
        format_number(summary.single_resource_duration_months)
    );

    if !summary.by_complexity.is_empty() {
        println!("\n{}", "📋 By complexity".cyan());
        for (complexity, count) in &summary.by_complexity {
            println!("   {:<10} {}", complexity, count);
        }
    }
    if !summary.by_make_or_reuse.is_empty() {
        println!("\n{}", "📋 Make / reuse".cyan());
        for (label, count) in &summary.by_make_or_reuse {
            println!("   {:<10} {}", label, count);
        }
    }

    Ok(())
}
