mod bootstrap;
mod output;

use anyhow::Result;
use health_core::settings::Settings;
use health_data::analysis::analyze_health;

const PREVIEW_ROWS: usize = 5;

fn main() -> Result<()> {
    let settings = Settings::load()?;

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Health ETL v{} starting", env!("CARGO_PKG_VERSION"));

    let config = settings.resolve()?;
    tracing::info!(
        "Data: {}, window: {} .. {}, output: {}",
        config.data_root.display(),
        config.window.start,
        config
            .window
            .end
            .map(|d| d.to_string())
            .unwrap_or_else(|| "open".to_string()),
        config.output_dir.display()
    );

    let Some(analysis) = analyze_health(&config)? else {
        tracing::warn!("No data found; nothing to export");
        return Ok(());
    };

    for summary in &analysis.categories {
        if summary.files_found > 0 {
            tracing::info!(
                "{}: {} files, {} failed, {} days",
                summary.category,
                summary.files_found,
                summary.files_failed,
                summary.days
            );
        }
    }

    tracing::info!("Run summary: {}", analysis.metadata.summary_line());
    tracing::info!(
        "Final dataset: {} columns",
        analysis.table.columns().len()
    );
    for line in output::preview_lines(&analysis.table, PREVIEW_ROWS) {
        tracing::info!("{}", line);
    }

    let paths = output::export_table(&analysis.table, &config.output_dir)?;
    tracing::info!(
        "Saved {} and {}",
        paths.json.display(),
        paths.csv.display()
    );

    Ok(())
}
