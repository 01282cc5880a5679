//! Report command implementation

use crate::cli::ReportArgs;
use crate::error::add_scan_context;
use crate::output::OutputFormatter;
use crate::output::ReportResult;
use a11yscan_core::Settings;
use a11yscan_core::report::HtmlReport;
use a11yscan_core::report::ReportOptions;

pub fn execute(args: &ReportArgs, formatter: &dyn OutputFormatter) -> anyhow::Result<()> {
    let settings = Settings::new(&args.base_dir);
    let results_dir = args
        .results_dir
        .clone()
        .unwrap_or_else(|| settings.results_dir().to_path_buf());
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| settings.reports_dir().join("latest.html"));

    let options = ReportOptions {
        overwrite: !args.no_overwrite,
        save_json: !args.no_json,
        output_json: None,
    };
    let (model, paths) = add_scan_context(
        HtmlReport::new(output)
            .with_title(&args.title)
            .with_options(options)
            .generate(&results_dir),
    )?;

    formatter.format_report_result(&ReportResult {
        results_dir: &results_dir,
        model: &model,
        paths: &paths,
    })
}
