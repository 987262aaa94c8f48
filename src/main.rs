//! report-forge – command-line service-report exporter.
//!
//! Usage:
//!   report-forge <record.json> [out-dir] [--site] [--config export.json]
//!                [--font regular.ttf] [--bold-font bold.ttf]
//!                [--on-failure fallback|retry|abort]
//!
//! The PDF lands in `out-dir` (default: current directory) under its
//! generated name. When the primary path fails the export aborts, unless
//! `--on-failure fallback` asks for a printable HTML page spooled to the
//! same directory instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{env, fs, process};

use report_forge::fonts::FontManager;
use report_forge::{
    BitmapRasterizer, DirectorySave, DocumentContext, ExportConfig, ExportError, ExportOutcome,
    ExportResult, Exporter, FixedRecovery, PrintFacility, PrintableDocument, Recovery,
    ReportRecord, SiteRecord,
};

/// Spools printable documents as HTML files for the system print queue.
struct SpoolPrinter {
    dir: PathBuf,
}

impl PrintFacility for SpoolPrinter {
    fn print(&self, document: &PrintableDocument) -> ExportResult<()> {
        let stem: String = document
            .title
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let path = self.dir.join(format!("{stem}.html"));
        fs::create_dir_all(&self.dir)
            .and_then(|_| fs::write(&path, &document.html))
            .map_err(|e| ExportError::Print(format!("{}: {e}", path.display())))?;
        eprintln!("Spooled printable document to '{}'", path.display());
        Ok(())
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut input_path: Option<PathBuf> = None;
    let mut out_dir: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut font_path: Option<PathBuf> = None;
    let mut bold_font_path: Option<PathBuf> = None;
    let mut site = false;
    let mut policy = Recovery::default();
    let mut positional = 0usize;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--site" | "-s" => site = true,
            "--config" | "-c" => config_path = iter.next().map(PathBuf::from),
            "--font" => font_path = iter.next().map(PathBuf::from),
            "--bold-font" => bold_font_path = iter.next().map(PathBuf::from),
            "--on-failure" => {
                policy = match iter.next().map(String::as_str) {
                    Some("fallback") => Recovery::Fallback,
                    Some("retry") => Recovery::Retry,
                    Some("abort") => Recovery::Abort,
                    other => {
                        eprintln!("Unknown failure policy: {}", other.unwrap_or("<missing>"));
                        print_usage(&args[0]);
                        process::exit(1);
                    }
                }
            }
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
            path => {
                if positional == 0 {
                    input_path = Some(PathBuf::from(path));
                } else if positional == 1 {
                    out_dir = Some(PathBuf::from(path));
                } else {
                    eprintln!("Unexpected argument: {path}");
                    print_usage(&args[0]);
                    process::exit(1);
                }
                positional += 1;
            }
        }
    }

    let input = match input_path {
        Some(p) => p,
        None => {
            eprintln!("Error: no input record specified.");
            print_usage(&args[0]);
            process::exit(1);
        }
    };
    let out_dir = out_dir.unwrap_or_else(|| PathBuf::from("."));

    let config = match config_path {
        Some(path) => match read(&path).and_then(|json| ExportConfig::from_json(&json)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {e}", path.display());
                process::exit(1);
            }
        },
        None => ExportConfig::default(),
    };

    let mut fonts = FontManager::new();
    for (bold, path) in [(false, font_path), (true, bold_font_path)] {
        let Some(path) = path else { continue };
        let loaded = fs::read(&path)
            .map_err(|e| ExportError::InvalidInput(e.to_string()))
            .and_then(|bytes| fonts.load_font(bold, bytes));
        if let Err(e) = loaded {
            eprintln!("Error loading font '{}': {e}", path.display());
            process::exit(1);
        }
    }

    let json = match read(&input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading '{}': {e}", input.display());
            process::exit(1);
        }
    };

    let rasterizer = BitmapRasterizer::new(&config, DocumentContext::new()).with_fonts(fonts);
    let exporter = Exporter::new(
        config,
        Arc::new(rasterizer),
        Arc::new(DirectorySave::new(&out_dir)),
        Arc::new(SpoolPrinter { dir: out_dir }),
        Arc::new(FixedRecovery(policy)),
    );

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {e}");
            process::exit(1);
        }
    };

    match runtime.block_on(export(&exporter, &json, site)) {
        Ok(ExportOutcome::Saved {
            file_name,
            page_count,
        }) => {
            eprintln!(
                "Wrote '{file_name}' ({page_count} page{})",
                if page_count == 1 { "" } else { "s" }
            );
        }
        Ok(ExportOutcome::Printed { title }) => {
            eprintln!("Primary export failed; printed '{title}' instead");
        }
        Err(e) => {
            eprintln!("Error exporting: {e}");
            process::exit(1);
        }
    }
}

async fn export(exporter: &Exporter, json: &str, site: bool) -> ExportResult<ExportOutcome> {
    if site {
        let record = SiteRecord::from_json(json)?;
        exporter.export_site(&record).await
    } else {
        let record = ReportRecord::from_json(json)?;
        exporter.export_report(&record).await
    }
}

fn read(path: &Path) -> ExportResult<String> {
    fs::read_to_string(path).map_err(|e| ExportError::InvalidInput(e.to_string()))
}

fn print_usage(prog: &str) {
    eprintln!("report-forge – service report to PDF exporter");
    eprintln!();
    eprintln!("Usage:");
    eprintln!(
        "  {prog} <record.json> [out-dir] [--site] [--config export.json] [--on-failure abort]"
    );
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <record.json>  Report record (or site record with --site) as JSON");
    eprintln!("  [out-dir]      Directory for the PDF or spooled HTML (default: .)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --site, -s     Export the per-site summary instead of a report");
    eprintln!("  --config, -c   Export configuration JSON (missing keys use defaults)");
    eprintln!("  --font         Regular TTF/OTF face for text (default: greeked metrics)");
    eprintln!("  --bold-font    Bold TTF/OTF face");
    eprintln!("  --on-failure   abort | retry | fallback (default: abort)");
    eprintln!("  --help         Print this message");
}
