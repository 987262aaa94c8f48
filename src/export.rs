//! Export orchestration – normalize, render, rasterize, paginate and save,
//! or hand the printable fallback to the print facility once the user has
//! chosen it.
//!
//! Every collaborator the host provides (save, print, recovery prompt,
//! notifications) is injected, so the core never talks to a UI directly.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};

use crate::assemble::{artifact_file_name, assemble, PaginatedArtifact};
use crate::config::ExportConfig;
use crate::document::RenderedDocument;
use crate::error::{ExportError, ExportResult};
use crate::fallback::{
    render_printable_report, render_printable_site, PrintFacility, PrintableDocument,
};
use crate::normalize::{normalize_report, normalize_site};
use crate::pagination::paginate;
use crate::raster::Rasterizer;
use crate::record::{ReportRecord, SiteRecord};
use crate::templates::{render_report, render_site};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-facing status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Default notifier: routes notices through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => log::info!("{}", notice.message),
            NoticeLevel::Warning => log::warn!("{}", notice.message),
            NoticeLevel::Error => log::error!("{}", notice.message),
        }
    }
}

/// What the user wants after the primary path failed. Unattended hosts
/// default to `Abort`; the fallback has to be asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Recovery {
    Retry,
    Fallback,
    #[default]
    Abort,
}

/// Asks the user how to proceed. `attempt` counts primary-path failures so
/// far, starting at 1.
pub trait RecoveryPrompt: Send + Sync {
    fn choose(&self, error: &ExportError, attempt: u32) -> Recovery;
}

/// A prompt that always gives the same answer, for unattended hosts.
#[derive(Debug, Clone, Copy)]
pub struct FixedRecovery(pub Recovery);

impl RecoveryPrompt for FixedRecovery {
    fn choose(&self, _error: &ExportError, _attempt: u32) -> Recovery {
        self.0
    }
}

/// The host's save/download facility.
#[async_trait]
pub trait SaveFacility: Send + Sync {
    async fn save(&self, artifact: &PaginatedArtifact) -> ExportResult<()>;
}

/// Saves artifacts into a directory under their file name. A second export
/// with the same name overwrites the first.
#[derive(Debug, Clone)]
pub struct DirectorySave {
    dir: PathBuf,
}

impl DirectorySave {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SaveFacility for DirectorySave {
    async fn save(&self, artifact: &PaginatedArtifact) -> ExportResult<()> {
        let path = self.dir.join(&artifact.file_name);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ExportError::Save(format!("{}: {e}", self.dir.display())))?;
        tokio::fs::write(&path, &artifact.bytes)
            .await
            .map_err(|e| ExportError::Save(format!("{}: {e}", path.display())))?;
        log::debug!("wrote {} ({} bytes)", path.display(), artifact.bytes.len());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Exporter
// ---------------------------------------------------------------------------

/// How an export finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The paginated artifact went to the save facility.
    Saved { file_name: String, page_count: usize },
    /// The user chose the fallback and it went to the print facility.
    Printed { title: String },
}

pub struct Exporter {
    config: ExportConfig,
    rasterizer: Arc<dyn Rasterizer>,
    saver: Arc<dyn SaveFacility>,
    printer: Arc<dyn PrintFacility>,
    prompt: Arc<dyn RecoveryPrompt>,
    notifier: Arc<dyn Notifier>,
}

impl Exporter {
    pub fn new(
        config: ExportConfig,
        rasterizer: Arc<dyn Rasterizer>,
        saver: Arc<dyn SaveFacility>,
        printer: Arc<dyn PrintFacility>,
        prompt: Arc<dyn RecoveryPrompt>,
    ) -> Self {
        Self {
            config,
            rasterizer,
            saver,
            printer,
            prompt,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export one report, naming the artifact with today's date.
    pub async fn export_report(&self, record: &ReportRecord) -> ExportResult<ExportOutcome> {
        self.export_report_on(record, Local::now().date_naive()).await
    }

    pub async fn export_report_on(
        &self,
        record: &ReportRecord,
        date: NaiveDate,
    ) -> ExportResult<ExportOutcome> {
        let view = normalize_report(record);
        let document = render_report(&view, &self.config);
        let file_name = artifact_file_name(
            &self.config.report_prefix,
            &view.report_number,
            date,
            &self.config.extension,
        );
        self.run(&document, &file_name, || {
            render_printable_report(&view, &self.config)
        })
        .await
    }

    /// Export the summary document for one site.
    pub async fn export_site(&self, record: &SiteRecord) -> ExportResult<ExportOutcome> {
        self.export_site_on(record, Local::now().date_naive()).await
    }

    pub async fn export_site_on(
        &self,
        record: &SiteRecord,
        date: NaiveDate,
    ) -> ExportResult<ExportOutcome> {
        let view = normalize_site(record);
        let document = render_site(&view, &self.config);
        let file_name = artifact_file_name(
            &self.config.site_prefix,
            &view.site_code,
            date,
            &self.config.extension,
        );
        self.run(&document, &file_name, || render_printable_site(&view, &self.config))
            .await
    }

    /// Export several reports strictly one after another. Each result is
    /// independent; a failed export does not stop the batch.
    pub async fn export_reports(
        &self,
        records: &[ReportRecord],
    ) -> Vec<ExportResult<ExportOutcome>> {
        let date = Local::now().date_naive();
        let mut outcomes = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            log::debug!("batch export {}/{}", i + 1, records.len());
            outcomes.push(self.export_report_on(record, date).await);
        }
        outcomes
    }

    async fn primary(
        &self,
        document: &RenderedDocument,
        file_name: &str,
    ) -> ExportResult<PaginatedArtifact> {
        let raster = self.rasterizer.rasterize(document).await?;
        let pages = paginate(&raster, self.config.page_width_mm, self.config.page_height_mm)?;
        assemble(
            &pages,
            &document.title,
            file_name,
            self.config.page_width_mm,
            self.config.page_height_mm,
        )
    }

    async fn run(
        &self,
        document: &RenderedDocument,
        file_name: &str,
        printable: impl Fn() -> PrintableDocument,
    ) -> ExportResult<ExportOutcome> {
        let mut failures = 0u32;
        loop {
            let error = match self.primary(document, file_name).await {
                Ok(artifact) => {
                    if let Err(e) = self.saver.save(&artifact).await {
                        self.notifier.notify(Notice::new(
                            NoticeLevel::Error,
                            format!("Saving {} failed: {e}", artifact.file_name),
                        ));
                        return Err(e);
                    }
                    self.notifier.notify(Notice::new(
                        NoticeLevel::Info,
                        format!("Saved {} ({} pages)", artifact.file_name, artifact.page_count),
                    ));
                    return Ok(ExportOutcome::Saved {
                        file_name: artifact.file_name,
                        page_count: artifact.page_count,
                    });
                }
                Err(e) if e.is_recoverable() => e,
                Err(e) => return Err(e),
            };

            failures += 1;
            log::warn!("primary export of '{}' failed: {error}", document.title);
            match self.prompt.choose(&error, failures) {
                Recovery::Retry if failures <= self.config.max_retries => {
                    self.notifier.notify(Notice::new(
                        NoticeLevel::Warning,
                        format!("Export failed, retrying ({failures}/{})", self.config.max_retries),
                    ));
                }
                Recovery::Retry | Recovery::Abort => {
                    self.notifier.notify(Notice::new(
                        NoticeLevel::Error,
                        format!("Export of {file_name} aborted: {error}"),
                    ));
                    return Err(ExportError::Aborted {
                        cause: Box::new(error),
                    });
                }
                Recovery::Fallback => {
                    let doc = printable();
                    self.printer.print(&doc)?;
                    self.notifier.notify(Notice::new(
                        NoticeLevel::Info,
                        format!("Sent '{}' to the printer", doc.title),
                    ));
                    return Ok(ExportOutcome::Printed { title: doc.title });
                }
            }
        }
    }
}
