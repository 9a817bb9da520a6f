//! Subcommand implementations

use crate::artifact::{Artifact, ArtifactKind};
use crate::backend::HttpBackend;
use crate::config::BatchdocConfig;
use crate::display::{
    format_file_size, show_notification, show_preview, show_validation_report, BarProgressSink,
};
use crate::filename::{pattern_tokens, resolve};
use crate::format::OutputFormat;
use crate::row::RowRecord;
use crate::workflow::{DownloadSource, IntervalTicker, Workflow};
use anyhow::{bail, Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Options for a full generation run.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub template: PathBuf,
    pub data: PathBuf,
    pub formats: Vec<OutputFormat>,
    pub pattern: Option<String>,
    pub insert: Vec<String>,
    pub force: bool,
    pub output: Option<PathBuf>,
}

pub fn build_workflow(config: &BatchdocConfig) -> Result<Workflow> {
    let backend = HttpBackend::new(&config.api_url, config.request_timeout())
        .with_context(|| format!("Cannot reach backend at {}", config.api_url))?;
    Ok(Workflow::new(
        Arc::new(backend),
        Arc::new(IntervalTicker::new(config.replay_tick())),
        config.workflow_defaults(),
    ))
}

/// Load both files and run the validate step, printing the report.
async fn upload_and_validate(
    workflow: &mut Workflow,
    template: &Path,
    data: &Path,
) -> Result<bool> {
    let template = Artifact::from_path(ArtifactKind::Template, template)
        .await
        .with_context(|| format!("Cannot use {} as template", template.display()))?;
    let dataset = Artifact::from_path(ArtifactKind::Dataset, data)
        .await
        .with_context(|| format!("Cannot use {} as dataset", data.display()))?;

    println!(
        "📄 {} ({})  📊 {} ({})",
        template.file_name(),
        format_file_size(template.size()),
        dataset.file_name(),
        format_file_size(dataset.size())
    );

    workflow.select(template)?;
    workflow.select(dataset)?;
    let validation = workflow.validate().await?;
    notify(workflow);

    let state = workflow.state();
    show_validation_report(
        &state.placeholders,
        &state.excel_headers,
        state.row_count,
        &validation,
    );
    Ok(validation.valid)
}

pub async fn run_validate(config: &BatchdocConfig, template: &Path, data: &Path) -> Result<()> {
    let mut workflow = build_workflow(config)?;
    let valid = upload_and_validate(&mut workflow, template, data).await?;
    debug!("Validation finished (valid: {valid})");
    workflow.cancel();
    Ok(())
}

pub async fn run_generate(config: &BatchdocConfig, options: GenerateOptions) -> Result<()> {
    let mut workflow = build_workflow(config)?;

    let valid = upload_and_validate(&mut workflow, &options.template, &options.data).await?;
    if !valid && !options.force {
        let missing = workflow
            .state()
            .validation
            .as_ref()
            .map(|v| v.missing_in_excel.join(", "))
            .unwrap_or_default();
        workflow.cancel();
        bail!("Placeholders missing from the dataset: {missing}. Re-run with --force to generate anyway.");
    }
    if !valid {
        warn!("Generating with unmatched placeholders (--force)");
    }

    workflow.proceed().await?;
    notify(&mut workflow);
    if let Some(row) = &workflow.state().preview {
        show_preview(&workflow.state().placeholders, row);
    }
    if let Some(url) = &workflow.state().preview_url {
        println!("Preview document: {url}");
    }

    configure(&mut workflow, &options)?;
    if let Some(name) = workflow.sample_file_name() {
        println!("Sample filename: {name}");
    }
    println!(
        "Formats: {}",
        format_labels(workflow.state().selected_formats.as_slice())
    );

    let sink = BarProgressSink::new();
    let handle = workflow.replay_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.stop();
        }
    });
    let generated = workflow.generate(&sink).await;
    interrupt.abort();
    let generated = generated?;
    notify(&mut workflow);

    let archive = until_interrupted(
        async { workflow.download().await.map_err(anyhow::Error::from) },
        ctrl_c(),
    )
    .await?;
    match &archive.source {
        DownloadSource::Direct(url) => info!("Downloaded {} from {}", archive.file_name, url),
        DownloadSource::Archive => {
            info!("Downloaded {} from the session archive", archive.file_name)
        }
    }

    let path = options
        .output
        .unwrap_or_else(|| PathBuf::from(&archive.file_name));
    until_interrupted(
        async {
            tokio::fs::write(&path, &archive.bytes)
                .await
                .with_context(|| format!("Cannot write {}", path.display()))
        },
        ctrl_c(),
    )
    .await?;
    println!(
        "💾 Saved {} documents to {} ({})",
        generated,
        path.display(),
        format_file_size(archive.bytes.len() as u64)
    );
    Ok(())
}

fn format_labels(formats: &[OutputFormat]) -> String {
    formats
        .iter()
        .map(OutputFormat::label)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Apply the requested formats and filename pattern to the Generate phase.
fn configure(workflow: &mut Workflow, options: &GenerateOptions) -> Result<()> {
    if !options.formats.is_empty() {
        for format in OutputFormat::ALL {
            let wanted = options.formats.contains(&format);
            if wanted != workflow.state().selected_formats.contains(format) {
                workflow.toggle_format(format)?;
            }
        }
    }
    if let Some(pattern) = &options.pattern {
        workflow.set_file_name_pattern(pattern.clone())?;
    }
    for token in &options.insert {
        workflow.insert_token(token)?;
    }
    Ok(())
}

pub fn run_filename(pattern: &str, values: &[(String, String)]) -> Result<()> {
    let row: RowRecord = values
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();

    for token in pattern_tokens(pattern) {
        if row.lookup(&token).is_none() {
            warn!("No value given for {{{{{token}}}}}; it will be left empty");
        }
    }

    println!("{}", resolve(pattern, &row));
    Ok(())
}

/// Run `work` unless `interrupt` completes first.
async fn until_interrupted<T, W, I>(work: W, interrupt: I) -> Result<T>
where
    W: Future<Output = Result<T>>,
    I: Future<Output = ()>,
{
    tokio::select! {
        result = work => result,
        _ = interrupt => bail!("Interrupted"),
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Print the latest notification once.
fn notify(workflow: &mut Workflow) {
    if let Some(notification) = &workflow.state().notification {
        show_notification(notification);
    }
    workflow.dismiss_notification();
}
