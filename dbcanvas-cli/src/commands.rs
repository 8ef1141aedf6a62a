use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::{json, Value};
use tracing::info;

use dbcanvas::collaborators::{DryRunSchemaApi, FsCanvasStore};
use dbcanvas::export::{ExportProgress, ExportTranslator};
use dbcanvas::schema::{validate as validate_graph, Canvas};
use dbcanvas::{DuplicationService, EngineConfig, OwnerContext};

use crate::quota_ledger::FileQuotaLedger;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Path to the canvas JSON document.
    #[clap(long)]
    pub canvas: PathBuf,

    /// Pretty-print the JSON response for humans.
    #[clap(long)]
    pub pretty: bool,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Path to the canvas JSON document.
    #[clap(long)]
    pub canvas: PathBuf,

    #[clap(long)]
    pub pretty: bool,
}

#[derive(Debug, Args)]
pub struct DuplicateArgs {
    /// Path to the canvas JSON document to clone.
    #[clap(long)]
    pub canvas: PathBuf,

    /// Root directory of the canvas store.
    #[clap(long)]
    pub store: PathBuf,

    /// Owner the clone is created for.
    #[clap(long)]
    pub owner: String,

    /// Storage partition for the owner (defaults to the owner id).
    #[clap(long)]
    pub owner_key: Option<String>,

    /// Quota ledger file (defaults to `<store>/quota.json`).
    #[clap(long)]
    pub ledger: Option<PathBuf>,

    /// Canvas limit for this owner, overriding the configured default.
    #[clap(long)]
    pub limit: Option<u32>,

    /// Suffix appended to the cloned canvas name.
    #[clap(long)]
    pub copy_suffix: Option<String>,

    #[clap(long)]
    pub pretty: bool,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Path to the canvas JSON document.
    #[clap(long)]
    pub canvas: PathBuf,

    /// External parent the containers are created under.
    #[clap(long, default_value = "dry-run")]
    pub parent: String,

    /// Maximum in-flight requests per stage.
    #[clap(long)]
    pub concurrency: Option<usize>,

    /// Include every request the dry-run API received.
    #[clap(long)]
    pub show_calls: bool,

    #[clap(long)]
    pub pretty: bool,
}

pub fn validate(args: ValidateArgs) -> Result<()> {
    let canvas = load_canvas(&args.canvas)?;
    let violations = validate_graph(&canvas.graph);

    print_json(
        &json!({
            "canvas": canvas.id,
            "valid": violations.is_empty(),
            "violations": violations,
        }),
        args.pretty,
    )?;

    if !violations.is_empty() {
        bail!("canvas {} has {} violation(s)", canvas.id, violations.len());
    }
    Ok(())
}

pub fn analyze(args: AnalyzeArgs) -> Result<()> {
    let canvas = load_canvas(&args.canvas)?;
    let plan = ExportTranslator::new(Arc::new(DryRunSchemaApi::new()), EngineConfig::from_env())
        .plan(&canvas.graph);

    let databases: Vec<Value> = plan
        .databases
        .iter()
        .map(|db| {
            json!({
                "database": db.database.name,
                "plain": db.plain.len(),
                "relations": db.relations.len(),
                "rollups": db.rollups.len(),
                "formulas": db.formulas.len(),
                "unsupported": db
                    .unsupported
                    .iter()
                    .map(|p| format!("{} ({})", p.name, p.property_type()))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    print_json(
        &json!({
            "canvas": canvas.id,
            "analysis": plan.analysis,
            "databases": databases,
            "links": plan.links.len(),
            "skippedLinks": plan
                .skipped_links
                .iter()
                .map(|skipped| format!("{}: {}", skipped.scope, skipped.reason))
                .collect::<Vec<_>>(),
        }),
        args.pretty,
    )
}

pub async fn duplicate(args: DuplicateArgs) -> Result<()> {
    let canvas = load_canvas(&args.canvas)?;

    let mut config = EngineConfig::from_env();
    if let Some(suffix) = args.copy_suffix {
        config.copy_suffix = suffix;
    }

    let mut owner = OwnerContext::new(args.owner);
    if let Some(owner_key) = args.owner_key {
        owner = owner.with_owner_key(owner_key);
    }
    if let Some(limit) = args.limit {
        owner = owner.with_canvas_limit(limit);
    }

    let store = Arc::new(FsCanvasStore::new(&args.store));
    let ledger = Arc::new(FileQuotaLedger::new(
        args.ledger
            .unwrap_or_else(|| args.store.join("quota.json")),
    ));
    let service = DuplicationService::new(store.clone(), ledger.clone(), config);

    match service.duplicate(&canvas, &owner).await {
        Ok(outcome) => {
            let path = store.canvas_path(&owner.owner_key, &outcome.canvas_id)?;
            info!("Wrote {}", path.display());
            print_json(
                &json!({
                    "status": "ok",
                    "canvasId": outcome.canvas_id,
                    "name": outcome.canvas.name,
                    "path": path,
                    "ledger": ledger.path(),
                }),
                args.pretty,
            )
        }
        Err(err) => {
            print_json(
                &json!({
                    "status": "error",
                    "code": err.error_code(),
                    "message": err.to_string(),
                }),
                args.pretty,
            )?;
            Err(err).context("duplicate failed")
        }
    }
}

pub async fn export(args: ExportArgs) -> Result<()> {
    let canvas = load_canvas(&args.canvas)?;

    let mut config = EngineConfig::from_env();
    if let Some(concurrency) = args.concurrency {
        config = config.with_export_concurrency(concurrency);
    }

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::unbounded_channel::<ExportProgress>();
    let progress_log = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            info!("Export stage {:?} ({} units)", progress.stage, progress.units);
        }
    });

    let api = Arc::new(DryRunSchemaApi::new());
    let translator = ExportTranslator::new(api.clone(), config).with_progress(progress_tx);
    let result = translator.export(&canvas.graph, &args.parent).await;
    drop(translator);
    progress_log.await.context("progress logger stopped")?;

    let mut response = json!({ "result": result });
    if args.show_calls {
        response["calls"] = serde_json::to_value(api.calls().await)?;
    }
    print_json(&response, args.pretty)?;

    if !result.success {
        bail!("export finished with {} error(s)", result.errors.len());
    }
    Ok(())
}

fn load_canvas(path: &Path) -> Result<Canvas> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read canvas {}", path.display()))?;
    Canvas::from_json_str(&json).with_context(|| format!("failed to parse canvas {}", path.display()))
}

fn print_json(value: &Value, pretty: bool) -> Result<()> {
    if pretty {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", value);
    }
    Ok(())
}
