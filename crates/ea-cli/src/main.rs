//! `ea`: command-line access to the step parser and scene inspection.
//!
//! ```text
//! ea preview-steps [FILE|-]
//! ea execute-steps DEFECT [FILE|-]
//! ea scene FILE [--screen WxH]
//! ```
//!
//! Every command accepts `--config FILE` (a JSON `CanvasConfig`). Logging
//! is controlled with `RUST_LOG`.

use ea_core::{
    ArchitecturalObject, CanvasConfig, DefectId, MigrationRequest, ObjectKind, Scene, Size, Viewport,
};
use ea_editor::{InMemoryStore, SceneClient};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;

const USAGE: &str = "usage:
  ea preview-steps [FILE|-]
  ea execute-steps DEFECT [FILE|-]
  ea scene FILE [--screen WxH]
options:
  --config FILE   canvas configuration (JSON)";

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(args).await {
        eprintln!("ea: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Vec<String>) -> Result<(), String> {
    let (options, positional) = split_options(args)?;
    let config = match options.get("--config") {
        Some(path) => CanvasConfig::from_json(&read_source(path)?)?,
        None => CanvasConfig::default(),
    };
    log::debug!("config: {config:?}");

    let (command, rest) = positional
        .split_first()
        .ok_or_else(|| USAGE.to_string())?;
    match command.as_str() {
        "preview-steps" => {
            let text = read_source(rest.first().map_or("-", String::as_str))?;
            let client = cli_client();
            let preview = client
                .preview_step_migration(DefectId::intern("preview"), &text)
                .await
                .map_err(|e| e.to_string())?;
            print_json(&preview)
        }
        "execute-steps" => {
            let defect = rest
                .first()
                .ok_or_else(|| "execute-steps needs a DEFECT id".to_string())?;
            let defect = DefectId::intern(defect);
            let text = read_source(rest.get(1).map_or("-", String::as_str))?;
            let client = cli_client();
            let preview = client
                .preview_step_migration(defect, &text)
                .await
                .map_err(|e| e.to_string())?;
            let request = MigrationRequest {
                steps: preview.steps,
                original_text: text,
            };
            let outcome = client
                .execute_step_migration(defect, request)
                .await
                .map_err(|e| e.to_string())?;
            for issue in &outcome.validation.errors {
                log::warn!("{}", issue.message);
            }
            print_json(&outcome)
        }
        "scene" => {
            let path = rest
                .first()
                .ok_or_else(|| "scene needs a FILE of objects".to_string())?;
            let screen = match options.get("--screen") {
                Some(s) => parse_screen(s)?,
                None => Size::new(1280.0, 800.0),
            };
            print_json(&inspect_scene(&read_source(path)?, screen, &config)?)
        }
        other => Err(format!("unknown command '{other}'\n{USAGE}")),
    }
}

// ─── Scene inspection ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SceneReport {
    model_id: String,
    objects: usize,
    by_kind: BTreeMap<&'static str, usize>,
    /// Connectors whose endpoints are not both present.
    dangling: Vec<String>,
    fit: Option<Viewport>,
}

fn inspect_scene(json: &str, screen: Size, config: &CanvasConfig) -> Result<SceneReport, String> {
    let objects: Vec<ArchitecturalObject> =
        serde_json::from_str(json).map_err(|e| format!("Objects parse error: {e}"))?;
    let model_id = objects
        .first()
        .map(|o| o.model_id)
        .ok_or_else(|| "no objects in file".to_string())?;
    let scene = Scene::from_objects(model_id, objects);

    let mut by_kind = BTreeMap::new();
    for obj in scene.objects() {
        *by_kind.entry(obj.kind.as_str()).or_insert(0) += 1;
    }
    let dangling = scene
        .objects()
        .filter(|o| o.kind == ObjectKind::Connector && scene.connector_endpoints(o).is_none())
        .map(|o| o.id.to_string())
        .collect();
    let fit = scene
        .content_bounds()
        .map(|b| Viewport::fit_bounds(b, screen, config.fit_padding, &config.zoom_limits()));

    Ok(SceneReport {
        model_id: model_id.to_string(),
        objects: scene.len(),
        by_kind,
        dangling,
        fit,
    })
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn cli_client() -> SceneClient<InMemoryStore> {
    let user = std::env::var("EA_USER").unwrap_or_else(|_| "cli".to_string());
    SceneClient::new(Arc::new(InMemoryStore::new(Some(&user))))
}

/// Pull `--name value` pairs out of the argument list.
fn split_options(args: Vec<String>) -> Result<(BTreeMap<String, String>, Vec<String>), String> {
    let mut options = BTreeMap::new();
    let mut positional = Vec::new();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            let value = iter.next().ok_or_else(|| format!("{arg} needs a value"))?;
            options.insert(arg, value);
        } else {
            positional.push(arg);
        }
    }
    Ok((options, positional))
}

fn read_source(path: &str) -> Result<String, String> {
    if path == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| format!("failed to read stdin: {e}"))?;
        Ok(text)
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("failed to read {path}: {e}"))
    }
}

fn parse_screen(s: &str) -> Result<Size, String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("bad --screen '{s}', expected WxH"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f32>()
            .map_err(|e| format!("bad --screen '{s}': {e}"))
    };
    let size = Size::new(parse(w)?, parse(h)?);
    if size.is_positive() {
        Ok(size)
    } else {
        Err(format!("bad --screen '{s}': must be positive"))
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let out = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{out}");
    Ok(())
}
