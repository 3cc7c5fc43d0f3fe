use std::error::Error;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use cellmap_core::{AppConfigExt, DocumentStore, parse_snapshot_time};
use cellmap_types::{BlobOrigin, CellStatus, CellXY, MapBlob, MapSnapshot};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::RwLock;

use crate::app_state::AppState;

/// Error message followed by every source in its chain
pub fn error_chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(message, ": {cause}");
        source = cause.source();
    }
    message
}

fn format_time(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}

fn describe_origin(origin: &BlobOrigin) -> String {
    match origin {
        BlobOrigin::Release { id } => format!("release {id}"),
        BlobOrigin::ExteriorClaim { id } => format!("exterior claim {id}"),
        BlobOrigin::StatusBucket => "status bucket".to_string(),
    }
}

fn describe_blob(blob: &MapBlob) -> String {
    format!(
        "{} [{} {}] {} cells",
        describe_origin(&blob.origin),
        blob.cell_status,
        blob.cell_status.fill_color(),
        blob.cells.len()
    )
}

/// Human-readable summary: bordered blobs first, then non-empty buckets
pub fn render_snapshot(snapshot: &MapSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "bordered blobs: {}", snapshot.border_blobs.len());
    for blob in &snapshot.border_blobs {
        let _ = writeln!(out, "  {}", describe_blob(blob));
    }
    let _ = writeln!(out, "status buckets:");
    for status in CellStatus::ALL {
        if let Some(blob) = snapshot.status_blob(status) {
            let _ = writeln!(out, "  {}", describe_blob(&blob));
        }
    }
    let _ = write!(out, "total cells: {}", snapshot.cell_count());
    out
}

fn load_store(dir: &Path) -> Result<DocumentStore, String> {
    DocumentStore::load_dir(dir).map_err(|e| error_chain(&e))
}

pub async fn load(dir: Option<&str>, state: Arc<RwLock<AppState>>) {
    let timer = Instant::now();
    let dir = state.read().await.resolve_directory(dir);

    match load_store(&dir) {
        Ok(store) => {
            println!(
                "loaded {} documents from {} in {}ms",
                store.len(),
                dir.display(),
                timer.elapsed().as_millis()
            );
            state.write().await.set_store(store, dir);
        }
        Err(e) => println!("Failed to load documents: {}", e),
    }
}

pub async fn snapshot(at: &str, json: bool, state: Arc<RwLock<AppState>>) {
    let at = match parse_snapshot_time(at) {
        Ok(at) => at,
        Err(e) => return println!("{}", error_chain(&e)),
    };

    let s = state.read().await;
    let Some(store) = s.store.as_ref() else {
        return println!("no documents loaded, run `load` first");
    };

    let timer = Instant::now();
    let snapshot = match store.snapshot(at, &s.config.engine) {
        Ok(snapshot) => snapshot,
        Err(e) => return println!("Failed to generate snapshot: {}", error_chain(&e)),
    };

    if json {
        match serde_json::to_string_pretty(&snapshot) {
            Ok(text) => println!("{text}"),
            Err(e) => println!("Failed to serialize snapshot: {}", e),
        }
        return;
    }

    println!("map at {}", format_time(at));
    println!("{}", render_snapshot(&snapshot));
    println!("generated in {}ms", timer.elapsed().as_millis());
}

pub async fn cell(x: i32, y: i32, at: Option<&str>, state: Arc<RwLock<AppState>>) {
    let cell = CellXY::new(x, y);
    let s = state.read().await;
    let Some(store) = s.store.as_ref() else {
        return println!("no documents loaded, run `load` first");
    };

    let Some(at) = at else {
        let documents = store.cell_documents(cell);
        println!("cell {}: {} documents", cell, documents.len());
        for doc in documents {
            println!("  {} {} {}", doc.document_type().as_str(), doc.id(), doc.display_name());
        }
        return;
    };

    let at = match parse_snapshot_time(at) {
        Ok(at) => at,
        Err(e) => return println!("{}", error_chain(&e)),
    };
    let snapshot = match store.snapshot(at, &s.config.engine) {
        Ok(snapshot) => snapshot,
        Err(e) => return println!("Failed to generate snapshot: {}", error_chain(&e)),
    };

    match snapshot.blob_containing(cell) {
        Some(blob) => println!("cell {} at {}: {}", cell, format_time(at), describe_blob(&blob)),
        None => println!("cell {} at {}: not on the map", cell, format_time(at)),
    }
    for doc in store.documents(snapshot.documents_for(cell)) {
        println!("  {} {} {}", doc.document_type().as_str(), doc.id(), doc.display_name());
    }
}

pub async fn timeline(state: Arc<RwLock<AppState>>) {
    let s = state.read().await;
    let Some(store) = s.store.as_ref() else {
        return println!("no documents loaded, run `load` first");
    };

    let times = store.timeline();
    println!("{} instants", times.len());
    for at in times {
        println!("  {}", format_time(at));
    }
}

pub async fn show_config(state: Arc<RwLock<AppState>>) {
    let s = state.read().await;
    match cellmap_core::AppConfig::config_path() {
        Ok(path) => println!("config file: {}", path.display()),
        Err(e) => println!("{}", error_chain(&e)),
    }
    println!("documents directory: {}", s.config.documents_directory);
    println!("vanilla creator: {}", s.config.engine.vanilla_creator);
    println!(
        "parallel cell threshold: {}",
        s.config.engine.parallel_cell_threshold
    );
    if let Some(dir) = &s.loaded_from {
        let count = s.store.as_ref().map_or(0, DocumentStore::len);
        println!("loaded: {} documents from {}", count, dir.display());
    }
}

pub async fn set_directory(path: &str, state: Arc<RwLock<AppState>>) {
    let mut s = state.write().await;
    if let Err(e) = s.config.set_documents_directory(Path::new(path)) {
        return println!("{}", error_chain(&e));
    }
    if let Err(e) = s.config.save() {
        println!("Failed to save configuration: {}", error_chain(&e));
    }
    println!("documents directory set to {}", s.config.documents_directory);
    drop(s);

    load(None, state).await;
}
