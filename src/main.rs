// Headless front end: loads a file, runs a session against it and prints
// the tree, the validity status and the highlight summary.
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;

use json_tree_sync_lib::tree::visible_lines;
use json_tree_sync_lib::{logging, Path, Session, SyncConfig, SyncError, TextBuffer, TextSource};

#[derive(Parser, Debug)]
#[command(version, about = "Inspect a JSON file the way the tree panel shows it")]
struct Args {
    /// JSON file to load
    file: PathBuf,
    /// Only show nodes whose key or value contains this text
    #[arg(long)]
    filter: Option<String>,
    /// Resolve a node path such as `root.items.[0].name` to a text offset
    #[arg(long)]
    select: Option<String>,
    /// Pretty-print the document before inspecting it
    #[arg(long)]
    format: bool,
    /// Print every node, not just the top level
    #[arg(long)]
    expand: bool,
    /// Engine settings as JSON, e.g. `{"indent": 2}`
    #[arg(long)]
    config: Option<String>,
    /// Log filter directives, overriding JSON_TREE_SYNC_LOG / RUST_LOG
    #[arg(long)]
    log: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = logging::init(args.log.as_deref()) {
        eprintln!("Failed to initialize logging: {e}");
    }
    if let Err(e) = run(args).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), SyncError> {
    let config = SyncConfig::from_json_str(args.config.as_deref().unwrap_or(""))?;
    let preview_limit = config.label_preview_limit;

    // Disk access belongs to the front end, never to the engine.
    let content = std::fs::read_to_string(&args.file)?;

    let buffer = TextBuffer::new(content);
    let session = Session::spawn(buffer.clone(), config);
    let handle = session.handle();

    if args.format {
        handle.format().await?;
        handle.refresh()?;
    }
    if let Some(term) = args.filter {
        handle.set_filter(term.as_str())?;
    }
    if args.expand {
        handle.expand_all()?;
    } else {
        handle.set_expanded(Path::root(), true)?;
    }
    if let Some(raw) = &args.select {
        handle.select(Path::parse(raw))?;
    }

    // Commands are handled in order, so this sees all of the above.
    handle.query(|_| ()).await?;
    let snapshot = session.snapshots().borrow().clone();

    match &snapshot.view {
        Some(root) => {
            for (depth, line) in visible_lines(root, preview_limit) {
                println!("{}{}", "  ".repeat(depth), line);
            }
        }
        None => println!("(no matching nodes)"),
    }
    println!();
    println!("{}", snapshot.status_text());
    if let Some(detail) = snapshot.validity.detail() {
        println!("  {detail}");
    }
    println!("Modified: {}", if snapshot.dirty { "yes" } else { "no" });

    if let Some(raw) = &args.select {
        match &snapshot.last_navigation {
            Some(nav) => println!("{} -> offset {} (caret at {})", nav.path, nav.offset, buffer.caret()),
            None => println!("{raw} -> not found"),
        }
    }

    let mut highlights = session.highlights();
    let spans = loop {
        let spans = highlights.borrow_and_update().clone();
        if spans.total_len() == buffer.text().len() {
            break spans;
        }
        if highlights.changed().await.is_err() {
            break spans;
        }
    };
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for span in spans.iter() {
        if let Some(class) = span.class {
            *counts.entry(class.style_class()).or_default() += 1;
        }
    }
    let summary: Vec<String> = counts.iter().map(|(k, v)| format!("{k}={v}")).collect();
    println!("Tokens: {}", summary.join(" "));

    session.shutdown().await;
    Ok(())
}
