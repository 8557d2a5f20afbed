use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;

use crate::cli::commands::InitArgs;
use crate::io::board_io;
use crate::io::store_io::{self, FileBackend, StoreBackend};
use crate::model::store::StoreData;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InitJson<'a> {
    name: &'a str,
    board_dir: String,
    projects: usize,
    tasks: usize,
}

/// Write the initial store: empty, or the bundled sample data.
fn write_initial_store(backend: &mut FileBackend, empty: bool) -> Result<StoreData, store_io::StoreError> {
    if empty {
        let data = StoreData::default();
        backend.save(&store_io::encode(&data)?)?;
        return Ok(data);
    }
    let (data, _) = store_io::load_store(backend)?;
    Ok(data)
}

pub fn cmd_init(args: InitArgs, start: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    // Check for an enclosing board and warn
    if let Some(parent) = start.parent()
        && let Ok(parent_root) = board_io::discover_board(parent)
    {
        eprintln!(
            "note: parent board found at {}/",
            parent_root.join(board_io::BOARD_DIR).display()
        );
    }

    let name = args.name.unwrap_or_else(|| {
        start
            .file_name()
            .and_then(|n| n.to_str())
            .map(board_io::infer_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Untitled".to_string())
    });

    let board = board_io::init_board(start, &name, args.force)?;
    let mut backend = board.backend();
    if args.force {
        match fs::remove_file(backend.path()) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
    }
    let data = write_initial_store(&mut backend, args.empty)?;

    if json {
        let out = InitJson {
            name: &name,
            board_dir: board.board_dir.display().to_string(),
            projects: data.projects.len(),
            tasks: data.tasks.len(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Initialized taskboard: {}", name);
        println!(
            "  {} project(s), {} task(s) in {}",
            data.projects.len(),
            data.tasks.len(),
            backend.path().display()
        );
    }
    Ok(())
}
