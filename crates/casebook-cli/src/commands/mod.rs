//! CLI subcommands.

pub mod case;
pub mod export;
pub mod import;
pub mod invoice;
pub mod match_payment;

use std::path::{Path, PathBuf};

use console::style;

use casebook_core::{Repair, StoreFile};

/// Resolve the store document: an explicit `--store` path wins, otherwise
/// the platform data directory.
pub fn store_file(path: Option<&Path>) -> StoreFile {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_store_path);
    StoreFile::new(path)
}

fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("casebook")
        .join("cases_data.json")
}

/// Print self-healing actions the store load performed.
pub fn print_repairs(repairs: &[Repair]) {
    for repair in repairs {
        println!("{} {}", style("⚠").yellow(), repair);
    }
}
