use std::fmt::Write;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Render `root`'s contents as a box-drawing tree, entries sorted by name.
pub fn render_tree(root: &Path) -> Result<String> {
    let mut out = String::new();
    render_into(root, "", &mut out)?;
    Ok(out)
}

fn render_into(dir: &Path, prefix: &str, out: &mut String) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("Failed to list {:?}", dir))?
        .collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());

    for (i, entry) in entries.iter().enumerate() {
        let last = i + 1 == entries.len();
        let connector = if last { "└── " } else { "├── " };
        let _ = writeln!(out, "{}{}{}", prefix, connector, entry.file_name().to_string_lossy());

        // Follows symlinks, so linked folders are listed too.
        if entry.path().is_dir() {
            let extension = if last { "    " } else { "│   " };
            render_into(&entry.path(), &format!("{prefix}{extension}"), out)?;
        }
    }
    Ok(())
}
