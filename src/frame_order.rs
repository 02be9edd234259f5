//
// frame_order.rs
// Oct-Tools-rs
//
// Orders fundus camera BMP exports by the frame index embedded in their names (`-F1`, `-F2`, ..., `-RF`).
//
// Thales Matheus Mendonça Santos - October 2026

use std::sync::OnceLock;

use regex::Regex;

/// Position of a file in the acquisition sequence.
///
/// Variant order is the sort order: numbered frames first, then names without
/// an index, and the reference frame (`-RF`) last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FrameKey {
    Numbered(u64),
    Unnumbered,
    Reference,
}

fn frame_index_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-F(\d+)").expect("static frame index pattern"))
}

pub fn frame_key(name: &str) -> FrameKey {
    if name.contains("-RF") {
        return FrameKey::Reference;
    }
    frame_index_pattern()
        .captures(name)
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .map(FrameKey::Numbered)
        .unwrap_or(FrameKey::Unnumbered)
}

/// Stable sort by [`frame_key`]; names with equal keys keep their relative order.
pub fn sort_frame_names<S: AsRef<str>>(names: &mut [S]) {
    names.sort_by_key(|name| frame_key(name.as_ref()));
}
