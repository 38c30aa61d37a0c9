//! Header normalization and dataset construction.

use std::collections::{HashMap, HashSet};

use polars::prelude::DataFrame;
use tracing::debug;

use crate::conf::C_HEADER_PLACEHOLDER;
use crate::spec::{Result, SpecRawTable};
use crate::util::create_text_dataset;

/// Trim headers, fill blanks and make every header unique.
///
/// Blank or missing headers become `Unnamed`. The first occurrence of a
/// header keeps its name; later duplicates get `.1`, `.2`, ... suffixes,
/// skipping any suffix that collides with another header.
pub fn normalize_headers(headers: &[Option<String>]) -> Vec<String> {
    let l_trimmed = headers
        .iter()
        .map(|header| match header.as_deref().map(str::trim) {
            Some(c_header) if !c_header.is_empty() => c_header.to_string(),
            _ => C_HEADER_PLACEHOLDER.to_string(),
        })
        .collect::<Vec<_>>();

    let set_reserved: HashSet<String> = l_trimmed.iter().cloned().collect();
    let mut set_emitted: HashSet<String> = HashSet::with_capacity(l_trimmed.len());
    let mut dict_next_suffix: HashMap<String, usize> = HashMap::new();

    let mut l_headers = Vec::with_capacity(l_trimmed.len());
    for c_header in l_trimmed {
        if !set_emitted.contains(&c_header) {
            set_emitted.insert(c_header.clone());
            l_headers.push(c_header);
            continue;
        }

        let n_suffix = dict_next_suffix.entry(c_header.clone()).or_insert(1);
        let c_candidate = loop {
            let c_candidate = format!("{c_header}.{n_suffix}");
            *n_suffix += 1;
            if !set_reserved.contains(&c_candidate) && !set_emitted.contains(&c_candidate) {
                break c_candidate;
            }
        };
        set_emitted.insert(c_candidate.clone());
        l_headers.push(c_candidate);
    }

    l_headers
}

/// Normalize owned header names.
pub fn normalize_header_names(headers: &[String]) -> Vec<String> {
    let l_headers = headers.iter().cloned().map(Some).collect::<Vec<_>>();
    normalize_headers(&l_headers)
}

/// Build the string-typed dataset of a raw table.
///
/// Headers are normalized first; columns without any value are then dropped.
pub fn build_dataset(table: &SpecRawTable) -> Result<DataFrame> {
    let l_headers = normalize_headers(&table.headers);

    let mut l_columns = Vec::with_capacity(l_headers.len());
    let mut l_dropped = Vec::new();
    for (n_idx_col, c_header) in l_headers.into_iter().enumerate() {
        let l_cells = table
            .rows
            .iter()
            .map(|row| row.get(n_idx_col).cloned().flatten())
            .collect::<Vec<_>>();
        if l_cells.iter().all(Option::is_none) {
            l_dropped.push(c_header);
        } else {
            l_columns.push((c_header, l_cells));
        }
    }

    if !l_dropped.is_empty() {
        debug!(columns = ?l_dropped, "Dropped empty columns");
    }
    create_text_dataset(l_columns)
}
