// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unique column labels for previews.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::table::{Cell, FinalTable};

/// Copy of a [`FinalTable`] with unique column labels. Never exported.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Relabel repeated columns `label`, `label_1`, `label_2`, ...
/// The input table is left untouched.
pub fn disambiguate(table: &FinalTable) -> DisplayTable {
    DisplayTable {
        columns: disambiguate_labels(&table.columns),
        rows: table.rows.clone(),
    }
}

/// Suffix every repeat of a label with its occurrence count. A suffixed
/// name that is itself already taken is skipped, so `x, x_1, x` becomes
/// `x, x_1, x_2` rather than repeating `x_1`. This intentionally departs
/// from plain occurrence numbering to keep every display label unique.
pub fn disambiguate_labels(labels: &[String]) -> Vec<String> {
    let mut taken: FxHashSet<String> = labels.iter().cloned().collect();
    let mut seen: FxHashMap<&str, usize> = FxHashMap::default();
    let mut out = Vec::with_capacity(labels.len());

    for label in labels {
        let count = seen.entry(label.as_str()).or_insert(0);
        if *count == 0 {
            *count = 1;
            out.push(label.clone());
            continue;
        }

        let mut candidate = format!("{}_{}", label, count);
        while taken.contains(&candidate) {
            *count += 1;
            candidate = format!("{}_{}", label, count);
        }
        *count += 1;
        taken.insert(candidate.clone());
        out.push(candidate);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use raumbuch_core::ScalarValue;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_suffixes_repeats() {
        assert_eq!(
            disambiguate_labels(&labels(&["Laufnummer", "Breite", "Breite", "Höhe", "Breite"])),
            labels(&["Laufnummer", "Breite", "Breite_1", "Höhe", "Breite_2"])
        );
    }

    #[test]
    fn test_unique_labels_unchanged() {
        let unique = labels(&["a", "b", "c"]);
        assert_eq!(disambiguate_labels(&unique), unique);
        let once = disambiguate_labels(&labels(&["a", "a"]));
        assert_eq!(disambiguate_labels(&once), once);
    }

    #[test]
    fn test_skips_taken_suffix() {
        assert_eq!(
            disambiguate_labels(&labels(&["x", "x_1", "x"])),
            labels(&["x", "x_1", "x_2"])
        );
    }

    #[test]
    fn test_display_copy_is_independent() {
        let table = FinalTable {
            columns: labels(&["Breite", "Breite"]),
            rows: vec![vec![Some(ScalarValue::Real(1.0)), None]],
        };
        let mut display = disambiguate(&table);
        assert_eq!(display.columns, labels(&["Breite", "Breite_1"]));
        assert_eq!(display.rows, table.rows);

        display.rows[0][1] = Some(ScalarValue::Integer(2));
        assert_eq!(table.rows[0][1], None);
        assert_eq!(table.columns, labels(&["Breite", "Breite"]));
    }
}
