//! Employee x course pivot over a consolidated dataset.

use std::collections::{HashMap, HashSet};

use polars::prelude::{Column, DataFrame};
use tracing::debug;

use crate::conf::{
    C_COL_COURSE_NAME, C_COL_EMPLOYEE_NAME, C_COL_OFFICE, C_COL_TOTAL_COURSES, C_ROW_LABEL_TOTAL,
};
use crate::normalize::normalize_header_names;
use crate::spec::{
    EnumAxisOrder, EnumPivotValueRule, Result, SpecPivotOptions, SpecPivotRow, SpecPivotTable,
};
use crate::util::derive_column_texts;

#[derive(Debug, Default)]
struct SpecPivotCell {
    n_rows: i64,
    set_values: HashSet<String>,
}

/// Keys and labels in first-seen order with an index lookup.
#[derive(Debug)]
struct SpecAxis<T> {
    l_items: Vec<T>,
    dict_pos: HashMap<T, usize>,
}

impl<T: Clone + Eq + std::hash::Hash + Ord> SpecAxis<T> {
    fn new() -> Self {
        Self {
            l_items: Vec::new(),
            dict_pos: HashMap::new(),
        }
    }

    fn intern(&mut self, item: T) -> usize {
        if let Some(n_pos) = self.dict_pos.get(&item) {
            return *n_pos;
        }
        let n_pos = self.l_items.len();
        self.dict_pos.insert(item.clone(), n_pos);
        self.l_items.push(item);
        n_pos
    }

    /// Item positions in output order.
    fn derive_order(&self, rule_order: EnumAxisOrder) -> Vec<usize> {
        let mut l_order = (0..self.l_items.len()).collect::<Vec<_>>();
        if rule_order == EnumAxisOrder::Sorted {
            l_order.sort_by(|a, b| self.l_items[*a].cmp(&self.l_items[*b]));
        }
        l_order
    }
}

fn trim_present(cell: Option<&String>) -> Option<String> {
    let c_value = cell?.trim();
    (!c_value.is_empty()).then(|| c_value.to_string())
}

/// Reshape a consolidated dataset into an employee x course count matrix.
///
/// Rows missing any key part or the course label are dropped. Absent
/// `(key, course)` pairs are zero.
pub fn build_pivot(df: &DataFrame, options: &SpecPivotOptions) -> Result<SpecPivotTable> {
    let mut l_key_columns = vec![C_COL_EMPLOYEE_NAME.to_string()];
    if options.if_group_by_office && df.column(C_COL_OFFICE).is_ok() {
        l_key_columns.push(C_COL_OFFICE.to_string());
    }

    let l_key_texts = l_key_columns
        .iter()
        .map(|c_col| derive_column_texts(df, c_col))
        .collect::<Result<Vec<_>>>()?;
    let l_course_texts = derive_column_texts(df, C_COL_COURSE_NAME)?;
    let l_value_texts = match &options.rule_value {
        EnumPivotValueRule::RowCount => None,
        EnumPivotValueRule::DistinctCount(c_col) => Some(derive_column_texts(df, c_col)?),
    };

    let mut axis_keys: SpecAxis<Vec<String>> = SpecAxis::new();
    let mut axis_courses: SpecAxis<String> = SpecAxis::new();
    let mut dict_cells: HashMap<(usize, usize), SpecPivotCell> = HashMap::new();
    let mut n_rows_dropped = 0_usize;

    for n_idx_row in 0..df.height() {
        let keys = l_key_texts
            .iter()
            .map(|l_texts| trim_present(l_texts[n_idx_row].as_ref()))
            .collect::<Option<Vec<_>>>();
        let course = trim_present(l_course_texts[n_idx_row].as_ref());
        let (Some(keys), Some(course)) = (keys, course) else {
            n_rows_dropped += 1;
            continue;
        };

        let n_pos_key = axis_keys.intern(keys);
        let n_pos_course = axis_courses.intern(course);
        let cell = dict_cells.entry((n_pos_key, n_pos_course)).or_default();
        cell.n_rows += 1;
        if let Some(l_values) = &l_value_texts
            && let Some(c_value) = trim_present(l_values[n_idx_row].as_ref())
        {
            cell.set_values.insert(c_value);
        }
    }

    let derive_value = |cell: &SpecPivotCell| match options.rule_value {
        EnumPivotValueRule::RowCount => cell.n_rows,
        EnumPivotValueRule::DistinctCount(_) => cell.set_values.len() as i64,
    };

    let l_order_courses = axis_courses.derive_order(options.rule_order);
    let rows = axis_keys
        .derive_order(options.rule_order)
        .into_iter()
        .map(|n_pos_key| {
            let counts = l_order_courses
                .iter()
                .map(|n_pos_course| {
                    dict_cells
                        .get(&(n_pos_key, *n_pos_course))
                        .map_or(0, &derive_value)
                })
                .collect::<Vec<_>>();
            SpecPivotRow {
                keys: axis_keys.l_items[n_pos_key].clone(),
                total: counts.iter().sum(),
                counts,
            }
        })
        .collect::<Vec<SpecPivotRow>>();

    let total_row = options.if_total_row.then(|| {
        let counts = (0..l_order_courses.len())
            .map(|n_idx_course| rows.iter().map(|row| row.counts[n_idx_course]).sum())
            .collect::<Vec<i64>>();
        let mut keys = vec![String::new(); l_key_columns.len()];
        keys[0] = C_ROW_LABEL_TOTAL.to_string();
        SpecPivotRow {
            keys,
            total: counts.iter().sum(),
            counts,
        }
    });

    debug!(
        n_rows = rows.len(),
        n_courses = l_order_courses.len(),
        n_rows_dropped,
        "Built pivot"
    );

    Ok(SpecPivotTable {
        key_columns: l_key_columns,
        course_columns: l_order_courses
            .into_iter()
            .map(|n_pos| axis_courses.l_items[n_pos].clone())
            .collect(),
        rows,
        total_row,
    })
}

impl SpecPivotTable {
    /// Output headers: keys, courses, then `Total Courses`, made unique.
    pub fn headers(&self) -> Vec<String> {
        let l_headers = self
            .key_columns
            .iter()
            .chain(&self.course_columns)
            .cloned()
            .chain(std::iter::once(C_COL_TOTAL_COURSES.to_string()))
            .collect::<Vec<_>>();
        normalize_header_names(&l_headers)
    }

    /// Body rows followed by the total row, if any.
    pub fn all_rows(&self) -> impl Iterator<Item = &SpecPivotRow> {
        self.rows.iter().chain(self.total_row.as_ref())
    }

    /// Materialize as a dataset with text keys and integer counts.
    ///
    /// Empty key cells of the total row are missing values.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let l_headers = self.headers();
        let n_keys = self.key_columns.len();
        let mut l_cols = Vec::with_capacity(l_headers.len());

        for (n_idx_key, c_header) in l_headers[..n_keys].iter().enumerate() {
            let l_cells = self
                .all_rows()
                .map(|row| Some(row.keys[n_idx_key].clone()).filter(|c| !c.is_empty()))
                .collect::<Vec<_>>();
            l_cols.push(Column::new(c_header.as_str().into(), l_cells));
        }
        for (n_idx_course, c_header) in l_headers[n_keys..n_keys + self.course_columns.len()]
            .iter()
            .enumerate()
        {
            let l_counts = self
                .all_rows()
                .map(|row| row.counts[n_idx_course])
                .collect::<Vec<i64>>();
            l_cols.push(Column::new(c_header.as_str().into(), l_counts));
        }
        if let Some(c_header) = l_headers.last() {
            let l_totals = self.all_rows().map(|row| row.total).collect::<Vec<i64>>();
            l_cols.push(Column::new(c_header.as_str().into(), l_totals));
        }

        Ok(DataFrame::new(l_cols)?)
    }
}
