//! Shared fixtures for unit tests.
use crate::grid::MergeRange;
use crate::normalize::RawTable;

/// Enrollment table with a two-level header: "本科生情况" spans "新生人数" and "毕业生人数",
/// the remaining header cells span both header rows.
pub(crate) fn enrollment_table() -> RawTable {
    RawTable::from_rows(
        "table_0",
        [
            ["学校名称", "年度", "本科生情况", "", "备注"],
            ["", "", "新生人数", "毕业生人数", ""],
            ["清华大学", "2021", "3500", "3200", "新校区"],
            ["北京大学", "2021", "3400", "3100", "扩招"],
            ["清华大学", "2022", "3600", "3300", ""],
            ["北京大学", "2022", "3500", "3250", ""],
        ],
    )
    .with_merge(MergeRange::new(0, 0, 1, 0))
    .with_merge(MergeRange::new(0, 1, 1, 1))
    .with_merge(MergeRange::new(0, 2, 0, 3))
    .with_merge(MergeRange::new(0, 4, 1, 4))
}
