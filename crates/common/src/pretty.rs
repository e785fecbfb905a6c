use crate::PageNumber;
use tabled::{Table, builder::Builder, settings};

/// Predefined output styles that map to `tabled` styles.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TableStyleKind {
    #[default]
    Modern,
    Ascii,
    Plain,
}

impl TableStyleKind {
    fn apply(self, table: &mut Table) {
        match self {
            Self::Modern => table.with(settings::Style::modern()),
            Self::Ascii => table.with(settings::Style::ascii()),
            Self::Plain => table.with(settings::Style::empty()),
        };
    }
}

/// Render a buffer pool's per-frame statistics as a human-friendly table.
///
/// `frame_ids`, `dirty`, and `fix_counts` must have equal length (one entry
/// per frame, in frame index order) — the shape `get_frame_contents` /
/// `get_dirty_flags` / `get_fix_counts` already return.
pub fn render_frame_table(
    frame_ids: &[PageNumber],
    dirty: &[bool],
    fix_counts: &[i32],
    style: TableStyleKind,
) -> String {
    if frame_ids.is_empty() {
        return "<empty>".into();
    }

    let mut builder = Builder::default();
    builder.push_record(["frame", "page", "dirty", "pins"]);

    for (i, ((page, is_dirty), pins)) in frame_ids
        .iter()
        .zip(dirty.iter())
        .zip(fix_counts.iter())
        .enumerate()
    {
        builder.push_record([
            i.to_string(),
            page.to_string(),
            is_dirty.to_string(),
            pins.to_string(),
        ]);
    }

    let mut table = builder.build();
    style.apply(&mut table);
    table.to_string()
}

/// Render arbitrary string rows with the provided style.
pub fn render_string_table(
    headers: &[&str],
    rows: Vec<Vec<String>>,
    style: TableStyleKind,
) -> String {
    if headers.is_empty() && rows.is_empty() {
        return "<empty>".into();
    }

    let mut builder = Builder::default();

    if !headers.is_empty() {
        builder.push_record(headers.iter().copied());
    }

    for row in rows {
        builder.push_record(row);
    }

    let mut table = builder.build();
    style.apply(&mut table);
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_table_lists_one_row_per_frame() {
        let rendered =
            render_frame_table(&[4, -1, 3], &[true, false, false], &[0, 0, 1], TableStyleKind::Plain);
        assert!(rendered.contains("frame"));
        assert!(rendered.contains('4'));
        assert!(rendered.contains("-1"));
    }

    #[test]
    fn empty_pool_renders_placeholder() {
        assert_eq!(
            render_frame_table(&[], &[], &[], TableStyleKind::Plain),
            "<empty>"
        );
    }

    #[test]
    fn string_table_renders_headers_and_rows() {
        let rendered = render_string_table(
            &["a", "b"],
            vec![vec!["1".into(), "2".into()]],
            TableStyleKind::Ascii,
        );
        assert!(rendered.contains('a'));
        assert!(rendered.contains('1'));
    }
}
