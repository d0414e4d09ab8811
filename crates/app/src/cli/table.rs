use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Rows},
};

/// A bordered table with a header row.
pub(crate) fn grid<H, R>(header: H, rows: R) -> String
where
    H: IntoIterator,
    H::Item: Into<String>,
    R: IntoIterator<Item = Vec<String>>,
{
    let mut builder = Builder::default();

    builder.push_record(header.into_iter().map(Into::<String>::into));

    for row in rows {
        builder.push_record(row);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Rows::first(), Alignment::center());

    table.to_string()
}

/// A two-column table of labelled values.
pub(crate) fn fields<I>(fields: I) -> String
where
    I: IntoIterator<Item = (&'static str, String)>,
{
    let mut builder = Builder::default();

    for (label, value) in fields {
        builder.push_record([label.to_string(), value]);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());

    table.to_string()
}

pub(crate) fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grids_keep_every_cell() {
        let table = grid(
            ["Kind", "Title"],
            [vec!["automatic".to_string(), "Spring".to_string()]],
        );

        assert!(table.contains("Kind"));
        assert!(table.contains("automatic"));
        assert!(table.contains("Spring"));
        assert!(table.starts_with('╭'));
    }

    #[test]
    fn fields_render_label_value_pairs() {
        let table = fields([("Settled", yes_no(true)), ("Remaining", "0".to_string())]);

        assert!(table.contains("Settled"));
        assert!(table.contains("yes"));
        assert!(table.contains("Remaining"));
    }
}
