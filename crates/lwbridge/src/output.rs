//! Rendering of command results for `--output`.
//!
//! Structured formats serialize the result itself; `table` and `plain`
//! are derived from it per command (a row type, a key per item).

use std::io::{self, Write};

use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::OutputFormat;

/// Render a list of results. `row` builds the table row, `key` the
/// single `plain` line for an item (an address, an attribute name).
pub fn list<T, R>(
    format: &OutputFormat,
    items: &[T],
    row: impl Fn(&T) -> R,
    key: impl Fn(&T) -> String,
) -> String
where
    T: Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = items.iter().map(row).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Plain => items.iter().map(key).collect::<Vec<_>>().join("\n"),
        structured => serialize(structured, items),
    }
}

/// Render one result. `summary` is the human-readable `table` view.
pub fn detail<T: Serialize>(
    format: &OutputFormat,
    item: &T,
    summary: impl FnOnce(&T) -> String,
    key: impl FnOnce(&T) -> String,
) -> String {
    match format {
        OutputFormat::Table => summary(item),
        OutputFormat::Plain => key(item),
        structured => serialize(structured, item),
    }
}

/// Write rendered output to stdout unless `--quiet` or there is nothing to show.
pub fn emit(rendered: &str, quiet: bool) {
    if quiet || rendered.is_empty() {
        return;
    }
    // A closed pipe (`lwbridge plan ... | head`) is not an error.
    let _ = writeln!(io::stdout().lock(), "{rendered}");
}

fn serialize<T: Serialize + ?Sized>(format: &OutputFormat, data: &T) -> String {
    let rendered = match format {
        OutputFormat::JsonCompact => serde_json::to_string(data).map_err(|e| e.to_string()),
        OutputFormat::Yaml => serde_yaml::to_string(data).map_err(|e| e.to_string()),
        _ => serde_json::to_string_pretty(data).map_err(|e| e.to_string()),
    };
    rendered.unwrap_or_else(|e| format!("<serialization failed: {e}>"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Resolved {
        attribute: &'static str,
        address: &'static str,
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Attribute")]
        attribute: &'static str,
        #[tabled(rename = "Resource")]
        address: &'static str,
    }

    fn resolved() -> Vec<Resolved> {
        vec![
            Resolved {
                attribute: "Battery",
                address: "/7392/0/1",
            },
            Resolved {
                attribute: "Position",
                address: "/7392/0/2",
            },
        ]
    }

    fn render(format: &OutputFormat) -> String {
        list(
            format,
            &resolved(),
            |r| Row {
                attribute: r.attribute,
                address: r.address,
            },
            |r| r.address.to_owned(),
        )
    }

    #[test]
    fn plain_lists_one_address_per_line() {
        assert_eq!(render(&OutputFormat::Plain), "/7392/0/1\n/7392/0/2");
    }

    #[test]
    fn compact_json_is_single_line() {
        assert_eq!(
            render(&OutputFormat::JsonCompact),
            r#"[{"attribute":"Battery","address":"/7392/0/1"},{"attribute":"Position","address":"/7392/0/2"}]"#
        );
    }

    #[test]
    fn table_has_headers_and_rows() {
        let out = render(&OutputFormat::Table);
        assert!(out.contains("Resource"));
        assert!(out.contains("/7392/0/2"));
    }

    #[test]
    fn yaml_detail_serializes_the_item() {
        let items = resolved();
        let out = detail(&OutputFormat::Yaml, &items[0], |_| String::new(), |_| String::new());
        assert_eq!(out, "attribute: Battery\naddress: /7392/0/1\n");
    }
}
