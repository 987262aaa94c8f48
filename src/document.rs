//! Rendered document – the visual tree the templates build and the layout
//! engine consumes. It only knows about sections, tables and text; all
//! report semantics have been resolved before it is built.

use crate::style::Role;

/// Which template produced a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    ServiceReport,
    SiteSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub kind: DocumentKind,
    pub title: String,
    pub blocks: Vec<Block>,
}

/// A top-to-bottom building block.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// A single run of text in the given role.
    Text { role: Role, text: String },
    /// Label/value pairs laid out `pairs_per_row` to a row.
    Fields {
        pairs_per_row: usize,
        pairs: Vec<(String, String)>,
    },
    Table(Table),
    /// Blocks placed side by side with equal widths.
    Columns(Vec<Block>),
    /// Items prefixed with `1.`, `2.`, …
    NumberedList(Vec<String>),
    Spacer(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub caption: Option<String>,
    pub headers: Vec<String>,
    /// Relative column widths; one per header.
    pub widths: Vec<f32>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub cells: Vec<String>,
    /// Render the first cell as a group label.
    pub grouped: bool,
}

impl Block {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Block::Text {
            role,
            text: text.into(),
        }
    }
}

impl Table {
    pub fn new(caption: Option<&str>, headers: &[&str], widths: &[f32]) -> Self {
        Self {
            caption: caption.map(str::to_string),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            widths: widths.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn row<S: Into<String>>(mut self, cells: impl IntoIterator<Item = S>) -> Self {
        self.push_row(cells, false);
        self
    }

    pub fn push_row<S: Into<String>>(&mut self, cells: impl IntoIterator<Item = S>, grouped: bool) {
        let mut cells: Vec<String> = cells.into_iter().map(Into::into).collect();
        cells.resize(self.headers.len().max(1), String::new());
        self.rows.push(TableRow { cells, grouped });
    }

    /// Column widths normalised to sum to 1.
    pub fn fractions(&self) -> Vec<f32> {
        let columns = self.headers.len().max(1);
        let widths: Vec<f32> = (0..columns)
            .map(|i| self.widths.get(i).copied().filter(|w| *w > 0.0).unwrap_or(1.0))
            .collect();
        let total: f32 = widths.iter().sum();
        widths.iter().map(|w| w / total).collect()
    }
}

impl RenderedDocument {
    pub fn new(kind: DocumentKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Every table in document order, including those inside columns.
    pub fn tables(&self) -> Vec<&Table> {
        fn collect<'a>(blocks: &'a [Block], out: &mut Vec<&'a Table>) {
            for block in blocks {
                match block {
                    Block::Table(t) => out.push(t),
                    Block::Columns(inner) => collect(inner, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.blocks, &mut out);
        out
    }

    /// Look a table up by its caption.
    pub fn table(&self, caption: &str) -> Option<&Table> {
        self.tables()
            .into_iter()
            .find(|t| t.caption.as_deref() == Some(caption))
    }

    /// All visible strings, in document order.
    pub fn text_content(&self) -> Vec<&str> {
        fn collect<'a>(blocks: &'a [Block], out: &mut Vec<&'a str>) {
            for block in blocks {
                match block {
                    Block::Text { text, .. } => out.push(text),
                    Block::Fields { pairs, .. } => {
                        for (label, value) in pairs {
                            out.push(label);
                            out.push(value);
                        }
                    }
                    Block::Table(t) => {
                        out.extend(t.caption.as_deref());
                        out.extend(t.headers.iter().map(String::as_str));
                        for row in &t.rows {
                            out.extend(row.cells.iter().map(String::as_str));
                        }
                    }
                    Block::Columns(inner) => collect(inner, out),
                    Block::NumberedList(items) => out.extend(items.iter().map(String::as_str)),
                    Block::Spacer(_) => {}
                }
            }
        }
        let mut out = vec![self.title.as_str()];
        collect(&self.blocks, &mut out);
        out
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.text_content().iter().any(|s| s.contains(needle))
    }
}
