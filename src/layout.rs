//! Layout engine – uses Taffy to compute flexbox layout for a rendered
//! document, then converts the result into a tree of positioned boxes.
//!
//! All coordinates are in points at the fixed logical page width; the
//! rasterizer scales them by its oversampling factor.

use std::collections::HashMap;
use taffy::prelude::*;

use crate::document::{Block, RenderedDocument, Table};
use crate::error::{ExportError, ExportResult};
use crate::fonts::{wrap_text, FontManager};
use crate::style::{BoxStyle, Role};

/// Horizontal space between side-by-side columns.
const COLUMN_GAP: f32 = 8.0;
/// Space after every table or field grid.
const TABLE_SPACING: f32 = 2.0;

/// A positioned box in document coordinates.
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: BoxStyle,
    pub content: BoxContent,
    pub children: Vec<PositionedBox>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoxContent {
    None,
    /// Pre-wrapped lines, drawn from the top of the box.
    Text { lines: Vec<String> },
}

/// The laid-out document: one tall page-width strip.
#[derive(Debug, Clone)]
pub struct DocumentLayout {
    /// Full width including margins, in points.
    pub width: f32,
    /// Full height including margins, in points.
    pub height: f32,
    pub boxes: Vec<PositionedBox>,
}


fn taffy_err(e: taffy::TaffyError) -> ExportError {
    ExportError::Rasterization(format!("layout failed: {e}"))
}

// ---------------------------------------------------------------------------
// Build Taffy tree from document blocks
// ---------------------------------------------------------------------------

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    fonts: &'a FontManager,
    node_styles: HashMap<NodeId, BoxStyle>,
    node_content: HashMap<NodeId, BoxContent>,
}

impl<'a> LayoutBuilder<'a> {
    fn new(fonts: &'a FontManager) -> Self {
        Self {
            taffy: TaffyTree::new(),
            fonts,
            node_styles: HashMap::new(),
            node_content: HashMap::new(),
        }
    }

    /// A fixed-size leaf holding wrapped text. Padding is folded into the
    /// leaf size; the painter insets the text by the same amount.
    fn text_leaf(&mut self, text: &str, style: BoxStyle, width: f32) -> ExportResult<NodeId> {
        let inner = (width - 2.0 * style.padding).max(1.0);
        let lines = wrap_text(text.trim(), style.font_size, style.bold, inner, self.fonts);
        let line_height = self.fonts.line_height_px(style.font_size, style.line_height);
        let height = lines.len() as f32 * line_height + 2.0 * style.padding;

        let node = self
            .taffy
            .new_leaf(Style {
                size: Size {
                    width: Dimension::Length(width),
                    height: Dimension::Length(height),
                },
                flex_shrink: 0.0,
                margin: vertical_margin(&style),
                ..Default::default()
            })
            .map_err(taffy_err)?;
        self.node_styles.insert(node, style);
        self.node_content.insert(node, BoxContent::Text { lines });
        Ok(node)
    }

    /// A bordered table cell. The cell stretches to the row height; its text
    /// leaf keeps the natural height.
    fn cell(&mut self, text: &str, role: Role, width: f32) -> ExportResult<NodeId> {
        let cell_style = role.style();
        let text_style = BoxStyle {
            background: None,
            border: None,
            margin_top: 0.0,
            margin_bottom: 0.0,
            ..cell_style.clone()
        };
        let leaf = self.text_leaf(text, text_style, width)?;
        let node = self
            .taffy
            .new_with_children(
                Style {
                    display: Display::Flex,
                    flex_direction: FlexDirection::Column,
                    flex_shrink: 0.0,
                    size: Size {
                        width: Dimension::Length(width),
                        height: Dimension::Auto,
                    },
                    ..Default::default()
                },
                &[leaf],
            )
            .map_err(taffy_err)?;
        self.node_styles.insert(
            node,
            BoxStyle {
                padding: 0.0,
                ..cell_style
            },
        );
        Ok(node)
    }

    fn row(&mut self, cells: &[NodeId]) -> ExportResult<NodeId> {
        self.taffy
            .new_with_children(
                Style {
                    display: Display::Flex,
                    flex_direction: FlexDirection::Row,
                    align_items: Some(AlignItems::Stretch),
                    flex_shrink: 0.0,
                    ..Default::default()
                },
                cells,
            )
            .map_err(taffy_err)
    }

    fn column(
        &mut self,
        children: &[NodeId],
        width: f32,
        margin_bottom: f32,
    ) -> ExportResult<NodeId> {
        self.taffy
            .new_with_children(
                Style {
                    display: Display::Flex,
                    flex_direction: FlexDirection::Column,
                    flex_shrink: 0.0,
                    size: Size {
                        width: Dimension::Length(width),
                        height: Dimension::Auto,
                    },
                    margin: Rect {
                        top: LengthPercentageAuto::Length(0.0),
                        right: LengthPercentageAuto::Length(0.0),
                        bottom: LengthPercentageAuto::Length(margin_bottom),
                        left: LengthPercentageAuto::Length(0.0),
                    },
                    ..Default::default()
                },
                children,
            )
            .map_err(taffy_err)
    }

    fn build_block(&mut self, block: &Block, width: f32) -> ExportResult<NodeId> {
        match block {
            Block::Text { role, text } => self.text_leaf(text, role.style(), width),
            Block::Fields {
                pairs_per_row,
                pairs,
            } => self.build_fields(pairs, (*pairs_per_row).max(1), width),
            Block::Table(table) => self.build_table(table, width),
            Block::Columns(blocks) => self.build_columns(blocks, width),
            Block::NumberedList(items) => {
                let mut children = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let text = format!("{}. {}", i + 1, item);
                    children.push(self.text_leaf(&text, Role::ListItem.style(), width)?);
                }
                self.column(&children, width, TABLE_SPACING)
            }
            Block::Spacer(height) => self
                .taffy
                .new_leaf(Style {
                    size: Size {
                        width: Dimension::Length(width),
                        height: Dimension::Length(height.max(0.0)),
                    },
                    flex_shrink: 0.0,
                    ..Default::default()
                })
                .map_err(taffy_err),
        }
    }

    fn build_fields(
        &mut self,
        pairs: &[(String, String)],
        per_row: usize,
        width: f32,
    ) -> ExportResult<NodeId> {
        let pair_width = width / per_row as f32;
        let label_width = pair_width * 0.4;
        let mut rows = Vec::new();
        for chunk in pairs.chunks(per_row) {
            let mut cells = Vec::with_capacity(per_row * 2);
            for (label, value) in chunk {
                cells.push(self.cell(label, Role::FieldLabel, label_width)?);
                cells.push(self.cell(value, Role::FieldValue, pair_width - label_width)?);
            }
            // Short last row keeps the grid aligned.
            for _ in chunk.len()..per_row {
                cells.push(self.cell("", Role::FieldLabel, label_width)?);
                cells.push(self.cell("", Role::FieldValue, pair_width - label_width)?);
            }
            rows.push(self.row(&cells)?);
        }
        self.column(&rows, width, TABLE_SPACING)
    }

    fn build_table(&mut self, table: &Table, width: f32) -> ExportResult<NodeId> {
        let widths: Vec<f32> = table.fractions().iter().map(|f| f * width).collect();
        let mut children = Vec::with_capacity(table.rows.len() + 2);

        if let Some(caption) = &table.caption {
            children.push(self.text_leaf(caption, Role::Caption.style(), width)?);
        }

        let mut header = Vec::with_capacity(widths.len());
        for (text, w) in table.headers.iter().zip(&widths) {
            header.push(self.cell(text, Role::TableHeader, *w)?);
        }
        children.push(self.row(&header)?);

        for row in &table.rows {
            let mut cells = Vec::with_capacity(widths.len());
            for (i, (text, w)) in row.cells.iter().zip(&widths).enumerate() {
                let role = if row.grouped && i == 0 {
                    Role::GroupLabel
                } else {
                    Role::TableCell
                };
                cells.push(self.cell(text, role, *w)?);
            }
            children.push(self.row(&cells)?);
        }

        self.column(&children, width, TABLE_SPACING)
    }

    fn build_columns(&mut self, blocks: &[Block], width: f32) -> ExportResult<NodeId> {
        let n = blocks.len().max(1);
        let child_width = (width - COLUMN_GAP * (n - 1) as f32) / n as f32;
        let mut children = Vec::with_capacity(n);
        for block in blocks {
            let inner = self.build_block(block, child_width)?;
            children.push(self.column(&[inner], child_width, 0.0)?);
        }
        self.taffy
            .new_with_children(
                Style {
                    display: Display::Flex,
                    flex_direction: FlexDirection::Row,
                    align_items: Some(AlignItems::Start),
                    flex_shrink: 0.0,
                    gap: Size {
                        width: LengthPercentage::Length(COLUMN_GAP),
                        height: LengthPercentage::Length(0.0),
                    },
                    ..Default::default()
                },
                &children,
            )
            .map_err(taffy_err)
    }

    /// Extract positioned boxes after layout computation.
    fn extract(&self, node: NodeId, offset_x: f32, offset_y: f32) -> ExportResult<PositionedBox> {
        let layout = self.taffy.layout(node).map_err(taffy_err)?;
        let style = self.node_styles.get(&node).cloned().unwrap_or_default();
        let content = self
            .node_content
            .get(&node)
            .cloned()
            .unwrap_or(BoxContent::None);

        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;

        let children = self
            .taffy
            .children(node)
            .map_err(taffy_err)?
            .into_iter()
            .map(|child| self.extract(child, x, y))
            .collect::<ExportResult<Vec<_>>>()?;

        Ok(PositionedBox {
            x,
            y,
            width: layout.size.width,
            height: layout.size.height,
            style,
            content,
            children,
        })
    }
}

fn vertical_margin(style: &BoxStyle) -> Rect<LengthPercentageAuto> {
    Rect {
        top: LengthPercentageAuto::Length(style.margin_top),
        right: LengthPercentageAuto::Length(0.0),
        bottom: LengthPercentageAuto::Length(style.margin_bottom),
        left: LengthPercentageAuto::Length(0.0),
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Lay a document out at `page_width` points with `margin` on every side.
pub fn compute_layout(
    document: &RenderedDocument,
    page_width: f32,
    margin: f32,
    fonts: &FontManager,
) -> ExportResult<DocumentLayout> {
    let content_width = page_width - 2.0 * margin;
    if content_width <= 0.0 {
        return Err(ExportError::Rasterization(format!(
            "page width {page_width} pt leaves no room inside {margin} pt margins"
        )));
    }

    let mut builder = LayoutBuilder::new(fonts);
    let child_ids = document
        .blocks
        .iter()
        .map(|block| builder.build_block(block, content_width))
        .collect::<ExportResult<Vec<_>>>()?;

    let root = builder
        .taffy
        .new_with_children(
            Style {
                display: Display::Flex,
                flex_direction: FlexDirection::Column,
                size: Size {
                    width: Dimension::Length(content_width),
                    height: Dimension::Auto,
                },
                ..Default::default()
            },
            &child_ids,
        )
        .map_err(taffy_err)?;

    builder
        .taffy
        .compute_layout(
            root,
            Size {
                width: AvailableSpace::Definite(content_width),
                height: AvailableSpace::MaxContent,
            },
        )
        .map_err(taffy_err)?;

    let root_box = builder.extract(root, margin, margin)?;
    log::debug!(
        "laid out '{}': {:.1} pt tall, {} top-level boxes",
        document.title,
        root_box.height,
        root_box.children.len()
    );
    Ok(DocumentLayout {
        width: page_width,
        height: root_box.height + 2.0 * margin,
        boxes: root_box.children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentKind, Table};

    fn doc(blocks: Vec<Block>) -> RenderedDocument {
        RenderedDocument {
            kind: DocumentKind::ServiceReport,
            title: "t".to_string(),
            blocks,
        }
    }

    #[test]
    fn layout_simple_text() {
        let fonts = FontManager::default();
        let layout = compute_layout(
            &doc(vec![Block::text(Role::Body, "Hello world")]),
            595.0,
            28.0,
            &fonts,
        )
        .unwrap();
        assert_eq!(layout.boxes.len(), 1);
        let first = &layout.boxes[0];
        assert!((first.x - 28.0).abs() < 0.01);
        assert!(first.height > 0.0);
        assert!(layout.height > first.height);
    }

    #[test]
    fn blocks_stack_vertically() {
        let fonts = FontManager::default();
        let layout = compute_layout(
            &doc(vec![
                Block::text(Role::Body, "one"),
                Block::Spacer(20.0),
                Block::text(Role::Body, "two"),
            ]),
            595.0,
            28.0,
            &fonts,
        )
        .unwrap();
        let ys: Vec<f32> = layout.boxes.iter().map(|b| b.y).collect();
        assert!(ys[0] < ys[1] && ys[1] < ys[2]);
        assert!(ys[2] - ys[1] >= 20.0);
    }

    #[test]
    fn table_cells_share_row_height() {
        let fonts = FontManager::default();
        let table = Table::new(None, &["A", "B"], &[1.0, 1.0])
            .row(["short", "a much longer cell that has to wrap onto several lines"]);
        let layout = compute_layout(&doc(vec![Block::Table(table)]), 300.0, 10.0, &fonts).unwrap();
        let data_row = &layout.boxes[0].children[1];
        let heights: Vec<f32> = data_row.children.iter().map(|c| c.height).collect();
        assert_eq!(heights.len(), 2);
        assert!((heights[0] - heights[1]).abs() < 0.01);
    }

    #[test]
    fn columns_sit_side_by_side() {
        let fonts = FontManager::default();
        let left = Block::Table(Table::new(Some("L"), &["a"], &[]).row(["1"]));
        let right = Block::Table(Table::new(Some("R"), &["b"], &[]).row(["2"]));
        let layout =
            compute_layout(&doc(vec![Block::Columns(vec![left, right])]), 595.0, 28.0, &fonts)
                .unwrap();
        let cols = &layout.boxes[0].children;
        assert_eq!(cols.len(), 2);
        assert!((cols[0].y - cols[1].y).abs() < 0.01);
        assert!(cols[1].x > cols[0].x + cols[0].width);
    }

    #[test]
    fn margins_wider_than_page_fail() {
        let fonts = FontManager::default();
        assert!(compute_layout(&doc(vec![]), 40.0, 30.0, &fonts).is_err());
    }
}
