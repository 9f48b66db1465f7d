//! Bill of materials projected from a layout.

use std::fmt;
use std::io::Write;
use std::path::Path;

use hashbrown::HashMap;

use pipe_layout::LayoutResult;
use pipe_types::{PipingError, PipingResult, PlacementRole};

/// One line of the bill: every placement sharing a part number and role.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BomItem {
    /// Catalog part number.
    pub part_number: String,
    /// Part description.
    pub description: String,
    /// Role of the grouped placements.
    pub role: PlacementRole,
    /// Total quantity.
    pub quantity: u32,
    /// Tags of the grouped placements, in layout order.
    pub tags: Vec<String>,
}

/// Flat bill of materials for one assembly.
///
/// # Example
///
/// ```
/// use pipe_layout::LayoutResult;
/// use pipe_synth::BillOfMaterials;
///
/// let bom = BillOfMaterials::from_layout("empty", &LayoutResult::default());
/// assert!(bom.is_empty());
/// assert_eq!(bom.total_quantity(), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BillOfMaterials {
    /// Assembly name.
    pub name: String,
    /// Items in first-placed order.
    pub items: Vec<BomItem>,
}

impl BillOfMaterials {
    /// Groups the layout's placements by part number and role.
    #[must_use]
    pub fn from_layout(name: impl Into<String>, layout: &LayoutResult) -> Self {
        let mut index: HashMap<(&str, PlacementRole), usize> = HashMap::new();
        let mut items: Vec<BomItem> = Vec::new();

        for placement in &layout.placements {
            let key = (placement.part_number.as_str(), placement.role);
            if let Some(&i) = index.get(&key) {
                items[i].quantity += placement.quantity;
                items[i].tags.push(placement.tag.clone());
            } else {
                index.insert(key, items.len());
                items.push(BomItem {
                    part_number: placement.part_number.clone(),
                    description: placement.description.clone(),
                    role: placement.role,
                    quantity: placement.quantity,
                    tags: vec![placement.tag.clone()],
                });
            }
        }

        Self {
            name: name.into(),
            items,
        }
    }

    /// Returns `true` if the bill has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Finds the first item with the given part number.
    #[must_use]
    pub fn item(&self, part_number: &str) -> Option<&BomItem> {
        self.items.iter().find(|item| item.part_number == part_number)
    }

    /// Total quantity of items with the given role.
    #[must_use]
    pub fn quantity_of(&self, role: PlacementRole) -> u32 {
        self.items
            .iter()
            .filter(|item| item.role == role)
            .map(|item| item.quantity)
            .sum()
    }

    /// Writes the bill as CSV.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    pub fn write_csv<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "Part Number,Description,Role,Quantity,Tags")?;
        for item in &self.items {
            writeln!(
                writer,
                "{},{},{},{},{}",
                escape_csv(&item.part_number),
                escape_csv(&item.description),
                item.role,
                item.quantity,
                escape_csv(&item.tags.join(" ")),
            )?;
        }
        Ok(())
    }

    /// Exports the bill to a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`PipingError::Io`] if the file cannot be created or written.
    pub fn export_csv(&self, path: &Path) -> PipingResult<()> {
        use std::fs::File;

        let io_error = |source| PipingError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_error)?;
        let mut writer = std::io::BufWriter::new(file);
        self.write_csv(&mut writer).map_err(io_error)?;
        writer.flush().map_err(io_error)
    }
}

impl fmt::Display for BillOfMaterials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BOM {} ({} items)", self.name, self.items.len())?;
        for item in &self.items {
            writeln!(
                f,
                "  {:>4} x {} [{}] {}",
                item.quantity, item.part_number, item.role, item.description
            )?;
        }
        Ok(())
    }
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};
    use pipe_types::{Envelope, Family, NodeId, PartAttributes, Placement, PlacementId};

    fn placement(id: usize, tag: &str, part: &str, role: PlacementRole) -> Placement {
        Placement {
            id: PlacementId(id),
            tag: tag.to_string(),
            part_number: part.to_string(),
            description: format!("{part} desc"),
            attributes: PartAttributes::new(Family::Valve),
            node: NodeId(0),
            position: Point3::origin(),
            design_position: Point3::origin(),
            rotation_deg: 0.0,
            axis: Vector3::x(),
            envelope: Envelope::from_center(Point3::origin(), Vector3::new(1.0, 1.0, 1.0)),
            role,
            connection: None,
            bend_angle_deg: None,
            quantity: 1,
        }
    }

    fn layout() -> LayoutResult {
        LayoutResult {
            placements: vec![
                placement(0, "V-1", "VLV-50", PlacementRole::Main),
                placement(1, "c0-B1", "BLT-M16", PlacementRole::Fastener),
                placement(2, "c0-B2", "BLT-M16", PlacementRole::Fastener),
                placement(3, "V-2", "VLV-50", PlacementRole::Main),
                placement(4, "c0-G", "GSK-50", PlacementRole::Seal),
            ],
            ..LayoutResult::default()
        }
    }

    // ==== Grouping Tests ====

    #[test]
    fn test_groups_by_part_and_role() {
        let bom = BillOfMaterials::from_layout("line", &layout());
        assert_eq!(bom.items.len(), 3);
        assert_eq!(bom.items[0].part_number, "VLV-50");
        assert_eq!(bom.items[0].quantity, 2);
        assert_eq!(bom.items[0].tags, vec!["V-1", "V-2"]);
        assert_eq!(bom.items[1].part_number, "BLT-M16");
        assert_eq!(bom.total_quantity(), 5);
        assert_eq!(bom.quantity_of(PlacementRole::Fastener), 2);
        assert_eq!(bom.quantity_of(PlacementRole::Fitting), 0);
        assert_eq!(bom.item("GSK-50").unwrap().role, PlacementRole::Seal);
        assert!(bom.item("NOPE").is_none());
    }

    #[test]
    fn test_same_part_number_different_role_split() {
        let mut layout = layout();
        layout.placements[4].part_number = "VLV-50".to_string();
        let bom = BillOfMaterials::from_layout("line", &layout);
        assert_eq!(bom.items.len(), 3);
        assert_eq!(bom.items[2].role, PlacementRole::Seal);
    }

    // ==== CSV Tests ====

    #[test]
    fn test_write_csv() {
        let bom = BillOfMaterials::from_layout("line", &layout());
        let mut out = Vec::new();
        bom.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Part Number,Description,Role,Quantity,Tags");
        assert_eq!(lines[1], "VLV-50,VLV-50 desc,main,2,V-1 V-2");
    }

    #[test]
    fn test_export_csv_to_missing_directory_fails() {
        let bom = BillOfMaterials::from_layout("line", &layout());
        let err = bom
            .export_csv(Path::new("/nonexistent-dir/for/bom.csv"))
            .unwrap_err();
        assert!(matches!(err, PipingError::Io { .. }));
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(escape_csv("with\nnewline"), "\"with\nnewline\"");
    }

    #[test]
    fn test_display() {
        let bom = BillOfMaterials::from_layout("line", &layout());
        let text = bom.to_string();
        assert!(text.starts_with("BOM line (3 items)"));
        assert!(text.contains("BLT-M16 [fastener]"));
    }
}
