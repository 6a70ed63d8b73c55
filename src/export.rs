//! Serializers for density fields: the plain `"<value>,"` text dump, JSON
//! documents for web clients, and PNG heatmaps.

use std::io::{Seek, Write};
use std::path::Path;

use image::{ImageOutputFormat, Rgb, RgbImage};
use serde::Serialize;

use crate::error::Result;
use crate::grid::DensityField;

/// JSON shape served to clients; `values` is nested by radius row.
#[derive(Serialize)]
pub struct FieldDocument<'a> {
    pub n: u32,
    pub l: u32,
    pub m: i32,
    pub orbital: String,
    pub grid_size: usize,
    pub max_radius: f64,
    pub max_density: f64,
    pub values: Vec<&'a [f64]>,
}

impl<'a> From<&'a DensityField> for FieldDocument<'a> {
    fn from(field: &'a DensityField) -> Self {
        let (state, grid) = (field.state(), field.grid());
        FieldDocument {
            n: state.n,
            l: state.l,
            m: state.m,
            orbital: state.name(),
            grid_size: grid.size,
            max_radius: grid.max_radius,
            max_density: field.max(),
            values: field.rows().collect(),
        }
    }
}

/// One `"<value>,"` line per cell, radius-major.
pub fn write_text<W: Write>(field: &DensityField, mut out: W) -> Result<()> {
    for value in field.values() {
        writeln!(out, "{value},")?;
    }
    out.flush()?;
    Ok(())
}

pub fn to_json(field: &DensityField) -> Result<String> {
    Ok(serde_json::to_string(&FieldDocument::from(field))?)
}

pub fn write_json<W: Write>(field: &DensityField, mut out: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, &FieldDocument::from(field))?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Pixel (x, y) is angle index j and radius index i. Colors are scaled
/// linearly against the field maximum; an all-zero field renders black.
pub fn heatmap(field: &DensityField) -> RgbImage {
    let size = field.size() as u32;
    let max = field.max();

    RgbImage::from_fn(size, size, |x, y| {
        let value = field.get(y as usize, x as usize).unwrap_or(0.0);
        if max <= 0.0 {
            return Rgb([0, 0, 0]);
        }
        gradient((value / max).clamp(0.0, 1.0))
    })
}

pub fn write_png<W: Write + Seek>(field: &DensityField, out: &mut W) -> Result<()> {
    heatmap(field).write_to(out, ImageOutputFormat::Png)?;
    Ok(())
}

pub fn save_heatmap(field: &DensityField, path: &Path) -> Result<()> {
    heatmap(field).save(path)?;
    Ok(())
}

// blue (low) -> cyan -> green -> yellow -> red (high)
fn gradient(t: f64) -> Rgb<u8> {
    let [r, g, b] = if t < 0.25 {
        let s = t / 0.25;
        [0.0, s, 1.0]
    } else if t < 0.5 {
        let s = (t - 0.25) / 0.25;
        [0.0, 1.0, 1.0 - s]
    } else if t < 0.75 {
        let s = (t - 0.5) / 0.25;
        [s, 1.0, 0.0]
    } else {
        let s = (t - 0.75) / 0.25;
        [1.0, 1.0 - s, 0.0]
    };
    let to_byte = |c: f64| (c * 255.0).round() as u8;
    Rgb([to_byte(r), to_byte(g), to_byte(b)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{compute_density_field, GridSpec};
    use crate::physics::QuantumNumbers;
    use std::io::Cursor;

    fn field_2p() -> DensityField {
        let qn = QuantumNumbers::new(2, 1, 0).unwrap();
        compute_density_field(qn, GridSpec::new(4, 1.0).unwrap(), false).unwrap()
    }

    #[test]
    fn test_text_dump_lines() {
        let field = field_2p();
        let mut buf = Vec::new();
        write_text(&field, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 16);
        assert!(lines.iter().all(|l| l.ends_with(',')));
        assert_eq!(lines[0], "0,");
        let parsed: f64 = lines[5].trim_end_matches(',').parse().unwrap();
        assert_eq!(parsed, field.get(1, 1).unwrap());
    }

    #[test]
    fn test_json_document() {
        let field = field_2p();
        let json: serde_json::Value = serde_json::from_str(&to_json(&field).unwrap()).unwrap();
        assert_eq!(json["n"], 2);
        assert_eq!(json["orbital"], "2p");
        assert_eq!(json["grid_size"], 4);
        assert_eq!(json["values"].as_array().unwrap().len(), 4);
        assert_eq!(json["values"][3].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_heatmap_dimensions_and_peak() {
        let field = field_2p();
        let img = heatmap(&field);
        assert_eq!(img.dimensions(), (4, 4));
        // r = 0 row is all zero density -> lowest gradient color
        assert_eq!(*img.get_pixel(0, 0), Rgb([0, 0, 255]));

        let mut cursor = Cursor::new(Vec::new());
        write_png(&field, &mut cursor).unwrap();
        assert_eq!(&cursor.get_ref()[..4], b"\x89PNG");
    }

    #[test]
    fn test_gradient_endpoints() {
        assert_eq!(gradient(0.0), Rgb([0, 0, 255]));
        assert_eq!(gradient(1.0), Rgb([255, 0, 0]));
        assert_eq!(gradient(0.5), Rgb([0, 255, 0]));
    }
}
