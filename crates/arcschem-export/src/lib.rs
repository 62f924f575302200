//! arcschem-export: Pure format serializers (sans-IO)
//!
//! Converts stroke networks into output formats. Currently supports SVG.

pub mod svg;

pub use svg::{SvgOptions, build_stroke_data, to_svg};
