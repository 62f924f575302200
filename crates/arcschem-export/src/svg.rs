//! SVG export serializer.
//!
//! Converts a stroke network into an SVG string using the [`svg`] crate
//! for document construction, XML escaping, and path data formatting.
//!
//! Each stroke becomes one `<path>` element: `M` at its first vertex,
//! then `L` for straight arcs and `A` for circular ones. Full circles
//! are drawn as two half-circle `A` commands, since a single elliptical
//! arc cannot start and end at the same point. Crossing disks are drawn
//! as `<circle>` elements.
//!
//! The y axis is flipped so that map coordinates (y up) render upright.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use std::f64::consts::PI;

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Circle as CircleElement, Description, Element, Group, Path, Title};
use svg::node::{Node, Text, Value};

use arcschem_core::network::StrokeId;
use arcschem_core::{Curve, Point, StrokeNetwork};

/// Options for [`to_svg`].
///
/// Text values are XML-escaped automatically by the `svg` crate.
#[derive(Debug, Clone)]
pub struct SvgOptions<'a> {
    /// Document title, emitted as `<title>`.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized schematization configuration, emitted inside a
    /// `<metadata>` element wrapped in a namespaced `<arcschem:config>`
    /// element.
    pub config_json: Option<&'a str>,

    /// Blank border around the network, as a fraction of its bounding
    /// box diagonal.
    pub margin_fraction: f64,

    /// Stroke width in screen pixels.
    pub stroke_width: f64,

    /// Draw crossing disks.
    pub show_crossings: bool,
}

impl SvgOptions<'_> {
    /// Default for [`margin_fraction`](Self::margin_fraction).
    pub const DEFAULT_MARGIN_FRACTION: f64 = 0.05;
    /// Default for [`stroke_width`](Self::stroke_width).
    pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;
}

impl Default for SvgOptions<'_> {
    fn default() -> Self {
        Self {
            title: None,
            description: None,
            config_json: None,
            margin_fraction: Self::DEFAULT_MARGIN_FRACTION,
            stroke_width: Self::DEFAULT_STROKE_WIDTH,
            show_crossings: true,
        }
    }
}

/// Map coordinates to document coordinates: translate the bounding box
/// to the origin plus margin and flip the y axis.
#[derive(Debug, Clone, Copy)]
struct Frame {
    min_x: f64,
    max_y: f64,
    margin: f64,
}

impl Frame {
    fn apply(self, p: Point) -> (f64, f64) {
        (p.x - self.min_x + self.margin, self.max_y - p.y + self.margin)
    }
}

/// Append one arc to path data, mapping points through `map`.
///
/// With `flip_y` the document's y axis points the other way from the
/// map's, which mirrors orientation: counterclockwise map arcs then
/// sweep in the negative-angle direction of the document.
fn push_curve(
    data: Data,
    curve: &Curve,
    map: impl Fn(Point) -> (f64, f64),
    flip_y: bool,
) -> Data {
    let sweep_of = |clockwise: bool| if clockwise == flip_y { 1.0 } else { 0.0 };
    match *curve {
        Curve::Segment { end, .. } => data.line_to(map(end)),
        Curve::Arc {
            center,
            end,
            clockwise,
            ..
        } => {
            let radius = center.distance(end);
            let large = if curve.central_angle().abs() > PI { 1.0 } else { 0.0 };
            let (x, y) = map(end);
            data.elliptical_arc_to((radius, radius, 0.0, large, sweep_of(clockwise), x, y))
        }
        Curve::FullCircle {
            center,
            point,
            clockwise,
        } => {
            let radius = center.distance(point);
            let sweep = sweep_of(clockwise);
            let (ox, oy) = map(center + (center - point));
            let (px, py) = map(point);
            data.elliptical_arc_to((radius, radius, 0.0, 0.0, sweep, ox, oy))
                .elliptical_arc_to((radius, radius, 0.0, 0.0, sweep, px, py))
        }
    }
}

/// Path data for one stroke. Empty for a stroke without arcs.
fn stroke_data(
    net: &StrokeNetwork,
    stroke: StrokeId,
    map: impl Fn(Point) -> (f64, f64) + Copy,
    flip_y: bool,
) -> String {
    let record = net.stroke(stroke);
    let Some(&first) = record.vertices().first() else {
        return String::new();
    };
    if record.arc_count() == 0 {
        return String::new();
    }

    let mut data = Data::new().move_to(map(net.vertex(first).position()));
    for &v in record.vertices().iter().take(record.arc_count()) {
        if let Some(arc) = net.vertex(v).outgoing() {
            data = push_curve(data, &net.curve(arc), map, flip_y);
        }
    }
    String::from(Value::from(data))
}

/// Build the SVG path `d` attribute for one stroke in map coordinates
/// (no translation, no flip).
///
/// # Examples
///
/// ```
/// use arcschem_core::NetworkInput;
/// use arcschem_core::network::{LineInput, StationInput};
/// use arcschem_export::build_stroke_data;
///
/// let input = NetworkInput {
///     stations: vec![
///         StationInput { label: String::new(), x: 10.0, y: 20.0 },
///         StationInput { label: String::new(), x: 30.0, y: 40.0 },
///     ],
///     lines: vec![LineInput { label: "a".into(), stations: vec![0, 1] }],
/// };
/// let net = input.build().unwrap();
/// let stroke = net.strokes().next().unwrap();
/// assert_eq!(build_stroke_data(&net, stroke), "M10,20 L30,40");
/// ```
#[must_use]
pub fn build_stroke_data(net: &StrokeNetwork, stroke: StrokeId) -> String {
    stroke_data(net, stroke, |p| (p.x, p.y), false)
}

/// Serialize a stroke network into an SVG document string.
///
/// The `viewBox` is the network's bounding box grown by
/// [`SvgOptions::margin_fraction`] of its diagonal on every side. Strokes
/// are grouped under `<g id="strokes">` and crossing disks under
/// `<g id="crossings">`.
///
/// # Examples
///
/// ```
/// use arcschem_core::StrokeNetwork;
/// use arcschem_export::{SvgOptions, to_svg};
///
/// let options = SvgOptions {
///     title: Some("empty"),
///     ..SvgOptions::default()
/// };
/// let svg = to_svg(&StrokeNetwork::new(), &options);
/// assert!(svg.contains("<title>empty</title>"));
/// ```
#[must_use]
pub fn to_svg(net: &StrokeNetwork, options: &SvgOptions<'_>) -> String {
    let (min_x, min_y, width, height) = net.bounding_box().map_or((0.0, 0.0, 0.0, 0.0), |rect| {
        (rect.min().x, rect.min().y, rect.width(), rect.height())
    });
    let margin = net.diagonal() * options.margin_fraction;
    let frame = Frame {
        min_x,
        max_y: min_y + height,
        margin,
    };
    let view_width = 2.0f64.mul_add(margin, width);
    let view_height = 2.0f64.mul_add(margin, height);

    let mut doc = Document::new()
        .set("viewBox", (0.0, 0.0, view_width, view_height))
        .set("preserveAspectRatio", "xMidYMid meet");

    if let Some(title) = options.title {
        doc = doc.add(Title::new(title));
    }
    if let Some(description) = options.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }
    if let Some(config_json) = options.config_json {
        let mut config_el = Element::new("arcschem:config");
        config_el.assign("xmlns:arcschem", "https://github.com/altendky/arcschem/ns/1");
        config_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    let mut strokes = Group::new()
        .set("id", "strokes")
        .set("fill", "none")
        .set("stroke", "black")
        .set("stroke-width", options.stroke_width)
        .set("stroke-linecap", "round")
        .set("stroke-linejoin", "round");
    for stroke in net.strokes() {
        let d = stroke_data(net, stroke, |p| frame.apply(p), true);
        if d.is_empty() {
            continue;
        }
        let mut path = Path::new()
            .set("d", d)
            .set("vector-effect", "non-scaling-stroke");
        let label = net.stroke(stroke).label();
        if !label.is_empty() {
            path.append(Title::new(label));
        }
        strokes = strokes.add(path);
    }
    doc = doc.add(strokes);

    if options.show_crossings {
        // Point disks still get a visible dot.
        let dot = net.diagonal() * 0.004;
        let mut crossings = Group::new()
            .set("id", "crossings")
            .set("fill", "none")
            .set("stroke", "red")
            .set("stroke-width", 1);
        for (_, disk) in net.cross_disks() {
            let (cx, cy) = frame.apply(disk.center);
            crossings = crossings.add(
                CircleElement::new()
                    .set("cx", cx)
                    .set("cy", cy)
                    .set("r", disk.radius.max(dot))
                    .set("vector-effect", "non-scaling-stroke"),
            );
        }
        doc = doc.add(crossings);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

#[cfg(test)]
mod tests {
    use arcschem_core::geometry::Circle;
    use arcschem_core::network::StationId;

    use super::*;

    fn no_margin() -> SvgOptions<'static> {
        SvgOptions {
            margin_fraction: 0.0,
            ..SvgOptions::default()
        }
    }

    fn straight_pair() -> StrokeNetwork {
        let mut net = StrokeNetwork::new();
        let ids: Vec<StationId> = [(0.0, 0.0), (4.0, 0.0), (4.0, 2.0)]
            .iter()
            .map(|&(x, y)| net.add_station("", Point::new(x, y), false))
            .collect();
        net.add_stroke("elbow", &ids, false).unwrap();
        net
    }

    #[test]
    fn straight_stroke_is_flipped_into_view() {
        let svg = to_svg(&straight_pair(), &no_margin());
        assert!(svg.contains(r#"viewBox="0 0 4 2""#));
        // (0,0) is the bottom-left corner of the map.
        assert!(svg.contains(r#"d="M0,2 L4,2 L4,0""#));
    }

    #[test]
    fn one_path_per_stroke() {
        let mut net = straight_pair();
        let a = net.add_station("", Point::new(0.0, 5.0), false);
        let b = net.add_station("", Point::new(3.0, 5.0), false);
        net.add_stroke("", &[a, b], false).unwrap();
        let svg = to_svg(&net, &no_margin());
        assert_eq!(svg.matches("<path").count(), 2);
        // Labelled strokes carry a tooltip.
        assert!(svg.contains("<title>elbow</title>"));
    }

    #[test]
    fn arcs_use_elliptical_commands() {
        let mut net = straight_pair();
        let corner = net.stroke(net.strokes().next().unwrap()).vertices()[1];
        let arc =
            Curve::through_point(Point::new(0.0, 0.0), Point::new(3.0, 0.5), Point::new(4.0, 2.0))
                .unwrap();
        net.replace_vertex(corner, &arc).unwrap();
        let svg = to_svg(&net, &no_margin());
        assert!(svg.contains(" A"));
        assert!(!svg.contains(" L"));
    }

    fn flipped(max_y: f64) -> impl Fn(Point) -> (f64, f64) {
        let frame = Frame {
            min_x: 0.0,
            max_y,
            margin: 0.0,
        };
        move |p| frame.apply(p)
    }

    #[test]
    fn full_circle_becomes_two_half_arcs() {
        let circle = Curve::FullCircle {
            center: Point::ORIGIN,
            point: Point::new(1.0, 0.0),
            clockwise: false,
        };
        let data = push_curve(Data::new(), &circle, flipped(1.0), true);
        let d = String::from(Value::from(data));
        assert_eq!(d, "A1,1,0,0,0,-1,1 A1,1,0,0,0,1,1");
    }

    #[test]
    fn counterclockwise_arcs_sweep_negative_after_flip() {
        let quarter = Curve::Arc {
            center: Point::ORIGIN,
            start: Point::new(1.0, 0.0),
            end: Point::new(0.0, 1.0),
            clockwise: false,
        };
        let d = String::from(Value::from(push_curve(Data::new(), &quarter, flipped(1.0), true)));
        assert_eq!(d, "A1,1,0,0,0,0,0");
        // Without the flip the same arc sweeps positively.
        let raw = |p: Point| (p.x, p.y);
        let d = String::from(Value::from(push_curve(Data::new(), &quarter, raw, false)));
        assert_eq!(d, "A1,1,0,0,1,0,1");
    }

    #[test]
    fn crossing_disks_drawn_when_enabled() {
        let mut net = StrokeNetwork::new();
        let hub = net.add_station("hub", Point::new(1.0, 1.0), false);
        let w = net.add_station("", Point::new(0.0, 1.0), false);
        let e = net.add_station("", Point::new(2.0, 1.0), false);
        let s = net.add_station("", Point::new(1.0, 0.0), false);
        let n = net.add_station("", Point::new(1.0, 2.0), false);
        let h = net.add_stroke("h", &[w, hub, e], false).unwrap();
        let v = net.add_stroke("v", &[s, hub, n], false).unwrap();
        let hv = net.stroke(h).vertices()[1];
        let vv = net.stroke(v).vertices()[1];
        net.add_cross(hub, &[hv, vv]).unwrap();

        let disks: Vec<Circle> = net.cross_disks().into_iter().map(|(_, c)| c).collect();
        assert_eq!(disks.len(), 1);

        let svg = to_svg(&net, &no_margin());
        assert_eq!(svg.matches("<circle").count(), 1);
        assert!(svg.contains(r#"cx="1""#));

        let hidden = to_svg(
            &net,
            &SvgOptions {
                show_crossings: false,
                ..no_margin()
            },
        );
        assert_eq!(hidden.matches("<circle").count(), 0);
    }

    #[test]
    fn metadata_is_escaped() {
        let options = SvgOptions {
            title: Some("a & b"),
            description: Some("<run>"),
            config_json: Some(r#"{"k":1}"#),
            ..SvgOptions::default()
        };
        let svg = to_svg(&straight_pair(), &options);
        assert!(svg.contains("<title>a &amp; b</title>"));
        assert!(svg.contains("<desc>&lt;run&gt;</desc>"));
        assert!(svg.contains("<metadata>"));
        assert!(svg.contains("arcschem:config"));
    }

    #[test]
    fn svg_has_declaration_and_namespace() {
        let svg = to_svg(&straight_pair(), &SvgOptions::default());
        assert!(svg.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(svg.contains(r#"xmlns="http://www.w3.org/2000/svg""#));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
