//! Record Geometry
//!
//! Spatial records carry GeoJSON-shaped geometry: a `Point` for nodes and a
//! two-point `LineString` for edges. Coordinates are `[lon, lat]` pairs.
//! Configuration objects carry no geometry at all (`None` on the record).

use crate::models::{RecordKind, Validity};
use serde::{Deserialize, Serialize};

/// A `[lon, lat]` pair
pub type Coordinate = [f64; 2];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Coordinate),
    LineString(Vec<Coordinate>),
}

impl Geometry {
    pub fn point(lon: f64, lat: f64) -> Self {
        Geometry::Point([lon, lat])
    }

    pub fn line(source: Coordinate, target: Coordinate) -> Self {
        Geometry::LineString(vec![source, target])
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
        }
    }

    fn coordinates(&self) -> Vec<&Coordinate> {
        match self {
            Geometry::Point(point) => vec![point],
            Geometry::LineString(points) => points.iter().collect(),
        }
    }

    /// Check that this geometry has the shape required by `kind`
    ///
    /// Nodes take exactly one point, edges (ordinary and parent-child) exactly
    /// two. Configuration objects take no geometry, so any geometry is invalid
    /// for them.
    pub fn validate_for(&self, kind: RecordKind) -> Validity {
        if self
            .coordinates()
            .iter()
            .any(|c| !c[0].is_finite() || !c[1].is_finite())
        {
            return Validity::invalid("coordinates must be finite numbers");
        }

        match (kind, self) {
            (RecordKind::Node, Geometry::Point(_)) => Validity::valid(),
            (RecordKind::Node, other) => Validity::invalid(format!(
                "node records take a Point, got a {}",
                other.shape_name()
            )),
            (RecordKind::Edge | RecordKind::ParentChildEdge, Geometry::LineString(points)) => {
                if points.len() == 2 {
                    Validity::valid()
                } else {
                    Validity::invalid(format!(
                        "edge records take exactly two points, got {}",
                        points.len()
                    ))
                }
            }
            (RecordKind::Edge | RecordKind::ParentChildEdge, other) => Validity::invalid(
                format!("edge records take a LineString, got a {}", other.shape_name()),
            ),
            (RecordKind::Configuration, _) => {
                Validity::invalid("configuration objects have no spatial presence")
            }
        }
    }

    /// Representative position: the point itself, or a two-point line's midpoint
    ///
    /// Edges are positioned at their midpoint when another record attaches to
    /// them (e.g. a recorder whose parent is a line).
    pub fn position(&self) -> Option<Coordinate> {
        match self {
            Geometry::Point(point) => Some(*point),
            Geometry::LineString(points) if points.len() == 2 => Some([
                (points[0][0] + points[1][0]) / 2.0,
                (points[0][1] + points[1][1]) / 2.0,
            ]),
            Geometry::LineString(_) => None,
        }
    }

    /// Source and target of a two-point line
    pub fn endpoints(&self) -> Option<(Coordinate, Coordinate)> {
        match self {
            Geometry::LineString(points) if points.len() == 2 => Some((points[0], points[1])),
            _ => None,
        }
    }
}
