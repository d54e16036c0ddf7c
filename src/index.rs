//! Coordinate lookup: id → point resolution for parcels, boundaries and legs.

use std::collections::HashMap;

use kurbo::Point;

use crate::model::Coordinate;

/// Resolves point identifiers to coordinates.
///
/// Built once per request from the plan's coordinate list. On duplicate ids
/// the first occurrence wins; the rest are recorded for inspection.
pub struct CoordinateIndex<'a> {
    by_id: HashMap<&'a str, &'a Coordinate>,
    duplicate_ids: Vec<String>,
}

/// Result of resolving an ordered id list into a polygon.
pub struct ResolvedPolygon<'a> {
    pub coords: Vec<&'a Coordinate>,
    /// Ids that did not resolve, in input order. Never fatal.
    pub skipped: Vec<String>,
}

impl<'a> ResolvedPolygon<'a> {
    pub fn points(&self) -> Vec<Point> {
        self.coords
            .iter()
            .map(|c| Point::new(c.easting, c.northing))
            .collect()
    }
}

impl<'a> CoordinateIndex<'a> {
    pub fn build(coordinates: &'a [Coordinate]) -> Self {
        let mut by_id = HashMap::with_capacity(coordinates.len());
        let mut duplicate_ids = Vec::new();
        for coord in coordinates {
            if by_id.contains_key(coord.id.as_str()) {
                duplicate_ids.push(coord.id.clone());
            } else {
                by_id.insert(coord.id.as_str(), coord);
            }
        }
        if !duplicate_ids.is_empty() {
            log::warn!("duplicate coordinate ids: {:?}", duplicate_ids);
        }
        Self {
            by_id,
            duplicate_ids,
        }
    }

    pub fn get(&self, id: &str) -> Option<&'a Coordinate> {
        self.by_id.get(id).copied()
    }

    pub fn duplicate_ids(&self) -> &[String] {
        &self.duplicate_ids
    }

    /// Resolve an ordered id list, skipping ids with no coordinate.
    pub fn resolve(&self, ids: &[String]) -> ResolvedPolygon<'a> {
        let mut coords = Vec::with_capacity(ids.len());
        let mut skipped = Vec::new();
        for id in ids {
            match self.get(id) {
                Some(c) => coords.push(c),
                None => skipped.push(id.clone()),
            }
        }
        if !skipped.is_empty() {
            log::warn!("unresolved coordinate ids skipped: {:?}", skipped);
        }
        ResolvedPolygon { coords, skipped }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(id: &str, e: f64, n: f64) -> Coordinate {
        Coordinate {
            id: id.to_string(),
            easting: e,
            northing: n,
            elevation: 0.0,
        }
    }

    #[test]
    fn resolves_in_order_and_reports_skips() {
        let coords = vec![coord("A", 0.0, 0.0), coord("B", 5.0, 0.0)];
        let index = CoordinateIndex::build(&coords);
        let poly = index.resolve(&["A".into(), "MISSING".into(), "B".into()]);
        assert_eq!(poly.coords.len(), 2);
        assert_eq!(poly.skipped, vec!["MISSING".to_string()]);
        assert_eq!(poly.points()[1], Point::new(5.0, 0.0));
    }

    #[test]
    fn first_duplicate_wins() {
        let coords = vec![coord("A", 1.0, 1.0), coord("A", 9.0, 9.0)];
        let index = CoordinateIndex::build(&coords);
        assert_eq!(index.duplicate_ids(), &["A".to_string()]);
        assert_eq!(index.get("A").unwrap().easting, 1.0);
    }
}
