//! Geographic regions service
//!
//! Two lookups layered behind one call: caller-loaded FEP polygons first,
//! then the Flinn-Engdahl 1-degree grid when its data files have been
//! provided. The FEP format:
//!
//! ```text
//! lon1 lat1
//! ...
//! lonN latN
//! 99 99 N
//! L Region Name
//! ```
//!
//! Leading `#` comments and blank lines are ignored. A polygon needs at
//! least 3 vertices, 4 when the last closes onto the first. The vertex
//! count line is optional; a mismatch is only warned about.

use std::path::Path;
use std::sync::OnceLock;

use parking_lot::RwLock;

use crate::{ConfigError, ConfigResult};

/// One named polygon.
#[derive(Debug, Clone)]
pub struct PolyRegion {
    pub name: String,
    /// `(lon, lat)` pairs, not repeating the closing vertex.
    pub vertices: Vec<(f64, f64)>,
}

impl PolyRegion {
    /// Even-odd ray casting.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let mut inside = false;
        let n = self.vertices.len();
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = self.vertices[i];
            let (xj, yj) = self.vertices[j];
            if ((yi > lat) != (yj > lat))
                && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi)
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// A set of FEP polygons searched in load order.
#[derive(Debug, Default)]
pub struct PolyRegions {
    regions: Vec<PolyRegion>,
}

impl PolyRegions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn regions(&self) -> &[PolyRegion] {
        &self.regions
    }

    /// Parse FEP text and append the polygons found; returns how many.
    pub fn read_fep_str(&mut self, text: &str) -> ConfigResult<usize> {
        let mut vertices: Vec<(f64, f64)> = Vec::new();
        let mut declared: Option<usize> = None;
        let mut added = 0;

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_prefix("L ").or_else(|| line.strip_prefix("L\t")) {
                let name = name.trim();
                if name.is_empty() {
                    return Err(bad_fep(lineno, "empty region name"));
                }
                let mut poly = std::mem::take(&mut vertices);
                if let Some(count) = declared.take() {
                    if count != poly.len() {
                        log::warn!(
                            "fep: declared {count} vertices but read {} for '{name}'",
                            poly.len()
                        );
                    }
                }
                let closed = poly.len() >= 2 && poly.first() == poly.last();
                let required = if closed { 4 } else { 3 };
                if poly.len() < required {
                    return Err(bad_fep(
                        lineno,
                        &format!("'{name}' has only {} vertices", poly.len()),
                    ));
                }
                if closed {
                    poly.pop();
                }
                self.regions.push(PolyRegion {
                    name: name.to_string(),
                    vertices: poly,
                });
                added += 1;
                continue;
            }

            let mut parts = line.split_whitespace();
            let lon: f64 = parts
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| bad_fep(lineno, "expected a longitude"))?;
            let lat: f64 = parts
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| bad_fep(lineno, "expected a latitude"))?;

            // The 99 99 N line carries the vertex count
            if lon == 99.0 && lat == 99.0 {
                declared = parts.next().and_then(|s| s.parse().ok());
                continue;
            }
            vertices.push((lon, lat));
        }

        if !vertices.is_empty() {
            return Err(ConfigError::BadParameter {
                name: "fep".into(),
                message: "trailing vertices without an L name line".into(),
            });
        }
        Ok(added)
    }

    pub fn read_fep(&mut self, path: &Path) -> ConfigResult<usize> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::BadParameter {
            name: path.display().to_string(),
            message: e.to_string(),
        })?;
        self.read_fep_str(&text)
    }

    /// Name of the first polygon containing the point, in load order.
    pub fn find_region_name(&self, lat: f64, lon: f64) -> Option<&str> {
        self.regions
            .iter()
            .find(|r| r.contains(lat, lon))
            .map(|r| r.name.as_str())
    }
}

fn bad_fep(lineno: usize, message: &str) -> ConfigError {
    ConfigError::BadParameter {
        name: "fep".into(),
        message: format!("line {}: {message}", lineno + 1),
    }
}

/// Flinn-Engdahl 1-degree grid with its region names.
#[derive(Debug)]
pub struct FlinnEngdahl {
    names: Vec<String>,
    /// Row-major, 180 rows (latitude -90..89 offset by 90) of 360 ids.
    grid: Vec<u16>,
}

impl FlinnEngdahl {
    /// Load from a names file (one region name per line, 1-based ids) and
    /// a grid file (180 lines of 360 whitespace-separated ids).
    pub fn load(names_path: &Path, grid_path: &Path) -> ConfigResult<Self> {
        let read = |p: &Path| {
            std::fs::read_to_string(p).map_err(|e| ConfigError::BadParameter {
                name: p.display().to_string(),
                message: e.to_string(),
            })
        };
        let names: Vec<String> = read(names_path)?
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        let grid: Vec<u16> = read(grid_path)?
            .split_whitespace()
            .map(|t| {
                t.parse::<u16>().map_err(|_| ConfigError::BadParameter {
                    name: grid_path.display().to_string(),
                    message: format!("'{t}' is not a region id"),
                })
            })
            .collect::<ConfigResult<_>>()?;
        if grid.len() != 180 * 360 {
            return Err(ConfigError::BadParameter {
                name: grid_path.display().to_string(),
                message: format!("expected {} grid cells, got {}", 180 * 360, grid.len()),
            });
        }
        Ok(Self { names, grid })
    }

    #[cfg(test)]
    fn from_parts(names: Vec<String>, grid: Vec<u16>) -> Self {
        Self { names, grid }
    }

    pub fn region_count(&self) -> usize {
        self.names.len()
    }

    pub fn name_by_id(&self, id: u16) -> Option<&str> {
        if id == 0 {
            return None;
        }
        self.names.get(usize::from(id) - 1).map(String::as_str)
    }

    /// Grid lookup with the historical half-open indexing: cells east and
    /// north of the integer grid lines own their boundary.
    pub fn region_id(&self, lat: f64, lon: f64) -> u16 {
        let lat = lat.clamp(-90.0, 90.0);
        let lon = normalize_lon(lon);

        let mut ilat = lat as i32;
        let mut ilon = lon as i32;
        if lat >= 0.0 {
            ilat += 1;
        }
        if lon >= 0.0 {
            ilon += 1;
        }
        let row = (ilat + 90).clamp(0, 179) as usize;
        let col = (ilon + 180).clamp(0, 359) as usize;
        self.grid[row * 360 + col]
    }

    pub fn region_name(&self, lat: f64, lon: f64) -> Option<&str> {
        self.name_by_id(self.region_id(lat, lon))
    }
}

fn normalize_lon(mut lon: f64) -> f64 {
    while lon < -180.0 {
        lon += 360.0;
    }
    while lon >= 180.0 {
        lon -= 360.0;
    }
    lon
}

/// The global regions service: polygons first, Flinn-Engdahl fallback.
#[derive(Default)]
pub struct Regions {
    poly: RwLock<PolyRegions>,
    fe: RwLock<Option<FlinnEngdahl>>,
}

impl Regions {
    pub fn global() -> &'static Regions {
        static GLOBAL: OnceLock<Regions> = OnceLock::new();
        GLOBAL.get_or_init(Regions::default)
    }

    pub fn load_fep(&self, path: &Path) -> ConfigResult<usize> {
        self.poly.write().read_fep(path)
    }

    pub fn load_fep_str(&self, text: &str) -> ConfigResult<usize> {
        self.poly.write().read_fep_str(text)
    }

    pub fn set_flinn_engdahl(&self, fe: FlinnEngdahl) {
        *self.fe.write() = Some(fe);
    }

    /// Region name for a coordinate, or "unknown region".
    pub fn region_name(&self, lat: f64, lon: f64) -> String {
        if let Some(name) = self.poly.read().find_region_name(lat, lon) {
            return name.to_string();
        }
        if let Some(fe) = self.fe.read().as_ref() {
            if let Some(name) = fe.region_name(lat, lon) {
                return name.to_string();
            }
        }
        "unknown region".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GERMANY: &str = "\
# A test polygon
13.0 52.0
13.0 53.0
14.0 53.0
14.0 52.0
99.0 99.0 4
L Germany
";

    #[test]
    fn test_read_fep_and_contains() {
        let mut regions = PolyRegions::new();
        assert_eq!(regions.read_fep_str(GERMANY).unwrap(), 1);
        assert_eq!(regions.find_region_name(52.5, 13.5), Some("Germany"));
        assert_eq!(regions.find_region_name(51.0, 13.5), None);
    }

    #[test]
    fn test_closed_polygon_requires_four() {
        let text = "\
13.0 52.0
13.0 53.0
13.0 52.0
L Degenerate
";
        assert!(PolyRegions::new().read_fep_str(text).is_err());
    }

    #[test]
    fn test_open_polyline_requires_three() {
        let text = "\
13.0 52.0
13.0 53.0
L TooFew
";
        assert!(PolyRegions::new().read_fep_str(text).is_err());

        let ok = "\
13.0 52.0
13.0 53.0
14.0 53.0
L Triangle
";
        let mut regions = PolyRegions::new();
        assert_eq!(regions.read_fep_str(ok).unwrap(), 1);
    }

    #[test]
    fn test_first_match_wins() {
        let two = "\
0.0 0.0
0.0 10.0
10.0 10.0
10.0 0.0
L Outer
2.0 2.0
2.0 4.0
4.0 4.0
4.0 2.0
L Inner
";
        let mut regions = PolyRegions::new();
        regions.read_fep_str(two).unwrap();
        // Load order decides for overlapping polygons
        assert_eq!(regions.find_region_name(3.0, 3.0), Some("Outer"));
    }

    #[test]
    fn test_flinn_engdahl_indexing() {
        let mut grid = vec![1u16; 180 * 360];
        // Cell for lat 52..53 N, lon 13..14 E: ilat=53, ilon=14
        grid[(53 + 90) * 360 + (14 + 180)] = 2;
        let fe = FlinnEngdahl::from_parts(
            vec!["Elsewhere".into(), "Berlin area".into()],
            grid,
        );
        assert_eq!(fe.region_name(52.5, 13.5), Some("Berlin area"));
        assert_eq!(fe.region_name(10.0, 10.0), Some("Elsewhere"));
        assert_eq!(fe.region_count(), 2);
    }

    #[test]
    fn test_service_fallback_order() {
        let service = Regions::default();
        assert_eq!(service.region_name(52.5, 13.5), "unknown region");
        service.load_fep_str(GERMANY).unwrap();
        assert_eq!(service.region_name(52.5, 13.5), "Germany");
    }
}
