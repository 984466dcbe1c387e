//! Readers for exported saved-places lists.
//!
//! Both readers keep file order, which is the identity of every row for
//! the rest of the pipeline.

mod map_url;
mod saved_csv;
mod saved_geojson;

pub use map_url::coordinates_from_map_url;
pub use saved_csv::parse_saved_csv;
pub use saved_geojson::parse_saved_places_geojson;

use std::fs::{self, File};
use std::path::Path;

use tracing::info;

use crate::error::InputError;
use crate::models::SavedPlaceRow;

fn io_error(path: &Path, source: std::io::Error) -> InputError {
    InputError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Read a Takeout list CSV
pub fn read_saved_csv<P: AsRef<Path>>(path: P) -> Result<Vec<SavedPlaceRow>, InputError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let rows = parse_saved_csv(file)?;
    info!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Read a Takeout `Saved Places.json`
pub fn read_saved_places_geojson<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<SavedPlaceRow>, InputError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    let rows = parse_saved_places_geojson(&data)?;
    info!("Read {} saved places from {}", rows.len(), path.display());
    Ok(rows)
}

/// Pick a reader by extension: `.json`/`.geojson` or CSV otherwise
pub fn read_saved_places<P: AsRef<Path>>(path: P) -> Result<Vec<SavedPlaceRow>, InputError> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json") || e.eq_ignore_ascii_case("geojson"));

    if is_json {
        read_saved_places_geojson(path)
    } else {
        read_saved_csv(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reader_picked_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let csv_path = dir.path().join("Want to go.csv");
        let mut file = File::create(&csv_path).unwrap();
        writeln!(file, "Title,Note,URL,Tags,Comment").unwrap();
        writeln!(file, "Alcatraz,,,,").unwrap();
        let rows = read_saved_places(&csv_path).unwrap();
        assert_eq!(rows[0].title, "Alcatraz");

        let json_path = dir.path().join("Saved Places.json");
        fs::write(
            &json_path,
            r#"{"type": "FeatureCollection", "features": [{"type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-122.4229, 37.8267]},
                "properties": {"location": {"name": "Alcatraz"}}}]}"#,
        )
        .unwrap();
        let rows = read_saved_places(&json_path).unwrap();
        assert!(rows[0].coordinates.is_some());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = read_saved_csv("/nonexistent/list.csv").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/list.csv"));
    }
}
