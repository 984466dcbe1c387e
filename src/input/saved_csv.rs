//! Takeout "Saved" list CSV reader.
//!
//! Lists export as `Title,Note,URL,Tags,Comment`. Some tools add an
//! `Address` or `Location` column; when present it becomes the query text.

use std::io::Read;

use tracing::debug;

use super::coordinates_from_map_url;
use crate::error::InputError;
use crate::models::{MatchedProvider, SavedPlaceRow};

/// Column positions resolved from the header row
#[derive(Debug, Default)]
struct Columns {
    title: usize,
    note: Option<usize>,
    url: Option<usize>,
    tags: Option<usize>,
    comment: Option<usize>,
    location: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, InputError> {
        let find = |names: &[&str]| {
            headers.iter().position(|h| {
                let h = h.trim_start_matches('\u{feff}').trim();
                names.iter().any(|n| h.eq_ignore_ascii_case(n))
            })
        };

        Ok(Self {
            title: find(&["title", "name"]).ok_or(InputError::MissingColumn("Title"))?,
            note: find(&["note"]),
            url: find(&["url", "google maps url"]),
            tags: find(&["tags"]),
            comment: find(&["comment"]),
            location: find(&["address", "location"]),
        })
    }
}

fn field(record: &csv::StringRecord, column: Option<usize>) -> Option<&str> {
    column
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Parse a saved list from any reader, in file order
pub fn parse_saved_csv<R: Read>(reader: R) -> Result<Vec<SavedPlaceRow>, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(reader);

    let columns = Columns::from_headers(reader.headers()?)?;
    let mut rows = Vec::new();

    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|v| v.trim().is_empty()) {
            debug!("Skipping blank record {}", line + 1);
            continue;
        }

        let title = field(&record, Some(columns.title)).unwrap_or_default();
        let location = field(&record, columns.location).unwrap_or_default();
        let mut row = SavedPlaceRow::new(title, location);

        if let Some(url) = field(&record, columns.url) {
            if let Some(point) = coordinates_from_map_url(url) {
                row = row.with_coordinates(point, MatchedProvider::Google);
            }
            row = row.with_url(url);
        }
        if let Some(note) = field(&record, columns.note).or(field(&record, columns.comment)) {
            row = row.with_note(note);
        }
        if let Some(tags) = field(&record, columns.tags) {
            row = row.with_tags(
                tags.split([',', ';'])
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }

        rows.push(row);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_takeout_list() {
        let data = "Title,Note,URL,Tags,Comment\n\
                    Louvre,Go early,https://www.google.com/maps/place/Louvre/data=!4m2!3m1!1s0x0:0x0!8m2!3d48.8606!4d2.3376,museum,\n\
                    \n\
                    Joe's Pizza,,https://www.google.com/maps/place/Joe's+Pizza/data=!4m2!3m1!1s0x0:0x1,\"food, pizza\",Cash only\n";
        let rows = parse_saved_csv(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);

        let louvre = &rows[0];
        assert_eq!(louvre.title, "Louvre");
        assert_eq!(louvre.note.as_deref(), Some("Go early"));
        assert_eq!(louvre.tags, vec!["museum"]);
        let coords = louvre.coordinates.unwrap();
        assert_eq!(coords.source, MatchedProvider::Google);
        assert_eq!((coords.point.lat(), coords.point.lon()), (48.8606, 2.3376));

        let joes = &rows[1];
        assert!(joes.coordinates.is_none());
        assert_eq!(joes.query(), Some("Joe's Pizza"));
        assert_eq!(joes.note.as_deref(), Some("Cash only"));
        assert_eq!(joes.tags, vec!["food", "pizza"]);
    }

    #[test]
    fn test_address_column_and_case_insensitive_headers() {
        let data = "TITLE,address,url\nOffice,\"1 Infinite Loop, Cupertino\",\n";
        let rows = parse_saved_csv(data.as_bytes()).unwrap();
        assert_eq!(rows[0].query(), Some("1 Infinite Loop, Cupertino"));
        assert!(rows[0].url.is_none());
    }

    #[test]
    fn test_short_records_are_tolerated() {
        let data = "Title,Note,URL,Tags,Comment\nSomewhere\n";
        let rows = parse_saved_csv(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Somewhere");
    }

    #[test]
    fn test_missing_title_column() {
        let data = "Note,URL\nhello,\n";
        assert!(matches!(
            parse_saved_csv(data.as_bytes()),
            Err(InputError::MissingColumn("Title"))
        ));
    }
}
