//! Detections table loading.
//!
//! Reads the detector's SQLite database. Columns follow the BirdNET-Pi
//! layout: `Sci_Name`, `Com_Name`, `Confidence`, `Date`, `Time`, `Lat`, `Lon`.

use crate::data::Detection;
use crate::error::{Error, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::{debug, info, warn};

/// Read every detection row from `table` in the database at `path`.
///
/// Rows are returned un-enriched (review / unclassified sentinels).
/// Unparseable date or time fields leave the row's time features empty.
pub fn load_detections(path: &Path, table: &str) -> Result<Vec<Detection>> {
    if !path.exists() {
        return Err(Error::DatabaseNotFound {
            path: path.to_path_buf(),
        });
    }

    let map_err = |source| Error::DatabaseRead {
        path: path.to_path_buf(),
        source,
    };

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(map_err)?;

    let sql = format!(
        "SELECT Sci_Name, Com_Name, Confidence, Date, Time, Lat, Lon FROM {}",
        quote_identifier(table)
    );
    debug!("Query: {sql}");

    let mut stmt = conn.prepare(&sql).map_err(map_err)?;
    let rows = stmt
        .query_map([], |row| {
            let scientific_name: Option<String> = row.get(0)?;
            let common_name: Option<String> = row.get(1)?;
            let confidence: Option<f64> = row.get(2)?;
            let date: Option<String> = row.get(3)?;
            let time: Option<String> = row.get(4)?;
            let latitude: Option<f64> = row.get(5)?;
            let longitude: Option<f64> = row.get(6)?;

            Ok(Detection::new(
                scientific_name.unwrap_or_default(),
                common_name.unwrap_or_default(),
                confidence.unwrap_or(0.0),
                date.as_deref().unwrap_or_default(),
                time.as_deref().unwrap_or_default(),
            )
            .with_location(latitude, longitude))
        })
        .map_err(map_err)?;

    let mut detections = Vec::new();
    for row in rows {
        detections.push(row.map_err(map_err)?);
    }

    let untimed = detections.iter().filter(|d| d.time.is_none()).count();
    if untimed > 0 {
        warn!("{untimed} detection(s) have an unparseable date/time and are excluded from time-based views");
    }
    info!(
        "Loaded {} detections from {}",
        detections.len(),
        path.display()
    );

    Ok(detections)
}

/// Quote an SQL identifier, doubling embedded quotes.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_db(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("birds.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE detections (
                Date TEXT, Time TEXT, Sci_Name TEXT, Com_Name TEXT,
                Confidence REAL, Lat REAL, Lon REAL
             );
             INSERT INTO detections VALUES
                ('2024-05-01', '06:00:00', 'Erithacus rubecula', 'European Robin', 0.9, 51.5, -0.1),
                ('2024-05-01', 'bad', 'Turdus merula', 'Eurasian Blackbird', 0.7, NULL, NULL);",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_load_detections_reads_rows() {
        let dir = TempDir::new().unwrap();
        let path = create_db(&dir);

        let detections = load_detections(&path, "detections").unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].common_name, "European Robin");
        assert_eq!(detections[0].latitude, Some(51.5));
        assert!(detections[0].time.is_some());
        assert!(detections[1].time.is_none());
        assert!(detections[1].latitude.is_none());
    }

    #[test]
    fn test_load_detections_missing_file() {
        let result = load_detections(Path::new("/nonexistent/birds.db"), "detections");
        assert!(matches!(result, Err(Error::DatabaseNotFound { .. })));
    }

    #[test]
    fn test_load_detections_missing_table() {
        let dir = TempDir::new().unwrap();
        let path = create_db(&dir);
        let result = load_detections(&path, "other");
        assert!(matches!(result, Err(Error::DatabaseRead { .. })));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("detections"), "\"detections\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
