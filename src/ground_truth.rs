use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::info;

use crate::bbox::BoundingBox;
use crate::codec::{self, ParseError};
use crate::error::Error;
use crate::Coord;

/// Annotated boxes in frame order.
///
/// The first box initialises the tracker, the rest are only ever used for
/// scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruth<T = i32> {
    boxes: Vec<BoundingBox<T>>,
}

impl<T: Coord> GroundTruth<T> {
    pub fn new(boxes: Vec<BoundingBox<T>>) -> Self {
        Self { boxes }
    }

    /// Reads one box token per line. Any blank or malformed line fails the
    /// whole load.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path.as_ref())?;
        let boxes = Self::read(BufReader::new(file))?;

        info!(
            "loaded {} ground truth boxes from {}",
            boxes.len(),
            path.as_ref().display()
        );

        Ok(Self { boxes })
    }

    fn read<R: BufRead>(reader: R) -> Result<Vec<BoundingBox<T>>, Error> {
        reader
            .split(b'\n')
            .enumerate()
            .map(|(idx, bytes)| {
                let bytes = bytes?;
                let decoded = match std::str::from_utf8(&bytes) {
                    Ok(line) => codec::decode(line),
                    Err(_) => Err(ParseError::Malformed(
                        String::from_utf8_lossy(&bytes).into_owned(),
                    )),
                };

                decoded.map_err(|source| Error::GroundTruth {
                    line: idx + 1,
                    source,
                })
            })
            .collect()
    }

    /// Writes one token per line, replacing `path` if it exists.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let mut out = BufWriter::new(File::create(path)?);

        for bbox in &self.boxes {
            writeln!(out, "{}", codec::encode(bbox)?)?;
        }

        out.flush()?;

        Ok(())
    }

    #[inline]
    pub fn init_box(&self) -> Option<&BoundingBox<T>> {
        self.boxes.first()
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<&BoundingBox<T>> {
        self.boxes.get(idx)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &BoundingBox<T>> {
        self.boxes.iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[BoundingBox<T>] {
        &self.boxes
    }
}

impl<T: Coord> From<Vec<BoundingBox<T>>> for GroundTruth<T> {
    fn from(boxes: Vec<BoundingBox<T>>) -> Self {
        Self::new(boxes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sequence() -> GroundTruth {
        GroundTruth::new(vec![
            BoundingBox::new(0, 0, 100, 100),
            BoundingBox::new(10, 10, 100, 100),
            BoundingBox::new(-4, 12, 0, 0),
            BoundingBox::new(640, 360, 32, 48),
        ])
    }

    #[test]
    fn save_then_load() {
        let file = NamedTempFile::new().unwrap();
        let gt = sequence();

        gt.save(file.path()).unwrap();
        let loaded = GroundTruth::<i32>::load(file.path()).unwrap();

        assert_eq!(loaded, gt);
        assert_eq!(loaded.init_box(), Some(&BoundingBox::new(0, 0, 100, 100)));
    }

    #[test]
    fn save_overwrites() {
        let mut file = NamedTempFile::new().unwrap();
        for _ in 0..5 {
            writeln!(file, "[1 x 1 from (0, 0)]").unwrap();
        }
        file.flush().unwrap();

        let gt = GroundTruth::new(vec![BoundingBox::new(3, 4, 5, 6)]);
        gt.save(file.path()).unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(text, "[5 x 6 from (3, 4)]\n");
    }

    #[test]
    fn malformed_line_fails_whole_load() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[100 x 100 from (0, 0)]").unwrap();
        writeln!(file, "garbage").unwrap();
        writeln!(file, "[100 x 100 from (10, 10)]").unwrap();
        file.flush().unwrap();

        match GroundTruth::<i32>::load(file.path()) {
            Err(Error::GroundTruth { line, source }) => {
                assert_eq!(line, 2);
                assert_eq!(source, ParseError::Malformed("garbage".into()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn blank_line_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[100 x 100 from (0, 0)]").unwrap();
        writeln!(file).unwrap();
        file.flush().unwrap();

        assert!(matches!(
            GroundTruth::<i32>::load(file.path()),
            Err(Error::GroundTruth {
                line: 2,
                source: ParseError::Empty
            })
        ));
    }

    #[test]
    fn invalid_utf8_names_the_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[10 x 10 from (0, 0)]").unwrap();
        file.write_all(b"[10 x 10 from (0, \xff)]\n").unwrap();
        file.flush().unwrap();

        match GroundTruth::<i32>::load(file.path()) {
            Err(Error::GroundTruth {
                line: 2,
                source: ParseError::Malformed(text),
            }) => assert!(text.starts_with("[10 x 10 from (0, ")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn crlf_lines_load() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[1 x 2 from (3, 4)]\r\n[5 x 6 from (7, 8)]\r\n")
            .unwrap();
        file.flush().unwrap();

        let gt = GroundTruth::<i32>::load(file.path()).unwrap();
        assert_eq!(
            gt.as_slice(),
            &[BoundingBox::new(3, 4, 1, 2), BoundingBox::new(7, 8, 5, 6)]
        );
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            GroundTruth::<i32>::load(dir.path().join("none.txt")),
            Err(Error::IoError(_))
        ));
    }
}
