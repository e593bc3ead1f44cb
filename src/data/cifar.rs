//! Reader for the CIFAR-10 binary format: every record is one label byte followed by the
//! 32x32 pixels of the red, green and blue planes.

use std::{fs, path::Path};

use ndarray::Array4;

use crate::{GanErr, Result};

pub const CLASSES: usize = 10;
pub const IMAGE_SHAPE: (usize, usize, usize) = (3, 32, 32);

const PIXELS: usize = IMAGE_SHAPE.0 * IMAGE_SHAPE.1 * IMAGE_SHAPE.2;
const RECORD_LEN: usize = 1 + PIXELS;
const TRAIN_FILES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];
const TEST_FILE: &str = "test_batch.bin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    fn files(self) -> &'static [&'static str] {
        match self {
            Split::Train => &TRAIN_FILES,
            Split::Test => std::slice::from_ref(&TEST_FILE),
        }
    }
}

/// Undecoded images in NCHW layout along with their class indices.
#[derive(Debug, Clone)]
pub struct RawImages {
    pub pixels: Array4<u8>,
    pub labels: Vec<u8>,
}

impl RawImages {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Reads every file of a split from a CIFAR-10 binary directory.
///
/// # Arguments
/// * `dir` - The directory holding the `.bin` files.
/// * `split` - Which files to read.
///
/// # Returns
/// The images, or `DataLoad` if a file is missing or malformed.
pub fn load_split(dir: &Path, split: Split) -> Result<RawImages> {
    let mut bytes = Vec::new();

    for file in split.files() {
        let path = dir.join(file);
        let data = fs::read(&path).map_err(|e| GanErr::data_load(path.display(), e))?;
        if data.len() % RECORD_LEN != 0 {
            return Err(GanErr::data_load(
                path.display(),
                format!("{} bytes isn't a whole number of records", data.len()),
            ));
        }

        bytes.extend(data);
    }

    let images = parse_records(&bytes, &dir.display().to_string())?;
    log::info!(dir:? = dir, split:? = split, images = images.len(); "dataset loaded");
    Ok(images)
}

/// Decodes a buffer of whole records.
///
/// # Arguments
/// * `bytes` - The records.
/// * `source` - Where the bytes come from, used in errors.
///
/// # Returns
/// The decoded images, or `DataLoad` if the buffer is empty, truncated, or holds a label out
/// of range.
pub fn parse_records(bytes: &[u8], source: &str) -> Result<RawImages> {
    if bytes.is_empty() || bytes.len() % RECORD_LEN != 0 {
        return Err(GanErr::data_load(
            source,
            format!("expected a non empty multiple of {RECORD_LEN} bytes, got {}", bytes.len()),
        ));
    }

    let n = bytes.len() / RECORD_LEN;
    let mut labels = Vec::with_capacity(n);
    let mut pixels = Vec::with_capacity(n * PIXELS);

    for (i, record) in bytes.chunks_exact(RECORD_LEN).enumerate() {
        let label = record[0];
        if label as usize >= CLASSES {
            return Err(GanErr::data_load(
                source,
                format!("record {i} has label {label}, expected less than {CLASSES}"),
            ));
        }

        labels.push(label);
        pixels.extend_from_slice(&record[1..]);
    }

    let (c, h, w) = IMAGE_SHAPE;
    let pixels = Array4::from_shape_vec((n, c, h, w), pixels)
        .map_err(|e| GanErr::data_load(source, e))?;

    Ok(RawImages { pixels, labels })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: u8, fill: impl Fn(usize) -> u8) -> Vec<u8> {
        let mut record = vec![label];
        record.extend((0..PIXELS).map(fill));
        record
    }

    #[test]
    fn records_decode_channel_planar() {
        let mut bytes = record(3, |i| (i / 1024) as u8);
        bytes.extend(record(9, |_| 255));

        let images = parse_records(&bytes, "memory").unwrap();

        assert_eq!(images.labels, vec![3, 9]);
        assert_eq!(images.pixels.shape(), &[2, 3, 32, 32]);
        assert_eq!(images.pixels[[0, 0, 5, 5]], 0);
        assert_eq!(images.pixels[[0, 1, 0, 0]], 1);
        assert_eq!(images.pixels[[0, 2, 31, 31]], 2);
        assert_eq!(images.pixels[[1, 1, 7, 3]], 255);
    }

    #[test]
    fn truncated_buffer_is_a_load_error() {
        let bytes = record(0, |_| 0);
        let err = parse_records(&bytes[..100], "memory").unwrap_err();
        assert!(matches!(err, GanErr::DataLoad { .. }));
    }

    #[test]
    fn label_out_of_range_is_a_load_error() {
        let err = parse_records(&record(10, |_| 0), "memory").unwrap_err();
        assert!(matches!(err, GanErr::DataLoad { .. }));
    }

    #[test]
    fn missing_directory_is_a_load_error() {
        let err = load_split(Path::new("/no/cifar/here"), Split::Test).unwrap_err();
        assert!(matches!(err, GanErr::DataLoad { .. }));
    }

    #[test]
    fn split_reads_every_file_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for (i, file) in TRAIN_FILES.iter().enumerate() {
            fs::write(dir.path().join(file), record(i as u8, |_| 0)).unwrap();
        }

        let images = load_split(dir.path(), Split::Train).unwrap();
        assert_eq!(images.labels, vec![0, 1, 2, 3, 4]);
    }
}
