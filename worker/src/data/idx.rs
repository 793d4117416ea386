//! Reader of the IDX format the MNIST files are distributed in.
//!
//! A file is a big-endian `u32` magic number, one big-endian `u32` per dimension and the
//! unsigned bytes of the data.

use std::{fs, path::Path};

use super::{DataErr, IMAGE_SIZE};

pub const IMAGES_MAGIC: u32 = 0x0000_0803;
pub const LABELS_MAGIC: u32 = 0x0000_0801;

fn read_be_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Splits `data` into its dimensions and body, checking the magic number and the body length.
fn parse<'a, const N: usize>(
    path: &Path,
    data: &'a [u8],
    magic: u32,
) -> Result<([usize; N], &'a [u8]), DataErr> {
    let header_len = 4 * (N + 1);
    let truncated = |expected| DataErr::Truncated {
        path: path.to_path_buf(),
        got: data.len(),
        expected,
    };

    let got = read_be_u32(data, 0).ok_or_else(|| truncated(header_len))?;
    if got != magic {
        return Err(DataErr::BadMagic {
            path: path.to_path_buf(),
            got,
            expected: magic,
        });
    }

    let mut dims = [0; N];
    for (i, dim) in dims.iter_mut().enumerate() {
        *dim = read_be_u32(data, 4 * (i + 1)).ok_or_else(|| truncated(header_len))? as usize;
    }

    // a corrupt header can claim more bytes than fit in a usize
    let end = dims
        .iter()
        .try_fold(1usize, |len, &dim| len.checked_mul(dim))
        .and_then(|body_len| body_len.checked_add(header_len))
        .ok_or_else(|| truncated(usize::MAX))?;
    let body = data.get(header_len..end).ok_or_else(|| truncated(end))?;

    Ok((dims, body))
}

/// Parses an IDX image file.
///
/// # Returns
/// The flattened 28x28 images, one after the other.
pub fn parse_images(path: &Path, data: &[u8]) -> Result<Vec<u8>, DataErr> {
    let ([_, rows, cols], body) = parse::<3>(path, data, IMAGES_MAGIC)?;
    if rows.checked_mul(cols) != Some(IMAGE_SIZE) {
        return Err(DataErr::BadImageShape { rows, cols });
    }

    Ok(body.to_vec())
}

/// Parses an IDX label file.
pub fn parse_labels(path: &Path, data: &[u8]) -> Result<Vec<u8>, DataErr> {
    let ([_], body) = parse::<1>(path, data, LABELS_MAGIC)?;
    Ok(body.to_vec())
}

fn read(path: &Path) -> Result<Vec<u8>, DataErr> {
    fs::read(path).map_err(|source| DataErr::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads an IDX image file.
pub fn read_images(path: &Path) -> Result<Vec<u8>, DataErr> {
    parse_images(path, &read(path)?)
}

/// Reads an IDX label file.
pub fn read_labels(path: &Path) -> Result<Vec<u8>, DataErr> {
    parse_labels(path, &read(path)?)
}

/// Encodes `images` as an IDX image file, the inverse of `parse_images`.
pub fn encode_images(images: &[u8]) -> Vec<u8> {
    let count = (images.len() / IMAGE_SIZE) as u32;

    let mut out = Vec::with_capacity(16 + images.len());
    for word in [IMAGES_MAGIC, count, 28, 28] {
        out.extend_from_slice(&word.to_be_bytes());
    }
    out.extend_from_slice(images);
    out
}

/// Encodes `labels` as an IDX label file, the inverse of `parse_labels`.
pub fn encode_labels(labels: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + labels.len());
    out.extend_from_slice(&LABELS_MAGIC.to_be_bytes());
    out.extend_from_slice(&(labels.len() as u32).to_be_bytes());
    out.extend_from_slice(labels);
    out
}
