use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use serde::Deserialize;

use crate::descriptor::{check_version, DescriptorError, TargetDescriptor};

pub const TRAILER_MAGIC: &[u8; 8] = b"IMPOSTOR";
pub const DESCRIPTOR_MAX_SIZE: u64 = 10 * 1024 * 1024;

const SIZE_FIELD_LEN: usize = 4;
pub const TRAILER_LEN: u64 = (SIZE_FIELD_LEN + TRAILER_MAGIC.len()) as u64;

#[derive(Deserialize)]
struct VersionHeader {
    #[serde(default)]
    version: String,
}

pub fn append_descriptor<W: Write + Seek>(
    writer: &mut W,
    descriptor: &TargetDescriptor,
) -> Result<(), DescriptorError> {
    descriptor.validate()?;

    let mut payload = serde_json::to_vec(descriptor).map_err(DescriptorError::Serialize)?;
    let size = payload.len() as u64;
    if size > DESCRIPTOR_MAX_SIZE {
        return Err(DescriptorError::TooLarge { size });
    }

    payload.extend_from_slice(&(size as u32).to_be_bytes());
    payload.extend_from_slice(TRAILER_MAGIC);

    writer.seek(SeekFrom::End(0))?;
    writer.write_all(&payload)?;
    Ok(())
}

/// Recovers the descriptor stored at the tail of `reader`.
///
/// Data that does not end with the trailer magic yields
/// [`DescriptorError::NoDescriptor`]; a trailer whose length field is out of
/// bounds is reported as corrupt or too large instead.
pub fn read_descriptor<R: Read + Seek>(reader: &mut R) -> Result<TargetDescriptor, DescriptorError> {
    let stream_len = reader.seek(SeekFrom::End(0))?;
    if stream_len < TRAILER_LEN {
        return Err(DescriptorError::NoDescriptor);
    }

    reader.seek(SeekFrom::End(-(TRAILER_LEN as i64)))?;
    let mut trailer = [0_u8; TRAILER_LEN as usize];
    match reader.read_exact(&mut trailer) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(DescriptorError::NoDescriptor);
        }
        Err(err) => return Err(err.into()),
    }

    let (size_bytes, magic) = trailer.split_at(SIZE_FIELD_LEN);
    if magic != TRAILER_MAGIC {
        return Err(DescriptorError::NoDescriptor);
    }

    let size = u64::from(u32::from_be_bytes([
        size_bytes[0],
        size_bytes[1],
        size_bytes[2],
        size_bytes[3],
    ]));
    if size > DESCRIPTOR_MAX_SIZE {
        return Err(DescriptorError::TooLarge { size });
    }
    if size == 0 {
        return Err(DescriptorError::corrupt("descriptor length is zero"));
    }
    let available = stream_len - TRAILER_LEN;
    if size > available {
        return Err(DescriptorError::corrupt(format!(
            "declared length {size} exceeds the {available} bytes preceding the trailer"
        )));
    }

    reader.seek(SeekFrom::Start(available - size))?;
    let mut payload = vec![0_u8; size as usize];
    match reader.read_exact(&mut payload) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(DescriptorError::corrupt("descriptor is truncated"));
        }
        Err(err) => return Err(err.into()),
    }

    parse_descriptor(&payload)
}

pub fn read_descriptor_file(path: &Path) -> Result<TargetDescriptor, DescriptorError> {
    let mut file = File::open(path)?;
    let descriptor = read_descriptor(&mut file)?;
    tracing::debug!(path = %path.display(), "found impostor descriptor");
    Ok(descriptor)
}

fn parse_descriptor(payload: &[u8]) -> Result<TargetDescriptor, DescriptorError> {
    // An incompatible layout must surface as a version mismatch, so only the
    // version is looked at before the full parse.
    let header: VersionHeader =
        serde_json::from_slice(payload).map_err(DescriptorError::Malformed)?;
    check_version(&header.version)?;

    let descriptor: TargetDescriptor =
        serde_json::from_slice(payload).map_err(DescriptorError::Malformed)?;
    check_version(&descriptor.version)?;
    Ok(descriptor)
}
