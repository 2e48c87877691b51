//! BEAM container format.
//!
//! An image is an IFF form: `FOR1`, a big-endian length covering the rest
//! of the file, the form type `BEAM`, then chunks. Each chunk is a
//! four-byte id, a big-endian length and the data, padded to four bytes.

/// Form id every image starts with.
pub const FORM_ID: &[u8; 4] = b"FOR1";

/// Form type of a module image.
pub const FORM_TYPE: &[u8; 4] = b"BEAM";

const HEADER_LEN: usize = 12;

/// One chunk of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Chunk id, e.g. `Code` or `AtU8`
    pub id: [u8; 4],

    /// Chunk data without padding
    pub data: &'a [u8],
}

fn be_u32(bytes: &[u8]) -> usize {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize
}

fn padded(len: usize) -> usize {
    (len + 3) & !3
}

/// Split a container into its chunks.
///
/// The error is a human-readable reason suitable for a malformed-image
/// report.
pub fn parse_chunks(bytes: &[u8]) -> Result<Vec<Chunk<'_>>, String> {
    if bytes.len() < HEADER_LEN {
        return Err(format!("image too short ({} bytes)", bytes.len()));
    }
    if &bytes[0..4] != FORM_ID {
        return Err("missing FOR1 header".to_string());
    }
    if &bytes[8..12] != FORM_TYPE {
        return Err("form type is not BEAM".to_string());
    }

    let declared = be_u32(&bytes[4..8]);
    let end = declared
        .checked_add(8)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| {
            format!(
                "truncated: header declares {} bytes, image has {}",
                declared,
                bytes.len() - 8
            )
        })?;

    let mut chunks = Vec::new();
    let mut offset = HEADER_LEN;
    while offset < end {
        if end - offset < 8 {
            return Err(format!("truncated chunk header at offset {}", offset));
        }
        let mut id = [0u8; 4];
        id.copy_from_slice(&bytes[offset..offset + 4]);
        let size = be_u32(&bytes[offset + 4..offset + 8]);

        let data_start = offset + 8;
        let data_end = data_start
            .checked_add(size)
            .filter(|&data_end| data_end <= end)
            .ok_or_else(|| {
                format!(
                    "chunk {} overruns the container",
                    String::from_utf8_lossy(&id)
                )
            })?;

        chunks.push(Chunk {
            id,
            data: &bytes[data_start..data_end],
        });
        offset = data_start + padded(size);
    }

    Ok(chunks)
}

/// Name the image declares for itself: the first entry of its atom table.
///
/// Returns `None` when there is no atom table or it uses the compact
/// encoding.
pub fn declared_name(chunks: &[Chunk<'_>]) -> Option<String> {
    let atoms = chunks
        .iter()
        .find(|chunk| &chunk.id == b"AtU8" || &chunk.id == b"Atom")?;
    let data = atoms.data;
    if data.len() < 5 {
        return None;
    }

    let count = i32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    if count <= 0 {
        return None;
    }

    let len = data[4] as usize;
    let name = data.get(5..5 + len)?;
    String::from_utf8(name.to_vec()).ok()
}

/// Build a container from chunks, padding each to four bytes.
pub fn assemble(chunks: &[([u8; 4], &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(FORM_TYPE);
    for (id, data) in chunks {
        body.extend_from_slice(id);
        body.extend_from_slice(&(data.len() as u32).to_be_bytes());
        body.extend_from_slice(data);
        body.resize(body.len() + padded(data.len()) - data.len(), 0);
    }

    let mut image = Vec::with_capacity(body.len() + 8);
    image.extend_from_slice(FORM_ID);
    image.extend_from_slice(&(body.len() as u32).to_be_bytes());
    image.extend_from_slice(&body);
    image
}

/// Smallest well-formed image for `module`: an atom table naming it and
/// an empty code chunk.
///
/// Atom names are at most 255 bytes long; longer names are rejected.
pub fn minimal_image(module: &str) -> Result<Vec<u8>, String> {
    let len = u8::try_from(module.len())
        .map_err(|_| format!("module name is {} bytes, the limit is 255", module.len()))?;

    let mut atoms = Vec::with_capacity(module.len() + 5);
    atoms.extend_from_slice(&1i32.to_be_bytes());
    atoms.push(len);
    atoms.extend_from_slice(module.as_bytes());

    Ok(assemble(&[(*b"AtU8", &atoms[..]), (*b"Code", &[0u8; 4][..])]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_image_parses() {
        let image = minimal_image("erlang").unwrap();
        let chunks = parse_chunks(&image).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(&chunks[0].id, b"AtU8");
        assert_eq!(&chunks[1].id, b"Code");
        assert_eq!(declared_name(&chunks), Some("erlang".to_string()));
    }

    #[test]
    fn test_minimal_image_name_limit() {
        let longest = "a".repeat(255);
        let image = minimal_image(&longest).unwrap();
        assert_eq!(declared_name(&parse_chunks(&image).unwrap()), Some(longest));

        let err = minimal_image(&"a".repeat(256)).unwrap_err();
        assert!(err.contains("256 bytes"));
    }

    #[test]
    fn test_padding_is_skipped() {
        let image = assemble(&[(*b"Abc1", &b"x"[..]), (*b"Abc2", &b"yz"[..])]);
        let chunks = parse_chunks(&image).unwrap();

        assert_eq!(chunks[0].data, b"x");
        assert_eq!(chunks[1].data, b"yz");
        assert_eq!(image.len() % 4, 0);
    }

    #[test]
    fn test_rejects_bad_headers() {
        assert!(parse_chunks(b"FOR1").unwrap_err().contains("too short"));
        assert!(parse_chunks(b"RIFF\0\0\0\x04BEAM").unwrap_err().contains("FOR1"));
        assert!(parse_chunks(b"FOR1\0\0\0\x04WAVE").unwrap_err().contains("BEAM"));
    }

    #[test]
    fn test_rejects_truncation() {
        let mut image = minimal_image("init").unwrap();
        image.truncate(image.len() - 4);
        assert!(parse_chunks(&image).unwrap_err().contains("truncated"));
    }

    #[test]
    fn test_rejects_overrunning_chunk() {
        let mut image = minimal_image("init").unwrap();
        // Inflate the first chunk's length past the end of the form.
        image[16..20].copy_from_slice(&1000u32.to_be_bytes());
        assert!(parse_chunks(&image).unwrap_err().contains("overruns"));
    }

    #[test]
    fn test_no_atom_table_has_no_name() {
        let image = assemble(&[(*b"Code", &[0u8; 4][..])]);
        assert_eq!(declared_name(&parse_chunks(&image).unwrap()), None);
    }
}
