//! Minimal Android binary XML (AXML) reader
//!
//! A compiled AndroidManifest.xml is a chunked little-endian format: a
//! document header, a string pool, an optional resource map, then namespace
//! and element chunks. Identity extraction only needs the attribute table of
//! the root `<manifest>` element, so this reader decodes exactly that subset
//! and skips every other chunk by its declared size.

use super::error::ApkError;

const RES_XML_TYPE: u16 = 0x0003;
const RES_STRING_POOL_TYPE: u16 = 0x0001;
const RES_XML_START_ELEMENT_TYPE: u16 = 0x0102;

const NO_ENTRY_INDEX: u32 = 0xFFFF_FFFF;
const STRING_FLAG_UTF8: u32 = 0x0000_0100;

const TYPE_STRING: u8 = 0x03;
const TYPE_INT_DEC: u8 = 0x10;
const TYPE_INT_HEX: u8 = 0x11;

/// Identity attributes read off the root `<manifest>` element.
///
/// Fields are optional here; the caller decides which ones are required.
#[derive(Debug, Default)]
pub(crate) struct RootAttributes {
    pub package: Option<String>,
    pub version_name: Option<String>,
    pub version_code: Option<i64>,
}

struct ChunkHeader {
    chunk_type: u16,
    header_size: u16,
    start: usize,
    end: usize,
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    fn read_u16(&mut self) -> Result<u16, ApkError> {
        let end = self.pos + 2;
        if end > self.data.len() {
            return Err(truncated());
        }
        let value = u16::from_le_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos = end;
        Ok(value)
    }

    fn read_u8(&mut self) -> Result<u8, ApkError> {
        if self.pos >= self.data.len() {
            return Err(truncated());
        }
        let value = self.data[self.pos];
        self.pos += 1;
        Ok(value)
    }

    fn read_u32(&mut self) -> Result<u32, ApkError> {
        let end = self.pos + 4;
        if end > self.data.len() {
            return Err(truncated());
        }
        let value = u32::from_le_bytes([
            self.data[self.pos],
            self.data[self.pos + 1],
            self.data[self.pos + 2],
            self.data[self.pos + 3],
        ]);
        self.pos = end;
        Ok(value)
    }

    fn seek(&mut self, offset: usize) -> Result<(), ApkError> {
        if offset > self.data.len() {
            return Err(truncated());
        }
        self.pos = offset;
        Ok(())
    }

    fn read_chunk_header(&mut self) -> Result<ChunkHeader, ApkError> {
        let start = self.pos;
        let chunk_type = self.read_u16()?;
        let header_size = self.read_u16()?;
        let chunk_size = self.read_u32()?;
        if (chunk_size as usize) < 8 || chunk_size < header_size as u32 {
            return Err(malformed("invalid chunk sizing"));
        }
        let end = start
            .checked_add(chunk_size as usize)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| malformed("chunk extends past end of document"))?;
        Ok(ChunkHeader {
            chunk_type,
            header_size,
            start,
            end,
        })
    }
}

fn truncated() -> ApkError {
    malformed("unexpected end of binary XML")
}

fn malformed(msg: &str) -> ApkError {
    ApkError::MalformedManifest(msg.to_string())
}

struct StringPool {
    strings: Vec<String>,
}

impl StringPool {
    fn parse(reader: &mut Reader<'_>, header: &ChunkHeader) -> Result<Self, ApkError> {
        let string_count = reader.read_u32()? as usize;
        let style_count = reader.read_u32()? as usize;
        let flags = reader.read_u32()?;
        let strings_start = reader.read_u32()? as usize;
        let _styles_start = reader.read_u32()?;

        let is_utf8 = (flags & STRING_FLAG_UTF8) != 0;

        let mut offsets = Vec::with_capacity(string_count);
        for _ in 0..string_count {
            offsets.push(reader.read_u32()? as usize);
        }
        for _ in 0..style_count {
            reader.read_u32()?; // style offsets, unused
        }

        let base = header.start + strings_start;
        let limit = header.end;

        let mut strings = Vec::with_capacity(string_count);
        for offset in offsets {
            let absolute = base
                .checked_add(offset)
                .filter(|a| *a < limit)
                .ok_or_else(|| malformed("string offset exceeds pool bounds"))?;
            let text = if is_utf8 {
                read_utf8_string(reader.data, absolute, limit)?
            } else {
                read_utf16_string(reader.data, absolute, limit)?
            };
            strings.push(text);
        }

        Ok(StringPool { strings })
    }

    fn get(&self, idx: u32) -> Option<&str> {
        if idx == NO_ENTRY_INDEX {
            return None;
        }
        self.strings.get(idx as usize).map(|s| s.as_str())
    }
}

fn read_utf8_string(data: &[u8], offset: usize, limit: usize) -> Result<String, ApkError> {
    let mut cursor = offset;
    let (_char_len, header) = read_utf8_length(data, cursor, limit)?;
    cursor += header;
    let (byte_len, header) = read_utf8_length(data, cursor, limit)?;
    cursor += header;
    if cursor + byte_len > limit {
        return Err(malformed("UTF-8 string exceeds pool bounds"));
    }
    let text = std::str::from_utf8(&data[cursor..cursor + byte_len])
        .map_err(|e| malformed(&e.to_string()))?;
    Ok(text.to_string())
}

fn read_utf16_string(data: &[u8], offset: usize, limit: usize) -> Result<String, ApkError> {
    let mut cursor = offset;
    let (char_count, header) = read_utf16_length(data, cursor, limit)?;
    cursor += header;
    let byte_len = char_count * 2;
    if cursor + byte_len > limit {
        return Err(malformed("UTF-16 string exceeds pool bounds"));
    }
    let mut units = Vec::with_capacity(char_count);
    for pair in data[cursor..cursor + byte_len].chunks_exact(2) {
        units.push(u16::from_le_bytes([pair[0], pair[1]]));
    }
    String::from_utf16(&units).map_err(|e| malformed(&e.to_string()))
}

fn read_utf8_length(data: &[u8], offset: usize, limit: usize) -> Result<(usize, usize), ApkError> {
    if offset >= limit {
        return Err(malformed("truncated UTF-8 length"));
    }
    let first = data[offset];
    if first & 0x80 == 0 {
        Ok((first as usize, 1))
    } else {
        if offset + 1 >= limit {
            return Err(malformed("truncated UTF-8 length"));
        }
        let second = data[offset + 1];
        Ok(((((first & 0x7F) as usize) << 8) | second as usize, 2))
    }
}

fn read_utf16_length(data: &[u8], offset: usize, limit: usize) -> Result<(usize, usize), ApkError> {
    if offset + 2 > limit {
        return Err(malformed("truncated UTF-16 length"));
    }
    let first = u16::from_le_bytes([data[offset], data[offset + 1]]);
    if first & 0x8000 == 0 {
        Ok((first as usize, 2))
    } else {
        if offset + 4 > limit {
            return Err(malformed("truncated UTF-16 length"));
        }
        let second = u16::from_le_bytes([data[offset + 2], data[offset + 3]]);
        Ok(((((first & 0x7FFF) as usize) << 16) | second as usize, 4))
    }
}

/// Decode the root element's identity attributes from compiled manifest bytes.
///
/// Walks chunks until the first start element, which must be `<manifest>`;
/// later elements are irrelevant to identity and are never visited.
pub(crate) fn read_root_attributes(bytes: &[u8]) -> Result<RootAttributes, ApkError> {
    let mut reader = Reader::new(bytes);

    let doc = reader.read_chunk_header()?;
    if doc.chunk_type != RES_XML_TYPE {
        return Err(malformed("document does not start with a binary XML header"));
    }
    reader.seek(doc.start + doc.header_size as usize)?;

    let mut pool: Option<StringPool> = None;

    while reader.pos < doc.end {
        let chunk = reader.read_chunk_header()?;
        match chunk.chunk_type {
            RES_STRING_POOL_TYPE => {
                pool = Some(StringPool::parse(&mut reader, &chunk)?);
            }
            RES_XML_START_ELEMENT_TYPE => {
                let pool = pool
                    .as_ref()
                    .ok_or_else(|| malformed("element encountered before string pool"))?;
                return read_manifest_element(&mut reader, pool);
            }
            _ => {
                // Resource maps, namespaces, and anything newer are skipped.
            }
        }
        reader.seek(chunk.end)?;
    }

    Err(malformed("document has no manifest element"))
}

fn read_manifest_element(
    reader: &mut Reader<'_>,
    pool: &StringPool,
) -> Result<RootAttributes, ApkError> {
    reader.read_u32()?; // line number
    reader.read_u32()?; // comment
    reader.read_u32()?; // namespace
    let name_idx = reader.read_u32()?;
    reader.read_u16()?; // attributeStart
    reader.read_u16()?; // attributeSize
    let attr_count = reader.read_u16()? as usize;
    reader.read_u16()?; // idIndex
    reader.read_u16()?; // classIndex
    reader.read_u16()?; // styleIndex

    let tag = pool
        .get(name_idx)
        .ok_or_else(|| malformed("element references invalid string index"))?;
    if tag != "manifest" {
        return Err(malformed("root element is not <manifest>"));
    }

    let mut attrs = RootAttributes::default();
    for _ in 0..attr_count {
        reader.read_u32()?; // attribute namespace
        let name_idx = reader.read_u32()?;
        let raw_value_idx = reader.read_u32()?;
        let value_size = reader.read_u16()?;
        reader.read_u8()?; // res0
        let data_type = reader.read_u8()?;
        let data = reader.read_u32()?;
        if value_size != 8 {
            return Err(malformed("attribute value size must be 8"));
        }

        let name = pool
            .get(name_idx)
            .ok_or_else(|| malformed("attribute name references invalid string index"))?;

        match name {
            "package" => attrs.package = string_value(pool, raw_value_idx, data_type, data),
            "versionName" => {
                attrs.version_name = string_value(pool, raw_value_idx, data_type, data)
            }
            "versionCode" => attrs.version_code = integer_value(data_type, data),
            _ => {}
        }
    }

    Ok(attrs)
}

fn string_value(pool: &StringPool, raw_idx: u32, data_type: u8, data: u32) -> Option<String> {
    // The raw string slot takes priority; typed TYPE_STRING data is the
    // fallback, matching how aapt2 emits manifest attributes.
    pool.get(raw_idx)
        .or_else(|| {
            if data_type == TYPE_STRING {
                pool.get(data)
            } else {
                None
            }
        })
        .map(|s| s.to_string())
}

fn integer_value(data_type: u8, data: u32) -> Option<i64> {
    match data_type {
        TYPE_INT_DEC | TYPE_INT_HEX => Some(i64::from(data as i32)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apk::fixtures::build_manifest;

    #[test]
    fn test_reads_identity_attributes() {
        let bytes = build_manifest("ch.threema.app.libre", "5.2", 1520);
        let attrs = read_root_attributes(&bytes).unwrap();
        assert_eq!(attrs.package.as_deref(), Some("ch.threema.app.libre"));
        assert_eq!(attrs.version_name.as_deref(), Some("5.2"));
        assert_eq!(attrs.version_code, Some(1520));
    }

    #[test]
    fn test_rejects_wrong_magic() {
        let err = read_root_attributes(b"\xCA\xFE\xBA\xBEwhatever").unwrap_err();
        assert!(matches!(err, ApkError::MalformedManifest(_)));
    }

    #[test]
    fn test_rejects_truncated_document() {
        let mut bytes = build_manifest("com.example", "1.0", 1);
        bytes.truncate(bytes.len() / 2);
        // Either a chunk or a string read runs off the end; both are malformed.
        let err = read_root_attributes(&bytes).unwrap_err();
        assert!(matches!(err, ApkError::MalformedManifest(_)));
    }

    #[test]
    fn test_rejects_empty_input() {
        let err = read_root_attributes(&[]).unwrap_err();
        assert!(matches!(err, ApkError::MalformedManifest(_)));
    }
}
