//! Synthetic package fixtures
//!
//! Builders that emit a minimal compiled manifest and a minimal APK around
//! it, so tests can exercise the extraction path without shipping binary
//! assets. Only compiled into test builds (or with the `fixtures` feature,
//! which exists so dependent crates can use these in their own tests).

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const RES_XML_TYPE: u16 = 0x0003;
const RES_STRING_POOL_TYPE: u16 = 0x0001;
const RES_XML_START_ELEMENT_TYPE: u16 = 0x0102;
const RES_XML_END_ELEMENT_TYPE: u16 = 0x0103;

const NO_ENTRY_INDEX: u32 = 0xFFFF_FFFF;

const TYPE_STRING: u8 = 0x03;
const TYPE_INT_DEC: u8 = 0x10;

/// Compiled `AndroidManifest.xml` bytes declaring the given identity.
pub fn build_manifest(package: &str, version_name: &str, version_code: i64) -> Vec<u8> {
    let mut pool = PoolBuilder::new();
    let tag_manifest = pool.intern("manifest");
    let attr_package = pool.intern("package");
    let attr_version_name = pool.intern("versionName");
    let attr_version_code = pool.intern("versionCode");
    let val_package = pool.intern(package);
    let val_version_name = pool.intern(version_name);

    let mut body = Vec::new();

    // <manifest package=... versionName=... versionCode=...>
    let start = begin_chunk(&mut body, RES_XML_START_ELEMENT_TYPE, 36);
    write_u32(&mut body, 0); // line number
    write_u32(&mut body, NO_ENTRY_INDEX); // comment
    write_u32(&mut body, NO_ENTRY_INDEX); // namespace
    write_u32(&mut body, tag_manifest);
    write_u16(&mut body, 20); // attributeStart
    write_u16(&mut body, 20); // attributeSize
    write_u16(&mut body, 3); // attributeCount
    write_u16(&mut body, 0); // idIndex
    write_u16(&mut body, 0); // classIndex
    write_u16(&mut body, 0); // styleIndex
    write_string_attribute(&mut body, attr_package, val_package);
    write_string_attribute(&mut body, attr_version_name, val_version_name);
    write_int_attribute(&mut body, attr_version_code, version_code as u32);
    finalize_chunk(&mut body, start);

    // </manifest>
    let start = begin_chunk(&mut body, RES_XML_END_ELEMENT_TYPE, 24);
    write_u32(&mut body, 0);
    write_u32(&mut body, NO_ENTRY_INDEX);
    write_u32(&mut body, NO_ENTRY_INDEX);
    write_u32(&mut body, tag_manifest);
    finalize_chunk(&mut body, start);

    let mut document = Vec::new();
    let doc_start = begin_chunk(&mut document, RES_XML_TYPE, 8);
    document.extend_from_slice(&pool.to_chunk());
    document.extend_from_slice(&body);
    finalize_chunk(&mut document, doc_start);
    document
}

/// A minimal APK (ZIP) containing the compiled manifest and a dummy dex.
pub fn build_apk(package: &str, version_name: &str, version_code: i64) -> Vec<u8> {
    let manifest = build_manifest(package, version_name, version_code);
    build_archive(&[("AndroidManifest.xml", &manifest), ("classes.dex", b"dex\n")])
}

/// A valid ZIP that lacks the manifest entry entirely.
pub fn build_apk_without_manifest() -> Vec<u8> {
    build_archive(&[("classes.dex", b"dex\n")])
}

fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in entries {
        writer.start_file(*name, options).expect("start zip entry");
        writer.write_all(data).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

struct PoolBuilder {
    strings: Vec<String>,
}

impl PoolBuilder {
    fn new() -> Self {
        PoolBuilder { strings: Vec::new() }
    }

    fn intern(&mut self, value: &str) -> u32 {
        if let Some(idx) = self.strings.iter().position(|s| s == value) {
            return idx as u32;
        }
        self.strings.push(value.to_string());
        (self.strings.len() - 1) as u32
    }

    fn to_chunk(&self) -> Vec<u8> {
        let string_count = self.strings.len() as u32;
        let header_size = 28u16;
        let strings_start = header_size as u32 + string_count * 4;

        let mut string_data = Vec::new();
        let mut offsets = Vec::with_capacity(self.strings.len());
        for s in &self.strings {
            offsets.push(string_data.len() as u32);
            write_utf16_string(&mut string_data, s);
        }
        align_to_four(&mut string_data);

        let mut chunk = Vec::new();
        let start = begin_chunk(&mut chunk, RES_STRING_POOL_TYPE, header_size);
        write_u32(&mut chunk, string_count);
        write_u32(&mut chunk, 0); // style count
        write_u32(&mut chunk, 0); // flags (UTF-16)
        write_u32(&mut chunk, strings_start);
        write_u32(&mut chunk, 0); // stylesStart
        for offset in offsets {
            write_u32(&mut chunk, offset);
        }
        chunk.extend_from_slice(&string_data);
        finalize_chunk(&mut chunk, start);
        chunk
    }
}

fn write_string_attribute(buf: &mut Vec<u8>, name_idx: u32, value_idx: u32) {
    write_u32(buf, NO_ENTRY_INDEX); // namespace
    write_u32(buf, name_idx);
    write_u32(buf, value_idx); // raw string
    write_u16(buf, 8);
    buf.push(0); // res0
    buf.push(TYPE_STRING);
    write_u32(buf, value_idx);
}

fn write_int_attribute(buf: &mut Vec<u8>, name_idx: u32, value: u32) {
    write_u32(buf, NO_ENTRY_INDEX); // namespace
    write_u32(buf, name_idx);
    write_u32(buf, NO_ENTRY_INDEX); // no raw string
    write_u16(buf, 8);
    buf.push(0); // res0
    buf.push(TYPE_INT_DEC);
    write_u32(buf, value);
}

fn write_utf16_string(buf: &mut Vec<u8>, text: &str) {
    let units: Vec<u16> = text.encode_utf16().collect();
    write_u16(buf, units.len() as u16);
    for unit in units {
        write_u16(buf, unit);
    }
    write_u16(buf, 0);
}

fn begin_chunk(buf: &mut Vec<u8>, chunk_type: u16, header_size: u16) -> usize {
    let start = buf.len();
    write_u16(buf, chunk_type);
    write_u16(buf, header_size);
    write_u32(buf, 0); // chunk size placeholder
    start
}

fn finalize_chunk(buf: &mut Vec<u8>, start: usize) {
    align_to_four(buf);
    let size = (buf.len() - start) as u32;
    buf[start + 4..start + 8].copy_from_slice(&size.to_le_bytes());
}

fn align_to_four(buf: &mut Vec<u8>) {
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

fn write_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn write_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}
