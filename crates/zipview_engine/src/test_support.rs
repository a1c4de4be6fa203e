//! Helpers shared by the engine's tests.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

/// A member to write into a test archive. `None` content makes a directory.
pub type TestMember<'a> = (&'a str, Option<&'a [u8]>);

/// Build a deflate-compressed archive in memory.
pub fn build_zip(members: &[TestMember<'_>]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (path, content) in members {
        match content {
            Some(content) => {
                writer.start_file(*path, options).unwrap();
                writer.write_all(content).unwrap();
            }
            None => writer.add_directory(*path, options).unwrap(),
        }
    }
    writer.finish().unwrap().into_inner()
}

/// One directory with two files in it.
pub fn sample_zip() -> Vec<u8> {
    build_zip(&[
        ("docs/", None),
        ("docs/readme.md", Some(b"# Hello\n")),
        ("docs/logo.png", Some(b"\x89PNG\r\n\x1a\n")),
    ])
}
