//! gzip-compressed JSON, the encoding of bucket and backup blobs.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("gzip error: {0}")]
    Gzip(#[from] std::io::Error),
}

pub fn compress_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    serde_json::to_writer(&mut encoder, value)?;
    Ok(encoder.finish()?)
}

pub fn decompress_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    let decoder = GzDecoder::new(bytes);
    Ok(serde_json::from_reader(decoder)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;
    use std::io::Read;

    #[test]
    fn test_output_is_plain_gzip_of_json() {
        let items = vec![Item::new("Cola", 1.5).with_id("i1")];
        let bytes = compress_json(&items).unwrap();

        // gzip magic
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);

        let mut json = String::new();
        GzDecoder::new(&bytes[..]).read_to_string(&mut json).unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("\"id\":\"i1\""));
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        let result: Result<Vec<Item>, _> = decompress_json(b"not gzip");
        assert!(result.is_err());
    }

    #[test]
    fn test_decompress_reads_foreign_encoder_output() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
        std::io::Write::write_all(&mut encoder, br#"[{"a":1},{"a":2}]"#).unwrap();
        let bytes = encoder.finish().unwrap();

        let values: Vec<serde_json::Value> = decompress_json(&bytes).unwrap();
        assert_eq!(values.len(), 2);
    }
}
