//! Bucket and order nomenclature.
//!
//! Uploaded clips live under `<bucket>/<order>/`, where the bucket
//! encodes the organizational identifiers and the order name encodes
//! the capture context. The storage bucket itself drops the order
//! component so all of a contract's orders share one bucket.

use chrono::{DateTime, Utc};

/// Composite bucket name: country + customer + contract + order.
pub fn bucket_name(country: &str, customer: u64, contract: u64, order: u64) -> String {
    format!("{country}{customer:04}{contract:04}{order:04}")
}

/// The S3 bucket a composite name maps to: the composite without its
/// trailing order component.
pub fn storage_bucket(bucket: &str) -> &str {
    let cut = bucket.len().saturating_sub(4);
    &bucket[..cut]
}

/// Order name: store + area + camera + capture timestamp.
pub fn order_name(store: u64, area: &str, camera: u64, at: DateTime<Utc>) -> String {
    format!("{store:06}{area}{camera:02}{}", at.format("%Y%m%d%H%M%S"))
}

/// Single-letter suffix encoding which processing stages ran, kept in
/// the output file name for traceability.
pub fn video_type(compress: bool, trim: bool, trim_compressed: bool) -> &'static str {
    match (compress, trim, trim_compressed) {
        (true, true, true) => "a",
        (true, true, false) => "b",
        (true, false, _) => "c",
        (false, true, _) => "d",
        (false, false, _) => "e",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_bucket_name_zero_padded() {
        let bucket = bucket_name("xa", 7, 12, 345);
        assert_eq!(bucket, "xa000700120345");
        assert_eq!(storage_bucket(&bucket), "xa00070012");
    }

    #[test]
    fn test_order_name() {
        let at = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(order_name(42, "e", 3, at), "000042e0320210304050607");
    }

    #[test]
    fn test_video_type_codes() {
        assert_eq!(video_type(true, true, true), "a");
        assert_eq!(video_type(false, false, true), "e");
    }
}
