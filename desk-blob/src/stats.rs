//! Dashboard numbers over a (usually date-filtered) listing.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::listing::{collate, MediaCategory};
use crate::Blob;

pub const DEFAULT_RECENT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
    pub total: usize,
    pub images: usize,
    pub videos: usize,
    pub other: usize,
    pub total_bytes: u64,
    pub recent: Vec<Blob>,
    /// Ascending by date; blobs without a timestamp are not counted.
    pub per_day: Vec<DailyCount>,
}

impl LibraryStats {
    pub fn compute(blobs: &[Blob]) -> Self {
        Self::compute_with_recent(blobs, DEFAULT_RECENT)
    }

    pub fn compute_with_recent(blobs: &[Blob], recent_n: usize) -> Self {
        let mut stats = LibraryStats {
            total: blobs.len(),
            ..Default::default()
        };
        let mut days: BTreeMap<NaiveDate, usize> = BTreeMap::new();

        for blob in blobs {
            match blob.category {
                MediaCategory::Image => stats.images += 1,
                MediaCategory::Video => stats.videos += 1,
                MediaCategory::Other => stats.other += 1,
            }
            stats.total_bytes += blob.size_bytes;

            if let Some(day) = blob
                .created_at
                .and_then(DateTime::from_timestamp_millis)
                .map(|dt| dt.date_naive())
            {
                *days.entry(day).or_default() += 1;
            }
        }

        stats.recent = recent(blobs, recent_n);
        stats.per_day = days
            .into_iter()
            .map(|(date, count)| DailyCount { date, count })
            .collect();
        stats
    }
}

/// The `n` newest blobs by `createdAt`; untimestamped ones are skipped.
pub fn recent(blobs: &[Blob], n: usize) -> Vec<Blob> {
    let mut timed: Vec<&Blob> = blobs.iter().filter(|b| b.created_at.is_some()).collect();
    timed.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| collate(&a.stored_name, &b.stored_name))
    });
    timed.into_iter().take(n).cloned().collect()
}

/// Download name of [`export_csv`] output.
pub const EXPORT_FILE_NAME: &str = "files_data.csv";

/// `Filename,URL` rows for the given listing, in listing order.
pub fn export_csv(blobs: &[Blob]) -> csv::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Filename", "URL"])?;
    for blob in blobs {
        writer.write_record([blob.stored_name.as_str(), blob.access_url.as_str()])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::tests::blob;

    #[test]
    fn counts_by_category_and_day() {
        // 2024-03-10 and 2024-03-11 (UTC)
        let d1 = 1_710_028_800_000i64;
        let d2 = d1 + 86_400_000;
        let blobs = vec![
            blob(&format!("{}-a.png", d1 + 10)),
            blob(&format!("{}-b.mp4", d1 + 20)),
            blob(&format!("{}-c.txt", d2 + 5)),
            blob("undated.jpg"),
        ];

        let stats = LibraryStats::compute(&blobs);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.images, 2);
        assert_eq!(stats.videos, 1);
        assert_eq!(stats.other, 1);
        assert_eq!(stats.total_bytes, 4);
        assert_eq!(
            stats.per_day,
            vec![
                DailyCount {
                    date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
                    count: 2
                },
                DailyCount {
                    date: NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
                    count: 1
                },
            ]
        );
        assert_eq!(stats.recent.len(), 3);
        assert!(stats.recent[0].stored_name.ends_with("-c.txt"));
    }

    #[test]
    fn recent_keeps_newest_five() {
        let blobs: Vec<Blob> = (1..=8).map(|i| blob(&format!("{}-f{i}.png", i * 1000))).collect();
        let top = recent(&blobs, DEFAULT_RECENT);
        let names: Vec<_> = top.iter().map(|b| b.stored_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["8000-f8.png", "7000-f7.png", "6000-f6.png", "5000-f5.png", "4000-f4.png"]
        );
    }

    #[test]
    fn csv_export_lists_filename_and_url() {
        let blobs = vec![blob("1000-a.png"), blob("2000-holiday, beach.mp4")];
        let out = export_csv(&blobs).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Filename,URL");
        assert_eq!(lines[1], "1000-a.png,/uploads/1000-a.png");
        // commas in names are quoted, not split
        assert_eq!(
            lines[2],
            "\"2000-holiday, beach.mp4\",\"/uploads/2000-holiday, beach.mp4\""
        );
        assert_eq!(lines.len(), 3);

        assert_eq!(export_csv(&[]).unwrap().trim_end(), "Filename,URL");
    }
}
