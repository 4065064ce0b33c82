use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Result;

use phenosift_common::ClusterEntry;

/// Write cluster entries as NDJSON, one entry per line, selection order
/// preserved.
pub fn write_ndjson(path: &Path, entries: &[ClusterEntry]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for entry in entries {
        serde_json::to_writer(&mut writer, entry)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_json_object_per_line() {
        let entries = vec![
            ClusterEntry {
                code: 195967001,
                label: "Asthma".to_string(),
                raw_difference: 0.4,
                boosted_difference: 0.52,
                depth: 3,
            },
            ClusterEntry {
                code: 84114007,
                label: "Heart failure".to_string(),
                raw_difference: -0.3,
                boosted_difference: -0.39,
                depth: 3,
            },
        ];

        let file = tempfile::NamedTempFile::new().unwrap();
        write_ndjson(file.path(), &entries).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: ClusterEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.code, 195967001);
        let second: ClusterEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.label, "Heart failure");
    }
}
