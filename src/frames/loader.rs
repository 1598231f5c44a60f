use anyhow::{Context, Result};
use std::path::Path;

use super::model::FrameSequence;

pub fn load_sequence(path: &Path) -> Result<FrameSequence> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read feature file: {}", path.display()))?;
    let sequence = parse_sequence(&content)
        .with_context(|| format!("Failed to parse feature file: {}", path.display()))?;

    log::info!(
        "Loaded {} frames, {:.2}s, {} overall dominant colors",
        sequence.len(),
        sequence.video_duration,
        sequence.overall_dominant_colors.len()
    );

    let missing = sequence
        .frames
        .iter()
        .filter(|f| f.dominant_colors.is_empty())
        .count();
    if missing > 0 {
        log::warn!("{} frame(s) have no dominant colors; black will be used", missing);
    }

    Ok(sequence)
}

pub fn parse_sequence(content: &str) -> Result<FrameSequence> {
    let sequence: FrameSequence = serde_json::from_str(content)?;
    if !(sequence.video_duration.is_finite() && sequence.video_duration >= 0.0) {
        anyhow::bail!("video_duration must be a non-negative number");
    }
    Ok(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"{
        "video_duration": 2.0,
        "overall_dominant_colors": [
            {"rgb": [10, 20, 30], "hex": "#0a141e", "name": "navy"}
        ],
        "frames": [
            {"brightness": 120.5, "dominant_colors": [
                {"rgb": [255, 0, 0], "hex": "#ff0000", "name": "red"}
            ], "motion": 0.3},
            {"brightness": 80.0}
        ]
    }"##;

    #[test]
    fn parses_feature_file() {
        let seq = parse_sequence(SAMPLE).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.frames[0].dominant_colors[0].hex, "#ff0000");
        assert_eq!(seq.frames[0].motion, Some(0.3));
        assert!(seq.frames[1].dominant_colors.is_empty());
        assert_eq!(seq.overall_dominant_colors[0].name, "navy");
    }

    #[test]
    fn rejects_negative_duration() {
        let bad = r#"{"video_duration": -1.0, "frames": []}"#;
        assert!(parse_sequence(bad).is_err());
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.json");
        std::fs::write(&path, SAMPLE).unwrap();
        let seq = load_sequence(&path).unwrap();
        assert_eq!(seq.len(), 2);
    }
}
