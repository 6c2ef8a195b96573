use crate::error::{HcpError, Result};
use std::path::Path;

/// One trial as written in an EV file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvTrial {
    pub onset: f64,
    pub duration: f64,
    pub amplitude: f64,
}

/// Parse whitespace-separated `onset duration [amplitude]` lines, ignoring
/// blank/comment lines. Empty input yields no trials.
pub fn parse_ev_text(text: &str, path: &Path) -> Result<Vec<EvTrial>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let err = |message: String| HcpError::EvParse {
            path: path.to_path_buf(),
            line: idx + 1,
            message,
        };
        let values = trimmed
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|_| err(format!("'{token}' is not a number")))
            })
            .collect::<Result<Vec<f64>>>()?;
        let (onset, duration, amplitude) = match values.as_slice() {
            [onset, duration] => (*onset, *duration, 1.0),
            [onset, duration, amplitude] => (*onset, *duration, *amplitude),
            _ => {
                return Err(err(format!(
                    "expected onset, duration and optional amplitude, found {} columns",
                    values.len()
                )))
            }
        };
        if !(onset.is_finite() && onset >= 0.0) {
            return Err(err(format!("onset {onset} must be a non-negative time")));
        }
        if !(duration.is_finite() && duration >= 0.0) {
            return Err(err(format!("duration {duration} must be non-negative")));
        }
        out.push(EvTrial {
            onset,
            duration,
            amplitude,
        });
    }
    Ok(out)
}

/// Read an EV file from disk. A present-but-empty file is zero trials.
pub fn read_ev_file(path: &Path) -> Result<Vec<EvTrial>> {
    let text = std::fs::read_to_string(path).map_err(|source| HcpError::io(path, source))?;
    parse_ev_text(&text, path)
}
