//! Conversion reports.
//!
//! A report summarizes what a keypoint conversion touched (container kind,
//! counts, metadata channels) and flags anything the caller should know
//! about, similar to a compiler's diagnostics.

use serde::Serialize;
use std::fmt;

use crate::keypoints::{format_shape, Coord, Images, Keypoints, Pixel, Relative};

/// A report generated for one keypoint conversion.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ConversionReport {
    /// Source format name.
    pub from: String,
    /// Target format name.
    pub to: String,
    /// Counts and layout of the converted keypoints.
    pub counts: ConversionCounts,
    /// Image dimensions used, if any (e.g. `500x1000`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<String>,
    /// Issues noticed while converting.
    pub issues: Vec<ConversionIssue>,
}

impl ConversionReport {
    /// Create a new empty report for a conversion between formats.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            ..Default::default()
        }
    }

    /// Add an issue to the report.
    pub fn add(&mut self, issue: ConversionIssue) {
        self.issues.push(issue);
    }

    /// Count of warning-level issues.
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == ConversionSeverity::Warning)
            .count()
    }

    /// Count of info-level issues.
    pub fn info_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == ConversionSeverity::Info)
            .count()
    }

    /// Returns true if no warnings were raised.
    pub fn is_clean(&self) -> bool {
        self.warning_count() == 0
    }
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Converted {} -> {}: {} keypoint(s), {} {} {}",
            self.from,
            self.to,
            self.counts.keypoints,
            self.counts.container,
            self.counts.shape,
            match self.counts.batch {
                Some(n) => format!("(batch of {})", n),
                None => "(unbatched)".to_string(),
            }
        )?;
        if self.counts.metadata_channels > 0 {
            writeln!(
                f,
                "  {} metadata channel(s) carried through",
                self.counts.metadata_channels
            )?;
        }
        if let Some(images) = &self.images {
            writeln!(f, "  images: {}", images)?;
        }

        let warnings = self.warning_count();
        if warnings > 0 {
            writeln!(f)?;
            writeln!(f, "Warnings ({}):", warnings)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == ConversionSeverity::Warning)
            {
                writeln!(f, "  - {}", issue.message)?;
            }
        }

        let infos = self.info_count();
        if infos > 0 {
            writeln!(f)?;
            writeln!(f, "Notes ({}):", infos)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == ConversionSeverity::Info)
            {
                writeln!(f, "  - {}", issue.message)?;
            }
        }

        Ok(())
    }
}

/// Layout of the converted keypoints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConversionCounts {
    /// `dense` or `ragged`.
    pub container: String,
    /// Shape, with `None` for ragged axes.
    pub shape: String,
    /// Number of images, if batched.
    pub batch: Option<usize>,
    pub keypoints: usize,
    pub metadata_channels: usize,
}

impl ConversionCounts {
    pub fn of(keypoints: &Keypoints) -> Self {
        Self {
            container: if keypoints.is_ragged() { "ragged" } else { "dense" }.to_string(),
            shape: format_shape(&keypoints.shape()),
            batch: keypoints.batch_len(),
            keypoints: keypoints.num_keypoints(),
            metadata_channels: keypoints.metadata_width(),
        }
    }
}

/// A single issue noticed during conversion.
#[derive(Clone, Debug, Serialize)]
pub struct ConversionIssue {
    pub severity: ConversionSeverity,
    pub code: ConversionIssueCode,
    pub message: String,
}

impl ConversionIssue {
    /// Create a warning-level issue.
    pub fn warning(code: ConversionIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: ConversionSeverity::Warning,
            code,
            message: message.into(),
        }
    }

    /// Create an info-level issue.
    pub fn info(code: ConversionIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: ConversionSeverity::Info,
            code,
            message: message.into(),
        }
    }
}

/// Severity level for conversion issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionSeverity {
    /// The output deserves a second look.
    Warning,
    /// Describes what happened; nothing is wrong.
    Info,
}

/// Stable issue codes for programmatic consumption.
///
/// These codes are part of the JSON report schema and should remain stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionIssueCode {
    /// Some converted (x, y) values are NaN or infinite.
    NonFiniteCoordinates,
    /// Converted relative coordinates fall outside `[0, 1]`.
    OutsideImage,
    /// Input held no keypoints.
    NoKeypoints,
    /// Source and target are the same format.
    IdentityConversion,
    /// Metadata channels were copied unchanged.
    MetadataPassthrough,
}

/// Build a report for a finished conversion.
///
/// `relative` is the output expressed in image-relative coordinates, when
/// images were available; it is only used to spot keypoints outside the
/// image.
pub fn build_conversion_report(
    output: &Keypoints,
    from: &str,
    to: &str,
    images: Option<&Images>,
    relative: Option<&Keypoints>,
) -> ConversionReport {
    let mut report = ConversionReport::new(from.to_lowercase(), to.to_lowercase());
    report.counts = ConversionCounts::of(output);
    report.images = images.map(describe_images);

    if report.counts.keypoints == 0 {
        report.add(ConversionIssue::warning(
            ConversionIssueCode::NoKeypoints,
            "input contains no keypoints",
        ));
    }

    let non_finite = output
        .rows()
        .filter_map(|row| coord_of::<Pixel>(&row))
        .filter(|point| !point.is_finite())
        .count();
    if non_finite > 0 {
        report.add(ConversionIssue::warning(
            ConversionIssueCode::NonFiniteCoordinates,
            format!(
                "{} keypoint(s) have non-finite coordinates (check for zero-sized images)",
                non_finite
            ),
        ));
    }

    if let Some(relative) = relative {
        let outside = relative
            .rows()
            .filter_map(|row| coord_of::<Relative>(&row))
            .filter(|point| !(0.0..=1.0).contains(&point.x) || !(0.0..=1.0).contains(&point.y))
            .count();
        if outside > 0 {
            report.add(ConversionIssue::warning(
                ConversionIssueCode::OutsideImage,
                format!("{} keypoint(s) lie outside their image", outside),
            ));
        }
    }

    if report.from == report.to {
        report.add(ConversionIssue::info(
            ConversionIssueCode::IdentityConversion,
            "source and target formats match; keypoints returned unchanged",
        ));
    }
    if report.counts.metadata_channels > 0 {
        report.add(ConversionIssue::info(
            ConversionIssueCode::MetadataPassthrough,
            format!(
                "{} metadata channel(s) per keypoint copied unchanged",
                report.counts.metadata_channels
            ),
        ));
    }

    report
}

/// The (x, y) pair of a row, or `None` if the row has fewer than two channels.
fn coord_of<TSpace>(row: &[f64]) -> Option<Coord<TSpace>> {
    match row {
        [x, y, ..] => Some(Coord::new(*x, *y)),
        _ => None,
    }
}

fn describe_images(images: &Images) -> String {
    match images {
        Images::Shape(shape) => format_shape(&shape.iter().copied().map(Some).collect::<Vec<_>>()),
        Images::Single(size) => size.to_string(),
        Images::Batch(sizes) => sizes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
    }
}
