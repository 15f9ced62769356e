//! Per-pixel text interchange format.
//!
//! The simulator reads and writes frames as plain text: one line per pixel,
//! in row-major scan order starting at the top-left corner. RGB frames carry
//! three whitespace-separated decimal values per line (`"R G B"`), single
//! channel frames carry one. Binary-channel artifacts store `0`/`1`, which
//! are scaled to `0`/`255` when decoded.
//!
//! The functions here are pure: they never touch the filesystem, and the
//! same input always produces the same output.
//!
//! # Example
//!
//! ```
//! use image::RgbImage;
//! use vidbridge::{ChannelKind, RasterFrame, codec};
//!
//! let frame = RasterFrame::Rgb(RgbImage::from_pixel(2, 1, image::Rgb([1, 2, 3])));
//! let text = codec::encode_rgb_frame(&frame)?;
//! assert_eq!(text, "1 2 3\n1 2 3\n");
//!
//! let decoded = codec::decode_channel_frame(&text, 2, 1, ChannelKind::Rgb)?;
//! assert_eq!(decoded, frame);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use image::{GrayImage, RgbImage};

use crate::{
    error::{DecodeError, EncodeError},
    frame::{ChannelKind, RasterFrame},
};

/// Serialise an RGB frame as `width * height` lines of `"R G B"`.
///
/// # Errors
///
/// - [`EncodeError::ZeroDimensions`] if either dimension is zero.
/// - [`EncodeError::ChannelCount`] if the frame is not RGB.
pub fn encode_rgb_frame(frame: &RasterFrame) -> Result<String, EncodeError> {
    check_dimensions(frame)?;
    let RasterFrame::Rgb(image) = frame else {
        return Err(EncodeError::ChannelCount {
            expected: 3,
            found: frame.channel_count(),
        });
    };

    // "255 255 255\n" is the longest possible line.
    let mut text = String::with_capacity(image.as_raw().len() / 3 * 12);
    for pixel in image.pixels() {
        let [red, green, blue] = pixel.0;
        text.push_str(&format!("{red} {green} {blue}\n"));
    }
    Ok(text)
}

/// Serialise a frame using the text form of `kind`.
///
/// `Rgb` delegates to [`encode_rgb_frame`]. `Luma` writes one value per line.
/// `Binary` writes `0` for black and `1` for white, the inverse of the
/// scaling applied by [`decode_channel_frame`].
///
/// # Errors
///
/// - [`EncodeError::ZeroDimensions`] if either dimension is zero.
/// - [`EncodeError::ChannelCount`] if the frame layout does not match `kind`.
/// - [`EncodeError::NotBinary`] for a binary encode of a value other than
///   0 or 255.
pub fn encode_frame(frame: &RasterFrame, kind: ChannelKind) -> Result<String, EncodeError> {
    if kind == ChannelKind::Rgb {
        return encode_rgb_frame(frame);
    }

    check_dimensions(frame)?;
    let RasterFrame::Luma(image) = frame else {
        return Err(EncodeError::ChannelCount {
            expected: 1,
            found: frame.channel_count(),
        });
    };

    let mut text = String::with_capacity(image.as_raw().len() * 4);
    for (index, &value) in image.as_raw().iter().enumerate() {
        let stored = match (kind, value) {
            (ChannelKind::Binary, 0) => 0,
            (ChannelKind::Binary, u8::MAX) => 1,
            (ChannelKind::Binary, value) => {
                return Err(EncodeError::NotBinary { index, value });
            }
            (_, value) => value,
        };
        text.push_str(&stored.to_string());
        text.push('\n');
    }
    Ok(text)
}

/// Parse exactly `width * height` pixel lines into a frame.
///
/// Blank lines are ignored and values may be separated by any run of
/// whitespace, so space-padded simulator output decodes as expected. For
/// [`ChannelKind::Binary`] every stored value is multiplied by 255.
///
/// # Errors
///
/// - [`DecodeError::LineCountMismatch`] if the number of pixel lines is not
///   `width * height`. Short or long input is never reshaped.
/// - [`DecodeError::OutOfRange`] for a value outside `0..=255`, or outside
///   `{0, 1}` for binary.
/// - [`DecodeError::InvalidToken`] for a token that is not an integer.
/// - [`DecodeError::TokenCount`] for a line with the wrong number of values.
/// - [`DecodeError::ZeroDimensions`] if either dimension is zero.
pub fn decode_channel_frame(
    text: &str,
    width: u32,
    height: u32,
    kind: ChannelKind,
) -> Result<RasterFrame, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::ZeroDimensions { width, height });
    }

    let expected = (width as usize) * (height as usize);
    let values_per_pixel = kind.values_per_pixel();
    let max = kind.max_stored_value();
    let mut buffer = Vec::with_capacity(expected * values_per_pixel);
    let mut pixel_lines = 0usize;

    for (line_index, line) in text.lines().enumerate() {
        let line_number = line_index + 1;
        let mut found = 0usize;

        for token in line.split_whitespace() {
            found += 1;
            if found > values_per_pixel {
                continue;
            }
            let value = parse_value(token, line_number, max)?;
            buffer.push(if kind == ChannelKind::Binary {
                value * u8::MAX
            } else {
                value
            });
        }

        if found == 0 {
            continue;
        }
        if found != values_per_pixel {
            return Err(DecodeError::TokenCount {
                line: line_number,
                expected: values_per_pixel,
                found,
            });
        }
        pixel_lines += 1;
    }

    if pixel_lines != expected {
        return Err(DecodeError::LineCountMismatch {
            expected,
            found: pixel_lines,
        });
    }

    let mismatch = DecodeError::LineCountMismatch {
        expected,
        found: pixel_lines,
    };
    match kind {
        ChannelKind::Rgb => RgbImage::from_raw(width, height, buffer)
            .map(RasterFrame::Rgb)
            .ok_or(mismatch),
        ChannelKind::Luma | ChannelKind::Binary => GrayImage::from_raw(width, height, buffer)
            .map(RasterFrame::Luma)
            .ok_or(mismatch),
    }
}

fn check_dimensions(frame: &RasterFrame) -> Result<(), EncodeError> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(EncodeError::ZeroDimensions { width, height });
    }
    Ok(())
}

fn parse_value(token: &str, line: usize, max: u8) -> Result<u8, DecodeError> {
    let digits = token.strip_prefix(['-', '+']).unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(DecodeError::InvalidToken {
            line,
            token: token.to_string(),
        });
    }

    // Well-formed integers too long for i64 are still out of range.
    let value: i64 = token.parse().unwrap_or(if token.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    });
    if !(0..=i64::from(max)).contains(&value) {
        return Err(DecodeError::OutOfRange { line, value, max });
    }
    Ok(value as u8)
}
