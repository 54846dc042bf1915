//! Characteristic payload decoders.
//!
//! Pure functions operating on raw `&[u8]` slices. Each supported
//! characteristic has a typed parser; [`decode`] dispatches on the
//! characteristic UUID and flattens the typed reading into a [`Sample`].
//!
//! | Characteristic | Metrics |
//! |----------------|---------|
//! | Battery Level `0x2A19` | `battery` |
//! | Heart Rate Measurement `0x2A37` | `hrm` |
//! | Cycling Power Measurement `0x2A63` | `power` |
//! | RSC Measurement `0x2A53` | `speed_ms`, `cadence`, `stride_len_m`, `distance_m` |

use uuid::Uuid;

use crate::error::DecodeError;
use crate::gatt::{
    BATTERY_LEVEL, CYCLING_POWER_MEASUREMENT, HEART_RATE_MEASUREMENT,
    RUNNING_SPEED_CADENCE_MEASUREMENT,
};
use crate::sample::Sample;

/// Heart-rate flag: value is 16-bit.
const HRM_FLAG_U16: u8 = 0x01;
/// RSC flag: stride length present.
const RSC_FLAG_STRIDE: u8 = 0x01;
/// RSC flag: total distance present.
const RSC_FLAG_DISTANCE: u8 = 0x02;

/// Parsed Cycling Power Measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CyclingPower {
    /// Instantaneous power in watts.
    pub power: i16,
    /// Cumulative crank revolutions, when the payload carries it.
    pub crank_revolutions: Option<u16>,
    /// Last crank event time (1/1024 s), when the payload carries it.
    pub last_crank_event: Option<u16>,
}

/// Parsed RSC Measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunningSpeedCadence {
    /// Instantaneous speed in m/s.
    pub speed_ms: f64,
    /// Cadence in steps per minute.
    pub cadence: f64,
    /// Stride length in meters.
    pub stride_len_m: Option<f64>,
    /// Total distance in meters.
    pub distance_m: Option<f64>,
}

/// Decode one characteristic payload into named metrics.
///
/// # Errors
///
/// Returns [`DecodeError::Unrecognized`] for characteristics without a
/// decoding rule and [`DecodeError::Truncated`] when a mandatory field is
/// missing from the payload.
pub fn decode(characteristic: Uuid, payload: &[u8]) -> Result<Sample, DecodeError> {
    match characteristic {
        BATTERY_LEVEL => {
            parse_battery_level(payload).map(|v| Sample::new().with("battery", f64::from(v)))
        }
        HEART_RATE_MEASUREMENT => {
            parse_heart_rate(payload).map(|v| Sample::new().with("hrm", f64::from(v)))
        }
        CYCLING_POWER_MEASUREMENT => {
            parse_cycling_power(payload).map(|cp| Sample::new().with("power", f64::from(cp.power)))
        }
        RUNNING_SPEED_CADENCE_MEASUREMENT => parse_running_speed_cadence(payload).map(|rsc| {
            let mut sample = Sample::new()
                .with("speed_ms", rsc.speed_ms)
                .with("cadence", rsc.cadence);
            if let Some(stride) = rsc.stride_len_m {
                sample.insert("stride_len_m", stride);
            }
            if let Some(distance) = rsc.distance_m {
                sample.insert("distance_m", distance);
            }
            sample
        }),
        other => Err(DecodeError::Unrecognized(other)),
    }
}

/// Battery Level: byte 0 is an unsigned percentage.
///
/// # Errors
///
/// Returns [`DecodeError::Truncated`] on an empty payload.
pub fn parse_battery_level(data: &[u8]) -> Result<u8, DecodeError> {
    require("battery level", data, 1)?;
    Ok(data[0])
}

/// Heart Rate Measurement.
///
/// | Offset | Field | Type |
/// |--------|-------|------|
/// | 0 | Flags | u8, bit 0 selects the value width |
/// | 1 | Heart rate | u8, or u16 LE when bit 0 is set |
///
/// # Errors
///
/// Returns [`DecodeError::Truncated`] when the value bytes are missing.
pub fn parse_heart_rate(data: &[u8]) -> Result<u16, DecodeError> {
    require("heart rate", data, 2)?;
    if data[0] & HRM_FLAG_U16 != 0 {
        require("heart rate", data, 3)?;
        Ok(u16::from_le_bytes([data[1], data[2]]))
    } else {
        Ok(u16::from(data[1]))
    }
}

/// Cycling Power Measurement.
///
/// | Offset | Field | Type |
/// |--------|-------|------|
/// | 0–1 | Flags | u16 LE, unused here |
/// | 2–3 | Instantaneous power | i16 LE, W |
/// | 4–5 | Crank revolutions | u16 LE |
/// | 6–7 | Last crank event time | u16 LE |
///
/// # Errors
///
/// Returns [`DecodeError::Truncated`] when the power field is missing.
pub fn parse_cycling_power(data: &[u8]) -> Result<CyclingPower, DecodeError> {
    require("cycling power", data, 4)?;
    Ok(CyclingPower {
        power: i16::from_le_bytes([data[2], data[3]]),
        crank_revolutions: u16_at(data, 4),
        last_crank_event: u16_at(data, 6),
    })
}

/// RSC Measurement.
///
/// | Offset | Field | Type |
/// |--------|-------|------|
/// | 0 | Flags | u8 |
/// | 1–2 | Speed | u16 LE, 1/256 m/s |
/// | 3 | Cadence | u8, strides/min (reported ×2 as steps/min) |
/// | 4–5 | Stride length (flag bit 0) | u16 LE, cm |
/// | 6–7 | Total distance (flag bit 1) | u16 LE, dm |
///
/// Optional fields whose flag is set but whose bytes are missing are skipped.
///
/// # Errors
///
/// Returns [`DecodeError::Truncated`] when speed or cadence is missing.
pub fn parse_running_speed_cadence(data: &[u8]) -> Result<RunningSpeedCadence, DecodeError> {
    require("running speed/cadence", data, 4)?;
    let flags = data[0];
    let speed = u16::from_le_bytes([data[1], data[2]]);
    let cadence = data[3];

    let stride_len_m = (flags & RSC_FLAG_STRIDE != 0)
        .then(|| u16_at(data, 4))
        .flatten()
        .map(|v| f64::from(v) / 100.0);
    let distance_m = (flags & RSC_FLAG_DISTANCE != 0)
        .then(|| u16_at(data, 6))
        .flatten()
        .map(|v| f64::from(v) / 10.0);

    Ok(RunningSpeedCadence {
        speed_ms: f64::from(speed) / 256.0,
        cadence: f64::from(cadence) * 2.0,
        stride_len_m,
        distance_m,
    })
}

fn require(format: &'static str, data: &[u8], expected: usize) -> Result<(), DecodeError> {
    if data.len() < expected {
        return Err(DecodeError::Truncated {
            format,
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

fn u16_at(data: &[u8], offset: usize) -> Option<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Battery ─────────────────────────────────────────────────────────

    #[test]
    fn should_decode_battery_percentage() {
        let sample = decode(BATTERY_LEVEL, &[87]).unwrap();
        assert_eq!(sample.get("battery"), Some(87.0));
        assert_eq!(sample.len(), 1);
    }

    #[test]
    fn should_reject_empty_battery_payload() {
        let err = decode(BATTERY_LEVEL, &[]).unwrap_err();
        assert!(err.to_string().contains("battery level"));
    }

    // ── Heart rate ──────────────────────────────────────────────────────

    #[test]
    fn should_decode_8_bit_heart_rate() {
        let sample = decode(HEART_RATE_MEASUREMENT, &[0x00, 75]).unwrap();
        assert_eq!(sample.get("hrm"), Some(75.0));
    }

    #[test]
    fn should_decode_16_bit_heart_rate_when_flag_set() {
        // 0x012C = 300, little-endian
        let sample = decode(HEART_RATE_MEASUREMENT, &[0x01, 0x2C, 0x01]).unwrap();
        assert_eq!(sample.get("hrm"), Some(300.0));
    }

    #[test]
    fn should_ignore_trailing_rr_intervals() {
        // flags 0x10 (RR present), hr 62, one RR interval
        let sample = decode(HEART_RATE_MEASUREMENT, &[0x10, 62, 0x00, 0x04]).unwrap();
        assert_eq!(sample.get("hrm"), Some(62.0));
    }

    #[test]
    fn should_reject_16_bit_heart_rate_missing_high_byte() {
        let err = parse_heart_rate(&[0x01, 0x2C]).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Truncated {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    // ── Cycling power ───────────────────────────────────────────────────

    #[test]
    fn should_decode_cycling_power() {
        let sample = decode(
            CYCLING_POWER_MEASUREMENT,
            &[0, 0, 0x2C, 0x01, 0, 0, 0, 0],
        )
        .unwrap();
        assert_eq!(sample.get("power"), Some(300.0));
        assert_eq!(sample.len(), 1);
    }

    #[test]
    fn should_decode_negative_power_as_signed() {
        // -5 W = 0xFFFB LE
        let cp = parse_cycling_power(&[0, 0, 0xFB, 0xFF]).unwrap();
        assert_eq!(cp.power, -5);
        assert_eq!(cp.crank_revolutions, None);
    }

    #[test]
    fn should_observe_crank_fields() {
        let cp = parse_cycling_power(&[0x20, 0, 0x64, 0, 0x0A, 0x00, 0x00, 0x04]).unwrap();
        assert_eq!(cp.power, 100);
        assert_eq!(cp.crank_revolutions, Some(10));
        assert_eq!(cp.last_crank_event, Some(1024));
    }

    // ── Running speed/cadence ───────────────────────────────────────────

    #[test]
    fn should_decode_speed_and_cadence_scaling() {
        // speed 512 → 2.0 m/s, cadence 30 → 60 steps/min
        let sample = decode(RUNNING_SPEED_CADENCE_MEASUREMENT, &[0x00, 0x00, 0x02, 30]).unwrap();
        assert_eq!(sample.get("speed_ms"), Some(2.0));
        assert_eq!(sample.get("cadence"), Some(60.0));
        assert_eq!(sample.get("stride_len_m"), None);
        assert_eq!(sample.get("distance_m"), None);
    }

    #[test]
    fn should_decode_stride_and_distance_when_flagged() {
        let data = [
            0x03, // stride + distance
            0x80, 0x01, // speed 384 → 1.5 m/s
            85,   // cadence → 170
            0x6E, 0x00, // stride 110 cm → 1.1 m
            0xE8, 0x03, // distance 1000 dm → 100 m
        ];
        let sample = decode(RUNNING_SPEED_CADENCE_MEASUREMENT, &data).unwrap();
        assert_eq!(sample.get("speed_ms"), Some(1.5));
        assert_eq!(sample.get("cadence"), Some(170.0));
        assert_eq!(sample.get("stride_len_m"), Some(1.1));
        assert_eq!(sample.get("distance_m"), Some(100.0));
    }

    #[test]
    fn should_read_distance_at_fixed_offset_without_stride_flag() {
        let data = [0x02, 0x00, 0x01, 10, 0xFF, 0xFF, 0x0A, 0x00];
        let rsc = parse_running_speed_cadence(&data).unwrap();
        assert_eq!(rsc.stride_len_m, None);
        assert_eq!(rsc.distance_m, Some(1.0));
    }

    #[test]
    fn should_skip_flagged_field_when_bytes_missing() {
        let rsc = parse_running_speed_cadence(&[0x03, 0x00, 0x01, 10, 0x64, 0x00]).unwrap();
        assert_eq!(rsc.stride_len_m, Some(1.0));
        assert_eq!(rsc.distance_m, None);
    }

    #[test]
    fn should_reject_short_rsc_payload() {
        assert!(parse_running_speed_cadence(&[0x00, 0x00, 0x02]).is_err());
    }

    // ── Dispatch ────────────────────────────────────────────────────────

    #[test]
    fn should_reject_unrecognized_characteristic() {
        let unknown = Uuid::from_u128(0x0000_2a5b_0000_1000_8000_0080_5f9b_34fb);
        let err = decode(unknown, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, DecodeError::Unrecognized(uuid) if uuid == unknown));
    }

    #[test]
    fn should_decode_deterministically() {
        let payload = [0x00, 0x00, 0x02, 30];
        let first = decode(RUNNING_SPEED_CADENCE_MEASUREMENT, &payload).unwrap();
        let second = decode(RUNNING_SPEED_CADENCE_MEASUREMENT, &payload).unwrap();
        assert_eq!(first, second);
    }
}
