//! Running footpod: speed, cadence, stride length and distance.

const FLAGS: u8 = 0b0000_0011;

/// 3.0 m/s in 1/256 m/s.
const BASE_SPEED: u16 = 768;
/// Raw cadence byte; reported doubled.
const CADENCE: u8 = 88;
/// 1.20 m in cm.
const STRIDE: u16 = 120;

#[allow(clippy::cast_possible_truncation)]
pub(super) fn payload(step: u32) -> Vec<u8> {
    let speed = BASE_SPEED + u16::try_from(step % 32).unwrap_or_default();
    // metres travelled at 3 m/s, in dm, wrapping on the wire
    let distance = (step.wrapping_mul(30) & 0xffff) as u16;

    let mut data = vec![FLAGS];
    data.extend_from_slice(&speed.to_le_bytes());
    data.push(CADENCE);
    data.extend_from_slice(&STRIDE.to_le_bytes());
    data.extend_from_slice(&distance.to_le_bytes());
    data
}
