//! Power meter: instantaneous power plus crank data.

/// Crank event time unit is 1/1024 s; one revolution per second at 60 rpm.
const CRANK_EVENT_TICKS_PER_STEP: u32 = 1024;

#[allow(clippy::cast_possible_truncation)]
pub(super) fn payload(step: u32) -> Vec<u8> {
    let power = 200 + i16::try_from(step % 50).unwrap_or_default();
    // both fields wrap on the wire
    let revolutions = (step & 0xffff) as u16;
    let event = (step.wrapping_mul(CRANK_EVENT_TICKS_PER_STEP) & 0xffff) as u16;

    let mut data = vec![0x00, 0x00];
    data.extend_from_slice(&power.to_le_bytes());
    data.extend_from_slice(&revolutions.to_le_bytes());
    data.extend_from_slice(&event.to_le_bytes());
    data
}
