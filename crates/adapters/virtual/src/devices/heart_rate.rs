//! Heart rate strap: 8-bit bpm drifting between 120 and 139.

const FLAGS_U8_VALUE: u8 = 0x00;

pub(super) fn payload(step: u32) -> Vec<u8> {
    let bpm = 120 + u8::try_from(step % 20).unwrap_or_default();
    vec![FLAGS_U8_VALUE, bpm]
}
