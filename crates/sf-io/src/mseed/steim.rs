//! Steim1 / Steim2 frame coding
//!
//! Both schemes pack first differences into 64-byte frames of sixteen
//! 32-bit words. The leading control word holds a 2-bit nibble per word;
//! frame zero reserves two words for the forward (X0) and reverse (Xn)
//! integration constants. Steim2 subdivides nibbles 2 and 3 further via a
//! 2-bit "dnib" in the data word itself.

use crate::{IoError, IoResult};

const FRAME_LEN: usize = 64;
const WORDS_PER_FRAME: usize = 16;

#[inline]
fn word_at(frame: &[u8], index: usize, swap: bool) -> u32 {
    let off = index * 4;
    let raw = [frame[off], frame[off + 1], frame[off + 2], frame[off + 3]];
    if swap {
        u32::from_le_bytes(raw)
    } else {
        u32::from_be_bytes(raw)
    }
}

#[inline]
fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

#[inline]
fn nibble(ctrl: u32, word_index: usize) -> u32 {
    (ctrl >> (30 - 2 * word_index)) & 0x3
}

fn integrate(
    diffs: &[i32],
    x0: i32,
    xn: i32,
    sample_count: usize,
    scheme: &'static str,
) -> IoResult<Vec<i32>> {
    if diffs.len() < sample_count {
        return Err(IoError::BadPayload {
            encoding: scheme,
            message: format!(
                "{} differences for {sample_count} declared samples",
                diffs.len()
            ),
        });
    }
    let mut samples = Vec::with_capacity(sample_count);
    let mut current = x0;
    samples.push(current);
    for &d in diffs.iter().take(sample_count).skip(1) {
        current = current.wrapping_add(d);
        samples.push(current);
    }
    if let Some(&last) = samples.last() {
        if last != xn {
            log::warn!("{scheme}: reverse integration constant mismatch ({last} != {xn})");
        }
    }
    Ok(samples)
}

/// Decode a Steim1 payload into `sample_count` samples.
pub fn decode_steim1(payload: &[u8], sample_count: usize, swap: bool) -> IoResult<Vec<i32>> {
    if sample_count == 0 {
        return Ok(Vec::new());
    }
    let mut diffs: Vec<i32> = Vec::with_capacity(sample_count);
    let mut x0 = 0i32;
    let mut xn = 0i32;

    for (frame_index, frame) in payload.chunks_exact(FRAME_LEN).enumerate() {
        let ctrl = word_at(frame, 0, swap);
        for w in 1..WORDS_PER_FRAME {
            if frame_index == 0 && w == 1 {
                x0 = word_at(frame, 1, swap) as i32;
                continue;
            }
            if frame_index == 0 && w == 2 {
                xn = word_at(frame, 2, swap) as i32;
                continue;
            }
            let word = word_at(frame, w, swap);
            match nibble(ctrl, w) {
                0 => {}
                1 => {
                    for byte in word.to_be_bytes() {
                        diffs.push(i32::from(byte as i8));
                    }
                }
                2 => {
                    diffs.push(sign_extend(word >> 16, 16));
                    diffs.push(sign_extend(word & 0xFFFF, 16));
                }
                _ => diffs.push(word as i32),
            }
            if diffs.len() >= sample_count {
                break;
            }
        }
        if diffs.len() >= sample_count {
            break;
        }
    }

    integrate(&diffs, x0, xn, sample_count, "steim1")
}

/// Decode a Steim2 payload into `sample_count` samples.
pub fn decode_steim2(payload: &[u8], sample_count: usize, swap: bool) -> IoResult<Vec<i32>> {
    if sample_count == 0 {
        return Ok(Vec::new());
    }
    let mut diffs: Vec<i32> = Vec::with_capacity(sample_count);
    let mut x0 = 0i32;
    let mut xn = 0i32;

    for (frame_index, frame) in payload.chunks_exact(FRAME_LEN).enumerate() {
        let ctrl = word_at(frame, 0, swap);
        for w in 1..WORDS_PER_FRAME {
            if frame_index == 0 && w == 1 {
                x0 = word_at(frame, 1, swap) as i32;
                continue;
            }
            if frame_index == 0 && w == 2 {
                xn = word_at(frame, 2, swap) as i32;
                continue;
            }
            let word = word_at(frame, w, swap);
            match nibble(ctrl, w) {
                0 => {}
                1 => {
                    for byte in word.to_be_bytes() {
                        diffs.push(i32::from(byte as i8));
                    }
                }
                2 => {
                    let dnib = word >> 30;
                    match dnib {
                        1 => diffs.push(sign_extend(word & 0x3FFF_FFFF, 30)),
                        2 => {
                            diffs.push(sign_extend((word >> 15) & 0x7FFF, 15));
                            diffs.push(sign_extend(word & 0x7FFF, 15));
                        }
                        3 => {
                            diffs.push(sign_extend((word >> 20) & 0x3FF, 10));
                            diffs.push(sign_extend((word >> 10) & 0x3FF, 10));
                            diffs.push(sign_extend(word & 0x3FF, 10));
                        }
                        _ => {
                            return Err(IoError::BadPayload {
                                encoding: "steim2",
                                message: format!("invalid dnib 0 for nibble 2 in word {w}"),
                            })
                        }
                    }
                }
                _ => {
                    let dnib = word >> 30;
                    match dnib {
                        0 => {
                            for k in 0..5 {
                                diffs.push(sign_extend((word >> (24 - 6 * k)) & 0x3F, 6));
                            }
                        }
                        1 => {
                            for k in 0..6 {
                                diffs.push(sign_extend((word >> (25 - 5 * k)) & 0x1F, 5));
                            }
                        }
                        2 => {
                            for k in 0..7 {
                                diffs.push(sign_extend((word >> (24 - 4 * k)) & 0xF, 4));
                            }
                        }
                        _ => {
                            return Err(IoError::BadPayload {
                                encoding: "steim2",
                                message: format!("invalid dnib 3 for nibble 3 in word {w}"),
                            })
                        }
                    }
                }
            }
            if diffs.len() >= sample_count {
                break;
            }
        }
        if diffs.len() >= sample_count {
            break;
        }
    }

    integrate(&diffs, x0, xn, sample_count, "steim2")
}

/// Greedy Steim1 packer.
///
/// Encodes as many of `samples` as fit into `max_frames` frames and returns
/// the payload plus the number of samples consumed. `previous` seeds the
/// first difference when the record continues an earlier one.
pub fn encode_steim1(
    samples: &[i32],
    previous: Option<i32>,
    max_frames: usize,
) -> (Vec<u8>, usize) {
    if samples.is_empty() || max_frames == 0 {
        return (Vec::new(), 0);
    }

    let mut diffs: Vec<i32> = Vec::with_capacity(samples.len());
    diffs.push(samples[0].wrapping_sub(previous.unwrap_or(samples[0])));
    for i in 1..samples.len() {
        diffs.push(samples[i].wrapping_sub(samples[i - 1]));
    }

    let fits_i8 = |d: i32| (-128..=127).contains(&d);
    let fits_i16 = |d: i32| (-32768..=32767).contains(&d);

    let mut frames: Vec<[u32; WORDS_PER_FRAME]> = Vec::new();
    let mut consumed = 0usize;

    'outer: while consumed < samples.len() && frames.len() < max_frames {
        let first_frame = frames.is_empty();
        let mut words = [0u32; WORDS_PER_FRAME];
        let mut ctrl = 0u32;
        let start_word = if first_frame { 3 } else { 1 };

        for w in start_word..WORDS_PER_FRAME {
            if consumed >= samples.len() {
                break;
            }
            let rest = &diffs[consumed..];
            let (code, word, n) = if rest.len() >= 4 && rest[..4].iter().all(|&d| fits_i8(d)) {
                let b = [rest[0] as i8, rest[1] as i8, rest[2] as i8, rest[3] as i8];
                let word = u32::from_be_bytes([b[0] as u8, b[1] as u8, b[2] as u8, b[3] as u8]);
                (1u32, word, 4)
            } else if rest.len() >= 2 && rest[..2].iter().all(|&d| fits_i16(d)) {
                let word = ((rest[0] as u16 as u32) << 16) | (rest[1] as u16 as u32);
                (2u32, word, 2)
            } else {
                (3u32, rest[0] as u32, 1)
            };
            ctrl |= code << (30 - 2 * w);
            words[w] = word;
            consumed += n;
        }

        words[0] = ctrl;
        frames.push(words);

        if consumed >= samples.len() {
            break 'outer;
        }
    }

    // Integration constants in frame zero
    frames[0][1] = samples[0] as u32;
    frames[0][2] = samples[consumed - 1] as u32;
    // Recompute frame-zero control word nibbles 1 and 2 stay zero; already
    // zero by construction since packing started at word 3.

    let mut payload = Vec::with_capacity(frames.len() * FRAME_LEN);
    for frame in &frames {
        for word in frame {
            payload.extend_from_slice(&word.to_be_bytes());
        }
    }
    (payload, consumed)
}
