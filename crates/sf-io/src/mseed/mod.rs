//! Mini-SEED record codec
//!
//! Fixed header, blockettes 1000/1001 and the data payload encodings:
//! Steim1/2 compression, the primitive int16/int32/float32/float64 types
//! and the historic CDSN, DWWSSN and SRO gain-ranged formats. Byte
//! swapping is driven by the declared word order and a year plausibility
//! check on the header itself.

mod legacy;
mod steim;

pub use legacy::{decode_cdsn, decode_dwwssn, decode_sro};
pub use steim::{decode_steim1, decode_steim2, encode_steim1};

use sf_core::{DataArray, Record, SampleType, StreamId, Time, TimeSpan};

use crate::{IoError, IoResult};

/// Payload encoding codes from blockette 1000.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Int16,
    Int32,
    Float32,
    Float64,
    Steim1,
    Steim2,
    Cdsn,
    Sro,
    Dwwssn,
}

impl Encoding {
    pub fn code(self) -> u8 {
        match self {
            Encoding::Int16 => 1,
            Encoding::Int32 => 3,
            Encoding::Float32 => 4,
            Encoding::Float64 => 5,
            Encoding::Steim1 => 10,
            Encoding::Steim2 => 11,
            Encoding::Cdsn => 16,
            Encoding::Sro => 30,
            Encoding::Dwwssn => 32,
        }
    }

    pub fn from_code(code: u8) -> IoResult<Self> {
        Ok(match code {
            1 => Encoding::Int16,
            3 => Encoding::Int32,
            4 => Encoding::Float32,
            5 => Encoding::Float64,
            10 => Encoding::Steim1,
            11 => Encoding::Steim2,
            16 => Encoding::Cdsn,
            30 => Encoding::Sro,
            32 => Encoding::Dwwssn,
            other => return Err(IoError::UnsupportedEncoding(other)),
        })
    }
}

// ---------------------------------------------------------------------------
// Byte access helpers

#[inline]
fn u16_at(buf: &[u8], off: usize, swap: bool) -> u16 {
    let raw = [buf[off], buf[off + 1]];
    if swap {
        u16::from_le_bytes(raw)
    } else {
        u16::from_be_bytes(raw)
    }
}

#[inline]
fn i16_at(buf: &[u8], off: usize, swap: bool) -> i16 {
    u16_at(buf, off, swap) as i16
}

#[inline]
fn u32_at(buf: &[u8], off: usize, swap: bool) -> u32 {
    let raw = [buf[off], buf[off + 1], buf[off + 2], buf[off + 3]];
    if swap {
        u32::from_le_bytes(raw)
    } else {
        u32::from_be_bytes(raw)
    }
}

// ---------------------------------------------------------------------------
// Decoding

/// One decoded record plus the number of bytes it occupied.
#[derive(Debug)]
pub struct DecodedRecord {
    pub record: Record,
    pub length: usize,
}

const FIXED_HEADER_LEN: usize = 48;

/// Decode one mini-SEED record from the front of `buf`.
pub fn decode_record(buf: &[u8]) -> IoResult<DecodedRecord> {
    if buf.len() < FIXED_HEADER_LEN {
        return Err(IoError::Truncated {
            needed: FIXED_HEADER_LEN,
            available: buf.len(),
        });
    }

    // Header byte order: the year is implausible when read with the wrong
    // endianness.
    let year_be = u16::from_be_bytes([buf[20], buf[21]]);
    let header_swap = !(1900..=2100).contains(&year_be);

    let station = ascii_field(&buf[8..13]);
    let location = ascii_field(&buf[13..15]);
    let channel = ascii_field(&buf[15..18]);
    let network = ascii_field(&buf[18..20]);
    let stream_id = StreamId::new(network, station, location, channel);

    let year = u16_at(buf, 20, header_swap);
    let doy = u16_at(buf, 22, header_swap);
    let hour = buf[24];
    let minute = buf[25];
    let second = buf[26];
    let fract = u16_at(buf, 28, header_swap);

    let sample_count = u16_at(buf, 30, header_swap) as usize;
    let rate_factor = i16_at(buf, 32, header_swap);
    let rate_multiplier = i16_at(buf, 34, header_swap);
    let data_offset = u16_at(buf, 44, header_swap) as usize;
    let mut blockette_offset = u16_at(buf, 46, header_swap) as usize;

    // Walk the blockette chain for 1000 (encoding, record length, word
    // order) and 1001 (timing quality, microsecond correction).
    let mut encoding: Option<u8> = None;
    let mut record_length: Option<usize> = None;
    let mut data_swap = header_swap;
    let mut timing_quality: Option<u8> = None;
    let mut micros_correction: i64 = 0;

    while blockette_offset >= FIXED_HEADER_LEN && blockette_offset + 4 <= buf.len() {
        let btype = u16_at(buf, blockette_offset, header_swap);
        let next = u16_at(buf, blockette_offset + 2, header_swap) as usize;
        match btype {
            1000 => {
                if blockette_offset + 7 > buf.len() {
                    break;
                }
                encoding = Some(buf[blockette_offset + 4]);
                data_swap = buf[blockette_offset + 5] == 0;
                let exp = buf[blockette_offset + 6] as u32;
                if exp >= 8 && exp <= 20 {
                    record_length = Some(1usize << exp);
                }
            }
            1001 => {
                if blockette_offset + 6 > buf.len() {
                    break;
                }
                let quality = buf[blockette_offset + 4];
                if quality <= 100 {
                    timing_quality = Some(quality);
                }
                micros_correction = i64::from(buf[blockette_offset + 5] as i8);
            }
            _ => {}
        }
        if next == 0 || next <= blockette_offset {
            break;
        }
        blockette_offset = next;
    }

    let encoding = Encoding::from_code(
        encoding.ok_or_else(|| IoError::BadHeader("missing blockette 1000".into()))?,
    )?;
    let length = record_length
        .ok_or_else(|| IoError::BadHeader("missing record length in blockette 1000".into()))?;
    if buf.len() < length {
        return Err(IoError::Truncated {
            needed: length,
            available: buf.len(),
        });
    }
    if data_offset < FIXED_HEADER_LEN || data_offset >= length {
        return Err(IoError::BadHeader(format!(
            "data offset {data_offset} outside record"
        )));
    }

    let sampling_rate = decode_sampling_rate(rate_factor, rate_multiplier)?;
    let start_time = btime_to_time(year, doy, hour, minute, second, fract)?
        + TimeSpan::from_micros(micros_correction);

    let payload = &buf[data_offset..length];
    let data = decode_payload(encoding, payload, sample_count, data_swap, &stream_id)?;

    let mut record = Record::new(stream_id, start_time, sampling_rate, data)?;
    if let Some(q) = timing_quality {
        record = record.with_timing_quality(q)?;
    }
    Ok(DecodedRecord { record, length })
}

fn ascii_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end().to_string()
}

fn btime_to_time(year: u16, doy: u16, hour: u8, minute: u8, second: u8, fract: u16) -> IoResult<Time> {
    let date = chrono::NaiveDate::from_yo_opt(i32::from(year), u32::from(doy))
        .ok_or_else(|| IoError::BadHeader(format!("invalid date: year {year} day {doy}")))?;
    let secs = date
        .and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second))
        .ok_or_else(|| {
            IoError::BadHeader(format!("invalid time of day: {hour}:{minute}:{second}"))
        })?
        .and_utc()
        .timestamp();
    Ok(Time::from_epoch_micros(
        secs * 1_000_000 + i64::from(fract) * 100,
    ))
}

fn decode_sampling_rate(factor: i16, multiplier: i16) -> IoResult<f64> {
    let f = f64::from(factor);
    let m = f64::from(multiplier);
    let rate = match (factor, multiplier) {
        (0, _) | (_, 0) => 0.0,
        (f_, m_) if f_ > 0 && m_ > 0 => f * m,
        (f_, m_) if f_ > 0 && m_ < 0 => -f / m,
        (f_, m_) if f_ < 0 && m_ > 0 => -m / f,
        _ => 1.0 / (f * m),
    };
    if rate <= 0.0 {
        return Err(IoError::BadHeader(format!(
            "unusable sampling rate: factor {factor}, multiplier {multiplier}"
        )));
    }
    Ok(rate)
}

fn decode_payload(
    encoding: Encoding,
    payload: &[u8],
    sample_count: usize,
    swap: bool,
    stream_id: &StreamId,
) -> IoResult<DataArray> {
    let data = match encoding {
        Encoding::Int16 => {
            let n = sample_count.min(payload.len() / 2);
            let mut samples = Vec::with_capacity(n);
            for i in 0..n {
                samples.push(i16_at(payload, i * 2, swap));
            }
            DataArray::Int16(samples)
        }
        Encoding::Int32 => {
            let n = sample_count.min(payload.len() / 4);
            let mut samples = Vec::with_capacity(n);
            for i in 0..n {
                samples.push(u32_at(payload, i * 4, swap) as i32);
            }
            DataArray::Int32(samples)
        }
        Encoding::Float32 => {
            let n = sample_count.min(payload.len() / 4);
            let mut samples = Vec::with_capacity(n);
            for i in 0..n {
                samples.push(f32::from_bits(u32_at(payload, i * 4, swap)));
            }
            DataArray::Float32(samples)
        }
        Encoding::Float64 => {
            let n = sample_count.min(payload.len() / 8);
            let mut samples = Vec::with_capacity(n);
            for i in 0..n {
                let hi = u32_at(payload, i * 8, swap) as u64;
                let lo = u32_at(payload, i * 8 + 4, swap) as u64;
                let bits = if swap { (lo << 32) | hi } else { (hi << 32) | lo };
                samples.push(f64::from_bits(bits));
            }
            DataArray::Float64(samples)
        }
        Encoding::Steim1 => DataArray::Int32(decode_steim1(payload, sample_count, swap)?),
        Encoding::Steim2 => DataArray::Int32(decode_steim2(payload, sample_count, swap)?),
        Encoding::Cdsn => DataArray::Int32(decode_cdsn(payload, sample_count, swap)),
        Encoding::Dwwssn => DataArray::Int32(decode_dwwssn(payload, sample_count, swap)),
        Encoding::Sro => DataArray::Int32(decode_sro(payload, sample_count, swap)?),
    };
    if data.len() < sample_count {
        log::warn!(
            "{stream_id}: payload held {} of {sample_count} declared samples",
            data.len()
        );
    }
    Ok(data)
}

// ---------------------------------------------------------------------------
// Encoding

/// Encoder configuration.
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    /// Power-of-two record length, 512 by default.
    pub record_length: usize,
    /// Quality indicator in the header, 'D' by default.
    pub quality: char,
    /// Payload encoding; derived from the sample type when absent.
    pub encoding: Option<Encoding>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            record_length: 512,
            quality: 'D',
            encoding: None,
        }
    }
}

fn natural_encoding(sample_type: SampleType) -> Encoding {
    match sample_type {
        SampleType::Int16 => Encoding::Int16,
        SampleType::Int32 => Encoding::Int32,
        SampleType::Float32 => Encoding::Float32,
        SampleType::Float64 => Encoding::Float64,
    }
}

fn encode_sampling_rate(rate: f64) -> IoResult<(i16, i16)> {
    if rate >= 1.0 {
        for scale in [1i32, 10, 100, 1000] {
            let scaled = rate * f64::from(scale);
            if (scaled - scaled.round()).abs() < 1e-6 && scaled.round() <= 32767.0 {
                let f = scaled.round() as i16;
                return Ok(if scale == 1 { (f, 1) } else { (f, -(scale as i16)) });
            }
        }
    } else if rate > 0.0 {
        let period = 1.0 / rate;
        if (period - period.round()).abs() < 1e-6 && period.round() <= 32767.0 {
            return Ok((-(period.round() as i16), 1));
        }
    }
    Err(IoError::BadHeader(format!(
        "sampling rate {rate} not representable"
    )))
}

fn put_u16(buf: &mut [u8], off: usize, v: u16) {
    buf[off..off + 2].copy_from_slice(&v.to_be_bytes());
}

/// Encode a record into one or more fixed-length mini-SEED records.
pub fn encode_record(record: &Record, options: &EncodeOptions) -> IoResult<Vec<u8>> {
    let encoding = options
        .encoding
        .unwrap_or_else(|| natural_encoding(record.sample_type()));
    let reclen = options.record_length;
    if !reclen.is_power_of_two() || !(128..=65536).contains(&reclen) {
        return Err(IoError::BadHeader(format!(
            "invalid record length {reclen}"
        )));
    }

    const DATA_OFFSET: usize = 64;
    let capacity = reclen - DATA_OFFSET;
    let per_record = match encoding {
        Encoding::Int16 => capacity / 2,
        Encoding::Int32 | Encoding::Float32 => capacity / 4,
        Encoding::Float64 => capacity / 8,
        // Upper bound of 4 differences per data word; the packer reports
        // the exact count.
        Encoding::Steim1 => (capacity / 64) * 60,
        other => {
            return Err(IoError::UnsupportedEncoding(other.code()));
        }
    };
    if per_record == 0 {
        return Err(IoError::BadHeader("record length too small".into()));
    }

    let (rate_factor, rate_multiplier) = encode_sampling_rate(record.sampling_rate())?;
    let total = record.sample_count();
    let mut out = Vec::new();
    let mut written = 0usize;
    let mut sequence = 1u32;

    while written < total || (total == 0 && sequence == 1) {
        let start_time =
            record.start_time() + TimeSpan::from_samples(written, record.sampling_rate());

        // Payload first; Steim tells us afterwards how much fit.
        let remaining = total - written;
        let (payload, consumed) = match encoding {
            Encoding::Int16 => {
                let n = remaining.min(per_record);
                let samples: Vec<i16> = slice_samples(record, written, n);
                let mut bytes = Vec::with_capacity(n * 2);
                for s in &samples {
                    bytes.extend_from_slice(&s.to_be_bytes());
                }
                (bytes, n)
            }
            Encoding::Int32 => {
                let n = remaining.min(per_record);
                let samples: Vec<i32> = slice_samples(record, written, n);
                let mut bytes = Vec::with_capacity(n * 4);
                for s in &samples {
                    bytes.extend_from_slice(&s.to_be_bytes());
                }
                (bytes, n)
            }
            Encoding::Float32 => {
                let n = remaining.min(per_record);
                let samples: Vec<f32> = slice_samples(record, written, n);
                let mut bytes = Vec::with_capacity(n * 4);
                for s in &samples {
                    bytes.extend_from_slice(&s.to_be_bytes());
                }
                (bytes, n)
            }
            Encoding::Float64 => {
                let n = remaining.min(per_record);
                let samples: Vec<f64> = slice_samples(record, written, n);
                let mut bytes = Vec::with_capacity(n * 8);
                for s in &samples {
                    bytes.extend_from_slice(&s.to_be_bytes());
                }
                (bytes, n)
            }
            Encoding::Steim1 => {
                let samples: Vec<i32> = slice_samples(record, written, remaining);
                let previous = if written > 0 {
                    Some(sample_as_i32(record, written - 1))
                } else {
                    None
                };
                encode_steim1(&samples, previous, capacity / 64)
            }
            _ => unreachable!("filtered above"),
        };

        let mut rec = vec![0u8; reclen];
        // Sequence number and quality
        let seq = format!("{sequence:06}");
        rec[0..6].copy_from_slice(seq.as_bytes());
        rec[6] = options.quality as u8;
        rec[7] = b' ';
        write_ascii_field(&mut rec[8..13], record.stream_id().station());
        write_ascii_field(&mut rec[13..15], record.stream_id().location());
        write_ascii_field(&mut rec[15..18], record.stream_id().channel());
        write_ascii_field(&mut rec[18..20], record.stream_id().network());

        write_btime(&mut rec[20..30], start_time)?;
        put_u16(&mut rec, 30, consumed as u16);
        put_u16(&mut rec, 32, rate_factor as u16);
        put_u16(&mut rec, 34, rate_multiplier as u16);
        rec[39] = 2; // number of blockettes
        put_u16(&mut rec, 44, DATA_OFFSET as u16);
        put_u16(&mut rec, 46, FIXED_HEADER_LEN as u16);

        // Blockette 1000
        put_u16(&mut rec, 48, 1000);
        put_u16(&mut rec, 50, 56);
        rec[52] = encoding.code();
        rec[53] = 1; // big endian payload
        rec[54] = reclen.trailing_zeros() as u8;

        // Blockette 1001: timing quality and the sub-100-microsecond rest
        put_u16(&mut rec, 56, 1001);
        put_u16(&mut rec, 58, 0);
        rec[60] = record.timing_quality().unwrap_or(0);
        rec[61] = (start_time.epoch_micros().rem_euclid(100)) as u8;

        rec[DATA_OFFSET..DATA_OFFSET + payload.len()].copy_from_slice(&payload);
        out.extend_from_slice(&rec);

        written += consumed;
        sequence += 1;
        if total == 0 {
            break;
        }
        if consumed == 0 {
            return Err(IoError::BadHeader("encoder made no progress".into()));
        }
    }

    Ok(out)
}

fn write_ascii_field(field: &mut [u8], value: &str) {
    field.fill(b' ');
    let bytes = value.as_bytes();
    let n = bytes.len().min(field.len());
    field[..n].copy_from_slice(&bytes[..n]);
}

fn write_btime(field: &mut [u8], time: Time) -> IoResult<()> {
    use chrono::{Datelike, Timelike};
    let dt = time.to_datetime();
    field[0..2].copy_from_slice(&(dt.year() as u16).to_be_bytes());
    field[2..4].copy_from_slice(&(dt.ordinal() as u16).to_be_bytes());
    field[4] = dt.hour() as u8;
    field[5] = dt.minute() as u8;
    field[6] = dt.second() as u8;
    field[7] = 0;
    let micros = time.epoch_micros().rem_euclid(1_000_000);
    field[8..10].copy_from_slice(&((micros / 100) as u16).to_be_bytes());
    Ok(())
}

fn slice_samples<T: sf_core::Sample>(record: &Record, start: usize, count: usize) -> Vec<T> {
    let all: Vec<T> = record.data().convert();
    all[start..start + count].to_vec()
}

fn sample_as_i32(record: &Record, index: usize) -> i32 {
    record.data().get(index).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_record() -> Record {
        let samples: Vec<i32> = (0..100).collect();
        Record::new(
            StreamId::new("XX", "STA", "", "BHZ"),
            Time::from_ymd_hms_micro(2019, 1, 1, 0, 0, 0, 8543).unwrap(),
            20.0,
            samples,
        )
        .unwrap()
        .with_timing_quality(30)
        .unwrap()
    }

    #[test]
    fn test_int32_round_trip() {
        let rec = reference_record();
        let bytes = encode_record(&rec, &EncodeOptions::default()).unwrap();
        assert_eq!(bytes.len() % 512, 0);

        let decoded = decode_record(&bytes).unwrap();
        assert_eq!(decoded.length, 512);
        let out = decoded.record;
        assert_eq!(out.stream_id(), rec.stream_id());
        assert_eq!(out.start_time(), rec.start_time());
        assert_eq!(out.sampling_rate(), rec.sampling_rate());
        assert_eq!(out.timing_quality(), rec.timing_quality());
        assert_eq!(out.sample_type(), rec.sample_type());
        assert_eq!(out.sample_count(), rec.sample_count());
        assert_eq!(out.data(), rec.data());
    }

    #[test]
    fn test_steim1_round_trip() {
        let rec = reference_record();
        let options = EncodeOptions {
            encoding: Some(Encoding::Steim1),
            ..Default::default()
        };
        let bytes = encode_record(&rec, &options).unwrap();
        let decoded = decode_record(&bytes).unwrap();
        assert_eq!(decoded.record.data(), rec.data());
        assert_eq!(decoded.record.start_time(), rec.start_time());
    }

    #[test]
    fn test_float64_round_trip() {
        let samples: Vec<f64> = (0..40).map(|i| i as f64 * 0.25 - 3.0).collect();
        let rec = Record::new(
            StreamId::new("GE", "MORC", "", "BHE"),
            Time::from_ymd_hms_micro(2019, 5, 1, 23, 59, 10, 0).unwrap(),
            20.0,
            samples,
        )
        .unwrap();
        let bytes = encode_record(&rec, &EncodeOptions::default()).unwrap();
        let decoded = decode_record(&bytes).unwrap();
        assert_eq!(decoded.record.data(), rec.data());
    }

    #[test]
    fn test_multi_record_split() {
        let samples: Vec<i32> = (0..500).collect();
        let rec = Record::new(
            StreamId::new("XX", "STA", "", "BHZ"),
            Time::from_ymd_hms_micro(2019, 1, 1, 0, 0, 0, 0).unwrap(),
            100.0,
            samples,
        )
        .unwrap();
        let bytes = encode_record(&rec, &EncodeOptions::default()).unwrap();
        assert!(bytes.len() >= 512 * 5);

        // Decode them all back and splice
        let mut offset = 0;
        let mut collected: Vec<i32> = Vec::new();
        let mut expected_start = rec.start_time();
        while offset < bytes.len() {
            let decoded = decode_record(&bytes[offset..]).unwrap();
            assert_eq!(decoded.record.start_time(), expected_start);
            collected.extend(decoded.record.data().convert::<i32>());
            expected_start = decoded.record.end_time();
            offset += decoded.length;
        }
        assert_eq!(collected, (0..500).collect::<Vec<i32>>());
    }

    #[test]
    fn test_fractional_rate_round_trip() {
        let (f, m) = encode_sampling_rate(0.1).unwrap();
        assert_eq!(decode_sampling_rate(f, m).unwrap(), 0.1);
        let (f, m) = encode_sampling_rate(62.5).unwrap();
        assert!((decode_sampling_rate(f, m).unwrap() - 62.5).abs() < 1e-9);
    }

    #[test]
    fn test_truncated_input() {
        let rec = reference_record();
        let bytes = encode_record(&rec, &EncodeOptions::default()).unwrap();
        assert!(matches!(
            decode_record(&bytes[..100]),
            Err(IoError::Truncated { .. })
        ));
    }
}
