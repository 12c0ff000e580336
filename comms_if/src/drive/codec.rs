//! # Drive update codec
//!
//! Binary packets sent by the scenario host, all little endian:
//!
//! ```text
//! Target speed: [type: u8 = 1][speed_ms: f64]
//! Path:         [type: u8 = 2][current_index: u32][count: u32][point; count]
//! Point:        [x: f64][y: f64][h: f64][road_id: u32][pad: 4][s: f64][lane_id: i32][pad: 4]
//!               [lane_offset: f64]
//! ```
//!
//! The padding in each point mirrors the natural alignment of the sender's structure.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use byteorder::{ByteOrder, LittleEndian};

use super::WirePathPoint;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Packet type of a target speed update.
pub const TARGET_SPEED_PACKET_TYPE: u8 = 1;

/// Packet type of a path update.
pub const PATH_PACKET_TYPE: u8 = 2;

/// Exact size of a target speed packet.
pub const TARGET_SPEED_PACKET_SIZE: usize = 9;

/// Size of the path packet header (type, current index, count).
pub const PATH_HEADER_SIZE: usize = 9;

/// Size of one encoded path point.
pub const PATH_POINT_SIZE: usize = 56;

/// Road ID used on the wire when the road of a point isn't known.
pub const UNKNOWN_ROAD_ID: u32 = u32::MAX;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A decoded update from the scenario host.
#[derive(Debug, Clone, PartialEq)]
pub enum DriveUpdate {
    TargetSpeed(f64),

    Path {
        /// Index into `points` of the point the host considers current
        current_index: usize,
        points: Vec<WirePathPoint>,
    },
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum UpdateDecodeError {
    #[error("Packet is empty")]
    Empty,

    #[error("Unknown packet type {0}")]
    UnknownType(u8),

    #[error("Packet of type {packet_type} has the wrong size: expected {expected} bytes, got {actual}")]
    WrongSize {
        packet_type: u8,
        expected: usize,
        actual: usize,
    },

    #[error("Target speed is not finite ({0})")]
    NonFiniteSpeed(f64),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Decode a single update packet.
pub fn decode_update(data: &[u8]) -> Result<DriveUpdate, UpdateDecodeError> {
    match data.first() {
        None => Err(UpdateDecodeError::Empty),
        Some(&TARGET_SPEED_PACKET_TYPE) => decode_target_speed(data),
        Some(&PATH_PACKET_TYPE) => decode_path(data),
        Some(&t) => Err(UpdateDecodeError::UnknownType(t)),
    }
}

/// Encode a target speed packet.
pub fn encode_target_speed(speed_ms: f64) -> Vec<u8> {
    let mut buf = vec![0u8; TARGET_SPEED_PACKET_SIZE];
    buf[0] = TARGET_SPEED_PACKET_TYPE;
    LittleEndian::write_f64(&mut buf[1..9], speed_ms);
    buf
}

/// Encode a path packet.
pub fn encode_path(current_index: u32, points: &[WirePathPoint]) -> Vec<u8> {
    let mut buf = vec![0u8; PATH_HEADER_SIZE + points.len() * PATH_POINT_SIZE];
    buf[0] = PATH_PACKET_TYPE;
    LittleEndian::write_u32(&mut buf[1..5], current_index);
    LittleEndian::write_u32(&mut buf[5..9], points.len() as u32);

    for (i, p) in points.iter().enumerate() {
        let rec = &mut buf[PATH_HEADER_SIZE + i * PATH_POINT_SIZE..][..PATH_POINT_SIZE];
        LittleEndian::write_f64(&mut rec[0..8], p.x_m);
        LittleEndian::write_f64(&mut rec[8..16], p.y_m);
        LittleEndian::write_f64(&mut rec[16..24], p.heading_rad);
        LittleEndian::write_u32(&mut rec[24..28], p.road_id);
        LittleEndian::write_f64(&mut rec[32..40], p.s_m);
        LittleEndian::write_i32(&mut rec[40..44], p.lane_id);
        LittleEndian::write_f64(&mut rec[48..56], p.lane_offset_m);
    }

    buf
}

fn decode_target_speed(data: &[u8]) -> Result<DriveUpdate, UpdateDecodeError> {
    if data.len() != TARGET_SPEED_PACKET_SIZE {
        return Err(UpdateDecodeError::WrongSize {
            packet_type: TARGET_SPEED_PACKET_TYPE,
            expected: TARGET_SPEED_PACKET_SIZE,
            actual: data.len(),
        });
    }

    let speed_ms = LittleEndian::read_f64(&data[1..9]);
    if !speed_ms.is_finite() {
        return Err(UpdateDecodeError::NonFiniteSpeed(speed_ms));
    }

    Ok(DriveUpdate::TargetSpeed(speed_ms))
}

fn decode_path(data: &[u8]) -> Result<DriveUpdate, UpdateDecodeError> {
    if data.len() < PATH_HEADER_SIZE {
        return Err(UpdateDecodeError::WrongSize {
            packet_type: PATH_PACKET_TYPE,
            expected: PATH_HEADER_SIZE,
            actual: data.len(),
        });
    }

    let current_index = LittleEndian::read_u32(&data[1..5]) as usize;
    let count = LittleEndian::read_u32(&data[5..9]) as usize;

    // Trailing bytes past the declared points are tolerated, a short packet isn't
    let expected = count
        .checked_mul(PATH_POINT_SIZE)
        .and_then(|n| n.checked_add(PATH_HEADER_SIZE))
        .unwrap_or(usize::MAX);
    if data.len() < expected {
        return Err(UpdateDecodeError::WrongSize {
            packet_type: PATH_PACKET_TYPE,
            expected,
            actual: data.len(),
        });
    }

    let points = data[PATH_HEADER_SIZE..expected]
        .chunks_exact(PATH_POINT_SIZE)
        .map(|rec| WirePathPoint {
            x_m: LittleEndian::read_f64(&rec[0..8]),
            y_m: LittleEndian::read_f64(&rec[8..16]),
            heading_rad: LittleEndian::read_f64(&rec[16..24]),
            road_id: LittleEndian::read_u32(&rec[24..28]),
            s_m: LittleEndian::read_f64(&rec[32..40]),
            lane_id: LittleEndian::read_i32(&rec[40..44]),
            lane_offset_m: LittleEndian::read_f64(&rec[48..56]),
        })
        .collect();

    Ok(DriveUpdate::Path {
        current_index,
        points,
    })
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn point(x_m: f64, road_id: u32, lane_id: i32) -> WirePathPoint {
        WirePathPoint {
            x_m,
            y_m: -2.5,
            heading_rad: 0.25,
            road_id,
            s_m: x_m + 1.0,
            lane_id,
            lane_offset_m: 0.1,
        }
    }

    #[test]
    fn test_decode_path() {
        let points = vec![point(1.0, 3, -1), point(2.0, UNKNOWN_ROAD_ID, 2)];
        let buf = encode_path(1, &points);

        assert_eq!(buf.len(), 9 + 2 * 56);
        assert_eq!(
            decode_update(&buf),
            Ok(DriveUpdate::Path {
                current_index: 1,
                points
            })
        );
    }

    #[test]
    fn test_path_field_offsets() {
        // Hand built record to pin the padding layout
        let mut buf = vec![0u8; 9 + 56];
        buf[0] = 2;
        LittleEndian::write_u32(&mut buf[5..9], 1);
        LittleEndian::write_u32(&mut buf[9 + 24..9 + 28], 7);
        buf[9 + 28..9 + 32].copy_from_slice(&[0xAA; 4]);
        LittleEndian::write_f64(&mut buf[9 + 32..9 + 40], 12.5);
        LittleEndian::write_i32(&mut buf[9 + 40..9 + 44], -2);

        match decode_update(&buf) {
            Ok(DriveUpdate::Path { points, .. }) => {
                assert_eq!(points[0].road_id, 7);
                assert_eq!(points[0].s_m, 12.5);
                assert_eq!(points[0].lane_id, -2);
            }
            r => panic!("Unexpected decode result {:?}", r),
        }
    }

    #[test]
    fn test_decode_truncated_path() {
        let buf = encode_path(0, &[point(1.0, 1, 1), point(2.0, 1, 1)]);

        assert!(matches!(
            decode_update(&buf[..buf.len() - 1]),
            Err(UpdateDecodeError::WrongSize { expected: 121, .. })
        ));
        assert!(matches!(
            decode_update(&buf[..5]),
            Err(UpdateDecodeError::WrongSize { .. })
        ));
    }

    #[test]
    fn test_decode_target_speed() {
        assert_eq!(
            decode_update(&encode_target_speed(13.9)),
            Ok(DriveUpdate::TargetSpeed(13.9))
        );

        let mut long = encode_target_speed(1.0);
        long.push(0);
        assert!(matches!(
            decode_update(&long),
            Err(UpdateDecodeError::WrongSize { .. })
        ));

        assert_eq!(
            decode_update(&encode_target_speed(std::f64::INFINITY)),
            Err(UpdateDecodeError::NonFiniteSpeed(std::f64::INFINITY))
        );
    }

    #[test]
    fn test_decode_bad_type() {
        assert_eq!(decode_update(&[]), Err(UpdateDecodeError::Empty));
        assert_eq!(
            decode_update(&[9, 0, 0]),
            Err(UpdateDecodeError::UnknownType(9))
        );
    }
}
