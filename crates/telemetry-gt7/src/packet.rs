//! Decoded telemetry packet and the fixed little-endian layout it is read from.

use bitflags::bitflags;
use gt7_telemetry_errors::{DecodeError, DecodeResult};

use crate::cipher::{MAX_PACKET_SIZE, PACKET_SIZE, PacketCipher, PacketType};

/// Magic present in bytes 0-3 of a correctly decrypted packet ("0S7G" LE).
pub const MAGIC: u32 = 0x4737_5330;

// Base layout, common to every packet type.
pub const OFF_MAGIC: usize = 0x00;
pub const OFF_POSITION: usize = 0x04;
pub const OFF_VELOCITY: usize = 0x10;
pub const OFF_ROTATION: usize = 0x1C;
pub const OFF_ANGULAR_VELOCITY: usize = 0x2C;
pub const OFF_RIDE_HEIGHT: usize = 0x38;
pub const OFF_RPM: usize = 0x3C;
pub const OFF_FUEL: usize = 0x44;
pub const OFF_FUEL_CAPACITY: usize = 0x48;
pub const OFF_SPEED: usize = 0x4C;
pub const OFF_TURBO_BOOST: usize = 0x50;
pub const OFF_OIL_PRESSURE: usize = 0x54;
pub const OFF_WATER_TEMP: usize = 0x58;
pub const OFF_OIL_TEMP: usize = 0x5C;
pub const OFF_TYRE_TEMP: usize = 0x60;
pub const OFF_TICK: usize = 0x70;
pub const OFF_CURRENT_LAP: usize = 0x74;
pub const OFF_TOTAL_LAPS: usize = 0x76;
pub const OFF_BEST_LAP: usize = 0x78;
pub const OFF_LAST_LAP: usize = 0x7C;
pub const OFF_TIME_OF_DAY: usize = 0x80;
pub const OFF_RACE_POSITION: usize = 0x84;
pub const OFF_OPPONENTS: usize = 0x86;
pub const OFF_REV_WARNING: usize = 0x88;
pub const OFF_REV_LIMIT: usize = 0x8A;
pub const OFF_MAX_SPEED: usize = 0x8C;
pub const OFF_FLAGS: usize = 0x8E;
pub const OFF_GEAR: usize = 0x90;
pub const OFF_THROTTLE: usize = 0x91;
pub const OFF_BRAKE: usize = 0x92;
pub const OFF_ROAD_PLANE: usize = 0x94;
pub const OFF_WHEEL_SPEED: usize = 0xA4;
pub const OFF_TYRE_RADIUS: usize = 0xB4;
pub const OFF_SUSPENSION: usize = 0xC4;
pub const OFF_CLUTCH: usize = 0xF4;
pub const OFF_CLUTCH_ENGAGEMENT: usize = 0xF8;
pub const OFF_CLUTCH_RPM: usize = 0xFC;
pub const OFF_TOP_SPEED: usize = 0x100;
pub const OFF_GEAR_RATIOS: usize = 0x104;
pub const OFF_CAR_CODE: usize = 0x124;

// Type B and later.
pub const OFF_WHEEL_ROTATION: usize = 0x128;
pub const OFF_SWAY: usize = 0x130;
pub const OFF_HEAVE: usize = 0x134;
pub const OFF_SURGE: usize = 0x138;

// Type ~ only.
pub const OFF_CAR_TYPE: usize = 0x13E;
pub const OFF_ENERGY_RECOVERY: usize = 0x150;

bitflags! {
    /// Status bits at offset 0x8E.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PacketFlags: u16 {
        const IN_RACE   = 1 << 0;
        const PAUSED    = 1 << 1;
        const LOADING   = 1 << 2;
        const IN_GEAR   = 1 << 3;
        const HAS_TURBO = 1 << 4;
        const REV_LIMIT = 1 << 5;
        const HANDBRAKE = 1 << 6;
        const LIGHTS    = 1 << 7;
        const LOW_BEAM  = 1 << 8;
        const HIGH_BEAM = 1 << 9;
        const ASM       = 1 << 10;
        const TCS       = 1 << 11;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Orientation quaternion, stored in wire order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

/// Fields only present in the longer packet variants.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExtendedData {
    /// Steering wheel rotation, radians
    pub wheel_rotation: f32,
    pub sway: f32,
    pub heave: f32,
    pub surge: f32,
    /// Type `~` only
    pub energy_recovery: Option<f32>,
    /// Type `~` only; 4 marks an electric car
    pub car_type: Option<u8>,
}

/// A decoded telemetry packet.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryPacket {
    pub packet_type: PacketType,
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Quaternion,
    pub angular_velocity: Vec3,
    /// Metres
    pub ride_height: f32,
    pub rpm: f32,
    pub fuel: f32,
    pub fuel_capacity: f32,
    /// Metres per second
    pub speed: f32,
    pub turbo_boost: f32,
    pub oil_pressure: f32,
    pub water_temp: f32,
    pub oil_temp: f32,
    /// FL, FR, RL, RR
    pub tyre_temp: [f32; 4],
    pub tick: i32,
    pub current_lap: i16,
    pub total_laps: i16,
    /// Milliseconds, -1 when unset
    pub best_lap_ms: i32,
    /// Milliseconds, -1 when unset
    pub last_lap_ms: i32,
    pub time_of_day_ms: i32,
    pub race_position: i16,
    pub opponents: i16,
    pub rev_warning_rpm: u16,
    pub rev_limit_rpm: u16,
    pub max_speed: u16,
    pub flags: PacketFlags,
    pub gear: u8,
    pub suggested_gear: u8,
    pub throttle: u8,
    pub brake: u8,
    /// Normal vector followed by plane distance
    pub road_plane: [f32; 4],
    /// Angular wheel speed, radians per second
    pub wheel_speed: [f32; 4],
    pub tyre_radius: [f32; 4],
    pub suspension: [f32; 4],
    pub clutch: f32,
    pub clutch_engagement: f32,
    pub clutch_rpm: f32,
    pub top_speed: f32,
    pub gear_ratios: [f32; 8],
    pub car_code: i32,
    pub extended: Option<ExtendedData>,
}

impl TelemetryPacket {
    /// Copy of `base` with only the tick replaced.
    ///
    /// Used to synthesize packets for ticks lost in transit.
    pub fn with_tick(base: &TelemetryPacket, tick: i32) -> Self {
        Self {
            tick,
            ..base.clone()
        }
    }

    pub fn in_race(&self) -> bool {
        self.flags.contains(PacketFlags::IN_RACE)
    }

    pub fn paused(&self) -> bool {
        self.flags.contains(PacketFlags::PAUSED)
    }

    pub fn loading(&self) -> bool {
        self.flags.contains(PacketFlags::LOADING)
    }

    pub fn asm_active(&self) -> bool {
        self.flags.contains(PacketFlags::ASM)
    }

    pub fn tcs_active(&self) -> bool {
        self.flags.contains(PacketFlags::TCS)
    }

    /// Steering wheel rotation in radians, when the packet carries it.
    pub fn wheel_rotation(&self) -> Option<f32> {
        self.extended.map(|e| e.wheel_rotation)
    }

    /// Parse an already decrypted buffer.
    ///
    /// # Errors
    ///
    /// [`DecodeError::TruncatedPacket`] when `buf` is shorter than the base
    /// layout, [`DecodeError::InvalidMagic`] when the signature does not match.
    pub fn parse(buf: &[u8]) -> DecodeResult<Self> {
        if buf.len() < PACKET_SIZE {
            return Err(DecodeError::truncated(PACKET_SIZE, buf.len()));
        }
        let magic = read_u32(buf, OFF_MAGIC);
        if magic != MAGIC {
            return Err(DecodeError::invalid_magic(MAGIC, magic));
        }

        // The variant follows the fields actually read.
        let packet_type = PacketType::fitting(buf.len());
        let gear_byte = buf[OFF_GEAR];

        let extended = (packet_type != PacketType::A).then(|| {
            let full = packet_type == PacketType::Tilde;
            ExtendedData {
                wheel_rotation: read_f32(buf, OFF_WHEEL_ROTATION),
                sway: read_f32(buf, OFF_SWAY),
                heave: read_f32(buf, OFF_HEAVE),
                surge: read_f32(buf, OFF_SURGE),
                energy_recovery: full.then(|| read_f32(buf, OFF_ENERGY_RECOVERY)),
                car_type: full.then(|| buf[OFF_CAR_TYPE]),
            }
        });

        Ok(Self {
            packet_type,
            position: read_vec3(buf, OFF_POSITION),
            velocity: read_vec3(buf, OFF_VELOCITY),
            rotation: Quaternion {
                w: read_f32(buf, OFF_ROTATION),
                x: read_f32(buf, OFF_ROTATION + 4),
                y: read_f32(buf, OFF_ROTATION + 8),
                z: read_f32(buf, OFF_ROTATION + 12),
            },
            angular_velocity: read_vec3(buf, OFF_ANGULAR_VELOCITY),
            ride_height: read_f32(buf, OFF_RIDE_HEIGHT),
            rpm: read_f32(buf, OFF_RPM),
            fuel: read_f32(buf, OFF_FUEL),
            fuel_capacity: read_f32(buf, OFF_FUEL_CAPACITY),
            speed: read_f32(buf, OFF_SPEED),
            turbo_boost: read_f32(buf, OFF_TURBO_BOOST),
            oil_pressure: read_f32(buf, OFF_OIL_PRESSURE),
            water_temp: read_f32(buf, OFF_WATER_TEMP),
            oil_temp: read_f32(buf, OFF_OIL_TEMP),
            tyre_temp: read_f32_array(buf, OFF_TYRE_TEMP),
            tick: read_i32(buf, OFF_TICK),
            current_lap: read_i16(buf, OFF_CURRENT_LAP),
            total_laps: read_i16(buf, OFF_TOTAL_LAPS),
            best_lap_ms: read_i32(buf, OFF_BEST_LAP),
            last_lap_ms: read_i32(buf, OFF_LAST_LAP),
            time_of_day_ms: read_i32(buf, OFF_TIME_OF_DAY),
            race_position: read_i16(buf, OFF_RACE_POSITION),
            opponents: read_i16(buf, OFF_OPPONENTS),
            rev_warning_rpm: read_u16(buf, OFF_REV_WARNING),
            rev_limit_rpm: read_u16(buf, OFF_REV_LIMIT),
            max_speed: read_u16(buf, OFF_MAX_SPEED),
            flags: PacketFlags::from_bits_retain(read_u16(buf, OFF_FLAGS)),
            gear: gear_byte & 0x0F,
            suggested_gear: (gear_byte >> 4) & 0x0F,
            throttle: buf[OFF_THROTTLE],
            brake: buf[OFF_BRAKE],
            road_plane: read_f32_array(buf, OFF_ROAD_PLANE),
            wheel_speed: read_f32_array(buf, OFF_WHEEL_SPEED),
            tyre_radius: read_f32_array(buf, OFF_TYRE_RADIUS),
            suspension: read_f32_array(buf, OFF_SUSPENSION),
            clutch: read_f32(buf, OFF_CLUTCH),
            clutch_engagement: read_f32(buf, OFF_CLUTCH_ENGAGEMENT),
            clutch_rpm: read_f32(buf, OFF_CLUTCH_RPM),
            top_speed: read_f32(buf, OFF_TOP_SPEED),
            gear_ratios: read_f32_array(buf, OFF_GEAR_RATIOS),
            car_code: read_i32(buf, OFF_CAR_CODE),
            extended,
        })
    }
}

/// Decrypts (optionally) and parses datagrams.
#[derive(Debug, Clone, Default)]
pub struct PacketDecoder {
    cipher: PacketCipher,
    decrypt: bool,
}

impl PacketDecoder {
    pub fn new(cipher: PacketCipher, decrypt: bool) -> Self {
        Self { cipher, decrypt }
    }

    /// Decoder for live console traffic.
    pub fn gt7() -> Self {
        Self::new(PacketCipher::GT7, true)
    }

    /// Decode one datagram.
    ///
    /// The variant is detected from the datagram length; lengths of at least
    /// [`PACKET_SIZE`] that match no known variant decode as the base layout.
    /// Decryption runs on a stack copy, so `raw` is never modified.
    ///
    /// # Errors
    ///
    /// See [`TelemetryPacket::parse`].
    pub fn decode(&self, raw: &[u8]) -> DecodeResult<TelemetryPacket> {
        if raw.len() < PACKET_SIZE {
            return Err(DecodeError::truncated(PACKET_SIZE, raw.len()));
        }
        if !self.decrypt {
            return TelemetryPacket::parse(raw);
        }

        let packet_type = PacketType::from_len(raw.len());
        let len = packet_type.expected_size();
        let mut buf = [0u8; MAX_PACKET_SIZE];
        buf[..len].copy_from_slice(&raw[..len]);
        self.cipher.decrypt_in_place(&mut buf[..len], packet_type);
        TelemetryPacket::parse(&buf[..len])
    }
}

/// Decode with the default GT7 cipher.
///
/// # Errors
///
/// See [`TelemetryPacket::parse`].
pub fn decode(raw: &[u8], decrypt: bool) -> DecodeResult<TelemetryPacket> {
    PacketDecoder::new(PacketCipher::GT7, decrypt).decode(raw)
}

fn read_f32(data: &[u8], offset: usize) -> f32 {
    data.get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(f32::from_le_bytes)
        .unwrap_or(0.0)
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    data.get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .unwrap_or(0)
}

fn read_i32(data: &[u8], offset: usize) -> i32 {
    data.get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(i32::from_le_bytes)
        .unwrap_or(0)
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    data.get(offset..offset + 2)
        .and_then(|b| b.try_into().ok())
        .map(u16::from_le_bytes)
        .unwrap_or(0)
}

fn read_i16(data: &[u8], offset: usize) -> i16 {
    data.get(offset..offset + 2)
        .and_then(|b| b.try_into().ok())
        .map(i16::from_le_bytes)
        .unwrap_or(0)
}

fn read_vec3(data: &[u8], offset: usize) -> Vec3 {
    Vec3::new(
        read_f32(data, offset),
        read_f32(data, offset + 4),
        read_f32(data, offset + 8),
    )
}

fn read_f32_array<const N: usize>(data: &[u8], offset: usize) -> [f32; N] {
    std::array::from_fn(|i| read_f32(data, offset + i * 4))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{PACKET_SIZE_TYPE_B, PACKET_SIZE_TYPE_TILDE};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn plain_packet(len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        buf[OFF_MAGIC..OFF_MAGIC + 4].copy_from_slice(&MAGIC.to_le_bytes());
        buf
    }

    fn put_f32(buf: &mut [u8], offset: usize, v: f32) {
        buf[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
    }

    #[test]
    fn test_short_buffer_is_truncated() {
        let err = decode(&[0u8; 100], true);
        assert_eq!(err, Err(DecodeError::truncated(PACKET_SIZE, 100)));
        let err = TelemetryPacket::parse(&[0u8; PACKET_SIZE - 1]);
        assert_eq!(err, Err(DecodeError::truncated(PACKET_SIZE, PACKET_SIZE - 1)));
    }

    #[test]
    fn test_wrong_magic_is_rejected() {
        let buf = vec![0u8; PACKET_SIZE];
        assert_eq!(
            TelemetryPacket::parse(&buf),
            Err(DecodeError::invalid_magic(MAGIC, 0))
        );
    }

    #[test]
    fn test_gear_nibbles() -> TestResult {
        let mut buf = plain_packet(PACKET_SIZE);
        buf[OFF_GEAR] = (5 << 4) | 3;
        let p = TelemetryPacket::parse(&buf)?;
        assert_eq!(p.gear, 3);
        assert_eq!(p.suggested_gear, 5);
        Ok(())
    }

    #[test]
    fn test_flags_decode() -> TestResult {
        let mut buf = plain_packet(PACKET_SIZE);
        let bits = PacketFlags::IN_RACE | PacketFlags::ASM | PacketFlags::TCS;
        buf[OFF_FLAGS..OFF_FLAGS + 2].copy_from_slice(&bits.bits().to_le_bytes());
        let p = TelemetryPacket::parse(&buf)?;
        assert!(p.in_race());
        assert!(!p.paused());
        assert!(p.asm_active());
        assert!(p.tcs_active());
        Ok(())
    }

    #[test]
    fn test_race_position_and_opponents_offsets() -> TestResult {
        let mut buf = plain_packet(PACKET_SIZE);
        buf[OFF_RACE_POSITION..OFF_RACE_POSITION + 2].copy_from_slice(&3i16.to_le_bytes());
        buf[OFF_OPPONENTS..OFF_OPPONENTS + 2].copy_from_slice(&15i16.to_le_bytes());
        buf[OFF_REV_LIMIT..OFF_REV_LIMIT + 2].copy_from_slice(&8200u16.to_le_bytes());
        let p = TelemetryPacket::parse(&buf)?;
        assert_eq!(p.race_position, 3);
        assert_eq!(p.opponents, 15);
        assert_eq!(p.rev_limit_rpm, 8200);
        Ok(())
    }

    #[test]
    fn test_base_packet_has_no_extended_data() -> TestResult {
        let p = TelemetryPacket::parse(&plain_packet(PACKET_SIZE))?;
        assert_eq!(p.packet_type, PacketType::A);
        assert!(p.extended.is_none());
        assert!(p.wheel_rotation().is_none());
        Ok(())
    }

    #[test]
    fn test_type_b_wheel_rotation() -> TestResult {
        let mut buf = plain_packet(PACKET_SIZE_TYPE_B);
        put_f32(&mut buf, OFF_WHEEL_ROTATION, -0.5);
        put_f32(&mut buf, OFF_SWAY, 0.25);
        let p = TelemetryPacket::parse(&buf)?;
        assert_eq!(p.packet_type, PacketType::B);
        assert_eq!(p.wheel_rotation(), Some(-0.5));
        let ext = p.extended.ok_or("missing extended data")?;
        assert_eq!(ext.sway, 0.25);
        assert!(ext.energy_recovery.is_none());
        Ok(())
    }

    #[test]
    fn test_type_tilde_energy_recovery() -> TestResult {
        let mut buf = plain_packet(PACKET_SIZE_TYPE_TILDE);
        put_f32(&mut buf, OFF_ENERGY_RECOVERY, 12.5);
        buf[OFF_CAR_TYPE] = 4;
        let p = TelemetryPacket::parse(&buf)?;
        let ext = p.extended.ok_or("missing extended data")?;
        assert_eq!(ext.energy_recovery, Some(12.5));
        assert_eq!(ext.car_type, Some(4));
        Ok(())
    }

    #[test]
    fn test_with_tick_only_changes_tick() -> TestResult {
        let mut buf = plain_packet(PACKET_SIZE);
        put_f32(&mut buf, OFF_RPM, 5400.0);
        buf[OFF_TICK..OFF_TICK + 4].copy_from_slice(&5i32.to_le_bytes());
        let base = TelemetryPacket::parse(&buf)?;
        let copy = TelemetryPacket::with_tick(&base, 8);
        assert_eq!(copy.tick, 8);
        assert_eq!(TelemetryPacket { tick: 5, ..copy }, base);
        Ok(())
    }

    #[test]
    fn test_decode_encrypted_packet() -> TestResult {
        let mut plain = plain_packet(PACKET_SIZE);
        put_f32(&mut plain, OFF_SPEED, 41.5);
        buf_put_i32(&mut plain, OFF_CAR_CODE, 3383);
        let raw = PacketCipher::GT7.encrypt(&plain, 0xCAFE_F00D, PacketType::A);

        let p = PacketDecoder::gt7().decode(&raw)?;
        assert_eq!(p.speed, 41.5);
        assert_eq!(p.car_code, 3383);
        Ok(())
    }

    #[test]
    fn test_unknown_length_decodes_as_base() -> TestResult {
        let mut plain = plain_packet(PACKET_SIZE);
        put_f32(&mut plain, OFF_RPM, 3000.0);
        let mut raw = PacketCipher::GT7.encrypt(&plain, 7, PacketType::A);
        raw.extend_from_slice(&[0xEE; 8]);

        let p = PacketDecoder::gt7().decode(&raw)?;
        assert_eq!(p.packet_type, PacketType::A);
        assert_eq!(p.rpm, 3000.0);
        Ok(())
    }

    #[test]
    fn test_plain_odd_length_is_named_by_parsed_fields() -> TestResult {
        let mut buf = plain_packet(PACKET_SIZE_TYPE_B + 14);
        put_f32(&mut buf, OFF_WHEEL_ROTATION, 0.75);
        let p = decode(&buf, false)?;
        assert_eq!(p.packet_type, PacketType::B);
        let ext = p.extended.ok_or("missing extended data")?;
        assert_eq!(ext.wheel_rotation, 0.75);
        assert!(ext.energy_recovery.is_none());

        let p = decode(&plain_packet(PACKET_SIZE_TYPE_TILDE + 8), false)?;
        assert_eq!(p.packet_type, PacketType::Tilde);
        assert!(p.extended.and_then(|e| e.car_type).is_some());

        let p = decode(&plain_packet(PACKET_SIZE + 4), false)?;
        assert_eq!(p.packet_type, PacketType::A);
        assert!(p.extended.is_none());
        Ok(())
    }

    fn buf_put_i32(buf: &mut [u8], offset: usize, v: i32) {
        buf[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
    }
}
