//! Salsa20 packet cipher.
//!
//! Every datagram is XORed with a Salsa20/20 keystream. The 8-byte nonce is
//! derived from 4 bytes at `[0x40..0x44]` of the **raw** packet:
//! `iv1 = LE_u32`, `iv2 = iv1 ^ xor_key`, nonce = `[iv2_le, iv1_le]`.
//! The XOR key depends on the requested [`PacketType`].

use serde::{Deserialize, Serialize};

/// Offset of the obfuscated IV seed inside a raw packet.
pub const IV_OFFSET: usize = 0x40;

/// PacketType A size: 0x128 = 296 bytes.
pub const PACKET_SIZE: usize = 296;
/// PacketType B size: 0x13C = 316 bytes.
pub const PACKET_SIZE_TYPE_B: usize = 0x13C;
/// PacketType ~ size: 0x158 = 344 bytes.
pub const PACKET_SIZE_TYPE_TILDE: usize = 0x158;
/// Largest known packet.
pub const MAX_PACKET_SIZE: usize = PACKET_SIZE_TYPE_TILDE;

/// Key: first 32 bytes of `"Simulator Interface Packet GT7 ver 0.0"`.
pub const GT7_KEY: [u8; 32] = *b"Simulator Interface Packet GT7 v";

const XOR_KEY_A: u32 = 0xDEAD_BEAF;
const XOR_KEY_B: u32 = 0xDEAD_BEEF;
const XOR_KEY_TILDE: u32 = 0x55FA_BB4F;

/// Packet variant, selected by the heartbeat byte sent to the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PacketType {
    /// Standard 296-byte packet, heartbeat `"A"`.
    #[default]
    #[serde(rename = "A")]
    A,
    /// 316-byte packet adding wheel rotation and motion, heartbeat `"B"`.
    #[serde(rename = "B")]
    B,
    /// 344-byte packet adding energy recovery, heartbeat `"~"`.
    #[serde(rename = "~")]
    Tilde,
}

impl PacketType {
    pub const fn heartbeat(self) -> &'static [u8] {
        match self {
            PacketType::A => b"A",
            PacketType::B => b"B",
            PacketType::Tilde => b"~",
        }
    }

    pub const fn expected_size(self) -> usize {
        match self {
            PacketType::A => PACKET_SIZE,
            PacketType::B => PACKET_SIZE_TYPE_B,
            PacketType::Tilde => PACKET_SIZE_TYPE_TILDE,
        }
    }

    pub const fn xor_key(self) -> u32 {
        match self {
            PacketType::A => XOR_KEY_A,
            PacketType::B => XOR_KEY_B,
            PacketType::Tilde => XOR_KEY_TILDE,
        }
    }

    /// Detect the variant from a datagram length.
    ///
    /// Unknown lengths map to `A`; callers check the minimum size separately.
    pub const fn from_len(len: usize) -> PacketType {
        match len {
            PACKET_SIZE_TYPE_TILDE => PacketType::Tilde,
            PACKET_SIZE_TYPE_B => PacketType::B,
            _ => PacketType::A,
        }
    }

    /// Largest variant whose layout fits in `len` bytes.
    pub const fn fitting(len: usize) -> PacketType {
        if len >= PACKET_SIZE_TYPE_TILDE {
            PacketType::Tilde
        } else if len >= PACKET_SIZE_TYPE_B {
            PacketType::B
        } else {
            PacketType::A
        }
    }
}

/// Salsa20 packet cipher with a fixed 32-byte key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketCipher {
    key: [u8; 32],
}

impl Default for PacketCipher {
    fn default() -> Self {
        Self::GT7
    }
}

impl PacketCipher {
    /// The cipher every GT7 console uses.
    pub const GT7: PacketCipher = PacketCipher { key: GT7_KEY };

    pub const fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Decrypt `buf` in place.
    ///
    /// The IV seed is read from `buf` before the keystream is applied, so the
    /// buffer must hold raw (still encrypted) bytes. Buffers shorter than the
    /// IV seed are left untouched.
    pub fn decrypt_in_place(&self, buf: &mut [u8], packet_type: PacketType) {
        let Some(iv1) = read_iv(buf) else {
            return;
        };
        self.apply_keystream(buf, iv1, packet_type.xor_key());
    }

    /// Encrypt a plaintext packet the way the console does.
    ///
    /// The keystream is derived from `iv1`, which is then written into the
    /// ciphertext at [`IV_OFFSET`] so [`decrypt_in_place`](Self::decrypt_in_place)
    /// recovers every byte outside the IV seed.
    pub fn encrypt(&self, plain: &[u8], iv1: u32, packet_type: PacketType) -> Vec<u8> {
        let mut buf = plain.to_vec();
        self.apply_keystream(&mut buf, iv1, packet_type.xor_key());
        if let Some(seed) = buf.get_mut(IV_OFFSET..IV_OFFSET + 4) {
            seed.copy_from_slice(&iv1.to_le_bytes());
        }
        buf
    }

    fn apply_keystream(&self, buf: &mut [u8], iv1: u32, xor_key: u32) {
        let iv2 = iv1 ^ xor_key;
        let mut nonce = [0u8; 8];
        nonce[..4].copy_from_slice(&iv2.to_le_bytes());
        nonce[4..].copy_from_slice(&iv1.to_le_bytes());

        for (counter, chunk) in (0u64..).zip(buf.chunks_mut(64)) {
            let ks = salsa20_block(&self.key, &nonce, counter);
            for (b, k) in chunk.iter_mut().zip(ks.iter()) {
                *b ^= k;
            }
        }
    }
}

fn read_iv(buf: &[u8]) -> Option<u32> {
    buf.get(IV_OFFSET..IV_OFFSET + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
}

fn le_word(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// One 64-byte Salsa20/20 keystream block.
fn salsa20_block(key: &[u8; 32], nonce: &[u8; 8], counter: u64) -> [u8; 64] {
    //   0: sigma[0]  1-4: key[0..16]  5: sigma[1]  6-7: nonce  8-9: counter
    //  10: sigma[2] 11-14: key[16..32] 15: sigma[3]
    let mut state = [0u32; 16];
    state[0] = 0x6170_7865; // "expa"
    for i in 0..4 {
        state[1 + i] = le_word(key, i * 4);
        state[11 + i] = le_word(key, 16 + i * 4);
    }
    state[5] = 0x3320_646e; // "nd 3"
    state[6] = le_word(nonce, 0);
    state[7] = le_word(nonce, 4);
    state[8] = (counter & 0xFFFF_FFFF) as u32;
    state[9] = (counter >> 32) as u32;
    state[10] = 0x7962_2d32; // "2-by"
    state[15] = 0x6b20_6574; // "te k"

    let mut working = state;
    for _ in 0..10 {
        // column round
        qr(&mut working, 0, 4, 8, 12);
        qr(&mut working, 5, 9, 13, 1);
        qr(&mut working, 10, 14, 2, 6);
        qr(&mut working, 15, 3, 7, 11);
        // row round
        qr(&mut working, 0, 1, 2, 3);
        qr(&mut working, 5, 6, 7, 4);
        qr(&mut working, 10, 11, 8, 9);
        qr(&mut working, 15, 12, 13, 14);
    }

    let mut out = [0u8; 64];
    for (i, (w, s)) in working.iter().zip(state.iter()).enumerate() {
        out[i * 4..(i + 1) * 4].copy_from_slice(&w.wrapping_add(*s).to_le_bytes());
    }
    out
}

#[inline]
fn qr(s: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
    s[b] ^= s[a].wrapping_add(s[d]).rotate_left(7);
    s[c] ^= s[b].wrapping_add(s[a]).rotate_left(9);
    s[d] ^= s[c].wrapping_add(s[b]).rotate_left(13);
    s[a] ^= s[d].wrapping_add(s[c]).rotate_left(18);
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_salsa20_known_answer_zero_key() {
        // eSTREAM Salsa20/20 vector: all-zero key and nonce, block 0 starts
        // 9A97F65B 9B4C721B.
        let block = salsa20_block(&[0u8; 32], &[0u8; 8], 0);
        assert_eq!(&block[..8], &[0x9A, 0x97, 0xF6, 0x5B, 0x9B, 0x4C, 0x72, 0x1B]);
    }

    #[test]
    fn test_salsa20_block_deterministic_and_counter_sensitive() {
        let nonce = [7u8; 8];
        assert_eq!(
            salsa20_block(&GT7_KEY, &nonce, 3),
            salsa20_block(&GT7_KEY, &nonce, 3)
        );
        assert_ne!(
            salsa20_block(&GT7_KEY, &nonce, 0),
            salsa20_block(&GT7_KEY, &nonce, 1)
        );
    }

    #[test]
    fn test_encrypt_then_decrypt_recovers_plaintext() -> TestResult {
        let cipher = PacketCipher::GT7;
        for packet_type in [PacketType::A, PacketType::B, PacketType::Tilde] {
            let plain: Vec<u8> = (0..packet_type.expected_size())
                .map(|i| (i * 31 & 0xFF) as u8)
                .collect();
            let mut buf = cipher.encrypt(&plain, 0x1234_5678, packet_type);
            assert_ne!(buf, plain);
            assert_eq!(read_iv(&buf), Some(0x1234_5678));

            cipher.decrypt_in_place(&mut buf, packet_type);
            for (i, (got, want)) in buf.iter().zip(plain.iter()).enumerate() {
                if (IV_OFFSET..IV_OFFSET + 4).contains(&i) {
                    continue;
                }
                assert_eq!(got, want, "byte {i} differs for {packet_type:?}");
            }
        }
        Ok(())
    }

    #[test]
    fn test_xor_key_changes_keystream() {
        let plain = vec![0u8; PACKET_SIZE_TYPE_B];
        let a = PacketCipher::GT7.encrypt(&plain, 99, PacketType::A);
        let b = PacketCipher::GT7.encrypt(&plain, 99, PacketType::B);
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_buffer_is_untouched() {
        let mut buf = [0xAAu8; IV_OFFSET + 2];
        PacketCipher::default().decrypt_in_place(&mut buf, PacketType::A);
        assert!(buf.iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_packet_type_detection() {
        assert_eq!(PacketType::from_len(296), PacketType::A);
        assert_eq!(PacketType::from_len(316), PacketType::B);
        assert_eq!(PacketType::from_len(344), PacketType::Tilde);
        assert_eq!(PacketType::from_len(300), PacketType::A);
        assert_eq!(PacketType::Tilde.heartbeat(), b"~");
        assert_eq!(PacketType::fitting(300), PacketType::A);
        assert_eq!(PacketType::fitting(330), PacketType::B);
        assert_eq!(PacketType::fitting(400), PacketType::Tilde);
    }
}
