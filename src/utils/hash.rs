//! Paul Hsieh's SuperFastHash.
//!
//! The output of this function decides which slice a key lives on, so it
//! is part of the on-disk contract: it must produce identical bits for
//! every input across versions and platforms. That includes the quirks
//! of the reference C implementation, which reads the 1- and 3-byte
//! tails through a signed `char` — `hash(b"\xff")` really is 0.

#[inline(always)]
fn get16(d: &[u8], i: usize) -> u32 {
    (d[i] as u32) | ((d[i + 1] as u32) << 8)
}

/// Hash a key to a 32-bit value. The empty key hashes to 0.
pub fn superfast_hash(data: &[u8]) -> u32 {
    let len = data.len();
    if len == 0 {
        return 0;
    }

    let mut hash = len as u32;
    let mut chunks = data.chunks_exact(4);

    for c in chunks.by_ref() {
        hash = hash.wrapping_add(get16(c, 0));
        let tmp = (get16(c, 2) << 11) ^ hash;
        hash = (hash << 16) ^ tmp;
        hash = hash.wrapping_add(hash >> 11);
    }

    let rem = chunks.remainder();
    match rem.len() {
        3 => {
            hash = hash.wrapping_add(get16(rem, 0));
            hash ^= hash << 16;
            // sign-extended, as in the reference implementation
            hash ^= ((rem[2] as i8 as i32) << 18) as u32;
            hash = hash.wrapping_add(hash >> 11);
        }
        2 => {
            hash = hash.wrapping_add(get16(rem, 0));
            hash ^= hash << 11;
            hash = hash.wrapping_add(hash >> 17);
        }
        1 => {
            hash = hash.wrapping_add(rem[0] as i8 as i32 as u32);
            hash ^= hash << 10;
            hash = hash.wrapping_add(hash >> 1);
        }
        _ => {}
    }

    // Force "avalanching" of the final bits
    hash ^= hash << 3;
    hash = hash.wrapping_add(hash >> 5);
    hash ^= hash << 4;
    hash = hash.wrapping_add(hash >> 17);
    hash ^= hash << 25;
    hash = hash.wrapping_add(hash >> 6);

    hash
}
